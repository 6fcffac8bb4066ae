//! Document checklists
//!
//! Turns a finished policy record into a checklist of documents to
//! gather. The completed flag is caller-owned state: every generated
//! item starts at false no matter what the model emitted, so the wire
//! shape deliberately has nowhere for a model-supplied value to land.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use crate::concierge::{Concierge, Persona};
use crate::error::Result;
use crate::parse::Parsed;
use crate::policy::PolicyRecord;

/// One document the traveler should gather
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChecklistItem {
    pub id: String,
    pub name: String,
    pub description: String,
    pub required: bool,
    pub completed: bool,
}

/// What the model is allowed to fill in; no completed field
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct WireItem {
    id: String,
    name: String,
    description: String,
    required: bool,
}

impl From<WireItem> for ChecklistItem {
    fn from(item: WireItem) -> Self {
        ChecklistItem {
            id: item.id,
            name: item.name,
            description: item.description,
            required: item.required,
            completed: false,
        }
    }
}

/// Generate a document checklist for a finalized record. Malformed
/// output degrades to an empty list.
pub async fn generate_checklist(
    desk: &Concierge,
    record: &PolicyRecord,
) -> Result<Vec<ChecklistItem>> {
    let prompt = checklist_prompt(record);
    let reply = {
        let mut session = desk.session(Persona::Drafter).lock().await;
        session.reset();
        session.run(&prompt, Some(checklist_schema())).await?
    };

    let items: Vec<WireItem> = Parsed::from_json(&reply.text).or_default();
    debug!(
        "Generated {} checklist items for {} -> {}",
        items.len(),
        record.citizenship,
        record.destination
    );

    Ok(items.into_iter().map(ChecklistItem::from).collect())
}

fn checklist_prompt(record: &PolicyRecord) -> String {
    let requirements = if record.requirements.is_empty() {
        "none listed".to_string()
    } else {
        record.requirements.join("; ")
    };

    format!(
        "Build a document checklist for this visa case:\n\n\
         - Traveler: citizen of {}, resident of {}\n\
         - Destination: {} ({})\n\
         - Visa status: {}\n\
         - Summary: {}\n\
         - Stated requirements: {}\n\n\
         One entry per document. Give each a short snake_case id, a name, a one-sentence \
         description of exactly what to obtain, and whether it is required or merely \
         recommended.",
        record.citizenship,
        record.residency,
        record.destination,
        record.purpose,
        record.visa_status.label(),
        record.summary,
        requirements
    )
}

fn checklist_schema() -> Value {
    json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": {
                "id": {"type": "STRING"},
                "name": {"type": "STRING"},
                "description": {"type": "STRING"},
                "required": {"type": "BOOLEAN"}
            },
            "required": ["id", "name", "description", "required"]
        }
    })
}
