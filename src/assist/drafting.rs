//! Supporting document drafts
//!
//! Free-prose generation with the Drafter persona. No schema and no
//! JSON parsing path: the model's text is the product. The prompt
//! restricts the draft to the supplied facts and excludes letter
//! header blocks, since callers paste the body into their own
//! stationery.

use std::collections::BTreeMap;

use tracing::debug;

use crate::concierge::{Concierge, Persona};
use crate::error::Result;

/// Kinds of supporting document the drafter can produce
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    CoverLetter,
    Itinerary,
    EmploymentProof,
}

impl DocumentKind {
    pub fn name(&self) -> &'static str {
        match self {
            DocumentKind::CoverLetter => "visa application cover letter",
            DocumentKind::Itinerary => "day-by-day travel itinerary",
            DocumentKind::EmploymentProof => "proof of employment letter",
        }
    }
}

/// Draft one document from a field map. The `BTreeMap` keeps prompt
/// ordering deterministic for identical inputs.
pub async fn generate_document(
    desk: &Concierge,
    kind: DocumentKind,
    fields: &BTreeMap<String, String>,
) -> Result<String> {
    let prompt = drafting_prompt(kind, fields);
    debug!("Drafting {} from {} fields", kind.name(), fields.len());

    let reply = {
        let mut session = desk.session(Persona::Drafter).lock().await;
        session.reset();
        session.run(&prompt, None).await?
    };

    Ok(reply.text.trim().to_string())
}

fn drafting_prompt(kind: DocumentKind, fields: &BTreeMap<String, String>) -> String {
    let mut facts = String::new();
    for (name, value) in fields {
        facts.push_str("- ");
        facts.push_str(name);
        facts.push_str(": ");
        facts.push_str(value);
        facts.push('\n');
    }
    if facts.is_empty() {
        facts.push_str("- (no details provided)\n");
    }

    format!(
        "Draft a {} from these facts:\n\n{}\n\
         Use only the facts above; leave anything not listed out entirely rather than \
         inventing it. Write the body text only - no addresses, date lines, subject \
         lines, \"To whom it may concern\" or other letter header blocks.",
        kind.name(),
        facts
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields() -> BTreeMap<String, String> {
        let mut map = BTreeMap::new();
        map.insert("Applicant".to_string(), "Maria Silva".to_string());
        map.insert("Destination".to_string(), "Japan".to_string());
        map.insert("Travel dates".to_string(), "2025-04-01 to 2025-04-14".to_string());
        map
    }

    #[test]
    fn test_prompt_lists_all_fields() {
        let prompt = drafting_prompt(DocumentKind::CoverLetter, &fields());
        assert!(prompt.contains("Maria Silva"));
        assert!(prompt.contains("Japan"));
        assert!(prompt.contains("2025-04-01"));
    }

    #[test]
    fn test_prompt_excludes_header_blocks() {
        let prompt = drafting_prompt(DocumentKind::EmploymentProof, &fields());
        assert!(prompt.contains("no addresses"));
        assert!(prompt.contains("header blocks"));
    }

    #[test]
    fn test_prompt_is_deterministic_across_insertion_order() {
        let mut reversed = BTreeMap::new();
        reversed.insert("Travel dates".to_string(), "2025-04-01 to 2025-04-14".to_string());
        reversed.insert("Destination".to_string(), "Japan".to_string());
        reversed.insert("Applicant".to_string(), "Maria Silva".to_string());

        assert_eq!(
            drafting_prompt(DocumentKind::Itinerary, &fields()),
            drafting_prompt(DocumentKind::Itinerary, &reversed)
        );
    }

    #[test]
    fn test_empty_field_map_still_prompts() {
        let prompt = drafting_prompt(DocumentKind::CoverLetter, &BTreeMap::new());
        assert!(prompt.contains("no details provided"));
    }

    #[test]
    fn test_kind_names() {
        assert!(DocumentKind::CoverLetter.name().contains("cover letter"));
        assert!(DocumentKind::Itinerary.name().contains("itinerary"));
        assert!(DocumentKind::EmploymentProof.name().contains("employment"));
    }
}
