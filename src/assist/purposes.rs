//! Travel purpose suggestions
//!
//! One schema-constrained Consultant call per citizenship/destination
//! pair, capped at five options and cached.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::cache::LookupCache;
use crate::concierge::{Concierge, Persona};
use crate::error::Result;
use crate::parse::Parsed;

/// Upper bound on returned purpose options
pub const MAX_PURPOSES: usize = 5;

const CACHE_TASK: &str = "purposes";

/// One plausible reason to travel, as offered to the user
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PurposeOption {
    pub id: String,
    pub label: String,
    pub description: String,
}

/// Suggest up to five common travel purposes for the pair. Cached per
/// (citizenship, destination); malformed output degrades to an empty
/// list without touching the cache, so the next call asks again.
pub async fn suggest_purposes(
    desk: &Concierge,
    citizenship: &str,
    destination: &str,
) -> Result<Vec<PurposeOption>> {
    let key = LookupCache::compute_key(CACHE_TASK, &[citizenship, destination]);
    if let Some(hit) = desk.cache().get(&key).await {
        if let Ok(cached) = serde_json::from_str::<Vec<PurposeOption>>(&hit) {
            return Ok(cached);
        }
        warn!("Discarding undecodable {} cache entry", CACHE_TASK);
    }

    let prompt = purposes_prompt(citizenship, destination);
    let reply = {
        let mut session = desk.session(Persona::Consultant).lock().await;
        session.reset();
        session.run(&prompt, Some(purposes_schema())).await?
    };

    let parsed = Parsed::<Vec<PurposeOption>>::from_json(&reply.text);
    let cacheable = !parsed.is_malformed();
    if !cacheable {
        warn!("Unparseable {} reply, degrading to empty", CACHE_TASK);
    }
    let mut purposes = parsed.or_default();
    purposes.truncate(MAX_PURPOSES);
    debug!(
        "Suggested {} purposes for {} -> {}",
        purposes.len(),
        citizenship,
        destination
    );

    // Never cache a degraded reply; it would pin the glitch for the TTL
    if cacheable {
        if let Ok(serialized) = serde_json::to_string(&purposes) {
            desk.cache().set(&key, serialized).await;
        }
    }

    Ok(purposes)
}

fn purposes_prompt(citizenship: &str, destination: &str) -> String {
    format!(
        "List the most common reasons a citizen of {} travels to {}. For each, give a \
         short snake_case id, a human-readable label and a one-sentence description. \
         At most {} entries, most common first.",
        citizenship, destination, MAX_PURPOSES
    )
}

fn purposes_schema() -> Value {
    json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": {
                "id": {"type": "STRING"},
                "label": {"type": "STRING"},
                "description": {"type": "STRING"}
            },
            "required": ["id", "label", "description"]
        }
    })
}
