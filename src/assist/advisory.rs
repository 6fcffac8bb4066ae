//! Destination travel advisories
//!
//! Up to three safety, legal and etiquette tips from the Advisor
//! persona. Informationally independent of the research loop, so
//! callers can run both concurrently; the personas' histories never
//! touch.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::cache::LookupCache;
use crate::concierge::{Concierge, Persona};
use crate::error::Result;
use crate::parse::Parsed;

/// Upper bound on returned tips
pub const MAX_TIPS: usize = 3;

const CACHE_TASK: &str = "advisory";

/// One destination-specific tip for a foreign visitor
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdvisoryTip {
    pub category: String,
    pub tip: String,
}

/// Fetch up to three destination tips. Cached per destination;
/// malformed output degrades to an empty list without touching the
/// cache, so the next call asks again.
pub async fn travel_advisory(desk: &Concierge, destination: &str) -> Result<Vec<AdvisoryTip>> {
    let key = LookupCache::compute_key(CACHE_TASK, &[destination]);
    if let Some(hit) = desk.cache().get(&key).await {
        if let Ok(cached) = serde_json::from_str::<Vec<AdvisoryTip>>(&hit) {
            return Ok(cached);
        }
        warn!("Discarding undecodable {} cache entry", CACHE_TASK);
    }

    let prompt = advisory_prompt(destination);
    let reply = {
        let mut session = desk.session(Persona::Advisor).lock().await;
        session.reset();
        session.run(&prompt, Some(advisory_schema())).await?
    };

    let parsed = Parsed::<Vec<AdvisoryTip>>::from_json(&reply.text);
    let cacheable = !parsed.is_malformed();
    if !cacheable {
        warn!("Unparseable {} reply, degrading to empty", CACHE_TASK);
    }
    let mut tips = parsed.or_default();
    tips.truncate(MAX_TIPS);
    debug!("Collected {} advisory tips for {}", tips.len(), destination);

    // Never cache a degraded reply; it would pin the glitch for the TTL
    if cacheable {
        if let Ok(serialized) = serde_json::to_string(&tips) {
            desk.cache().set(&key, serialized).await;
        }
    }

    Ok(tips)
}

fn advisory_prompt(destination: &str) -> String {
    format!(
        "Give the {} most important safety, legal and etiquette tips for a foreign \
         visitor to {}. Each tip needs a category (safety, laws, customs or health) \
         and one concrete, actionable sentence. Skip generic advice that applies to \
         every country.",
        MAX_TIPS, destination
    )
}

fn advisory_schema() -> Value {
    json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": {
                "category": {"type": "STRING"},
                "tip": {"type": "STRING"}
            },
            "required": ["category", "tip"]
        }
    })
}
