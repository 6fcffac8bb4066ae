//! Source Reconciliation
//!
//! A grounded answer cites in two places at once: the structured
//! payload's own `sources` array (explicit, model-authored) and the
//! envelope's grounding metadata (implicit, emitted by the search
//! tool). The two streams overlap and disagree; this module merges
//! them into one URI-unique list. Pure function, no network.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::gemini::GenerateResponse;

/// One cited source
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceCitation {
    pub title: String,
    pub uri: String,
}

/// Merge explicit citations with the envelope's grounding chunks.
///
/// Order: explicit citations first, then implicit ones. Duplicate URIs
/// keep the first occurrence's title. Grounding chunks lacking a URI or
/// a title are dropped, as are citations with a blank URI.
pub fn reconcile_sources(
    explicit: &[SourceCitation],
    envelope: &GenerateResponse,
) -> Vec<SourceCitation> {
    let mut seen = HashSet::new();
    let mut merged = Vec::new();

    for citation in explicit {
        if citation.uri.is_empty() {
            continue;
        }
        if seen.insert(citation.uri.clone()) {
            merged.push(citation.clone());
        }
    }

    for chunk in envelope.grounding_chunks() {
        let Some(web) = &chunk.web else { continue };
        let (Some(uri), Some(title)) = (&web.uri, &web.title) else {
            continue;
        };
        if uri.is_empty() {
            continue;
        }
        if seen.insert(uri.clone()) {
            merged.push(SourceCitation {
                title: title.clone(),
                uri: uri.clone(),
            });
        }
    }

    merged
}
