//! Self-Correcting Visa Research
//!
//! The main orchestration loop. One invocation walks
//! INIT -> REQUEST -> RECONCILE -> EVALUATE -> (ACCEPT | RETRY) -> DONE:
//! ask the consultant persona for a schema-constrained, search-grounded
//! answer, merge its citations with the grounding metadata, score the
//! result with the independent judge, and retry with the reviewer's
//! critique quoted back verbatim until the score clears the bar or the
//! budget runs out.
//!
//! Retries are spent on low-quality-but-parseable answers only;
//! transport and API errors abort the whole run. On exhaustion the
//! LAST attempt is returned - most recently corrected, not best-scoring
//! - unless the best-of-n strategy was opted into.

use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};
use uuid::Uuid;

use crate::concierge::{Concierge, Persona};
use crate::error::Result;
use crate::judge::Verification;
use crate::parse::Parsed;
use crate::policy::{
    NextStep, PolicyRecord, VisaQuery, VisaStatus, FALLBACK_SUMMARY, FALLBACK_TIMELINE,
};
use crate::sources::{reconcile_sources, SourceCitation};

/// Corrective retries after the initial attempt (3 attempts total)
pub const MAX_RETRIES: u32 = 2;

/// Verdict score at which an attempt is accepted outright
pub const ACCEPT_SCORE: f64 = 8.0;

/// Score ceiling for answers with no reconciled sources
const UNSOURCED_SCORE_CAP: f64 = 5.0;

const MISSING_SOURCES_NOTE: &str =
    "Score capped: missing official sources - no citation survived reconciliation.";

/// Which attempt to return when the retry budget is exhausted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SelectionStrategy {
    /// The most recently corrected attempt
    #[default]
    LastAttempt,
    /// The highest-scoring attempt across the run
    BestScore,
}

impl SelectionStrategy {
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "best" | "best_score" => SelectionStrategy::BestScore,
            _ => SelectionStrategy::LastAttempt,
        }
    }
}

/// Stage observer for the research loop. Purely a side channel: the
/// loop behaves identically whichever observer is attached.
pub trait SearchProgress: Send + Sync {
    fn stage(&self, label: &str);
}

/// Default observer; discards stage labels
pub struct NoProgress;

impl SearchProgress for NoProgress {
    fn stage(&self, _label: &str) {}
}

/// Adapter turning a closure into an observer
pub struct ProgressFn<F>(pub F);

impl<F> SearchProgress for ProgressFn<F>
where
    F: Fn(&str) + Send + Sync,
{
    fn stage(&self, label: &str) {
        (self.0)(label)
    }
}

/// The consultant's structured answer. Every field is optional so one
/// missing value never sinks the whole payload.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ResearchPayload {
    visa_status: Option<String>,
    summary: Option<String>,
    next_steps: Vec<NextStep>,
    timeline: Option<String>,
    requirements: Vec<String>,
    sources: Vec<SourceCitation>,
}

/// Run the research loop for one query and return a fully populated,
/// verified record.
pub async fn search_visa_info(
    desk: &Concierge,
    query: &VisaQuery,
    progress: &dyn SearchProgress,
) -> Result<PolicyRecord> {
    let run_id = Uuid::new_v4();
    info!(
        "[{}] Visa research: {} (resident of {}) -> {} for {}",
        run_id, query.citizenship, query.residency, query.destination, query.purpose
    );

    progress.stage("Preparing consultant session");
    let mut session = desk.session(Persona::Consultant).lock().await;
    session.reset();

    let mut best: Option<PolicyRecord> = None;
    let mut critique = String::new();
    let mut attempt: u32 = 0;

    loop {
        if attempt == 0 {
            progress.stage("Searching official sources");
        } else {
            progress.stage(&format!(
                "Searching again with reviewer critique (attempt {} of {})",
                attempt + 1,
                MAX_RETRIES + 1
            ));
        }

        let prompt = if attempt == 0 {
            initial_prompt(query)
        } else {
            corrective_prompt(query, &critique)
        };

        let reply = session.run(&prompt, Some(research_schema())).await?;

        progress.stage("Reconciling source citations");
        let parsed = Parsed::<ResearchPayload>::from_json(&reply.text);
        if parsed.is_malformed() {
            warn!(
                "[{}] attempt {}: unparseable payload, degrading to defaults",
                run_id, attempt
            );
        }
        let payload = parsed.or_default();
        let sources = reconcile_sources(&payload.sources, &reply.envelope);

        progress.stage("Scoring answer quality");
        let verdict = desk
            .judge()
            .evaluate(&judged_view(&payload, &sources), &rubric(query))
            .await?;
        let verification = apply_guardrail(verdict, sources.len());

        info!(
            "[{}] attempt {}: score={:.1}, pass={}, sources={}",
            run_id,
            attempt,
            verification.score,
            verification.passed,
            sources.len()
        );

        let accepted = verification.score >= ACCEPT_SCORE;
        let record = build_record(query, payload, sources, verification);

        if accepted {
            progress.stage("Answer accepted");
            progress.stage("Research complete");
            return Ok(record);
        }

        if desk.selection() == SelectionStrategy::BestScore {
            let improves = best
                .as_ref()
                .map_or(true, |b| record.verification.score > b.verification.score);
            if improves {
                best = Some(record.clone());
            }
        }

        if attempt >= MAX_RETRIES {
            warn!(
                "[{}] retry budget exhausted at score {:.1}",
                run_id, record.verification.score
            );
            progress.stage("Retry budget exhausted - returning final attempt");
            progress.stage("Research complete");

            let chosen = match desk.selection() {
                SelectionStrategy::LastAttempt => record,
                SelectionStrategy::BestScore => best.unwrap_or(record),
            };
            return Ok(chosen);
        }

        progress.stage("Quality below bar - queuing corrective retry");
        critique = record.verification.reasoning.clone();
        attempt += 1;
    }
}

fn initial_prompt(query: &VisaQuery) -> String {
    format!(
        r#"Research the current visa and entry requirements for this traveler:

- Citizenship: {}
- Country of residence: {}
- Destination: {}
- Purpose of travel: {}

Search official government and embassy sources before answering. Report the visa status, a summary of the rules, concrete next steps, the expected processing timeline and the required documents.

The sources list is MANDATORY: cite every official page you relied on with its exact URL. An answer without sources is unusable."#,
        query.citizenship, query.residency, query.destination, query.purpose
    )
}

fn corrective_prompt(query: &VisaQuery, critique: &str) -> String {
    format!(
        r#"Your previous answer for the {} -> {} case was rejected by a reviewer. The critique, verbatim:

"{}"

Search again, specifically to close the gap the reviewer describes. Re-verify the visa status and processing timeline against official sources and return the full corrected answer in the same JSON structure, including the mandatory sources list."#,
        query.citizenship, query.destination, critique
    )
}

fn rubric(query: &VisaQuery) -> String {
    format!(
        "1. States a definitive visa status for a citizen of {} residing in {} travelling to {} for {} - not vague or hedged.\n\
         2. Gives a specific processing timeline - a number or range, not \"it varies\".\n\
         3. Cites at least one valid source URI from an official government or embassy page.",
        query.citizenship, query.residency, query.destination, query.purpose
    )
}

fn research_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "visaStatus": {
                "type": "STRING",
                "enum": ["required", "visa_free", "e_visa", "on_arrival", "unknown"]
            },
            "summary": {"type": "STRING"},
            "nextSteps": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "title": {"type": "STRING"},
                        "description": {"type": "STRING"}
                    },
                    "required": ["title", "description"]
                }
            },
            "timeline": {"type": "STRING"},
            "requirements": {"type": "ARRAY", "items": {"type": "STRING"}},
            "sources": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "title": {"type": "STRING"},
                        "uri": {"type": "STRING"}
                    },
                    "required": ["title", "uri"]
                }
            }
        },
        "required": ["visaStatus", "summary", "timeline", "sources"]
    })
}

/// What the judge sees: the payload with the post-reconciliation source
/// list, so the rubric's citation criterion matches what the caller
/// will receive.
fn judged_view(payload: &ResearchPayload, sources: &[SourceCitation]) -> String {
    serde_json::to_string_pretty(&json!({
        "visaStatus": payload.visa_status,
        "summary": payload.summary,
        "nextSteps": payload.next_steps,
        "timeline": payload.timeline,
        "requirements": payload.requirements,
        "sources": sources,
    }))
    .unwrap_or_default()
}

/// Cap unsourced answers at 5 and say why, whatever the judge thought
fn apply_guardrail(verification: Verification, source_count: usize) -> Verification {
    let mut v = verification.clamped();

    if source_count == 0 {
        if v.score > UNSOURCED_SCORE_CAP {
            v.score = UNSOURCED_SCORE_CAP;
        }
        v.passed = false;
        if !v.reasoning.is_empty() {
            v.reasoning.push(' ');
        }
        v.reasoning.push_str(MISSING_SOURCES_NOTE);
    }

    v
}

fn build_record(
    query: &VisaQuery,
    payload: ResearchPayload,
    sources: Vec<SourceCitation>,
    verification: Verification,
) -> PolicyRecord {
    PolicyRecord {
        id: Uuid::new_v4(),
        citizenship: query.citizenship.clone(),
        residency: query.residency.clone(),
        destination: query.destination.clone(),
        purpose: query.purpose.clone(),
        visa_status: payload
            .visa_status
            .as_deref()
            .map(VisaStatus::parse)
            .unwrap_or_default(),
        summary: payload
            .summary
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| FALLBACK_SUMMARY.to_string()),
        next_steps: payload.next_steps,
        timeline: payload
            .timeline
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| FALLBACK_TIMELINE.to_string()),
        requirements: payload.requirements,
        sources,
        verification,
        generated_at: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query() -> VisaQuery {
        VisaQuery::new("Canada", "Canada", "Japan", "Tourism")
    }

    #[test]
    fn test_initial_prompt_names_all_query_fields() {
        let prompt = initial_prompt(&query());
        assert!(prompt.contains("Canada"));
        assert!(prompt.contains("Japan"));
        assert!(prompt.contains("Tourism"));
        assert!(prompt.contains("MANDATORY"));
    }

    #[test]
    fn test_corrective_prompt_quotes_critique_verbatim() {
        let critique = "Timeline is vague and the only source is a travel blog.";
        let prompt = corrective_prompt(&query(), critique);

        assert!(prompt.contains(critique));
        assert_ne!(prompt, initial_prompt(&query()));
    }

    #[test]
    fn test_guardrail_caps_unsourced_scores() {
        let verdict = Verification {
            score: 9.5,
            passed: true,
            reasoning: "Reads well.".to_string(),
        };

        let capped = apply_guardrail(verdict, 0);
        assert_eq!(capped.score, 5.0);
        assert!(!capped.passed);
        assert!(capped.reasoning.contains("missing official sources"));
    }

    #[test]
    fn test_guardrail_keeps_low_unsourced_scores() {
        let verdict = Verification {
            score: 2.0,
            passed: false,
            reasoning: String::new(),
        };

        let capped = apply_guardrail(verdict, 0);
        assert_eq!(capped.score, 2.0);
        assert!(capped.reasoning.contains("missing official sources"));
    }

    #[test]
    fn test_guardrail_noop_with_sources() {
        let verdict = Verification {
            score: 9.0,
            passed: true,
            reasoning: "Solid.".to_string(),
        };

        let kept = apply_guardrail(verdict.clone(), 2);
        assert_eq!(kept, verdict);
    }

    #[test]
    fn test_guardrail_clamps_out_of_band_judge_scores() {
        let verdict = Verification {
            score: 42.0,
            passed: true,
            reasoning: String::new(),
        };

        let clamped = apply_guardrail(verdict, 3);
        assert_eq!(clamped.score, 10.0);
    }

    #[test]
    fn test_build_record_applies_defaults() {
        let record = build_record(
            &query(),
            ResearchPayload::default(),
            vec![],
            Verification::failed("evaluation failed"),
        );

        assert_eq!(record.visa_status, VisaStatus::Unknown);
        assert_eq!(record.summary, FALLBACK_SUMMARY);
        assert_eq!(record.timeline, FALLBACK_TIMELINE);
        assert!(record.next_steps.is_empty());
        assert!(record.requirements.is_empty());
        assert!(record.sources.is_empty());
    }

    #[test]
    fn test_payload_parses_camel_case() {
        let parsed = Parsed::<ResearchPayload>::from_json(
            r#"{
                "visaStatus": "e_visa",
                "summary": "Apply online.",
                "nextSteps": [{"title": "Apply", "description": "Use the portal"}],
                "timeline": "3-5 business days",
                "requirements": ["Passport"],
                "sources": [{"title": "Ministry", "uri": "https://gov.example"}]
            }"#,
        );

        let payload = parsed.value().unwrap();
        assert_eq!(payload.visa_status.as_deref(), Some("e_visa"));
        assert_eq!(payload.next_steps.len(), 1);
        assert_eq!(payload.sources.len(), 1);
    }

    #[test]
    fn test_blank_summary_falls_back() {
        let payload = ResearchPayload {
            summary: Some("   ".to_string()),
            ..ResearchPayload::default()
        };
        let record = build_record(&query(), payload, vec![], Verification::failed("x"));
        assert_eq!(record.summary, FALLBACK_SUMMARY);
    }

    #[test]
    fn test_selection_strategy_parse() {
        assert_eq!(
            SelectionStrategy::parse("best"),
            SelectionStrategy::BestScore
        );
        assert_eq!(
            SelectionStrategy::parse("BEST_SCORE"),
            SelectionStrategy::BestScore
        );
        assert_eq!(
            SelectionStrategy::parse("last"),
            SelectionStrategy::LastAttempt
        );
        assert_eq!(
            SelectionStrategy::parse(""),
            SelectionStrategy::LastAttempt
        );
    }

    #[test]
    fn test_research_schema_requires_sources() {
        let schema = research_schema();
        let required: Vec<&str> = schema["required"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|v| v.as_str())
            .collect();

        assert!(required.contains(&"visaStatus"));
        assert!(required.contains(&"sources"));
    }

    #[test]
    fn test_judged_view_shows_reconciled_sources() {
        let payload = ResearchPayload::default();
        let sources = vec![SourceCitation {
            title: "Ministry".to_string(),
            uri: "https://gov.example".to_string(),
        }];

        let view = judged_view(&payload, &sources);
        assert!(view.contains("https://gov.example"));
    }
}
