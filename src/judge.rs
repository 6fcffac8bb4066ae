//! Verification Judge
//!
//! LLM-as-judge quality gate: one stateless schema-constrained call
//! scoring a candidate answer against a rubric. The judge is a gate,
//! not a required value - when its own output cannot be parsed the
//! verdict degrades to zero-confidence instead of crashing the run.
//! Transport and API failures still propagate.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::error::Result;
use crate::gemini::{
    Content, GenerateRequest, GenerationConfig, GenerativeBackend, Part, SystemInstruction,
};
use crate::parse::Parsed;

/// Judge verdict for one candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verification {
    /// Requested range 1-10; not contractually bounded, callers clamp
    pub score: f64,
    #[serde(rename = "pass")]
    pub passed: bool,
    pub reasoning: String,
}

impl Verification {
    /// Fail-safe verdict used when the judge's own output is unusable
    pub fn failed(reasoning: &str) -> Self {
        Self {
            score: 0.0,
            passed: false,
            reasoning: reasoning.to_string(),
        }
    }

    /// Clamp the score into the 0-10 band
    pub fn clamped(mut self) -> Self {
        self.score = self.score.clamp(0.0, 10.0);
        self
    }
}

const JUDGE_SYSTEM_PROMPT: &str = "You are a strict quality reviewer. \
Score the candidate content against the rubric you are given. \
Be critical: reserve scores of 8 or above for answers that satisfy every rubric point. \
Respond with JSON only.";

/// Stateless scoring client; independent of any persona session
pub struct Judge {
    backend: Arc<dyn GenerativeBackend>,
    model: String,
}

impl Judge {
    pub fn new(backend: Arc<dyn GenerativeBackend>, model: &str) -> Self {
        Self {
            backend,
            model: model.to_string(),
        }
    }

    /// Score `content` against `rubric`. Returns `Err` only for
    /// transport/API failures; a malformed verdict yields the fail-safe
    /// zero-confidence result.
    pub async fn evaluate(&self, content: &str, rubric: &str) -> Result<Verification> {
        let prompt = format!(
            r#"Rubric - the content is acceptable only if it satisfies all of the following:
{}

Candidate content:
{}

Score the candidate from 1 to 10 against the rubric. Return JSON:
{{"score": <number>, "pass": <true if score >= 8>, "reasoning": "<one paragraph naming each rubric point met or missed>"}}"#,
            rubric, content
        );

        let request = GenerateRequest {
            contents: vec![Content::user(vec![Part::text(&prompt)])],
            system_instruction: Some(SystemInstruction::from_text(JUDGE_SYSTEM_PROMPT)),
            tools: vec![],
            generation_config: Some(GenerationConfig::json(verdict_schema())),
        };

        let envelope = self.backend.generate(&self.model, request).await?;
        let verdict = parse_verdict(&envelope.text());

        debug!(
            "Judge verdict: score={:.1}, pass={}",
            verdict.score, verdict.passed
        );

        Ok(verdict)
    }
}

fn verdict_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "score": {"type": "NUMBER"},
            "pass": {"type": "BOOLEAN"},
            "reasoning": {"type": "STRING"}
        },
        "required": ["score", "pass", "reasoning"]
    })
}

/// Parse the judge's text into a verdict, failing safe on any shape
/// the schema should have prevented
pub(crate) fn parse_verdict(text: &str) -> Verification {
    match Parsed::<Verification>::from_json(text) {
        Parsed::Value(verdict) => verdict,
        Parsed::Malformed(raw) => {
            warn!(
                "Judge output unparseable, failing safe: {}",
                raw.chars().take(200).collect::<String>()
            );
            Verification::failed("evaluation failed")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_verdict_well_formed() {
        let verdict =
            parse_verdict(r#"{"score": 8.5, "pass": true, "reasoning": "all points met"}"#);
        assert_eq!(verdict.score, 8.5);
        assert!(verdict.passed);
        assert_eq!(verdict.reasoning, "all points met");
    }

    #[test]
    fn test_parse_verdict_fenced() {
        let verdict =
            parse_verdict("```json\n{\"score\": 4, \"pass\": false, \"reasoning\": \"no sources\"}\n```");
        assert_eq!(verdict.score, 4.0);
        assert!(!verdict.passed);
    }

    #[test]
    fn test_parse_verdict_fails_safe() {
        let verdict = parse_verdict("I think this looks pretty good overall!");
        assert_eq!(verdict.score, 0.0);
        assert!(!verdict.passed);
        assert_eq!(verdict.reasoning, "evaluation failed");
    }

    #[test]
    fn test_parse_verdict_empty_fails_safe() {
        let verdict = parse_verdict("");
        assert_eq!(verdict.score, 0.0);
        assert!(!verdict.passed);
    }

    #[test]
    fn test_clamp_out_of_band_scores() {
        let high = Verification {
            score: 42.0,
            passed: true,
            reasoning: String::new(),
        };
        assert_eq!(high.clamped().score, 10.0);

        let low = Verification {
            score: -3.0,
            passed: false,
            reasoning: String::new(),
        };
        assert_eq!(low.clamped().score, 0.0);
    }

    #[test]
    fn test_verdict_schema_fields() {
        let schema = verdict_schema();
        assert_eq!(schema["type"], "OBJECT");
        assert!(schema["properties"].get("score").is_some());
        assert!(schema["properties"].get("pass").is_some());
        assert!(schema["properties"].get("reasoning").is_some());
    }
}
