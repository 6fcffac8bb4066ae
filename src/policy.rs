//! Visa Policy Records
//!
//! Domain types for a research run: the query, the verified record it
//! produces, and the closed visa-status vocabulary. Records returned to
//! callers are always fully populated; absent model fields are filled
//! with the explicit fallbacks defined here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::judge::Verification;
use crate::sources::SourceCitation;

/// Placeholder when the model returned no usable summary
pub const FALLBACK_SUMMARY: &str = "No summary available.";

/// Placeholder when the model returned no processing timeline
pub const FALLBACK_TIMELINE: &str = "Processing timeline unavailable.";

/// What the caller wants researched
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisaQuery {
    pub citizenship: String,
    pub residency: String,
    pub destination: String,
    pub purpose: String,
}

impl VisaQuery {
    pub fn new(citizenship: &str, residency: &str, destination: &str, purpose: &str) -> Self {
        Self {
            citizenship: citizenship.to_string(),
            residency: residency.to_string(),
            destination: destination.to_string(),
            purpose: purpose.to_string(),
        }
    }
}

/// Closed visa-status vocabulary. Anything the model emits outside the
/// known wire strings parses to `Unknown` - never to an error and never
/// to a free-form string leaking through.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum VisaStatus {
    Required,
    VisaFree,
    EVisa,
    OnArrival,
    #[default]
    Unknown,
}

impl VisaStatus {
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "required" | "visa_required" => VisaStatus::Required,
            "visa_free" | "not_required" => VisaStatus::VisaFree,
            "e_visa" | "evisa" => VisaStatus::EVisa,
            "on_arrival" | "visa_on_arrival" => VisaStatus::OnArrival,
            _ => VisaStatus::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            VisaStatus::Required => "required",
            VisaStatus::VisaFree => "visa_free",
            VisaStatus::EVisa => "e_visa",
            VisaStatus::OnArrival => "on_arrival",
            VisaStatus::Unknown => "unknown",
        }
    }

    /// Display wording
    pub fn label(&self) -> &'static str {
        match self {
            VisaStatus::Required => "Visa required",
            VisaStatus::VisaFree => "Visa-free entry",
            VisaStatus::EVisa => "Electronic visa (e-Visa)",
            VisaStatus::OnArrival => "Visa on arrival",
            VisaStatus::Unknown => "Status unknown",
        }
    }
}

impl Serialize for VisaStatus {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for VisaStatus {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(VisaStatus::parse(&s))
    }
}

/// One actionable step toward the visa
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NextStep {
    pub title: String,
    pub description: String,
}

/// Verified research result, fully populated
#[derive(Debug, Clone, Serialize)]
pub struct PolicyRecord {
    pub id: Uuid,
    pub citizenship: String,
    pub residency: String,
    pub destination: String,
    pub purpose: String,
    pub visa_status: VisaStatus,
    pub summary: String,
    pub next_steps: Vec<NextStep>,
    pub timeline: String,
    pub requirements: Vec<String>,
    pub sources: Vec<SourceCitation>,
    pub verification: Verification,
    pub generated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parse_known_values() {
        assert_eq!(VisaStatus::parse("required"), VisaStatus::Required);
        assert_eq!(VisaStatus::parse("visa_free"), VisaStatus::VisaFree);
        assert_eq!(VisaStatus::parse("e_visa"), VisaStatus::EVisa);
        assert_eq!(VisaStatus::parse("on_arrival"), VisaStatus::OnArrival);
        assert_eq!(VisaStatus::parse("unknown"), VisaStatus::Unknown);
    }

    #[test]
    fn test_status_parse_tolerates_casing_and_hyphens() {
        assert_eq!(VisaStatus::parse("Visa-Free"), VisaStatus::VisaFree);
        assert_eq!(VisaStatus::parse("  REQUIRED "), VisaStatus::Required);
        assert_eq!(VisaStatus::parse("eVisa"), VisaStatus::EVisa);
    }

    #[test]
    fn test_status_parse_rejects_unrecognized() {
        assert_eq!(VisaStatus::parse("maybe"), VisaStatus::Unknown);
        assert_eq!(VisaStatus::parse(""), VisaStatus::Unknown);
        assert_eq!(VisaStatus::parse("granted"), VisaStatus::Unknown);
    }

    #[test]
    fn test_status_serde_round() {
        let json = serde_json::to_string(&VisaStatus::OnArrival).unwrap();
        assert_eq!(json, "\"on_arrival\"");

        let status: VisaStatus = serde_json::from_str("\"e_visa\"").unwrap();
        assert_eq!(status, VisaStatus::EVisa);

        let unknown: VisaStatus = serde_json::from_str("\"whatever\"").unwrap();
        assert_eq!(unknown, VisaStatus::Unknown);
    }

    #[test]
    fn test_labels_are_distinct() {
        let labels = [
            VisaStatus::Required.label(),
            VisaStatus::VisaFree.label(),
            VisaStatus::EVisa.label(),
            VisaStatus::OnArrival.label(),
            VisaStatus::Unknown.label(),
        ];
        let unique: std::collections::HashSet<_> = labels.iter().collect();
        assert_eq!(unique.len(), labels.len());
    }
}
