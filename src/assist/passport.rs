//! Passport field extraction
//!
//! One multimodal Drafter call against a document photo. Every field is
//! nullable, scans are often partly illegible, but a result carrying
//! neither the holder's name nor the passport number identifies nobody
//! and is reported as a failed extraction rather than returned.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use crate::concierge::{Concierge, Persona};
use crate::error::{Error, Result};
use crate::gemini::Part;
use crate::parse::Parsed;

const EXTRACTION_PROMPT: &str =
    "Read this passport photo and return the holder's details as JSON with the fields \
     fullName, passportNumber, dateOfBirth (YYYY-MM-DD), passportExpiry (YYYY-MM-DD) \
     and nationality. Use null for any field you cannot read with confidence. Do not \
     guess.";

/// Identity fields read off a passport photo. Any field may be null
/// when illegible; the core never persists these.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PassportDetails {
    pub full_name: Option<String>,
    pub passport_number: Option<String>,
    pub date_of_birth: Option<String>,
    pub passport_expiry: Option<String>,
    pub nationality: Option<String>,
}

impl PassportDetails {
    /// True when at least one identity anchor (name or number) was read
    pub fn identified(&self) -> bool {
        has_value(&self.full_name) || has_value(&self.passport_number)
    }
}

fn has_value(field: &Option<String>) -> bool {
    field.as_deref().map_or(false, |s| !s.trim().is_empty())
}

/// Extract identity fields from an encoded document image. Partial
/// results are fine; a result with neither anchor fails with
/// [`Error::ExtractionFailed`].
pub async fn extract_passport(
    desk: &Concierge,
    image_bytes: &[u8],
    mime_type: &str,
) -> Result<PassportDetails> {
    debug!(
        "Passport extraction: {} bytes, {}",
        image_bytes.len(),
        mime_type
    );

    let parts = vec![
        Part::text(EXTRACTION_PROMPT),
        Part::inline_data(mime_type, BASE64.encode(image_bytes)),
    ];

    let reply = {
        let mut session = desk.session(Persona::Drafter).lock().await;
        session.reset();
        session
            .run_with_parts(parts, Some(passport_schema()))
            .await?
    };

    let details = Parsed::<PassportDetails>::from_json(&reply.text).or_default();

    if !details.identified() {
        return Err(Error::ExtractionFailed);
    }

    Ok(details)
}

fn passport_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "fullName": {"type": "STRING", "nullable": true},
            "passportNumber": {"type": "STRING", "nullable": true},
            "dateOfBirth": {"type": "STRING", "nullable": true},
            "passportExpiry": {"type": "STRING", "nullable": true},
            "nationality": {"type": "STRING", "nullable": true}
        }
    })
}
