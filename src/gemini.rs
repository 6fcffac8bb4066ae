//! Gemini API Client
//!
//! Typed `generateContent` wire client with grounding-tool support:
//! - camelCase request/response structs, schema-constrained output via
//!   `generationConfig.responseSchema`
//! - search tools serialized as `{"google_search": {}}` objects
//! - full response envelope returned to callers, because grounding
//!   citations travel in `groundingMetadata` outside the text parts
//! - `GenerativeBackend` trait so orchestrators can run against a
//!   scripted backend in tests

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{Error, Result};

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// One `generateContent` request body
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<SystemInstruction>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<Tool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SystemInstruction {
    pub parts: Vec<Part>,
}

impl SystemInstruction {
    pub fn from_text(text: &str) -> Self {
        Self {
            parts: vec![Part::text(text)],
        }
    }
}

/// One conversation turn; role is "user" or "model"
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Content {
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub parts: Vec<Part>,
}

impl Content {
    pub fn user(parts: Vec<Part>) -> Self {
        Self {
            role: "user".to_string(),
            parts,
        }
    }

    pub fn model(text: &str) -> Self {
        Self {
            role: "model".to_string(),
            parts: vec![Part::text(text)],
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<InlineData>,
}

impl Part {
    pub fn text(text: &str) -> Self {
        Self {
            text: Some(text.to_string()),
            inline_data: None,
        }
    }

    /// Base64-encoded media part
    pub fn inline_data(mime_type: &str, data: String) -> Self {
        Self {
            text: None,
            inline_data: Some(InlineData {
                mime_type: mime_type.to_string(),
                data,
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    pub data: String,
}

/// Grounding tool declaration; exactly one config per entry, so a
/// request carries `[{"google_search": {}}, {"google_maps": {}}]`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Tool {
    #[serde(rename = "google_search", skip_serializing_if = "Option::is_none")]
    google_search: Option<ToolConfig>,
    #[serde(rename = "google_maps", skip_serializing_if = "Option::is_none")]
    google_maps: Option<ToolConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ToolConfig {}

impl Tool {
    pub fn google_search() -> Self {
        Self {
            google_search: Some(ToolConfig {}),
            google_maps: None,
        }
    }

    pub fn google_maps() -> Self {
        Self {
            google_search: None,
            google_maps: Some(ToolConfig {}),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_schema: Option<Value>,
}

impl GenerationConfig {
    /// Constrain the response to a JSON schema
    pub fn json(schema: Value) -> Self {
        Self {
            response_mime_type: Some("application/json".to_string()),
            response_schema: Some(schema),
            ..Self::default()
        }
    }
}

/// Full `generateContent` response envelope
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GenerateResponse {
    pub candidates: Vec<Candidate>,
    pub usage_metadata: Option<UsageMetadata>,
    pub model_version: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Candidate {
    pub content: Option<Content>,
    pub finish_reason: Option<String>,
    pub grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GroundingMetadata {
    pub grounding_chunks: Vec<GroundingChunk>,
    pub web_search_queries: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GroundingChunk {
    pub web: Option<WebSource>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WebSource {
    pub uri: Option<String>,
    pub title: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UsageMetadata {
    pub prompt_token_count: u32,
    pub candidates_token_count: u32,
    pub total_token_count: u32,
}

impl GenerateResponse {
    /// Concatenated text of the first candidate's parts
    pub fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<Vec<_>>()
                    .join("\n")
            })
            .unwrap_or_default()
    }

    /// Grounding chunks of the first candidate, empty when the model
    /// did not search
    pub fn grounding_chunks(&self) -> &[GroundingChunk] {
        self.candidates
            .first()
            .and_then(|c| c.grounding_metadata.as_ref())
            .map(|g| g.grounding_chunks.as_slice())
            .unwrap_or(&[])
    }
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

/// Anything that can answer a `generateContent` request. Production
/// uses `GeminiClient`; tests use a scripted fake.
#[async_trait]
pub trait GenerativeBackend: Send + Sync {
    async fn generate(&self, model: &str, request: GenerateRequest) -> Result<GenerateResponse>;
}

/// Gemini REST client
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: Option<String>,
}

impl GeminiClient {
    pub fn new(api_key: Option<&str>, timeout_secs: u64) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            api_key: api_key.map(|s| s.to_string()),
        }
    }

    /// Create from config
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.gemini_api_key.as_deref(), config.request_timeout_secs)
    }

    /// Check if API key is configured
    pub fn is_available(&self) -> bool {
        self.api_key.is_some()
    }

    fn api_url(&self, model: &str, api_key: &str) -> String {
        format!("{}/{}:generateContent?key={}", GEMINI_API_BASE, model, api_key)
    }
}

#[async_trait]
impl GenerativeBackend for GeminiClient {
    async fn generate(&self, model: &str, request: GenerateRequest) -> Result<GenerateResponse> {
        let api_key = self.api_key.as_ref().ok_or(Error::MissingApiKey)?;

        debug!(
            "Calling Gemini: model={}, turns={}, tools={}",
            model,
            request.contents.len(),
            request.tools.len()
        );

        let response = self
            .client
            .post(self.api_url(model, api_key))
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "failed to read error body".to_string());
            let message = serde_json::from_str::<ErrorEnvelope>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            warn!("Gemini API error {}: {}", status, message);
            return Err(Error::Api { status, message });
        }

        let envelope: GenerateResponse = response
            .json()
            .await
            .map_err(|e| Error::InvalidResponse(e.to_string()))?;

        if envelope.candidates.is_empty() {
            return Err(Error::EmptyResponse);
        }

        if let Some(usage) = &envelope.usage_metadata {
            info!(
                "Gemini response: model={}, in={}, out={}, total={}",
                envelope.model_version.as_deref().unwrap_or(model),
                usage.prompt_token_count,
                usage.candidates_token_count,
                usage.total_token_count
            );
        }

        Ok(envelope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tool_serialization() {
        let search = serde_json::to_value(Tool::google_search()).unwrap();
        assert_eq!(search, json!({"google_search": {}}));

        let maps = serde_json::to_value(Tool::google_maps()).unwrap();
        assert_eq!(maps, json!({"google_maps": {}}));
    }

    #[test]
    fn test_availability_tracks_api_key() {
        assert!(!GeminiClient::new(None, 5).is_available());
        assert!(GeminiClient::new(Some("test-key"), 5).is_available());
    }

    #[test]
    fn test_request_wire_casing() {
        let request = GenerateRequest {
            contents: vec![Content::user(vec![Part::text("hi")])],
            system_instruction: Some(SystemInstruction::from_text("be brief")),
            tools: vec![Tool::google_search()],
            generation_config: Some(GenerationConfig::json(json!({"type": "OBJECT"}))),
        };

        let value = serde_json::to_value(&request).unwrap();
        assert!(value.get("systemInstruction").is_some());
        assert!(value.get("generationConfig").is_some());
        let config = &value["generationConfig"];
        assert_eq!(config["responseMimeType"], "application/json");
        assert!(config.get("responseSchema").is_some());
        assert_eq!(value["tools"][0], json!({"google_search": {}}));
    }

    #[test]
    fn test_empty_tools_omitted() {
        let request = GenerateRequest {
            contents: vec![Content::user(vec![Part::text("hi")])],
            system_instruction: None,
            tools: vec![],
            generation_config: None,
        };

        let value = serde_json::to_value(&request).unwrap();
        assert!(value.get("tools").is_none());
    }

    #[test]
    fn test_inline_data_casing() {
        let part = Part::inline_data("image/png", "aGk=".to_string());
        let value = serde_json::to_value(&part).unwrap();
        assert_eq!(value["inlineData"]["mimeType"], "image/png");
        assert_eq!(value["inlineData"]["data"], "aGk=");
    }

    #[test]
    fn test_response_text_joins_parts() {
        let envelope: GenerateResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [{"text": "first"}, {"text": "second"}]
                }
            }]
        }))
        .unwrap();

        assert_eq!(envelope.text(), "first\nsecond");
    }

    #[test]
    fn test_grounding_chunks_accessor() {
        let envelope: GenerateResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "ok"}]},
                "groundingMetadata": {
                    "groundingChunks": [
                        {"web": {"uri": "https://example.gov", "title": "Example"}}
                    ],
                    "webSearchQueries": ["visa rules"]
                }
            }]
        }))
        .unwrap();

        assert_eq!(envelope.grounding_chunks().len(), 1);
    }

    #[test]
    fn test_bare_envelope_defaults() {
        let envelope: GenerateResponse = serde_json::from_value(json!({})).unwrap();
        assert!(envelope.candidates.is_empty());
        assert_eq!(envelope.text(), "");
        assert!(envelope.grounding_chunks().is_empty());
    }
}
