//! Configuration management

use anyhow::Result;

use crate::research::SelectionStrategy;

/// Engine configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Gemini API key (optional - checked at call time so offline
    /// construction still works)
    pub gemini_api_key: Option<String>,

    /// Model id for the persona sessions
    pub model: String,

    /// Model id for the verification judge
    pub judge_model: String,

    /// HTTP request timeout in seconds
    pub request_timeout_secs: u64,

    /// Enable lookup caching (purpose suggestions, travel advisories)
    pub cache_enabled: bool,

    /// Cache TTL in seconds
    pub cache_ttl_secs: u64,

    /// Which attempt to return when the retry budget runs out
    pub selection: SelectionStrategy,
}

const DEFAULT_MODEL: &str = "gemini-2.5-flash";

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let gemini_api_key = std::env::var("GEMINI_API_KEY").ok();

        let model =
            std::env::var("VISADO_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());

        // Judge defaults to the session model
        let judge_model =
            std::env::var("VISADO_JUDGE_MODEL").unwrap_or_else(|_| model.clone());

        let request_timeout_secs = std::env::var("VISADO_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(120);

        let cache_enabled = std::env::var("VISADO_CACHE_ENABLED")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(true);

        let cache_ttl_secs = std::env::var("VISADO_CACHE_TTL")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(3600);

        let selection = std::env::var("VISADO_SELECTION")
            .map(|v| SelectionStrategy::parse(&v))
            .unwrap_or_default();

        Ok(Self {
            gemini_api_key,
            model,
            judge_model,
            request_timeout_secs,
            cache_enabled,
            cache_ttl_secs,
            selection,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            gemini_api_key: None,
            model: DEFAULT_MODEL.to_string(),
            judge_model: DEFAULT_MODEL.to_string(),
            request_timeout_secs: 120,
            cache_enabled: true,
            cache_ttl_secs: 3600,
            selection: SelectionStrategy::default(),
        }
    }
}
