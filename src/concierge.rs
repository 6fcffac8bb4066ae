//! Concierge Desk (Persona Registry)
//!
//! The three fixed personas behind every orchestrator call:
//! - Consultant - search-grounded visa research (google_search + google_maps)
//! - Advisor - safety and etiquette advisories (google_search)
//! - Drafter - deterministic checklist/document/extraction work (no tools)
//!
//! `Concierge` bundles the persona sessions, the verification judge and
//! the lookup cache into one explicitly constructed context object;
//! orchestrator functions borrow it instead of reaching for globals.
//! The persona set is closed and configured once at startup.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::cache::{CacheStats, LookupCache};
use crate::config::Config;
use crate::gemini::{GeminiClient, GenerativeBackend, Tool};
use crate::judge::Judge;
use crate::research::SelectionStrategy;
use crate::session::ChatSession;

const CACHE_MAX_ENTRIES: u64 = 256;

/// Drafter runs near-deterministic so repeated drafts stay consistent
const DRAFTER_TEMPERATURE: f32 = 0.2;

/// Fixed persona set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Persona {
    /// Visa research with mandatory web verification
    Consultant,
    /// Soft-context safety and etiquette advisories
    Advisor,
    /// Checklists, documents and field extraction
    Drafter,
}

impl Persona {
    pub fn name(&self) -> &'static str {
        match self {
            Persona::Consultant => "consultant",
            Persona::Advisor => "advisor",
            Persona::Drafter => "drafter",
        }
    }

    /// Get the persona's system prompt
    pub fn system_prompt(&self) -> &'static str {
        match self {
            Persona::Consultant => CONSULTANT_PROMPT,
            Persona::Advisor => ADVISOR_PROMPT,
            Persona::Drafter => DRAFTER_PROMPT,
        }
    }

    /// Grounding tools enabled for this persona
    pub fn tools(&self) -> Vec<Tool> {
        match self {
            Persona::Consultant => vec![Tool::google_search(), Tool::google_maps()],
            Persona::Advisor => vec![Tool::google_search()],
            Persona::Drafter => vec![],
        }
    }

    fn temperature(&self) -> Option<f32> {
        match self {
            Persona::Drafter => Some(DRAFTER_TEMPERATURE),
            _ => None,
        }
    }
}

/// Shared context for all orchestrator functions
pub struct Concierge {
    consultant: Mutex<ChatSession>,
    advisor: Mutex<ChatSession>,
    drafter: Mutex<ChatSession>,
    judge: Judge,
    cache: LookupCache,
    selection: SelectionStrategy,
}

impl Concierge {
    /// Wire the personas, judge and cache over any backend
    pub fn new(backend: Arc<dyn GenerativeBackend>, config: &Config) -> Self {
        let session = |persona: Persona| {
            debug!(
                "Configured {} persona: model={}, tools={}",
                persona.name(),
                config.model,
                persona.tools().len()
            );
            let mut s = ChatSession::new(
                backend.clone(),
                &config.model,
                persona.system_prompt(),
                persona.tools(),
            );
            if let Some(t) = persona.temperature() {
                s = s.with_temperature(t);
            }
            Mutex::new(s)
        };

        Self {
            consultant: session(Persona::Consultant),
            advisor: session(Persona::Advisor),
            drafter: session(Persona::Drafter),
            judge: Judge::new(backend.clone(), &config.judge_model),
            cache: LookupCache::new(
                CACHE_MAX_ENTRIES,
                config.cache_ttl_secs,
                config.cache_enabled,
            ),
            selection: config.selection,
        }
    }

    /// Production constructor over the Gemini REST client
    pub fn from_config(config: &Config) -> Self {
        let client = GeminiClient::from_config(config);
        if !client.is_available() {
            warn!("GEMINI_API_KEY not set - live requests will fail");
        }
        Self::new(Arc::new(client), config)
    }

    pub(crate) fn session(&self, persona: Persona) -> &Mutex<ChatSession> {
        match persona {
            Persona::Consultant => &self.consultant,
            Persona::Advisor => &self.advisor,
            Persona::Drafter => &self.drafter,
        }
    }

    pub(crate) fn judge(&self) -> &Judge {
        &self.judge
    }

    pub(crate) fn cache(&self) -> &LookupCache {
        &self.cache
    }

    pub(crate) fn selection(&self) -> SelectionStrategy {
        self.selection
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }
}

// ============================================================================
// PERSONA SYSTEM PROMPTS
// ============================================================================

const CONSULTANT_PROMPT: &str = r#"You are a senior immigration consultant advising travelers on visa and entry requirements worldwide.

## Working Rules

1. NEVER assert an entry requirement from memory - verify with a web search first
2. Prefer official sources: government immigration portals, embassy and consulate pages, IATA
3. Account for BOTH citizenship and country of residence - residency changes the answer for many corridors
4. If official sources disagree, say so and cite both
5. Never invent URLs; cite only pages your search actually returned
6. Use map lookups to name the nearest embassy or visa application center when steps require an in-person visit

Answer in the exact JSON structure requested. Leave a field empty rather than guessing.
"#;

const ADVISOR_PROMPT: &str = r#"You are a travel advisory assistant covering safety, local laws, customs and etiquette.

Ground any advice that may have changed recently (security situation, local regulations) in a web search. Keep each tip short, concrete and specific to the destination. Skip generic filler like "be respectful of local customs".
"#;

const DRAFTER_PROMPT: &str = r#"You are a meticulous drafting assistant for visa application paperwork.

Rules:
- Use only the facts you are given; never invent names, dates or numbers
- Keep the tone formal and plain, with no embellishment
- Follow the requested output structure exactly
- When a value is missing or illegible, leave it out rather than guessing
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, Result};
    use crate::gemini::{GenerateRequest, GenerateResponse};

    struct NullBackend;

    #[async_trait::async_trait]
    impl GenerativeBackend for NullBackend {
        async fn generate(
            &self,
            _model: &str,
            _request: GenerateRequest,
        ) -> Result<GenerateResponse> {
            Err(Error::EmptyResponse)
        }
    }

    #[test]
    fn test_persona_prompts_distinct() {
        let prompts = [
            Persona::Consultant.system_prompt(),
            Persona::Advisor.system_prompt(),
            Persona::Drafter.system_prompt(),
        ];

        for prompt in prompts {
            assert!(!prompt.trim().is_empty());
        }
        assert_ne!(prompts[0], prompts[1]);
        assert_ne!(prompts[1], prompts[2]);
        assert_ne!(prompts[0], prompts[2]);
    }

    #[test]
    fn test_persona_tool_sets() {
        assert_eq!(Persona::Consultant.tools().len(), 2);
        assert_eq!(Persona::Advisor.tools().len(), 1);
        assert!(Persona::Drafter.tools().is_empty());

        assert_eq!(Persona::Advisor.tools()[0], Tool::google_search());
    }

    #[test]
    fn test_persona_names() {
        assert_eq!(Persona::Consultant.name(), "consultant");
        assert_eq!(Persona::Advisor.name(), "advisor");
        assert_eq!(Persona::Drafter.name(), "drafter");
    }

    #[tokio::test]
    async fn test_personas_lock_independently() {
        let desk = Concierge::new(Arc::new(NullBackend), &Config::default());

        let consultant = desk.session(Persona::Consultant).try_lock();
        let advisor = desk.session(Persona::Advisor).try_lock();
        let drafter = desk.session(Persona::Drafter).try_lock();

        assert!(consultant.is_ok());
        assert!(advisor.is_ok());
        assert!(drafter.is_ok());
    }
}
