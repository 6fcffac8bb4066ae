//! Generative Session
//!
//! One persona's conversation state: model id, system instruction,
//! tool set and the ordered turn history. `run` replays the full
//! history on every request (the wire protocol is stateless), returns
//! the reply text plus the raw envelope, and extends the history only
//! on success. No retry logic lives here.
//!
//! `reset()` must be called before every logically independent task on
//! the same persona; leftover turns bleed into later answers otherwise.

use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::error::Result;
use crate::gemini::{
    Content, GenerateRequest, GenerateResponse, GenerationConfig, GenerativeBackend, Part,
    SystemInstruction, Tool,
};

/// One completed session turn
#[derive(Debug, Clone)]
pub struct SessionReply {
    pub text: String,
    /// Full response envelope; grounding citations live here
    pub envelope: GenerateResponse,
}

pub struct ChatSession {
    backend: Arc<dyn GenerativeBackend>,
    model: String,
    system_instruction: String,
    tools: Vec<Tool>,
    temperature: Option<f32>,
    history: Vec<Content>,
}

impl ChatSession {
    pub fn new(
        backend: Arc<dyn GenerativeBackend>,
        model: &str,
        system_instruction: &str,
        tools: Vec<Tool>,
    ) -> Self {
        Self {
            backend,
            model: model.to_string(),
            system_instruction: system_instruction.to_string(),
            tools,
            temperature: None,
            history: Vec::new(),
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Drop all conversation state
    pub fn reset(&mut self) {
        self.history.clear();
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Send a text prompt; with a schema the response is constrained to
    /// `application/json`
    pub async fn run(&mut self, prompt: &str, schema: Option<Value>) -> Result<SessionReply> {
        self.run_with_parts(vec![Part::text(prompt)], schema).await
    }

    /// Multimodal variant (text + inline media parts)
    pub async fn run_with_parts(
        &mut self,
        parts: Vec<Part>,
        schema: Option<Value>,
    ) -> Result<SessionReply> {
        let user_turn = Content::user(parts);

        let mut contents = self.history.clone();
        contents.push(user_turn.clone());

        let generation_config = match schema {
            Some(schema) => Some(GenerationConfig {
                temperature: self.temperature,
                ..GenerationConfig::json(schema)
            }),
            None => self.temperature.map(|t| GenerationConfig {
                temperature: Some(t),
                ..GenerationConfig::default()
            }),
        };

        let request = GenerateRequest {
            contents,
            system_instruction: Some(SystemInstruction::from_text(&self.system_instruction)),
            tools: self.tools.clone(),
            generation_config,
        };

        debug!(
            "Session turn: model={}, prior_turns={}",
            self.model,
            self.history.len()
        );

        let envelope = self.backend.generate(&self.model, request).await?;
        let text = envelope.text();

        // Commit the exchange only after a successful round trip; a
        // failed call must not leave a half-recorded turn behind.
        self.history.push(user_turn);
        self.history.push(Content::model(&text));

        Ok(SessionReply { text, envelope })
    }
}
