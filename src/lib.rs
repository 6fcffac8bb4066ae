//! Visado - Self-Correcting Visa Research Engine
//!
//! Visa and entry-requirement research over the Gemini API, with a
//! quality gate the model cannot talk its way past.
//!
//! # Features
//!
//! - **Persona Swarm**: three fixed (model, instruction, tools) roles -
//!   Consultant (search + maps), Advisor (search), Drafter (no tools)
//! - **Self-Correction**: bounded retry loop that quotes the reviewer's
//!   critique back at the model until the score clears the bar
//! - **Source Reconciliation**: explicit citations merged with search
//!   grounding metadata, URI-unique, first occurrence wins
//! - **Independent Judge**: stateless rubric scoring with a fail-safe
//!   zero verdict when its own output is malformed
//! - **Guardrail**: unsourced answers capped at 5/10 no matter what the
//!   judge concluded
//! - **One-Shot Tasks**: purpose suggestions, travel advisories,
//!   document checklists, prose drafting, passport extraction
//! - **Lookup Caching**: SHA256-keyed moka cache for the pure lookups
//!
//! # Architecture
//!
//! ```text
//! caller ──► research::search_visa_info ──► Concierge ──► Gemini API
//!                    │                          │
//!                    │                          ├── ChatSession (one per persona)
//!                    │                          ├── Judge (stateless)
//!                    │                          └── LookupCache (moka)
//!                    ├── sources::reconcile_sources
//!                    └── assist::* (one-shot tasks)
//! ```

pub mod assist;
pub mod cache;
pub mod concierge;
pub mod config;
pub mod error;
pub mod gemini;
pub mod judge;
pub mod parse;
pub mod policy;
pub mod research;
pub mod session;
pub mod sources;

pub use cache::{CacheStats, LookupCache};
pub use concierge::{Concierge, Persona};
pub use config::Config;
pub use error::{Error, Result};
pub use gemini::{GeminiClient, GenerativeBackend};
pub use judge::{Judge, Verification};
pub use parse::Parsed;
pub use policy::{NextStep, PolicyRecord, VisaQuery, VisaStatus};
pub use research::{search_visa_info, NoProgress, ProgressFn, SearchProgress, SelectionStrategy};
pub use session::{ChatSession, SessionReply};
pub use sources::{reconcile_sources, SourceCitation};
