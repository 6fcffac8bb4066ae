//! One-Shot Concierge Tasks
//!
//! Single request/response orchestrators, one persona each:
//! - Purpose suggestion (Consultant, cached)
//! - Travel advisory (Advisor, cached, safe to run alongside research)
//! - Document checklist (Drafter)
//! - Document drafting (Drafter, free prose)
//! - Passport field extraction (Drafter, multimodal)
//!
//! All are schema-constrained except drafting, and all parse
//! defensively: empty or malformed text degrades to an empty default
//! instead of an error. Passport extraction is the one exception, where
//! a missing identity anchor is itself the failure signal.

pub mod advisory;
pub mod checklist;
pub mod drafting;
pub mod passport;
pub mod purposes;

pub use advisory::{travel_advisory, AdvisoryTip};
pub use checklist::{generate_checklist, ChecklistItem};
pub use drafting::{generate_document, DocumentKind};
pub use passport::{extract_passport, PassportDetails};
pub use purposes::{suggest_purposes, PurposeOption};
