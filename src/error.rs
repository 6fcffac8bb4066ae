//! Crate Error Taxonomy
//!
//! Splits failures along the lines the orchestrators care about:
//! - Transport/API/envelope failures are fatal for the invocation and
//!   propagate to the caller.
//! - Malformed *content* inside a well-formed envelope is NOT an error
//!   here; it degrades to defaults via `parse::Parsed`.
//! - `ExtractionFailed` is the one content-level failure promoted to an
//!   error, because for document extraction absence IS the signal.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("GEMINI_API_KEY not set - generative features unavailable")]
    MissingApiKey,

    #[error("Gemini API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("request to Gemini failed: {0}")]
    Transport(String),

    #[error("malformed Gemini response: {0}")]
    InvalidResponse(String),

    #[error("Gemini returned no candidates")]
    EmptyResponse,

    #[error("could not extract traveler details from the document image")]
    ExtractionFailed,
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Error::Transport(format!("request timed out: {}", err))
        } else {
            Error::Transport(err.to_string())
        }
    }
}
