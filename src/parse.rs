//! Defensive Response Parsing
//!
//! Model output is JSON by request but not by guarantee: it arrives
//! fenced, wrapped in prose, truncated, or empty. `Parsed<T>` makes the
//! outcome explicit instead of burying a fallback inside each caller:
//! orchestrators decide per call site whether `Malformed` degrades to a
//! default or counts as failure.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::DeserializeOwned;

static FENCE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^\s*```[a-zA-Z0-9_-]*\s*\n?(.*?)\n?\s*```\s*$").unwrap());

/// Outcome of parsing model text into a typed value
#[derive(Debug, Clone, PartialEq)]
pub enum Parsed<T> {
    Value(T),
    /// Unparseable; carries the raw text for logging and critique
    Malformed(String),
}

impl<T: DeserializeOwned> Parsed<T> {
    /// Parse model text: strip fences, try direct parse, then recover a
    /// JSON object or array embedded in surrounding prose.
    pub fn from_json(text: &str) -> Self {
        let stripped = strip_code_fences(text);

        if stripped.is_empty() {
            return Parsed::Malformed(text.to_string());
        }

        if let Ok(value) = serde_json::from_str(stripped) {
            return Parsed::Value(value);
        }

        if let Some(slice) = extract_json_object(stripped) {
            if let Ok(value) = serde_json::from_str(slice) {
                return Parsed::Value(value);
            }
        }

        if let Some(slice) = extract_json_array(stripped) {
            if let Ok(value) = serde_json::from_str(slice) {
                return Parsed::Value(value);
            }
        }

        Parsed::Malformed(text.to_string())
    }
}

impl<T> Parsed<T> {
    pub fn is_malformed(&self) -> bool {
        matches!(self, Parsed::Malformed(_))
    }

    pub fn value(self) -> Option<T> {
        match self {
            Parsed::Value(v) => Some(v),
            Parsed::Malformed(_) => None,
        }
    }

    /// Degrade a malformed payload to the type's empty default
    pub fn or_default(self) -> T
    where
        T: Default,
    {
        match self {
            Parsed::Value(v) => v,
            Parsed::Malformed(_) => T::default(),
        }
    }
}

/// Strip a surrounding Markdown code fence (with or without a language
/// tag); returns the trimmed inner text
pub fn strip_code_fences(text: &str) -> &str {
    match FENCE_RE.captures(text) {
        Some(caps) => match caps.get(1) {
            Some(m) => m.as_str().trim(),
            None => text.trim(),
        },
        None => text.trim(),
    }
}

/// Extract the first balanced JSON object from text
pub fn extract_json_object(s: &str) -> Option<&str> {
    let start = s.find('{')?;
    let mut depth = 0;
    let mut end = start;

    for (i, c) in s[start..].char_indices() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    end = start + i + 1;
                    break;
                }
            }
            _ => {}
        }
    }

    if end > start {
        Some(&s[start..end])
    } else {
        None
    }
}

/// Extract the first balanced JSON array from text
pub fn extract_json_array(s: &str) -> Option<&str> {
    let start = s.find('[')?;
    let mut depth = 0;
    let mut end = start;

    for (i, c) in s[start..].char_indices() {
        match c {
            '[' => depth += 1,
            ']' => {
                depth -= 1;
                if depth == 0 {
                    end = start + i + 1;
                    break;
                }
            }
            _ => {}
        }
    }

    if end > start {
        Some(&s[start..end])
    } else {
        None
    }
}
