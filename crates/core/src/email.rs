//! Email address value object.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};
use crate::value_object::ValueObject;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
        .unwrap_or_else(|e| panic!("email regex failed to compile: {e}"))
});

/// A validated, normalized (trimmed + lower-cased) email address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Email {
    value: String,
}

impl Email {
    pub fn new(input: &str) -> DomainResult<Self> {
        let normalized = input.trim().to_ascii_lowercase();
        if normalized.is_empty() {
            return Err(DomainError::invalid_argument("email cannot be empty"));
        }
        if !EMAIL_RE.is_match(&normalized) {
            return Err(DomainError::invalid_argument(format!(
                "malformed email address: {normalized}"
            )));
        }
        Ok(Self { value: normalized })
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    /// The part before the `@`.
    pub fn local_part(&self) -> &str {
        self.value.split('@').next().unwrap_or_default()
    }

    /// The part after the `@`.
    pub fn domain(&self) -> &str {
        self.value.split('@').nth(1).unwrap_or_default()
    }

    /// Case-insensitive domain check; a blank candidate never matches.
    pub fn is_from_domain(&self, candidate: &str) -> bool {
        let candidate = candidate.trim();
        if candidate.is_empty() {
            return false;
        }
        self.domain().eq_ignore_ascii_case(candidate)
    }
}

impl ValueObject for Email {}

impl core::fmt::Display for Email {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.value)
    }
}
