//! Core Types
//!
//! Identifiers and value types shared by the session, codec, transfer and
//! payment modules.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Backend user identifier (the `_id` field on the wire).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// A person money can be sent to.
///
/// Resolved either from a directory search or from a decoded receive code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipient {
    pub id: UserId,
    pub display_name: String,
    pub phone_number: String,
}

impl Recipient {
    pub fn new(
        id: impl Into<UserId>,
        display_name: impl Into<String>,
        phone_number: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            phone_number: phone_number.into(),
        }
    }
}

impl From<String> for UserId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Validate a phone number: optional leading `+`, then 9..=15 ASCII digits.
pub fn is_valid_phone_number(raw: &str) -> bool {
    let digits = raw.strip_prefix('+').unwrap_or(raw);
    (9..=15).contains(&digits.len()) && digits.bytes().all(|b| b.is_ascii_digit())
}
