//! Animal identifiers
//!
//! ID Format: `h-{7-char-hash}` (e.g., `h-7f2b4c1`)
//!
//! Hash is derived from name + registration timestamp, so re-registering a
//! name after deleting it yields a different ID.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum IdError {
    #[error("Invalid animal ID format: expected 'h-{{7-char-hash}}', got '{0}'")]
    InvalidAnimalId(String),
}

/// Generates a 7-character hash from name, timestamp and retry counter
fn generate_hash(name: &str, timestamp: DateTime<Utc>, attempt: u32) -> String {
    let nanos = timestamp.timestamp_nanos_opt().unwrap_or(0);
    let input = match attempt {
        0 => format!("{}{}", name, nanos),
        n => format!("{}{}#{}", name, nanos, n),
    };
    let hash = blake3::hash(input.as_bytes());
    let hex = hash.to_hex();
    hex[..7].to_string()
}

/// Animal ID in the format `h-{7-char-hash}`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AnimalId {
    hash: String,
}

impl AnimalId {
    /// Creates a new animal ID from name and registration timestamp
    pub fn new(name: &str, timestamp: DateTime<Utc>) -> Self {
        Self::with_attempt(name, timestamp, 0)
    }

    /// Like [`AnimalId::new`], salted with a retry counter
    ///
    /// Attempt 0 yields the same ID as `new`. Later attempts give fresh
    /// candidates when the first one is already taken.
    pub fn with_attempt(name: &str, timestamp: DateTime<Utc>, attempt: u32) -> Self {
        Self {
            hash: generate_hash(name, timestamp, attempt),
        }
    }
}

impl fmt::Display for AnimalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "h-{}", self.hash)
    }
}

impl FromStr for AnimalId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let hash = s
            .strip_prefix("h-")
            .ok_or_else(|| IdError::InvalidAnimalId(s.to_string()))?;

        if hash.len() != 7 || !hash.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(IdError::InvalidAnimalId(s.to_string()));
        }

        Ok(Self {
            hash: hash.to_ascii_lowercase(),
        })
    }
}

impl TryFrom<String> for AnimalId {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<AnimalId> for String {
    fn from(id: AnimalId) -> Self {
        id.to_string()
    }
}
