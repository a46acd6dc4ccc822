//! External identifiers for alerts.
//!
//! Rows carry two keys: a sequential integer used inside the store, and a
//! random 128-bit id that is the only handle callers ever see. The external id
//! is generated independently of the row key, so it leaks nothing about table
//! size or insertion order.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Length of the canonical `8-4-4-4-12` textual form.
const CANONICAL_LEN: usize = 36;
const HYPHEN_POSITIONS: [usize; 4] = [8, 13, 18, 23];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("identifier must use the 8-4-4-4-12 hex layout")]
    Layout,
    #[error("identifier contains invalid characters: {0}")]
    Invalid(#[from] uuid::Error),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExternalId(Uuid);

impl ExternalId {
    /// Fresh random (v4) identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parses untrusted text. Only the hyphenated canonical layout is accepted;
    /// braced, URN and unhyphenated forms are rejected.
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        let bytes = text.as_bytes();
        if bytes.len() != CANONICAL_LEN {
            return Err(ParseError::Layout);
        }
        for (idx, byte) in bytes.iter().enumerate() {
            let expect_hyphen = HYPHEN_POSITIONS.contains(&idx);
            if expect_hyphen != (*byte == b'-') {
                return Err(ParseError::Layout);
            }
        }
        Ok(Self(Uuid::try_parse(text)?))
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl From<Uuid> for ExternalId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl fmt::Display for ExternalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}
