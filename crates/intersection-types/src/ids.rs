//! Identifier newtypes.
//!
//! Signal identifiers are short human-chosen strings (`"L1"`, `"N"`)
//! taken from configuration, so they wrap a [`String`] rather than a
//! generated UUID. Serialized transparently as the bare string.

use std::fmt;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Stable identifier of one signal (traffic movement) at the intersection.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(transparent)]
#[ts(export, export_to = "bindings/")]
pub struct SignalId(String);

impl SignalId {
    /// Create a signal identifier from any string-like value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SignalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SignalId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for SignalId {
    fn from(value: String) -> Self {
        Self(value)
    }
}
