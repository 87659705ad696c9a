//! Instance identifier with proper encapsulation.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Canonical instance identifier.
///
/// Only ASCII alphanumerics, `-` and single `_` separators appear in a
/// canonical id, so it is safe both as a runtime instance name and as a JSON
/// object key. Canonicalization from a config path happens when the model
/// descriptor is resolved; [`InstanceId::new`] trusts its input.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstanceId(String);

impl InstanceId {
    /// Create a new `InstanceId` from an already-canonical string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the instance ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for InstanceId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for InstanceId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}
