//! Core types for the livechat feed
//!
//! Newtypes for message identity and ordering time.

use std::fmt;
use std::ops::Deref;
use serde::{Deserialize, Serialize};

// ----------------------------------------------------------------------------
// Message Identifier
// ----------------------------------------------------------------------------

/// Opaque message identifier assigned upstream, stable across resyncs
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(String);

impl MessageId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Deref for MessageId {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<&str> for MessageId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for MessageId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

// ----------------------------------------------------------------------------
// Timestamp
// ----------------------------------------------------------------------------

/// Ordering time of a message in milliseconds
///
/// Only meaningful relative to other timestamps from the same upstream; it is
/// never compared against local wall-clock time.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    pub const fn new(millis: i64) -> Self {
        Self(millis)
    }

    pub const fn as_millis(&self) -> i64 {
        self.0
    }

    /// Local wall-clock time, used only for session bookkeeping
    pub fn now() -> Self {
        let millis = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
            .unwrap_or_default();
        Self(millis)
    }

    /// Normalize a JSON number, truncating fractional milliseconds
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        if let Some(millis) = value.as_i64() {
            return Some(Self(millis));
        }
        if let Some(millis) = value.as_u64() {
            return Some(Self(i64::try_from(millis).unwrap_or(i64::MAX)));
        }
        value
            .as_f64()
            .filter(|millis| millis.is_finite())
            .map(|millis| Self(millis as i64))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for Timestamp {
    fn from(millis: i64) -> Self {
        Self(millis)
    }
}
