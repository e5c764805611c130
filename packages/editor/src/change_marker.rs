//! # Change Markers
//!
//! Every write to a document is stamped with a fresh marker. Readers only
//! use markers to order concurrent edits, never for business logic.

use crate::clock::{Clock, SystemClock, Timestamp};
use cord_common::Value;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque nonce + logical timestamp
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChangeMarker {
    pub id: String,
    pub timestamp: Timestamp,
}

impl ChangeMarker {
    /// Create a marker stamped with the system clock
    pub fn create() -> Self {
        Self::with_clock(&SystemClock)
    }

    pub fn with_clock<C: Clock + ?Sized>(clock: &C) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            timestamp: clock.now(),
        }
    }

    pub fn to_value(&self) -> Value {
        Value::object([
            ("id", Value::string(self.id.clone())),
            ("timestamp", self.timestamp.to_value()),
        ])
    }

    pub fn from_value(value: &Value) -> Option<Self> {
        Some(Self {
            id: value.get("id")?.as_str()?.to_string(),
            timestamp: Timestamp::from_value(value.get("timestamp")?)?,
        })
    }
}

/// Whether `a` was written before `b`.
///
/// A missing `a` ("never written") is older than anything; otherwise a
/// missing `b` is never newer. Identical markers are not older than each other.
pub fn is_older(a: Option<&ChangeMarker>, b: Option<&ChangeMarker>) -> bool {
    match (a, b) {
        (None, _) => true,
        (_, None) => false,
        (Some(a), Some(b)) => a.timestamp < b.timestamp,
    }
}
