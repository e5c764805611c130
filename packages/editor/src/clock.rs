//! # Logical Time
//!
//! Totally ordered timestamps and the clocks that produce them. The stored
//! shape mirrors the document store's native time type:
//! `{ "seconds": i64, "nanoseconds": u32 }`.

use chrono::{DateTime, TimeZone, Utc};
use cord_common::Value;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

const NANOS_PER_SECOND: u32 = 1_000_000_000;

/// Seconds + nanoseconds since the Unix epoch
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Timestamp {
    pub seconds: i64,
    pub nanoseconds: u32,
}

impl Timestamp {
    /// Create a timestamp, carrying excess nanoseconds into seconds
    pub fn new(seconds: i64, nanoseconds: u32) -> Self {
        Self {
            seconds: seconds + (nanoseconds / NANOS_PER_SECOND) as i64,
            nanoseconds: nanoseconds % NANOS_PER_SECOND,
        }
    }

    pub fn from_datetime(datetime: DateTime<Utc>) -> Self {
        Self::new(datetime.timestamp(), datetime.timestamp_subsec_nanos())
    }

    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.seconds, self.nanoseconds).single()
    }

    /// Advance by a number of nanoseconds
    pub fn add_nanos(&self, nanos: u64) -> Self {
        let total = self.nanoseconds as u64 + nanos;
        Self {
            seconds: self.seconds + (total / NANOS_PER_SECOND as u64) as i64,
            nanoseconds: (total % NANOS_PER_SECOND as u64) as u32,
        }
    }

    /// Smallest timestamp strictly after this one
    pub fn next(&self) -> Self {
        self.add_nanos(1)
    }

    pub fn to_value(&self) -> Value {
        Value::object([
            ("seconds", Value::from(self.seconds)),
            ("nanoseconds", Value::from(self.nanoseconds)),
        ])
    }

    pub fn from_value(value: &Value) -> Option<Self> {
        let seconds = value.get("seconds")?.as_f64()?;
        let nanoseconds = value.get("nanoseconds")?.as_f64()?;
        if seconds.fract() != 0.0 || nanoseconds.fract() != 0.0 || nanoseconds < 0.0 {
            return None;
        }
        Some(Self::new(seconds as i64, nanoseconds as u32))
    }
}

/// Source of logical time
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Wall clock with nanosecond precision
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::from_datetime(Utc::now())
    }
}

/// Wall clock that never goes backwards: every reading is strictly after the
/// previous one, even when the system time is adjusted.
#[derive(Debug, Default)]
pub struct HybridClock {
    last: Mutex<Timestamp>,
}

impl HybridClock {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Clock for HybridClock {
    fn now(&self) -> Timestamp {
        let mut last = self.last.lock().unwrap_or_else(|e| e.into_inner());
        let next = SystemClock.now().max(last.next());
        *last = next;
        next
    }
}

/// Deterministic clock that advances by a fixed step on every reading
#[derive(Debug)]
pub struct ManualClock {
    current: Mutex<Timestamp>,
    step_nanos: u64,
}

impl ManualClock {
    pub fn new(start: Timestamp) -> Self {
        Self::with_step(start, 1)
    }

    pub fn with_step(start: Timestamp, step_nanos: u64) -> Self {
        Self {
            current: Mutex::new(start),
            step_nanos,
        }
    }

    /// Jump to a specific time; the next reading is one step after it
    pub fn set(&self, timestamp: Timestamp) {
        *self.current.lock().unwrap_or_else(|e| e.into_inner()) = timestamp;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        *current = current.add_nanos(self.step_nanos);
        *current
    }
}
