//! # Temporal Types
//!
//! `Timestamp` is a UTC instant truncated to whole seconds. On the wire it
//! is an integer count of Unix seconds, which is how ledger entries and
//! proof identifiers record time.
//!
//! `Interval` is the non-revocation window of a proof request. Either bound
//! may be absent; revocation state is cumulative, so only the upper bound
//! decides which ledger entry a proof is built against.

use chrono::{DateTime, Timelike, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ValidationError;

/// A UTC timestamp with seconds precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Current UTC time, truncated to seconds.
    pub fn now() -> Self {
        Self(truncate_to_seconds(Utc::now()))
    }

    /// From a `DateTime<Utc>`, truncating sub-seconds.
    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        Self(truncate_to_seconds(dt))
    }

    /// From Unix epoch seconds.
    pub fn from_epoch_secs(secs: i64) -> Result<Self, ValidationError> {
        DateTime::from_timestamp(secs, 0)
            .map(Self)
            .ok_or(ValidationError::InvalidTimestamp(secs))
    }

    /// Access the inner `DateTime<Utc>`.
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Unix epoch seconds.
    pub fn epoch_secs(&self) -> i64 {
        self.0.timestamp()
    }

    /// This timestamp shifted by `secs` seconds (negative moves backwards).
    pub fn plus_secs(&self, secs: i64) -> Result<Self, ValidationError> {
        Self::from_epoch_secs(self.epoch_secs().saturating_add(secs))
    }

    /// Render as ISO8601 with Z suffix (e.g., `2026-01-15T12:00:00Z`).
    pub fn to_iso8601(&self) -> String {
        self.0.format("%Y-%m-%dT%H:%M:%SZ").to_string()
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_iso8601())
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(self.epoch_secs())
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let secs = i64::deserialize(deserializer)?;
        Self::from_epoch_secs(secs).map_err(serde::de::Error::custom)
    }
}

fn truncate_to_seconds(dt: DateTime<Utc>) -> DateTime<Utc> {
    dt.with_nanosecond(0).unwrap_or(dt)
}

/// A non-revocation interval `{from, to}`; absent bounds are open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interval {
    /// Lower bound. Informational: revocation state is cumulative.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<Timestamp>,
    /// Upper bound. `None` means "as of now".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<Timestamp>,
}

impl Interval {
    /// Unbounded on both sides.
    pub fn all_time() -> Self {
        Self::default()
    }

    /// `{from: now, to: now}`.
    pub fn recent() -> Self {
        Self::at(Timestamp::now())
    }

    /// The single instant `{from: ts, to: ts}`.
    pub fn at(ts: Timestamp) -> Self {
        Self {
            from: Some(ts),
            to: Some(ts),
        }
    }

    /// A closed interval, rejecting `from > to`.
    pub fn between(from: Timestamp, to: Timestamp) -> Result<Self, ValidationError> {
        if from > to {
            return Err(ValidationError::InvalidInterval {
                from: from.epoch_secs(),
                to: to.epoch_secs(),
            });
        }
        Ok(Self {
            from: Some(from),
            to: Some(to),
        })
    }

    /// The instant revocation state is resolved at: `to`, or now when open.
    pub fn upper_bound(&self) -> Timestamp {
        self.to.unwrap_or_else(Timestamp::now)
    }
}
