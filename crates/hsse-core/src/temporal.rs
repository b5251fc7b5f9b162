//! # Temporal Types — UTC Timestamps and the Injected Clock
//!
//! Defines `Timestamp`, a UTC-only timestamp truncated to seconds
//! precision, and the `Clock` trait through which the workflow engine
//! learns "now".
//!
//! ## Invariant
//!
//! Every date recorded on a workflow, finding or corrective action is UTC
//! with a `Z` suffix. Non-UTC inputs are rejected by [`Timestamp::parse`];
//! [`Timestamp::parse_lenient`] exists for ingesting external data.
//!
//! ## Clock injection
//!
//! State machine operations never call `Utc::now()` themselves. They take
//! a `&dyn Clock`, so overdue checks and recorded transition times are
//! reproducible under test with [`FixedClock`].

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Duration, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::HsseError;

/// A UTC-only timestamp, truncated to seconds precision.
///
/// # Construction
///
/// - [`Timestamp::now()`] — current UTC time, truncated.
/// - [`Timestamp::from_utc()`] — from a `DateTime<Utc>`, truncating sub-seconds.
/// - [`Timestamp::parse()`] — from an ISO8601 string, rejecting non-UTC offsets.
///
/// Serialized as `YYYY-MM-DDTHH:MM:SSZ`. Deserialization also accepts a bare
/// `YYYY-MM-DD` (midnight UTC) but never an explicit offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Create a timestamp from the current UTC time, truncated to seconds.
    pub fn now() -> Self {
        Self(truncate_to_seconds(Utc::now()))
    }

    /// Create a timestamp from a `chrono::DateTime<Utc>`, truncating sub-seconds.
    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        Self(truncate_to_seconds(dt))
    }

    /// Parse a timestamp from an RFC 3339 string with a `Z` suffix.
    ///
    /// Timestamps with explicit offsets (`+00:00`, `+05:30`) are rejected.
    pub fn parse(s: &str) -> Result<Self, HsseError> {
        if !s.ends_with('Z') {
            return Err(HsseError::Validation(format!(
                "timestamp must use Z suffix (UTC only), got: {s:?}"
            )));
        }
        Self::parse_lenient(s)
    }

    /// Parse a timestamp from an RFC 3339 string, accepting any offset and
    /// converting to UTC.
    pub fn parse_lenient(s: &str) -> Result<Self, HsseError> {
        let dt = DateTime::parse_from_rfc3339(s).map_err(|e| {
            HsseError::Validation(format!("invalid RFC 3339 timestamp {s:?}: {e}"))
        })?;
        Ok(Self(truncate_to_seconds(dt.with_timezone(&Utc))))
    }

    /// Parse either a full RFC 3339 timestamp or a bare `YYYY-MM-DD` date.
    ///
    /// A bare date is interpreted as midnight UTC of that day.
    pub fn parse_date_or_time(s: &str) -> Result<Self, HsseError> {
        if let Ok(date) = chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d") {
            let dt = date.and_time(chrono::NaiveTime::MIN).and_utc();
            return Ok(Self(dt));
        }
        Self::parse_lenient(s)
    }

    /// Create a timestamp from a Unix epoch timestamp (seconds).
    pub fn from_epoch_secs(secs: i64) -> Result<Self, HsseError> {
        DateTime::from_timestamp(secs, 0)
            .map(Self)
            .ok_or_else(|| HsseError::Validation(format!("invalid Unix timestamp: {secs}")))
    }

    /// Access the inner `DateTime<Utc>`.
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Returns the Unix epoch timestamp in seconds.
    pub fn epoch_secs(&self) -> i64 {
        self.0.timestamp()
    }

    /// The timestamp shifted by a signed number of whole days.
    pub fn plus_days(&self, days: i64) -> Self {
        Self(self.0 + Duration::days(days))
    }

    /// The timestamp shifted by a signed number of seconds.
    pub fn plus_secs(&self, secs: i64) -> Self {
        Self(self.0 + Duration::seconds(secs))
    }

    /// Render as ISO8601 with Z suffix (e.g., `2025-01-10T09:00:00Z`).
    pub fn to_iso8601(&self) -> String {
        self.0.format("%Y-%m-%dT%H:%M:%SZ").to_string()
    }
}

impl TryFrom<String> for Timestamp {
    type Error = HsseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match chrono::NaiveDate::parse_from_str(&s, "%Y-%m-%d") {
            Ok(date) => Ok(Self(date.and_time(chrono::NaiveTime::MIN).and_utc())),
            Err(_) => Self::parse(&s),
        }
    }
}

impl From<Timestamp> for String {
    fn from(ts: Timestamp) -> Self {
        ts.to_iso8601()
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_iso8601())
    }
}

/// Truncate a `DateTime<Utc>` to seconds precision (discard nanoseconds).
fn truncate_to_seconds(dt: DateTime<Utc>) -> DateTime<Utc> {
    dt.with_nanosecond(0).unwrap_or(dt)
}

// ─── Clock ───────────────────────────────────────────────────────────

/// Source of "now" for the workflow engine.
pub trait Clock: Send + Sync + std::fmt::Debug {
    /// The current instant.
    fn now(&self) -> Timestamp;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

/// A manually driven clock.
///
/// Holds an epoch-seconds value that only changes through [`FixedClock::set`]
/// or [`FixedClock::advance_days`]. Safe to share across threads.
#[derive(Debug)]
pub struct FixedClock {
    epoch_secs: AtomicI64,
}

impl FixedClock {
    /// A clock frozen at `at`.
    pub fn at(at: Timestamp) -> Self {
        Self {
            epoch_secs: AtomicI64::new(at.epoch_secs()),
        }
    }

    /// Move the clock to `at`.
    pub fn set(&self, at: Timestamp) {
        self.epoch_secs.store(at.epoch_secs(), Ordering::SeqCst);
    }

    /// Move the clock forward (or backward) by whole days.
    pub fn advance_days(&self, days: i64) {
        let delta = days.saturating_mul(86_400);
        let _ = self
            .epoch_secs
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |secs| {
                Some(secs.saturating_add(delta))
            });
    }
}

impl Clock for FixedClock {
    /// Never consults the system clock: instants beyond the representable
    /// range saturate at its ends.
    fn now(&self) -> Timestamp {
        let secs = self.epoch_secs.load(Ordering::SeqCst);
        match DateTime::from_timestamp(secs, 0) {
            Some(dt) => Timestamp(dt),
            None if secs > 0 => Timestamp::from_utc(DateTime::<Utc>::MAX_UTC),
            None => Timestamp::from_utc(DateTime::<Utc>::MIN_UTC),
        }
    }
}
