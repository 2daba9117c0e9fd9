//! # Temporal Types
//!
//! `Timestamp` marks when something happened (a transition committed, a
//! maintenance job finished). It is always UTC with seconds precision, so
//! two records of the same instant serialize identically.
//!
//! Calendar facts that a person writes on a form (move-in date, handover
//! date, scheduled inspection date) are `chrono::NaiveDate`, not
//! timestamps. [`Timestamp::local_date`] bridges the two for "today"
//! comparisons at a configured UTC offset.

use chrono::{DateTime, FixedOffset, NaiveDate, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// A UTC-only timestamp, truncated to seconds.
///
/// Serialized as `YYYY-MM-DDTHH:MM:SSZ`; deserialization applies the same
/// rules as [`Timestamp::parse`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Current UTC time, truncated.
    pub fn now() -> Self {
        Self(truncate_to_seconds(Utc::now()))
    }

    /// From a `DateTime<Utc>`, truncating sub-seconds.
    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        Self(truncate_to_seconds(dt))
    }

    /// Parse an RFC 3339 string with a `Z` suffix.
    ///
    /// # Errors
    ///
    /// Rejects anything that is not RFC 3339 or carries a non-`Z` offset.
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        if !s.ends_with('Z') {
            return Err(ValidationError::invalid(
                "timestamp",
                format!("must use Z suffix (UTC only), got {s:?}"),
            ));
        }
        let dt = DateTime::parse_from_rfc3339(s).map_err(|e| {
            ValidationError::invalid("timestamp", format!("invalid RFC 3339 {s:?}: {e}"))
        })?;
        Ok(Self(truncate_to_seconds(dt.with_timezone(&Utc))))
    }

    /// Access the inner `DateTime<Utc>`.
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Seconds since the Unix epoch.
    pub fn epoch_secs(&self) -> i64 {
        self.0.timestamp()
    }

    /// The calendar date at `offset_minutes` east of UTC.
    ///
    /// Offsets outside ±24h fall back to UTC.
    pub fn local_date(&self, offset_minutes: i32) -> NaiveDate {
        match FixedOffset::east_opt(offset_minutes.saturating_mul(60)) {
            Some(offset) => self.0.with_timezone(&offset).date_naive(),
            None => self.0.date_naive(),
        }
    }

    /// Render as `YYYY-MM-DDTHH:MM:SSZ`.
    pub fn to_iso8601(&self) -> String {
        self.0.format("%Y-%m-%dT%H:%M:%SZ").to_string()
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_iso8601())
    }
}

impl TryFrom<String> for Timestamp {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Timestamp> for String {
    fn from(ts: Timestamp) -> Self {
        ts.to_iso8601()
    }
}

fn truncate_to_seconds(dt: DateTime<Utc>) -> DateTime<Utc> {
    dt.with_nanosecond(0).unwrap_or(dt)
}
