//! Tracked-change records.
//!
//! Two record kinds back the acknowledgment workflow:
//!
//! - [`ActivityEntry`] is the append-only audit trail. Entries are immutable
//!   once written except for their acknowledgment fields (`status`, `ack`).
//! - [`PendingChange`] is the console's attention marker, at most one per
//!   `(item, field)` key. Customer edits upsert it, admin review flips it to
//!   acknowledged, retention cleanup removes old acknowledged entries.
//!
//! Status moves one way: `pending -> acknowledged`. Nothing in this crate
//! flips a record back.
//!
//! Timestamps on these records are clamped to microsecond resolution when
//! they are authored; the store persists integer microseconds, and a
//! saved-then-loaded aggregate must compare equal to the in-memory one.

mod entry;
mod pending;

pub use entry::ActivityEntry;
pub use pending::{PendingChange, PendingKey};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Review status of a tracked change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeStatus {
    Pending,
    Acknowledged,
}

impl ChangeStatus {
    pub(crate) const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Acknowledged => "acknowledged",
        }
    }

    #[must_use]
    pub const fn is_pending(self) -> bool {
        matches!(self, Self::Pending)
    }
}

impl fmt::Display for ChangeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing a change status from text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseStatusError {
    pub got: String,
}

impl fmt::Display for ParseStatusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid change status: '{}' (expected pending|acknowledged)",
            self.got
        )
    }
}

impl std::error::Error for ParseStatusError {}

impl FromStr for ChangeStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "acknowledged" => Ok(Self::Acknowledged),
            _ => Err(ParseStatusError { got: s.to_string() }),
        }
    }
}

/// Who acknowledged a change, and when.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AckStamp {
    pub by: String,
    pub at: DateTime<Utc>,
}

impl AckStamp {
    #[must_use]
    pub fn new(by: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            by: by.into(),
            at: truncate_to_micros(at),
        }
    }
}

/// Drop sub-microsecond precision; `at` values finer than the stored
/// resolution would otherwise change across a save/load cycle.
pub(crate) fn truncate_to_micros(at: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp_micros(at.timestamp_micros()).unwrap_or(at)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_json_roundtrips() {
        assert_eq!(
            serde_json::to_string(&ChangeStatus::Pending).unwrap(),
            "\"pending\""
        );
        assert_eq!(
            serde_json::from_str::<ChangeStatus>("\"acknowledged\"").unwrap(),
            ChangeStatus::Acknowledged
        );
    }

    #[test]
    fn status_parse_rejects_unknown() {
        assert_eq!(
            "Pending".parse::<ChangeStatus>().unwrap(),
            ChangeStatus::Pending
        );
        assert!("resolved".parse::<ChangeStatus>().is_err());
        assert!("".parse::<ChangeStatus>().is_err());
    }

    #[test]
    fn pending_predicate() {
        assert!(ChangeStatus::Pending.is_pending());
        assert!(!ChangeStatus::Acknowledged.is_pending());
    }
}
