//! Overdue predicate.
//!
//! Pure functions deciding whether a single task or subtask is overdue at a given
//! instant. All comparisons happen in UTC:
//! - a calendar date is overdue when it is strictly before today's date;
//! - an instant is overdue when it is strictly before now;
//! - completed items and items without a due value are never overdue.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use thiserror::Error;

use crate::asana::{Subtask, Task};

/// A parsed due value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Due {
    /// Whole-day due date.
    Date(NaiveDate),
    /// Exact due instant.
    Instant(DateTime<Utc>),
}

impl Due {
    pub fn is_past(&self, now: DateTime<Utc>) -> bool {
        match self {
            Due::Date(date) => *date < now.date_naive(),
            Due::Instant(at) => *at < now,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unparseable due value '{0}'")]
pub struct DueParseError(pub String);

/// Parse a due value.
///
/// Accepts `YYYY-MM-DD`, RFC 3339 timestamps, and timestamps without an offset
/// (read as UTC).
pub fn parse_due(raw: &str) -> Result<Due, DueParseError> {
    let raw = raw.trim();

    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(Due::Date(date));
    }
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Ok(Due::Instant(at.with_timezone(&Utc)));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(Due::Instant(naive.and_utc()));
        }
    }

    Err(DueParseError(raw.to_string()))
}

/// Anything carrying a due value and a completion flag.
pub trait DueRecord {
    fn gid(&self) -> &str;
    fn name(&self) -> &str;
    fn due_on(&self) -> Option<&str>;
    fn due_at(&self) -> Option<&str>;
    fn completed(&self) -> bool;

    /// The effective due value; `due_at` wins over `due_on` when both are set.
    fn due(&self) -> Result<Option<Due>, DueParseError> {
        let raw = self
            .due_at()
            .filter(|s| !s.trim().is_empty())
            .or_else(|| self.due_on().filter(|s| !s.trim().is_empty()));
        raw.map(parse_due).transpose()
    }
}

impl DueRecord for Task {
    fn gid(&self) -> &str {
        &self.gid
    }
    fn name(&self) -> &str {
        &self.name
    }
    fn due_on(&self) -> Option<&str> {
        self.due_on.as_deref()
    }
    fn due_at(&self) -> Option<&str> {
        self.due_at.as_deref()
    }
    fn completed(&self) -> bool {
        self.completed
    }
}

impl DueRecord for Subtask {
    fn gid(&self) -> &str {
        &self.gid
    }
    fn name(&self) -> &str {
        &self.name
    }
    fn due_on(&self) -> Option<&str> {
        self.due_on.as_deref()
    }
    fn due_at(&self) -> Option<&str> {
        self.due_at.as_deref()
    }
    fn completed(&self) -> bool {
        self.completed
    }
}

/// Core predicate over an already-parsed due value.
pub fn is_due_overdue(due: Option<&Due>, completed: bool, now: DateTime<Utc>) -> bool {
    if completed {
        return false;
    }
    due.map_or(false, |d| d.is_past(now))
}

/// Whether `record` is overdue at `now`.
///
/// A malformed due value is logged and treated as not overdue.
pub fn is_overdue<R: DueRecord + ?Sized>(record: &R, now: DateTime<Utc>) -> bool {
    if record.completed() {
        return false;
    }
    match record.due() {
        Ok(due) => is_due_overdue(due.as_ref(), false, now),
        Err(e) => {
            tracing::warn!(
                "Data quality: task '{}' ({}) has {}; treating as not overdue",
                record.name(),
                record.gid(),
                e
            );
            false
        }
    }
}
