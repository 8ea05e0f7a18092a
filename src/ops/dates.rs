//! Due and completion date normalization.
//!
//! The remote service sends dates as `YYYY-MM-DD` (all-day, floating),
//! `YYYY-MM-DDThh:mm:ss` (floating, local wall time) or
//! `YYYY-MM-DDThh:mm:ss[.ffffff]Z` (fixed timezone, given in UTC). All of
//! them are turned into one absolute instant here so that date orderings
//! compare like with like.

use chrono::{DateTime, Duration, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};

use crate::model::payload::{WireDue, WireTask};
use crate::model::task::{Due, Task};

/// Dates of this length or shorter carry no time component
const DATE_ONLY_LEN: usize = 10;

const DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DateError {
    #[error("malformed date: {0:?}")]
    Malformed(String),
    #[error("date does not exist in local time: {0:?}")]
    NonexistentLocal(String),
}

/// Parse a date or datetime string. Strings ending in `Z` are read as UTC,
/// everything else as wall time in `tz`.
pub fn parse_timestamp_in<Tz: TimeZone>(raw: &str, tz: &Tz) -> Result<DateTime<Utc>, DateError> {
    let trimmed = raw.trim();
    let (body, is_utc) = match trimmed.strip_suffix('Z') {
        Some(rest) => (rest, true),
        None => (trimmed, false),
    };

    let naive = parse_naive(body).ok_or_else(|| DateError::Malformed(raw.to_string()))?;

    if is_utc {
        return Ok(Utc.from_utc_datetime(&naive));
    }

    // A wall time inside a DST gap is moved forward past the gap
    tz.from_local_datetime(&naive)
        .earliest()
        .or_else(|| tz.from_local_datetime(&(naive + Duration::hours(1))).earliest())
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| DateError::NonexistentLocal(raw.to_string()))
}

/// [`parse_timestamp_in`] against the process-local timezone
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, DateError> {
    parse_timestamp_in(raw, &Local)
}

fn parse_naive(body: &str) -> Option<NaiveDateTime> {
    if body.len() <= DATE_ONLY_LEN {
        return NaiveDate::parse_from_str(body, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0));
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(body, fmt).ok())
}

/// Canonical due date for an optional wire due block. A missing block
/// yields the far-future all-day placeholder.
pub fn normalize_due_in<Tz: TimeZone>(raw: Option<&WireDue>, tz: &Tz) -> Result<Due, DateError> {
    let Some(due) = raw else {
        return Ok(Due::unset());
    };
    Ok(Due {
        at: parse_timestamp_in(&due.date, tz)?,
        all_day: due.date.trim().len() <= DATE_ONLY_LEN,
        is_set: true,
    })
}

/// Convert a wire task into a tree task, resolving its dates in `tz`
pub fn normalize_task_in<Tz: TimeZone>(wire: WireTask, tz: &Tz) -> Result<Task, DateError> {
    let due = normalize_due_in(wire.due.as_ref(), tz)?;
    let completed_at = wire
        .completed_at
        .as_deref()
        .map(|s| parse_timestamp_in(s, tz))
        .transpose()?;

    Ok(Task {
        id: wire.id,
        parent_id: wire.parent_id,
        project_id: wire.project_id,
        section_id: wire.section_id,
        labels: wire.labels,
        priority: wire.priority,
        due,
        completed_at,
        checked: wire.checked,
        deleted: wire.is_deleted,
        content: wire.content,
        responsible_uid: wire.responsible_uid,
    })
}

/// Calendar day of an instant in `tz`
pub fn day_in<Tz: TimeZone>(at: DateTime<Utc>, tz: &Tz) -> NaiveDate {
    at.with_timezone(tz).date_naive()
}

/// Whole days from `from` to `to` (negative when `to` is earlier)
pub fn days_between(from: NaiveDate, to: NaiveDate) -> i64 {
    to.signed_duration_since(from).num_days()
}
