//! Concrete event occurrences and the instant windows they are queried against.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::{CalendarError, Result};

/// One concrete, dated instance of an event.
///
/// All instances expanded from the same recurring series share `id`. An
/// override instance carries `recurrence_id`, the generated instant it replaces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Occurrence {
    pub id: String,
    pub title: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(default)]
    pub all_day: bool,
    /// Resources this occurrence is assigned to (one or many).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resource_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurrence_id: Option<DateTime<Utc>>,
}

impl Occurrence {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            start,
            end: end.max(start),
            all_day: false,
            resource_ids: Vec::new(),
            recurrence_id: None,
        }
    }

    /// Start and end with an inverted end clamped to the start.
    pub fn span(&self) -> (DateTime<Utc>, DateTime<Utc>) {
        (self.start, self.end.max(self.start))
    }

    pub fn duration(&self) -> chrono::Duration {
        let (start, end) = self.span();
        end - start
    }

    pub fn is_assigned_to(&self, resource_id: &str) -> bool {
        self.resource_ids.iter().any(|r| r == resource_id)
    }
}

/// A closed instant range `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// The whole local calendar day `date` in `tz`, from midnight up to the
    /// last second before the next midnight.
    pub fn day(date: NaiveDate, tz: Tz) -> Self {
        let start = local_to_utc(tz, date.and_time(chrono::NaiveTime::MIN));
        let next = date.succ_opt().unwrap_or(date);
        let end =
            local_to_utc(tz, next.and_time(chrono::NaiveTime::MIN)) - chrono::Duration::seconds(1);
        Self { start, end: end.max(start) }
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant <= self.end
    }

    /// Whether the span `[start, end)` touches this window. A zero-duration
    /// span is treated as an instant.
    pub fn intersects(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        if end <= start {
            return self.contains(start);
        }
        start <= self.end && end > self.start
    }

    pub fn is_inverted(&self) -> bool {
        self.end < self.start
    }
}

/// Resolve a wall-clock time in `tz` to an instant.
///
/// Ambiguous times (DST fall-back) resolve to the earlier instant; times in a
/// DST gap are read as if the offset before the gap still applied.
pub fn local_to_utc(tz: Tz, local: NaiveDateTime) -> DateTime<Utc> {
    match tz.from_local_datetime(&local).earliest() {
        Some(dt) => dt.with_timezone(&Utc),
        None => {
            let shifted = local + chrono::Duration::hours(1);
            tz.from_local_datetime(&shifted)
                .earliest()
                .map(|dt| dt.with_timezone(&Utc) - chrono::Duration::hours(1))
                .unwrap_or_else(|| local.and_utc())
        }
    }
}

/// The wall-clock reading of `instant` in `tz`.
pub fn utc_to_local(tz: Tz, instant: DateTime<Utc>) -> NaiveDateTime {
    instant.with_timezone(&tz).naive_local()
}

/// Parse an IANA timezone name.
pub fn parse_timezone(name: &str) -> Result<Tz> {
    name.parse()
        .map_err(|_| CalendarError::InvalidTimezone(name.to_string()))
}
