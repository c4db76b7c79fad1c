//! Weekly and one-time slot templates, and the two string formats they carry:
//! time of day (`HH:mm` or `h:mm AM`) and schedule dates (`DD-MM-YYYY`).
//!
//! The same template shape serves as a whitelist (available slots) and a
//! blacklist (blocked slots); [`SlotTemplate::evaluate`] is shared by both.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::{CalendarError, Result};

/// Day of the week, serialized as its lowercase English name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeekDay {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl WeekDay {
    pub const WORKDAYS: [WeekDay; 5] = [
        WeekDay::Monday,
        WeekDay::Tuesday,
        WeekDay::Wednesday,
        WeekDay::Thursday,
        WeekDay::Friday,
    ];

    pub fn of(date: NaiveDate) -> Self {
        date.weekday().into()
    }

    pub(crate) fn rrule_code(self) -> &'static str {
        match self {
            WeekDay::Monday => "MO",
            WeekDay::Tuesday => "TU",
            WeekDay::Wednesday => "WE",
            WeekDay::Thursday => "TH",
            WeekDay::Friday => "FR",
            WeekDay::Saturday => "SA",
            WeekDay::Sunday => "SU",
        }
    }

    pub(crate) fn from_rrule_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_uppercase().as_str() {
            "MO" => Some(WeekDay::Monday),
            "TU" => Some(WeekDay::Tuesday),
            "WE" => Some(WeekDay::Wednesday),
            "TH" => Some(WeekDay::Thursday),
            "FR" => Some(WeekDay::Friday),
            "SA" => Some(WeekDay::Saturday),
            "SU" => Some(WeekDay::Sunday),
            _ => None,
        }
    }
}

impl From<Weekday> for WeekDay {
    fn from(day: Weekday) -> Self {
        match day {
            Weekday::Mon => WeekDay::Monday,
            Weekday::Tue => WeekDay::Tuesday,
            Weekday::Wed => WeekDay::Wednesday,
            Weekday::Thu => WeekDay::Thursday,
            Weekday::Fri => WeekDay::Friday,
            Weekday::Sat => WeekDay::Saturday,
            Weekday::Sun => WeekDay::Sunday,
        }
    }
}

/// A time of day with minute precision. `24:00` is allowed as end of day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct TimeOfDay {
    minutes: u32,
}

impl TimeOfDay {
    pub const END_OF_DAY: TimeOfDay = TimeOfDay { minutes: 24 * 60 };

    pub fn new(hour: u32, minute: u32) -> Option<Self> {
        let valid = (hour < 24 && minute < 60) || (hour == 24 && minute == 0);
        valid.then_some(Self {
            minutes: hour * 60 + minute,
        })
    }

    pub fn minutes_since_midnight(self) -> u32 {
        self.minutes
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.minutes / 60, self.minutes % 60)
    }
}

impl FromStr for TimeOfDay {
    type Err = CalendarError;

    /// Accepts `09:00`, `17:30`, `9`, `12:00 AM`, `1:30pm`.
    fn from_str(s: &str) -> Result<Self> {
        let invalid = || CalendarError::InvalidTimeOfDay(s.to_string());
        let upper = s.trim().to_ascii_uppercase();

        let (clock, period) = if let Some(rest) = upper.strip_suffix("AM") {
            (rest.trim_end(), Some(false))
        } else if let Some(rest) = upper.strip_suffix("PM") {
            (rest.trim_end(), Some(true))
        } else {
            (upper.as_str(), None)
        };

        let (hour_str, minute_str) = clock.split_once(':').unwrap_or((clock, "0"));
        let hour: u32 = hour_str.trim().parse().map_err(|_| invalid())?;
        let minute: u32 = minute_str.trim().parse().map_err(|_| invalid())?;

        let hour = match period {
            Some(pm) => {
                if !(1..=12).contains(&hour) {
                    return Err(invalid());
                }
                match (pm, hour) {
                    (false, 12) => 0,
                    (true, 12) => 12,
                    (true, h) => h + 12,
                    (false, h) => h,
                }
            }
            None => hour,
        };

        TimeOfDay::new(hour, minute).ok_or_else(invalid)
    }
}

/// Parse a one-time schedule date in `DD-MM-YYYY` form.
///
/// # Errors
/// Returns `CalendarError::InvalidDate` if the string is not a real date.
pub fn parse_schedule_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%d-%m-%Y")
        .map_err(|_| CalendarError::InvalidDate(s.to_string()))
}

/// A time range within a day, as written in a schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: String,
    pub end: String,
}

impl TimeRange {
    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
        }
    }

    /// Minute bounds `[start, end)` on the day. An end before the start means
    /// the range runs past midnight; only the same-day part is returned.
    pub fn bounds(&self) -> Result<(u32, u32)> {
        let start = self.start.parse::<TimeOfDay>()?.minutes_since_midnight();
        let end = self.end.parse::<TimeOfDay>()?.minutes_since_midnight();
        if end < start {
            Ok((start, TimeOfDay::END_OF_DAY.minutes_since_midnight()))
        } else {
            Ok((start, end))
        }
    }

    /// Whether `minute` (since midnight) lies in the range. Unparseable
    /// ranges never match.
    pub fn contains(&self, minute: u32) -> bool {
        match self.bounds() {
            Ok((start, end)) => start <= minute && minute < end,
            Err(e) => {
                tracing::debug!(error = %e, "Skipping malformed schedule range");
                false
            }
        }
    }
}

/// Schedule for one day: an enabled flag and its time ranges.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DaySchedule {
    #[serde(default)]
    pub schedule: Vec<TimeRange>,
    pub enabled: bool,
}

impl DaySchedule {
    pub fn enabled(schedule: Vec<TimeRange>) -> Self {
        Self {
            schedule,
            enabled: true,
        }
    }

    pub fn disabled() -> Self {
        Self::default()
    }

    fn covers(&self, minute: u32) -> bool {
        self.schedule.iter().any(|range| range.contains(minute))
    }
}

/// Recurring weekly template, keyed by short weekday name.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WeeklySchedule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mon: Option<DaySchedule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tue: Option<DaySchedule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wed: Option<DaySchedule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thu: Option<DaySchedule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fri: Option<DaySchedule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sat: Option<DaySchedule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sun: Option<DaySchedule>,
}

impl WeeklySchedule {
    pub fn day(&self, day: WeekDay) -> Option<&DaySchedule> {
        match day {
            WeekDay::Monday => self.mon.as_ref(),
            WeekDay::Tuesday => self.tue.as_ref(),
            WeekDay::Wednesday => self.wed.as_ref(),
            WeekDay::Thursday => self.thu.as_ref(),
            WeekDay::Friday => self.fri.as_ref(),
            WeekDay::Saturday => self.sat.as_ref(),
            WeekDay::Sunday => self.sun.as_ref(),
        }
    }

    pub fn set(&mut self, day: WeekDay, schedule: DaySchedule) -> &mut Self {
        let slot = match day {
            WeekDay::Monday => &mut self.mon,
            WeekDay::Tuesday => &mut self.tue,
            WeekDay::Wednesday => &mut self.wed,
            WeekDay::Thursday => &mut self.thu,
            WeekDay::Friday => &mut self.fri,
            WeekDay::Saturday => &mut self.sat,
            WeekDay::Sunday => &mut self.sun,
        };
        *slot = Some(schedule);
        self
    }
}

/// Schedule for one specific date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OneTimeSchedule {
    /// `DD-MM-YYYY`.
    pub date: String,
    #[serde(default)]
    pub schedule: Vec<TimeRange>,
    pub enabled: bool,
}

impl OneTimeSchedule {
    fn applies_to(&self, date: NaiveDate) -> bool {
        match parse_schedule_date(&self.date) {
            Ok(d) => d == date,
            Err(e) => {
                tracing::debug!(error = %e, "Skipping one-time schedule with malformed date");
                false
            }
        }
    }

    fn covers(&self, minute: u32) -> bool {
        self.schedule.iter().any(|range| range.contains(minute))
    }
}

/// A recurring weekly template plus date-specific one-time entries. A
/// one-time entry for a date always takes precedence over the weekly entry.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SlotTemplate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurring: Option<WeeklySchedule>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub one_time: Vec<OneTimeSchedule>,
}

/// Outcome of testing a cell against a [`SlotTemplate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateMatch {
    /// A rule governs the date and the cell is inside its declared time.
    Inside,
    /// A rule governs the date and the cell is outside its declared time.
    Outside,
    /// No entry governs the date.
    Unmatched,
}

/// How disabled entries are read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisabledEntries {
    /// A disabled entry governs its date and declares no time at all.
    Empty,
    /// Disabled entries are drafts and are skipped.
    Ignored,
}

impl SlotTemplate {
    /// Test a cell. `minute` is minutes since midnight for a time-level
    /// query, `None` for a day-level query (an enabled governing entry then
    /// counts as `Inside`).
    pub fn evaluate(
        &self,
        date: NaiveDate,
        minute: Option<u32>,
        disabled: DisabledEntries,
    ) -> TemplateMatch {
        let counts = |enabled: bool| enabled || disabled == DisabledEntries::Empty;

        if let Some(entry) = self
            .one_time
            .iter()
            .find(|entry| counts(entry.enabled) && entry.applies_to(date))
        {
            return verdict(entry.enabled, minute, |m| entry.covers(m));
        }

        let weekly = self
            .recurring
            .as_ref()
            .and_then(|weekly| weekly.day(WeekDay::of(date)))
            .filter(|day| counts(day.enabled));
        match weekly {
            Some(day) => verdict(day.enabled, minute, |m| day.covers(m)),
            None => TemplateMatch::Unmatched,
        }
    }
}

fn verdict(enabled: bool, minute: Option<u32>, covers: impl Fn(u32) -> bool) -> TemplateMatch {
    if !enabled {
        return TemplateMatch::Outside;
    }
    match minute {
        None => TemplateMatch::Inside,
        Some(m) if covers(m) => TemplateMatch::Inside,
        Some(_) => TemplateMatch::Outside,
    }
}
