//! Recurrence patterns: the typed form of an RFC 5545 `RRULE`.
//!
//! Patterns render to RRULE text for the `rrule` crate and parse back from
//! it, so callers can hand over either the typed fields or a rule string.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::{CalendarError, Result};
use crate::schedule::WeekDay;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl Frequency {
    fn as_rrule(self) -> &'static str {
        match self {
            Frequency::Daily => "DAILY",
            Frequency::Weekly => "WEEKLY",
            Frequency::Monthly => "MONTHLY",
            Frequency::Yearly => "YEARLY",
        }
    }
}

fn default_interval() -> u32 {
    1
}

fn default_timezone() -> Tz {
    Tz::UTC
}

/// How an event repeats.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecurrencePattern {
    pub frequency: Frequency,
    #[serde(default = "default_interval")]
    pub interval: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u32>,
    /// Last instant a generated occurrence may start at (inclusive).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub until: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub by_weekday: Vec<WeekDay>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub by_month_day: Vec<i8>,
    /// Anchor instant. Falls back to the start of the event or block that
    /// owns the pattern.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dtstart: Option<DateTime<Utc>>,
    /// Zone whose wall clock the series follows across DST changes.
    #[serde(default = "default_timezone")]
    pub timezone: Tz,
}

impl RecurrencePattern {
    pub fn new(frequency: Frequency) -> Self {
        Self {
            frequency,
            interval: 1,
            count: None,
            until: None,
            by_weekday: Vec::new(),
            by_month_day: Vec::new(),
            dtstart: None,
            timezone: Tz::UTC,
        }
    }

    pub fn daily() -> Self {
        Self::new(Frequency::Daily)
    }

    pub fn weekly() -> Self {
        Self::new(Frequency::Weekly)
    }

    pub fn monthly() -> Self {
        Self::new(Frequency::Monthly)
    }

    pub fn interval(mut self, interval: u32) -> Self {
        self.interval = interval;
        self
    }

    pub fn count(mut self, count: u32) -> Self {
        self.count = Some(count);
        self
    }

    pub fn until(mut self, until: DateTime<Utc>) -> Self {
        self.until = Some(until);
        self
    }

    pub fn on(mut self, days: &[WeekDay]) -> Self {
        self.by_weekday = days.to_vec();
        self
    }

    pub fn on_month_days(mut self, days: &[i8]) -> Self {
        self.by_month_day = days.to_vec();
        self
    }

    pub fn in_timezone(mut self, tz: Tz) -> Self {
        self.timezone = tz;
        self
    }

    /// Validate the pattern and render the `RRULE` value (without the
    /// `RRULE:` prefix). `UNTIL` is not rendered; the expander applies it.
    ///
    /// # Errors
    /// Returns `CalendarError::InvalidRule` for a zero interval or an
    /// out-of-range month day.
    pub fn to_rrule(&self) -> Result<String> {
        if self.interval == 0 {
            return Err(CalendarError::InvalidRule("INTERVAL must be at least 1".to_string()));
        }
        if let Some(bad) = self.by_month_day.iter().find(|d| **d == 0 || !(-31..=31).contains(*d)) {
            return Err(CalendarError::InvalidRule(format!("BYMONTHDAY out of range: {}", bad)));
        }

        let mut parts = vec![format!("FREQ={}", self.frequency.as_rrule())];
        if self.interval != 1 {
            parts.push(format!("INTERVAL={}", self.interval));
        }
        if let Some(count) = self.count {
            parts.push(format!("COUNT={}", count));
        }
        if !self.by_weekday.is_empty() {
            let days: Vec<&str> = self.by_weekday.iter().map(|d| d.rrule_code()).collect();
            parts.push(format!("BYDAY={}", days.join(",")));
        }
        if !self.by_month_day.is_empty() {
            let days: Vec<String> = self.by_month_day.iter().map(|d| d.to_string()).collect();
            parts.push(format!("BYMONTHDAY={}", days.join(",")));
        }
        Ok(parts.join(";"))
    }
}

impl fmt::Display for RecurrencePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_rrule() {
            Ok(rule) => f.write_str(&rule)?,
            Err(_) => f.write_str("FREQ=INVALID")?,
        }
        if let Some(until) = self.until {
            write!(f, ";UNTIL={}", until.format("%Y%m%dT%H%M%SZ"))?;
        }
        Ok(())
    }
}

impl FromStr for RecurrencePattern {
    type Err = CalendarError;

    /// Parse RRULE text such as `FREQ=WEEKLY;INTERVAL=2;BYDAY=TU,TH;COUNT=4`.
    /// A leading `RRULE:` is accepted. Unsupported parts are rejected.
    fn from_str(s: &str) -> Result<Self> {
        let body = s.trim();
        let body = body.strip_prefix("RRULE:").unwrap_or(body);
        if body.is_empty() {
            return Err(CalendarError::InvalidRule("empty RRULE string".to_string()));
        }

        let mut frequency = None;
        let mut pattern = RecurrencePattern::daily();
        for part in body.split(';').filter(|p| !p.is_empty()) {
            let (key, value) = part
                .split_once('=')
                .ok_or_else(|| CalendarError::InvalidRule(format!("malformed part '{}'", part)))?;
            let invalid =
                || CalendarError::InvalidRule(format!("bad value for {}: '{}'", key, value));
            match key.to_ascii_uppercase().as_str() {
                "FREQ" => {
                    frequency = Some(match value.to_ascii_uppercase().as_str() {
                        "DAILY" => Frequency::Daily,
                        "WEEKLY" => Frequency::Weekly,
                        "MONTHLY" => Frequency::Monthly,
                        "YEARLY" => Frequency::Yearly,
                        _ => return Err(invalid()),
                    })
                }
                "INTERVAL" => pattern.interval = value.parse().map_err(|_| invalid())?,
                "COUNT" => pattern.count = Some(value.parse().map_err(|_| invalid())?),
                "UNTIL" => pattern.until = Some(parse_until(value).ok_or_else(invalid)?),
                "BYDAY" => {
                    pattern.by_weekday = value
                        .split(',')
                        .map(|code| WeekDay::from_rrule_code(code).ok_or_else(invalid))
                        .collect::<Result<_>>()?
                }
                "BYMONTHDAY" => {
                    pattern.by_month_day = value
                        .split(',')
                        .map(|d| d.trim().parse::<i8>().map_err(|_| invalid()))
                        .collect::<Result<_>>()?
                }
                "WKST" => {}
                other => {
                    return Err(CalendarError::InvalidRule(format!("unsupported part '{}'", other)))
                }
            }
        }

        pattern.frequency =
            frequency.ok_or_else(|| CalendarError::InvalidRule("missing FREQ".to_string()))?;
        Ok(pattern)
    }
}

fn parse_until(value: &str) -> Option<DateTime<Utc>> {
    let bare = value.trim_end_matches('Z');
    if let Ok(dt) = chrono::NaiveDateTime::parse_from_str(bare, "%Y%m%dT%H%M%S") {
        return Some(dt.and_utc());
    }
    chrono::NaiveDate::parse_from_str(bare, "%Y%m%d")
        .ok()
        .and_then(|d| d.and_hms_opt(23, 59, 59))
        .map(|dt| dt.and_utc())
}
