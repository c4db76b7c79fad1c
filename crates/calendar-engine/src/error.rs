//! Error types for calendar-engine parsers.
//!
//! The service entry points (`expand`, `is_available`, `layout_grid`,
//! `layout_day`) never return these; they degrade to a renderable default.
//! Only the parsing and rule-building helpers surface them.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CalendarError {
    #[error("Invalid RRULE: {0}")]
    InvalidRule(String),

    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),

    #[error("Invalid time of day: {0}")]
    InvalidTimeOfDay(String),

    #[error("Invalid schedule date: {0}")]
    InvalidDate(String),
}

pub type Result<T> = std::result::Result<T, CalendarError>;
