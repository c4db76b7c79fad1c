//! # calendar-engine
//!
//! The decision core behind agenda and resource-timeline calendar views.
//!
//! For any date/time cell the engine answers three questions, as pure
//! synchronous functions over plain data:
//!
//! - which concrete occurrences fall in it (recurrence expansion with
//!   exception dates and per-instance overrides, via the `rrule` crate)
//! - whether a resource is bookable there (available-slot whitelist,
//!   blocked-slot blacklist, business hours, time-off)
//! - where overlapping events are painted so none collide (grid bin-packing
//!   and same-day cluster layering)
//!
//! ## Modules
//!
//! - [`expander`] — event definitions → occurrences in a window
//! - [`recurrence`] — typed RRULE patterns
//! - [`availability`] — resource availability resolution
//! - [`schedule`] — weekly/one-time slot templates and their string formats
//! - [`layout`] — grid and day layout of occurrences
//! - [`visible_hours`] — visible time-axis range arithmetic
//! - [`occurrence`] — occurrences and instant windows
//! - [`error`] — Error types

pub mod availability;
pub mod error;
pub mod expander;
pub mod layout;
pub mod occurrence;
pub mod recurrence;
pub mod schedule;
pub mod visible_hours;

pub use availability::{
    is_available, is_blocked_slot, time_offs_for_slot, AvailabilityQuery, Resource,
};
pub use error::CalendarError;
pub use expander::{expand, expand_all, Diagnostic, EventDefinition, Expansion};
pub use layout::day::{layout_day, DayWindow};
pub use layout::grid::{layout_grid, layout_grid_with, GridLayout, GridWindow};
pub use layout::PositionedOccurrence;
pub use occurrence::{Occurrence, TimeWindow};
pub use recurrence::RecurrencePattern;
pub use visible_hours::{visible_hours_count, VisibleHours};
