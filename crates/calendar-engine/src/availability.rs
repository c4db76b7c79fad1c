//! Resource availability: decides whether a resource can be booked in a
//! calendar cell.
//!
//! Rules are evaluated in a fixed priority order:
//!
//! 1. available-slot whitelist (closed world: undeclared time is blocked)
//! 2. blocked-slot blacklist, only without a whitelist (open world)
//! 3. business hours, for whatever the blacklist leaves open (never with a
//!    whitelist)
//!
//! Non-rejected time-off is applied last and can only make a cell unavailable.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::expander::expand_pattern;
use crate::occurrence::{local_to_utc, utc_to_local, TimeWindow};
use crate::recurrence::RecurrencePattern;
use crate::schedule::{DisabledEntries, SlotTemplate, TemplateMatch, WeekDay};

/// A bookable resource (team member, room, equipment) and its availability
/// configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Resource {
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// Whitelist. Takes precedence over `blocked_slots` and `business_hours`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub available_slots: Option<SlotTemplate>,
    /// Blacklist. Cells it leaves open are still bounded by `business_hours`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocked_slots: Option<BlockedSlots>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_hours: Option<BusinessHours>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub time_offs: Vec<TimeOff>,
}

impl Resource {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ..Self::default()
        }
    }

    /// The slot policy that governs this resource.
    pub fn slot_policy(&self) -> SlotPolicy<'_> {
        match (&self.available_slots, &self.blocked_slots) {
            (Some(whitelist), _) => SlotPolicy::Whitelist(whitelist),
            (None, Some(blacklist)) => SlotPolicy::Blacklist(blacklist),
            (None, None) => SlotPolicy::None,
        }
    }
}

/// Which slot configuration decides a cell before time-off is applied.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SlotPolicy<'a> {
    Whitelist(&'a SlotTemplate),
    Blacklist(&'a BlockedSlots),
    None,
}

/// Blacklist configuration: a weekly/one-time template of blocked ranges and
/// a list of concrete blocked spans, each optionally repeating.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BlockedSlots {
    #[serde(flatten)]
    pub template: SlotTemplate,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub slots: Vec<BlockedSlot>,
}

/// A concrete blocked span such as a weekly meeting or a training session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockedSlot {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurrence: Option<RecurrencePattern>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exdates: Vec<DateTime<Utc>>,
}

impl BlockedSlot {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            start,
            end,
            reason: None,
            recurrence: None,
            exdates: Vec::new(),
        }
    }

    pub fn repeating(mut self, pattern: RecurrencePattern) -> Self {
        self.recurrence = Some(pattern);
        self
    }

    pub fn with_exdates(mut self, exdates: Vec<DateTime<Utc>>) -> Self {
        self.exdates = exdates;
        self
    }

    /// Concrete spans of this block that touch `window`. A malformed
    /// recurrence degrades to the block's own span.
    fn spans_near(&self, window: &TimeWindow) -> Vec<(DateTime<Utc>, DateTime<Utc>)> {
        let (start, end) = (self.start, self.end.max(self.start));
        let duration = end - start;
        let Some(pattern) = &self.recurrence else {
            return vec![(start, end)];
        };
        match expand_pattern(pattern, start, duration, &self.exdates, window) {
            Ok(instances) => instances
                .starts
                .into_iter()
                .map(|s| (s, s + duration))
                .collect(),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    "Malformed blocked-slot recurrence, using its single span"
                );
                vec![(start, end)]
            }
        }
    }
}

fn default_business_days() -> Vec<WeekDay> {
    WeekDay::WORKDAYS.to_vec()
}

fn default_business_start() -> i32 {
    9
}

fn default_business_end() -> i32 {
    17
}

/// Working days and hours. Ignored when a whitelist is configured.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessHours {
    #[serde(default = "default_business_days")]
    pub days_of_week: Vec<WeekDay>,
    /// Opening hour (0-24).
    #[serde(default = "default_business_start")]
    pub start_time: i32,
    /// Closing hour (0-24), exclusive.
    #[serde(default = "default_business_end")]
    pub end_time: i32,
}

impl Default for BusinessHours {
    fn default() -> Self {
        Self {
            days_of_week: default_business_days(),
            start_time: default_business_start(),
            end_time: default_business_end(),
        }
    }
}

impl BusinessHours {
    fn allows(&self, date: NaiveDate, minute: Option<u32>) -> bool {
        if !self.days_of_week.contains(&WeekDay::of(date)) {
            return false;
        }
        let Some(minute) = minute else {
            return true;
        };
        let start = self.start_time.clamp(0, 24) as u32 * 60;
        let end = self.end_time.clamp(0, 24) as u32 * 60;
        start <= minute && minute < end
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeOffStatus {
    Pending,
    Approved,
    Rejected,
}

/// A leave request. Anything but a rejected request blocks its span.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeOff {
    pub id: String,
    pub title: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub status: TimeOffStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl TimeOff {
    pub fn blocks(&self) -> bool {
        self.status != TimeOffStatus::Rejected
    }
}

/// A calendar cell: a whole day, or a time on that day, read in `timezone`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityQuery {
    pub date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hour: Option<u32>,
    #[serde(default)]
    pub minute: u32,
    #[serde(default = "utc")]
    pub timezone: Tz,
}

fn utc() -> Tz {
    Tz::UTC
}

impl AvailabilityQuery {
    /// Day-level query.
    pub fn day(date: NaiveDate) -> Self {
        Self {
            date,
            hour: None,
            minute: 0,
            timezone: Tz::UTC,
        }
    }

    /// Time-level query. Out-of-range values are clamped to 23:59.
    pub fn at(date: NaiveDate, hour: u32, minute: u32) -> Self {
        Self {
            hour: Some(hour.min(23)),
            minute: minute.min(59),
            ..Self::day(date)
        }
    }

    pub fn in_timezone(mut self, tz: Tz) -> Self {
        self.timezone = tz;
        self
    }

    pub fn is_day_level(&self) -> bool {
        self.hour.is_none()
    }

    fn minute_of_day(&self) -> Option<u32> {
        self.hour.map(|h| h.min(23) * 60 + self.minute.min(59))
    }

    /// The instant the cell starts at.
    fn instant(&self) -> DateTime<Utc> {
        let minutes = self.minute_of_day().unwrap_or(0);
        let time = NaiveTime::from_hms_opt(minutes / 60, minutes % 60, 0).unwrap_or(NaiveTime::MIN);
        local_to_utc(self.timezone, self.date.and_time(time))
    }

    /// Whether the span `[start, end)` covers this cell: instant containment
    /// for a time-level query, closed day-range containment for a day query.
    fn is_covered_by(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        if self.is_day_level() {
            let first = utc_to_local(self.timezone, start).date();
            let last = utc_to_local(self.timezone, end.max(start)).date();
            first <= self.date && self.date <= last
        } else {
            let at = self.instant();
            start <= at && at < end
        }
    }
}

/// Whether `resource` can be booked in the queried cell.
pub fn is_available(resource: &Resource, query: &AvailabilityQuery) -> bool {
    let minute = query.minute_of_day();

    let by_policy = match resource.slot_policy() {
        SlotPolicy::Whitelist(template) => {
            template.evaluate(query.date, minute, DisabledEntries::Empty) == TemplateMatch::Inside
        }
        SlotPolicy::Blacklist(blocked) => {
            !is_blocked(blocked, query) && within_business_hours(resource, query.date, minute)
        }
        SlotPolicy::None => within_business_hours(resource, query.date, minute),
    };

    by_policy && !on_time_off(resource, query)
}

/// Whether the resource's blacklist blocks the cell. Always false when a
/// whitelist is configured, since the blacklist is then not consulted.
pub fn is_blocked_slot(resource: &Resource, query: &AvailabilityQuery) -> bool {
    match resource.slot_policy() {
        SlotPolicy::Blacklist(blocked) => is_blocked(blocked, query),
        _ => false,
    }
}

/// Every time-off of the resource (whatever its status) that overlaps the cell.
pub fn time_offs_for_slot<'a>(
    resource: &'a Resource,
    query: &AvailabilityQuery,
) -> Vec<&'a TimeOff> {
    resource
        .time_offs
        .iter()
        .filter(|t| query.is_covered_by(t.start, t.end))
        .collect()
}

fn within_business_hours(resource: &Resource, date: NaiveDate, minute: Option<u32>) -> bool {
    resource
        .business_hours
        .as_ref()
        .is_none_or(|hours| hours.allows(date, minute))
}

fn on_time_off(resource: &Resource, query: &AvailabilityQuery) -> bool {
    resource
        .time_offs
        .iter()
        .any(|t| t.blocks() && query.is_covered_by(t.start, t.end))
}

fn is_blocked(blocked: &BlockedSlots, query: &AvailabilityQuery) -> bool {
    let in_template = blocked
        .template
        .evaluate(query.date, query.minute_of_day(), DisabledEntries::Ignored)
        == TemplateMatch::Inside;
    if in_template {
        return true;
    }

    // Look one second either side of the cell so spans that only touch its
    // edges are still seen; `is_covered_by` makes the exact call.
    let window = if query.is_day_level() {
        let day = TimeWindow::day(query.date, query.timezone);
        TimeWindow::new(day.start - Duration::seconds(1), day.end)
    } else {
        let at = query.instant();
        TimeWindow::new(at, at)
    };

    blocked.slots.iter().any(|slot| {
        slot.spans_near(&window)
            .into_iter()
            .any(|(start, end)| query.is_covered_by(start, end))
    })
}
