//! Time-axis layout for a single day column.
//!
//! Timed occurrences on the day are grouped into clusters of mutually
//! overlapping events. A lone event takes the full width. In a larger cluster
//! the longest event sits full-width at the back and each following event is
//! shifted right by an even step and drawn one layer higher.

use chrono::{NaiveDate, NaiveDateTime, Timelike};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use super::PositionedOccurrence;
use crate::occurrence::{utc_to_local, Occurrence, TimeWindow};
use crate::visible_hours::VisibleHours;

fn utc() -> Tz {
    Tz::UTC
}

/// The day column being laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayWindow {
    pub date: NaiveDate,
    #[serde(default)]
    pub visible_hours: VisibleHours,
    #[serde(default = "utc")]
    pub timezone: Tz,
}

impl DayWindow {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            visible_hours: VisibleHours::default(),
            timezone: Tz::UTC,
        }
    }

    pub fn with_visible_hours(mut self, visible_hours: VisibleHours) -> Self {
        self.visible_hours = visible_hours;
        self
    }

    pub fn in_timezone(mut self, tz: Tz) -> Self {
        self.timezone = tz;
        self
    }
}

/// Total horizontal offset spread across a cluster of `size` events.
pub fn cluster_spread(size: usize) -> f64 {
    match size {
        0 | 1 => 0.0,
        2 => 25.0,
        3 => 50.0,
        4 => 60.0,
        _ => 70.0,
    }
}

struct Timed<'a> {
    occurrence: &'a Occurrence,
    /// Fractional hours on this day, clipped to 0..=24.
    start_hour: f64,
    end_hour: f64,
    /// Starts on an earlier day / ends on a later day.
    spills_before: bool,
    spills_after: bool,
}

fn hour_on(date: NaiveDate, at: NaiveDateTime) -> f64 {
    if at.date() < date {
        0.0
    } else if at.date() > date {
        24.0
    } else {
        at.hour() as f64 + at.minute() as f64 / 60.0
    }
}

/// Position the timed occurrences of `window.date` along its time axis.
/// All-day occurrences are left to the grid layout.
pub fn layout_day(occurrences: &[Occurrence], window: &DayWindow) -> Vec<PositionedOccurrence> {
    let (visible_start, visible_end) = window.visible_hours.bounds();
    if visible_end <= visible_start {
        return Vec::new();
    }
    let (visible_start, visible_end) = (visible_start as f64, visible_end as f64);
    let visible_span = visible_end - visible_start;

    let day = TimeWindow::day(window.date, window.timezone);
    let mut timed: Vec<Timed<'_>> = occurrences
        .iter()
        .filter(|o| !o.all_day)
        .filter(|o| {
            let (start, end) = o.span();
            day.intersects(start, end)
        })
        .map(|o| {
            let (start, end) = o.span();
            let start_hour = hour_on(window.date, utc_to_local(window.timezone, start));
            let end_hour = hour_on(window.date, utc_to_local(window.timezone, end));
            Timed {
                occurrence: o,
                start_hour,
                end_hour: end_hour.max(start_hour),
                spills_before: start < day.start,
                spills_after: end > day.end + chrono::Duration::seconds(1),
            }
        })
        .collect();
    timed.sort_by_key(|t| t.occurrence.start);

    let mut clusters: Vec<Vec<Timed<'_>>> = Vec::new();
    let mut cluster_end = None;
    for t in timed {
        let (start, end) = t.occurrence.span();
        match cluster_end {
            Some(running_end) if start < running_end => {
                if let Some(cluster) = clusters.last_mut() {
                    cluster.push(t);
                }
                cluster_end = Some(end.max(running_end));
            }
            _ => {
                clusters.push(vec![t]);
                cluster_end = Some(end);
            }
        }
    }

    let place = |t: &Timed<'_>, left: f64, row: usize| -> Option<PositionedOccurrence> {
        if t.end_hour <= visible_start || t.start_hour >= visible_end {
            return None;
        }
        let top = if t.start_hour < visible_start {
            0.0
        } else {
            (t.start_hour - visible_start) / visible_span * 100.0
        };
        let shown = t.end_hour.min(visible_end) - t.start_hour.max(visible_start);
        Some(PositionedOccurrence {
            occurrence: t.occurrence.clone(),
            left,
            width: 100.0 - left,
            top,
            height: shown / visible_span * 100.0,
            row,
            z_index: row as u32 + 1,
            truncated_start: t.spills_before || t.start_hour < visible_start,
            truncated_end: t.spills_after || t.end_hour > visible_end,
        })
    };

    let mut positioned = Vec::new();
    for mut cluster in clusters {
        if cluster.len() == 1 {
            positioned.extend(place(&cluster[0], 0.0, 0));
            continue;
        }

        cluster.sort_by(|a, b| {
            b.occurrence
                .duration()
                .cmp(&a.occurrence.duration())
                .then(a.occurrence.start.cmp(&b.occurrence.start))
        });
        let step = cluster_spread(cluster.len()) / (cluster.len() - 1) as f64;
        for (layer, t) in cluster.iter().enumerate() {
            positioned.extend(place(t, step * layer as f64, layer));
        }
    }

    positioned
}
