//! Grid bin-packing for month rows, all-day lanes and resource timelines.
//!
//! Occurrences spanning at least one whole unit (day or hour slot) are placed
//! first, earliest start and then longest first, each in the top-most row whose
//! cells are free across its whole span. If no row fits, the start is shifted
//! right one column at a time (the painted bar is truncated at the start)
//! until a row fits or no columns remain. Shorter occurrences then fill the
//! first free row of their column. Anything that does not fit is dropped and
//! reported, never overlapped.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use super::PositionedOccurrence;
use crate::occurrence::{utc_to_local, Occurrence};
use crate::visible_hours::VisibleHours;

pub const DAY_NUMBER_HEIGHT: f64 = 28.0;
pub const EVENT_BAR_HEIGHT: f64 = 24.0;
pub const GAP_BETWEEN_ELEMENTS: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GridUnit {
    Day,
    Hour,
}

impl GridUnit {
    pub fn length(self) -> Duration {
        match self {
            GridUnit::Day => Duration::days(1),
            GridUnit::Hour => Duration::hours(1),
        }
    }
}

fn utc() -> Tz {
    Tz::UTC
}

/// The visible columns: ascending wall-clock starts of each day or hour slot.
/// Gaps between columns (hidden hours) are allowed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridWindow {
    pub columns: Vec<NaiveDateTime>,
    pub unit: GridUnit,
    #[serde(default = "utc")]
    pub timezone: Tz,
}

impl GridWindow {
    /// `count` consecutive day columns starting at `first`.
    pub fn days(first: NaiveDate, count: usize, tz: Tz) -> Self {
        let columns = first
            .iter_days()
            .take(count)
            .map(|d| d.and_time(NaiveTime::MIN))
            .collect();
        Self {
            columns,
            unit: GridUnit::Day,
            timezone: tz,
        }
    }

    /// One hour column per visible hour of `date`.
    pub fn hours(date: NaiveDate, visible: &VisibleHours, tz: Tz) -> Self {
        Self::hours_for_days(&[date], visible, tz)
    }

    /// Visible hour columns for several days, e.g. a resource week timeline.
    pub fn hours_for_days(dates: &[NaiveDate], visible: &VisibleHours, tz: Tz) -> Self {
        let columns = dates
            .iter()
            .flat_map(|date| {
                visible
                    .hours()
                    .into_iter()
                    .filter_map(move |h| date.and_hms_opt(h, 0, 0))
            })
            .collect();
        Self {
            columns,
            unit: GridUnit::Hour,
            timezone: tz,
        }
    }
}

/// Vertical metrics of a grid cell. Missing fields take the defaults.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridMetrics {
    pub header_height: f64,
    pub bar_height: f64,
    pub gap: f64,
}

impl Default for GridMetrics {
    fn default() -> Self {
        Self {
            header_height: DAY_NUMBER_HEIGHT,
            bar_height: EVENT_BAR_HEIGHT,
            gap: GAP_BETWEEN_ELEMENTS,
        }
    }
}

impl GridMetrics {
    fn row_top(&self, row: usize) -> f64 {
        self.header_height + self.gap + row as f64 * (self.bar_height + self.gap)
    }
}

/// Result of a grid layout.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GridLayout {
    pub positioned: Vec<PositionedOccurrence>,
    /// Visible occurrences that found no free row.
    pub dropped: Vec<Occurrence>,
    /// Per column, how many dropped occurrences touch it ("+N more").
    pub hidden_per_column: Vec<usize>,
}

/// Row-major occupancy flags, discarded after each layout call.
struct Occupancy {
    rows: usize,
    columns: usize,
    taken: Vec<bool>,
}

impl Occupancy {
    fn new(rows: usize, columns: usize) -> Self {
        Self {
            rows,
            columns,
            taken: vec![false; rows * columns],
        }
    }

    fn is_free(&self, row: usize, first: usize, last: usize) -> bool {
        let base = row * self.columns;
        self.taken[base + first..=base + last].iter().all(|t| !t)
    }

    fn first_free_row(&self, first: usize, last: usize) -> Option<usize> {
        (0..self.rows).find(|&row| self.is_free(row, first, last))
    }

    fn mark(&mut self, row: usize, first: usize, last: usize) {
        let base = row * self.columns;
        self.taken[base + first..=base + last].fill(true);
    }
}

/// Columns an occurrence touches, clipped to the window.
struct ColumnSpan {
    first: usize,
    last: usize,
    truncated_start: bool,
    truncated_end: bool,
}

fn column_span(
    columns: &[NaiveDateTime],
    unit: Duration,
    start: NaiveDateTime,
    end: NaiveDateTime,
) -> Option<ColumnSpan> {
    let first = columns.iter().position(|c| *c + unit > start)?;
    let last = columns.iter().rposition(|c| *c <= end)?;
    if first > last {
        return None;
    }
    Some(ColumnSpan {
        first,
        last,
        truncated_start: start < columns[first],
        truncated_end: end >= columns[last] + unit,
    })
}

/// Lay out occurrences on `window` with at most `max_rows` rows per cell,
/// using the default [`GridMetrics`].
pub fn layout_grid(occurrences: &[Occurrence], window: &GridWindow, max_rows: usize) -> GridLayout {
    layout_grid_with(occurrences, window, max_rows, &GridMetrics::default())
}

pub fn layout_grid_with(
    occurrences: &[Occurrence],
    window: &GridWindow,
    max_rows: usize,
    metrics: &GridMetrics,
) -> GridLayout {
    let mut columns = window.columns.clone();
    columns.sort();
    columns.dedup();
    let column_count = columns.len();
    let unit = window.unit.length();

    let mut layout = GridLayout {
        hidden_per_column: vec![0; column_count],
        ..GridLayout::default()
    };
    if column_count == 0 {
        return layout;
    }

    // Wall-clock start and inclusive end; the end steps back a second so an
    // occurrence ending exactly on a boundary does not claim the next column.
    let local = |o: &Occurrence| {
        let (start, end) = o.span();
        let start = utc_to_local(window.timezone, start);
        let end = utc_to_local(window.timezone, end);
        let last = if end > start { end - Duration::seconds(1) } else { start };
        (start, last)
    };

    let (mut multi, mut single): (Vec<&Occurrence>, Vec<&Occurrence>) =
        occurrences.iter().partition(|o| o.duration() >= unit);
    multi.sort_by(|a, b| a.start.cmp(&b.start).then(b.duration().cmp(&a.duration())));
    single.sort_by_key(|o| o.start);

    // No layout needs more rows than it has occurrences.
    let mut grid = Occupancy::new(max_rows.min(occurrences.len()), column_count);
    let geometry = |occurrence: &Occurrence, row: usize, first: usize, last: usize| {
        let span = (last - first + 1) as f64;
        PositionedOccurrence {
            occurrence: occurrence.clone(),
            left: first as f64 / column_count as f64 * 100.0,
            width: span / column_count as f64 * 100.0,
            top: metrics.row_top(row),
            height: metrics.bar_height,
            row,
            z_index: 1,
            truncated_start: false,
            truncated_end: false,
        }
    };

    for occurrence in multi {
        let (start, end) = local(occurrence);
        let Some(span) = column_span(&columns, unit, start, end) else {
            continue;
        };

        let placement = (span.first..=span.last)
            .find_map(|first| grid.first_free_row(first, span.last).map(|row| (row, first)));

        match placement {
            Some((row, first)) => {
                grid.mark(row, first, span.last);
                let mut positioned = geometry(occurrence, row, first, span.last);
                positioned.truncated_start = span.truncated_start || first > span.first;
                positioned.truncated_end = span.truncated_end;
                layout.positioned.push(positioned);
            }
            None => {
                tracing::debug!(
                    event_id = %occurrence.id,
                    "No free row for multi-unit occurrence, dropping"
                );
                for hidden in &mut layout.hidden_per_column[span.first..=span.last] {
                    *hidden += 1;
                }
                layout.dropped.push(occurrence.clone());
            }
        }
    }

    for occurrence in single {
        let (start, end) = local(occurrence);
        let Some(span) = column_span(&columns, unit, start, end) else {
            continue;
        };
        let column = span.first;

        match grid.first_free_row(column, column) {
            Some(row) => {
                grid.mark(row, column, column);
                layout.positioned.push(geometry(occurrence, row, column, column));
            }
            None => {
                tracing::debug!(
                    event_id = %occurrence.id,
                    column,
                    "Cell full, dropping occurrence"
                );
                layout.hidden_per_column[column] += 1;
                layout.dropped.push(occurrence.clone());
            }
        }
    }

    layout
}
