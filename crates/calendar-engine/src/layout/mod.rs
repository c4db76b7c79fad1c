//! Event layout: screen-space placement of occurrences so overlapping events
//! stay legible and never collide.
//!
//! Two complementary algorithms, chosen by the caller per view type:
//!
//! - [`grid`] — bin-packing of occurrences into a rows × columns grid of days
//!   or hour slots (month rows, all-day lanes, resource timelines)
//! - [`day`] — clustering and layered offsets along a single day's time axis
//!   (day and week columns)
//!
//! Both are pure functions of their inputs: identical input yields identical
//! geometry.

pub mod day;
pub mod grid;

use serde::{Deserialize, Serialize};

use crate::occurrence::Occurrence;

/// An occurrence plus the geometry it should be painted with.
///
/// `left` and `width` are percentages of the containing row or column. For
/// day layout `top` and `height` are percentages of the visible time span; for
/// grid layout they are in the units of [`grid::GridMetrics`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionedOccurrence {
    #[serde(flatten)]
    pub occurrence: Occurrence,
    pub left: f64,
    pub width: f64,
    pub top: f64,
    pub height: f64,
    /// Grid row, or layer index within an overlap cluster.
    pub row: usize,
    /// Stacking order; higher paints on top.
    pub z_index: u32,
    /// The occurrence really starts before the painted span.
    pub truncated_start: bool,
    /// The occurrence really ends after the painted span.
    pub truncated_end: bool,
}
