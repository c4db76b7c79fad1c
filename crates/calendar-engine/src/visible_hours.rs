//! The range of hours shown on a day/week time axis.

use serde::{Deserialize, Serialize};

/// Visible hour range. Missing bounds default to 0 and 24; values outside
/// 0–24 are clamped, and an inverted range shows nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VisibleHours {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<i32>,
}

impl VisibleHours {
    pub fn new(start_time: i32, end_time: i32) -> Self {
        Self {
            start_time: Some(start_time),
            end_time: Some(end_time),
        }
    }

    /// Clamped `(start, end)` hours. `end` may be below `start`.
    pub fn bounds(&self) -> (u32, u32) {
        let start = self.start_time.unwrap_or(0).clamp(0, 24) as u32;
        let end = self.end_time.unwrap_or(24).clamp(0, 24) as u32;
        (start, end)
    }

    pub fn count(&self) -> u32 {
        let (start, end) = self.bounds();
        end.saturating_sub(start)
    }

    pub fn hours(&self) -> Vec<u32> {
        let (start, end) = self.bounds();
        (start..end).collect()
    }

    pub fn contains(&self, hour: u32) -> bool {
        let (start, end) = self.bounds();
        hour < 24 && start <= hour && hour < end
    }
}

/// Hours to draw on the time axis; all 24 when unconfigured.
pub fn visible_hours(visible: Option<&VisibleHours>) -> Vec<u32> {
    visible.copied().unwrap_or_default().hours()
}

pub fn is_visible_hour(hour: u32, visible: Option<&VisibleHours>) -> bool {
    visible.copied().unwrap_or_default().contains(hour)
}

pub fn visible_hours_count(visible: Option<&VisibleHours>) -> u32 {
    visible.copied().unwrap_or_default().count()
}
