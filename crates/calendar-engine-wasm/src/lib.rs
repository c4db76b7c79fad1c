//! WASM bindings for calendar-engine.
//!
//! Exposes occurrence expansion, resource availability and event layout to the
//! JavaScript rendering layer via `wasm-bindgen`. Complex values cross the
//! boundary as JSON strings in the engine's own serde shapes; instants are
//! RFC 3339 strings.
//!
//! ## Build process
//!
//! ```sh
//! cargo build -p calendar-engine-wasm --target wasm32-unknown-unknown --release
//! wasm-bindgen --target web --out-dir packages/calendar-engine-js/wasm/ \
//!   target/wasm32-unknown-unknown/release/calendar_engine_wasm.wasm
//! ```

use calendar_engine::occurrence::parse_timezone;
use calendar_engine::{
    AvailabilityQuery, DayWindow, EventDefinition, GridWindow, Occurrence, Resource, TimeWindow,
    VisibleHours,
};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use wasm_bindgen::prelude::*;

// ---------------------------------------------------------------------------
// Input shapes that differ from the engine's own types
// ---------------------------------------------------------------------------

/// A calendar cell as sent from JavaScript. The timezone is an IANA name.
#[derive(Deserialize)]
struct QueryInput {
    date: NaiveDate,
    #[serde(default)]
    hour: Option<u32>,
    #[serde(default)]
    minute: u32,
    #[serde(default)]
    timezone: Option<String>,
}

impl QueryInput {
    fn into_query(self) -> Result<AvailabilityQuery, String> {
        let query = match self.hour {
            Some(hour) => AvailabilityQuery::at(self.date, hour, self.minute),
            None => AvailabilityQuery::day(self.date),
        };
        match self.timezone.as_deref() {
            Some(name) => Ok(query.in_timezone(parse_timezone(name).map_err(|e| e.to_string())?)),
            None => Ok(query),
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Parse an ISO 8601 datetime string into `DateTime<Utc>`.
///
/// Accepts RFC 3339 (with offset) and naive datetimes, which are read as UTC.
fn parse_datetime(s: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
        .map(|ndt| ndt.and_utc())
        .map_err(|e| format!("Invalid datetime '{}': {}", s, e))
}

fn from_json<T: DeserializeOwned>(what: &str, json: &str) -> Result<T, String> {
    serde_json::from_str(json).map_err(|e| format!("Invalid {} JSON: {}", what, e))
}

fn to_json<T: Serialize>(value: &T) -> Result<String, String> {
    serde_json::to_string(value).map_err(|e| format!("Serialization error: {}", e))
}

fn expand_events_json(
    definitions_json: &str,
    window_start: &str,
    window_end: &str,
) -> Result<String, String> {
    let definitions: Vec<EventDefinition> = from_json("events", definitions_json)?;
    let window = TimeWindow::new(parse_datetime(window_start)?, parse_datetime(window_end)?);
    to_json(&calendar_engine::expand_all(&definitions, &window))
}

fn resource_and_query(
    resource_json: &str,
    query_json: &str,
) -> Result<(Resource, AvailabilityQuery), String> {
    let resource: Resource = from_json("resource", resource_json)?;
    let query = from_json::<QueryInput>("query", query_json)?.into_query()?;
    Ok((resource, query))
}

fn layout_grid_json(
    occurrences_json: &str,
    window_json: &str,
    max_rows: u32,
) -> Result<String, String> {
    let occurrences: Vec<Occurrence> = from_json("occurrences", occurrences_json)?;
    let window: GridWindow = from_json("grid window", window_json)?;
    to_json(&calendar_engine::layout_grid(&occurrences, &window, max_rows as usize))
}

fn layout_day_json(occurrences_json: &str, window_json: &str) -> Result<String, String> {
    let occurrences: Vec<Occurrence> = from_json("occurrences", occurrences_json)?;
    let window: DayWindow = from_json("day window", window_json)?;
    to_json(&calendar_engine::layout_day(&occurrences, &window))
}

// ---------------------------------------------------------------------------
// WASM exports
// ---------------------------------------------------------------------------

/// Expand event definitions into the occurrences that fall in a window.
///
/// `definitions_json` is a JSON array of event definitions; `window_start`
/// and `window_end` are ISO 8601 datetime strings. Returns a JSON object
/// `{occurrences, diagnostics}`.
#[wasm_bindgen(js_name = "expandEvents")]
pub fn expand_events(
    definitions_json: &str,
    window_start: &str,
    window_end: &str,
) -> Result<String, JsValue> {
    expand_events_json(definitions_json, window_start, window_end)
        .map_err(|e| JsValue::from_str(&e))
}

/// Whether a resource can be booked in a cell.
///
/// `query_json` is `{date, hour?, minute?, timezone?}`; omit `hour` for a
/// day-level query.
#[wasm_bindgen(js_name = "isResourceAvailable")]
pub fn is_resource_available(resource_json: &str, query_json: &str) -> Result<bool, JsValue> {
    let (resource, query) =
        resource_and_query(resource_json, query_json).map_err(|e| JsValue::from_str(&e))?;
    Ok(calendar_engine::is_available(&resource, &query))
}

/// Every time-off of the resource overlapping the cell, as a JSON array.
#[wasm_bindgen(js_name = "timeOffsForSlot")]
pub fn time_offs_for_slot(resource_json: &str, query_json: &str) -> Result<String, JsValue> {
    resource_and_query(resource_json, query_json)
        .and_then(|(resource, query)| {
            to_json(&calendar_engine::time_offs_for_slot(&resource, &query))
        })
        .map_err(|e| JsValue::from_str(&e))
}

/// Bin-pack occurrences into a day or hour grid. Returns a JSON object
/// `{positioned, dropped, hidden_per_column}`.
#[wasm_bindgen(js_name = "layoutGrid")]
pub fn layout_grid(
    occurrences_json: &str,
    window_json: &str,
    max_rows: u32,
) -> Result<String, JsValue> {
    layout_grid_json(occurrences_json, window_json, max_rows).map_err(|e| JsValue::from_str(&e))
}

/// Position the timed occurrences of one day along its time axis. Returns a
/// JSON array of positioned occurrences.
#[wasm_bindgen(js_name = "layoutDay")]
pub fn layout_day(occurrences_json: &str, window_json: &str) -> Result<String, JsValue> {
    layout_day_json(occurrences_json, window_json).map_err(|e| JsValue::from_str(&e))
}

/// Number of hours shown on the time axis for the given bounds.
#[wasm_bindgen(js_name = "visibleHoursCount")]
pub fn visible_hours_count(start_time: Option<i32>, end_time: Option<i32>) -> u32 {
    VisibleHours { start_time, end_time }.count()
}
