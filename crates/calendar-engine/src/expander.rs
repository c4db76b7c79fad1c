//! Occurrence expansion: turns event definitions into the concrete occurrences
//! that fall in a display window.
//!
//! Wraps the `rrule` crate. The rule is rendered with a `DTSTART;TZID=` line so
//! the series keeps its wall-clock time across DST changes, then expanded only
//! between the window bounds. Exception dates are removed and override
//! occurrences substituted for the instants they replace.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Duration, Utc};
use rrule::RRuleSet;
use serde::{Deserialize, Serialize};

use crate::error::{CalendarError, Result};
use crate::occurrence::{Occurrence, TimeWindow};
use crate::recurrence::RecurrencePattern;

/// Upper bound on instants generated for one pattern in one window.
pub const MAX_INSTANCES: u16 = 1000;

/// An event as supplied by the caller: the base occurrence plus its optional
/// recurrence, exception instants and per-instance overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventDefinition {
    #[serde(flatten)]
    pub event: Occurrence,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurrence: Option<RecurrencePattern>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exdates: Vec<DateTime<Utc>>,
    /// Replacement occurrences, keyed by their `recurrence_id`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub overrides: Vec<Occurrence>,
}

impl EventDefinition {
    pub fn single(event: Occurrence) -> Self {
        Self {
            event,
            recurrence: None,
            exdates: Vec::new(),
            overrides: Vec::new(),
        }
    }

    pub fn recurring(event: Occurrence, pattern: RecurrencePattern) -> Self {
        Self {
            recurrence: Some(pattern),
            ..Self::single(event)
        }
    }

    pub fn with_exdates(mut self, exdates: Vec<DateTime<Utc>>) -> Self {
        self.exdates = exdates;
        self
    }

    pub fn with_overrides(mut self, overrides: Vec<Occurrence>) -> Self {
        self.overrides = overrides;
        self
    }
}

/// Recoverable problems found while expanding. Reported alongside the output
/// rather than raised.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// The pattern was rejected; the event was treated as non-recurring.
    MalformedPattern { event_id: String, reason: String },
    /// Expansion stopped at [`MAX_INSTANCES`]; later instants are missing.
    InstanceLimitReached { event_id: String, limit: u16 },
    /// An override points at an instant the pattern does not generate.
    UnmatchedOverride {
        event_id: String,
        recurrence_id: DateTime<Utc>,
    },
}

/// Result of expanding one or more event definitions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Expansion {
    /// Occurrences sorted by start instant.
    pub occurrences: Vec<Occurrence>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Instants generated by a pattern inside a window.
#[derive(Debug, Clone, PartialEq)]
pub struct PatternInstances {
    pub starts: Vec<DateTime<Utc>>,
    /// True when [`MAX_INSTANCES`] cut the expansion short.
    pub limited: bool,
}

/// Expand one pattern into the start instants whose span of `duration`
/// intersects `window`, with `exdates` removed.
///
/// This is the single expansion routine behind both event occurrences and
/// recurring blocked slots.
///
/// # Errors
/// Returns `CalendarError::InvalidRule` if the pattern fails validation or the
/// `rrule` crate rejects it.
pub fn expand_pattern(
    pattern: &RecurrencePattern,
    anchor: DateTime<Utc>,
    duration: Duration,
    exdates: &[DateTime<Utc>],
    window: &TimeWindow,
) -> Result<PatternInstances> {
    let rule = pattern.to_rrule()?;

    let empty = PatternInstances {
        starts: Vec::new(),
        limited: false,
    };
    if pattern.count == Some(0) || window.is_inverted() {
        return Ok(empty);
    }

    let tz = pattern.timezone;
    let anchor = pattern.dtstart.unwrap_or(anchor);
    let dtstart_ical = anchor.with_timezone(&tz).format("%Y%m%dT%H%M%S");
    let rrule_text = format!("DTSTART;TZID={}:{}\nRRULE:{}", tz.name(), dtstart_ical, rule);

    let rrule_set: RRuleSet = rrule_text
        .parse()
        .map_err(|e| CalendarError::InvalidRule(format!("{}", e)))?;

    // Pad the bounds by a second so bound inclusivity in the rrule crate does
    // not matter; the exact window test happens below.
    let duration = duration.max(Duration::zero());
    let lower = window.start - duration - Duration::seconds(1);
    let mut upper = window.end + Duration::seconds(1);
    if let Some(until) = pattern.until {
        upper = upper.min(until + Duration::seconds(1));
    }
    if upper <= lower {
        return Ok(empty);
    }

    let rtz = rrule::Tz::Tz(tz);
    let result = rrule_set
        .after(lower.with_timezone(&rtz))
        .before(upper.with_timezone(&rtz))
        .all(MAX_INSTANCES);

    let limited = result.limited || result.dates.len() >= usize::from(MAX_INSTANCES);
    let excluded: HashSet<DateTime<Utc>> = exdates.iter().copied().collect();
    let starts = result
        .dates
        .into_iter()
        .map(|dt| dt.with_timezone(&Utc))
        .filter(|start| pattern.until.is_none_or(|until| *start <= until))
        .filter(|start| !excluded.contains(start))
        .filter(|start| window.intersects(*start, *start + duration))
        .collect();

    Ok(PatternInstances { starts, limited })
}

/// Expand a single event definition into the occurrences intersecting `window`.
pub fn expand(definition: &EventDefinition, window: &TimeWindow) -> Expansion {
    expand_all(std::slice::from_ref(definition), window)
}

/// Expand many event definitions at once.
///
/// Output is sorted by start instant; ties keep the order of `definitions`,
/// and within one series an override sorts before a base occurrence.
pub fn expand_all(definitions: &[EventDefinition], window: &TimeWindow) -> Expansion {
    let mut ranked = Vec::new();
    let mut diagnostics = Vec::new();

    for (series, definition) in definitions.iter().enumerate() {
        expand_series(definition, series, window, &mut ranked, &mut diagnostics);
    }

    ranked.sort_by(|a, b| {
        a.occurrence
            .start
            .cmp(&b.occurrence.start)
            .then(a.series.cmp(&b.series))
            .then(b.is_override.cmp(&a.is_override))
    });

    Expansion {
        occurrences: ranked.into_iter().map(|r| r.occurrence).collect(),
        diagnostics,
    }
}

struct Ranked {
    occurrence: Occurrence,
    series: usize,
    is_override: bool,
}

fn expand_series(
    definition: &EventDefinition,
    series: usize,
    window: &TimeWindow,
    out: &mut Vec<Ranked>,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let base = &definition.event;
    let (start, end) = base.span();
    let duration = end - start;

    let push_single = |out: &mut Vec<Ranked>| {
        if window.intersects(start, end) {
            let mut occurrence = base.clone();
            occurrence.end = end;
            out.push(Ranked {
                occurrence,
                series,
                is_override: false,
            });
        }
    };

    let Some(pattern) = &definition.recurrence else {
        push_single(out);
        return;
    };

    let instances = match expand_pattern(pattern, start, duration, &definition.exdates, window) {
        Ok(instances) => instances,
        Err(e) => {
            tracing::warn!(
                event_id = %base.id,
                error = %e,
                "Malformed recurrence, treating event as non-recurring"
            );
            diagnostics.push(Diagnostic::MalformedPattern {
                event_id: base.id.clone(),
                reason: e.to_string(),
            });
            push_single(out);
            return;
        }
    };

    if instances.limited {
        tracing::warn!(
            event_id = %base.id,
            limit = MAX_INSTANCES,
            "Recurrence expansion hit the instance limit"
        );
        diagnostics.push(Diagnostic::InstanceLimitReached {
            event_id: base.id.clone(),
            limit: MAX_INSTANCES,
        });
    }

    let mut overrides: BTreeMap<DateTime<Utc>, &Occurrence> = BTreeMap::new();
    for replacement in &definition.overrides {
        match replacement.recurrence_id {
            Some(rid) => {
                overrides.entry(rid).or_insert(replacement);
            }
            None => {
                tracing::debug!(event_id = %base.id, "Override without recurrence_id ignored");
            }
        }
    }

    let mut matched = HashSet::new();
    for instant in &instances.starts {
        if let Some(replacement) = overrides.get(instant) {
            matched.insert(*instant);
            let mut occurrence = (*replacement).clone();
            occurrence.id = base.id.clone();
            occurrence.recurrence_id = Some(*instant);
            let (o_start, o_end) = occurrence.span();
            occurrence.end = o_end;
            if window.intersects(o_start, o_end) {
                out.push(Ranked {
                    occurrence,
                    series,
                    is_override: true,
                });
            }
        } else {
            let mut occurrence = base.clone();
            occurrence.start = *instant;
            occurrence.end = *instant + duration;
            occurrence.recurrence_id = None;
            out.push(Ranked {
                occurrence,
                series,
                is_override: false,
            });
        }
    }

    if instances.limited {
        return;
    }
    for rid in overrides.keys() {
        let replaced_in_window = window.intersects(*rid, *rid + duration);
        if replaced_in_window && !matched.contains(rid) && !definition.exdates.contains(rid) {
            tracing::warn!(
                event_id = %base.id,
                recurrence_id = %rid,
                "Override matches no generated instant"
            );
            diagnostics.push(Diagnostic::UnmatchedOverride {
                event_id: base.id.clone(),
                recurrence_id: *rid,
            });
        }
    }
}
