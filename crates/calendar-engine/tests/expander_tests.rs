//! Tests for occurrence expansion: recurrence, exception dates, overrides and
//! window filtering.

use calendar_engine::expander::{
    expand, expand_all, expand_pattern, Diagnostic, EventDefinition, MAX_INSTANCES,
};
use calendar_engine::recurrence::{Frequency, RecurrencePattern};
use calendar_engine::schedule::WeekDay;
use calendar_engine::{CalendarError, Occurrence, TimeWindow};
use chrono::{DateTime, TimeZone, Utc};

fn at(year: i32, month: u32, day: u32, hour: u32, min: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, min, 0).unwrap()
}

/// Standup, 10:00-10:30 UTC, first instance Monday 2026-03-02.
fn standup() -> Occurrence {
    Occurrence::new("standup", "Standup", at(2026, 3, 2, 10, 0), at(2026, 3, 2, 10, 30))
}

/// Monday 2026-03-02 00:00 through Sunday 2026-03-08 23:59:59.
fn first_week() -> TimeWindow {
    TimeWindow::new(at(2026, 3, 2, 0, 0), Utc.with_ymd_and_hms(2026, 3, 8, 23, 59, 59).unwrap())
}

// ---------------------------------------------------------------------------
// Recurring series
// ---------------------------------------------------------------------------

#[test]
fn daily_series_fills_the_window() {
    let def = EventDefinition::recurring(standup(), RecurrencePattern::daily());
    let result = expand(&def, &first_week());

    assert!(result.diagnostics.is_empty());
    assert_eq!(result.occurrences.len(), 7);
    for (i, occ) in result.occurrences.iter().enumerate() {
        assert_eq!(occ.id, "standup", "instances share the series id");
        assert_eq!(occ.start, at(2026, 3, 2 + i as u32, 10, 0));
        assert_eq!(occ.end, at(2026, 3, 2 + i as u32, 10, 30));
        assert!(occ.recurrence_id.is_none());
    }
}

#[test]
fn weekly_by_weekday_over_two_weeks() {
    let pattern = RecurrencePattern::weekly().on(&[WeekDay::Monday, WeekDay::Wednesday]);
    let def = EventDefinition::recurring(standup(), pattern);
    let window = TimeWindow::new(at(2026, 3, 2, 0, 0), at(2026, 3, 15, 23, 0));

    let starts: Vec<_> = expand(&def, &window).occurrences.iter().map(|o| o.start).collect();
    assert_eq!(
        starts,
        vec![
            at(2026, 3, 2, 10, 0),
            at(2026, 3, 4, 10, 0),
            at(2026, 3, 9, 10, 0),
            at(2026, 3, 11, 10, 0),
        ]
    );
}

#[test]
fn count_caps_the_series() {
    let def = EventDefinition::recurring(standup(), RecurrencePattern::weekly().count(3));
    let window = TimeWindow::new(at(2026, 1, 1, 0, 0), at(2026, 12, 31, 0, 0));

    let result = expand(&def, &window);
    assert_eq!(result.occurrences.len(), 3);
    assert_eq!(result.occurrences[2].start, at(2026, 3, 16, 10, 0));
}

#[test]
fn until_is_inclusive() {
    let pattern = RecurrencePattern::daily().until(at(2026, 3, 4, 10, 0));
    let def = EventDefinition::recurring(standup(), pattern);

    let result = expand(&def, &first_week());
    assert_eq!(result.occurrences.len(), 3);
    assert_eq!(result.occurrences.last().unwrap().start, at(2026, 3, 4, 10, 0));
}

#[test]
fn interval_skips_periods() {
    let def = EventDefinition::recurring(standup(), RecurrencePattern::daily().interval(3));
    let starts: Vec<_> = expand(&def, &first_week()).occurrences.iter().map(|o| o.start).collect();
    assert_eq!(
        starts,
        vec![at(2026, 3, 2, 10, 0), at(2026, 3, 5, 10, 0), at(2026, 3, 8, 10, 0)]
    );
}

#[test]
fn monthly_last_day_of_month() {
    let base = Occurrence::new(
        "close",
        "Month close",
        at(2026, 1, 31, 16, 0),
        at(2026, 1, 31, 17, 0),
    );
    let def = EventDefinition::recurring(base, RecurrencePattern::monthly().on_month_days(&[-1]));
    let window = TimeWindow::new(at(2026, 1, 1, 0, 0), at(2026, 4, 30, 23, 0));

    let days: Vec<_> = expand(&def, &window)
        .occurrences
        .iter()
        .map(|o| o.start.date_naive().to_string())
        .collect();
    assert_eq!(days, vec!["2026-01-31", "2026-02-28", "2026-03-31", "2026-04-30"]);
}

#[test]
fn series_keeps_wall_clock_across_dst() {
    // 09:00 New York. DST starts 2026-03-08: EST (UTC-5) → EDT (UTC-4).
    let base = Occurrence::new("ny", "NY standup", at(2026, 3, 6, 14, 0), at(2026, 3, 6, 14, 15));
    let pattern = RecurrencePattern::daily().in_timezone(chrono_tz::America::New_York);
    let def = EventDefinition::recurring(base, pattern);
    let window = TimeWindow::new(at(2026, 3, 6, 0, 0), at(2026, 3, 9, 23, 0));

    let starts: Vec<_> = expand(&def, &window).occurrences.iter().map(|o| o.start).collect();
    assert_eq!(
        starts,
        vec![
            at(2026, 3, 6, 14, 0),
            at(2026, 3, 7, 14, 0),
            at(2026, 3, 8, 13, 0),
            at(2026, 3, 9, 13, 0),
        ]
    );
}

#[test]
fn instance_limit_is_reported() {
    let def = EventDefinition::recurring(standup(), RecurrencePattern::daily());
    let window = TimeWindow::new(at(2026, 1, 1, 0, 0), at(2029, 12, 31, 0, 0));

    let result = expand(&def, &window);
    assert!(result.occurrences.len() <= MAX_INSTANCES as usize);
    assert!(result.diagnostics.contains(&Diagnostic::InstanceLimitReached {
        event_id: "standup".to_string(),
        limit: MAX_INSTANCES,
    }));
}

// ---------------------------------------------------------------------------
// Exceptions and overrides
// ---------------------------------------------------------------------------

#[test]
fn exdate_removes_instance() {
    let def = EventDefinition::recurring(standup(), RecurrencePattern::daily())
        .with_exdates(vec![at(2026, 3, 4, 10, 0)]);

    let result = expand(&def, &first_week());
    assert_eq!(result.occurrences.len(), 6);
    assert!(result.occurrences.iter().all(|o| o.start != at(2026, 3, 4, 10, 0)));
}

#[test]
fn override_replaces_instance_without_duplicate() {
    let mut moved = Occurrence::new(
        "standup",
        "Standup (moved)",
        at(2026, 3, 5, 14, 0),
        at(2026, 3, 5, 14, 30),
    );
    moved.recurrence_id = Some(at(2026, 3, 5, 10, 0));
    let def = EventDefinition::recurring(standup(), RecurrencePattern::daily())
        .with_overrides(vec![moved]);

    let result = expand(&def, &first_week());
    assert_eq!(result.occurrences.len(), 7);
    assert!(result.diagnostics.is_empty());

    let on_thursday: Vec<_> = result
        .occurrences
        .iter()
        .filter(|o| o.start.date_naive() == at(2026, 3, 5, 0, 0).date_naive())
        .collect();
    assert_eq!(on_thursday.len(), 1, "the generated instance is replaced, not duplicated");
    assert_eq!(on_thursday[0].title, "Standup (moved)");
    assert_eq!(on_thursday[0].start, at(2026, 3, 5, 14, 0));
    assert_eq!(on_thursday[0].recurrence_id, Some(at(2026, 3, 5, 10, 0)));
}

#[test]
fn exdate_wins_over_override() {
    let mut moved =
        Occurrence::new("standup", "Moved", at(2026, 3, 5, 14, 0), at(2026, 3, 5, 14, 30));
    moved.recurrence_id = Some(at(2026, 3, 5, 10, 0));
    let def = EventDefinition::recurring(standup(), RecurrencePattern::daily())
        .with_exdates(vec![at(2026, 3, 5, 10, 0)])
        .with_overrides(vec![moved]);

    let result = expand(&def, &first_week());
    assert_eq!(result.occurrences.len(), 6);
    assert!(result.occurrences.iter().all(|o| o.title != "Moved"));
    assert!(result.diagnostics.is_empty());
}

#[test]
fn override_for_ungenerated_instant_is_diagnosed() {
    let mut stray =
        Occurrence::new("standup", "Stray", at(2026, 3, 5, 15, 0), at(2026, 3, 5, 15, 30));
    stray.recurrence_id = Some(at(2026, 3, 5, 11, 0));
    let def = EventDefinition::recurring(standup(), RecurrencePattern::daily())
        .with_overrides(vec![stray]);

    let result = expand(&def, &first_week());
    assert_eq!(result.occurrences.len(), 7);
    assert_eq!(
        result.diagnostics,
        vec![Diagnostic::UnmatchedOverride {
            event_id: "standup".to_string(),
            recurrence_id: at(2026, 3, 5, 11, 0),
        }]
    );
}

// ---------------------------------------------------------------------------
// Degradation and non-recurring events
// ---------------------------------------------------------------------------

#[test]
fn malformed_pattern_degrades_to_single_occurrence() {
    let def = EventDefinition::recurring(standup(), RecurrencePattern::daily().interval(0));

    let result = expand(&def, &first_week());
    assert_eq!(result.occurrences.len(), 1);
    assert_eq!(result.occurrences[0].start, at(2026, 3, 2, 10, 0));
    assert!(matches!(
        result.diagnostics.as_slice(),
        [Diagnostic::MalformedPattern { event_id, .. }] if event_id == "standup"
    ));
}

#[test]
fn single_event_is_filtered_by_window() {
    let inside = EventDefinition::single(standup());
    let outside = EventDefinition::single(Occurrence::new(
        "later",
        "Later",
        at(2026, 4, 1, 9, 0),
        at(2026, 4, 1, 10, 0),
    ));

    let result = expand_all(&[inside, outside], &first_week());
    assert_eq!(result.occurrences.len(), 1);
    assert_eq!(result.occurrences[0].id, "standup");
}

#[test]
fn event_ending_at_window_start_is_excluded() {
    let before = Occurrence::new("before", "Before", at(2026, 3, 1, 23, 0), at(2026, 3, 2, 0, 0));
    let result = expand(&EventDefinition::single(before), &first_week());
    assert!(result.occurrences.is_empty());
}

#[test]
fn inverted_end_is_clamped_to_start() {
    let broken = Occurrence::new("broken", "Broken", at(2026, 3, 3, 12, 0), at(2026, 3, 3, 11, 0));
    assert_eq!(broken.end, broken.start);

    let result = expand(&EventDefinition::single(broken), &first_week());
    assert_eq!(result.occurrences.len(), 1);
    assert!(result.occurrences[0].duration().is_zero());
}

#[test]
fn instances_keep_resource_assignment() {
    let mut base = standup();
    base.resource_ids = vec!["alice".to_string(), "bob".to_string()];
    let def = EventDefinition::recurring(base, RecurrencePattern::daily().count(2));

    let result = expand(&def, &first_week());
    assert!(result.occurrences.iter().all(|o| o.is_assigned_to("bob")));
    assert!(!result.occurrences[0].is_assigned_to("carol"));
}

#[test]
fn expand_all_sorts_and_keeps_definition_order_on_ties() {
    let a = Occurrence::new("a", "A", at(2026, 3, 3, 9, 0), at(2026, 3, 3, 10, 0));
    let b = Occurrence::new("b", "B", at(2026, 3, 3, 9, 0), at(2026, 3, 3, 9, 30));
    let series = EventDefinition::recurring(standup(), RecurrencePattern::daily().count(2));

    let result = expand_all(
        &[EventDefinition::single(a), series, EventDefinition::single(b)],
        &first_week(),
    );
    let ids: Vec<_> = result.occurrences.iter().map(|o| o.id.as_str()).collect();
    assert_eq!(ids, vec!["standup", "a", "b", "standup"]);
}

#[test]
fn expand_pattern_removes_exdates_and_applies_window() {
    let window = TimeWindow::new(at(2026, 3, 3, 0, 0), at(2026, 3, 5, 23, 0));
    let instances = expand_pattern(
        &RecurrencePattern::daily(),
        at(2026, 3, 2, 10, 0),
        chrono::Duration::minutes(30),
        &[at(2026, 3, 4, 10, 0)],
        &window,
    )
    .unwrap();

    assert!(!instances.limited);
    assert_eq!(instances.starts, vec![at(2026, 3, 3, 10, 0), at(2026, 3, 5, 10, 0)]);
}

// ---------------------------------------------------------------------------
// RRULE text
// ---------------------------------------------------------------------------

#[test]
fn rrule_text_parses_into_pattern() {
    let pattern: RecurrencePattern =
        "RRULE:FREQ=WEEKLY;INTERVAL=2;BYDAY=TU,TH;COUNT=4".parse().unwrap();
    assert_eq!(pattern.frequency, Frequency::Weekly);
    assert_eq!(pattern.interval, 2);
    assert_eq!(pattern.count, Some(4));
    assert_eq!(pattern.by_weekday, vec![WeekDay::Tuesday, WeekDay::Thursday]);
    assert_eq!(pattern.to_string(), "FREQ=WEEKLY;INTERVAL=2;COUNT=4;BYDAY=TU,TH");
}

#[test]
fn rrule_until_parses_as_utc() {
    let pattern: RecurrencePattern = "FREQ=DAILY;UNTIL=20260304T100000Z".parse().unwrap();
    assert_eq!(pattern.until, Some(at(2026, 3, 4, 10, 0)));
    assert_eq!(pattern.to_string(), "FREQ=DAILY;UNTIL=20260304T100000Z");
}

#[test]
fn rrule_text_rejects_bad_input() {
    assert!(matches!("".parse::<RecurrencePattern>(), Err(CalendarError::InvalidRule(_))));
    assert!(matches!(
        "INTERVAL=2".parse::<RecurrencePattern>(),
        Err(CalendarError::InvalidRule(_))
    ));
    assert!(matches!(
        "FREQ=MONTHLY;BYDAY=TU;BYSETPOS=3".parse::<RecurrencePattern>(),
        Err(CalendarError::InvalidRule(_))
    ));
    assert!(RecurrencePattern::monthly().on_month_days(&[0]).to_rrule().is_err());
}
