use std::hint::black_box;

use calendar_engine::recurrence::RecurrencePattern;
use calendar_engine::{
    expand_all, layout_day, layout_grid, DayWindow, EventDefinition, GridWindow, Occurrence,
    TimeWindow,
};
use chrono::{Duration, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;
use criterion::{criterion_group, criterion_main, Criterion};

/// A busy month: 200 events of varying length spread over 35 days.
fn busy_month() -> Vec<Occurrence> {
    let origin = Utc.with_ymd_and_hms(2026, 3, 2, 0, 0, 0).unwrap();
    (0..200i64)
        .map(|i| {
            let start = origin + Duration::minutes((i * 353) % (35 * 24 * 60));
            let end = start + Duration::minutes(30 + (i * 97) % (3 * 24 * 60));
            Occurrence::new(format!("e{}", i), "event", start, end)
        })
        .collect()
}

fn bench_layout_grid(c: &mut Criterion) {
    let occurrences = busy_month();
    let window = GridWindow::days(NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(), 35, Tz::UTC);

    c.bench_function("layout_grid month 200 events", |b| {
        b.iter(|| layout_grid(black_box(&occurrences), black_box(&window), 4))
    });
}

fn bench_layout_day(c: &mut Criterion) {
    let origin = Utc.with_ymd_and_hms(2026, 3, 2, 8, 0, 0).unwrap();
    let occurrences: Vec<_> = (0..40i64)
        .map(|i| {
            let start = origin + Duration::minutes(i * 15);
            let end = start + Duration::minutes(45 + i % 4 * 15);
            Occurrence::new(format!("d{}", i), "event", start, end)
        })
        .collect();
    let window = DayWindow::new(NaiveDate::from_ymd_opt(2026, 3, 2).unwrap());

    c.bench_function("layout_day 40 overlapping events", |b| {
        b.iter(|| layout_day(black_box(&occurrences), black_box(&window)))
    });
}

fn bench_expand(c: &mut Criterion) {
    let start = Utc.with_ymd_and_hms(2026, 1, 5, 9, 0, 0).unwrap();
    let definitions: Vec<_> = (0..20i64)
        .map(|i| {
            let s = start + Duration::hours(i);
            EventDefinition::recurring(
                Occurrence::new(format!("s{}", i), "series", s, s + Duration::minutes(30)),
                RecurrencePattern::daily(),
            )
        })
        .collect();
    let window = TimeWindow::new(
        Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2026, 4, 5, 0, 0, 0).unwrap(),
    );

    c.bench_function("expand_all 20 daily series over 5 weeks", |b| {
        b.iter(|| expand_all(black_box(&definitions), black_box(&window)))
    });
}

criterion_group!(benches, bench_layout_grid, bench_layout_day, bench_expand);
criterion_main!(benches);
