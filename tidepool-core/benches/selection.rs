use chrono::{TimeZone, Utc};
use criterion::{Criterion, criterion_group, criterion_main};
use tidepool_core::config::SelectionLimits;
use tidepool_core::{
    Fragment, FragmentNumber, PlaybackMode, SelectionRequest, TimeRange, TimestampOrigin, select,
};

fn archive(count: u64) -> Vec<Fragment> {
    (0..count)
        .map(|i| {
            Fragment::new(
                FragmentNumber::new(i),
                512 * 1024,
                Utc.timestamp_opt(i as i64 * 2, 0).unwrap(),
                Utc.timestamp_opt(i as i64 * 2 + 1, 0).unwrap(),
                2000,
            )
        })
        .collect()
}

fn bench_on_demand_window(c: &mut Criterion) {
    let fragments = archive(10_000);
    let limits = SelectionLimits::default();
    let now = Utc.timestamp_opt(100_000, 0).unwrap();
    let request = SelectionRequest {
        origin: TimestampOrigin::Producer,
        mode: PlaybackMode::OnDemand,
        range: Some(
            TimeRange::new(
                Utc.timestamp_opt(4_000, 0).unwrap(),
                Utc.timestamp_opt(14_000, 0).unwrap(),
            )
            .unwrap(),
        ),
        max_results: 1000,
        cursor: None,
    };

    c.bench_function("select_on_demand_10k", |b| {
        b.iter(|| select(&fragments, &request, &limits, now).unwrap());
    });
}

fn bench_live_tail(c: &mut Criterion) {
    let fragments = archive(10_000);
    let limits = SelectionLimits::default();
    let now = Utc.timestamp_opt(100_000, 0).unwrap();
    let request = SelectionRequest {
        origin: TimestampOrigin::Server,
        mode: PlaybackMode::Live,
        range: None,
        max_results: 5,
        cursor: None,
    };

    c.bench_function("select_live_tail_10k", |b| {
        b.iter(|| select(&fragments, &request, &limits, now).unwrap());
    });
}

criterion_group!(benches, bench_on_demand_window, bench_live_tail);
criterion_main!(benches);
