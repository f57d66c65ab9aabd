//! Pagination driver behavior: cursors are opaque, pages never overlap,
//! exhaustion is clean, and late fragments are never backfilled.

use chrono::{DateTime, TimeZone, Utc};
use tidepool_core::config::SelectionLimits;
use tidepool_core::{
    ContinuationCursor, Fragment, FragmentNumber, PlaybackMode, SelectionError, SelectionRequest,
    SelectionResult, TimeRange, TimestampOrigin, select,
};

fn ts(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).unwrap()
}

fn fragment(number: u64, producer_secs: i64) -> Fragment {
    Fragment::new(
        FragmentNumber::new(number),
        256 * 1024,
        ts(producer_secs),
        ts(producer_secs + 2),
        2000,
    )
}

fn base_request(max_results: u32) -> SelectionRequest {
    SelectionRequest {
        origin: TimestampOrigin::Producer,
        mode: PlaybackMode::OnDemand,
        range: Some(TimeRange::new(ts(0), ts(10_000)).unwrap()),
        max_results,
        cursor: None,
    }
}

/// Drives selection to exhaustion, returning every surfaced fragment.
fn drain_pages(fragments: &[Fragment], mut request: SelectionRequest) -> Vec<Fragment> {
    let limits = SelectionLimits::default();
    let mut collected = Vec::new();
    loop {
        let page = select(fragments, &request, &limits, ts(100_000)).unwrap();
        collected.extend(page.fragments);
        match page.next_cursor {
            Some(cursor) => request.cursor = Some(cursor),
            None => return collected,
        }
    }
}

#[test]
fn pages_cover_window_exactly_once() {
    let fragments: Vec<Fragment> = (1..=23).map(|i| fragment(i, i as i64 * 7)).collect();

    let collected = drain_pages(&fragments, base_request(5));

    let numbers: Vec<u64> = collected.iter().map(|f| f.number.as_u64()).collect();
    assert_eq!(numbers, (1..=23).collect::<Vec<u64>>());
}

#[test]
fn page_size_one_still_terminates() {
    let fragments: Vec<Fragment> = (1..=4).map(|i| fragment(i, i as i64 * 10)).collect();

    let collected = drain_pages(&fragments, base_request(1));

    assert_eq!(collected.len(), 4);
}

#[test]
fn exact_multiple_of_page_size_has_no_phantom_page() {
    let fragments: Vec<Fragment> = (1..=10).map(|i| fragment(i, i as i64 * 10)).collect();
    let limits = SelectionLimits::default();

    let mut request = base_request(5);
    let first = select(&fragments, &request, &limits, ts(100_000)).unwrap();
    assert_eq!(first.fragment_count(), 5);
    assert!(first.next_cursor.is_some());

    request.cursor = first.next_cursor;
    let second = select(&fragments, &request, &limits, ts(100_000)).unwrap();
    assert_eq!(second.fragment_count(), 5);
    // The window is exhausted exactly at the page boundary
    assert!(second.next_cursor.is_none());
}

#[test]
fn late_fragment_before_cursor_stays_invisible() {
    let mut fragments: Vec<Fragment> = (1..=6).map(|i| fragment(i, i as i64 * 10)).collect();
    let limits = SelectionLimits::default();

    let mut request = base_request(3);
    let first = select(&fragments, &request, &limits, ts(100_000)).unwrap();
    let first_numbers: Vec<u64> = first.fragments.iter().map(|f| f.number.as_u64()).collect();
    assert_eq!(first_numbers, vec![1, 2, 3]);

    // Straggler lands at t=15, inside the part of the window already served
    fragments.push(fragment(50, 15));
    // Another lands ahead of the cursor and must be served
    fragments.push(fragment(51, 45));

    request.cursor = first.next_cursor;
    let rest = drain_pages(&fragments, request);
    let numbers: Vec<u64> = rest.iter().map(|f| f.number.as_u64()).collect();

    assert!(!numbers.contains(&50), "backfilled fragment behind cursor");
    assert_eq!(numbers, vec![4, 51, 5, 6]);
}

#[test]
fn cursor_origin_mismatch_rejected() {
    let fragments: Vec<Fragment> = (1..=6).map(|i| fragment(i, i as i64 * 10)).collect();
    let limits = SelectionLimits::default();

    let request = base_request(3);
    let first = select(&fragments, &request, &limits, ts(100_000)).unwrap();

    let mut switched = base_request(3);
    switched.origin = TimestampOrigin::Server;
    switched.cursor = first.next_cursor;

    assert!(matches!(
        select(&fragments, &switched, &limits, ts(100_000)).unwrap_err(),
        SelectionError::CursorOriginMismatch { .. }
    ));
}

#[test]
fn live_mode_rejects_cursors() {
    let fragments: Vec<Fragment> = (1..=6).map(|i| fragment(i, i as i64 * 10)).collect();
    let limits = SelectionLimits::default();

    let request = base_request(3);
    let first = select(&fragments, &request, &limits, ts(100_000)).unwrap();

    let live = SelectionRequest {
        origin: TimestampOrigin::Producer,
        mode: PlaybackMode::Live,
        range: None,
        max_results: 3,
        cursor: first.next_cursor,
    };

    assert_eq!(
        select(&fragments, &live, &limits, ts(100_000)).unwrap_err(),
        SelectionError::CursorUnsupported {
            mode: PlaybackMode::Live
        }
    );
}

#[test]
fn foreign_tokens_rejected_not_misread() {
    let fragments: Vec<Fragment> = (1..=3).map(|i| fragment(i, i as i64 * 10)).collect();
    let limits = SelectionLimits::default();

    let mut request = base_request(3);
    request.cursor = Some(ContinuationCursor::from_token("0123deadbeef"));

    assert!(matches!(
        select(&fragments, &request, &limits, ts(100_000)).unwrap_err(),
        SelectionError::InvalidCursor { .. }
    ));
}

#[test]
fn cursor_crosses_the_wire_as_an_opaque_string() {
    let fragments: Vec<Fragment> = (1..=8).map(|i| fragment(i, i as i64 * 10)).collect();
    let limits = SelectionLimits::default();

    let result = select(&fragments, &base_request(3), &limits, ts(100_000)).unwrap();
    assert!(result.next_cursor.is_some());

    let json = serde_json::to_value(&result).unwrap();
    // Clients see a flat token, not the envelope internals
    assert!(json["next_cursor"].is_string());

    let round_trip: SelectionResult = serde_json::from_value(json).unwrap();
    assert_eq!(round_trip, result);
}

#[test]
fn live_replay_pages_ascend_from_range_start() {
    let fragments: Vec<Fragment> = (1..=9).map(|i| fragment(i, i as i64 * 10)).collect();
    let limits = SelectionLimits::default();

    let mut request = base_request(4);
    request.mode = PlaybackMode::LiveReplay;
    // Replay from t=30 onward
    request.range = Some(TimeRange::new(ts(30), ts(10_000)).unwrap());

    let collected = drain_pages(&fragments, request);
    let numbers: Vec<u64> = collected.iter().map(|f| f.number.as_u64()).collect();

    assert_eq!(numbers, (3..=9).collect::<Vec<u64>>());
}
