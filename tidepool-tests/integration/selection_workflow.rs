//! End-to-end selection workflow: simulated archive -> source seam ->
//! window selector, the way a session-URL issuer drives it.

use chrono::{DateTime, TimeZone, Utc};
use tidepool_core::config::TidepoolConfig;
use tidepool_core::selection::SimulatedStreamStore;
use tidepool_core::{
    Fragment, FragmentNumber, FragmentSource, PlaybackMode, SelectionRequest, SourceError,
    StreamRef, TimeRange, TimestampOrigin, select,
};

fn ts(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).unwrap()
}

fn fragment(number: u64, producer_secs: i64) -> Fragment {
    Fragment::new(
        FragmentNumber::new(number),
        512 * 1024,
        ts(producer_secs),
        ts(producer_secs + 1),
        2000,
    )
}

fn seeded_store(name: &str, count: u64) -> SimulatedStreamStore {
    let store = SimulatedStreamStore::new();
    store.register_stream(name);
    store
        .ingest_all(name, (1..=count).map(|i| fragment(i, i as i64 * 10)))
        .unwrap();
    store
}

#[tokio::test]
async fn on_demand_window_over_simulated_archive() {
    let store = seeded_store("cam-1", 50);
    let stream = StreamRef::from_name("cam-1").unwrap();
    let config = TidepoolConfig::for_testing();

    let range = TimeRange::new(ts(100), ts(200)).unwrap();
    let candidates = store.fetch_fragments(&stream, Some(&range)).await.unwrap();

    let request = SelectionRequest {
        origin: TimestampOrigin::Producer,
        mode: PlaybackMode::OnDemand,
        range: Some(range),
        max_results: 100,
        cursor: None,
    };
    let result = select(&candidates, &request, &config.selection, ts(10_000)).unwrap();

    // Fragments 10..=20 sit at t = 100..=200
    assert_eq!(result.fragment_count(), 11);
    assert!(result.next_cursor.is_none());
    let numbers: Vec<u64> = result.fragments.iter().map(|f| f.number.as_u64()).collect();
    assert_eq!(numbers, (10..=20).collect::<Vec<u64>>());
}

#[tokio::test]
async fn live_refresh_tracks_new_ingest() {
    let store = seeded_store("cam-1", 10);
    let stream = StreamRef::from_name("cam-1").unwrap();
    let config = TidepoolConfig::for_testing();
    let request = SelectionRequest {
        origin: TimestampOrigin::Producer,
        mode: PlaybackMode::Live,
        range: None,
        max_results: 3,
        cursor: None,
    };

    let candidates = store.fetch_fragments(&stream, None).await.unwrap();
    let first = select(&candidates, &request, &config.selection, ts(10_000)).unwrap();
    let numbers: Vec<u64> = first.fragments.iter().map(|f| f.number.as_u64()).collect();
    assert_eq!(numbers, vec![10, 9, 8]);

    // New fragments arrive; the next manifest refresh sees them at the head
    store.ingest("cam-1", fragment(11, 110)).unwrap();
    store.ingest("cam-1", fragment(12, 120)).unwrap();

    let candidates = store.fetch_fragments(&stream, None).await.unwrap();
    let second = select(&candidates, &request, &config.selection, ts(10_000)).unwrap();
    let numbers: Vec<u64> = second.fragments.iter().map(|f| f.number.as_u64()).collect();
    assert_eq!(numbers, vec![12, 11, 10]);
}

#[tokio::test]
async fn selection_is_pure_over_identical_fetches() {
    let store = seeded_store("cam-1", 25);
    let stream = StreamRef::from_name("cam-1").unwrap();
    let config = TidepoolConfig::for_testing();
    let range = TimeRange::new(ts(0), ts(500)).unwrap();
    let request = SelectionRequest {
        origin: TimestampOrigin::Server,
        mode: PlaybackMode::OnDemand,
        range: Some(range),
        max_results: 7,
        cursor: None,
    };

    let candidates = store.fetch_fragments(&stream, Some(&range)).await.unwrap();
    let first = select(&candidates, &request, &config.selection, ts(10_000)).unwrap();
    let second = select(&candidates, &request, &config.selection, ts(10_000)).unwrap();

    assert_eq!(first, second);
}

#[tokio::test]
async fn unknown_stream_surfaces_not_found() {
    let store = SimulatedStreamStore::new();
    let stream = StreamRef::from_name("nope").unwrap();

    let error = store.fetch_fragments(&stream, None).await.unwrap_err();
    assert!(matches!(error, SourceError::StreamNotFound { .. }));
}

#[tokio::test]
async fn arn_reference_resolves_to_registered_stream() {
    let store = seeded_store("cam-1", 5);
    let stream = StreamRef::from_arn("arn:video:eu-west-1:stream/cam-1").unwrap();

    let fragments = store.fetch_fragments(&stream, None).await.unwrap();
    assert_eq!(fragments.len(), 5);
}
