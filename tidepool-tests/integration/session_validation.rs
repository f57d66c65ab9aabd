//! Session request validation across the three session kinds.

use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use tidepool_core::config::TidepoolConfig;
use tidepool_core::session::{ContainerFormat, DiscontinuityMode, SessionRequest};
use tidepool_core::{
    PlaybackMode, SelectionError, SessionError, SessionType, StreamError, StreamRef, TimeRange,
    TimestampOrigin,
};

fn ts(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).unwrap()
}

fn stream() -> StreamRef {
    StreamRef::from_name("lobby-cam").unwrap()
}

#[test]
fn hls_live_round_trip_with_all_knobs() {
    let config = TidepoolConfig::default();
    let request = SessionRequest::new(stream(), SessionType::Hls, PlaybackMode::Live)
        .with_origin(TimestampOrigin::Server)
        .with_expires(Duration::from_secs(3600))
        .with_max_fragments(10)
        .with_container_format(ContainerFormat::MpegTs)
        .with_discontinuity_mode(DiscontinuityMode::OnDiscontinuity);

    assert!(request.validate(&config, ts(1000)).is_ok());

    let selection = request.selection_request(&config);
    assert_eq!(selection.max_results, 10);
    assert_eq!(selection.origin, TimestampOrigin::Server);
    assert!(selection.range.is_none());
}

#[test]
fn dash_on_demand_requires_range() {
    let config = TidepoolConfig::default();
    let request = SessionRequest::new(stream(), SessionType::Dash, PlaybackMode::OnDemand);

    assert_eq!(
        request.validate(&config, ts(1000)).unwrap_err(),
        SessionError::Window(SelectionError::RangeRequired {
            mode: PlaybackMode::OnDemand
        })
    );
}

#[test]
fn server_origin_session_cannot_end_in_future() {
    let config = TidepoolConfig::default();
    let range = TimeRange::new(ts(100), ts(2000)).unwrap();
    let request = SessionRequest::new(stream(), SessionType::Hls, PlaybackMode::OnDemand)
        .with_origin(TimestampOrigin::Server)
        .with_range(range);

    // now = 1500 sits before the requested end
    assert!(matches!(
        request.validate(&config, ts(1500)).unwrap_err(),
        SessionError::Window(SelectionError::RangeEndInFuture { .. })
    ));
    assert!(request.validate(&config, ts(2000)).is_ok());
}

#[test]
fn clip_of_live_replay_rejected() {
    let config = TidepoolConfig::default();
    let range = TimeRange::new(ts(100), ts(200)).unwrap();
    let request = SessionRequest::new(stream(), SessionType::Clip, PlaybackMode::LiveReplay)
        .with_range(range);

    assert_eq!(
        request.validate(&config, ts(1000)).unwrap_err(),
        SessionError::ClipRequiresOnDemand {
            mode: PlaybackMode::LiveReplay
        }
    );
}

#[test]
fn session_span_cap_matches_selector() {
    let config = TidepoolConfig::default();
    let over = TimeRange::new(ts(0), ts(25 * 3600)).unwrap();
    let request = SessionRequest::new(stream(), SessionType::Dash, PlaybackMode::OnDemand)
        .with_range(over);

    assert!(matches!(
        request.validate(&config, ts(100_000_000)).unwrap_err(),
        SessionError::Window(SelectionError::RangeTooLong { .. })
    ));
}

#[test]
fn stream_identity_rules_enforced_at_resolution() {
    assert_eq!(
        StreamRef::resolve(None, None).unwrap_err(),
        StreamError::MissingIdentifier
    );
    assert_eq!(
        StreamRef::resolve(Some("cam"), Some("arn:video:stream/cam")).unwrap_err(),
        StreamError::AmbiguousIdentifier
    );
    assert!(matches!(
        StreamRef::resolve(Some("bad name"), None).unwrap_err(),
        StreamError::InvalidName { .. }
    ));
    assert!(matches!(
        StreamRef::resolve(None, Some("nonsense")).unwrap_err(),
        StreamError::InvalidArn { .. }
    ));
}

#[test]
fn fragment_ceilings_differ_by_session_type() {
    let config = TidepoolConfig::default();
    let range = TimeRange::new(ts(100), ts(200)).unwrap();

    // 300 fragments: over the clip ceiling, under the manifest ceiling
    let clip = SessionRequest::new(stream(), SessionType::Clip, PlaybackMode::OnDemand)
        .with_range(range)
        .with_max_fragments(300);
    assert!(matches!(
        clip.validate(&config, ts(1000)).unwrap_err(),
        SessionError::FragmentCountOutOfRange { max: 200, .. }
    ));

    let dash = SessionRequest::new(stream(), SessionType::Dash, PlaybackMode::OnDemand)
        .with_range(range)
        .with_max_fragments(300);
    assert!(dash.validate(&config, ts(1000)).is_ok());
}
