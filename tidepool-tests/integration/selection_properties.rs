//! Randomized property checks over the selection contract.
//!
//! Fragment sets are generated with colliding producer timestamps on
//! purpose: the dedup and tie-break rules only show up under collision.

use chrono::{DateTime, TimeZone, Utc};
use proptest::prelude::*;
use tidepool_core::config::SelectionLimits;
use tidepool_core::{
    Fragment, FragmentNumber, PlaybackMode, SelectionRequest, TimeRange, TimestampOrigin, select,
};

fn ts(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).unwrap()
}

/// Arbitrary fragment sets: unique increasing numbers, producer
/// timestamps drawn from a small space (collisions likely), server
/// timestamps trailing by a small lag.
fn arb_fragments() -> impl Strategy<Value = Vec<Fragment>> {
    prop::collection::vec((0i64..120, 0i64..5, 1u64..4096), 0..80).prop_map(|entries| {
        entries
            .into_iter()
            .enumerate()
            .map(|(i, (producer_secs, lag_secs, kib))| {
                Fragment::new(
                    FragmentNumber::new(i as u64 + 1),
                    kib * 1024,
                    ts(producer_secs),
                    ts(producer_secs + lag_secs),
                    2000,
                )
            })
            .collect()
    })
}

fn arb_origin() -> impl Strategy<Value = TimestampOrigin> {
    prop_oneof![
        Just(TimestampOrigin::Producer),
        Just(TimestampOrigin::Server)
    ]
}

fn bounded_request(
    origin: TimestampOrigin,
    start: i64,
    end: i64,
    max_results: u32,
) -> SelectionRequest {
    SelectionRequest {
        origin,
        mode: PlaybackMode::OnDemand,
        range: Some(TimeRange::new(ts(start), ts(end)).unwrap()),
        max_results,
        cursor: None,
    }
}

const NOW_SECS: i64 = 1_000_000;

proptest! {
    /// Every selected fragment sits inside the window.
    #[test]
    fn selected_fragments_lie_in_window(
        fragments in arb_fragments(),
        origin in arb_origin(),
        start in 0i64..100,
        span in 1i64..60,
        max_results in 1u32..50,
    ) {
        let request = bounded_request(origin, start, start + span, max_results);
        let limits = SelectionLimits::default();

        let result = select(&fragments, &request, &limits, ts(NOW_SECS)).unwrap();

        for fragment in &result.fragments {
            let t = fragment.timestamp(origin);
            prop_assert!(ts(start) <= t && t <= ts(start + span));
        }
    }

    /// Under producer origin, colliding producer timestamps collapse to
    /// the largest fragment number.
    #[test]
    fn producer_collisions_keep_largest_number(
        fragments in arb_fragments(),
        start in 0i64..100,
        span in 1i64..60,
    ) {
        let request = bounded_request(TimestampOrigin::Producer, start, start + span, 5000);
        let limits = SelectionLimits {
            max_results_on_demand: 5000,
            ..SelectionLimits::default()
        };

        let result = select(&fragments, &request, &limits, ts(NOW_SECS)).unwrap();

        for selected in &result.fragments {
            // No unselected in-window fragment may outrank a selected one
            // at the same producer instant
            for other in &fragments {
                if other.producer_timestamp == selected.producer_timestamp {
                    prop_assert!(other.number <= selected.number);
                }
            }
        }
        // And each producer instant appears at most once
        let mut instants: Vec<_> =
            result.fragments.iter().map(|f| f.producer_timestamp).collect();
        instants.sort();
        instants.dedup();
        prop_assert_eq!(instants.len(), result.fragments.len());
    }

    /// Server origin never drops colliding timestamps.
    #[test]
    fn server_origin_preserves_collisions(
        fragments in arb_fragments(),
        start in 0i64..100,
        span in 1i64..60,
    ) {
        let request = bounded_request(TimestampOrigin::Server, start, start + span, 5000);
        let limits = SelectionLimits {
            max_results_on_demand: 5000,
            ..SelectionLimits::default()
        };

        let result = select(&fragments, &request, &limits, ts(NOW_SECS)).unwrap();

        let expected = fragments
            .iter()
            .filter(|f| ts(start) <= f.server_timestamp && f.server_timestamp <= ts(start + span))
            .count();
        prop_assert_eq!(result.fragment_count(), expected);
    }

    /// On-demand output is non-decreasing by timestamp and bounded by
    /// the page size.
    #[test]
    fn on_demand_output_ordered_and_bounded(
        fragments in arb_fragments(),
        origin in arb_origin(),
        max_results in 1u32..30,
    ) {
        let request = bounded_request(origin, 0, 200, max_results);
        let limits = SelectionLimits::default();

        let result = select(&fragments, &request, &limits, ts(NOW_SECS)).unwrap();

        prop_assert!(result.fragment_count() <= max_results as usize);
        for pair in result.fragments.windows(2) {
            prop_assert!(pair[0].timestamp(origin) <= pair[1].timestamp(origin));
        }
    }

    /// Live output is the most recent fragments, newest first.
    #[test]
    fn live_output_descends_from_newest(
        fragments in arb_fragments(),
        origin in arb_origin(),
        max_results in 1u32..30,
    ) {
        let request = SelectionRequest {
            origin,
            mode: PlaybackMode::Live,
            range: None,
            max_results,
            cursor: None,
        };
        let limits = SelectionLimits::default();

        let result = select(&fragments, &request, &limits, ts(NOW_SECS)).unwrap();

        prop_assert!(result.fragment_count() <= max_results as usize);
        prop_assert!(result.next_cursor.is_none());
        for pair in result.fragments.windows(2) {
            prop_assert!(pair[0].timestamp(origin) >= pair[1].timestamp(origin));
        }
        // Nothing outside the page may be newer than the page's tail,
        // except producer-dedup losers at an already-covered instant
        if origin == TimestampOrigin::Server {
            if let Some(tail) = result.fragments.last() {
                let outside = fragments.iter().filter(|f| {
                    !result.fragments.contains(f)
                });
                for f in outside {
                    prop_assert!(f.timestamp(origin) <= tail.timestamp(origin));
                }
            }
        }
    }

    /// The selector is a pure function of its inputs.
    #[test]
    fn identical_inputs_identical_pages(
        fragments in arb_fragments(),
        origin in arb_origin(),
        max_results in 1u32..30,
    ) {
        let request = bounded_request(origin, 0, 200, max_results);
        let limits = SelectionLimits::default();

        let first = select(&fragments, &request, &limits, ts(NOW_SECS)).unwrap();
        let second = select(&fragments, &request, &limits, ts(NOW_SECS)).unwrap();

        prop_assert_eq!(first, second);
    }

    /// Paging to exhaustion yields each qualifying fragment exactly once,
    /// in the same order a single oversized page would use.
    #[test]
    fn paging_matches_single_oversized_page(
        fragments in arb_fragments(),
        origin in arb_origin(),
        page_size in 1u32..10,
    ) {
        let limits = SelectionLimits::default();
        let mut request = bounded_request(origin, 0, 200, page_size);

        let mut paged = Vec::new();
        loop {
            let page = select(&fragments, &request, &limits, ts(NOW_SECS)).unwrap();
            paged.extend(page.fragments);
            match page.next_cursor {
                Some(cursor) => request.cursor = Some(cursor),
                None => break,
            }
        }

        let oversized = bounded_request(origin, 0, 200, 1000);
        let all = select(&fragments, &oversized, &limits, ts(NOW_SECS)).unwrap();

        prop_assert_eq!(paged, all.fragments);
    }
}
