//! The fragment window selector.
//!
//! Pure function over a fragment set: filter by the origin-selected
//! timestamp, collapse producer-timestamp duplicates, order per playback
//! mode, bound the page, and hand back a continuation cursor when more
//! remains. No I/O, no shared state, no clock reads; the caller supplies
//! `now` along with everything else.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::SelectionError;
use super::cursor::{ContinuationCursor, CursorState};
use super::window::{PlaybackMode, SelectionRequest};
use crate::config::SelectionLimits;
use crate::fragment::{Fragment, TimestampOrigin};

/// Ordered page of qualifying fragments.
///
/// An empty page is a valid outcome, not an error. `next_cursor` is set
/// only when qualifying fragments remain beyond this page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionResult {
    pub fragments: Vec<Fragment>,
    pub next_cursor: Option<ContinuationCursor>,
}

impl SelectionResult {
    /// Whether the page holds no fragments.
    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    /// Number of fragments on this page.
    pub fn fragment_count(&self) -> usize {
        self.fragments.len()
    }
}

/// Selects the fragments a session or listing covers.
///
/// `fragments` is every fragment known for the stream, in arbitrary order;
/// nothing here assumes pre-sorting. Validation runs first and is
/// all-or-nothing, so a failing request never produces a partial page.
///
/// Ordering contract:
/// - `OnDemand` / `LiveReplay`: ascending by origin timestamp, ties by
///   ascending fragment number; oldest-biased page with a cursor when more
///   remain.
/// - `Live`: the `max_results` most recent fragments, descending by origin
///   timestamp, ties by descending fragment number; never a cursor.
///
/// A cursor restricts the page to fragments strictly after the recorded
/// position. Fragments ingested late, at or before an already-surfaced
/// position, are never retroactively inserted.
///
/// # Errors
///
/// - `SelectionError` - Any validation failure from [`SelectionRequest::validate`]
pub fn select(
    fragments: &[Fragment],
    request: &SelectionRequest,
    limits: &SelectionLimits,
    now: DateTime<Utc>,
) -> Result<SelectionResult, SelectionError> {
    request.validate(limits, now)?;

    let resume_position = request
        .checked_resume()?
        .map(|state| (state.resume_timestamp(), state.resume_number()));

    // Bounded modes carry a range past validation; live has none.
    let window = match (request.mode.is_bounded(), request.range.as_ref()) {
        (true, Some(range)) => Some(range),
        _ => None,
    };

    let mut retained: Vec<Fragment> = fragments
        .iter()
        .filter(|f| {
            let t = f.timestamp(request.origin);
            window.is_none_or(|w| w.contains(t))
        })
        .filter(|f| match resume_position {
            Some(position) => (f.timestamp(request.origin), f.number) > position,
            None => true,
        })
        .cloned()
        .collect();

    if request.origin == TimestampOrigin::Producer {
        dedup_producer_timestamps(&mut retained);
    }

    match request.mode {
        PlaybackMode::OnDemand | PlaybackMode::LiveReplay => {
            retained.sort_by(|a, b| {
                a.timestamp(request.origin)
                    .cmp(&b.timestamp(request.origin))
                    .then(a.number.cmp(&b.number))
            });
        }
        PlaybackMode::Live => {
            retained.sort_by(|a, b| {
                b.timestamp(request.origin)
                    .cmp(&a.timestamp(request.origin))
                    .then(b.number.cmp(&a.number))
            });
        }
    }

    let page_size = request.max_results as usize;
    let has_more = retained.len() > page_size;
    retained.truncate(page_size);

    let next_cursor = match (request.mode.is_bounded() && has_more, retained.last()) {
        (true, Some(last)) => Some(ContinuationCursor::encode(&CursorState::after(
            request.origin,
            last.timestamp(request.origin),
            last.number,
        ))?),
        _ => None,
    };

    tracing::debug!(
        mode = %request.mode,
        origin = %request.origin,
        candidates = fragments.len(),
        selected = retained.len(),
        has_more,
        "fragment window selected"
    );

    Ok(SelectionResult {
        fragments: retained,
        next_cursor,
    })
}

/// Collapses fragments sharing a producer timestamp down to the one with
/// the largest fragment number. The ingest path can surface the same
/// producer instant more than once after a device retransmit; the highest
/// number is the authoritative write.
fn dedup_producer_timestamps(fragments: &mut Vec<Fragment>) {
    fragments.sort_by(|a, b| {
        a.producer_timestamp
            .cmp(&b.producer_timestamp)
            .then(b.number.cmp(&a.number))
    });
    fragments.dedup_by(|late, kept| late.producer_timestamp == kept.producer_timestamp);
}
