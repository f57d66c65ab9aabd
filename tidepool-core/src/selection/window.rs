//! Time windows, playback modes, and selection request validation.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::SelectionError;
use super::cursor::{ContinuationCursor, CursorState};
use crate::config::SelectionLimits;
use crate::fragment::TimestampOrigin;

/// Closed time window over a stream's archive.
///
/// Constructed through [`TimeRange::new`], which enforces `end > start`;
/// both bounds are inclusive for fragment comparison. Contextual limits
/// (span cap, future cutoff) are checked per request, not here. Only
/// serialized outward; inbound ranges always pass through the constructor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeRange {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TimeRange {
    /// Creates a time range covering `[start, end]`.
    ///
    /// # Errors
    ///
    /// - `SelectionError::RangeEndNotAfterStart` - `end <= start`
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, SelectionError> {
        if end <= start {
            return Err(SelectionError::RangeEndNotAfterStart { start, end });
        }
        Ok(Self { start, end })
    }

    /// Returns the inclusive lower bound.
    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    /// Returns the inclusive upper bound.
    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Span between the bounds. Always positive by construction.
    pub fn span(&self) -> chrono::Duration {
        self.end - self.start
    }

    /// Whether `t` falls inside the window, bounds included.
    ///
    /// A fragment whose origin timestamp lies inside the window qualifies
    /// even if its duration extends past the end bound.
    pub fn contains(&self, t: DateTime<Utc>) -> bool {
        self.start <= t && t <= self.end
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.start, self.end)
    }
}

/// How a playback session walks the stream's timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlaybackMode {
    /// Continuously advancing present; no range, newest fragments win
    Live,
    /// Growing window from a fixed start point; range required
    LiveReplay,
    /// Bounded historical window; range required
    OnDemand,
}

impl PlaybackMode {
    /// Whether this mode selects over a caller-supplied time range.
    pub fn is_bounded(self) -> bool {
        matches!(self, PlaybackMode::LiveReplay | PlaybackMode::OnDemand)
    }

    /// Whether this mode belongs to the live family for limit purposes.
    pub fn is_live_family(self) -> bool {
        matches!(self, PlaybackMode::Live | PlaybackMode::LiveReplay)
    }
}

impl std::str::FromStr for PlaybackMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "live" => Ok(PlaybackMode::Live),
            "live-replay" => Ok(PlaybackMode::LiveReplay),
            "on-demand" => Ok(PlaybackMode::OnDemand),
            _ => Err(format!("Invalid playback mode: {s}")),
        }
    }
}

impl fmt::Display for PlaybackMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlaybackMode::Live => write!(f, "LIVE"),
            PlaybackMode::LiveReplay => write!(f, "LIVE_REPLAY"),
            PlaybackMode::OnDemand => write!(f, "ON_DEMAND"),
        }
    }
}

/// One call's worth of selector input.
///
/// Request-scoped value object; `validate` runs every rule before any
/// selection work so a failing request is never partially applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionRequest {
    /// Which fragment timestamp drives comparison and ordering
    pub origin: TimestampOrigin,
    /// Timeline walk mode
    pub mode: PlaybackMode,
    /// Required for bounded modes, forbidden for live
    pub range: Option<TimeRange>,
    /// Upper bound on returned fragments; never clamped, only rejected
    pub max_results: u32,
    /// Resume position from a previous page, bounded modes only
    pub cursor: Option<ContinuationCursor>,
}

impl SelectionRequest {
    /// Validates the request against configured limits.
    ///
    /// `now` is the caller's clock reading; passing it in keeps the whole
    /// selection computation pure and reproducible.
    ///
    /// # Errors
    ///
    /// - `SelectionError::RangeRequired` / `RangeForbidden` - Mode/range mismatch
    /// - `SelectionError::RangeTooLong` - Span exceeds the configured cap
    /// - `SelectionError::RangeEndInFuture` - Server-origin range ends after `now`
    /// - `SelectionError::MaxResultsOutOfRange` - Bound violated for this mode
    /// - `SelectionError::InvalidCursor` / `CursorOriginMismatch` / `CursorUnsupported`
    pub fn validate(
        &self,
        limits: &SelectionLimits,
        now: DateTime<Utc>,
    ) -> Result<(), SelectionError> {
        validate_mode_range(
            self.origin,
            self.mode,
            self.range.as_ref(),
            limits.max_range,
            now,
        )?;

        let max = if self.mode.is_live_family() {
            limits.max_results_live
        } else {
            limits.max_results_on_demand
        };
        if self.max_results < limits.min_results || self.max_results > max {
            return Err(SelectionError::MaxResultsOutOfRange {
                requested: self.max_results,
                min: limits.min_results,
                max,
            });
        }

        self.checked_resume()?;
        Ok(())
    }

    /// Decodes and cross-checks the continuation cursor, if any.
    pub(crate) fn checked_resume(&self) -> Result<Option<CursorState>, SelectionError> {
        let Some(cursor) = &self.cursor else {
            return Ok(None);
        };
        if !self.mode.is_bounded() {
            return Err(SelectionError::CursorUnsupported { mode: self.mode });
        }
        let state = cursor.decode()?;
        if state.origin != self.origin {
            return Err(SelectionError::CursorOriginMismatch {
                cursor_origin: state.origin,
                request_origin: self.origin,
            });
        }
        Ok(Some(state))
    }
}

/// Mode/range compatibility rules shared by selection and session
/// validation: bounded modes require a range, live forbids one, spans are
/// capped, and server-origin ranges must not end in the future.
pub(crate) fn validate_mode_range(
    origin: TimestampOrigin,
    mode: PlaybackMode,
    range: Option<&TimeRange>,
    max_range: std::time::Duration,
    now: DateTime<Utc>,
) -> Result<(), SelectionError> {
    match (mode.is_bounded(), range) {
        (true, None) => return Err(SelectionError::RangeRequired { mode }),
        (false, Some(_)) => return Err(SelectionError::RangeForbidden { mode }),
        _ => {}
    }

    if let Some(range) = range {
        let span_secs = range.span().num_seconds().max(0) as u64;
        let max_secs = max_range.as_secs();
        if span_secs > max_secs {
            return Err(SelectionError::RangeTooLong { span_secs, max_secs });
        }
        if origin == TimestampOrigin::Server && range.end() > now {
            return Err(SelectionError::RangeEndInFuture {
                end: range.end(),
                now,
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn request(mode: PlaybackMode, range: Option<TimeRange>) -> SelectionRequest {
        SelectionRequest {
            origin: TimestampOrigin::Producer,
            mode,
            range,
            max_results: 100,
            cursor: None,
        }
    }

    #[test]
    fn test_range_rejects_inverted_bounds() {
        let error = TimeRange::new(ts(100), ts(99)).unwrap_err();
        assert!(matches!(
            error,
            SelectionError::RangeEndNotAfterStart { .. }
        ));
        // Degenerate instant windows are rejected too
        assert!(TimeRange::new(ts(100), ts(100)).is_err());
    }

    #[test]
    fn test_range_contains_is_inclusive() {
        let range = TimeRange::new(ts(10), ts(20)).unwrap();

        assert!(range.contains(ts(10)));
        assert!(range.contains(ts(20)));
        assert!(!range.contains(ts(9)));
        assert!(!range.contains(ts(21)));
    }

    #[test]
    fn test_bounded_modes_require_range() {
        let limits = SelectionLimits::default();

        let error = request(PlaybackMode::OnDemand, None)
            .validate(&limits, ts(1000))
            .unwrap_err();
        assert_eq!(
            error,
            SelectionError::RangeRequired {
                mode: PlaybackMode::OnDemand
            }
        );

        assert!(
            request(PlaybackMode::LiveReplay, None)
                .validate(&limits, ts(1000))
                .is_err()
        );
    }

    #[test]
    fn test_live_forbids_range() {
        let limits = SelectionLimits::default();
        let range = TimeRange::new(ts(10), ts(20)).unwrap();

        let error = request(PlaybackMode::Live, Some(range))
            .validate(&limits, ts(1000))
            .unwrap_err();
        assert_eq!(
            error,
            SelectionError::RangeForbidden {
                mode: PlaybackMode::Live
            }
        );
        assert!(
            request(PlaybackMode::Live, None)
                .validate(&limits, ts(1000))
                .is_ok()
        );
    }

    #[test]
    fn test_span_cap_enforced() {
        let limits = SelectionLimits::default();
        let over = TimeRange::new(ts(0), ts(24 * 3600 + 1)).unwrap();
        let at_cap = TimeRange::new(ts(0), ts(24 * 3600)).unwrap();

        assert!(matches!(
            request(PlaybackMode::OnDemand, Some(over))
                .validate(&limits, ts(100_000))
                .unwrap_err(),
            SelectionError::RangeTooLong { .. }
        ));
        assert!(
            request(PlaybackMode::OnDemand, Some(at_cap))
                .validate(&limits, ts(100_000))
                .is_ok()
        );
    }

    #[test]
    fn test_server_origin_rejects_future_end() {
        let limits = SelectionLimits::default();
        let range = TimeRange::new(ts(10), ts(500)).unwrap();

        let mut server_request = request(PlaybackMode::OnDemand, Some(range));
        server_request.origin = TimestampOrigin::Server;

        assert!(matches!(
            server_request.validate(&limits, ts(400)).unwrap_err(),
            SelectionError::RangeEndInFuture { .. }
        ));
        assert!(server_request.validate(&limits, ts(500)).is_ok());

        // Producer origin accepts a future end: device clocks may run ahead
        let producer_request = request(PlaybackMode::OnDemand, Some(range));
        assert!(producer_request.validate(&limits, ts(400)).is_ok());
    }

    #[test]
    fn test_max_results_bounds_per_mode() {
        let limits = SelectionLimits::default();
        let range = TimeRange::new(ts(10), ts(20)).unwrap();

        let mut zero = request(PlaybackMode::OnDemand, Some(range));
        zero.max_results = 0;
        assert_eq!(
            zero.validate(&limits, ts(1000)).unwrap_err(),
            SelectionError::MaxResultsOutOfRange {
                requested: 0,
                min: 1,
                max: 1000
            }
        );

        // 3000 is too many for an on-demand listing but fine for live replay
        let mut listing = request(PlaybackMode::OnDemand, Some(range));
        listing.max_results = 3000;
        assert!(listing.validate(&limits, ts(1000)).is_err());

        let mut replay = request(PlaybackMode::LiveReplay, Some(range));
        replay.max_results = 3000;
        assert!(replay.validate(&limits, ts(1000)).is_ok());
    }

    #[test]
    fn test_playback_mode_parsing() {
        assert_eq!(
            "live-replay".parse::<PlaybackMode>().unwrap(),
            PlaybackMode::LiveReplay
        );
        assert_eq!(
            "ON_DEMAND".parse::<PlaybackMode>().unwrap(),
            PlaybackMode::OnDemand
        );
        assert!("rewind".parse::<PlaybackMode>().is_err());
    }
}
