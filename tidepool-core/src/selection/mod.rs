//! Fragment window selection for playback sessions and listings.
//!
//! The selector is the one real computation in the archive model layer:
//! given every fragment known for a stream, a timestamp origin, a time
//! range, and a playback mode, it decides which fragments a session or
//! listing covers, in what order, and where the next page starts.
//!
//! Everything here is pure. The transport layer that actually fetches
//! fragment metadata sits behind the [`source::FragmentSource`] trait, and
//! the caller drives pagination by feeding continuation cursors back in.

pub mod cursor;
pub mod selector;
pub mod source;
pub mod window;

use chrono::{DateTime, Utc};

pub use cursor::ContinuationCursor;
pub use selector::{SelectionResult, select};
pub use source::{FragmentSource, SimulatedStreamStore, SourceError};
pub use window::{PlaybackMode, SelectionRequest, TimeRange};

use crate::fragment::TimestampOrigin;

/// Errors raised while validating a selection request.
///
/// Every variant identifies the offending field; validation runs before
/// any selection logic and is never partially applied.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectionError {
    #[error("Time range end {end} is not after start {start}")]
    RangeEndNotAfterStart {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    #[error("Time range spans {span_secs}s, exceeding the {max_secs}s bound")]
    RangeTooLong { span_secs: u64, max_secs: u64 },

    #[error("Time range end {end} is in the future (now: {now})")]
    RangeEndInFuture {
        end: DateTime<Utc>,
        now: DateTime<Utc>,
    },

    #[error("Playback mode {mode} requires a time range")]
    RangeRequired { mode: PlaybackMode },

    #[error("Playback mode {mode} does not accept a time range")]
    RangeForbidden { mode: PlaybackMode },

    #[error("max_results {requested} outside accepted range {min}-{max}")]
    MaxResultsOutOfRange { requested: u32, min: u32, max: u32 },

    #[error("Continuation cursor could not be decoded: {reason}")]
    InvalidCursor { reason: String },

    #[error("Cursor was issued for origin {cursor_origin}, request uses {request_origin}")]
    CursorOriginMismatch {
        cursor_origin: TimestampOrigin,
        request_origin: TimestampOrigin,
    },

    #[error("Playback mode {mode} does not paginate")]
    CursorUnsupported { mode: PlaybackMode },
}
