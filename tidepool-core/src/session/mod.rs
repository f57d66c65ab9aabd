//! Playback-session request models.
//!
//! The archive API issues three session kinds over a selected fragment
//! window: HLS and DASH streaming sessions, and clip downloads. This
//! module owns their request parameters and validation; manifest and media
//! rendering belong to the session-URL issuer, not here.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::TidepoolConfig;
use crate::fragment::TimestampOrigin;
use crate::selection::window::validate_mode_range;
use crate::selection::{PlaybackMode, SelectionError, SelectionRequest, TimeRange};
use crate::stream::StreamRef;

/// Kind of playback session being requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionType {
    /// HLS streaming session (media playlist + fragments)
    Hls,
    /// DASH streaming session (MPD manifest + fragments)
    Dash,
    /// Single concatenated clip download
    Clip,
}

impl fmt::Display for SessionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionType::Hls => write!(f, "HLS"),
            SessionType::Dash => write!(f, "DASH"),
            SessionType::Clip => write!(f, "CLIP"),
        }
    }
}

impl std::str::FromStr for SessionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "hls" => Ok(SessionType::Hls),
            "dash" => Ok(SessionType::Dash),
            "clip" => Ok(SessionType::Clip),
            _ => Err(format!("Invalid session type: {s}")),
        }
    }
}

/// Container the HLS session packages fragments into.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContainerFormat {
    /// Fragmented MP4 segments
    #[default]
    FragmentedMp4,
    /// MPEG transport stream segments
    MpegTs,
}

/// Where the HLS playlist inserts discontinuity markers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiscontinuityMode {
    /// Marker before every fragment
    #[default]
    Always,
    /// No markers; only valid for gap-free producer timelines
    Never,
    /// Marker only where fragment timestamps are not contiguous
    OnDiscontinuity,
}

/// Whether manifests carry per-fragment timestamps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DisplayFragmentTimestamp {
    Always,
    #[default]
    Never,
}

/// Whether DASH manifests carry per-fragment numbers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DisplayFragmentNumber {
    Always,
    #[default]
    Never,
}

/// Errors raised while validating a session request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("Session expiry {requested_secs}s outside accepted range {min_secs}-{max_secs}s")]
    ExpiryOutOfRange {
        requested_secs: u64,
        min_secs: u64,
        max_secs: u64,
    },

    #[error("Clip sessions require on-demand playback, got {mode}")]
    ClipRequiresOnDemand { mode: PlaybackMode },

    #[error("Fragment count {requested} outside accepted range {min}-{max} for {session_type}")]
    FragmentCountOutOfRange {
        requested: u32,
        min: u32,
        max: u32,
        session_type: SessionType,
    },

    #[error("Invalid session window: {0}")]
    Window(#[from] SelectionError),
}

/// Parameters for one playback-session grant.
///
/// Built with [`SessionRequest::new`] plus consuming `with_*` setters for
/// the optional knobs, then checked with [`SessionRequest::validate`].
/// Immutable once validated; the session-URL issuer consumes it together
/// with the selector's output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRequest {
    pub stream: StreamRef,
    pub session_type: SessionType,
    pub mode: PlaybackMode,
    pub origin: TimestampOrigin,
    pub range: Option<TimeRange>,
    /// How long issued session URLs stay valid
    pub expires: Duration,
    /// Manifest/clip fragment count; per-type default applies when unset
    pub max_fragments: Option<u32>,
    pub container_format: ContainerFormat,
    pub discontinuity_mode: DiscontinuityMode,
    pub display_fragment_timestamp: DisplayFragmentTimestamp,
    pub display_fragment_number: DisplayFragmentNumber,
}

impl SessionRequest {
    /// Creates a request with default knobs: producer origin, 5 minute
    /// expiry, per-type fragment count, fragmented MP4.
    pub fn new(stream: StreamRef, session_type: SessionType, mode: PlaybackMode) -> Self {
        Self {
            stream,
            session_type,
            mode,
            origin: TimestampOrigin::Producer,
            range: None,
            expires: Duration::from_secs(300),
            max_fragments: None,
            container_format: ContainerFormat::default(),
            discontinuity_mode: DiscontinuityMode::default(),
            display_fragment_timestamp: DisplayFragmentTimestamp::default(),
            display_fragment_number: DisplayFragmentNumber::default(),
        }
    }

    /// Sets the timestamp origin driving window selection.
    pub fn with_origin(mut self, origin: TimestampOrigin) -> Self {
        self.origin = origin;
        self
    }

    /// Sets the session time range.
    pub fn with_range(mut self, range: TimeRange) -> Self {
        self.range = Some(range);
        self
    }

    /// Sets how long issued URLs stay valid.
    pub fn with_expires(mut self, expires: Duration) -> Self {
        self.expires = expires;
        self
    }

    /// Sets the manifest/clip fragment count explicitly.
    pub fn with_max_fragments(mut self, max_fragments: u32) -> Self {
        self.max_fragments = Some(max_fragments);
        self
    }

    /// Sets the HLS container format.
    pub fn with_container_format(mut self, container_format: ContainerFormat) -> Self {
        self.container_format = container_format;
        self
    }

    /// Sets the HLS discontinuity marker mode.
    pub fn with_discontinuity_mode(mut self, discontinuity_mode: DiscontinuityMode) -> Self {
        self.discontinuity_mode = discontinuity_mode;
        self
    }

    /// Sets manifest timestamp display.
    pub fn with_display_fragment_timestamp(mut self, display: DisplayFragmentTimestamp) -> Self {
        self.display_fragment_timestamp = display;
        self
    }

    /// Sets DASH fragment-number display.
    pub fn with_display_fragment_number(mut self, display: DisplayFragmentNumber) -> Self {
        self.display_fragment_number = display;
        self
    }

    /// Fragment count after applying per-type defaults.
    ///
    /// Clips default to their own ceiling; streaming sessions default per
    /// playback mode (short manifests live, long ones on demand).
    pub fn resolved_max_fragments(&self, config: &TidepoolConfig) -> u32 {
        if let Some(requested) = self.max_fragments {
            return requested;
        }
        match self.session_type {
            SessionType::Clip => config.session.max_clip_fragments,
            SessionType::Hls | SessionType::Dash => {
                if self.mode.is_live_family() {
                    config.session.default_live_manifest_fragments
                } else {
                    config.session.default_on_demand_manifest_fragments
                }
            }
        }
    }

    /// Validates every session rule against configured limits.
    ///
    /// # Errors
    ///
    /// - `SessionError::ExpiryOutOfRange` - Expiry outside configured bounds
    /// - `SessionError::ClipRequiresOnDemand` - Clip with a live-family mode
    /// - `SessionError::FragmentCountOutOfRange` - Count above the per-type ceiling
    /// - `SessionError::Window` - Mode/range rule violation
    pub fn validate(&self, config: &TidepoolConfig, now: DateTime<Utc>) -> Result<(), SessionError> {
        let requested_secs = self.expires.as_secs();
        let min_secs = config.session.min_expiry.as_secs();
        let max_secs = config.session.max_expiry.as_secs();
        if requested_secs < min_secs || requested_secs > max_secs {
            return Err(SessionError::ExpiryOutOfRange {
                requested_secs,
                min_secs,
                max_secs,
            });
        }

        if self.session_type == SessionType::Clip && self.mode != PlaybackMode::OnDemand {
            return Err(SessionError::ClipRequiresOnDemand { mode: self.mode });
        }

        let ceiling = match self.session_type {
            SessionType::Clip => config.session.max_clip_fragments,
            SessionType::Hls | SessionType::Dash => config.session.max_manifest_fragments,
        };
        let resolved = self.resolved_max_fragments(config);
        if resolved < 1 || resolved > ceiling {
            return Err(SessionError::FragmentCountOutOfRange {
                requested: resolved,
                min: 1,
                max: ceiling,
                session_type: self.session_type,
            });
        }

        validate_mode_range(
            self.origin,
            self.mode,
            self.range.as_ref(),
            config.selection.max_range,
            now,
        )?;

        Ok(())
    }

    /// Derives the selector input backing this session.
    ///
    /// The selector's own listing ceiling does not apply here: session
    /// fragment counts were already bounded by the per-type ceiling above.
    pub fn selection_request(&self, config: &TidepoolConfig) -> SelectionRequest {
        SelectionRequest {
            origin: self.origin,
            mode: self.mode,
            range: self.range,
            max_results: self.resolved_max_fragments(config),
            cursor: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn stream() -> StreamRef {
        StreamRef::from_name("cam-1").unwrap()
    }

    fn range(start: i64, end: i64) -> TimeRange {
        TimeRange::new(ts(start), ts(end)).unwrap()
    }

    #[test]
    fn test_live_hls_defaults_validate() {
        let config = TidepoolConfig::default();
        let request = SessionRequest::new(stream(), SessionType::Hls, PlaybackMode::Live);

        assert!(request.validate(&config, ts(1000)).is_ok());
        assert_eq!(request.resolved_max_fragments(&config), 5);
        assert_eq!(request.container_format, ContainerFormat::FragmentedMp4);
    }

    #[test]
    fn test_on_demand_defaults_to_long_manifest() {
        let config = TidepoolConfig::default();
        let request = SessionRequest::new(stream(), SessionType::Dash, PlaybackMode::OnDemand)
            .with_range(range(100, 200));

        assert!(request.validate(&config, ts(1000)).is_ok());
        assert_eq!(request.resolved_max_fragments(&config), 1000);
    }

    #[test]
    fn test_expiry_bounds_enforced() {
        let config = TidepoolConfig::default();

        let too_short = SessionRequest::new(stream(), SessionType::Hls, PlaybackMode::Live)
            .with_expires(Duration::from_secs(60));
        assert!(matches!(
            too_short.validate(&config, ts(1000)).unwrap_err(),
            SessionError::ExpiryOutOfRange { .. }
        ));

        let too_long = SessionRequest::new(stream(), SessionType::Hls, PlaybackMode::Live)
            .with_expires(Duration::from_secs(13 * 3600));
        assert!(too_long.validate(&config, ts(1000)).is_err());

        let at_max = SessionRequest::new(stream(), SessionType::Hls, PlaybackMode::Live)
            .with_expires(Duration::from_secs(12 * 3600));
        assert!(at_max.validate(&config, ts(1000)).is_ok());
    }

    #[test]
    fn test_clip_must_be_on_demand() {
        let config = TidepoolConfig::default();

        let live_clip = SessionRequest::new(stream(), SessionType::Clip, PlaybackMode::Live);
        assert_eq!(
            live_clip.validate(&config, ts(1000)).unwrap_err(),
            SessionError::ClipRequiresOnDemand {
                mode: PlaybackMode::Live
            }
        );

        let clip = SessionRequest::new(stream(), SessionType::Clip, PlaybackMode::OnDemand)
            .with_range(range(100, 200));
        assert!(clip.validate(&config, ts(1000)).is_ok());
        assert_eq!(clip.resolved_max_fragments(&config), 200);
    }

    #[test]
    fn test_clip_ceiling_tighter_than_manifest_ceiling() {
        let config = TidepoolConfig::default();

        let clip = SessionRequest::new(stream(), SessionType::Clip, PlaybackMode::OnDemand)
            .with_range(range(100, 200))
            .with_max_fragments(500);
        assert!(matches!(
            clip.validate(&config, ts(1000)).unwrap_err(),
            SessionError::FragmentCountOutOfRange {
                max: 200,
                session_type: SessionType::Clip,
                ..
            }
        ));

        // The same count is fine for an HLS manifest
        let hls = SessionRequest::new(stream(), SessionType::Hls, PlaybackMode::OnDemand)
            .with_range(range(100, 200))
            .with_max_fragments(500);
        assert!(hls.validate(&config, ts(1000)).is_ok());
    }

    #[test]
    fn test_window_rules_delegate_to_selection() {
        let config = TidepoolConfig::default();

        let missing_range =
            SessionRequest::new(stream(), SessionType::Hls, PlaybackMode::OnDemand);
        assert_eq!(
            missing_range.validate(&config, ts(1000)).unwrap_err(),
            SessionError::Window(SelectionError::RangeRequired {
                mode: PlaybackMode::OnDemand
            })
        );

        let live_with_range = SessionRequest::new(stream(), SessionType::Hls, PlaybackMode::Live)
            .with_range(range(100, 200));
        assert!(matches!(
            live_with_range.validate(&config, ts(1000)).unwrap_err(),
            SessionError::Window(SelectionError::RangeForbidden { .. })
        ));
    }

    #[test]
    fn test_selection_request_carries_session_window() {
        let config = TidepoolConfig::default();
        let session = SessionRequest::new(stream(), SessionType::Hls, PlaybackMode::OnDemand)
            .with_origin(TimestampOrigin::Server)
            .with_range(range(100, 200))
            .with_max_fragments(50);

        let selection = session.selection_request(&config);

        assert_eq!(selection.origin, TimestampOrigin::Server);
        assert_eq!(selection.mode, PlaybackMode::OnDemand);
        assert_eq!(selection.range, Some(range(100, 200)));
        assert_eq!(selection.max_results, 50);
        assert!(selection.cursor.is_none());
    }
}
