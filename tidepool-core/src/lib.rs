//! Tidepool Core - Fragment windowing for archived media streams
//!
//! This crate provides the model layer of a video-stream archive service:
//! stream identity, fragment metadata, playback-session request models,
//! and the pure fragment window selector that decides which fragments a
//! session or listing covers.

pub mod config;
pub mod fragment;
pub mod selection;
pub mod session;
pub mod stream;
pub mod tracing_setup;

// Re-export main types for convenient access
pub use config::TidepoolConfig;
pub use fragment::{Fragment, FragmentNumber, TimestampOrigin};
pub use selection::{
    ContinuationCursor, FragmentSource, PlaybackMode, SelectionError, SelectionRequest,
    SelectionResult, SourceError, TimeRange, select,
};
pub use session::{SessionError, SessionRequest, SessionType};
pub use stream::{StreamError, StreamRef};

/// Core errors that can bubble up from any Tidepool subsystem.
#[derive(Debug, thiserror::Error)]
pub enum TidepoolError {
    #[error("Stream error: {0}")]
    Stream(#[from] StreamError),

    #[error("Selection error: {0}")]
    Selection(#[from] SelectionError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    #[error("Configuration error: {reason}")]
    Configuration { reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TidepoolError {
    /// Returns a user-friendly error message suitable for display.
    pub fn user_message(&self) -> String {
        match self {
            TidepoolError::Stream(e) => format!("Stream identifier problem: {e}"),
            TidepoolError::Selection(e) => match e {
                SelectionError::InvalidCursor { .. } => {
                    "Continuation token is invalid; restart the listing".to_string()
                }
                _ => format!("Request rejected: {e}"),
            },
            TidepoolError::Session(e) => format!("Session request rejected: {e}"),
            TidepoolError::Source(SourceError::StreamNotFound { stream }) => {
                format!("Stream {stream} not found")
            }
            TidepoolError::Source(_) => "Archive query failed".to_string(),
            TidepoolError::Configuration { .. } => "Configuration error occurred".to_string(),
            TidepoolError::Io(_) => "File system error occurred".to_string(),
        }
    }

    /// Checks if this error is due to user input validation.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            TidepoolError::Stream(_)
                | TidepoolError::Selection(_)
                | TidepoolError::Session(_)
                | TidepoolError::Configuration { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, TidepoolError>;
