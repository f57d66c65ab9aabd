//! Opaque continuation cursors for paged selection.
//!
//! A cursor records where the previous page stopped: the origin it was
//! issued for and the `(timestamp, fragment number)` position of the last
//! surfaced fragment. Callers must treat the token as opaque; the wire
//! form is a hex-encoded, versioned JSON envelope and may change between
//! releases.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::SelectionError;
use crate::fragment::{FragmentNumber, TimestampOrigin};

/// Envelope format version. Bumped on any wire-incompatible change.
const CURSOR_VERSION: u32 = 1;

/// Opaque pagination token handed back to the caller.
///
/// The only public operations are carrying the token and feeding it back
/// into the next request; decoding is internal to selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContinuationCursor(String);

impl ContinuationCursor {
    /// Wraps a token received from a previous response.
    pub fn from_token(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Returns the token string for transport.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Encodes a resume position into a token.
    ///
    /// # Errors
    ///
    /// - `SelectionError::InvalidCursor` - Envelope serialization failed
    pub(crate) fn encode(state: &CursorState) -> Result<Self, SelectionError> {
        let json = serde_json::to_vec(state).map_err(|e| SelectionError::InvalidCursor {
            reason: format!("envelope encoding failed: {e}"),
        })?;
        Ok(Self(hex::encode(json)))
    }

    /// Decodes the token back into a resume position.
    ///
    /// # Errors
    ///
    /// - `SelectionError::InvalidCursor` - Not hex, not JSON, wrong version,
    ///   or an unrepresentable timestamp
    pub(crate) fn decode(&self) -> Result<CursorState, SelectionError> {
        let bytes = hex::decode(&self.0).map_err(|e| SelectionError::InvalidCursor {
            reason: format!("not a hex token: {e}"),
        })?;
        let state: CursorState =
            serde_json::from_slice(&bytes).map_err(|e| SelectionError::InvalidCursor {
                reason: format!("malformed envelope: {e}"),
            })?;
        if state.version != CURSOR_VERSION {
            return Err(SelectionError::InvalidCursor {
                reason: format!("unsupported version {}", state.version),
            });
        }
        Ok(state)
    }
}

/// Decoded resume position. Internal to the selection module.
///
/// The timestamp is carried at full precision; truncating it would let a
/// fragment straddling the recorded instant reappear on, or vanish from,
/// the next page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct CursorState {
    #[serde(rename = "v")]
    version: u32,
    pub origin: TimestampOrigin,
    #[serde(rename = "ts")]
    resume_after: DateTime<Utc>,
    #[serde(rename = "num")]
    resume_after_number: u64,
}

impl CursorState {
    /// Builds the state recording the last fragment surfaced on a page.
    pub fn after(origin: TimestampOrigin, timestamp: DateTime<Utc>, number: FragmentNumber) -> Self {
        Self {
            version: CURSOR_VERSION,
            origin,
            resume_after: timestamp,
            resume_after_number: number.as_u64(),
        }
    }

    /// Timestamp component of the resume position.
    pub fn resume_timestamp(&self) -> DateTime<Utc> {
        self.resume_after
    }

    /// Fragment-number component of the resume position.
    pub fn resume_number(&self) -> FragmentNumber {
        FragmentNumber::new(self.resume_after_number)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn state_at(ms: i64, number: u64) -> CursorState {
        CursorState::after(
            TimestampOrigin::Producer,
            Utc.timestamp_millis_opt(ms).unwrap(),
            FragmentNumber::new(number),
        )
    }

    #[test]
    fn test_round_trip_preserves_position() {
        let state = state_at(123_456_789, 42);
        let cursor = ContinuationCursor::encode(&state).unwrap();
        let decoded = cursor.decode().unwrap();

        assert_eq!(decoded, state);
        assert_eq!(decoded.resume_timestamp().timestamp_millis(), 123_456_789);
        assert_eq!(decoded.resume_number(), FragmentNumber::new(42));
    }

    #[test]
    fn test_sub_millisecond_precision_survives() {
        let instant = Utc.timestamp_opt(100, 123_456_789).unwrap();
        let state = CursorState::after(
            TimestampOrigin::Server,
            instant,
            FragmentNumber::new(7),
        );

        let decoded = ContinuationCursor::encode(&state).unwrap().decode().unwrap();
        assert_eq!(decoded.resume_timestamp(), instant);
    }

    #[test]
    fn test_token_is_plain_hex() {
        let cursor = ContinuationCursor::encode(&state_at(1000, 1)).unwrap();
        assert!(cursor.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_garbage_tokens_rejected() {
        let not_hex = ContinuationCursor::from_token("zz-not-hex");
        assert!(matches!(
            not_hex.decode().unwrap_err(),
            SelectionError::InvalidCursor { .. }
        ));

        let hex_but_not_json = ContinuationCursor::from_token(hex::encode(b"hello"));
        assert!(hex_but_not_json.decode().is_err());
    }

    #[test]
    fn test_unknown_version_rejected() {
        let mut state = state_at(1000, 1);
        state.version = 99;
        let cursor = ContinuationCursor::encode(&state).unwrap();

        let error = cursor.decode().unwrap_err();
        assert!(matches!(error, SelectionError::InvalidCursor { .. }));
        assert!(error.to_string().contains("version"));
    }

    proptest::proptest! {
        #[test]
        fn test_round_trip_any_position(
            ms in 0i64..4_102_444_800_000i64,
            number in 0u64..u64::MAX,
            producer in proptest::bool::ANY,
        ) {
            let origin = if producer {
                TimestampOrigin::Producer
            } else {
                TimestampOrigin::Server
            };
            let state = CursorState::after(
                origin,
                Utc.timestamp_millis_opt(ms).unwrap(),
                FragmentNumber::new(number),
            );

            let decoded = ContinuationCursor::encode(&state).unwrap().decode().unwrap();
            proptest::prop_assert_eq!(decoded, state);
        }
    }
}
