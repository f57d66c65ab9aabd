//! Fragment metadata model for archived media streams.
//!
//! A fragment is a contiguous, independently decodable segment of a recorded
//! stream. Producers assign a capture-time timestamp; the ingest server
//! assigns a receipt-time timestamp. Window selection can be driven by
//! either, so both are carried on every fragment.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Monotonically ordered identifier of a fragment within a stream.
///
/// Numbers are assigned by the ingest service in increasing order, so a
/// numerically larger fragment number always denotes a newer fragment of
/// the same stream. The value is opaque to callers beyond that ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FragmentNumber(u64);

impl FragmentNumber {
    /// Creates a fragment number from its raw ordinal.
    pub fn new(number: u64) -> Self {
        Self(number)
    }

    /// Returns the underlying ordinal as u64.
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for FragmentNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which of a fragment's two timestamps drives window selection.
///
/// Range comparison, deduplication, and output ordering all read the
/// origin-selected timestamp; the other timestamp is carried through
/// untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimestampOrigin {
    /// Timestamp assigned by the media source device at capture time.
    Producer,
    /// Timestamp assigned by the ingesting service on receipt.
    Server,
}

impl std::str::FromStr for TimestampOrigin {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "producer" => Ok(TimestampOrigin::Producer),
            "server" => Ok(TimestampOrigin::Server),
            _ => Err(format!("Invalid timestamp origin: {s}")),
        }
    }
}

impl fmt::Display for TimestampOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimestampOrigin::Producer => write!(f, "PRODUCER"),
            TimestampOrigin::Server => write!(f, "SERVER"),
        }
    }
}

/// Metadata for a single archived media fragment.
///
/// Value object constructed once per request and never mutated. Payload
/// bytes live with the media server; only metadata passes through here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fragment {
    /// Ordered identifier within the stream
    pub number: FragmentNumber,
    /// Payload size in bytes
    pub size_bytes: u64,
    /// Capture-time timestamp from the producer device
    pub producer_timestamp: DateTime<Utc>,
    /// Receipt-time timestamp from the ingest server
    pub server_timestamp: DateTime<Utc>,
    /// Playback duration in milliseconds
    pub duration_ms: u64,
}

impl Fragment {
    /// Creates fragment metadata from its constituent parts.
    pub fn new(
        number: FragmentNumber,
        size_bytes: u64,
        producer_timestamp: DateTime<Utc>,
        server_timestamp: DateTime<Utc>,
        duration_ms: u64,
    ) -> Self {
        Self {
            number,
            size_bytes,
            producer_timestamp,
            server_timestamp,
            duration_ms,
        }
    }

    /// Returns the timestamp selected by the given origin.
    pub fn timestamp(&self, origin: TimestampOrigin) -> DateTime<Utc> {
        match origin {
            TimestampOrigin::Producer => self.producer_timestamp,
            TimestampOrigin::Server => self.server_timestamp,
        }
    }

    /// Whether this fragment replaces `other` under producer-timestamp
    /// deduplication: identical producer timestamps, larger number wins.
    pub fn supersedes(&self, other: &Fragment) -> bool {
        self.producer_timestamp == other.producer_timestamp && self.number > other.number
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn fragment_at(number: u64, producer_secs: i64, server_secs: i64) -> Fragment {
        Fragment::new(
            FragmentNumber::new(number),
            512 * 1024,
            Utc.timestamp_opt(producer_secs, 0).unwrap(),
            Utc.timestamp_opt(server_secs, 0).unwrap(),
            2000,
        )
    }

    #[test]
    fn test_fragment_number_ordering() {
        assert!(FragmentNumber::new(7) > FragmentNumber::new(5));
        assert_eq!(FragmentNumber::new(42).as_u64(), 42);
        assert_eq!(FragmentNumber::new(42).to_string(), "42");
    }

    #[test]
    fn test_timestamp_selection_by_origin() {
        let fragment = fragment_at(1, 100, 130);

        assert_eq!(
            fragment.timestamp(TimestampOrigin::Producer),
            Utc.timestamp_opt(100, 0).unwrap()
        );
        assert_eq!(
            fragment.timestamp(TimestampOrigin::Server),
            Utc.timestamp_opt(130, 0).unwrap()
        );
    }

    #[test]
    fn test_supersedes_requires_equal_producer_timestamp() {
        let older = fragment_at(5, 100, 101);
        let newer = fragment_at(7, 100, 103);
        let unrelated = fragment_at(9, 200, 201);

        assert!(newer.supersedes(&older));
        assert!(!older.supersedes(&newer));
        assert!(!unrelated.supersedes(&older));
    }

    #[test]
    fn test_origin_parsing() {
        assert_eq!(
            "producer".parse::<TimestampOrigin>().unwrap(),
            TimestampOrigin::Producer
        );
        assert_eq!(
            "SERVER".parse::<TimestampOrigin>().unwrap(),
            TimestampOrigin::Server
        );
        assert!("ingest".parse::<TimestampOrigin>().is_err());
    }

    #[test]
    fn test_fragment_serde_round_trip() {
        let fragment = fragment_at(3, 100, 102);
        let json = serde_json::to_string(&fragment).unwrap();
        let decoded: Fragment = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, fragment);
    }
}
