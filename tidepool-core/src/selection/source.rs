//! Transport seam between the selector and whatever fetches fragments.
//!
//! The selector never performs I/O. Real deployments implement
//! [`FragmentSource`] over the archive query service; tests and offline
//! development use [`SimulatedStreamStore`], an in-memory store that
//! behaves like an ingest endpoint. The `simulation` feature adds a
//! seeded fragment generator for reproducible synthetic streams.

use std::collections::HashMap;

use parking_lot::RwLock;

use super::window::TimeRange;
use crate::fragment::Fragment;
use crate::stream::StreamRef;

/// Errors surfaced from a fragment source.
///
/// Stream existence is the transport layer's call; the selector only ever
/// sees fragments for streams that resolved.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SourceError {
    #[error("Stream not found: {stream}")]
    StreamNotFound { stream: StreamRef },

    #[error("Transport failure: {reason}")]
    Transport { reason: String },
}

/// Fetches candidate fragment metadata for a stream.
///
/// `window` is a coarse hint: implementations may prefilter with it, but
/// the selector re-applies the exact window rules, so over-fetching is
/// always safe and under-fetching is not.
#[async_trait::async_trait]
pub trait FragmentSource: Send + Sync {
    /// Returns fragment metadata for the stream, in arbitrary order.
    ///
    /// # Errors
    ///
    /// - `SourceError::StreamNotFound` - Stream does not exist
    /// - `SourceError::Transport` - Underlying query failed
    async fn fetch_fragments(
        &self,
        stream: &StreamRef,
        window: Option<&TimeRange>,
    ) -> Result<Vec<Fragment>, SourceError>;
}

/// In-memory fragment store standing in for the archive service.
///
/// Thread-safe; `ingest` may race with `fetch_fragments` the way real
/// ingest races with queries. Streams must be registered before ingest so
/// lookups against unknown streams fail the same way transport does.
#[derive(Debug, Default)]
pub struct SimulatedStreamStore {
    streams: RwLock<HashMap<String, Vec<Fragment>>>,
}

impl SimulatedStreamStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a stream with no fragments.
    pub fn register_stream(&self, name: &str) {
        self.streams
            .write()
            .entry(name.to_string())
            .or_insert_with(Vec::new);
    }

    /// Appends one fragment to a registered stream.
    ///
    /// # Errors
    ///
    /// - `SourceError::StreamNotFound` - Stream was never registered
    pub fn ingest(&self, name: &str, fragment: Fragment) -> Result<(), SourceError> {
        let mut streams = self.streams.write();
        match streams.get_mut(name) {
            Some(fragments) => {
                fragments.push(fragment);
                Ok(())
            }
            None => Err(SourceError::StreamNotFound {
                stream: StreamRef::Name(name.to_string()),
            }),
        }
    }

    /// Appends a batch of fragments to a registered stream.
    ///
    /// # Errors
    ///
    /// - `SourceError::StreamNotFound` - Stream was never registered
    pub fn ingest_all(
        &self,
        name: &str,
        fragments: impl IntoIterator<Item = Fragment>,
    ) -> Result<(), SourceError> {
        let mut streams = self.streams.write();
        match streams.get_mut(name) {
            Some(stored) => {
                stored.extend(fragments);
                Ok(())
            }
            None => Err(SourceError::StreamNotFound {
                stream: StreamRef::Name(name.to_string()),
            }),
        }
    }

    /// Number of fragments currently held for a stream.
    pub fn fragment_count(&self, name: &str) -> Option<usize> {
        self.streams.read().get(name).map(Vec::len)
    }
}

#[async_trait::async_trait]
impl FragmentSource for SimulatedStreamStore {
    async fn fetch_fragments(
        &self,
        stream: &StreamRef,
        window: Option<&TimeRange>,
    ) -> Result<Vec<Fragment>, SourceError> {
        let streams = self.streams.read();
        let fragments = streams
            .get(stream.short_name())
            .ok_or_else(|| SourceError::StreamNotFound {
                stream: stream.clone(),
            })?;

        // Coarse prefilter: keep anything either timestamp places in the
        // window. The selector applies the exact origin rules afterwards.
        let matching = fragments
            .iter()
            .filter(|f| {
                window.is_none_or(|w| {
                    w.contains(f.producer_timestamp) || w.contains(f.server_timestamp)
                })
            })
            .cloned()
            .collect();
        Ok(matching)
    }
}

/// Deterministic synthetic producer for simulated streams.
///
/// Emits fragments at the configured cadence with seeded size jitter and
/// ingest lag, so two generators built from the same configuration produce
/// byte-identical listings.
#[cfg(feature = "simulation")]
pub struct FragmentGenerator {
    rng: rand_chacha::ChaCha8Rng,
    config: crate::config::SimulationConfig,
}

#[cfg(feature = "simulation")]
impl FragmentGenerator {
    /// Creates a generator from simulation configuration.
    ///
    /// An unset seed falls back to 0 so unconfigured runs stay
    /// reproducible rather than silently going nondeterministic.
    pub fn new(config: crate::config::SimulationConfig) -> Self {
        use rand::SeedableRng;

        let seed = config.deterministic_seed.unwrap_or(0);
        Self {
            rng: rand_chacha::ChaCha8Rng::seed_from_u64(seed),
            config,
        }
    }

    /// Generates `count` consecutive fragments starting at `start`.
    ///
    /// Producer timestamps advance by the configured interval; server
    /// timestamps trail by a seeded lag; numbers count up from
    /// `first_number`.
    pub fn generate(
        &mut self,
        start: chrono::DateTime<chrono::Utc>,
        first_number: u64,
        count: usize,
    ) -> Vec<Fragment> {
        use chrono::Duration;
        use rand::Rng;

        use crate::fragment::FragmentNumber;

        let mut fragments = Vec::with_capacity(count);
        for i in 0..count {
            let producer_timestamp =
                start + Duration::milliseconds((i as u64 * self.config.fragment_interval_ms) as i64);
            let lag_ms = self.rng.random_range(0..=self.config.max_ingest_lag_ms);
            let server_timestamp = producer_timestamp + Duration::milliseconds(lag_ms as i64);

            let mean = self.config.mean_fragment_size_bytes;
            let size_bytes = self.rng.random_range(mean - mean / 4..=mean + mean / 4);

            fragments.push(Fragment::new(
                FragmentNumber::new(first_number + i as u64),
                size_bytes,
                producer_timestamp,
                server_timestamp,
                self.config.fragment_duration_ms,
            ));
        }
        fragments
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, TimeZone, Utc};

    use super::*;
    use crate::fragment::FragmentNumber;

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn fragment(number: u64, secs: i64) -> Fragment {
        Fragment::new(FragmentNumber::new(number), 1024, ts(secs), ts(secs + 1), 2000)
    }

    #[test]
    fn test_unknown_stream_rejected() {
        let store = SimulatedStreamStore::new();
        let stream = StreamRef::from_name("ghost").unwrap();

        let error = tokio_test::block_on(store.fetch_fragments(&stream, None)).unwrap_err();
        assert_eq!(
            error,
            SourceError::StreamNotFound {
                stream: StreamRef::Name("ghost".to_string())
            }
        );

        assert!(store.ingest("ghost", fragment(1, 10)).is_err());
    }

    #[test]
    fn test_ingest_then_fetch() {
        let store = SimulatedStreamStore::new();
        store.register_stream("cam-1");
        store.ingest("cam-1", fragment(1, 10)).unwrap();
        store
            .ingest_all("cam-1", vec![fragment(2, 20), fragment(3, 30)])
            .unwrap();

        let stream = StreamRef::from_name("cam-1").unwrap();
        let fetched = tokio_test::block_on(store.fetch_fragments(&stream, None)).unwrap();

        assert_eq!(fetched.len(), 3);
        assert_eq!(store.fragment_count("cam-1"), Some(3));
    }

    #[test]
    fn test_window_hint_prefilters_coarsely() {
        let store = SimulatedStreamStore::new();
        store.register_stream("cam-1");
        store
            .ingest_all(
                "cam-1",
                vec![fragment(1, 10), fragment(2, 50), fragment(3, 90)],
            )
            .unwrap();

        let stream = StreamRef::from_name("cam-1").unwrap();
        let window = TimeRange::new(ts(40), ts(60)).unwrap();
        let fetched =
            tokio_test::block_on(store.fetch_fragments(&stream, Some(&window))).unwrap();

        assert_eq!(fetched.len(), 1);
        assert_eq!(fetched[0].number, FragmentNumber::new(2));
    }

    #[test]
    fn test_arn_lookup_uses_final_segment() {
        let store = SimulatedStreamStore::new();
        store.register_stream("cam-1");
        store.ingest("cam-1", fragment(1, 10)).unwrap();

        let stream = StreamRef::from_arn("arn:video:eu-west-1:stream/cam-1").unwrap();
        let fetched = tokio_test::block_on(store.fetch_fragments(&stream, None)).unwrap();

        assert_eq!(fetched.len(), 1);
    }

    #[cfg(feature = "simulation")]
    #[test]
    fn test_generator_is_deterministic() {
        use chrono::Duration;

        use crate::config::SimulationConfig;

        let config = SimulationConfig::deterministic_testing();
        let mut first = FragmentGenerator::new(config.clone());
        let mut second = FragmentGenerator::new(config);

        let a = first.generate(ts(1000), 1, 16);
        let b = second.generate(ts(1000), 1, 16);

        assert_eq!(a, b);
        assert_eq!(a.len(), 16);
        // Producer timestamps advance by the configured cadence
        assert_eq!(a[1].producer_timestamp - a[0].producer_timestamp,
            Duration::milliseconds(1000));
        // Server timestamps never precede their producer timestamps
        assert!(a.iter().all(|f| f.server_timestamp >= f.producer_timestamp));
    }
}
