//! Centralized configuration for Tidepool.
//!
//! All tunable limits and settings are defined here to avoid hard-coded
//! values scattered throughout the codebase.

use std::time::Duration;

/// Central configuration for all Tidepool components.
///
/// Groups related limits into logical sections. Supports environment
/// variable overrides for runtime customization.
#[derive(Debug, Clone, Default)]
pub struct TidepoolConfig {
    pub selection: SelectionLimits,
    pub session: SessionLimits,
    pub simulation: SimulationConfig,
}

/// Bounds enforced by the fragment window selector.
///
/// Callers supplying values outside these bounds are rejected with a
/// validation error; nothing is clamped silently.
#[derive(Debug, Clone)]
pub struct SelectionLimits {
    /// Smallest accepted max_results value
    pub min_results: u32,
    /// Largest max_results for on-demand listings
    pub max_results_on_demand: u32,
    /// Largest max_results for live and live-replay selections
    pub max_results_live: u32,
    /// Longest accepted time range span for bounded modes
    pub max_range: Duration,
}

impl Default for SelectionLimits {
    fn default() -> Self {
        Self {
            min_results: 1,
            max_results_on_demand: 1000,
            max_results_live: 5000,
            max_range: Duration::from_secs(24 * 60 * 60), // 24 hours
        }
    }
}

/// Bounds enforced on playback-session requests.
#[derive(Debug, Clone)]
pub struct SessionLimits {
    /// Shortest accepted session expiry
    pub min_expiry: Duration,
    /// Longest accepted session expiry
    pub max_expiry: Duration,
    /// Largest manifest fragment count for HLS/DASH sessions
    pub max_manifest_fragments: u32,
    /// Largest fragment count for clip sessions
    pub max_clip_fragments: u32,
    /// Manifest fragment count used when a live-family request leaves it unset
    pub default_live_manifest_fragments: u32,
    /// Manifest fragment count used when an on-demand request leaves it unset
    pub default_on_demand_manifest_fragments: u32,
}

impl Default for SessionLimits {
    fn default() -> Self {
        Self {
            min_expiry: Duration::from_secs(300),          // 5 minutes
            max_expiry: Duration::from_secs(12 * 60 * 60), // 12 hours
            max_manifest_fragments: 5000,
            max_clip_fragments: 200,
            default_live_manifest_fragments: 5,
            default_on_demand_manifest_fragments: 1000,
        }
    }
}

/// Simulated ingest configuration for testing and development.
///
/// Controls the deterministic fragment generator used when no real
/// transport layer is available.
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    /// Deterministic seed for reproducible fragment generation
    pub deterministic_seed: Option<u64>,
    /// Wall-clock spacing between generated fragments
    pub fragment_interval_ms: u64,
    /// Playback duration of each generated fragment
    pub fragment_duration_ms: u64,
    /// Mean generated fragment payload size
    pub mean_fragment_size_bytes: u64,
    /// Maximum producer/server timestamp skew to inject
    pub max_ingest_lag_ms: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            deterministic_seed: None,
            fragment_interval_ms: 2000, // one fragment every 2 seconds
            fragment_duration_ms: 2000,
            mean_fragment_size_bytes: 512 * 1024, // 512 KiB
            max_ingest_lag_ms: 1500,
        }
    }
}

impl SimulationConfig {
    /// Creates a configuration for deterministic testing.
    pub fn deterministic_testing() -> Self {
        Self {
            deterministic_seed: Some(42), // Fixed seed for reproducible tests
            fragment_interval_ms: 1000,
            fragment_duration_ms: 1000,
            mean_fragment_size_bytes: 64 * 1024, // Small payloads for fast tests
            max_ingest_lag_ms: 500,
        }
    }
}

impl TidepoolConfig {
    /// Creates configuration with environment variable overrides.
    ///
    /// Allows runtime tuning via environment variables while keeping
    /// sensible defaults for everything left unset.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(value) = std::env::var("TIDEPOOL_MAX_ON_DEMAND_RESULTS") {
            if let Ok(count) = value.parse::<u32>() {
                config.selection.max_results_on_demand = count;
            }
        }

        if let Ok(value) = std::env::var("TIDEPOOL_MAX_LIVE_RESULTS") {
            if let Ok(count) = value.parse::<u32>() {
                config.selection.max_results_live = count;
            }
        }

        if let Ok(value) = std::env::var("TIDEPOOL_MAX_RANGE_HOURS") {
            if let Ok(hours) = value.parse::<u64>() {
                config.selection.max_range = Duration::from_secs(hours * 60 * 60);
            }
        }

        if let Ok(value) = std::env::var("TIDEPOOL_MAX_EXPIRY_SECS") {
            if let Ok(seconds) = value.parse::<u64>() {
                config.session.max_expiry = Duration::from_secs(seconds);
            }
        }

        if let Ok(value) = std::env::var("TIDEPOOL_SIMULATION_SEED") {
            if let Ok(seed) = value.parse::<u64>() {
                config.simulation.deterministic_seed = Some(seed);
            }
        }

        config
    }

    /// Creates a configuration optimized for testing.
    pub fn for_testing() -> Self {
        Self {
            simulation: SimulationConfig::deterministic_testing(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_values() {
        let config = TidepoolConfig::default();

        assert_eq!(config.selection.min_results, 1);
        assert_eq!(config.selection.max_results_on_demand, 1000);
        assert_eq!(config.selection.max_results_live, 5000);
        assert_eq!(config.selection.max_range, Duration::from_secs(86400));
        assert_eq!(config.session.min_expiry, Duration::from_secs(300));
        assert_eq!(config.session.max_clip_fragments, 200);
        assert!(config.simulation.deterministic_seed.is_none());
    }

    #[test]
    fn test_testing_preset_is_deterministic() {
        let config = TidepoolConfig::for_testing();

        assert_eq!(config.simulation.deterministic_seed, Some(42));
        assert_eq!(config.simulation.fragment_interval_ms, 1000);
        // Selector limits are unchanged by the preset
        assert_eq!(config.selection.max_results_on_demand, 1000);
    }

    #[test]
    fn test_env_override() {
        unsafe {
            std::env::set_var("TIDEPOOL_MAX_ON_DEMAND_RESULTS", "250");
            std::env::set_var("TIDEPOOL_MAX_RANGE_HOURS", "6");
            std::env::set_var("TIDEPOOL_SIMULATION_SEED", "12345");
        }

        let config = TidepoolConfig::from_env();

        assert_eq!(config.selection.max_results_on_demand, 250);
        assert_eq!(config.selection.max_range, Duration::from_secs(6 * 3600));
        assert_eq!(config.simulation.deterministic_seed, Some(12345));
        // Untouched values keep their defaults
        assert_eq!(config.selection.max_results_live, 5000);

        // Cleanup
        unsafe {
            std::env::remove_var("TIDEPOOL_MAX_ON_DEMAND_RESULTS");
            std::env::remove_var("TIDEPOOL_MAX_RANGE_HOURS");
            std::env::remove_var("TIDEPOOL_SIMULATION_SEED");
        }
    }
}
