//! # Session Configuration
//!
//! Tunables for the session controller and its progress sampler.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Session controller configuration.
///
/// Controls the progress sampling cadence, how many failed samples are
/// tolerated, and how many tracks the controller remembers for resolving
/// engine track-change events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Time between two position samples.
    ///
    /// The UI wants 4-10 samples per second; the exact value is not a
    /// correctness property.
    ///
    /// Default: 250 ms.
    #[serde(default = "default_sample_interval")]
    pub sample_interval: Duration,

    /// Consecutive failed samples after which the session moves to `Error`.
    ///
    /// Default: 3.
    #[serde(default = "default_max_consecutive_failures")]
    pub max_consecutive_failures: u32,

    /// Number of tracks kept for resolving `TrackChanged` events.
    ///
    /// Default: 64.
    #[serde(default = "default_lookup_capacity")]
    pub lookup_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            sample_interval: default_sample_interval(),
            max_consecutive_failures: default_max_consecutive_failures(),
            lookup_capacity: default_lookup_capacity(),
        }
    }
}

impl SessionConfig {
    /// Configuration for the full-screen player, where the scrubber should
    /// move smoothly (10 samples per second).
    pub fn responsive() -> Self {
        Self {
            sample_interval: Duration::from_millis(100),
            ..Default::default()
        }
    }

    /// Override the sampling interval.
    pub fn with_sample_interval(mut self, interval: Duration) -> Self {
        self.sample_interval = interval;
        self
    }

    /// Override the failure threshold.
    pub fn with_max_consecutive_failures(mut self, failures: u32) -> Self {
        self.max_consecutive_failures = failures;
        self
    }

    /// Override the lookup capacity.
    pub fn with_lookup_capacity(mut self, capacity: usize) -> Self {
        self.lookup_capacity = capacity;
        self
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.sample_interval.is_zero() {
            return Err("sample_interval must be > 0".to_string());
        }

        if self.max_consecutive_failures == 0 {
            return Err("max_consecutive_failures must be > 0".to_string());
        }

        if self.lookup_capacity == 0 {
            return Err("lookup_capacity must be > 0".to_string());
        }

        Ok(())
    }

    /// Samples per second implied by `sample_interval`.
    pub fn samples_per_second(&self) -> f64 {
        1.0 / self.sample_interval.as_secs_f64()
    }
}

fn default_sample_interval() -> Duration {
    Duration::from_millis(250)
}

fn default_max_consecutive_failures() -> u32 {
    3
}

fn default_lookup_capacity() -> usize {
    64
}
