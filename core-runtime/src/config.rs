//! # Core Configuration Module
//!
//! Provides configuration management for the playback core.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a `CoreConfig`
//! instance that holds the host-provided bridges and engine settings. It
//! enforces fail-fast validation so a missing audio engine is reported at
//! startup with an actionable message instead of surfacing later as a
//! confusing playback failure.
//!
//! ## Required Dependencies
//!
//! - `AudioEngine` - the native player wrapper (react to load/play/pause/seek)
//!
//! ## Optional Dependencies
//!
//! - `LoggerSink` - mirror logs into the host logging pipeline
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//! use std::sync::Arc;
//!
//! let config = CoreConfig::builder()
//!     .audio_engine(Arc::new(MyNativePlayer::new()))
//!     .stop_with_app(true)
//!     .build()
//!     .expect("Failed to build config");
//! ```
//!
//! ## Error Handling
//!
//! ```should_panic
//! use core_runtime::config::CoreConfig;
//!
//! // No audio engine: fails with a CapabilityMissing error
//! let config = CoreConfig::builder()
//!     .build()
//!     .expect("Should fail - missing audio engine");
//! ```

use crate::error::{Error, Result};
use bridge_traits::{AudioEngine, Capability, EngineOptions, LoggerSink};
use std::sync::Arc;

/// Core configuration for the playback core.
///
/// Use [`CoreConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct CoreConfig {
    /// Native audio engine adapter (required)
    pub audio_engine: Arc<dyn AudioEngine>,

    /// Options passed to the engine on initialization
    pub engine_options: EngineOptions,

    /// Host logger mirror (optional)
    pub logger_sink: Option<Arc<dyn LoggerSink>>,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("audio_engine", &"AudioEngine { ... }")
            .field("engine_options", &self.engine_options)
            .field(
                "logger_sink",
                &self.logger_sink.as_ref().map(|_| "LoggerSink { ... }"),
            )
            .finish()
    }
}

impl CoreConfig {
    /// Creates a new builder for constructing a `CoreConfig`.
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    ///
    /// This checks:
    /// - The engine exposes at least the `Play` capability
    /// - Compact capabilities are a subset of the full capability list
    pub fn validate(&self) -> Result<()> {
        let options = &self.engine_options;

        if !options.supports(Capability::Play) {
            return Err(Error::Config(
                "Engine options must include the Play capability".to_string(),
            ));
        }

        if let Some(extra) = options
            .compact_capabilities
            .iter()
            .find(|capability| !options.supports(**capability))
        {
            return Err(Error::Config(format!(
                "Compact capability {:?} is not listed in capabilities",
                extra
            )));
        }

        Ok(())
    }
}

fn audio_engine_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "AudioEngine".to_string(),
        message: "AudioEngine implementation is required for playback. \
                 Mobile: inject the native player adapter (AVPlayer/ExoPlayer wrapper). \
                 Tests: inject an in-memory engine."
            .to_string(),
    }
}

/// Builder for constructing [`CoreConfig`] instances.
#[derive(Default)]
pub struct CoreConfigBuilder {
    audio_engine: Option<Arc<dyn AudioEngine>>,
    engine_options: Option<EngineOptions>,
    logger_sink: Option<Arc<dyn LoggerSink>>,
}

impl CoreConfigBuilder {
    /// Sets the audio engine adapter (required).
    pub fn audio_engine(mut self, engine: Arc<dyn AudioEngine>) -> Self {
        self.audio_engine = Some(engine);
        self
    }

    /// Replaces the engine options wholesale.
    pub fn engine_options(mut self, options: EngineOptions) -> Self {
        self.engine_options = Some(options);
        self
    }

    /// Sets the remote-control capabilities, keeping the other options.
    pub fn capabilities(mut self, capabilities: Vec<Capability>) -> Self {
        self.engine_options
            .get_or_insert_with(EngineOptions::default)
            .capabilities = capabilities;
        self
    }

    /// Sets the compact remote-control capabilities, keeping the other options.
    pub fn compact_capabilities(mut self, capabilities: Vec<Capability>) -> Self {
        self.engine_options
            .get_or_insert_with(EngineOptions::default)
            .compact_capabilities = capabilities;
        self
    }

    /// Stop playback when the app is dismissed.
    pub fn stop_with_app(mut self, stop: bool) -> Self {
        self.engine_options
            .get_or_insert_with(EngineOptions::default)
            .stop_with_app = stop;
        self
    }

    /// Sets the host logger sink.
    pub fn logger_sink(mut self, sink: Arc<dyn LoggerSink>) -> Self {
        self.logger_sink = Some(sink);
        self
    }

    /// Builds the final `CoreConfig` instance.
    ///
    /// # Errors
    ///
    /// - [`Error::CapabilityMissing`] when no audio engine was provided
    /// - [`Error::Config`] when the engine options are inconsistent
    pub fn build(self) -> Result<CoreConfig> {
        let audio_engine = self.audio_engine.ok_or_else(audio_engine_missing_error)?;

        let config = CoreConfig {
            audio_engine,
            engine_options: self.engine_options.unwrap_or_default(),
            logger_sink: self.logger_sink,
        };

        config.validate()?;

        Ok(config)
    }
}
