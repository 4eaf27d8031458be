//! # Host Bridge Traits
//!
//! Contracts that the host application (iOS, Android, desktop test harness)
//! must satisfy for the playback core to run.
//!
//! ## Overview
//!
//! The playback core never talks to a native media framework directly. It
//! drives an [`AudioEngine`](playback::AudioEngine) supplied by the host, which
//! wraps whatever actually decodes and outputs audio, and it mirrors its logs
//! into an optional [`LoggerSink`](logging::LoggerSink) so they show up in
//! Logcat/OSLog next to the host's own output.
//!
//! ## Traits
//!
//! - [`AudioEngine`](playback::AudioEngine) - load/play/pause/seek primitives,
//!   position queries and an asynchronous event feed
//! - [`LoggerSink`](logging::LoggerSink) - forward structured logs to host logging
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). Host adapters
//! should convert their platform errors into it and keep the message
//! actionable (it ends up in front of the user as the session's last error).
//!
//! ## Thread Safety
//!
//! Bridge traits require `Send + Sync` so a single adapter instance can be
//! shared between the session controller and its background tasks.
//!
//! ## Example
//!
//! ```ignore
//! use async_trait::async_trait;
//! use bridge_traits::playback::{AudioEngine, EngineEventSender, EngineOptions, EngineTrack};
//! use bridge_traits::error::Result;
//!
//! struct NativePlayer { /* platform handle */ }
//!
//! #[async_trait]
//! impl AudioEngine for NativePlayer {
//!     async fn initialize(&self, options: EngineOptions) -> Result<()> { todo!() }
//!     async fn load(&self, track: EngineTrack) -> Result<()> { todo!() }
//!     // ...
//! #   async fn play(&self) -> Result<()> { todo!() }
//! #   async fn pause(&self) -> Result<()> { todo!() }
//! #   async fn seek(&self, seconds: f64) -> Result<()> { todo!() }
//! #   async fn reset(&self) -> Result<()> { todo!() }
//! #   async fn position(&self) -> Result<f64> { todo!() }
//! #   async fn duration(&self) -> Result<Option<f64>> { todo!() }
//! #   fn subscribe_events(&self, sender: EngineEventSender) {}
//! }
//! ```

pub mod error;
pub mod logging;
pub mod playback;

pub use error::BridgeError;

// Re-export commonly used types
pub use logging::{ConsoleLogger, LogEntry, LogLevel, LoggerSink};
pub use playback::{
    AudioEngine, Capability, EngineEvent, EngineEventReceiver, EngineEventSender, EngineOptions,
    EngineState, EngineTrack,
};
