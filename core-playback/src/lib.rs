//! # Playback Session Core
//!
//! Owns the state of the one playback session of the app: which track is
//! current, whether it is loading, playing or paused, how far along it is,
//! and the last error. The native audio engine sits behind
//! [`bridge_traits::AudioEngine`]; screens observe immutable
//! [`SessionSnapshot`]s through subscriptions.
//!
//! ## Overview
//!
//! - [`SessionController`]: the only mutator of session state; serializes UI
//!   intents, engine events and progress samples
//! - [`ProgressSampler`]: polls position/duration while loading or playing
//! - [`SessionSnapshot`] / [`TransportState`]: what observers see
//! - [`Track`] / [`CatalogTrack`]: playable units and the catalog model they
//!   come from
//! - [`NowPlaying`]: display-ready projection for player views

pub mod config;
pub mod controller;
pub mod error;
pub mod sampler;
pub mod state;
pub mod track;
pub mod view;

pub use config::SessionConfig;
pub use controller::SessionController;
pub use error::{EngineOperation, InitError, PlaybackError, Result};
pub use sampler::{ProgressSample, ProgressSampler, ProgressSink};
pub use state::{SessionSnapshot, TransportState};
pub use track::{CatalogTrack, Track, TrackLookup};
pub use view::{format_time, NowPlaying};
