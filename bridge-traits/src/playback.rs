//! Audio engine bridge trait and supporting types.
//!
//! The host wraps its native player (the component that actually decodes and
//! outputs audio) behind [`AudioEngine`]. The playback core is the engine's
//! only caller: it issues primitive commands and consumes the engine's
//! asynchronous [`EngineEvent`] feed through a channel registered with
//! [`AudioEngine::subscribe_events`].

use crate::error::Result;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Sending half of the engine event channel handed to the host adapter.
pub type EngineEventSender = mpsc::UnboundedSender<EngineEvent>;

/// Receiving half of the engine event channel, owned by the playback core.
pub type EngineEventReceiver = mpsc::UnboundedReceiver<EngineEvent>;

/// Remote-control capabilities advertised to the operating system
/// (lock screen, notification shade, headset buttons).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Capability {
    Play,
    Pause,
    SeekTo,
    Stop,
}

/// Options passed to [`AudioEngine::initialize`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineOptions {
    /// Capabilities exposed in the expanded media notification.
    pub capabilities: Vec<Capability>,
    /// Capabilities exposed in the compact notification. Must be a subset of
    /// `capabilities`.
    pub compact_capabilities: Vec<Capability>,
    /// Stop playback when the host app is removed from the task switcher.
    pub stop_with_app: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            capabilities: vec![Capability::Play, Capability::Pause, Capability::SeekTo],
            compact_capabilities: vec![Capability::Play, Capability::Pause],
            stop_with_app: true,
        }
    }
}

impl EngineOptions {
    /// Returns `true` when the engine is configured to expose `capability`.
    pub fn supports(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }
}

/// Track description handed to [`AudioEngine::load`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EngineTrack {
    /// Opaque identifier; echoed back in [`EngineEvent::TrackChanged`].
    pub id: String,
    /// Locator of the audio stream, when the host cannot resolve `id` itself.
    pub url: Option<String>,
    /// Display title for the media session.
    pub title: String,
    /// Display artist line for the media session.
    pub artist: String,
    /// Artwork URL or local resource handle.
    pub artwork: Option<String>,
    /// Duration in seconds, if already known from the catalog.
    pub duration: Option<f64>,
}

/// Raw player state as reported by the native engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EngineState {
    /// Nothing loaded (after a reset).
    None,
    Ready,
    Connecting,
    Buffering,
    Loading,
    Playing,
    Paused,
    Stopped,
    Ended,
    Error,
}

/// Asynchronous notifications emitted by the engine, in engine order.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// The engine switched to another track (or to none).
    TrackChanged { track_id: Option<String> },
    /// The engine's playback state changed.
    StateChanged(EngineState),
    /// The engine failed while playing.
    PlaybackError { message: String },
}

/// Trait for host adapters that drive a native audio engine.
///
/// All commands are requests: the authoritative outcome arrives later as an
/// [`EngineEvent::StateChanged`].
#[async_trait::async_trait]
pub trait AudioEngine: Send + Sync {
    /// Initialize the engine. Fails on device, permission or codec problems.
    async fn initialize(&self, options: EngineOptions) -> Result<()>;

    /// Load `track`, replacing whatever was loaded before.
    async fn load(&self, track: EngineTrack) -> Result<()>;

    /// Start or resume playback of the loaded track.
    async fn play(&self) -> Result<()>;

    /// Pause playback, keeping the track loaded.
    async fn pause(&self) -> Result<()>;

    /// Seek to an absolute position in seconds.
    async fn seek(&self, seconds: f64) -> Result<()>;

    /// Stop playback and unload the current track.
    async fn reset(&self) -> Result<()>;

    /// Current playback position in seconds.
    async fn position(&self) -> Result<f64>;

    /// Duration of the loaded track in seconds, `None` until known.
    async fn duration(&self) -> Result<Option<f64>>;

    /// Register the channel the engine pushes its events into. Replaces any
    /// previously registered sender.
    fn subscribe_events(&self, sender: EngineEventSender);
}
