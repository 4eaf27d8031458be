//! Playback session state as observed from outside the controller.

use crate::track::Track;
use bridge_traits::EngineState;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Message recorded when the engine reports its error state without detail.
pub const ENGINE_ERROR_STATE_MESSAGE: &str = "audio engine reported an error state";

/// Coarse playback phase of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TransportState {
    #[default]
    Idle,
    Loading,
    Ready,
    Playing,
    Paused,
    Ended,
    Error,
}

impl TransportState {
    /// Maps a raw engine state onto the transport state machine.
    pub fn from_engine(state: EngineState) -> Self {
        match state {
            EngineState::None => TransportState::Idle,
            EngineState::Ready => TransportState::Ready,
            EngineState::Connecting | EngineState::Buffering | EngineState::Loading => {
                TransportState::Loading
            }
            EngineState::Playing => TransportState::Playing,
            EngineState::Paused | EngineState::Stopped => TransportState::Paused,
            EngineState::Ended => TransportState::Ended,
            EngineState::Error => TransportState::Error,
        }
    }

    /// States in which the progress sampler runs.
    pub fn is_active(&self) -> bool {
        matches!(self, TransportState::Loading | TransportState::Playing)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransportState::Idle => "idle",
            TransportState::Loading => "loading",
            TransportState::Ready => "ready",
            TransportState::Playing => "playing",
            TransportState::Paused => "paused",
            TransportState::Ended => "ended",
            TransportState::Error => "error",
        }
    }
}

impl fmt::Display for TransportState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable copy of the session state, delivered to observers.
///
/// `transport_state == Error` holds exactly when `last_error` is set, and
/// `position` never exceeds a known `duration`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub current_track: Option<Track>,
    pub transport_state: TransportState,
    /// Seconds from the start of the current track.
    pub position: f64,
    /// Seconds, once known.
    pub duration: Option<f64>,
    pub last_error: Option<String>,
    /// The audio engine has been initialized.
    pub is_ready: bool,
}

impl SessionSnapshot {
    /// Playing, or about to be (buffering).
    pub fn is_playing(&self) -> bool {
        self.transport_state.is_active()
    }

    pub fn has_error(&self) -> bool {
        self.transport_state == TransportState::Error
    }

    pub fn track_id(&self) -> Option<&str> {
        self.current_track.as_ref().map(|track| track.id.as_str())
    }

    pub(crate) fn set_error(&mut self, message: impl Into<String>) {
        self.transport_state = TransportState::Error;
        self.last_error = Some(message.into());
    }

    /// Moves to a non-error state, clearing any recorded error.
    pub(crate) fn set_transport(&mut self, state: TransportState) {
        debug_assert!(state != TransportState::Error);
        self.transport_state = state;
        self.last_error = None;
    }

    /// Stores a position sample, clamped to `[0, duration]`.
    pub(crate) fn set_position(&mut self, position: f64) {
        self.position = clamp_position(position, self.duration);
    }

    /// Stores a duration, dropping negative or non-finite values, and pulls
    /// the position back inside it.
    pub(crate) fn set_duration(&mut self, duration: Option<f64>) {
        self.duration = sanitize_duration(duration);
        self.position = clamp_position(self.position, self.duration);
    }
}

/// A duration is only meaningful when finite and non-negative.
pub(crate) fn sanitize_duration(duration: Option<f64>) -> Option<f64> {
    duration.filter(|d| d.is_finite() && *d >= 0.0)
}

pub(crate) fn clamp_position(position: f64, duration: Option<f64>) -> f64 {
    let position = if position.is_finite() { position.max(0.0) } else { 0.0 };
    match sanitize_duration(duration) {
        Some(duration) => position.min(duration),
        None => position,
    }
}
