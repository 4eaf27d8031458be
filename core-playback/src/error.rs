//! # Playback Error Types
//!
//! Errors returned by the session controller. Operation-level failures come
//! back to the caller as values so the UI decides how to surface them; the
//! session-level consequences are published separately through the
//! subscription hub.

use std::fmt;
use thiserror::Error;

/// Engine command that was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineOperation {
    Load,
    Play,
    /// Engine `play` issued to resume a paused or ended track.
    Resume,
    Pause,
    Seek,
    Reset,
}

impl fmt::Display for EngineOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EngineOperation::Load => "load",
            EngineOperation::Play => "play",
            EngineOperation::Resume => "resume",
            EngineOperation::Pause => "pause",
            EngineOperation::Seek => "seek",
            EngineOperation::Reset => "reset",
        };
        f.write_str(name)
    }
}

/// The audio engine could not be initialized (device, permission or codec
/// failure). Fatal to the session until `setup` is retried.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Audio engine failed to initialize: {message}")]
pub struct InitError {
    pub message: String,
}

impl InitError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Errors that can occur during playback operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlaybackError {
    // ========================================================================
    // Request Errors
    // ========================================================================
    /// The track cannot be played (e.g. empty identifier).
    #[error("Invalid track: {0}")]
    InvalidTrack(String),

    /// `setup()` has not completed successfully yet.
    #[error("Playback session not initialized")]
    NotInitialized,

    /// Attempted operation when no track is loaded.
    #[error("No track loaded")]
    NoTrackLoaded,

    /// Seek target is negative or not a finite number.
    #[error("Invalid seek position: {0}")]
    InvalidSeekPosition(f64),

    // ========================================================================
    // Engine Errors
    // ========================================================================
    /// The engine rejected a command.
    #[error("Engine rejected {operation}: {message}")]
    EngineRejected {
        operation: EngineOperation,
        message: String,
    },

    /// A newer `play()` replaced this request before it reached the engine.
    #[error("Request for track {track_id} superseded by a newer request")]
    Superseded { track_id: String },

    /// Position sampling kept failing and the session was moved to `Error`.
    #[error("Progress sampling failed {attempts} times in a row: {message}")]
    SamplerFailed { attempts: u32, message: String },

    // ========================================================================
    // Setup Errors
    // ========================================================================
    /// Session configuration is invalid.
    #[error("Invalid session configuration: {0}")]
    Config(String),
}

impl PlaybackError {
    pub(crate) fn engine(operation: EngineOperation, source: impl fmt::Display) -> Self {
        PlaybackError::EngineRejected {
            operation,
            message: source.to_string(),
        }
    }

    /// Returns `true` if retrying the same request may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            PlaybackError::EngineRejected { .. }
                | PlaybackError::Superseded { .. }
                | PlaybackError::SamplerFailed { .. }
        )
    }

    /// Short message suitable for a toast or inline error label.
    pub fn user_message(&self) -> &'static str {
        match self {
            PlaybackError::EngineRejected { operation, .. } => match operation {
                EngineOperation::Load | EngineOperation::Play => "Failed to play track",
                EngineOperation::Resume => "Failed to toggle playback",
                EngineOperation::Pause => "Failed to pause playback",
                EngineOperation::Seek => "Failed to seek",
                EngineOperation::Reset => "Failed to stop playback",
            },
            PlaybackError::SamplerFailed { .. } => "Lost contact with the audio player",
            PlaybackError::NotInitialized => "Audio player is not ready",
            PlaybackError::InvalidTrack(_) | PlaybackError::NoTrackLoaded => "Nothing to play",
            PlaybackError::InvalidSeekPosition(_) => "Failed to seek",
            PlaybackError::Superseded { .. } => "Playback changed to another track",
            PlaybackError::Config(_) => "Audio player is misconfigured",
        }
    }
}

/// Result type for playback operations.
pub type Result<T> = std::result::Result<T, PlaybackError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_rejection_display() {
        let err = PlaybackError::engine(EngineOperation::Pause, "device busy");
        assert_eq!(err.to_string(), "Engine rejected pause: device busy");
        assert_eq!(err.user_message(), "Failed to pause playback");
        assert!(err.is_transient());
    }

    #[test]
    fn test_user_messages_for_play_path() {
        assert_eq!(
            PlaybackError::engine(EngineOperation::Load, "404").user_message(),
            "Failed to play track"
        );
        assert_eq!(
            PlaybackError::engine(EngineOperation::Play, "codec").user_message(),
            "Failed to play track"
        );
        assert_eq!(
            PlaybackError::engine(EngineOperation::Resume, "focus lost").user_message(),
            "Failed to toggle playback"
        );
        assert_eq!(
            PlaybackError::InvalidSeekPosition(-1.0).user_message(),
            "Failed to seek"
        );
    }

    #[test]
    fn test_request_errors_are_not_transient() {
        assert!(!PlaybackError::NoTrackLoaded.is_transient());
        assert!(!PlaybackError::InvalidTrack(String::new()).is_transient());
        assert!(!PlaybackError::NotInitialized.is_transient());
    }

    #[test]
    fn test_init_error_message() {
        let err = InitError::new("microphone permission denied");
        assert_eq!(
            err.to_string(),
            "Audio engine failed to initialize: microphone permission denied"
        );
    }
}
