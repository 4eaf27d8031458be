//! Now-playing view model shared by the mini-player bar and the full player
//! screen.

use crate::state::{SessionSnapshot, TransportState};

const NO_TRACK_TITLE: &str = "Not Playing";
const NO_ARTIST: &str = "No artist";

/// Display-ready projection of a [`SessionSnapshot`].
#[derive(Debug, Clone, PartialEq)]
pub struct NowPlaying {
    pub title: String,
    pub artist: String,
    pub artwork: Option<String>,
    pub is_playing: bool,
    pub elapsed: String,
    pub total: String,
    /// Fraction of the track played, in `[0, 1]`.
    pub progress: f64,
    /// Set while the session is in `Error`; the last known track stays visible.
    pub error: Option<String>,
}

impl From<&SessionSnapshot> for NowPlaying {
    fn from(snapshot: &SessionSnapshot) -> Self {
        let track = snapshot.current_track.as_ref();

        let title = track
            .map(|t| t.title.clone())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| NO_TRACK_TITLE.to_string());
        let artist = track
            .map(|t| t.artist_line())
            .filter(|a| !a.is_empty())
            .unwrap_or_else(|| NO_ARTIST.to_string());

        let duration = snapshot.duration.unwrap_or(0.0);
        let progress = if duration > 0.0 {
            (snapshot.position / duration).clamp(0.0, 1.0)
        } else {
            0.0
        };

        let error = if snapshot.transport_state == TransportState::Error {
            snapshot.last_error.clone()
        } else {
            None
        };

        Self {
            title,
            artist,
            artwork: track.and_then(|t| t.artwork.clone()),
            is_playing: snapshot.is_playing(),
            elapsed: format_time(snapshot.position),
            total: format_time(duration),
            progress,
            error,
        }
    }
}

/// Formats seconds as `m:ss`. Negative and non-finite input renders `0:00`.
pub fn format_time(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    };
    format!("{}:{:02}", total / 60, total % 60)
}
