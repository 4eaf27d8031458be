//! Track model, catalog conversion and the track lookup used to resolve
//! engine track-change events.

use crate::state::sanitize_duration;
use bridge_traits::EngineTrack;
use lru::LruCache;
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;

/// A playable unit as the session sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    /// Opaque identifier. Must be non-empty to be playable.
    pub id: String,
    pub title: String,
    /// Artist names in credit order.
    pub artists: Vec<String>,
    /// Artwork locator, if any.
    pub artwork: Option<String>,
    /// Duration in seconds, when the catalog knows it.
    pub duration: Option<f64>,
    /// Stream locator handed to the engine on load.
    pub source: Option<String>,
}

impl Track {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            artists: Vec::new(),
            artwork: None,
            duration: None,
            source: None,
        }
    }

    pub fn with_artist(mut self, artist: impl Into<String>) -> Self {
        self.artists.push(artist.into());
        self
    }

    pub fn with_artists<I, S>(mut self, artists: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.artists.extend(artists.into_iter().map(Into::into));
        self
    }

    pub fn with_artwork(mut self, artwork: impl Into<String>) -> Self {
        self.artwork = Some(artwork.into());
        self
    }

    pub fn with_duration(mut self, seconds: f64) -> Self {
        self.duration = Some(seconds);
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Artist names joined for display, e.g. `"Daft Punk, Pharrell Williams"`.
    pub fn artist_line(&self) -> String {
        self.artists.join(", ")
    }

    pub fn is_playable(&self) -> bool {
        !self.id.trim().is_empty()
    }

    pub(crate) fn to_engine_track(&self) -> EngineTrack {
        EngineTrack {
            id: self.id.clone(),
            url: self.source.clone(),
            title: self.title.clone(),
            artist: self.artist_line(),
            artwork: self.artwork.clone(),
            duration: sanitize_duration(self.duration),
        }
    }
}

// ============================================================================
// Catalog model
// ============================================================================

/// Track object as returned by the remote catalog API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogTrack {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub artists: Vec<CatalogArtist>,
    #[serde(default)]
    pub album: Option<CatalogAlbum>,
    #[serde(default)]
    pub duration_ms: Option<u64>,
    #[serde(default)]
    pub preview_url: Option<String>,
    #[serde(default)]
    pub uri: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogArtist {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogAlbum {
    pub name: String,
    #[serde(default)]
    pub images: Vec<CatalogImage>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogImage {
    pub url: String,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
}

impl From<CatalogTrack> for Track {
    fn from(track: CatalogTrack) -> Self {
        let artwork = track.album.and_then(|album| {
            album
                .images
                .into_iter()
                .max_by_key(|image| image.width.unwrap_or(0))
                .map(|image| image.url)
        });

        Track {
            id: track.id,
            title: track.name,
            artists: track.artists.into_iter().map(|a| a.name).collect(),
            artwork,
            duration: track.duration_ms.map(|ms| ms as f64 / 1000.0),
            source: track.preview_url,
        }
    }
}

// ============================================================================
// Track lookup
// ============================================================================

/// Bounded map from track id to [`Track`], least recently used evicted first.
pub struct TrackLookup {
    tracks: LruCache<String, Track>,
}

impl TrackLookup {
    /// Creates a lookup holding at most `capacity` tracks (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            tracks: LruCache::new(capacity),
        }
    }

    pub fn insert(&mut self, track: Track) {
        self.tracks.put(track.id.clone(), track);
    }

    pub fn get(&mut self, id: &str) -> Option<Track> {
        self.tracks.get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.tracks.contains(id)
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}

impl std::fmt::Debug for TrackLookup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackLookup")
            .field("len", &self.tracks.len())
            .field("capacity", &self.tracks.cap())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artist_line() {
        let track = Track::new("t1", "Get Lucky").with_artists(["Daft Punk", "Pharrell Williams"]);
        assert_eq!(track.artist_line(), "Daft Punk, Pharrell Williams");
        assert_eq!(Track::new("t2", "Solo").artist_line(), "");
    }

    #[test]
    fn test_playable() {
        assert!(Track::new("t1", "A").is_playable());
        assert!(!Track::new("", "A").is_playable());
        assert!(!Track::new("  ", "A").is_playable());
    }

    #[test]
    fn test_engine_track_conversion() {
        let track = Track::new("t1", "A")
            .with_artist("X")
            .with_artist("Y")
            .with_source("https://cdn.example.net/t1.mp3")
            .with_duration(30.0);
        let engine = track.to_engine_track();
        assert_eq!(engine.id, "t1");
        assert_eq!(engine.artist, "X, Y");
        assert_eq!(engine.url.as_deref(), Some("https://cdn.example.net/t1.mp3"));
        assert_eq!(engine.duration, Some(30.0));

        let broken = Track::new("t2", "B").with_duration(f64::NAN).to_engine_track();
        assert_eq!(broken.duration, None);
    }

    #[test]
    fn test_catalog_conversion() {
        let json = r#"{
            "id": "4uLU6hMCjMI75M1A2tKUQC",
            "name": "Never Gonna Give You Up",
            "artists": [{"name": "Rick Astley"}],
            "album": {
                "name": "Whenever You Need Somebody",
                "images": [
                    {"url": "https://i.example.net/small.jpg", "width": 64, "height": 64},
                    {"url": "https://i.example.net/large.jpg", "width": 640, "height": 640},
                    {"url": "https://i.example.net/medium.jpg", "width": 300, "height": 300}
                ]
            },
            "duration_ms": 213573,
            "preview_url": "https://p.example.net/preview.mp3",
            "uri": "spotify:track:4uLU6hMCjMI75M1A2tKUQC"
        }"#;
        let catalog: CatalogTrack = serde_json::from_str(json).unwrap();
        let track = Track::from(catalog);

        assert_eq!(track.id, "4uLU6hMCjMI75M1A2tKUQC");
        assert_eq!(track.title, "Never Gonna Give You Up");
        assert_eq!(track.artist_line(), "Rick Astley");
        assert_eq!(track.artwork.as_deref(), Some("https://i.example.net/large.jpg"));
        assert_eq!(track.duration, Some(213.573));
        assert_eq!(track.source.as_deref(), Some("https://p.example.net/preview.mp3"));
    }

    #[test]
    fn test_catalog_conversion_sparse() {
        let catalog: CatalogTrack =
            serde_json::from_str(r#"{"id": "t9", "name": "Untitled"}"#).unwrap();
        let track = Track::from(catalog);
        assert!(track.artists.is_empty());
        assert!(track.artwork.is_none());
        assert!(track.duration.is_none());
        assert!(track.source.is_none());
    }

    #[test]
    fn test_lookup_evicts_least_recent() {
        let mut lookup = TrackLookup::new(2);
        lookup.insert(Track::new("t1", "A"));
        lookup.insert(Track::new("t2", "B"));
        assert!(lookup.get("t1").is_some());
        lookup.insert(Track::new("t3", "C"));

        assert!(lookup.contains("t1"));
        assert!(!lookup.contains("t2"));
        assert!(lookup.contains("t3"));
        assert_eq!(lookup.len(), 2);
    }

    #[test]
    fn test_lookup_zero_capacity_is_clamped() {
        let mut lookup = TrackLookup::new(0);
        lookup.insert(Track::new("t1", "A"));
        assert_eq!(lookup.len(), 1);
    }
}
