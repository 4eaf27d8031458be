//! Workspace façade crate.
//!
//! Host applications (the mobile shells that render the mini-player and the
//! full-screen player) depend on `tunecore-workspace` and reach the individual
//! crates through the re-exports below instead of wiring each one by hand.

pub use bridge_traits;
pub use core_playback;
pub use core_runtime;

pub use core_playback::{
    NowPlaying, PlaybackError, SessionConfig, SessionController, SessionSnapshot, Track,
    TransportState,
};
pub use core_runtime::config::CoreConfig;
