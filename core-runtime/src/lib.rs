//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the playback core:
//! - Logging and tracing infrastructure
//! - Configuration management
//! - Subscription hub for fanning state out to UI observers
//!
//! ## Overview
//!
//! This crate contains the runtime utilities that the playback crate depends
//! on. It establishes the logging conventions, the fail-fast configuration
//! builder and the observer fan-out used by every UI surface.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
