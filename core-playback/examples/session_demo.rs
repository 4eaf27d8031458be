//! # Playback Session Example
//!
//! Drives a [`SessionController`] against a simulated audio engine and
//! prints what a mini-player would render for every published snapshot.
//!
//! Run with: `cargo run --example session_demo --package core-playback`

use async_trait::async_trait;
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::{
    AudioEngine, EngineEvent, EngineEventSender, EngineOptions, EngineState, EngineTrack, LogLevel,
};
use core_playback::{NowPlaying, SessionConfig, SessionController, Track};
use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

// ============================================================================
// Simulated engine
// ============================================================================

/// Pretends to stream audio: buffers briefly after `play`, then advances the
/// position in real time until the track's duration is reached.
#[derive(Default)]
struct SimulatedEngine {
    inner: Mutex<Simulation>,
}

#[derive(Default)]
struct Simulation {
    events: Option<EngineEventSender>,
    track: Option<EngineTrack>,
    started_at: Option<Instant>,
    offset: f64,
    ended: bool,
}

impl Simulation {
    fn position(&self) -> f64 {
        let elapsed = self
            .started_at
            .map(|start| start.elapsed().as_secs_f64())
            .unwrap_or(0.0);
        let duration = self.track.as_ref().and_then(|t| t.duration).unwrap_or(f64::MAX);
        (self.offset + elapsed).min(duration)
    }

    fn emit(&self, state: EngineState) {
        if let Some(events) = &self.events {
            let _ = events.send(EngineEvent::StateChanged(state));
        }
    }
}

#[async_trait]
impl AudioEngine for SimulatedEngine {
    async fn initialize(&self, options: EngineOptions) -> BridgeResult<()> {
        println!("engine: initialized with {:?}", options.capabilities);
        Ok(())
    }

    async fn load(&self, track: EngineTrack) -> BridgeResult<()> {
        let mut sim = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(events) = &sim.events {
            let _ = events.send(EngineEvent::TrackChanged {
                track_id: Some(track.id.clone()),
            });
        }
        sim.track = Some(track);
        sim.offset = 0.0;
        sim.started_at = None;
        sim.ended = false;
        Ok(())
    }

    async fn play(&self) -> BridgeResult<()> {
        {
            let sim = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            sim.emit(EngineState::Buffering);
        }
        tokio::time::sleep(Duration::from_millis(150)).await;

        let mut sim = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        sim.started_at = Some(Instant::now());
        sim.emit(EngineState::Playing);
        Ok(())
    }

    async fn pause(&self) -> BridgeResult<()> {
        let mut sim = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        sim.offset = sim.position();
        sim.started_at = None;
        sim.emit(EngineState::Paused);
        Ok(())
    }

    async fn seek(&self, seconds: f64) -> BridgeResult<()> {
        let mut sim = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        sim.offset = seconds;
        if sim.started_at.is_some() {
            sim.started_at = Some(Instant::now());
        }
        Ok(())
    }

    async fn reset(&self) -> BridgeResult<()> {
        let mut sim = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if sim.track.take().is_some() {
            sim.emit(EngineState::None);
        }
        sim.started_at = None;
        sim.offset = 0.0;
        Ok(())
    }

    async fn position(&self) -> BridgeResult<f64> {
        let mut sim = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let position = sim.position();
        let finished = sim
            .track
            .as_ref()
            .and_then(|t| t.duration)
            .is_some_and(|d| position >= d);
        if finished && !sim.ended {
            sim.ended = true;
            sim.started_at = None;
            sim.offset = position;
            sim.emit(EngineState::Ended);
        }
        Ok(position)
    }

    async fn duration(&self) -> BridgeResult<Option<f64>> {
        let sim = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        Ok(sim.track.as_ref().and_then(|t| t.duration))
    }

    fn subscribe_events(&self, sender: EngineEventSender) {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).events = Some(sender);
    }
}

// ============================================================================
// Demo
// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging(
        LoggingConfig::default()
            .with_format(LogFormat::Compact)
            .with_level(LogLevel::Info),
    )?;

    println!("=== Playback Session Demo ===\n");

    let engine = Arc::new(SimulatedEngine::default());
    let controller = SessionController::with_config(
        engine,
        EngineOptions::default(),
        SessionConfig::responsive(),
    )?;
    controller.setup().await?;

    let mut updates = controller.subscribe();
    let renderer = tokio::spawn(async move {
        while let Some(snapshot) = updates.recv().await {
            let view = NowPlaying::from(&snapshot);
            println!(
                "[{:>7}] {} - {}  {}/{}{}",
                snapshot.transport_state,
                view.title,
                view.artist,
                view.elapsed,
                view.total,
                view.error.map(|e| format!("  ({e})")).unwrap_or_default()
            );
        }
    });

    let first = Track::new("t1", "Intro").with_artist("Demo Band").with_duration(2.0);
    let second = Track::new("t2", "Outro")
        .with_artists(["Demo Band", "Guest"])
        .with_duration(3.0);

    controller.play(first).await?;
    tokio::time::sleep(Duration::from_millis(700)).await;

    controller.toggle_play_pause().await?;
    tokio::time::sleep(Duration::from_millis(300)).await;
    controller.toggle_play_pause().await?;

    // Switch before the first track finishes; the later request wins.
    controller.play(second).await?;
    controller.seek_to(10.0).await?;
    tokio::time::sleep(Duration::from_millis(500)).await;

    println!("\nFinal snapshot: {:?}", controller.snapshot());

    controller.shutdown().await?;
    drop(controller);
    renderer.abort();

    println!("\n=== Demo Complete ===");
    Ok(())
}
