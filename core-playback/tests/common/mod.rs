//! Shared test fixtures: a scriptable in-memory audio engine and helpers for
//! waiting on session snapshots.

#![allow(dead_code)]

use async_trait::async_trait;
use bridge_traits::error::Result;
use bridge_traits::{
    AudioEngine, BridgeError, EngineEvent, EngineEventSender, EngineOptions, EngineState,
    EngineTrack,
};
use core_playback::SessionSnapshot;
use core_runtime::events::Subscription;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ============================================================================
// Fake AudioEngine
// ============================================================================

#[derive(Default)]
struct FakeState {
    events: Option<EngineEventSender>,
    loaded: Option<EngineTrack>,
    position: f64,
    load_delays: HashMap<String, Duration>,
    initialize_failures: usize,
    fail_load: Option<String>,
    fail_pause: bool,
    fail_position: bool,
    initialize_calls: usize,
    loads: Vec<String>,
    seeks: Vec<f64>,
    pause_calls: usize,
    play_calls: usize,
    reset_calls: usize,
}

/// In-memory engine. Commands succeed unless told otherwise; events are
/// injected by the test through [`FakeEngine::emit`].
#[derive(Clone, Default)]
pub struct FakeEngine {
    state: Arc<Mutex<FakeState>>,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay `load` of `track_id` to simulate slow network resolution.
    pub fn with_load_delay(self, track_id: &str, delay: Duration) -> Self {
        self.state
            .lock()
            .unwrap()
            .load_delays
            .insert(track_id.to_string(), delay);
        self
    }

    /// Fail the next `count` initialize calls.
    pub fn with_initialize_failures(self, count: usize) -> Self {
        self.state.lock().unwrap().initialize_failures = count;
        self
    }

    pub fn with_load_failure(self, message: &str) -> Self {
        self.state.lock().unwrap().fail_load = Some(message.to_string());
        self
    }

    pub fn with_pause_failure(self) -> Self {
        self.state.lock().unwrap().fail_pause = true;
        self
    }

    pub fn set_position_failing(&self, failing: bool) {
        self.state.lock().unwrap().fail_position = failing;
    }

    pub fn set_position(&self, seconds: f64) {
        self.state.lock().unwrap().position = seconds;
    }

    /// Push an event as if the native player emitted it.
    pub fn emit(&self, event: EngineEvent) {
        let sender = self.state.lock().unwrap().events.clone();
        sender
            .expect("engine events not subscribed; call setup() first")
            .send(event)
            .expect("event loop stopped");
    }

    pub fn emit_state(&self, state: EngineState) {
        self.emit(EngineEvent::StateChanged(state));
    }

    pub fn initialize_calls(&self) -> usize {
        self.state.lock().unwrap().initialize_calls
    }

    pub fn loads(&self) -> Vec<String> {
        self.state.lock().unwrap().loads.clone()
    }

    pub fn seeks(&self) -> Vec<f64> {
        self.state.lock().unwrap().seeks.clone()
    }

    pub fn pause_calls(&self) -> usize {
        self.state.lock().unwrap().pause_calls
    }

    pub fn play_calls(&self) -> usize {
        self.state.lock().unwrap().play_calls
    }

    pub fn reset_calls(&self) -> usize {
        self.state.lock().unwrap().reset_calls
    }

    pub fn loaded_id(&self) -> Option<String> {
        self.state
            .lock()
            .unwrap()
            .loaded
            .as_ref()
            .map(|track| track.id.clone())
    }
}

#[async_trait]
impl AudioEngine for FakeEngine {
    async fn initialize(&self, _options: EngineOptions) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.initialize_calls += 1;
        if state.initialize_failures > 0 {
            state.initialize_failures -= 1;
            return Err(BridgeError::NotAvailable(
                "audio output device unavailable".to_string(),
            ));
        }
        Ok(())
    }

    async fn load(&self, track: EngineTrack) -> Result<()> {
        let delay = {
            let mut state = self.state.lock().unwrap();
            state.loads.push(track.id.clone());
            if let Some(message) = &state.fail_load {
                return Err(BridgeError::OperationFailed(message.clone()));
            }
            state.load_delays.get(&track.id).copied()
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock().unwrap();
        state.loaded = Some(track);
        state.position = 0.0;
        Ok(())
    }

    async fn play(&self) -> Result<()> {
        self.state.lock().unwrap().play_calls += 1;
        Ok(())
    }

    async fn pause(&self) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.pause_calls += 1;
        if state.fail_pause {
            return Err(BridgeError::OperationFailed("audio focus lost".to_string()));
        }
        Ok(())
    }

    async fn seek(&self, seconds: f64) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.seeks.push(seconds);
        state.position = seconds;
        Ok(())
    }

    async fn reset(&self) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.reset_calls += 1;
        if state.loaded.take().is_some() {
            if let Some(events) = &state.events {
                let _ = events.send(EngineEvent::StateChanged(EngineState::None));
            }
        }
        state.position = 0.0;
        Ok(())
    }

    async fn position(&self) -> Result<f64> {
        let state = self.state.lock().unwrap();
        if state.fail_position {
            return Err(BridgeError::OperationFailed("player released".to_string()));
        }
        Ok(state.position)
    }

    async fn duration(&self) -> Result<Option<f64>> {
        let state = self.state.lock().unwrap();
        Ok(state.loaded.as_ref().and_then(|track| track.duration))
    }

    fn subscribe_events(&self, sender: EngineEventSender) {
        self.state.lock().unwrap().events = Some(sender);
    }
}

// ============================================================================
// Snapshot helpers
// ============================================================================

pub const WAIT_TIMEOUT: Duration = Duration::from_secs(2);

/// Receives snapshots until one matches `predicate`.
pub async fn wait_for<F>(
    subscription: &mut Subscription<SessionSnapshot>,
    mut predicate: F,
) -> SessionSnapshot
where
    F: FnMut(&SessionSnapshot) -> bool,
{
    tokio::time::timeout(WAIT_TIMEOUT, async {
        loop {
            match subscription.recv().await {
                Some(snapshot) if predicate(&snapshot) => return snapshot,
                Some(_) => continue,
                None => panic!("subscription closed"),
            }
        }
    })
    .await
    .expect("timed out waiting for snapshot")
}

/// Receives exactly the next snapshot.
pub async fn next_snapshot(subscription: &mut Subscription<SessionSnapshot>) -> SessionSnapshot {
    tokio::time::timeout(WAIT_TIMEOUT, subscription.recv())
        .await
        .expect("timed out waiting for snapshot")
        .expect("subscription closed")
}
