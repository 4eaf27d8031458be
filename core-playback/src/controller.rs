//! # Session Controller
//!
//! The single owner and only mutator of the playback session state.
//!
//! ## Overview
//!
//! UI intents (`play`, `pause`, `toggle_play_pause`, `seek_to`) arrive as
//! async calls; engine notifications arrive on a channel drained by one
//! spawned task; position samples arrive from the [`ProgressSampler`]. All
//! three paths funnel into the same state behind one mutex, and every
//! transition is published to subscribers while that mutex is held, so each
//! observer sees transitions in the order they happened.
//!
//! ```text
//!  UI intents ──┐
//!               │      ┌──────────────────────┐    publish    ┌─────────────┐
//!  EngineEvent ─┼─────>│ Mutex<SessionState>  ├──────────────>│ Subscribers │
//!    channel    │      └──────────┬───────────┘               └─────────────┘
//!  Sampler ─────┘                 │ commands (serialized)
//!                                 v
//!                          ┌─────────────┐
//!                          │ AudioEngine │
//!                          └─────────────┘
//! ```
//!
//! ## Staleness
//!
//! Every `play()` and `reset()` advances the session generation. Work that
//! resumes after an `.await` compares the generation it started with and
//! leaves the state alone if a newer request took over; the newest `play()`
//! always wins. Track-change events naming a track replaced by a later
//! `play()` are discarded, and the engine's idle report caused by the
//! pre-load reset is ignored while a track is loading.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use core_playback::{SessionController, Track};
//!
//! let controller = SessionController::new(engine);
//! controller.setup().await?;
//!
//! let mut updates = controller.subscribe();
//! controller.play(Track::new("t1", "A").with_artist("X")).await?;
//!
//! while let Some(snapshot) = updates.recv().await {
//!     println!("{} {}", snapshot.transport_state, snapshot.position);
//! }
//! ```

use crate::config::SessionConfig;
use crate::error::{EngineOperation, InitError, PlaybackError, Result};
use crate::sampler::{ProgressSample, ProgressSampler, ProgressSink};
use crate::state::{
    clamp_position, sanitize_duration, SessionSnapshot, TransportState, ENGINE_ERROR_STATE_MESSAGE,
};
use crate::track::{Track, TrackLookup};
use bridge_traits::{AudioEngine, EngineEvent, EngineEventReceiver, EngineOptions};
use core_runtime::config::CoreConfig;
use core_runtime::events::{Subscription, SubscriptionHub, SubscriptionId};
use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::sync::{Arc, Weak};
use tokio::sync::{mpsc, Mutex as AsyncMutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

struct SessionState {
    snapshot: SessionSnapshot,
    generation: u64,
    /// The current generation's reset/load/play commands have not completed.
    load_pending: bool,
    lookup: TrackLookup,
    /// Ids of tracks replaced by a later `play()`.
    retired: LruCache<String, ()>,
}

impl SessionState {
    fn new(config: &SessionConfig) -> Self {
        let capacity = NonZeroUsize::new(config.lookup_capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            snapshot: SessionSnapshot::default(),
            generation: 0,
            load_pending: false,
            lookup: TrackLookup::new(config.lookup_capacity),
            retired: LruCache::new(capacity),
        }
    }

    fn retire_current(&mut self, replacement: Option<&str>) {
        if let Some(previous) = self.snapshot.current_track.take() {
            if Some(previous.id.as_str()) != replacement {
                self.retired.put(previous.id, ());
            }
        }
    }
}

struct Inner {
    engine: Arc<dyn AudioEngine>,
    engine_options: EngineOptions,
    state: Mutex<SessionState>,
    hub: SubscriptionHub<SessionSnapshot>,
    sampler: ProgressSampler,
    /// Serializes engine command sequences.
    commands: AsyncMutex<()>,
    /// Serializes `setup`/`shutdown`; holds whether the engine is initialized.
    initialized: AsyncMutex<bool>,
    event_loop: Mutex<Option<CancellationToken>>,
    weak_self: Weak<Inner>,
}

impl Inner {
    fn publish(&self, state: &SessionState) {
        let delivered = self.hub.publish(state.snapshot.clone());
        debug!(
            state = %state.snapshot.transport_state,
            generation = state.generation,
            subscribers = delivered,
            "Published session snapshot"
        );
    }

    fn sink(&self) -> Weak<dyn ProgressSink> {
        self.weak_self.clone()
    }

    /// Starts or stops the sampler to match the current state.
    fn sync_sampler(&self, state: &SessionState) {
        let should_sample = state.snapshot.transport_state.is_active()
            && state.snapshot.current_track.is_some()
            && !state.load_pending;

        if should_sample {
            self.sampler.start(state.generation, self.sink());
        } else {
            self.sampler.stop();
        }
    }

    fn handle_event(&self, event: EngineEvent) {
        let mut state = self.state.lock();

        match event {
            EngineEvent::StateChanged(raw) => {
                let next = TransportState::from_engine(raw);
                let loading_track = state.snapshot.transport_state == TransportState::Loading
                    && state.snapshot.current_track.is_some();
                if next == TransportState::Idle && (state.load_pending || loading_track) {
                    debug!(
                        generation = state.generation,
                        "Ignoring idle report from pre-load reset"
                    );
                    return;
                }

                if next == TransportState::Error {
                    state.snapshot.set_error(ENGINE_ERROR_STATE_MESSAGE);
                } else {
                    state.snapshot.set_transport(next);
                }
                debug!(raw = ?raw, state = %next, "Engine state changed");

                self.sync_sampler(&state);
                self.publish(&state);
            }
            EngineEvent::TrackChanged { track_id: None } => {
                debug!("Engine reported no current track");
            }
            EngineEvent::TrackChanged {
                track_id: Some(track_id),
            } => {
                if state.retired.contains(&track_id) {
                    debug!(track_id = %track_id, "Discarding track change for superseded track");
                    return;
                }
                if state.snapshot.track_id() == Some(track_id.as_str()) {
                    return;
                }

                let Some(track) = state.lookup.get(&track_id) else {
                    warn!(
                        track_id = %track_id,
                        generation = state.generation,
                        "ResolutionAnomaly: engine switched to a track unknown to the session"
                    );
                    return;
                };

                info!(track_id = %track_id, "Engine advanced to another track");
                let replacement = Some(track.id.as_str());
                state.retire_current(replacement);
                state.snapshot.set_duration(track.duration);
                state.snapshot.position = 0.0;
                state.snapshot.current_track = Some(track);
                self.publish(&state);
            }
            EngineEvent::PlaybackError { message } => {
                error!(
                    track_id = ?state.snapshot.track_id(),
                    error = %message,
                    "Engine playback error"
                );
                state.snapshot.set_error(message);
                self.sampler.stop();
                self.publish(&state);
            }
        }
    }

    fn current_generation(&self) -> u64 {
        self.state.lock().generation
    }

    async fn load_and_play(&self, track: &Track) -> Result<()> {
        self.engine
            .reset()
            .await
            .map_err(|e| PlaybackError::engine(EngineOperation::Reset, e))?;
        self.engine
            .load(track.to_engine_track())
            .await
            .map_err(|e| PlaybackError::engine(EngineOperation::Load, e))?;
        self.engine
            .play()
            .await
            .map_err(|e| PlaybackError::engine(EngineOperation::Play, e))
    }

    fn stop_event_loop(&self) {
        if let Some(token) = self.event_loop.lock().take() {
            token.cancel();
        }
    }
}

impl ProgressSink for Inner {
    fn apply_sample(&self, generation: u64, sample: ProgressSample) -> bool {
        let mut state = self.state.lock();
        if state.generation != generation
            || state.load_pending
            || !state.snapshot.transport_state.is_active()
        {
            return false;
        }

        let duration = sanitize_duration(sample.duration).or(state.snapshot.duration);
        let position = clamp_position(sample.position, duration);
        if position == state.snapshot.position && duration == state.snapshot.duration {
            return true;
        }

        state.snapshot.duration = duration;
        state.snapshot.position = position;
        self.publish(&state);
        true
    }

    fn sampling_failed(&self, generation: u64, error: PlaybackError) {
        let mut state = self.state.lock();
        if state.generation != generation || !state.snapshot.transport_state.is_active() {
            return;
        }

        error!(
            track_id = ?state.snapshot.track_id(),
            generation,
            error = %error,
            "Lost progress updates from the audio engine"
        );
        state.snapshot.set_error(error.to_string());
        self.sampler.stop();
        self.publish(&state);
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.stop_event_loop();
        self.sampler.stop();
    }
}

async fn run_event_loop(
    inner: Weak<Inner>,
    mut events: EngineEventReceiver,
    token: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            event = events.recv() => {
                let Some(event) = event else {
                    debug!("Engine event channel closed");
                    break;
                };
                let Some(inner) = inner.upgrade() else {
                    break;
                };
                inner.handle_event(event);
            }
        }
    }
    debug!("Engine event loop stopped");
}

/// Owner of the playback session.
///
/// Create one per process at startup, hand it (or clones of it) to whatever
/// composes the UI, and call [`shutdown`](Self::shutdown) at teardown. Clones
/// share the same session.
#[derive(Clone)]
pub struct SessionController {
    inner: Arc<Inner>,
}

impl SessionController {
    /// Creates a controller with default engine options and session config.
    pub fn new(engine: Arc<dyn AudioEngine>) -> Self {
        Self::build(engine, EngineOptions::default(), SessionConfig::default())
    }

    /// Creates a controller with explicit options, validating `config`.
    pub fn with_config(
        engine: Arc<dyn AudioEngine>,
        engine_options: EngineOptions,
        config: SessionConfig,
    ) -> Result<Self> {
        config.validate().map_err(PlaybackError::Config)?;
        Ok(Self::build(engine, engine_options, config))
    }

    /// Creates a controller from the host's [`CoreConfig`].
    pub fn from_core_config(core: &CoreConfig, config: SessionConfig) -> Result<Self> {
        core.validate()
            .map_err(|e| PlaybackError::Config(e.to_string()))?;
        Self::with_config(
            Arc::clone(&core.audio_engine),
            core.engine_options.clone(),
            config,
        )
    }

    fn build(
        engine: Arc<dyn AudioEngine>,
        engine_options: EngineOptions,
        config: SessionConfig,
    ) -> Self {
        let inner = Arc::new_cyclic(|weak_self| Inner {
            sampler: ProgressSampler::new(Arc::clone(&engine), &config),
            engine,
            engine_options,
            state: Mutex::new(SessionState::new(&config)),
            hub: SubscriptionHub::new(),
            commands: AsyncMutex::new(()),
            initialized: AsyncMutex::new(false),
            event_loop: Mutex::new(None),
            weak_self: weak_self.clone(),
        });
        Self { inner }
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Initializes the audio engine and starts consuming its events.
    ///
    /// Idempotent: once it has succeeded, later calls return `Ok(())`
    /// without touching the engine. Concurrent calls are serialized. On
    /// failure the session moves to `Error` and `setup` may be retried.
    #[instrument(skip(self))]
    pub async fn setup(&self) -> std::result::Result<(), InitError> {
        let mut initialized = self.inner.initialized.lock().await;
        if *initialized {
            debug!("Audio engine already initialized");
            return Ok(());
        }

        if let Err(err) = self
            .inner
            .engine
            .initialize(self.inner.engine_options.clone())
            .await
        {
            let message = err.to_string();
            error!(error = %message, "Audio engine initialization failed");
            let mut state = self.inner.state.lock();
            state.snapshot.set_error(message.clone());
            self.inner.publish(&state);
            return Err(InitError::new(message));
        }

        let (sender, receiver) = mpsc::unbounded_channel();
        self.inner.engine.subscribe_events(sender);

        let token = CancellationToken::new();
        tokio::spawn(run_event_loop(
            Arc::downgrade(&self.inner),
            receiver,
            token.clone(),
        ));
        if let Some(previous) = self.inner.event_loop.lock().replace(token) {
            previous.cancel();
        }
        *initialized = true;

        let mut state = self.inner.state.lock();
        state.snapshot.is_ready = true;
        if state.snapshot.transport_state == TransportState::Error {
            state.snapshot.set_transport(TransportState::Idle);
        }
        self.inner.publish(&state);
        info!("Audio engine initialized");
        Ok(())
    }

    /// Returns the session to `Idle`: unloads the engine, forgets the
    /// current track and any error, and stops sampling.
    #[instrument(skip(self))]
    pub async fn reset(&self) -> Result<()> {
        let (generation, engine_ready) = {
            let mut state = self.inner.state.lock();
            state.generation += 1;
            state.retire_current(None);
            state.load_pending = false;
            let is_ready = state.snapshot.is_ready;
            state.snapshot = SessionSnapshot {
                is_ready,
                ..SessionSnapshot::default()
            };
            self.inner.sampler.stop();
            self.inner.publish(&state);
            (state.generation, state.snapshot.is_ready)
        };

        if !engine_ready {
            return Ok(());
        }

        let _commands = self.inner.commands.lock().await;
        if self.inner.current_generation() != generation {
            return Ok(());
        }
        self.inner.engine.reset().await.map_err(|e| {
            warn!(error = %e, "Engine reset failed");
            PlaybackError::engine(EngineOperation::Reset, e)
        })
    }

    /// Tears the session down: resets it, stops consuming engine events and
    /// marks the engine as uninitialized. `setup` may be called again.
    #[instrument(skip(self))]
    pub async fn shutdown(&self) -> Result<()> {
        let result = self.reset().await;

        let mut initialized = self.inner.initialized.lock().await;
        self.inner.stop_event_loop();
        *initialized = false;

        let mut state = self.inner.state.lock();
        state.snapshot.is_ready = false;
        self.inner.publish(&state);
        info!("Playback session shut down");
        result
    }

    // ========================================================================
    // Transport
    // ========================================================================

    /// Replaces the current track and starts playing it.
    ///
    /// The session shows the new track as `Loading` before this returns its
    /// future's first poll. If a later `play()` supersedes this one before
    /// its engine commands were issued, returns
    /// [`PlaybackError::Superseded`]. If the engine rejects the request the
    /// session moves to `Error` with no current track.
    #[instrument(skip(self, track), fields(track_id = %track.id))]
    pub async fn play(&self, track: Track) -> Result<()> {
        if !track.is_playable() {
            return Err(PlaybackError::InvalidTrack(
                "track id must not be empty".to_string(),
            ));
        }

        let generation = {
            let mut state = self.inner.state.lock();
            if !state.snapshot.is_ready {
                return Err(PlaybackError::NotInitialized);
            }

            state.generation += 1;
            state.retire_current(Some(track.id.as_str()));
            state.retired.pop(&track.id);
            state.lookup.insert(track.clone());
            state.load_pending = true;
            state.snapshot.set_transport(TransportState::Loading);
            state.snapshot.position = 0.0;
            state.snapshot.set_duration(track.duration);
            state.snapshot.current_track = Some(track.clone());
            self.inner.sampler.stop();
            self.inner.publish(&state);
            state.generation
        };
        debug!(generation, "Play requested");

        let _commands = self.inner.commands.lock().await;
        if self.inner.current_generation() != generation {
            debug!(generation, "Play superseded before engine commands");
            return Err(PlaybackError::Superseded { track_id: track.id });
        }

        let result = self.inner.load_and_play(&track).await;

        let mut state = self.inner.state.lock();
        if state.generation != generation {
            debug!(generation, "Play superseded while engine commands ran");
            return result;
        }
        state.load_pending = false;

        match result {
            Ok(()) => {
                self.inner.sync_sampler(&state);
                info!(generation, "Track loaded");
                Ok(())
            }
            Err(err) => {
                let message = match &err {
                    PlaybackError::EngineRejected { message, .. } => message.clone(),
                    other => other.to_string(),
                };
                error!(generation, error = %message, "Engine rejected track");
                state.retire_current(None);
                state.snapshot.set_error(message);
                state.snapshot.position = 0.0;
                state.snapshot.duration = None;
                self.inner.sampler.stop();
                self.inner.publish(&state);
                Err(err)
            }
        }
    }

    /// Pauses playback. No-op when already paused, idle or ended.
    #[instrument(skip(self))]
    pub async fn pause(&self) -> Result<()> {
        let generation = {
            let state = self.inner.state.lock();
            if !state.snapshot.is_ready
                || state.snapshot.current_track.is_none()
                || matches!(
                    state.snapshot.transport_state,
                    TransportState::Paused | TransportState::Idle | TransportState::Ended
                )
            {
                return Ok(());
            }
            state.generation
        };

        let _commands = self.inner.commands.lock().await;
        if self.inner.current_generation() != generation {
            return Ok(());
        }
        self.inner.engine.pause().await.map_err(|e| {
            warn!(error = %e, "Engine rejected pause");
            PlaybackError::engine(EngineOperation::Pause, e)
        })?;

        let mut state = self.inner.state.lock();
        if state.generation != generation {
            return Ok(());
        }
        state.snapshot.set_transport(TransportState::Paused);
        self.inner.sampler.stop();
        self.inner.publish(&state);
        Ok(())
    }

    /// Pauses when playing or loading, otherwise resumes. An ended track
    /// restarts from the beginning. No-op without a current track.
    #[instrument(skip(self))]
    pub async fn toggle_play_pause(&self) -> Result<()> {
        let (current, generation) = {
            let state = self.inner.state.lock();
            if state.snapshot.current_track.is_none() {
                return Ok(());
            }
            (state.snapshot.transport_state, state.generation)
        };

        if current.is_active() {
            return self.pause().await;
        }
        self.resume(generation, current == TransportState::Ended)
            .await
    }

    async fn resume(&self, generation: u64, restart: bool) -> Result<()> {
        let _commands = self.inner.commands.lock().await;
        if self.inner.current_generation() != generation {
            return Ok(());
        }

        if restart {
            self.inner
                .engine
                .seek(0.0)
                .await
                .map_err(|e| PlaybackError::engine(EngineOperation::Seek, e))?;
        }
        self.inner.engine.play().await.map_err(|e| {
            warn!(error = %e, "Engine rejected resume");
            PlaybackError::engine(EngineOperation::Resume, e)
        })?;

        let mut state = self.inner.state.lock();
        if state.generation != generation {
            return Ok(());
        }
        if restart {
            state.snapshot.position = 0.0;
        }
        state.snapshot.set_transport(TransportState::Playing);
        self.inner.sync_sampler(&state);
        self.inner.publish(&state);
        Ok(())
    }

    /// Seeks within the current track. Targets past a known duration are
    /// clamped to it.
    #[instrument(skip(self))]
    pub async fn seek_to(&self, seconds: f64) -> Result<()> {
        if !seconds.is_finite() || seconds < 0.0 {
            return Err(PlaybackError::InvalidSeekPosition(seconds));
        }

        let (target, generation) = {
            let state = self.inner.state.lock();
            if state.snapshot.current_track.is_none() {
                return Err(PlaybackError::NoTrackLoaded);
            }
            (
                clamp_position(seconds, state.snapshot.duration),
                state.generation,
            )
        };

        let _commands = self.inner.commands.lock().await;
        if self.inner.current_generation() != generation {
            return Ok(());
        }
        self.inner.engine.seek(target).await.map_err(|e| {
            warn!(error = %e, seconds = target, "Engine rejected seek");
            PlaybackError::engine(EngineOperation::Seek, e)
        })?;

        let mut state = self.inner.state.lock();
        if state.generation != generation {
            return Ok(());
        }
        state.snapshot.set_position(target);
        self.inner.publish(&state);
        Ok(())
    }

    // ========================================================================
    // Observation
    // ========================================================================

    /// Copy of the current session state.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.inner.state.lock().snapshot.clone()
    }

    /// Registers an observer for every snapshot published from now on.
    pub fn subscribe(&self) -> Subscription<SessionSnapshot> {
        self.inner.hub.subscribe()
    }

    /// Like [`subscribe`](Self::subscribe), also returning the snapshot the
    /// first delivered update follows.
    pub fn subscribe_with_snapshot(&self) -> (SessionSnapshot, Subscription<SessionSnapshot>) {
        let state = self.inner.state.lock();
        (state.snapshot.clone(), self.inner.hub.subscribe())
    }

    /// Removes an observer. Idempotent.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.hub.unsubscribe(id)
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.hub.subscriber_count()
    }

    // ========================================================================
    // Misc
    // ========================================================================

    /// Makes tracks known in advance, so engine-driven track changes (e.g.
    /// from a native queue) resolve to full track data.
    pub fn register_tracks<I>(&self, tracks: I)
    where
        I: IntoIterator<Item = Track>,
    {
        let mut state = self.inner.state.lock();
        for track in tracks {
            state.retired.pop(&track.id);
            state.lookup.insert(track);
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.inner.state.lock().snapshot.is_ready
    }

    /// Whether the progress sampler is currently running.
    pub fn is_sampling(&self) -> bool {
        self.inner.sampler.is_running()
    }
}

impl std::fmt::Debug for SessionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("SessionController")
            .field("transport_state", &state.snapshot.transport_state)
            .field("track_id", &state.snapshot.track_id())
            .field("generation", &state.generation)
            .field("subscribers", &self.inner.hub.subscriber_count())
            .finish()
    }
}
