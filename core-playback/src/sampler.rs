//! # Progress Sampler
//!
//! Periodically reads the engine's position and duration while the session
//! is loading or playing, and hands each sample to a [`ProgressSink`] (the
//! session controller).
//!
//! A sampler run is bound to one session generation. Starting a run for a
//! new generation cancels the previous one, and the sink rejects samples
//! whose generation is no longer current, so a late read from an old track
//! never reaches observers.
//!
//! Individual read failures are swallowed and retried on the next tick.
//! After `max_consecutive_failures` failures in a row the run ends and the
//! sink is told via [`ProgressSink::sampling_failed`].

use crate::config::SessionConfig;
use crate::error::PlaybackError;
use bridge_traits::AudioEngine;
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// One position/duration reading from the engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressSample {
    pub position: f64,
    pub duration: Option<f64>,
}

/// Receiver of progress samples.
pub trait ProgressSink: Send + Sync {
    /// Applies a sample taken for `generation`. Returning `false` ends the
    /// run (stale generation or the session left the sampling states).
    fn apply_sample(&self, generation: u64, sample: ProgressSample) -> bool;

    /// Called once when the run gives up after repeated read failures.
    fn sampling_failed(&self, generation: u64, error: PlaybackError);
}

struct ActiveRun {
    generation: u64,
    token: CancellationToken,
}

/// Owner of the (at most one) running sampling task.
pub struct ProgressSampler {
    engine: Arc<dyn AudioEngine>,
    interval: Duration,
    max_consecutive_failures: u32,
    active: Mutex<Option<ActiveRun>>,
}

impl ProgressSampler {
    pub fn new(engine: Arc<dyn AudioEngine>, config: &SessionConfig) -> Self {
        Self {
            engine,
            interval: config.sample_interval,
            max_consecutive_failures: config.max_consecutive_failures.max(1),
            active: Mutex::new(None),
        }
    }

    /// Ensures a run bound to `generation` is active.
    ///
    /// No-op if one already is; otherwise any older run is cancelled and a
    /// new task is spawned. Must be called from within a tokio runtime.
    pub fn start(&self, generation: u64, sink: Weak<dyn ProgressSink>) {
        let mut active = self.active.lock();
        if let Some(run) = active.as_ref() {
            if run.generation == generation && !run.token.is_cancelled() {
                return;
            }
            run.token.cancel();
        }

        let token = CancellationToken::new();
        let task = SamplerTask {
            engine: Arc::clone(&self.engine),
            interval: self.interval,
            max_consecutive_failures: self.max_consecutive_failures,
            generation,
            sink,
            token: token.clone(),
        };
        tokio::spawn(task.run());

        debug!(generation, interval_ms = self.interval.as_millis() as u64, "Progress sampler started");
        *active = Some(ActiveRun { generation, token });
    }

    /// Cancels the active run, if any.
    pub fn stop(&self) {
        if let Some(run) = self.active.lock().take() {
            if !run.token.is_cancelled() {
                debug!(generation = run.generation, "Progress sampler stopped");
            }
            run.token.cancel();
        }
    }

    pub fn is_running(&self) -> bool {
        self.active
            .lock()
            .as_ref()
            .map(|run| !run.token.is_cancelled())
            .unwrap_or(false)
    }

    /// Generation of the active run.
    pub fn generation(&self) -> Option<u64> {
        self.active
            .lock()
            .as_ref()
            .filter(|run| !run.token.is_cancelled())
            .map(|run| run.generation)
    }
}

impl Drop for ProgressSampler {
    fn drop(&mut self) {
        if let Some(run) = self.active.get_mut().take() {
            run.token.cancel();
        }
    }
}

struct SamplerTask {
    engine: Arc<dyn AudioEngine>,
    interval: Duration,
    max_consecutive_failures: u32,
    generation: u64,
    sink: Weak<dyn ProgressSink>,
    token: CancellationToken,
}

impl SamplerTask {
    async fn run(self) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut failures = 0u32;

        loop {
            tokio::select! {
                _ = self.token.cancelled() => break,
                _ = ticker.tick() => {
                    let reading = self.read().await;
                    if self.token.is_cancelled() {
                        break;
                    }
                    let Some(sink) = self.sink.upgrade() else {
                        break;
                    };

                    match reading {
                        Ok(sample) => {
                            failures = 0;
                            if !sink.apply_sample(self.generation, sample) {
                                break;
                            }
                        }
                        Err(err) => {
                            failures += 1;
                            debug!(
                                generation = self.generation,
                                attempt = failures,
                                error = %err,
                                "Progress sample failed"
                            );
                            if failures >= self.max_consecutive_failures {
                                warn!(
                                    generation = self.generation,
                                    attempts = failures,
                                    "Progress sampling gave up"
                                );
                                sink.sampling_failed(
                                    self.generation,
                                    PlaybackError::SamplerFailed {
                                        attempts: failures,
                                        message: err.to_string(),
                                    },
                                );
                                break;
                            }
                        }
                    }
                }
            }
        }

        self.token.cancel();
    }

    async fn read(&self) -> bridge_traits::error::Result<ProgressSample> {
        let position = self.engine.position().await?;
        let duration = self.engine.duration().await?;
        Ok(ProgressSample { position, duration })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::Result;
    use bridge_traits::{BridgeError, EngineEventSender, EngineOptions, EngineTrack};
    use mockall::mock;
    use std::sync::atomic::{AtomicU64, Ordering};

    mock! {
        Engine {}

        #[async_trait]
        impl AudioEngine for Engine {
            async fn initialize(&self, options: EngineOptions) -> Result<()>;
            async fn load(&self, track: EngineTrack) -> Result<()>;
            async fn play(&self) -> Result<()>;
            async fn pause(&self) -> Result<()>;
            async fn seek(&self, seconds: f64) -> Result<()>;
            async fn reset(&self) -> Result<()>;
            async fn position(&self) -> Result<f64>;
            async fn duration(&self) -> Result<Option<f64>>;
            fn subscribe_events(&self, sender: EngineEventSender);
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        samples: Mutex<Vec<(u64, ProgressSample)>>,
        failures: Mutex<Vec<(u64, PlaybackError)>>,
        current_generation: AtomicU64,
    }

    impl ProgressSink for RecordingSink {
        fn apply_sample(&self, generation: u64, sample: ProgressSample) -> bool {
            if generation != self.current_generation.load(Ordering::SeqCst) {
                return false;
            }
            self.samples.lock().push((generation, sample));
            true
        }

        fn sampling_failed(&self, generation: u64, error: PlaybackError) {
            self.failures.lock().push((generation, error));
        }
    }

    fn fast_config() -> SessionConfig {
        SessionConfig::default().with_sample_interval(Duration::from_millis(5))
    }

    fn as_sink(sink: &Arc<RecordingSink>) -> Weak<dyn ProgressSink> {
        let sink: Arc<dyn ProgressSink> = sink.clone();
        Arc::downgrade(&sink)
    }

    #[tokio::test]
    async fn test_samples_are_delivered() {
        let mut engine = MockEngine::new();
        engine.expect_position().returning(|| Ok(12.0));
        engine.expect_duration().returning(|| Ok(Some(30.0)));

        let sampler = ProgressSampler::new(Arc::new(engine), &fast_config());
        let sink = Arc::new(RecordingSink::default());
        sampler.start(0, as_sink(&sink));

        tokio::time::sleep(Duration::from_millis(40)).await;
        sampler.stop();

        let samples = sink.samples.lock();
        assert!(!samples.is_empty());
        assert_eq!(
            samples[0],
            (
                0,
                ProgressSample {
                    position: 12.0,
                    duration: Some(30.0)
                }
            )
        );
        assert!(!sampler.is_running());
    }

    #[tokio::test]
    async fn test_escalates_after_consecutive_failures() {
        let mut engine = MockEngine::new();
        engine
            .expect_position()
            .returning(|| Err(BridgeError::OperationFailed("player gone".to_string())));
        engine.expect_duration().never();

        let sampler = ProgressSampler::new(Arc::new(engine), &fast_config());
        let sink = Arc::new(RecordingSink::default());
        sampler.start(0, as_sink(&sink));

        tokio::time::sleep(Duration::from_millis(60)).await;

        let failures = sink.failures.lock();
        assert_eq!(failures.len(), 1);
        match &failures[0].1 {
            PlaybackError::SamplerFailed { attempts, message } => {
                assert_eq!(*attempts, 3);
                assert!(message.contains("player gone"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(sink.samples.lock().is_empty());
        assert!(!sampler.is_running());
    }

    #[tokio::test]
    async fn test_single_failure_is_swallowed() {
        let calls = Arc::new(AtomicU64::new(0));
        let counter = calls.clone();

        let mut engine = MockEngine::new();
        engine.expect_position().returning(move || {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(BridgeError::OperationFailed("hiccup".to_string()))
            } else {
                Ok(1.0)
            }
        });
        engine.expect_duration().returning(|| Ok(None));

        let sampler = ProgressSampler::new(Arc::new(engine), &fast_config());
        let sink = Arc::new(RecordingSink::default());
        sampler.start(0, as_sink(&sink));

        tokio::time::sleep(Duration::from_millis(40)).await;
        sampler.stop();

        assert!(sink.failures.lock().is_empty());
        assert!(!sink.samples.lock().is_empty());
    }

    #[tokio::test]
    async fn test_stale_generation_ends_run() {
        let mut engine = MockEngine::new();
        engine.expect_position().returning(|| Ok(0.0));
        engine.expect_duration().returning(|| Ok(None));

        let sampler = ProgressSampler::new(Arc::new(engine), &fast_config());
        let sink = Arc::new(RecordingSink::default());
        sink.current_generation.store(2, Ordering::SeqCst);
        sampler.start(1, as_sink(&sink));

        tokio::time::sleep(Duration::from_millis(30)).await;

        assert!(sink.samples.lock().is_empty());
        assert!(!sampler.is_running());
    }

    #[tokio::test]
    async fn test_start_is_idempotent_per_generation() {
        let mut engine = MockEngine::new();
        engine.expect_position().returning(|| Ok(0.0));
        engine.expect_duration().returning(|| Ok(None));

        let sampler = ProgressSampler::new(Arc::new(engine), &fast_config());
        let sink = Arc::new(RecordingSink::default());
        sampler.start(0, as_sink(&sink));
        sampler.start(0, as_sink(&sink));
        assert_eq!(sampler.generation(), Some(0));

        sink.current_generation.store(1, Ordering::SeqCst);
        sampler.start(1, as_sink(&sink));
        assert_eq!(sampler.generation(), Some(1));

        sampler.stop();
        assert_eq!(sampler.generation(), None);
    }
}
