use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;

use crate::models::config::RemixConfiguration;
use crate::models::error::TapError;
use crate::models::frame::AudioFrame;
use crate::models::recording_result::RemixRecording;
use crate::models::state::EngineState;
use crate::processing::cadence::{Signal, TickClock};
use crate::processing::frame_mixer::FrameMixer;
use crate::processing::frame_source::FrameSource;
use crate::processing::realtime;
use crate::processing::tap_sink::TapSink;
use crate::processing::worker::Worker;
use crate::remix::output::{OutputTarget, RemixOutput};
use crate::traits::audio_sink::AudioSink;
use crate::traits::mixer::AudioMixer;
use crate::transport::bridge::TransportBridge;

type RunResult = Result<Option<RemixRecording>, TapError>;

/// Everything the worker owns for one run.
struct MixLoop {
    config: RemixConfiguration,
    record_tap: Arc<TapSink>,
    player_tap: Arc<TapSink>,
    target: OutputTarget,
    frames_delivered: Arc<AtomicU64>,
}

impl MixLoop {
    fn run(self, shutdown: &Signal) -> RunResult {
        let MixLoop {
            config,
            record_tap,
            player_tap,
            mut target,
            frames_delivered,
        } = self;

        let _priority = realtime::enable_time_critical_priority();

        // Record source first, render source second.
        let record_source = Arc::new(FrameSource::new(config.sample_rate_hz));
        let player_source = Arc::new(FrameSource::new(config.sample_rate_hz));
        let mixer = FrameMixer::with_output_rate(config.sample_rate_hz);
        mixer.add_source(record_source.clone());
        mixer.add_source(player_source.clone());

        // Let both taps buffer some audio before the first tick.
        if shutdown.wait_timeout(config.warmup) {
            return target.finish();
        }

        let tick_ms = config.tick_interval.as_millis() as u32;
        let mut clock = TickClock::new(Instant::now(), config.tick_interval);
        let mut timestamp: u32 = 0;
        let mut starved = false;
        let mut frame = AudioFrame::default();

        while clock.wait_next(shutdown) {
            let recorded = record_tap.pop();
            let played = player_tap.pop();
            if (recorded.is_none() || played.is_none()) && !starved {
                log::warn!("Remix tick without input on both taps, substituting silence");
                starved = true;
            }
            record_source.set_frame(recorded);
            player_source.set_frame(played);

            mixer.mix(config.num_channels, &mut frame);
            frame.timestamp = timestamp;
            timestamp = timestamp.wrapping_add(tick_ms);

            if let Err(e) = target.deliver(&frame) {
                log::error!("Remix output failed: {}", e);
                if let Err(close_error) = target.finish() {
                    log::error!("Closing remix output failed: {}", close_error);
                }
                return Err(e);
            }
            frames_delivered.fetch_add(1, Ordering::Relaxed);
        }

        target.finish()
    }
}

/// Recombines played and captured audio into one synchronized stream.
///
/// While running, the engine taps both directions of a [`TransportBridge`]
/// and, on its own clocked thread, mixes one frame from each tap every tick
/// into a single output frame at a fixed format.
///
/// ```text
/// on_capture_available → [record tap] ─┐
///                                       ├→ [FrameMixer] → output file / callback
/// on_render_needed     → [player tap] ─┘
/// ```
pub struct RemixEngine {
    transport: Arc<TransportBridge>,
    config: RemixConfiguration,
    output: Mutex<Option<RemixOutput>>,
    record_tap: Arc<TapSink>,
    player_tap: Arc<TapSink>,
    worker: Mutex<Option<Worker<RunResult>>>,
    frames_delivered: Arc<AtomicU64>,
    live_workers: Arc<AtomicUsize>,
    last_recording: Mutex<Option<RemixRecording>>,
}

impl RemixEngine {
    pub fn new(transport: Arc<TransportBridge>, config: RemixConfiguration) -> Result<Self, TapError> {
        config.validate().map_err(TapError::ConfigurationFailed)?;
        Ok(Self {
            transport,
            record_tap: Arc::new(TapSink::with_capacity(config.tap_capacity)),
            player_tap: Arc::new(TapSink::with_capacity(config.tap_capacity)),
            config,
            output: Mutex::new(None),
            worker: Mutex::new(None),
            frames_delivered: Arc::new(AtomicU64::new(0)),
            live_workers: Arc::new(AtomicUsize::new(0)),
            last_recording: Mutex::new(None),
        })
    }

    pub fn config(&self) -> &RemixConfiguration {
        &self.config
    }

    /// Deliver frames to `sink`. Takes effect on the next start.
    pub fn set_output_callback(&self, sink: Arc<dyn AudioSink>) {
        *self.output.lock() = Some(RemixOutput::Callback(sink));
    }

    /// Write frames to `path` as raw PCM. Takes effect on the next start.
    pub fn set_output_file(&self, path: impl Into<PathBuf>) {
        *self.output.lock() = Some(RemixOutput::File(path.into()));
    }

    /// Write frames to a freshly named file in the configured output directory.
    pub fn set_output_in_directory(&self) -> PathBuf {
        let path = self
            .config
            .output_directory
            .join(format!("remix_{}.pcm", uuid::Uuid::new_v4()));
        self.set_output_file(path.clone());
        path
    }

    pub fn clear_output(&self) {
        *self.output.lock() = None;
    }

    pub fn output(&self) -> Option<RemixOutput> {
        self.output.lock().clone()
    }

    /// Start the worker and install the taps.
    ///
    /// Without a configured output this returns `Ok` and the engine stays
    /// stopped. Starting a running engine is a no-op.
    pub fn start(&self) -> Result<(), TapError> {
        let mut slot = self.worker.lock();
        if let Some(worker) = slot.as_ref() {
            if !worker.is_finished() {
                return Ok(());
            }
            // A previous run ended on its own; reap it before starting over.
            if let Some(worker) = slot.take() {
                self.remove_taps();
                if let Err(e) = self.reap(worker.stop(self.config.stop_timeout)) {
                    log::warn!("Previous remix run ended with: {}", e);
                }
            }
        }

        let Some(output) = self.output.lock().clone() else {
            log::debug!("Remix engine has no output, not starting");
            return Ok(());
        };

        let target = OutputTarget::open(&output, self.config.sample_rate_hz, self.config.num_channels)?;

        self.record_tap.reset();
        self.player_tap.reset();
        self.frames_delivered.store(0, Ordering::Relaxed);

        let mix_loop = MixLoop {
            config: self.config.clone(),
            record_tap: Arc::clone(&self.record_tap),
            player_tap: Arc::clone(&self.player_tap),
            target,
            frames_delivered: Arc::clone(&self.frames_delivered),
        };
        let worker = Worker::spawn_counted("remix-engine", Some(Arc::clone(&self.live_workers)), move |shutdown| {
            mix_loop.run(shutdown)
        })?;
        *slot = Some(worker);
        drop(slot);

        self.transport.set_player_sink(Some(self.player_tap.clone()));
        self.transport.set_record_sink(Some(self.record_tap.clone()));

        log::info!(
            "Remix engine started: {} Hz, {} ch -> {}",
            self.config.sample_rate_hz,
            self.config.num_channels,
            output.describe()
        );
        Ok(())
    }

    /// Remove the taps and stop the worker.
    ///
    /// Idempotent. Only this engine's own taps are removed from the bridge;
    /// sinks installed by anyone else stay in place. Returns
    /// [`TapError::Timeout`] if the worker does not exit within the
    /// configured stop timeout (its thread is abandoned), or the output error
    /// that ended the run early.
    pub fn stop(&self) -> Result<(), TapError> {
        let Some(worker) = self.worker.lock().take() else {
            return Ok(());
        };

        self.remove_taps();

        let result = worker.stop(self.config.stop_timeout);
        if matches!(result, Err(TapError::Timeout)) {
            log::error!(
                "Remix worker did not exit within {:?}, abandoning it",
                self.config.stop_timeout
            );
            return Err(TapError::Timeout);
        }

        let result = self.reap(result);
        self.record_tap.reset();
        self.player_tap.reset();
        log::info!(
            "Remix engine stopped after {} frames",
            self.frames_delivered.load(Ordering::Relaxed)
        );
        result
    }

    fn remove_taps(&self) {
        let player_tap: Arc<dyn AudioSink> = self.player_tap.clone();
        let record_tap: Arc<dyn AudioSink> = self.record_tap.clone();
        self.transport.remove_player_sink(&player_tap);
        self.transport.remove_record_sink(&record_tap);
    }

    fn reap(&self, result: Result<RunResult, TapError>) -> Result<(), TapError> {
        match result.and_then(|run| run) {
            Ok(recording) => {
                if let Some(recording) = recording {
                    log::info!(
                        "Remix recording finished: {} ({:.2}s)",
                        recording.file_path.display(),
                        recording.duration_secs
                    );
                    *self.last_recording.lock() = Some(recording);
                }
                Ok(())
            }
            Err(e) => {
                log::error!("Remix run failed: {}", e);
                Err(e)
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.worker.lock().as_ref().is_some_and(|w| !w.is_finished())
    }

    pub fn state(&self) -> EngineState {
        if self.is_running() {
            EngineState::Running
        } else {
            EngineState::Stopped
        }
    }

    /// Frames delivered to the output since the last start.
    pub fn frames_delivered(&self) -> u64 {
        self.frames_delivered.load(Ordering::Relaxed)
    }

    /// The file written by the most recent file-output run.
    pub fn last_recording(&self) -> Option<RemixRecording> {
        self.last_recording.lock().clone()
    }

    /// Worker threads of this engine that are still alive, including any
    /// abandoned after a stop timeout.
    pub fn active_workers(&self) -> usize {
        self.live_workers.load(Ordering::SeqCst)
    }

    pub fn record_tap(&self) -> &Arc<TapSink> {
        &self.record_tap
    }

    pub fn player_tap(&self) -> &Arc<TapSink> {
        &self.player_tap
    }
}

impl Drop for RemixEngine {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            log::warn!("Remix engine stop on drop failed: {}", e);
        }
    }
}
