use std::collections::VecDeque;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::models::config::FileStreamConfiguration;
use crate::models::error::TapError;
use crate::models::frame::{AudioFrame, FRAME_DURATION_MS};
use crate::models::stream::StreamId;
use crate::processing::cadence::Signal;
use crate::processing::frame_ops;
use crate::processing::frame_source::FrameSource;
use crate::processing::tap_sink::TapSink;
use crate::processing::worker::Worker;
use crate::registry::stream_registry::StreamRegistry;
use crate::traits::mixer::MixerSource;
use crate::traits::stream::{FileStream, FrameTick};

/// Notifications about file playback, delivered on the reader thread.
pub trait PlaybackObserver: Send + Sync {
    /// Reading started (`true`) or ended (`false`).
    fn on_play_start(&self, _started: bool) {}

    fn on_play_pause(&self, _paused: bool) {}

    /// Progress, at most once per progress interval.
    fn on_play_timer(&self, current_ms: i64, total_ms: i64);

    /// The end of the file was reached.
    fn on_play_ended(&self) {}
}

/// Open input file and the read position within it.
struct PcmReader {
    file: File,
    position: u64,
}

/// State shared between the controller, the reader thread and the device
/// callbacks (through the frame tick).
struct FileStreamCore {
    id: StreamId,
    config: FileStreamConfiguration,
    play_source: Arc<FrameSource>,
    record_source: Arc<FrameSource>,
    player_queue: Mutex<VecDeque<AudioFrame>>,
    record_queue: TapSink,
    reader: Mutex<Option<PcmReader>>,
    playing: AtomicBool,
    paused: AtomicBool,
    ended: AtomicBool,
    gain: Mutex<f32>,
    total_time_ms: AtomicI64,
    last_reported_ms: AtomicI64,
    observers: Mutex<Vec<Arc<dyn PlaybackObserver>>>,
}

impl FileStreamCore {
    fn observers(&self) -> Vec<Arc<dyn PlaybackObserver>> {
        self.observers.lock().clone()
    }

    fn play_time(&self) -> i64 {
        if !self.playing.load(Ordering::SeqCst) {
            return 0;
        }
        let bytes_per_frame = self.config.bytes_per_frame();
        self.reader
            .lock()
            .as_ref()
            .map(|r| (r.position / bytes_per_frame * FRAME_DURATION_MS as u64) as i64)
            .unwrap_or(0)
    }

    /// Read the next 10ms frame. `Ok(None)` at end of file.
    fn read_frame(&self) -> Result<Option<AudioFrame>, TapError> {
        let bytes_per_frame = self.config.bytes_per_frame() as usize;
        let mut bytes = vec![0u8; bytes_per_frame];

        let (filled, timestamp) = {
            let mut reader = self.reader.lock();
            let Some(reader) = reader.as_mut() else {
                return Ok(None);
            };
            let timestamp = (reader.position / bytes_per_frame as u64 * FRAME_DURATION_MS as u64) as u32;
            let mut filled = 0;
            while filled < bytes_per_frame {
                let n = reader
                    .file
                    .read(&mut bytes[filled..])
                    .map_err(|e| TapError::StorageError(format!("failed to read play file: {}", e)))?;
                if n == 0 {
                    break;
                }
                filled += n;
            }
            reader.position += filled as u64;
            (filled, timestamp)
        };

        if filled == 0 {
            return Ok(None);
        }

        // A short final frame is zero-padded.
        let samples: Vec<i16> = bytes.chunks_exact(2).map(|b| i16::from_le_bytes([b[0], b[1]])).collect();
        let mut frame = AudioFrame::from_interleaved(
            timestamp,
            &samples,
            (self.config.sample_rate_hz / 100) as usize,
            self.config.sample_rate_hz,
            self.config.num_channels,
        );
        frame_ops::scale_with_saturation(*self.gain.lock(), &mut frame);
        Ok(Some(frame))
    }

    fn report_progress(&self) {
        let observers = self.observers();
        if observers.is_empty() {
            return;
        }
        let current = self.play_time();
        let last = self.last_reported_ms.load(Ordering::SeqCst);
        if current - last >= self.config.progress_interval_ms {
            self.last_reported_ms.store(current, Ordering::SeqCst);
            let total = self.total_time_ms.load(Ordering::SeqCst);
            for observer in &observers {
                observer.on_play_timer(current, total);
            }
        }
    }

    /// Reader thread body.
    fn read_loop(&self, shutdown: &Signal) {
        for observer in self.observers() {
            observer.on_play_start(true);
        }
        self.last_reported_ms.store(0, Ordering::SeqCst);

        let mut reached_end = false;
        while !shutdown.wait_timeout(self.config.poll_interval) {
            if self.paused.load(Ordering::SeqCst) {
                continue;
            }
            if self.player_queue.lock().len() >= self.config.max_queued_frames {
                continue;
            }

            match self.read_frame() {
                Ok(Some(frame)) => {
                    self.player_queue.lock().push_back(frame);
                    self.report_progress();
                }
                Ok(None) => {
                    reached_end = true;
                    break;
                }
                Err(e) => {
                    log::error!("File stream {} read failed: {}", self.id, e);
                    break;
                }
            }
        }

        for observer in self.observers() {
            observer.on_play_start(false);
        }
        if reached_end {
            log::info!("File stream {} reached end of file", self.id);
            self.ended.store(true, Ordering::SeqCst);
            for observer in self.observers() {
                observer.on_play_ended();
            }
        }
    }

    fn clear_queues(&self) {
        self.player_queue.lock().clear();
        self.record_queue.reset();
        self.play_source.set_frame(None);
        self.record_source.set_frame(None);
    }
}

impl FrameTick for FileStreamCore {
    fn on_before_play_data(&self) {
        if !self.playing.load(Ordering::SeqCst) {
            return;
        }
        let Some(frame) = self.player_queue.lock().pop_front() else {
            return;
        };
        self.record_queue.push(frame.clone());
        self.play_source.set_frame(Some(frame));
    }

    fn on_before_record_data(&self) {
        if !self.playing.load(Ordering::SeqCst) {
            return;
        }
        if let Some(frame) = self.record_queue.pop() {
            self.record_source.set_frame(Some(frame));
        }
    }
}

impl FileStream for FileStreamCore {
    fn id(&self) -> StreamId {
        self.id
    }

    fn play_source(&self) -> Arc<dyn MixerSource> {
        self.play_source.clone()
    }

    fn record_source(&self) -> Arc<dyn MixerSource> {
        self.record_source.clone()
    }
}

/// Plays a raw PCM file into the pipeline: the audio is heard through the
/// playout mix and also mixed into the captured stream sent to peers.
///
/// The file is little-endian 16-bit PCM in the configured format, read on a
/// dedicated thread a few frames ahead of the device.
///
/// Call [`VoiceFileStream::stop`] with the registry it was started on before
/// dropping it. A stream dropped while playing goes silent, but its mixer
/// sources and tick observer stay registered until
/// [`StreamRegistry::remove_file_stream`] is called with its id.
pub struct VoiceFileStream {
    core: Arc<FileStreamCore>,
    play_file: Option<PathBuf>,
    worker: Option<Worker<()>>,
}

impl VoiceFileStream {
    pub fn new(config: FileStreamConfiguration) -> Result<Self, TapError> {
        config.validate().map_err(TapError::ConfigurationFailed)?;
        let core = FileStreamCore {
            id: StreamId::next(),
            play_source: Arc::new(FrameSource::new(config.sample_rate_hz)),
            record_source: Arc::new(FrameSource::new(config.sample_rate_hz)),
            player_queue: Mutex::new(VecDeque::with_capacity(config.max_queued_frames)),
            record_queue: TapSink::new(),
            reader: Mutex::new(None),
            playing: AtomicBool::new(false),
            paused: AtomicBool::new(false),
            ended: AtomicBool::new(false),
            gain: Mutex::new(1.0),
            total_time_ms: AtomicI64::new(0),
            last_reported_ms: AtomicI64::new(0),
            observers: Mutex::new(Vec::new()),
            config,
        };
        Ok(Self {
            core: Arc::new(core),
            play_file: None,
            worker: None,
        })
    }

    pub fn id(&self) -> StreamId {
        self.core.id
    }

    /// File played by the next start.
    pub fn set_play_file(&mut self, path: impl Into<PathBuf>) {
        self.play_file = Some(path.into());
    }

    /// Linear gain applied to frames as they are read.
    pub fn set_gain(&self, gain: f32) {
        *self.core.gain.lock() = gain;
    }

    pub fn gain(&self) -> f32 {
        *self.core.gain.lock()
    }

    /// Open the file, start reading and register with `registry`.
    ///
    /// Starting a playing stream is a no-op.
    pub fn start(&mut self, registry: &mut StreamRegistry) -> Result<(), TapError> {
        if self.core.playing.load(Ordering::SeqCst) {
            return Ok(());
        }
        let path = self
            .play_file
            .clone()
            .ok_or_else(|| TapError::ConfigurationFailed("no play file set".into()))?;

        let file = File::open(&path)
            .map_err(|e| TapError::ResourceUnavailable(format!("failed to open {}: {}", path.display(), e)))?;
        let len = file
            .metadata()
            .map_err(|e| TapError::ResourceUnavailable(format!("failed to stat {}: {}", path.display(), e)))?
            .len();
        let total_ms = (len / self.core.config.bytes_per_frame() * FRAME_DURATION_MS as u64) as i64;

        self.core.clear_queues();
        *self.core.reader.lock() = Some(PcmReader { file, position: 0 });
        self.core.total_time_ms.store(total_ms, Ordering::SeqCst);
        self.core.ended.store(false, Ordering::SeqCst);
        self.core.playing.store(true, Ordering::SeqCst);

        let core = Arc::clone(&self.core);
        let worker = match Worker::spawn("voice-file-stream", move |shutdown| core.read_loop(shutdown)) {
            Ok(worker) => worker,
            Err(e) => {
                self.core.playing.store(false, Ordering::SeqCst);
                *self.core.reader.lock() = None;
                return Err(e);
            }
        };

        if let Err(e) = registry.add_file_stream(self.core.clone()) {
            if let Err(stop_error) = worker.stop(self.core.config.stop_timeout) {
                log::error!("File stream {} reader did not stop: {}", self.core.id, stop_error);
            }
            self.core.playing.store(false, Ordering::SeqCst);
            *self.core.reader.lock() = None;
            return Err(e);
        }
        self.worker = Some(worker);

        log::info!(
            "File stream {} playing {} ({} ms)",
            self.core.id,
            path.display(),
            total_ms
        );
        Ok(())
    }

    /// Unregister from `registry`, stop the reader and drop queued audio.
    pub fn stop(&mut self, registry: &mut StreamRegistry) -> Result<(), TapError> {
        if !self.core.playing.load(Ordering::SeqCst) {
            return Ok(());
        }
        self.set_pause(false);

        if let Err(e) = registry.remove_file_stream(self.core.id) {
            log::warn!("File stream {} was not registered: {}", self.core.id, e);
        }

        let result = match self.worker.take() {
            Some(worker) => worker.stop(self.core.config.stop_timeout),
            None => Ok(()),
        };

        self.core.playing.store(false, Ordering::SeqCst);
        *self.core.reader.lock() = None;
        if let Err(e) = result {
            log::error!("File stream {} reader did not stop: {}", self.core.id, e);
            return Err(e);
        }

        self.core.clear_queues();
        log::info!("File stream {} stopped", self.core.id);
        Ok(())
    }

    pub fn set_pause(&self, pause: bool) {
        self.core.paused.store(pause, Ordering::SeqCst);
        for observer in self.core.observers() {
            observer.on_play_pause(pause);
        }
    }

    pub fn is_paused(&self) -> bool {
        self.core.paused.load(Ordering::SeqCst)
    }

    pub fn is_playing(&self) -> bool {
        self.core.playing.load(Ordering::SeqCst)
    }

    /// Whether the reader reached the end of the file.
    pub fn has_ended(&self) -> bool {
        self.core.ended.load(Ordering::SeqCst)
    }

    /// Milliseconds of audio read so far. Zero when not playing.
    pub fn play_time(&self) -> i64 {
        self.core.play_time()
    }

    /// Length of the file in milliseconds.
    pub fn total_time(&self) -> i64 {
        self.core.total_time_ms.load(Ordering::SeqCst)
    }

    /// Move the read position to `time_ms`, rounded down to a frame boundary.
    pub fn set_play_time(&self, time_ms: i64) -> Result<(), TapError> {
        if !self.is_playing() {
            return Err(TapError::ResourceUnavailable("file stream is not playing".into()));
        }
        let mut reader = self.core.reader.lock();
        let reader = reader
            .as_mut()
            .ok_or_else(|| TapError::ResourceUnavailable("play file is closed".into()))?;

        let offset = (time_ms.max(0) as u64 / FRAME_DURATION_MS as u64) * self.core.config.bytes_per_frame();
        reader
            .file
            .seek(SeekFrom::Start(offset))
            .map_err(|e| TapError::StorageError(format!("seek failed: {}", e)))?;
        reader.position = offset;
        self.core.last_reported_ms.store(0, Ordering::SeqCst);
        Ok(())
    }

    /// Frames read ahead and waiting for the device.
    pub fn queued_frames(&self) -> usize {
        self.core.player_queue.lock().len()
    }

    /// Register an observer. Adding the same observer twice has no effect.
    pub fn add_observer(&self, observer: Arc<dyn PlaybackObserver>) {
        let mut observers = self.core.observers.lock();
        if observers.iter().any(|o| same_observer(o, &observer)) {
            return;
        }
        observers.push(observer);
    }

    pub fn remove_observer(&self, observer: &Arc<dyn PlaybackObserver>) {
        self.core.observers.lock().retain(|o| !same_observer(o, observer));
    }

    pub fn observer_count(&self) -> usize {
        self.core.observers.lock().len()
    }
}

fn same_observer(a: &Arc<dyn PlaybackObserver>, b: &Arc<dyn PlaybackObserver>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

impl Drop for VoiceFileStream {
    /// Silences the stream without unregistering it; the registry is not
    /// reachable from here.
    fn drop(&mut self) {
        if self.core.playing.swap(false, Ordering::SeqCst) {
            log::warn!(
                "File stream {} dropped while playing, it stays registered until removed",
                self.core.id
            );
        }
        if let Some(worker) = self.worker.take() {
            worker.request_stop();
        }
        self.core.clear_queues();
    }
}
