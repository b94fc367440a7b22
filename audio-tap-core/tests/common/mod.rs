//! Recording collaborators shared by the integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use audio_tap_core::{
    AudioFrame, AudioMixer, AudioTransport, DeviceDriver, FrameMixer, MixerSource, SendStream, StreamId, TapError,
};

/// Device that keeps playout/recording flags and never touches hardware.
#[derive(Default)]
pub struct RecordingDevice {
    pub aec: bool,
    pub playing: AtomicBool,
    pub recording: AtomicBool,
    pub transport: Mutex<Option<Arc<dyn AudioTransport>>>,
}

impl RecordingDevice {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_aec() -> Arc<Self> {
        Arc::new(Self {
            aec: true,
            ..Default::default()
        })
    }
}

impl DeviceDriver for RecordingDevice {
    fn register_audio_callback(&self, transport: Arc<dyn AudioTransport>) {
        *self.transport.lock() = Some(transport);
    }

    fn init_playout(&self) -> Result<(), TapError> {
        Ok(())
    }

    fn start_playout(&self) -> Result<(), TapError> {
        self.playing.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn stop_playout(&self) -> Result<(), TapError> {
        self.playing.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn playing(&self) -> bool {
        self.playing.load(Ordering::SeqCst)
    }

    fn init_recording(&self) -> Result<(), TapError> {
        Ok(())
    }

    fn start_recording(&self) -> Result<(), TapError> {
        self.recording.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn stop_recording(&self) -> Result<(), TapError> {
        self.recording.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn recording(&self) -> bool {
        self.recording.load(Ordering::SeqCst)
    }

    fn built_in_aec_is_available(&self) -> bool {
        self.aec
    }
}

/// Mixer that counts registrations and delegates mixing to [`FrameMixer`].
#[derive(Default)]
pub struct RecordingMixer {
    inner: FrameMixer,
    pub adds: AtomicUsize,
    pub removes: AtomicUsize,
}

impl RecordingMixer {
    pub fn adds(&self) -> usize {
        self.adds.load(Ordering::SeqCst)
    }

    pub fn removes(&self) -> usize {
        self.removes.load(Ordering::SeqCst)
    }
}

impl AudioMixer for RecordingMixer {
    fn add_source(&self, source: Arc<dyn MixerSource>) -> bool {
        self.adds.fetch_add(1, Ordering::SeqCst);
        self.inner.add_source(source)
    }

    fn remove_source(&self, id: StreamId) -> bool {
        self.removes.fetch_add(1, Ordering::SeqCst);
        self.inner.remove_source(id)
    }

    fn mix(&self, num_channels: usize, frame: &mut AudioFrame) {
        self.inner.mix(num_channels, frame);
    }

    fn source_count(&self) -> usize {
        self.inner.source_count()
    }
}

/// Send stream that keeps every frame it is handed.
pub struct CollectingSender {
    pub id: StreamId,
    pub frames: Mutex<Vec<AudioFrame>>,
}

impl CollectingSender {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            id: StreamId::next(),
            frames: Mutex::new(Vec::new()),
        })
    }

    pub fn count(&self) -> usize {
        self.frames.lock().len()
    }
}

impl SendStream for CollectingSender {
    fn id(&self) -> StreamId {
        self.id
    }

    fn send_audio_data(&self, frame: AudioFrame) {
        self.frames.lock().push(frame);
    }
}
