//! Collaborator doubles shared by unit tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::models::error::TapError;
use crate::traits::device::DeviceDriver;
use crate::traits::transport::AudioTransport;

/// Device that records its lifecycle calls and never touches hardware.
#[derive(Default)]
pub(crate) struct FakeDevice {
    pub(crate) aec: bool,
    pub(crate) fail_init: bool,
    pub(crate) playing: AtomicBool,
    pub(crate) recording: AtomicBool,
    pub(crate) calls: Mutex<Vec<&'static str>>,
    pub(crate) transport: Mutex<Option<Arc<dyn AudioTransport>>>,
}

impl FakeDevice {
    pub(crate) fn with_aec() -> Arc<Self> {
        Arc::new(Self {
            aec: true,
            ..Default::default()
        })
    }

    pub(crate) fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().clone()
    }

    pub(crate) fn transport(&self) -> Option<Arc<dyn AudioTransport>> {
        self.transport.lock().clone()
    }

    fn log(&self, call: &'static str) {
        self.calls.lock().push(call);
    }
}

impl DeviceDriver for FakeDevice {
    fn register_audio_callback(&self, transport: Arc<dyn AudioTransport>) {
        self.log("register");
        *self.transport.lock() = Some(transport);
    }

    fn init_playout(&self) -> Result<(), TapError> {
        self.log("init_playout");
        if self.fail_init {
            return Err(TapError::ResourceUnavailable("no device".into()));
        }
        Ok(())
    }

    fn start_playout(&self) -> Result<(), TapError> {
        self.log("start_playout");
        self.playing.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn stop_playout(&self) -> Result<(), TapError> {
        self.log("stop_playout");
        self.playing.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn playing(&self) -> bool {
        self.playing.load(Ordering::SeqCst)
    }

    fn init_recording(&self) -> Result<(), TapError> {
        self.log("init_recording");
        if self.fail_init {
            return Err(TapError::ResourceUnavailable("no device".into()));
        }
        Ok(())
    }

    fn start_recording(&self) -> Result<(), TapError> {
        self.log("start_recording");
        self.recording.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn stop_recording(&self) -> Result<(), TapError> {
        self.log("stop_recording");
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
