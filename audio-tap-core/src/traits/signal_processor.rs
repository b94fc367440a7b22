use crate::models::error::TapError;
use crate::models::frame::AudioFrame;

/// Echo cancellation / noise suppression / voice detection stage.
///
/// Only frames at a native rate are handed to the processor.
pub trait SignalProcessor: Send + Sync {
    /// Process a captured frame in place. May set `frame.vad_activity`.
    fn process_capture(&self, frame: &mut AudioFrame, delay_ms: u32, key_pressed: bool) -> Result<(), TapError>;

    /// Feed a rendered frame as the far-end (echo) reference.
    fn process_reverse(&self, frame: &mut AudioFrame) -> Result<(), TapError>;

    /// Whether voice activity classification runs on captured frames.
    fn voice_detection_enabled(&self) -> bool;
}
