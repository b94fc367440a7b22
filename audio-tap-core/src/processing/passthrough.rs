use crate::models::error::TapError;
use crate::models::frame::AudioFrame;
use crate::traits::signal_processor::SignalProcessor;

/// Signal processor that leaves audio untouched and classifies nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughProcessor;

impl SignalProcessor for PassthroughProcessor {
    fn process_capture(&self, _frame: &mut AudioFrame, _delay_ms: u32, _key_pressed: bool) -> Result<(), TapError> {
        Ok(())
    }

    fn process_reverse(&self, _frame: &mut AudioFrame) -> Result<(), TapError> {
        Ok(())
    }

    fn voice_detection_enabled(&self) -> bool {
        false
    }
}
