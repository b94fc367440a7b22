use parking_lot::Mutex;

use crate::models::frame::AudioFrame;
use crate::models::stream::StreamId;
use crate::processing::frame_ops;
use crate::processing::linear_resampler::LinearResampler;
use crate::traits::mixer::{AudioFrameInfo, MixerSource};
use crate::traits::resampler::Resampler;

/// Mixer source that plays back whatever single frame was last handed to it.
///
/// Each frame is consumed by the next mix; without a new frame the source
/// reports [`AudioFrameInfo::Error`] and the mixer skips it.
pub struct FrameSource {
    id: StreamId,
    preferred_rate_hz: Mutex<u32>,
    pending: Mutex<Option<AudioFrame>>,
    resampler: Mutex<Box<dyn Resampler>>,
}

impl FrameSource {
    pub fn new(preferred_rate_hz: u32) -> Self {
        Self::with_resampler(preferred_rate_hz, Box::new(LinearResampler::new()))
    }

    pub fn with_resampler(preferred_rate_hz: u32, resampler: Box<dyn Resampler>) -> Self {
        Self {
            id: StreamId::next(),
            preferred_rate_hz: Mutex::new(preferred_rate_hz),
            pending: Mutex::new(None),
            resampler: Mutex::new(resampler),
        }
    }

    pub fn set_preferred_rate(&self, rate_hz: u32) {
        *self.preferred_rate_hz.lock() = rate_hz;
    }

    /// Replace the pending frame. `None` leaves the source with nothing to give.
    pub fn set_frame(&self, frame: Option<AudioFrame>) {
        *self.pending.lock() = frame;
    }

    pub fn has_frame(&self) -> bool {
        self.pending.lock().is_some()
    }
}

impl MixerSource for FrameSource {
    fn id(&self) -> StreamId {
        self.id
    }

    fn get_audio_frame_with_info(&self, sample_rate_hz: u32, frame: &mut AudioFrame) -> AudioFrameInfo {
        let Some(pending) = self.pending.lock().take() else {
            return AudioFrameInfo::Error;
        };
        if pending.is_muted() {
            return AudioFrameInfo::Muted;
        }

        frame.sample_rate_hz = sample_rate_hz;
        frame.num_channels = pending.num_channels;
        let mut resampler = self.resampler.lock();
        match frame_ops::remix_and_resample_frame(&pending, resampler.as_mut(), frame) {
            Ok(()) => AudioFrameInfo::Normal,
            Err(e) => {
                log::warn!("Frame source {} failed to resample: {}", self.id, e);
                AudioFrameInfo::Error
            }
        }
    }

    fn preferred_sample_rate(&self) -> u32 {
        *self.preferred_rate_hz.lock()
    }
}
