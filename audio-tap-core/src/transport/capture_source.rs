use parking_lot::Mutex;

use crate::models::frame::AudioFrame;
use crate::models::stream::{SendProperties, StreamId};
use crate::processing::frame_ops;
use crate::processing::linear_resampler::LinearResampler;
use crate::traits::mixer::{AudioFrameInfo, MixerSource};
use crate::traits::resampler::Resampler;

struct PendingCapture {
    samples: Vec<i16>,
    frame_count: usize,
    num_channels: usize,
    sample_rate_hz: u32,
    timestamp: u32,
}

/// Exposes the device's raw capture to the record sub-mixer, so local file
/// audio can be mixed in before processing.
pub(crate) struct CaptureSource {
    id: StreamId,
    pending: Mutex<Option<PendingCapture>>,
    send: Mutex<SendProperties>,
    resampler: Mutex<Box<dyn Resampler>>,
}

impl CaptureSource {
    pub(crate) fn new() -> Self {
        Self {
            id: StreamId::next(),
            pending: Mutex::new(None),
            send: Mutex::new(SendProperties::FLOOR),
            resampler: Mutex::new(Box::new(LinearResampler::new())),
        }
    }

    pub(crate) fn set_frame(
        &self,
        samples: &[i16],
        frame_count: usize,
        num_channels: usize,
        sample_rate_hz: u32,
        timestamp: u32,
        send: SendProperties,
    ) {
        *self.send.lock() = send;
        let mut pending = self.pending.lock();
        match pending.as_mut() {
            Some(p) => {
                p.samples.clear();
                p.samples.extend_from_slice(samples);
                p.frame_count = frame_count;
                p.num_channels = num_channels;
                p.sample_rate_hz = sample_rate_hz;
                p.timestamp = timestamp;
            }
            None => {
                *pending = Some(PendingCapture {
                    samples: samples.to_vec(),
                    frame_count,
                    num_channels,
                    sample_rate_hz,
                    timestamp,
                })
            }
        }
    }
}

impl MixerSource for CaptureSource {
    fn id(&self) -> StreamId {
        self.id
    }

    fn get_audio_frame_with_info(&self, sample_rate_hz: u32, frame: &mut AudioFrame) -> AudioFrameInfo {
        let pending = self.pending.lock();
        let Some(capture) = pending.as_ref() else {
            return AudioFrameInfo::Error;
        };
        let send = *self.send.lock();

        frame.sample_rate_hz = sample_rate_hz;
        frame.num_channels = capture.num_channels.min(send.num_channels);
        frame.timestamp = capture.timestamp;

        let mut resampler = self.resampler.lock();
        match frame_ops::remix_and_resample(
            &capture.samples,
            capture.frame_count,
            capture.num_channels,
            capture.sample_rate_hz,
            resampler.as_mut(),
            frame,
        ) {
            Ok(()) => AudioFrameInfo::Normal,
            Err(e) => {
                log::warn!("Capture source failed to resample: {}", e);
                AudioFrameInfo::Error
            }
        }
    }

    fn preferred_sample_rate(&self) -> u32 {
        self.pending
            .lock()
            .as_ref()
            .map(|p| p.sample_rate_hz)
            .unwrap_or(SendProperties::FLOOR.sample_rate_hz)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nothing_captured_yet() {
        let source = CaptureSource::new();
        let mut frame = AudioFrame::default();
        assert_eq!(source.get_audio_frame_with_info(48000, &mut frame), AudioFrameInfo::Error);
        assert_eq!(source.preferred_sample_rate(), 8000);
    }

    #[test]
    fn stereo_capture_follows_mono_send_format() {
        let source = CaptureSource::new();
        let samples: Vec<i16> = (0..480).flat_map(|_| [100i16, 300]).collect();
        let send = SendProperties {
            sample_rate_hz: 16000,
            num_channels: 1,
        };
        source.set_frame(&samples, 480, 2, 48000, 20, send);

        let mut frame = AudioFrame::default();
        let info = source.get_audio_frame_with_info(48000, &mut frame);

        assert_eq!(info, AudioFrameInfo::Normal);
        assert_eq!(source.preferred_sample_rate(), 48000);
        assert_eq!(frame.num_channels, 1);
        assert_eq!(frame.samples_per_channel, 480);
        assert_eq!(frame.timestamp, 20);
        assert!(frame.data().iter().all(|&s| s == 200));
    }
}
