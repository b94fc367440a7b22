use std::sync::Arc;

use parking_lot::Mutex;

use crate::models::frame::{lowest_native_rate_at_least, samples_per_channel_for, AudioFrame, MAX_DATA_SIZE_SAMPLES};
use crate::models::stream::StreamId;
use crate::processing::frame_ops;
use crate::traits::mixer::{AudioFrameInfo, AudioMixer, MixerSource};

/// Rate used when no source states a preference.
pub const DEFAULT_MIX_RATE_HZ: u32 = 48000;

/// Saturating additive mixer.
///
/// Sources are pulled in registration order. Each contributing frame is
/// brought to the requested channel count, summed in 32 bits and clamped.
/// The mix rate is the lowest native rate covering every source's preferred
/// rate, unless a fixed output rate was configured.
pub struct FrameMixer {
    sources: Mutex<Vec<Arc<dyn MixerSource>>>,
    output_rate_hz: Option<u32>,
    scratch: Mutex<MixScratch>,
}

/// Buffers reused by every mix so the device callback does not allocate
/// once they have grown to the working size.
struct MixScratch {
    sources: Vec<Arc<dyn MixerSource>>,
    accumulator: Vec<i32>,
    source_frame: AudioFrame,
}

impl MixScratch {
    fn new() -> Self {
        Self {
            sources: Vec::new(),
            accumulator: Vec::with_capacity(MAX_DATA_SIZE_SAMPLES),
            source_frame: AudioFrame::default(),
        }
    }
}

impl FrameMixer {
    pub fn new() -> Self {
        Self {
            sources: Mutex::new(Vec::new()),
            output_rate_hz: None,
            scratch: Mutex::new(MixScratch::new()),
        }
    }

    /// A mixer that always produces `rate_hz` output.
    pub fn with_output_rate(rate_hz: u32) -> Self {
        Self {
            output_rate_hz: Some(rate_hz),
            ..Self::new()
        }
    }

    fn output_rate(&self, sources: &[Arc<dyn MixerSource>]) -> u32 {
        if let Some(rate) = self.output_rate_hz {
            return rate;
        }
        sources
            .iter()
            .map(|s| s.preferred_sample_rate())
            .max()
            .map(lowest_native_rate_at_least)
            .unwrap_or(DEFAULT_MIX_RATE_HZ)
    }
}

impl Default for FrameMixer {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioMixer for FrameMixer {
    fn add_source(&self, source: Arc<dyn MixerSource>) -> bool {
        let mut sources = self.sources.lock();
        if sources.iter().any(|s| s.id() == source.id()) {
            return false;
        }
        sources.push(source);
        true
    }

    fn remove_source(&self, id: StreamId) -> bool {
        let mut sources = self.sources.lock();
        let before = sources.len();
        sources.retain(|s| s.id() != id);
        sources.len() != before
    }

    fn mix(&self, num_channels: usize, frame: &mut AudioFrame) {
        let mut scratch = self.scratch.lock();
        let MixScratch {
            sources,
            accumulator,
            source_frame,
        } = &mut *scratch;

        // Snapshot so sources are pulled without holding the registration lock.
        sources.clear();
        sources.extend(self.sources.lock().iter().cloned());
        let rate = self.output_rate(sources);
        let samples_per_channel = samples_per_channel_for(rate);
        let len = samples_per_channel * num_channels;

        accumulator.clear();
        accumulator.resize(len, 0);
        let mut contributed = false;
        let mut first_timing = None;

        for source in sources.iter() {
            source_frame.reset();
            match source.get_audio_frame_with_info(rate, source_frame) {
                AudioFrameInfo::Normal => {}
                AudioFrameInfo::Muted | AudioFrameInfo::Error => continue,
            }
            if source_frame.num_channels == 1 && num_channels == 2 {
                frame_ops::upmix_to_stereo(source_frame);
            } else if source_frame.num_channels == 2 && num_channels == 1 {
                frame_ops::downmix_in_place(source_frame);
            }

            for (acc, &sample) in accumulator.iter_mut().zip(source_frame.data()) {
                *acc += sample as i32;
            }
            if first_timing.is_none() {
                first_timing = Some((
                    source_frame.timestamp,
                    source_frame.elapsed_time_ms,
                    source_frame.ntp_time_ms,
                ));
            }
            contributed = true;
        }
        sources.clear();

        frame.reset();
        frame.sample_rate_hz = rate;
        frame.num_channels = num_channels;
        frame.samples_per_channel = samples_per_channel;
        if let Some((timestamp, elapsed, ntp)) = first_timing {
            frame.timestamp = timestamp;
            frame.elapsed_time_ms = elapsed;
            frame.ntp_time_ms = ntp;
        }

        let data = frame.data_mut();
        for (out, acc) in data.iter_mut().zip(accumulator.iter()) {
            *out = (*acc).clamp(i16::MIN as i32, i16::MAX as i32) as i16;
        }
        if !contributed {
            frame.mute();
        }
    }

    fn source_count(&self) -> usize {
        self.sources.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::frame_source::FrameSource;

    fn source_with(rate: u32, value: i16, channels: usize) -> Arc<FrameSource> {
        let source = Arc::new(FrameSource::new(rate));
        let spc = samples_per_channel_for(rate);
        source.set_frame(Some(AudioFrame::from_interleaved(
            0,
            &vec![value; spc * channels],
            spc,
            rate,
            channels,
        )));
        source
    }

    #[test]
    fn duplicate_source_is_refused() {
        let mixer = FrameMixer::new();
        let source = source_with(16000, 0, 1);
        assert!(mixer.add_source(source.clone()));
        assert!(!mixer.add_source(source.clone()));
        assert_eq!(mixer.source_count(), 1);
        assert!(mixer.remove_source(source.id()));
        assert!(!mixer.remove_source(source.id()));
    }

    #[test]
    fn sums_sources() {
        let mixer = FrameMixer::new();
        mixer.add_source(source_with(16000, 100, 1));
        mixer.add_source(source_with(16000, 250, 1));

        let mut frame = AudioFrame::default();
        mixer.mix(1, &mut frame);

        assert_eq!(frame.sample_rate_hz, 16000);
        assert_eq!(frame.samples_per_channel, 160);
        assert!(!frame.is_muted());
        assert!(frame.data().iter().all(|&s| s == 350));
    }

    #[test]
    fn sum_saturates() {
        let mixer = FrameMixer::new();
        mixer.add_source(source_with(8000, 30000, 1));
        mixer.add_source(source_with(8000, 30000, 1));

        let mut frame = AudioFrame::default();
        mixer.mix(1, &mut frame);

        assert!(frame.data().iter().all(|&s| s == i16::MAX));
    }

    #[test]
    fn rate_follows_highest_preference() {
        let mixer = FrameMixer::new();
        mixer.add_source(source_with(16000, 10, 1));
        mixer.add_source(source_with(44100, 10, 1));

        let mut frame = AudioFrame::default();
        mixer.mix(1, &mut frame);

        assert_eq!(frame.sample_rate_hz, 48000);
        assert_eq!(frame.len(), 480);
    }

    #[test]
    fn mono_source_fills_stereo_output() {
        let mixer = FrameMixer::with_output_rate(48000);
        mixer.add_source(source_with(48000, 42, 1));

        let mut frame = AudioFrame::default();
        mixer.mix(2, &mut frame);

        assert_eq!(frame.num_channels, 2);
        assert_eq!(frame.len(), 960);
        assert!(frame.data().iter().all(|&s| s == 42));
    }

    #[test]
    fn stereo_source_downmixed_for_mono_output() {
        let mixer = FrameMixer::with_output_rate(16000);
        mixer.add_source(source_with(16000, 64, 2));

        let mut frame = AudioFrame::default();
        mixer.mix(1, &mut frame);

        assert_eq!(frame.num_channels, 1);
        assert!(frame.data().iter().all(|&s| s == 64));
    }

    #[test]
    fn repeated_mixes_reuse_scratch_buffers() {
        let mixer = FrameMixer::with_output_rate(48000);
        let source = source_with(48000, 5, 2);
        mixer.add_source(source.clone());

        let mut frame = AudioFrame::default();
        mixer.mix(1, &mut frame);
        let (accumulator, source_buffer) = {
            let scratch = mixer.scratch.lock();
            (scratch.accumulator.as_ptr(), scratch.source_frame.data().as_ptr())
        };

        for _ in 0..3 {
            source.set_frame(Some(AudioFrame::from_interleaved(0, &[5; 960], 480, 48000, 2)));
            mixer.mix(1, &mut frame);
            assert!(frame.data().iter().all(|&s| s == 5));
        }
        let scratch = mixer.scratch.lock();
        assert_eq!(scratch.accumulator.as_ptr(), accumulator);
        assert_eq!(scratch.source_frame.data().as_ptr(), source_buffer);
        assert!(scratch.sources.is_empty());
    }

    #[test]
    fn no_contribution_is_muted_silence() {
        let mixer = FrameMixer::with_output_rate(48000);
        mixer.add_source(Arc::new(FrameSource::new(48000)));

        let mut frame = AudioFrame::default();
        mixer.mix(1, &mut frame);

        assert!(frame.is_muted());
        assert_eq!(frame.len(), 480);
        assert!(frame.data().iter().all(|&s| s == 0));
    }
}
