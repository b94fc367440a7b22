/// Duration of one audio frame in milliseconds.
pub const FRAME_DURATION_MS: u32 = 10;

/// Frames per second at the canonical 10 ms frame duration.
pub const FRAMES_PER_SECOND: u32 = 1000 / FRAME_DURATION_MS;

/// Upper bound on the interleaved payload of a single frame, in samples.
pub const MAX_DATA_SIZE_SAMPLES: usize = 7680;

/// Sample rates the signal processor handles natively, ascending.
pub const NATIVE_SAMPLE_RATES_HZ: [u32; 4] = [8000, 16000, 32000, 48000];

/// Lowest supported device sample rate.
pub const MIN_SAMPLE_RATE_HZ: u32 = 8000;

/// Pick the lowest native rate that is at least `min_rate_hz`.
///
/// Falls back to the highest native rate when `min_rate_hz` is above the ladder.
pub fn lowest_native_rate_at_least(min_rate_hz: u32) -> u32 {
    NATIVE_SAMPLE_RATES_HZ
        .iter()
        .copied()
        .find(|&rate| rate >= min_rate_hz)
        .unwrap_or(NATIVE_SAMPLE_RATES_HZ[NATIVE_SAMPLE_RATES_HZ.len() - 1])
}

/// Whether `rate_hz` is one of the native processing rates.
pub fn is_native_rate(rate_hz: u32) -> bool {
    NATIVE_SAMPLE_RATES_HZ.contains(&rate_hz)
}

/// Samples per channel in one 10 ms frame at `sample_rate_hz`.
pub fn samples_per_channel_for(sample_rate_hz: u32) -> usize {
    (sample_rate_hz / FRAMES_PER_SECOND) as usize
}

/// Voice activity decision attached to a frame by the signal processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VadActivity {
    Active,
    Passive,
    #[default]
    Unknown,
}

/// One 10 ms block of interleaved 16-bit PCM.
///
/// Frames are owned values: fan-out clones, every other hand-off moves.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioFrame {
    pub sample_rate_hz: u32,
    pub num_channels: usize,
    pub samples_per_channel: usize,
    /// RTP-style timestamp in milliseconds.
    pub timestamp: u32,
    pub elapsed_time_ms: i64,
    pub ntp_time_ms: i64,
    pub vad_activity: VadActivity,
    pub(crate) muted: bool,
    pub(crate) data: Vec<i16>,
}

impl Default for AudioFrame {
    fn default() -> Self {
        Self {
            sample_rate_hz: 0,
            num_channels: 0,
            samples_per_channel: 0,
            timestamp: 0,
            elapsed_time_ms: -1,
            ntp_time_ms: -1,
            vad_activity: VadActivity::Unknown,
            muted: true,
            data: Vec::new(),
        }
    }
}

impl AudioFrame {
    /// A muted frame of the canonical 10 ms length.
    pub fn muted(sample_rate_hz: u32, num_channels: usize) -> Self {
        let samples_per_channel = samples_per_channel_for(sample_rate_hz);
        Self {
            sample_rate_hz,
            num_channels,
            samples_per_channel,
            data: vec![0; samples_per_channel * num_channels],
            ..Default::default()
        }
    }

    /// Build a frame from interleaved samples.
    ///
    /// Only the first `samples_per_channel * num_channels` samples are used;
    /// missing samples are zero-filled.
    pub fn from_interleaved(
        timestamp: u32,
        samples: &[i16],
        samples_per_channel: usize,
        sample_rate_hz: u32,
        num_channels: usize,
    ) -> Self {
        let mut frame = Self::default();
        frame.update(timestamp, samples, samples_per_channel, sample_rate_hz, num_channels);
        frame
    }

    /// Overwrite this frame's format and payload, keeping the allocation.
    pub fn update(
        &mut self,
        timestamp: u32,
        samples: &[i16],
        samples_per_channel: usize,
        sample_rate_hz: u32,
        num_channels: usize,
    ) {
        let len = samples_per_channel * num_channels;
        self.timestamp = timestamp;
        self.samples_per_channel = samples_per_channel;
        self.sample_rate_hz = sample_rate_hz;
        self.num_channels = num_channels;
        self.vad_activity = VadActivity::Unknown;
        self.data.clear();
        let available = samples.len().min(len);
        self.data.extend_from_slice(&samples[..available]);
        self.data.resize(len, 0);
        self.muted = false;
    }

    /// Reset format and payload so the frame can be refilled by a mixer.
    pub fn reset(&mut self) {
        let data = std::mem::take(&mut self.data);
        *self = Self { data, ..Default::default() };
        self.data.clear();
    }

    /// Interleaved samples. A muted frame reads as zeros.
    pub fn data(&self) -> &[i16] {
        &self.data
    }

    /// Mutable interleaved samples, sized to the current format.
    ///
    /// Unmutes the frame: callers are about to write real audio.
    pub fn data_mut(&mut self) -> &mut [i16] {
        let len = self.samples_per_channel * self.num_channels;
        if self.muted {
            self.data.clear();
        }
        self.data.resize(len, 0);
        self.muted = false;
        &mut self.data
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    /// Zero the payload and flag the frame as muted.
    pub fn mute(&mut self) {
        self.data.iter_mut().for_each(|s| *s = 0);
        self.muted = true;
    }

    /// Total interleaved sample count.
    pub fn len(&self) -> usize {
        self.samples_per_channel * self.num_channels
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the frame honours the 10 ms invariant for its rate.
    pub fn is_canonical(&self) -> bool {
        self.samples_per_channel == samples_per_channel_for(self.sample_rate_hz)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ladder_picks_lowest_sufficient_rate() {
        assert_eq!(lowest_native_rate_at_least(8000), 8000);
        assert_eq!(lowest_native_rate_at_least(11025), 16000);
        assert_eq!(lowest_native_rate_at_least(16000), 16000);
        assert_eq!(lowest_native_rate_at_least(44100), 48000);
        assert_eq!(lowest_native_rate_at_least(96000), 48000);
    }

    #[test]
    fn muted_frame_is_canonical_silence() {
        let frame = AudioFrame::muted(48000, 2);
        assert!(frame.is_muted());
        assert!(frame.is_canonical());
        assert_eq!(frame.len(), 960);
        assert!(frame.data().iter().all(|&s| s == 0));
    }

    #[test]
    fn from_interleaved_zero_fills_short_input() {
        let frame = AudioFrame::from_interleaved(20, &[1, 2, 3], 4, 400, 1);
        assert_eq!(frame.data(), &[1, 2, 3, 0]);
        assert_eq!(frame.timestamp, 20);
        assert!(!frame.is_muted());
    }

    #[test]
    fn data_mut_clears_muted_payload() {
        let mut frame = AudioFrame::muted(8000, 1);
        frame.data_mut()[0] = 7;
        assert!(!frame.is_muted());
        assert_eq!(frame.data()[0], 7);
        assert_eq!(frame.len(), 80);
    }

    #[test]
    fn reset_drops_format() {
        let mut frame = AudioFrame::from_interleaved(0, &[5; 160], 160, 16000, 1);
        frame.reset();
        assert!(frame.is_empty());
        assert!(frame.is_muted());
        assert_eq!(frame.sample_rate_hz, 0);
    }
}
