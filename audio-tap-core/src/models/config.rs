use std::path::PathBuf;
use std::time::Duration;

use super::frame::{is_native_rate, FRAME_DURATION_MS};

/// Configuration for a [`RemixEngine`](crate::RemixEngine).
#[derive(Debug, Clone, PartialEq)]
pub struct RemixConfiguration {
    /// Output sample rate in Hz (default: 48000). Must be a native rate.
    pub sample_rate_hz: u32,

    /// Output channel count (default: 1).
    pub num_channels: usize,

    /// Worker cadence (default: 10ms, one frame).
    pub tick_interval: Duration,

    /// How long `stop()` waits for the worker to acknowledge shutdown (default: 2s).
    pub stop_timeout: Duration,

    /// Depth cap of each tap sink, in frames (default: 50 = 500ms).
    pub tap_capacity: usize,

    /// Delay before the first tick so the taps can buffer some audio (default: 50ms).
    pub warmup: Duration,

    /// Directory used by `RemixEngine::set_output_in_directory` for generated file names.
    pub output_directory: PathBuf,
}

impl RemixConfiguration {
    pub fn validate(&self) -> Result<(), String> {
        if !is_native_rate(self.sample_rate_hz) {
            return Err(format!("unsupported sample rate: {}", self.sample_rate_hz));
        }
        if ![1, 2].contains(&self.num_channels) {
            return Err(format!("unsupported channel count: {}", self.num_channels));
        }
        if self.tick_interval.is_zero() {
            return Err("tick interval must be non-zero".into());
        }
        if self.tap_capacity == 0 {
            return Err("tap capacity must be at least one frame".into());
        }
        Ok(())
    }
}

impl Default for RemixConfiguration {
    fn default() -> Self {
        Self {
            sample_rate_hz: 48000,
            num_channels: 1,
            tick_interval: Duration::from_millis(FRAME_DURATION_MS as u64),
            stop_timeout: Duration::from_millis(2000),
            tap_capacity: 50,
            warmup: Duration::from_millis(50),
            output_directory: PathBuf::from("."),
        }
    }
}

/// Configuration for a [`VoiceFileStream`](crate::VoiceFileStream).
///
/// The input file is raw little-endian 16-bit PCM in this format.
#[derive(Debug, Clone, PartialEq)]
pub struct FileStreamConfiguration {
    /// Sample rate of the input file (default: 44100).
    pub sample_rate_hz: u32,

    /// Channel count of the input file (default: 1).
    pub num_channels: usize,

    /// Frames read ahead of the device before the reader waits (default: 5).
    pub max_queued_frames: usize,

    /// Reader poll interval between shutdown checks (default: 5ms).
    pub poll_interval: Duration,

    /// How long `stop()` waits for the reader thread (default: 2s).
    pub stop_timeout: Duration,

    /// Minimum spacing of progress notifications, in ms of audio (default: 100).
    pub progress_interval_ms: i64,
}

impl FileStreamConfiguration {
    pub fn validate(&self) -> Result<(), String> {
        if self.sample_rate_hz % 100 != 0 || self.sample_rate_hz == 0 {
            return Err(format!("sample rate {} is not a whole number of 10ms frames", self.sample_rate_hz));
        }
        if ![1, 2].contains(&self.num_channels) {
            return Err(format!("unsupported channel count: {}", self.num_channels));
        }
        if self.max_queued_frames == 0 {
            return Err("max queued frames must be at least one".into());
        }
        Ok(())
    }

    /// Bytes of PCM in one 10ms frame of the input file.
    pub fn bytes_per_frame(&self) -> u64 {
        (self.sample_rate_hz / 100) as u64 * self.num_channels as u64 * 2
    }
}

impl Default for FileStreamConfiguration {
    fn default() -> Self {
        Self {
            sample_rate_hz: 44100,
            num_channels: 1,
            max_queued_frames: 5,
            poll_interval: Duration::from_millis(5),
            stop_timeout: Duration::from_millis(2000),
            progress_interval_ms: 100,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        assert!(RemixConfiguration::default().validate().is_ok());
        assert!(FileStreamConfiguration::default().validate().is_ok());
    }

    #[test]
    fn remix_rejects_off_ladder_rate() {
        let config = RemixConfiguration {
            sample_rate_hz: 44100,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn remix_rejects_zero_capacity() {
        let config = RemixConfiguration {
            tap_capacity: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn file_stream_frame_size() {
        let config = FileStreamConfiguration::default();
        assert_eq!(config.bytes_per_frame(), 882);
    }
}
