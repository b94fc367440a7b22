use std::path::PathBuf;
use std::time::Duration;

use audio_tap_core::models::frame::is_native_rate;

/// Configuration for a [`FileAudioDevice`](crate::FileAudioDevice).
#[derive(Debug, Clone, PartialEq)]
pub struct FileDeviceConfiguration {
    /// Raw little-endian 16-bit PCM read as microphone input. `None` captures silence.
    pub input_path: Option<PathBuf>,

    /// File the rendered playout is appended to. `None` discards it.
    pub output_path: Option<PathBuf>,

    /// Capture format (default: 48000 Hz, 2 channels).
    pub capture_sample_rate_hz: u32,
    pub capture_channels: usize,

    /// Playout format (default: 48000 Hz, 2 channels).
    pub playout_sample_rate_hz: u32,
    pub playout_channels: usize,

    /// Reported by `built_in_aec_is_available` (default: false).
    pub built_in_aec: bool,

    /// How long stopping a direction waits for its thread (default: 2s).
    pub stop_timeout: Duration,
}

impl FileDeviceConfiguration {
    pub fn validate(&self) -> Result<(), String> {
        for (direction, rate, channels) in [
            ("capture", self.capture_sample_rate_hz, self.capture_channels),
            ("playout", self.playout_sample_rate_hz, self.playout_channels),
        ] {
            if !is_native_rate(rate) {
                return Err(format!("unsupported {} sample rate: {}", direction, rate));
            }
            if ![1, 2].contains(&channels) {
                return Err(format!("unsupported {} channel count: {}", direction, channels));
            }
        }
        Ok(())
    }
}

impl Default for FileDeviceConfiguration {
    fn default() -> Self {
        Self {
            input_path: None,
            output_path: None,
            capture_sample_rate_hz: 48000,
            capture_channels: 2,
            playout_sample_rate_hz: 48000,
            playout_channels: 2,
            built_in_aec: false,
            stop_timeout: Duration::from_millis(2000),
        }
    }
}
