use crate::models::frame::AudioFrame;
use crate::models::stats::AudioInputStats;
use crate::processing::frame_ops;

/// Frames between updates of the reported level.
const UPDATE_FREQUENCY: u32 = 10;

/// Peak-hold level meter with energy and duration accumulation.
///
/// The reported level is the largest absolute sample seen over the last
/// update window; after each report the running peak decays by a factor of 4.
#[derive(Debug, Clone, Default)]
pub struct AudioLevel {
    abs_max: i16,
    count: u32,
    current_level_full_range: i16,
    total_energy: f64,
    total_duration: f64,
}

impl AudioLevel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one frame of `duration_secs` into the meter.
    pub fn compute_level(&mut self, frame: &AudioFrame, duration_secs: f64) {
        let abs_value = frame_ops::max_abs_value(frame);
        if abs_value > self.abs_max {
            self.abs_max = abs_value;
        }

        self.count += 1;
        if self.count == UPDATE_FREQUENCY {
            self.current_level_full_range = self.abs_max;
            self.count = 0;
            self.abs_max >>= 2;
        }

        let additional = self.current_level_full_range as f64 / i16::MAX as f64;
        self.total_energy += additional * additional * duration_secs;
        self.total_duration += duration_secs;
    }

    /// Level in 0..=32767.
    pub fn level_full_range(&self) -> i16 {
        self.current_level_full_range
    }

    pub fn total_energy(&self) -> f64 {
        self.total_energy
    }

    pub fn total_duration(&self) -> f64 {
        self.total_duration
    }

    pub fn stats(&self) -> AudioInputStats {
        AudioInputStats {
            audio_level: self.current_level_full_range,
            total_energy: self.total_energy,
            total_duration: self.total_duration,
        }
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
