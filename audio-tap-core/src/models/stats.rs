use serde::{Deserialize, Serialize};

/// Capture-side level statistics, measured after signal processing.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AudioInputStats {
    /// Peak level over the last update window, 0..=32767.
    pub audio_level: i16,
    /// Accumulated energy, sum of `(level / 32767)^2 * duration`.
    pub total_energy: f64,
    /// Accumulated audio duration in seconds.
    pub total_duration: f64,
}
