use crate::models::error::TapError;

/// Result of a render pull.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RenderInfo {
    /// Interleaved samples written to the output buffer.
    pub samples_out: usize,
    pub elapsed_time_ms: i64,
    pub ntp_time_ms: i64,
}

/// The two real-time entry points a device drives every 10ms.
///
/// Implementations must return within one device period and never block on
/// downstream consumers.
pub trait AudioTransport: Send + Sync {
    /// Captured audio is available. Returns the number of frames consumed.
    #[allow(clippy::too_many_arguments)]
    fn on_capture_available(
        &self,
        data: &[i16],
        frame_count: usize,
        bytes_per_sample: usize,
        num_channels: usize,
        sample_rate_hz: u32,
        delay_ms: u32,
        key_pressed: bool,
    ) -> Result<usize, TapError>;

    /// The device needs `sample_count` frames of playout audio in `out`.
    fn on_render_needed(
        &self,
        sample_count: usize,
        bytes_per_sample: usize,
        num_channels: usize,
        sample_rate_hz: u32,
        out: &mut [i16],
    ) -> Result<RenderInfo, TapError>;
}
