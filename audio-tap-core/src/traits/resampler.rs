use crate::models::error::TapError;

/// Sample-rate converter for interleaved 16-bit PCM.
///
/// One instance serves one stream; it keeps whatever state the algorithm needs
/// between calls and re-initializes only when the format changes.
pub trait Resampler: Send {
    fn initialize_if_needed(
        &mut self,
        src_rate_hz: u32,
        dst_rate_hz: u32,
        num_channels: usize,
    ) -> Result<(), TapError>;

    /// Convert `src` into `dst`, returning the number of samples produced.
    fn resample(&mut self, src: &[i16], dst: &mut [i16]) -> Result<usize, TapError>;
}
