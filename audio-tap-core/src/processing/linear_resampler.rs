use crate::models::error::TapError;
use crate::traits::resampler::Resampler;

/// Linear interpolation resampler for interleaved 16-bit audio.
///
/// Stateless between calls apart from the configured format. Good enough for
/// taps and tests; plug in a band-limited implementation for production audio.
#[derive(Debug, Clone, Default)]
pub struct LinearResampler {
    src_rate_hz: u32,
    dst_rate_hz: u32,
    num_channels: usize,
}

impl LinearResampler {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Resampler for LinearResampler {
    fn initialize_if_needed(
        &mut self,
        src_rate_hz: u32,
        dst_rate_hz: u32,
        num_channels: usize,
    ) -> Result<(), TapError> {
        if src_rate_hz == 0 || dst_rate_hz == 0 || num_channels == 0 {
            return Err(TapError::ProcessingFailed(format!(
                "invalid resampler format: {} Hz -> {} Hz, {} channels",
                src_rate_hz, dst_rate_hz, num_channels
            )));
        }
        self.src_rate_hz = src_rate_hz;
        self.dst_rate_hz = dst_rate_hz;
        self.num_channels = num_channels;
        Ok(())
    }

    fn resample(&mut self, src: &[i16], dst: &mut [i16]) -> Result<usize, TapError> {
        let channels = self.num_channels;
        if channels == 0 {
            return Err(TapError::ProcessingFailed("resampler not initialized".into()));
        }

        let frame_count = src.len() / channels;
        if self.src_rate_hz == self.dst_rate_hz {
            let len = frame_count * channels;
            if dst.len() < len {
                return Err(TapError::ProcessingFailed(format!(
                    "destination too small: {} < {}",
                    dst.len(),
                    len
                )));
            }
            dst[..len].copy_from_slice(&src[..len]);
            return Ok(len);
        }

        let ratio = self.dst_rate_hz as f64 / self.src_rate_hz as f64;
        let output_frames = (frame_count as f64 * ratio).round() as usize;
        let produced = output_frames * channels;
        if dst.len() < produced {
            return Err(TapError::ProcessingFailed(format!(
                "destination too small: {} < {}",
                dst.len(),
                produced
            )));
        }
        if frame_count == 0 {
            return Ok(0);
        }

        for i in 0..output_frames {
            let source_index = i as f64 / ratio;
            let index = (source_index as usize).min(frame_count - 1);
            let fraction = source_index - index as f64;

            for ch in 0..channels {
                let current = src[index * channels + ch] as f64;
                let value = if index + 1 < frame_count {
                    let next = src[(index + 1) * channels + ch] as f64;
                    current * (1.0 - fraction) + next * fraction
                } else {
                    current
                };
                dst[i * channels + ch] = value.round().clamp(i16::MIN as f64, i16::MAX as f64) as i16;
            }
        }
        Ok(produced)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resampled(src: &[i16], from: u32, to: u32, channels: usize, cap: usize) -> Vec<i16> {
        let mut resampler = LinearResampler::new();
        resampler.initialize_if_needed(from, to, channels).unwrap();
        let mut dst = vec![0i16; cap];
        let n = resampler.resample(src, &mut dst).unwrap();
        dst.truncate(n);
        dst
    }

    #[test]
    fn same_rate_is_passthrough() {
        let src = [1, 2, 3, 4];
        assert_eq!(resampled(&src, 16000, 16000, 1, 4), vec![1, 2, 3, 4]);
    }

    #[test]
    fn downsample_10ms_48k_to_16k() {
        let src = vec![100i16; 480];
        let out = resampled(&src, 48000, 16000, 1, 160);
        assert_eq!(out.len(), 160);
        assert!(out.iter().all(|&s| s == 100));
    }

    #[test]
    fn upsample_interpolates() {
        let out = resampled(&[0, 1000], 8000, 16000, 1, 4);
        assert_eq!(out.len(), 4);
        assert_eq!(out[0], 0);
        assert_eq!(out[1], 500);
        assert_eq!(out[2], 1000);
    }

    #[test]
    fn stereo_keeps_channels_apart() {
        let src: Vec<i16> = (0..441).flat_map(|_| [1000i16, -1000]).collect();
        let out = resampled(&src, 44100, 48000, 2, 960);
        assert_eq!(out.len(), 960);
        assert!(out.chunks(2).all(|f| f[0] == 1000 && f[1] == -1000));
    }

    #[test]
    fn small_destination_is_an_error() {
        let mut resampler = LinearResampler::new();
        resampler.initialize_if_needed(8000, 48000, 1).unwrap();
        let mut dst = [0i16; 10];
        assert!(resampler.resample(&[0; 80], &mut dst).is_err());
    }

    #[test]
    fn uninitialized_is_an_error() {
        let mut resampler = LinearResampler::new();
        assert!(resampler.resample(&[0; 80], &mut [0; 80]).is_err());
    }
}
