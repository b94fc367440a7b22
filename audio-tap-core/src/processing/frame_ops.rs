//! In-place operations on [`AudioFrame`]s and the remix/resample step shared
//! by the capture path, the render path and mixer sources.

use crate::models::error::TapError;
use crate::models::frame::{AudioFrame, MAX_DATA_SIZE_SAMPLES};
use crate::traits::resampler::Resampler;

/// Downmix interleaved stereo to mono by averaging each frame.
///
/// Writes one sample per stereo pair into `out` and returns how many were
/// written, bounded by the shorter of the two.
pub fn downmix_to_mono(samples: &[i16], out: &mut [i16]) -> usize {
    let mut written = 0;
    for (dst, lr) in out.iter_mut().zip(samples.chunks_exact(2)) {
        *dst = average(lr[0], lr[1]);
        written += 1;
    }
    written
}

/// Downmix a stereo `frame` to mono without leaving its own buffer.
pub fn downmix_in_place(frame: &mut AudioFrame) {
    if frame.num_channels != 2 {
        return;
    }
    let data = frame.data_mut();
    for i in 0..data.len() / 2 {
        data[i] = average(data[2 * i], data[2 * i + 1]);
    }
    frame.num_channels = 1;
    // Shrinks the payload to the mono length.
    frame.data_mut();
}

fn average(left: i16, right: i16) -> i16 {
    ((left as i32 + right as i32) >> 1) as i16
}

/// Duplicate each mono sample of `frame` into both stereo channels.
pub fn upmix_to_stereo(frame: &mut AudioFrame) {
    if frame.num_channels != 1 {
        return;
    }
    frame.num_channels = 2;
    let data = frame.data_mut();
    // Back to front, so no mono sample is overwritten before it is read.
    for i in (0..data.len() / 2).rev() {
        let sample = data[i];
        data[2 * i] = sample;
        data[2 * i + 1] = sample;
    }
}

/// Swap left and right channels of a stereo frame. Mono frames are untouched.
pub fn swap_stereo_channels(frame: &mut AudioFrame) {
    if frame.num_channels != 2 || frame.is_muted() {
        return;
    }
    for lr in frame.data_mut().chunks_exact_mut(2) {
        lr.swap(0, 1);
    }
}

/// Multiply every sample by `gain`, saturating at the i16 range.
pub fn scale_with_saturation(gain: f32, frame: &mut AudioFrame) {
    if frame.is_muted() || (gain - 1.0).abs() < f32::EPSILON {
        return;
    }
    for sample in frame.data_mut() {
        let scaled = (*sample as f32 * gain).round();
        *sample = scaled.clamp(i16::MIN as f32, i16::MAX as f32) as i16;
    }
}

/// Largest absolute sample value, saturated to `i16::MAX`.
pub fn max_abs_value(frame: &AudioFrame) -> i16 {
    if frame.is_muted() {
        return 0;
    }
    frame
        .data()
        .iter()
        .map(|&s| (s as i32).abs().min(i16::MAX as i32) as i16)
        .max()
        .unwrap_or(0)
}

/// Convert `src` (`samples_per_channel` × `num_channels` interleaved at
/// `sample_rate_hz`) into `dst`, whose `sample_rate_hz` and `num_channels`
/// the caller has already set.
///
/// Stereo-to-mono happens before resampling and mono-to-stereo after, so the
/// resampler always runs on the smaller channel count.
pub fn remix_and_resample(
    src: &[i16],
    samples_per_channel: usize,
    num_channels: usize,
    sample_rate_hz: u32,
    resampler: &mut dyn Resampler,
    dst: &mut AudioFrame,
) -> Result<(), TapError> {
    let input_len = samples_per_channel * num_channels;
    if src.len() < input_len {
        return Err(TapError::ContractViolation(format!(
            "input holds {} samples, expected {}",
            src.len(),
            input_len
        )));
    }
    let src = &src[..input_len];

    let mut downmixed = [0i16; MAX_DATA_SIZE_SAMPLES / 2];
    let (audio, audio_channels) = if num_channels == 2 && dst.num_channels == 1 {
        let written = downmix_to_mono(src, &mut downmixed);
        (&downmixed[..written], 1)
    } else {
        (src, num_channels)
    };

    let target_channels = dst.num_channels;
    resampler.initialize_if_needed(sample_rate_hz, dst.sample_rate_hz, audio_channels)?;

    let mut out = [0i16; MAX_DATA_SIZE_SAMPLES];
    let produced = resampler.resample(audio, &mut out)?;

    dst.num_channels = audio_channels;
    dst.samples_per_channel = produced / audio_channels;
    dst.data_mut().copy_from_slice(&out[..produced]);

    if audio_channels == 1 && target_channels == 2 {
        upmix_to_stereo(dst);
    }
    Ok(())
}

/// Remix and resample a whole frame into `dst`.
pub fn remix_and_resample_frame(
    src: &AudioFrame,
    resampler: &mut dyn Resampler,
    dst: &mut AudioFrame,
) -> Result<(), TapError> {
    dst.timestamp = src.timestamp;
    dst.elapsed_time_ms = src.elapsed_time_ms;
    dst.ntp_time_ms = src.ntp_time_ms;
    remix_and_resample(
        src.data(),
        src.samples_per_channel,
        src.num_channels,
        src.sample_rate_hz,
        resampler,
        dst,
    )?;
    if src.is_muted() {
        dst.mute();
    }
    Ok(())
}
