use std::sync::Arc;

use crate::models::frame::AudioFrame;
use crate::models::stream::StreamId;

/// Outcome of asking a mixer source for its next frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFrameInfo {
    /// The frame holds audio.
    Normal,
    /// The source is silent this period; the frame content is undefined.
    Muted,
    /// The source has nothing to give; it is skipped.
    Error,
}

/// A participant in an [`AudioMixer`].
pub trait MixerSource: Send + Sync {
    /// Stable identity used for registration and removal.
    fn id(&self) -> StreamId;

    /// Fill `frame` with the next 10ms of audio at `sample_rate_hz`.
    fn get_audio_frame_with_info(&self, sample_rate_hz: u32, frame: &mut AudioFrame) -> AudioFrameInfo;

    /// Rate at or above which pulling causes no quality loss.
    fn preferred_sample_rate(&self) -> u32;
}

/// N-way additive PCM combiner driven by pull.
pub trait AudioMixer: Send + Sync {
    /// Register a source. Returns `false` if the id is already present.
    fn add_source(&self, source: Arc<dyn MixerSource>) -> bool;

    /// Unregister a source. Returns `false` if the id was not present.
    fn remove_source(&self, id: StreamId) -> bool;

    /// Produce one mixed 10ms frame with `num_channels` channels.
    fn mix(&self, num_channels: usize, frame: &mut AudioFrame);

    fn source_count(&self) -> usize;
}
