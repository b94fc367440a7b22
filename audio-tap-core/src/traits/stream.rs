use std::sync::Arc;

use crate::models::frame::AudioFrame;
use crate::models::stream::StreamId;
use crate::traits::mixer::MixerSource;

/// Outbound stream fed by the capture fan-out (e.g. an encoder + network sender).
pub trait SendStream: Send + Sync {
    fn id(&self) -> StreamId;

    /// Take ownership of one processed capture frame.
    fn send_audio_data(&self, frame: AudioFrame);
}

/// Hooks invoked on the real-time thread just before each device callback is
/// serviced.
pub trait FrameTick: Send + Sync {
    fn on_before_play_data(&self);
    fn on_before_record_data(&self);
}

/// A local media stream feeding both the playout mix and the record sub-mix.
pub trait FileStream: FrameTick {
    fn id(&self) -> StreamId;

    /// Source registered with the playout mixer.
    fn play_source(&self) -> Arc<dyn MixerSource>;

    /// Source registered with the record sub-mixer.
    fn record_source(&self) -> Arc<dyn MixerSource>;
}
