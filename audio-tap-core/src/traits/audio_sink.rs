use crate::models::frame::AudioFrame;

/// Consumer of audio frames crossing a tap point or leaving the remix engine.
///
/// Called from the real-time device thread for taps, so implementations must
/// not block. Closures `Fn(&AudioFrame)` implement this trait.
pub trait AudioSink: Send + Sync {
    fn on_data(&self, frame: &AudioFrame);
}

impl<F> AudioSink for F
where
    F: Fn(&AudioFrame) + Send + Sync,
{
    fn on_data(&self, frame: &AudioFrame) {
        self(frame)
    }
}
