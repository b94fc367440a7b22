use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::models::error::TapError;
use crate::models::frame::{samples_per_channel_for, FRAME_DURATION_MS};
use crate::processing::cadence::TickClock;
use crate::processing::worker::Worker;
use crate::traits::transport::AudioTransport;

const POLL_RATE_HZ: u32 = 48000;
const POLL_CHANNELS: usize = 1;
const STOP_TIMEOUT: Duration = Duration::from_millis(2000);

/// Pulls render audio at the device cadence while device playout is off, so
/// mixers, file streams and the render tap keep advancing.
pub struct NullAudioPoller {
    worker: Option<Worker<()>>,
}

impl NullAudioPoller {
    pub fn start(transport: Arc<dyn AudioTransport>) -> Result<Self, TapError> {
        let worker = Worker::spawn("null-audio-poller", move |shutdown| {
            let samples_per_channel = samples_per_channel_for(POLL_RATE_HZ);
            let mut buffer = vec![0i16; samples_per_channel * POLL_CHANNELS];
            let mut clock = TickClock::new(Instant::now(), Duration::from_millis(FRAME_DURATION_MS as u64));
            let mut failures = 0u64;

            while clock.wait_next(shutdown) {
                let result = transport.on_render_needed(
                    samples_per_channel,
                    2 * POLL_CHANNELS,
                    POLL_CHANNELS,
                    POLL_RATE_HZ,
                    &mut buffer,
                );
                if let Err(e) = result {
                    if failures == 0 {
                        log::warn!("Null audio poller pull failed: {}", e);
                    }
                    failures += 1;
                }
            }
        })?;

        log::debug!("Null audio poller started");
        Ok(Self { worker: Some(worker) })
    }

    pub fn stop(&mut self) {
        if let Some(worker) = self.worker.take() {
            match worker.stop(STOP_TIMEOUT) {
                Ok(()) => log::debug!("Null audio poller stopped"),
                Err(e) => log::error!("Null audio poller stop failed: {}", e),
            }
        }
    }
}

impl Drop for NullAudioPoller {
    fn drop(&mut self) {
        self.stop();
    }
}
