use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::models::error::TapError;
use crate::models::frame::{
    lowest_native_rate_at_least, AudioFrame, VadActivity, FRAMES_PER_SECOND, FRAME_DURATION_MS,
    MAX_DATA_SIZE_SAMPLES, MIN_SAMPLE_RATE_HZ,
};
use crate::models::stats::AudioInputStats;
use crate::models::stream::SendProperties;
use crate::processing::audio_level::AudioLevel;
use crate::processing::frame_ops;
use crate::processing::typing_detection::TypingDetection;
use crate::traits::audio_sink::AudioSink;
use crate::traits::mixer::AudioMixer;
use crate::traits::resampler::Resampler;
use crate::traits::signal_processor::SignalProcessor;
use crate::traits::stream::{FrameTick, SendStream};
use crate::traits::transport::{AudioTransport, RenderInfo};
use crate::transport::capture_source::CaptureSource;

/// Capture-side state, touched only by the capture callback and stats queries.
struct CaptureState {
    resampler: Box<dyn Resampler>,
    level: AudioLevel,
    typing: TypingDetection,
    timestamp: u32,
}

/// Render-side state, touched only by the render callback.
struct RenderState {
    resampler: Box<dyn Resampler>,
    mixed: AudioFrame,
    rendered: AudioFrame,
}

/// The device-facing half of the pipeline.
///
/// Captured audio is converted to the lowest native rate that loses nothing
/// the senders need, processed, and fanned out. Playout audio is pulled from
/// the play mixer, fed to the processor as the echo reference and resampled
/// to whatever the device asked for. Both directions copy frames to an
/// optional tap sink.
pub struct TransportBridge {
    play_mixer: Arc<dyn AudioMixer>,
    record_mixer: Arc<dyn AudioMixer>,
    processor: Arc<dyn SignalProcessor>,
    capture_source: Arc<CaptureSource>,

    senders: Mutex<Vec<Arc<dyn SendStream>>>,
    send_properties: Mutex<SendProperties>,
    swap_stereo_channels: AtomicBool,
    typing_noise_detected: AtomicBool,

    capture: Mutex<CaptureState>,
    render: Mutex<RenderState>,

    player_sink: Mutex<Option<Arc<dyn AudioSink>>>,
    record_sink: Mutex<Option<Arc<dyn AudioSink>>>,
    tick: Mutex<Option<Arc<dyn FrameTick>>>,
}

impl TransportBridge {
    pub fn new(
        play_mixer: Arc<dyn AudioMixer>,
        record_mixer: Arc<dyn AudioMixer>,
        processor: Arc<dyn SignalProcessor>,
        capture_resampler: Box<dyn Resampler>,
        render_resampler: Box<dyn Resampler>,
    ) -> Self {
        let capture_source = Arc::new(CaptureSource::new());
        if !record_mixer.add_source(capture_source.clone()) {
            log::warn!("Record mixer refused the capture source");
        }

        Self {
            play_mixer,
            record_mixer,
            processor,
            capture_source,
            senders: Mutex::new(Vec::new()),
            send_properties: Mutex::new(SendProperties::FLOOR),
            swap_stereo_channels: AtomicBool::new(false),
            typing_noise_detected: AtomicBool::new(false),
            capture: Mutex::new(CaptureState {
                resampler: capture_resampler,
                level: AudioLevel::new(),
                typing: TypingDetection::new(),
                timestamp: 0,
            }),
            render: Mutex::new(RenderState {
                resampler: render_resampler,
                mixed: AudioFrame::default(),
                rendered: AudioFrame::default(),
            }),
            player_sink: Mutex::new(None),
            record_sink: Mutex::new(None),
            tick: Mutex::new(None),
        }
    }

    /// Replace the fan-out list and the format it is produced in.
    ///
    /// The last stream in `streams` receives the original frame, every other
    /// stream a copy.
    pub fn update_sending_streams(&self, streams: Vec<Arc<dyn SendStream>>, properties: SendProperties) {
        *self.senders.lock() = streams;
        *self.send_properties.lock() = properties;
    }

    pub fn send_properties(&self) -> SendProperties {
        *self.send_properties.lock()
    }

    pub fn sending_stream_count(&self) -> usize {
        self.senders.lock().len()
    }

    pub fn set_stereo_channel_swapping(&self, enable: bool) {
        self.swap_stereo_channels.store(enable, Ordering::Relaxed);
    }

    pub fn stereo_channel_swapping(&self) -> bool {
        self.swap_stereo_channels.load(Ordering::Relaxed)
    }

    /// Outcome of the typing heuristic on the last captured frame.
    pub fn typing_noise_detected(&self) -> bool {
        self.typing_noise_detected.load(Ordering::Relaxed)
    }

    /// Level and energy of processed capture audio.
    pub fn audio_input_stats(&self) -> AudioInputStats {
        self.capture.lock().level.stats()
    }

    /// Install or clear the sink receiving a copy of each rendered frame.
    pub fn set_player_sink(&self, sink: Option<Arc<dyn AudioSink>>) {
        *self.player_sink.lock() = sink;
    }

    /// Install or clear the sink receiving a copy of each raw captured frame.
    pub fn set_record_sink(&self, sink: Option<Arc<dyn AudioSink>>) {
        *self.record_sink.lock() = sink;
    }

    /// Clear the player sink only while `sink` is the one installed.
    pub fn remove_player_sink(&self, sink: &Arc<dyn AudioSink>) -> bool {
        clear_if_installed(&self.player_sink, sink)
    }

    /// Clear the record sink only while `sink` is the one installed.
    pub fn remove_record_sink(&self, sink: &Arc<dyn AudioSink>) -> bool {
        clear_if_installed(&self.record_sink, sink)
    }

    /// Install or clear the observer run before each device callback.
    pub fn register_tick(&self, tick: Option<Arc<dyn FrameTick>>) {
        *self.tick.lock() = tick;
    }

    pub fn play_mixer(&self) -> &Arc<dyn AudioMixer> {
        &self.play_mixer
    }

    pub fn record_mixer(&self) -> &Arc<dyn AudioMixer> {
        &self.record_mixer
    }

    fn tick_observer(&self) -> Option<Arc<dyn FrameTick>> {
        self.tick.lock().clone()
    }

    /// Build the canonical working frame for one capture callback.
    fn capture_frame(
        &self,
        state: &mut CaptureState,
        data: &[i16],
        frame_count: usize,
        num_channels: usize,
        sample_rate_hz: u32,
        send: SendProperties,
    ) -> Result<AudioFrame, TapError> {
        let mut frame = AudioFrame::default();

        // More than the capture source registered means file audio to mix in.
        if self.record_mixer.source_count() > 1 {
            self.capture_source
                .set_frame(data, frame_count, num_channels, sample_rate_hz, state.timestamp, send);
            self.record_mixer.mix(num_channels, &mut frame);
            if frame.sample_rate_hz == 0 {
                return Err(TapError::ProcessingFailed("record mixer produced no frame".into()));
            }
        } else {
            frame.sample_rate_hz = lowest_native_rate_at_least(sample_rate_hz.min(send.sample_rate_hz));
            frame.num_channels = num_channels.min(send.num_channels);
            frame_ops::remix_and_resample(
                data,
                frame_count,
                num_channels,
                sample_rate_hz,
                state.resampler.as_mut(),
                &mut frame,
            )?;
        }

        frame.timestamp = state.timestamp;
        Ok(frame)
    }
}

/// Reject callback parameters that break the 10ms frame contract.
fn check_callback_format(
    frame_count: usize,
    bytes_per_sample: usize,
    num_channels: usize,
    sample_rate_hz: u32,
    available: usize,
) -> Result<(), TapError> {
    let problem = if !(1..=2).contains(&num_channels) {
        Some(format!("unsupported channel count {}", num_channels))
    } else if bytes_per_sample != 2 * num_channels {
        Some(format!("{} bytes per sample for {} channels", bytes_per_sample, num_channels))
    } else if sample_rate_hz < MIN_SAMPLE_RATE_HZ {
        Some(format!("sample rate {} below {}", sample_rate_hz, MIN_SAMPLE_RATE_HZ))
    } else if frame_count as u64 * FRAMES_PER_SECOND as u64 != sample_rate_hz as u64 {
        Some(format!(
            "{} frames is not {}ms at {} Hz",
            frame_count, FRAME_DURATION_MS, sample_rate_hz
        ))
    } else if frame_count * num_channels > MAX_DATA_SIZE_SAMPLES {
        Some(format!("{} samples exceed the frame bound", frame_count * num_channels))
    } else if available < frame_count * num_channels {
        Some(format!(
            "buffer holds {} samples, {} required",
            available,
            frame_count * num_channels
        ))
    } else {
        None
    };

    match problem {
        None => Ok(()),
        Some(problem) => {
            debug_assert!(false, "contract violation: {}", problem);
            Err(TapError::ContractViolation(problem))
        }
    }
}

fn clear_if_installed(slot: &Mutex<Option<Arc<dyn AudioSink>>>, sink: &Arc<dyn AudioSink>) -> bool {
    let mut slot = slot.lock();
    let installed = slot
        .as_ref()
        .is_some_and(|current| std::ptr::addr_eq(Arc::as_ptr(current), Arc::as_ptr(sink)));
    if installed {
        *slot = None;
    }
    installed
}

impl AudioTransport for TransportBridge {
    fn on_capture_available(
        &self,
        data: &[i16],
        frame_count: usize,
        bytes_per_sample: usize,
        num_channels: usize,
        sample_rate_hz: u32,
        delay_ms: u32,
        key_pressed: bool,
    ) -> Result<usize, TapError> {
        check_callback_format(frame_count, bytes_per_sample, num_channels, sample_rate_hz, data.len())?;

        let send = *self.send_properties.lock();
        let swap = self.swap_stereo_channels.load(Ordering::Relaxed);

        if let Some(tick) = self.tick_observer() {
            tick.on_before_record_data();
        }

        let mut state = self.capture.lock();
        let timestamp = state.timestamp;

        let record_sink = self.record_sink.lock().clone();
        if let Some(sink) = record_sink {
            let raw = AudioFrame::from_interleaved(timestamp, data, frame_count, sample_rate_hz, num_channels);
            sink.on_data(&raw);
        }

        let mut frame = self.capture_frame(&mut state, data, frame_count, num_channels, sample_rate_hz, send)?;
        state.timestamp = timestamp.wrapping_add(FRAME_DURATION_MS);

        self.processor.process_capture(&mut frame, delay_ms, key_pressed)?;
        if swap {
            frame_ops::swap_stereo_channels(&mut frame);
        }

        let mut typing_detected = false;
        if self.processor.voice_detection_enabled() && frame.vad_activity != VadActivity::Unknown {
            let vad_active = frame.vad_activity == VadActivity::Active;
            typing_detected = state.typing.process(key_pressed, vad_active);
        }

        let duration_secs = frame_count as f64 / sample_rate_hz as f64;
        state.level.compute_level(&frame, duration_secs);
        drop(state);

        self.typing_noise_detected.store(typing_detected, Ordering::Relaxed);

        let senders = self.senders.lock().clone();
        if let Some((last, rest)) = senders.split_last() {
            for sender in rest {
                sender.send_audio_data(frame.clone());
            }
            last.send_audio_data(frame);
        }

        Ok(frame_count)
    }

    fn on_render_needed(
        &self,
        sample_count: usize,
        bytes_per_sample: usize,
        num_channels: usize,
        sample_rate_hz: u32,
        out: &mut [i16],
    ) -> Result<RenderInfo, TapError> {
        let required = sample_count * num_channels;
        if let Err(e) = check_callback_format(sample_count, bytes_per_sample, num_channels, sample_rate_hz, out.len())
        {
            out.fill(0);
            return Err(e);
        }
        let out = &mut out[..required];

        if let Some(tick) = self.tick_observer() {
            tick.on_before_play_data();
        }

        let mut state = self.render.lock();
        let RenderState {
            resampler,
            mixed,
            rendered,
        } = &mut *state;

        mixed.reset();
        self.play_mixer.mix(num_channels, mixed);
        let info = RenderInfo {
            samples_out: required,
            elapsed_time_ms: mixed.elapsed_time_ms,
            ntp_time_ms: mixed.ntp_time_ms,
        };

        if let Err(e) = self.processor.process_reverse(mixed) {
            log::warn!("Reverse stream processing failed: {}", e);
        }

        rendered.reset();
        rendered.sample_rate_hz = sample_rate_hz;
        rendered.num_channels = num_channels;
        if mixed.is_muted() || mixed.sample_rate_hz == 0 {
            rendered.samples_per_channel = sample_count;
            rendered.data_mut().fill(0);
            rendered.timestamp = mixed.timestamp;
        } else {
            let result = frame_ops::remix_and_resample_frame(mixed, resampler.as_mut(), rendered);
            if let Err(e) = result {
                out.fill(0);
                return Err(e);
            }
        }

        if rendered.len() != required {
            out.fill(0);
            let problem = format!("rendered {} samples, device needs {}", rendered.len(), required);
            debug_assert!(false, "contract violation: {}", problem);
            return Err(TapError::ContractViolation(problem));
        }
        out.copy_from_slice(rendered.data());

        let player_sink = self.player_sink.lock().clone();
        if let Some(sink) = player_sink {
            sink.on_data(rendered);
        }

        Ok(info)
    }
}
