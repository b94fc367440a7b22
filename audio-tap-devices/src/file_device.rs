//! Device driver backed by raw PCM files.
//!
//! Capture reads 10ms blocks from the input file and hands them to the
//! registered transport; playout pulls rendered audio and appends it to the
//! output file. Each direction runs on its own clocked thread.

use std::fs::{self, File};
use std::io::{BufWriter, Read, Write};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use audio_tap_core::models::error::TapError;
use audio_tap_core::models::frame::{samples_per_channel_for, FRAME_DURATION_MS};
use audio_tap_core::processing::cadence::{Signal, TickClock};
use audio_tap_core::processing::realtime::enable_time_critical_priority;
use audio_tap_core::processing::worker::Worker;
use audio_tap_core::traits::device::DeviceDriver;
use audio_tap_core::traits::transport::AudioTransport;

use crate::config::FileDeviceConfiguration;

const BYTES_PER_SAMPLE: usize = 2;

fn tick_interval() -> Duration {
    Duration::from_millis(FRAME_DURATION_MS as u64)
}

/// A [`DeviceDriver`] that needs no audio hardware.
///
/// Input past the end of the file is silence. Start and stop are idempotent;
/// starting a direction that was never initialized initializes it first.
pub struct FileAudioDevice {
    config: FileDeviceConfiguration,
    transport: Mutex<Option<Arc<dyn AudioTransport>>>,
    playout_initialized: AtomicBool,
    recording_initialized: AtomicBool,
    playout: Mutex<Option<Worker<()>>>,
    recording: Mutex<Option<Worker<()>>>,
}

impl FileAudioDevice {
    pub fn new(config: FileDeviceConfiguration) -> Self {
        Self {
            config,
            transport: Mutex::new(None),
            playout_initialized: AtomicBool::new(false),
            recording_initialized: AtomicBool::new(false),
            playout: Mutex::new(None),
            recording: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &FileDeviceConfiguration {
        &self.config
    }

    fn registered_transport(&self) -> Result<Arc<dyn AudioTransport>, TapError> {
        self.transport
            .lock()
            .clone()
            .ok_or_else(|| TapError::ResourceUnavailable("no audio callback registered".into()))
    }

    fn validate(&self) -> Result<(), TapError> {
        self.config.validate().map_err(TapError::ConfigurationFailed)
    }

    fn stop_worker(&self, slot: &Mutex<Option<Worker<()>>>, direction: &str) -> Result<(), TapError> {
        let Some(worker) = slot.lock().take() else {
            return Ok(());
        };
        worker.stop(self.config.stop_timeout)?;
        log::info!("File device {} stopped", direction);
        Ok(())
    }
}

fn is_active(slot: &Mutex<Option<Worker<()>>>) -> bool {
    slot.lock().as_ref().is_some_and(|w| !w.is_finished())
}

impl DeviceDriver for FileAudioDevice {
    fn register_audio_callback(&self, transport: Arc<dyn AudioTransport>) {
        *self.transport.lock() = Some(transport);
    }

    fn init_playout(&self) -> Result<(), TapError> {
        self.validate()?;
        if let Some(path) = &self.config.output_path {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent).map_err(|e| {
                    TapError::ResourceUnavailable(format!("failed to create {}: {}", parent.display(), e))
                })?;
            }
        }
        self.playout_initialized.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn start_playout(&self) -> Result<(), TapError> {
        let mut slot = self.playout.lock();
        if slot.as_ref().is_some_and(|w| !w.is_finished()) {
            return Ok(());
        }
        if !self.playout_initialized.load(Ordering::SeqCst) {
            self.init_playout()?;
        }
        let transport = self.registered_transport()?;
        let output = match &self.config.output_path {
            Some(path) => Some(open_output(path)?),
            None => None,
        };

        let rate = self.config.playout_sample_rate_hz;
        let channels = self.config.playout_channels;
        let worker = Worker::spawn("file-device-playout", move |shutdown| {
            playout_loop(shutdown, transport.as_ref(), output, rate, channels)
        })?;
        *slot = Some(worker);

        log::info!("File device playout started at {} Hz / {} ch", rate, channels);
        Ok(())
    }

    fn stop_playout(&self) -> Result<(), TapError> {
        self.stop_worker(&self.playout, "playout")
    }

    fn playing(&self) -> bool {
        is_active(&self.playout)
    }

    fn init_recording(&self) -> Result<(), TapError> {
        self.validate()?;
        if let Some(path) = &self.config.input_path {
            if !path.is_file() {
                return Err(TapError::ResourceUnavailable(format!(
                    "input file {} does not exist",
                    path.display()
                )));
            }
        }
        self.recording_initialized.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn start_recording(&self) -> Result<(), TapError> {
        let mut slot = self.recording.lock();
        if slot.as_ref().is_some_and(|w| !w.is_finished()) {
            return Ok(());
        }
        if !self.recording_initialized.load(Ordering::SeqCst) {
            self.init_recording()?;
        }
        let transport = self.registered_transport()?;
        let input = match &self.config.input_path {
            Some(path) => Some(File::open(path).map_err(|e| {
                TapError::ResourceUnavailable(format!("failed to open {}: {}", path.display(), e))
            })?),
            None => None,
        };

        let rate = self.config.capture_sample_rate_hz;
        let channels = self.config.capture_channels;
        let worker = Worker::spawn("file-device-capture", move |shutdown| {
            capture_loop(shutdown, transport.as_ref(), input, rate, channels)
        })?;
        *slot = Some(worker);

        log::info!("File device recording started at {} Hz / {} ch", rate, channels);
        Ok(())
    }

    fn stop_recording(&self) -> Result<(), TapError> {
        self.stop_worker(&self.recording, "recording")
    }

    fn recording(&self) -> bool {
        is_active(&self.recording)
    }

    fn built_in_aec_is_available(&self) -> bool {
        self.config.built_in_aec
    }
}

impl Drop for FileAudioDevice {
    fn drop(&mut self) {
        if let Err(e) = self.stop_recording() {
            log::error!("File device recording did not stop: {}", e);
        }
        if let Err(e) = self.stop_playout() {
            log::error!("File device playout did not stop: {}", e);
        }
    }
}

fn open_output(path: &Path) -> Result<BufWriter<File>, TapError> {
    File::create(path)
        .map(BufWriter::new)
        .map_err(|e| TapError::ResourceUnavailable(format!("failed to create {}: {}", path.display(), e)))
}

/// Fill `buf` from `input`, zero-filling whatever the file can no longer supply.
fn read_block(input: &mut Option<File>, buf: &mut [u8]) {
    let mut filled = 0;
    let mut exhausted = false;
    if let Some(file) = input.as_mut() {
        while filled < buf.len() {
            match file.read(&mut buf[filled..]) {
                Ok(0) => {
                    log::info!("File device input exhausted, capturing silence");
                    exhausted = true;
                    break;
                }
                Ok(n) => filled += n,
                Err(e) => {
                    log::error!("File device input read failed, capturing silence: {}", e);
                    exhausted = true;
                    break;
                }
            }
        }
    }
    if exhausted {
        *input = None;
    }
    buf[filled..].fill(0);
}

/// Capture thread body.
///
/// Sequence:
/// 1. Raise the thread to time-critical priority
/// 2. Every 10ms, read one block (silence past the end of the input)
/// 3. Deliver it through `on_capture_available`
fn capture_loop(
    shutdown: &Signal,
    transport: &dyn AudioTransport,
    mut input: Option<File>,
    sample_rate_hz: u32,
    num_channels: usize,
) {
    let _priority = enable_time_critical_priority();

    let frame_count = samples_per_channel_for(sample_rate_hz);
    let mut bytes = vec![0u8; frame_count * num_channels * BYTES_PER_SAMPLE];
    let mut samples = vec![0i16; frame_count * num_channels];
    let mut clock = TickClock::new(Instant::now(), tick_interval());
    let mut failures = 0u64;

    while clock.wait_next(shutdown) {
        read_block(&mut input, &mut bytes);
        for (sample, b) in samples.iter_mut().zip(bytes.chunks_exact(BYTES_PER_SAMPLE)) {
            *sample = i16::from_le_bytes([b[0], b[1]]);
        }

        if let Err(e) = transport.on_capture_available(
            &samples,
            frame_count,
            BYTES_PER_SAMPLE * num_channels,
            num_channels,
            sample_rate_hz,
            0,
            false,
        ) {
            if failures == 0 {
                log::warn!("File device capture delivery failed: {}", e);
            }
            failures += 1;
        }
    }

    if failures > 0 {
        log::warn!("File device capture had {} failed deliveries", failures);
    }
}

/// Playout thread body: pull one 10ms block per tick and append it to the
/// output file.
fn playout_loop(
    shutdown: &Signal,
    transport: &dyn AudioTransport,
    mut output: Option<BufWriter<File>>,
    sample_rate_hz: u32,
    num_channels: usize,
) {
    let _priority = enable_time_critical_priority();

    let frame_count = samples_per_channel_for(sample_rate_hz);
    let mut samples = vec![0i16; frame_count * num_channels];
    let mut clock = TickClock::new(Instant::now(), tick_interval());
    let mut failures = 0u64;

    while clock.wait_next(shutdown) {
        // A failed pull leaves zeros in the buffer, which are still written
        // so the output keeps real-time length.
        if let Err(e) = transport.on_render_needed(
            frame_count,
            BYTES_PER_SAMPLE * num_channels,
            num_channels,
            sample_rate_hz,
            &mut samples,
        ) {
            if failures == 0 {
                log::warn!("File device render pull failed: {}", e);
            }
            failures += 1;
        }

        if let Some(writer) = output.as_mut() {
            let bytes: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
            if let Err(e) = writer.write_all(&bytes) {
                log::error!("File device output write failed, discarding playout: {}", e);
                output = None;
            }
        }
    }

    if let Some(mut writer) = output {
        if let Err(e) = writer.flush() {
            log::error!("File device output flush failed: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::thread;

    use audio_tap_core::traits::transport::RenderInfo;

    use super::*;

    #[derive(Default)]
    struct RecordingTransport {
        captured: Mutex<Vec<Vec<i16>>>,
        capture_format: Mutex<Option<(usize, usize, u32)>>,
        renders: Mutex<usize>,
    }

    impl AudioTransport for RecordingTransport {
        fn on_capture_available(
            &self,
            data: &[i16],
            frame_count: usize,
            _bytes_per_sample: usize,
            num_channels: usize,
            sample_rate_hz: u32,
            _delay_ms: u32,
            _key_pressed: bool,
        ) -> Result<usize, TapError> {
            *self.capture_format.lock() = Some((frame_count, num_channels, sample_rate_hz));
            self.captured.lock().push(data.to_vec());
            Ok(frame_count)
        }

        fn on_render_needed(
            &self,
            sample_count: usize,
            _bytes_per_sample: usize,
            num_channels: usize,
            _sample_rate_hz: u32,
            out: &mut [i16],
        ) -> Result<RenderInfo, TapError> {
            out.fill(42);
            *self.renders.lock() += 1;
            Ok(RenderInfo {
                samples_out: sample_count * num_channels,
                ..Default::default()
            })
        }
    }

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("audio_tap_file_device_{}_{}.pcm", std::process::id(), name))
    }

    fn wait_until(deadline: Duration, mut done: impl FnMut() -> bool) -> bool {
        let started = Instant::now();
        while started.elapsed() < deadline {
            if done() {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        done()
    }

    #[test]
    fn start_without_transport_fails() {
        let device = FileAudioDevice::new(FileDeviceConfiguration::default());
        assert!(matches!(device.start_playout(), Err(TapError::ResourceUnavailable(_))));
        assert!(matches!(device.start_recording(), Err(TapError::ResourceUnavailable(_))));
        assert!(!device.playing());
        assert!(!device.recording());
    }

    #[test]
    fn init_recording_requires_input_file() {
        let device = FileAudioDevice::new(FileDeviceConfiguration {
            input_path: Some(temp_path("missing_input")),
            ..Default::default()
        });
        assert!(matches!(device.init_recording(), Err(TapError::ResourceUnavailable(_))));
    }

    #[test]
    fn invalid_config_fails_init() {
        let device = FileAudioDevice::new(FileDeviceConfiguration {
            capture_sample_rate_hz: 44100,
            ..Default::default()
        });
        assert!(matches!(device.init_recording(), Err(TapError::ConfigurationFailed(_))));
    }

    #[test]
    fn capture_reads_input_then_silence() {
        let input = temp_path("capture_input");
        // Two 48kHz mono frames of 7, then EOF.
        let bytes: Vec<u8> = std::iter::repeat(7i16).take(960).flat_map(|s| s.to_le_bytes()).collect();
        fs::write(&input, bytes).unwrap();

        let device = FileAudioDevice::new(FileDeviceConfiguration {
            input_path: Some(input.clone()),
            capture_channels: 1,
            ..Default::default()
        });
        let transport = Arc::new(RecordingTransport::default());
        device.register_audio_callback(transport.clone());
        device.init_recording().unwrap();
        device.start_recording().unwrap();
        assert!(device.recording());

        assert!(wait_until(Duration::from_secs(2), || transport.captured.lock().len() >= 4));
        device.stop_recording().unwrap();
        assert!(!device.recording());

        let captured = transport.captured.lock();
        assert_eq!(*transport.capture_format.lock(), Some((480, 1, 48000)));
        assert!(captured[0].iter().all(|&s| s == 7));
        assert!(captured[1].iter().all(|&s| s == 7));
        assert!(captured[2].iter().all(|&s| s == 0));
        assert_eq!(captured[0].len(), 480);

        fs::remove_file(&input).ok();
    }

    #[test]
    fn playout_appends_rendered_audio() {
        let output = temp_path("playout_output");
        let device = FileAudioDevice::new(FileDeviceConfiguration {
            output_path: Some(output.clone()),
            ..Default::default()
        });
        let transport = Arc::new(RecordingTransport::default());
        device.register_audio_callback(transport.clone());
        device.init_playout().unwrap();
        device.start_playout().unwrap();
        assert!(device.playing());

        assert!(wait_until(Duration::from_secs(2), || *transport.renders.lock() >= 3));
        device.stop_playout().unwrap();

        let renders = *transport.renders.lock();
        let written = fs::read(&output).unwrap();
        // 48kHz stereo: 960 samples, 1920 bytes per frame.
        assert_eq!(written.len(), renders * 1920);
        assert!(written.chunks_exact(2).all(|b| i16::from_le_bytes([b[0], b[1]]) == 42));

        fs::remove_file(&output).ok();
    }

    #[test]
    fn start_and_stop_are_idempotent() {
        let device = FileAudioDevice::new(FileDeviceConfiguration::default());
        device.register_audio_callback(Arc::new(RecordingTransport::default()));

        device.start_playout().unwrap();
        device.start_playout().unwrap();
        assert!(device.playing());
        device.stop_playout().unwrap();
        device.stop_playout().unwrap();
        assert!(!device.playing());
        assert!(device.stop_recording().is_ok());
    }

    #[test]
    fn reports_configured_aec() {
        let device = FileAudioDevice::new(FileDeviceConfiguration {
            built_in_aec: true,
            ..Default::default()
        });
        assert!(device.built_in_aec_is_available());
    }
}
