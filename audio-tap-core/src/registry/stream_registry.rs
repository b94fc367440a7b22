use std::collections::BTreeMap;
use std::sync::Arc;

use crate::models::error::TapError;
use crate::models::stats::AudioInputStats;
use crate::models::stream::{SendProperties, StreamId};
use crate::processing::frame_mixer::FrameMixer;
use crate::processing::linear_resampler::LinearResampler;
use crate::processing::passthrough::PassthroughProcessor;
use crate::registry::coupling::{self, PlayoutDisable};
use crate::registry::null_poller::NullAudioPoller;
use crate::traits::audio_sink::AudioSink;
use crate::traits::device::DeviceDriver;
use crate::traits::mixer::{AudioMixer, MixerSource};
use crate::traits::resampler::Resampler;
use crate::traits::signal_processor::SignalProcessor;
use crate::traits::stream::{FileStream, FrameTick, SendStream};
use crate::traits::transport::AudioTransport;
use crate::transport::bridge::TransportBridge;

/// Collaborators a [`StreamRegistry`] is built from.
pub struct RegistryConfiguration {
    pub device: Arc<dyn DeviceDriver>,
    pub play_mixer: Arc<dyn AudioMixer>,
    pub record_mixer: Arc<dyn AudioMixer>,
    pub processor: Arc<dyn SignalProcessor>,
    pub capture_resampler: Box<dyn Resampler>,
    pub render_resampler: Box<dyn Resampler>,
}

impl RegistryConfiguration {
    /// `device` with the built-in mixer, resampler and a passthrough processor.
    pub fn new(device: Arc<dyn DeviceDriver>) -> Self {
        Self {
            device,
            play_mixer: Arc::new(FrameMixer::new()),
            record_mixer: Arc::new(FrameMixer::new()),
            processor: Arc::new(PassthroughProcessor),
            capture_resampler: Box::new(LinearResampler::new()),
            render_resampler: Box::new(LinearResampler::new()),
        }
    }
}

struct SendingEntry {
    stream: Arc<dyn SendStream>,
    properties: SendProperties,
}

/// Owns the active streams and decides when the device plays and records.
///
/// Device playout runs iff playout is enabled and something receives (or the
/// pacing poller stands in for it); recording runs iff recording is enabled
/// and something sends. Devices with built-in AEC couple the two, see
/// [`coupling`].
pub struct StreamRegistry {
    device: Arc<dyn DeviceDriver>,
    play_mixer: Arc<dyn AudioMixer>,
    record_mixer: Arc<dyn AudioMixer>,
    transport: Arc<TransportBridge>,

    receiving: BTreeMap<StreamId, Arc<dyn MixerSource>>,
    sending: BTreeMap<StreamId, SendingEntry>,
    file_streams: BTreeMap<StreamId, Arc<dyn FileStream>>,

    playout_enabled: bool,
    recording_enabled: bool,
    null_poller: Option<NullAudioPoller>,
}

fn registration_error(error: TapError) -> TapError {
    if cfg!(debug_assertions) {
        log::error!("Stream registry misuse: {}", error);
    }
    error
}

impl StreamRegistry {
    pub fn new(config: RegistryConfiguration) -> Self {
        let transport = Arc::new(TransportBridge::new(
            Arc::clone(&config.play_mixer),
            Arc::clone(&config.record_mixer),
            config.processor,
            config.capture_resampler,
            config.render_resampler,
        ));
        config
            .device
            .register_audio_callback(Arc::clone(&transport) as Arc<dyn AudioTransport>);

        Self {
            device: config.device,
            play_mixer: config.play_mixer,
            record_mixer: config.record_mixer,
            transport,
            receiving: BTreeMap::new(),
            sending: BTreeMap::new(),
            file_streams: BTreeMap::new(),
            playout_enabled: true,
            recording_enabled: true,
            null_poller: None,
        }
    }

    pub fn transport(&self) -> &Arc<TransportBridge> {
        &self.transport
    }

    pub fn playout_enabled(&self) -> bool {
        self.playout_enabled
    }

    pub fn recording_enabled(&self) -> bool {
        self.recording_enabled
    }

    pub fn receiving_stream_count(&self) -> usize {
        self.receiving.len()
    }

    pub fn sending_stream_count(&self) -> usize {
        self.sending.len()
    }

    pub fn file_stream_count(&self) -> usize {
        self.file_streams.len()
    }

    /// Whether the pacing poller is standing in for device playout.
    pub fn is_pacing(&self) -> bool {
        self.null_poller.is_some()
    }

    // --- Receiving streams ---

    pub fn add_receiving_stream(&mut self, stream: Arc<dyn MixerSource>) -> Result<(), TapError> {
        let id = stream.id();
        if self.receiving.contains_key(&id) {
            return Err(registration_error(TapError::DuplicateRegistration(id)));
        }

        if !self.play_mixer.add_source(Arc::clone(&stream)) {
            log::warn!("Play mixer refused receiving stream {}", id);
        }
        self.receiving.insert(id, stream);
        log::debug!("Added receiving stream {} ({} total)", id, self.receiving.len());

        self.init_and_start_playout();
        Ok(())
    }

    pub fn remove_receiving_stream(&mut self, id: StreamId) -> Result<(), TapError> {
        if self.receiving.remove(&id).is_none() {
            return Err(registration_error(TapError::NotRegistered(id)));
        }
        self.play_mixer.remove_source(id);
        log::debug!("Removed receiving stream {} ({} left)", id, self.receiving.len());

        if self.receiving.is_empty() {
            let aec = self.device.built_in_aec_is_available();
            let actions = coupling::on_receivers_emptied(aec, !self.sending.is_empty());
            self.apply(actions);
        }
        Ok(())
    }

    // --- Sending streams ---

    pub fn add_sending_stream(
        &mut self,
        stream: Arc<dyn SendStream>,
        sample_rate_hz: u32,
        num_channels: usize,
    ) -> Result<(), TapError> {
        let id = stream.id();
        if self.sending.contains_key(&id) {
            return Err(registration_error(TapError::DuplicateRegistration(id)));
        }

        let properties = SendProperties {
            sample_rate_hz,
            num_channels,
        };
        self.sending.insert(id, SendingEntry { stream, properties });
        log::debug!(
            "Added sending stream {} at {} Hz / {} ch ({} total)",
            id,
            sample_rate_hz,
            num_channels,
            self.sending.len()
        );
        self.update_transport_with_sending_streams();

        self.init_and_start_recording();
        Ok(())
    }

    pub fn remove_sending_stream(&mut self, id: StreamId) -> Result<(), TapError> {
        if self.sending.remove(&id).is_none() {
            return Err(registration_error(TapError::NotRegistered(id)));
        }
        log::debug!("Removed sending stream {} ({} left)", id, self.sending.len());
        self.update_transport_with_sending_streams();

        if self.sending.is_empty() {
            let aec = self.device.built_in_aec_is_available();
            let actions = coupling::on_senders_emptied(aec, !self.receiving.is_empty());
            self.apply(actions);
        }
        Ok(())
    }

    // --- File streams ---

    pub fn add_file_stream(&mut self, stream: Arc<dyn FileStream>) -> Result<(), TapError> {
        let id = stream.id();
        if self.file_streams.contains_key(&id) {
            return Err(registration_error(TapError::DuplicateRegistration(id)));
        }

        if !self.play_mixer.add_source(stream.play_source()) {
            log::warn!("Play mixer refused file stream {}", id);
        }
        if !self.record_mixer.add_source(stream.record_source()) {
            log::warn!("Record mixer refused file stream {}", id);
        }
        self.file_streams.insert(id, Arc::clone(&stream));
        log::debug!("Added file stream {}", id);

        self.init_and_start_playout();
        self.init_and_start_recording();

        self.transport.register_tick(Some(stream as Arc<dyn FrameTick>));
        Ok(())
    }

    pub fn remove_file_stream(&mut self, id: StreamId) -> Result<(), TapError> {
        let Some(stream) = self.file_streams.remove(&id) else {
            return Err(registration_error(TapError::NotRegistered(id)));
        };

        self.play_mixer.remove_source(stream.play_source().id());
        self.record_mixer.remove_source(stream.record_source().id());
        log::debug!("Removed file stream {}", id);

        // The most recently added remaining file stream takes over the tick.
        let next_tick = self
            .file_streams
            .values()
            .next_back()
            .map(|s| Arc::clone(s) as Arc<dyn FrameTick>);
        self.transport.register_tick(next_tick);
        Ok(())
    }

    // --- Sinks ---

    pub fn add_player_audio_sink(&self, sink: Arc<dyn AudioSink>) {
        self.transport.set_player_sink(Some(sink));
    }

    pub fn remove_player_audio_sink(&self) {
        self.transport.set_player_sink(None);
    }

    pub fn add_record_audio_sink(&self, sink: Arc<dyn AudioSink>) {
        self.transport.set_record_sink(Some(sink));
    }

    pub fn remove_record_audio_sink(&self) {
        self.transport.set_record_sink(None);
    }

    // --- Toggles ---

    pub fn set_playout(&mut self, enabled: bool) {
        log::info!("set_playout({})", enabled);
        if self.playout_enabled == enabled {
            return;
        }

        if enabled {
            self.playout_enabled = true;
            self.null_poller = None;
            if !self.receiving.is_empty() {
                self.start_playout();
            }
            return;
        }

        let aec = self.device.built_in_aec_is_available();
        match coupling::on_disable_playout(aec, !self.sending.is_empty()) {
            PlayoutDisable::Overridden => {
                log::info!("Playout kept enabled: echo cancellation needs it while sending");
            }
            PlayoutDisable::Proceed { stop_recording } => {
                self.playout_enabled = false;
                if stop_recording {
                    self.stop_recording();
                }
                self.stop_playout();
                self.start_pacing();
            }
        }
    }

    pub fn set_recording(&mut self, enabled: bool) {
        log::info!("set_recording({})", enabled);
        if self.recording_enabled == enabled {
            return;
        }
        self.recording_enabled = enabled;

        if !enabled {
            self.stop_recording();
            return;
        }
        if self.sending.is_empty() {
            return;
        }

        let aec = self.device.built_in_aec_is_available();
        if coupling::enable_recording_forces_playout(aec, true) {
            self.init_and_start_playout();
            self.null_poller = None;
            self.playout_enabled = true;
        }
        if let Err(e) = self.device.start_recording() {
            log::error!("Failed to start recording: {}", e);
        }
    }

    pub fn set_stereo_channel_swapping(&self, enable: bool) {
        self.transport.set_stereo_channel_swapping(enable);
    }

    pub fn typing_noise_detected(&self) -> bool {
        self.transport.typing_noise_detected()
    }

    pub fn audio_input_stats(&self) -> AudioInputStats {
        self.transport.audio_input_stats()
    }

    // --- Internal helpers ---

    fn update_transport_with_sending_streams(&self) {
        let properties = SendProperties::aggregate(self.sending.values().map(|e| &e.properties));
        let streams = self.sending.values().map(|e| Arc::clone(&e.stream)).collect();
        self.transport.update_sending_streams(streams, properties);
    }

    fn apply(&self, actions: coupling::DeviceActions) {
        if actions.stop_recording {
            self.stop_recording();
        }
        if actions.stop_playout {
            self.stop_playout();
        }
    }

    fn init_and_start_playout(&self) {
        if self.device.playing() {
            return;
        }
        match self.device.init_playout() {
            Ok(()) => {
                if self.playout_enabled {
                    self.start_playout();
                }
            }
            Err(e) => log::error!("Failed to initialize playout: {}", e),
        }
    }

    fn init_and_start_recording(&self) {
        if self.device.recording() {
            return;
        }
        match self.device.init_recording() {
            Ok(()) => {
                if self.recording_enabled {
                    if coupling::recording_needs_playout(self.device.built_in_aec_is_available()) {
                        self.init_and_start_playout();
                    }
                    if let Err(e) = self.device.start_recording() {
                        log::error!("Failed to start recording: {}", e);
                    }
                }
            }
            Err(e) => log::error!("Failed to initialize recording: {}", e),
        }
    }

    fn start_playout(&self) {
        if let Err(e) = self.device.start_playout() {
            log::error!("Failed to start playout: {}", e);
        }
    }

    fn stop_playout(&self) {
        if let Err(e) = self.device.stop_playout() {
            log::error!("Failed to stop playout: {}", e);
        }
    }

    fn stop_recording(&self) {
        if let Err(e) = self.device.stop_recording() {
            log::error!("Failed to stop recording: {}", e);
        }
    }

    fn start_pacing(&mut self) {
        match NullAudioPoller::start(Arc::clone(&self.transport) as Arc<dyn AudioTransport>) {
            Ok(poller) => self.null_poller = Some(poller),
            Err(e) => log::error!("Failed to start null audio poller: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::frame::AudioFrame;
    use crate::processing::frame_source::FrameSource;
    use crate::testing::FakeDevice;

    struct NullSender(StreamId);

    impl SendStream for NullSender {
        fn id(&self) -> StreamId {
            self.0
        }

        fn send_audio_data(&self, _frame: AudioFrame) {}
    }

    fn sender() -> Arc<NullSender> {
        Arc::new(NullSender(StreamId::next()))
    }

    fn registry(device: &Arc<FakeDevice>) -> StreamRegistry {
        StreamRegistry::new(RegistryConfiguration::new(device.clone()))
    }

    #[test]
    fn construction_registers_transport() {
        let device = Arc::new(FakeDevice::default());
        let registry = registry(&device);
        assert_eq!(device.calls(), vec!["register"]);
        assert!(device.transport().is_some());
        assert!(registry.playout_enabled());
        assert!(registry.recording_enabled());
        assert!(!registry.is_pacing());
    }

    #[test]
    fn receiving_stream_starts_and_stops_playout() {
        let device = Arc::new(FakeDevice::default());
        let mut registry = registry(&device);
        let stream = Arc::new(FrameSource::new(48000));

        registry.add_receiving_stream(stream.clone()).unwrap();
        assert!(device.playing());
        assert_eq!(registry.receiving_stream_count(), 1);

        registry.remove_receiving_stream(stream.id()).unwrap();
        assert!(!device.playing());
        assert_eq!(registry.receiving_stream_count(), 0);
    }

    #[test]
    fn duplicate_receiving_stream_is_rejected() {
        let device = Arc::new(FakeDevice::default());
        let mut registry = registry(&device);
        let stream = Arc::new(FrameSource::new(48000));

        registry.add_receiving_stream(stream.clone()).unwrap();
        assert_eq!(
            registry.add_receiving_stream(stream.clone()),
            Err(TapError::DuplicateRegistration(stream.id()))
        );
        assert_eq!(registry.receiving_stream_count(), 1);
    }

    #[test]
    fn removing_unknown_stream_fails() {
        let device = Arc::new(FakeDevice::default());
        let mut registry = registry(&device);
        let id = StreamId::next();
        assert_eq!(registry.remove_receiving_stream(id), Err(TapError::NotRegistered(id)));
        assert_eq!(registry.remove_sending_stream(id), Err(TapError::NotRegistered(id)));
        assert_eq!(registry.remove_file_stream(id), Err(TapError::NotRegistered(id)));
    }

    #[test]
    fn sending_streams_aggregate_format() {
        let device = Arc::new(FakeDevice::default());
        let mut registry = registry(&device);
        let (a, b) = (sender(), sender());

        registry.add_sending_stream(a.clone(), 16000, 1).unwrap();
        registry.add_sending_stream(b.clone(), 32000, 2).unwrap();
        assert!(device.recording());
        assert_eq!(
            registry.transport().send_properties(),
            SendProperties {
                sample_rate_hz: 32000,
                num_channels: 2
            }
        );

        registry.remove_sending_stream(b.id()).unwrap();
        assert_eq!(registry.transport().send_properties().sample_rate_hz, 16000);
        registry.remove_sending_stream(a.id()).unwrap();
        assert_eq!(registry.transport().send_properties(), SendProperties::FLOOR);
        assert!(!device.recording());
    }

    #[test]
    fn recording_with_aec_brings_up_playout() {
        let device = FakeDevice::with_aec();
        let mut registry = registry(&device);
        registry.add_sending_stream(sender(), 16000, 1).unwrap();

        assert!(device.playing());
        assert!(device.recording());
        let calls = device.calls();
        let playout = calls.iter().position(|c| *c == "start_playout").unwrap();
        let recording = calls.iter().position(|c| *c == "start_recording").unwrap();
        assert!(playout < recording);
    }

    #[test]
    fn aec_keeps_playout_while_sending() {
        let device = FakeDevice::with_aec();
        let mut registry = registry(&device);
        let receiver = Arc::new(FrameSource::new(48000));
        let send = sender();

        registry.add_receiving_stream(receiver.clone()).unwrap();
        registry.add_sending_stream(send.clone(), 16000, 1).unwrap();

        registry.remove_receiving_stream(receiver.id()).unwrap();
        assert!(device.playing());
        assert!(device.recording());

        registry.remove_sending_stream(send.id()).unwrap();
        assert!(!device.playing());
        assert!(!device.recording());
    }

    #[test]
    fn disabling_playout_starts_pacing() {
        let device = Arc::new(FakeDevice::default());
        let mut registry = registry(&device);
        registry.add_receiving_stream(Arc::new(FrameSource::new(48000))).unwrap();

        registry.set_playout(false);
        assert!(!registry.playout_enabled());
        assert!(!device.playing());
        assert!(registry.is_pacing());

        registry.set_playout(true);
        assert!(registry.playout_enabled());
        assert!(device.playing());
        assert!(!registry.is_pacing());
    }

    #[test]
    fn disabling_playout_is_overridden_while_aec_senders_exist() {
        let device = FakeDevice::with_aec();
        let mut registry = registry(&device);
        registry.add_sending_stream(sender(), 16000, 1).unwrap();

        registry.set_playout(false);
        assert!(registry.playout_enabled());
        assert!(device.playing());
        assert!(!registry.is_pacing());
    }

    #[test]
    fn enabling_recording_with_aec_forces_playout() {
        let device = FakeDevice::with_aec();
        let mut registry = registry(&device);
        registry.set_recording(false);
        registry.set_playout(false);
        assert!(registry.is_pacing());

        registry.add_sending_stream(sender(), 16000, 1).unwrap();
        assert!(!device.recording());

        registry.set_recording(true);
        assert!(registry.playout_enabled());
        assert!(!registry.is_pacing());
        assert!(device.recording());
    }

    #[test]
    fn toggles_are_idempotent() {
        let device = Arc::new(FakeDevice::default());
        let mut registry = registry(&device);
        registry.set_recording(true);
        registry.set_playout(true);
        assert_eq!(device.calls(), vec!["register"]);
    }

    #[test]
    fn device_init_failure_does_not_fail_registration() {
        let device = Arc::new(FakeDevice {
            fail_init: true,
            ..Default::default()
        });
        let mut registry = registry(&device);

        assert!(registry.add_receiving_stream(Arc::new(FrameSource::new(48000))).is_ok());
        assert!(registry.add_sending_stream(sender(), 16000, 1).is_ok());
        assert!(!device.playing());
        assert!(!device.recording());
    }
}
