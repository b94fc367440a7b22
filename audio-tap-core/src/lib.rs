//! # audio-tap-core
//!
//! Platform-agnostic live audio tap-and-remix pipeline.
//!
//! A device driver calls the [`TransportBridge`] every 10ms: captured audio is
//! processed and fanned out to sending streams, and playout audio is mixed
//! from receiving streams. The [`StreamRegistry`] owns which streams exist and
//! keeps the device's playout/recording state consistent with them. A
//! [`RemixEngine`] taps both directions into [`TapSink`]s and remixes them on
//! its own clock into a file or a callback.
//!
//! ## Architecture
//!
//! ```text
//! audio-tap-core (this crate)
//! ├── models/       ← AudioFrame, TapError, StreamId, configurations, RemixRecording
//! ├── traits/       ← AudioTransport, DeviceDriver, AudioMixer, SendStream, FileStream, AudioSink
//! ├── processing/   ← FrameMixer, TapSink, resampling, TickClock, Worker, level metering
//! ├── transport/    ← TransportBridge (real-time capture/render path)
//! ├── registry/     ← StreamRegistry, playout/recording coupling, null-audio poller
//! ├── streams/      ← VoiceFileStream (PCM file injected into both directions)
//! ├── remix/        ← RemixEngine and its output targets
//! └── storage/      ← PcmFileWriter, metadata sidecar
//! ```

pub mod models;
pub mod processing;
pub mod registry;
pub mod remix;
pub mod storage;
pub mod streams;
pub mod traits;
pub mod transport;

#[cfg(test)]
mod testing;

// Re-export key types at crate root for convenience.
pub use models::config::{FileStreamConfiguration, RemixConfiguration};
pub use models::error::TapError;
pub use models::frame::{AudioFrame, VadActivity};
pub use models::recording_result::{RecordingMetadata, RemixRecording};
pub use models::state::EngineState;
pub use models::stats::AudioInputStats;
pub use models::stream::{SendProperties, StreamId};
pub use processing::frame_mixer::FrameMixer;
pub use processing::tap_sink::TapSink;
pub use registry::stream_registry::{RegistryConfiguration, StreamRegistry};
pub use remix::engine::RemixEngine;
pub use remix::output::RemixOutput;
pub use storage::pcm_writer::PcmFileWriter;
pub use streams::file_stream::{PlaybackObserver, VoiceFileStream};
pub use traits::audio_sink::AudioSink;
pub use traits::device::DeviceDriver;
pub use traits::mixer::{AudioFrameInfo, AudioMixer, MixerSource};
pub use traits::stream::{FileStream, FrameTick, SendStream};
pub use traits::transport::{AudioTransport, RenderInfo};
pub use transport::bridge::TransportBridge;
