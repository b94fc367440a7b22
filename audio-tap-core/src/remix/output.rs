use std::path::PathBuf;
use std::sync::Arc;

use crate::models::error::TapError;
use crate::models::frame::AudioFrame;
use crate::models::recording_result::RemixRecording;
use crate::storage::pcm_writer::PcmFileWriter;
use crate::traits::audio_sink::AudioSink;

/// Where a [`RemixEngine`](crate::RemixEngine) delivers combined frames.
#[derive(Clone)]
pub enum RemixOutput {
    /// Append raw little-endian PCM to this file (created or truncated on start).
    File(PathBuf),
    /// Hand each frame to a sink on the engine's worker thread.
    Callback(Arc<dyn AudioSink>),
}

impl RemixOutput {
    pub fn describe(&self) -> String {
        match self {
            Self::File(path) => format!("file {}", path.display()),
            Self::Callback(_) => "callback".to_string(),
        }
    }
}

/// An opened output, owned by the worker for the length of one run.
pub(crate) enum OutputTarget {
    File(PcmFileWriter),
    Callback(Arc<dyn AudioSink>),
}

impl OutputTarget {
    pub(crate) fn open(output: &RemixOutput, sample_rate_hz: u32, num_channels: usize) -> Result<Self, TapError> {
        match output {
            RemixOutput::File(path) => {
                let mut writer = PcmFileWriter::new(path.clone(), sample_rate_hz, num_channels);
                writer.open()?;
                Ok(Self::File(writer))
            }
            RemixOutput::Callback(sink) => Ok(Self::Callback(Arc::clone(sink))),
        }
    }

    pub(crate) fn deliver(&mut self, frame: &AudioFrame) -> Result<(), TapError> {
        match self {
            Self::File(writer) => writer.write_frame(frame),
            Self::Callback(sink) => {
                sink.on_data(frame);
                Ok(())
            }
        }
    }

    /// Close the output. File outputs yield the finished recording.
    pub(crate) fn finish(self) -> Result<Option<RemixRecording>, TapError> {
        match self {
            Self::File(mut writer) => writer.close().map(Some),
            Self::Callback(_) => Ok(None),
        }
    }
}
