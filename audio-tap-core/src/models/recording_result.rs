use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// A finished raw PCM remix file.
#[derive(Debug, Clone, PartialEq)]
pub struct RemixRecording {
    pub file_path: PathBuf,
    pub duration_secs: f64,
    pub metadata: RecordingMetadata,
    pub checksum: String,
}

/// Sidecar description of a raw PCM file.
///
/// The PCM itself carries no header, so readers need this to interpret it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingMetadata {
    pub id: String,
    pub created_at: String,
    pub file_path: String,
    pub sample_rate_hz: u32,
    pub num_channels: usize,
    pub sample_format: String,
    pub frames_written: u64,
    pub duration_secs: f64,
    pub checksum: String,
}

impl RecordingMetadata {
    /// `sample_format` of little-endian 16-bit interleaved PCM.
    pub const PCM16_FORMAT: &'static str = "s16le";

    /// Metadata for a little-endian 16-bit interleaved PCM file.
    pub fn new_pcm16(
        file_path: &str,
        sample_rate_hz: u32,
        num_channels: usize,
        frames_written: u64,
        duration_secs: f64,
        checksum: &str,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
            file_path: file_path.to_string(),
            sample_rate_hz,
            num_channels,
            sample_format: Self::PCM16_FORMAT.to_string(),
            frames_written,
            duration_secs,
            checksum: checksum.to_string(),
        }
    }
}
