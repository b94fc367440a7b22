//! JSON sidecar describing a headerless PCM recording.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::models::error::TapError;
use crate::models::recording_result::RecordingMetadata;

/// `remix_1.pcm` → `remix_1.metadata.json`.
pub fn sidecar_path(recording_path: &Path) -> PathBuf {
    recording_path.with_extension("metadata.json")
}

pub fn write_metadata(metadata: &RecordingMetadata, recording_path: &Path) -> Result<(), TapError> {
    let path = sidecar_path(recording_path);
    let file = File::create(&path)
        .map_err(|e| TapError::StorageError(format!("failed to create {}: {}", path.display(), e)))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, metadata)
        .map_err(|e| TapError::StorageError(format!("failed to serialize metadata: {}", e)))?;
    writer
        .flush()
        .map_err(|e| TapError::StorageError(format!("failed to write {}: {}", path.display(), e)))
}

/// Load the sidecar of `recording_path`, rejecting formats other than 16-bit PCM.
pub fn read_metadata(recording_path: &Path) -> Result<RecordingMetadata, TapError> {
    let path = sidecar_path(recording_path);
    let file = File::open(&path)
        .map_err(|e| TapError::StorageError(format!("failed to open {}: {}", path.display(), e)))?;
    let metadata: RecordingMetadata = serde_json::from_reader(BufReader::new(file))
        .map_err(|e| TapError::StorageError(format!("failed to parse {}: {}", path.display(), e)))?;

    if metadata.sample_format != RecordingMetadata::PCM16_FORMAT {
        return Err(TapError::StorageError(format!(
            "unsupported sample format {:?}",
            metadata.sample_format
        )));
    }
    Ok(metadata)
}
