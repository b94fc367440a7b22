use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::models::error::TapError;
use crate::models::frame::{AudioFrame, FRAME_DURATION_MS};
use crate::models::recording_result::{RecordingMetadata, RemixRecording};
use crate::storage::metadata;

/// Streaming writer for headerless little-endian 16-bit PCM.
///
/// ## File Format
///
/// ```text
/// [s16le interleaved samples...]
/// ```
///
/// The format travels in a `.metadata.json` sidecar written on close.
pub struct PcmFileWriter {
    file_path: PathBuf,
    sample_rate_hz: u32,
    num_channels: usize,
    file: Option<BufWriter<File>>,
    bytes_written: u64,
    frames_written: u64,
}

impl PcmFileWriter {
    pub fn new(file_path: PathBuf, sample_rate_hz: u32, num_channels: usize) -> Self {
        Self {
            file_path,
            sample_rate_hz,
            num_channels,
            file: None,
            bytes_written: 0,
            frames_written: 0,
        }
    }

    /// Create (or truncate) the output file.
    pub fn open(&mut self) -> Result<(), TapError> {
        if self.file.is_some() {
            return Ok(());
        }

        if let Some(parent) = self.file_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .map_err(|e| TapError::StorageError(format!("failed to create directory: {}", e)))?;
            }
        }

        let file = File::create(&self.file_path)
            .map_err(|e| TapError::StorageError(format!("failed to create file: {}", e)))?;
        self.file = Some(BufWriter::new(file));
        self.bytes_written = 0;
        self.frames_written = 0;
        Ok(())
    }

    pub fn is_open(&self) -> bool {
        self.file.is_some()
    }

    /// Append one frame. Its format must match the writer's.
    pub fn write_frame(&mut self, frame: &AudioFrame) -> Result<(), TapError> {
        if frame.sample_rate_hz != self.sample_rate_hz || frame.num_channels != self.num_channels {
            return Err(TapError::StorageError(format!(
                "frame format {} Hz / {} ch does not match file format {} Hz / {} ch",
                frame.sample_rate_hz, frame.num_channels, self.sample_rate_hz, self.num_channels
            )));
        }
        self.write_samples(frame.data())?;
        self.frames_written += 1;
        Ok(())
    }

    /// Append raw interleaved samples.
    pub fn write_samples(&mut self, samples: &[i16]) -> Result<(), TapError> {
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| TapError::StorageError("file is not open for writing".into()))?;

        for sample in samples {
            file.write_all(&sample.to_le_bytes())
                .map_err(|e| TapError::StorageError(format!("write failed: {}", e)))?;
        }
        self.bytes_written += (samples.len() * std::mem::size_of::<i16>()) as u64;
        Ok(())
    }

    /// Flush and close the file, checksum it and write the metadata sidecar.
    pub fn close(&mut self) -> Result<RemixRecording, TapError> {
        let mut file = self
            .file
            .take()
            .ok_or_else(|| TapError::StorageError("file is not open".into()))?;
        file.flush().map_err(|e| TapError::StorageError(e.to_string()))?;
        drop(file);

        let checksum = sha256_file(&self.file_path)?;
        let duration_secs = (self.frames_written * FRAME_DURATION_MS as u64) as f64 / 1000.0;
        let metadata = RecordingMetadata::new_pcm16(
            &self.file_path.to_string_lossy(),
            self.sample_rate_hz,
            self.num_channels,
            self.frames_written,
            duration_secs,
            &checksum,
        );
        metadata::write_metadata(&metadata, &self.file_path)?;

        Ok(RemixRecording {
            file_path: self.file_path.clone(),
            duration_secs,
            metadata,
            checksum,
        })
    }

    /// PCM bytes written since open.
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }
}

/// SHA-256 hex digest of a file.
fn sha256_file(path: &Path) -> Result<String, TapError> {
    let data =
        fs::read(path).map_err(|e| TapError::StorageError(format!("failed to read file for checksum: {}", e)))?;
    let digest = Sha256::digest(&data);
    Ok(hex_encode(&digest))
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_file_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("audio_tap_writer_test_{}_{}", std::process::id(), name))
    }

    #[test]
    fn writes_little_endian_samples() {
        let path = temp_file_path("le.pcm");
        let mut writer = PcmFileWriter::new(path.clone(), 8000, 1);
        writer.open().unwrap();

        let frame = AudioFrame::from_interleaved(0, &[0x0102; 80], 80, 8000, 1);
        writer.write_frame(&frame).unwrap();
        writer.write_frame(&frame).unwrap();
        let recording = writer.close().unwrap();

        let data = fs::read(&path).unwrap();
        assert_eq!(data.len(), 2 * 80 * 2);
        assert_eq!(&data[..2], &[0x02, 0x01]);
        assert_eq!(recording.metadata.frames_written, 2);
        assert!((recording.duration_secs - 0.02).abs() < 1e-9);

        fs::remove_file(&path).ok();
        fs::remove_file(metadata::sidecar_path(&path)).ok();
    }

    #[test]
    fn raw_samples_are_counted_and_encoded_in_order() {
        let path = temp_file_path("raw.pcm");
        let mut writer = PcmFileWriter::new(path.clone(), 8000, 1);
        writer.open().unwrap();

        writer.write_samples(&[-2, i16::MAX, 1]).unwrap();
        writer.write_samples(&[]).unwrap();
        assert_eq!(writer.bytes_written(), 6);
        writer.close().unwrap();

        assert_eq!(fs::read(&path).unwrap(), vec![0xfe, 0xff, 0xff, 0x7f, 0x01, 0x00]);
        fs::remove_file(&path).ok();
        fs::remove_file(metadata::sidecar_path(&path)).ok();
    }

    #[test]
    fn checksum_and_sidecar() {
        let path = temp_file_path("sidecar.pcm");
        let mut writer = PcmFileWriter::new(path.clone(), 48000, 2);
        writer.open().unwrap();
        writer.write_samples(&[0; 960]).unwrap();
        let recording = writer.close().unwrap();

        assert_eq!(recording.checksum.len(), 64);
        let sidecar = metadata::read_metadata(&path).unwrap();
        assert_eq!(sidecar, recording.metadata);
        assert_eq!(sidecar.sample_format, "s16le");
        assert_eq!(sidecar.num_channels, 2);

        fs::remove_file(&path).ok();
        fs::remove_file(metadata::sidecar_path(&path)).ok();
    }

    #[test]
    fn mismatched_frame_is_rejected() {
        let path = temp_file_path("mismatch.pcm");
        let mut writer = PcmFileWriter::new(path.clone(), 48000, 1);
        writer.open().unwrap();

        let frame = AudioFrame::muted(16000, 1);
        assert!(matches!(writer.write_frame(&frame), Err(TapError::StorageError(_))));
        assert_eq!(writer.bytes_written(), 0);

        writer.close().unwrap();
        fs::remove_file(&path).ok();
        fs::remove_file(metadata::sidecar_path(&path)).ok();
    }

    #[test]
    fn write_before_open_fails() {
        let mut writer = PcmFileWriter::new(temp_file_path("closed.pcm"), 8000, 1);
        assert!(writer.write_samples(&[1, 2]).is_err());
        assert!(writer.close().is_err());
    }
}
