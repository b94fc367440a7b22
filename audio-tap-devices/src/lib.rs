//! # audio-tap-devices
//!
//! Device drivers for audio-tap-kit.
//!
//! Provides:
//! - `FileAudioDevice`: a `DeviceDriver` backed by raw PCM files instead of
//!   audio hardware, clocked at the 10ms device cadence
//!
//! ## Usage
//! ```ignore
//! use std::sync::Arc;
//! use audio_tap_core::{RegistryConfiguration, StreamRegistry};
//! use audio_tap_devices::{FileAudioDevice, FileDeviceConfiguration};
//!
//! let device = Arc::new(FileAudioDevice::new(FileDeviceConfiguration {
//!     input_path: Some("mic.pcm".into()),
//!     output_path: Some("speaker.pcm".into()),
//!     ..Default::default()
//! }));
//! let mut registry = StreamRegistry::new(RegistryConfiguration::new(device));
//! ```

pub mod config;
pub mod file_device;

pub use config::FileDeviceConfiguration;
pub use file_device::FileAudioDevice;
