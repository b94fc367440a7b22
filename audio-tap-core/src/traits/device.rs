use std::sync::Arc;

use crate::models::error::TapError;
use crate::traits::transport::AudioTransport;

/// Platform audio device: owns the hardware callback thread.
///
/// Start/stop calls are idempotent. Init failures surface as
/// [`TapError::ResourceUnavailable`].
pub trait DeviceDriver: Send + Sync {
    /// Install the transport the device calls from its real-time thread.
    fn register_audio_callback(&self, transport: Arc<dyn AudioTransport>);

    fn init_playout(&self) -> Result<(), TapError>;
    fn start_playout(&self) -> Result<(), TapError>;
    fn stop_playout(&self) -> Result<(), TapError>;
    fn playing(&self) -> bool;

    fn init_recording(&self) -> Result<(), TapError>;
    fn start_recording(&self) -> Result<(), TapError>;
    fn stop_recording(&self) -> Result<(), TapError>;
    fn recording(&self) -> bool;

    /// Whether the device performs echo cancellation itself, which couples
    /// the playout and recording lifecycles.
    fn built_in_aec_is_available(&self) -> bool;
}
