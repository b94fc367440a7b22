//! Device lifecycle rules for hardware with built-in echo cancellation.
//!
//! Built-in AEC needs the render stream as its reference, so while anything
//! is being sent the device must keep playing, and recording must not outlive
//! both stream sets. These functions only decide; the registry acts.

/// Device calls the registry must make after a stream-set change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeviceActions {
    pub stop_playout: bool,
    pub stop_recording: bool,
}

/// What to do when the last receiving stream goes away.
pub fn on_receivers_emptied(aec_available: bool, has_senders: bool) -> DeviceActions {
    match (aec_available, has_senders) {
        // Senders still rely on the render reference.
        (true, true) => DeviceActions::default(),
        (true, false) => DeviceActions {
            stop_playout: true,
            stop_recording: true,
        },
        (false, _) => DeviceActions {
            stop_playout: true,
            stop_recording: false,
        },
    }
}

/// What to do when the last sending stream goes away.
pub fn on_senders_emptied(aec_available: bool, has_receivers: bool) -> DeviceActions {
    DeviceActions {
        stop_playout: aec_available && !has_receivers,
        stop_recording: true,
    }
}

/// Outcome of a request to disable playout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayoutDisable {
    /// Playout stays enabled; the request is ignored.
    Overridden,
    /// Stop device playout and start pacing.
    Proceed { stop_recording: bool },
}

pub fn on_disable_playout(aec_available: bool, has_senders: bool) -> PlayoutDisable {
    match (aec_available, has_senders) {
        (true, true) => PlayoutDisable::Overridden,
        (true, false) => PlayoutDisable::Proceed { stop_recording: true },
        (false, _) => PlayoutDisable::Proceed { stop_recording: false },
    }
}

/// Whether enabling recording must also force playout on.
pub fn enable_recording_forces_playout(aec_available: bool, has_senders: bool) -> bool {
    aec_available && has_senders
}

/// Whether starting recording must first bring up playout.
pub fn recording_needs_playout(aec_available: bool) -> bool {
    aec_available
}
