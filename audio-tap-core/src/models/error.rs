use thiserror::Error;

use super::stream::StreamId;

/// Errors surfaced by the tap-and-remix pipeline.
///
/// Registration mismatches and malformed callback parameters are caller bugs;
/// device and storage failures are environmental. An empty tap on a remix tick
/// is not an error at all (silence is substituted).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TapError {
    #[error("stream {0} is already registered")]
    DuplicateRegistration(StreamId),

    #[error("stream {0} is not registered")]
    NotRegistered(StreamId),

    #[error("contract violation: {0}")]
    ContractViolation(String),

    #[error("resource unavailable: {0}")]
    ResourceUnavailable(String),

    #[error("worker did not shut down before the deadline")]
    Timeout,

    #[error("configuration failed: {0}")]
    ConfigurationFailed(String),

    #[error("storage error: {0}")]
    StorageError(String),

    #[error("processing failed: {0}")]
    ProcessingFailed(String),
}

impl TapError {
    /// Whether the error reports a broken caller precondition.
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            Self::DuplicateRegistration(_) | Self::NotRegistered(_) | Self::ContractViolation(_)
        )
    }
}
