//! Device error types.

use thiserror::Error;

/// A device operation failed or broke its contract.
///
/// Device errors abort the current slide's workflow only; the orchestrator
/// reports them in the per-slide summary and continues with the next slide.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DeviceError {
    /// The operation itself failed (hardware fault, rejected command, ...).
    #[error("{device}.{action} failed: {detail}")]
    Fault {
        device: &'static str,
        action: &'static str,
        detail: String,
    },

    /// The backend returned a result outside the operation's contract,
    /// e.g. a remote evaluation result that is not a boolean. Never
    /// coerced - always surfaced as an error.
    #[error("{device} returned a response outside its contract: {detail}")]
    InvalidResponse {
        device: &'static str,
        detail: String,
    },
}

impl DeviceError {
    /// Construct a [`DeviceError::Fault`].
    pub fn fault(
        device: &'static str,
        action: &'static str,
        detail: impl Into<String>,
    ) -> Self {
        Self::Fault {
            device,
            action,
            detail: detail.into(),
        }
    }
}
