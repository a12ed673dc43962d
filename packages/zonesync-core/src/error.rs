//! Centralized error types for the zonesync core library.
//!
//! Two layers of errors exist:
//! - [`TransportError`]: failures reported by the device transport adapter
//!   (defined alongside the [`ZoneTransport`](crate::zone::transport::ZoneTransport) trait)
//! - [`EngineError`]: failures surfaced by the engine's command surface
//!
//! No error in this taxonomy is allowed to terminate the scheduler; transport
//! failures on the polling paths degrade to "no data this cycle" and commands
//! report failure only to their caller.

use thiserror::Error;

use crate::zone::transport::TransportError;
use crate::zone::types::ZoneId;

/// Trait for error types that provide machine-readable error codes.
///
/// Implement this trait to provide consistent error codes across different
/// error conversion paths.
pub trait ErrorCode {
    /// Returns a machine-readable error code.
    fn code(&self) -> &'static str;
}

impl ErrorCode for TransportError {
    fn code(&self) -> &'static str {
        match self {
            Self::Unreachable(_) => "node_unreachable",
            Self::Subscription(_) => "subscription_failed",
            Self::InTransition(_) => "device_in_transition",
            Self::Rejected(_) => "command_rejected",
            Self::Malformed(_) => "malformed_payload",
        }
    }
}

/// Engine-wide error type for the exposed command surface.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The addressed zone exists but is currently marked unavailable.
    #[error("zone {0} is not available")]
    ZoneUnavailable(ZoneId),

    /// The zone index is outside the configured fleet.
    #[error("unknown zone index {0}")]
    UnknownZone(ZoneId),

    /// The device reported a transient transport state (e.g. TRANSITIONING);
    /// the command is rejected rather than retried blindly, to avoid racing
    /// the device's own state machine.
    #[error("device busy, command deferred: {0}")]
    DeviceBusy(String),

    /// The device refused the command.
    #[error("command rejected: {0}")]
    CommandRejected(String),

    /// The caller supplied an invalid argument (unknown favorite name,
    /// out-of-range index, zero step, ...).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The engine's scheduler was started twice.
    #[error("engine is already running")]
    AlreadyRunning,
}

impl EngineError {
    /// Returns a machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::ZoneUnavailable(_) => "zone_unavailable",
            Self::UnknownZone(_) => "unknown_zone",
            Self::DeviceBusy(_) => "device_busy",
            Self::CommandRejected(_) => "command_rejected",
            Self::InvalidRequest(_) => "invalid_request",
            Self::AlreadyRunning => "already_running",
        }
    }
}

impl From<TransportError> for EngineError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::InTransition(msg) => Self::DeviceBusy(msg),
            other => Self::CommandRejected(other.to_string()),
        }
    }
}

/// Convenient Result alias for command-surface operations.
pub type EngineResult<T> = Result<T, EngineError>;

// Re-export the transport Result alias from its defining module
pub use crate::zone::transport::TransportResult;
