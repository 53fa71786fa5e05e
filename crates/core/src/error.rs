use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by the amplifier control layer.
///
/// Transport failures never propagate as panics; every fallible operation
/// returns one of these kinds so the caller can mark the device unavailable
/// instead of crashing.
#[derive(Debug, Error)]
pub enum AmpError {
    /// The BLE stack does not know a connectable device with this address.
    #[error("device {address} not found by the BLE stack")]
    ResolutionFailed { address: String },

    /// The connect attempt did not complete within its bound.
    #[error("connect to {address} timed out after {timeout:?}")]
    ConnectTimeout { address: String, timeout: Duration },

    /// The stack reported a connect error, or a non-connected state after
    /// the attempt finished.
    #[error("connect to {address} failed: {reason}")]
    ConnectFailed { address: String, reason: String },

    /// A characteristic write failed at the transport level.
    #[error("characteristic write failed: {reason}")]
    WriteFailed { reason: String },

    /// Caller contract violation, reported before any I/O happens.
    #[error("invalid command parameter: {0}")]
    InvalidParameter(String),

    /// BLE backend failure outside the connect/write path (adapter missing,
    /// scan refused by the OS, and similar).
    #[error("BLE backend error: {0}")]
    Backend(String),
}
