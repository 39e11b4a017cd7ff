//! Error types for the transport, discovery and session layers.
//!
//! A read timeout is deliberately absent: the transport reports it as an
//! empty line, not as an error.

use thiserror::Error;

/// Failures of a single line-oriented serial connection.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The port does not exist, is busy, or access was denied.
    #[error("port {port} unavailable: {source}")]
    PortUnavailable {
        port: String,
        #[source]
        source: serialport::Error,
    },

    #[error("failed to write to serial port: {0}")]
    WriteFailure(#[source] std::io::Error),

    #[error("failed to read from serial port: {0}")]
    ReadFailure(#[source] std::io::Error),

    /// The transport was already closed when an operation was attempted.
    #[error("serial port is closed")]
    Closed,
}

impl TransportError {
    /// Whether the error means the connection is gone (as opposed to a port
    /// that could never be claimed in the first place).
    pub fn is_disconnect(&self) -> bool {
        matches!(
            self,
            TransportError::WriteFailure(_) | TransportError::ReadFailure(_) | TransportError::Closed
        )
    }
}

/// Reasons a connect attempt did not produce a bound connection.
#[derive(Debug, Error)]
pub enum ConnectError {
    /// Every candidate was tried and none answered with the expected identity.
    #[error("no device answered with identity {expected:?} (last seen {seen:?})")]
    NoDeviceFound { expected: String, seen: String },

    /// Discovery matched a port but it could not be reopened for polling.
    #[error("failed to connect to {port}: {source}")]
    PortUnavailable {
        port: String,
        #[source]
        source: TransportError,
    },

    #[error("already connected to {0}")]
    AlreadyConnected(String),

    #[error("failed to start poller: {0}")]
    Worker(#[from] std::io::Error),
}

/// Errors from commands issued against a session.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("not connected")]
    NotConnected,

    /// The poller worker is gone, which happens after a disconnect it has
    /// not yet reported.
    #[error("poller is not running")]
    PollerStopped,
}
