//! Transport error types.

use fragnet_protocol::ProtocolError;
use thiserror::Error;

/// Errors surfaced by the sender primitives and the receiver.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("shutdown requested")]
    ShuttingDown,

    #[error("receive retries exhausted after {attempts} attempts")]
    RetriesExhausted { attempts: u32 },
}
