//! Protocol error types.

use thiserror::Error;

/// Errors raised while decoding or building fragments.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("datagram too short for a fragment header: {got} bytes (need {need})")]
    TooShort { got: usize, need: usize },

    #[error("declared total_len {declared} does not match {received} bytes received")]
    LengthMismatch { declared: i16, received: usize },

    #[error("invalid total_len: {0}")]
    InvalidLength(i16),

    #[error("first fragment too short for the message sub-header: total_len {0}")]
    ShortFirstFragment(i16),

    #[error("payload too large: {size} bytes (max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    #[error("MISSING payload of {0} bytes is not a whole number of entries")]
    TruncatedMissingList(usize),

    #[error("expected a {expected} packet, got wire ordinal {ordinal}")]
    WrongOperation {
        expected: &'static str,
        ordinal: i16,
    },
}
