//! # fragnet-protocol
//!
//! Wire protocol for fragnet, a fragmented messaging layer over
//! unreliable datagrams.
//!
//! This crate provides:
//! - The fixed-layout 10-byte fragment header and its codec
//! - Structural validation of received packets
//! - Total classification of the ordinal field into data and control
//!   operations
//! - The owned wrapper around one received datagram

pub mod error;
pub mod fragment;
pub mod op;
pub mod received;

pub use error::ProtocolError;
pub use fragment::{validate, Fragment, FragmentHeader};
pub use op::{FragmentOp, ACK_ORDINAL, MISSING_ORDINAL, RESET_ORDINAL};
pub use received::ReceivedFragment;

/// Size of the fixed fragment header in bytes.
pub const FRAGMENT_HEADER_SIZE: usize = 10;

/// Largest datagram this layer sends or expects to receive, bounded by
/// the deployment's safe datagram size.
pub const MAX_FRAGMENT_SIZE: usize = 1480;

/// Largest payload one fragment can carry.
pub const MAX_FRAGMENT_DATA: usize = MAX_FRAGMENT_SIZE - FRAGMENT_HEADER_SIZE;

/// Smallest structurally valid data packet: header plus one payload byte.
/// Header-only control packets sit below this floor on purpose.
pub const MIN_FRAGMENT_SIZE: usize = FRAGMENT_HEADER_SIZE + 1;

/// Byte size of the reassembly layer's sub-header at the front of every
/// first fragment. Its first four bytes carry the total reassembled
/// message length; the remainder is owned by the layer above.
pub const MESSAGE_HEADER_SIZE: usize = 16;

/// Cap on fragment numbers carried by one MISSING packet. Longer lists
/// are truncated on send; the layer above re-requests if state diverges.
pub const MAX_MISSING_IDS: usize = 256;
