//! Classification of the fragment ordinal.
//!
//! The ordinal overloads one i16: non-negative values number data
//! fragments, and the most negative values are reserved sentinels for
//! the control operations. Classification is total; every possible
//! ordinal maps to exactly one operation, independent of the other
//! header fields.

/// Ordinal sentinel for ACK packets.
pub const ACK_ORDINAL: i16 = -32768;

/// Ordinal sentinel for MISSING packets.
pub const MISSING_ORDINAL: i16 = -32767;

/// Ordinal sentinel for RESET packets.
pub const RESET_ORDINAL: i16 = -32766;

/// One classified fragment operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FragmentOp {
    /// Fragment number `ordinal` of a message.
    Data { ordinal: i16 },
    /// Confirms full receipt of a message on the sender's channel.
    Ack,
    /// Reports fragment numbers not yet received; they ride in the
    /// payload as consecutive i16 values.
    Missing,
    /// Clears channel-local sequence-tracking state.
    Reset,
    /// Asks the peer to answer with ACK or MISSING, starting its report
    /// at `fragment`.
    RequestAck { fragment: i16 },
}

impl FragmentOp {
    /// Maps a wire ordinal to its operation.
    pub fn classify(ordinal: i16) -> Self {
        match ordinal {
            o if o >= 0 => FragmentOp::Data { ordinal: o },
            ACK_ORDINAL => FragmentOp::Ack,
            MISSING_ORDINAL => FragmentOp::Missing,
            RESET_ORDINAL => FragmentOp::Reset,
            v => FragmentOp::RequestAck {
                fragment: -(v + 1),
            },
        }
    }

    /// The wire ordinal encoding this operation; the exact inverse of
    /// [`classify`](Self::classify).
    ///
    /// RequestAck fragment numbers above 32764 are not encodable: their
    /// wire values would collide with the reserved sentinels.
    pub fn wire_ordinal(&self) -> i16 {
        match *self {
            FragmentOp::Data { ordinal } => {
                debug_assert!(ordinal >= 0);
                ordinal
            }
            FragmentOp::Ack => ACK_ORDINAL,
            FragmentOp::Missing => MISSING_ORDINAL,
            FragmentOp::Reset => RESET_ORDINAL,
            FragmentOp::RequestAck { fragment } => {
                debug_assert!((0..=32764).contains(&fragment));
                -(fragment + 1)
            }
        }
    }

    /// Whether this is one of the four control operations.
    pub fn is_control(&self) -> bool {
        !matches!(self, FragmentOp::Data { .. })
    }
}
