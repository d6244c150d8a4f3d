//! Fragment wire format.
//!
//! Packet layout (10-byte header, no padding, payload immediately after):
//!
//! ```text
//! +------------+---------+-----------+---------+----------------------+
//! | message_id | channel | total_len | ordinal | payload              |
//! |  4 bytes   | 2 bytes |  2 bytes  | 2 bytes | total_len - 10 bytes |
//! +------------+---------+-----------+---------+----------------------+
//! ```
//!
//! `total_len` counts header and payload together. The ordinal numbers
//! data fragments and carries reserved sentinels for control packets
//! (see [`crate::op`]).
//!
//! Fields are little-endian on the wire. The format this layer replaces
//! transmitted host-native bytes and was only usable between peers with
//! the same representation; fixing little-endian keeps those exact wire
//! bytes on little-endian hosts and gives the format a definition
//! everywhere else.

use crate::error::ProtocolError;
use crate::{
    FRAGMENT_HEADER_SIZE, MAX_FRAGMENT_DATA, MESSAGE_HEADER_SIZE, MIN_FRAGMENT_SIZE,
};
use bytes::{BufMut, Bytes, BytesMut};

/// The fixed 10-byte fragment header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FragmentHeader {
    /// Logical message this fragment belongs to.
    pub message_id: i32,
    /// Multiplexing channel; non-negative for any real peer channel.
    pub channel: i16,
    /// Total packet length, header included.
    pub total_len: i16,
    /// Fragment number, or a control sentinel when negative.
    pub ordinal: i16,
}

impl FragmentHeader {
    /// Reads a header from the front of `buf`.
    pub fn decode(buf: &[u8]) -> Result<Self, ProtocolError> {
        if buf.len() < FRAGMENT_HEADER_SIZE {
            return Err(ProtocolError::TooShort {
                got: buf.len(),
                need: FRAGMENT_HEADER_SIZE,
            });
        }
        Ok(Self {
            message_id: i32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]),
            channel: i16::from_le_bytes([buf[4], buf[5]]),
            total_len: i16::from_le_bytes([buf[6], buf[7]]),
            ordinal: i16::from_le_bytes([buf[8], buf[9]]),
        })
    }

    /// Appends the 10 header bytes to `buf`.
    pub fn encode_into(&self, buf: &mut BytesMut) {
        buf.put_i32_le(self.message_id);
        buf.put_i16_le(self.channel);
        buf.put_i16_le(self.total_len);
        buf.put_i16_le(self.ordinal);
    }

    /// Payload byte count declared by this header.
    pub fn payload_len(&self) -> usize {
        if self.total_len < FRAGMENT_HEADER_SIZE as i16 {
            return 0;
        }
        self.total_len as usize - FRAGMENT_HEADER_SIZE
    }
}

/// Structural validation of one received datagram.
///
/// Rejects packets shorter than the 11-byte floor, packets whose
/// declared `total_len` exceeds what actually arrived or falls below
/// the floor, and first fragments too short to carry the reassembly
/// sub-header. The format has no checksum; this is the only structural
/// check, and it must pass before any payload field is trusted.
///
/// Header-only control packets are 10 bytes and fail the floor by
/// construction: validation is a data-path rule, not a receive rule.
pub fn validate(buf: &[u8], bytes_received: usize) -> bool {
    if bytes_received < MIN_FRAGMENT_SIZE {
        return false;
    }
    let Ok(header) = FragmentHeader::decode(buf) else {
        return false;
    };
    if header.total_len < MIN_FRAGMENT_SIZE as i16
        || header.total_len as usize > bytes_received
    {
        return false;
    }
    if header.ordinal == 0
        && (header.total_len as usize) < MIN_FRAGMENT_SIZE + MESSAGE_HEADER_SIZE
    {
        return false;
    }
    true
}

/// An owned outgoing packet: header plus payload bytes.
#[derive(Debug, Clone)]
pub struct Fragment {
    header: FragmentHeader,
    payload: Bytes,
}

impl Fragment {
    /// Builds data fragment `ordinal` (1 or higher) of a message. The
    /// first fragment carries the reassembly sub-header and is built
    /// with [`Fragment::first`].
    ///
    /// # Panics
    ///
    /// When `ordinal < 1`; that is a caller bug.
    pub fn data(
        message_id: i32,
        channel: i16,
        ordinal: i16,
        payload: Bytes,
    ) -> Result<Self, ProtocolError> {
        assert!(ordinal >= 1, "non-first data fragments have ordinal >= 1");
        if payload.is_empty() {
            return Err(ProtocolError::InvalidLength(FRAGMENT_HEADER_SIZE as i16));
        }
        if payload.len() > MAX_FRAGMENT_DATA {
            return Err(ProtocolError::PayloadTooLarge {
                size: payload.len(),
                max: MAX_FRAGMENT_DATA,
            });
        }
        Ok(Self {
            header: FragmentHeader {
                message_id,
                channel,
                total_len: (FRAGMENT_HEADER_SIZE + payload.len()) as i16,
                ordinal,
            },
            payload,
        })
    }

    /// Builds the first fragment (ordinal 0) of a message. The payload
    /// is prefixed with the reassembly sub-header, whose leading four
    /// bytes carry `message_len`, the byte length of the whole
    /// reassembled message.
    pub fn first(
        message_id: i32,
        channel: i16,
        message_len: i32,
        data: &[u8],
    ) -> Result<Self, ProtocolError> {
        if data.is_empty() {
            return Err(ProtocolError::ShortFirstFragment(
                (FRAGMENT_HEADER_SIZE + MESSAGE_HEADER_SIZE) as i16,
            ));
        }
        if MESSAGE_HEADER_SIZE + data.len() > MAX_FRAGMENT_DATA {
            return Err(ProtocolError::PayloadTooLarge {
                size: MESSAGE_HEADER_SIZE + data.len(),
                max: MAX_FRAGMENT_DATA,
            });
        }
        let mut payload = BytesMut::with_capacity(MESSAGE_HEADER_SIZE + data.len());
        payload.put_i32_le(message_len);
        payload.put_bytes(0, MESSAGE_HEADER_SIZE - 4);
        payload.put_slice(data);
        Ok(Self {
            header: FragmentHeader {
                message_id,
                channel,
                total_len: (FRAGMENT_HEADER_SIZE + MESSAGE_HEADER_SIZE + data.len()) as i16,
                ordinal: 0,
            },
            payload: payload.freeze(),
        })
    }

    /// Header-only packet carrying a control sentinel in the ordinal.
    pub fn control(message_id: i32, channel: i16, ordinal: i16) -> Self {
        Self {
            header: FragmentHeader {
                message_id,
                channel,
                total_len: FRAGMENT_HEADER_SIZE as i16,
                ordinal,
            },
            payload: Bytes::new(),
        }
    }

    /// ACK packet confirming full receipt of `message_id`.
    pub fn ack(message_id: i32, channel: i16) -> Self {
        Self::control(message_id, channel, crate::op::ACK_ORDINAL)
    }

    /// RESET packet clearing channel-local sequence state. The
    /// message-id field carries no meaning and is set to -1.
    pub fn reset(channel: i16) -> Self {
        Self::control(-1, channel, crate::op::RESET_ORDINAL)
    }

    /// REQUESTACK packet soliciting an ACK/MISSING report starting at
    /// `fragment_no`.
    pub fn request_ack(message_id: i32, channel: i16, fragment_no: i16) -> Self {
        let ordinal = crate::op::FragmentOp::RequestAck {
            fragment: fragment_no,
        }
        .wire_ordinal();
        Self::control(message_id, channel, ordinal)
    }

    /// MISSING packet listing fragment numbers not yet received, in the
    /// order given. At most [`crate::MAX_MISSING_IDS`] entries go on the
    /// wire; anything beyond is dropped here, not queued.
    pub fn missing(message_id: i32, channel: i16, ids: &[i16]) -> Self {
        let n = ids.len().min(crate::MAX_MISSING_IDS);
        let mut payload = BytesMut::with_capacity(n * 2);
        for id in &ids[..n] {
            payload.put_i16_le(*id);
        }
        Self {
            header: FragmentHeader {
                message_id,
                channel,
                total_len: (FRAGMENT_HEADER_SIZE + n * 2) as i16,
                ordinal: crate::op::MISSING_ORDINAL,
            },
            payload: payload.freeze(),
        }
    }

    pub fn header(&self) -> &FragmentHeader {
        &self.header
    }

    pub fn message_id(&self) -> i32 {
        self.header.message_id
    }

    pub fn channel(&self) -> i16 {
        self.header.channel
    }

    pub fn ordinal(&self) -> i16 {
        self.header.ordinal
    }

    pub fn total_len(&self) -> i16 {
        self.header.total_len
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Serializes the packet into its wire bytes.
    pub fn encode(&self) -> BytesMut {
        let mut buf = BytesMut::with_capacity(self.header.total_len as usize);
        self.header.encode_into(&mut buf);
        buf.put_slice(&self.payload);
        debug_assert_eq!(buf.len(), self.header.total_len as usize);
        buf
    }
}
