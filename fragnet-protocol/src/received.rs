//! Owned wrapper around one received datagram.

use crate::error::ProtocolError;
use crate::fragment::FragmentHeader;
use crate::op::FragmentOp;
use crate::{FRAGMENT_HEADER_SIZE, MESSAGE_HEADER_SIZE};
use bytes::BytesMut;

/// One received fragment: the datagram's bytes, the decoded header, and
/// the classified operation.
///
/// The wrapper exclusively owns the receive buffer; dropping the
/// wrapper releases the storage. The wire ordinal is kept alongside the
/// classified operation, so a REQUESTACK packet exposes both the raw
/// sentinel and the decoded fragment number without any rewrite of the
/// received bytes.
#[derive(Debug)]
pub struct ReceivedFragment {
    buf: BytesMut,
    header: FragmentHeader,
    op: FragmentOp,
}

impl ReceivedFragment {
    /// Wraps a receive buffer whose length is exactly the datagram's
    /// byte count. The declared `total_len` must match that count; a
    /// mismatch means a bug or on-the-wire corruption and is never
    /// trusted.
    pub fn new(buf: BytesMut) -> Result<Self, ProtocolError> {
        let header = FragmentHeader::decode(&buf)?;
        if header.total_len < FRAGMENT_HEADER_SIZE as i16 {
            return Err(ProtocolError::InvalidLength(header.total_len));
        }
        if header.total_len as usize != buf.len() {
            return Err(ProtocolError::LengthMismatch {
                declared: header.total_len,
                received: buf.len(),
            });
        }
        let op = FragmentOp::classify(header.ordinal);
        Ok(Self { buf, header, op })
    }

    /// The classified operation.
    pub fn op(&self) -> FragmentOp {
        self.op
    }

    /// The ordinal exactly as it arrived, sentinel encodings included.
    pub fn wire_ordinal(&self) -> i16 {
        self.header.ordinal
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

    pub fn total_len(&self) -> i16 {
        self.header.total_len
    }

    /// Capacity of the backing storage, in bytes.
    pub fn capacity(&self) -> usize {
        self.buf.capacity()
    }

    /// The payload bytes, borrowed from the receive buffer.
    pub fn payload(&self) -> &[u8] {
        &self.buf[FRAGMENT_HEADER_SIZE..]
    }

    /// The logical fragment number: the ordinal for a data fragment, or
    /// the decoded requested number for a REQUESTACK. Control packets
    /// without a fragment number answer `None`.
    pub fn fragment_no(&self) -> Option<i16> {
        match self.op {
            FragmentOp::Data { ordinal } => Some(ordinal),
            FragmentOp::RequestAck { fragment } => Some(fragment),
            _ => None,
        }
    }

    /// Runs structural validation over the received bytes, as required
    /// before trusting a data fragment's payload.
    pub fn validate(&self) -> bool {
        crate::fragment::validate(&self.buf, self.buf.len())
    }

    /// Parses a MISSING payload into its fragment numbers, in wire
    /// order.
    pub fn missing_ids(&self) -> Result<Vec<i16>, ProtocolError> {
        if self.op != FragmentOp::Missing {
            return Err(ProtocolError::WrongOperation {
                expected: "MISSING",
                ordinal: self.header.ordinal,
            });
        }
        let payload = self.payload();
        if payload.len() % 2 != 0 {
            return Err(ProtocolError::TruncatedMissingList(payload.len()));
        }
        Ok(payload
            .chunks_exact(2)
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
            .collect())
    }

    /// Reads the reassembled-message length from a first fragment's
    /// sub-header.
    pub fn message_len(&self) -> Result<i32, ProtocolError> {
        if self.op != (FragmentOp::Data { ordinal: 0 }) {
            return Err(ProtocolError::WrongOperation {
                expected: "first data",
                ordinal: self.header.ordinal,
            });
        }
        let payload = self.payload();
        if payload.len() < MESSAGE_HEADER_SIZE {
            return Err(ProtocolError::ShortFirstFragment(self.header.total_len));
        }
        Ok(i32::from_le_bytes([
            payload[0], payload[1], payload[2], payload[3],
        ]))
    }
}
