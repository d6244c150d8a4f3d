//! Diagnostic packet trace.
//!
//! An injectable sink that pretty-prints packet metadata for protocol
//! debugging. A sink owns its synchronization: one event is formatted
//! into a single block and written whole, so concurrent senders never
//! interleave one packet's lines with another's. The default
//! [`NoopTrace`] contributes no cost and no semantics.

use fragnet_protocol::{FragmentHeader, FragmentOp};
use parking_lot::Mutex;
use std::io::Write;
use std::net::SocketAddr;

/// Direction of a traced packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Send,
    Receive,
}

/// Metadata for one sent or received packet.
#[derive(Debug, Clone)]
pub struct TraceEvent<'a> {
    pub direction: Direction,
    pub peer: Option<SocketAddr>,
    pub header: FragmentHeader,
    pub op: FragmentOp,
    /// Set when a send is a retransmission; annotation only.
    pub retransmit: bool,
    /// Leading payload bytes, already clipped by the caller.
    pub payload: &'a [u8],
}

/// Sink for packet trace blocks.
pub trait TraceSink: Send + Sync {
    fn record(&self, event: &TraceEvent<'_>);
}

/// Discards every event.
#[derive(Debug, Default)]
pub struct NoopTrace;

impl TraceSink for NoopTrace {
    fn record(&self, _event: &TraceEvent<'_>) {}
}

/// Writes one contiguous block per packet to stderr.
#[derive(Debug, Default)]
pub struct StderrTrace {
    lock: Mutex<()>,
}

impl StderrTrace {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TraceSink for StderrTrace {
    fn record(&self, event: &TraceEvent<'_>) {
        let block = format_event(event);
        let _guard = self.lock.lock();
        let _ = std::io::stderr().write_all(block.as_bytes());
    }
}

/// Formats the whole trace block for one packet.
///
/// Control packets print their operation label; data fragments print
/// `#ordinal total_len M:message_id` followed by a printable rendering
/// of the leading payload bytes.
pub fn format_event(event: &TraceEvent<'_>) -> String {
    use std::fmt::Write as _;

    let mut out = String::new();
    let arrow = match event.direction {
        Direction::Send => '>',
        Direction::Receive => '<',
    };
    let _ = write!(out, "{} ", arrow);
    match event.op {
        FragmentOp::Ack => {
            let _ = write!(out, "ACK M:{}", event.header.message_id);
        }
        FragmentOp::Missing => {
            let _ = write!(out, "MISSING M:{}", event.header.message_id);
        }
        FragmentOp::Reset => {
            let _ = write!(out, "RESET ch:{}", event.header.channel);
        }
        FragmentOp::RequestAck { fragment } => {
            let _ = write!(out, "REQUESTACK #{} M:{}", fragment, event.header.message_id);
        }
        FragmentOp::Data { ordinal } => {
            let _ = write!(
                out,
                "#{} {} M:{}",
                ordinal, event.header.total_len, event.header.message_id
            );
        }
    }
    if event.retransmit {
        out.push_str(" retran");
    }
    if let Some(peer) = event.peer {
        let _ = write!(out, " {}", peer);
    }
    if !event.op.is_control() && !event.payload.is_empty() {
        out.push_str("\n  ");
        for byte in event.payload {
            if byte.is_ascii_graphic() || *byte == b' ' {
                out.push(*byte as char);
            } else {
                out.push('.');
            }
        }
    }
    out.push('\n');
    out
}
