//! Sender primitives.
//!
//! Five operations, each building one fragment-shaped packet and handing
//! it to the transport as a single atomic datagram. ACK and RESET answer
//! the connection's far end; fragment, REQUESTACK and MISSING sends take
//! an explicit target endpoint.

use crate::endpoint::EndPoint;
use crate::error::TransportError;
use crate::socket::Transport;
use crate::trace::{Direction, NoopTrace, TraceEvent, TraceSink};
use fragnet_protocol::{Fragment, FragmentOp, MAX_MISSING_IDS};
use std::net::SocketAddr;
use std::sync::Arc;

/// Trace dumps clip the payload to this many bytes.
const TRACE_PAYLOAD_BYTES: usize = 32;

/// One protocol connection: a shared transport plus the far end it
/// exchanges control packets with.
///
/// Cheap to clone; senders on multiple threads may share one connection.
/// The transport itself is responsible for per-call thread safety.
#[derive(Clone)]
pub struct Connection {
    transport: Arc<dyn Transport>,
    peer: EndPoint,
    trace: Arc<dyn TraceSink>,
}

impl Connection {
    pub fn new(transport: Arc<dyn Transport>, peer: EndPoint) -> Self {
        Self {
            transport,
            peer,
            trace: Arc::new(NoopTrace),
        }
    }

    /// Installs a trace sink; packets flow through it in whole blocks.
    pub fn with_trace(mut self, trace: Arc<dyn TraceSink>) -> Self {
        self.trace = trace;
        self
    }

    pub fn peer(&self) -> &EndPoint {
        &self.peer
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// Transmits an existing fragment unmodified. `retransmit` only
    /// annotates the trace, never the wire bytes.
    ///
    /// # Panics
    ///
    /// When the fragment's channel differs from the endpoint's; that is
    /// a caller bug, not a runtime condition.
    pub fn send_fragment(
        &self,
        to: &EndPoint,
        frag: &Fragment,
        retransmit: bool,
    ) -> Result<(), TransportError> {
        assert_eq!(
            frag.channel(),
            to.channel,
            "fragment channel must match endpoint channel"
        );
        tracing::trace!(
            "sendfrag #{} msg:{} retran:{}",
            frag.ordinal(),
            frag.message_id(),
            retransmit
        );
        self.transmit(to.addr, frag, retransmit)
    }

    /// Asks the peer to report ACK/MISSING state for `message_id`,
    /// starting at `fragment_no`.
    pub fn send_request_ack(
        &self,
        to: &EndPoint,
        message_id: i32,
        fragment_no: i16,
    ) -> Result<(), TransportError> {
        assert!(to.channel >= 0, "request-ack targets a real peer channel");
        let frag = Fragment::request_ack(message_id, to.channel, fragment_no);
        tracing::trace!("requesting ack, frag:{} msg:{} {}", fragment_no, message_id, to);
        self.transmit(to.addr, &frag, false)
    }

    /// Confirms full receipt of `message_id` to the far end.
    pub fn send_ack(&self, message_id: i32) -> Result<(), TransportError> {
        assert!(self.peer.channel >= 0, "ack targets a real peer channel");
        let frag = Fragment::ack(message_id, self.peer.channel);
        tracing::trace!("ack msg:{} to:{}", message_id, self.peer);
        self.transmit(self.peer.addr, &frag, false)
    }

    /// Clears the far end's channel-local sequence state, so message ids
    /// already seen on the channel are forgotten.
    pub fn send_reset(&self) -> Result<(), TransportError> {
        assert!(self.peer.channel >= 0, "reset targets a real peer channel");
        let frag = Fragment::reset(self.peer.channel);
        tracing::trace!("reset to:{}", self.peer);
        self.transmit(self.peer.addr, &frag, false)
    }

    /// Reports fragment numbers of `message_id` not yet received, in the
    /// order given.
    ///
    /// At most [`MAX_MISSING_IDS`] entries go on the wire; the remainder
    /// is dropped here, not queued, and the layer above re-requests once
    /// state diverges.
    pub fn send_missing(
        &self,
        to: &EndPoint,
        message_id: i32,
        ids: &[i16],
    ) -> Result<(), TransportError> {
        assert!(to.channel >= 0, "missing targets a real peer channel");
        if ids.len() > MAX_MISSING_IDS {
            tracing::debug!(
                "missing list for msg:{} truncated from {} to {} entries",
                message_id,
                ids.len(),
                MAX_MISSING_IDS
            );
        }
        let frag = Fragment::missing(message_id, to.channel, ids);
        self.transmit(to.addr, &frag, false)
    }

    fn transmit(
        &self,
        addr: SocketAddr,
        frag: &Fragment,
        retransmit: bool,
    ) -> Result<(), TransportError> {
        let bytes = frag.encode();
        self.transport.send_to(&bytes, addr)?;
        let payload = frag.payload();
        let clip = payload.len().min(TRACE_PAYLOAD_BYTES);
        self.trace.record(&TraceEvent {
            direction: Direction::Send,
            peer: Some(addr),
            header: *frag.header(),
            op: FragmentOp::classify(frag.ordinal()),
            retransmit,
            payload: &payload[..clip],
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::format_event;
    use bytes::Bytes;
    use fragnet_protocol::{FragmentHeader, ACK_ORDINAL, MISSING_ORDINAL, RESET_ORDINAL};
    use parking_lot::Mutex;
    use std::io;

    /// Captures every datagram handed to the transport.
    #[derive(Default)]
    struct CapturingTransport {
        sent: Mutex<Vec<(Vec<u8>, SocketAddr)>>,
    }

    impl Transport for CapturingTransport {
        fn send_to(&self, buf: &[u8], addr: SocketAddr) -> io::Result<usize> {
            self.sent.lock().push((buf.to_vec(), addr));
            Ok(buf.len())
        }

        fn recv_from(&self, _buf: &mut [u8]) -> io::Result<(usize, SocketAddr)> {
            Err(io::Error::new(io::ErrorKind::WouldBlock, "send-only mock"))
        }
    }

    /// Collects whole trace blocks, one string per packet.
    #[derive(Default)]
    struct CollectingTrace {
        blocks: Mutex<Vec<String>>,
    }

    impl TraceSink for CollectingTrace {
        fn record(&self, event: &TraceEvent<'_>) {
            self.blocks.lock().push(format_event(event));
        }
    }

    fn peer(channel: i16) -> EndPoint {
        EndPoint::new("127.0.0.1:9000".parse().unwrap(), channel)
    }

    fn connection(channel: i16) -> (Arc<CapturingTransport>, Connection) {
        let transport = Arc::new(CapturingTransport::default());
        let conn = Connection::new(transport.clone(), peer(channel));
        (transport, conn)
    }

    fn sent_header(transport: &CapturingTransport) -> FragmentHeader {
        let sent = transport.sent.lock();
        assert_eq!(sent.len(), 1);
        FragmentHeader::decode(&sent[0].0).unwrap()
    }

    #[test]
    fn test_send_fragment_transmits_wire_bytes_unmodified() {
        let (transport, conn) = connection(3);
        let frag = Fragment::data(42, 3, 5, Bytes::from_static(b"hello")).unwrap();
        conn.send_fragment(&peer(3), &frag, true).unwrap();

        let sent = transport.sent.lock();
        assert_eq!(sent[0].0, frag.encode().to_vec());
        assert_eq!(sent[0].1, peer(3).addr);
    }

    #[test]
    #[should_panic(expected = "fragment channel must match endpoint channel")]
    fn test_send_fragment_channel_mismatch_is_fatal() {
        let (_, conn) = connection(3);
        let frag = Fragment::data(42, 2, 5, Bytes::from_static(b"x")).unwrap();
        let _ = conn.send_fragment(&peer(3), &frag, false);
    }

    #[test]
    fn test_send_request_ack_encodes_fragment_number() {
        let (transport, conn) = connection(1);
        conn.send_request_ack(&peer(1), 7, 9).unwrap();

        let header = sent_header(&transport);
        assert_eq!(header.ordinal, -10);
        assert_eq!(header.total_len, 10);
        assert_eq!(header.message_id, 7);
    }

    #[test]
    #[should_panic(expected = "request-ack targets a real peer channel")]
    fn test_send_request_ack_rejects_negative_channel() {
        let (_, conn) = connection(1);
        let _ = conn.send_request_ack(&peer(-1), 7, 9);
    }

    #[test]
    fn test_send_ack_targets_far_end() {
        let (transport, conn) = connection(2);
        conn.send_ack(42).unwrap();

        let header = sent_header(&transport);
        assert_eq!(header.ordinal, ACK_ORDINAL);
        assert_eq!(header.message_id, 42);
        assert_eq!(header.channel, 2);
        assert_eq!(header.total_len, 10);
    }

    #[test]
    fn test_send_reset_scenario() {
        let (transport, conn) = connection(3);
        conn.send_reset().unwrap();

        let header = sent_header(&transport);
        assert_eq!(header.message_id, -1);
        assert_eq!(header.ordinal, RESET_ORDINAL);
        assert_eq!(header.total_len, 10);
    }

    #[test]
    fn test_send_missing_truncates_to_256_entries() {
        let (transport, conn) = connection(1);
        let ids: Vec<i16> = (0..300).collect();
        conn.send_missing(&peer(1), 9, &ids).unwrap();

        let sent = transport.sent.lock();
        let bytes = &sent[0].0;
        let header = FragmentHeader::decode(bytes).unwrap();
        assert_eq!(header.ordinal, MISSING_ORDINAL);
        assert_eq!(header.total_len as usize, 10 + 256 * 2);
        assert_eq!(bytes.len(), 10 + 256 * 2);
        // First 256 entries survive in input order.
        assert_eq!(&bytes[10..12], &0i16.to_le_bytes());
        assert_eq!(&bytes[520..522], &255i16.to_le_bytes());
    }

    #[test]
    fn test_transport_error_propagates() {
        struct FailingTransport;
        impl Transport for FailingTransport {
            fn send_to(&self, _buf: &[u8], _addr: SocketAddr) -> io::Result<usize> {
                Err(io::Error::new(io::ErrorKind::PermissionDenied, "no route"))
            }
            fn recv_from(&self, _buf: &mut [u8]) -> io::Result<(usize, SocketAddr)> {
                unreachable!()
            }
        }

        let conn = Connection::new(Arc::new(FailingTransport), peer(1));
        let result = conn.send_ack(1);
        assert!(matches!(result, Err(TransportError::Io(_))));
    }

    #[test]
    fn test_concurrent_sends_produce_whole_trace_blocks() {
        let transport = Arc::new(CapturingTransport::default());
        let trace = Arc::new(CollectingTrace::default());
        let conn = Connection::new(transport, peer(0)).with_trace(trace.clone());

        let threads: Vec<_> = (0..8)
            .map(|i| {
                let conn = conn.clone();
                std::thread::spawn(move || {
                    let frag =
                        Fragment::data(i, 0, 1, Bytes::from(format!("payload-{}", i))).unwrap();
                    conn.send_fragment(&peer(0), &frag, false).unwrap();
                })
            })
            .collect();
        for t in threads {
            t.join().unwrap();
        }

        let blocks = trace.blocks.lock();
        assert_eq!(blocks.len(), 8);
        for block in blocks.iter() {
            // Each packet's block is contiguous: exactly one header line
            // and one payload line, never spliced with another thread's.
            assert!(block.starts_with("> #1 "));
            assert_eq!(block.matches('\n').count(), 2);
            assert!(block.contains("payload-"));
        }
    }

    #[test]
    fn test_trace_annotates_retransmit() {
        let transport = Arc::new(CapturingTransport::default());
        let trace = Arc::new(CollectingTrace::default());
        let conn = Connection::new(transport, peer(0)).with_trace(trace.clone());

        let frag = Fragment::data(1, 0, 2, Bytes::from_static(b"x")).unwrap();
        conn.send_fragment(&peer(0), &frag, true).unwrap();
        conn.send_fragment(&peer(0), &frag, false).unwrap();

        let blocks = trace.blocks.lock();
        assert!(blocks[0].contains(" retran"));
        assert!(!blocks[1].contains(" retran"));
    }
}
