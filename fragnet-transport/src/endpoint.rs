//! Peer identity.

use std::fmt;
use std::net::SocketAddr;

/// One peer endpoint: where to send, and which logical channel the
/// traffic belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EndPoint {
    /// Network address of the peer.
    pub addr: SocketAddr,
    /// Multiplexing channel; non-negative for any real channel.
    pub channel: i16,
}

impl EndPoint {
    pub fn new(addr: SocketAddr, channel: i16) -> Self {
        Self { addr, channel }
    }
}

impl fmt::Display for EndPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.addr, self.channel)
    }
}
