//! # fragnet-transport
//!
//! UDP transport layer for fragnet.
//!
//! This crate provides:
//! - The [`Transport`] seam and its `std::net::UdpSocket` implementation
//! - The five synchronous sender primitives on [`Connection`]
//! - The blocking [`Receiver`] with retry and adaptive buffer sizing
//! - Shutdown signalling and the injectable packet trace sink
//!
//! This layer guarantees that one transmission is one atomic datagram
//! and nothing more: fragments may arrive out of order, duplicated, or
//! not at all, and the reassembly layer above owns those concerns.

pub mod config;
pub mod endpoint;
pub mod error;
pub mod receiver;
pub mod retry;
pub mod sender;
pub mod shutdown;
pub mod socket;
pub mod trace;

pub use config::{ConfigError, RetryConfig, TransportConfig};
pub use endpoint::EndPoint;
pub use error::TransportError;
pub use receiver::Receiver;
pub use retry::RetryPolicy;
pub use sender::Connection;
pub use shutdown::Shutdown;
pub use socket::{Transport, UdpTransport};
pub use trace::{Direction, NoopTrace, StderrTrace, TraceEvent, TraceSink};
