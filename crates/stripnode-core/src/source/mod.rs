//! Datagram sources.
//!
//! A source fills the caller's fixed receive buffer with one datagram at a
//! time. Live sockets report `Idle` when their read timeout expires so the
//! node can re-check its flush deadline; finite sources report `Closed`.

mod link;
mod pcap;
mod udp;

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use thiserror::Error;

pub use pcap::{CaptureWindow, PcapReplaySource};
pub use udp::{UdpSource, sacn_multicast_group};

/// One step of a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Received {
    /// `len` bytes were written to the buffer. `at` is the capture time for
    /// replayed traffic; live datagrams are stamped by the node clock.
    Datagram { len: usize, at: Option<Duration> },
    /// Nothing arrived within the poll timeout.
    Idle,
    /// The source is exhausted.
    Closed,
}

pub trait DatagramSource {
    fn recv(&mut self, buf: &mut [u8]) -> Result<Received, SourceError>;
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("PCAP parse error: {0}")]
    Pcap(String),
    #[error("cannot bind UDP socket on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },
    #[error("cannot join multicast group {group}: {source}")]
    Multicast {
        group: Ipv4Addr,
        source: std::io::Error,
    },
}

impl From<pcap::error::PcapSourceError> for SourceError {
    fn from(value: pcap::error::PcapSourceError) -> Self {
        match value {
            pcap::error::PcapSourceError::Io(err) => SourceError::Io(err),
            pcap::error::PcapSourceError::Pcap { context, message } => {
                SourceError::Pcap(format!("{context}: {message}"))
            }
        }
    }
}
