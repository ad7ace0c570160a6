//! Link-layer frame unwrapping for captured traffic.
//!
//! Captures hold whole Ethernet or raw IP frames; replay only needs the UDP
//! endpoints and payload. Slicing is delegated to `etherparse`; the UDP header
//! strip goes through `reader` like every other byte access.

pub mod error;
pub mod layout;
pub mod parser;
pub mod reader;

pub use parser::parse_udp_packet;
