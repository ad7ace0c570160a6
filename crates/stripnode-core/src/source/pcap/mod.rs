//! PCAP/PCAPNG replay source.
//!
//! Feeds captured Art-Net or sACN traffic through the node as if it arrived
//! live. Only UDP datagrams addressed to the configured port are yielded, and
//! each carries its capture time relative to the first one so the scheduler
//! runs on the capture's clock instead of the wall clock.

pub mod error;
pub mod layout;
pub mod parser;
pub mod reader;

pub use parser::{CaptureWindow, PcapReplaySource};
