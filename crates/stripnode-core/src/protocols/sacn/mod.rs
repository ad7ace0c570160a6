//! sACN (E1.31) protocol decoding.
//!
//! The parser validates ACN PID and vectors, then decodes framing and DMP
//! fields into a borrowed DMX channel view. The property value count includes
//! the start code; the channel count derived from it is clamped to 512 slots
//! and to the received bytes exactly like Art-Net.
//!
//! Foreign packets and preview-only data decode to `Ok(None)`. Errors report
//! short payloads, alternate start codes and empty property counts.
//! Wire-format details are defined in `layout`, while conventions and safe
//! reads live in `reader`.
//!
pub mod error;
pub mod layout;
pub mod parser;
pub mod reader;

pub use parser::{SacnDmx, parse_sacn_dmx};
