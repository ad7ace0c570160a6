//! Protocol decoding modules.
//!
//! Each protocol follows a layered structure:
//! - `layout`: byte offsets and ranges (source of truth)
//! - `reader`: safe byte access and protocol conventions
//! - `parser`: domain-level decoding (no direct byte indexing)
//! - `error`: explicit, actionable errors
//!
//! Parsers are pure and borrow from the caller's receive buffer; nothing here
//! copies channel data or touches shared state. Both protocols decode into the
//! same [`DmxFrame`] so the mapper does not care where a universe came from.

pub mod artnet;
pub(crate) mod common;
pub mod sacn;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use artnet::error::ArtNetError;
use sacn::error::SacnError;

/// Maximum number of DMX slots a single universe carries.
pub const DMX_MAX_SLOTS: usize = 512;

/// Lighting protocol accepted by a deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    #[default]
    ArtNet,
    Sacn,
}

impl Protocol {
    /// Well-known UDP port for the protocol.
    pub fn default_port(self) -> u16 {
        match self {
            Protocol::ArtNet => artnet::layout::ARTNET_PORT,
            Protocol::Sacn => sacn::layout::SACN_PORT,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Protocol::ArtNet => "artnet",
            Protocol::Sacn => "sacn",
        }
    }
}

/// One decoded universe update, borrowed from the receive buffer.
///
/// `data` is already clamped to the declared length, the protocol maximum and
/// the bytes actually received. `declared_len` keeps the wire value so callers
/// can tell when clamping happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DmxFrame<'a> {
    pub protocol: Protocol,
    pub universe: u16,
    pub sequence: Option<u8>,
    pub declared_len: u16,
    pub data: &'a [u8],
}

impl DmxFrame<'_> {
    /// True when the wire length promised more channels than were delivered.
    pub fn was_clamped(&self) -> bool {
        self.data.len() < usize::from(self.declared_len)
    }
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Art-Net: {0}")]
    ArtNet(#[from] ArtNetError),
    #[error("sACN: {0}")]
    Sacn(#[from] SacnError),
}

/// Decode a datagram with the deployment's protocol.
///
/// Returns `Ok(None)` when the datagram belongs to another protocol or opcode
/// (other traffic on the same port), and an error when it claims to be ours
/// but is malformed.
pub fn decode(protocol: Protocol, datagram: &[u8]) -> Result<Option<DmxFrame<'_>>, DecodeError> {
    match protocol {
        Protocol::ArtNet => Ok(artnet::parse_artdmx(datagram)?.map(|art| DmxFrame {
            protocol,
            universe: art.universe,
            sequence: art.sequence,
            declared_len: art.declared_len,
            data: art.data,
        })),
        Protocol::Sacn => Ok(sacn::parse_sacn_dmx(datagram)?.map(|dmx| DmxFrame {
            protocol,
            universe: dmx.universe,
            sequence: dmx.sequence,
            declared_len: dmx.declared_len,
            data: dmx.data,
        })),
    }
}
