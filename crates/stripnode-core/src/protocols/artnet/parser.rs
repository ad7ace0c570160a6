use super::error::ArtNetError;
use super::layout;
use super::reader::ArtNetReader;

/// Decoded ArtDMX header with a borrowed channel view.
#[derive(Debug, Clone, Copy)]
pub struct ArtDmx<'a> {
    /// 15-bit port address: SubUni in the low byte, Net in the high byte.
    pub universe: u16,
    pub sequence: Option<u8>,
    pub declared_len: u16,
    pub data: &'a [u8],
}

pub fn parse_artdmx(payload: &[u8]) -> Result<Option<ArtDmx<'_>>, ArtNetError> {
    let reader = ArtNetReader::new(payload);
    reader.require_len(layout::OP_CODE_RANGE.end)?;

    let signature = reader.read_signature()?;
    if signature != layout::ARTNET_ID {
        return Ok(None);
    }

    let opcode = reader.read_u16_le(layout::OP_CODE_RANGE.clone())?;
    if opcode != layout::ARTDMX_OPCODE {
        return Ok(None);
    }
    reader.require_len(layout::DMX_DATA_OFFSET)?;

    let sequence = reader.read_optional_nonzero_u8(layout::SEQUENCE_OFFSET)?;
    let universe = reader.read_u16_le(layout::UNIVERSE_RANGE.clone())?;
    let declared_len = reader.read_u16_be(layout::LENGTH_RANGE.clone())?;
    let data = reader.read_dmx_data(declared_len)?;

    Ok(Some(ArtDmx {
        universe,
        sequence,
        declared_len,
        data,
    }))
}
