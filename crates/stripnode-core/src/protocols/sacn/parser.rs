use super::error::SacnError;
use super::layout;
use super::reader::SacnReader;

/// Decoded E1.31 data packet with a borrowed channel view.
#[derive(Debug, Clone, Copy)]
pub struct SacnDmx<'a> {
    pub universe: u16,
    pub sequence: Option<u8>,
    pub declared_len: u16,
    pub data: &'a [u8],
}

pub fn parse_sacn_dmx(payload: &[u8]) -> Result<Option<SacnDmx<'_>>, SacnError> {
    let reader = SacnReader::new(payload);
    reader.require_len(layout::MIN_LEN)?;

    let preamble = reader.read_u16_be(layout::PREAMBLE_SIZE_RANGE.clone())?;
    let postamble = reader.read_u16_be(layout::POSTAMBLE_SIZE_RANGE.clone())?;
    if preamble != layout::PREAMBLE_SIZE || postamble != layout::POSTAMBLE_SIZE {
        return Ok(None);
    }

    let acn_pid = reader.read_slice(layout::ACN_PID_RANGE.clone())?;
    if acn_pid != layout::ACN_PID {
        return Ok(None);
    }

    let root_vector = reader.read_u32_be(layout::ROOT_VECTOR_RANGE.clone())?;
    if root_vector != layout::ROOT_VECTOR_DATA {
        return Ok(None);
    }

    let framing_vector = reader.read_u32_be(layout::FRAMING_VECTOR_RANGE.clone())?;
    if framing_vector != layout::FRAMING_VECTOR_DMX {
        return Ok(None);
    }

    let dmp_vector = reader.read_u8(layout::DMP_VECTOR_OFFSET)?;
    if dmp_vector != layout::DMP_VECTOR_SET_PROPERTY {
        return Ok(None);
    }

    let options = reader.read_u8(layout::OPTIONS_OFFSET)?;
    if options & layout::OPTION_PREVIEW_DATA != 0 {
        return Ok(None);
    }

    let start_code = reader.read_u8(layout::START_CODE_OFFSET)?;
    if start_code != layout::START_CODE_DMX {
        return Err(SacnError::InvalidStartCode { value: start_code });
    }

    let universe = reader.read_u16_be(layout::UNIVERSE_RANGE.clone())?;
    // E1.31 sequence numbers are valid at zero, unlike Art-Net.
    let sequence = Some(reader.read_u8(layout::SEQUENCE_OFFSET)?);
    let declared_len = reader.read_slot_count()?;
    let data = reader.read_dmx_data(declared_len)?;

    Ok(Some(SacnDmx {
        universe,
        sequence,
        declared_len,
        data,
    }))
}
