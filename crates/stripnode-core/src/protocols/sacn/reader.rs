use super::error::SacnError;
use super::layout;
use crate::protocols::common::reader::clamped_len;

pub struct SacnReader<'a> {
    payload: &'a [u8],
}

impl<'a> SacnReader<'a> {
    pub fn new(payload: &'a [u8]) -> Self {
        Self { payload }
    }

    pub fn require_len(&self, needed: usize) -> Result<(), SacnError> {
        if self.payload.len() < needed {
            return Err(SacnError::TooShort {
                needed,
                actual: self.payload.len(),
            });
        }
        Ok(())
    }

    pub fn read_u8(&self, offset: usize) -> Result<u8, SacnError> {
        self.payload
            .get(offset)
            .copied()
            .ok_or(SacnError::TooShort {
                needed: offset + 1,
                actual: self.payload.len(),
            })
    }

    pub fn read_u16_be(&self, range: std::ops::Range<usize>) -> Result<u16, SacnError> {
        let bytes = self.read_slice(range)?;
        if bytes.len() != 2 {
            return Err(SacnError::TooShort {
                needed: 2,
                actual: bytes.len(),
            });
        }
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    pub fn read_u32_be(&self, range: std::ops::Range<usize>) -> Result<u32, SacnError> {
        let bytes = self.read_slice(range)?;
        if bytes.len() != 4 {
            return Err(SacnError::TooShort {
                needed: 4,
                actual: bytes.len(),
            });
        }
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub fn read_slice(&self, range: std::ops::Range<usize>) -> Result<&'a [u8], SacnError> {
        self.payload.get(range.clone()).ok_or(SacnError::TooShort {
            needed: range.end,
            actual: self.payload.len(),
        })
    }

    /// DMX slot count carried by the DMP layer (property count minus the
    /// start code).
    pub fn read_slot_count(&self) -> Result<u16, SacnError> {
        let count = self.read_u16_be(layout::DMP_PROPERTY_VALUE_COUNT_RANGE.clone())?;
        if count == 0 {
            return Err(SacnError::InvalidPropertyValueCount { count });
        }
        Ok(count - 1)
    }

    pub fn read_dmx_data(&self, declared: u16) -> Result<&'a [u8], SacnError> {
        self.require_len(layout::DMX_DATA_OFFSET)?;
        let len = clamped_len(
            declared,
            layout::DMX_MAX_SLOTS,
            self.payload.len() - layout::DMX_DATA_OFFSET,
        );
        self.read_slice(layout::DMX_DATA_OFFSET..layout::DMX_DATA_OFFSET + len)
    }
}

#[cfg(test)]
mod tests {
    use super::SacnReader;
    use crate::protocols::sacn::error::SacnError;
    use crate::protocols::sacn::layout;

    #[test]
    fn slot_count_excludes_start_code() {
        let mut payload = vec![0u8; layout::MIN_LEN];
        payload[layout::DMP_PROPERTY_VALUE_COUNT_RANGE.clone()]
            .copy_from_slice(&513u16.to_be_bytes());
        let reader = SacnReader::new(&payload);
        assert_eq!(reader.read_slot_count().unwrap(), 512);
    }

    #[test]
    fn zero_property_count_is_rejected() {
        let payload = vec![0u8; layout::MIN_LEN];
        let reader = SacnReader::new(&payload);
        assert!(matches!(
            reader.read_slot_count(),
            Err(SacnError::InvalidPropertyValueCount { count: 0 })
        ));
    }
}
