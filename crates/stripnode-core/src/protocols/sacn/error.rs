use thiserror::Error;

/// Errors returned by sACN parsing and reading.
///
/// # Examples
/// ```
/// use stripnode_core::protocols::sacn::error::SacnError;
///
/// let err = SacnError::InvalidStartCode { value: 1 };
/// assert!(err.to_string().contains("invalid start code"));
/// ```
#[derive(Debug, Error)]
pub enum SacnError {
    #[error("payload too short: need {needed} bytes, got {actual}")]
    TooShort { needed: usize, actual: usize },
    #[error("invalid start code: {value}")]
    InvalidStartCode { value: u8 },
    #[error("invalid property value count: {count}")]
    InvalidPropertyValueCount { count: u16 },
}
