use thiserror::Error;

/// Errors raised while unwrapping a captured frame to its UDP payload.
#[derive(Debug, Error)]
pub enum UdpError {
    #[error("packet slice error: {0}")]
    Slice(String),
    #[error("missing network layer in packet")]
    MissingNetworkLayer,
    #[error("missing IP payload in packet")]
    MissingIpPayload,
    #[error("UDP segment too short: need {needed} bytes, got {actual}")]
    TooShort { needed: usize, actual: usize },
}
