//! Art-Net protocol decoding.
//!
//! The parser validates the Art-Net signature and opcode, then decodes ArtDMX
//! headers into a borrowed channel view. The declared DMX length is never
//! trusted: it is clamped to 512 slots and to the bytes actually received, so
//! a short or lying packet still yields its valid prefix.
//!
//! Anything with a foreign signature or opcode decodes to `Ok(None)`, however
//! short; a datagram that is ArtDMX but shorter than its header is an error. Byte offsets live in
//! `layout`, safe reads and conventions in `reader`.

pub mod error;
pub mod layout;
pub mod parser;
pub mod reader;

pub use parser::{ArtDmx, parse_artdmx};
