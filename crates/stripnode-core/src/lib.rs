//! stripnode core library: Art-Net / sACN to addressable LED strip.
//!
//! Datagrams from a [`DatagramSource`] are decoded by the protocol modules
//! (layout/reader/parser), mapped onto one contiguous pixel buffer, tracked per
//! universe, and handed to a [`StripDriver`] when the composite frame is
//! complete or has gone stale, never faster than the configured minimum
//! interval. Decoding and assembly are byte-oriented and side-effect free; all
//! I/O lives in `source`, `driver` and `runtime`.
//!
//! Invariants:
//! - The mapper never writes past the strip nor reads past the received bytes.
//! - A rejected datagram leaves the buffer and completion mask untouched.
//! - The final buffer does not depend on the order universes arrive in.
//! - Two strip writes are never closer than the minimum interval.
//!
//! # Examples
//! ```
//! use std::time::Duration;
//!
//! use stripnode_core::{FrameAssembler, Ingest, Protocol, Timing, UniverseLayout};
//!
//! let layout = UniverseLayout::new(300, 170, 0)?;
//! let timing = Timing::new(Duration::from_millis(20), Some(Duration::from_millis(250)))?;
//! let mut assembler = FrameAssembler::new(Protocol::ArtNet, layout, timing, Duration::ZERO);
//!
//! let outcome = assembler.ingest(b"not a lighting packet", Duration::ZERO);
//! assert!(matches!(outcome, Ingest::Dropped(_)));
//! assert!(assembler.mask().is_empty());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod assembler;
pub mod completion;
pub mod config;
pub mod driver;
pub mod mapper;
pub mod pixels;
pub mod protocols;
pub mod runtime;
pub mod scheduler;
pub mod source;
pub mod status;

pub use assembler::{AssemblerStats, DropReason, FrameAssembler, Ingest};
pub use completion::{MAX_UNIVERSES, SequenceCheck, SequenceTable, UniverseMask};
pub use config::{ConfigError, NetworkConfig, NetworkMode, NodeConfig, RenderConfig, StripConfig};
pub use driver::{
    ColorOrder, DriverError, FrameRecord, JsonLinesStrip, NullStrip, PinConfig, StripDriver,
};
pub use mapper::{CHANNELS_PER_PIXEL, Mapping, UniverseLayout, apply_frame};
pub use pixels::{Pixel, PixelBuffer};
pub use protocols::{DMX_MAX_SLOTS, DecodeError, DmxFrame, Protocol, decode};
pub use runtime::{Node, NodeError, NodeSummary, RECV_BUFFER_LEN};
pub use scheduler::{FlushReason, RenderScheduler, Timing};
pub use source::{
    CaptureWindow, DatagramSource, PcapReplaySource, Received, SourceError, UdpSource,
    sacn_multicast_group,
};
pub use status::{LogIndicator, Signal, StatusConfig, StatusIndicator};
