//! Node configuration.
//!
//! Everything the firmware fixed at compile time is a field here, loaded from
//! JSON and validated once before the node starts. Defaults reproduce the
//! reference deployment: 300 pixels, 170 per universe, starting at universe 0,
//! Art-Net on DHCP.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::driver::{ColorOrder, PinConfig};
use crate::mapper::UniverseLayout;
use crate::protocols::Protocol;
use crate::scheduler::Timing;
use crate::status::StatusConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("strip must have at least one pixel")]
    EmptyStrip,
    #[error("pixels per universe must be within 1..={max}, got {value}")]
    PixelsPerUniverse { value: usize, max: usize },
    #[error("strip needs {needed} universes, at most {max} are supported")]
    TooManyUniverses { needed: usize, max: usize },
    #[error("universe range starting at {start} with {count} universes exceeds 65535")]
    UniverseOverflow { start: u16, count: usize },
    #[error("max staleness ({max_staleness_ms} ms) is below min interval ({min_interval_ms} ms)")]
    StalenessBelowInterval {
        min_interval_ms: u64,
        max_staleness_ms: u64,
    },
    #[error("poll timeout must be non-zero")]
    ZeroPollTimeout,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    pub strip: StripConfig,
    pub render: RenderConfig,
    pub network: NetworkConfig,
    pub status: StatusConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StripConfig {
    pub pixel_count: usize,
    pub pixels_per_universe: usize,
    pub start_universe: u16,
    pub data_pin: u8,
    pub color_order: ColorOrder,
}

impl Default for StripConfig {
    fn default() -> Self {
        Self {
            pixel_count: 300,
            pixels_per_universe: 170,
            start_universe: 0,
            data_pin: 6,
            color_order: ColorOrder::Rgb,
        }
    }
}

impl StripConfig {
    pub fn pin(&self) -> PinConfig {
        PinConfig {
            data_pin: self.data_pin,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Minimum time between two strip writes.
    pub min_interval_ms: u64,
    /// Flush an incomplete frame after this long; `null` disables it.
    pub max_staleness_ms: Option<u64>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            min_interval_ms: 20,
            max_staleness_ms: Some(250),
        }
    }
}

/// How the node obtains its address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkMode {
    /// Address assigned by the host network stack; listen on all interfaces.
    #[default]
    Dhcp,
    Static(Ipv4Addr),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub protocol: Protocol,
    pub mode: NetworkMode,
    /// UDP port; `null` selects the protocol's well-known port.
    pub port: Option<u16>,
    /// Join the sACN multicast group of every strip universe.
    pub multicast: bool,
    pub poll_timeout_ms: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            protocol: Protocol::ArtNet,
            mode: NetworkMode::Dhcp,
            port: None,
            multicast: true,
            poll_timeout_ms: 100,
        }
    }
}

impl NetworkConfig {
    pub fn port(&self) -> u16 {
        self.port.unwrap_or_else(|| self.protocol.default_port())
    }

    pub fn bind_addr(&self) -> SocketAddr {
        let ip = match self.mode {
            NetworkMode::Dhcp => Ipv4Addr::UNSPECIFIED,
            NetworkMode::Static(ip) => ip,
        };
        SocketAddr::new(IpAddr::V4(ip), self.port())
    }

    pub fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.poll_timeout_ms)
    }
}

impl NodeConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let data = std::fs::read_to_string(path)?;
        Self::from_json_str(&data)
    }

    pub fn from_json_str(data: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(data)?)
    }

    pub fn layout(&self) -> Result<UniverseLayout, ConfigError> {
        UniverseLayout::new(
            self.strip.pixel_count,
            self.strip.pixels_per_universe,
            self.strip.start_universe,
        )
    }

    pub fn timing(&self) -> Result<Timing, ConfigError> {
        Timing::new(
            Duration::from_millis(self.render.min_interval_ms),
            self.render.max_staleness_ms.map(Duration::from_millis),
        )
    }

    /// Check every section; the first problem found is returned.
    pub fn validate(&self) -> Result<(UniverseLayout, Timing), ConfigError> {
        let layout = self.layout()?;
        let timing = self.timing()?;
        if self.network.poll_timeout_ms == 0 {
            return Err(ConfigError::ZeroPollTimeout);
        }
        Ok((layout, timing))
    }
}
