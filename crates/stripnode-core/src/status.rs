//! Status indicator boundary.
//!
//! Indicators are advisory: nothing on the packet path depends on them, and a
//! broken indicator must never stop rendering.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    NetworkLink,
    Rendering,
}

pub trait StatusIndicator {
    fn set(&mut self, signal: Signal, on: bool);

    /// Startup greeting: pulse every signal once.
    fn hello(&mut self) {
        for signal in [Signal::NetworkLink, Signal::Rendering] {
            self.set(signal, true);
            self.set(signal, false);
        }
    }

    /// Fatal condition on `signal`. The caller stops after this.
    fn fail(&mut self, signal: Signal) {
        self.set(signal, false);
    }
}

/// Pins the indicator LEDs are wired to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusConfig {
    pub network_pin: u8,
    pub render_pin: u8,
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            network_pin: 4,
            render_pin: 3,
        }
    }
}

/// Indicator that reports transitions through `tracing`.
#[derive(Debug)]
pub struct LogIndicator {
    pins: StatusConfig,
    link: bool,
    rendering: bool,
}

impl LogIndicator {
    pub fn new(pins: StatusConfig) -> Self {
        Self {
            pins,
            link: false,
            rendering: false,
        }
    }

    pub fn is_on(&self, signal: Signal) -> bool {
        match signal {
            Signal::NetworkLink => self.link,
            Signal::Rendering => self.rendering,
        }
    }
}

impl StatusIndicator for LogIndicator {
    fn set(&mut self, signal: Signal, on: bool) {
        match signal {
            Signal::NetworkLink => {
                if self.link != on {
                    tracing::info!(pin = self.pins.network_pin, on, "network link indicator");
                }
                self.link = on;
            }
            Signal::Rendering => {
                if self.rendering != on {
                    tracing::trace!(pin = self.pins.render_pin, on, "render indicator");
                }
                self.rendering = on;
            }
        }
    }

    fn fail(&mut self, signal: Signal) {
        let pin = match signal {
            Signal::NetworkLink => self.pins.network_pin,
            Signal::Rendering => self.pins.render_pin,
        };
        tracing::error!(pin, ?signal, "indicator reports failure");
        self.set(signal, false);
    }
}

#[cfg(test)]
mod tests {
    use super::{LogIndicator, Signal, StatusConfig, StatusIndicator};

    #[test]
    fn hello_leaves_signals_off() {
        let mut indicator = LogIndicator::new(StatusConfig::default());
        indicator.hello();
        assert!(!indicator.is_on(Signal::NetworkLink));
        assert!(!indicator.is_on(Signal::Rendering));
    }

    #[test]
    fn set_and_fail() {
        let mut indicator = LogIndicator::new(StatusConfig::default());
        indicator.set(Signal::NetworkLink, true);
        assert!(indicator.is_on(Signal::NetworkLink));
        indicator.fail(Signal::NetworkLink);
        assert!(!indicator.is_on(Signal::NetworkLink));
    }
}
