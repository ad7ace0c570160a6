//! Node runtime: receive, assemble, flush.
//!
//! One thread owns everything. Each turn blocks on the source for at most its
//! poll timeout, then either ingests the datagram or re-polls the scheduler.
//! Replayed datagrams carry their capture offset and drive the clock; live
//! datagrams are stamped with the time elapsed since the node started.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use serde::Serialize;
use thiserror::Error;

use crate::assembler::{AssemblerStats, FrameAssembler, Ingest};
use crate::config::{ConfigError, NodeConfig};
use crate::driver::{DriverError, StripDriver};
use crate::pixels::Pixel;
use crate::protocols::Protocol;
use crate::scheduler::FlushReason;
use crate::source::{DatagramSource, Received, SourceError};
use crate::status::{Signal, StatusIndicator};

/// Receive buffer size; one Ethernet MTU covers both ArtDMX and E1.31.
pub const RECV_BUFFER_LEN: usize = 1500;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error("strip driver error: {0}")]
    Driver(#[from] DriverError),
}

/// End-of-run report.
#[derive(Debug, Clone, Serialize)]
pub struct NodeSummary {
    pub protocol: Protocol,
    pub pixel_count: usize,
    pub pixels_per_universe: usize,
    pub start_universe: u16,
    pub universe_count: usize,
    pub stats: AssemblerStats,
    /// Offset of the last strip write from node start, in milliseconds.
    pub last_flush_ms: Option<u64>,
}

pub struct Node<S, D, I> {
    assembler: FrameAssembler,
    source: S,
    driver: D,
    indicator: I,
    started: Instant,
    last_seen: Duration,
}

impl<S, D, I> Node<S, D, I>
where
    S: DatagramSource,
    D: StripDriver,
    I: StatusIndicator,
{
    /// Validate the config, bring the strip up dark and greet on the
    /// indicator. The source must already be open.
    pub fn new(
        config: &NodeConfig,
        source: S,
        mut driver: D,
        mut indicator: I,
    ) -> Result<Self, NodeError> {
        let (layout, timing) = config.validate()?;
        driver.initialize(layout.pixel_count(), config.strip.pin())?;
        driver.clear()?;
        indicator.hello();
        indicator.set(Signal::NetworkLink, true);

        tracing::info!(
            protocol = config.network.protocol.as_str(),
            pixels = layout.pixel_count(),
            universes = layout.universe_count(),
            start_universe = layout.start_universe(),
            "node ready"
        );

        Ok(Self {
            assembler: FrameAssembler::new(config.network.protocol, layout, timing, Duration::ZERO),
            source,
            driver,
            indicator,
            started: Instant::now(),
            last_seen: Duration::ZERO,
        })
    }

    /// Process datagrams until the source closes or `shutdown` is set.
    ///
    /// A closing source drains any pending contributions so the last partial
    /// frame of a replay is shown.
    pub fn run(&mut self, shutdown: &AtomicBool) -> Result<(), NodeError> {
        let mut buf = vec![0u8; RECV_BUFFER_LEN];
        while !shutdown.load(Ordering::Relaxed) {
            match self.source.recv(&mut buf)? {
                Received::Datagram { len, at } => {
                    let now = at.unwrap_or_else(|| self.started.elapsed());
                    self.last_seen = self.last_seen.max(now);
                    if let Ingest::Flush(reason) = self.assembler.ingest(&buf[..len], now) {
                        self.flush(reason, now);
                    }
                }
                Received::Idle => {
                    let now = self.started.elapsed().max(self.last_seen);
                    self.last_seen = now;
                    if let Some(reason) = self.assembler.poll(now) {
                        self.flush(reason, now);
                    }
                }
                Received::Closed => {
                    if let Some(at) = self.assembler.drain_at(self.last_seen) {
                        self.flush(FlushReason::Drain, at);
                    }
                    tracing::info!("source closed");
                    break;
                }
            }
        }
        Ok(())
    }

    /// Fill the strip with one color and show it immediately.
    pub fn show_solid(&mut self, pixel: Pixel) -> Result<(), NodeError> {
        self.assembler.fill(pixel);
        self.indicator.set(Signal::Rendering, true);
        let written = self.driver.write_all(self.assembler.pixels());
        self.indicator.set(Signal::Rendering, false);
        Ok(written?)
    }

    pub fn summary(&self) -> NodeSummary {
        let layout = self.assembler.layout();
        NodeSummary {
            protocol: self.assembler.protocol(),
            pixel_count: layout.pixel_count(),
            pixels_per_universe: layout.pixels_per_universe(),
            start_universe: layout.start_universe(),
            universe_count: layout.universe_count(),
            stats: self.assembler.stats().clone(),
            last_flush_ms: self
                .assembler
                .last_flush()
                .map(|at| u64::try_from(at.as_millis()).unwrap_or(u64::MAX)),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn assembler(&self) -> &FrameAssembler {
        &self.assembler
    }

    /// Stop the node, optionally blanking the strip, and report.
    pub fn finish(mut self, clear_strip: bool) -> Result<NodeSummary, NodeError> {
        let summary = self.summary();
        if clear_strip {
            self.driver.clear()?;
        }
        self.indicator.set(Signal::NetworkLink, false);
        tracing::info!(
            datagrams = summary.stats.datagrams,
            flushes = summary.stats.flushes(),
            "node stopped"
        );
        Ok(summary)
    }

    fn flush(&mut self, reason: FlushReason, now: Duration) {
        self.indicator.set(Signal::Rendering, true);
        match self.assembler.flush(&mut self.driver, reason, now) {
            Ok(()) => tracing::debug!(?reason, at_ms = now.as_millis() as u64, "frame flushed"),
            Err(err) => tracing::warn!(?reason, error = %err, "strip write failed"),
        }
        self.indicator.set(Signal::Rendering, false);
    }
}
