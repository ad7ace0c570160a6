//! Multi-universe frame assembly.
//!
//! [`FrameAssembler::ingest`] is the whole packet path: decode, map, mark, and
//! decide. It never performs I/O, so the decision can be tested without a
//! socket or a strip; the caller performs the flush it asks for through
//! [`FrameAssembler::flush`]. A rejected datagram leaves the buffer and mask
//! exactly as they were.

use std::time::Duration;

use serde::Serialize;

use crate::completion::{SequenceCheck, SequenceTable, UniverseMask};
use crate::driver::{DriverError, StripDriver};
use crate::mapper::{Mapping, UniverseLayout, apply_frame};
use crate::pixels::{Pixel, PixelBuffer};
use crate::protocols::{DmxFrame, Protocol, decode};
use crate::scheduler::{FlushReason, RenderScheduler, Timing};

/// Why a datagram did not contribute to the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    /// Claimed to be our protocol but failed validation.
    Malformed,
    /// Another protocol or opcode sharing the port.
    Foreign,
    /// A universe this strip does not cover.
    OutOfRange,
    /// Our universe, but not a single complete pixel in the payload.
    Empty,
}

/// Result of feeding one datagram to the assembler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ingest {
    Dropped(DropReason),
    /// Applied; the frame is not ready to show yet.
    Deferred,
    /// Applied; the caller should flush now.
    Flush(FlushReason),
}

/// Running counters, serialized into the node summary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AssemblerStats {
    pub datagrams: u64,
    pub accepted: u64,
    pub dropped_malformed: u64,
    pub dropped_foreign: u64,
    pub dropped_out_of_range: u64,
    pub dropped_empty: u64,
    pub clamped: u64,
    pub sequence_gaps: u64,
    pub lost_packets: u64,
    pub reordered: u64,
    pub flushes_complete: u64,
    pub flushes_stale: u64,
    pub flushes_drain: u64,
    pub driver_failures: u64,
}

impl AssemblerStats {
    pub fn flushes(&self) -> u64 {
        self.flushes_complete + self.flushes_stale + self.flushes_drain
    }

    fn record_drop(&mut self, reason: DropReason) {
        match reason {
            DropReason::Malformed => self.dropped_malformed += 1,
            DropReason::Foreign => self.dropped_foreign += 1,
            DropReason::OutOfRange => self.dropped_out_of_range += 1,
            DropReason::Empty => self.dropped_empty += 1,
        }
    }

    fn record_flush(&mut self, reason: FlushReason) {
        match reason {
            FlushReason::Complete => self.flushes_complete += 1,
            FlushReason::Stale => self.flushes_stale += 1,
            FlushReason::Drain => self.flushes_drain += 1,
        }
    }

    fn record_sequence(&mut self, check: SequenceCheck) {
        match check {
            SequenceCheck::First | SequenceCheck::InOrder => {}
            SequenceCheck::Gap(missing) => {
                self.sequence_gaps += 1;
                self.lost_packets += u64::from(missing);
            }
            SequenceCheck::Reordered => self.reordered += 1,
        }
    }
}

/// Owner of the pixel buffer, completion mask and render clock.
#[derive(Debug, Clone)]
pub struct FrameAssembler {
    protocol: Protocol,
    layout: UniverseLayout,
    pixels: PixelBuffer,
    mask: UniverseMask,
    sequences: SequenceTable,
    scheduler: RenderScheduler,
    stats: AssemblerStats,
}

impl FrameAssembler {
    pub fn new(protocol: Protocol, layout: UniverseLayout, timing: Timing, now: Duration) -> Self {
        Self {
            protocol,
            layout,
            pixels: PixelBuffer::new(layout.pixel_count()),
            mask: UniverseMask::new(layout.universe_count()),
            sequences: SequenceTable::default(),
            scheduler: RenderScheduler::new(timing, now),
            stats: AssemblerStats::default(),
        }
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    pub fn layout(&self) -> &UniverseLayout {
        &self.layout
    }

    pub fn pixels(&self) -> &[Pixel] {
        self.pixels.as_slice()
    }

    pub fn mask(&self) -> &UniverseMask {
        &self.mask
    }

    pub fn stats(&self) -> &AssemblerStats {
        &self.stats
    }

    pub fn last_flush(&self) -> Option<Duration> {
        self.scheduler.last_flush()
    }

    /// Validate, map and track one datagram, then decide whether to flush.
    pub fn ingest(&mut self, datagram: &[u8], now: Duration) -> Ingest {
        self.stats.datagrams += 1;
        let frame = match decode(self.protocol, datagram) {
            Ok(Some(frame)) => frame,
            Ok(None) => return self.drop_datagram(DropReason::Foreign, None),
            Err(err) => {
                tracing::debug!(error = %err, len = datagram.len(), "malformed datagram");
                return self.drop_datagram(DropReason::Malformed, None);
            }
        };
        self.apply(&frame, now)
    }

    /// Apply an already decoded frame. `ingest` is this plus decoding.
    pub fn apply(&mut self, frame: &DmxFrame<'_>, now: Duration) -> Ingest {
        let relative = match apply_frame(&mut self.pixels, &self.layout, frame) {
            Mapping::Applied { relative, pixels } => {
                tracing::trace!(
                    protocol = frame.protocol.as_str(),
                    universe = frame.universe,
                    relative,
                    pixels,
                    "universe applied"
                );
                relative
            }
            Mapping::Empty { .. } => {
                return self.drop_datagram(DropReason::Empty, Some(frame.universe));
            }
            Mapping::OutOfRange => {
                return self.drop_datagram(DropReason::OutOfRange, Some(frame.universe));
            }
        };

        self.stats.accepted += 1;
        if frame.was_clamped() {
            self.stats.clamped += 1;
            tracing::debug!(
                universe = frame.universe,
                declared = frame.declared_len,
                received = frame.data.len(),
                "declared length clamped"
            );
        }
        if let Some(sequence) = frame.sequence {
            let check = self.sequences.observe(relative, sequence);
            self.stats.record_sequence(check);
        }
        self.mask.mark(relative);

        match self.scheduler.decide(&self.mask, now) {
            Some(reason) => Ingest::Flush(reason),
            None => Ingest::Deferred,
        }
    }

    /// Re-evaluate the flush decision without a new packet.
    ///
    /// Called when the source is idle so a throttled complete frame, or a
    /// frame that went stale, still reaches the strip.
    pub fn poll(&self, now: Duration) -> Option<FlushReason> {
        self.scheduler.decide(&self.mask, now)
    }

    /// Time at which pending contributions should be flushed before the
    /// source closes, if any are pending.
    pub fn drain_at(&self, now: Duration) -> Option<Duration> {
        self.scheduler.drain_at(&self.mask, now)
    }

    /// Hand the buffer to the strip, then restart the frame window.
    ///
    /// A driver error is returned for the caller to log; the clock and mask
    /// are reset either way and the buffer is left untouched.
    pub fn flush<D: StripDriver + ?Sized>(
        &mut self,
        driver: &mut D,
        reason: FlushReason,
        now: Duration,
    ) -> Result<(), DriverError> {
        let written = driver.write_all(self.pixels.as_slice());
        self.scheduler.record_flush(now);
        self.mask.clear();
        self.stats.record_flush(reason);
        if written.is_err() {
            self.stats.driver_failures += 1;
        }
        written
    }

    /// Overwrite the whole buffer, as the test pattern does.
    pub fn fill(&mut self, pixel: Pixel) {
        self.pixels.fill(pixel);
    }

    fn drop_datagram(&mut self, reason: DropReason, universe: Option<u16>) -> Ingest {
        tracing::trace!(?reason, ?universe, "datagram dropped");
        self.stats.record_drop(reason);
        Ingest::Dropped(reason)
    }

    /// Read-only view of the timing in force.
    pub fn timing(&self) -> Timing {
        self.scheduler.timing()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::{DropReason, FrameAssembler, Ingest};
    use crate::driver::{DriverError, NullStrip, PinConfig, StripDriver};
    use crate::mapper::UniverseLayout;
    use crate::pixels::Pixel;
    use crate::protocols::Protocol;
    use crate::protocols::artnet::layout;
    use crate::scheduler::{FlushReason, Timing};

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    fn artdmx(universe: u16, sequence: u8, data: &[u8]) -> Vec<u8> {
        let mut payload = vec![0u8; layout::DMX_DATA_OFFSET];
        payload[..layout::ARTNET_ID.len()].copy_from_slice(layout::ARTNET_ID);
        payload[layout::OP_CODE_RANGE.clone()]
            .copy_from_slice(&layout::ARTDMX_OPCODE.to_le_bytes());
        payload[layout::SEQUENCE_OFFSET] = sequence;
        payload[layout::UNIVERSE_RANGE.clone()].copy_from_slice(&universe.to_le_bytes());
        payload[layout::LENGTH_RANGE.clone()]
            .copy_from_slice(&(data.len() as u16).to_be_bytes());
        payload.extend_from_slice(data);
        payload
    }

    fn assembler(max_staleness: Option<u64>) -> FrameAssembler {
        let layout = UniverseLayout::new(300, 170, 0).unwrap();
        let timing = Timing::new(ms(20), max_staleness.map(ms)).unwrap();
        FrameAssembler::new(Protocol::ArtNet, layout, timing, ms(0))
    }

    struct FailingStrip;

    impl StripDriver for FailingStrip {
        fn initialize(&mut self, _pixel_count: usize, _pin: PinConfig) -> Result<(), DriverError> {
            Ok(())
        }

        fn write_all(&mut self, _pixels: &[Pixel]) -> Result<(), DriverError> {
            Err(DriverError::NotInitialized)
        }

        fn clear(&mut self) -> Result<(), DriverError> {
            Ok(())
        }
    }

    #[test]
    fn complete_frame_requests_flush() {
        let mut assembler = assembler(None);
        assert_eq!(
            assembler.ingest(&artdmx(0, 1, &[1; 510]), ms(1)),
            Ingest::Deferred
        );
        assert_eq!(
            assembler.ingest(&artdmx(1, 1, &[2; 390]), ms(2)),
            Ingest::Flush(FlushReason::Complete)
        );
    }

    #[test]
    fn flush_resets_mask_and_clock() {
        let mut assembler = assembler(None);
        let mut strip = NullStrip::new();
        strip.initialize(300, PinConfig { data_pin: 6 }).unwrap();
        assembler.ingest(&artdmx(0, 0, &[1; 510]), ms(1));
        assembler.ingest(&artdmx(1, 0, &[2; 390]), ms(2));

        assembler
            .flush(&mut strip, FlushReason::Complete, ms(2))
            .unwrap();
        assert!(assembler.mask().is_empty());
        assert_eq!(assembler.last_flush(), Some(ms(2)));
        assert_eq!(strip.writes(), 1);
        assert_eq!(assembler.stats().flushes_complete, 1);
    }

    #[test]
    fn throttled_complete_frame_keeps_contributions() {
        let mut assembler = assembler(None);
        let mut strip = NullStrip::new();
        strip.initialize(300, PinConfig { data_pin: 6 }).unwrap();
        assembler
            .flush(&mut strip, FlushReason::Complete, ms(100))
            .unwrap();

        assembler.ingest(&artdmx(0, 0, &[1; 510]), ms(105));
        assert_eq!(
            assembler.ingest(&artdmx(1, 0, &[2; 390]), ms(110)),
            Ingest::Deferred
        );
        assert!(assembler.mask().is_complete());
        assert_eq!(assembler.poll(ms(119)), None);
        assert_eq!(assembler.poll(ms(120)), Some(FlushReason::Complete));
    }

    #[test]
    fn driver_failure_is_counted_and_window_restarts() {
        let mut assembler = assembler(None);
        assembler.ingest(&artdmx(0, 0, &[1; 510]), ms(1));
        let before = assembler.pixels().to_vec();

        let result = assembler.flush(&mut FailingStrip, FlushReason::Stale, ms(5));
        assert!(result.is_err());
        assert_eq!(assembler.stats().driver_failures, 1);
        assert!(assembler.mask().is_empty());
        assert_eq!(assembler.pixels(), &before[..]);
    }

    #[test]
    fn malformed_and_foreign_are_counted_separately() {
        let mut assembler = assembler(None);
        assert_eq!(
            assembler.ingest(&[0u8; 4], ms(0)),
            Ingest::Dropped(DropReason::Malformed)
        );
        let mut poll = artdmx(0, 0, &[]);
        poll[layout::OP_CODE_RANGE.clone()].copy_from_slice(&0x2000u16.to_le_bytes());
        assert_eq!(
            assembler.ingest(&poll, ms(0)),
            Ingest::Dropped(DropReason::Foreign)
        );
        poll.truncate(14);
        assert_eq!(
            assembler.ingest(&poll, ms(0)),
            Ingest::Dropped(DropReason::Foreign)
        );
        assert_eq!(assembler.stats().dropped_malformed, 1);
        assert_eq!(assembler.stats().dropped_foreign, 2);
        assert_eq!(assembler.stats().datagrams, 3);
    }

    #[test]
    fn empty_payload_does_not_mark_universe() {
        let mut assembler = assembler(None);
        assert_eq!(
            assembler.ingest(&artdmx(0, 0, &[1, 2]), ms(0)),
            Ingest::Dropped(DropReason::Empty)
        );
        assert!(assembler.mask().is_empty());
    }

    #[test]
    fn sequence_statistics_never_drop_packets() {
        let mut assembler = assembler(None);
        assembler.ingest(&artdmx(0, 10, &[1; 3]), ms(0));
        assembler.ingest(&artdmx(0, 13, &[2; 3]), ms(1));
        assert_eq!(
            assembler.ingest(&artdmx(0, 12, &[3; 3]), ms(2)),
            Ingest::Deferred
        );
        assert_eq!(assembler.pixels()[0], Pixel::new(3, 3, 3));
        assert_eq!(assembler.stats().sequence_gaps, 1);
        assert_eq!(assembler.stats().lost_packets, 2);
        assert_eq!(assembler.stats().reordered, 1);
        assert_eq!(assembler.stats().accepted, 3);
    }

    #[test]
    fn drain_reports_pending_contributions() {
        let mut assembler = assembler(None);
        assert_eq!(assembler.drain_at(ms(50)), None);
        assembler.ingest(&artdmx(0, 0, &[1; 3]), ms(50));
        assert_eq!(assembler.drain_at(ms(60)), Some(ms(60)));
    }
}
