//! Channel-to-pixel mapping.
//!
//! A universe relative to the configured start universe owns the pixel slice
//! `[u * P, u * P + P)`. Every copy re-derives its bounds from the layout, the
//! payload and the buffer, so a frame can never read past its payload or write
//! past the strip regardless of what the decoder let through.

use serde::Serialize;

use crate::completion::MAX_UNIVERSES;
use crate::config::ConfigError;
use crate::pixels::{Pixel, PixelBuffer};
use crate::protocols::{DMX_MAX_SLOTS, DmxFrame};

/// Channels consumed by one RGB pixel.
pub const CHANNELS_PER_PIXEL: usize = 3;

/// Validated geometry of the strip in universes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UniverseLayout {
    pixel_count: usize,
    pixels_per_universe: usize,
    start_universe: u16,
    universe_count: usize,
}

impl UniverseLayout {
    pub fn new(
        pixel_count: usize,
        pixels_per_universe: usize,
        start_universe: u16,
    ) -> Result<Self, ConfigError> {
        if pixel_count == 0 {
            return Err(ConfigError::EmptyStrip);
        }
        let max_per_universe = DMX_MAX_SLOTS / CHANNELS_PER_PIXEL;
        if pixels_per_universe == 0 || pixels_per_universe > max_per_universe {
            return Err(ConfigError::PixelsPerUniverse {
                value: pixels_per_universe,
                max: max_per_universe,
            });
        }
        let universe_count = pixel_count.div_ceil(pixels_per_universe);
        if universe_count > MAX_UNIVERSES {
            return Err(ConfigError::TooManyUniverses {
                needed: universe_count,
                max: MAX_UNIVERSES,
            });
        }
        let last = usize::from(start_universe) + universe_count - 1;
        if last > usize::from(u16::MAX) {
            return Err(ConfigError::UniverseOverflow {
                start: start_universe,
                count: universe_count,
            });
        }
        Ok(Self {
            pixel_count,
            pixels_per_universe,
            start_universe,
            universe_count,
        })
    }

    pub fn pixel_count(&self) -> usize {
        self.pixel_count
    }

    pub fn pixels_per_universe(&self) -> usize {
        self.pixels_per_universe
    }

    pub fn start_universe(&self) -> u16 {
        self.start_universe
    }

    pub fn universe_count(&self) -> usize {
        self.universe_count
    }

    /// Absolute universe ids covered by this strip, in order.
    pub fn universes(&self) -> impl Iterator<Item = u16> + '_ {
        (0..self.universe_count).map(move |offset| self.start_universe + offset as u16)
    }

    /// Position of `universe` within the strip, if it belongs to it.
    pub fn relative(&self, universe: u16) -> Option<usize> {
        let relative = usize::from(universe.checked_sub(self.start_universe)?);
        (relative < self.universe_count).then_some(relative)
    }

    /// First pixel owned by a relative universe.
    pub fn pixel_start(&self, relative: usize) -> usize {
        relative * self.pixels_per_universe
    }
}

/// What a single frame did to the pixel buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mapping {
    /// `pixels` triples were written starting at the universe's first pixel.
    Applied { relative: usize, pixels: usize },
    /// The universe is ours but the payload held no complete triple.
    Empty { relative: usize },
    /// Traffic for a universe this strip does not cover.
    OutOfRange,
}

/// Copy a frame's channel triples into its slice of the buffer.
pub fn apply_frame(
    buffer: &mut PixelBuffer,
    layout: &UniverseLayout,
    frame: &DmxFrame<'_>,
) -> Mapping {
    let Some(relative) = layout.relative(frame.universe) else {
        return Mapping::OutOfRange;
    };

    let pixel_start = layout.pixel_start(relative);
    let room = buffer.len().saturating_sub(pixel_start);
    let pixel_count = layout
        .pixels_per_universe()
        .min(frame.data.len() / CHANNELS_PER_PIXEL)
        .min(room);
    if pixel_count == 0 {
        return Mapping::Empty { relative };
    }

    let Some(window) = buffer.window_mut(pixel_start, pixel_count) else {
        return Mapping::Empty { relative };
    };
    let triples = frame.data[..pixel_count * CHANNELS_PER_PIXEL].chunks_exact(CHANNELS_PER_PIXEL);
    for (pixel, triple) in window.iter_mut().zip(triples) {
        *pixel = Pixel::new(triple[0], triple[1], triple[2]);
    }

    Mapping::Applied {
        relative,
        pixels: pixel_count,
    }
}

#[cfg(test)]
mod tests {
    use super::{Mapping, UniverseLayout, apply_frame};
    use crate::config::ConfigError;
    use crate::pixels::{Pixel, PixelBuffer};
    use crate::protocols::{DmxFrame, Protocol};

    fn frame(universe: u16, data: &[u8]) -> DmxFrame<'_> {
        DmxFrame {
            protocol: Protocol::ArtNet,
            universe,
            sequence: None,
            declared_len: data.len() as u16,
            data,
        }
    }

    #[test]
    fn layout_counts_universes_rounding_up() {
        let layout = UniverseLayout::new(300, 170, 0).unwrap();
        assert_eq!(layout.universe_count(), 2);
        let layout = UniverseLayout::new(340, 170, 0).unwrap();
        assert_eq!(layout.universe_count(), 2);
        let layout = UniverseLayout::new(341, 170, 0).unwrap();
        assert_eq!(layout.universe_count(), 3);
    }

    #[test]
    fn layout_rejects_more_pixels_than_a_universe_carries() {
        assert!(matches!(
            UniverseLayout::new(300, 171, 0),
            Err(ConfigError::PixelsPerUniverse { value: 171, max: 170 })
        ));
        assert!(UniverseLayout::new(0, 170, 0).is_err());
    }

    #[test]
    fn layout_rejects_universe_id_overflow() {
        assert!(matches!(
            UniverseLayout::new(300, 170, u16::MAX),
            Err(ConfigError::UniverseOverflow { .. })
        ));
    }

    #[test]
    fn relative_universe_respects_start_offset() {
        let layout = UniverseLayout::new(300, 170, 4).unwrap();
        assert_eq!(layout.relative(3), None);
        assert_eq!(layout.relative(4), Some(0));
        assert_eq!(layout.relative(5), Some(1));
        assert_eq!(layout.relative(6), None);
        assert_eq!(layout.universes().collect::<Vec<_>>(), vec![4, 5]);
    }

    #[test]
    fn copies_triples_in_received_order() {
        let layout = UniverseLayout::new(4, 2, 0).unwrap();
        let mut buffer = PixelBuffer::new(4);
        let data = [1, 2, 3, 4, 5, 6];

        let mapping = apply_frame(&mut buffer, &layout, &frame(1, &data));
        assert_eq!(mapping, Mapping::Applied { relative: 1, pixels: 2 });
        assert_eq!(
            buffer.as_slice(),
            &[Pixel::BLACK, Pixel::BLACK, Pixel::new(1, 2, 3), Pixel::new(4, 5, 6)]
        );
    }

    #[test]
    fn partial_triple_is_not_read() {
        let layout = UniverseLayout::new(10, 5, 0).unwrap();
        let mut buffer = PixelBuffer::new(10);
        let data = [9, 9, 9, 7, 7];

        let mapping = apply_frame(&mut buffer, &layout, &frame(0, &data));
        assert_eq!(mapping, Mapping::Applied { relative: 0, pixels: 1 });
        assert_eq!(buffer.as_slice()[1], Pixel::BLACK);
    }

    #[test]
    fn last_universe_is_clipped_to_strip_end() {
        let layout = UniverseLayout::new(300, 170, 0).unwrap();
        let mut buffer = PixelBuffer::new(300);
        let data = [0xff; 510];

        let mapping = apply_frame(&mut buffer, &layout, &frame(1, &data));
        assert_eq!(mapping, Mapping::Applied { relative: 1, pixels: 130 });
        assert!(buffer.as_slice()[170..].iter().all(|p| *p == Pixel::new(0xff, 0xff, 0xff)));
        assert!(buffer.as_slice()[..170].iter().all(|p| *p == Pixel::BLACK));
    }

    #[test]
    fn quota_limits_pixels_per_universe() {
        let layout = UniverseLayout::new(20, 2, 0).unwrap();
        let mut buffer = PixelBuffer::new(20);
        let data = [5u8; 30];

        let mapping = apply_frame(&mut buffer, &layout, &frame(0, &data));
        assert_eq!(mapping, Mapping::Applied { relative: 0, pixels: 2 });
        assert_eq!(buffer.as_slice()[2], Pixel::BLACK);
    }

    #[test]
    fn out_of_range_universe_leaves_buffer_untouched() {
        let layout = UniverseLayout::new(300, 170, 0).unwrap();
        let mut buffer = PixelBuffer::new(300);
        let before = buffer.clone();

        let mapping = apply_frame(&mut buffer, &layout, &frame(5, &[1u8; 512]));
        assert_eq!(mapping, Mapping::OutOfRange);
        assert_eq!(buffer, before);
    }

    #[test]
    fn short_payload_is_empty() {
        let layout = UniverseLayout::new(300, 170, 0).unwrap();
        let mut buffer = PixelBuffer::new(300);

        let mapping = apply_frame(&mut buffer, &layout, &frame(0, &[1, 2]));
        assert_eq!(mapping, Mapping::Empty { relative: 0 });
    }

    #[test]
    fn never_writes_past_buffer_for_any_payload_length() {
        for pixel_count in [1usize, 2, 169, 170, 171, 300, 511] {
            let layout = UniverseLayout::new(pixel_count, 170, 0).unwrap();
            for len in [0usize, 1, 2, 3, 4, 300, 509, 510, 511, 512] {
                let data = vec![0x42u8; len];
                for universe in layout.universes() {
                    let mut buffer = PixelBuffer::new(pixel_count);
                    let mapping = apply_frame(&mut buffer, &layout, &frame(universe, &data));
                    let written = buffer.as_slice().iter().filter(|p| **p != Pixel::BLACK).count();
                    match mapping {
                        Mapping::Applied { pixels, .. } => {
                            assert_eq!(written, pixels);
                            assert!(pixels * 3 <= len);
                        }
                        Mapping::Empty { .. } => assert_eq!(written, 0),
                        Mapping::OutOfRange => panic!("universe {universe} belongs to the strip"),
                    }
                    assert_eq!(buffer.len(), pixel_count);
                }
            }
        }
    }
}
