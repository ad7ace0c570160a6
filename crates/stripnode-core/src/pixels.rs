use serde::{Deserialize, Serialize};

/// One RGB pixel exactly as received on the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pixel {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Pixel {
    pub const BLACK: Pixel = Pixel::new(0, 0, 0);
    pub const RED: Pixel = Pixel::new(0xff, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// Fixed-length pixel storage for the whole strip.
///
/// Allocated once when the node starts; its length never changes afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    pixels: Box<[Pixel]>,
}

impl PixelBuffer {
    pub fn new(len: usize) -> Self {
        Self {
            pixels: vec![Pixel::BLACK; len].into_boxed_slice(),
        }
    }

    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    pub fn as_slice(&self) -> &[Pixel] {
        &self.pixels
    }

    /// Mutable window over `start..start + len`, or `None` when any part of
    /// it falls outside the buffer.
    pub fn window_mut(&mut self, start: usize, len: usize) -> Option<&mut [Pixel]> {
        let end = start.checked_add(len)?;
        self.pixels.get_mut(start..end)
    }

    pub fn fill(&mut self, pixel: Pixel) {
        self.pixels.fill(pixel);
    }
}
