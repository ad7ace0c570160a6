//! Strip driver boundary.
//!
//! The core only ever hands a finished `&[Pixel]` to a [`StripDriver`]; wire
//! timing and color order belong to the driver. Writes are blocking and expected
//! to take time proportional to the strip length.

use std::io::Write;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::pixels::Pixel;

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("strip used before initialize")]
    NotInitialized,
    #[error("frame has {actual} pixels, strip has {expected}")]
    LengthMismatch { expected: usize, actual: usize },
}

/// Byte order the LEDs expect on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorOrder {
    #[default]
    Rgb,
    Grb,
    Bgr,
}

impl ColorOrder {
    pub fn channels(self, pixel: Pixel) -> [u8; 3] {
        match self {
            ColorOrder::Rgb => [pixel.r, pixel.g, pixel.b],
            ColorOrder::Grb => [pixel.g, pixel.r, pixel.b],
            ColorOrder::Bgr => [pixel.b, pixel.g, pixel.r],
        }
    }

    /// Append the wire bytes for `pixels` to `out`.
    pub fn encode_into(self, pixels: &[Pixel], out: &mut Vec<u8>) {
        out.reserve(pixels.len() * 3);
        for pixel in pixels {
            out.extend_from_slice(&self.channels(*pixel));
        }
    }
}

/// Hardware pin the strip's data line is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinConfig {
    pub data_pin: u8,
}

pub trait StripDriver {
    fn initialize(&mut self, pixel_count: usize, pin: PinConfig) -> Result<(), DriverError>;

    /// Push the whole buffer to the strip. Blocks until written.
    fn write_all(&mut self, pixels: &[Pixel]) -> Result<(), DriverError>;

    /// Turn every LED off.
    fn clear(&mut self) -> Result<(), DriverError>;
}

impl<D: StripDriver + ?Sized> StripDriver for Box<D> {
    fn initialize(&mut self, pixel_count: usize, pin: PinConfig) -> Result<(), DriverError> {
        (**self).initialize(pixel_count, pin)
    }

    fn write_all(&mut self, pixels: &[Pixel]) -> Result<(), DriverError> {
        (**self).write_all(pixels)
    }

    fn clear(&mut self) -> Result<(), DriverError> {
        (**self).clear()
    }
}

fn check_len(expected: Option<usize>, actual: usize) -> Result<usize, DriverError> {
    let expected = expected.ok_or(DriverError::NotInitialized)?;
    if expected != actual {
        return Err(DriverError::LengthMismatch { expected, actual });
    }
    Ok(expected)
}

/// Driver that discards frames, counting them.
#[derive(Debug, Default)]
pub struct NullStrip {
    pixel_count: Option<usize>,
    writes: u64,
}

impl NullStrip {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn writes(&self) -> u64 {
        self.writes
    }
}

impl StripDriver for NullStrip {
    fn initialize(&mut self, pixel_count: usize, _pin: PinConfig) -> Result<(), DriverError> {
        self.pixel_count = Some(pixel_count);
        Ok(())
    }

    fn write_all(&mut self, pixels: &[Pixel]) -> Result<(), DriverError> {
        check_len(self.pixel_count, pixels.len())?;
        self.writes += 1;
        Ok(())
    }

    fn clear(&mut self) -> Result<(), DriverError> {
        self.pixel_count.ok_or(DriverError::NotInitialized)?;
        Ok(())
    }
}

/// One line of [`JsonLinesStrip`] output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameRecord {
    pub frame: u64,
    pub pixel_count: usize,
    /// Wire bytes after color-order remapping.
    pub channels: Vec<u8>,
}

/// Driver that writes every frame as one JSON object per line.
pub struct JsonLinesStrip<W: Write> {
    writer: W,
    color_order: ColorOrder,
    pixel_count: Option<usize>,
    frames: u64,
    scratch: Vec<u8>,
}

impl<W: Write> JsonLinesStrip<W> {
    pub fn new(writer: W, color_order: ColorOrder) -> Self {
        Self {
            writer,
            color_order,
            pixel_count: None,
            frames: 0,
            scratch: Vec::new(),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn emit(&mut self, pixel_count: usize) -> Result<(), DriverError> {
        self.frames += 1;
        let record = FrameRecord {
            frame: self.frames,
            pixel_count,
            channels: std::mem::take(&mut self.scratch),
        };
        let written = serde_json::to_writer(&mut self.writer, &record);
        self.scratch = record.channels;
        written?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }
}

impl<W: Write> StripDriver for JsonLinesStrip<W> {
    fn initialize(&mut self, pixel_count: usize, _pin: PinConfig) -> Result<(), DriverError> {
        self.pixel_count = Some(pixel_count);
        self.scratch = Vec::with_capacity(pixel_count * 3);
        Ok(())
    }

    fn write_all(&mut self, pixels: &[Pixel]) -> Result<(), DriverError> {
        let pixel_count = check_len(self.pixel_count, pixels.len())?;
        self.scratch.clear();
        self.color_order.encode_into(pixels, &mut self.scratch);
        self.emit(pixel_count)
    }

    fn clear(&mut self) -> Result<(), DriverError> {
        let pixel_count = self.pixel_count.ok_or(DriverError::NotInitialized)?;
        self.scratch.clear();
        self.scratch.resize(pixel_count * 3, 0);
        self.emit(pixel_count)
    }
}
