//! Adalight strip over a serial port.
//!
//! Frame: `Ada`, count high, count low, checksum (`hi ^ lo ^ 0x55`), then three
//! bytes per LED in the configured color order. The count field carries
//! `pixel_count - 1`, as Adalight receivers expect.

use std::io::Write;
use std::time::Duration;

use anyhow::{Context, Result};
use serialport::SerialPort;
use stripnode_core::{ColorOrder, DriverError, Pixel, PinConfig, StripDriver};

const MAGIC: &[u8; 3] = b"Ada";
const HEADER_LEN: usize = 6;
pub const DEFAULT_BAUD: u32 = 115_200;

pub struct AdalightStrip<W: Write> {
    port: W,
    color_order: ColorOrder,
    pixel_count: Option<usize>,
    frame: Vec<u8>,
}

impl AdalightStrip<Box<dyn SerialPort>> {
    pub fn open(path: &str, baud: u32, color_order: ColorOrder) -> Result<Self> {
        let port = serialport::new(path, baud)
            .data_bits(serialport::DataBits::Eight)
            .parity(serialport::Parity::None)
            .stop_bits(serialport::StopBits::One)
            .flow_control(serialport::FlowControl::None)
            .timeout(Duration::from_millis(1000))
            .open()
            .with_context(|| format!("failed to open serial port {path}"))?;
        tracing::info!(port = path, baud, "serial strip opened");
        Ok(Self::new(port, color_order))
    }
}

impl<W: Write> AdalightStrip<W> {
    pub fn new(port: W, color_order: ColorOrder) -> Self {
        Self {
            port,
            color_order,
            pixel_count: None,
            frame: Vec::new(),
        }
    }

    pub fn into_inner(self) -> W {
        self.port
    }

    fn send(&mut self) -> Result<(), DriverError> {
        self.port.write_all(&self.frame)?;
        self.port.flush()?;
        Ok(())
    }
}

fn header(pixel_count: usize) -> [u8; HEADER_LEN] {
    let count = u16::try_from(pixel_count.saturating_sub(1)).unwrap_or(u16::MAX);
    let [hi, lo] = count.to_be_bytes();
    [MAGIC[0], MAGIC[1], MAGIC[2], hi, lo, hi ^ lo ^ 0x55]
}

impl<W: Write> StripDriver for AdalightStrip<W> {
    fn initialize(&mut self, pixel_count: usize, pin: PinConfig) -> Result<(), DriverError> {
        tracing::debug!(pixel_count, data_pin = pin.data_pin, "adalight strip initialized");
        self.pixel_count = Some(pixel_count);
        self.frame = Vec::with_capacity(HEADER_LEN + pixel_count * 3);
        Ok(())
    }

    fn write_all(&mut self, pixels: &[Pixel]) -> Result<(), DriverError> {
        let expected = self.pixel_count.ok_or(DriverError::NotInitialized)?;
        if pixels.len() != expected {
            return Err(DriverError::LengthMismatch {
                expected,
                actual: pixels.len(),
            });
        }
        self.frame.clear();
        self.frame.extend_from_slice(&header(expected));
        self.color_order.encode_into(pixels, &mut self.frame);
        self.send()
    }

    fn clear(&mut self) -> Result<(), DriverError> {
        let pixel_count = self.pixel_count.ok_or(DriverError::NotInitialized)?;
        self.frame.clear();
        self.frame.extend_from_slice(&header(pixel_count));
        self.frame.resize(HEADER_LEN + pixel_count * 3, 0);
        self.send()
    }
}

#[cfg(test)]
mod tests {
    use super::{AdalightStrip, header};
    use stripnode_core::{ColorOrder, DriverError, Pixel, PinConfig, StripDriver};

    const PIN: PinConfig = PinConfig { data_pin: 6 };

    #[test]
    fn header_counts_from_zero() {
        assert_eq!(header(1), [b'A', b'd', b'a', 0, 0, 0x55]);
        // 300 LEDs -> 299 = 0x012b
        assert_eq!(header(300), [b'A', b'd', b'a', 0x01, 0x2b, 0x01 ^ 0x2b ^ 0x55]);
    }

    #[test]
    fn frame_uses_color_order() {
        let mut strip = AdalightStrip::new(Vec::new(), ColorOrder::Grb);
        strip.initialize(2, PIN).unwrap();
        strip
            .write_all(&[Pixel::new(1, 2, 3), Pixel::new(4, 5, 6)])
            .unwrap();
        let bytes = strip.into_inner();
        assert_eq!(&bytes[..3], b"Ada");
        assert_eq!(&bytes[6..], &[2, 1, 3, 5, 4, 6]);
    }

    #[test]
    fn clear_sends_dark_frame() {
        let mut strip = AdalightStrip::new(Vec::new(), ColorOrder::Rgb);
        strip.initialize(3, PIN).unwrap();
        strip.clear().unwrap();
        let bytes = strip.into_inner();
        assert_eq!(bytes.len(), 6 + 9);
        assert!(bytes[6..].iter().all(|b| *b == 0));
    }

    #[test]
    fn wrong_length_is_rejected() {
        let mut strip = AdalightStrip::new(Vec::new(), ColorOrder::Rgb);
        assert!(matches!(
            strip.write_all(&[Pixel::BLACK]),
            Err(DriverError::NotInitialized)
        ));
        strip.initialize(2, PIN).unwrap();
        assert!(matches!(
            strip.write_all(&[Pixel::BLACK]),
            Err(DriverError::LengthMismatch { expected: 2, actual: 1 })
        ));
    }
}
