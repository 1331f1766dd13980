//! Addressable LED strip
//!
//! Pixels are stored in wire order (green, red, blue) and pushed to the
//! strip in one transfer.

use serde::{Deserialize, Serialize};

/// One pixel in wire order
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grb {
    pub g: u8,
    pub r: u8,
    pub b: u8,
}

impl Grb {
    pub const OFF: Grb = Grb { g: 0, r: 0, b: 0 };

    pub const fn new(g: u8, r: u8, b: u8) -> Self {
        Self { g, r, b }
    }
}

/// Fixed-length frame for the strip
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    bytes: Vec<u8>,
}

impl PixelBuffer {
    pub fn new(pixel_count: usize) -> Self {
        Self {
            bytes: vec![0; pixel_count * 3],
        }
    }

    /// Paint every pixel the same color
    pub fn fill(&mut self, color: Grb) {
        for px in self.bytes.chunks_exact_mut(3) {
            px.copy_from_slice(&[color.g, color.r, color.b]);
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// Low-level strip transmitter
pub trait LedDriver: Send {
    /// Send one full frame; may block until the transfer completes
    fn transmit(&mut self, frame: &[u8]) -> Result<(), LedError>;
}

/// Strip with its current frame
pub struct LedStrip {
    driver: Box<dyn LedDriver>,
    frame: PixelBuffer,
    color: Grb,
    /// Bumped on every color change that reached the strip
    generation: u64,
}

impl LedStrip {
    pub fn new(driver: Box<dyn LedDriver>, pixel_count: usize) -> Self {
        Self {
            driver,
            frame: PixelBuffer::new(pixel_count),
            color: Grb::OFF,
            generation: 0,
        }
    }

    /// Fill the whole strip with one color and transmit it
    pub fn set_color(&mut self, g: u8, r: u8, b: u8) -> Result<(), LedError> {
        self.show(Grb::new(g, r, b))
    }

    /// Same as [`LedStrip::set_color`] for a prepared color
    pub fn show(&mut self, color: Grb) -> Result<(), LedError> {
        self.frame.fill(color);
        self.transmit()?;
        self.color = color;
        self.generation += 1;
        Ok(())
    }

    /// Push the current frame to the hardware
    pub fn transmit(&mut self) -> Result<(), LedError> {
        self.driver.transmit(self.frame.as_bytes())
    }

    /// Color last shown on the strip
    pub fn color(&self) -> Grb {
        self.color
    }

    /// Counter that moves whenever another color is shown
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Errors that can occur while driving the strip
#[derive(Debug, thiserror::Error)]
pub enum LedError {
    #[error("LED transfer failed: {0}")]
    Transfer(String),

    #[error("LED strip lock poisoned")]
    Poisoned,
}
