//! Audio source seam
//!
//! The board's I2S front-end hands out interleaved 16-bit PCM frames.
//! Everything above this module only sees [`AudioSource`].

/// Shape of one feed chunk: samples per channel times channel count
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkLayout {
    /// Samples per channel
    pub samples: usize,
    /// Interleaved channel count
    pub channels: usize,
}

impl ChunkLayout {
    pub fn new(samples: usize, channels: usize) -> Self {
        Self { samples, channels }
    }

    /// Total interleaved sample count
    pub fn len(&self) -> usize {
        self.samples * self.channels
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Blocking source of interleaved PCM audio
pub trait AudioSource: Send {
    /// Number of interleaved channels this source produces
    fn channels(&self) -> usize;

    /// Fill `buf` completely, blocking until enough audio is available
    fn pull(&mut self, buf: &mut [i16]) -> Result<(), AudioError>;
}

/// Errors that can occur while reading audio
#[derive(Debug, thiserror::Error)]
pub enum AudioError {
    #[error("buffer of {got} samples is not a multiple of {channels} channels")]
    Misaligned { got: usize, channels: usize },

    #[error("audio device unavailable: {0}")]
    Device(String),
}
