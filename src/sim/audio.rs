//! Silent microphone array

use std::time::Duration;

use crate::audio::{AudioError, AudioSource};

/// Produces silence, optionally paced like a real capture device
pub struct SyntheticAudioSource {
    channels: usize,
    sample_rate_hz: u32,
    realtime: bool,
    /// Chunks delivered before the device stops responding
    dropout_after: Option<u64>,
    pulled: u64,
}

impl SyntheticAudioSource {
    pub fn new(channels: usize, sample_rate_hz: u32, realtime: bool) -> Self {
        Self {
            channels,
            sample_rate_hz,
            realtime,
            dropout_after: None,
            pulled: 0,
        }
    }

    /// Fail every pull after `chunks` successful ones
    pub fn with_dropout(mut self, chunks: Option<u64>) -> Self {
        self.dropout_after = chunks;
        self
    }
}

impl AudioSource for SyntheticAudioSource {
    fn channels(&self) -> usize {
        self.channels
    }

    fn pull(&mut self, buf: &mut [i16]) -> Result<(), AudioError> {
        if self.channels == 0 || buf.len() % self.channels != 0 {
            return Err(AudioError::Misaligned {
                got: buf.len(),
                channels: self.channels,
            });
        }
        if self.dropout_after.is_some_and(|limit| self.pulled >= limit) {
            return Err(AudioError::Device(format!(
                "microphone stopped after {} chunks",
                self.pulled
            )));
        }
        self.pulled += 1;
        buf.fill(0);
        if self.realtime {
            let frames = (buf.len() / self.channels) as u64;
            let rate = u64::from(self.sample_rate_hz.max(1));
            std::thread::sleep(Duration::from_micros(frames * 1_000_000 / rate));
        }
        Ok(())
    }
}
