//! Configuration loading and management

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{ensure, Context, Result};

use crate::effectors::{Grb, HelmetPose, ServoConfig};
use crate::pipeline::FetchOptions;

/// Controller configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Microphone sample rate
    pub sample_rate_hz: u32,

    /// Samples per channel in one feed chunk
    pub chunk_samples: usize,

    /// Interleaved channels delivered by the microphone front-end
    pub feed_channels: usize,

    /// Channels the speech front-end consumes (mics plus playback reference)
    pub engine_channels: usize,

    /// Pace synthetic audio like a real capture device
    pub pace_audio: bool,

    /// Simulated microphone stops responding after this many chunks
    pub audio_dropout: Option<u64>,

    /// Hinge servo wiring and timing
    pub servo: ServoConfig,

    pub open_pose: HelmetPose,

    pub close_pose: HelmetPose,

    /// Auxiliary indicator line toggled with the faceplate
    pub indicator_pin: u8,

    /// Pixels on the LED strip
    pub pixel_count: usize,

    /// Wake word acknowledgement flash
    pub wake_flash_color: Grb,
    pub wake_flash: Duration,

    /// Silence wake reports while a command is being listened for
    pub suppress_wake_while_armed: bool,

    /// Longest single wait on the engine before the run flag is rechecked
    pub fetch_poll: Duration,

    /// Recognition script for the simulated board; built-in demo if unset
    pub script: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sample_rate_hz: 16_000,
            chunk_samples: 512,
            feed_channels: 2,
            engine_channels: 2,
            pace_audio: true,
            audio_dropout: None,
            servo: ServoConfig::default(),
            open_pose: HelmetPose::open(),
            close_pose: HelmetPose::close(),
            indicator_pin: 38,
            pixel_count: 8,
            wake_flash_color: Grb::new(40, 40, 40),
            wake_flash: Duration::from_millis(250),
            suppress_wake_while_armed: false,
            fetch_poll: Duration::from_millis(100),
            script: None,
        }
    }
}

impl Config {
    /// Load configuration from environment and defaults
    pub fn load() -> Result<Self> {
        let config = Self::from_lookup(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `HELMET_*` overrides found through `lookup` on top of the defaults
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        override_with(&lookup, "HELMET_SAMPLE_RATE", &mut config.sample_rate_hz)?;
        override_with(&lookup, "HELMET_CHUNK_SAMPLES", &mut config.chunk_samples)?;
        override_with(&lookup, "HELMET_FEED_CHANNELS", &mut config.feed_channels)?;
        override_with(&lookup, "HELMET_ENGINE_CHANNELS", &mut config.engine_channels)?;
        override_with(&lookup, "HELMET_PACE_AUDIO", &mut config.pace_audio)?;
        override_with(&lookup, "HELMET_OPEN_ANGLE", &mut config.open_pose.logical_angle)?;
        override_with(&lookup, "HELMET_CLOSE_ANGLE", &mut config.close_pose.logical_angle)?;
        override_with(&lookup, "HELMET_INDICATOR_PIN", &mut config.indicator_pin)?;
        override_with(&lookup, "HELMET_LED_PIXELS", &mut config.pixel_count)?;
        override_with(&lookup, "HELMET_SUPPRESS_WAKE", &mut config.suppress_wake_while_armed)?;

        override_millis(&lookup, "HELMET_SERVO_SETTLE_MS", &mut config.servo.settle)?;
        override_millis(&lookup, "HELMET_WAKE_FLASH_MS", &mut config.wake_flash)?;
        override_millis(&lookup, "HELMET_FETCH_POLL_MS", &mut config.fetch_poll)?;

        if let Some(raw) = lookup("HELMET_AUDIO_DROPOUT") {
            let chunks = raw
                .trim()
                .parse()
                .with_context(|| format!("invalid value {:?} for HELMET_AUDIO_DROPOUT", raw))?;
            config.audio_dropout = Some(chunks);
        }

        if let Some(path) = lookup("HELMET_SCRIPT") {
            config.script = Some(PathBuf::from(path));
        }

        Ok(config)
    }

    /// Reject settings the hardware cannot honor
    pub fn validate(&self) -> Result<()> {
        ensure!(self.chunk_samples > 0, "chunk size must be non-zero");
        ensure!(self.sample_rate_hz > 0, "sample rate must be non-zero");
        ensure!(self.feed_channels > 0, "at least one feed channel is required");
        ensure!(
            self.engine_channels <= self.feed_channels,
            "speech front-end wants {} channels but only {} are fed",
            self.engine_channels,
            self.feed_channels
        );
        ensure!(
            self.servo.min_pulse_us < self.servo.max_pulse_us,
            "servo pulse range {}..{}us is empty",
            self.servo.min_pulse_us,
            self.servo.max_pulse_us
        );
        ensure!(self.servo.max_angle > 0, "servo travel must be non-zero");
        for (name, pose) in [("open", &self.open_pose), ("close", &self.close_pose)] {
            ensure!(
                pose.logical_angle <= self.servo.max_angle,
                "{} angle {} exceeds servo travel of {}",
                name,
                pose.logical_angle,
                self.servo.max_angle
            );
        }
        ensure!(self.pixel_count > 0, "LED strip needs at least one pixel");
        Ok(())
    }

    pub fn fetch_options(&self) -> FetchOptions {
        FetchOptions {
            suppress_wake_while_armed: self.suppress_wake_while_armed,
            poll: self.fetch_poll,
        }
    }

    /// Defaults with every delay removed and unpaced audio
    #[cfg(test)]
    pub fn instant() -> Self {
        let mut config = Self::default();
        config.pace_audio = false;
        config.servo.settle = Duration::ZERO;
        config.open_pose.indicator_delay = Duration::ZERO;
        config.close_pose.indicator_delay = Duration::ZERO;
        config.wake_flash = Duration::ZERO;
        config.fetch_poll = Duration::from_millis(10);
        config
    }
}

fn override_with<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    slot: &mut T,
) -> Result<()>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    if let Some(raw) = lookup(key) {
        *slot = raw
            .trim()
            .parse()
            .with_context(|| format!("invalid value {:?} for {}", raw, key))?;
    }
    Ok(())
}

fn override_millis(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    slot: &mut Duration,
) -> Result<()> {
    let mut millis = slot.as_millis() as u64;
    override_with(lookup, key, &mut millis)?;
    *slot = Duration::from_millis(millis);
    Ok(())
}
