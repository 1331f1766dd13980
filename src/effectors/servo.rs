//! Servo pair driving the faceplate hinges
//!
//! The two motors are mounted facing each other, so one logical angle maps
//! to `angle` on channel 0 and `max_angle - angle` on channel 1.

use std::time::Duration;

use tracing::{debug, warn};

/// Static servo wiring and timing
#[derive(Debug, Clone, PartialEq)]
pub struct ServoConfig {
    /// Full mechanical travel in degrees
    pub max_angle: u16,
    /// Pulse width at 0 degrees
    pub min_pulse_us: u32,
    /// Pulse width at `max_angle`
    pub max_pulse_us: u32,
    /// PWM frame rate
    pub frequency_hz: u32,
    /// Signal pins for channel 0 and channel 1
    pub pins: [u8; 2],
    /// Time allowed for the motors to finish travelling
    pub settle: Duration,
}

impl Default for ServoConfig {
    fn default() -> Self {
        Self {
            max_angle: 180,
            min_pulse_us: 500,
            max_pulse_us: 2500,
            frequency_hz: 50,
            pins: [4, 5],
            settle: Duration::from_millis(300),
        }
    }
}

impl ServoConfig {
    /// Pulse width for `angle`, linear across the configured range
    pub fn pulse_width_us(&self, angle: u16) -> Result<u32, ServoError> {
        if angle > self.max_angle {
            return Err(ServoError::AngleOutOfRange {
                angle,
                max: self.max_angle,
            });
        }
        let span = self.max_pulse_us - self.min_pulse_us;
        Ok(self.min_pulse_us + span * u32::from(angle) / u32::from(self.max_angle))
    }

    /// Angle on the opposite-facing motor for the same logical position
    pub fn mirrored(&self, angle: u16) -> u16 {
        self.max_angle.saturating_sub(angle)
    }

    /// PWM frame period
    pub fn period(&self) -> Duration {
        Duration::from_micros(1_000_000 / u64::from(self.frequency_hz.max(1)))
    }
}

/// Motor channel index
pub type ServoChannel = usize;

/// Hardware PWM servo driver
pub trait ServoController: Send {
    /// Claim the PWM peripheral and start the frame timer
    fn initialize(&mut self, config: &ServoConfig) -> Result<(), ServoError>;

    /// Hold `channel` at `degrees`
    fn set_angle(&mut self, channel: ServoChannel, degrees: u16) -> Result<(), ServoError>;

    /// Stop the pulses and release the peripheral
    fn deinitialize(&mut self) -> Result<(), ServoError>;
}

/// Energized servo pair, released on drop
///
/// Motors are only powered for the duration of one motion; holding them
/// between commands heats them against the printed hinges.
pub struct ServoSession<'a> {
    controller: &'a mut dyn ServoController,
    config: &'a ServoConfig,
}

impl<'a> ServoSession<'a> {
    /// Initialize the controller and return the live session
    pub fn open(
        controller: &'a mut dyn ServoController,
        config: &'a ServoConfig,
    ) -> Result<Self, ServoError> {
        controller.initialize(config)?;
        debug!(pins = ?config.pins, "servo session opened");
        Ok(Self { controller, config })
    }

    /// Drive both channels to the logical `angle`
    pub fn drive(&mut self, angle: u16) -> Result<(), ServoError> {
        self.config.pulse_width_us(angle)?;
        self.controller.set_angle(0, angle)?;
        self.controller.set_angle(1, self.config.mirrored(angle))?;
        Ok(())
    }

    /// Block while the motors travel
    pub fn settle(&self) {
        std::thread::sleep(self.config.settle);
    }

    /// Release explicitly, surfacing any error
    pub fn close(self) -> Result<(), ServoError> {
        let mut this = std::mem::ManuallyDrop::new(self);
        this.controller.deinitialize()
    }
}

impl Drop for ServoSession<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.controller.deinitialize() {
            warn!(?e, "failed to release servos");
        }
    }
}

/// Errors that can occur while driving the servos
#[derive(Debug, thiserror::Error)]
pub enum ServoError {
    #[error("angle {angle} exceeds servo travel of {max} degrees")]
    AngleOutOfRange { angle: u16, max: u16 },

    #[error("servo channel {0} does not exist")]
    NoSuchChannel(ServoChannel),

    #[error("servo controller used before initialization")]
    NotInitialized,

    #[error("PWM peripheral error: {0}")]
    Peripheral(String),
}
