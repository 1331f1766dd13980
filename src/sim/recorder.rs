//! Effector drivers that log and record every call

use std::sync::{Arc, Mutex};

use tracing::{debug, info};

use crate::effectors::{
    GpioError, GpioPin, Grb, LedDriver, LedError, Level, ServoChannel, ServoConfig,
    ServoController, ServoError,
};

/// One recorded effector call
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    ServoInit,
    ServoAngle { channel: ServoChannel, degrees: u16 },
    ServoDeinit,
    /// Frame transmitted; color of the first pixel
    Led(Grb),
    Gpio { pin: u8, level: Level },
}

/// Shared, ordered record of effector calls
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    calls: Arc<Mutex<Vec<Call>>>,
}

impl CallLog {
    fn push(&self, call: Call) {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(call);
    }

    /// Snapshot of every call so far
    pub fn calls(&self) -> Vec<Call> {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// `(channel, degrees)` of every servo write, in order
    #[cfg(test)]
    pub fn servo_angles(&self) -> Vec<(ServoChannel, u16)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::ServoAngle { channel, degrees } => Some((channel, degrees)),
                _ => None,
            })
            .collect()
    }
}

/// Servo pair that only logs
pub struct RecordingServo {
    log: CallLog,
    config: Option<ServoConfig>,
}

impl RecordingServo {
    pub fn new(log: CallLog) -> Self {
        Self { log, config: None }
    }
}

impl ServoController for RecordingServo {
    fn initialize(&mut self, config: &ServoConfig) -> Result<(), ServoError> {
        if self.config.is_some() {
            return Err(ServoError::Peripheral("LEDC timer already running".into()));
        }
        debug!(
            pins = ?config.pins,
            period_us = config.period().as_micros() as u64,
            "servo timers started"
        );
        self.config = Some(config.clone());
        self.log.push(Call::ServoInit);
        Ok(())
    }

    fn set_angle(&mut self, channel: ServoChannel, degrees: u16) -> Result<(), ServoError> {
        let config = self.config.as_ref().ok_or(ServoError::NotInitialized)?;
        let pin = *config
            .pins
            .get(channel)
            .ok_or(ServoError::NoSuchChannel(channel))?;
        let pulse_us = config.pulse_width_us(degrees)?;
        info!(channel, pin, degrees, pulse_us, "servo angle");
        self.log.push(Call::ServoAngle { channel, degrees });
        Ok(())
    }

    fn deinitialize(&mut self) -> Result<(), ServoError> {
        if self.config.take().is_some() {
            debug!("servo timers stopped");
            self.log.push(Call::ServoDeinit);
        }
        Ok(())
    }
}

/// LED transmitter that only logs
pub struct RecordingLed {
    log: CallLog,
}

impl RecordingLed {
    pub fn new(log: CallLog) -> Self {
        Self { log }
    }
}

impl LedDriver for RecordingLed {
    fn transmit(&mut self, frame: &[u8]) -> Result<(), LedError> {
        let color = match frame {
            [g, r, b, ..] if frame.len() % 3 == 0 => Grb::new(*g, *r, *b),
            _ => {
                return Err(LedError::Transfer(format!(
                    "frame of {} bytes is not whole pixels",
                    frame.len()
                )))
            }
        };
        info!(pixels = frame.len() / 3, g = color.g, r = color.r, b = color.b, "led frame");
        self.log.push(Call::Led(color));
        Ok(())
    }
}

/// Highest pad number on the controller
const MAX_GPIO: u8 = 48;

/// Indicator pin that only logs
pub struct RecordingGpio {
    pin: u8,
    log: CallLog,
}

impl RecordingGpio {
    pub fn new(pin: u8, log: CallLog) -> Self {
        Self { pin, log }
    }
}

impl GpioPin for RecordingGpio {
    fn pin(&self) -> u8 {
        self.pin
    }

    fn set_level(&mut self, level: Level) -> Result<(), GpioError> {
        if self.pin > MAX_GPIO {
            return Err(GpioError::Drive {
                pin: self.pin,
                reason: format!("controller only has pads 0..={}", MAX_GPIO),
            });
        }
        info!(pin = self.pin, ?level, "gpio level");
        self.log.push(Call::Gpio {
            pin: self.pin,
            level,
        });
        Ok(())
    }
}
