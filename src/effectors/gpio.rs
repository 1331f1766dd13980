//! Auxiliary indicator line

use serde::{Deserialize, Serialize};

/// Output level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    Low,
    High,
}

/// A single push-pull output pin
pub trait GpioPin: Send {
    /// Pin number, for logging
    fn pin(&self) -> u8;

    fn set_level(&mut self, level: Level) -> Result<(), GpioError>;
}

/// Errors that can occur while driving a pin
#[derive(Debug, thiserror::Error)]
pub enum GpioError {
    #[error("gpio {pin} cannot be driven: {reason}")]
    Drive { pin: u8, reason: String },
}
