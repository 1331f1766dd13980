//! Effectors: hinge servos, LED strip and indicator line
//!
//! Hardware drivers sit behind small traits; the dispatch layer owns them
//! and turns a recognized command into a bounded effector sequence.

mod dispatch;
mod feedback;
mod gpio;
mod led;
mod servo;

pub use dispatch::{EffectorDispatch, EffectorError, HelmetPose};
pub use feedback::WakeFeedback;
pub use gpio::{GpioError, GpioPin, Level};
pub use led::{Grb, LedDriver, LedError, LedStrip};
pub use servo::{ServoChannel, ServoConfig, ServoController, ServoError};
