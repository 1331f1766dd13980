//! Host simulation board
//!
//! Stands in for the I2S microphones, the speech engines and the PWM/RMT
//! peripherals so the whole pipeline runs on a workstation. Recognition
//! follows a JSON script; every effector call is logged and recorded.

mod audio;
mod board;
mod engine;
mod recorder;
mod script;

pub use board::SimBoard;

#[cfg(test)]
pub use audio::SyntheticAudioSource;
#[cfg(test)]
pub use engine::{scripted_pair, ScriptedEngine};
#[cfg(test)]
pub use recorder::{Call, CallLog, RecordingGpio, RecordingLed, RecordingServo};
#[cfg(test)]
pub use script::{Script, ScriptFrame};
