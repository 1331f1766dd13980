//! Detection state machine
//!
//! Three states gate command recognition:
//! - Idle: waiting for a verified wake word
//! - ChannelVerified: wake word confirmed, recognizer armed
//! - CommandActive: a command was acted on, cooling down until timeout

mod machine;

pub use machine::{DetectionMachine, DetectionState, WakeAction};
