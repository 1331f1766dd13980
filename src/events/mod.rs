//! Events module for detection and actuation
//!
//! Provides structured event types published on the helmet event bus
//! whenever the detection state machine or the effectors do something
//! an operator might want to see.

use serde::{Deserialize, Serialize};

/// Events emitted by the fetch loop and the effector layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HelmetEvent {
    /// Wake word heard on some channel
    WakeWordDetected,

    /// Wake word confirmed on a specific channel, command recognition armed
    ChannelVerified {
        /// Index of the channel that triggered, if the engine reported one
        channel: Option<usize>,
    },

    /// Top-ranked command candidate taken from a recognition result
    CommandRecognized {
        command_id: i32,
        phrase_id: i32,
        confidence: f32,
    },

    /// Open sequence finished
    HelmetOpened,

    /// Close sequence finished
    HelmetClosed,

    /// Recognizer gave up waiting for a phrase
    CommandTimeout {
        /// Whatever text the recognizer had accumulated
        text: String,
    },

    /// One of the pipeline loops terminated
    LoopExited {
        name: String,
        /// Reason, if the loop ended on an error
        error: Option<String>,
    },
}

impl std::fmt::Display for HelmetEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HelmetEvent::WakeWordDetected => write!(f, "WAKE_WORD_DETECTED"),
            HelmetEvent::ChannelVerified {
                channel: Some(channel),
            } => write!(f, "CHANNEL_VERIFIED (channel {})", channel),
            HelmetEvent::ChannelVerified { channel: None } => write!(f, "CHANNEL_VERIFIED"),
            HelmetEvent::CommandRecognized {
                command_id,
                confidence,
                ..
            } => write!(f, "COMMAND_RECOGNIZED ({} @ {:.2})", command_id, confidence),
            HelmetEvent::HelmetOpened => write!(f, "HELMET_OPENED"),
            HelmetEvent::HelmetClosed => write!(f, "HELMET_CLOSED"),
            HelmetEvent::CommandTimeout { .. } => write!(f, "COMMAND_TIMEOUT"),
            HelmetEvent::LoopExited { name, error: None } => write!(f, "LOOP_EXITED ({})", name),
            HelmetEvent::LoopExited {
                name,
                error: Some(e),
            } => write!(f, "LOOP_EXITED ({}: {})", name, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization() {
        let event = HelmetEvent::CommandRecognized {
            command_id: 2,
            phrase_id: 5,
            confidence: 0.5,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("command_recognized"));
        assert!(json.contains("\"command_id\":2"));
    }

    #[test]
    fn test_event_deserialization() {
        let json = r#"{"type":"channel_verified","channel":1}"#;
        let event: HelmetEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event, HelmetEvent::ChannelVerified { channel: Some(1) });
    }

    #[test]
    fn test_unknown_trigger_channel() {
        let event = HelmetEvent::ChannelVerified { channel: None };
        assert_eq!(event.to_string(), "CHANNEL_VERIFIED");

        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(json, r#"{"type":"channel_verified","channel":null}"#);
    }

    #[test]
    fn test_loop_exit_display() {
        let event = HelmetEvent::LoopExited {
            name: "fetch".into(),
            error: Some("engine failed".into()),
        };
        assert_eq!(event.to_string(), "LOOP_EXITED (fetch: engine failed)");
    }
}
