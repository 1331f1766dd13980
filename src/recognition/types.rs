//! Values exchanged with the recognition engines

use serde::{Deserialize, Serialize};

/// Wake word state attached to every fetch result
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WakeState {
    /// Nothing heard
    #[default]
    None,
    /// Wake word heard on at least one channel
    Detected,
    /// Wake word confirmed on a specific channel
    ChannelVerified,
}

/// Engine-reported status of a fetch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FetchStatus {
    #[default]
    Ok,
    Fail,
}

/// One processed chunk handed out by the front-end
///
/// Consumed within a single fetch iteration and then dropped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchResult {
    pub status: FetchStatus,
    pub wake_state: WakeState,
    /// Channel that confirmed the wake word, when `wake_state` is `ChannelVerified`
    pub trigger_channel: Option<usize>,
    /// Processed single-channel audio for the command recognizer
    pub data: Vec<i16>,
}

/// Outcome of feeding one chunk to the command recognizer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecognizerState {
    /// Still accumulating, nothing to report yet
    Detecting,
    /// A phrase matched; ranked candidates are available
    Detected,
    /// No phrase matched within the recognizer's window
    Timeout,
}

/// A single ranked guess from the recognizer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CommandCandidate {
    pub command_id: i32,
    #[serde(default)]
    pub phrase_id: i32,
    pub confidence: f32,
}

/// Ranked candidates, best first, plus the recognized text
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecognitionResults {
    pub candidates: Vec<CommandCandidate>,
    pub text: String,
}

impl RecognitionResults {
    /// Highest-ranked candidate; lower ranks are informational only
    pub fn top(&self) -> Option<&CommandCandidate> {
        self.candidates.first()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_top_is_first_entry() {
        let results = RecognitionResults {
            candidates: vec![
                CommandCandidate {
                    command_id: 2,
                    phrase_id: 0,
                    confidence: 0.4,
                },
                CommandCandidate {
                    command_id: 0,
                    phrase_id: 1,
                    confidence: 0.9,
                },
            ],
            text: String::new(),
        };
        // rank order wins over confidence
        assert_eq!(results.top().map(|c| c.command_id), Some(2));
    }

    #[test]
    fn test_top_of_empty_list() {
        assert!(RecognitionResults::default().top().is_none());
    }

    #[test]
    fn test_wake_state_names() {
        let state: WakeState = serde_json::from_str("\"channel_verified\"").unwrap();
        assert_eq!(state, WakeState::ChannelVerified);
    }
}
