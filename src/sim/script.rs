//! Recognition scripts
//!
//! A script is a JSON array of frames. Each frame is what the engines
//! report for one processed chunk:
//!
//! ```json
//! [
//!   {"wake": "detected"},
//!   {"wake": "channel_verified", "channel": 0},
//!   {"recognizer": "detected", "candidates": [{"command_id": 0, "confidence": 0.9}]},
//!   {"recognizer": "timeout", "text": ""}
//! ]
//! ```

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::recognition::{CommandCandidate, RecognizerState, WakeState};

fn detecting() -> RecognizerState {
    RecognizerState::Detecting
}

/// Engine output for one chunk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptFrame {
    #[serde(default)]
    pub wake: WakeState,
    #[serde(default)]
    pub channel: Option<usize>,
    /// Answer of the command recognizer if it is stepped on this chunk
    #[serde(default = "detecting")]
    pub recognizer: RecognizerState,
    #[serde(default)]
    pub candidates: Vec<CommandCandidate>,
    #[serde(default)]
    pub text: String,
    /// Make the front-end report a failed fetch
    #[serde(default)]
    pub fail: bool,
    /// Make the front-end hand out no result at all
    #[serde(default)]
    pub absent: bool,
}

impl Default for ScriptFrame {
    fn default() -> Self {
        Self {
            wake: WakeState::None,
            channel: None,
            recognizer: RecognizerState::Detecting,
            candidates: Vec::new(),
            text: String::new(),
            fail: false,
            absent: false,
        }
    }
}

impl ScriptFrame {
    pub fn idle() -> Self {
        Self::default()
    }

    pub fn wake() -> Self {
        Self {
            wake: WakeState::Detected,
            ..Self::default()
        }
    }

    pub fn verified(channel: usize) -> Self {
        Self {
            wake: WakeState::ChannelVerified,
            channel: Some(channel),
            ..Self::default()
        }
    }

    pub fn command(candidates: Vec<CommandCandidate>, text: &str) -> Self {
        Self {
            recognizer: RecognizerState::Detected,
            candidates,
            text: text.to_string(),
            ..Self::default()
        }
    }

    pub fn timeout(text: &str) -> Self {
        Self {
            recognizer: RecognizerState::Timeout,
            text: text.to_string(),
            ..Self::default()
        }
    }

    #[cfg(test)]
    pub fn failure() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    #[cfg(test)]
    pub fn absent() -> Self {
        Self {
            absent: true,
            ..Self::default()
        }
    }
}

/// Ordered list of frames replayed by the scripted engine
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Script {
    pub frames: Vec<ScriptFrame>,
}

impl Script {
    #[cfg(test)]
    pub fn new(frames: Vec<ScriptFrame>) -> Self {
        Self { frames }
    }

    /// Parse a script from JSON text
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Read a script file
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read script {}", path.display()))?;
        Self::from_json(&json).with_context(|| format!("invalid script {}", path.display()))
    }

    /// Open, wait out the window, then close
    pub fn demo() -> Self {
        let open = CommandCandidate {
            command_id: 0,
            phrase_id: 0,
            confidence: 0.92,
        };
        let close = CommandCandidate {
            command_id: 2,
            phrase_id: 2,
            confidence: 0.88,
        };

        let mut frames = Vec::new();
        for (candidate, text) in [(open, "open helmet"), (close, "close helmet")] {
            frames.extend(std::iter::repeat_with(ScriptFrame::idle).take(10));
            frames.push(ScriptFrame::wake());
            frames.push(ScriptFrame::verified(0));
            frames.extend(std::iter::repeat_with(ScriptFrame::idle).take(5));
            frames.push(ScriptFrame::command(vec![candidate], text));
            frames.extend(std::iter::repeat_with(ScriptFrame::idle).take(5));
            frames.push(ScriptFrame::timeout(""));
        }
        Self { frames }
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}
