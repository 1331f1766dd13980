//! Core state machine implementation
//!
//! Handles transitions between Idle, ChannelVerified and CommandActive
//! based on what the recognition engines report. Owned by the fetch loop;
//! nothing else reads or writes the state directly, observers get
//! [`HelmetEvent`]s instead.

use std::time::Instant;

use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::events::HelmetEvent;
use crate::recognition::{CommandCandidate, WakeState};

/// The three detection states
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DetectionState {
    /// Not listening for commands
    #[default]
    Idle,
    /// Wake word verified, recognizer armed
    ChannelVerified,
    /// Command handled, waiting for the recognizer to time out
    CommandActive,
}

impl std::fmt::Display for DetectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DetectionState::Idle => write!(f, "Idle"),
            DetectionState::ChannelVerified => write!(f, "ChannelVerified"),
            DetectionState::CommandActive => write!(f, "CommandActive"),
        }
    }
}

/// What the fetch loop should do about a wake report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WakeAction {
    /// Nothing
    None,
    /// Flash the LEDs and clear the recognizer
    Acknowledge,
    /// Recognition just got armed
    Arm,
}

/// The state machine that gates command recognition
pub struct DetectionMachine {
    /// Current state
    state: DetectionState,
    /// Time when current non-Idle state was entered
    state_entered_at: Option<Instant>,
    /// Channel for emitting helmet events
    event_tx: broadcast::Sender<HelmetEvent>,
}

impl DetectionMachine {
    /// Create a new state machine in Idle
    pub fn new(event_tx: broadcast::Sender<HelmetEvent>) -> Self {
        Self {
            state: DetectionState::Idle,
            state_entered_at: None,
            event_tx,
        }
    }

    /// Get the current state
    pub fn state(&self) -> DetectionState {
        self.state
    }

    /// Whether recognized audio should go to the command recognizer
    pub fn is_armed(&self) -> bool {
        matches!(
            self.state,
            DetectionState::ChannelVerified | DetectionState::CommandActive
        )
    }

    /// Handle the wake state of one fetch result
    ///
    /// A plain detection never changes state. Verification only arms from
    /// Idle; a verification while already armed is ignored.
    pub fn on_wake(&mut self, wake: WakeState, channel: Option<usize>) -> WakeAction {
        match wake {
            WakeState::None => WakeAction::None,
            WakeState::Detected => {
                info!("wake word detected");
                self.emit(HelmetEvent::WakeWordDetected);
                WakeAction::Acknowledge
            }
            WakeState::ChannelVerified if self.state == DetectionState::Idle => {
                info!(?channel, "wake word channel verified");
                self.transition_to(DetectionState::ChannelVerified);
                self.emit(HelmetEvent::ChannelVerified { channel });
                WakeAction::Arm
            }
            WakeState::ChannelVerified => {
                debug!(state = %self.state, "channel verification while armed, ignoring");
                WakeAction::None
            }
        }
    }

    /// Record that the top-ranked candidate was dispatched
    pub fn on_command(&mut self, candidate: &CommandCandidate) {
        self.emit(HelmetEvent::CommandRecognized {
            command_id: candidate.command_id,
            phrase_id: candidate.phrase_id,
            confidence: candidate.confidence,
        });
        if self.is_armed() && self.state != DetectionState::CommandActive {
            self.transition_to(DetectionState::CommandActive);
        }
    }

    /// Recognizer window closed; go back to waiting for the wake word
    pub fn on_timeout(&mut self, text: String) {
        info!(%text, "command recognition timed out");
        self.emit(HelmetEvent::CommandTimeout { text });
        if self.state != DetectionState::Idle {
            self.transition_to(DetectionState::Idle);
        }
    }

    /// Perform a state transition
    fn transition_to(&mut self, new_state: DetectionState) {
        let old_state = self.state;
        let duration_ms = self
            .state_entered_at
            .map(|t| t.elapsed().as_millis() as u64)
            .unwrap_or(0);

        info!(
            from = %old_state,
            to = %new_state,
            duration_ms = duration_ms,
            "state transition"
        );

        self.state = new_state;
        self.state_entered_at = if new_state != DetectionState::Idle {
            Some(Instant::now())
        } else {
            None
        };
    }

    fn emit(&self, event: HelmetEvent) {
        debug!(?event, "emitting event");
        let _ = self.event_tx.send(event);
    }
}
