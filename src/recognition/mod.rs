//! Speech recognition seams
//!
//! The audio front-end (echo cancellation, beamforming, wake word) and the
//! multi-command recognizer are opaque engines. This module only describes
//! what the pipeline exchanges with them.

mod engine;
mod types;

pub use engine::{CommandRecognizer, EngineError, RecognitionEngine};
pub use types::{
    CommandCandidate, FetchResult, FetchStatus, RecognitionResults, RecognizerState, WakeState,
};
