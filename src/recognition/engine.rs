//! Engine traits

use std::time::Duration;

use super::types::{FetchResult, RecognitionResults, RecognizerState};

/// Audio front-end with wake word detection
///
/// Shared between the feed loop (ingest) and the fetch loop (fetch), so all
/// methods take `&self`. Chunks come back out in the order they went in.
pub trait RecognitionEngine: Send + Sync {
    /// Samples per channel expected by [`RecognitionEngine::ingest`]
    fn feed_chunk_samples(&self) -> usize;

    /// Samples in each [`FetchResult::data`]
    fn fetch_chunk_samples(&self) -> usize;

    /// Interleaved channels expected by [`RecognitionEngine::ingest`]
    fn channels(&self) -> usize;

    /// Push one interleaved chunk into the front-end
    fn ingest(&self, chunk: &[i16]) -> Result<(), EngineError>;

    /// Wait up to `timeout` for the next processed chunk
    ///
    /// `Ok(None)` means nothing was ready in time and the caller should poll
    /// again. An `Err` is terminal for the caller.
    fn fetch(&self, timeout: Duration) -> Result<Option<FetchResult>, EngineError>;

    /// Stop reporting wake words while a command is being listened for
    fn suppress_wake_detection(&self);

    /// Resume wake word reporting
    fn restore_wake_detection(&self);
}

/// Multi-command phrase recognizer, owned by the fetch loop
pub trait CommandRecognizer: Send {
    /// Samples per [`CommandRecognizer::step`]; must match the engine's fetch size
    fn chunk_samples(&self) -> usize;

    /// Feed one processed chunk
    fn step(&mut self, audio: &[i16]) -> RecognizerState;

    /// Ranked candidates of the last `Detected` (or partial text on timeout)
    fn results(&self) -> RecognitionResults;

    /// Drop any partially accumulated phrase
    fn clean(&mut self);

    /// Phrases the recognizer is listening for, as `(command_id, phrase)`
    fn active_commands(&self) -> Vec<(i32, String)>;
}

/// Errors reported by the recognition engines
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("fetch returned no result")]
    Absent,

    #[error("engine reported a failed fetch")]
    FetchFailed,

    #[error("chunk of {got} samples does not match expected {expected}")]
    ChunkSize { got: usize, expected: usize },

    #[error("recognition script exhausted")]
    Exhausted,

    #[error("engine state lock poisoned")]
    Poisoned,
}
