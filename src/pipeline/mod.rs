//! Audio pipeline: feed loop, fetch/dispatch loop and their supervisor
//!
//! Two long-lived threads share the recognition engine. The feed thread
//! pushes microphone chunks in; the fetch thread pulls processed chunks
//! out, runs the detection state machine and drives the effectors. Either
//! thread ending clears the shared run flag so the other follows.

mod feed;
mod fetch;
mod supervisor;

pub use fetch::FetchOptions;
pub use supervisor::{Components, LoopExit, Pipeline};

use crate::audio::AudioError;
use crate::effectors::EffectorError;
use crate::recognition::EngineError;

/// Errors that end a pipeline loop or prevent it from starting
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("engine expects {engine} channels but the audio source only has {available}")]
    ChannelMismatch { engine: usize, available: usize },

    #[error("engine asked for an empty feed chunk")]
    EmptyChunk,

    #[error("recognizer chunk of {recognizer} samples does not match engine chunk of {engine}")]
    ChunkMismatch { recognizer: usize, engine: usize },

    #[error("audio source: {0}")]
    Audio(#[from] AudioError),

    #[error("recognition engine: {0}")]
    Engine(#[from] EngineError),

    #[error("effector: {0}")]
    Effector(#[from] EffectorError),

    #[error("failed to spawn {name} thread: {source}")]
    Spawn {
        name: &'static str,
        #[source]
        source: std::io::Error,
    },
}
