//! Feed loop: microphones into the front-end

use std::sync::Arc;

use tracing::{debug, info};

use crate::audio::{AudioSource, ChunkLayout};
use crate::lifecycle::RunFlag;
use crate::recognition::RecognitionEngine;

use super::PipelineError;

/// Pulls fixed-size chunks from the source and ingests them
pub struct FeedLoop {
    source: Box<dyn AudioSource>,
    engine: Arc<dyn RecognitionEngine>,
    layout: ChunkLayout,
    run_flag: RunFlag,
}

impl FeedLoop {
    /// Check that the source can satisfy the engine and size the chunk
    pub fn new(
        source: Box<dyn AudioSource>,
        engine: Arc<dyn RecognitionEngine>,
        run_flag: RunFlag,
    ) -> Result<Self, PipelineError> {
        let available = source.channels();
        let wanted = engine.channels();
        if wanted > available {
            return Err(PipelineError::ChannelMismatch {
                engine: wanted,
                available,
            });
        }
        let layout = ChunkLayout::new(engine.feed_chunk_samples(), available);
        if layout.is_empty() {
            return Err(PipelineError::EmptyChunk);
        }
        Ok(Self {
            source,
            engine,
            layout,
            run_flag,
        })
    }

    #[cfg(test)]
    pub fn layout(&self) -> ChunkLayout {
        self.layout
    }

    /// Run until the run flag clears or the source or engine fails
    pub fn run(mut self) -> Result<(), PipelineError> {
        let mut buf = vec![0i16; self.layout.len()];
        info!(
            samples = self.layout.samples,
            channels = self.layout.channels,
            "feed loop started"
        );

        let mut chunks: u64 = 0;
        while self.run_flag.is_raised() {
            self.source.pull(&mut buf)?;
            self.engine.ingest(&buf)?;
            chunks += 1;
        }

        debug!(chunks, "feed loop stopped");
        Ok(())
    }
}
