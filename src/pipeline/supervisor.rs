//! Starts both loops on named threads and reports how they end

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tokio::sync::{broadcast, mpsc};
use tracing::{error, info, warn};

use crate::audio::AudioSource;
use crate::effectors::{EffectorDispatch, WakeFeedback};
use crate::events::HelmetEvent;
use crate::lifecycle::RunFlag;
use crate::recognition::{CommandRecognizer, RecognitionEngine};

use super::feed::FeedLoop;
use super::fetch::{FetchLoop, FetchOptions};
use super::PipelineError;

/// Everything the pipeline runs on
pub struct Components {
    pub source: Box<dyn AudioSource>,
    pub engine: Arc<dyn RecognitionEngine>,
    pub recognizer: Box<dyn CommandRecognizer>,
    pub dispatch: EffectorDispatch,
    pub feedback: WakeFeedback,
}

/// A loop that finished, and why
#[derive(Debug)]
pub struct LoopExit {
    pub name: &'static str,
    pub result: Result<(), PipelineError>,
}

/// Pipeline entry point
pub struct Pipeline;

impl Pipeline {
    /// Validate the components and start the fetch and feed threads
    pub fn start(
        components: Components,
        options: FetchOptions,
        event_tx: broadcast::Sender<HelmetEvent>,
    ) -> Result<PipelineHandle, PipelineError> {
        let Components {
            source,
            engine,
            recognizer,
            dispatch,
            feedback,
        } = components;

        let run_flag = RunFlag::new();
        let feed = FeedLoop::new(source, Arc::clone(&engine), run_flag.clone())?;
        let fetch = FetchLoop::new(
            engine,
            recognizer,
            dispatch,
            feedback,
            event_tx.clone(),
            options,
            run_flag.clone(),
        )?;

        let (exit_tx, exits) = mpsc::unbounded_channel();
        let mut threads = Vec::with_capacity(2);

        threads.push(spawn_loop(
            "fetch",
            run_flag.clone(),
            exit_tx.clone(),
            event_tx.clone(),
            move || fetch.run(),
        )?);

        match spawn_loop("feed", run_flag.clone(), exit_tx, event_tx, move || feed.run()) {
            Ok(handle) => threads.push(handle),
            Err(e) => {
                run_flag.clear();
                join_all(threads);
                return Err(e);
            }
        }

        info!("pipeline started");
        Ok(PipelineHandle {
            run_flag,
            exits,
            threads,
        })
    }
}

/// Running pipeline
pub struct PipelineHandle {
    run_flag: RunFlag,
    exits: mpsc::UnboundedReceiver<LoopExit>,
    threads: Vec<JoinHandle<()>>,
}

impl PipelineHandle {
    #[cfg(test)]
    pub fn run_flag(&self) -> &RunFlag {
        &self.run_flag
    }

    /// Wait for the next loop to finish
    pub async fn next_exit(&mut self) -> Option<LoopExit> {
        self.exits.recv().await
    }

    /// Stop both loops, wait for them and return exits not yet collected
    ///
    /// Blocks the calling thread; loops notice the cleared flag within one
    /// chunk or one fetch poll.
    pub fn shutdown(mut self) -> Vec<LoopExit> {
        if self.run_flag.clear() {
            info!("pipeline stop requested");
        }
        join_all(std::mem::take(&mut self.threads));

        let mut remaining = Vec::new();
        while let Ok(exit) = self.exits.try_recv() {
            remaining.push(exit);
        }
        remaining
    }
}

fn spawn_loop<F>(
    name: &'static str,
    run_flag: RunFlag,
    exit_tx: mpsc::UnboundedSender<LoopExit>,
    event_tx: broadcast::Sender<HelmetEvent>,
    body: F,
) -> Result<JoinHandle<()>, PipelineError>
where
    F: FnOnce() -> Result<(), PipelineError> + Send + 'static,
{
    thread::Builder::new()
        .name(name.to_string())
        .spawn(move || {
            let result = body();
            match &result {
                Ok(()) => info!(name, "loop exited"),
                Err(e) => error!(name, error = %e, "loop failed"),
            }

            // take the sibling down with us
            run_flag.clear();

            let _ = event_tx.send(HelmetEvent::LoopExited {
                name: name.to_string(),
                error: result.as_ref().err().map(|e| e.to_string()),
            });
            let _ = exit_tx.send(LoopExit { name, result });
        })
        .map_err(|source| PipelineError::Spawn { name, source })
}

fn join_all(threads: Vec<JoinHandle<()>>) {
    for handle in threads {
        let name = handle.thread().name().unwrap_or("unnamed").to_string();
        if handle.join().is_err() {
            warn!(%name, "loop thread panicked");
        }
    }
}
