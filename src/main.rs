//! helmet-voice: voice-command controller for a motorized helmet
//!
//! A wake word arms the recognizer, a spoken command opens or closes the
//! faceplate. The controller provides:
//! - A feed loop pushing microphone audio into the speech front-end
//! - A fetch loop running the detection state machine
//! - Effector dispatch for the hinge servos, LED strip and indicator line
//!
//! On a workstation the speech engines and peripherals are simulated; the
//! recognition sequence comes from a JSON script (`HELMET_SCRIPT`).

mod audio;
mod command;
mod config;
mod effectors;
mod events;
mod lifecycle;
mod pipeline;
mod recognition;
mod sim;
mod state;

use anyhow::Result;
use tokio::sync::broadcast;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::events::HelmetEvent;
use crate::lifecycle::ShutdownSignal;
use crate::pipeline::{LoopExit, Pipeline};
use crate::sim::SimBoard;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "helmet-voice starting");

    // Load configuration
    let config = Config::load()?;
    info!(
        chunk_samples = config.chunk_samples,
        feed_channels = config.feed_channels,
        pixels = config.pixel_count,
        "configuration loaded"
    );

    let shutdown = ShutdownSignal::new();

    // Fetch loop -> event logger
    let (event_tx, mut event_rx) = broadcast::channel::<HelmetEvent>(64);

    let (board, components) = SimBoard::from_config(&config)?;
    let mut pipeline = Pipeline::start(components, config.fetch_options(), event_tx)?;

    info!("controller initialized, entering main loop");

    tokio::select! {
        exit = pipeline.next_exit() => {
            if let Some(exit) = exit {
                report_exit(&exit);
            }
        }

        result = shutdown.wait() => {
            match result {
                Ok(()) => info!("shutdown signal received"),
                Err(e) => error!(?e, "failed to install signal handlers"),
            }
        }

        _ = async {
            loop {
                match event_rx.recv().await {
                    Ok(event) => info!(%event, "helmet event"),
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(skipped = n, "event receiver lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        } => {
            info!("event handler exited");
        }
    }

    // Cleanup
    info!("shutting down...");

    let remaining = tokio::task::spawn_blocking(move || pipeline.shutdown()).await?;
    for exit in &remaining {
        report_exit(exit);
    }

    info!(
        effector_calls = board.log.calls().len(),
        unplayed_frames = board.engine.remaining(),
        "helmet-voice stopped"
    );

    Ok(())
}

fn report_exit(exit: &LoopExit) {
    match &exit.result {
        Ok(()) => info!(name = exit.name, "loop finished"),
        Err(e) => warn!(name = exit.name, error = %e, "loop ended with error"),
    }
}
