//! Wiring of the simulated board

use std::sync::{Arc, Mutex};

use anyhow::Result;
use tracing::{info, warn};

use crate::audio::ChunkLayout;
use crate::config::Config;
use crate::effectors::{EffectorDispatch, LedStrip, WakeFeedback};
use crate::pipeline::Components;

use super::audio::SyntheticAudioSource;
use super::engine::{scripted_pair, ScriptedEngine};
use super::recorder::{CallLog, RecordingGpio, RecordingLed, RecordingServo};
use super::script::Script;

/// Handles kept for inspecting a simulated run
pub struct SimBoard {
    /// Every effector call, in order
    pub log: CallLog,
    pub engine: Arc<ScriptedEngine>,
}

impl SimBoard {
    /// Build the board, using the configured script or the demo
    pub fn from_config(config: &Config) -> Result<(Self, Components)> {
        let script = match &config.script {
            Some(path) => Script::load(path)?,
            None => Script::demo(),
        };
        if script.is_empty() {
            warn!("recognition script has no frames, fetch loop will stop at once");
        }
        info!(
            frames = script.len(),
            source = %config
                .script
                .as_deref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "built-in demo".to_string()),
            "recognition script loaded"
        );
        Ok(Self::build(config, script))
    }

    /// Build the board around `script`
    pub fn build(config: &Config, script: Script) -> (Self, Components) {
        let log = CallLog::default();
        let layout = ChunkLayout::new(config.chunk_samples, config.engine_channels);
        let (engine, recognizer) = scripted_pair(script, layout);
        let engine = Arc::new(engine);

        let strip = Arc::new(Mutex::new(LedStrip::new(
            Box::new(RecordingLed::new(log.clone())),
            config.pixel_count,
        )));
        let dispatch = EffectorDispatch::new(
            Box::new(RecordingServo::new(log.clone())),
            config.servo.clone(),
            Box::new(RecordingGpio::new(config.indicator_pin, log.clone())),
            Arc::clone(&strip),
        )
        .with_poses(config.open_pose, config.close_pose);
        let feedback = WakeFeedback::new(strip, config.wake_flash_color, config.wake_flash);

        let components = Components {
            source: Box::new(
                SyntheticAudioSource::new(
                    config.feed_channels,
                    config.sample_rate_hz,
                    config.pace_audio,
                )
                .with_dropout(config.audio_dropout),
            ),
            engine: engine.clone(),
            recognizer: Box::new(recognizer),
            dispatch,
            feedback,
        };

        (Self { log, engine }, components)
    }
}
