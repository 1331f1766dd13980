//! Fetch loop: recognition results into effector actions
//!
//! Results are handled strictly in arrival order. Only the top-ranked
//! candidate of a match is ever dispatched.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::command::Command;
use crate::effectors::{EffectorDispatch, WakeFeedback};
use crate::events::HelmetEvent;
use crate::lifecycle::RunFlag;
use crate::recognition::{
    CommandRecognizer, EngineError, FetchResult, FetchStatus, RecognitionEngine, RecognizerState,
};
use crate::state::{DetectionMachine, DetectionState, WakeAction};

use super::PipelineError;

/// Tunables for the fetch loop
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FetchOptions {
    /// Silence wake reports while a command is being listened for
    pub suppress_wake_while_armed: bool,
    /// Longest single wait on the engine before the run flag is rechecked
    pub poll: Duration,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            suppress_wake_while_armed: false,
            poll: Duration::from_millis(100),
        }
    }
}

/// Owns the detection state and everything it drives
pub struct FetchLoop {
    engine: Arc<dyn RecognitionEngine>,
    recognizer: Box<dyn CommandRecognizer>,
    machine: DetectionMachine,
    dispatch: EffectorDispatch,
    feedback: WakeFeedback,
    event_tx: broadcast::Sender<HelmetEvent>,
    options: FetchOptions,
    run_flag: RunFlag,
}

impl FetchLoop {
    pub fn new(
        engine: Arc<dyn RecognitionEngine>,
        recognizer: Box<dyn CommandRecognizer>,
        dispatch: EffectorDispatch,
        feedback: WakeFeedback,
        event_tx: broadcast::Sender<HelmetEvent>,
        options: FetchOptions,
        run_flag: RunFlag,
    ) -> Result<Self, PipelineError> {
        let recognizer_chunk = recognizer.chunk_samples();
        let engine_chunk = engine.fetch_chunk_samples();
        if recognizer_chunk != engine_chunk {
            return Err(PipelineError::ChunkMismatch {
                recognizer: recognizer_chunk,
                engine: engine_chunk,
            });
        }

        for (command_id, phrase) in recognizer.active_commands() {
            info!(command_id, %phrase, "active speech command");
        }

        Ok(Self {
            engine,
            recognizer,
            machine: DetectionMachine::new(event_tx.clone()),
            dispatch,
            feedback,
            event_tx,
            options,
            run_flag,
        })
    }

    /// Current detection state
    #[cfg(test)]
    pub fn state(&self) -> DetectionState {
        self.machine.state()
    }

    /// Run until the run flag clears or something fails
    pub fn run(mut self) -> Result<(), PipelineError> {
        info!("fetch loop started, awaiting wake word");

        while self.run_flag.is_raised() {
            match self.engine.fetch(self.options.poll)? {
                Some(result) => self.process(result)?,
                None => continue,
            }
        }

        debug!(state = %self.machine.state(), "fetch loop stopped");
        Ok(())
    }

    /// Handle one fetch result
    pub fn process(&mut self, result: FetchResult) -> Result<(), PipelineError> {
        if result.status == FetchStatus::Fail {
            return Err(EngineError::FetchFailed.into());
        }

        match self.machine.on_wake(result.wake_state, result.trigger_channel) {
            WakeAction::Acknowledge => {
                self.feedback.fire();
                self.recognizer.clean();
            }
            WakeAction::Arm if self.options.suppress_wake_while_armed => {
                self.engine.suppress_wake_detection();
            }
            WakeAction::Arm | WakeAction::None => {}
        }

        if !self.machine.is_armed() {
            return Ok(());
        }

        match self.recognizer.step(&result.data) {
            RecognizerState::Detecting => {}
            RecognizerState::Detected => self.handle_match()?,
            RecognizerState::Timeout => {
                let results = self.recognizer.results();
                self.engine.restore_wake_detection();
                self.machine.on_timeout(results.text);
                info!("awaiting order");
            }
        }

        Ok(())
    }

    fn handle_match(&mut self) -> Result<(), PipelineError> {
        let results = self.recognizer.results();
        for (rank, candidate) in results.candidates.iter().enumerate() {
            info!(
                rank = rank + 1,
                command_id = candidate.command_id,
                phrase_id = candidate.phrase_id,
                confidence = candidate.confidence,
                text = %results.text,
                "command candidate"
            );
        }

        let Some(top) = results.top() else {
            debug!("match reported without candidates");
            return Ok(());
        };

        let command = Command::from(top.command_id);
        self.machine.on_command(top);
        if !command.is_actuating() {
            debug!(%command, "command has no effector action");
        } else if let Some(event) = self.dispatch.dispatch(command)? {
            let _ = self.event_tx.send(event);
        }

        info!("awaiting order");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::ChunkLayout;
    use crate::config::Config;
    use crate::recognition::CommandCandidate;
    use crate::sim::{scripted_pair, Call, Script, ScriptFrame, ScriptedEngine, SimBoard};
    use std::time::Instant;

    struct Harness {
        fetch: FetchLoop,
        engine: Arc<ScriptedEngine>,
        board: SimBoard,
        events: broadcast::Receiver<HelmetEvent>,
    }

    fn harness(frames: Vec<ScriptFrame>) -> Harness {
        harness_with(Config::instant(), frames)
    }

    fn harness_with(config: Config, frames: Vec<ScriptFrame>) -> Harness {
        let (board, components) = SimBoard::build(&config, Script::new(frames));
        let engine = Arc::clone(&board.engine);
        let (event_tx, events) = broadcast::channel(64);
        let fetch = FetchLoop::new(
            components.engine,
            components.recognizer,
            components.dispatch,
            components.feedback,
            event_tx,
            config.fetch_options(),
            RunFlag::new(),
        )
        .unwrap();
        Harness {
            fetch,
            engine,
            board,
            events,
        }
    }

    impl Harness {
        /// Push every scripted frame through `process`
        fn drain(&mut self) {
            while self.engine.remaining() > 0 {
                self.engine.ingest(&[0; 1024]).unwrap();
                let result = self.engine.fetch(Duration::ZERO).unwrap().unwrap();
                self.fetch.process(result).unwrap();
            }
        }

        fn events(&mut self) -> Vec<HelmetEvent> {
            std::iter::from_fn(|| self.events.try_recv().ok()).collect()
        }

        fn dispatched(&mut self) -> Vec<i32> {
            self.events()
                .into_iter()
                .filter_map(|e| match e {
                    HelmetEvent::CommandRecognized { command_id, .. } => Some(command_id),
                    _ => None,
                })
                .collect()
        }
    }

    fn candidate(command_id: i32, confidence: f32) -> CommandCandidate {
        CommandCandidate {
            command_id,
            phrase_id: 0,
            confidence,
        }
    }

    #[test]
    fn test_open_after_verification() {
        let mut h = harness(vec![
            ScriptFrame::idle(),
            ScriptFrame::idle(),
            ScriptFrame::verified(0),
            ScriptFrame::idle(),
            ScriptFrame::idle(),
            ScriptFrame::command(vec![candidate(0, 0.9)], "open helmet"),
        ]);

        h.drain();

        assert_eq!(h.fetch.state(), DetectionState::CommandActive);
        assert_eq!(h.dispatched(), vec![0]);
        let inits = h
            .board
            .log
            .calls()
            .into_iter()
            .filter(|c| *c == Call::ServoInit)
            .count();
        assert_eq!(inits, 1);
        assert_eq!(h.board.log.servo_angles(), vec![(0, 0), (1, 180)]);
    }

    #[test]
    fn test_timeout_without_command() {
        let mut h = harness(vec![
            ScriptFrame::verified(0),
            ScriptFrame::idle(),
            ScriptFrame::timeout("open the"),
        ]);

        h.drain();

        assert_eq!(h.fetch.state(), DetectionState::Idle);
        assert!(h.dispatched().is_empty());
        assert!(h.board.log.calls().is_empty());
        assert_eq!(h.engine.restore_calls(), 1);
    }

    #[test]
    fn test_timeout_after_command_rearms_wake() {
        let mut h = harness(vec![
            ScriptFrame::verified(0),
            ScriptFrame::command(vec![candidate(2, 0.8)], "close helmet"),
            ScriptFrame::idle(),
            ScriptFrame::timeout(""),
        ]);

        h.drain();

        assert_eq!(h.fetch.state(), DetectionState::Idle);
        let events = h.events();
        assert!(events.contains(&HelmetEvent::HelmetClosed));
        assert!(events.contains(&HelmetEvent::CommandTimeout {
            text: String::new()
        }));
    }

    #[test]
    fn test_empty_candidate_list() {
        let mut h = harness(vec![ScriptFrame::verified(0), ScriptFrame::command(vec![], "")]);

        h.drain();

        assert!(h.dispatched().is_empty());
        assert!(h.board.log.calls().is_empty());
        assert_eq!(h.fetch.state(), DetectionState::ChannelVerified);
    }

    #[test]
    fn test_only_top_candidate_dispatched() {
        let mut h = harness(vec![
            ScriptFrame::verified(0),
            ScriptFrame::command(vec![candidate(2, 0.6), candidate(0, 0.95)], "close helmet"),
        ]);

        h.drain();

        assert_eq!(h.dispatched(), vec![2]);
        assert_eq!(h.board.log.servo_angles(), vec![(0, 150), (1, 30)]);
    }

    #[test]
    fn test_unknown_command_is_silent() {
        let mut h = harness(vec![
            ScriptFrame::verified(0),
            ScriptFrame::command(vec![candidate(42, 0.9)], "?"),
        ]);

        h.drain();

        assert_eq!(h.dispatched(), vec![42]);
        assert!(h.board.log.calls().is_empty());
        assert_eq!(h.fetch.state(), DetectionState::CommandActive);
    }

    #[test]
    fn test_commands_ignored_until_verified() {
        let mut h = harness(vec![
            ScriptFrame::idle(),
            ScriptFrame::command(vec![candidate(0, 0.9)], "open helmet"),
            ScriptFrame::timeout(""),
        ]);

        h.drain();

        assert!(h.dispatched().is_empty());
        assert_eq!(h.engine.restore_calls(), 0);
        assert_eq!(h.fetch.state(), DetectionState::Idle);
    }

    #[test]
    fn test_wake_word_flashes_and_cleans() {
        let mut h = harness(vec![ScriptFrame::wake()]);

        h.drain();

        assert_eq!(h.fetch.state(), DetectionState::Idle);
        assert_eq!(h.engine.clean_calls(), 1);
        assert_eq!(h.events(), vec![HelmetEvent::WakeWordDetected]);

        let flash = Config::instant().wake_flash_color;
        let deadline = Instant::now() + Duration::from_secs(2);
        while !h.board.log.calls().contains(&Call::Led(flash)) && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }
        assert!(h.board.log.calls().contains(&Call::Led(flash)));
        assert!(h.board.log.servo_angles().is_empty());
    }

    #[test]
    fn test_close_during_wake_flash_keeps_close_color() {
        let config = Config {
            wake_flash: Duration::from_millis(300),
            ..Config::instant()
        };
        let close_color = config.close_pose.color;
        let mut h = harness_with(
            config,
            vec![
                ScriptFrame::wake(),
                ScriptFrame::verified(0),
                ScriptFrame::command(vec![candidate(2, 0.9)], "close helmet"),
            ],
        );

        h.drain();
        let deadline = Instant::now() + Duration::from_secs(2);
        while h.fetch.feedback.is_busy() && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }

        let leds: Vec<Call> = h
            .board
            .log
            .calls()
            .into_iter()
            .filter(|c| matches!(c, Call::Led(_)))
            .collect();
        assert_eq!(leds.last(), Some(&Call::Led(close_color)));
        assert!(!leds.contains(&Call::Led(crate::effectors::Grb::OFF)));
    }

    #[test]
    fn test_suppression_while_armed() {
        let mut h = harness(vec![]);
        h.fetch.options.suppress_wake_while_armed = true;

        h.fetch
            .process(FetchResult {
                wake_state: crate::recognition::WakeState::ChannelVerified,
                trigger_channel: Some(1),
                ..FetchResult::default()
            })
            .unwrap();

        assert_eq!(h.engine.suppress_calls(), 1);
        assert!(h.engine.is_wake_suppressed());
    }

    #[test]
    fn test_failed_fetch_is_terminal() {
        let mut h = harness(vec![]);
        let result = FetchResult {
            status: FetchStatus::Fail,
            ..FetchResult::default()
        };

        let err = h.fetch.process(result).unwrap_err();

        assert!(matches!(err, PipelineError::Engine(EngineError::FetchFailed)));
    }

    #[test]
    fn test_absent_result_ends_run() {
        let h = harness(vec![ScriptFrame::idle(), ScriptFrame::absent()]);
        h.engine.ingest(&[0; 1024]).unwrap();
        h.engine.ingest(&[0; 1024]).unwrap();

        let err = h.fetch.run().unwrap_err();

        assert!(matches!(err, PipelineError::Engine(EngineError::Absent)));
        assert_eq!(h.engine.remaining(), 0);
    }

    #[test]
    fn test_rejects_mismatched_chunk_sizes() {
        let (engine, _) = scripted_pair(Script::default(), ChunkLayout::new(512, 2));
        let (_, recognizer) = scripted_pair(Script::default(), ChunkLayout::new(480, 2));
        let (_board, components) = SimBoard::build(&Config::instant(), Script::default());
        let (event_tx, _) = broadcast::channel(4);

        let err = FetchLoop::new(
            Arc::new(engine),
            Box::new(recognizer),
            components.dispatch,
            components.feedback,
            event_tx,
            FetchOptions::default(),
            RunFlag::new(),
        )
        .err()
        .unwrap();

        assert!(matches!(
            err,
            PipelineError::ChunkMismatch {
                recognizer: 480,
                engine: 512
            }
        ));
    }
}
