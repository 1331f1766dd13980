//! Script-driven audio front-end and command recognizer
//!
//! The engine releases one frame per ingested chunk, so fetches follow the
//! feed loop in FIFO order. The recognizer answers with whatever frame the
//! engine handed out last.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::Duration;

use tracing::debug;

use crate::audio::ChunkLayout;
use crate::recognition::{
    CommandRecognizer, EngineError, FetchResult, FetchStatus, RecognitionEngine,
    RecognitionResults, RecognizerState, WakeState,
};

use super::script::{Script, ScriptFrame};

/// State the engine and recognizer see together
#[derive(Default)]
struct Shared {
    current: Mutex<Option<ScriptFrame>>,
    cleans: AtomicUsize,
}

impl Shared {
    fn current(&self) -> Option<ScriptFrame> {
        self.current
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn set_current(&self, frame: ScriptFrame) {
        *self
            .current
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(frame);
    }
}

struct Queue {
    frames: VecDeque<ScriptFrame>,
    /// Chunks ingested but not yet fetched
    pending: usize,
}

/// Front-end replaying a [`Script`]
pub struct ScriptedEngine {
    layout: ChunkLayout,
    queue: Mutex<Queue>,
    ready: Condvar,
    shared: Arc<Shared>,
    wake_suppressed: AtomicBool,
    suppress_calls: AtomicUsize,
    restore_calls: AtomicUsize,
}

/// Recognizer reading the engine's current frame
pub struct ScriptedRecognizer {
    chunk_samples: usize,
    shared: Arc<Shared>,
    last: RecognitionResults,
}

/// Build an engine and the recognizer bound to it
pub fn scripted_pair(script: Script, layout: ChunkLayout) -> (ScriptedEngine, ScriptedRecognizer) {
    let shared = Arc::new(Shared::default());
    let engine = ScriptedEngine {
        layout,
        queue: Mutex::new(Queue {
            frames: script.frames.into(),
            pending: 0,
        }),
        ready: Condvar::new(),
        shared: Arc::clone(&shared),
        wake_suppressed: AtomicBool::new(false),
        suppress_calls: AtomicUsize::new(0),
        restore_calls: AtomicUsize::new(0),
    };
    let recognizer = ScriptedRecognizer {
        chunk_samples: layout.samples,
        shared,
        last: RecognitionResults::default(),
    };
    (engine, recognizer)
}

impl ScriptedEngine {
    fn lock(&self) -> Result<MutexGuard<'_, Queue>, EngineError> {
        self.queue.lock().map_err(|_| EngineError::Poisoned)
    }

    /// Frames not yet fetched
    pub fn remaining(&self) -> usize {
        self.lock().map(|q| q.frames.len()).unwrap_or(0)
    }

    pub fn is_wake_suppressed(&self) -> bool {
        self.wake_suppressed.load(Ordering::Acquire)
    }

    #[cfg(test)]
    pub fn suppress_calls(&self) -> usize {
        self.suppress_calls.load(Ordering::Acquire)
    }

    #[cfg(test)]
    pub fn restore_calls(&self) -> usize {
        self.restore_calls.load(Ordering::Acquire)
    }

    /// How often the recognizer was cleaned
    #[cfg(test)]
    pub fn clean_calls(&self) -> usize {
        self.shared.cleans.load(Ordering::Acquire)
    }
}

impl RecognitionEngine for ScriptedEngine {
    fn feed_chunk_samples(&self) -> usize {
        self.layout.samples
    }

    fn fetch_chunk_samples(&self) -> usize {
        self.layout.samples
    }

    fn channels(&self) -> usize {
        self.layout.channels
    }

    fn ingest(&self, chunk: &[i16]) -> Result<(), EngineError> {
        if chunk.len() < self.layout.len() {
            return Err(EngineError::ChunkSize {
                got: chunk.len(),
                expected: self.layout.len(),
            });
        }
        self.lock()?.pending += 1;
        self.ready.notify_one();
        Ok(())
    }

    fn fetch(&self, timeout: Duration) -> Result<Option<FetchResult>, EngineError> {
        let queue = self.lock()?;
        let (mut queue, _) = self
            .ready
            .wait_timeout_while(queue, timeout, |q| q.pending == 0 && !q.frames.is_empty())
            .map_err(|_| EngineError::Poisoned)?;

        if queue.pending == 0 && !queue.frames.is_empty() {
            return Ok(None);
        }
        let Some(frame) = queue.frames.pop_front() else {
            return Err(EngineError::Exhausted);
        };
        queue.pending -= 1;
        drop(queue);

        if frame.absent {
            return Err(EngineError::Absent);
        }
        if frame.fail {
            return Ok(Some(FetchResult {
                status: FetchStatus::Fail,
                ..FetchResult::default()
            }));
        }

        let wake_state = if self.is_wake_suppressed() {
            WakeState::None
        } else {
            frame.wake
        };
        let result = FetchResult {
            status: FetchStatus::Ok,
            wake_state,
            trigger_channel: frame.channel,
            data: vec![0; self.layout.samples],
        };
        self.shared.set_current(frame);
        Ok(Some(result))
    }

    fn suppress_wake_detection(&self) {
        debug!("wake detection suppressed");
        self.wake_suppressed.store(true, Ordering::Release);
        self.suppress_calls.fetch_add(1, Ordering::AcqRel);
    }

    fn restore_wake_detection(&self) {
        debug!("wake detection restored");
        self.wake_suppressed.store(false, Ordering::Release);
        self.restore_calls.fetch_add(1, Ordering::AcqRel);
    }
}

impl CommandRecognizer for ScriptedRecognizer {
    fn chunk_samples(&self) -> usize {
        self.chunk_samples
    }

    fn step(&mut self, _audio: &[i16]) -> RecognizerState {
        let Some(frame) = self.shared.current() else {
            return RecognizerState::Detecting;
        };
        match frame.recognizer {
            RecognizerState::Detecting => {}
            RecognizerState::Detected => {
                self.last = RecognitionResults {
                    candidates: frame.candidates,
                    text: frame.text,
                };
            }
            RecognizerState::Timeout => {
                self.last = RecognitionResults {
                    candidates: Vec::new(),
                    text: frame.text,
                };
            }
        }
        frame.recognizer
    }

    fn results(&self) -> RecognitionResults {
        self.last.clone()
    }

    fn clean(&mut self) {
        self.last = RecognitionResults::default();
        self.shared.cleans.fetch_add(1, Ordering::AcqRel);
    }

    fn active_commands(&self) -> Vec<(i32, String)> {
        vec![
            (0, "open helmet".to_string()),
            (1, "hulk out".to_string()),
            (2, "close helmet".to_string()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const POLL: Duration = Duration::from_millis(10);

    fn pair(frames: Vec<ScriptFrame>) -> (ScriptedEngine, ScriptedRecognizer) {
        scripted_pair(Script::new(frames), ChunkLayout::new(4, 2))
    }

    #[test]
    fn test_fetch_waits_for_ingest() {
        let (engine, _) = pair(vec![ScriptFrame::wake()]);

        assert_eq!(engine.fetch(POLL).unwrap(), None);

        engine.ingest(&[0; 8]).unwrap();
        let result = engine.fetch(POLL).unwrap().unwrap();
        assert_eq!(result.wake_state, WakeState::Detected);
        assert_eq!(result.data.len(), 4);
    }

    #[test]
    fn test_exhausted_script_is_an_error() {
        let (engine, _) = pair(vec![]);
        assert!(matches!(engine.fetch(POLL), Err(EngineError::Exhausted)));
    }

    #[test]
    fn test_short_chunk_rejected() {
        let (engine, _) = pair(vec![ScriptFrame::idle()]);
        assert!(matches!(
            engine.ingest(&[0; 3]),
            Err(EngineError::ChunkSize {
                got: 3,
                expected: 8
            })
        ));
    }

    #[test]
    fn test_failed_frame() {
        let (engine, _) = pair(vec![ScriptFrame::failure()]);
        engine.ingest(&[0; 8]).unwrap();
        let result = engine.fetch(POLL).unwrap().unwrap();
        assert_eq!(result.status, FetchStatus::Fail);
    }

    #[test]
    fn test_absent_frame() {
        let (engine, _) = pair(vec![ScriptFrame::absent(), ScriptFrame::idle()]);
        engine.ingest(&[0; 8]).unwrap();
        engine.ingest(&[0; 8]).unwrap();

        assert!(matches!(engine.fetch(POLL), Err(EngineError::Absent)));
        assert!(engine.fetch(POLL).unwrap().is_some());
    }

    #[test]
    fn test_suppression_hides_wake_reports() {
        let (engine, _) = pair(vec![ScriptFrame::wake(), ScriptFrame::wake()]);
        engine.ingest(&[0; 8]).unwrap();
        engine.ingest(&[0; 8]).unwrap();

        engine.suppress_wake_detection();
        assert_eq!(engine.fetch(POLL).unwrap().unwrap().wake_state, WakeState::None);

        engine.restore_wake_detection();
        assert_eq!(engine.fetch(POLL).unwrap().unwrap().wake_state, WakeState::Detected);
    }

    #[test]
    fn test_recognizer_follows_current_frame() {
        let candidate = crate::recognition::CommandCandidate {
            command_id: 2,
            phrase_id: 1,
            confidence: 0.8,
        };
        let (engine, mut recognizer) = pair(vec![
            ScriptFrame::idle(),
            ScriptFrame::command(vec![candidate], "close helmet"),
        ]);
        engine.ingest(&[0; 8]).unwrap();
        engine.ingest(&[0; 8]).unwrap();

        let first = engine.fetch(POLL).unwrap().unwrap();
        assert_eq!(recognizer.step(&first.data), RecognizerState::Detecting);

        let second = engine.fetch(POLL).unwrap().unwrap();
        assert_eq!(recognizer.step(&second.data), RecognizerState::Detected);
        assert_eq!(recognizer.results().top(), Some(&candidate));

        recognizer.clean();
        assert!(recognizer.results().candidates.is_empty());
        assert_eq!(engine.clean_calls(), 1);
    }
}
