//! Wake word acknowledgement flash
//!
//! Runs on a detached thread so the fetch loop never waits on it. The
//! handle is dropped immediately; nothing joins the flash and nothing
//! depends on it finishing. A flash requested while one is still running
//! is dropped. If anything else paints the strip during the hold, the flash
//! leaves that color in place instead of restoring the old one.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::{debug, warn};

use super::dispatch::{lock_strip, SharedStrip};
use super::led::{Grb, LedError};

/// Fire-and-forget visual acknowledgement on the LED strip
#[derive(Clone)]
pub struct WakeFeedback {
    strip: SharedStrip,
    color: Grb,
    hold: Duration,
    busy: Arc<AtomicBool>,
}

impl WakeFeedback {
    pub fn new(strip: SharedStrip, color: Grb, hold: Duration) -> Self {
        Self {
            strip,
            color,
            hold,
            busy: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Start a flash. Returns false if one is already running.
    pub fn fire(&self) -> bool {
        if self.busy.swap(true, Ordering::AcqRel) {
            debug!("wake flash already running, skipping");
            return false;
        }

        let strip = Arc::clone(&self.strip);
        let busy = Arc::clone(&self.busy);
        let (color, hold) = (self.color, self.hold);

        let spawned = thread::Builder::new()
            .name("led-feedback".to_string())
            .spawn(move || {
                if let Err(e) = flash(&strip, color, hold) {
                    warn!(?e, "wake flash failed");
                }
                busy.store(false, Ordering::Release);
            });

        if let Err(e) = spawned {
            warn!(?e, "failed to spawn wake flash thread");
            self.busy.store(false, Ordering::Release);
            return false;
        }
        true
    }

    /// Whether a flash is in progress
    #[cfg(test)]
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

fn flash(strip: &SharedStrip, color: Grb, hold: Duration) -> Result<(), LedError> {
    let (previous, shown) = {
        let mut strip = lock_strip(strip)?;
        let previous = strip.color();
        strip.show(color)?;
        (previous, strip.generation())
    };
    thread::sleep(hold);

    let mut strip = lock_strip(strip)?;
    if strip.generation() != shown {
        debug!("strip repainted during wake flash, keeping new color");
        return Ok(());
    }
    strip.show(previous)
}
