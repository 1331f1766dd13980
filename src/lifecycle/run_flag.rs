//! Cooperative stop flag shared by the pipeline loops
//!
//! The flag starts raised and can only ever be cleared. Because the only
//! transition is raised -> cleared, any holder may clear it without
//! coordinating with the others: the supervisor clears it on shutdown and
//! each loop clears it when it terminates, so its sibling follows.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Monotonic run flag, cheap to clone
#[derive(Debug, Clone)]
pub struct RunFlag {
    running: Arc<AtomicBool>,
}

impl RunFlag {
    /// Create a raised flag
    pub fn new() -> Self {
        Self {
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    /// True until someone calls [`RunFlag::clear`]
    pub fn is_raised(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Clear the flag. Returns true if this call did the clearing.
    pub fn clear(&self) -> bool {
        self.running.swap(false, Ordering::AcqRel)
    }
}

impl Default for RunFlag {
    fn default() -> Self {
        Self::new()
    }
}
