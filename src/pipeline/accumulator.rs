//! Window accumulation and the elapsed-time trigger policy.

use crate::audio::block::AudioBlock;
use crate::pipeline::clock::Clock;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Grows a recognition window from capture blocks and decides when to fire.
///
/// A fixed-period batching policy: after each appended block the elapsed time
/// since the trigger clock is compared against the threshold. At or past the
/// threshold the whole window is handed out and window and clock are reset
/// together. Window sizes therefore vary with block delivery jitter; the
/// nominal size is threshold ÷ block duration blocks.
pub struct WindowAccumulator {
    window: Vec<f32>,
    window_started: Instant,
    threshold: Duration,
    clock: Arc<dyn Clock>,
}

impl WindowAccumulator {
    pub fn new(threshold: Duration, clock: Arc<dyn Clock>) -> Self {
        let window_started = clock.now();
        Self {
            window: Vec::new(),
            window_started,
            threshold,
            clock,
        }
    }

    /// Append one capture block to the current window.
    pub fn append(&mut self, block: &AudioBlock) {
        self.window.extend_from_slice(block.samples());
    }

    /// Evaluate the trigger.
    ///
    /// Fires when the elapsed time since the last firing reaches the
    /// threshold: the accumulated window is returned and the window and the
    /// trigger clock reset together. Below the threshold nothing changes.
    pub fn try_trigger(&mut self) -> Option<Vec<f32>> {
        let now = self.clock.now();
        if now.duration_since(self.window_started) < self.threshold {
            return None;
        }

        self.window_started = now;
        Some(std::mem::take(&mut self.window))
    }

    /// Samples accumulated since the last firing.
    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    /// Time accumulated toward the next trigger.
    pub fn elapsed(&self) -> Duration {
        self.clock.now().duration_since(self.window_started)
    }
}
