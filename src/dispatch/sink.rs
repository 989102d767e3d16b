//! Pluggable utterance delivery for the pipeline loop.

use crate::error::Result;
use std::sync::{Arc, Mutex};

/// Destination for recognized utterances.
/// Pairs with BlockSource for input - this handles the recognized text output.
pub trait UtteranceSink: Send + 'static {
    /// Deliver one utterance. Called once per non-empty recognition result.
    ///
    /// Delivery is best-effort: the caller logs a failure and moves on, so
    /// implementations should not retry internally.
    fn send(&mut self, utterance: &str) -> Result<()>;

    /// Name for logging/debugging.
    fn name(&self) -> &'static str {
        "sink"
    }
}

/// Collects utterances for tests and library use.
///
/// Clones share storage, so a caller can keep one clone while the pipeline
/// owns the other and still observe what was delivered.
#[derive(Clone)]
pub struct CollectorSink {
    collected: Arc<Mutex<Vec<String>>>,
}

impl CollectorSink {
    pub fn new() -> Self {
        Self {
            collected: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Snapshot of the utterances delivered so far, in order.
    pub fn collected(&self) -> Vec<String> {
        self.collected
            .lock()
            .map(|c| c.clone())
            .unwrap_or_default()
    }
}

impl Default for CollectorSink {
    fn default() -> Self {
        Self::new()
    }
}

impl UtteranceSink for CollectorSink {
    fn send(&mut self, utterance: &str) -> Result<()> {
        if let Ok(mut collected) = self.collected.lock() {
            collected.push(utterance.to_string());
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "collector"
    }
}
