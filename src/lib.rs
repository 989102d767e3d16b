//! voxcast - Live microphone-to-text relay for voice control
//!
//! Captures microphone audio continuously, recognizes elapsed-time windows
//! with Whisper, and forwards each non-empty utterance to a local WebSocket
//! listener, best-effort.

// Enforce error handling discipline
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

pub mod audio;
pub mod defaults;
pub mod dispatch;
pub mod error;
pub mod pipeline;
pub mod queue;
pub mod stt;

// Composition root - needs the real capture device
#[cfg(feature = "cpal-audio")]
pub mod app;

// Core traits (source → process → sink)
pub use audio::block::BlockSource;
pub use dispatch::sink::UtteranceSink;
pub use stt::recognizer::Recognizer;

// Pipeline
pub use pipeline::orchestrator::{Pipeline, PipelineConfig, PipelineHandle};

// Error handling
pub use error::{Result, VoxcastError};

// Sample queue (the capture/processing hand-off)
pub use queue::{BlockProducer, SampleQueue};

/// Build version string with optional git commit hash.
///
/// Returns `"0.1.2+abc1234"` when git hash is available, `"0.1.2"` otherwise.
pub fn version_string() -> String {
    let version = env!("CARGO_PKG_VERSION");
    match option_env!("GIT_HASH") {
        Some(hash) if !hash.is_empty() => format!("{}+{}", version, hash),
        _ => version.to_string(),
    }
}
