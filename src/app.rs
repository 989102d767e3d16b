//! Listener application entry point.
//!
//! Orchestrates the complete ears flow:
//! capture → accumulate → recognize → dispatch

use crate::audio::capture::{CpalBlockSource, suppress_audio_warnings};
use crate::defaults;
use crate::dispatch::websocket::WebSocketDispatcher;
use crate::error::{Result, VoxcastError};
use crate::pipeline::orchestrator::{Pipeline, PipelineConfig};
use crate::stt::recognizer::Recognizer;
use crate::stt::whisper::{WhisperConfig, WhisperRecognizer};
use std::path::PathBuf;
use std::sync::Arc;

/// Locate a ggml model file in the given directories.
fn find_model_in(candidates: &[PathBuf], name: &str) -> Result<PathBuf> {
    let filename = format!("ggml-{}.bin", name);

    for dir in candidates {
        let path = dir.join(&filename);
        if path.exists() {
            return Ok(path);
        }
    }

    Err(VoxcastError::RecognitionModelNotFound {
        path: candidates
            .iter()
            .map(|dir| dir.join(&filename).display().to_string())
            .collect::<Vec<_>>()
            .join(" or "),
    })
}

/// Locate the Whisper model file.
///
/// Checks the user cache (`~/.cache/voxcast/models/`) first, then a local
/// `models/` directory. There is no downloader; the error names both
/// locations so the user knows where to put the file.
pub fn find_model(name: &str) -> Result<PathBuf> {
    let mut candidates = Vec::new();
    if let Some(cache) = dirs::cache_dir() {
        candidates.push(cache.join("voxcast").join("models"));
    }
    candidates.push(PathBuf::from("models"));

    find_model_in(&candidates, name)
}

/// Run the listener: capture → recognize → dispatch until interrupted.
///
/// The recognition engine is loaded once here and passed into the pipeline
/// by reference; nothing else holds global state. On Ctrl+C the pipeline
/// stops after its current iteration and the process exits cleanly.
pub async fn run_listen_command() -> Result<()> {
    // Suppress noisy JACK/ALSA warnings before audio init
    suppress_audio_warnings();

    let model_path = find_model(defaults::DEFAULT_MODEL)?;
    eprintln!(
        "voxcast {}: loading {} ({})",
        crate::version_string(),
        defaults::DEFAULT_MODEL,
        defaults::gpu_backend()
    );

    let recognizer = Arc::new(WhisperRecognizer::new(WhisperConfig {
        model_path,
        language: defaults::DEFAULT_LANGUAGE.to_string(),
        threads: None,
    })?);
    eprintln!("voxcast: model {} ready", recognizer.model_name());

    let source = Box::new(CpalBlockSource::new()?);
    let sink = Box::new(WebSocketDispatcher::new());

    let pipeline = Pipeline::new(PipelineConfig::default());
    let handle = pipeline.start(source, recognizer, sink)?;

    eprintln!(
        "voxcast: listening, dispatching to {} (Ctrl+C to stop)",
        defaults::DISPATCH_ENDPOINT
    );

    tokio::signal::ctrl_c()
        .await
        .map_err(|e| VoxcastError::Other(format!("Failed to listen for Ctrl+C: {}", e)))?;

    eprintln!("\nvoxcast: stopping");
    handle.stop();
    Ok(())
}
