//! Fixed configuration constants for voxcast.
//!
//! The entire configuration surface of the process: sample format, window
//! policy, dispatch endpoint, and model selection. There is no config file
//! and no CLI; these values hold for the process lifetime.

use std::time::Duration;

/// Audio sample rate in Hz.
///
/// 16kHz is the standard for speech recognition and provides a good balance
/// between quality and computational efficiency for voice applications.
pub const SAMPLE_RATE: u32 = 16000;

/// Duration of one capture block in milliseconds.
///
/// The capture source delivers exactly one block of this length per cadence.
pub const BLOCK_DURATION_MS: u32 = 1000;

/// Samples per capture block (mono) at the fixed rate and block duration.
pub const BLOCK_SAMPLES: usize = (SAMPLE_RATE as usize * BLOCK_DURATION_MS as usize) / 1000;

/// Elapsed accumulation time after which a window is handed to recognition.
///
/// A fixed-period batching policy: at ~1s per block this yields windows of
/// roughly 2-3 blocks, varying with block delivery jitter.
pub const WINDOW_TRIGGER: Duration = Duration::from_millis(2500);

/// WebSocket endpoint the dispatcher delivers utterances to.
pub const DISPATCH_ENDPOINT: &str = "ws://127.0.0.1:8765";

/// Bound on how long a single dispatch attempt may block the pipeline loop.
///
/// Applied to connect, send, and close alike.
pub const DISPATCH_TIMEOUT: Duration = Duration::from_secs(2);

/// Pause after an unexpected pipeline-loop error, to avoid a hot error loop.
pub const ERROR_BACKOFF: Duration = Duration::from_secs(1);

/// Default Whisper model name.
///
/// "tiny.en" keeps per-window latency low enough for the 2.5s trigger period
/// on CPU-only hosts.
pub const DEFAULT_MODEL: &str = "tiny.en";

/// Language code for recognition.
///
/// Pinned; auto-detection is deliberately not used for the live path.
pub const DEFAULT_LANGUAGE: &str = "en";

/// Report the GPU backend compiled into this build.
///
/// Returns a human-readable name based on the compile-time feature flags.
/// Only one GPU backend can be active at a time; if none is enabled, returns "CPU".
pub fn gpu_backend() -> &'static str {
    if cfg!(feature = "cuda") {
        "CUDA"
    } else if cfg!(feature = "vulkan") {
        "Vulkan"
    } else if cfg!(feature = "hipblas") {
        "HipBLAS (AMD)"
    } else if cfg!(feature = "openblas") {
        "OpenBLAS"
    } else {
        "CPU"
    }
}
