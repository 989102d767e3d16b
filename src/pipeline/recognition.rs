//! Recognition adapter: window samples in, joined utterance out.

use crate::error::Result;
use crate::stt::recognizer::Recognizer;
use std::sync::Arc;

/// Scale f32 samples in [-1, 1] to the engine's 16-bit PCM input range.
///
/// The engine contract is exact: multiply by 32767 and truncate toward zero
/// into i16. Boundary values ±1.0 map to ±32767; the `as` cast saturates,
/// so even out-of-range samples cannot overflow.
pub fn to_pcm(samples: &[f32]) -> Vec<i16> {
    samples.iter().map(|&s| (s * 32767.0) as i16).collect()
}

/// Join recognized segments into a single utterance.
///
/// Each segment is trimmed of surrounding whitespace, the segments are joined
/// with single spaces, and the result is trimmed again. An utterance that
/// comes out empty is never dispatched.
pub fn join_segments(segments: &[String]) -> String {
    segments
        .iter()
        .map(|s| s.trim())
        .collect::<Vec<_>>()
        .join(" ")
        .trim()
        .to_string()
}

/// Bridges accumulated windows to the recognition engine.
///
/// The engine is loaded once at startup and shared by reference; the adapter
/// owns only the format conversion and the segment joining.
pub struct RecognitionAdapter {
    recognizer: Arc<dyn Recognizer>,
}

impl RecognitionAdapter {
    pub fn new(recognizer: Arc<dyn Recognizer>) -> Self {
        Self { recognizer }
    }

    /// Recognize one window and produce the joined utterance.
    ///
    /// Returns an empty string when the engine hears nothing; the caller
    /// discards empty utterances. Engine errors propagate for the pipeline
    /// loop to log and treat as "no utterance produced".
    pub fn recognize_window(&self, window: &[f32]) -> Result<String> {
        let pcm = to_pcm(window);
        let segments = self.recognizer.recognize(&pcm)?;
        Ok(join_segments(&segments))
    }

    /// Name of the loaded model, for startup diagnostics.
    pub fn model_name(&self) -> &str {
        self.recognizer.model_name()
    }
}
