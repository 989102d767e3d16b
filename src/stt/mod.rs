//! Speech-to-text recognition engines.

pub mod recognizer;
pub mod whisper;

pub use recognizer::{MockRecognizer, Recognizer};
pub use whisper::{WhisperConfig, WhisperRecognizer};
