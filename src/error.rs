//! Error types for voxcast.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum VoxcastError {
    // Audio capture errors
    #[error("Audio device not found: {device}")]
    AudioDeviceNotFound { device: String },

    #[error("Audio format mismatch: expected {expected}, got {actual}")]
    AudioFormatMismatch { expected: String, actual: String },

    #[error("Audio capture failed: {message}")]
    AudioCapture { message: String },

    // Recognition errors
    #[error("Recognition model not found at {path}")]
    RecognitionModelNotFound { path: String },

    #[error("Recognition inference failed: {message}")]
    RecognitionInferenceFailed { message: String },

    #[error("Recognition error: {message}")]
    Recognition { message: String },

    // Dispatch errors
    #[error("Dispatch connection failed: {message}")]
    DispatchConnection { message: String },

    #[error("Dispatch send failed: {message}")]
    DispatchSend { message: String },

    // General I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Generic error for cases not covered above
    #[error("{0}")]
    Other(String),
}

// Type alias for convenience
pub type Result<T> = std::result::Result<T, VoxcastError>;
