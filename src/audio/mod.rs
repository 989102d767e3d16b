//! Audio capture: fixed-size block production from the microphone.

pub mod block;
#[cfg(feature = "cpal-audio")]
pub mod capture;

pub use block::{AudioBlock, BlockAssembler, BlockSource, MockBlockSource};
#[cfg(feature = "cpal-audio")]
pub use capture::{CpalBlockSource, suppress_audio_warnings};
