//! The capture-and-dispatch pipeline loop.
//!
//! A single consumer thread drains the sample queue, accumulates blocks into
//! elapsed-time windows, recognizes each window, and hands non-empty
//! utterances to the dispatcher. Every failure is recovered inside the loop.

pub mod accumulator;
pub mod clock;
pub mod orchestrator;
pub mod recognition;
pub mod reporter;

pub use accumulator::WindowAccumulator;
pub use clock::{Clock, MockClock, SystemClock};
pub use orchestrator::{Pipeline, PipelineConfig, PipelineHandle};
pub use recognition::{RecognitionAdapter, join_segments, to_pcm};
pub use reporter::{ErrorReporter, LogReporter};
