//! Unbounded FIFO of capture blocks between the audio callback and the
//! pipeline loop.
//!
//! The queue is the only shared resource between the real-time capture side
//! and the processing side. Push never blocks the capture callback; capacity
//! is unbounded by design, trading memory growth under sustained recognition
//! slowness for a capture path that never stalls.

use crate::audio::block::AudioBlock;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, unbounded};
use std::time::Duration;

/// Producer half of the sample queue, handed to the capture source.
///
/// Cloneable so the capture callback can own its copy.
#[derive(Debug, Clone)]
pub struct BlockProducer {
    tx: Sender<AudioBlock>,
}

impl BlockProducer {
    /// Enqueue one block. Never blocks.
    ///
    /// A send can only fail once the consumer is gone, which means the
    /// pipeline is shutting down; the block is dropped silently in that case.
    pub fn push(&self, block: AudioBlock) {
        let _ = self.tx.send(block);
    }
}

/// Outcome of a bounded wait on the queue.
#[derive(Debug, PartialEq)]
pub enum PopResult {
    /// A block arrived, in strict FIFO order.
    Block(AudioBlock),
    /// Nothing arrived within the wait; the caller may re-check its stop flag.
    Empty,
    /// All producers are gone; no further blocks will ever arrive.
    Closed,
}

/// Consumer half of the sample queue, owned by the pipeline loop.
#[derive(Debug)]
pub struct SampleQueue {
    rx: Receiver<AudioBlock>,
}

impl SampleQueue {
    /// Create a connected producer/consumer pair.
    pub fn channel() -> (BlockProducer, SampleQueue) {
        let (tx, rx) = unbounded();
        (BlockProducer { tx }, SampleQueue { rx })
    }

    /// Block until the next capture block is available.
    ///
    /// Returns `None` once every producer has been dropped.
    pub fn pop_blocking(&self) -> Option<AudioBlock> {
        self.rx.recv().ok()
    }

    /// Wait up to `timeout` for the next block.
    ///
    /// The pipeline loop uses this instead of `pop_blocking` so cancellation
    /// can be observed between blocks.
    pub fn pop_timeout(&self, timeout: Duration) -> PopResult {
        match self.rx.recv_timeout(timeout) {
            Ok(block) => PopResult::Block(block),
            Err(RecvTimeoutError::Timeout) => PopResult::Empty,
            Err(RecvTimeoutError::Disconnected) => PopResult::Closed,
        }
    }

    /// Number of blocks currently waiting.
    ///
    /// Observable backpressure gauge: grows when recognition falls behind the
    /// capture cadence.
    pub fn depth(&self) -> usize {
        self.rx.len()
    }
}
