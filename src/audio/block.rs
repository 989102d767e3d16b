//! Capture block type, fixed-size block assembly, and the block source trait.

use crate::defaults;
use crate::error::{Result, VoxcastError};
use crate::queue::BlockProducer;

/// One fixed-length block of single-channel f32 samples in [-1, 1].
///
/// Produced once per capture cadence, copied into the sample queue, and
/// consumed exactly once by the pipeline loop.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBlock {
    samples: Vec<f32>,
}

impl AudioBlock {
    pub fn new(samples: Vec<f32>) -> Self {
        Self { samples }
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Regroups arbitrary-size capture buffers into fixed-size blocks.
///
/// The audio backend delivers whatever buffer sizes it likes; downstream the
/// contract is exactly `block_samples` samples per block. Leftover samples
/// stay staged until the next callback completes them.
#[derive(Debug)]
pub struct BlockAssembler {
    block_samples: usize,
    staging: Vec<f32>,
}

impl BlockAssembler {
    pub fn new(block_samples: usize) -> Self {
        Self {
            block_samples,
            staging: Vec::with_capacity(block_samples),
        }
    }

    /// Stage `samples`, emitting one call per completed block.
    ///
    /// Runs on the capture callback, so it only copies and hands off.
    pub fn extend(&mut self, samples: &[f32], mut emit: impl FnMut(AudioBlock)) {
        for &sample in samples {
            self.staging.push(sample);
            if self.staging.len() == self.block_samples {
                let full = std::mem::replace(
                    &mut self.staging,
                    Vec::with_capacity(self.block_samples),
                );
                emit(AudioBlock::new(full));
            }
        }
    }

    /// Samples staged toward the next block.
    pub fn staged(&self) -> usize {
        self.staging.len()
    }
}

/// Trait for capture sources that push fixed-size blocks into the queue.
///
/// This allows swapping implementations (real audio device vs mock).
pub trait BlockSource: Send {
    /// Start capturing; every completed block is pushed through `producer`.
    fn start(&mut self, producer: BlockProducer) -> Result<()>;

    /// Stop capturing. Idempotent.
    fn stop(&mut self) -> Result<()>;
}

/// Mock block source for testing: pushes a scripted sequence of blocks on
/// start, then goes quiet.
///
/// With a block interval set, the blocks are delivered from a helper thread
/// at that cadence instead of all at once, imitating a live device.
#[derive(Debug, Clone)]
pub struct MockBlockSource {
    blocks: Vec<AudioBlock>,
    block_interval: Option<std::time::Duration>,
    should_fail_start: bool,
    started: bool,
}

impl MockBlockSource {
    pub fn new() -> Self {
        Self {
            blocks: vec![AudioBlock::new(vec![0.0; defaults::BLOCK_SAMPLES])],
            block_interval: None,
            should_fail_start: false,
            started: false,
        }
    }

    /// Configure the scripted blocks delivered on start.
    pub fn with_blocks(mut self, blocks: Vec<AudioBlock>) -> Self {
        self.blocks = blocks;
        self
    }

    /// Deliver blocks at a fixed cadence from a helper thread.
    pub fn with_block_interval(mut self, interval: std::time::Duration) -> Self {
        self.block_interval = Some(interval);
        self
    }

    /// Configure the mock to fail on start.
    pub fn with_start_failure(mut self) -> Self {
        self.should_fail_start = true;
        self
    }

    pub fn is_started(&self) -> bool {
        self.started
    }
}

impl Default for MockBlockSource {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockSource for MockBlockSource {
    fn start(&mut self, producer: BlockProducer) -> Result<()> {
        if self.should_fail_start {
            return Err(VoxcastError::AudioCapture {
                message: "mock audio error".to_string(),
            });
        }
        match self.block_interval {
            Some(interval) => {
                let blocks = self.blocks.clone();
                std::thread::spawn(move || {
                    for block in blocks {
                        std::thread::sleep(interval);
                        producer.push(block);
                    }
                });
            }
            None => {
                for block in &self.blocks {
                    producer.push(block.clone());
                }
            }
        }
        self.started = true;
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.started = false;
        Ok(())
    }
}
