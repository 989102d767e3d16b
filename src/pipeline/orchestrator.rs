//! Pipeline loop that runs from startup until shutdown.

use crate::audio::block::BlockSource;
use crate::defaults;
use crate::dispatch::sink::UtteranceSink;
use crate::error::Result;
use crate::pipeline::accumulator::WindowAccumulator;
use crate::pipeline::clock::{Clock, SystemClock};
use crate::pipeline::recognition::RecognitionAdapter;
use crate::pipeline::reporter::{ErrorReporter, LogReporter};
use crate::queue::{PopResult, SampleQueue};
use crate::stt::recognizer::Recognizer;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Queue depth at which a backpressure note is logged.
///
/// The nominal window is 2-3 blocks; anything past this means recognition is
/// running behind the capture cadence.
const QUEUE_DEPTH_NOTE: usize = 4;

/// Configuration for the pipeline loop.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Elapsed accumulation time that fires the recognition trigger
    pub trigger_threshold: Duration,
    /// How long one queue wait may block before the stop flag is re-checked
    pub poll_interval: Duration,
    /// Pause after an unexpected loop error
    pub error_backoff: Duration,
    /// Suppress utterance echo on stderr
    pub quiet: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            trigger_threshold: defaults::WINDOW_TRIGGER,
            poll_interval: Duration::from_millis(100),
            error_backoff: defaults::ERROR_BACKOFF,
            quiet: false,
        }
    }
}

/// Handle to a running pipeline.
pub struct PipelineHandle {
    /// Flag to signal shutdown
    running: Arc<AtomicBool>,
    /// Join handle for the loop thread
    thread: Option<JoinHandle<()>>,
}

impl PipelineHandle {
    /// Stops the pipeline and waits for the loop thread to exit.
    ///
    /// The loop observes the stop flag within one poll interval unless a
    /// recognition call is in flight; waits up to 5s for that, then detaches.
    /// In-flight windows are discarded, not flushed.
    pub fn stop(mut self) {
        self.running.store(false, Ordering::SeqCst);

        let Some(handle) = self.thread.take() else {
            return;
        };

        let deadline = Instant::now() + Duration::from_secs(5);
        let poll_interval = Duration::from_millis(50);

        while !handle.is_finished() {
            if Instant::now() >= deadline {
                eprintln!("voxcast: shutdown timeout — pipeline thread still running, detaching");
                // Dropping the JoinHandle detaches the thread; it dies with the process.
                return;
            }
            thread::sleep(poll_interval);
        }

        if let Err(panic_info) = handle.join() {
            let msg = panic_info
                .downcast_ref::<&str>()
                .copied()
                .or_else(|| panic_info.downcast_ref::<String>().map(|s| s.as_str()))
                .unwrap_or("unknown panic");
            eprintln!("voxcast: pipeline thread panicked: {msg}");
        }
    }

    /// Returns true if the pipeline is running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

/// Control flow decision after one loop iteration.
enum Control {
    Continue,
    SourceClosed,
}

/// The capture-and-dispatch pipeline: BlockSource → SampleQueue →
/// accumulate → recognize → dispatch.
pub struct Pipeline {
    config: PipelineConfig,
    error_reporter: Arc<dyn ErrorReporter>,
    clock: Arc<dyn Clock>,
}

impl Pipeline {
    /// Creates a new pipeline with default error reporter.
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            error_reporter: Arc::new(LogReporter),
            clock: Arc::new(SystemClock),
        }
    }

    /// Sets a custom error reporter.
    pub fn with_error_reporter(mut self, reporter: Arc<dyn ErrorReporter>) -> Self {
        self.error_reporter = reporter;
        self
    }

    /// Sets a custom clock (for deterministic testing).
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Starts the pipeline.
    ///
    /// # Arguments
    /// * `source` - Capture source feeding the sample queue
    /// * `recognizer` - Recognition engine, loaded once and shared
    /// * `sink` - Utterance delivery (WebSocket dispatcher, collector, etc.)
    ///
    /// # Returns
    /// Handle to control and stop the pipeline
    pub fn start(
        self,
        mut source: Box<dyn BlockSource>,
        recognizer: Arc<dyn Recognizer>,
        sink: Box<dyn UtteranceSink>,
    ) -> Result<PipelineHandle> {
        let (producer, queue) = SampleQueue::channel();

        // Start capture before spawning the loop so a dead device surfaces
        // as a startup error instead of a silent idle pipeline.
        source.start(producer)?;

        let running = Arc::new(AtomicBool::new(true));

        let mut worker = LoopWorker {
            queue,
            accumulator: WindowAccumulator::new(self.config.trigger_threshold, self.clock.clone()),
            adapter: RecognitionAdapter::new(recognizer),
            sink,
            source,
            reporter: self.error_reporter.clone(),
            config: self.config.clone(),
            depth_high_water: 0,
        };

        let loop_running = running.clone();
        let thread = thread::spawn(move || {
            worker.run(&loop_running);
        });

        Ok(PipelineHandle {
            running,
            thread: Some(thread),
        })
    }
}

/// Owns every pipeline stage for the lifetime of the loop thread.
struct LoopWorker {
    queue: SampleQueue,
    accumulator: WindowAccumulator,
    adapter: RecognitionAdapter,
    sink: Box<dyn UtteranceSink>,
    source: Box<dyn BlockSource>,
    reporter: Arc<dyn ErrorReporter>,
    config: PipelineConfig,
    depth_high_water: usize,
}

impl LoopWorker {
    /// Run until the stop flag clears or the capture source disappears.
    ///
    /// Every component failure is recovered here; only explicit cancellation
    /// (or a closed source) ends the loop.
    fn run(&mut self, running: &AtomicBool) {
        while running.load(Ordering::SeqCst) {
            match self.step() {
                Ok(Control::Continue) => {}
                Ok(Control::SourceClosed) => {
                    eprintln!("voxcast: capture source closed, stopping pipeline");
                    break;
                }
                Err(e) => {
                    // Defensive catch-all: nothing in the loop is allowed to
                    // terminate it, but a hot error loop helps nobody either.
                    eprintln!("voxcast: unexpected pipeline error: {e}");
                    thread::sleep(self.config.error_backoff);
                }
            }
        }

        if let Err(e) = self.source.stop() {
            eprintln!("voxcast: failed to stop audio capture: {e}");
        }
    }

    /// One iteration: wait for a block, accumulate, maybe recognize and dispatch.
    fn step(&mut self) -> Result<Control> {
        let block = match self.queue.pop_timeout(self.config.poll_interval) {
            PopResult::Block(block) => block,
            PopResult::Empty => return Ok(Control::Continue),
            PopResult::Closed => return Ok(Control::SourceClosed),
        };

        self.accumulator.append(&block);

        let Some(window) = self.accumulator.try_trigger() else {
            return Ok(Control::Continue);
        };

        self.note_backpressure();

        let utterance = match self.adapter.recognize_window(&window) {
            Ok(utterance) => utterance,
            Err(e) => {
                // Recognition failure: window already discarded by the
                // trigger reset, nothing to dispatch this period.
                self.reporter.report("recognizer", &e);
                return Ok(Control::Continue);
            }
        };

        if utterance.is_empty() {
            return Ok(Control::Continue);
        }

        if !self.config.quiet {
            eprintln!("voxcast: \"{utterance}\"");
        }

        match self.sink.send(&utterance) {
            Ok(()) => {
                if !self.config.quiet {
                    eprintln!("voxcast: sent via {}", self.sink.name());
                }
            }
            Err(e) => {
                // Best-effort delivery: drop the utterance, keep the loop alive.
                self.reporter.report("dispatcher", &e);
            }
        }

        Ok(Control::Continue)
    }

    /// Log when the queue grows past its nominal depth.
    ///
    /// There is no automatic remediation for recognition running behind the
    /// capture cadence; the note is the diagnostic.
    fn note_backpressure(&mut self) {
        let depth = self.queue.depth();
        if depth >= QUEUE_DEPTH_NOTE && depth > self.depth_high_water {
            self.depth_high_water = depth;
            eprintln!("voxcast: {depth} blocks queued behind recognition");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::block::{AudioBlock, MockBlockSource};
    use crate::dispatch::sink::CollectorSink;
    use crate::error::VoxcastError;
    use crate::pipeline::clock::MockClock;
    use crate::queue::BlockProducer;
    use crate::stt::recognizer::MockRecognizer;
    use std::sync::Mutex;

    fn silence_block() -> AudioBlock {
        AudioBlock::new(vec![0.0; 160])
    }

    fn speech_block() -> AudioBlock {
        AudioBlock::new(vec![0.3; 160])
    }

    /// Reporter that records every (stage, message) pair.
    #[derive(Clone, Default)]
    struct RecordingReporter {
        reports: Arc<Mutex<Vec<(String, String)>>>,
    }

    impl RecordingReporter {
        fn reports(&self) -> Vec<(String, String)> {
            self.reports.lock().unwrap().clone()
        }
    }

    impl ErrorReporter for RecordingReporter {
        fn report(&self, stage: &str, error: &VoxcastError) {
            self.reports
                .lock()
                .unwrap()
                .push((stage.to_string(), error.to_string()));
        }
    }

    /// Build a worker wired to mocks, returning the pieces tests drive directly.
    fn worker_with(
        recognizer: MockRecognizer,
        sink: Box<dyn UtteranceSink>,
        clock: &MockClock,
    ) -> (LoopWorker, BlockProducer, RecordingReporter) {
        let (producer, queue) = SampleQueue::channel();
        let reporter = RecordingReporter::default();
        let config = PipelineConfig {
            poll_interval: Duration::from_millis(10),
            quiet: true,
            ..Default::default()
        };

        let worker = LoopWorker {
            queue,
            accumulator: WindowAccumulator::new(
                config.trigger_threshold,
                Arc::new(clock.clone()),
            ),
            adapter: RecognitionAdapter::new(Arc::new(recognizer)),
            sink,
            source: Box::new(MockBlockSource::new().with_blocks(vec![])),
            reporter: Arc::new(reporter.clone()),
            config,
            depth_high_water: 0,
        };

        (worker, producer, reporter)
    }

    // ── Deterministic single-step tests ──────────────────────────────────

    #[test]
    fn step_accumulates_without_firing_below_threshold() {
        let clock = MockClock::new();
        let sink = CollectorSink::new();
        let observer = sink.clone();
        let (mut worker, producer, _reporter) = worker_with(
            MockRecognizer::new("mock").with_segments(&["hello"]),
            Box::new(sink),
            &clock,
        );

        producer.push(speech_block());
        clock.advance(Duration::from_millis(1000));
        assert!(matches!(worker.step().unwrap(), Control::Continue));

        assert_eq!(worker.accumulator.len(), 160);
        assert!(observer.collected().is_empty());
    }

    #[test]
    fn step_fires_and_dispatches_at_threshold() {
        let clock = MockClock::new();
        let sink = CollectorSink::new();
        let observer = sink.clone();
        let (mut worker, producer, _reporter) = worker_with(
            MockRecognizer::new("mock").with_segments(&["turn", "on lights"]),
            Box::new(sink),
            &clock,
        );

        // Three blocks spanning the threshold, matching the 1s block cadence
        for _ in 0..2 {
            producer.push(speech_block());
            clock.advance(Duration::from_millis(1000));
            worker.step().unwrap();
        }
        producer.push(speech_block());
        clock.advance(Duration::from_millis(1000));
        worker.step().unwrap();

        assert_eq!(observer.collected(), vec!["turn on lights"]);
        assert!(worker.accumulator.is_empty(), "window resets after firing");
    }

    #[test]
    fn step_discards_empty_utterance_before_sink() {
        let clock = MockClock::new();
        let sink = CollectorSink::new();
        let observer = sink.clone();
        let (mut worker, producer, reporter) = worker_with(
            MockRecognizer::new("mock").with_segments(&["  ", ""]),
            Box::new(sink),
            &clock,
        );

        producer.push(silence_block());
        clock.advance(Duration::from_secs(3));
        producer.push(silence_block());
        worker.step().unwrap();
        worker.step().unwrap();

        assert!(observer.collected().is_empty());
        assert!(reporter.reports().is_empty());
    }

    #[test]
    fn step_reports_recognition_failure_and_continues() {
        let clock = MockClock::new();
        let sink = CollectorSink::new();
        let observer = sink.clone();
        let (mut worker, producer, reporter) = worker_with(
            MockRecognizer::new("mock").with_failure(),
            Box::new(sink),
            &clock,
        );

        producer.push(speech_block());
        clock.advance(Duration::from_secs(3));
        producer.push(speech_block());
        worker.step().unwrap();
        assert!(matches!(worker.step().unwrap(), Control::Continue));

        let reports = reporter.reports();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].0, "recognizer");
        assert!(observer.collected().is_empty());
        assert!(worker.accumulator.is_empty(), "window reset despite failure");
    }

    #[test]
    fn step_reports_dispatch_failure_and_continues() {
        let clock = MockClock::new();
        let sink = FlakySink::new(usize::MAX);
        let attempts = sink.attempts.clone();
        let (mut worker, producer, reporter) = worker_with(
            MockRecognizer::new("mock").with_segments(&["hello"]),
            Box::new(sink),
            &clock,
        );

        producer.push(speech_block());
        clock.advance(Duration::from_secs(3));
        producer.push(speech_block());
        worker.step().unwrap();
        assert!(matches!(worker.step().unwrap(), Control::Continue));

        assert_eq!(*attempts.lock().unwrap(), 1);
        let reports = reporter.reports();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].0, "dispatcher");
        assert!(reports[0].1.contains("connection refused"));
    }

    #[test]
    fn step_sees_source_closed_when_producers_gone() {
        let clock = MockClock::new();
        let (mut worker, producer, _reporter) = worker_with(
            MockRecognizer::new("mock"),
            Box::new(CollectorSink::new()),
            &clock,
        );

        drop(producer);
        assert!(matches!(worker.step().unwrap(), Control::SourceClosed));
    }

    /// Sink that fails on the first N sends, then succeeds.
    struct FlakySink {
        inner: CollectorSink,
        failures_left: usize,
        attempts: Arc<Mutex<usize>>,
    }

    impl FlakySink {
        fn new(failures: usize) -> Self {
            Self {
                inner: CollectorSink::new(),
                failures_left: failures,
                attempts: Arc::new(Mutex::new(0)),
            }
        }
    }

    impl UtteranceSink for FlakySink {
        fn send(&mut self, utterance: &str) -> crate::error::Result<()> {
            *self.attempts.lock().unwrap() += 1;
            if self.failures_left > 0 {
                self.failures_left -= 1;
                return Err(VoxcastError::DispatchConnection {
                    message: "connection refused".to_string(),
                });
            }
            self.inner.send(utterance)
        }

        fn name(&self) -> &'static str {
            "flaky"
        }
    }

    #[test]
    fn test_config_default() {
        let config = PipelineConfig::default();
        assert_eq!(config.trigger_threshold, Duration::from_millis(2500));
        assert_eq!(config.poll_interval, Duration::from_millis(100));
        assert_eq!(config.error_backoff, Duration::from_secs(1));
        assert!(!config.quiet);
    }

    #[test]
    fn test_pipeline_creation() {
        let pipeline = Pipeline::new(PipelineConfig::default());
        drop(pipeline);
    }

    #[test]
    fn test_handle_is_running() {
        let running = Arc::new(AtomicBool::new(true));
        let handle = PipelineHandle {
            running: running.clone(),
            thread: None,
        };

        assert!(handle.is_running());

        running.store(false, Ordering::SeqCst);
        assert!(!handle.is_running());
    }

    #[test]
    fn test_handle_stop_sets_running_false() {
        let running = Arc::new(AtomicBool::new(true));
        let handle = PipelineHandle {
            running: running.clone(),
            thread: None,
        };

        handle.stop();
        assert!(!running.load(Ordering::SeqCst));
    }

    #[test]
    fn test_handle_stop_joins_finished_thread() {
        let running = Arc::new(AtomicBool::new(true));
        let thread = thread::spawn(|| {});
        thread::sleep(Duration::from_millis(20));

        let handle = PipelineHandle {
            running,
            thread: Some(thread),
        };
        handle.stop();
    }

    #[test]
    fn test_handle_stop_survives_panicked_thread() {
        // A panicking loop thread must not propagate the panic through stop().
        let running = Arc::new(AtomicBool::new(true));
        let thread = thread::spawn(|| {
            panic!("intentional test panic");
        });
        thread::sleep(Duration::from_millis(20));

        let handle = PipelineHandle {
            running: running.clone(),
            thread: Some(thread),
        };

        handle.stop();
        assert!(!running.load(Ordering::SeqCst));
    }

    #[test]
    fn test_pipeline_start_source_failure_is_startup_error() {
        let pipeline = Pipeline::new(PipelineConfig::default());

        let source = Box::new(MockBlockSource::new().with_start_failure());
        let recognizer = Arc::new(MockRecognizer::new("test-model"));
        let sink = Box::new(CollectorSink::new());

        let result = pipeline.start(source, recognizer, sink);
        assert!(result.is_err());

        match result {
            Err(VoxcastError::AudioCapture { message }) => {
                assert_eq!(message, "mock audio error");
            }
            _ => panic!("Expected AudioCapture error"),
        }
    }

    /// Zero threshold makes every appended block fire a trigger, which keeps
    /// the threaded wiring tests free of clock races.
    fn immediate_config() -> PipelineConfig {
        PipelineConfig {
            trigger_threshold: Duration::ZERO,
            poll_interval: Duration::from_millis(10),
            quiet: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_pipeline_recognizes_and_dispatches() {
        let pipeline = Pipeline::new(immediate_config());

        let source =
            Box::new(MockBlockSource::new().with_blocks(vec![speech_block(), speech_block()]));
        let recognizer =
            Arc::new(MockRecognizer::new("test-model").with_segments(&["turn", "on lights"]));
        let sink = CollectorSink::new();
        let observer = sink.clone();

        let handle = pipeline.start(source, recognizer, Box::new(sink)).unwrap();
        assert!(handle.is_running());

        thread::sleep(Duration::from_millis(300));
        handle.stop();

        let collected = observer.collected();
        assert!(!collected.is_empty(), "expected at least one dispatch");
        assert_eq!(collected[0], "turn on lights");
    }

    #[test]
    fn test_pipeline_silence_never_reaches_sink() {
        let pipeline = Pipeline::new(immediate_config());

        let source = Box::new(MockBlockSource::new().with_blocks(vec![
            silence_block(),
            silence_block(),
            silence_block(),
        ]));
        // Recognizer hears nothing in silence
        let recognizer = Arc::new(MockRecognizer::new("test-model").with_segments(&[]));
        let sink = CollectorSink::new();
        let observer = sink.clone();

        let handle = pipeline.start(source, recognizer, Box::new(sink)).unwrap();

        thread::sleep(Duration::from_millis(300));
        handle.stop();

        assert!(
            observer.collected().is_empty(),
            "silence must never be dispatched"
        );
    }

    #[test]
    fn test_pipeline_survives_recognition_failure() {
        let pipeline = Pipeline::new(immediate_config());

        let source =
            Box::new(MockBlockSource::new().with_blocks(vec![speech_block(), speech_block()]));
        let recognizer = Arc::new(MockRecognizer::new("test-model").with_failure());
        let sink = CollectorSink::new();
        let observer = sink.clone();

        let handle = pipeline.start(source, recognizer, Box::new(sink)).unwrap();

        thread::sleep(Duration::from_millis(300));
        assert!(handle.is_running(), "loop must survive engine failures");
        handle.stop();

        assert!(observer.collected().is_empty());
    }

    #[test]
    fn test_pipeline_survives_dispatch_failure() {
        let pipeline = Pipeline::new(immediate_config());

        let source =
            Box::new(MockBlockSource::new().with_blocks(vec![speech_block(), speech_block()]));
        let recognizer = Arc::new(MockRecognizer::new("test-model").with_segments(&["hello"]));

        let sink = FlakySink::new(1);
        let attempts = sink.attempts.clone();
        let collector = sink.inner.clone();

        let handle = pipeline.start(source, recognizer, Box::new(sink)).unwrap();

        thread::sleep(Duration::from_millis(300));
        assert!(handle.is_running(), "loop must survive dispatch failures");
        handle.stop();

        // First send refused, second succeeded
        assert!(*attempts.lock().unwrap() >= 2);
        assert_eq!(collector.collected(), vec!["hello"]);
    }

    #[test]
    fn test_pipeline_stop_is_clean_without_blocks() {
        let config = PipelineConfig {
            quiet: true,
            ..Default::default()
        };
        let pipeline = Pipeline::new(config);

        let source = Box::new(MockBlockSource::new().with_blocks(vec![]));
        let recognizer = Arc::new(MockRecognizer::new("test-model"));
        let sink = Box::new(CollectorSink::new());

        let handle = pipeline.start(source, recognizer, sink).unwrap();
        assert!(handle.is_running());
        handle.stop();
    }
}
