//! Real audio capture using CPAL (Cross-Platform Audio Library).

use crate::audio::block::{BlockAssembler, BlockSource};
use crate::defaults;
use crate::error::{Result, VoxcastError};
use crate::queue::BlockProducer;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::{Arc, Mutex};

/// Run a closure with stderr temporarily redirected to /dev/null.
///
/// This suppresses noisy ALSA/JACK/PipeWire messages that CPAL triggers
/// when probing audio backends. The messages are harmless but confusing to users.
///
/// # Safety
/// Uses `libc::dup`/`libc::dup2` to save and restore file descriptor 2 (stderr).
/// Safe as long as no other thread is concurrently manipulating fd 2.
fn with_suppressed_stderr<F, R>(f: F) -> R
where
    F: FnOnce() -> R,
{
    unsafe {
        let saved_fd = libc::dup(2);
        let devnull = libc::open(c"/dev/null".as_ptr(), libc::O_WRONLY);
        if saved_fd >= 0 && devnull >= 0 {
            libc::dup2(devnull, 2);
            libc::close(devnull);
        }

        let result = f();

        if saved_fd >= 0 {
            libc::dup2(saved_fd, 2);
            libc::close(saved_fd);
        }

        result
    }
}

/// Suppress noisy JACK/ALSA error messages that occur during audio backend probing.
/// These are harmless but confusing to users.
///
/// # Safety
/// This modifies environment variables which is safe when called before spawning threads.
pub fn suppress_audio_warnings() {
    // SAFETY: Called at startup before any threads are spawned
    unsafe {
        // Suppress JACK "cannot connect" messages - don't try to start JACK server
        std::env::set_var("JACK_NO_START_SERVER", "1");
        // Disable JACK completely for CPAL probing
        std::env::set_var("JACK_NO_AUDIO_RESERVATION", "1");
        // Force PipeWire to not print debug messages
        std::env::set_var("PIPEWIRE_DEBUG", "0");
        // Suppress ALSA verbose messages
        std::env::set_var("ALSA_DEBUG", "0");
        // Tell PipeWire's JACK to be quiet
        std::env::set_var("PW_LOG", "0");
    }
}

/// Preferred device names for GNOME/PipeWire environments.
const PREFERRED_DEVICES: &[&str] = &["pipewire", "pulse", "PulseAudio"];

/// Check if a device is a preferred device.
fn is_preferred_device(name: &str) -> bool {
    let lower = name.to_lowercase();
    PREFERRED_DEVICES
        .iter()
        .any(|pref| lower.contains(&pref.to_lowercase()))
}

/// Get the best default input device, preferring PipeWire/PulseAudio.
///
/// Tries in order:
/// 1. PipeWire
/// 2. PulseAudio/Pulse
/// 3. System default
///
/// This ensures we respect the desktop's audio device selection.
///
/// # Errors
/// Returns `VoxcastError::AudioDeviceNotFound` if no input device is available.
fn get_best_default_device() -> Result<cpal::Device> {
    with_suppressed_stderr(|| {
        let host = cpal::default_host();

        if let Ok(devices) = host.input_devices() {
            for device in devices {
                if let Ok(name) = device.name()
                    && is_preferred_device(&name)
                {
                    return Ok(device);
                }
            }
        }

        host.default_input_device()
            .ok_or_else(|| VoxcastError::AudioDeviceNotFound {
                device: "default".to_string(),
            })
    })
}

/// Wrapper for cpal::Stream to make it Send.
///
/// SAFETY: We ensure that the stream is only accessed from a single thread at a time
/// through the Mutex wrapper in CpalBlockSource. The stream methods are called
/// synchronously and don't cross thread boundaries unsafely.
struct SendableStream(cpal::Stream);

unsafe impl Send for SendableStream {}

/// Real capture implementation using CPAL.
///
/// Captures 16kHz mono f32 and pushes one fixed-size block into the sample
/// queue per second of audio. The callback only stages samples and enqueues
/// completed blocks; everything heavier happens on the pipeline loop.
///
/// Note: The stream is wrapped in SendableStream + Mutex to make it Send.
/// This is safe because we ensure exclusive access through the Mutex.
pub struct CpalBlockSource {
    device: cpal::Device,
    stream: Arc<Mutex<Option<SendableStream>>>,
    sample_rate: u32,
    block_samples: usize,
}

impl CpalBlockSource {
    /// Create a new CPAL block source on the best available input device.
    ///
    /// # Errors
    /// Returns `VoxcastError::AudioDeviceNotFound` if no input device exists.
    pub fn new() -> Result<Self> {
        let device = get_best_default_device()?;

        Ok(Self {
            device,
            stream: Arc::new(Mutex::new(None)),
            sample_rate: defaults::SAMPLE_RATE,
            block_samples: defaults::BLOCK_SAMPLES,
        })
    }

    /// Build the input stream with the fixed capture format.
    ///
    /// Tries in order:
    /// 1. f32/16kHz/mono — the native pipeline format
    /// 2. i16/16kHz/mono — converted in the callback for devices that only
    ///    expose integer formats
    ///
    /// PipeWire/PulseAudio resample transparently, so the fixed rate is
    /// accepted on mainstream desktop setups.
    fn build_stream(&self, producer: BlockProducer) -> Result<cpal::Stream> {
        let config = cpal::StreamConfig {
            channels: 1,
            sample_rate: cpal::SampleRate(self.sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        // A stream error is a capture anomaly: logged, never escalated.
        let err_callback = |err| {
            eprintln!("voxcast: audio stream error: {}", err);
        };

        // Try f32/16kHz/mono first
        let mut assembler = BlockAssembler::new(self.block_samples);
        let block_producer = producer.clone();
        if let Ok(stream) = self.device.build_input_stream(
            &config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                assembler.extend(data, |block| block_producer.push(block));
            },
            err_callback,
            None,
        ) {
            return Ok(stream);
        }

        // Fall back to i16/16kHz/mono, normalizing in the callback
        let mut assembler = BlockAssembler::new(self.block_samples);
        let block_producer = producer;
        let mut scratch: Vec<f32> = Vec::new();
        self.device
            .build_input_stream(
                &config,
                move |data: &[i16], _: &cpal::InputCallbackInfo| {
                    scratch.clear();
                    scratch.extend(data.iter().map(|&s| s as f32 / 32768.0));
                    assembler.extend(&scratch, |block| block_producer.push(block));
                },
                err_callback,
                None,
            )
            .map_err(|e| VoxcastError::AudioFormatMismatch {
                expected: "16kHz mono f32 or i16".to_string(),
                actual: format!("unsupported ({})", e),
            })
    }
}

impl BlockSource for CpalBlockSource {
    fn start(&mut self, producer: BlockProducer) -> Result<()> {
        {
            let stream_guard = self.stream.lock().map_err(|e| VoxcastError::AudioCapture {
                message: format!("Failed to lock stream: {}", e),
            })?;
            if stream_guard.is_some() {
                return Ok(()); // Already started
            }
        }

        let stream = self.build_stream(producer)?;
        stream.play().map_err(|e| VoxcastError::AudioCapture {
            message: format!("Failed to start audio stream: {}", e),
        })?;

        let mut stream_guard = self.stream.lock().map_err(|e| VoxcastError::AudioCapture {
            message: format!("Failed to lock stream: {}", e),
        })?;
        *stream_guard = Some(SendableStream(stream));
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        let mut stream_guard = self.stream.lock().map_err(|e| VoxcastError::AudioCapture {
            message: format!("Failed to lock stream: {}", e),
        })?;

        if let Some(sendable_stream) = stream_guard.take() {
            sendable_stream
                .0
                .pause()
                .map_err(|e| VoxcastError::AudioCapture {
                    message: format!("Failed to stop audio stream: {}", e),
                })?;
        }
        Ok(())
    }
}
