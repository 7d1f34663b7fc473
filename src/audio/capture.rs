//! Microphone-array capture via `cpal`.
//!
//! [`AudioCapture`] selects an input device by case-sensitive name substring
//! and opens an `i16` stream at the array's fixed rate/channel layout.
//! [`AudioCapture::start`] returns a [`StreamHandle`] RAII guard (dropping it
//! stops the underlying cpal stream) plus a [`CpalSource`] that yields exact
//! [`RawBlock`]s to the processing loop.
//!
//! The cpal callback re-chunks whatever buffer sizes the platform delivers
//! into blocks of exactly `channels × block_size` samples and forwards them
//! over a bounded channel.  A full channel means the consumer is behind; the
//! block is dropped and counted as a transient overflow, never an error.

use std::sync::mpsc::{self, RecvTimeoutError, SyncSender};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use thiserror::Error;

use super::block::RawBlock;
use super::source::{SourceError, StreamSource};
use crate::config::AudioConfig;

/// Blocks buffered between the cpal callback and the worker loop before
/// overflow drops kick in (~0.5 s at the default block size).
const CHANNEL_CAPACITY: usize = 8;

// ---------------------------------------------------------------------------
// CaptureError
// ---------------------------------------------------------------------------

/// Errors that can occur while setting up or running the audio capture.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("failed to enumerate input devices: {0}")]
    Enumerate(#[from] cpal::DevicesError),

    #[error("no input device matching \"{0}\" found")]
    NoMatchingDevice(String),

    #[error("failed to build input stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("failed to start audio stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),
}

// ---------------------------------------------------------------------------
// StreamHandle
// ---------------------------------------------------------------------------

/// RAII guard that keeps the cpal stream alive.
///
/// `cpal::Stream` is not `Send`, so the guard stays on the thread that
/// opened the device while the paired [`CpalSource`] moves into the worker.
/// Dropping the guard stops the hardware stream; the source then observes
/// a disconnect on its next read.
pub struct StreamHandle {
    _stream: cpal::Stream,
}

// ---------------------------------------------------------------------------
// AudioCapture
// ---------------------------------------------------------------------------

/// Input device wrapper built on top of `cpal`.
///
/// # Example
///
/// ```rust,no_run
/// use doa_tracker::audio::AudioCapture;
/// use doa_tracker::config::AudioConfig;
///
/// let capture = AudioCapture::open(&AudioConfig::default(), "ReSpeaker 4 Mic Array").unwrap();
/// let (_handle, source) = capture.start().unwrap();
/// // `source` is handed to the processor; drop `_handle` to stop capture.
/// ```
pub struct AudioCapture {
    device: cpal::Device,
    config: cpal::StreamConfig,
    /// Interleaved samples per block: `physical_channels × block_size`.
    block_len: usize,
}

impl AudioCapture {
    /// Select the first input device whose name contains `device_filter`
    /// (case-sensitive) and prepare a stream at the fixed array layout.
    ///
    /// # Errors
    ///
    /// [`CaptureError::NoMatchingDevice`] when no input-capable device
    /// matches — a fatal configuration error reported before any processing
    /// starts.
    pub fn open(audio: &AudioConfig, device_filter: &str) -> Result<Self, CaptureError> {
        let host = cpal::default_host();
        let device = host
            .input_devices()?
            .find(|d| {
                d.name()
                    .map(|name| name.contains(device_filter))
                    .unwrap_or(false)
            })
            .ok_or_else(|| CaptureError::NoMatchingDevice(device_filter.to_string()))?;

        match device.name() {
            Ok(name) => log::info!("using input device: {name}"),
            Err(_) => log::info!("using unnamed input device"),
        }

        let config = cpal::StreamConfig {
            channels: audio.physical_channels as u16,
            sample_rate: cpal::SampleRate(audio.sample_rate),
            buffer_size: cpal::BufferSize::Fixed(audio.block_size as u32),
        };

        Ok(Self {
            device,
            config,
            block_len: audio.physical_channels * audio.block_size,
        })
    }

    /// Start capturing and return the stream guard plus the block source.
    ///
    /// The cpal callback runs on a dedicated audio thread; it accumulates
    /// samples until a full block is available and `try_send`s it.  Send
    /// failures (channel full or receiver gone) drop the block silently —
    /// the audio thread never blocks and never panics.
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError::BuildStream`] or [`CaptureError::PlayStream`]
    /// if the platform rejects the stream configuration.
    pub fn start(&self) -> Result<(StreamHandle, CpalSource), CaptureError> {
        let (tx, rx) = mpsc::sync_channel::<RawBlock>(CHANNEL_CAPACITY);
        let fault: Arc<Mutex<Option<String>>> = Arc::new(Mutex::new(None));

        let block_len = self.block_len;
        let mut pending: Vec<i16> = Vec::with_capacity(block_len * 2);
        let data_tx: SyncSender<RawBlock> = tx;

        let fault_slot = Arc::clone(&fault);
        let stream = self.device.build_input_stream(
            &self.config,
            move |data: &[i16], _: &cpal::InputCallbackInfo| {
                pending.extend_from_slice(data);
                while pending.len() >= block_len {
                    let block: Vec<i16> = pending.drain(..block_len).collect();
                    if data_tx.try_send(RawBlock::new(block)).is_err() {
                        log::debug!("capture channel full — dropped one block");
                    }
                }
            },
            move |err: cpal::StreamError| {
                log::error!("cpal stream error: {err}");
                *fault_slot.lock().unwrap() = Some(err.to_string());
            },
            None, // no timeout
        )?;

        stream.play()?;
        Ok((StreamHandle { _stream: stream }, CpalSource { rx, fault }))
    }
}

// ---------------------------------------------------------------------------
// CpalSource
// ---------------------------------------------------------------------------

/// [`StreamSource`] backed by the live cpal capture.
///
/// Holds only the receiving end of the block channel (plus the shared fault
/// slot), so it is `Send` and can move into the worker thread while the
/// non-`Send` [`StreamHandle`] stays behind.
pub struct CpalSource {
    rx: mpsc::Receiver<RawBlock>,
    fault: Arc<Mutex<Option<String>>>,
}

impl StreamSource for CpalSource {
    fn read(&mut self, timeout: Duration) -> Result<Option<RawBlock>, SourceError> {
        // A fault reported by the cpal error callback is terminal.
        if let Some(msg) = self.fault.lock().unwrap().take() {
            return Err(SourceError::Device(msg));
        }
        match self.rx.recv_timeout(timeout) {
            Ok(block) => Ok(Some(block)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(SourceError::Disconnected),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
