//! Lifecycle controller — drives the blocking read → segment → gate →
//! estimate → emit loop on a dedicated worker thread.
//!
//! # Loop
//!
//! ```text
//! StreamSource::read (blocking, ≤100 ms)
//!   ├─ Ok(None)       → re-check running flag, read again
//!   ├─ Err(Overflow)  → debug log, read again            (transient)
//!   ├─ Err(terminal)  → record error, exit loop          (fatal)
//!   └─ Ok(block)
//!        ├─ demux → Segmenter::push
//!        ├─ no segment yet → back off ~10 ms, read again
//!        └─ Segment
//!             ├─ block_decibels(reference channel of the raw block)
//!             ├─ dB < threshold → angle = None
//!             ├─ dB ≥ threshold → STFT → estimate → normalize
//!             └─ emit BearingUpdate to every observer, in order
//! ```
//!
//! `stop()` clears the running flag and joins the worker: it returns only
//! after the in-flight read has come back and the flag has been observed, so
//! no read happens after `stop()` returns.  Estimation is never cancelled
//! mid-flight; a stop takes effect between segment cycles.

use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::audio::{block_decibels, ChannelMap, RawBlock, Segmenter, SourceError, StreamSource};
use crate::config::AppConfig;
use crate::doa::{
    normalize_azimuth, Algorithm, ArrayGeometry, BearingEstimator, EstimationRequest,
    StftAnalyzer,
};

use super::state::{BearingUpdate, ProcessorError};

/// Longest a read blocks before the worker re-checks the running flag.
const READ_TIMEOUT: Duration = Duration::from_millis(100);

/// Cooperative yield when a block did not complete a segment.
const BACKOFF: Duration = Duration::from_millis(10);

/// Synchronous result observer, invoked on the worker thread.
pub type Observer = Box<dyn Fn(&BearingUpdate) + Send + 'static>;

/// Inclusive gate decision: a block exactly at the threshold estimates.
fn gate_passes(decibels: f64, threshold_db: i32) -> bool {
    decibels >= f64::from(threshold_db)
}

// ---------------------------------------------------------------------------
// DoaProcessor
// ---------------------------------------------------------------------------

/// Owns the worker thread and the runtime-mutable controls.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use doa_tracker::audio::AudioCapture;
/// use doa_tracker::config::AppConfig;
/// use doa_tracker::doa::GridSearchEstimator;
/// use doa_tracker::processor::DoaProcessor;
///
/// let config = AppConfig::default();
/// let capture = AudioCapture::open(&config.audio, &config.device_filter).unwrap();
/// let (_handle, source) = capture.start().unwrap();
///
/// let estimator = Arc::new(GridSearchEstimator::new(&config.doa));
/// let mut processor = DoaProcessor::new(&config, estimator);
/// processor.subscribe(|update| println!("{update:?}"));
/// processor.start(Box::new(source)).unwrap();
/// // …
/// processor.stop().unwrap();
/// ```
pub struct DoaProcessor {
    config: AppConfig,
    geometry: ArrayGeometry,
    estimator: Arc<dyn BearingEstimator>,
    algorithm: Algorithm,
    threshold_db: Arc<AtomicI32>,
    observers: Arc<Mutex<Vec<Observer>>>,
    running: Arc<AtomicBool>,
    worker: Option<JoinHandle<Result<(), ProcessorError>>>,
}

impl DoaProcessor {
    /// Create a stopped processor with the default array geometry.
    pub fn new(config: &AppConfig, estimator: Arc<dyn BearingEstimator>) -> Self {
        Self {
            config: config.clone(),
            geometry: ArrayGeometry::default(),
            estimator,
            algorithm: config.algorithm,
            threshold_db: Arc::new(AtomicI32::new(config.threshold_db)),
            observers: Arc::new(Mutex::new(Vec::new())),
            running: Arc::new(AtomicBool::new(false)),
            worker: None,
        }
    }

    /// Replace the microphone geometry (mic count must match the analysed
    /// channel count, checked at [`start`](Self::start)).
    pub fn with_geometry(mut self, geometry: ArrayGeometry) -> Self {
        self.geometry = geometry;
        self
    }

    /// Register a synchronous observer.  Observers are invoked on the worker
    /// thread, once per completed segment cycle, in registration order.
    pub fn subscribe(&self, observer: impl Fn(&BearingUpdate) + Send + 'static) {
        self.observers.lock().unwrap().push(Box::new(observer));
    }

    /// Update the loudness gate.  Takes effect on the next gate decision.
    pub fn set_threshold(&self, threshold_db: i32) {
        self.threshold_db.store(threshold_db, Ordering::Relaxed);
    }

    /// Current gate threshold in dB.
    pub fn threshold(&self) -> i32 {
        self.threshold_db.load(Ordering::Relaxed)
    }

    /// Select the estimation algorithm.  Only allowed while stopped.
    pub fn set_algorithm(&mut self, algorithm: Algorithm) -> Result<(), ProcessorError> {
        if self.worker.is_some() {
            return Err(ProcessorError::AlreadyRunning);
        }
        self.algorithm = algorithm;
        Ok(())
    }

    /// Currently selected algorithm.
    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// Returns `true` while a worker thread exists (a worker that died on a
    /// terminal device error still counts until [`stop`](Self::stop) reaps it).
    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }

    /// Start the worker thread reading from `source`.
    ///
    /// # Errors
    ///
    /// - [`ProcessorError::AlreadyRunning`] — a worker is already active.
    /// - [`ProcessorError::UnsupportedAlgorithm`] — the estimator does not
    ///   honour the configured algorithm.
    /// - [`ProcessorError::GeometryMismatch`] — mic count ≠ used channels.
    pub fn start(&mut self, source: Box<dyn StreamSource>) -> Result<(), ProcessorError> {
        if self.worker.is_some() {
            return Err(ProcessorError::AlreadyRunning);
        }
        if !self.estimator.supports(self.algorithm) {
            return Err(ProcessorError::UnsupportedAlgorithm(self.algorithm));
        }
        if self.geometry.len() != self.config.audio.used_channels {
            return Err(ProcessorError::GeometryMismatch {
                geometry: self.geometry.len(),
                used: self.config.audio.used_channels,
            });
        }

        self.running.store(true, Ordering::Release);
        let worker = Worker {
            source,
            map: ChannelMap::new(
                self.config.audio.physical_channels,
                self.config.audio.used_channels,
            ),
            segmenter: Segmenter::new(
                self.config.audio.used_channels,
                self.config.audio.segment_half_len,
                self.config.audio.overlap_len,
            ),
            stft: StftAnalyzer::new(self.config.doa.nfft),
            estimator: Arc::clone(&self.estimator),
            geometry: self.geometry.clone(),
            algorithm: self.algorithm,
            sample_rate: self.config.audio.sample_rate,
            nfft: self.config.doa.nfft,
            speed_of_sound: self.config.doa.speed_of_sound,
            threshold_db: Arc::clone(&self.threshold_db),
            observers: Arc::clone(&self.observers),
            running: Arc::clone(&self.running),
        };

        let handle = thread::Builder::new()
            .name("doa-worker".into())
            .spawn(move || worker.run())
            .expect("failed to spawn doa-worker thread");
        self.worker = Some(handle);

        log::info!(
            "processor started (algorithm {}, gate {} dB)",
            self.algorithm,
            self.threshold()
        );
        Ok(())
    }

    /// Signal the worker to stop and wait for it to exit.
    ///
    /// Blocks until the in-flight read returns and the worker has observed
    /// the flag; the stream source is dropped (released) before this returns.
    /// Returns the terminal error if the worker exited on one.  A stopped
    /// processor returns `Ok(())`.
    pub fn stop(&mut self) -> Result<(), ProcessorError> {
        let Some(worker) = self.worker.take() else {
            return Ok(());
        };
        self.running.store(false, Ordering::Release);
        let result = worker.join().map_err(|_| ProcessorError::WorkerPanic)?;
        log::info!("processor stopped");
        result
    }
}

impl Drop for DoaProcessor {
    fn drop(&mut self) {
        // Best effort; a terminal error at teardown is already logged.
        let _ = self.stop();
    }
}

// ---------------------------------------------------------------------------
// Worker
// ---------------------------------------------------------------------------

/// Everything the worker thread owns.  Dropping it releases the source.
struct Worker {
    source: Box<dyn StreamSource>,
    map: ChannelMap,
    segmenter: Segmenter,
    stft: StftAnalyzer,
    estimator: Arc<dyn BearingEstimator>,
    geometry: ArrayGeometry,
    algorithm: Algorithm,
    sample_rate: u32,
    nfft: usize,
    speed_of_sound: f64,
    threshold_db: Arc<AtomicI32>,
    observers: Arc<Mutex<Vec<Observer>>>,
    running: Arc<AtomicBool>,
}

impl Worker {
    fn run(mut self) -> Result<(), ProcessorError> {
        while self.running.load(Ordering::Acquire) {
            let block = match self.source.read(READ_TIMEOUT) {
                Ok(Some(block)) => block,
                Ok(None) => continue,
                Err(SourceError::Overflow) => {
                    log::debug!("input overflow — continuing");
                    continue;
                }
                Err(err) => {
                    log::error!("terminal stream error: {err}");
                    return Err(ProcessorError::Device(err.to_string()));
                }
            };
            self.process_block(&block);
        }
        Ok(())
    }

    fn process_block(&mut self, block: &RawBlock) {
        let slices = self.map.demux(block);
        let Some(segment) = self.segmenter.push(&slices) else {
            // Not enough buffered yet; yield briefly instead of spinning.
            thread::sleep(BACKOFF);
            return;
        };

        // The gate reads the latest raw block, not the analysis window.
        let decibels = block_decibels(&self.map.reference_channel(block));
        let threshold = self.threshold_db.load(Ordering::Relaxed);

        let angle_degrees = if gate_passes(decibels, threshold) {
            let spectrum = self.stft.analyze(&segment);
            let request = EstimationRequest {
                geometry: &self.geometry,
                sample_rate: self.sample_rate,
                nfft: self.nfft,
                speed_of_sound: self.speed_of_sound,
                num_sources: 1,
                algorithm: self.algorithm,
            };
            match self.estimator.estimate(&spectrum, &request) {
                Ok(azimuth) => {
                    let degrees = normalize_azimuth(azimuth);
                    log::info!("estimated angle: {degrees:.2}° ({decibels:.1} dB)");
                    Some(degrees)
                }
                Err(err) => {
                    log::warn!("bearing estimation abandoned: {err}");
                    None
                }
            }
        } else {
            None
        };

        let update = BearingUpdate {
            angle_degrees,
            decibels,
        };
        for observer in self.observers.lock().unwrap().iter() {
            observer(&update);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
