//! Bearing-estimator seam: algorithm set, request parameters, and the
//! object-safe trait the processor calls through.
//!
//! [`BearingEstimator`] is the narrow interface between the streaming core
//! and the direction-of-arrival mathematics.  The core builds the framed
//! [`SegmentSpectrum`], fills an [`EstimationRequest`] with geometry and
//! signal parameters, and takes back one azimuth in radians.  Algorithm
//! selection is a pure pass-through; which identifiers an implementation
//! honours is reported by [`supports`](BearingEstimator::supports) and
//! checked once at processor start.
//!
//! [`MockEstimator`] (available under `#[cfg(test)]`) returns scripted
//! azimuths so the pipeline can be unit-tested without any real signal.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::geometry::ArrayGeometry;
use super::stft::SegmentSpectrum;

// ---------------------------------------------------------------------------
// Algorithm
// ---------------------------------------------------------------------------

/// The closed set of direction-of-arrival algorithm identifiers.
///
/// Serialized and parsed using the conventional spellings
/// (`"NormMUSIC"`, `"MUSIC"`, `"TOPS"`, `"CSSM"`, `"SRP"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Algorithm {
    #[serde(rename = "NormMUSIC")]
    NormMusic,
    #[serde(rename = "MUSIC")]
    Music,
    #[serde(rename = "TOPS")]
    Tops,
    #[serde(rename = "CSSM")]
    Cssm,
    #[serde(rename = "SRP")]
    Srp,
}

impl Algorithm {
    /// Every supported identifier, for error messages and CLI help.
    pub const ALL: [Algorithm; 5] = [
        Algorithm::NormMusic,
        Algorithm::Music,
        Algorithm::Tops,
        Algorithm::Cssm,
        Algorithm::Srp,
    ];

    /// The conventional identifier string.
    pub fn name(&self) -> &'static str {
        match self {
            Algorithm::NormMusic => "NormMUSIC",
            Algorithm::Music => "MUSIC",
            Algorithm::Tops => "TOPS",
            Algorithm::Cssm => "CSSM",
            Algorithm::Srp => "SRP",
        }
    }
}

impl std::fmt::Display for Algorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Parse error for algorithm identifiers — a fatal configuration error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown DOA algorithm \"{0}\" (expected one of NormMUSIC, MUSIC, TOPS, CSSM, SRP)")]
pub struct UnknownAlgorithm(pub String);

impl FromStr for Algorithm {
    type Err = UnknownAlgorithm;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Algorithm::ALL
            .iter()
            .copied()
            .find(|a| a.name() == s)
            .ok_or_else(|| UnknownAlgorithm(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// EstimationRequest
// ---------------------------------------------------------------------------

/// Parameters passed alongside the framed segment.
#[derive(Debug, Clone)]
pub struct EstimationRequest<'a> {
    /// Microphone positions, one per spectrum channel.
    pub geometry: &'a ArrayGeometry,
    /// Sample rate of the segment in Hz.
    pub sample_rate: u32,
    /// FFT length used for the framing (bin width = rate / nfft).
    pub nfft: usize,
    /// Propagation speed in m/s.
    pub speed_of_sound: f64,
    /// Assumed number of simultaneous sources (the core always passes 1).
    pub num_sources: usize,
    /// Selected algorithm, passed through unchanged.
    pub algorithm: Algorithm,
}

// ---------------------------------------------------------------------------
// EstimatorError
// ---------------------------------------------------------------------------

/// Fatal estimator failures.
///
/// A numerically ill-conditioned estimate is **not** an error — it comes
/// back as a possibly-inaccurate `Ok`.  These variants cover the cases where
/// no azimuth can be produced at all; the processor logs them, reports an
/// absent angle for the segment, and keeps streaming.
#[derive(Debug, Clone, Error)]
pub enum EstimatorError {
    /// The implementation does not handle the requested algorithm.
    #[error("estimator does not support algorithm {0}")]
    Unsupported(Algorithm),

    /// The segment was shorter than one analysis frame.
    #[error("spectrum holds no frames — segment shorter than one window")]
    EmptySpectrum,

    /// Geometry arity does not match the spectrum's channel count.
    #[error("geometry has {geometry} microphones but the spectrum has {channels} channels")]
    GeometryMismatch { geometry: usize, channels: usize },

    /// Internal failure in the estimation routine.
    #[error("estimation failed: {0}")]
    Internal(String),
}

// ---------------------------------------------------------------------------
// BearingEstimator trait
// ---------------------------------------------------------------------------

/// Object-safe, thread-safe direction-of-arrival estimator.
///
/// Implementations must be `Send + Sync` so they can be held behind an
/// `Arc<dyn BearingEstimator>` and called from the worker thread.
///
/// # Contract
///
/// - `spectrum` is the Hann-windowed STFT of one segment, bins leading,
///   frames next, channels last.
/// - The returned azimuth is in **radians** in the estimator's own
///   convention; the caller applies the reporting transform.
pub trait BearingEstimator: Send + Sync {
    /// Whether this implementation honours `algorithm`.
    fn supports(&self, algorithm: Algorithm) -> bool;

    /// Estimate the primary source azimuth for one framed segment.
    fn estimate(
        &self,
        spectrum: &SegmentSpectrum,
        request: &EstimationRequest,
    ) -> Result<f64, EstimatorError>;
}

// Compile-time assertion: Box<dyn BearingEstimator> must be constructible.
const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn BearingEstimator>) {}
};

// ---------------------------------------------------------------------------
// MockEstimator (test only)
// ---------------------------------------------------------------------------

/// Scripted estimator for pipeline tests: returns a fixed sequence of
/// azimuths (cycling) or a fatal error, and counts calls.
#[cfg(test)]
pub struct MockEstimator {
    azimuths: Vec<f64>,
    fail: bool,
    calls: std::sync::atomic::AtomicUsize,
}

#[cfg(test)]
impl MockEstimator {
    /// Return `azimuths[i % len]` on the i-th call.
    pub fn returning(azimuths: Vec<f64>) -> Self {
        assert!(!azimuths.is_empty());
        Self {
            azimuths,
            fail: false,
            calls: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    /// Fail every call with [`EstimatorError::Internal`].
    pub fn failing() -> Self {
        Self {
            azimuths: vec![0.0],
            fail: true,
            calls: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    /// Number of `estimate` calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(test)]
impl BearingEstimator for MockEstimator {
    fn supports(&self, _algorithm: Algorithm) -> bool {
        true
    }

    fn estimate(
        &self,
        _spectrum: &SegmentSpectrum,
        _request: &EstimationRequest,
    ) -> Result<f64, EstimatorError> {
        let i = self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        if self.fail {
            return Err(EstimatorError::Internal("mock failure".into()));
        }
        Ok(self.azimuths[i % self.azimuths.len()])
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
