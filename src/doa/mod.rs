//! Direction-of-arrival estimation — framing, geometry, estimator seam,
//! bundled estimator, and the reporting-angle transform.
//!
//! # Architecture
//!
//! ```text
//! Segment ──▶ StftAnalyzer ──▶ SegmentSpectrum ─┐
//!                                               ▼
//! ArrayGeometry + parameters ──▶ EstimationRequest ──▶ BearingEstimator
//!                                                          │ (trait)
//!                                    GridSearchEstimator ◀─┘
//!                                               │ azimuth (radians)
//!                                               ▼
//!                                       normalize_azimuth → degrees [0, 360)
//! ```

pub mod estimator;
pub mod geometry;
pub mod normalize;
pub mod srp;
pub mod stft;

// ── Public re-exports ──────────────────────────────────────────────────────

pub use estimator::{
    Algorithm, BearingEstimator, EstimationRequest, EstimatorError, UnknownAlgorithm,
};
pub use geometry::ArrayGeometry;
pub use normalize::normalize_azimuth;
pub use srp::GridSearchEstimator;
pub use stft::{hann_window, SegmentSpectrum, StftAnalyzer};

// test-only re-export so the processor test module can import MockEstimator
// without `use doa_tracker::doa::estimator::MockEstimator`.
#[cfg(test)]
pub use estimator::MockEstimator;
