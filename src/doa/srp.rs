//! Bundled grid-search bearing estimator.
//!
//! [`GridSearchEstimator`] scans a fixed azimuth grid and scores each
//! candidate direction against the per-bin spatial covariance of the framed
//! segment:
//!
//! - **SRP** — steered response power with PHAT weighting: snapshots are
//!   magnitude-normalised, then `P(θ) = Σ_bins Re(aᴴ R a)`.
//! - **MUSIC** — with a single assumed source the signal subspace is the
//!   principal eigenvector `e` of each bin's covariance (power iteration);
//!   the pseudo-spectrum is `1 / (aᴴa − |eᴴa|²)` summed over bins.
//! - **NormMUSIC** — MUSIC with each bin's pseudo-spectrum scaled to a unit
//!   peak before summing, so loud bins cannot dominate the scan.
//!
//! TOPS and CSSM are not implemented here; selecting them against this
//! estimator is a configuration error caught at processor start.
//!
//! An ill-conditioned covariance (near-silent or single-tone input) still
//! produces an azimuth — possibly inaccurate, never an error.

use rustfft::num_complex::Complex;

use super::estimator::{Algorithm, BearingEstimator, EstimationRequest, EstimatorError};
use super::stft::SegmentSpectrum;
use crate::config::DoaConfig;

/// Guards divisions in the MUSIC pseudo-spectrum and PHAT weighting.
const TINY: f64 = 1e-6;

/// Power-iteration sweeps for the principal eigenvector.  The per-bin
/// covariance is close to rank one for a single source, so convergence is
/// fast.
const POWER_ITERATIONS: usize = 30;

// ---------------------------------------------------------------------------
// GridSearchEstimator
// ---------------------------------------------------------------------------

/// Azimuth grid-search estimator over a fixed frequency band.
pub struct GridSearchEstimator {
    /// Candidate azimuths, evenly spaced over [0, 2π).
    grid_points: usize,
    /// Band considered for scoring, in Hz.
    freq_range_hz: (f64, f64),
}

impl GridSearchEstimator {
    /// Build from the DOA configuration (grid resolution + frequency band).
    pub fn new(doa: &DoaConfig) -> Self {
        Self::with_grid(doa.grid_points, doa.freq_range_hz)
    }

    /// Build with explicit grid resolution and band.
    ///
    /// # Panics
    ///
    /// Panics when `grid_points == 0` or the band is inverted.
    pub fn with_grid(grid_points: usize, freq_range_hz: (f64, f64)) -> Self {
        assert!(grid_points > 0, "grid needs at least one point");
        assert!(
            freq_range_hz.0 < freq_range_hz.1,
            "frequency band must be ascending"
        );
        Self {
            grid_points,
            freq_range_hz,
        }
    }

    /// Bins covered by the configured band, clamped to the one-sided
    /// spectrum and excluding DC.
    fn band_bins(&self, request: &EstimationRequest, bins: usize) -> Option<(usize, usize)> {
        let hz_per_bin = f64::from(request.sample_rate) / request.nfft as f64;
        let lo = ((self.freq_range_hz.0 / hz_per_bin).ceil() as usize).max(1);
        let hi = ((self.freq_range_hz.1 / hz_per_bin).floor() as usize).min(bins - 1);
        (lo <= hi).then_some((lo, hi))
    }

    /// Steering phasors for one frequency and one candidate direction:
    /// `a_m = exp(j·2πf·(p_m · u)/c)`.
    fn steering(
        request: &EstimationRequest,
        freq_hz: f64,
        azimuth: f64,
    ) -> Vec<Complex<f64>> {
        let (ux, uy) = (azimuth.cos(), azimuth.sin());
        request
            .geometry
            .positions()
            .iter()
            .map(|p| {
                let tau = (p[0] * ux + p[1] * uy) / request.speed_of_sound;
                let phase = 2.0 * std::f64::consts::PI * freq_hz * tau;
                Complex::new(phase.cos(), phase.sin())
            })
            .collect()
    }
}

impl BearingEstimator for GridSearchEstimator {
    fn supports(&self, algorithm: Algorithm) -> bool {
        matches!(
            algorithm,
            Algorithm::Srp | Algorithm::Music | Algorithm::NormMusic
        )
    }

    fn estimate(
        &self,
        spectrum: &SegmentSpectrum,
        request: &EstimationRequest,
    ) -> Result<f64, EstimatorError> {
        if !self.supports(request.algorithm) {
            return Err(EstimatorError::Unsupported(request.algorithm));
        }
        if spectrum.frames() == 0 {
            return Err(EstimatorError::EmptySpectrum);
        }
        let mics = request.geometry.len();
        if mics != spectrum.channels() {
            return Err(EstimatorError::GeometryMismatch {
                geometry: mics,
                channels: spectrum.channels(),
            });
        }
        let (bin_lo, bin_hi) = self
            .band_bins(request, spectrum.bins())
            .ok_or_else(|| EstimatorError::Internal("frequency band covers no bins".into()))?;

        let phat = request.algorithm == Algorithm::Srp;
        let hz_per_bin = f64::from(request.sample_rate) / request.nfft as f64;
        let mut scores = vec![0.0f64; self.grid_points];
        let mut bin_scores = vec![0.0f64; self.grid_points];

        for bin in bin_lo..=bin_hi {
            let covariance = bin_covariance(spectrum, bin, phat);
            let signal_axis = match request.algorithm {
                Algorithm::Srp => None,
                _ => Some(principal_eigenvector(&covariance, mics)),
            };
            let freq_hz = bin as f64 * hz_per_bin;

            for (g, slot) in bin_scores.iter_mut().enumerate() {
                let azimuth =
                    2.0 * std::f64::consts::PI * g as f64 / self.grid_points as f64;
                let a = Self::steering(request, freq_hz, azimuth);
                *slot = match &signal_axis {
                    // SRP: steered power through the covariance.
                    None => quadratic_form(&covariance, &a, mics),
                    // MUSIC: inverse distance to the signal axis.
                    Some(e) => {
                        let projection: Complex<f64> = e
                            .iter()
                            .zip(&a)
                            .map(|(ei, ai)| ei.conj() * ai)
                            .sum();
                        let denom = mics as f64 - projection.norm_sqr();
                        1.0 / denom.max(TINY)
                    }
                };
            }

            if request.algorithm == Algorithm::NormMusic {
                let peak = bin_scores.iter().copied().fold(0.0f64, f64::max);
                if peak > TINY {
                    for s in &mut bin_scores {
                        *s /= peak;
                    }
                }
            }
            for (total, s) in scores.iter_mut().zip(&bin_scores) {
                *total += s;
            }
        }

        let best = scores
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(g, _)| g)
            .unwrap_or(0);
        Ok(2.0 * std::f64::consts::PI * best as f64 / self.grid_points as f64)
    }
}

// ---------------------------------------------------------------------------
// Covariance helpers
// ---------------------------------------------------------------------------

/// Spatial covariance of one frequency bin, averaged over frames.
/// With `phat` each snapshot is normalised to unit magnitude first.
fn bin_covariance(spectrum: &SegmentSpectrum, bin: usize, phat: bool) -> Vec<Complex<f64>> {
    let mics = spectrum.channels();
    let frames = spectrum.frames();
    let mut r = vec![Complex::new(0.0, 0.0); mics * mics];
    let mut snapshot = vec![Complex::new(0.0, 0.0); mics];

    for frame in 0..frames {
        for (m, slot) in snapshot.iter_mut().enumerate() {
            let x = spectrum.at(bin, frame, m);
            let mut x = Complex::new(f64::from(x.re), f64::from(x.im));
            if phat {
                let mag = x.norm();
                if mag > TINY {
                    x /= mag;
                }
            }
            *slot = x;
        }
        for i in 0..mics {
            for j in 0..mics {
                r[i * mics + j] += snapshot[i] * snapshot[j].conj();
            }
        }
    }

    let scale = 1.0 / frames as f64;
    for v in &mut r {
        *v *= scale;
    }
    r
}

/// Principal eigenvector of a Hermitian `mics × mics` matrix by power
/// iteration.  A (near-)zero matrix yields an arbitrary unit vector, which
/// downstream produces a flat, possibly-inaccurate spectrum rather than an
/// error.
fn principal_eigenvector(r: &[Complex<f64>], mics: usize) -> Vec<Complex<f64>> {
    let mut v = vec![Complex::new(1.0 / (mics as f64).sqrt(), 0.0); mics];
    let mut w = vec![Complex::new(0.0, 0.0); mics];

    for _ in 0..POWER_ITERATIONS {
        for i in 0..mics {
            w[i] = (0..mics).map(|j| r[i * mics + j] * v[j]).sum();
        }
        let norm = w.iter().map(Complex::norm_sqr).sum::<f64>().sqrt();
        if norm < TINY {
            break;
        }
        for (vi, wi) in v.iter_mut().zip(&w) {
            *vi = wi / norm;
        }
    }
    v
}

/// `Re(aᴴ R a)` for a Hermitian matrix `R`.
fn quadratic_form(r: &[Complex<f64>], a: &[Complex<f64>], mics: usize) -> f64 {
    let mut acc = Complex::new(0.0, 0.0);
    for i in 0..mics {
        for j in 0..mics {
            acc += a[i].conj() * r[i * mics + j] * a[j];
        }
    }
    acc.re
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::Segment;
    use crate::doa::geometry::ArrayGeometry;
    use crate::doa::stft::StftAnalyzer;

    const FS: f64 = 16_000.0;
    const C: f64 = 343.0;
    const NFFT: usize = 256;

    /// Broadband test tones, all inside the default 300–3500 Hz band.
    const TONES: [f64; 6] = [600.0, 950.0, 1_300.0, 1_800.0, 2_400.0, 3_100.0];

    /// Synthesise a 4-channel segment for a far-field source arriving from
    /// `azimuth` (estimator convention, radians).  Each microphone sees the
    /// analytically delayed sum of the test tones.
    fn delayed_segment(geometry: &ArrayGeometry, azimuth: f64, amplitude: f64) -> Segment {
        let (ux, uy) = (azimuth.cos(), azimuth.sin());
        let channels = geometry
            .positions()
            .iter()
            .map(|p| {
                let delay_samples = FS * (p[0] * ux + p[1] * uy) / C;
                (0..1000)
                    .map(|n| {
                        let t = n as f64 + delay_samples;
                        let s: f64 = TONES
                            .iter()
                            .map(|f| (2.0 * std::f64::consts::PI * f * t / FS).sin())
                            .sum();
                        (amplitude * s) as i16
                    })
                    .collect()
            })
            .collect();
        Segment::from_channels(channels)
    }

    fn request(geometry: &ArrayGeometry, algorithm: Algorithm) -> EstimationRequest<'_> {
        EstimationRequest {
            geometry,
            sample_rate: FS as u32,
            nfft: NFFT,
            speed_of_sound: C,
            num_sources: 1,
            algorithm,
        }
    }

    /// Smallest angular distance on the circle, in degrees.
    fn circular_error_deg(a: f64, b: f64) -> f64 {
        let d = (a - b).to_degrees().rem_euclid(360.0);
        d.min(360.0 - d)
    }

    fn locate(algorithm: Algorithm, azimuth_deg: f64) -> f64 {
        let geometry = ArrayGeometry::respeaker_4mic();
        let segment = delayed_segment(&geometry, azimuth_deg.to_radians(), 1_500.0);
        let spectrum = StftAnalyzer::new(NFFT).analyze(&segment);
        let estimator = GridSearchEstimator::with_grid(360, (300.0, 3_500.0));
        estimator
            .estimate(&spectrum, &request(&geometry, algorithm))
            .expect("estimation")
    }

    #[test]
    fn srp_finds_a_source_at_90_degrees() {
        let az = locate(Algorithm::Srp, 90.0);
        assert!(circular_error_deg(az, 90.0_f64.to_radians()) < 5.0);
    }

    #[test]
    fn music_finds_a_source_at_90_degrees() {
        let az = locate(Algorithm::Music, 90.0);
        assert!(circular_error_deg(az, 90.0_f64.to_radians()) < 5.0);
    }

    #[test]
    fn norm_music_finds_a_source_at_30_degrees() {
        let az = locate(Algorithm::NormMusic, 30.0);
        assert!(circular_error_deg(az, 30.0_f64.to_radians()) < 5.0);
    }

    #[test]
    fn silence_is_tolerated_not_fatal() {
        let geometry = ArrayGeometry::respeaker_4mic();
        let segment = Segment::from_channels(vec![vec![0i16; 1000]; 4]);
        let spectrum = StftAnalyzer::new(NFFT).analyze(&segment);
        let estimator = GridSearchEstimator::with_grid(360, (300.0, 3_500.0));

        // Degenerate input: any azimuth is acceptable, an error is not.
        let result = estimator.estimate(&spectrum, &request(&geometry, Algorithm::Music));
        assert!(result.is_ok());
    }

    #[test]
    fn tops_and_cssm_are_unsupported() {
        let estimator = GridSearchEstimator::with_grid(360, (300.0, 3_500.0));
        assert!(!estimator.supports(Algorithm::Tops));
        assert!(!estimator.supports(Algorithm::Cssm));
        assert!(estimator.supports(Algorithm::Srp));
        assert!(estimator.supports(Algorithm::Music));
        assert!(estimator.supports(Algorithm::NormMusic));

        let geometry = ArrayGeometry::respeaker_4mic();
        let segment = Segment::from_channels(vec![vec![0i16; 1000]; 4]);
        let spectrum = StftAnalyzer::new(NFFT).analyze(&segment);
        match estimator.estimate(&spectrum, &request(&geometry, Algorithm::Tops)) {
            Err(EstimatorError::Unsupported(Algorithm::Tops)) => {}
            other => panic!("expected unsupported error, got {other:?}"),
        }
    }

    #[test]
    fn short_segment_is_an_empty_spectrum() {
        let geometry = ArrayGeometry::respeaker_4mic();
        let segment = Segment::from_channels(vec![vec![0i16; 100]; 4]);
        let spectrum = StftAnalyzer::new(NFFT).analyze(&segment);
        let estimator = GridSearchEstimator::with_grid(360, (300.0, 3_500.0));
        match estimator.estimate(&spectrum, &request(&geometry, Algorithm::Srp)) {
            Err(EstimatorError::EmptySpectrum) => {}
            other => panic!("expected empty-spectrum error, got {other:?}"),
        }
    }

    #[test]
    fn geometry_arity_is_checked() {
        let four_mics = ArrayGeometry::respeaker_4mic();
        let segment = delayed_segment(&four_mics, 0.0, 1_500.0);
        let spectrum = StftAnalyzer::new(NFFT).analyze(&segment);

        let two_mics = ArrayGeometry::new(vec![[0.0; 3], [0.045, 0.0, 0.0]]);
        let estimator = GridSearchEstimator::with_grid(360, (300.0, 3_500.0));
        match estimator.estimate(&spectrum, &request(&two_mics, Algorithm::Srp)) {
            Err(EstimatorError::GeometryMismatch {
                geometry: 2,
                channels: 4,
            }) => {}
            other => panic!("expected geometry mismatch, got {other:?}"),
        }
    }
}
