//! Short-time Fourier transform framing for the bearing estimator.
//!
//! The estimator consumes a [`SegmentSpectrum`]: the segment's channels cut
//! into Hann-windowed frames of `nfft` samples at hop `nfft / 2`, transformed
//! to the frequency domain, and laid out with frequency bins leading, frames
//! next, channels last.

use std::sync::Arc;

use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};

use crate::audio::Segment;

// ---------------------------------------------------------------------------
// Hann window
// ---------------------------------------------------------------------------

/// Symmetric Hann window: `w[n] = 0.5 − 0.5·cos(2πn / (N−1))`.
///
/// Endpoints are exactly zero; the peak sits at the centre.
pub fn hann_window(len: usize) -> Vec<f32> {
    if len == 1 {
        return vec![1.0];
    }
    (0..len)
        .map(|n| {
            let x = n as f32 / (len - 1) as f32;
            0.5 - 0.5 * (2.0 * std::f32::consts::PI * x).cos()
        })
        .collect()
}

// ---------------------------------------------------------------------------
// SegmentSpectrum
// ---------------------------------------------------------------------------

/// Frequency-domain representation of one analysis segment.
///
/// Stores `Complex<f32>` values indexed `(bin, frame, channel)` with
/// `bins = nfft / 2 + 1` (the one-sided spectrum of a real signal).
#[derive(Debug, Clone)]
pub struct SegmentSpectrum {
    data: Vec<Complex<f32>>,
    bins: usize,
    frames: usize,
    channels: usize,
}

impl SegmentSpectrum {
    /// Value at `(bin, frame, channel)`.
    pub fn at(&self, bin: usize, frame: usize, channel: usize) -> Complex<f32> {
        debug_assert!(bin < self.bins && frame < self.frames && channel < self.channels);
        self.data[(bin * self.frames + frame) * self.channels + channel]
    }

    /// One-sided frequency bin count (`nfft / 2 + 1`).
    pub fn bins(&self) -> usize {
        self.bins
    }

    /// Number of analysis frames.
    pub fn frames(&self) -> usize {
        self.frames
    }

    /// Number of channels.
    pub fn channels(&self) -> usize {
        self.channels
    }
}

// ---------------------------------------------------------------------------
// StftAnalyzer
// ---------------------------------------------------------------------------

/// Reusable STFT plan: window coefficients plus a cached FFT.
///
/// # Example
///
/// ```rust
/// use doa_tracker::audio::Segment;
/// use doa_tracker::doa::StftAnalyzer;
///
/// let stft = StftAnalyzer::new(256);
/// let segment = Segment::from_channels(vec![vec![0i16; 1000]; 4]);
/// let spectrum = stft.analyze(&segment);
/// assert_eq!(spectrum.bins(), 129);
/// assert_eq!(spectrum.frames(), 6); // (1000 − 256) / 128 + 1
/// assert_eq!(spectrum.channels(), 4);
/// ```
pub struct StftAnalyzer {
    nfft: usize,
    hop: usize,
    window: Vec<f32>,
    fft: Arc<dyn Fft<f32>>,
}

impl StftAnalyzer {
    /// Plan an analysis with window length `nfft` and hop `nfft / 2`.
    ///
    /// # Panics
    ///
    /// Panics when `nfft < 2`.
    pub fn new(nfft: usize) -> Self {
        assert!(nfft >= 2, "nfft must be at least 2");
        let mut planner = FftPlanner::new();
        Self {
            nfft,
            hop: nfft / 2,
            window: hann_window(nfft),
            fft: planner.plan_fft_forward(nfft),
        }
    }

    /// Window length in samples.
    pub fn nfft(&self) -> usize {
        self.nfft
    }

    /// Frames produced for a per-channel run of `len` samples:
    /// `(len − nfft) / hop + 1`, zero when the run is shorter than one
    /// window.  No zero padding is applied.
    pub fn frame_count(&self, len: usize) -> usize {
        if len < self.nfft {
            0
        } else {
            (len - self.nfft) / self.hop + 1
        }
    }

    /// Transform every channel of `segment` into a [`SegmentSpectrum`].
    pub fn analyze(&self, segment: &Segment) -> SegmentSpectrum {
        let channels = segment.channel_count();
        let frames = self.frame_count(segment.len());
        let bins = self.nfft / 2 + 1;
        let mut data = vec![Complex::new(0.0, 0.0); bins * frames * channels];
        let mut buf = vec![Complex::new(0.0, 0.0); self.nfft];

        for (ch, samples) in segment.channels().iter().enumerate() {
            for frame in 0..frames {
                let start = frame * self.hop;
                for (n, slot) in buf.iter_mut().enumerate() {
                    *slot = Complex::new(f32::from(samples[start + n]) * self.window[n], 0.0);
                }
                self.fft.process(&mut buf);
                for (bin, &value) in buf.iter().take(bins).enumerate() {
                    data[(bin * frames + frame) * channels + ch] = value;
                }
            }
        }

        SegmentSpectrum {
            data,
            bins,
            frames,
            channels,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hann_endpoints_are_zero_and_centre_is_one() {
        let w = hann_window(256);
        assert!(w[0].abs() < 1e-7);
        assert!(w[255].abs() < 1e-7);
        // Even length — the two centre samples straddle the peak.
        assert!(w[127] > 0.999 && w[128] > 0.999);
    }

    #[test]
    fn hann_is_symmetric() {
        let w = hann_window(256);
        for n in 0..128 {
            assert!((w[n] - w[255 - n]).abs() < 1e-6);
        }
    }

    #[test]
    fn frame_count_matches_default_segment() {
        let stft = StftAnalyzer::new(256);
        assert_eq!(stft.frame_count(1000), 6);
        assert_eq!(stft.frame_count(256), 1);
        assert_eq!(stft.frame_count(255), 0);
        assert_eq!(stft.frame_count(384), 2);
    }

    #[test]
    fn dc_bin_carries_windowed_sum() {
        let stft = StftAnalyzer::new(8);
        let segment = Segment::from_channels(vec![vec![100i16; 8]]);
        let spectrum = stft.analyze(&segment);

        let expected: f32 = hann_window(8).iter().map(|w| w * 100.0).sum();
        let dc = spectrum.at(0, 0, 0);
        assert!((dc.re - expected).abs() < 1e-3);
        assert!(dc.im.abs() < 1e-3);
    }

    #[test]
    fn sinusoid_peaks_at_its_bin() {
        // 1 kHz tone at 16 kHz with nfft 256 lands on bin 16.
        let nfft = 256;
        let fs = 16_000.0f32;
        let tone: Vec<i16> = (0..1000)
            .map(|n| {
                (3000.0 * (2.0 * std::f32::consts::PI * 1000.0 * n as f32 / fs).sin()) as i16
            })
            .collect();
        let stft = StftAnalyzer::new(nfft);
        let spectrum = stft.analyze(&Segment::from_channels(vec![tone]));

        let magnitudes: Vec<f32> = (0..spectrum.bins())
            .map(|b| spectrum.at(b, 0, 0).norm())
            .collect();
        let peak = magnitudes
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap();
        assert_eq!(peak, 16);
    }

    #[test]
    fn layout_is_bin_major_channel_minor() {
        // Two channels with distinct constant levels — every bin/frame cell
        // must keep the channels apart.
        let stft = StftAnalyzer::new(8);
        let segment = Segment::from_channels(vec![vec![100i16; 16], vec![200i16; 16]]);
        let spectrum = stft.analyze(&segment);

        assert_eq!(spectrum.frames(), 3);
        for frame in 0..spectrum.frames() {
            let a = spectrum.at(0, frame, 0).re;
            let b = spectrum.at(0, frame, 1).re;
            assert!((b - 2.0 * a).abs() < 1e-2);
        }
    }
}
