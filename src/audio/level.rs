//! RMS-based loudness measurement for the estimation gate.
//!
//! The gate decision uses the **most recent raw block's** reference channel,
//! not the extracted analysis window — the level reflects the latest instant
//! so gating reacts with one block of latency at most.

/// Floor applied inside the logarithm so silence never produces `-inf`.
const RMS_EPSILON: f64 = 1e-6;

/// Decibel value reported for an all-zero reference channel:
/// `20 · log10(1e-6)`.
pub fn silence_floor_db() -> f64 {
    20.0 * RMS_EPSILON.log10()
}

/// Root-mean-square level of `samples` in decibels.
///
/// `rms = sqrt(mean(s²))`, `dB = 20 · log10(max(rms, 1e-6))`.  Samples are
/// raw `i16` amplitudes, so a full-scale sine sits around 87 dB and the
/// silence floor at −120 dB.
pub fn block_decibels(samples: &[i16]) -> f64 {
    if samples.is_empty() {
        return silence_floor_db();
    }
    let mean_sq = samples
        .iter()
        .map(|&s| {
            let s = f64::from(s);
            s * s
        })
        .sum::<f64>()
        / samples.len() as f64;
    20.0 * mean_sq.sqrt().max(RMS_EPSILON).log10()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
