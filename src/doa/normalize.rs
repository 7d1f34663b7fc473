//! Azimuth normalization into the reporting convention.
//!
//! The estimator measures azimuths counter-clockwise from the array's +x
//! axis; the system reports bearings clockwise from the physical "forward"
//! direction.  The fixed affine transform below reconciles the two.  The
//! constants are load-bearing: an off-by-quadrant error here is a silent
//! correctness bug, not a crash.

/// Map a raw estimator azimuth (radians) to reporting degrees in [0, 360):
/// `deg = (450 − degrees(raw)) mod 360`.
///
/// Fixed points: 0 rad → 90°, π rad → 270°.
pub fn normalize_azimuth(raw_radians: f64) -> f64 {
    (450.0 - raw_radians.to_degrees()).rem_euclid(360.0)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    /// Inverse of the reporting transform, for round-trip checks.
    fn denormalize(degrees: f64) -> f64 {
        (450.0 - degrees).rem_euclid(360.0).to_radians()
    }

    #[test]
    fn zero_radians_maps_to_90_degrees() {
        assert!((normalize_azimuth(0.0) - 90.0).abs() < 1e-12);
    }

    #[test]
    fn pi_radians_maps_to_270_degrees() {
        assert!((normalize_azimuth(PI) - 270.0).abs() < 1e-9);
    }

    #[test]
    fn output_is_always_in_range() {
        for i in -720..720 {
            let deg = normalize_azimuth(f64::from(i).to_radians());
            assert!((0.0..360.0).contains(&deg), "{i}° mapped to {deg}");
        }
    }

    #[test]
    fn transform_is_a_bijection_on_the_circle() {
        for i in 0..360 {
            let x = f64::from(i);
            let round_trip = normalize_azimuth(denormalize(x));
            let diff = (round_trip - x).abs();
            assert!(diff < 1e-9 || (diff - 360.0).abs() < 1e-9, "{x} → {round_trip}");
        }
    }

    #[test]
    fn wraps_instead_of_going_negative() {
        // 180° raw → 450 − 180 = 270; 300° raw → 150; 540° raw wraps twice.
        assert!((normalize_azimuth(300.0_f64.to_radians()) - 150.0).abs() < 1e-9);
        assert!((normalize_azimuth(540.0_f64.to_radians()) - 270.0).abs() < 1e-9);
    }
}
