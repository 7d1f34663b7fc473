//! Microphone-array geometry.

/// 3-D microphone positions in metres, one entry per analysis channel, in
/// used-channel order.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayGeometry {
    positions: Vec<[f64; 3]>,
}

impl ArrayGeometry {
    /// Build a geometry from explicit positions.
    pub fn new(positions: Vec<[f64; 3]>) -> Self {
        Self { positions }
    }

    /// The ReSpeaker 4-mic square array: 45 mm edge, mics on the corners,
    /// all in the z = 0 plane.
    pub fn respeaker_4mic() -> Self {
        Self::new(vec![
            [0.045, 0.0, 0.0],
            [0.045, 0.045, 0.0],
            [0.0, 0.045, 0.0],
            [0.0, 0.0, 0.0],
        ])
    }

    /// Microphone positions, in channel order.
    pub fn positions(&self) -> &[[f64; 3]] {
        &self.positions
    }

    /// Number of microphones.
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Returns `true` for an empty geometry.
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

impl Default for ArrayGeometry {
    fn default() -> Self {
        Self::respeaker_4mic()
    }
}
