//! Sliding-window segmenter with overlap carry-forward.
//!
//! [`Segmenter`] accumulates demultiplexed per-channel samples and slices
//! them into fixed-length [`Segment`]s for bearing estimation.  After each
//! extraction only the last `overlap_len` samples of every accumulator are
//! retained as the seed of the next window — a forward-sliding window, not a
//! fixed-hop re-windowing of already-analysed history.  Samples between the
//! retained tail and the next incoming block are dropped for good; this
//! trades segment coverage for throughput and latency.
//!
//! Invariant: all accumulators have equal length after every
//! [`push`](Segmenter::push), and exactly `overlap_len` samples immediately
//! after an extraction.

// ---------------------------------------------------------------------------
// Segment
// ---------------------------------------------------------------------------

/// One fixed-length multichannel analysis window.
///
/// Every channel holds exactly `2 × segment_half_len` samples.  A segment is
/// immutable once extracted and owned solely by the estimation call that
/// consumes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    channels: Vec<Vec<i16>>,
}

impl Segment {
    /// Per-channel sample runs, in used-channel order.
    pub fn channels(&self) -> &[Vec<i16>] {
        &self.channels
    }

    /// Number of channels in the window.
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Samples per channel.
    pub fn len(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    /// Returns `true` for a zero-length window.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Build a segment directly from per-channel buffers (tests and the
    /// estimator adapter's own tests).
    pub fn from_channels(channels: Vec<Vec<i16>>) -> Self {
        debug_assert!(
            channels.windows(2).all(|w| w[0].len() == w[1].len()),
            "segment channels must have equal length"
        );
        Self { channels }
    }
}

// ---------------------------------------------------------------------------
// Segmenter
// ---------------------------------------------------------------------------

/// Per-channel accumulators that emit a [`Segment`] once enough samples have
/// been buffered.
///
/// # Example
///
/// ```rust
/// use doa_tracker::audio::Segmenter;
///
/// // 2 channels, segment = 2 × 4 = 8 samples, tail = 2
/// let mut seg = Segmenter::new(2, 4, 2);
///
/// assert!(seg.push(&[vec![0; 8], vec![0; 8]]).is_none()); // 8 is not > 8
/// let out = seg.push(&[vec![0; 1], vec![0; 1]]).unwrap(); // 9 > 8 → extract
/// assert_eq!(out.len(), 8);
/// assert_eq!(seg.buffered(), 2); // only the tail survives
/// ```
pub struct Segmenter {
    accumulators: Vec<Vec<i16>>,
    /// Full window length: `2 × segment_half_len`.
    segment_len: usize,
    /// Tail retained across extractions.
    overlap_len: usize,
}

impl Segmenter {
    /// Create a segmenter for `channels` channels.
    ///
    /// # Panics
    ///
    /// Panics when `overlap_len >= 2 × segment_half_len` (the tail must be
    /// strictly shorter than the window) or `channels == 0`.
    pub fn new(channels: usize, segment_half_len: usize, overlap_len: usize) -> Self {
        let segment_len = segment_half_len * 2;
        assert!(channels > 0, "segmenter needs at least one channel");
        assert!(
            overlap_len < segment_len,
            "overlap ({overlap_len}) must be shorter than the segment ({segment_len})"
        );
        Self {
            accumulators: vec![Vec::new(); channels],
            segment_len,
            overlap_len,
        }
    }

    /// Append one demultiplexed block and extract a [`Segment`] when the
    /// accumulated length strictly exceeds the window length.
    ///
    /// On extraction the segment is taken from the **front** of every
    /// accumulator and each accumulator is truncated to its last
    /// `overlap_len` samples.
    ///
    /// # Panics
    ///
    /// Panics when `slices` does not match the channel arity.
    pub fn push(&mut self, slices: &[Vec<i16>]) -> Option<Segment> {
        assert_eq!(
            slices.len(),
            self.accumulators.len(),
            "push arity must match channel count"
        );
        for (acc, slice) in self.accumulators.iter_mut().zip(slices) {
            acc.extend_from_slice(slice);
        }

        if self.accumulators[0].len() <= self.segment_len {
            return None;
        }

        let channels = self
            .accumulators
            .iter()
            .map(|acc| acc[..self.segment_len].to_vec())
            .collect();
        for acc in &mut self.accumulators {
            // Keep the last overlap_len samples of the full accumulator
            // (not of the extracted window) as the next window's seed.
            let tail_start = acc.len() - self.overlap_len;
            acc.drain(..tail_start);
        }

        Some(Segment { channels })
    }

    /// Current per-channel accumulator length.
    pub fn buffered(&self) -> usize {
        self.accumulators[0].len()
    }

    /// Full window length in samples (`2 × segment_half_len`).
    pub fn segment_len(&self) -> usize {
        self.segment_len
    }

    /// Checks the equal-length invariant across all accumulators.
    #[cfg(test)]
    fn lengths_equal(&self) -> bool {
        self.accumulators
            .windows(2)
            .all(|w| w[0].len() == w[1].len())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn slices(channels: usize, len: usize, value: i16) -> Vec<Vec<i16>> {
        vec![vec![value; len]; channels]
    }

    #[test]
    fn no_extraction_until_strictly_over_window() {
        let mut seg = Segmenter::new(4, 500, 50);

        // Exactly the window length is not enough.
        assert!(seg.push(&slices(4, 1000, 0)).is_none());
        assert_eq!(seg.buffered(), 1000);

        // One more sample tips it over.
        let out = seg.push(&slices(4, 1, 0)).expect("extraction");
        assert_eq!(out.len(), 1000);
        assert_eq!(out.channel_count(), 4);
    }

    #[test]
    fn accumulators_hold_exactly_overlap_after_extraction() {
        let mut seg = Segmenter::new(4, 500, 50);
        seg.push(&slices(4, 1024, 0));
        assert_eq!(seg.buffered(), 50);
    }

    #[test]
    fn lengths_stay_equal_across_cycles() {
        let mut seg = Segmenter::new(4, 500, 50);
        for _ in 0..20 {
            seg.push(&slices(4, 1024, 0));
            assert!(seg.lengths_equal());
        }
    }

    #[test]
    fn segment_comes_from_accumulator_front() {
        let mut seg = Segmenter::new(1, 2, 1);
        seg.push(&[vec![10, 11, 12, 13]]); // 4 == window, no extraction
        let out = seg.push(&[vec![14]]).expect("extraction"); // 5 > 4

        assert_eq!(out.channels()[0], vec![10, 11, 12, 13]);
        // Tail is the last sample of the full accumulator.
        assert_eq!(seg.buffered(), 1);
        let next = seg.push(&[vec![20, 21, 22, 23]]).expect("extraction");
        assert_eq!(next.channels()[0], vec![14, 20, 21, 22]);
    }

    #[test]
    fn tail_carries_into_next_segment() {
        let mut seg = Segmenter::new(2, 500, 50);
        // First block: 0..1024 per channel.
        let ramp: Vec<i16> = (0..1024).map(|i| i as i16).collect();
        let first = seg
            .push(&[ramp.clone(), ramp.clone()])
            .expect("extraction");
        assert_eq!(first.channels()[0][..3], [0, 1, 2]);

        // The retained tail is samples 974..1024 of the first block.
        let second = seg
            .push(&[vec![0; 1024], vec![0; 1024]])
            .expect("extraction");
        assert_eq!(second.channels()[0][0], 974);
        assert_eq!(second.channels()[0][49], 1023);
        assert_eq!(second.channels()[0][50], 0);
    }

    #[test]
    #[should_panic(expected = "overlap")]
    fn overlap_must_be_shorter_than_segment() {
        Segmenter::new(4, 25, 50);
    }

    #[test]
    #[should_panic(expected = "arity")]
    fn push_arity_must_match() {
        let mut seg = Segmenter::new(4, 500, 50);
        seg.push(&slices(3, 8, 0));
    }
}
