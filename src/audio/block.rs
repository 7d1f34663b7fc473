//! Raw interleaved sample blocks and the channel demultiplexer.
//!
//! The capture stream delivers audio as [`RawBlock`]s — fixed-length runs of
//! interleaved `i16` samples covering all physical channels of the device.
//! [`ChannelMap`] describes which of those channels feed the analysis
//! pipeline and extracts one contiguous slice per used channel by strided
//! copying.  Demultiplexing is pure and stateless: the same block and map
//! always yield the same slices.

// ---------------------------------------------------------------------------
// RawBlock
// ---------------------------------------------------------------------------

/// One read's worth of interleaved `i16` samples.
///
/// Length is `physical_channels × block_size` frames' worth of samples.
/// A block is immutable after creation and consumed exactly once by the
/// processing loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawBlock {
    samples: Vec<i16>,
}

impl RawBlock {
    /// Wrap a buffer of interleaved samples.
    pub fn new(samples: Vec<i16>) -> Self {
        Self { samples }
    }

    /// The interleaved samples, channel-major within each frame.
    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    /// Total interleaved sample count (all channels).
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Returns `true` for a zero-length block.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

// ---------------------------------------------------------------------------
// ChannelMap
// ---------------------------------------------------------------------------

/// Selection rule mapping physical interleave positions to analysis channels.
///
/// The ReSpeaker 4-mic array exposes 6 interleaved channels but only
/// positions 1–4 carry the raw microphone signals (position 0 is the
/// firmware's processed mix, position 5 is playback loopback).  The map
/// therefore defaults to offsets `1..=used`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelMap {
    /// Total interleaved channel count of the device (the demux stride).
    physical: usize,
    /// Interleave offsets of the channels used for analysis, in order.
    used_offsets: Vec<usize>,
}

impl ChannelMap {
    /// Build a map selecting `used` microphone channels out of `physical`
    /// interleaved ones, starting at interleave offset 1.
    ///
    /// # Panics
    ///
    /// Panics when `used >= physical` — offset `used` would run past the
    /// interleave.
    pub fn new(physical: usize, used: usize) -> Self {
        assert!(
            used < physical,
            "used channels ({used}) must be fewer than physical channels ({physical})"
        );
        Self {
            physical,
            used_offsets: (1..=used).collect(),
        }
    }

    /// Number of channels extracted per block.
    pub fn used(&self) -> usize {
        self.used_offsets.len()
    }

    /// Total interleaved channel count (the extraction stride).
    pub fn physical(&self) -> usize {
        self.physical
    }

    /// Interleave offset of the gate's reference channel — the first used
    /// channel (interleave position 1).
    pub fn reference_offset(&self) -> usize {
        self.used_offsets[0]
    }

    /// Extract every used channel from `block`, one `Vec<i16>` per channel.
    ///
    /// Each slice has length `block.len() / physical` (the last partial
    /// frame, if the block is not frame-aligned, contributes only to the
    /// channels it covers).
    pub fn demux(&self, block: &RawBlock) -> Vec<Vec<i16>> {
        self.used_offsets
            .iter()
            .map(|&offset| extract_channel(block.samples(), offset, self.physical))
            .collect()
    }

    /// Extract only the reference channel (used by the loudness gate).
    pub fn reference_channel(&self, block: &RawBlock) -> Vec<i16> {
        extract_channel(block.samples(), self.reference_offset(), self.physical)
    }
}

/// Strided extraction of one interleaved channel.
///
/// Returns `samples[offset], samples[offset + stride], …`; empty when
/// `offset` is past the end of the buffer.
pub fn extract_channel(samples: &[i16], offset: usize, stride: usize) -> Vec<i16> {
    if offset >= samples.len() {
        return Vec::new();
    }
    samples[offset..].iter().step_by(stride).copied().collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    /// Interleave `frames` frames of 6 channels where channel `c` always
    /// carries the value `c`.
    fn labelled_block(physical: usize, frames: usize) -> RawBlock {
        let mut samples = Vec::with_capacity(physical * frames);
        for _ in 0..frames {
            for c in 0..physical {
                samples.push(c as i16);
            }
        }
        RawBlock::new(samples)
    }

    #[test]
    fn demux_selects_offsets_one_through_used() {
        let map = ChannelMap::new(6, 4);
        let block = labelled_block(6, 8);
        let slices = map.demux(&block);

        assert_eq!(slices.len(), 4);
        for (i, slice) in slices.iter().enumerate() {
            // Offsets start at 1, so channel i carries value i + 1.
            assert!(slice.iter().all(|&s| s == (i as i16) + 1));
        }
    }

    #[test]
    fn slice_length_is_block_len_over_physical() {
        let map = ChannelMap::new(6, 4);
        let block = labelled_block(6, 1024);
        for slice in map.demux(&block) {
            assert_eq!(slice.len(), block.len() / map.physical());
        }
    }

    #[test]
    fn demux_is_deterministic() {
        let map = ChannelMap::new(6, 4);
        let block = labelled_block(6, 16);
        assert_eq!(map.demux(&block), map.demux(&block));
    }

    #[test]
    fn reference_channel_is_first_used_offset() {
        let map = ChannelMap::new(6, 4);
        assert_eq!(map.reference_offset(), 1);

        let block = labelled_block(6, 4);
        let reference = map.reference_channel(&block);
        assert!(reference.iter().all(|&s| s == 1));
    }

    #[test]
    fn extract_channel_past_end_is_empty() {
        assert_eq!(extract_channel(&[1, 2, 3], 5, 6), Vec::<i16>::new());
        assert_eq!(extract_channel(&[], 0, 6), Vec::<i16>::new());
    }

    #[test]
    #[should_panic(expected = "must be fewer than physical")]
    fn used_must_be_fewer_than_physical() {
        ChannelMap::new(4, 4);
    }
}
