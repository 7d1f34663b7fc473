//! Audio acquisition — capture → demultiplex → segment → loudness level.
//!
//! # Pipeline
//!
//! ```text
//! Microphone array → cpal callback → RawBlock (bounded mpsc) → ChannelMap
//!                 → Segmenter (overlap carry-forward) → Segment
//!                 → block_decibels (gate level from the raw block)
//! ```
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use doa_tracker::audio::{AudioCapture, StreamSource};
//! use doa_tracker::config::AudioConfig;
//!
//! let capture = AudioCapture::open(&AudioConfig::default(), "ReSpeaker 4 Mic Array").unwrap();
//! let (_handle, mut source) = capture.start().unwrap();
//!
//! while let Ok(Some(block)) = source.read(Duration::from_millis(100)) {
//!     println!("received {} interleaved samples", block.len());
//! }
//! ```

pub mod block;
pub mod capture;
pub mod level;
pub mod segment;
pub mod source;

pub use block::{extract_channel, ChannelMap, RawBlock};
pub use capture::{AudioCapture, CaptureError, CpalSource, StreamHandle};
pub use level::{block_decibels, silence_floor_db};
pub use segment::{Segment, Segmenter};
pub use source::{SourceError, StreamSource};
