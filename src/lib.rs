//! Real-time direction-of-arrival tracking for a fixed 4-microphone array.
//!
//! The crate turns a continuous interleaved capture stream into fixed-length
//! multichannel analysis windows, applies an RMS loudness gate, and hands
//! qualifying windows to a pluggable bearing estimator, emitting one
//! `(angle-or-absent, decibels)` update per window.
//!
//! # Data flow
//!
//! ```text
//! cpal stream → RawBlock → ChannelMap → Segmenter → Segment
//!                  │                        │
//!                  └── block_decibels ──▶ gate ──▶ StftAnalyzer
//!                                                      │
//!                              BearingEstimator ◀──────┘
//!                                     │ azimuth (radians)
//!                         normalize_azimuth → BearingUpdate → observers
//! ```
//!
//! See [`processor::DoaProcessor`] for the lifecycle entry point.

pub mod audio;
pub mod config;
pub mod doa;
pub mod processor;
