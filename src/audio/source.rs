//! The stream-source seam the processing loop reads from.
//!
//! [`StreamSource`] abstracts "blocking read of one [`RawBlock`]" so the
//! worker loop can be driven by the live cpal capture in production and by
//! scripted block sequences in tests.

use std::time::Duration;

use thiserror::Error;

use super::block::RawBlock;

// ---------------------------------------------------------------------------
// SourceError
// ---------------------------------------------------------------------------

/// Errors surfaced by a [`StreamSource`] read.
///
/// `Overflow` is transient — the loop logs it and keeps going.  The other
/// variants are terminal: the loop exits and the error propagates to the
/// controlling thread via `stop()`.
#[derive(Debug, Clone, Error)]
pub enum SourceError {
    /// The input buffer overflowed and data was lost.  Not fatal.
    #[error("input buffer overflow — samples dropped")]
    Overflow,

    /// The producing side of the stream has gone away.
    #[error("audio stream disconnected")]
    Disconnected,

    /// The device reported an unrecoverable error.
    #[error("audio device error: {0}")]
    Device(String),
}

// ---------------------------------------------------------------------------
// StreamSource
// ---------------------------------------------------------------------------

/// Blocking, overflow-tolerant producer of [`RawBlock`]s.
///
/// `read` blocks for at most `timeout`; `Ok(None)` means no data arrived in
/// that window (the caller re-checks its stop flag and reads again), so a
/// stop request is always observed within one timeout period even when the
/// device goes quiet.
pub trait StreamSource: Send {
    /// Read the next block, waiting up to `timeout` for data.
    fn read(&mut self, timeout: Duration) -> Result<Option<RawBlock>, SourceError>;
}

// Compile-time assertion: Box<dyn StreamSource> must be constructible.
const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn StreamSource>) {}
};
