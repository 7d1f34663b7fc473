//! Processor output and error types.

use thiserror::Error;

use crate::doa::Algorithm;

// ---------------------------------------------------------------------------
// BearingUpdate
// ---------------------------------------------------------------------------

/// One notification per completed segment cycle.
///
/// `angle_degrees` is `None` when the loudness gate suppressed estimation or
/// the estimator failed fatally for this segment; `decibels` is always
/// present.  The processor never retains past updates — history and decay
/// rendering are the consumer's concern.
#[derive(Debug, Clone, PartialEq)]
pub struct BearingUpdate {
    /// Normalized bearing in degrees [0, 360), absent when gated out.
    pub angle_degrees: Option<f64>,
    /// RMS level of the triggering block's reference channel, in dB.
    pub decibels: f64,
}

// ---------------------------------------------------------------------------
// ProcessorError
// ---------------------------------------------------------------------------

/// Errors surfaced by the lifecycle controller.
#[derive(Debug, Clone, Error)]
pub enum ProcessorError {
    /// `start` was called while the worker is running, or a stopped-only
    /// setting was changed while running.
    #[error("processor is already running")]
    AlreadyRunning,

    /// The configured algorithm is not honoured by the installed estimator.
    /// Caught at start, before any processing.
    #[error("estimator does not support algorithm {0}")]
    UnsupportedAlgorithm(Algorithm),

    /// Geometry arity does not match the analysed channel count.  Caught at
    /// start, before any processing.
    #[error("geometry has {geometry} microphones but {used} channels are analysed")]
    GeometryMismatch { geometry: usize, used: usize },

    /// The stream became unreadable; the worker has exited and released the
    /// source.
    #[error("audio stream failed: {0}")]
    Device(String),

    /// The worker thread panicked.
    #[error("worker thread panicked")]
    WorkerPanic,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_is_send_and_clone() {
        fn assert_send<T: Send + Clone>() {}
        assert_send::<BearingUpdate>();
    }

    #[test]
    fn errors_render_their_context() {
        let err = ProcessorError::UnsupportedAlgorithm(Algorithm::Tops);
        assert!(err.to_string().contains("TOPS"));

        let err = ProcessorError::Device("stream closed".into());
        assert!(err.to_string().contains("stream closed"));
    }
}
