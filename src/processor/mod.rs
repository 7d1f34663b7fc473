//! Processing lifecycle — the worker thread that turns the capture stream
//! into [`BearingUpdate`]s.
//!
//! ```text
//! StreamSource ──▶ DoaProcessor worker thread
//!                    demux → segment → gate → estimate → normalize
//!                                 │
//!                                 ▼
//!                  BearingUpdate → registered observers (synchronous)
//! ```

pub mod runner;
pub mod state;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use runner::{DoaProcessor, Observer};
pub use state::{BearingUpdate, ProcessorError};
