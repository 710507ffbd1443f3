//! Recording domain module

mod duration;
mod session;

pub use duration::{Duration, CHUNK_FLUSH_INTERVAL_MS, RECORDING_CEILING_SECS};
pub use session::{RecordingSession, RecordingState, RecordingStateError, TickOutcome};
