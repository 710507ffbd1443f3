//! Bounded video recording port interface

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use super::device::MediaSession;
use crate::domain::recording::Duration;
use crate::domain::video::{VideoArtifact, MAX_ARTIFACT_BYTES};

/// Recording errors
#[derive(Debug, Clone, Error)]
pub enum RecorderError {
    #[error("Failed to start recording: {0}")]
    StartFailed(String),

    #[error("Recording failed: {0}")]
    RecordingFailed(String),

    #[error("No supported recording encoding is available on this system")]
    UnsupportedCapture,

    #[error(
        "Recording is {actual_mb:.1} MB, which exceeds the {limit_mb} MB limit. \
         Please record a shorter clip.",
        actual_mb = *.actual_bytes as f64 / (1024.0 * 1024.0),
        limit_mb = MAX_ARTIFACT_BYTES / (1024 * 1024)
    )]
    SizeExceeded { actual_bytes: usize },

    #[error("A recording is already in progress")]
    AlreadyRecording,
}

/// Progress callback type for the per-second recording tick.
/// Parameters: (elapsed_ms, ceiling_ms)
pub type TickCallback = Arc<dyn Fn(u64, u64) + Send + Sync>;

/// Port for bounded video recording.
///
/// Implementations negotiate the best-supported encoding from a fixed
/// preference list, flush chunks on a one-second cadence, and auto-stop the
/// instant the elapsed time reaches the duration ceiling.
#[async_trait]
pub trait VideoRecorder: Send + Sync {
    /// Start recording against an acquired media session.
    /// The recorder takes ownership of the session and releases its tracks
    /// when the recording stops.
    async fn start(
        &self,
        session: MediaSession,
        max_duration: Duration,
        on_tick: Option<TickCallback>,
    ) -> Result<(), RecorderError>;

    /// Stop recording and return the concatenated artifact.
    /// Calling `stop` while not recording is a no-op returning `None`.
    async fn stop(&self) -> Result<Option<VideoArtifact>, RecorderError>;

    /// Discard the in-progress recording and release the session
    async fn cancel(&self) -> Result<(), RecorderError>;

    /// Check if currently recording
    fn is_recording(&self) -> bool;

    /// Get elapsed recording time in milliseconds
    fn elapsed_ms(&self) -> u64;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_exceeded_message_names_both_sizes() {
        let err = RecorderError::SizeExceeded {
            actual_bytes: 12 * 1024 * 1024,
        };
        let msg = err.to_string();
        assert!(msg.contains("12.0 MB"));
        assert!(msg.contains("10 MB"));
    }
}
