//! Recording session entity

use std::fmt;
use thiserror::Error;

use super::duration::{Duration, CHUNK_FLUSH_INTERVAL_MS};
use crate::domain::video::{ArtifactOrigin, VideoArtifact, VideoMimeType};

/// Recording session states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RecordingState {
    #[default]
    Idle,
    Recording,
    Stopped,
    Error,
}

impl RecordingState {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Recording => "recording",
            Self::Stopped => "stopped",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for RecordingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error when a session operation does not match its current state
#[derive(Debug, Clone, Error)]
#[error("Cannot {action} while the recording session is {state}")]
pub struct RecordingStateError {
    pub state: RecordingState,
    pub action: &'static str,
}

/// Outcome of one elapsed-time tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Still under the ceiling
    Continue,
    /// Elapsed reached the ceiling; the session must be stopped now
    CeilingReached,
}

/// One bounded recording attempt.
///
/// Chunks are append-only and order-preserving; the elapsed counter advances
/// once per flush tick and the session demands a stop the instant it reaches
/// the ceiling. Finishing concatenates all chunks into a single artifact
/// tagged with the negotiated MIME type.
#[derive(Debug)]
pub struct RecordingSession {
    state: RecordingState,
    mime_type: VideoMimeType,
    ceiling: Duration,
    elapsed_ms: u64,
    chunks: Vec<Vec<u8>>,
}

impl RecordingSession {
    /// Begin a recording session with the negotiated encoding.
    /// Durations above the hard ceiling are clamped, not rejected.
    pub fn begin(mime_type: VideoMimeType, max_duration: Duration) -> Self {
        Self {
            state: RecordingState::Recording,
            mime_type,
            ceiling: max_duration.clamped_to_ceiling(),
            elapsed_ms: 0,
            chunks: Vec::new(),
        }
    }

    pub fn state(&self) -> RecordingState {
        self.state
    }

    pub fn mime_type(&self) -> VideoMimeType {
        self.mime_type
    }

    pub fn ceiling(&self) -> Duration {
        self.ceiling
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ms
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Total bytes accumulated so far
    pub fn accumulated_bytes(&self) -> usize {
        self.chunks.iter().map(Vec::len).sum()
    }

    /// Append one flushed chunk. Empty flushes are dropped.
    pub fn append_chunk(&mut self, bytes: Vec<u8>) -> Result<(), RecordingStateError> {
        if self.state != RecordingState::Recording {
            return Err(RecordingStateError {
                state: self.state,
                action: "append a chunk",
            });
        }
        if !bytes.is_empty() {
            self.chunks.push(bytes);
        }
        Ok(())
    }

    /// Advance the elapsed counter by one flush interval.
    /// Returns `CeilingReached` the instant the ceiling is hit.
    pub fn tick(&mut self) -> Result<TickOutcome, RecordingStateError> {
        if self.state != RecordingState::Recording {
            return Err(RecordingStateError {
                state: self.state,
                action: "tick",
            });
        }
        self.elapsed_ms += CHUNK_FLUSH_INTERVAL_MS;
        if self.elapsed_ms >= self.ceiling.as_millis() {
            self.elapsed_ms = self.ceiling.as_millis();
            Ok(TickOutcome::CeilingReached)
        } else {
            Ok(TickOutcome::Continue)
        }
    }

    /// Stop the session and concatenate every chunk into one artifact.
    /// `trailing` carries any bytes flushed after the last full tick.
    pub fn finish(mut self, trailing: Vec<u8>) -> Result<VideoArtifact, RecordingStateError> {
        if self.state != RecordingState::Recording {
            return Err(RecordingStateError {
                state: self.state,
                action: "finish",
            });
        }
        if !trailing.is_empty() {
            self.chunks.push(trailing);
        }
        self.state = RecordingState::Stopped;

        let total = self.accumulated_bytes();
        let mut data = Vec::with_capacity(total);
        for chunk in &self.chunks {
            data.extend_from_slice(chunk);
        }

        Ok(VideoArtifact::new(
            data,
            self.mime_type,
            ArtifactOrigin::Recorded,
        ))
    }

    /// Mark the session as failed; its chunks are discarded by the caller.
    pub fn fail(&mut self) {
        self.state = RecordingState::Error;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(secs: u64) -> RecordingSession {
        RecordingSession::begin(VideoMimeType::Webm, Duration::from_secs(secs))
    }

    #[test]
    fn begin_starts_recording_with_clamped_ceiling() {
        let s = session(5);
        assert_eq!(s.state(), RecordingState::Recording);
        assert_eq!(s.ceiling().as_secs(), 5);
        assert_eq!(s.elapsed_ms(), 0);

        let clamped = session(120);
        assert_eq!(clamped.ceiling().as_secs(), 30);
    }

    #[test]
    fn chunks_preserve_order() {
        let mut s = session(10);
        s.append_chunk(vec![1, 1]).unwrap();
        s.append_chunk(vec![2]).unwrap();
        s.append_chunk(vec![]).unwrap(); // empty flush dropped
        s.append_chunk(vec![3, 3, 3]).unwrap();
        assert_eq!(s.chunk_count(), 3);

        let artifact = s.finish(vec![4]).unwrap();
        assert_eq!(artifact.data(), &[1, 1, 2, 3, 3, 3, 4]);
        assert_eq!(artifact.mime_type(), VideoMimeType::Webm);
        assert_eq!(artifact.origin(), ArtifactOrigin::Recorded);
    }

    #[test]
    fn tick_reports_ceiling_exactly_at_limit() {
        let mut s = session(3);
        assert_eq!(s.tick().unwrap(), TickOutcome::Continue);
        assert_eq!(s.tick().unwrap(), TickOutcome::Continue);
        assert_eq!(s.tick().unwrap(), TickOutcome::CeilingReached);
        assert_eq!(s.elapsed_ms(), 3000);
    }

    #[test]
    fn elapsed_never_exceeds_ceiling() {
        let mut s = session(2);
        let _ = s.tick().unwrap();
        let _ = s.tick().unwrap();
        // A straggler tick must not push elapsed past the ceiling
        let _ = s.tick().unwrap();
        assert_eq!(s.elapsed_ms(), 2000);
    }

    #[test]
    fn elapsed_strictly_increases_while_recording() {
        let mut s = session(10);
        let mut last = s.elapsed_ms();
        for _ in 0..5 {
            s.tick().unwrap();
            assert!(s.elapsed_ms() > last);
            last = s.elapsed_ms();
        }
    }

    #[test]
    fn append_after_finish_fails() {
        let s = session(5);
        let mut failed = session(5);
        failed.fail();
        assert!(failed.append_chunk(vec![1]).is_err());
        assert!(failed.tick().is_err());

        let artifact = s.finish(vec![]).unwrap();
        assert!(artifact.data().is_empty());
    }

    #[test]
    fn finish_twice_is_impossible_by_construction() {
        // finish consumes the session; this test documents the double-stop
        // guard living in the type system
        let s = session(5);
        let _ = s.finish(vec![]).unwrap();
    }

    #[test]
    fn fail_moves_to_error_state() {
        let mut s = session(5);
        s.fail();
        assert_eq!(s.state(), RecordingState::Error);
    }
}
