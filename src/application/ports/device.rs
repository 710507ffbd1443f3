//! Device acquisition port interface

use std::time::Instant;

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Child;

/// Device acquisition errors.
/// All variants are recoverable; the flow may retry or fall back to upload.
#[derive(Debug, Clone, Error)]
pub enum DeviceError {
    #[error("Camera or microphone access was denied: {0}")]
    PermissionDenied(String),

    #[error("No matching capture device was found: {0}")]
    NotFound(String),

    #[error("Capture device is already in use: {0}")]
    Busy(String),

    #[error("Failed to acquire capture devices: {0}")]
    AcquireFailed(String),
}

/// Acquisition hints for camera and microphone streams.
/// Ideal values are hints only; acquisition must not fail solely
/// because an ideal value is unmet.
#[derive(Debug, Clone)]
pub struct CaptureConstraints {
    pub ideal_width: u32,
    pub ideal_height: u32,
    pub ideal_frame_rate: u32,
    pub echo_cancellation: bool,
    pub noise_suppression: bool,
    pub sample_rate: u32,
}

impl Default for CaptureConstraints {
    fn default() -> Self {
        Self {
            ideal_width: 1280,
            ideal_height: 720,
            ideal_frame_rate: 30,
            echo_cancellation: true,
            noise_suppression: true,
            sample_rate: 44100,
        }
    }
}

/// One acquisition of camera and microphone.
///
/// The session exclusively owns the live capture process for the duration of
/// one attempt; `release` stops every track and is idempotent. The session
/// releases itself on drop so an abandoned flow cannot leak the devices.
pub struct MediaSession {
    video_input: String,
    audio_input: String,
    constraints: CaptureConstraints,
    capture: Option<Child>,
    acquired_at: Instant,
}

impl MediaSession {
    /// Create a session over validated device inputs
    pub fn new(
        video_input: impl Into<String>,
        audio_input: impl Into<String>,
        constraints: CaptureConstraints,
    ) -> Self {
        Self {
            video_input: video_input.into(),
            audio_input: audio_input.into(),
            constraints,
            capture: None,
            acquired_at: Instant::now(),
        }
    }

    pub fn video_input(&self) -> &str {
        &self.video_input
    }

    pub fn audio_input(&self) -> &str {
        &self.audio_input
    }

    pub fn constraints(&self) -> &CaptureConstraints {
        &self.constraints
    }

    pub fn acquired_at(&self) -> Instant {
        self.acquired_at
    }

    /// Hand the live capture process to the session.
    /// Any previously attached capture is stopped first.
    pub fn attach_capture(&mut self, child: Child) {
        self.release();
        self.capture = Some(child);
    }

    /// Take the capture process back for a graceful stop.
    /// The caller becomes responsible for reaping it.
    pub fn take_capture(&mut self) -> Option<Child> {
        self.capture.take()
    }

    /// Whether a live capture is currently attached
    pub fn is_live(&self) -> bool {
        self.capture.is_some()
    }

    /// Stop every track in the session. Idempotent: releasing an
    /// already-released session is a no-op.
    pub fn release(&mut self) {
        if let Some(mut child) = self.capture.take() {
            let _ = child.start_kill();
        }
    }
}

impl Drop for MediaSession {
    fn drop(&mut self) {
        self.release();
    }
}

/// Port for camera and microphone acquisition
#[async_trait]
pub trait MediaDevice: Send + Sync {
    /// Acquire camera and microphone streams.
    ///
    /// # Arguments
    /// * `constraints` - Resolution, frame rate, and audio processing hints
    ///
    /// # Returns
    /// A live media session, or a recoverable `DeviceError`
    async fn acquire(&self, constraints: &CaptureConstraints) -> Result<MediaSession, DeviceError>;
}
