//! Capture flow use case

use thiserror::Error;
use tokio::sync::Mutex;

use crate::domain::flow::{CaptureFlow, FlowState, InvalidFlowTransition};
use crate::domain::recording::Duration;
use crate::domain::video::{
    ArtifactOrigin, VideoArtifact, VideoMimeType, MAX_ARTIFACT_BYTES,
};

use super::convert::{ConvertProgress, TranscodeOrchestrator};
use super::ports::{
    CaptureConstraints, DeviceError, MediaDevice, RecorderError, ReportReceipt, ReportSubmitter,
    SubmitError, TickCallback, TranscodeWorker, VideoRecorder,
};

/// Errors surfaced at the capture flow boundary.
/// Conversion failures never appear here: they degrade to a warning and the
/// flow proceeds with the unconverted artifact.
#[derive(Debug, Clone, Error)]
pub enum FlowError {
    #[error(transparent)]
    Device(#[from] DeviceError),

    #[error(transparent)]
    Recorder(#[from] RecorderError),

    #[error(
        "Unsupported file type \"{declared}\". Please choose a {} file.",
        VideoMimeType::Mp4
    )]
    UnsupportedUpload { declared: String },

    #[error(
        "File is {actual_mb:.1} MB, which exceeds the {limit_mb} MB limit. \
         Please choose a smaller file.",
        actual_mb = *.actual_bytes as f64 / (1024.0 * 1024.0),
        limit_mb = MAX_ARTIFACT_BYTES / (1024 * 1024)
    )]
    UploadTooLarge { actual_bytes: usize },

    #[error("No recording is in progress")]
    NoArtifact,

    #[error(transparent)]
    InvalidTransition(#[from] InvalidFlowTransition),

    #[error(transparent)]
    Submit(#[from] SubmitError),
}

/// Fixed policy for one capture flow instance
#[derive(Debug, Clone)]
pub struct CaptureFlowConfig {
    pub constraints: CaptureConstraints,
    pub max_duration: Duration,
}

impl Default for CaptureFlowConfig {
    fn default() -> Self {
        Self {
            constraints: CaptureConstraints::default(),
            max_duration: Duration::recording_ceiling(),
        }
    }
}

/// The user-facing capture sequencing use case:
/// consent, record or upload, review (with conversion), confirm, submit.
///
/// Owns the captured artifact and the conversion policy. The worker channel
/// is optional; without one (engine unavailable or conversion disabled)
/// every artifact proceeds unconverted.
pub struct CaptureFlowUseCase<D, R, W, S>
where
    D: MediaDevice,
    R: VideoRecorder,
    W: TranscodeWorker,
    S: ReportSubmitter,
{
    device: D,
    recorder: R,
    orchestrator: Option<TranscodeOrchestrator<W>>,
    submitter: S,
    config: CaptureFlowConfig,
    flow: Mutex<CaptureFlow>,
    original: Mutex<Option<VideoArtifact>>,
    reviewed: Mutex<Option<VideoArtifact>>,
    warning: Mutex<Option<String>>,
}

impl<D, R, W, S> CaptureFlowUseCase<D, R, W, S>
where
    D: MediaDevice,
    R: VideoRecorder,
    W: TranscodeWorker,
    S: ReportSubmitter,
{
    /// Create a new flow instance.
    /// `worker` is `None` when conversion is unavailable or disabled.
    pub fn new(
        device: D,
        recorder: R,
        worker: Option<W>,
        submitter: S,
        config: CaptureFlowConfig,
    ) -> Self {
        Self {
            device,
            recorder,
            orchestrator: worker.map(TranscodeOrchestrator::new),
            submitter,
            config,
            flow: Mutex::new(CaptureFlow::new()),
            original: Mutex::new(None),
            reviewed: Mutex::new(None),
            warning: Mutex::new(None),
        }
    }

    /// Current flow state
    pub async fn state(&self) -> FlowState {
        self.flow.lock().await.state()
    }

    /// Whether a recording is currently in flight.
    /// Turns false on its own when the recorder auto-stops at the ceiling.
    pub fn is_recording(&self) -> bool {
        self.recorder.is_recording()
    }

    /// Non-blocking warning recorded during review, if any
    pub async fn conversion_warning(&self) -> Option<String> {
        self.warning.lock().await.clone()
    }

    /// The artifact currently under review
    pub async fn reviewed_artifact(&self) -> Option<VideoArtifact> {
        self.reviewed.lock().await.clone()
    }

    /// User granted consent; capture controls become available
    pub async fn give_consent(&self) -> Result<(), FlowError> {
        self.flow.lock().await.give_consent()?;
        Ok(())
    }

    /// Back navigation from capture to consent.
    /// Discards any in-progress recording and releases the devices.
    pub async fn go_back(&self) -> Result<(), FlowError> {
        self.flow.lock().await.go_back()?;
        self.recorder.cancel().await?;
        self.clear_artifacts().await;
        Ok(())
    }

    /// Acquire the devices and start a bounded recording
    pub async fn start_recording(&self, on_tick: Option<TickCallback>) -> Result<(), FlowError> {
        self.ensure_state(FlowState::Capturing, "start recording")
            .await?;

        let session = self.device.acquire(&self.config.constraints).await?;
        self.recorder
            .start(session, self.config.max_duration, on_tick)
            .await?;
        Ok(())
    }

    /// Stop the recording, run conversion, and move to review.
    /// Blocks until the orchestrator resolves (success or fallback).
    pub async fn stop_recording(
        &self,
        on_progress: Option<ConvertProgress>,
    ) -> Result<VideoArtifact, FlowError> {
        self.ensure_state(FlowState::Capturing, "stop recording")
            .await?;

        let artifact = self.recorder.stop().await?.ok_or(FlowError::NoArtifact)?;
        self.review(artifact, on_progress).await
    }

    /// Validate a directly selected file, run conversion, and move to review
    pub async fn upload(
        &self,
        bytes: Vec<u8>,
        declared_mime: &str,
        on_progress: Option<ConvertProgress>,
    ) -> Result<VideoArtifact, FlowError> {
        self.ensure_state(FlowState::Capturing, "upload a file")
            .await?;

        // An upload replaces any in-progress recording
        self.recorder.cancel().await?;

        let mime = VideoMimeType::parse(declared_mime)
            .filter(|m| m.is_conversion_target())
            .ok_or_else(|| FlowError::UnsupportedUpload {
                declared: declared_mime.to_string(),
            })?;

        if bytes.len() > MAX_ARTIFACT_BYTES {
            return Err(FlowError::UploadTooLarge {
                actual_bytes: bytes.len(),
            });
        }

        let artifact = VideoArtifact::new(bytes, mime, ArtifactOrigin::Uploaded);
        self.review(artifact, on_progress).await
    }

    /// Discard the reviewed artifact and return to capture
    pub async fn retake(&self) -> Result<(), FlowError> {
        self.flow.lock().await.retake()?;
        self.clear_artifacts().await;
        Ok(())
    }

    /// Confirm the reviewed artifact and hand it to the analysis service.
    /// A failed submission reopens the review so the user can retry.
    pub async fn confirm(&self, reflection: Option<&str>) -> Result<ReportReceipt, FlowError> {
        self.flow.lock().await.confirm()?;

        let artifact = {
            let reviewed = self.reviewed.lock().await;
            reviewed.clone().ok_or(FlowError::NoArtifact)?
        };

        match self.submitter.submit(&artifact, reflection).await {
            Ok(receipt) => Ok(receipt),
            Err(e) => {
                // Leave the user at review with the artifact intact
                let _ = self.flow.lock().await.reopen();
                Err(e.into())
            }
        }
    }

    /// Abandon the flow: discard state and release every held resource
    pub async fn teardown(&self) {
        let _ = self.recorder.cancel().await;
        self.clear_artifacts().await;
    }

    async fn ensure_state(&self, expected: FlowState, action: &'static str) -> Result<(), FlowError> {
        let state = self.flow.lock().await.state();
        if state != expected {
            return Err(InvalidFlowTransition {
                current_state: state,
                action,
            }
            .into());
        }
        Ok(())
    }

    async fn clear_artifacts(&self) {
        *self.original.lock().await = None;
        *self.reviewed.lock().await = None;
        *self.warning.lock().await = None;
    }

    /// Run the conversion policy over a validated artifact and transition to
    /// review. Conversion failure falls back to the original artifact,
    /// byte-identical and relabeled with its native mime type.
    async fn review(
        &self,
        artifact: VideoArtifact,
        on_progress: Option<ConvertProgress>,
    ) -> Result<VideoArtifact, FlowError> {
        *self.warning.lock().await = None;
        *self.original.lock().await = Some(artifact.clone());

        let reviewed = match &self.orchestrator {
            None => artifact,
            Some(orchestrator) => {
                let native_mime = artifact.mime_type();
                match orchestrator.convert(artifact.clone(), on_progress).await {
                    Ok(converted) => converted,
                    Err(failure) => {
                        *self.warning.lock().await = Some(format!(
                            "Could not convert the video ({}). Continuing with the original {} file.",
                            failure, native_mime
                        ));
                        artifact.relabeled(native_mime)
                    }
                }
            }
        };

        *self.reviewed.lock().await = Some(reviewed.clone());
        self.flow.lock().await.present_artifact()?;
        Ok(reviewed)
    }
}
