//! Transcode worker channel port interface

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

/// Worker channel errors
#[derive(Debug, Clone, Error)]
pub enum WorkerChannelError {
    #[error("Transcoding engine is unavailable: {0}")]
    InitFailed(String),

    #[error("Transcode worker is no longer running")]
    Closed,
}

/// One conversion request sent to the worker
#[derive(Debug, Clone)]
pub struct ConvertRequest {
    pub bytes: Vec<u8>,
    pub suggested_name: String,
}

/// Messages flowing back from the worker for one job.
///
/// A job's event stream carries `Ready` when the worker accepts the job,
/// zero or more `Progress` notes, and exactly one terminal message
/// (`Complete` or `Error`), after which the stream closes. A stream that
/// closes without a terminal message means the worker died mid-job.
#[derive(Debug, Clone)]
pub enum WorkerEvent {
    Ready,
    Progress { fraction: f32, note: Option<String> },
    Complete { bytes: Vec<u8> },
    Error { note: String },
}

/// Port for the isolated transcoding worker.
///
/// Each `submit` call returns a receiver scoped to that job only, so
/// sequential requests never observe each other's events.
#[async_trait]
pub trait TranscodeWorker: Send + Sync {
    /// Submit one conversion job.
    ///
    /// # Returns
    /// A dedicated event receiver for the job, or a channel-level error if
    /// the worker cannot accept work.
    async fn submit(
        &self,
        request: ConvertRequest,
    ) -> Result<mpsc::Receiver<WorkerEvent>, WorkerChannelError>;
}
