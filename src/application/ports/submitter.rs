//! Report submission port interface

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::video::VideoArtifact;

/// Submission errors
#[derive(Debug, Clone, Error)]
pub enum SubmitError {
    #[error("Submission request failed: {0}")]
    RequestFailed(String),

    #[error("Analysis service error: {0}")]
    ApiError(String),

    #[error("Failed to parse analysis response: {0}")]
    ParseError(String),
}

/// Receipt returned after a successful submission
#[derive(Debug, Clone)]
pub struct ReportReceipt {
    /// Identifier the report is stored under
    pub report_id: i64,
    /// Generated report content
    pub report: serde_json::Value,
}

/// Port for handing the final artifact to the analysis service
#[async_trait]
pub trait ReportSubmitter: Send + Sync {
    /// Submit the final video and an optional free-text reflection.
    ///
    /// # Returns
    /// A receipt with the report identifier and content, or an error
    async fn submit(
        &self,
        video: &VideoArtifact,
        reflection: Option<&str>,
    ) -> Result<ReportReceipt, SubmitError>;
}
