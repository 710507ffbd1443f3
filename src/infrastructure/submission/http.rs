//! HTTP multipart submission adapter for the analysis service

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use serde::Deserialize;

use crate::application::ports::{ReportReceipt, ReportSubmitter, SubmitError};
use crate::domain::video::VideoArtifact;

/// Successful analysis response body
#[derive(Debug, Deserialize)]
struct AnalyzeResponse {
    report_id: i64,
    report: serde_json::Value,
}

/// Error response body
#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

/// Submits the final artifact to the analysis endpoint as multipart
/// form data: a `video` file part plus an optional `reflection` text part.
pub struct HttpReportSubmitter {
    client: reqwest::Client,
    api_url: String,
}

impl HttpReportSubmitter {
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: api_url.into(),
        }
    }

    fn build_form(
        video: &VideoArtifact,
        reflection: Option<&str>,
    ) -> Result<Form, SubmitError> {
        let part = Part::bytes(video.data().to_vec())
            .file_name(video.suggested_name())
            .mime_str(video.mime_type().as_str())
            .map_err(|e| SubmitError::RequestFailed(e.to_string()))?;

        let mut form = Form::new().part("video", part);
        if let Some(text) = reflection {
            form = form.text("reflection", text.to_string());
        }
        Ok(form)
    }

    /// Turn a non-success response into the user-facing error message,
    /// preferring the service's own message when the body carries one
    fn error_from_body(status: StatusCode, body: &str) -> SubmitError {
        if let Ok(parsed) = serde_json::from_str::<ApiErrorResponse>(body) {
            return SubmitError::ApiError(parsed.error.message);
        }
        SubmitError::ApiError(format!("analysis service returned {}", status))
    }
}

#[async_trait]
impl ReportSubmitter for HttpReportSubmitter {
    async fn submit(
        &self,
        video: &VideoArtifact,
        reflection: Option<&str>,
    ) -> Result<ReportReceipt, SubmitError> {
        let form = Self::build_form(video, reflection)?;

        let response = self
            .client
            .post(&self.api_url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| SubmitError::RequestFailed(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| SubmitError::RequestFailed(e.to_string()))?;

        if !status.is_success() {
            return Err(Self::error_from_body(status, &body));
        }

        let parsed: AnalyzeResponse = serde_json::from_str(&body)
            .map_err(|e| SubmitError::ParseError(e.to_string()))?;

        Ok(ReportReceipt {
            report_id: parsed.report_id,
            report: parsed.report,
        })
    }
}
