//! FFmpeg-backed camera and microphone acquisition adapter

use std::io::ErrorKind;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

use crate::application::ports::{CaptureConstraints, DeviceError, MediaDevice, MediaSession};

/// Errno reported when a V4L2 device is held by another process
#[cfg(unix)]
const EBUSY: i32 = 16;

/// Acquires camera and microphone devices for FFmpeg-based capture.
///
/// Acquisition validates that the capture tooling and the video device node
/// are reachable; the live capture process itself is spawned by the recorder
/// and attached to the returned session.
pub struct FfmpegCamera {
    video_input: String,
    audio_input: String,
}

impl FfmpegCamera {
    /// Create an adapter over the given device inputs
    /// (e.g. `/dev/video0` and ALSA `default`)
    pub fn new(video_input: impl Into<String>, audio_input: impl Into<String>) -> Self {
        Self {
            video_input: video_input.into(),
            audio_input: audio_input.into(),
        }
    }

    /// Verify the capture tooling is present
    async fn ensure_ffmpeg() -> Result<(), DeviceError> {
        let result = Command::new("ffmpeg")
            .arg("-version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;

        match result {
            Ok(status) if status.success() => Ok(()),
            Ok(status) => Err(DeviceError::AcquireFailed(format!(
                "ffmpeg -version exited with {}",
                status
            ))),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(DeviceError::NotFound(
                "ffmpeg is not installed".to_string(),
            )),
            Err(e) => Err(DeviceError::AcquireFailed(e.to_string())),
        }
    }

    /// Probe a device node, mapping the OS error to the device taxonomy.
    /// Inputs that are not filesystem paths (e.g. ALSA names) are skipped.
    async fn probe_device_node(input: &str) -> Result<(), DeviceError> {
        if !input.starts_with('/') {
            return Ok(());
        }

        match tokio::fs::File::open(input).await {
            Ok(_) => Ok(()),
            Err(e) => Err(Self::map_probe_error(input, &e)),
        }
    }

    fn map_probe_error(input: &str, e: &std::io::Error) -> DeviceError {
        match e.kind() {
            ErrorKind::NotFound => DeviceError::NotFound(input.to_string()),
            ErrorKind::PermissionDenied => DeviceError::PermissionDenied(input.to_string()),
            #[cfg(unix)]
            _ if e.raw_os_error() == Some(EBUSY) => DeviceError::Busy(input.to_string()),
            _ => DeviceError::AcquireFailed(format!("{}: {}", input, e)),
        }
    }
}

#[async_trait]
impl MediaDevice for FfmpegCamera {
    async fn acquire(&self, constraints: &CaptureConstraints) -> Result<MediaSession, DeviceError> {
        Self::ensure_ffmpeg().await?;
        Self::probe_device_node(&self.video_input).await?;

        Ok(MediaSession::new(
            self.video_input.clone(),
            self.audio_input.clone(),
            constraints.clone(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_probe_error_not_found() {
        let e = std::io::Error::new(ErrorKind::NotFound, "gone");
        assert!(matches!(
            FfmpegCamera::map_probe_error("/dev/video9", &e),
            DeviceError::NotFound(_)
        ));
    }

    #[test]
    fn map_probe_error_permission_denied() {
        let e = std::io::Error::new(ErrorKind::PermissionDenied, "nope");
        assert!(matches!(
            FfmpegCamera::map_probe_error("/dev/video0", &e),
            DeviceError::PermissionDenied(_)
        ));
    }

    #[cfg(unix)]
    #[test]
    fn map_probe_error_busy() {
        let e = std::io::Error::from_raw_os_error(EBUSY);
        assert!(matches!(
            FfmpegCamera::map_probe_error("/dev/video0", &e),
            DeviceError::Busy(_)
        ));
    }

    #[tokio::test]
    async fn non_path_inputs_are_not_probed() {
        // ALSA-style names are handed to FFmpeg as-is
        assert!(FfmpegCamera::probe_device_node("default").await.is_ok());
        assert!(FfmpegCamera::probe_device_node("hw:1,0").await.is_ok());
    }

    #[tokio::test]
    async fn missing_device_node_is_not_found() {
        let err = FfmpegCamera::probe_device_node("/nonexistent/video0")
            .await
            .unwrap_err();
        assert!(matches!(err, DeviceError::NotFound(_)));
    }
}
