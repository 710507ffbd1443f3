//! Video artifact value object

use std::fmt;

/// Maximum artifact size accepted for submission (10 MiB)
pub const MAX_ARTIFACT_BYTES: usize = 10 * 1024 * 1024;

/// Supported video MIME types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VideoMimeType {
    Mp4,
    Webm,
    Matroska,
    Ogg,
    QuickTime,
    Avi,
}

impl VideoMimeType {
    /// Get the MIME type string
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Mp4 => "video/mp4",
            Self::Webm => "video/webm",
            Self::Matroska => "video/x-matroska",
            Self::Ogg => "video/ogg",
            Self::QuickTime => "video/quicktime",
            Self::Avi => "video/avi",
        }
    }

    /// Get the file extension
    pub const fn extension(&self) -> &'static str {
        match self {
            Self::Mp4 => "mp4",
            Self::Webm => "webm",
            Self::Matroska => "mkv",
            Self::Ogg => "ogv",
            Self::QuickTime => "mov",
            Self::Avi => "avi",
        }
    }

    /// Whether this is the broadly playable target format
    pub const fn is_conversion_target(&self) -> bool {
        matches!(self, Self::Mp4)
    }

    /// Whether the transcoding engine accepts this as a source format
    pub const fn is_conversion_source(&self) -> bool {
        matches!(
            self,
            Self::Webm | Self::Matroska | Self::Ogg | Self::QuickTime
        )
    }

    /// Parse a MIME type string (parameters after ';' are ignored)
    pub fn parse(s: &str) -> Option<Self> {
        let base = s.split(';').next().unwrap_or("").trim();
        match base {
            "video/mp4" => Some(Self::Mp4),
            "video/webm" => Some(Self::Webm),
            "video/x-matroska" | "video/matroska" => Some(Self::Matroska),
            "video/ogg" => Some(Self::Ogg),
            "video/quicktime" => Some(Self::QuickTime),
            "video/avi" | "video/x-msvideo" => Some(Self::Avi),
            _ => None,
        }
    }

    /// Guess the MIME type from a file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "mp4" | "m4v" => Some(Self::Mp4),
            "webm" => Some(Self::Webm),
            "mkv" => Some(Self::Matroska),
            "ogv" | "ogg" => Some(Self::Ogg),
            "mov" => Some(Self::QuickTime),
            "avi" => Some(Self::Avi),
            _ => None,
        }
    }
}

impl fmt::Display for VideoMimeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How the artifact entered the flow.
/// Uploaded artifacts must already declare the required format;
/// recorded artifacts may carry any negotiated codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactOrigin {
    Recorded,
    Uploaded,
}

/// Value object representing a captured video ready for conversion or
/// submission. Contains raw bytes, the declared MIME type, and the origin.
#[derive(Debug, Clone)]
pub struct VideoArtifact {
    data: Vec<u8>,
    mime_type: VideoMimeType,
    origin: ArtifactOrigin,
}

impl VideoArtifact {
    /// Create an artifact from raw bytes
    pub fn new(data: Vec<u8>, mime_type: VideoMimeType, origin: ArtifactOrigin) -> Self {
        Self {
            data,
            mime_type,
            origin,
        }
    }

    /// Get the raw video data
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Consume and return the raw video data
    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    /// Get the declared MIME type
    pub fn mime_type(&self) -> VideoMimeType {
        self.mime_type
    }

    /// Get the artifact origin
    pub fn origin(&self) -> ArtifactOrigin {
        self.origin
    }

    /// Get the size in bytes
    pub fn size_bytes(&self) -> usize {
        self.data.len()
    }

    /// Whether the artifact fits under the submission ceiling
    pub fn within_size_limit(&self) -> bool {
        self.data.len() <= MAX_ARTIFACT_BYTES
    }

    /// Return the same bytes declared under a different MIME type.
    /// Used for the already-compatible fast path and the conversion fallback.
    pub fn relabeled(self, mime_type: VideoMimeType) -> Self {
        Self { mime_type, ..self }
    }

    /// Suggested file name for this artifact, derived from the MIME type
    pub fn suggested_name(&self) -> String {
        let timestamp = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or(0);
        format!("checkin-{}.{}", timestamp, self.mime_type.extension())
    }

    /// Get human-readable size
    pub fn human_readable_size(&self) -> String {
        let bytes = self.size_bytes();
        if bytes < 1024 {
            format!("{} B", bytes)
        } else if bytes < 1024 * 1024 {
            format!("{:.1} KB", bytes as f64 / 1024.0)
        } else {
            format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
        }
    }
}
