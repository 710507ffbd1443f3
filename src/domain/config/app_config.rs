//! Application configuration value object

use serde::{Deserialize, Serialize};

use crate::domain::recording::Duration;

/// Default analysis API endpoint
pub const DEFAULT_API_URL: &str = "http://localhost:3000/api/analyze";

/// Application configuration.
/// All fields are optional to support partial configs and merging.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub api_url: Option<String>,
    pub duration: Option<String>,
    pub video_device: Option<String>,
    pub audio_device: Option<String>,
    pub skip_convert: Option<bool>,
}

impl AppConfig {
    /// Create config with default values
    pub fn defaults() -> Self {
        Self {
            api_url: Some(DEFAULT_API_URL.to_string()),
            duration: Some("30s".to_string()),
            video_device: Some("/dev/video0".to_string()),
            audio_device: Some("default".to_string()),
            skip_convert: Some(false),
        }
    }

    /// Create an empty config (all None)
    pub fn empty() -> Self {
        Self::default()
    }

    /// Merge this config with another, where other takes precedence.
    /// Only non-None values from other will override this.
    pub fn merge(self, other: Self) -> Self {
        Self {
            api_url: other.api_url.or(self.api_url),
            duration: other.duration.or(self.duration),
            video_device: other.video_device.or(self.video_device),
            audio_device: other.audio_device.or(self.audio_device),
            skip_convert: other.skip_convert.or(self.skip_convert),
        }
    }

    /// Get the API endpoint, or the default if not set
    pub fn api_url_or_default(&self) -> &str {
        self.api_url.as_deref().unwrap_or(DEFAULT_API_URL)
    }

    /// Get duration as parsed Duration (clamped to the ceiling),
    /// or the ceiling if not set/invalid
    pub fn duration_or_default(&self) -> Duration {
        self.duration
            .as_ref()
            .and_then(|s| s.parse::<Duration>().ok())
            .map(Duration::clamped_to_ceiling)
            .unwrap_or_else(Duration::recording_ceiling)
    }

    /// Get the video device, or the default if not set
    pub fn video_device_or_default(&self) -> &str {
        self.video_device.as_deref().unwrap_or("/dev/video0")
    }

    /// Get the audio device, or the default if not set
    pub fn audio_device_or_default(&self) -> &str {
        self.audio_device.as_deref().unwrap_or("default")
    }

    /// Get the skip-convert setting, or false if not set
    pub fn skip_convert_or_default(&self) -> bool {
        self.skip_convert.unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_have_expected_values() {
        let config = AppConfig::defaults();
        assert_eq!(config.api_url, Some(DEFAULT_API_URL.to_string()));
        assert_eq!(config.duration, Some("30s".to_string()));
        assert_eq!(config.video_device, Some("/dev/video0".to_string()));
        assert_eq!(config.audio_device, Some("default".to_string()));
        assert_eq!(config.skip_convert, Some(false));
    }

    #[test]
    fn empty_has_all_none() {
        let config = AppConfig::empty();
        assert!(config.api_url.is_none());
        assert!(config.duration.is_none());
        assert!(config.video_device.is_none());
        assert!(config.skip_convert.is_none());
    }

    #[test]
    fn merge_other_takes_precedence() {
        let base = AppConfig {
            api_url: Some("http://base".to_string()),
            duration: Some("10s".to_string()),
            ..Default::default()
        };
        let other = AppConfig {
            api_url: Some("http://other".to_string()),
            duration: None, // Should not override
            skip_convert: Some(true),
            ..Default::default()
        };

        let merged = base.merge(other);
        assert_eq!(merged.api_url, Some("http://other".to_string()));
        assert_eq!(merged.duration, Some("10s".to_string()));
        assert_eq!(merged.skip_convert, Some(true));
    }

    #[test]
    fn duration_or_default_parses() {
        let config = AppConfig {
            duration: Some("15s".to_string()),
            ..Default::default()
        };
        assert_eq!(config.duration_or_default().as_secs(), 15);
    }

    #[test]
    fn duration_or_default_clamps_to_ceiling() {
        let config = AppConfig {
            duration: Some("2m".to_string()),
            ..Default::default()
        };
        assert_eq!(config.duration_or_default().as_secs(), 30);
    }

    #[test]
    fn duration_or_default_uses_ceiling_on_invalid() {
        let config = AppConfig {
            duration: Some("invalid".to_string()),
            ..Default::default()
        };
        assert_eq!(config.duration_or_default().as_secs(), 30);
    }

    #[test]
    fn accessor_defaults() {
        let config = AppConfig::empty();
        assert_eq!(config.api_url_or_default(), DEFAULT_API_URL);
        assert_eq!(config.video_device_or_default(), "/dev/video0");
        assert_eq!(config.audio_device_or_default(), "default");
        assert!(!config.skip_convert_or_default());
    }
}
