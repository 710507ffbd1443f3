//! CLI argument definitions using Clap

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// MindMirror - record a short video check-in and get an AI wellness report
#[derive(Parser, Debug)]
#[command(name = "mindmirror")]
#[command(version)]
#[command(about = "Record a short video check-in and submit it for AI analysis")]
#[command(long_about = None)]
pub struct Cli {
    /// Recording duration (e.g., 10s, 30s; capped at 30s)
    #[arg(short = 'd', long, value_name = "TIME")]
    pub duration: Option<String>,

    /// Submit an existing MP4 file instead of recording
    #[arg(short = 'u', long, value_name = "FILE")]
    pub upload: Option<PathBuf>,

    /// Free-text reflection to submit alongside the video
    #[arg(short = 'r', long, value_name = "TEXT")]
    pub reflection: Option<String>,

    /// Skip video conversion and submit the native recording format
    #[arg(long)]
    pub skip_convert: bool,

    /// Grant camera and microphone consent without prompting
    #[arg(short = 'y', long)]
    pub yes: bool,

    /// Analysis API endpoint
    #[arg(long, value_name = "URL", env = "MINDMIRROR_API_URL")]
    pub api_url: Option<String>,

    /// Video capture device (e.g., /dev/video0)
    #[arg(long, value_name = "DEVICE")]
    pub video_device: Option<String>,

    /// Audio capture device (e.g., default, hw:1)
    #[arg(long, value_name = "DEVICE")]
    pub audio_device: Option<String>,

    /// Config subcommand
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config action subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Create config file with defaults
    Init,
    /// Set a config value
    Set {
        /// Config key
        key: String,
        /// Config value
        value: String,
    },
    /// Get a config value
    Get {
        /// Config key
        key: String,
    },
    /// List all config values
    List,
    /// Show config file path
    Path,
}

/// Valid config keys
pub const VALID_CONFIG_KEYS: &[&str] = &[
    "api_url",
    "duration",
    "video_device",
    "audio_device",
    "skip_convert",
];

/// Check if a config key is valid
pub fn is_valid_config_key(key: &str) -> bool {
    VALID_CONFIG_KEYS.contains(&key)
}
