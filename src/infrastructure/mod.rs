//! Infrastructure layer - External system adapters

pub mod config;
pub mod device;
pub mod recording;
pub mod submission;
pub mod transcode;

pub use config::XdgConfigStore;
pub use device::FfmpegCamera;
pub use recording::FfmpegVideoRecorder;
pub use submission::HttpReportSubmitter;
pub use transcode::FfmpegTranscodeChannel;
