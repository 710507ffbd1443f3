//! Device acquisition adapters

mod ffmpeg_camera;

pub use ffmpeg_camera::FfmpegCamera;
