//! Recording adapters

mod ffmpeg_recorder;

pub use ffmpeg_recorder::FfmpegVideoRecorder;
