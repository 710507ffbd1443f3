//! Transcode worker adapters

mod ffmpeg_worker;

pub use ffmpeg_worker::FfmpegTranscodeChannel;
