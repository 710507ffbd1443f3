//! Domain layer - Core business logic
//!
//! Contains value objects, entities, and domain errors.
//! This layer has no dependencies on external systems.

pub mod config;
pub mod error;
pub mod flow;
pub mod recording;
pub mod video;

// Re-export common types
pub use config::AppConfig;
pub use error::*;
pub use flow::{CaptureFlow, FlowState};
pub use recording::{Duration, RecordingSession, RecordingState};
pub use video::{ArtifactOrigin, VideoArtifact, VideoMimeType};
