//! Video domain module

mod artifact;

pub use artifact::{ArtifactOrigin, VideoArtifact, VideoMimeType, MAX_ARTIFACT_BYTES};
