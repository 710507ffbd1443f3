//! Port interfaces (traits) for external systems
//!
//! These traits define the boundaries between the application
//! and infrastructure layers.

pub mod config;
pub mod device;
pub mod recorder;
pub mod submitter;
pub mod worker;

// Re-export common types
pub use config::ConfigStore;
pub use device::{CaptureConstraints, DeviceError, MediaDevice, MediaSession};
pub use recorder::{RecorderError, TickCallback, VideoRecorder};
pub use submitter::{ReportReceipt, ReportSubmitter, SubmitError};
pub use worker::{ConvertRequest, TranscodeWorker, WorkerChannelError, WorkerEvent};
