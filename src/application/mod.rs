//! Application layer - Use cases and port interfaces

pub mod capture;
pub mod convert;
pub mod ports;

pub use capture::{CaptureFlowConfig, CaptureFlowUseCase, FlowError};
pub use convert::{
    ConversionFailure, ConvertProgress, TranscodeOrchestrator, CONVERT_TIMEOUT_SECS,
};
