//! Capture flow domain module

mod state;

pub use state::{CaptureFlow, FlowState, InvalidFlowTransition};
