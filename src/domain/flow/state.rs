//! Capture flow state machine

use std::fmt;
use thiserror::Error;

/// Capture flow states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FlowState {
    #[default]
    AwaitingConsent,
    Capturing,
    ReviewingArtifact,
    Confirmed,
}

impl FlowState {
    /// Get the string representation
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::AwaitingConsent => "awaiting-consent",
            Self::Capturing => "capturing",
            Self::ReviewingArtifact => "reviewing",
            Self::Confirmed => "confirmed",
        }
    }
}

impl fmt::Display for FlowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error when an invalid flow transition is attempted
#[derive(Debug, Clone, Error)]
#[error("Cannot {action} while in {current_state} state")]
pub struct InvalidFlowTransition {
    pub current_state: FlowState,
    pub action: &'static str,
}

/// Capture flow entity.
/// Sequences consent, capture, review, and confirmation.
///
/// State machine:
///   AWAITING_CONSENT -> CAPTURING         (give_consent)
///   CAPTURING        -> AWAITING_CONSENT  (go_back)
///   CAPTURING        -> REVIEWING         (present_artifact)
///   REVIEWING        -> CAPTURING         (retake)
///   REVIEWING        -> CONFIRMED         (confirm)
///   CONFIRMED        -> REVIEWING         (reopen, after a failed hand-off)
#[derive(Debug, Default)]
pub struct CaptureFlow {
    state: FlowState,
}

impl CaptureFlow {
    /// Create a new flow awaiting consent
    pub fn new() -> Self {
        Self {
            state: FlowState::AwaitingConsent,
        }
    }

    /// Get the current state
    pub fn state(&self) -> FlowState {
        self.state
    }

    pub fn is_capturing(&self) -> bool {
        self.state == FlowState::Capturing
    }

    pub fn is_reviewing(&self) -> bool {
        self.state == FlowState::ReviewingArtifact
    }

    pub fn is_confirmed(&self) -> bool {
        self.state == FlowState::Confirmed
    }

    fn transition(
        &mut self,
        from: FlowState,
        to: FlowState,
        action: &'static str,
    ) -> Result<(), InvalidFlowTransition> {
        if self.state != from {
            return Err(InvalidFlowTransition {
                current_state: self.state,
                action,
            });
        }
        self.state = to;
        Ok(())
    }

    /// User granted consent; capture controls become available
    pub fn give_consent(&mut self) -> Result<(), InvalidFlowTransition> {
        self.transition(
            FlowState::AwaitingConsent,
            FlowState::Capturing,
            "give consent",
        )
    }

    /// Back navigation from capture to the consent screen
    pub fn go_back(&mut self) -> Result<(), InvalidFlowTransition> {
        self.transition(FlowState::Capturing, FlowState::AwaitingConsent, "go back")
    }

    /// A validated (and possibly converted) artifact is ready for review
    pub fn present_artifact(&mut self) -> Result<(), InvalidFlowTransition> {
        self.transition(
            FlowState::Capturing,
            FlowState::ReviewingArtifact,
            "present an artifact",
        )
    }

    /// Discard the reviewed artifact and capture again
    pub fn retake(&mut self) -> Result<(), InvalidFlowTransition> {
        self.transition(FlowState::ReviewingArtifact, FlowState::Capturing, "retake")
    }

    /// User confirmed the reviewed artifact
    pub fn confirm(&mut self) -> Result<(), InvalidFlowTransition> {
        self.transition(
            FlowState::ReviewingArtifact,
            FlowState::Confirmed,
            "confirm",
        )
    }

    /// Return to review after the hand-off failed, so the user can retry
    pub fn reopen(&mut self) -> Result<(), InvalidFlowTransition> {
        self.transition(
            FlowState::Confirmed,
            FlowState::ReviewingArtifact,
            "reopen the review",
        )
    }
}
