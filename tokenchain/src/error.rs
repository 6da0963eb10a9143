//! Error types for the call chain.
//!
//! Every error is terminal for the action that raised it only. A response that
//! arrives fine but lacks the expected field is not an error; see
//! [`crate::orchestrator::CallOutcome::Degraded`].

use crate::session::Step;
use thiserror::Error;

/// Result alias used throughout the crate.
pub type FlowResult<T> = Result<T, FlowError>;

/// A step that must have completed before another may run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prerequisite {
    /// No access token is stored; authenticate first.
    AccessToken,
    /// No identifier is stored; submit the profile first.
    Identifier,
}

impl Prerequisite {
    /// The step that produces this prerequisite.
    pub fn producer(&self) -> Step {
        match self {
            Prerequisite::AccessToken => Step::Authenticate,
            Prerequisite::Identifier => Step::SubmitProfile,
        }
    }
}

impl std::fmt::Display for Prerequisite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Prerequisite::AccessToken => write!(f, "access token"),
            Prerequisite::Identifier => write!(f, "identifier"),
        }
    }
}

/// Network failure, non-success status, or an unparseable body.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("{step} failed{}: {reason}", .status.map(|s| format!(" with status {}", s)).unwrap_or_default())]
pub struct TransportError {
    pub step: Step,
    /// HTTP status when a response was received.
    pub status: Option<u16>,
    /// Raw response body when one was received.
    pub body: Option<String>,
    pub reason: String,
}

impl TransportError {
    pub fn network(step: Step, reason: impl Into<String>) -> Self {
        Self {
            step,
            status: None,
            body: None,
            reason: reason.into(),
        }
    }

    pub fn status(step: Step, status: u16, body: String) -> Self {
        Self {
            step,
            status: Some(status),
            body: Some(body),
            reason: "non-success status".to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum FlowError {
    #[error("{step}: missing required input ({})", .missing.join(", "))]
    Validation { step: Step, missing: Vec<String> },

    #[error("{step}: no {prerequisite} available, run {} first", .prerequisite.producer())]
    Gating {
        step: Step,
        prerequisite: Prerequisite,
    },

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("{0} is already running")]
    Busy(Step),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl FlowError {
    /// The step this error was raised for, when it belongs to one.
    pub fn step(&self) -> Option<Step> {
        match self {
            FlowError::Validation { step, .. } | FlowError::Gating { step, .. } => Some(*step),
            FlowError::Transport(e) => Some(e.step),
            FlowError::Busy(step) => Some(*step),
            FlowError::Config(_) => None,
        }
    }
}

impl From<std::io::Error> for FlowError {
    fn from(e: std::io::Error) -> Self {
        FlowError::Config(e.to_string())
    }
}

impl From<toml::de::Error> for FlowError {
    fn from(e: toml::de::Error) -> Self {
        FlowError::Config(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gating_message_names_the_producing_step() {
        let err = FlowError::Gating {
            step: Step::Onboard,
            prerequisite: Prerequisite::Identifier,
        };
        assert_eq!(
            err.to_string(),
            "Onboard: no identifier available, run Submit profile first"
        );
        assert_eq!(err.step(), Some(Step::Onboard));
    }

    #[test]
    fn transport_message_includes_status_when_known() {
        let err = TransportError::status(Step::Authenticate, 401, "{}".into());
        assert_eq!(
            err.to_string(),
            "Authenticate failed with status 401: non-success status"
        );

        let err = TransportError::network(Step::Authenticate, "connection refused");
        assert_eq!(err.to_string(), "Authenticate failed: connection refused");
    }

    #[test]
    fn validation_message_lists_fields() {
        let err = FlowError::Validation {
            step: Step::SubmitProfile,
            missing: vec!["username".into(), "email".into()],
        };
        assert_eq!(
            err.to_string(),
            "Submit profile: missing required input (username, email)"
        );
    }
}
