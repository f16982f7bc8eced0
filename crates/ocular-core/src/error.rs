//! Centralized error types for Ocular.

use thiserror::Error;

/// Failure of a single analysis call.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid image: {0}")]
    InvalidImage(String),

    #[error("Transport error{}: {message}", status_suffix(.status))]
    Transport { status: Option<u16>, message: String },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// The analysis task ended without producing an outcome.
    #[error("Internal error: {0}")]
    Internal(String),
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" (HTTP {})", s)).unwrap_or_default()
}

impl AnalysisError {
    /// Create a configuration error.
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create a malformed response error.
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedResponse(msg.into())
    }

    /// Create a transport error without an HTTP status (connection failures).
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport {
            status: None,
            message: msg.into(),
        }
    }

    /// Stable short label used in log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "configuration",
            Self::InvalidImage(_) => "invalid_image",
            Self::Transport { .. } => "transport",
            Self::MalformedResponse(_) => "malformed_response",
            Self::Internal(_) => "internal",
        }
    }
}

impl From<tokio::task::JoinError> for AnalysisError {
    fn from(err: tokio::task::JoinError) -> Self {
        if err.is_panic() {
            Self::Internal("analysis task panicked".to_string())
        } else {
            Self::Internal("analysis task was cancelled".to_string())
        }
    }
}

impl From<reqwest::Error> for AnalysisError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport {
            status: err.status().map(|s| s.as_u16()),
            message: err.to_string(),
        }
    }
}

/// A session event that is not allowed in the current state.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransitionError {
    #[error("An analysis is already in progress")]
    Busy,

    #[error("Cannot upload from '{0}': reset the session first")]
    NotIdle(&'static str),

    #[error("Cannot reset while an analysis is in progress")]
    ResetWhileLoading,

    #[error("Completion received while '{0}'")]
    UnexpectedCompletion(&'static str),

    #[error("Completion for attempt {got} ignored, attempt {current} is in flight")]
    StaleCompletion { current: u64, got: u64 },
}

/// Errors surfaced by the session driver.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SessionError {
    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error(transparent)]
    Analysis(#[from] AnalysisError),
}
