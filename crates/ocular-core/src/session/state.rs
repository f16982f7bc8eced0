//! Session states and the pure transition function.

use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::analysis::AnalysisResult;
use crate::error::{AnalysisError, TransitionError};
use crate::image::{ImageMime, ImagePayload};

/// Monotonic id of an accepted upload.
pub type AttemptId = u64;

/// The only failure text users see; details go to the logs.
pub const FAILURE_MESSAGE: &str = "Failed to analyze the image. The AI model may be overloaded \
or the image could not be processed. Please try again.";

/// Displayable copy of the uploaded image.
#[derive(Debug, Clone)]
pub struct Preview {
    id: Uuid,
    mime: ImageMime,
    data: Arc<[u8]>,
}

impl Preview {
    pub fn from_payload(image: &ImagePayload) -> Self {
        Self {
            id: Uuid::new_v4(),
            mime: image.mime(),
            data: image.shared_bytes(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn mime(&self) -> ImageMime {
        self.mime
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data
    }
}

/// Coarse status label exposed to the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Idle,
    Loading,
    Succeeded,
    Failed,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Loading => "loading",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        }
    }
}

/// Where the session is in the upload, analyze, show, reset cycle.
#[derive(Debug, Clone, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Loading {
        attempt: AttemptId,
        preview: Preview,
        started_at: Instant,
    },
    Succeeded {
        preview: Preview,
        result: Arc<AnalysisResult>,
    },
    Failed {
        preview: Preview,
        message: String,
    },
}

/// Inputs to [`SessionState::transition`].
#[derive(Debug, Clone)]
pub enum SessionEvent {
    Upload {
        attempt: AttemptId,
        preview: Preview,
        started_at: Instant,
    },
    Completed {
        attempt: AttemptId,
        outcome: Result<AnalysisResult, AnalysisError>,
    },
    Reset,
}

impl SessionState {
    pub fn status(&self) -> SessionStatus {
        match self {
            Self::Idle => SessionStatus::Idle,
            Self::Loading { .. } => SessionStatus::Loading,
            Self::Succeeded { .. } => SessionStatus::Succeeded,
            Self::Failed { .. } => SessionStatus::Failed,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading { .. })
    }

    pub fn preview(&self) -> Option<&Preview> {
        match self {
            Self::Idle => None,
            Self::Loading { preview, .. }
            | Self::Succeeded { preview, .. }
            | Self::Failed { preview, .. } => Some(preview),
        }
    }

    pub fn result(&self) -> Option<&AnalysisResult> {
        match self {
            Self::Succeeded { result, .. } => Some(result.as_ref()),
            _ => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Failed { message, .. } => Some(message.as_str()),
            _ => None,
        }
    }

    /// Compute the next state. Rejected events leave `self` untouched.
    pub fn transition(&self, event: SessionEvent) -> Result<SessionState, TransitionError> {
        match (self, event) {
            (
                Self::Idle,
                SessionEvent::Upload {
                    attempt,
                    preview,
                    started_at,
                },
            ) => Ok(Self::Loading {
                attempt,
                preview,
                started_at,
            }),
            (Self::Loading { .. }, SessionEvent::Upload { .. }) => Err(TransitionError::Busy),
            (other, SessionEvent::Upload { .. }) => {
                Err(TransitionError::NotIdle(other.status().as_str()))
            }

            (
                Self::Loading {
                    attempt: current,
                    preview,
                    ..
                },
                SessionEvent::Completed { attempt, outcome },
            ) => {
                if attempt != *current {
                    return Err(TransitionError::StaleCompletion {
                        current: *current,
                        got: attempt,
                    });
                }
                Ok(match outcome {
                    Ok(result) => Self::Succeeded {
                        preview: preview.clone(),
                        result: Arc::new(result),
                    },
                    Err(_) => Self::Failed {
                        preview: preview.clone(),
                        message: FAILURE_MESSAGE.to_string(),
                    },
                })
            }
            (other, SessionEvent::Completed { .. }) => {
                Err(TransitionError::UnexpectedCompletion(other.status().as_str()))
            }

            (Self::Loading { .. }, SessionEvent::Reset) => Err(TransitionError::ResetWhileLoading),
            (_, SessionEvent::Reset) => Ok(Self::Idle),
        }
    }
}
