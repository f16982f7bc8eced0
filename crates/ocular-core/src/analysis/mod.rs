//! Analysis module.
//!
//! Sends an eye image to a remote multimodal model and parses its
//! structured screening result.

pub mod gemini;
pub mod model;
pub mod prompt;

use async_trait::async_trait;

use crate::error::AnalysisError;
use crate::image::ImagePayload;

pub use gemini::GeminiClient;
pub use model::{AnalysisResult, BoundingBox, DifferentialDiagnosis, InvariantViolation, Symptom};

/// Something that can turn an image into an analysis result.
///
/// Each call issues at most one upstream request and never retries.
#[async_trait]
pub trait Analyzer: Send + Sync {
    async fn analyze(&self, image: &ImagePayload) -> Result<AnalysisResult, AnalysisError>;
}
