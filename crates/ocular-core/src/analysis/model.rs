//! Analysis result models.
//!
//! Field names on the wire are camelCase and must match the response schema
//! sent to the model. Parsing is strict: every field is required and unknown
//! fields are rejected.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Primary diagnosis reported for a healthy eye.
pub const HEALTHY_DIAGNOSIS: &str = "None";

/// Treatment reported for a healthy eye.
pub const HEALTHY_TREATMENT: &str = "N/A";

/// Confidence reported for a healthy eye.
pub const HEALTHY_CONFIDENCE: f64 = 100.0;

/// Structured screening outcome for one image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AnalysisResult {
    pub is_healthy: bool,
    pub primary_diagnosis: String,
    pub summary: String,
    pub symptoms: Vec<Symptom>,
    pub differential_diagnoses: Vec<DifferentialDiagnosis>,
    pub possible_symptoms: Vec<String>,
    pub treatment: String,
    pub confidence_score: f64,
    pub next_steps: String,
}

/// A finding visible in the image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Symptom {
    pub name: String,
    pub description: String,
    pub anatomical_layer: String,
    pub bounding_box: BoundingBox,
}

/// Rectangle in percent of the image size, origin at the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// An alternative, lower-likelihood diagnosis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DifferentialDiagnosis {
    pub name: String,
    pub reasoning: String,
}

/// A domain rule the upstream service broke.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InvariantViolation {
    #[error("confidence score {0} is outside 0-100")]
    ConfidenceOutOfRange(f64),

    #[error("healthy result lists symptoms")]
    HealthyWithSymptoms,

    #[error("healthy result lists possible symptoms")]
    HealthyWithPossibleSymptoms,

    #[error("healthy result lists differential diagnoses")]
    HealthyWithDifferentials,

    #[error("healthy result has primary diagnosis '{0}'")]
    HealthyDiagnosisNotNone(String),

    #[error("healthy result has treatment '{0}'")]
    HealthyTreatmentNotNa(String),

    #[error("healthy result has confidence {0} instead of 100")]
    HealthyConfidenceNot100(f64),

    #[error("next steps are empty")]
    EmptyNextSteps,

    /// `symptom` is zero-based; messages number symptoms from one.
    #[error("symptom #{} bounding box {field} = {value} is outside 0-100", .symptom + 1)]
    BoundingBoxOutOfRange {
        symptom: usize,
        field: &'static str,
        value: f64,
    },
}

fn is_percentage(value: f64) -> bool {
    value.is_finite() && (0.0..=100.0).contains(&value)
}

impl BoundingBox {
    /// Coordinates paired with their field names.
    pub fn fields(&self) -> [(&'static str, f64); 4] {
        [
            ("x", self.x),
            ("y", self.y),
            ("width", self.width),
            ("height", self.height),
        ]
    }

    pub fn is_within_bounds(&self) -> bool {
        self.fields().iter().all(|(_, v)| is_percentage(*v))
    }
}

impl AnalysisResult {
    /// Parse the model's structured output.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Check the domain invariants. An empty list means the result is valid.
    pub fn violations(&self) -> Vec<InvariantViolation> {
        let mut found = Vec::new();

        if !is_percentage(self.confidence_score) {
            found.push(InvariantViolation::ConfidenceOutOfRange(self.confidence_score));
        }

        for (index, symptom) in self.symptoms.iter().enumerate() {
            for (field, value) in symptom.bounding_box.fields() {
                if !is_percentage(value) {
                    found.push(InvariantViolation::BoundingBoxOutOfRange {
                        symptom: index,
                        field,
                        value,
                    });
                }
            }
        }

        if self.next_steps.trim().is_empty() {
            found.push(InvariantViolation::EmptyNextSteps);
        }

        if self.is_healthy {
            if !self.symptoms.is_empty() {
                found.push(InvariantViolation::HealthyWithSymptoms);
            }
            if !self.possible_symptoms.is_empty() {
                found.push(InvariantViolation::HealthyWithPossibleSymptoms);
            }
            if !self.differential_diagnoses.is_empty() {
                found.push(InvariantViolation::HealthyWithDifferentials);
            }
            if self.primary_diagnosis != HEALTHY_DIAGNOSIS {
                found.push(InvariantViolation::HealthyDiagnosisNotNone(
                    self.primary_diagnosis.clone(),
                ));
            }
            if self.treatment != HEALTHY_TREATMENT {
                found.push(InvariantViolation::HealthyTreatmentNotNa(self.treatment.clone()));
            }
            if self.confidence_score != HEALTHY_CONFIDENCE {
                found.push(InvariantViolation::HealthyConfidenceNot100(self.confidence_score));
            }
        }

        found
    }

    pub fn is_valid(&self) -> bool {
        self.violations().is_empty()
    }
}
