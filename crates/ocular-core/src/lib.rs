//! Ocular Core Library
//!
//! Eye image screening: the remote analysis client, its result model and the
//! session state machine that drives a UI through one analysis at a time.

pub mod analysis;
pub mod config;
pub mod error;
pub mod image;
pub mod session;

pub use analysis::{AnalysisResult, Analyzer, GeminiClient};
pub use config::ClientConfig;
pub use error::{AnalysisError, SessionError, TransitionError};
pub use image::{ImageMime, ImagePayload};
pub use session::{Session, SessionSnapshot, SessionStatus, SessionUpdate};
