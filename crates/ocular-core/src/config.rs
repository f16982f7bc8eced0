//! Analysis client configuration.
//!
//! Values come from the process environment. The CLI layers its own flags on
//! top and loads `.env` files before calling [`ClientConfig::from_env`].

use std::time::Duration;

/// Default Gemini REST endpoint.
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com";

/// Default multimodal model.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Primary credential variable.
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Legacy credential variable, checked when `GEMINI_API_KEY` is unset.
pub const LEGACY_API_KEY_ENV: &str = "API_KEY";

pub const MODEL_ENV: &str = "OCULAR_MODEL";
pub const API_BASE_ENV: &str = "OCULAR_API_BASE";
pub const TIMEOUT_ENV: &str = "OCULAR_TIMEOUT_SECS";

/// Settings for [`crate::analysis::GeminiClient`].
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Service credential. Absence is only detected when analyzing.
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    /// Request timeout. `None` leaves the transport default in place.
    pub timeout: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_API_BASE.to_string(),
            timeout: None,
        }
    }
}

impl ClientConfig {
    /// Build a config from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_blank = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let api_key = non_blank(API_KEY_ENV).or_else(|| non_blank(LEGACY_API_KEY_ENV));
        let model = non_blank(MODEL_ENV).unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let base_url = non_blank(API_BASE_ENV).unwrap_or_else(|| DEFAULT_API_BASE.to_string());
        let timeout = non_blank(TIMEOUT_ENV)
            .and_then(|v| v.trim().parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs);

        Self {
            api_key,
            model,
            base_url: normalize_base_url(&base_url),
            timeout,
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = normalize_base_url(base_url);
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Whether a usable credential is configured.
    pub fn has_api_key(&self) -> bool {
        self.api_key
            .as_deref()
            .is_some_and(|key| !key.trim().is_empty())
    }
}

fn normalize_base_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}
