//! Gemini `generateContent` client for eye image screening.
//!
//! Encodes the image, sends it with the screening prompt and the response
//! schema, and parses the structured reply into an `AnalysisResult`.

use std::time::Instant;

use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::model::AnalysisResult;
use super::prompt::{response_schema, SCREENING_PROMPT};
use super::Analyzer;
use crate::config::ClientConfig;
use crate::error::AnalysisError;
use crate::image::ImagePayload;

/// Client for the Gemini multimodal API.
#[derive(Clone)]
pub struct GeminiClient {
    config: ClientConfig,
    client: reqwest::Client,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part {
    Text { text: String },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: String,
    response_schema: serde_json::Value,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

impl GeminiClient {
    /// Create a new client from configuration.
    pub fn new(config: ClientConfig) -> Self {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        Self {
            config,
            client: builder.build().unwrap_or_default(),
        }
    }

    /// Create a client from the process environment.
    pub fn from_env() -> Self {
        Self::new(ClientConfig::from_env())
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url, self.config.model
        )
    }

    async fn generate(&self, image: &ImagePayload) -> Result<AnalysisResult, AnalysisError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                AnalysisError::configuration(
                    "GEMINI_API_KEY environment variable is not set. \
                     Set it with: export GEMINI_API_KEY=your-key",
                )
            })?;

        let request = build_request(image);

        debug!(
            model = %self.config.model,
            mime_type = %image.mime(),
            size = image.len(),
            "Calling Gemini generateContent"
        );
        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AnalysisError::Transport {
                status: Some(status.as_u16()),
                message: format!("Gemini API error: {}", body.trim()),
            });
        }

        let body = response.text().await?;
        parse_response(&body)
    }
}

#[async_trait]
impl Analyzer for GeminiClient {
    async fn analyze(&self, image: &ImagePayload) -> Result<AnalysisResult, AnalysisError> {
        let started = Instant::now();
        let outcome = self.generate(image).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match &outcome {
            Ok(result) => info!(
                elapsed_ms,
                healthy = result.is_healthy,
                symptoms = result.symptoms.len(),
                "Analysis completed"
            ),
            Err(e) => warn!(elapsed_ms, kind = e.kind(), error = %e, "Analysis failed"),
        }
        outcome
    }
}

fn build_request(image: &ImagePayload) -> GenerateContentRequest {
    let data = base64::engine::general_purpose::STANDARD.encode(image.bytes());

    GenerateContentRequest {
        contents: vec![Content {
            parts: vec![
                Part::Text {
                    text: SCREENING_PROMPT.to_string(),
                },
                Part::InlineData {
                    inline_data: InlineData {
                        mime_type: image.mime().as_str().to_string(),
                        data,
                    },
                },
            ],
        }],
        generation_config: GenerationConfig {
            response_mime_type: "application/json".to_string(),
            response_schema: response_schema(),
        },
    }
}

/// Extract the structured payload from a generateContent response body.
fn parse_response(body: &str) -> Result<AnalysisResult, AnalysisError> {
    let envelope: GenerateContentResponse = serde_json::from_str(body)
        .map_err(|e| AnalysisError::malformed(format!("invalid response envelope: {}", e)))?;

    let candidate = envelope
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| AnalysisError::malformed("response contains no candidates"))?;

    let text: String = candidate
        .content
        .map(|c| c.parts)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|p| p.text)
        .collect();
    let text = text.trim();

    if text.is_empty() {
        let reason = candidate.finish_reason.unwrap_or_else(|| "unknown".to_string());
        return Err(AnalysisError::malformed(format!(
            "candidate has no text (finish reason: {})",
            reason
        )));
    }

    AnalysisResult::from_json(text)
        .map_err(|e| AnalysisError::malformed(format!("result does not match schema: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::model::tests::{CONJUNCTIVITIS_JSON, HEALTHY_JSON};
    use axum::{extract::State, http::HeaderMap, http::StatusCode, routing::post, Json, Router};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    fn envelope(text: &str) -> String {
        serde_json::json!({
            "candidates": [{
                "content": { "parts": [{ "text": text }], "role": "model" },
                "finishReason": "STOP"
            }],
            "modelVersion": "gemini-2.5-flash"
        })
        .to_string()
    }

    fn png() -> ImagePayload {
        ImagePayload::new(vec![0x89u8, b'P', b'N', b'G', 0x0d, 0x0a], "image/png").unwrap()
    }

    #[derive(Clone)]
    struct Stub {
        status: StatusCode,
        body: String,
        hits: Arc<AtomicUsize>,
        last_request: Arc<Mutex<Option<(HeaderMap, serde_json::Value)>>>,
    }

    async fn stub_handler(
        State(stub): State<Stub>,
        headers: HeaderMap,
        Json(body): Json<serde_json::Value>,
    ) -> (StatusCode, String) {
        stub.hits.fetch_add(1, Ordering::SeqCst);
        *stub.last_request.lock().unwrap() = Some((headers, body));
        (stub.status, stub.body.clone())
    }

    /// Serve a fixed reply on an ephemeral port and return a client aimed at it.
    async fn stub_server(status: StatusCode, body: String) -> (GeminiClient, Stub) {
        let stub = Stub {
            status,
            body,
            hits: Arc::new(AtomicUsize::new(0)),
            last_request: Arc::new(Mutex::new(None)),
        };
        let app = Router::new()
            .route("/v1beta/models/{action}", post(stub_handler))
            .with_state(stub.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let config = ClientConfig::default()
            .with_api_key("test-key")
            .with_base_url(&format!("http://{}", addr));
        (GeminiClient::new(config), stub)
    }

    #[test]
    fn test_request_shape() {
        let request = serde_json::to_value(build_request(&png())).unwrap();

        let parts = request["contents"][0]["parts"].as_array().unwrap();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0]["text"], SCREENING_PROMPT);
        assert_eq!(parts[1]["inlineData"]["mimeType"], "image/png");
        assert_eq!(parts[1]["inlineData"]["data"], "iVBORw0K");
        assert_eq!(
            request["generationConfig"]["responseMimeType"],
            "application/json"
        );
        assert_eq!(request["generationConfig"]["responseSchema"], response_schema());
    }

    #[test]
    fn test_parse_response_joins_text_parts() {
        let (head, tail) = CONJUNCTIVITIS_JSON.split_at(40);
        let body = serde_json::json!({
            "candidates": [{ "content": { "parts": [{ "text": head }, { "text": tail }] } }]
        })
        .to_string();
        let result = parse_response(&body).unwrap();
        assert_eq!(result.primary_diagnosis, "Conjunctivitis");
    }

    #[test]
    fn test_parse_response_without_candidates() {
        let err = parse_response(r#"{"promptFeedback": {"blockReason": "SAFETY"}}"#).unwrap_err();
        assert!(matches!(err, AnalysisError::MalformedResponse(ref m) if m.contains("no candidates")));
    }

    #[test]
    fn test_parse_response_with_empty_text_reports_finish_reason() {
        let body = r#"{"candidates": [{"finishReason": "SAFETY"}]}"#;
        let err = parse_response(body).unwrap_err();
        assert!(matches!(err, AnalysisError::MalformedResponse(ref m) if m.contains("SAFETY")));
    }

    #[test]
    fn test_parse_response_rejects_non_json_text() {
        let err = parse_response(&envelope("The eye looks fine to me.")).unwrap_err();
        assert!(matches!(err, AnalysisError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn test_missing_api_key_fails_before_any_request() {
        let (client, stub) = stub_server(StatusCode::OK, envelope(HEALTHY_JSON)).await;
        let mut config = client.config().clone();
        config.api_key = None;
        let client = GeminiClient::new(config);

        let err = client.analyze(&png()).await.unwrap_err();
        assert!(matches!(err, AnalysisError::Configuration(_)));
        assert_eq!(stub.hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_successful_analysis() {
        let (client, stub) = stub_server(StatusCode::OK, envelope(CONJUNCTIVITIS_JSON)).await;

        let result = client.analyze(&png()).await.unwrap();

        assert_eq!(stub.hits.load(Ordering::SeqCst), 1);
        assert_eq!(result.symptoms.len(), 2);
        assert_eq!(result.symptoms[0].name, "Redness");
        assert_eq!(result.symptoms[1].name, "Discharge");
        assert_eq!(result.differential_diagnoses[0].name, "Episcleritis");

        let (headers, body) = stub.last_request.lock().unwrap().take().unwrap();
        assert_eq!(headers["x-goog-api-key"], "test-key");
        assert_eq!(body["contents"][0]["parts"][1]["inlineData"]["mimeType"], "image/png");
    }

    #[tokio::test]
    async fn test_missing_field_is_malformed() {
        let mut value: serde_json::Value = serde_json::from_str(HEALTHY_JSON).unwrap();
        value.as_object_mut().unwrap().remove("nextSteps");
        let (client, _stub) = stub_server(StatusCode::OK, envelope(&value.to_string())).await;

        let err = client.analyze(&png()).await.unwrap_err();
        assert!(matches!(err, AnalysisError::MalformedResponse(ref m) if m.contains("nextSteps")));
    }

    #[tokio::test]
    async fn test_error_status_is_transport() {
        let (client, stub) = stub_server(
            StatusCode::SERVICE_UNAVAILABLE,
            r#"{"error": {"message": "The model is overloaded."}}"#.to_string(),
        )
        .await;

        let err = client.analyze(&png()).await.unwrap_err();
        match err {
            AnalysisError::Transport { status, message } => {
                assert_eq!(status, Some(503));
                assert!(message.contains("overloaded"));
            }
            other => panic!("expected transport error, got {:?}", other),
        }
        assert_eq!(stub.hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unreachable_service_is_transport() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let config = ClientConfig::default()
            .with_api_key("test-key")
            .with_base_url(&format!("http://{}", addr));
        let err = GeminiClient::new(config).analyze(&png()).await.unwrap_err();
        assert!(matches!(err, AnalysisError::Transport { status: None, .. }));
    }
}
