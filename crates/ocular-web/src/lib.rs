//! Ocular Web Server
//!
//! Axum-based web server hosting the screening page and its JSON API.

pub mod routes;
pub mod state;
pub mod websocket;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use ocular_core::Session;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use state::AppState;

/// Default cap on upload request bodies.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

/// Listener and limits for [`run_server`].
#[derive(Debug, Clone)]
pub struct ServerOptions {
    pub host: String,
    pub port: u16,
    pub max_upload_bytes: usize,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3040,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

/// Create the application router.
pub fn create_router(state: AppState, max_upload_bytes: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        .route("/session", get(routes::session::get_session))
        .route("/analyze", post(routes::session::analyze))
        .route("/reset", post(routes::session::reset))
        .route("/preview/{id}", get(routes::session::preview))
        .with_state(state.clone());

    Router::new()
        .route("/", get(routes::page::index))
        .route("/health", get(routes::page::health))
        .nest("/api", api_routes)
        .route("/ws", get(websocket::ws_handler))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Run the web server.
pub async fn run_server(session: Session, options: ServerOptions) -> anyhow::Result<()> {
    let state = AppState::new(session);
    let app = create_router(state, options.max_upload_bytes);

    let addr = format!("{}:{}", options.host, options.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Web server listening on http://{}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use ocular_core::{AnalysisError, AnalysisResult, Analyzer, ImagePayload};
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt;

    const HEALTHY_JSON: &str = r#"{
        "isHealthy": true, "primaryDiagnosis": "None", "summary": "Clear eye.",
        "symptoms": [], "differentialDiagnoses": [], "possibleSymptoms": [],
        "treatment": "N/A", "confidenceScore": 100,
        "nextSteps": "See an ophthalmologist for routine check-ups."
    }"#;

    const BOUNDARY: &str = "ocular-test-boundary";

    struct SlowAnalyzer {
        delay: Duration,
    }

    #[async_trait]
    impl Analyzer for SlowAnalyzer {
        async fn analyze(&self, _image: &ImagePayload) -> Result<AnalysisResult, AnalysisError> {
            tokio::time::sleep(self.delay).await;
            Ok(AnalysisResult::from_json(HEALTHY_JSON).unwrap())
        }
    }

    fn app(delay: Duration) -> (Router, Session) {
        let session = Session::new(Arc::new(SlowAnalyzer { delay }));
        let router = create_router(AppState::new(session.clone()), DEFAULT_MAX_UPLOAD_BYTES);
        (router, session)
    }

    fn multipart(field: &str, content_type: &str, data: &[u8]) -> Request<Body> {
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"eye.png\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        Request::post("/api/analyze")
            .header(
                "content-type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn json(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn wait_for(session: &Session, status: ocular_core::SessionStatus) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while session.snapshot().await.status != status {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("session never reached expected status");
    }

    #[tokio::test]
    async fn test_initial_session_is_idle() {
        let (router, _) = app(Duration::ZERO);
        let response = router
            .oneshot(Request::get("/api/session").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json(response).await;
        assert_eq!(body["status"], "idle");
        assert!(body["result"].is_null());
    }

    #[tokio::test]
    async fn test_upload_then_conflict_while_loading() {
        let (router, session) = app(Duration::from_millis(200));

        let response = router
            .clone()
            .oneshot(multipart("image", "image/png", b"\x89PNG"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        let body = json(response).await;
        assert_eq!(body["attempt"], 1);
        assert_eq!(body["snapshot"]["status"], "loading");
        assert_eq!(body["snapshot"]["preview"]["mimeType"], "image/png");

        let response = router
            .clone()
            .oneshot(multipart("image", "image/png", b"\x89PNG"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let response = router
            .clone()
            .oneshot(Request::post("/api/reset").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        wait_for(&session, ocular_core::SessionStatus::Succeeded).await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_accepted_upload_reports_loading_even_when_analysis_is_instant() {
        let (router, session) = app(Duration::ZERO);

        for attempt in 1..=20u64 {
            let response = router
                .clone()
                .oneshot(multipart("image", "image/png", b"\x89PNG"))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::ACCEPTED);
            let body = json(response).await;
            assert_eq!(body["attempt"], attempt);
            assert_eq!(body["snapshot"]["status"], "loading");
            assert!(body["snapshot"]["result"].is_null());

            wait_for(&session, ocular_core::SessionStatus::Succeeded).await;
            session.reset().await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_preview_is_served_until_reset() {
        let (router, session) = app(Duration::ZERO);

        let response = router
            .clone()
            .oneshot(multipart("image", "image/jpeg", b"\xff\xd8\xff"))
            .await
            .unwrap();
        let body = json(response).await;
        let id = body["snapshot"]["preview"]["id"].as_str().unwrap().to_string();
        wait_for(&session, ocular_core::SessionStatus::Succeeded).await;

        let uri = format!("/api/preview/{}", id);
        let response = router
            .clone()
            .oneshot(Request::get(uri.as_str()).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["content-type"], "image/jpeg");
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"\xff\xd8\xff");

        let response = router
            .clone()
            .oneshot(Request::post("/api/reset").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json(response).await["status"], "idle");

        let response = router
            .oneshot(Request::get(uri.as_str()).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_invalid_uploads_are_bad_requests() {
        let (router, session) = app(Duration::ZERO);

        let response = router
            .clone()
            .oneshot(multipart("image", "application/pdf", b"%PDF"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = router
            .oneshot(multipart("file", "image/png", b"\x89PNG"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        assert_eq!(session.snapshot().await.status, ocular_core::SessionStatus::Idle);
    }
}
