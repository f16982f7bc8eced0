//! Page route handlers.
//!
//! Serves the embedded single-page UI.

use axum::response::{Html, IntoResponse};

const INDEX_HTML: &str = include_str!("../../../../assets/web/index.html");

/// GET / - Serve the upload and result page.
pub async fn index() -> impl IntoResponse {
    Html(INDEX_HTML)
}

/// GET /health
pub async fn health() -> &'static str {
    "ok"
}
