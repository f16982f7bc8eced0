//! Session route handlers.

use axum::{
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use ocular_core::session::AttemptId;
use ocular_core::{ImagePayload, SessionError, SessionSnapshot};
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::state::AppState;

/// Multipart field carrying the uploaded image.
pub const IMAGE_FIELD: &str = "image";

#[derive(Serialize)]
pub struct AnalyzeResponse {
    pub attempt: AttemptId,
    pub snapshot: SessionSnapshot,
}

fn session_error(err: SessionError) -> (StatusCode, String) {
    let status = match &err {
        SessionError::Transition(_) => StatusCode::CONFLICT,
        SessionError::Analysis(_) => StatusCode::BAD_REQUEST,
    };
    (status, err.to_string())
}

/// GET /api/session
pub async fn get_session(State(state): State<AppState>) -> Json<SessionSnapshot> {
    Json(state.session.snapshot().await)
}

/// POST /api/analyze - multipart upload with an `image` file field.
pub async fn analyze(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<AnalyzeResponse>), (StatusCode, String)> {
    let mut image = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| (e.status(), e.body_text()))?
    {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }
        let mime = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| (e.status(), e.body_text()))?;
        debug!(mime_type = %mime, size = data.len(), "Received upload");

        image = Some(ImagePayload::new(data.to_vec(), &mime).map_err(|e| session_error(e.into()))?);
        break;
    }

    let image = image.ok_or_else(|| {
        (
            StatusCode::BAD_REQUEST,
            format!("Missing '{}' file field", IMAGE_FIELD),
        )
    })?;

    let (attempt, snapshot) = state.session.upload(image).await.map_err(session_error)?;

    Ok((StatusCode::ACCEPTED, Json(AnalyzeResponse { attempt, snapshot })))
}

/// POST /api/reset
pub async fn reset(
    State(state): State<AppState>,
) -> Result<Json<SessionSnapshot>, (StatusCode, String)> {
    let snapshot = state.session.reset().await.map_err(session_error)?;
    Ok(Json(snapshot))
}

/// GET /api/preview/{id} - image bytes while the preview is retained.
pub async fn preview(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let preview = state
        .session
        .preview(id)
        .await
        .ok_or_else(|| (StatusCode::NOT_FOUND, "Preview not found".to_string()))?;

    Ok((
        [
            (header::CONTENT_TYPE, preview.mime().as_str()),
            (header::CACHE_CONTROL, "no-store"),
        ],
        preview.bytes().to_vec(),
    ))
}
