//! Session module.
//!
//! Drives one user through upload, analysis, result or error, and reset.
//! Transitions are computed by [`SessionState::transition`]; this module owns
//! the current state, runs the single in-flight analysis and publishes
//! updates to subscribers.

pub mod state;
pub mod ticker;

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::analysis::{AnalysisResult, Analyzer};
use crate::error::{SessionError, TransitionError};
use crate::image::{ImageMime, ImagePayload};

pub use state::{AttemptId, Preview, SessionEvent, SessionState, SessionStatus, FAILURE_MESSAGE};
pub use ticker::StatusTicker;

const UPDATE_CHANNEL_CAPACITY: usize = 64;

/// Preview metadata exposed to the UI.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewInfo {
    pub id: Uuid,
    pub mime_type: ImageMime,
}

/// Serializable view of the session.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub status: SessionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_message: Option<String>,
    pub preview: Option<PreviewInfo>,
    pub result: Option<AnalysisResult>,
    /// Broken domain invariants in `result`. Advisory only.
    pub warnings: Vec<String>,
    pub error: Option<String>,
    pub taken_at: DateTime<Utc>,
}

impl SessionSnapshot {
    pub fn from_state(state: &SessionState) -> Self {
        let status_message = match state {
            SessionState::Loading { started_at, .. } => {
                Some(ticker::message_at(started_at.elapsed()).to_string())
            }
            _ => None,
        };
        let result = state.result().cloned();
        let warnings: Vec<String> = result
            .as_ref()
            .map(|r| r.violations().iter().map(ToString::to_string).collect())
            .unwrap_or_default();

        Self {
            status: state.status(),
            status_message,
            preview: state.preview().map(|p| PreviewInfo {
                id: p.id(),
                mime_type: p.mime(),
            }),
            result,
            warnings,
            error: state.error_message().map(str::to_string),
            taken_at: Utc::now(),
        }
    }
}

/// Messages pushed to subscribers.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum SessionUpdate {
    Changed(SessionSnapshot),
    Status { message: String },
}

/// Aborts the wrapped task when dropped.
struct AbortOnDrop(JoinHandle<()>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

struct Slot {
    state: SessionState,
    last_attempt: AttemptId,
}

struct Inner {
    analyzer: Arc<dyn Analyzer>,
    slot: Mutex<Slot>,
    updates: broadcast::Sender<SessionUpdate>,
    ticker: StatusTicker,
}

/// Handle to a single analysis session. Clones share the same session.
#[derive(Clone)]
pub struct Session {
    inner: Arc<Inner>,
}

impl Session {
    pub fn new(analyzer: Arc<dyn Analyzer>) -> Self {
        Self::with_ticker(analyzer, StatusTicker::default())
    }

    pub fn with_ticker(analyzer: Arc<dyn Analyzer>, ticker: StatusTicker) -> Self {
        let (updates, _rx) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                analyzer,
                slot: Mutex::new(Slot {
                    state: SessionState::Idle,
                    last_attempt: 0,
                }),
                updates,
                ticker,
            }),
        }
    }

    /// Receive every state change and loading status tick from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionUpdate> {
        self.inner.updates.subscribe()
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        let slot = self.inner.slot.lock().await;
        SessionSnapshot::from_state(&slot.state)
    }

    /// The retained preview, if `id` is still the current one.
    pub async fn preview(&self, id: Uuid) -> Option<Preview> {
        let slot = self.inner.slot.lock().await;
        slot.state.preview().filter(|p| p.id() == id).cloned()
    }

    /// Accept an upload and start analyzing it in the background.
    ///
    /// Only accepted from idle, so at most one analysis is ever in flight.
    /// Returns the attempt id and the loading snapshot taken when the upload
    /// was accepted.
    pub async fn upload(
        &self,
        image: ImagePayload,
    ) -> Result<(AttemptId, SessionSnapshot), SessionError> {
        let (attempt, snapshot) = {
            let mut slot = self.inner.slot.lock().await;
            let attempt = slot.last_attempt + 1;
            let next = slot.state.transition(SessionEvent::Upload {
                attempt,
                preview: Preview::from_payload(&image),
                started_at: Instant::now(),
            })?;
            slot.state = next;
            slot.last_attempt = attempt;
            (attempt, SessionSnapshot::from_state(&slot.state))
        };

        info!(attempt, mime_type = %image.mime(), size = image.len(), "Analysis started");
        self.publish(SessionUpdate::Changed(snapshot.clone()));

        let session = self.clone();
        tokio::spawn(async move { session.run_attempt(attempt, image).await });

        Ok((attempt, snapshot))
    }

    /// Discard the result or error and the preview.
    pub async fn reset(&self) -> Result<SessionSnapshot, SessionError> {
        let snapshot = self.apply(SessionEvent::Reset).await?;
        info!("Session reset");
        Ok(snapshot)
    }

    async fn run_attempt(&self, attempt: AttemptId, image: ImagePayload) {
        let updates = self.inner.updates.clone();
        let ticker = AbortOnDrop(tokio::spawn(self.inner.ticker.run(move |message| {
            let _ = updates.send(SessionUpdate::Status {
                message: message.to_string(),
            });
        })));

        // A panicking analyzer must still settle the attempt
        let analyzer = Arc::clone(&self.inner.analyzer);
        let outcome = tokio::spawn(async move { analyzer.analyze(&image).await })
            .await
            .unwrap_or_else(|e| Err(e.into()));
        drop(ticker);

        match &outcome {
            Ok(result) => {
                let violations = result.violations();
                if !violations.is_empty() {
                    warn!(
                        attempt,
                        count = violations.len(),
                        first = %violations[0],
                        "Analysis result breaks domain invariants"
                    );
                }
            }
            Err(e) => error!(attempt, kind = e.kind(), error = %e, "Analysis attempt failed"),
        }

        match self.apply(SessionEvent::Completed { attempt, outcome }).await {
            Ok(snapshot) => info!(attempt, status = snapshot.status.as_str(), "Analysis settled"),
            Err(e @ TransitionError::StaleCompletion { .. }) => {
                debug!(attempt, reason = %e, "Ignoring completion");
            }
            Err(e) => warn!(attempt, reason = %e, "Completion rejected"),
        }
    }

    async fn apply(&self, event: SessionEvent) -> Result<SessionSnapshot, TransitionError> {
        let snapshot = {
            let mut slot = self.inner.slot.lock().await;
            let next = slot.state.transition(event)?;
            slot.state = next;
            SessionSnapshot::from_state(&slot.state)
        };
        self.publish(SessionUpdate::Changed(snapshot.clone()));
        Ok(snapshot)
    }

    fn publish(&self, update: SessionUpdate) {
        let _ = self.inner.updates.send(update);
    }
}
