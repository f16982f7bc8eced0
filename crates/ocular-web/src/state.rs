//! Application state.

use ocular_core::Session;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub session: Session,
}

impl AppState {
    pub fn new(session: Session) -> Self {
        Self { session }
    }
}
