// src/state.rs

use std::sync::Arc;

use axum::extract::FromRef;

use crate::config::Config;
use crate::session::registry::SessionRegistry;
use crate::store::ProgressStore;

#[derive(Clone)]
pub struct AppState {
    /// Durable persistence gateway. In-memory session state is never
    /// authoritative until the corresponding call through here has resolved.
    pub store: Arc<dyn ProgressStore>,
    pub sessions: SessionRegistry,
    pub config: Config,
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

impl FromRef<AppState> for SessionRegistry {
    fn from_ref(state: &AppState) -> Self {
        state.sessions.clone()
    }
}
