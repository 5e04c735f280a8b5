use axum::extract::FromRef;
use parking_lot::Mutex;
use std::sync::Arc;
use sysinfo::System;

use crate::auth::JwtManager;
use crate::database::DbPool;
use crate::services::AssistantService;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub assistant: Arc<AssistantService>,
    pub jwt_manager: Arc<JwtManager>,
    /// None when no database url is configured
    pub db_pool: Option<DbPool>,
    /// System info for the readiness endpoint
    pub system: Arc<Mutex<System>>,
}

impl FromRef<AppState> for Arc<AssistantService> {
    fn from_ref(state: &AppState) -> Self {
        state.assistant.clone()
    }
}

impl FromRef<AppState> for Arc<JwtManager> {
    fn from_ref(state: &AppState) -> Self {
        state.jwt_manager.clone()
    }
}
