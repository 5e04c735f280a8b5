use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use tracing::warn;

use crate::services::conversation::StoreStats;
use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    status: String,
    version: String,
}

/// Host-wide memory, reported once per readiness check
#[derive(Serialize)]
pub struct MemoryStats {
    usage_mb: u64,
    total_mb: u64,
    usage_percent: f64,
}

#[derive(Serialize)]
pub struct ReadinessResponse {
    status: &'static str,
    llm_configured: bool,
    database: &'static str,
    memory: MemoryStats,
    sessions: Vec<StoreStats>,
}

pub async fn health_check() -> (StatusCode, Json<HealthResponse>) {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "healthy".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }),
    )
}

fn memory_stats(state: &AppState) -> MemoryStats {
    let mut sys = state.system.lock();
    sys.refresh_memory();

    let total = sys.total_memory().max(1);
    MemoryStats {
        usage_mb: sys.used_memory() / 1024 / 1024,
        total_mb: sys.total_memory() / 1024 / 1024,
        usage_percent: (sys.used_memory() as f64 / total as f64) * 100.0,
    }
}

/// Not ready only when a configured database cannot be reached
pub async fn readiness_check(State(state): State<AppState>) -> (StatusCode, Json<ReadinessResponse>) {
    let database = match &state.db_pool {
        None => "not_configured",
        Some(pool) => match sqlx::query("SELECT 1").execute(pool.get_pool()).await {
            Ok(_) => "connected",
            Err(e) => {
                warn!("Readiness database check failed: {}", e);
                "unreachable"
            }
        },
    };

    let ready = database != "unreachable";
    let status = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };

    (
        status,
        Json(ReadinessResponse {
            status: if ready { "ready" } else { "not_ready" },
            llm_configured: state.assistant.is_llm_configured(),
            database,
            memory: memory_stats(&state),
            sessions: state.assistant.stats(),
        }),
    )
}
