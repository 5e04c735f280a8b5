//! Patient-facing assistant endpoints (anonymous, keyed by `sessionId`)
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use std::sync::Arc;

use crate::models::chat::{ClearResponse, HistoryResponse, PatientChatRequest, PatientChatResponse};
use crate::services::conversation::AssistantVariant;
use crate::services::AssistantService;
use crate::utils::error::ApiError;

pub async fn message_handler(
    State(assistant): State<Arc<AssistantService>>,
    payload: Result<Json<PatientChatRequest>, JsonRejection>,
) -> Result<Json<PatientChatResponse>, ApiError> {
    let Json(request) = payload?;
    let response = assistant.patient_turn(request).await?;
    Ok(Json(response))
}

pub async fn history_handler(
    State(assistant): State<Arc<AssistantService>>,
    Path(session_id): Path<String>,
) -> Json<HistoryResponse> {
    Json(assistant.history(AssistantVariant::Patient, &session_id))
}

pub async fn clear_handler(
    State(assistant): State<Arc<AssistantService>>,
    Path(session_id): Path<String>,
) -> Json<ClearResponse> {
    Json(assistant.clear(AssistantVariant::Patient, &session_id))
}
