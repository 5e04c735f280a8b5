//! Clinic staff assistant endpoints; the session is the token's clinic id
use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use std::sync::Arc;

use crate::auth::AuthenticatedClinic;
use crate::models::chat::{ClearResponse, ClinicChatRequest, ClinicChatResponse, HistoryResponse};
use crate::services::conversation::AssistantVariant;
use crate::services::AssistantService;
use crate::utils::error::ApiError;

pub async fn chat_handler(
    State(assistant): State<Arc<AssistantService>>,
    clinic: AuthenticatedClinic,
    payload: Result<Json<ClinicChatRequest>, JsonRejection>,
) -> Result<Json<ClinicChatResponse>, ApiError> {
    let Json(request) = payload?;
    let response = assistant.clinic_turn(&clinic.clinic_id, request).await?;
    Ok(Json(response))
}

pub async fn history_handler(
    State(assistant): State<Arc<AssistantService>>,
    clinic: AuthenticatedClinic,
) -> Json<HistoryResponse> {
    Json(assistant.history(AssistantVariant::Clinic, &clinic.clinic_id))
}

pub async fn clear_handler(
    State(assistant): State<Arc<AssistantService>>,
    clinic: AuthenticatedClinic,
) -> Json<ClearResponse> {
    Json(assistant.clear(AssistantVariant::Clinic, &clinic.clinic_id))
}
