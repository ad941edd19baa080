//! Questionnaire submission handlers.

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::Serialize;
use std::sync::Arc;

use super::admin::require_admin;
use super::ApiError;
use crate::model::QuestionnaireRecord;
use crate::server::ServerState;
use crate::storage::questionnaires;

#[derive(Debug, Serialize)]
pub struct SubmitQuestionnaireResponse {
    pub success: bool,
    pub queued: bool,
}

/// Handle `POST /api/questionnaire`. The body is stored as-is.
#[tracing::instrument(skip_all)]
pub async fn handle_submit(
    State(state): State<Arc<ServerState>>,
    Json(body): Json<serde_json::Value>,
) -> Result<Json<SubmitQuestionnaireResponse>, ApiError> {
    state.ensure_schema().await;

    let outcome = state.queue.submit_questionnaire(body).await?;
    Ok(Json(SubmitQuestionnaireResponse {
        success: true,
        queued: outcome.queued,
    }))
}

#[derive(Debug, Serialize)]
pub struct QuestionnaireListResponse {
    pub data: Vec<QuestionnaireRecord>,
}

/// Handle `GET /api/questionnaire` (admin only).
pub async fn handle_list(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
) -> Result<Json<QuestionnaireListResponse>, ApiError> {
    require_admin(&state, &headers)?;
    state.ensure_schema().await;

    let data = questionnaires::list(state.db.as_ref()).await?;
    Ok(Json(QuestionnaireListResponse { data }))
}
