//! HTTP handlers for Refuge.
//!
//! All bodies are JSON. Public endpoints accept submissions and tracking
//! lookups; admin endpoints require `Authorization: Bearer <password>`.

pub mod admin;
pub mod grievance;
pub mod questionnaire;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;

use crate::server::ServerState;
use crate::storage::db::DbError;
use crate::storage::queue::SubmitError;

/// Build the API router.
pub fn router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route(
            "/api/grievance",
            post(grievance::handle_submit).get(grievance::handle_track),
        )
        .route(
            "/api/questionnaire",
            post(questionnaire::handle_submit).get(questionnaire::handle_list),
        )
        .route(
            "/api/admin/grievances",
            get(admin::handle_list_grievances).patch(admin::handle_update_grievance),
        )
        .route("/api/admin/stats", get(admin::handle_stats))
        .route(
            "/api/admin/verify",
            post(admin::handle_verify).get(admin::handle_check),
        )
        .route("/health", get(|| async { "OK" }))
        .with_state(state)
}

/// Error type for HTTP handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("{0}")]
    NotFound(&'static str),

    #[error("Admin password not configured")]
    AdminDisabled,

    #[error("database error: {0}")]
    Database(#[from] DbError),

    #[error(transparent)]
    Submit(#[from] SubmitError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::Unauthorized => (StatusCode::UNAUTHORIZED, self.to_string()),
            Self::NotFound(what) => (StatusCode::NOT_FOUND, (*what).to_string()),
            Self::AdminDisabled => (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()),
            Self::Database(e) if e.is_retryable() => {
                tracing::warn!(error = %e, "Store unavailable");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "Service temporarily unavailable".to_string(),
                )
            }
            Self::Database(e) => {
                tracing::error!(error = %e, "Store error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            Self::Submit(e) => {
                tracing::error!(error = %e, "Submission rejected");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to save submission".to_string(),
                )
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// Treat blank strings from form fields as absent.
pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_empty() {
        assert_eq!(non_empty(Some("  ".into())), None);
        assert_eq!(non_empty(Some(" 12 ".into())), Some("12".into()));
        assert_eq!(non_empty(None), None);
    }

    #[test]
    fn test_error_status_codes() {
        let cases = [
            (ApiError::BadRequest("x".into()), StatusCode::BAD_REQUEST),
            (ApiError::Unauthorized, StatusCode::UNAUTHORIZED),
            (ApiError::NotFound("Grievance not found"), StatusCode::NOT_FOUND),
            (
                ApiError::Database(DbError::Unavailable("down".into())),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                ApiError::Database(DbError::Query("bad".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }
}
