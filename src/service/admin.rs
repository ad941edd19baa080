//! Administrative handlers: listing, status updates, dashboard stats.
//!
//! These paths talk to the store directly and surface its failures. Session
//! management is left to the deployment; each request carries the admin
//! password as a bearer token.

use axum::extract::{Query, State};
use axum::http::{header, HeaderMap};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::ApiError;
use crate::model::{GrievanceRecord, GrievanceStatus, GrievanceUpdate, RecentGrievance, Stats};
use crate::server::ServerState;
use crate::storage::db::{Database, DbError};
use crate::storage::queue::QueueStatus;
use crate::storage::{grievances, questionnaires};

/// Default page size for the grievance listing.
const DEFAULT_PAGE_SIZE: u32 = 20;

/// Largest page size a client may request.
const MAX_PAGE_SIZE: u32 = 100;

/// Grievances shown in the dashboard's recent list.
const RECENT_LIMIT: u32 = 5;

/// Reject the request unless it carries the configured admin password.
pub fn require_admin(state: &ServerState, headers: &HeaderMap) -> Result<(), ApiError> {
    let expected = state
        .admin_password
        .as_deref()
        .ok_or(ApiError::Unauthorized)?;

    let supplied = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim);

    match supplied {
        Some(token) if constant_time_eq(token.as_bytes(), expected.as_bytes()) => Ok(()),
        _ => Err(ApiError::Unauthorized),
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl ListQuery {
    /// Status filter; absent or `all` means every status.
    fn status_filter(&self) -> Result<Option<GrievanceStatus>, ApiError> {
        match self.status.as_deref().map(str::trim) {
            None | Some("") | Some("all") => Ok(None),
            Some(s) => s
                .parse::<GrievanceStatus>()
                .map(Some)
                .map_err(|e| ApiError::BadRequest(e.to_string())),
        }
    }

    fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    fn limit(&self) -> u32 {
        self.limit
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub total_pages: u64,
}

#[derive(Debug, Serialize)]
pub struct GrievanceListResponse {
    pub data: Vec<GrievanceRecord>,
    pub pagination: Pagination,
}

/// Handle `GET /api/admin/grievances`.
pub async fn handle_list_grievances(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    Query(query): Query<ListQuery>,
) -> Result<Json<GrievanceListResponse>, ApiError> {
    require_admin(&state, &headers)?;
    state.ensure_schema().await;

    let page = grievances::list(
        state.db.as_ref(),
        query.status_filter()?,
        query.page(),
        query.limit(),
    )
    .await?;

    Ok(Json(GrievanceListResponse {
        pagination: Pagination {
            page: page.page,
            limit: page.limit,
            total: page.total,
            total_pages: page.total_pages,
        },
        data: page.data,
    }))
}

#[derive(Debug, Deserialize)]
pub struct UpdateRequest {
    pub id: Option<i64>,
    #[serde(flatten)]
    pub update: GrievanceUpdate,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Handle `PATCH /api/admin/grievances`.
#[tracing::instrument(skip_all, fields(id))]
pub async fn handle_update_grievance(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    Json(body): Json<UpdateRequest>,
) -> Result<Json<SuccessResponse>, ApiError> {
    require_admin(&state, &headers)?;
    state.ensure_schema().await;

    let id = body
        .id
        .ok_or_else(|| ApiError::BadRequest("Grievance ID is required".into()))?;
    tracing::Span::current().record("id", id);

    // Nothing to change is not an error; the store is left alone.
    if body.update.is_empty() {
        return Ok(Json(SuccessResponse { success: true }));
    }

    if !grievances::update(state.db.as_ref(), id, &body.update).await? {
        return Err(ApiError::NotFound("Grievance not found"));
    }

    tracing::info!(status = ?body.update.status, "Grievance updated");
    Ok(Json(SuccessResponse { success: true }))
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub stats: Stats,
    pub recent: Vec<RecentGrievance>,
    pub queue: QueueStatus,
}

/// Dashboard counts across both tables.
pub async fn load_stats(db: &dyn Database) -> Result<Stats, DbError> {
    let mut stats = Stats::default();
    for (status, count) in grievances::count_by_status(db).await? {
        stats.add_status(status, count);
    }
    stats.questionnaires = questionnaires::count(db).await?;
    Ok(stats)
}

/// Handle `GET /api/admin/stats`.
pub async fn handle_stats(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
) -> Result<Json<StatsResponse>, ApiError> {
    require_admin(&state, &headers)?;
    state.ensure_schema().await;

    let stats = load_stats(state.db.as_ref()).await?;
    let recent = grievances::recent(state.db.as_ref(), RECENT_LIMIT).await?;

    Ok(Json(StatsResponse {
        stats,
        recent,
        queue: state.queue.status(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    pub password: String,
}

/// Handle `POST /api/admin/verify`: check a password without a session.
pub async fn handle_verify(
    State(state): State<Arc<ServerState>>,
    Json(body): Json<VerifyRequest>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let expected = state
        .admin_password
        .as_deref()
        .ok_or(ApiError::AdminDisabled)?;

    if constant_time_eq(body.password.as_bytes(), expected.as_bytes()) {
        Ok(Json(SuccessResponse { success: true }))
    } else {
        tracing::warn!("Failed admin verification");
        Err(ApiError::Unauthorized)
    }
}

#[derive(Debug, Serialize)]
pub struct CheckResponse {
    pub authenticated: bool,
}

/// Handle `GET /api/admin/verify`: report whether the bearer token is valid.
pub async fn handle_check(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
) -> Json<CheckResponse> {
    Json(CheckResponse {
        authenticated: require_admin(&state, &headers).is_ok(),
    })
}
