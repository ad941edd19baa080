//! Grievance submission and tracking handlers.

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::{non_empty, ApiError};
use crate::model::{GrievanceType, Locale, NewGrievance, TrackedGrievance};
use crate::server::ServerState;
use crate::storage::db::DbError;
use crate::storage::grievances;
use crate::storage::queue::SubmitError;
use crate::tracking::generate_tracking_code;

/// Tracking codes tried before a collision is reported as a failure.
const MAX_CODE_ATTEMPTS: u32 = 3;

/// Maximum description length (64 KiB).
const MAX_DESCRIPTION_LEN: usize = 64 * 1024;

/// Body of `POST /api/grievance`, as sent by the intake form.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrievanceSubmission {
    pub complainant_name: Option<String>,
    pub complainant_email: Option<String>,
    pub complainant_phone: Option<String>,
    #[serde(default)]
    pub is_anonymous: bool,
    pub village_id: Option<String>,
    pub custom_location: Option<String>,
    pub grievance_type: Option<String>,
    pub description: Option<String>,
    pub incident_date: Option<String>,
    pub preferred_language: Option<String>,
}

impl GrievanceSubmission {
    /// Validate the form and build the record, anonymizing if requested.
    pub fn into_grievance(self, tracking_code: String) -> Result<NewGrievance, ApiError> {
        let grievance_type = non_empty(self.grievance_type)
            .ok_or_else(|| ApiError::BadRequest("grievanceType is required".into()))?
            .parse::<GrievanceType>()
            .map_err(|e| ApiError::BadRequest(e.to_string()))?;

        let description = non_empty(self.description)
            .ok_or_else(|| ApiError::BadRequest("description is required".into()))?;
        if description.len() > MAX_DESCRIPTION_LEN {
            return Err(ApiError::BadRequest(format!(
                "description too long (max {MAX_DESCRIPTION_LEN} bytes)"
            )));
        }

        let preferred_language = match non_empty(self.preferred_language) {
            Some(lang) => lang
                .parse::<Locale>()
                .map_err(|e| ApiError::BadRequest(e.to_string()))?,
            None => Locale::default(),
        };

        Ok(NewGrievance {
            tracking_code,
            complainant_name: non_empty(self.complainant_name),
            complainant_email: non_empty(self.complainant_email),
            complainant_phone: non_empty(self.complainant_phone),
            is_anonymous: self.is_anonymous,
            village_id: non_empty(self.village_id),
            custom_location: non_empty(self.custom_location),
            grievance_type,
            description,
            incident_date: non_empty(self.incident_date),
            preferred_language,
        }
        .anonymized())
    }
}

/// Response to an accepted grievance.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitGrievanceResponse {
    pub success: bool,
    pub tracking_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grievance_id: Option<i64>,
    /// The grievance was buffered and is not yet visible to tracking.
    pub queued: bool,
}

/// Handle `POST /api/grievance`.
#[tracing::instrument(skip_all)]
pub async fn handle_submit(
    State(state): State<Arc<ServerState>>,
    Json(body): Json<GrievanceSubmission>,
) -> Result<Json<SubmitGrievanceResponse>, ApiError> {
    state.ensure_schema().await;

    let mut grievance = body.into_grievance(generate_tracking_code())?;
    let mut attempt = 1;
    loop {
        match state.queue.submit_grievance(grievance.clone()).await {
            Ok(outcome) => {
                tracing::debug!(queued = outcome.queued, "Grievance accepted");
                return Ok(Json(SubmitGrievanceResponse {
                    success: true,
                    tracking_code: grievance.tracking_code,
                    grievance_id: outcome.id,
                    queued: outcome.queued,
                }));
            }
            Err(SubmitError::Rejected(DbError::Constraint(e))) if attempt < MAX_CODE_ATTEMPTS => {
                tracing::warn!(error = %e, attempt, "Tracking code collision, regenerating");
                grievance.tracking_code = generate_tracking_code();
                attempt += 1;
            }
            Err(e) => return Err(e.into()),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackQuery {
    pub tracking_code: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TrackResponse {
    pub data: TrackedGrievance,
}

/// Handle `GET /api/grievance?trackingCode=...`.
pub async fn handle_track(
    State(state): State<Arc<ServerState>>,
    Query(query): Query<TrackQuery>,
) -> Result<Json<TrackResponse>, ApiError> {
    state.ensure_schema().await;

    let code = non_empty(query.tracking_code)
        .ok_or_else(|| ApiError::BadRequest("Tracking code is required".into()))?;

    grievances::find_by_tracking_code(state.db.as_ref(), &code)
        .await?
        .map(|data| Json(TrackResponse { data }))
        .ok_or(ApiError::NotFound("Grievance not found"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form() -> GrievanceSubmission {
        GrievanceSubmission {
            complainant_name: Some("Maya".into()),
            complainant_email: Some("maya@example.org".into()),
            grievance_type: Some("stalking".into()),
            description: Some("followed home".into()),
            ..GrievanceSubmission::default()
        }
    }

    #[test]
    fn test_valid_form() {
        let grievance = form().into_grievance("ABCDEFGHJKLM".into()).unwrap();
        assert_eq!(grievance.grievance_type, GrievanceType::Stalking);
        assert_eq!(grievance.preferred_language, Locale::Ar);
        assert_eq!(grievance.complainant_name.as_deref(), Some("Maya"));
    }

    #[test]
    fn test_anonymous_form_drops_identity() {
        let grievance = GrievanceSubmission {
            is_anonymous: true,
            ..form()
        }
        .into_grievance("ABCDEFGHJKLM".into())
        .unwrap();
        assert!(grievance.complainant_name.is_none());
        assert!(grievance.complainant_email.is_none());
    }

    #[test]
    fn test_rejects_missing_description_and_unknown_type() {
        let missing = GrievanceSubmission {
            description: Some("   ".into()),
            ..form()
        };
        assert!(matches!(
            missing.into_grievance("X".into()),
            Err(ApiError::BadRequest(_))
        ));

        let unknown = GrievanceSubmission {
            grievance_type: Some("burglary".into()),
            ..form()
        };
        assert!(matches!(
            unknown.into_grievance("X".into()),
            Err(ApiError::BadRequest(_))
        ));
    }

    #[test]
    fn test_camel_case_body() {
        let body: GrievanceSubmission = serde_json::from_str(
            r#"{"grievanceType":"harassment","description":"d","isAnonymous":true,"villageId":"4"}"#,
        )
        .unwrap();
        assert!(body.is_anonymous);
        assert_eq!(body.village_id.as_deref(), Some("4"));
    }
}
