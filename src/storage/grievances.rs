//! Grievance queries that talk to the store directly.
//!
//! Only [`insert`] is used by the write queue; everything else is an
//! administrative or lookup path that surfaces store errors to its caller.

use super::db::{opt_text, Database, DbError, Row, Statement, Value};
use crate::model::{
    GrievanceRecord, GrievanceStatus, GrievanceUpdate, Locale, NewGrievance, Page,
    RecentGrievance, TrackedGrievance,
};
use crate::tracking::normalize_tracking_code;

const INSERT_SQL: &str = r#"
    INSERT INTO grievances (
        tracking_code, complainant_name, complainant_email, complainant_phone,
        is_anonymous, village_id, custom_location, grievance_type, description,
        incident_date, preferred_language, status, created_at, updated_at
    ) VALUES (
        ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 'submitted',
        datetime(? / 1000, 'unixepoch'), datetime(? / 1000, 'unixepoch')
    )
"#;

const SELECT_COLUMNS: &str = "id, tracking_code, complainant_name, complainant_email, \
    complainant_phone, is_anonymous, village_id, custom_location, grievance_type, description, \
    incident_date, preferred_language, status, admin_notes, status_updated_at, created_at, updated_at";

/// Insert a grievance and return its row id.
///
/// `submitted_at_ms` is when the user submitted, which for a drained write
/// is earlier than now.
pub async fn insert(
    db: &dyn Database,
    grievance: &NewGrievance,
    submitted_at_ms: i64,
) -> Result<i64, DbError> {
    let args = vec![
        Value::Text(grievance.tracking_code.clone()),
        opt_text(grievance.complainant_name.as_deref()),
        opt_text(grievance.complainant_email.as_deref()),
        opt_text(grievance.complainant_phone.as_deref()),
        Value::Integer(i64::from(grievance.is_anonymous)),
        opt_text(grievance.village_id.as_deref()),
        opt_text(grievance.custom_location.as_deref()),
        Value::Text(grievance.grievance_type.as_str().to_string()),
        Value::Text(grievance.description.clone()),
        opt_text(grievance.incident_date.as_deref()),
        Value::Text(grievance.preferred_language.as_str().to_string()),
        Value::Integer(submitted_at_ms),
        Value::Integer(submitted_at_ms),
    ];
    let result = db.execute(Statement::new(INSERT_SQL, args)).await?;
    Ok(result.last_insert_id)
}

/// Look up a grievance by tracking code, ignoring case and surrounding space.
///
/// A grievance still waiting in the write queue is not visible here.
pub async fn find_by_tracking_code(
    db: &dyn Database,
    tracking_code: &str,
) -> Result<Option<TrackedGrievance>, DbError> {
    let result = db
        .execute(Statement::new(
            "SELECT id, tracking_code, grievance_type, status, status_updated_at, created_at, \
             is_anonymous FROM grievances WHERE tracking_code = ?",
            vec![Value::Text(normalize_tracking_code(tracking_code))],
        ))
        .await?;

    result
        .first()
        .map(|row| {
            Ok(TrackedGrievance {
                id: row.i64("id")?,
                tracking_code: row.text("tracking_code")?,
                grievance_type: row.parse("grievance_type")?,
                status: status_of(row)?,
                status_updated_at: row.opt_text("status_updated_at")?,
                created_at: row.text("created_at")?,
                is_anonymous: row.bool("is_anonymous")?,
            })
        })
        .transpose()
}

/// List grievances newest first, optionally filtered by status.
///
/// `page` is 1-based; callers clamp `page` and `limit` before calling.
pub async fn list(
    db: &dyn Database,
    status: Option<GrievanceStatus>,
    page: u32,
    limit: u32,
) -> Result<Page<GrievanceRecord>, DbError> {
    let offset = i64::from(page.saturating_sub(1)) * i64::from(limit);
    let (filter, mut args) = match status {
        Some(status) => (
            " WHERE status = ?",
            vec![Value::Text(status.as_str().to_string())],
        ),
        None => ("", Vec::new()),
    };

    let count = db
        .execute(Statement::new(
            format!("SELECT COUNT(*) AS count FROM grievances{filter}"),
            args.clone(),
        ))
        .await?
        .count("count")?;

    args.push(Value::Integer(i64::from(limit)));
    args.push(Value::Integer(offset));
    let rows = db
        .execute(Statement::new(
            format!(
                "SELECT {SELECT_COLUMNS} FROM grievances{filter} \
                 ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?"
            ),
            args,
        ))
        .await?;

    let data = rows
        .rows
        .iter()
        .map(record_from_row)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Page::new(data, count, page, limit))
}

/// Most recently submitted grievances for the dashboard.
pub async fn recent(db: &dyn Database, limit: u32) -> Result<Vec<RecentGrievance>, DbError> {
    let result = db
        .execute(Statement::new(
            "SELECT id, tracking_code, grievance_type, status, created_at FROM grievances \
             ORDER BY created_at DESC, id DESC LIMIT ?",
            vec![Value::Integer(i64::from(limit))],
        ))
        .await?;

    result
        .rows
        .iter()
        .map(|row| {
            Ok(RecentGrievance {
                id: row.i64("id")?,
                tracking_code: row.text("tracking_code")?,
                grievance_type: row.parse("grievance_type")?,
                status: status_of(row)?,
                created_at: row.text("created_at")?,
            })
        })
        .collect()
}

/// Apply an administrative update. Returns whether a row matched `id`.
///
/// Not buffered: administrators need to see a failed write.
pub async fn update(db: &dyn Database, id: i64, update: &GrievanceUpdate) -> Result<bool, DbError> {
    let mut matched = false;

    if let Some(status) = update.status {
        let result = db
            .execute(Statement::new(
                "UPDATE grievances SET status = ?, status_updated_at = datetime('now'), \
                 updated_at = datetime('now') WHERE id = ?",
                vec![Value::Text(status.as_str().to_string()), Value::Integer(id)],
            ))
            .await?;
        matched |= result.rows_affected > 0;
    }

    if let Some(notes) = &update.admin_notes {
        let result = db
            .execute(Statement::new(
                "UPDATE grievances SET admin_notes = ?, updated_at = datetime('now') WHERE id = ?",
                vec![Value::Text(notes.clone()), Value::Integer(id)],
            ))
            .await?;
        matched |= result.rows_affected > 0;
    }

    Ok(matched)
}

/// Count grievances per status.
pub async fn count_by_status(db: &dyn Database) -> Result<Vec<(GrievanceStatus, u64)>, DbError> {
    let result = db
        .execute(
            "SELECT COALESCE(status, 'submitted') AS status, COUNT(*) AS count \
             FROM grievances GROUP BY 1"
                .into(),
        )
        .await?;

    result
        .rows
        .iter()
        .map(|row| Ok((status_of(row)?, row.i64("count")?.max(0) as u64)))
        .collect()
}

fn status_of(row: &Row) -> Result<GrievanceStatus, DbError> {
    Ok(row
        .opt_text("status")?
        .map(|s| s.parse::<GrievanceStatus>())
        .transpose()
        .map_err(|e| DbError::Decode(format!("column status: {e}")))?
        .unwrap_or_default())
}

fn record_from_row(row: &Row) -> Result<GrievanceRecord, DbError> {
    Ok(GrievanceRecord {
        id: row.i64("id")?,
        tracking_code: row.text("tracking_code")?,
        complainant_name: row.opt_text("complainant_name")?,
        complainant_email: row.opt_text("complainant_email")?,
        complainant_phone: row.opt_text("complainant_phone")?,
        is_anonymous: row.bool("is_anonymous")?,
        village_id: row.opt_text("village_id")?,
        custom_location: row.opt_text("custom_location")?,
        grievance_type: row.parse("grievance_type")?,
        description: row.text("description")?,
        incident_date: row.opt_text("incident_date")?,
        preferred_language: row
            .opt_text("preferred_language")?
            .map(|s| s.parse::<Locale>())
            .transpose()
            .map_err(|e| DbError::Decode(format!("column preferred_language: {e}")))?
            .unwrap_or_default(),
        status: status_of(row)?,
        admin_notes: row.opt_text("admin_notes")?,
        status_updated_at: row.opt_text("status_updated_at")?,
        created_at: row.text("created_at")?,
        updated_at: row.text("updated_at")?,
    })
}
