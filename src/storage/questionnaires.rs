//! Questionnaire response storage.
//!
//! Responses are stored as opaque JSON text; the survey shape evolves on
//! its own.

use super::db::{Database, DbError, Statement, Value};
use crate::model::QuestionnaireRecord;

/// Insert a response and return its row id.
pub async fn insert(
    db: &dyn Database,
    response: &serde_json::Value,
    submitted_at_ms: i64,
) -> Result<i64, DbError> {
    let result = db
        .execute(Statement::new(
            "INSERT INTO questionnaire_responses (response_data, submitted_at) \
             VALUES (?, datetime(? / 1000, 'unixepoch'))",
            vec![
                Value::Text(response.to_string()),
                Value::Integer(submitted_at_ms),
            ],
        ))
        .await?;
    Ok(result.last_insert_id)
}

/// All responses, newest first.
pub async fn list(db: &dyn Database) -> Result<Vec<QuestionnaireRecord>, DbError> {
    let result = db
        .execute(
            "SELECT id, response_data, submitted_at FROM questionnaire_responses \
             ORDER BY submitted_at DESC, id DESC"
                .into(),
        )
        .await?;

    result
        .rows
        .iter()
        .map(|row| {
            let raw = row.text("response_data")?;
            let response_data = serde_json::from_str(&raw)
                .map_err(|e| DbError::Decode(format!("column response_data: {e}")))?;
            Ok(QuestionnaireRecord {
                id: row.i64("id")?,
                response_data,
                submitted_at: row.text("submitted_at")?,
            })
        })
        .collect()
}

/// Number of stored responses.
pub async fn count(db: &dyn Database) -> Result<u64, DbError> {
    db.execute("SELECT COUNT(*) AS count FROM questionnaire_responses".into())
        .await?
        .count("count")
}
