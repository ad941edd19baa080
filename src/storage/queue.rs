//! In-process retry queue for user submissions.
//!
//! Every grievance and questionnaire write goes through [`WriteQueue`]:
//!
//! 1. drain whatever earlier writes are still pending
//! 2. try the new write directly
//! 3. on a retryable failure, park the write in memory and report success
//!
//! Pending writes are only retried when the next submission arrives, and are
//! lost if the process exits first. Each parked write gets a fixed number
//! of drain attempts before it is dropped with an error log.
//!
//! The pending list is a `std::sync::Mutex` that is never held across an
//! `.await`: a drain takes the whole list in one step and re-appends
//! failures one at a time, so concurrent requests never see the same entry
//! twice and never lose an entry appended mid-drain.

use serde::Serialize;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

use super::db::{Database, DbError, ErrorClass};
use super::{grievances, questionnaires};
use crate::model::NewGrievance;
use crate::observability::metrics;
use crate::{generate_operation_id, now_millis};

/// Default number of drain attempts per queued write.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Which failures are parked for retry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RetryPolicy {
    /// Park only failures classified as retryable; reject the rest.
    #[default]
    RetryableOnly,
    /// Park every failure, including constraint and query errors.
    RetryAll,
}

/// Queue tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueConfig {
    /// Drain attempts before a write is dropped.
    pub max_attempts: u32,
    pub retry_policy: RetryPolicy,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_policy: RetryPolicy::RetryableOnly,
        }
    }
}

/// The kind of write an operation performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Grievance,
    Questionnaire,
}

impl OperationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Grievance => "grievance",
            Self::Questionnaire => "questionnaire",
        }
    }
}

/// The data of a write, kept so it can be replayed.
#[derive(Debug, Clone, PartialEq)]
pub enum WritePayload {
    Grievance(NewGrievance),
    Questionnaire(serde_json::Value),
}

impl WritePayload {
    pub fn kind(&self) -> OperationKind {
        match self {
            Self::Grievance(_) => OperationKind::Grievance,
            Self::Questionnaire(_) => OperationKind::Questionnaire,
        }
    }
}

/// A write waiting for the store to come back.
#[derive(Debug, Clone, PartialEq)]
struct QueuedOperation {
    id: String,
    payload: WritePayload,
    attempts: u32,
    enqueued_at: i64,
}

/// Result of an accepted submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SubmitOutcome {
    /// Row id, when the write reached the store directly.
    pub id: Option<i64>,
    /// The write was parked for a later retry.
    pub queued: bool,
}

/// Error type for submissions.
#[derive(Debug, Clone, Error)]
pub enum SubmitError {
    /// The store refused the write for a reason retrying will not fix.
    #[error("write rejected by store: {0}")]
    Rejected(DbError),
}

/// What one drain pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DrainReport {
    pub persisted: usize,
    pub requeued: usize,
    pub dropped: usize,
}

/// Operator-facing view of one queued write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuedOperationView {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: OperationKind,
    pub attempts: u32,
    /// Unix milliseconds.
    pub created_at: i64,
}

/// Snapshot of the queue for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueStatus {
    pub queue_length: usize,
    pub operations: Vec<QueuedOperationView>,
}

/// Buffers user submissions that could not be written immediately.
pub struct WriteQueue {
    db: Arc<dyn Database>,
    config: QueueConfig,
    pending: Mutex<VecDeque<QueuedOperation>>,
}

impl WriteQueue {
    pub fn new(db: Arc<dyn Database>, config: QueueConfig) -> Self {
        Self {
            db,
            config,
            pending: Mutex::new(VecDeque::new()),
        }
    }

    /// Submit a grievance, parking it on retryable failure.
    pub async fn submit_grievance(
        &self,
        grievance: NewGrievance,
    ) -> Result<SubmitOutcome, SubmitError> {
        self.submit(WritePayload::Grievance(grievance)).await
    }

    /// Submit a questionnaire response. The row id is not reported.
    pub async fn submit_questionnaire(
        &self,
        response: serde_json::Value,
    ) -> Result<SubmitOutcome, SubmitError> {
        let outcome = self.submit(WritePayload::Questionnaire(response)).await?;
        Ok(SubmitOutcome { id: None, ..outcome })
    }

    #[tracing::instrument(skip_all, fields(kind = payload.kind().as_str()))]
    async fn submit(&self, payload: WritePayload) -> Result<SubmitOutcome, SubmitError> {
        self.drain().await;

        let kind = payload.kind();
        let submitted_at = now_millis();
        match self.write(&payload, submitted_at).await {
            Ok(id) => {
                metrics::record_write(kind.as_str(), "persisted");
                Ok(SubmitOutcome {
                    id: Some(id),
                    queued: false,
                })
            }
            Err(e) if self.should_park(&e) => {
                let operation = QueuedOperation {
                    id: generate_operation_id(kind.as_str()),
                    payload,
                    attempts: 1,
                    enqueued_at: submitted_at,
                };
                tracing::warn!(
                    operation_id = %operation.id,
                    error = %e,
                    "Direct write failed, queuing for retry"
                );
                self.push(operation);
                metrics::record_write(kind.as_str(), "queued");
                Ok(SubmitOutcome {
                    id: None,
                    queued: true,
                })
            }
            Err(e) => {
                tracing::error!(error = %e, "Write rejected by store");
                metrics::record_write(kind.as_str(), "rejected");
                Err(SubmitError::Rejected(e))
            }
        }
    }

    /// Retry every pending write once, in enqueue order.
    ///
    /// Entries that fail again go back on the live queue as they fail, so a
    /// pass never blocks on a bad entry and relative order is preserved.
    pub async fn drain(&self) -> DrainReport {
        let snapshot = std::mem::take(&mut *self.lock());
        let mut report = DrainReport::default();
        if snapshot.is_empty() {
            return report;
        }

        tracing::debug!(pending = snapshot.len(), "Draining write queue");
        for mut operation in snapshot {
            let kind = operation.payload.kind().as_str();
            match self.write(&operation.payload, operation.enqueued_at).await {
                Ok(id) => {
                    tracing::info!(
                        operation_id = %operation.id,
                        row_id = id,
                        "Queued write persisted"
                    );
                    metrics::record_drain(kind, "persisted");
                    report.persisted += 1;
                }
                Err(e) if self.should_park(&e) && operation.attempts < self.config.max_attempts => {
                    operation.attempts += 1;
                    tracing::warn!(
                        operation_id = %operation.id,
                        attempts = operation.attempts,
                        error = %e,
                        "Queued write failed, requeued"
                    );
                    metrics::record_drain(kind, "requeued");
                    report.requeued += 1;
                    self.push(operation);
                }
                Err(e) => {
                    tracing::error!(
                        operation_id = %operation.id,
                        attempts = operation.attempts,
                        error = %e,
                        "Queued write dropped"
                    );
                    metrics::record_drain(kind, "dropped");
                    report.dropped += 1;
                }
            }
        }

        metrics::set_queue_depth(self.len());
        report
    }

    /// Snapshot of pending writes for operators.
    pub fn status(&self) -> QueueStatus {
        let pending = self.lock();
        QueueStatus {
            queue_length: pending.len(),
            operations: pending
                .iter()
                .map(|op| QueuedOperationView {
                    id: op.id.clone(),
                    kind: op.payload.kind(),
                    attempts: op.attempts,
                    created_at: op.enqueued_at,
                })
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    async fn write(&self, payload: &WritePayload, submitted_at: i64) -> Result<i64, DbError> {
        match payload {
            WritePayload::Grievance(grievance) => {
                grievances::insert(self.db.as_ref(), grievance, submitted_at).await
            }
            WritePayload::Questionnaire(response) => {
                questionnaires::insert(self.db.as_ref(), response, submitted_at).await
            }
        }
    }

    fn should_park(&self, error: &DbError) -> bool {
        match self.config.retry_policy {
            RetryPolicy::RetryAll => true,
            RetryPolicy::RetryableOnly => error.class() == ErrorClass::Retryable,
        }
    }

    fn push(&self, operation: QueuedOperation) {
        let depth = {
            let mut pending = self.lock();
            pending.push_back(operation);
            pending.len()
        };
        metrics::set_queue_depth(depth);
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<QueuedOperation>> {
        // A panic elsewhere cannot leave the deque half-mutated.
        self.pending
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}
