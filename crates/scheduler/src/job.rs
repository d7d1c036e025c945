use chrono::{DateTime, Utc};
use thiserror::Error;

/// One unit of work handed from the scheduler to the dispatcher.
///
/// The payload carries everything the dispatcher needs to perform the
/// attempt, so no further reads are required between snapshot and dispatch.
#[derive(Debug, Clone)]
pub struct Job<P> {
    /// Identifier unique within one snapshot.
    pub id: String,
    /// Earliest instant the job may run; `None` means immediately.
    pub scheduled_for: Option<DateTime<Utc>>,
    /// Retries already performed on this job.
    pub retry_count: u32,
    /// Instant of the most recent attempt, if any.
    pub last_attempted_at: Option<DateTime<Utc>>,
    /// Domain payload.
    pub payload: P,
}

/// Outcome reported by a dispatcher for one attempt.
#[derive(Debug, Clone)]
pub struct Attempt {
    /// Status the job should take, or `None` to use the scheduler's
    /// configured success status.
    pub status: Option<String>,
    /// Provider-assigned message id, when one was reported.
    pub provider_message_id: Option<String>,
}

impl Attempt {
    /// A plain successful delivery; the scheduler applies its configured
    /// success status.
    #[must_use]
    pub fn delivered(provider_message_id: Option<String>) -> Self {
        Self {
            status: None,
            provider_message_id,
        }
    }

    /// A handled failure (or any explicit status override).
    #[must_use]
    pub fn with_status(status: impl Into<String>) -> Self {
        Self {
            status: Some(status.into()),
            provider_message_id: None,
        }
    }
}

/// The bookkeeping the source must persist after an attempt.
#[derive(Debug, Clone)]
pub struct JobUpdate {
    pub status: String,
    pub provider_message_id: Option<String>,
    pub retry_count: u32,
    pub last_attempted_at: DateTime<Utc>,
}

/// Errors from the pending source.
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("pending scan failed: {0}")]
    Scan(String),

    #[error("apply failed: {0}")]
    Apply(String),
}

/// A failed dispatch attempt; the scheduler applies its failure status.
#[derive(Debug, Error)]
#[error("dispatch failed: {0}")]
pub struct DispatchError(pub String);
