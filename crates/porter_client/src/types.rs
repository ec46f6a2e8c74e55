use std::fmt;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use porter_core::{default_progress, Job, JobId, JobStatus, UnknownStatus};

/// Server-assigned batch identifier, opaque to the client.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BatchId(String);

impl BatchId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One job as the backend serializes it.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSnapshot {
    pub id: String,
    pub url: String,
    pub status: String,
    pub progress: Option<u8>,
    pub result: Option<String>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl JobSnapshot {
    /// Converts the wire snapshot into the core projection. A status name
    /// outside the known set is rejected, not coerced.
    pub fn into_job(self) -> Result<Job, UnknownStatus> {
        let status: JobStatus = self.status.parse()?;
        let progress = self
            .progress
            .unwrap_or_else(|| default_progress(status))
            .min(100);
        Ok(Job {
            id: JobId::new(self.id),
            url: self.url,
            status,
            progress,
            result: self.result,
            error: self.error,
            created_at_ms: self.created_at.timestamp_millis().max(0) as u64,
            completed_at_ms: self
                .completed_at
                .map(|at| at.timestamp_millis().max(0) as u64),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    #[error("http status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("network error: {0}")]
    Network(String),
    #[error("request timed out")]
    Timeout,
    #[error("response decode failed: {0}")]
    Decode(String),
    #[error(transparent)]
    UnknownStatus(#[from] UnknownStatus),
    #[error("invalid base url `{0}`")]
    InvalidBaseUrl(String),
}

impl ApiError {
    /// Whether a repeat of the same request might succeed on its own.
    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::Status { status, .. } => *status >= 500,
            ApiError::Network(_) | ApiError::Timeout => true,
            ApiError::Decode(_) | ApiError::UnknownStatus(_) | ApiError::InvalidBaseUrl(_) => {
                false
            }
        }
    }
}

/// Notifications from the job service back to the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceEvent {
    /// Fresh snapshot of one job, from a submit, a poll, or an action.
    JobUpdated { job: Job },
    /// Full listing from a refresh.
    JobsListed { jobs: Vec<Job> },
    /// Settled notifications fire exactly once per watched job.
    JobCompleted { job: Job },
    JobFailed { job: Job },
    JobCancelled { job: Job },
    /// A request failed past the retry budget; `context` names the call.
    RequestFailed { context: String, error: String },
}
