use std::fmt;

use crate::status::JobStatus;

/// Backend-assigned job identifier, opaque to the client.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct JobId(String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for JobId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// UI projection of one conversion job.
///
/// Timestamps are epoch milliseconds so the core stays clock-library free;
/// the client converts wire timestamps at the boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub id: JobId,
    pub url: String,
    pub status: JobStatus,
    /// 0..=100. Falls back to the status strategy default when the backend
    /// reports none.
    pub progress: u8,
    pub result: Option<String>,
    pub error: Option<String>,
    pub created_at_ms: u64,
    pub completed_at_ms: Option<u64>,
}
