//! Porter client: job API transport and the polling service.
mod api;
mod poll;
mod service;
mod types;

pub use api::{ApiSettings, Auth, HttpJobApi, JobApi};
pub use poll::PollSettings;
pub use service::JobServiceHandle;
pub use types::{ApiError, BatchId, JobSnapshot, ServiceEvent};
