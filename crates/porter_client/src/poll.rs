use std::sync::mpsc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use porter_core::{is_terminal, Job, JobId, JobStatus};
use porter_logging::{porter_debug, porter_warn};

use crate::api::JobApi;
use crate::types::ServiceEvent;

/// Timing knobs for the per-job poll loop.
#[derive(Debug, Clone)]
pub struct PollSettings {
    /// Delay between status requests for one job.
    pub interval: Duration,
    /// Total watch time before the loop gives up on a job.
    pub ceiling: Duration,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            ceiling: Duration::from_secs(300),
        }
    }
}

/// Polls one job until it settles, the ceiling passes, or the token fires.
///
/// Interim snapshots go straight to `events`. The settled event is returned
/// instead of sent so the caller can gate delivery on registry ownership,
/// which is what keeps settled notifications exactly-once under races.
pub(crate) async fn poll_job(
    api: &dyn JobApi,
    id: JobId,
    settings: &PollSettings,
    token: &CancellationToken,
    events: &mpsc::Sender<ServiceEvent>,
) -> Option<ServiceEvent> {
    let deadline = tokio::time::Instant::now() + settings.ceiling;
    let mut interval = tokio::time::interval(settings.interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately; consume it so the first request
    // lands one full interval after submission.
    interval.tick().await;

    loop {
        tokio::select! {
            _ = token.cancelled() => return None,
            _ = interval.tick() => {}
        }
        if tokio::time::Instant::now() >= deadline {
            porter_warn!(
                "job {id}: no terminal status after {:?}, giving up",
                settings.ceiling
            );
            return None;
        }

        match api.get_job(&id).await {
            Ok(job) => {
                // A cancel may have landed while the request was in flight;
                // its confirmed snapshot must be the last word.
                if token.is_cancelled() {
                    return None;
                }
                porter_debug!("job {id}: status {}", job.status);
                let settled = is_terminal(job.status);
                let _ = events.send(ServiceEvent::JobUpdated { job: job.clone() });
                if settled {
                    return Some(settled_event(job));
                }
            }
            Err(err) if err.is_retryable() => {
                porter_warn!("job {id}: poll failed ({err}), retrying next tick");
            }
            Err(err) => {
                porter_warn!("job {id}: poll failed permanently ({err})");
                return Some(ServiceEvent::RequestFailed {
                    context: format!("poll {id}"),
                    error: err.to_string(),
                });
            }
        }
    }
}

pub(crate) fn settled_event(job: Job) -> ServiceEvent {
    match job.status {
        JobStatus::Completed => ServiceEvent::JobCompleted { job },
        JobStatus::Cancelled => ServiceEvent::JobCancelled { job },
        _ => ServiceEvent::JobFailed { job },
    }
}
