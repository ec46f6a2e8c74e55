use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::thread;

use tokio_util::sync::CancellationToken;

use porter_core::{is_terminal, JobId};
use porter_logging::{porter_debug, porter_info, porter_warn};

use crate::api::{ApiSettings, HttpJobApi, JobApi};
use crate::poll::{poll_job, PollSettings};
use crate::types::{ApiError, ServiceEvent};

enum ServiceCommand {
    Submit { url: String },
    SubmitBatch { urls: Vec<String> },
    RefreshList,
    Track { id: JobId },
    Cancel { id: JobId },
    Retry { id: JobId },
    Shutdown,
}

/// Owns the polling runtime on its own thread.
///
/// Commands go in over a channel and events come back the same way, so the
/// caller stays synchronous and never blocks on network work.
pub struct JobServiceHandle {
    cmd_tx: mpsc::Sender<ServiceCommand>,
    event_rx: mpsc::Receiver<ServiceEvent>,
}

impl JobServiceHandle {
    /// Builds the HTTP transport from `settings` and starts the service.
    pub fn connect(settings: ApiSettings, poll: PollSettings) -> Result<Self, ApiError> {
        let api: Arc<dyn JobApi> = Arc::new(HttpJobApi::new(settings)?);
        Ok(Self::new(api, poll))
    }

    pub fn new(api: Arc<dyn JobApi>, poll: PollSettings) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();
        let tracker = Tracker::default();

        thread::spawn(move || {
            let runtime = tokio::runtime::Runtime::new().expect("tokio runtime");
            while let Ok(command) = cmd_rx.recv() {
                if matches!(command, ServiceCommand::Shutdown) {
                    let aborted = tracker.abort_all();
                    if aborted > 0 {
                        porter_info!("job service: aborted {aborted} watcher(s) on shutdown");
                    }
                    break;
                }
                let api = api.clone();
                let tracker = tracker.clone();
                let poll = poll.clone();
                let events = event_tx.clone();
                runtime.spawn(async move {
                    handle_command(api, tracker, poll, events, command).await;
                });
            }
        });

        Self { cmd_tx, event_rx }
    }

    pub fn submit(&self, url: impl Into<String>) {
        let _ = self.cmd_tx.send(ServiceCommand::Submit { url: url.into() });
    }

    pub fn submit_batch(&self, urls: Vec<String>) {
        let _ = self.cmd_tx.send(ServiceCommand::SubmitBatch { urls });
    }

    /// Fetches the full job list, then watches whatever is still active.
    pub fn refresh(&self) {
        let _ = self.cmd_tx.send(ServiceCommand::RefreshList);
    }

    /// Starts watching an already-submitted job, for session restore.
    pub fn track(&self, id: JobId) {
        let _ = self.cmd_tx.send(ServiceCommand::Track { id });
    }

    pub fn cancel(&self, id: JobId) {
        let _ = self.cmd_tx.send(ServiceCommand::Cancel { id });
    }

    pub fn retry(&self, id: JobId) {
        let _ = self.cmd_tx.send(ServiceCommand::Retry { id });
    }

    pub fn shutdown(&self) {
        let _ = self.cmd_tx.send(ServiceCommand::Shutdown);
    }

    pub fn try_recv(&self) -> Option<ServiceEvent> {
        self.event_rx.try_recv().ok()
    }
}

async fn handle_command(
    api: Arc<dyn JobApi>,
    tracker: Tracker,
    poll: PollSettings,
    events: mpsc::Sender<ServiceEvent>,
    command: ServiceCommand,
) {
    match command {
        ServiceCommand::Submit { url } => match api.submit(&url).await {
            Ok(job) => {
                let _ = events.send(ServiceEvent::JobUpdated { job: job.clone() });
                if !is_terminal(job.status) {
                    watch(api, tracker, poll, events, job.id);
                }
            }
            Err(err) => request_failed(&events, format!("submit {url}"), err),
        },
        ServiceCommand::SubmitBatch { urls } => match api.create_batch(&urls).await {
            Ok(batch_id) => match api.get_batch(&batch_id).await {
                Ok(jobs) => {
                    porter_info!(
                        "job service: batch {batch_id} accepted with {} job(s)",
                        jobs.len()
                    );
                    // Jobs are tracked independently from here on; a partial
                    // batch still yields per-job watchers.
                    for job in jobs {
                        let _ = events.send(ServiceEvent::JobUpdated { job: job.clone() });
                        if !is_terminal(job.status) {
                            watch(
                                api.clone(),
                                tracker.clone(),
                                poll.clone(),
                                events.clone(),
                                job.id,
                            );
                        }
                    }
                }
                Err(err) => request_failed(&events, format!("fetch batch {batch_id}"), err),
            },
            Err(err) => {
                request_failed(&events, format!("batch submit {} url(s)", urls.len()), err)
            }
        },
        ServiceCommand::RefreshList => match api.list_jobs().await {
            Ok(jobs) => {
                let _ = events.send(ServiceEvent::JobsListed { jobs: jobs.clone() });
                for job in jobs {
                    if !is_terminal(job.status) && !tracker.is_tracking(&job.id) {
                        watch(
                            api.clone(),
                            tracker.clone(),
                            poll.clone(),
                            events.clone(),
                            job.id,
                        );
                    }
                }
            }
            Err(err) => request_failed(&events, "list jobs".to_string(), err),
        },
        ServiceCommand::Track { id } => {
            watch(api, tracker, poll, events, id);
        }
        ServiceCommand::Cancel { id } => {
            // Stop our watcher before asking the backend, so the confirmed
            // snapshot below is the final word on this job.
            let was_tracked = tracker.abort(&id);
            match api.cancel_job(&id).await {
                Ok(job) => {
                    let _ = events.send(ServiceEvent::JobUpdated { job: job.clone() });
                    if was_tracked {
                        let _ = events.send(ServiceEvent::JobCancelled { job });
                    }
                }
                Err(err) => {
                    // The backend refused (already settled, most likely).
                    // Re-watch so the projection converges on its answer.
                    if was_tracked {
                        watch(
                            api.clone(),
                            tracker.clone(),
                            poll.clone(),
                            events.clone(),
                            id.clone(),
                        );
                    }
                    request_failed(&events, format!("cancel {id}"), err);
                }
            }
        }
        ServiceCommand::Retry { id } => match api.retry_job(&id).await {
            Ok(job) => {
                let _ = events.send(ServiceEvent::JobUpdated { job: job.clone() });
                if !is_terminal(job.status) {
                    watch(api, tracker, poll, events, job.id);
                }
            }
            Err(err) => request_failed(&events, format!("retry {id}"), err),
        },
        // Intercepted by the command loop.
        ServiceCommand::Shutdown => {}
    }
}

fn watch(
    api: Arc<dyn JobApi>,
    tracker: Tracker,
    poll: PollSettings,
    events: mpsc::Sender<ServiceEvent>,
    id: JobId,
) {
    let (generation, token) = tracker.track(&id);
    porter_debug!("job service: watching {id} (generation {generation})");
    tokio::spawn(async move {
        let settled = poll_job(api.as_ref(), id.clone(), &poll, &token, &events).await;
        // Delivery is gated on still owning the registry entry, so a job
        // settles exactly once even when a cancel races the poll.
        if tracker.settle(&id, generation) {
            if let Some(event) = settled {
                let _ = events.send(event);
            }
        }
    });
}

fn request_failed(events: &mpsc::Sender<ServiceEvent>, context: String, err: ApiError) {
    porter_warn!("job service: {context} failed: {err}");
    let _ = events.send(ServiceEvent::RequestFailed {
        context,
        error: err.to_string(),
    });
}

struct Registered {
    generation: u64,
    token: CancellationToken,
}

/// Registry of in-flight watchers, shared across command tasks.
///
/// Generations disambiguate watchers for the same job: only the entry's
/// current owner may settle it.
#[derive(Clone, Default)]
struct Tracker {
    jobs: Arc<Mutex<HashMap<JobId, Registered>>>,
    generations: Arc<AtomicU64>,
}

impl Tracker {
    /// Registers a watcher for `id`, cancelling any previous one.
    fn track(&self, id: &JobId) -> (u64, CancellationToken) {
        let generation = self.generations.fetch_add(1, Ordering::Relaxed) + 1;
        let token = CancellationToken::new();
        let previous = self.jobs.lock().expect("tracker lock").insert(
            id.clone(),
            Registered {
                generation,
                token: token.clone(),
            },
        );
        if let Some(previous) = previous {
            previous.token.cancel();
        }
        (generation, token)
    }

    /// Removes the entry if it still belongs to `generation`; returns
    /// whether the caller owned it.
    fn settle(&self, id: &JobId, generation: u64) -> bool {
        let mut jobs = self.jobs.lock().expect("tracker lock");
        if jobs
            .get(id)
            .is_some_and(|entry| entry.generation == generation)
        {
            jobs.remove(id);
            true
        } else {
            false
        }
    }

    /// Cancels and removes any watcher for `id`.
    fn abort(&self, id: &JobId) -> bool {
        match self.jobs.lock().expect("tracker lock").remove(id) {
            Some(entry) => {
                entry.token.cancel();
                true
            }
            None => false,
        }
    }

    fn abort_all(&self) -> usize {
        let mut jobs = self.jobs.lock().expect("tracker lock");
        let count = jobs.len();
        for (_, entry) in jobs.drain() {
            entry.token.cancel();
        }
        count
    }

    fn is_tracking(&self, id: &JobId) -> bool {
        self.jobs.lock().expect("tracker lock").contains_key(id)
    }
}
