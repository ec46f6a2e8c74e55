use std::collections::BTreeSet;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::coordinator::DashboardState;
use crate::filter::FilterKey;
use crate::job::{Job, JobId};
use crate::sort::SortKey;

/// Which component published an envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventSource {
    FilterManager,
    SortManager,
    SearchManager,
    SelectionManager,
    Coordinator,
    JobService,
    SessionRestore,
    /// Direct user intents that belong to no manager (banner dismissal).
    Ui,
}

/// Severity of a user-visible banner notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Error,
}

/// Dismissible banner content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

/// The closed set of messages carried on the dashboard bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DashboardEvent {
    FilterChanged { filter: FilterKey },
    SortChanged { sort: SortKey },
    SearchChanged { query: String },
    SelectionChanged { selected: BTreeSet<JobId> },
    /// Request/response: answered by `SelectAllProvided`. Fire-and-forget,
    /// so a missing responder is a silent no-op.
    SelectAllRequested,
    SelectAllProvided { ids: Vec<JobId> },
    /// The delete itself is delegated to an external handler; the
    /// selection manager never deletes anything.
    DeleteRequested { ids: Vec<JobId> },
    /// Full job projection list from the job service.
    JobsUpdated { jobs: Vec<Job> },
    NoticeRaised { notice: Notice },
    NoticeDismissed,
    /// The coordinator's consolidated re-broadcast.
    StateUpdated { state: DashboardState },
}

/// One published event stamped with its origin and publish time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub source: EventSource,
    pub timestamp_ms: u64,
    pub event: DashboardEvent,
}

pub(crate) fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or(0)
}
