use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::bus::EventBus;
use crate::event::{now_ms, DashboardEvent, Envelope, EventSource, Notice};
use crate::filter::FilterKey;
use crate::job::{Job, JobId};
use crate::sort::SortKey;
use crate::store::{StateKey, StateStore};
use crate::view::{view, DashboardViewModel};

/// Consolidated dashboard state, merged from every slice event.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DashboardState {
    pub filter: FilterKey,
    pub sort: SortKey,
    pub search: String,
    pub selected: BTreeSet<JobId>,
    pub total_jobs: usize,
    pub notice: Option<Notice>,
    /// Stamped at merge time of the last accepted change.
    pub updated_at_ms: u64,
}

/// Aggregates per-slice events into one consolidated broadcast.
///
/// Merges are shallow and last-write-wins per field; the only ordering is
/// arrival order. Each merge that changed anything mirrors the state and
/// publishes exactly one `StateUpdated`.
pub struct DashboardCoordinator {
    bus: Arc<EventBus>,
    store: Arc<dyn StateStore>,
    state: DashboardState,
    jobs: BTreeMap<JobId, Job>,
}

impl DashboardCoordinator {
    pub fn new(bus: Arc<EventBus>, store: Arc<dyn StateStore>) -> Self {
        Self {
            bus,
            store,
            state: DashboardState::default(),
            jobs: BTreeMap::new(),
        }
    }

    pub fn state(&self) -> &DashboardState {
        &self.state
    }

    pub fn jobs(&self) -> &BTreeMap<JobId, Job> {
        &self.jobs
    }

    /// Projects the consolidated state into render-ready rows and counts.
    pub fn view(&self) -> DashboardViewModel {
        view(&self.state, &self.jobs)
    }

    /// Seeds restored state without broadcasting, for session startup.
    pub fn seed(&mut self, state: DashboardState) {
        self.state = state;
        self.state.updated_at_ms = now_ms();
        self.mirror();
    }

    /// Merges one envelope into the consolidated state.
    pub fn apply(&mut self, envelope: &Envelope) {
        let changed = match &envelope.event {
            DashboardEvent::FilterChanged { filter } => {
                replace(&mut self.state.filter, *filter)
            }
            DashboardEvent::SortChanged { sort } => replace(&mut self.state.sort, *sort),
            DashboardEvent::SearchChanged { query } => {
                replace(&mut self.state.search, query.clone())
            }
            DashboardEvent::SelectionChanged { selected } => {
                replace(&mut self.state.selected, selected.clone())
            }
            DashboardEvent::JobsUpdated { jobs } => self.merge_jobs(jobs),
            DashboardEvent::NoticeRaised { notice } => {
                replace(&mut self.state.notice, Some(notice.clone()))
            }
            DashboardEvent::NoticeDismissed => replace(&mut self.state.notice, None),
            // Own re-broadcasts and pass-through requests merge nothing.
            DashboardEvent::StateUpdated { .. }
            | DashboardEvent::SelectAllRequested
            | DashboardEvent::SelectAllProvided { .. }
            | DashboardEvent::DeleteRequested { .. } => false,
        };

        if changed {
            self.state.updated_at_ms = now_ms();
            self.mirror();
            self.bus.publish(
                EventSource::Coordinator,
                DashboardEvent::StateUpdated {
                    state: self.state.clone(),
                },
            );
        }
    }

    fn merge_jobs(&mut self, jobs: &[Job]) -> bool {
        let next: BTreeMap<JobId, Job> = jobs
            .iter()
            .cloned()
            .map(|job| (job.id.clone(), job))
            .collect();
        // Selected jobs must stay within the visible set.
        let pruned: BTreeSet<JobId> = self
            .state
            .selected
            .iter()
            .filter(|id| next.contains_key(*id))
            .cloned()
            .collect();

        let changed = next != self.jobs
            || pruned != self.state.selected
            || self.state.total_jobs != next.len();
        if changed {
            self.state.total_jobs = next.len();
            self.state.selected = pruned;
            self.jobs = next;
        }
        changed
    }

    fn mirror(&self) {
        self.store
            .set(StateKey::CurrentFilter, self.state.filter.as_str());
        self.store.set(StateKey::CurrentSort, self.state.sort.as_str());
        self.store.set(StateKey::SearchQuery, &self.state.search);
        self.store
            .set(StateKey::TotalJobs, &self.state.total_jobs.to_string());
        let selected = self
            .state
            .selected
            .iter()
            .map(JobId::as_str)
            .collect::<Vec<_>>()
            .join(",");
        self.store.set(StateKey::SelectedJobs, &selected);
    }
}

fn replace<T: PartialEq>(slot: &mut T, next: T) -> bool {
    if *slot == next {
        false
    } else {
        *slot = next;
        true
    }
}
