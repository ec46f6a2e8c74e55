//! Session shell: owns the bus, the slice managers, the coordinator and
//! the job service, and routes events between them.
//!
//! The shell is synchronous. [`Session::pump`] drains pending service
//! events and bus envelopes until both are empty; callers decide the
//! cadence. User intents go through the managers so every change takes
//! the same bus path regardless of origin.

use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;
use std::sync::mpsc::Receiver;
use std::sync::{mpsc, Arc};
use std::time::Duration;

use porter_client::{JobServiceHandle, ServiceEvent};
use porter_core::{
    decode_query, encode_query, is_terminal, ConfirmPolicy, DashboardCoordinator, DashboardEvent,
    DashboardState, DashboardViewModel, Envelope, EventBus, EventSource, FilterKey, FilterManager,
    Job, JobId, Notice, NoticeKind, QueryState, SearchManager, SelectionManager, SortKey,
    SortManager, StateKey, StateStore,
};
use porter_logging::{porter_info, porter_warn};

use crate::debounce::Debouncer;

pub struct Session {
    bus: Arc<EventBus>,
    bus_rx: Receiver<Envelope>,
    store: Arc<dyn StateStore>,
    service: JobServiceHandle,
    filter: FilterManager,
    sort: SortManager,
    search: SearchManager,
    selection: SelectionManager,
    coordinator: DashboardCoordinator,
    /// Authoritative projection fed by service events. The coordinator
    /// keeps its own copy from the `JobsUpdated` broadcasts.
    jobs: BTreeMap<JobId, Job>,
    search_debouncer: Debouncer<String>,
    debounced_rx: Receiver<String>,
}

impl Session {
    pub fn new(
        bus: Arc<EventBus>,
        store: Arc<dyn StateStore>,
        service: JobServiceHandle,
        confirm: Arc<dyn ConfirmPolicy>,
        search_debounce: Duration,
    ) -> Self {
        let bus_rx = bus.subscribe();
        let (debounced_tx, debounced_rx) = mpsc::channel();
        let search_debouncer = Debouncer::new(search_debounce, debounced_tx);
        let filter = FilterManager::new(bus.clone(), store.clone());
        let sort = SortManager::new(bus.clone(), store.clone());
        let search = SearchManager::new(bus.clone(), store.clone());
        let selection = SelectionManager::new(bus.clone(), store.clone(), confirm);
        let coordinator = DashboardCoordinator::new(bus.clone(), store.clone());
        Self {
            bus,
            bus_rx,
            store,
            service,
            filter,
            sort,
            search,
            selection,
            coordinator,
            jobs: BTreeMap::new(),
            search_debouncer,
            debounced_rx,
        }
    }

    /// Recovers slice state from the store, then asks the service for the
    /// current job list. A query string, when given, overrides the stored
    /// filter, sort and search wholesale.
    ///
    /// Managers are synced rather than set, so recovery broadcasts nothing.
    pub fn restore(&mut self, query_override: Option<&str>) {
        let restored = match query_override {
            Some(query) => decode_query(query),
            None => QueryState {
                filter: parse_stored(self.store.get(StateKey::CurrentFilter), "filter"),
                sort: parse_stored(self.store.get(StateKey::CurrentSort), "sort"),
                search: self.store.get(StateKey::SearchQuery).unwrap_or_default(),
            },
        };
        let selected = parse_selected(self.store.get(StateKey::SelectedJobs));

        self.filter.sync(restored.filter);
        self.sort.sync(restored.sort);
        self.search.sync(&restored.search);
        self.selection.sync(selected.clone());
        self.coordinator.seed(DashboardState {
            filter: restored.filter,
            sort: restored.sort,
            search: restored.search,
            selected,
            ..DashboardState::default()
        });

        porter_info!(
            "session: restored filter={} sort={} selected={}",
            self.coordinator.state().filter,
            self.coordinator.state().sort,
            self.coordinator.state().selected.len()
        );
        self.service.refresh();
    }

    /// Drains debounced input, service events and bus envelopes, in that
    /// order, until everything published during the drain is routed too.
    pub fn pump(&mut self) {
        while let Ok(query) = self.debounced_rx.try_recv() {
            self.search.set(&query);
        }
        while let Some(event) = self.service.try_recv() {
            self.apply_service_event(event);
        }
        while let Ok(envelope) = self.bus_rx.try_recv() {
            self.route(&envelope);
        }
    }

    pub fn view(&self) -> DashboardViewModel {
        self.coordinator.view()
    }

    pub fn state(&self) -> &DashboardState {
        self.coordinator.state()
    }

    /// Query string for the current slice state, empty when everything is
    /// at its default.
    pub fn query_string(&self) -> String {
        let state = self.coordinator.state();
        encode_query(&QueryState {
            filter: state.filter,
            sort: state.sort,
            search: state.search.clone(),
        })
    }

    pub fn submit(&self, url: &str) {
        self.service.submit(url);
    }

    pub fn submit_batch(&self, urls: Vec<String>) {
        self.service.submit_batch(urls);
    }

    pub fn refresh(&self) {
        self.service.refresh();
    }

    pub fn cancel_job(&self, id: JobId) {
        self.service.cancel(id);
    }

    pub fn retry_job(&self, id: JobId) {
        self.service.retry(id);
    }

    pub fn set_filter(&mut self, filter: FilterKey) {
        self.filter.set(filter);
        self.pump();
    }

    pub fn set_sort(&mut self, sort: SortKey) {
        self.sort.set(sort);
        self.pump();
    }

    /// Keystroke path: coalesced by the debouncer, applied on a later
    /// [`Session::pump`] once the input goes quiet.
    pub fn search_input(&self, raw: &str) {
        self.search_debouncer.push(raw.to_string());
    }

    /// Immediate search change, bypassing the debounce window.
    pub fn set_search(&mut self, raw: &str) {
        self.search.set(raw);
        self.pump();
    }

    pub fn toggle_selection(&mut self, id: JobId) {
        self.selection.toggle(id);
        self.pump();
    }

    pub fn select_all(&mut self) {
        self.selection.request_select_all();
        self.pump();
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
        self.pump();
    }

    pub fn delete_selected(&mut self) {
        self.selection.request_delete();
        self.pump();
    }

    pub fn dismiss_notice(&mut self) {
        self.bus
            .publish(EventSource::Ui, DashboardEvent::NoticeDismissed);
        self.pump();
    }

    pub fn shutdown(&self) {
        self.service.shutdown();
    }

    fn apply_service_event(&mut self, event: ServiceEvent) {
        match event {
            ServiceEvent::JobUpdated { job } => {
                self.jobs.insert(job.id.clone(), job);
                self.publish_jobs();
            }
            ServiceEvent::JobsListed { jobs } => {
                self.jobs = jobs.into_iter().map(|job| (job.id.clone(), job)).collect();
                self.publish_jobs();
            }
            ServiceEvent::JobCompleted { job } => {
                let message = format!("Conversion finished: {}", job.url);
                self.jobs.insert(job.id.clone(), job);
                self.publish_jobs();
                self.notify(NoticeKind::Success, message);
            }
            ServiceEvent::JobFailed { job } => {
                let detail = job.error.clone().unwrap_or_else(|| "unknown error".into());
                let message = format!("Conversion failed: {}: {}", job.url, detail);
                self.jobs.insert(job.id.clone(), job);
                self.publish_jobs();
                self.notify(NoticeKind::Error, message);
            }
            ServiceEvent::JobCancelled { job } => {
                let message = format!("Conversion cancelled: {}", job.url);
                self.jobs.insert(job.id.clone(), job);
                self.publish_jobs();
                self.notify(NoticeKind::Success, message);
            }
            ServiceEvent::RequestFailed { context, error } => {
                self.notify(NoticeKind::Error, format!("Request failed ({context}): {error}"));
            }
        }
    }

    fn route(&mut self, envelope: &Envelope) {
        match &envelope.event {
            DashboardEvent::SelectAllRequested => {
                let ids: Vec<JobId> = self
                    .coordinator
                    .view()
                    .rows
                    .iter()
                    .map(|job| job.id.clone())
                    .collect();
                self.bus
                    .publish(EventSource::Ui, DashboardEvent::SelectAllProvided { ids });
            }
            DashboardEvent::SelectAllProvided { ids } => {
                self.selection.select_visible(ids.iter().cloned());
            }
            DashboardEvent::DeleteRequested { ids } => {
                self.delete(ids);
            }
            DashboardEvent::StateUpdated { state } => {
                self.filter.sync(state.filter);
                self.sort.sync(state.sort);
                self.search.sync(&state.search);
                self.selection.sync(state.selected.clone());
            }
            _ => {}
        }
        self.coordinator.apply(envelope);
    }

    /// Settled jobs leave the projection immediately; active ones are
    /// cancelled through the service and stay until it confirms.
    fn delete(&mut self, ids: &[JobId]) {
        let mut removed = 0;
        for id in ids {
            let settled = self.jobs.get(id).map(|job| is_terminal(job.status));
            match settled {
                Some(true) => {
                    self.jobs.remove(id);
                    removed += 1;
                }
                Some(false) => self.service.cancel(id.clone()),
                None => {}
            }
        }
        if removed > 0 {
            porter_info!("session: removed {removed} settled job(s)");
            self.publish_jobs();
        }
    }

    fn publish_jobs(&self) {
        let jobs: Vec<Job> = self.jobs.values().cloned().collect();
        self.bus
            .publish(EventSource::JobService, DashboardEvent::JobsUpdated { jobs });
    }

    fn notify(&self, kind: NoticeKind, message: String) {
        self.bus.publish(
            EventSource::JobService,
            DashboardEvent::NoticeRaised {
                notice: Notice { kind, message },
            },
        );
    }
}

fn parse_stored<T>(value: Option<String>, what: &str) -> T
where
    T: Default + FromStr,
    T::Err: std::fmt::Display,
{
    match value {
        None => T::default(),
        Some(raw) => match raw.parse() {
            Ok(parsed) => parsed,
            Err(err) => {
                porter_warn!("session: ignoring stored {what}: {err}");
                T::default()
            }
        },
    }
}

fn parse_selected(value: Option<String>) -> BTreeSet<JobId> {
    value
        .unwrap_or_default()
        .split(',')
        .filter(|part| !part.is_empty())
        .map(JobId::from)
        .collect()
}
