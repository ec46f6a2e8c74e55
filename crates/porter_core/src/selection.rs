use std::collections::BTreeSet;
use std::sync::Arc;

use porter_logging::porter_info;

use crate::bus::EventBus;
use crate::event::{DashboardEvent, EventSource};
use crate::job::JobId;
use crate::store::{StateKey, StateStore};

/// Asks the user to confirm a destructive batch action.
pub trait ConfirmPolicy: Send + Sync {
    fn confirm(&self, prompt: &str) -> bool;
}

/// Canned answer used by tests and non-interactive sessions.
pub struct PresetConfirm(pub bool);

impl ConfirmPolicy for PresetConfirm {
    fn confirm(&self, _prompt: &str) -> bool {
        self.0
    }
}

/// Owns the batch-selection set and broadcasts accepted changes.
pub struct SelectionManager {
    bus: Arc<EventBus>,
    store: Arc<dyn StateStore>,
    confirm: Arc<dyn ConfirmPolicy>,
    selected: BTreeSet<JobId>,
}

impl SelectionManager {
    pub fn new(
        bus: Arc<EventBus>,
        store: Arc<dyn StateStore>,
        confirm: Arc<dyn ConfirmPolicy>,
    ) -> Self {
        Self {
            bus,
            store,
            confirm,
            selected: BTreeSet::new(),
        }
    }

    pub fn selected(&self) -> &BTreeSet<JobId> {
        &self.selected
    }

    pub fn is_selected(&self, id: &JobId) -> bool {
        self.selected.contains(id)
    }

    /// Toggles one job in or out of the selection.
    pub fn toggle(&mut self, id: JobId) {
        if !self.selected.remove(&id) {
            self.selected.insert(id);
        }
        self.after_change();
    }

    /// Select-all over the visible ids (the `SelectAllProvided` answer).
    pub fn select_visible(&mut self, ids: impl IntoIterator<Item = JobId>) {
        let next: BTreeSet<JobId> = ids.into_iter().collect();
        if next == self.selected {
            return;
        }
        self.selected = next;
        self.after_change();
    }

    /// Clears the selection (select none).
    pub fn clear(&mut self) {
        if self.selected.is_empty() {
            return;
        }
        self.selected.clear();
        self.after_change();
    }

    /// Broadcasts a request for the visible id list. Fire-and-forget: the
    /// selection only changes once something answers with
    /// `SelectAllProvided`.
    pub fn request_select_all(&self) {
        self.bus.publish(
            EventSource::SelectionManager,
            DashboardEvent::SelectAllRequested,
        );
    }

    /// Asks for confirmation and, if granted, delegates deletion of the
    /// current selection via `DeleteRequested`. The selection itself stays
    /// until the jobs leave the visible set.
    pub fn request_delete(&self) {
        if self.selected.is_empty() {
            return;
        }
        let prompt = format!("Delete {} selected job(s)?", self.selected.len());
        if !self.confirm.confirm(&prompt) {
            porter_info!("selection manager: delete declined");
            return;
        }
        let ids: Vec<JobId> = self.selected.iter().cloned().collect();
        self.bus.publish(
            EventSource::SelectionManager,
            DashboardEvent::DeleteRequested { ids },
        );
    }

    /// Accepts an externally-driven selection without re-broadcasting.
    pub fn sync(&mut self, selected: BTreeSet<JobId>) {
        if selected == self.selected {
            return;
        }
        self.selected = selected;
        self.write_mirror();
    }

    fn after_change(&self) {
        self.write_mirror();
        self.bus.publish(
            EventSource::SelectionManager,
            DashboardEvent::SelectionChanged {
                selected: self.selected.clone(),
            },
        );
    }

    fn write_mirror(&self) {
        let joined = self
            .selected
            .iter()
            .map(JobId::as_str)
            .collect::<Vec<_>>()
            .join(",");
        self.store.set(StateKey::SelectedJobs, &joined);
    }
}
