use std::collections::HashMap;
use std::sync::Mutex;

/// Keys of the mirrored dashboard panel attributes.
///
/// The closed set matches the panel's data attributes one to one so a
/// reloaded session can recover every slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateKey {
    CurrentFilter,
    CurrentSort,
    SearchQuery,
    TotalJobs,
    SelectedJobs,
}

impl StateKey {
    pub const ALL: [StateKey; 5] = [
        StateKey::CurrentFilter,
        StateKey::CurrentSort,
        StateKey::SearchQuery,
        StateKey::TotalJobs,
        StateKey::SelectedJobs,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            StateKey::CurrentFilter => "current-filter",
            StateKey::CurrentSort => "current-sort",
            StateKey::SearchQuery => "search-query",
            StateKey::TotalJobs => "total-jobs",
            StateKey::SelectedJobs => "selected-jobs",
        }
    }
}

/// Mirror persistence for dashboard slices.
///
/// Managers and the coordinator write through on every accepted change; a
/// restarting session reads the mirror back to recover its state.
pub trait StateStore: Send + Sync {
    fn set(&self, key: StateKey, value: &str);
    fn get(&self, key: StateKey) -> Option<String>;
}

/// In-memory store used by tests and ephemeral sessions.
#[derive(Default)]
pub struct MemoryStateStore {
    values: Mutex<HashMap<StateKey, String>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStore for MemoryStateStore {
    fn set(&self, key: StateKey, value: &str) {
        self.values
            .lock()
            .expect("state store lock")
            .insert(key, value.to_string());
    }

    fn get(&self, key: StateKey) -> Option<String> {
        self.values
            .lock()
            .expect("state store lock")
            .get(&key)
            .cloned()
    }
}
