use std::sync::Arc;

use porter_logging::porter_warn;

use crate::bus::EventBus;
use crate::event::{DashboardEvent, EventSource};
use crate::store::{StateKey, StateStore};

/// Longest accepted search query; anything longer is rejected outright
/// rather than truncated, so the mirror and the broadcast never disagree.
pub const MAX_QUERY_LEN: usize = 256;

/// Owns the free-text search query and broadcasts accepted changes.
///
/// Queries are trimmed before comparison; setting the current value again
/// is a silent no-op.
pub struct SearchManager {
    bus: Arc<EventBus>,
    store: Arc<dyn StateStore>,
    query: String,
}

impl SearchManager {
    pub fn new(bus: Arc<EventBus>, store: Arc<dyn StateStore>) -> Self {
        Self {
            bus,
            store,
            query: String::new(),
        }
    }

    pub fn current(&self) -> &str {
        &self.query
    }

    /// Applies a raw UI value. Over-long input is logged and ignored.
    pub fn set(&mut self, raw: &str) {
        let query = raw.trim();
        if query.chars().count() > MAX_QUERY_LEN {
            porter_warn!(
                "search manager ignored query of {} chars (max {})",
                query.chars().count(),
                MAX_QUERY_LEN
            );
            return;
        }
        if query == self.query {
            return;
        }
        self.query = query.to_string();
        self.store.set(StateKey::SearchQuery, &self.query);
        self.bus.publish(
            EventSource::SearchManager,
            DashboardEvent::SearchChanged {
                query: self.query.clone(),
            },
        );
    }

    /// Clears the query, broadcasting if it was non-empty.
    pub fn clear(&mut self) {
        self.set("");
    }

    /// Accepts an externally-driven change without re-broadcasting.
    pub fn sync(&mut self, query: &str) {
        let query = query.trim();
        if query == self.query {
            return;
        }
        self.query = query.to_string();
        self.store.set(StateKey::SearchQuery, &self.query);
    }
}
