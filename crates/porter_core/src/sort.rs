use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use porter_logging::porter_warn;

use crate::bus::EventBus;
use crate::event::{DashboardEvent, EventSource};
use crate::store::{StateKey, StateStore};

/// Ordering applied to the visible job rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SortKey {
    #[default]
    NewestFirst,
    OldestFirst,
    /// Orders by strategy priority (active statuses first), ties broken
    /// newest-first.
    Status,
    Url,
}

impl SortKey {
    pub const VALUES: [SortKey; 4] = [
        SortKey::NewestFirst,
        SortKey::OldestFirst,
        SortKey::Status,
        SortKey::Url,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SortKey::NewestFirst => "newest",
            SortKey::OldestFirst => "oldest",
            SortKey::Status => "status",
            SortKey::Url => "url",
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A sort name outside the fixed enumeration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownSort(pub String);

impl fmt::Display for UnknownSort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown sort `{}`", self.0)
    }
}

impl std::error::Error for UnknownSort {}

impl FromStr for SortKey {
    type Err = UnknownSort;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "newest" => Ok(SortKey::NewestFirst),
            "oldest" => Ok(SortKey::OldestFirst),
            "status" => Ok(SortKey::Status),
            "url" => Ok(SortKey::Url),
            other => Err(UnknownSort(other.to_string())),
        }
    }
}

/// Owns the active sort order and broadcasts accepted changes.
pub struct SortManager {
    bus: Arc<EventBus>,
    store: Arc<dyn StateStore>,
    current: SortKey,
}

impl SortManager {
    pub fn new(bus: Arc<EventBus>, store: Arc<dyn StateStore>) -> Self {
        Self {
            bus,
            store,
            current: SortKey::default(),
        }
    }

    pub fn current(&self) -> SortKey {
        self.current
    }

    /// Applies a raw UI value. Unrecognized values are logged and ignored.
    pub fn set_raw(&mut self, raw: &str) {
        match raw.parse::<SortKey>() {
            Ok(sort) => self.set(sort),
            Err(err) => porter_warn!("sort manager ignored {}", err),
        }
    }

    /// Sets the active sort. Re-setting the current value is a silent
    /// no-op.
    pub fn set(&mut self, sort: SortKey) {
        if sort == self.current {
            return;
        }
        self.current = sort;
        self.store.set(StateKey::CurrentSort, sort.as_str());
        self.bus.publish(
            EventSource::SortManager,
            DashboardEvent::SortChanged { sort },
        );
    }

    /// Accepts an externally-driven change without re-broadcasting.
    pub fn sync(&mut self, sort: SortKey) {
        if sort == self.current {
            return;
        }
        self.current = sort;
        self.store.set(StateKey::CurrentSort, sort.as_str());
    }
}
