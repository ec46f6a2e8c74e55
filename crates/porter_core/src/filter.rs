use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use porter_logging::porter_warn;

use crate::bus::EventBus;
use crate::event::{DashboardEvent, EventSource};
use crate::status::StatusCategory;
use crate::store::{StateKey, StateStore};

/// Filter tab selection. `All` shows every job; the rest map onto status
/// categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FilterKey {
    #[default]
    All,
    Pending,
    Processing,
    Completed,
    Error,
}

impl FilterKey {
    pub const VALUES: [FilterKey; 5] = [
        FilterKey::All,
        FilterKey::Pending,
        FilterKey::Processing,
        FilterKey::Completed,
        FilterKey::Error,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            FilterKey::All => "all",
            FilterKey::Pending => "pending",
            FilterKey::Processing => "processing",
            FilterKey::Completed => "completed",
            FilterKey::Error => "error",
        }
    }

    /// Category this tab selects, `None` for `All`.
    pub fn category(self) -> Option<StatusCategory> {
        match self {
            FilterKey::All => None,
            FilterKey::Pending => Some(StatusCategory::Pending),
            FilterKey::Processing => Some(StatusCategory::Processing),
            FilterKey::Completed => Some(StatusCategory::Completed),
            FilterKey::Error => Some(StatusCategory::Error),
        }
    }
}

impl fmt::Display for FilterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A filter name outside the fixed enumeration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownFilter(pub String);

impl fmt::Display for UnknownFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown filter `{}`", self.0)
    }
}

impl std::error::Error for UnknownFilter {}

impl FromStr for FilterKey {
    type Err = UnknownFilter;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(FilterKey::All),
            "pending" => Ok(FilterKey::Pending),
            "processing" => Ok(FilterKey::Processing),
            "completed" => Ok(FilterKey::Completed),
            "error" => Ok(FilterKey::Error),
            other => Err(UnknownFilter(other.to_string())),
        }
    }
}

/// Owns the active filter tab and broadcasts accepted changes.
pub struct FilterManager {
    bus: Arc<EventBus>,
    store: Arc<dyn StateStore>,
    current: FilterKey,
}

impl FilterManager {
    pub fn new(bus: Arc<EventBus>, store: Arc<dyn StateStore>) -> Self {
        Self {
            bus,
            store,
            current: FilterKey::default(),
        }
    }

    pub fn current(&self) -> FilterKey {
        self.current
    }

    /// Applies a raw UI value. Unrecognized values are logged and ignored;
    /// the current value and the mirror stay untouched and no event fires.
    pub fn set_raw(&mut self, raw: &str) {
        match raw.parse::<FilterKey>() {
            Ok(filter) => self.set(filter),
            Err(err) => porter_warn!("filter manager ignored {}", err),
        }
    }

    /// Sets the active filter. Re-setting the current value is a silent
    /// no-op.
    pub fn set(&mut self, filter: FilterKey) {
        if filter == self.current {
            return;
        }
        self.current = filter;
        self.store.set(StateKey::CurrentFilter, filter.as_str());
        self.bus.publish(
            EventSource::FilterManager,
            DashboardEvent::FilterChanged { filter },
        );
    }

    /// Accepts an externally-driven change without re-broadcasting.
    pub fn sync(&mut self, filter: FilterKey) {
        if filter == self.current {
            return;
        }
        self.current = filter;
        self.store.set(StateKey::CurrentFilter, filter.as_str());
    }
}
