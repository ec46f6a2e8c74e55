use crate::status::{JobStatus, StatusCategory};

/// Per-status behavior flags consumed by UI action gating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusBehavior {
    pub can_cancel: bool,
    pub can_retry: bool,
    pub can_download: bool,
    pub can_delete: bool,
    pub show_progress: bool,
    pub is_active: bool,
    /// Sort rank for status ordering; lower sorts first.
    pub priority: u8,
    /// Progress percentage assumed when the backend reports none.
    pub default_progress: u8,
}

/// Static display and behavior metadata for one job status.
///
/// One instance exists per status, authored at compile time; lookups hand
/// out `&'static` references and never allocate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusStrategy {
    pub status: JobStatus,
    pub label: &'static str,
    pub color: &'static str,
    pub icon: &'static str,
    pub category: StatusCategory,
    pub terminal: bool,
    pub behavior: StatusBehavior,
    /// Statuses the backend may legally move to next. Advisory: the table
    /// gates UI actions, the backend remains the authority.
    pub transitions: &'static [JobStatus],
}

const PENDING: StatusStrategy = StatusStrategy {
    status: JobStatus::Pending,
    label: "Pending",
    color: "amber",
    icon: "clock",
    category: StatusCategory::Pending,
    terminal: false,
    behavior: StatusBehavior {
        can_cancel: true,
        can_retry: false,
        can_download: false,
        can_delete: false,
        show_progress: false,
        is_active: true,
        priority: 4,
        default_progress: 0,
    },
    transitions: &[
        JobStatus::Validating,
        JobStatus::Scraping,
        JobStatus::Error,
        JobStatus::Cancelled,
    ],
};

const VALIDATING: StatusStrategy = StatusStrategy {
    status: JobStatus::Validating,
    label: "Validating",
    color: "sky",
    icon: "shield-check",
    category: StatusCategory::Processing,
    terminal: false,
    behavior: StatusBehavior {
        can_cancel: true,
        can_retry: false,
        can_download: false,
        can_delete: false,
        show_progress: true,
        is_active: true,
        priority: 3,
        default_progress: 15,
    },
    transitions: &[JobStatus::Scraping, JobStatus::Error, JobStatus::Cancelled],
};

const SCRAPING: StatusStrategy = StatusStrategy {
    status: JobStatus::Scraping,
    label: "Scraping",
    color: "indigo",
    icon: "download-cloud",
    category: StatusCategory::Processing,
    terminal: false,
    behavior: StatusBehavior {
        can_cancel: true,
        can_retry: false,
        can_download: false,
        can_delete: false,
        show_progress: true,
        is_active: true,
        priority: 1,
        default_progress: 75,
    },
    transitions: &[
        JobStatus::Converting,
        JobStatus::Completed,
        JobStatus::Error,
        JobStatus::Cancelled,
    ],
};

const CONVERTING: StatusStrategy = StatusStrategy {
    status: JobStatus::Converting,
    label: "Converting",
    color: "violet",
    icon: "refresh-cw",
    category: StatusCategory::Processing,
    terminal: false,
    behavior: StatusBehavior {
        can_cancel: true,
        can_retry: false,
        can_download: false,
        can_delete: false,
        show_progress: true,
        is_active: true,
        priority: 2,
        default_progress: 90,
    },
    transitions: &[JobStatus::Completed, JobStatus::Error, JobStatus::Cancelled],
};

const COMPLETED: StatusStrategy = StatusStrategy {
    status: JobStatus::Completed,
    label: "Completed",
    color: "emerald",
    icon: "check-circle",
    category: StatusCategory::Completed,
    terminal: true,
    behavior: StatusBehavior {
        can_cancel: false,
        can_retry: false,
        can_download: true,
        can_delete: true,
        show_progress: false,
        is_active: false,
        priority: 7,
        default_progress: 100,
    },
    transitions: &[],
};

const ERROR: StatusStrategy = StatusStrategy {
    status: JobStatus::Error,
    label: "Failed",
    color: "rose",
    icon: "x-circle",
    category: StatusCategory::Error,
    terminal: true,
    behavior: StatusBehavior {
        can_cancel: false,
        can_retry: true,
        can_download: false,
        can_delete: true,
        show_progress: false,
        is_active: false,
        priority: 5,
        default_progress: 0,
    },
    // Terminal, but retry re-enters the pipeline.
    transitions: &[JobStatus::Pending, JobStatus::Validating],
};

const CANCELLED: StatusStrategy = StatusStrategy {
    status: JobStatus::Cancelled,
    label: "Cancelled",
    color: "slate",
    icon: "slash",
    category: StatusCategory::Error,
    terminal: true,
    behavior: StatusBehavior {
        can_cancel: false,
        can_retry: true,
        can_download: false,
        can_delete: true,
        show_progress: false,
        is_active: false,
        priority: 6,
        default_progress: 0,
    },
    transitions: &[JobStatus::Pending, JobStatus::Validating],
};

/// Looks up the strategy for `status`. Total over the enum: every status
/// has exactly one static strategy instance.
pub fn strategy(status: JobStatus) -> &'static StatusStrategy {
    match status {
        JobStatus::Pending => &PENDING,
        JobStatus::Validating => &VALIDATING,
        JobStatus::Scraping => &SCRAPING,
        JobStatus::Converting => &CONVERTING,
        JobStatus::Completed => &COMPLETED,
        JobStatus::Error => &ERROR,
        JobStatus::Cancelled => &CANCELLED,
    }
}

/// Whether moving a job from `from` to `to` is listed in the transition
/// table. `from == to` counts only if explicitly listed.
pub fn can_transition(from: JobStatus, to: JobStatus) -> bool {
    strategy(from).transitions.contains(&to)
}

/// Whether no further backend progress updates are expected.
pub fn is_terminal(status: JobStatus) -> bool {
    strategy(status).terminal
}

/// Whether the UI should render a progress bar for this status.
pub fn should_show_progress(status: JobStatus) -> bool {
    strategy(status).behavior.show_progress
}

/// Progress percentage assumed when a poll carries no figure.
pub fn default_progress(status: JobStatus) -> u8 {
    strategy(status).behavior.default_progress
}
