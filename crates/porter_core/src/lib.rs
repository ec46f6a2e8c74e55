//! Porter core: pure dashboard state for the migration job board.
//!
//! Everything in this crate is synchronous and deterministic. Slice
//! managers own one piece of state each and publish typed events on the
//! shared [`EventBus`]; the [`DashboardCoordinator`] merges those events
//! into one consolidated [`DashboardState`] and projects it through
//! [`view`]. Network and timers live in `porter_client`.

pub mod bus;
pub mod coordinator;
pub mod event;
pub mod filter;
pub mod job;
pub mod query;
pub mod search;
pub mod selection;
pub mod sort;
pub mod status;
pub mod store;
pub mod strategy;
pub mod view;

pub use bus::EventBus;
pub use coordinator::{DashboardCoordinator, DashboardState};
pub use event::{DashboardEvent, Envelope, EventSource, Notice, NoticeKind};
pub use filter::{FilterKey, FilterManager, UnknownFilter};
pub use job::{Job, JobId};
pub use query::{decode_query, encode_query, QueryState};
pub use search::{SearchManager, MAX_QUERY_LEN};
pub use selection::{ConfirmPolicy, PresetConfirm, SelectionManager};
pub use sort::{SortKey, SortManager, UnknownSort};
pub use status::{JobStatus, StatusCategory, UnknownStatus};
pub use store::{MemoryStateStore, StateKey, StateStore};
pub use strategy::{
    can_transition, default_progress, is_terminal, should_show_progress, strategy,
    StatusBehavior, StatusStrategy,
};
pub use view::{view, DashboardViewModel, TabCounts};
