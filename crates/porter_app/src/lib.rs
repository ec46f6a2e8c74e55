//! Porter app: the session shell wiring the dashboard core to the job
//! service, plus the file-backed state store and logging setup.

pub mod config;
pub mod debounce;
pub mod logging;
pub mod session;
pub mod store;

pub use config::AppConfig;
pub use debounce::Debouncer;
pub use session::Session;
pub use store::RonStateStore;
