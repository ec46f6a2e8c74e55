//! Environment-driven configuration for the porter shell.
//!
//! Every knob has a default; unparsable values are logged and ignored.

use std::path::PathBuf;
use std::time::Duration;

use log::LevelFilter;

use porter_client::{ApiSettings, Auth, PollSettings};
use porter_logging::porter_warn;

const DEFAULT_API_URL: &str = "http://127.0.0.1:8080";

/// Runtime configuration assembled from `PORTER_*` environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api: ApiSettings,
    pub poll: PollSettings,
    /// Directory holding the persisted panel state.
    pub state_dir: PathBuf,
    /// Optional query string that overrides the persisted panel state.
    pub query: Option<String>,
}

impl AppConfig {
    /// Reads `PORTER_API_URL`, `PORTER_API_TOKEN`, `PORTER_SESSION_COOKIE`,
    /// `PORTER_STATE_DIR`, `PORTER_POLL_INTERVAL_MS`, `PORTER_POLL_CEILING_MS`
    /// and `PORTER_QUERY`. A bearer token wins over a session cookie when
    /// both are set.
    pub fn from_env() -> Self {
        let base_url =
            env_string("PORTER_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let mut api = ApiSettings::new(base_url);
        if let Some(token) = env_string("PORTER_API_TOKEN") {
            api.auth = Auth::Bearer(token);
        } else if let Some(cookie) = env_string("PORTER_SESSION_COOKIE") {
            api.auth = Auth::Cookie(cookie);
        }

        let defaults = PollSettings::default();
        let poll = PollSettings {
            interval: env_millis("PORTER_POLL_INTERVAL_MS", defaults.interval),
            ceiling: env_millis("PORTER_POLL_CEILING_MS", defaults.ceiling),
        };

        let state_dir = env_string("PORTER_STATE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));

        Self {
            api,
            poll,
            state_dir,
            query: env_string("PORTER_QUERY"),
        }
    }
}

/// Log level from `PORTER_LOG`, defaulting to `Info`.
///
/// Read separately from [`AppConfig::from_env`] so the logger can come up
/// before the rest of the configuration is parsed.
pub fn log_level_from_env() -> LevelFilter {
    match env_string("PORTER_LOG") {
        None => LevelFilter::Info,
        Some(raw) => match raw.parse() {
            Ok(level) => level,
            Err(_) => {
                eprintln!("Warning: unknown PORTER_LOG level {raw:?}, using info");
                LevelFilter::Info
            }
        },
    }
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn env_millis(key: &str, default: Duration) -> Duration {
    match env_string(key) {
        None => default,
        Some(raw) => match raw.parse::<u64>() {
            Ok(ms) => Duration::from_millis(ms),
            Err(_) => {
                porter_warn!("config: ignoring {key}={raw:?}, expected milliseconds");
                default
            }
        },
    }
}
