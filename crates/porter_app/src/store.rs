//! Durable panel-state mirror backed by a RON file.
//!
//! The file mirrors the dashboard's data attributes one to one, so a
//! restarted shell recovers filter, sort, search and selection exactly.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use porter_core::{StateKey, StateStore};
use porter_logging::{porter_error, porter_info, porter_warn};

const STATE_FILENAME: &str = ".porter_state.ron";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct PersistedPanel {
    attributes: BTreeMap<String, String>,
}

/// File-backed [`StateStore`] writing through on every accepted change.
///
/// Load failures are not fatal: a missing file yields an empty store, a
/// corrupt one is logged and ignored.
pub struct RonStateStore {
    dir: PathBuf,
    values: Mutex<HashMap<StateKey, String>>,
}

impl RonStateStore {
    pub fn open(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        let values = load(&dir);
        Self {
            dir,
            values: Mutex::new(values),
        }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(STATE_FILENAME)
    }

    fn save(&self) {
        let attributes: BTreeMap<String, String> = {
            let values = self.values.lock().expect("state store lock");
            values
                .iter()
                .map(|(key, value)| (key.as_str().to_string(), value.clone()))
                .collect()
        };

        let panel = PersistedPanel { attributes };
        let pretty = ron::ser::PrettyConfig::new();
        let content = match ron::ser::to_string_pretty(&panel, pretty) {
            Ok(text) => text,
            Err(err) => {
                porter_error!("store: failed to serialize panel state: {}", err);
                return;
            }
        };

        if let Err(err) = write_atomic(&self.dir, STATE_FILENAME, &content) {
            porter_error!("store: failed to write {:?}: {}", self.path(), err);
        }
    }
}

impl StateStore for RonStateStore {
    fn set(&self, key: StateKey, value: &str) {
        {
            let mut values = self.values.lock().expect("state store lock");
            if values.get(&key).map(String::as_str) == Some(value) {
                return;
            }
            values.insert(key, value.to_string());
        }
        self.save();
    }

    fn get(&self, key: StateKey) -> Option<String> {
        self.values
            .lock()
            .expect("state store lock")
            .get(&key)
            .cloned()
    }
}

fn load(dir: &Path) -> HashMap<StateKey, String> {
    let path = dir.join(STATE_FILENAME);
    let content = match fs::read_to_string(&path) {
        Ok(text) => text,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            return HashMap::new();
        }
        Err(err) => {
            porter_warn!("store: failed to read {:?}: {}", path, err);
            return HashMap::new();
        }
    };

    let panel: PersistedPanel = match ron::from_str(&content) {
        Ok(panel) => panel,
        Err(err) => {
            porter_warn!("store: failed to parse {:?}: {}", path, err);
            return HashMap::new();
        }
    };

    let mut values = HashMap::new();
    for (name, value) in panel.attributes {
        match StateKey::ALL.iter().find(|key| key.as_str() == name) {
            Some(key) => {
                values.insert(*key, value);
            }
            None => {
                porter_warn!("store: ignoring unknown attribute {:?} in {:?}", name, path);
            }
        }
    }

    porter_info!("store: loaded panel state from {:?}", path);
    values
}

/// Write content to `{dir}/{filename}` via a temp file and rename.
fn write_atomic(dir: &Path, filename: &str, content: &str) -> io::Result<PathBuf> {
    fs::create_dir_all(dir)?;

    let target = dir.join(filename);
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(content.as_bytes())?;
    tmp.flush()?;
    tmp.as_file_mut().sync_all()?;

    // Replace any existing file before the rename.
    if target.exists() {
        fs::remove_file(&target)?;
    }
    tmp.persist(&target).map_err(|e| e.error)?;
    Ok(target)
}
