//! Live and trashed record persistence.
//!
//! Layout under the state root (`~/.sinaraml` by default):
//! `servers/<instanceName>.json` for live records and
//! `trash/<instanceName>.<YYYYMMDD-HHMMSS>.json` for trashed ones. The
//! timestamp suffix makes repeated removals of the same instance name
//! distinct trash entries; it is the only collision-avoidance mechanism,
//! adequate because trash events within one process are sequential.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDateTime};
use tracing::debug;

use sinara_core::error::{Result, SinaraError};
use sinara_core::sinara_warning;

use crate::record::ServerRecord;

pub const TRASH_TIMESTAMP_FORMAT: &str = "%Y%m%d-%H%M%S";

const STATE_DIR_NAME: &str = ".sinaraml";
const SERVERS_DIR_NAME: &str = "servers";
const TRASH_DIR_NAME: &str = "trash";

fn default_state_root() -> Result<PathBuf> {
    dirs::home_dir()
        .map(|home| home.join(STATE_DIR_NAME))
        .ok_or_else(|| SinaraError::Config("Cannot determine the home directory".to_string()))
}

/// Per-instance store for the live configuration record.
#[derive(Debug, Clone)]
pub struct ServerConfigStore {
    state_root: PathBuf,
    instance_name: String,
}

impl ServerConfigStore {
    pub fn new(instance_name: &str) -> Result<Self> {
        Ok(Self::with_state_root(instance_name, default_state_root()?))
    }

    pub fn with_state_root(instance_name: &str, state_root: PathBuf) -> Self {
        Self {
            state_root,
            instance_name: instance_name.to_string(),
        }
    }

    /// Path of the live record; stored as the `sinaraml.config.path`
    /// container label so a running server points back at its own config.
    pub fn config_path(&self) -> PathBuf {
        self.state_root
            .join(SERVERS_DIR_NAME)
            .join(format!("{}.json", self.instance_name))
    }

    /// Write the record durably, overwriting any previous live record for
    /// this instance name.
    pub fn save(&self, record: &ServerRecord) -> Result<()> {
        let path = self.config_path();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(record)?;
        fs::write(&path, json)?;
        debug!(path = %path.display(), "saved server config");
        Ok(())
    }

    /// Move the live record into the trash namespace with the current
    /// timestamp embedded in the file name, returning the new location.
    ///
    /// Removing a server that has no live record is not an error: the
    /// operation logs and returns `None` so `remove` stays idempotent.
    pub fn trash(&self) -> Result<Option<PathBuf>> {
        let live = self.config_path();
        if !live.exists() {
            sinara_warning!(
                "No saved config found for server {}, nothing to move to trash",
                self.instance_name
            );
            return Ok(None);
        }

        let trash_dir = self.state_root.join(TRASH_DIR_NAME);
        fs::create_dir_all(&trash_dir)?;
        let timestamp = Local::now().format(TRASH_TIMESTAMP_FORMAT);
        let trashed = trash_dir.join(format!("{}.{}.json", self.instance_name, timestamp));
        fs::rename(&live, &trashed)?;
        debug!(path = %trashed.display(), "trashed server config");
        Ok(Some(trashed))
    }
}

/// Process-wide view over all trashed records.
#[derive(Debug, Clone)]
pub struct GlobalConfigStore {
    state_root: PathBuf,
}

impl GlobalConfigStore {
    pub fn new() -> Result<Self> {
        Ok(Self::with_state_root(default_state_root()?))
    }

    pub fn with_state_root(state_root: PathBuf) -> Self {
        Self { state_root }
    }

    /// All trashed records keyed by `<instanceName>.<timestamp>`. The
    /// same instance name may appear once per removal. Files whose names
    /// do not carry a parseable timestamp are not trash records and are
    /// skipped silently.
    pub fn trashed_servers(&self) -> Result<BTreeMap<String, PathBuf>> {
        let trash_dir = self.state_root.join(TRASH_DIR_NAME);
        let mut result = BTreeMap::new();
        if !trash_dir.is_dir() {
            return Ok(result);
        }
        for entry in fs::read_dir(&trash_dir)? {
            let entry = entry?;
            let path = entry.path();
            let Some(key) = path
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(|n| n.strip_suffix(".json"))
            else {
                continue;
            };
            if Self::removal_time(key).is_none() {
                continue;
            }
            result.insert(key.to_string(), path);
        }
        Ok(result)
    }

    /// Parse the removal timestamp back out of a trash key.
    pub fn removal_time(trash_key: &str) -> Option<NaiveDateTime> {
        let suffix = trash_key.rsplit('.').next()?;
        NaiveDateTime::parse_from_str(suffix, TRASH_TIMESTAMP_FORMAT).ok()
    }

    /// Read one record back. Callers enumerating many records isolate
    /// failures per record instead of aborting the batch.
    pub fn load_record(path: &Path) -> Result<ServerRecord> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{ContainerSpec, MountSpec, ServerCmd};
    use std::collections::BTreeMap;

    fn sample_record(name: &str) -> ServerRecord {
        ServerRecord::new(
            ServerCmd {
                script: "sinara".to_string(),
                args: format!("server create --instanceName={name}"),
                calculated_args: format!("server create --instanceName={name} --runMode=q"),
            },
            ContainerSpec {
                image: "buslovaev/sinara-notebook".to_string(),
                versioned_image: "buslovaev/sinara-notebook:20240101".to_string(),
                command: "start-notebook.sh".to_string(),
                working_dir: "/home/jovyan/work".to_string(),
                name: name.to_string(),
                mem_limit_bytes: 6 * 1024 * 1024 * 1024,
                cpu_limit: 4,
                shm_size_bytes: 1024 * 1024 * 1024,
                gpu_enabled: false,
                ports: BTreeMap::from([(8888, 8888)]),
                mounts: vec![MountSpec::volume(format!("jovyan-data-{name}"), "/data")],
                environment: BTreeMap::new(),
                labels: BTreeMap::new(),
            },
        )
    }

    #[test]
    fn test_save_then_trash_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = ServerConfigStore::with_state_root("test1", dir.path().to_path_buf());
        let record = sample_record("test1");

        let before = Local::now().naive_local();
        store.save(&record).unwrap();
        let trashed = store.trash().unwrap().expect("record should be trashed");
        let after = Local::now().naive_local();

        assert!(!store.config_path().exists());
        assert!(trashed.exists());

        let global = GlobalConfigStore::with_state_root(dir.path().to_path_buf());
        let trashed_servers = global.trashed_servers().unwrap();
        assert_eq!(trashed_servers.len(), 1);

        let (key, path) = trashed_servers.iter().next().unwrap();
        assert!(key.starts_with("test1."));
        let removal = GlobalConfigStore::removal_time(key).unwrap();
        // Second precision, so allow the window boundaries themselves
        assert!(removal >= before - chrono::Duration::seconds(1));
        assert!(removal <= after + chrono::Duration::seconds(1));

        let loaded = GlobalConfigStore::load_record(path).unwrap();
        assert_eq!(loaded, record);
    }

    #[test]
    fn test_trash_without_live_record_is_silent() {
        let dir = tempfile::tempdir().unwrap();
        let store = ServerConfigStore::with_state_root("gone", dir.path().to_path_buf());
        assert!(store.trash().unwrap().is_none());

        let global = GlobalConfigStore::with_state_root(dir.path().to_path_buf());
        assert!(global.trashed_servers().unwrap().is_empty());
    }

    #[test]
    fn test_save_overwrites_live_record() {
        let dir = tempfile::tempdir().unwrap();
        let store = ServerConfigStore::with_state_root("test1", dir.path().to_path_buf());
        store.save(&sample_record("test1")).unwrap();

        let mut updated = sample_record("test1");
        updated.container.cpu_limit = 2;
        store.save(&updated).unwrap();

        let loaded = GlobalConfigStore::load_record(&store.config_path()).unwrap();
        assert_eq!(loaded.container.cpu_limit, 2);
    }

    #[test]
    fn test_listing_skips_files_without_timestamp() {
        let dir = tempfile::tempdir().unwrap();
        let trash_dir = dir.path().join("trash");
        fs::create_dir_all(&trash_dir).unwrap();
        fs::write(trash_dir.join("notes.json"), b"{}").unwrap();
        fs::write(trash_dir.join("test1.20240301-101500.json"), b"{}").unwrap();

        let global = GlobalConfigStore::with_state_root(dir.path().to_path_buf());
        let trashed = global.trashed_servers().unwrap();
        assert_eq!(trashed.len(), 1);
        assert!(trashed.contains_key("test1.20240301-101500"));
    }

    #[test]
    fn test_corrupt_record_fails_in_isolation() {
        let dir = tempfile::tempdir().unwrap();
        let trash_dir = dir.path().join("trash");
        fs::create_dir_all(&trash_dir).unwrap();
        fs::write(trash_dir.join("bad.20240301-101500.json"), b"not json").unwrap();

        let global = GlobalConfigStore::with_state_root(dir.path().to_path_buf());
        let trashed = global.trashed_servers().unwrap();
        // Listing succeeds; only loading the record reports the problem
        assert_eq!(trashed.len(), 1);
        let path = trashed.values().next().unwrap();
        assert!(GlobalConfigStore::load_record(path).is_err());
    }
}
