use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::Write;
use std::sync::{Mutex, MutexGuard};

use camino::{Utf8Path, Utf8PathBuf};
use directories::BaseDirs;
use serde::{Deserialize, Serialize};

use crate::domain::{ApiKey, SeriesId, VolumeId};
use crate::error::UpcomingError;

pub const API_KEY: &str = "comicvine_api_key";
pub const VOLUME_PREFIX: &str = "volume_";
const NO_VOLUME: i64 = -1;

/// Durable string/int settings storage.
pub trait KeyValueStore: Send + Sync {
    fn get_string(&self, key: &str) -> Option<String>;
    fn set_string(&self, key: &str, value: &str) -> Result<(), UpcomingError>;
    fn get_int(&self, key: &str) -> Option<i64>;
    fn set_int(&self, key: &str, value: i64) -> Result<(), UpcomingError>;
    fn remove(&self, key: &str) -> Result<(), UpcomingError>;
    /// Removes every key starting with `prefix` and returns how many were removed.
    fn delete_keys_with_prefix(&self, prefix: &str) -> Result<usize, UpcomingError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
enum StoredValue {
    Int(i64),
    Text(String),
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Settings kept in a single JSON object file, rewritten atomically on every change.
#[derive(Debug)]
pub struct JsonFileStore {
    path: Utf8PathBuf,
    values: Mutex<BTreeMap<String, StoredValue>>,
}

impl JsonFileStore {
    pub fn open(path: Utf8PathBuf) -> Result<Self, UpcomingError> {
        let values = Self::load(&path)?;
        Ok(Self {
            path,
            values: Mutex::new(values),
        })
    }

    /// Like [`open`](Self::open), but an unreadable or corrupt file is
    /// replaced with an empty one.
    pub fn open_recovering(path: Utf8PathBuf) -> Result<Self, UpcomingError> {
        match Self::load(&path) {
            Ok(values) => Ok(Self {
                path,
                values: Mutex::new(values),
            }),
            Err(err) => {
                tracing::warn!(%path, error = %err, "resetting unreadable preferences file");
                let store = Self {
                    path,
                    values: Mutex::new(BTreeMap::new()),
                };
                store.persist(&BTreeMap::new())?;
                Ok(store)
            }
        }
    }

    fn load(path: &Utf8Path) -> Result<BTreeMap<String, StoredValue>, UpcomingError> {
        if !path.as_std_path().exists() {
            return Ok(BTreeMap::new());
        }
        let content = fs::read_to_string(path.as_std_path())
            .map_err(|err| UpcomingError::Store(format!("read {path}: {err}")))?;
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&content)
            .map_err(|err| UpcomingError::Store(format!("parse {path}: {err}")))
    }

    pub fn default_path() -> Result<Utf8PathBuf, UpcomingError> {
        BaseDirs::new()
            .and_then(|dirs| {
                Utf8PathBuf::from_path_buf(
                    dirs.config_dir()
                        .join("comicvine-upcoming")
                        .join("preferences.json"),
                )
                .ok()
            })
            .ok_or_else(|| UpcomingError::Store("unable to resolve config directory".to_string()))
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    fn persist(&self, values: &BTreeMap<String, StoredValue>) -> Result<(), UpcomingError> {
        let parent = self
            .path
            .parent()
            .filter(|parent| !parent.as_str().is_empty())
            .unwrap_or(Utf8Path::new("."));
        fs::create_dir_all(parent.as_std_path())
            .map_err(|err| UpcomingError::Store(err.to_string()))?;
        let content =
            serde_json::to_vec_pretty(values).map_err(|err| UpcomingError::Store(err.to_string()))?;
        let mut temp = tempfile::Builder::new()
            .prefix(".preferences")
            .tempfile_in(parent.as_std_path())
            .map_err(|err| UpcomingError::Store(err.to_string()))?;
        temp.write_all(&content)
            .map_err(|err| UpcomingError::Store(err.to_string()))?;
        temp.persist(self.path.as_std_path())
            .map_err(|err| UpcomingError::Store(err.to_string()))?;
        Ok(())
    }

    fn update<F>(&self, change: F) -> Result<usize, UpcomingError>
    where
        F: FnOnce(&mut BTreeMap<String, StoredValue>) -> usize,
    {
        let mut values = lock(&self.values);
        let mut next = values.clone();
        let changed = change(&mut next);
        if changed > 0 {
            self.persist(&next)?;
            *values = next;
        }
        Ok(changed)
    }
}

impl KeyValueStore for JsonFileStore {
    fn get_string(&self, key: &str) -> Option<String> {
        match lock(&self.values).get(key) {
            Some(StoredValue::Text(value)) => Some(value.clone()),
            _ => None,
        }
    }

    fn set_string(&self, key: &str, value: &str) -> Result<(), UpcomingError> {
        self.update(|values| {
            values.insert(key.to_string(), StoredValue::Text(value.to_string()));
            1
        })?;
        Ok(())
    }

    fn get_int(&self, key: &str) -> Option<i64> {
        match lock(&self.values).get(key) {
            Some(StoredValue::Int(value)) => Some(*value),
            _ => None,
        }
    }

    fn set_int(&self, key: &str, value: i64) -> Result<(), UpcomingError> {
        self.update(|values| {
            values.insert(key.to_string(), StoredValue::Int(value));
            1
        })?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), UpcomingError> {
        self.update(|values| usize::from(values.remove(key).is_some()))?;
        Ok(())
    }

    fn delete_keys_with_prefix(&self, prefix: &str) -> Result<usize, UpcomingError> {
        self.update(|values| {
            let before = values.len();
            values.retain(|key, _| !key.starts_with(prefix));
            before - values.len()
        })
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, StoredValue>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get_string(&self, key: &str) -> Option<String> {
        match lock(&self.values).get(key) {
            Some(StoredValue::Text(value)) => Some(value.clone()),
            _ => None,
        }
    }

    fn set_string(&self, key: &str, value: &str) -> Result<(), UpcomingError> {
        lock(&self.values).insert(key.to_string(), StoredValue::Text(value.to_string()));
        Ok(())
    }

    fn get_int(&self, key: &str) -> Option<i64> {
        match lock(&self.values).get(key) {
            Some(StoredValue::Int(value)) => Some(*value),
            _ => None,
        }
    }

    fn set_int(&self, key: &str, value: i64) -> Result<(), UpcomingError> {
        lock(&self.values).insert(key.to_string(), StoredValue::Int(value));
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), UpcomingError> {
        lock(&self.values).remove(key);
        Ok(())
    }

    fn delete_keys_with_prefix(&self, prefix: &str) -> Result<usize, UpcomingError> {
        let mut values = lock(&self.values);
        let before = values.len();
        values.retain(|key, _| !key.starts_with(prefix));
        Ok(before - values.len())
    }
}

/// Typed view over a [`KeyValueStore`]: the API key and the per-series volume cache.
#[derive(Debug)]
pub struct Preferences<S: KeyValueStore> {
    store: S,
}

impl<S: KeyValueStore> Preferences<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn api_key(&self) -> Option<ApiKey> {
        self.store
            .get_string(API_KEY)
            .and_then(|value| value.parse().ok())
    }

    pub fn require_api_key(&self) -> Result<ApiKey, UpcomingError> {
        self.api_key().ok_or(UpcomingError::MissingApiKey)
    }

    pub fn set_api_key(&self, key: &ApiKey) -> Result<(), UpcomingError> {
        self.store.set_string(API_KEY, key.as_str())
    }

    pub fn clear_api_key(&self) -> Result<(), UpcomingError> {
        self.store.remove(API_KEY)
    }

    pub fn cached_volume(&self, series: SeriesId) -> Option<VolumeId> {
        self.store
            .get_int(&volume_key(series))
            .filter(|value| *value != NO_VOLUME)
            .map(VolumeId::new)
    }

    pub fn set_cached_volume(&self, series: SeriesId, volume: VolumeId) -> Result<(), UpcomingError> {
        self.store.set_int(&volume_key(series), volume.get())
    }

    pub fn clear_volume_cache(&self) -> Result<usize, UpcomingError> {
        self.store.delete_keys_with_prefix(VOLUME_PREFIX)
    }
}

fn volume_key(series: SeriesId) -> String {
    format!("{VOLUME_PREFIX}{series}")
}
