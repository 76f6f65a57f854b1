//! Last-entered form values, keyed by verb and resource path.
//!
//! # Design
//! Raw storage is a [`StorageArea`]: string keys to string values, fallible,
//! shared through `&self`. [`PersistenceStore`] wraps an area and applies the
//! form policy on top:
//! - `load` never fails. Missing, unreadable, or undecodable entries all
//!   read as an empty object.
//! - `save` skips empty values so an interaction with no data (a stray click
//!   anywhere on the page) cannot erase a previously saved entry.
//!
//! Entries are never deleted by this crate; they accumulate until the area
//! is cleared externally.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::{Mutex, RwLock};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::StoreError;
use crate::http::HttpMethod;

/// Key-value storage holding JSON-encoded strings.
pub trait StorageArea {
    fn get_item(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set_item(&self, key: &str, value: String) -> Result<(), StoreError>;
}

/// In-memory storage area.
#[derive(Debug, Default)]
pub struct MemoryArea {
    map: RwLock<BTreeMap<String, String>>,
}

impl MemoryArea {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.map.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.read().is_empty()
    }
}

impl StorageArea for MemoryArea {
    fn get_item(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.map.read().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: String) -> Result<(), StoreError> {
        self.map.write().insert(key.to_string(), value);
        Ok(())
    }
}

/// Storage area backed by one JSON object file, so entries survive across
/// sessions. The file is created on first write; an undecodable file is
/// moved aside to `<name>.corrupt` by the next write.
#[derive(Debug)]
pub struct FileArea {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileArea {
    pub fn open<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<Map<String, Value>, StoreError> {
        if !self.path.exists() {
            return Ok(Map::new());
        }
        let raw = fs::read_to_string(&self.path)?;
        if raw.trim().is_empty() {
            return Ok(Map::new());
        }
        Ok(serde_json::from_str(&raw)?)
    }
}

impl StorageArea for FileArea {
    fn get_item(&self, key: &str) -> Result<Option<String>, StoreError> {
        let _guard = self.lock.lock();
        let entries = self.read_all()?;
        Ok(entries.get(key).and_then(Value::as_str).map(str::to_string))
    }

    fn set_item(&self, key: &str, value: String) -> Result<(), StoreError> {
        let _guard = self.lock.lock();
        let mut entries = match self.read_all() {
            Ok(entries) => entries,
            Err(StoreError::Encoding(err)) => {
                let aside = self.path.with_extension("corrupt");
                warn!(path = %self.path.display(), error = %err, "storage file corrupt, moving it aside");
                fs::rename(&self.path, &aside)?;
                Map::new()
            }
            Err(err) => return Err(err),
        };
        entries.insert(key.to_string(), Value::String(value));
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(&entries)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

/// User interactions that trigger a save. All of them behave the same; the
/// exact change cannot always be isolated from the widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interaction {
    Change,
    Blur,
    Click,
}

/// Storage key for a form: `"VERB path"`, or `path` alone for single-verb
/// forms.
pub fn storage_key(verb: Option<HttpMethod>, path: &str) -> String {
    match verb {
        Some(verb) => format!("{verb} {path}"),
        None => path.to_string(),
    }
}

/// Whether `value` carries no data worth persisting.
pub fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
    }
}

#[derive(Debug, Default)]
pub struct PersistenceStore<A> {
    area: A,
}

impl<A: StorageArea> PersistenceStore<A> {
    pub fn new(area: A) -> Self {
        Self { area }
    }

    pub fn area(&self) -> &A {
        &self.area
    }

    /// Last saved value under `key`, or an empty object.
    pub fn load(&self, key: &str) -> Value {
        let raw = match self.area.get_item(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Value::Object(Map::new()),
            Err(err) => {
                warn!(%key, error = %err, "persisted form data unreadable, starting empty");
                return Value::Object(Map::new());
            }
        };
        match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(err) => {
                warn!(%key, error = %err, "persisted form data is not JSON, starting empty");
                Value::Object(Map::new())
            }
        }
    }

    /// Store `value` under `key` unless it is empty. Returns whether an entry
    /// was written.
    pub fn save(&self, key: &str, value: &Value) -> bool {
        if is_empty_value(value) {
            return false;
        }
        let encoded = value.to_string();
        match self.area.set_item(key, encoded) {
            Ok(()) => {
                debug!(%key, "form data persisted");
                true
            }
            Err(err) => {
                warn!(%key, error = %err, "failed to persist form data");
                false
            }
        }
    }
}
