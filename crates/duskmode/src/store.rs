//! Preference persistence.
//!
//! The resolver persists a single string (the [`ThemeSetting`](crate::ThemeSetting)
//! name) under a fixed key. [`PreferenceStore`] abstracts the key-value store so
//! the same resolver runs against browser-like local storage, a file on disk,
//! or an in-memory map in tests.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::error::StoreError;

/// Key the current format is stored under.
pub const DEFAULT_STORAGE_KEY: &str = "theme";

/// Key earlier revisions stored a `"true"`/`"false"` dark flag under.
pub const LEGACY_STORAGE_KEY: &str = "dark";

/// Durable string key-value storage.
pub trait PreferenceStore {
    /// Returns the value stored under `key`, if any.
    fn get(&self, key: &str) -> Option<String>;

    /// Stores `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

impl<S: PreferenceStore + ?Sized> PreferenceStore for Rc<S> {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        (**self).set(key, value)
    }
}

/// In-memory store.
///
/// Clones share the same map, so a test can keep one handle for inspection
/// while the resolver owns another.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: Rc<RefCell<HashMap<String, String>>>,
    writes: Rc<Cell<usize>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a value without counting it as a write.
    pub fn with_value(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.borrow_mut().insert(key.into(), value.into());
        self
    }

    /// Number of [`set`](PreferenceStore::set) calls so far.
    pub fn writes(&self) -> usize {
        self.writes.get()
    }
}

impl PreferenceStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.borrow().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.values
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        self.writes.set(self.writes.get() + 1);
        Ok(())
    }
}

/// Store backed by a JSON object of strings in a single file.
///
/// Every call goes to disk, so separate instances pointing at the same path
/// observe each other's writes. A missing file reads as empty.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<BTreeMap<String, String>, StoreError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(source) => {
                return Err(StoreError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }

        serde_json::from_str(&content).map_err(|e| StoreError::Format {
            path: self.path.clone(),
            message: e.to_string(),
        })
    }
}

impl PreferenceStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<String> {
        match self.load() {
            Ok(mut values) => values.remove(key),
            Err(e) => {
                tracing::warn!("ignoring unreadable preference file: {}", e);
                None
            }
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        // An unreadable file is replaced rather than blocking every write.
        let mut values = self.load().unwrap_or_else(|e| {
            tracing::warn!("overwriting unreadable preference file: {}", e);
            BTreeMap::new()
        });
        values.insert(key.to_string(), value.to_string());

        let io_error = |source: io::Error| StoreError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_error)?;
        }

        let content = serde_json::to_string_pretty(&values).map_err(|e| StoreError::Format {
            path: self.path.clone(),
            message: e.to_string(),
        })?;
        fs::write(&self.path, content).map_err(io_error)?;

        tracing::debug!(key, value, path = %self.path.display(), "persisted preference");
        Ok(())
    }
}
