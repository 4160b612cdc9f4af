// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 Fichapack Authors

//! Whole-mapping persistence for patient records.
//!
//! The store keeps a single JSON object mapping canonical RUTs to
//! records, behind an injected raw key-value backend. Every operation
//! round-trips through the backend (no in-memory cache), and saves
//! replace the persisted mapping wholesale. Single-writer semantics:
//! concurrent writers race and the last save wins.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::models::PatientRecord;

/// Namespace key of the persisted mapping; used as the default file
/// stem by the file backend.
pub const STORE_KEY: &str = "fichas_medicas_v1";

/// Environment variable overriding the store file location.
pub const STORE_PATH_ENV: &str = "FICHAPACK_STORE";

/// Raw text storage the record store persists through.
///
/// Injectable so the core can run headless against an in-memory
/// backend in tests.
pub trait StorageBackend: Send + Sync {
    /// Read the persisted text, `None` when nothing was ever saved.
    fn load_raw(&self) -> Result<Option<String>>;
    /// Replace the persisted text.
    fn save_raw(&self, text: &str) -> Result<()>;
}

/// File-based backend storing the mapping as a single JSON document.
pub struct JsonFileBackend {
    path: PathBuf,
}

impl JsonFileBackend {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Resolve the store path from [`STORE_PATH_ENV`], falling back to
    /// `fichas_medicas_v1.json` in the working directory.
    pub fn from_env() -> Self {
        let path = std::env::var_os(STORE_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(format!("{STORE_KEY}.json")));
        Self::new(path)
    }
}

impl StorageBackend for JsonFileBackend {
    fn load_raw(&self) -> Result<Option<String>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let text = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read record store {:?}", self.path))?;
        Ok(Some(text))
    }

    fn save_raw(&self, text: &str) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create store directory {:?}", parent))?;
        }
        std::fs::write(&self.path, text)
            .with_context(|| format!("Failed to write record store {:?}", self.path))
    }
}

/// In-memory backend for headless use and tests.
#[derive(Default)]
pub struct MemoryBackend {
    text: Mutex<Option<String>>,
}

impl MemoryBackend {
    /// Backend pre-seeded with raw persisted text.
    pub fn seeded(text: impl Into<String>) -> Self {
        Self {
            text: Mutex::new(Some(text.into())),
        }
    }
}

impl StorageBackend for MemoryBackend {
    fn load_raw(&self) -> Result<Option<String>> {
        Ok(self
            .text
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone())
    }

    fn save_raw(&self, text: &str) -> Result<()> {
        *self
            .text
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = Some(text.to_string());
        Ok(())
    }
}

/// Record mapping persistence over a [`StorageBackend`].
pub struct RecordStore<B> {
    backend: B,
}

impl<B: StorageBackend> RecordStore<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// Load the full mapping from the backend.
    ///
    /// Fails closed: an absent, unreadable, or unparsable store is
    /// treated as empty rather than an error. A corrupted file must not
    /// lock the user out of the application; the recovery is logged so
    /// it stays observable.
    pub fn load_all(&self) -> BTreeMap<String, PatientRecord> {
        let raw = match self.backend.load_raw() {
            Ok(Some(text)) => text,
            Ok(None) => return BTreeMap::new(),
            Err(err) => {
                warn!("record store unreadable, treating as empty: {err:#}");
                return BTreeMap::new();
            }
        };

        match serde_json::from_str(&raw) {
            Ok(records) => records,
            Err(err) => {
                warn!("record store content malformed, treating as empty: {err}");
                BTreeMap::new()
            }
        }
    }

    /// Serialize and persist the full mapping, replacing prior contents.
    pub fn save_all(&self, records: &BTreeMap<String, PatientRecord>) -> Result<()> {
        let text =
            serde_json::to_string(records).context("Failed to serialize record store")?;
        self.backend.save_raw(&text)?;
        debug!(count = records.len(), "record store saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MaritalStatus;
    use tempfile::TempDir;

    fn sample(rut: &str, last_names: &str) -> PatientRecord {
        PatientRecord {
            rut: rut.to_string(),
            first_names: "Ana".into(),
            last_names: last_names.into(),
            address: "Calle A 123".into(),
            city: "Santiago".into(),
            phone: "+56912345678".into(),
            email: "ana@correo.cl".into(),
            birth_date: "1995-01-01".into(),
            age: Some(31),
            marital_status: MaritalStatus::Single,
            comments: "test".into(),
            created_at: "2026-08-26T12:00:00Z".into(),
        }
    }

    #[test]
    fn missing_file_loads_as_empty() {
        let tmp = TempDir::new().unwrap();
        let store = RecordStore::new(JsonFileBackend::new(tmp.path().join("absent.json")));
        assert!(store.load_all().is_empty());
    }

    #[test]
    fn corrupt_content_loads_as_empty() {
        let store = RecordStore::new(MemoryBackend::seeded("{not json"));
        assert!(store.load_all().is_empty());
    }

    #[test]
    fn save_then_load_round_trips_through_a_file() {
        let tmp = TempDir::new().unwrap();
        let store = RecordStore::new(JsonFileBackend::new(tmp.path().join("store.json")));

        let mut records = BTreeMap::new();
        records.insert("111111111".to_string(), sample("111111111", "Pérez"));
        records.insert("222222222".to_string(), sample("222222222", "Gómez"));
        store.save_all(&records).unwrap();

        assert_eq!(store.load_all(), records);
    }

    #[test]
    fn save_replaces_prior_contents_wholesale() {
        let store = RecordStore::new(MemoryBackend::default());

        let mut first = BTreeMap::new();
        first.insert("111111111".to_string(), sample("111111111", "Pérez"));
        store.save_all(&first).unwrap();

        let mut second = BTreeMap::new();
        second.insert("222222222".to_string(), sample("222222222", "Gómez"));
        store.save_all(&second).unwrap();

        let loaded = store.load_all();
        assert_eq!(loaded.len(), 1);
        assert!(loaded.contains_key("222222222"));
    }

    #[test]
    fn file_backend_creates_missing_parent_directories() {
        let tmp = TempDir::new().unwrap();
        let nested = tmp.path().join("data").join("store.json");
        let store = RecordStore::new(JsonFileBackend::new(nested.clone()));

        store.save_all(&BTreeMap::new()).unwrap();

        assert!(nested.exists());
    }
}
