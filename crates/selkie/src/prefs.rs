#![forbid(unsafe_code)]

//! Persistent user preferences behind a minimal get/set-by-key interface.
//!
//! The core only touches the store at startup (to load the last-used export settings)
//! and on explicit save; everything else is the embedder's business. Absence of a
//! stored value is never an error.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub const EXPORT_SCALE_KEY: &str = "export.scale";
pub const EXPORT_TRANSPARENT_KEY: &str = "export.transparentBackground";

pub trait PreferenceStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str);
}

#[derive(Debug, Default)]
pub struct MemoryPreferenceStore {
    values: HashMap<String, String>,
}

impl MemoryPreferenceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferenceStore for MemoryPreferenceStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) {
        self.values.insert(key.to_string(), value.to_string());
    }
}

/// File-backed store: one flat JSON object. Loading is best-effort (a missing or
/// garbled file yields an empty store); writing happens only on explicit [`flush`].
///
/// [`flush`]: JsonFilePreferenceStore::flush
#[derive(Debug)]
pub struct JsonFilePreferenceStore {
    path: PathBuf,
    values: serde_json::Map<String, serde_json::Value>,
}

impl JsonFilePreferenceStore {
    pub fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let values = std::fs::read_to_string(&path)
            .ok()
            .and_then(|text| serde_json::from_str::<serde_json::Value>(&text).ok())
            .and_then(|value| match value {
                serde_json::Value::Object(map) => Some(map),
                _ => None,
            })
            .unwrap_or_default();
        Self { path, values }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn flush(&self) -> std::io::Result<()> {
        let json = serde_json::Value::Object(self.values.clone());
        std::fs::write(&self.path, serde_json::to_string_pretty(&json)?)
    }
}

impl PreferenceStore for JsonFilePreferenceStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values
            .get(key)
            .and_then(|v| v.as_str())
            .map(str::to_string)
    }

    fn set(&mut self, key: &str, value: &str) {
        self.values
            .insert(key.to_string(), serde_json::Value::String(value.into()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_round_trips() {
        let mut store = MemoryPreferenceStore::new();
        assert_eq!(store.get("export.scale"), None);
        store.set("export.scale", "2");
        assert_eq!(store.get("export.scale").as_deref(), Some("2"));
    }

    #[test]
    fn file_store_survives_missing_and_garbled_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.json");

        let store = JsonFilePreferenceStore::open(&path);
        assert_eq!(store.get(EXPORT_SCALE_KEY), None);

        std::fs::write(&path, "not json").unwrap();
        let store = JsonFilePreferenceStore::open(&path);
        assert_eq!(store.get(EXPORT_SCALE_KEY), None);
    }

    #[test]
    fn file_store_flushes_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.json");

        let mut store = JsonFilePreferenceStore::open(&path);
        store.set(EXPORT_SCALE_KEY, "2.5");
        store.set(EXPORT_TRANSPARENT_KEY, "true");
        store.flush().unwrap();

        let reloaded = JsonFilePreferenceStore::open(&path);
        assert_eq!(reloaded.get(EXPORT_SCALE_KEY).as_deref(), Some("2.5"));
        assert_eq!(reloaded.get(EXPORT_TRANSPARENT_KEY).as_deref(), Some("true"));
    }
}
