//! JSON-file registry store

use crate::error::{RegistryError, Result};
use crate::lock::RegistryLock;
use botfleet_types::{BotEntry, Registry, StackSettings};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// File-backed registry.
///
/// Reads are lenient: a missing or unparseable file yields the default
/// registry so that listing and creation keep working. Writes are atomic.
#[derive(Debug, Clone)]
pub struct RegistryStore {
    path: PathBuf,
}

impl RegistryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Registry file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory the registry lives in; relative data roots resolve against it
    pub fn project_root(&self) -> PathBuf {
        match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    /// Absolute-or-relative bot directory for `name`
    pub fn bot_dir(&self, stack: &StackSettings, name: &str) -> PathBuf {
        let data_root = Path::new(&stack.data_root);
        if data_root.is_absolute() {
            data_root.join(name)
        } else {
            self.project_root().join(data_root).join(name)
        }
    }

    fn lock_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".lock");
        PathBuf::from(name)
    }

    /// Load the registry, falling back to defaults on any read or parse failure.
    pub fn load(&self) -> Registry {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Registry::default(),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Cannot read registry, using defaults");
                return Registry::default();
            }
        };

        match serde_json::from_str(&raw) {
            Ok(registry) => registry,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Malformed registry, using defaults");
                Registry::default()
            }
        }
    }

    /// Write the whole document (pretty JSON, trailing newline) via temp + rename.
    pub fn save(&self, registry: &Registry) -> Result<()> {
        let mut body = serde_json::to_string_pretty(registry)?;
        body.push('\n');

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| RegistryError::io(parent, e))?;
            }
        }

        let mut tmp = self.path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        fs::write(&tmp, body).map_err(|e| RegistryError::io(&tmp, e))?;
        fs::rename(&tmp, &self.path).map_err(|e| RegistryError::io(&self.path, e))?;

        tracing::debug!(path = %self.path.display(), bots = registry.bots.len(), "Saved registry");
        Ok(())
    }

    /// Locked read-modify-write. The document is only rewritten when `f`
    /// actually changed it.
    pub fn update<T>(&self, f: impl FnOnce(&mut Registry) -> T) -> Result<T> {
        let _lock = RegistryLock::acquire(&self.lock_path())?;
        let before = self.load();
        let mut registry = before.clone();
        let out = f(&mut registry);
        if registry != before {
            self.save(&registry)?;
        }
        Ok(out)
    }

    pub fn find(&self, name: &str) -> Option<BotEntry> {
        self.load().find(name).cloned()
    }

    /// Add an entry; returns `false` (and writes nothing) on a duplicate name
    pub fn add(&self, entry: BotEntry) -> Result<bool> {
        self.update(|registry| registry.add(entry))
    }

    pub fn remove(&self, name: &str) -> Result<bool> {
        self.update(|registry| registry.remove(name))
    }

    /// Replace the entry with the same name; returns `false` if absent
    pub fn replace(&self, entry: BotEntry) -> Result<bool> {
        self.update(|registry| registry.replace(entry))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use botfleet_types::PortAssignment;
    use chrono::NaiveDate;

    fn entry(name: &str, slot: u32) -> BotEntry {
        BotEntry::new(
            name,
            "anthropic",
            "anthropic/claude-sonnet-4-5",
            PortAssignment::for_slot(19000, slot),
            NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
        )
    }

    fn store() -> (tempfile::TempDir, RegistryStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = RegistryStore::new(dir.path().join("botfleet.json"));
        (dir, store)
    }

    #[test]
    fn test_missing_file_loads_default() {
        let (_dir, store) = store();
        let registry = store.load();
        assert!(registry.bots.is_empty());
        assert_eq!(registry.stack.base_port, 19000);
    }

    #[test]
    fn test_malformed_file_loads_default() {
        let (_dir, store) = store();
        fs::write(store.path(), "{ not json").unwrap();
        assert_eq!(store.load(), Registry::default());
    }

    #[test]
    fn test_add_find_remove() {
        let (_dir, store) = store();
        assert!(store.add(entry("nova", 0)).unwrap());
        assert!(!store.add(entry("nova", 1)).unwrap());

        let found = store.find("nova").unwrap();
        assert_eq!(found.port_slot, 0);

        assert!(store.remove("nova").unwrap());
        assert!(!store.remove("nova").unwrap());
        assert!(store.find("nova").is_none());
    }

    #[test]
    fn test_save_is_pretty_with_trailing_newline() {
        let (_dir, store) = store();
        store.add(entry("nova", 0)).unwrap();
        let raw = fs::read_to_string(store.path()).unwrap();
        assert!(raw.ends_with("}\n"));
        assert!(raw.contains("\n  \"stack\""));
        assert!(!store.path().with_extension("json.tmp").exists());
    }

    #[test]
    fn test_unchanged_update_does_not_write() {
        let (_dir, store) = store();
        store.update(|_| ()).unwrap();
        assert!(!store.path().exists());
    }

    #[test]
    fn test_unknown_fields_survive_update() {
        let (_dir, store) = store();
        fs::write(
            store.path(),
            r#"{"version":1,"owner":"ops","stack":{"namespace":"lab"},"bots":[]}"#,
        )
        .unwrap();

        store.add(entry("nova", 0)).unwrap();
        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(store.path()).unwrap()).unwrap();
        assert_eq!(raw["owner"], "ops");
        assert_eq!(raw["stack"]["namespace"], "lab");
        assert_eq!(raw["stack"]["basePort"], 19000);
    }

    #[test]
    fn test_bot_dir_resolves_against_registry_dir() {
        let (dir, store) = store();
        let stack = StackSettings::default();
        assert_eq!(
            store.bot_dir(&stack, "nova"),
            dir.path().join("./bots").join("nova")
        );

        let bare = RegistryStore::new("botfleet.json");
        assert_eq!(bare.project_root(), PathBuf::from("."));
    }
}
