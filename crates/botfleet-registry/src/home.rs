//! User-scoped home config (`<home>/config.json`)
//!
//! Cached API keys and shared channel settings offered as defaults by the
//! CLI. Never authoritative over a bot's own generated secrets.

use crate::error::{RegistryError, Result};
use serde_json::{Map, Value};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Known logical keys
pub mod home_keys {
    pub const ANTHROPIC_KEY: &str = "anthropicKey";
    pub const OPENAI_KEY: &str = "openaiKey";
    pub const MATTERMOST_URL: &str = "mattermostUrl";
    pub const MATTERMOST_ADMIN_TOKEN: &str = "mattermostAdminToken";
    pub const TAILSCALE_AUTH_KEY: &str = "tailscaleAuthKey";
}

const CONFIG_FILE: &str = "config.json";

/// In-memory view of the home config. Non-string values are kept as-is.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HomeConfig {
    values: Map<String, Value>,
}

impl HomeConfig {
    /// String value for `key`; empty strings read as absent
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), Value::String(value.into()));
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Reads and writes `config.json` under a home directory.
#[derive(Debug, Clone)]
pub struct HomeConfigStore {
    dir: PathBuf,
}

impl HomeConfigStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// `~/.botfleet`
    pub fn default_dir() -> Result<PathBuf> {
        dirs::home_dir()
            .map(|home| home.join(".botfleet"))
            .ok_or(RegistryError::NoHomeDir)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(CONFIG_FILE)
    }

    /// Lenient load: missing or malformed files read as empty.
    pub fn load(&self) -> HomeConfig {
        let path = self.path();
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return HomeConfig::default(),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Cannot read home config");
                return HomeConfig::default();
            }
        };
        match serde_json::from_str::<Map<String, Value>>(&raw) {
            Ok(values) => HomeConfig { values },
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Malformed home config, ignoring");
                HomeConfig::default()
            }
        }
    }

    /// Merge `patch` over the on-disk values and persist with owner-only
    /// permissions.
    pub fn save_patch<'a, I>(&self, patch: I) -> Result<HomeConfig>
    where
        I: IntoIterator<Item = (&'a str, String)>,
    {
        let mut config = self.load();
        for (key, value) in patch {
            config.set(key, value);
        }

        fs::create_dir_all(&self.dir).map_err(|e| RegistryError::io(&self.dir, e))?;
        let mut body = serde_json::to_string_pretty(&config.values)?;
        body.push('\n');

        let path = self.path();
        let tmp = self.dir.join(format!("{}.tmp", CONFIG_FILE));
        fs::write(&tmp, body).map_err(|e| RegistryError::io(&tmp, e))?;
        restrict_permissions(&tmp).map_err(|e| RegistryError::io(&tmp, e))?;
        fs::rename(&tmp, &path).map_err(|e| RegistryError::io(&path, e))?;

        tracing::debug!(path = %path.display(), "Saved home config");
        Ok(config)
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> std::io::Result<()> {
    Ok(())
}
