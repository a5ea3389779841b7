//! CLI settings file
//!
//! `<config_dir>/botfleet/config.toml` may set default `registry` and
//! `home` paths. Flags and environment variables take precedence.

use crate::error::{CliError, CliResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const DEFAULT_REGISTRY: &str = "botfleet.json";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CliConfig {
    /// Registry file used when `--registry` is not given
    pub registry: Option<PathBuf>,

    /// Home directory used when `--home` is not given
    pub home: Option<PathBuf>,
}

impl CliConfig {
    /// Load from an explicit path (which must exist) or the default
    /// location (which may not).
    pub fn load(path: Option<&Path>) -> CliResult<Self> {
        let (path, required) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => match Self::default_path() {
                Some(p) => (p, false),
                None => return Ok(Self::default()),
            },
        };

        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound && !required => {
                return Ok(Self::default())
            }
            Err(e) => {
                return Err(CliError::Config(format!("{}: {}", path.display(), e)));
            }
        };
        let config: Self = toml::from_str(&text)
            .map_err(|e| CliError::Config(format!("{}: {}", path.display(), e)))?;
        tracing::debug!(path = %path.display(), "Loaded CLI config");
        Ok(config)
    }

    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("botfleet").join("config.toml"))
    }

    /// Flag/env value, then the config file, then `./botfleet.json`
    pub fn registry_path(&self, flag: Option<PathBuf>) -> PathBuf {
        flag.or_else(|| self.registry.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_REGISTRY))
    }

    pub fn home_dir(&self, flag: Option<PathBuf>) -> Option<PathBuf> {
        flag.or_else(|| self.home.clone())
    }
}
