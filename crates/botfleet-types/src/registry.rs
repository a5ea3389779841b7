//! The registry document: stack settings plus bot entries

use crate::bot::BotEntry;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Current registry schema version
pub const REGISTRY_VERSION: u32 = 1;

/// Fleet-wide settings shared by every bot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackSettings {
    /// Prefix for container, network and host names
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// First port of slot 0
    #[serde(default = "default_base_port")]
    pub base_port: u32,

    /// Bot directories root, relative to the registry file
    #[serde(default = "default_data_root")]
    pub data_root: String,

    /// Shared base image
    #[serde(default = "default_image_name")]
    pub image_name: String,
}

impl Default for StackSettings {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            base_port: default_base_port(),
            data_root: default_data_root(),
            image_name: default_image_name(),
        }
    }
}

impl StackSettings {
    pub fn container_name(&self, bot: &str) -> String {
        format!("{}-{}", self.namespace, bot)
    }

    pub fn network_name(&self) -> String {
        format!("{}-net", self.namespace)
    }

    pub fn tailscale_hostname(&self, bot: &str) -> String {
        format!("{}-{}", self.namespace, bot)
    }

    /// Local HTTPS domain published through container labels
    pub fn dashboard_domain(&self, bot: &str) -> String {
        format!("{}-{}.orb.local", self.namespace, bot)
    }
}

fn default_namespace() -> String {
    "botfleet".to_string()
}

fn default_base_port() -> u32 {
    19000
}

fn default_data_root() -> String {
    "./bots".to_string()
}

fn default_image_name() -> String {
    "botfleet-base".to_string()
}

/// The whole registry document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Registry {
    #[serde(default = "default_version")]
    pub version: u32,

    #[serde(default)]
    pub stack: StackSettings,

    #[serde(default)]
    pub bots: Vec<BotEntry>,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Default for Registry {
    fn default() -> Self {
        Self {
            version: REGISTRY_VERSION,
            stack: StackSettings::default(),
            bots: Vec::new(),
            extra: serde_json::Map::new(),
        }
    }
}

fn default_version() -> u32 {
    REGISTRY_VERSION
}

impl Registry {
    pub fn find(&self, name: &str) -> Option<&BotEntry> {
        self.bots.iter().find(|b| b.name == name)
    }

    pub fn find_mut(&mut self, name: &str) -> Option<&mut BotEntry> {
        self.bots.iter_mut().find(|b| b.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    /// Append an entry; a duplicate name is ignored and returns `false`
    pub fn add(&mut self, entry: BotEntry) -> bool {
        if self.contains(&entry.name) {
            return false;
        }
        self.bots.push(entry);
        true
    }

    /// Drop an entry by name; returns whether anything was removed
    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.bots.len();
        self.bots.retain(|b| b.name != name);
        self.bots.len() != before
    }

    /// Swap an existing entry for `entry`, keeping its position
    pub fn replace(&mut self, entry: BotEntry) -> bool {
        match self.find_mut(&entry.name) {
            Some(slot) => {
                *slot = entry;
                true
            }
            None => false,
        }
    }

    /// Slot indices held by live entries
    pub fn used_slots(&self) -> BTreeSet<u32> {
        self.bots.iter().map(|b| b.port_slot).collect()
    }
}
