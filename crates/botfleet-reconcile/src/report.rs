//! Options and outcome reports for bot operations

use crate::provision::ProvisionedAccount;
use botfleet_runtime::Transition;
use botfleet_types::{BotEntry, Channel, ContainerState};
use serde::Serialize;
use serde_json::{Map, Value};

/// Inputs to `apply` that do not live in the registry
#[derive(Debug, Clone, Default)]
pub struct ApplyOptions {
    /// Provider API key; wins over the home-config default
    pub api_key: Option<String>,
    /// Tailscale auth key; wins over the home-config default
    pub tailscale_auth_key: Option<String>,
    /// Fresh credential fields merged into `channels.<channel>`
    pub channel_credentials: Vec<(Channel, Map<String, Value>)>,
}

impl ApplyOptions {
    pub fn with_api_key(mut self, key: Option<String>) -> Self {
        self.api_key = key.filter(|k| !k.is_empty());
        self
    }

    pub fn with_credentials(mut self, channel: Channel, credentials: Map<String, Value>) -> Self {
        self.channel_credentials.push((channel, credentials));
        self
    }
}

/// What happened to a generated file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArtifactChange {
    Created,
    Updated,
    #[default]
    Unchanged,
}

impl ArtifactChange {
    pub(crate) fn from_write(existed: bool, written: bool) -> Self {
        match (existed, written) {
            (false, _) => ArtifactChange::Created,
            (true, true) => ArtifactChange::Updated,
            (true, false) => ArtifactChange::Unchanged,
        }
    }
}

/// Outcome of the one-time identity onboarding
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Onboarding {
    /// Identity already present; nothing run
    #[default]
    AlreadyDone,
    Completed,
    /// Non-fatal; the next apply retries
    Failed(String),
}

/// Result of one reconciliation pass
#[derive(Debug, Clone, Default)]
pub struct ApplyReport {
    pub image_built: bool,
    pub seeded: bool,
    pub secrets: ArtifactChange,
    pub config: ArtifactChange,
    pub onboarding: Onboarding,
    pub container: ContainerState,
    pub restarted: bool,
    /// Command the user should run next, if any
    pub next_step: Option<String>,
    pub warnings: Vec<String>,
}

/// Result of starting a bot
#[derive(Debug, Clone)]
pub struct StartReport {
    pub transition: Transition,
    /// `None` when the container was already running and no probe ran
    pub ready: Option<bool>,
    pub gateway_url: String,
    pub dashboard_url: String,
    pub dev_ports: (u32, u32),
}

/// Result of enabling a remote-provisioned channel
#[derive(Debug, Clone)]
pub struct ChannelReport {
    pub account: ProvisionedAccount,
    /// `None` when the container was not running
    pub plugin_installed: Option<bool>,
    pub apply: ApplyReport,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DestroyOptions {
    pub delete_files: bool,
}

#[derive(Debug, Clone, Default)]
pub struct DestroyReport {
    pub container_removed: bool,
    pub files_deleted: bool,
    /// `None` when no remote account was touched
    pub account_disabled: Option<bool>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct RebuildReport {
    pub skills_synced: Vec<String>,
    pub recreated: Vec<String>,
}

/// One row of the fleet listing
#[derive(Debug, Clone, Serialize)]
pub struct BotStatus {
    pub entry: BotEntry,
    /// Runtime status line; `None` when there is no container
    pub status: Option<String>,
    pub state: ContainerState,
}
