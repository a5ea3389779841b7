//! Bot entries - the declarative description of one agent instance

use crate::error::{Result, TypesError};
use crate::ports::PortAssignment;
use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

/// One managed bot, as stored in the registry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BotEntry {
    /// Unique, immutable identifier
    pub name: String,

    /// Provider key (validated against the provider table on use)
    pub provider: String,

    /// Provider-qualified model name; empty means the provider default
    #[serde(default)]
    pub model: String,

    /// Slot index the port window is derived from
    pub port_slot: u32,

    /// External gateway port
    pub gateway_port: u32,

    /// First port of the 1:1 dev range
    pub dev_port_start: u32,

    /// Last port of the 1:1 dev range
    pub dev_port_end: u32,

    /// Mattermost channel state
    #[serde(default)]
    pub mattermost: MattermostSetting,

    /// Telegram channel enabled
    #[serde(default)]
    pub telegram: bool,

    /// Tailscale sidecar enabled
    #[serde(default)]
    pub tailscale: bool,

    /// Port-80 proxy target
    #[serde(default)]
    pub proxy: ProxySetting,

    /// Creation date (immutable)
    pub created_at: NaiveDate,

    /// Fields written by other tools, carried through untouched
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl BotEntry {
    /// Create an entry with every optional channel disabled
    pub fn new(
        name: impl Into<String>,
        provider: impl Into<String>,
        model: impl Into<String>,
        ports: PortAssignment,
        created_at: NaiveDate,
    ) -> Self {
        Self {
            name: name.into(),
            provider: provider.into(),
            model: model.into(),
            port_slot: ports.slot,
            gateway_port: ports.gateway_port,
            dev_port_start: ports.dev_port_start,
            dev_port_end: ports.dev_port_end,
            mattermost: MattermostSetting::Disabled,
            telegram: false,
            tailscale: false,
            proxy: ProxySetting::Disabled,
            created_at,
            extra: serde_json::Map::new(),
        }
    }

    /// The port window stored on this entry
    pub fn ports(&self) -> PortAssignment {
        PortAssignment {
            slot: self.port_slot,
            gateway_port: self.gateway_port,
            dev_port_start: self.dev_port_start,
            dev_port_end: self.dev_port_end,
        }
    }

    /// Whether a chat channel is enabled for this bot
    pub fn channel_enabled(&self, channel: Channel) -> bool {
        match channel {
            Channel::Mattermost => self.mattermost.is_enabled(),
            Channel::Telegram => self.telegram,
        }
    }
}

/// Check a bot name against `^[A-Za-z][A-Za-z0-9_-]*$`
pub fn validate_name(name: &str) -> Result<()> {
    static NAME_RE: OnceLock<Regex> = OnceLock::new();

    if name.is_empty() {
        return Err(TypesError::EmptyName);
    }
    let re = NAME_RE.get_or_init(|| {
        Regex::new(r"^[A-Za-z][A-Za-z0-9_-]*$").expect("bot name pattern is valid")
    });
    if re.is_match(name) {
        Ok(())
    } else {
        Err(TypesError::InvalidName(name.to_string()))
    }
}

/// Optional chat-platform integrations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Mattermost,
    Telegram,
}

impl Channel {
    pub const ALL: [Channel; 2] = [Channel::Mattermost, Channel::Telegram];

    /// Key used in the gateway config's `channels` and `plugins.entries` maps
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Mattermost => "mattermost",
            Channel::Telegram => "telegram",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Channel {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "mattermost" => Ok(Channel::Mattermost),
            "telegram" => Ok(Channel::Telegram),
            _ => Err(TypesError::UnknownChannel(s.to_string())),
        }
    }
}

/// On-disk shape shared by the `false | true | "string"` registry fields
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum FlagOrText {
    Flag(bool),
    Text(String),
}

/// Mattermost state: `false`, `true` or the upstream server URL
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Option<FlagOrText>", into = "FlagOrText")]
pub enum MattermostSetting {
    #[default]
    Disabled,
    Enabled,
    Upstream(String),
}

impl MattermostSetting {
    pub fn is_enabled(&self) -> bool {
        !matches!(self, MattermostSetting::Disabled)
    }

    pub fn upstream(&self) -> Option<&str> {
        match self {
            MattermostSetting::Upstream(url) => Some(url),
            _ => None,
        }
    }
}

impl From<Option<FlagOrText>> for MattermostSetting {
    fn from(raw: Option<FlagOrText>) -> Self {
        match raw {
            None | Some(FlagOrText::Flag(false)) => MattermostSetting::Disabled,
            Some(FlagOrText::Flag(true)) => MattermostSetting::Enabled,
            Some(FlagOrText::Text(url)) if url.trim().is_empty() => MattermostSetting::Disabled,
            Some(FlagOrText::Text(url)) => MattermostSetting::Upstream(url),
        }
    }
}

impl From<MattermostSetting> for FlagOrText {
    fn from(setting: MattermostSetting) -> Self {
        match setting {
            MattermostSetting::Disabled => FlagOrText::Flag(false),
            MattermostSetting::Enabled => FlagOrText::Flag(true),
            MattermostSetting::Upstream(url) => FlagOrText::Text(url),
        }
    }
}

impl fmt::Display for MattermostSetting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MattermostSetting::Disabled => f.write_str("disabled"),
            MattermostSetting::Enabled => f.write_str("enabled"),
            MattermostSetting::Upstream(url) => f.write_str(url),
        }
    }
}

/// Proxy state: `false` or a `"host:port"` upstream target
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Option<FlagOrText>", into = "FlagOrText")]
pub enum ProxySetting {
    #[default]
    Disabled,
    Target(String),
}

impl ProxySetting {
    /// Parse and validate a `host:port` target
    pub fn target(target: &str) -> Result<Self> {
        let target = target.trim();
        match target.rsplit_once(':') {
            Some((host, port)) if !host.is_empty() && port.parse::<u16>().is_ok() => {
                Ok(ProxySetting::Target(target.to_string()))
            }
            _ => Err(TypesError::InvalidProxyTarget(target.to_string())),
        }
    }

    pub fn as_target(&self) -> Option<&str> {
        match self {
            ProxySetting::Target(t) => Some(t),
            ProxySetting::Disabled => None,
        }
    }
}

impl From<Option<FlagOrText>> for ProxySetting {
    fn from(raw: Option<FlagOrText>) -> Self {
        match raw {
            Some(FlagOrText::Text(t)) if !t.trim().is_empty() => ProxySetting::Target(t),
            _ => ProxySetting::Disabled,
        }
    }
}

impl From<ProxySetting> for FlagOrText {
    fn from(setting: ProxySetting) -> Self {
        match setting {
            ProxySetting::Disabled => FlagOrText::Flag(false),
            ProxySetting::Target(t) => FlagOrText::Text(t),
        }
    }
}
