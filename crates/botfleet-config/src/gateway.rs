//! Structured gateway config (`openclaw.json`)

use crate::error::{MergeError, Result};
use crate::providers::ProviderRouting;
use botfleet_types::Channel;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

/// Applied to `gateway.trustedProxies` only when the key is absent
pub const DEFAULT_TRUSTED_PROXIES: &[&str] = &["192.168.0.0/16"];

/// Gateway config document with its on-disk location
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayConfig {
    path: PathBuf,
    root: Map<String, Value>,
}

/// Child object at `key`, created when missing. A non-object value in the
/// way is replaced.
fn object_at<'a>(parent: &'a mut Map<String, Value>, key: &str) -> &'a mut Map<String, Value> {
    let slot = parent
        .entry(key.to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    if !slot.is_object() {
        *slot = Value::Object(Map::new());
    }
    match slot {
        Value::Object(map) => map,
        _ => unreachable!("slot was just made an object"),
    }
}

fn disable(block: Option<&mut Value>) {
    if let Some(Value::Object(block)) = block {
        block.insert("enabled".to_string(), Value::Bool(false));
    }
}

impl GatewayConfig {
    pub fn parse(path: impl Into<PathBuf>, text: &str) -> Result<Self> {
        let path = path.into();
        let value: Value = serde_json::from_str(text).map_err(|source| MergeError::Malformed {
            path: path.clone(),
            source,
        })?;
        match value {
            Value::Object(root) => Ok(Self { path, root }),
            _ => Err(MergeError::NotAnObject(path)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn as_value(&self) -> Value {
        Value::Object(self.root.clone())
    }

    /// Pretty JSON (2-space indent) with a trailing newline
    pub fn render(&self) -> Result<String> {
        let mut out = serde_json::to_string_pretty(&self.root).map_err(|source| {
            MergeError::Malformed {
                path: self.path.clone(),
                source,
            }
        })?;
        out.push('\n');
        Ok(out)
    }

    /// `gateway.auth.token`, if set and non-empty
    pub fn auth_token(&self) -> Option<&str> {
        self.root
            .get("gateway")?
            .get("auth")?
            .get("token")?
            .as_str()
            .filter(|t| !t.is_empty())
    }

    /// Default trusted proxies and set auth only where absent.
    pub fn ensure_gateway(&mut self, token: &str) {
        let gateway = object_at(&mut self.root, "gateway");
        if !gateway.contains_key("trustedProxies") {
            gateway.insert(
                "trustedProxies".to_string(),
                Value::from(DEFAULT_TRUSTED_PROXIES.to_vec()),
            );
        }

        let has_token = gateway
            .get("auth")
            .and_then(|auth| auth.get("token"))
            .and_then(Value::as_str)
            .is_some_and(|t| !t.is_empty());
        if !has_token {
            let auth = object_at(gateway, "auth");
            auth.insert("mode".to_string(), Value::from("token"));
            auth.insert("token".to_string(), Value::from(token));
        }
    }

    /// Replace the derived model routing.
    pub fn apply_provider(&mut self, routing: &ProviderRouting) {
        let agents = object_at(&mut self.root, "agents");
        let defaults = object_at(agents, "defaults");
        defaults.insert("model".to_string(), routing.agent_model.clone());
        defaults.insert("models".to_string(), routing.agent_models.clone());
        object_at(defaults, "subagents").insert(
            "model".to_string(),
            Value::from(routing.subagents_model.as_str()),
        );

        if let Some(endpoint) = &routing.endpoint {
            let models = object_at(&mut self.root, "models");
            models.insert("mode".to_string(), Value::from("merge"));
            object_at(models, "providers").insert(endpoint.key.clone(), endpoint.config.clone());
        }
    }

    /// Enable or disable a channel. Disabling never creates blocks; it only
    /// marks existing ones as disabled.
    pub fn set_channel(&mut self, channel: Channel, enabled: bool) {
        let name = channel.as_str();
        if enabled {
            let channels = object_at(&mut self.root, "channels");
            object_at(channels, name).insert("enabled".to_string(), Value::Bool(true));

            let plugins = object_at(&mut self.root, "plugins");
            let mut entry = Map::new();
            entry.insert("enabled".to_string(), Value::Bool(true));
            object_at(plugins, "entries").insert(name.to_string(), Value::Object(entry));
        } else {
            disable(self.root.get_mut("channels").and_then(|c| c.get_mut(name)));
            disable(
                self.root
                    .get_mut("plugins")
                    .and_then(|p| p.get_mut("entries"))
                    .and_then(|e| e.get_mut(name)),
            );
        }
    }

    /// Merge credential fields (e.g. `botToken`, `baseUrl`) into
    /// `channels.<channel>`, keeping its other fields.
    pub fn merge_channel_credentials(&mut self, channel: Channel, credentials: &Map<String, Value>) {
        let channels = object_at(&mut self.root, "channels");
        let block = object_at(channels, channel.as_str());
        for (key, value) in credentials {
            block.insert(key.clone(), value.clone());
        }
    }

    /// Post-onboarding fixup: onboarding resets the bind address.
    pub fn fix_after_onboard(&mut self) {
        if let Some(Value::Object(gateway)) = self.root.get_mut("gateway") {
            gateway.insert("bind".to_string(), Value::from("lan"));
        }
    }
}
