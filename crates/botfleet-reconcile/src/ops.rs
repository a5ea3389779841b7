//! Bot operations built on top of `apply`

use crate::error::{ReconcileError, Result};
use crate::provision::{provision, ChannelProvisioner};
use crate::reconciler::Reconciler;
use crate::report::{
    ApplyOptions, ApplyReport, BotStatus, ChannelReport, DestroyOptions, DestroyReport,
    RebuildReport, StartReport,
};
use crate::scaffold::sync_skills;
use botfleet_config::io::read_optional;
use botfleet_config::{env_keys, GatewayConfig, ProviderKind, SecretsFile};
use botfleet_registry::allocate;
use botfleet_runtime::{ReadinessProbe, Transition};
use botfleet_types::{validate_name, BotEntry, Channel, ContainerState, MattermostSetting, ProxySetting};
use serde_json::{Map, Value};

/// User-chosen fields of a bot entry
#[derive(Debug, Clone)]
pub struct BotDefinition {
    pub name: String,
    pub provider: ProviderKind,
    /// Empty selects the provider default
    pub model: String,
    pub mattermost: MattermostSetting,
    pub telegram: bool,
}

impl BotDefinition {
    pub fn new(name: impl Into<String>, provider: ProviderKind) -> Self {
        Self {
            name: name.into(),
            provider,
            model: String::new(),
            mattermost: MattermostSetting::Disabled,
            telegram: false,
        }
    }

    fn model(&self) -> String {
        self.provider.resolve_model(&self.model).to_string()
    }
}

const PLUGIN_INSTALL: &[&str] = &["openclaw", "plugins", "install", "@openclaw/mattermost"];

impl Reconciler {
    /// Register a new bot with the lowest free port slot.
    pub fn create(&self, def: &BotDefinition) -> Result<BotEntry> {
        validate_name(&def.name)?;
        let registry = self.store.load();
        if registry.contains(&def.name) {
            return Err(ReconcileError::Conflict(format!(
                "Bot '{}' already exists. Use 'botfleet config {}' to change it.",
                def.name, def.name
            )));
        }
        let dir = self.store.bot_dir(&registry.stack, &def.name);
        if dir.exists() {
            return Err(ReconcileError::Conflict(format!(
                "Directory {} already exists but '{}' is not registered. Remove it or pick another name.",
                dir.display(),
                def.name
            )));
        }

        let today = chrono::Local::now().date_naive();
        let entry = self.store.update(|registry| {
            if registry.contains(&def.name) {
                return None;
            }
            let ports = allocate(registry);
            let mut entry = BotEntry::new(&def.name, def.provider.key(), def.model(), ports, today);
            entry.mattermost = def.mattermost.clone();
            entry.telegram = def.telegram;
            registry.add(entry.clone());
            Some(entry)
        })?;

        let entry = entry.ok_or_else(|| {
            ReconcileError::Conflict(format!("Bot '{}' already exists", def.name))
        })?;
        tracing::info!(
            bot = %entry.name,
            slot = entry.port_slot,
            gateway_port = entry.gateway_port,
            "Registered bot"
        );
        Ok(entry)
    }

    /// Change provider, model and channels of an existing bot. Ports and
    /// creation date are kept.
    pub fn reconfigure(&self, def: &BotDefinition) -> Result<BotEntry> {
        self.modify(&def.name, |entry| {
            entry.provider = def.provider.key().to_string();
            entry.model = def.model();
            entry.mattermost = def.mattermost.clone();
            entry.telegram = def.telegram;
        })
    }

    /// Locked read-modify-write of one entry
    pub(crate) fn modify(&self, name: &str, f: impl FnOnce(&mut BotEntry)) -> Result<BotEntry> {
        self.store
            .update(|registry| {
                let entry = registry.find_mut(name)?;
                f(entry);
                Some(entry.clone())
            })?
            .ok_or_else(|| ReconcileError::NotFound(name.to_string()))
    }

    /// Bring the container up, applying first if the bot was never applied.
    pub async fn start(&self, name: &str) -> Result<StartReport> {
        let (stack, entry) = self.entry(name)?;
        self.require_runtime().await?;

        let layout = self.layout(&stack, name);
        if !layout.env_path().exists() {
            tracing::info!(bot = %name, "Bot was never applied, applying first");
            self.apply(name, &ApplyOptions::default()).await?;
        }
        self.ensure_image(&stack).await?;
        self.runtime().ensure_network(&stack.network_name()).await?;

        let transition = self
            .controller
            .ensure_running(&layout.run_spec(&stack, &entry))
            .await?;
        let gateway_url = ReadinessProbe::gateway_url(entry.gateway_port);
        let ready = if transition.changed() {
            Some(self.probe.wait(&gateway_url).await)
        } else {
            None
        };

        Ok(StartReport {
            transition,
            ready,
            gateway_url,
            dashboard_url: format!("https://{}", stack.dashboard_domain(name)),
            dev_ports: (entry.dev_port_start, entry.dev_port_end),
        })
    }

    pub async fn stop(&self, name: &str) -> Result<Transition> {
        let (stack, _) = self.entry(name)?;
        self.require_runtime().await?;
        Ok(self.controller.stop(&stack.container_name(name)).await?)
    }

    /// Restart a running bot; anything else is an error.
    pub async fn restart(&self, name: &str) -> Result<Transition> {
        let (stack, _) = self.entry(name)?;
        self.require_runtime().await?;
        let container = stack.container_name(name);
        if !self.controller.state(&container).await?.is_running() {
            return Err(ReconcileError::NotRunning(name.to_string()));
        }
        Ok(self.controller.restart(&container).await?)
    }

    /// Start every registered bot in registry order, continuing past failures.
    pub async fn start_all(&self) -> Vec<(String, Result<StartReport>)> {
        let mut results = Vec::new();
        for name in self.bot_names() {
            let result = self.start(&name).await;
            if let Err(e) = &result {
                tracing::warn!(bot = %name, error = %e, "Start failed");
            }
            results.push((name, result));
        }
        results
    }

    /// Stop every registered bot in registry order, continuing past failures.
    pub async fn stop_all(&self) -> Vec<(String, Result<Transition>)> {
        let mut results = Vec::new();
        for name in self.bot_names() {
            let result = self.stop(&name).await;
            if let Err(e) = &result {
                tracing::warn!(bot = %name, error = %e, "Stop failed");
            }
            results.push((name, result));
        }
        results
    }

    fn bot_names(&self) -> Vec<String> {
        self.store.load().bots.into_iter().map(|b| b.name).collect()
    }

    /// Remove the container, optionally the files and remote account, and
    /// finally the registry entry.
    pub async fn destroy(
        &self,
        name: &str,
        opts: DestroyOptions,
        provisioner: Option<&dyn ChannelProvisioner>,
    ) -> Result<DestroyReport> {
        let (stack, entry) = self.entry(name)?;
        let mut report = DestroyReport::default();

        if self.runtime().check_available().await {
            match self.controller.remove(&stack.container_name(name)).await {
                Ok(t) => report.container_removed = t.changed(),
                Err(e) => report.warnings.push(format!("Could not remove container: {}", e)),
            }
        } else {
            report
                .warnings
                .push("Container runtime is not running; container was not removed".to_string());
        }

        if let (Some(provisioner), true) = (provisioner, entry.mattermost.is_enabled()) {
            let disabled = match provisioner.find_account(name).await {
                Ok(Some(id)) => provisioner.disable_account(&id).await.map(|_| true),
                Ok(None) => Ok(false),
                Err(e) => Err(e),
            };
            match disabled {
                Ok(d) => report.account_disabled = Some(d),
                Err(e) => {
                    report.account_disabled = Some(false);
                    report
                        .warnings
                        .push(format!("Could not disable Mattermost account: {}", e));
                }
            }
        }

        if opts.delete_files {
            let dir = self.layout(&stack, name).dir().to_path_buf();
            if dir.exists() {
                std::fs::remove_dir_all(&dir).map_err(|e| ReconcileError::io(&dir, e))?;
                report.files_deleted = true;
            }
        }

        self.store.remove(name)?;
        tracing::info!(bot = %name, files_deleted = report.files_deleted, "Destroyed bot");
        Ok(report)
    }

    /// Rebuild the shared image, resync seed skills and remove containers
    /// so the next start picks up the new image.
    pub async fn rebuild(&self, name: Option<&str>) -> Result<RebuildReport> {
        let registry = self.store.load();
        let bots: Vec<BotEntry> = match name {
            Some(name) => vec![registry
                .find(name)
                .cloned()
                .ok_or_else(|| ReconcileError::NotFound(name.to_string()))?],
            None => registry.bots.clone(),
        };
        self.require_runtime().await?;

        tracing::info!(image = %registry.stack.image_name, "Rebuilding base image");
        self.runtime()
            .build_image(&registry.stack.image_name, &self.docker_dir())
            .await?;

        let mut report = RebuildReport::default();
        let seed_dir = self.seed_dir();
        for bot in &bots {
            let layout = self.layout(&registry.stack, &bot.name);
            if layout.workspace().is_dir() && sync_skills(&layout, &seed_dir)? {
                report.skills_synced.push(bot.name.clone());
            }
            let container = registry.stack.container_name(&bot.name);
            if self.controller.remove(&container).await?.changed() {
                report.recreated.push(bot.name.clone());
            }
        }
        Ok(report)
    }

    /// Provision a Mattermost account and wire its credentials into the bot.
    pub async fn enable_mattermost(
        &self,
        name: &str,
        provisioner: &dyn ChannelProvisioner,
    ) -> Result<ChannelReport> {
        let (stack, _) = self.entry(name)?;
        let account = provision(provisioner, name).await?;
        self.modify(name, |entry| {
            entry.mattermost = MattermostSetting::Upstream(account.base_url.clone());
        })?;

        let container = stack.container_name(name);
        let plugin_installed = if self.runtime().check_available().await
            && self.controller.state(&container).await?.is_running()
        {
            let command: Vec<String> = PLUGIN_INSTALL.iter().map(|s| s.to_string()).collect();
            match self.runtime().exec(&container, &command).await {
                Ok(_) => Some(true),
                Err(e) => {
                    tracing::warn!(bot = %name, error = %e, "Plugin install failed (non-fatal)");
                    Some(false)
                }
            }
        } else {
            None
        };

        let mut credentials = Map::new();
        credentials.insert("botToken".to_string(), Value::String(account.token.clone()));
        credentials.insert("baseUrl".to_string(), Value::String(account.base_url.clone()));
        let apply = self
            .apply(
                name,
                &ApplyOptions::default().with_credentials(Channel::Mattermost, credentials),
            )
            .await?;

        Ok(ChannelReport {
            account,
            plugin_installed,
            apply,
        })
    }

    pub async fn disable_mattermost(&self, name: &str) -> Result<ApplyReport> {
        self.modify(name, |entry| entry.mattermost = MattermostSetting::Disabled)?;
        self.apply(name, &ApplyOptions::default()).await
    }

    pub async fn enable_telegram(&self, name: &str, bot_token: &str) -> Result<ApplyReport> {
        self.modify(name, |entry| entry.telegram = true)?;
        let mut credentials = Map::new();
        credentials.insert("botToken".to_string(), Value::String(bot_token.to_string()));
        self.apply(
            name,
            &ApplyOptions::default().with_credentials(Channel::Telegram, credentials),
        )
        .await
    }

    pub async fn disable_telegram(&self, name: &str) -> Result<ApplyReport> {
        self.modify(name, |entry| entry.telegram = false)?;
        self.apply(name, &ApplyOptions::default()).await
    }

    /// Capabilities are fixed at container creation, so toggling the
    /// sidecar removes the container; the next start recreates it.
    pub async fn enable_tailscale(&self, name: &str, auth_key: Option<&str>) -> Result<ApplyReport> {
        self.set_tailscale(name, true, auth_key).await
    }

    pub async fn disable_tailscale(&self, name: &str) -> Result<ApplyReport> {
        self.set_tailscale(name, false, None).await
    }

    async fn set_tailscale(
        &self,
        name: &str,
        enabled: bool,
        auth_key: Option<&str>,
    ) -> Result<ApplyReport> {
        let (stack, _) = self.entry(name)?;
        self.require_runtime().await?;
        self.modify(name, |entry| entry.tailscale = enabled)?;
        self.controller.remove(&stack.container_name(name)).await?;

        let opts = ApplyOptions {
            tailscale_auth_key: auth_key.map(str::to_string),
            ..Default::default()
        };
        self.apply(name, &opts).await
    }

    /// Set or clear the port-80 proxy target. A running container is
    /// restarted by the apply.
    pub async fn set_proxy(&self, name: &str, proxy: ProxySetting) -> Result<ApplyReport> {
        self.modify(name, |entry| entry.proxy = proxy)?;
        self.apply(name, &ApplyOptions::default()).await
    }

    /// The gateway bearer token, as the gateway itself reads it
    pub fn token(&self, name: &str) -> Result<String> {
        let (stack, _) = self.entry(name)?;
        let layout = self.layout(&stack, name);
        let config_path = layout.config_path();
        if let Some(token) = config_token(&config_path) {
            return Ok(token);
        }
        read_optional(&layout.env_path())?
            .and_then(|text| {
                SecretsFile::parse(&text)
                    .get(env_keys::GATEWAY_TOKEN)
                    .filter(|t| !t.is_empty())
                    .map(str::to_string)
            })
            .ok_or(ReconcileError::NoToken(config_path))
    }

    /// Dashboard URL with the token in the fragment
    pub fn dashboard_url(&self, name: &str) -> Result<String> {
        let token = self.token(name)?;
        let stack = self.store.load().stack;
        Ok(format!("https://{}/#token={}", stack.dashboard_domain(name), token))
    }

    /// Approve a pending channel pairing inside the running container.
    pub async fn approve(&self, name: &str, channel: Channel, code: &str) -> Result<String> {
        let container = self.running_container(name).await?;
        let command = vec![
            "openclaw".to_string(),
            "pairing".to_string(),
            "approve".to_string(),
            channel.as_str().to_string(),
            code.to_string(),
        ];
        Ok(self.runtime().exec(&container, &command).await?)
    }

    /// Stream container logs until interrupted.
    pub async fn logs(&self, name: &str) -> Result<()> {
        let (stack, _) = self.entry(name)?;
        self.require_runtime().await?;
        Ok(self.runtime().follow_logs(&stack.container_name(name)).await?)
    }

    /// Interactive shell in the running container; returns its exit code.
    pub async fn shell(&self, name: &str) -> Result<i32> {
        let container = self.running_container(name).await?;
        Ok(self
            .runtime()
            .exec_interactive(&container, &["bash".to_string()])
            .await?)
    }

    async fn running_container(&self, name: &str) -> Result<String> {
        let (stack, _) = self.entry(name)?;
        self.require_runtime().await?;
        let container = stack.container_name(name);
        if !self.controller.state(&container).await?.is_running() {
            return Err(ReconcileError::NotRunning(name.to_string()));
        }
        Ok(container)
    }

    /// Every registered bot with its runtime status. An unavailable runtime
    /// yields entries with no status rather than an error.
    pub async fn list(&self) -> Result<Vec<BotStatus>> {
        let registry = self.store.load();
        let available = self.runtime().check_available().await;

        let mut out = Vec::with_capacity(registry.bots.len());
        for entry in registry.bots {
            let (status, state) = if available {
                let container = registry.stack.container_name(&entry.name);
                let status = self.runtime().container_status(&container).await?;
                (status, self.controller.state(&container).await?)
            } else {
                (None, ContainerState::Absent)
            };
            out.push(BotStatus {
                entry,
                status,
                state,
            });
        }
        Ok(out)
    }
}

fn config_token(path: &std::path::Path) -> Option<String> {
    let text = read_optional(path).ok()??;
    let config = GatewayConfig::parse(path, &text).ok()?;
    config.auth_token().map(str::to_string)
}
