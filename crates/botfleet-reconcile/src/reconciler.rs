//! The apply engine
//!
//! `apply` drives one bot from its registry entry to the desired on-disk
//! and runtime state. Each step is safe to re-run: artifacts are merged
//! rather than regenerated, and nothing is written when the merged
//! content already matches what is on disk.

use crate::error::{ReconcileError, Result};
use crate::layout::BotLayout;
use crate::report::{ApplyOptions, ApplyReport, ArtifactChange, Onboarding};
use crate::scaffold::{ensure_dirs, init_git, seed_workspace};
use botfleet_config::io::{read_optional, write_if_changed};
use botfleet_config::{
    env_keys, generate_token, render, GatewayConfig, ProviderKind, SecretsFile, SeedTemplates,
};
use botfleet_registry::{home_keys, HomeConfigStore, RegistryStore};
use botfleet_runtime::{ContainerRuntime, LifecycleController, ReadinessProbe};
use botfleet_types::{BotEntry, Channel, ContainerState, StackSettings};
use std::path::PathBuf;
use std::sync::Arc;

/// Mode for both generated artifacts; they carry credentials.
const ARTIFACT_MODE: u32 = 0o600;

/// Reconciles registry entries against the filesystem and container runtime
pub struct Reconciler {
    pub(crate) store: RegistryStore,
    pub(crate) home: HomeConfigStore,
    pub(crate) controller: LifecycleController,
    pub(crate) probe: ReadinessProbe,
}

impl Reconciler {
    pub fn new(
        store: RegistryStore,
        home: HomeConfigStore,
        runtime: Arc<dyn ContainerRuntime>,
    ) -> Self {
        Self {
            store,
            home,
            controller: LifecycleController::new(runtime),
            probe: ReadinessProbe::default(),
        }
    }

    /// Replace the readiness probe used after start
    pub fn with_probe(mut self, probe: ReadinessProbe) -> Self {
        self.probe = probe;
        self
    }

    pub fn store(&self) -> &RegistryStore {
        &self.store
    }

    pub fn home(&self) -> &HomeConfigStore {
        &self.home
    }

    pub fn controller(&self) -> &LifecycleController {
        &self.controller
    }

    pub(crate) fn runtime(&self) -> &Arc<dyn ContainerRuntime> {
        self.controller.runtime()
    }

    /// Build context for the shared image
    pub fn docker_dir(&self) -> PathBuf {
        self.store.project_root().join("docker")
    }

    /// Workspace seed files and template overrides
    pub fn seed_dir(&self) -> PathBuf {
        self.store.project_root().join("seed")
    }

    /// Layout of a bot directory. Paths are absolute because they end up
    /// as bind-mount sources.
    pub fn layout(&self, stack: &StackSettings, name: &str) -> BotLayout {
        let dir = self.store.bot_dir(stack, name);
        BotLayout::new(std::path::absolute(&dir).unwrap_or(dir))
    }

    /// Registry entry plus the stack settings it lives under
    pub(crate) fn entry(&self, name: &str) -> Result<(StackSettings, BotEntry)> {
        let registry = self.store.load();
        let entry = registry
            .find(name)
            .cloned()
            .ok_or_else(|| ReconcileError::NotFound(name.to_string()))?;
        Ok((registry.stack, entry))
    }

    pub(crate) async fn require_runtime(&self) -> Result<()> {
        if self.runtime().check_available().await {
            Ok(())
        } else {
            Err(ReconcileError::EnvironmentUnavailable)
        }
    }

    /// Build the shared image from `docker/` when it is missing.
    pub(crate) async fn ensure_image(&self, stack: &StackSettings) -> Result<bool> {
        if self.runtime().image_exists(&stack.image_name).await? {
            return Ok(false);
        }
        tracing::info!(image = %stack.image_name, "Building base image");
        self.runtime()
            .build_image(&stack.image_name, &self.docker_dir())
            .await?;
        Ok(true)
    }

    /// Converge one bot to its registry entry.
    pub async fn apply(&self, name: &str, opts: &ApplyOptions) -> Result<ApplyReport> {
        let (stack, entry) = self.entry(name)?;
        let provider: ProviderKind = entry.provider.parse()?;
        self.require_runtime().await?;

        let mut report = ApplyReport {
            image_built: self.ensure_image(&stack).await?,
            ..Default::default()
        };
        self.runtime().ensure_network(&stack.network_name()).await?;

        let layout = self.layout(&stack, name);
        report.seeded = self.scaffold(&layout, &entry).await?;

        let templates = SeedTemplates::load(&self.seed_dir())?;
        let existing_config = read_optional(&layout.config_path())?;
        let config_token = existing_config.as_deref().and_then(|text| {
            GatewayConfig::parse(layout.config_path(), text)
                .ok()
                .and_then(|c| c.auth_token().map(str::to_string))
        });

        let api_key = self.resolve_api_key(provider, opts);
        let token = self.merge_secrets(
            &stack,
            &entry,
            &layout,
            provider,
            api_key.as_deref(),
            config_token,
            opts,
            &templates,
            &mut report,
        )?;
        report.config =
            merge_gateway(&entry, &layout, provider, &token, opts, &templates, existing_config)?;
        sync_token(&layout)?;

        report.onboarding = self.onboard(&stack, &entry, &layout).await?;
        if let Onboarding::Failed(reason) = &report.onboarding {
            report
                .warnings
                .push(format!("Onboarding failed ({}); it will be retried on the next apply", reason));
        }

        let container = stack.container_name(name);
        let transition = self.controller.restart(&container).await?;
        report.container = transition.state();
        report.restarted = transition.changed();
        if report.container != ContainerState::Running {
            report.next_step = Some(format!("botfleet start {}", name));
        }

        tracing::info!(
            bot = %name,
            secrets = ?report.secrets,
            config = ?report.config,
            onboarding = ?report.onboarding,
            restarted = report.restarted,
            "Applied bot"
        );
        Ok(report)
    }

    async fn scaffold(&self, layout: &BotLayout, entry: &BotEntry) -> Result<bool> {
        let is_new = ensure_dirs(layout, entry.tailscale)?;
        if !is_new {
            return Ok(false);
        }

        let today = chrono::Local::now().date_naive().to_string();
        let start = entry.dev_port_start.to_string();
        let end = entry.dev_port_end.to_string();
        let gateway = entry.gateway_port.to_string();
        let vars = [
            ("AGENT_NAME", entry.name.as_str()),
            ("DATE", today.as_str()),
            ("BOTFLEET_DEV_PORT_START", start.as_str()),
            ("BOTFLEET_DEV_PORT_END", end.as_str()),
            ("BOTFLEET_GATEWAY_PORT", gateway.as_str()),
        ];
        seed_workspace(layout, &self.seed_dir(), &vars)?;
        init_git(&layout.workspace()).await;
        tracing::info!(bot = %entry.name, dir = %layout.dir().display(), "Seeded new workspace");
        Ok(true)
    }

    /// Explicit key first, then the cached home default.
    fn resolve_api_key(&self, provider: ProviderKind, opts: &ApplyOptions) -> Option<String> {
        if !provider.needs_api_key() {
            return None;
        }
        opts.api_key
            .clone()
            .filter(|k| !k.is_empty())
            .or_else(|| {
                let home_key = provider.home_key()?;
                self.home.load().get(home_key).map(str::to_string)
            })
    }

    /// Merge the secrets file; returns the gateway token it now carries.
    #[allow(clippy::too_many_arguments)]
    fn merge_secrets(
        &self,
        stack: &StackSettings,
        entry: &BotEntry,
        layout: &BotLayout,
        provider: ProviderKind,
        api_key: Option<&str>,
        config_token: Option<String>,
        opts: &ApplyOptions,
        templates: &SeedTemplates,
        report: &mut ApplyReport,
    ) -> Result<String> {
        let path = layout.env_path();
        let previous = read_optional(&path)?;
        let existing = previous.as_deref().map(SecretsFile::parse);

        let token = existing
            .as_ref()
            .and_then(|s| s.get(env_keys::GATEWAY_TOKEN))
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .or(config_token)
            .unwrap_or_else(generate_token);

        let start = entry.dev_port_start.to_string();
        let end = entry.dev_port_end.to_string();
        let mut secrets = match existing {
            Some(secrets) => secrets,
            None => {
                let today = chrono::Local::now().date_naive().to_string();
                SecretsFile::parse(&render(
                    &templates.env,
                    &[
                        ("AGENT_NAME", entry.name.as_str()),
                        ("DATE", today.as_str()),
                        ("GATEWAY_TOKEN", token.as_str()),
                        ("BOTFLEET_DEV_PORT_START", start.as_str()),
                        ("BOTFLEET_DEV_PORT_END", end.as_str()),
                    ],
                ))
            }
        };

        secrets.set(env_keys::GATEWAY_TOKEN, &token);
        secrets.set(env_keys::DEV_PORT_START, &start);
        secrets.set(env_keys::DEV_PORT_END, &end);

        if let Some(var) = provider.api_key_var() {
            match api_key {
                Some(key) => secrets.set(var, key),
                None if secrets.get(var).map_or(true, str::is_empty) => {
                    report.warnings.push(format!(
                        "No {} configured; set one with `botfleet config {}`",
                        provider.api_key_label().unwrap_or_else(|| var.to_string()),
                        entry.name
                    ));
                }
                None => {}
            }
        }

        match entry.proxy.as_target() {
            Some(target) => secrets.set(env_keys::PROXY_TARGET, target),
            None => {
                secrets.remove(env_keys::PROXY_TARGET);
            }
        }

        if entry.tailscale {
            let auth_key = opts
                .tailscale_auth_key
                .clone()
                .filter(|k| !k.is_empty())
                .or_else(|| {
                    self.home
                        .load()
                        .get(home_keys::TAILSCALE_AUTH_KEY)
                        .map(str::to_string)
                })
                .or_else(|| {
                    secrets
                        .get(env_keys::TS_AUTHKEY)
                        .filter(|k| !k.is_empty())
                        .map(str::to_string)
                });
            match auth_key {
                Some(key) => {
                    let hostname = stack.tailscale_hostname(&entry.name);
                    secrets.set_block(
                        env_keys::TAILSCALE_BLOCK,
                        &[
                            (env_keys::TS_AUTHKEY, key.as_str()),
                            (env_keys::TS_HOSTNAME, hostname.as_str()),
                        ],
                    );
                }
                None => report.warnings.push(format!(
                    "Tailscale is enabled but no auth key is available; run `botfleet tailscale {}`",
                    entry.name
                )),
            }
        } else {
            secrets.remove_block(env_keys::TAILSCALE_BLOCK);
            secrets.remove(env_keys::TS_AUTHKEY);
            secrets.remove(env_keys::TS_HOSTNAME);
        }

        let written =
            write_if_changed(&path, previous.as_deref(), &secrets.to_string(), Some(ARTIFACT_MODE))?;
        report.secrets = ArtifactChange::from_write(previous.is_some(), written);
        Ok(token)
    }

    /// One-time identity creation in an ephemeral container. Failures are
    /// reported, not raised.
    async fn onboard(
        &self,
        stack: &StackSettings,
        entry: &BotEntry,
        layout: &BotLayout,
    ) -> Result<Onboarding> {
        if layout.identity_exists() {
            return Ok(Onboarding::AlreadyDone);
        }

        tracing::info!(bot = %entry.name, "Running onboarding");
        if let Err(e) = self.controller.run_once(&layout.onboard_spec(stack, entry)).await {
            tracing::warn!(bot = %entry.name, error = %e, "Onboarding failed");
            return Ok(Onboarding::Failed(e.to_string()));
        }

        // Onboarding rewrites the config; restore the fields it clobbers.
        let path = layout.config_path();
        if let Some(text) = read_optional(&path)? {
            match GatewayConfig::parse(&path, &text) {
                Ok(mut config) => {
                    config.fix_after_onboard();
                    write_if_changed(&path, Some(&text), &config.render()?, Some(ARTIFACT_MODE))?;
                }
                Err(e) => {
                    tracing::warn!(bot = %entry.name, error = %e, "Config unreadable after onboarding");
                    return Ok(Onboarding::Failed(e.to_string()));
                }
            }
        }
        sync_token(layout)?;
        Ok(Onboarding::Completed)
    }
}

/// Merge the gateway config; an unparseable existing file aborts untouched.
fn merge_gateway(
    entry: &BotEntry,
    layout: &BotLayout,
    provider: ProviderKind,
    token: &str,
    opts: &ApplyOptions,
    templates: &SeedTemplates,
    previous: Option<String>,
) -> Result<ArtifactChange> {
    let path = layout.config_path();
    let mut config = match &previous {
        Some(text) => GatewayConfig::parse(&path, text)?,
        None => GatewayConfig::parse(&path, &templates.render_gateway(token))?,
    };

    config.ensure_gateway(token);
    config.apply_provider(&provider.build_config(&entry.model));
    for channel in Channel::ALL {
        config.set_channel(channel, entry.channel_enabled(channel));
    }
    for (channel, credentials) in &opts.channel_credentials {
        config.merge_channel_credentials(*channel, credentials);
    }

    let written = write_if_changed(&path, previous.as_deref(), &config.render()?, Some(ARTIFACT_MODE))?;
    Ok(ArtifactChange::from_write(previous.is_some(), written))
}

/// The gateway reads its token from the config; copy it into the secrets
/// file when the two have drifted.
fn sync_token(layout: &BotLayout) -> Result<bool> {
    let config_path = layout.config_path();
    let env_path = layout.env_path();
    let (Some(config_text), Some(env_text)) =
        (read_optional(&config_path)?, read_optional(&env_path)?)
    else {
        return Ok(false);
    };
    let Ok(config) = GatewayConfig::parse(&config_path, &config_text) else {
        return Ok(false);
    };
    let Some(token) = config.auth_token() else {
        return Ok(false);
    };

    let mut secrets = SecretsFile::parse(&env_text);
    if secrets.get(env_keys::GATEWAY_TOKEN) == Some(token) {
        return Ok(false);
    }
    secrets.set(env_keys::GATEWAY_TOKEN, token);
    tracing::debug!(path = %env_path.display(), "Synced gateway token into secrets");
    Ok(write_if_changed(&env_path, Some(&env_text), &secrets.to_string(), Some(ARTIFACT_MODE))?)
}
