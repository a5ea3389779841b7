//! On-disk layout of a bot directory and its container mapping

use botfleet_runtime::{Mount, OneShotSpec, PortMapping, RunSpec};
use botfleet_types::{BotEntry, StackSettings};
use std::path::{Path, PathBuf};

/// Where the bot directory is mounted inside the container
pub const CONTAINER_HOME: &str = "/root/.openclaw";

/// Gateway port inside the container
pub const GATEWAY_INTERNAL_PORT: u32 = 18789;

const DOCKER_SOCKET: &str = "/var/run/docker.sock";
const TAILSCALE_STATE: &str = "/var/lib/tailscale";
const ONBOARD_COMMAND: &[&str] = &[
    "openclaw",
    "onboard",
    "--non-interactive",
    "--accept-risk",
    "--skip-daemon",
    "--skip-health",
];

/// Paths inside one bot directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotLayout {
    dir: PathBuf,
}

impl BotLayout {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Secrets file
    pub fn env_path(&self) -> PathBuf {
        self.dir.join(".env")
    }

    /// Gateway config
    pub fn config_path(&self) -> PathBuf {
        self.dir.join("openclaw.json")
    }

    pub fn workspace(&self) -> PathBuf {
        self.dir.join("workspace")
    }

    pub fn skills(&self) -> PathBuf {
        self.workspace().join("skills")
    }

    pub fn tailscale_state(&self) -> PathBuf {
        self.dir.join(".tailscale")
    }

    /// Directories that must exist before the container starts
    pub fn required_dirs(&self, tailscale: bool) -> Vec<PathBuf> {
        let mut dirs = vec![
            self.workspace().join("memory"),
            self.dir.join(".vscode-server"),
            self.dir.join(".cursor-server"),
        ];
        if tailscale {
            dirs.push(self.tailscale_state());
        }
        dirs
    }

    /// Onboarding leaves one of these behind
    pub fn identity_markers(&self) -> [PathBuf; 2] {
        [
            self.dir.join("identity"),
            self.dir.join("agents").join("main").join("agent").join("device.json"),
        ]
    }

    pub fn identity_exists(&self) -> bool {
        self.identity_markers().iter().any(|p| p.exists())
    }

    /// Create-and-run descriptor for the bot's primary container
    pub fn run_spec(&self, stack: &StackSettings, entry: &BotEntry) -> RunSpec {
        let mut ports = vec![PortMapping::new(entry.gateway_port, GATEWAY_INTERNAL_PORT)];
        ports.extend(entry.ports().dev_ports().map(PortMapping::same));

        let mut spec = RunSpec {
            name: stack.container_name(&entry.name),
            image: stack.image_name.clone(),
            restart_policy: Some("unless-stopped".to_string()),
            env_file: Some(self.env_path()),
            env: Vec::new(),
            mounts: vec![
                Mount::new(&self.dir, CONTAINER_HOME),
                Mount::new(DOCKER_SOCKET, DOCKER_SOCKET),
            ],
            ports,
            capabilities: Vec::new(),
            devices: Vec::new(),
            network: Some(stack.network_name()),
            extra_hosts: vec!["host.docker.internal:host-gateway".to_string()],
            labels: vec![
                (
                    "dev.orbstack.domains".to_string(),
                    stack.dashboard_domain(&entry.name),
                ),
                (
                    "dev.orbstack.http-port".to_string(),
                    GATEWAY_INTERNAL_PORT.to_string(),
                ),
            ],
        };

        if entry.tailscale {
            spec.capabilities = vec!["NET_ADMIN".to_string(), "NET_RAW".to_string()];
            spec.devices = vec!["/dev/net/tun".to_string()];
            spec.mounts
                .push(Mount::new(self.tailscale_state(), TAILSCALE_STATE));
        }
        spec
    }

    /// Ephemeral onboarding run against the same bot directory
    pub fn onboard_spec(&self, stack: &StackSettings, entry: &BotEntry) -> OneShotSpec {
        OneShotSpec {
            name: format!("{}-onboard", stack.container_name(&entry.name)),
            image: stack.image_name.clone(),
            env_file: Some(self.env_path()),
            mounts: vec![Mount::new(&self.dir, CONTAINER_HOME)],
            command: ONBOARD_COMMAND.iter().map(|s| s.to_string()).collect(),
        }
    }
}
