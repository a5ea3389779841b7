//! Launch descriptors for detached and one-shot containers

use std::path::PathBuf;

/// Host path (or socket) mounted into the container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mount {
    pub source: PathBuf,
    pub target: String,
}

impl Mount {
    pub fn new(source: impl Into<PathBuf>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }

    fn to_arg(&self) -> String {
        format!("{}:{}", self.source.display(), self.target)
    }
}

/// `host:container` port publication
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortMapping {
    pub host: u32,
    pub container: u32,
}

impl PortMapping {
    pub fn new(host: u32, container: u32) -> Self {
        Self { host, container }
    }

    /// Same port number on both sides
    pub fn same(port: u32) -> Self {
        Self::new(port, port)
    }
}

/// Everything needed to create and run the primary container in one call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSpec {
    pub name: String,
    pub image: String,
    pub restart_policy: Option<String>,
    pub env_file: Option<PathBuf>,
    pub env: Vec<(String, String)>,
    pub mounts: Vec<Mount>,
    pub ports: Vec<PortMapping>,
    pub capabilities: Vec<String>,
    pub devices: Vec<String>,
    pub network: Option<String>,
    pub extra_hosts: Vec<String>,
    pub labels: Vec<(String, String)>,
}

impl RunSpec {
    /// `docker run` arguments (without the leading `run`)
    pub fn to_args(&self) -> Vec<String> {
        let mut args = vec!["-d".to_string(), "--name".to_string(), self.name.clone()];

        if let Some(policy) = &self.restart_policy {
            args.extend(["--restart".to_string(), policy.clone()]);
        }
        if let Some(env_file) = &self.env_file {
            args.extend(["--env-file".to_string(), env_file.display().to_string()]);
        }
        for mount in &self.mounts {
            args.extend(["-v".to_string(), mount.to_arg()]);
        }
        for port in &self.ports {
            args.extend(["-p".to_string(), format!("{}:{}", port.host, port.container)]);
        }
        for (key, value) in &self.env {
            args.extend(["-e".to_string(), format!("{}={}", key, value)]);
        }
        for cap in &self.capabilities {
            args.extend(["--cap-add".to_string(), cap.clone()]);
        }
        for device in &self.devices {
            args.extend(["--device".to_string(), device.clone()]);
        }
        if let Some(network) = &self.network {
            args.extend(["--network".to_string(), network.clone()]);
        }
        for host in &self.extra_hosts {
            args.push(format!("--add-host={}", host));
        }
        for (key, value) in &self.labels {
            args.extend(["--label".to_string(), format!("{}={}", key, value)]);
        }

        args.push(self.image.clone());
        args
    }
}

/// Ephemeral, auto-removed container running a single command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OneShotSpec {
    pub name: String,
    pub image: String,
    pub env_file: Option<PathBuf>,
    pub mounts: Vec<Mount>,
    pub command: Vec<String>,
}

impl OneShotSpec {
    /// `docker run` arguments (without the leading `run`)
    pub fn to_args(&self) -> Vec<String> {
        let mut args = vec!["--rm".to_string(), "--name".to_string(), self.name.clone()];
        if let Some(env_file) = &self.env_file {
            args.extend(["--env-file".to_string(), env_file.display().to_string()]);
        }
        for mount in &self.mounts {
            args.extend(["-v".to_string(), mount.to_arg()]);
        }
        args.push(self.image.clone());
        args.extend(self.command.iter().cloned());
        args
    }
}
