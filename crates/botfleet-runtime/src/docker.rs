//! `docker` CLI implementation of [`ContainerRuntime`]

use crate::error::{Result, RuntimeError};
use crate::runtime::ContainerRuntime;
use crate::spec::{OneShotSpec, RunSpec};
use async_trait::async_trait;
use std::path::Path;
use std::process::{Output, Stdio};
use tokio::process::Command;

/// Runtime backed by the `docker` binary on `PATH`
#[derive(Debug, Clone)]
pub struct DockerCli {
    binary: String,
}

impl Default for DockerCli {
    fn default() -> Self {
        Self::new("docker")
    }
}

impl DockerCli {
    /// Use a specific binary (e.g. `podman`, or an absolute path)
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    fn describe(&self, args: &[String]) -> String {
        format!("{} {}", self.binary, args.join(" "))
    }

    /// Run with captured output; no status check.
    async fn output(&self, args: &[String]) -> Result<Output> {
        tracing::debug!(command = %self.describe(args), "docker");
        Command::new(&self.binary)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|source| RuntimeError::Spawn {
                command: self.describe(args),
                source,
            })
    }

    /// Run with captured output; non-zero exit is an error.
    async fn checked(&self, args: &[String]) -> Result<String> {
        let output = self.output(args).await?;
        if !output.status.success() {
            return Err(RuntimeError::CommandFailed {
                command: self.describe(args),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Run attached to the caller's terminal.
    async fn attached(&self, args: &[String]) -> Result<i32> {
        tracing::debug!(command = %self.describe(args), "docker (attached)");
        let status = Command::new(&self.binary)
            .args(args)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await
            .map_err(|source| RuntimeError::Spawn {
                command: self.describe(args),
                source,
            })?;
        Ok(status.code().unwrap_or(-1))
    }

    /// Container names matching exactly, optionally including stopped ones
    async fn ps_names(&self, name: &str, all: bool) -> Result<String> {
        let mut args = vec!["ps".to_string()];
        if all {
            args.push("-a".to_string());
        }
        args.extend([
            "--filter".to_string(),
            format!("name=^/{}$", name),
            "--format".to_string(),
            "{{.Names}}".to_string(),
        ]);
        self.checked(&args).await
    }
}

fn strings(args: &[&str]) -> Vec<String> {
    args.iter().map(|s| s.to_string()).collect()
}

#[async_trait]
impl ContainerRuntime for DockerCli {
    async fn check_available(&self) -> bool {
        match self.output(&strings(&["info"])).await {
            Ok(output) => output.status.success(),
            Err(e) => {
                tracing::debug!(error = %e, "docker info failed");
                false
            }
        }
    }

    async fn image_exists(&self, image: &str) -> Result<bool> {
        let out = self.checked(&strings(&["images", "-q", image])).await?;
        Ok(!out.trim().is_empty())
    }

    async fn build_image(&self, image: &str, context: &Path) -> Result<()> {
        let args = vec![
            "build".to_string(),
            "-t".to_string(),
            image.to_string(),
            context.display().to_string(),
        ];
        self.checked(&args).await.map(|_| ())
    }

    async fn container_exists(&self, name: &str) -> Result<bool> {
        Ok(self.ps_names(name, true).await?.trim() == name)
    }

    async fn container_running(&self, name: &str) -> Result<bool> {
        Ok(self.ps_names(name, false).await?.trim() == name)
    }

    async fn container_status(&self, name: &str) -> Result<Option<String>> {
        let args = vec![
            "ps".to_string(),
            "-a".to_string(),
            "--filter".to_string(),
            format!("name=^/{}$", name),
            "--format".to_string(),
            "{{.Status}}".to_string(),
        ];
        let out = self.checked(&args).await?;
        let status = out.trim();
        Ok((!status.is_empty()).then(|| status.to_string()))
    }

    async fn start(&self, name: &str) -> Result<()> {
        self.checked(&strings(&["start", name])).await.map(|_| ())
    }

    async fn stop(&self, name: &str) -> Result<()> {
        self.checked(&strings(&["stop", name])).await.map(|_| ())
    }

    async fn remove(&self, name: &str) -> Result<()> {
        self.checked(&strings(&["rm", name])).await.map(|_| ())
    }

    async fn run_detached(&self, spec: &RunSpec) -> Result<()> {
        let mut args = vec!["run".to_string()];
        args.extend(spec.to_args());
        self.checked(&args).await.map(|_| ())
    }

    async fn run_once(&self, spec: &OneShotSpec) -> Result<i32> {
        let mut args = vec!["run".to_string()];
        args.extend(spec.to_args());
        let output = self.output(&args).await?;
        let code = output.status.code().unwrap_or(-1);
        if code != 0 {
            tracing::debug!(
                container = %spec.name,
                code,
                stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                "One-shot container exited non-zero"
            );
        }
        Ok(code)
    }

    async fn exec(&self, name: &str, command: &[String]) -> Result<String> {
        let mut args = vec!["exec".to_string(), name.to_string()];
        args.extend(command.iter().cloned());
        self.checked(&args).await
    }

    async fn exec_interactive(&self, name: &str, command: &[String]) -> Result<i32> {
        let mut args = vec!["exec".to_string(), "-it".to_string(), name.to_string()];
        args.extend(command.iter().cloned());
        self.attached(&args).await
    }

    async fn follow_logs(&self, name: &str) -> Result<()> {
        self.attached(&strings(&["logs", "-f", name])).await.map(|_| ())
    }

    async fn ensure_network(&self, name: &str) -> Result<()> {
        let inspect = self.output(&strings(&["network", "inspect", name])).await?;
        if inspect.status.success() {
            return Ok(());
        }
        tracing::info!(network = %name, "Creating network");
        self.checked(&strings(&["network", "create", name])).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_binary_is_unavailable() {
        let docker = DockerCli::new("botfleet-no-such-docker-binary");
        assert!(!docker.check_available().await);

        let err = docker.image_exists("botfleet-base").await.unwrap_err();
        assert!(matches!(err, RuntimeError::Spawn { .. }));
    }

    #[test]
    fn test_describe() {
        let docker = DockerCli::default();
        assert_eq!(docker.describe(&strings(&["ps", "-a"])), "docker ps -a");
    }
}
