//! In-memory implementation of [`ContainerRuntime`]
//!
//! Suitable for development and testing. Every call is recorded so tests
//! can assert exactly which operations a flow performed.

use crate::error::{Result, RuntimeError};
use crate::runtime::ContainerRuntime;
use crate::spec::{OneShotSpec, RunSpec};
use async_trait::async_trait;
use botfleet_types::ContainerState;
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::Arc;

/// A recorded runtime call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeOp {
    BuildImage(String),
    EnsureNetwork(String),
    RunDetached(RunSpec),
    RunOnce(OneShotSpec),
    Start(String),
    Stop(String),
    Remove(String),
    Exec { name: String, command: Vec<String> },
    ExecInteractive { name: String, command: Vec<String> },
    FollowLogs(String),
}

impl RuntimeOp {
    fn kind(&self) -> &'static str {
        match self {
            RuntimeOp::BuildImage(_) => "build_image",
            RuntimeOp::EnsureNetwork(_) => "ensure_network",
            RuntimeOp::RunDetached(_) => "run_detached",
            RuntimeOp::RunOnce(_) => "run_once",
            RuntimeOp::Start(_) => "start",
            RuntimeOp::Stop(_) => "stop",
            RuntimeOp::Remove(_) => "remove",
            RuntimeOp::Exec { .. } => "exec",
            RuntimeOp::ExecInteractive { .. } => "exec_interactive",
            RuntimeOp::FollowLogs(_) => "follow_logs",
        }
    }
}

type OneShotHook = Arc<dyn Fn(&OneShotSpec) -> i32 + Send + Sync>;

#[derive(Debug, Clone)]
struct SimContainer {
    running: bool,
    spec: Option<RunSpec>,
}

#[derive(Default)]
struct State {
    unavailable: bool,
    images: BTreeSet<String>,
    networks: BTreeSet<String>,
    containers: BTreeMap<String, SimContainer>,
    ops: Vec<RuntimeOp>,
    fail_after_apply: BTreeSet<&'static str>,
    exec_output: String,
}

/// Simulated runtime
#[derive(Default)]
pub struct InMemoryRuntime {
    state: Mutex<State>,
    one_shot: Mutex<Option<OneShotHook>>,
}

impl std::fmt::Debug for InMemoryRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryRuntime")
            .field("containers", &self.state.lock().containers.len())
            .finish()
    }
}

impl InMemoryRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_available(&self, available: bool) {
        self.state.lock().unavailable = !available;
    }

    pub fn add_image(&self, image: &str) {
        self.state.lock().images.insert(image.to_string());
    }

    /// Seed an existing container without recording an operation
    pub fn add_container(&self, name: &str, running: bool) {
        self.state.lock().containers.insert(
            name.to_string(),
            SimContainer {
                running,
                spec: None,
            },
        );
    }

    /// Drop a container behind the controller's back
    pub fn remove_externally(&self, name: &str) {
        self.state.lock().containers.remove(name);
    }

    /// Make the next call of `op` (e.g. `"stop"`) report failure after its
    /// state change has been applied.
    pub fn fail_after_apply(&self, op: &'static str) {
        self.state.lock().fail_after_apply.insert(op);
    }

    /// Called for every one-shot run; its return value is the exit code.
    /// Without a hook one-shot runs exit 0.
    pub fn on_run_once<F>(&self, hook: F)
    where
        F: Fn(&OneShotSpec) -> i32 + Send + Sync + 'static,
    {
        *self.one_shot.lock() = Some(Arc::new(hook));
    }

    pub fn set_exec_output(&self, output: impl Into<String>) {
        self.state.lock().exec_output = output.into();
    }

    pub fn ops(&self) -> Vec<RuntimeOp> {
        self.state.lock().ops.clone()
    }

    pub fn clear_ops(&self) {
        self.state.lock().ops.clear();
    }

    /// Number of recorded calls of a kind (`"run_once"`, `"stop"`, ...)
    pub fn count(&self, kind: &str) -> usize {
        self.state
            .lock()
            .ops
            .iter()
            .filter(|op| op.kind() == kind)
            .count()
    }

    pub fn container_state(&self, name: &str) -> ContainerState {
        let state = self.state.lock();
        match state.containers.get(name) {
            Some(c) => ContainerState::observe(true, c.running),
            None => ContainerState::Absent,
        }
    }

    /// Run parameters the container was created with, if it was created here
    pub fn run_spec(&self, name: &str) -> Option<RunSpec> {
        self.state
            .lock()
            .containers
            .get(name)
            .and_then(|c| c.spec.clone())
    }

    pub fn has_network(&self, name: &str) -> bool {
        self.state.lock().networks.contains(name)
    }

    fn record(&self, op: RuntimeOp) -> Result<()> {
        let mut state = self.state.lock();
        if state.unavailable {
            return Err(RuntimeError::Unavailable);
        }
        state.ops.push(op);
        Ok(())
    }

    fn injected(&self, op: &'static str) -> Result<()> {
        if self.state.lock().fail_after_apply.remove(op) {
            return Err(RuntimeError::CommandFailed {
                command: op.to_string(),
                status: "exit status: 1".to_string(),
                stderr: "injected failure".to_string(),
            });
        }
        Ok(())
    }

    fn ensure_reachable(&self) -> Result<()> {
        if self.state.lock().unavailable {
            return Err(RuntimeError::Unavailable);
        }
        Ok(())
    }

    fn with_container<T>(
        &self,
        name: &str,
        f: impl FnOnce(&mut SimContainer) -> Result<T>,
    ) -> Result<T> {
        let mut state = self.state.lock();
        match state.containers.get_mut(name) {
            Some(container) => f(container),
            None => Err(RuntimeError::NoSuchContainer(name.to_string())),
        }
    }
}

#[async_trait]
impl ContainerRuntime for InMemoryRuntime {
    async fn check_available(&self) -> bool {
        !self.state.lock().unavailable
    }

    async fn image_exists(&self, image: &str) -> Result<bool> {
        self.ensure_reachable()?;
        Ok(self.state.lock().images.contains(image))
    }

    async fn build_image(&self, image: &str, _context: &Path) -> Result<()> {
        self.record(RuntimeOp::BuildImage(image.to_string()))?;
        self.state.lock().images.insert(image.to_string());
        Ok(())
    }

    async fn container_exists(&self, name: &str) -> Result<bool> {
        self.ensure_reachable()?;
        Ok(self.state.lock().containers.contains_key(name))
    }

    async fn container_running(&self, name: &str) -> Result<bool> {
        self.ensure_reachable()?;
        Ok(self
            .state
            .lock()
            .containers
            .get(name)
            .is_some_and(|c| c.running))
    }

    async fn container_status(&self, name: &str) -> Result<Option<String>> {
        self.ensure_reachable()?;
        Ok(self.state.lock().containers.get(name).map(|c| {
            if c.running {
                "Up".to_string()
            } else {
                "Exited (0)".to_string()
            }
        }))
    }

    async fn start(&self, name: &str) -> Result<()> {
        self.record(RuntimeOp::Start(name.to_string()))?;
        self.with_container(name, |c| {
            c.running = true;
            Ok(())
        })?;
        self.injected("start")
    }

    async fn stop(&self, name: &str) -> Result<()> {
        self.record(RuntimeOp::Stop(name.to_string()))?;
        self.with_container(name, |c| {
            c.running = false;
            Ok(())
        })?;
        self.injected("stop")
    }

    async fn remove(&self, name: &str) -> Result<()> {
        self.record(RuntimeOp::Remove(name.to_string()))?;
        self.with_container(name, |c| {
            if c.running {
                return Err(RuntimeError::CommandFailed {
                    command: format!("rm {}", name),
                    status: "exit status: 1".to_string(),
                    stderr: "container is running: stop the container before removing".to_string(),
                });
            }
            Ok(())
        })?;
        self.state.lock().containers.remove(name);
        self.injected("remove")
    }

    async fn run_detached(&self, spec: &RunSpec) -> Result<()> {
        self.record(RuntimeOp::RunDetached(spec.clone()))?;
        {
            let mut state = self.state.lock();
            if state.containers.contains_key(&spec.name) {
                return Err(RuntimeError::CommandFailed {
                    command: format!("run --name {}", spec.name),
                    status: "exit status: 125".to_string(),
                    stderr: "container name already in use".to_string(),
                });
            }
            if !state.images.contains(&spec.image) {
                return Err(RuntimeError::NoSuchImage(spec.image.clone()));
            }
            state.containers.insert(
                spec.name.clone(),
                SimContainer {
                    running: true,
                    spec: Some(spec.clone()),
                },
            );
        }
        self.injected("run_detached")
    }

    async fn run_once(&self, spec: &OneShotSpec) -> Result<i32> {
        self.record(RuntimeOp::RunOnce(spec.clone()))?;
        let hook = self.one_shot.lock().clone();
        Ok(hook.map_or(0, |hook| hook(spec)))
    }

    async fn exec(&self, name: &str, command: &[String]) -> Result<String> {
        self.record(RuntimeOp::Exec {
            name: name.to_string(),
            command: command.to_vec(),
        })?;
        self.with_container(name, |c| {
            if c.running {
                Ok(())
            } else {
                Err(RuntimeError::CommandFailed {
                    command: format!("exec {}", name),
                    status: "exit status: 1".to_string(),
                    stderr: "container is not running".to_string(),
                })
            }
        })?;
        Ok(self.state.lock().exec_output.clone())
    }

    async fn exec_interactive(&self, name: &str, command: &[String]) -> Result<i32> {
        self.record(RuntimeOp::ExecInteractive {
            name: name.to_string(),
            command: command.to_vec(),
        })?;
        self.with_container(name, |_| Ok(0))
    }

    async fn follow_logs(&self, name: &str) -> Result<()> {
        self.record(RuntimeOp::FollowLogs(name.to_string()))?;
        self.with_container(name, |_| Ok(()))
    }

    async fn ensure_network(&self, name: &str) -> Result<()> {
        self.record(RuntimeOp::EnsureNetwork(name.to_string()))?;
        self.state.lock().networks.insert(name.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_run_detached_requires_image() {
        let runtime = InMemoryRuntime::new();
        let spec = RunSpec {
            name: "botfleet-nova".into(),
            image: "botfleet-base".into(),
            ..Default::default()
        };
        assert!(matches!(
            runtime.run_detached(&spec).await,
            Err(RuntimeError::NoSuchImage(_))
        ));

        runtime.add_image("botfleet-base");
        runtime.run_detached(&spec).await.unwrap();
        assert_eq!(runtime.container_state("botfleet-nova"), ContainerState::Running);
        assert_eq!(runtime.run_spec("botfleet-nova"), Some(spec));
    }

    #[tokio::test]
    async fn test_remove_running_fails() {
        let runtime = InMemoryRuntime::new();
        runtime.add_container("c", true);
        assert!(runtime.remove("c").await.is_err());
        runtime.stop("c").await.unwrap();
        runtime.remove("c").await.unwrap();
        assert_eq!(runtime.container_state("c"), ContainerState::Absent);
        assert_eq!(runtime.count("stop"), 1);
        assert_eq!(runtime.count("remove"), 2);
    }

    #[tokio::test]
    async fn test_unavailable() {
        let runtime = InMemoryRuntime::new();
        runtime.set_available(false);
        assert!(!runtime.check_available().await);
        assert!(matches!(
            runtime.ensure_network("n").await,
            Err(RuntimeError::Unavailable)
        ));
    }

    #[tokio::test]
    async fn test_one_shot_hook() {
        let runtime = InMemoryRuntime::new();
        assert_eq!(runtime.run_once(&OneShotSpec::default()).await.unwrap(), 0);
        runtime.on_run_once(|_| 3);
        assert_eq!(runtime.run_once(&OneShotSpec::default()).await.unwrap(), 3);
        assert_eq!(runtime.count("run_once"), 2);
    }
}
