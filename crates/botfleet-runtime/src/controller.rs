//! Container lifecycle controller
//!
//! Every decision re-queries the runtime. When a runtime command fails the
//! controller observes again and reports success if the container ended up
//! in the requested state anyway (e.g. it was removed concurrently).

use crate::error::{Result, RuntimeError};
use crate::runtime::ContainerRuntime;
use crate::spec::{OneShotSpec, RunSpec};
use botfleet_types::ContainerState;
use std::sync::Arc;

/// Outcome of a lifecycle operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Already in the target state
    Unchanged(ContainerState),
    Changed {
        from: ContainerState,
        to: ContainerState,
    },
}

impl Transition {
    pub fn changed(&self) -> bool {
        matches!(self, Transition::Changed { .. })
    }

    /// State after the operation
    pub fn state(&self) -> ContainerState {
        match self {
            Transition::Unchanged(state) => *state,
            Transition::Changed { to, .. } => *to,
        }
    }
}

/// Drives one container through Absent / Created / Running
#[derive(Clone)]
pub struct LifecycleController {
    runtime: Arc<dyn ContainerRuntime>,
}

impl LifecycleController {
    pub fn new(runtime: Arc<dyn ContainerRuntime>) -> Self {
        Self { runtime }
    }

    pub fn runtime(&self) -> &Arc<dyn ContainerRuntime> {
        &self.runtime
    }

    pub async fn state(&self, name: &str) -> Result<ContainerState> {
        if !self.runtime.container_exists(name).await? {
            return Ok(ContainerState::Absent);
        }
        let running = self.runtime.container_running(name).await?;
        Ok(ContainerState::observe(true, running))
    }

    /// Re-observe after a failed command; the failure stands unless the
    /// container reached an acceptable state.
    async fn settle(
        &self,
        name: &str,
        from: ContainerState,
        accept: impl Fn(ContainerState) -> bool,
        err: RuntimeError,
    ) -> Result<Transition> {
        let observed = self.state(name).await?;
        if accept(observed) {
            tracing::debug!(container = %name, error = %err, state = %observed, "Command failed but target state reached");
            Ok(Transition::Changed { from, to: observed })
        } else {
            Err(err)
        }
    }

    /// Create-and-run when absent, start when stopped, nothing when running.
    pub async fn ensure_running(&self, spec: &RunSpec) -> Result<Transition> {
        let from = self.state(&spec.name).await?;
        let result = match from {
            ContainerState::Running => return Ok(Transition::Unchanged(from)),
            ContainerState::Created => {
                tracing::info!(container = %spec.name, "Starting stopped container");
                self.runtime.start(&spec.name).await
            }
            ContainerState::Absent => {
                tracing::info!(container = %spec.name, image = %spec.image, "Creating container");
                self.runtime.run_detached(spec).await
            }
        };

        match result {
            Ok(()) => Ok(Transition::Changed {
                from,
                to: ContainerState::Running,
            }),
            Err(e) => self.settle(&spec.name, from, |s| s.is_running(), e).await,
        }
    }

    /// Start an existing container. Starting a running container succeeds.
    pub async fn start(&self, name: &str) -> Result<Transition> {
        let from = self.state(name).await?;
        match from {
            ContainerState::Running => Ok(Transition::Unchanged(from)),
            ContainerState::Absent => Err(RuntimeError::NoSuchContainer(name.to_string())),
            ContainerState::Created => match self.runtime.start(name).await {
                Ok(()) => Ok(Transition::Changed {
                    from,
                    to: ContainerState::Running,
                }),
                Err(e) => self.settle(name, from, |s| s.is_running(), e).await,
            },
        }
    }

    /// Stopping a stopped or absent container succeeds.
    pub async fn stop(&self, name: &str) -> Result<Transition> {
        let from = self.state(name).await?;
        if !from.is_running() {
            return Ok(Transition::Unchanged(from));
        }
        tracing::info!(container = %name, "Stopping container");
        match self.runtime.stop(name).await {
            Ok(()) => Ok(Transition::Changed {
                from,
                to: ContainerState::Created,
            }),
            Err(e) => self.settle(name, from, |s| !s.is_running(), e).await,
        }
    }

    /// Stop if needed, then remove. Removing an absent container succeeds.
    pub async fn remove(&self, name: &str) -> Result<Transition> {
        let from = self.state(name).await?;
        if from == ContainerState::Absent {
            return Ok(Transition::Unchanged(from));
        }
        if from.is_running() {
            self.stop(name).await?;
        }
        tracing::info!(container = %name, "Removing container");
        match self.runtime.remove(name).await {
            Ok(()) => Ok(Transition::Changed {
                from,
                to: ContainerState::Absent,
            }),
            Err(e) => self.settle(name, from, |s| !s.exists(), e).await,
        }
    }

    /// Stop + start a running container; other states are left alone.
    pub async fn restart(&self, name: &str) -> Result<Transition> {
        let from = self.state(name).await?;
        if !from.is_running() {
            return Ok(Transition::Unchanged(from));
        }
        tracing::info!(container = %name, "Restarting container");
        self.stop(name).await?;
        self.start(name).await?;
        Ok(Transition::Changed {
            from,
            to: ContainerState::Running,
        })
    }

    /// Run an ephemeral container; a non-zero exit is an error.
    pub async fn run_once(&self, spec: &OneShotSpec) -> Result<()> {
        let code = self.runtime.run_once(spec).await?;
        if code != 0 {
            return Err(RuntimeError::CommandFailed {
                command: spec.command.join(" "),
                status: format!("exit code {}", code),
                stderr: String::new(),
            });
        }
        Ok(())
    }
}
