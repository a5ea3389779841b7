//! The container runtime capability set

use crate::error::Result;
use crate::spec::{OneShotSpec, RunSpec};
use async_trait::async_trait;
use std::path::Path;

/// Opaque container runtime
///
/// Queries always hit the runtime; implementations must not cache state.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Whether the runtime daemon is reachable
    async fn check_available(&self) -> bool;

    async fn image_exists(&self, image: &str) -> Result<bool>;

    /// Build `image` from a context directory
    async fn build_image(&self, image: &str, context: &Path) -> Result<()>;

    /// Exists in any state (running or stopped)
    async fn container_exists(&self, name: &str) -> Result<bool>;

    async fn container_running(&self, name: &str) -> Result<bool>;

    /// Human-readable status line, `None` when absent
    async fn container_status(&self, name: &str) -> Result<Option<String>>;

    async fn start(&self, name: &str) -> Result<()>;

    async fn stop(&self, name: &str) -> Result<()>;

    async fn remove(&self, name: &str) -> Result<()>;

    /// Create and start a container in one call
    async fn run_detached(&self, spec: &RunSpec) -> Result<()>;

    /// Run to completion and return the exit code
    async fn run_once(&self, spec: &OneShotSpec) -> Result<i32>;

    /// Non-interactive exec with captured stdout
    async fn exec(&self, name: &str, command: &[String]) -> Result<String>;

    /// Exec attached to the caller's terminal; returns the exit code
    async fn exec_interactive(&self, name: &str, command: &[String]) -> Result<i32>;

    /// Stream logs to the caller's terminal until interrupted
    async fn follow_logs(&self, name: &str) -> Result<()>;

    /// Create the network if it does not exist
    async fn ensure_network(&self, name: &str) -> Result<()>;
}
