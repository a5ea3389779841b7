//! botfleet Runtime - container runtime boundary
//!
//! The runtime itself is an opaque collaborator reached through
//! [`ContainerRuntime`]. Two implementations ship here:
//!
//! - [`DockerCli`]: shells out to the `docker` binary
//! - [`InMemoryRuntime`]: simulated state for development and testing
//!
//! [`LifecycleController`] layers the bot-level state machine on top and
//! treats "already in the target state" as success, so callers never need
//! a separate existence pre-check.

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod controller;
pub mod docker;
pub mod error;
pub mod memory;
pub mod probe;
pub mod runtime;
pub mod spec;

pub use controller::{LifecycleController, Transition};
pub use docker::DockerCli;
pub use error::{Result, RuntimeError};
pub use memory::{InMemoryRuntime, RuntimeOp};
pub use probe::ReadinessProbe;
pub use runtime::ContainerRuntime;
pub use spec::{Mount, OneShotSpec, PortMapping, RunSpec};
