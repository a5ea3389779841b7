//! botfleet Registry - persistent fleet state
//!
//! This crate owns the only state shared across CLI invocations:
//!
//! - **RegistryStore**: the JSON registry document (stack settings + bots)
//! - **allocate**: lowest-free-slot port window allocation
//! - **HomeConfigStore**: user-scoped cache of reusable secrets and defaults
//!
//! ## Concurrency
//!
//! Every mutation is a whole-document read-modify-write. `RegistryStore::update`
//! holds an exclusive advisory lock on a sibling `.lock` file for the
//! duration of the read, the closure and the atomic (temp-file + rename)
//! save, so two invocations serialize instead of silently losing one side's
//! update. Plain `save` does not lock.

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod error;
pub mod home;
mod lock;
pub mod ports;
pub mod store;

pub use error::{RegistryError, Result};
pub use home::{home_keys, HomeConfig, HomeConfigStore};
pub use lock::RegistryLock;
pub use ports::allocate;
pub use store::RegistryStore;
