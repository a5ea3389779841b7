//! botfleet Config - generated per-bot artifacts
//!
//! Each bot directory carries two generated files that are created once from
//! a seed template and afterwards patched in place:
//!
//! - **Secrets file** (`.env`): typed key/value lines, see [`SecretsFile`]
//! - **Gateway config** (`openclaw.json`): nested JSON, see [`GatewayConfig`]
//!
//! Every patch is idempotent. Fields unrelated to the current pass keep
//! their exact bytes.

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod error;
pub mod gateway;
pub mod io;
pub mod providers;
pub mod secrets;
pub mod template;
pub mod token;

pub use error::{MergeError, Result};
pub use gateway::{GatewayConfig, DEFAULT_TRUSTED_PROXIES};
pub use providers::{ProviderEndpoint, ProviderKind, ProviderRouting, UnknownProvider};
pub use secrets::{env_keys, SecretsFile};
pub use template::{render, SeedTemplates};
pub use token::generate_token;
