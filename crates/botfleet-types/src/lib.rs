//! botfleet Types - Core types for the bot fleet
//!
//! botfleet provisions isolated agent instances, each backed by one
//! container, a reserved port range and a pair of generated files
//! (secrets + gateway config) on disk.
//!
//! ## Key Concepts
//!
//! - **BotEntry**: Declarative description of one bot (provider, model, channels)
//! - **Registry**: The fleet document: stack settings plus every bot entry
//! - **PortAssignment**: The slot-aligned port window owned by a bot
//! - **ContainerState**: Observed state of a bot's container

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod bot;
pub mod container;
pub mod error;
pub mod ports;
pub mod registry;

pub use bot::{validate_name, BotEntry, Channel, MattermostSetting, ProxySetting};
pub use container::ContainerState;
pub use error::{Result, TypesError};
pub use ports::{PortAssignment, RANGE_SIZE};
pub use registry::{Registry, StackSettings, REGISTRY_VERSION};
