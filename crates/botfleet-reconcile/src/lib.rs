//! botfleet Reconcile - converge bots to their registry entries
//!
//! [`Reconciler::apply`] is the single convergence path. Every other
//! operation (channel toggles, proxy, tailscale) edits the registry entry
//! and then runs `apply`, so the generated artifacts only ever come from
//! one merge routine.
//!
//! ## Apply order
//!
//! 1. Runtime check, image build if missing, shared network
//! 2. Bot directories; first-time workspace seeding and `git init`
//! 3. Secrets file merge
//! 4. Gateway config merge
//! 5. One-time onboarding (ephemeral container)
//! 6. Restart if running, otherwise report the start hint

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod error;
pub mod layout;
pub mod ops;
pub mod provision;
pub mod reconciler;
pub mod report;
pub mod scaffold;

pub use error::{ReconcileError, Result};
pub use layout::BotLayout;
pub use ops::BotDefinition;
pub use provision::{provision, ChannelProvisioner, MattermostClient, ProvisionError, ProvisionedAccount};
pub use reconciler::Reconciler;
pub use report::{
    ApplyOptions, ApplyReport, ArtifactChange, BotStatus, ChannelReport, DestroyOptions,
    DestroyReport, Onboarding, RebuildReport, StartReport,
};
