//! CLI command implementations

pub mod access;
pub mod bot;
pub mod channels;
pub mod lifecycle;

use crate::output::OutputFormat;
use crate::prompt::Prompter;
use botfleet_reconcile::Reconciler;
use serde_json::{Map, Value};

/// Shared state for one invocation
pub struct Context {
    pub reconciler: Reconciler,
    pub format: OutputFormat,
    /// Provider API key override (`BOTFLEET_API_KEY`)
    pub api_key: Option<String>,
    pub prompt: Prompter,
}

/// `{"botToken": token}` credential block
pub(crate) fn bot_token(token: &str) -> Map<String, Value> {
    let mut credentials = Map::new();
    credentials.insert("botToken".to_string(), Value::String(token.to_string()));
    credentials
}

/// First characters of a secret, for confirmation prompts
pub(crate) fn preview(secret: &str) -> String {
    let head: String = secret.chars().take(8).collect();
    format!("{}...", head)
}
