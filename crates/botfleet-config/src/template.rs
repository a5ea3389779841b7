//! Seed templates and `{{VAR}}` substitution

use crate::error::Result;
use crate::io::read_optional;
use std::path::Path;

const BUILTIN_ENV: &str = include_str!("../seed/env.template");
const BUILTIN_GATEWAY: &str = include_str!("../seed/openclaw.json.template");

/// Replace every `{{KEY}}` with its value in one left-to-right pass, so
/// substituted values are never expanded again. Unknown placeholders stay
/// as-is.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find("{{") {
        out.push_str(&rest[..open]);
        let after = &rest[open + 2..];
        let Some(close) = after.find("}}") else {
            rest = &rest[open..];
            break;
        };
        let key = &after[..close];
        if key.contains("{{") {
            out.push_str("{{");
            rest = after;
            continue;
        }
        match vars.iter().find(|(k, _)| *k == key) {
            Some((_, value)) => out.push_str(value),
            None => out.push_str(&rest[open..open + 2 + close + 2]),
        }
        rest = &after[close + 2..];
    }
    out.push_str(rest);
    out
}

/// Templates for the two generated artifacts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedTemplates {
    pub env: String,
    pub gateway: String,
}

impl Default for SeedTemplates {
    fn default() -> Self {
        Self::builtin()
    }
}

impl SeedTemplates {
    pub fn builtin() -> Self {
        Self {
            env: BUILTIN_ENV.to_string(),
            gateway: BUILTIN_GATEWAY.to_string(),
        }
    }

    /// Built-ins, overridden by `env.template` / `openclaw.json.template`
    /// found in `seed_dir`.
    pub fn load(seed_dir: &Path) -> Result<Self> {
        let mut templates = Self::builtin();
        if let Some(env) = read_optional(&seed_dir.join("env.template"))? {
            tracing::debug!(dir = %seed_dir.display(), "Using seed env template override");
            templates.env = env;
        }
        if let Some(gateway) = read_optional(&seed_dir.join("openclaw.json.template"))? {
            tracing::debug!(dir = %seed_dir.display(), "Using seed gateway template override");
            templates.gateway = gateway;
        }
        Ok(templates)
    }

    /// Render a gateway template with the token filled in, so the result
    /// can be parsed as a document.
    pub fn render_gateway(&self, token: &str) -> String {
        render(&self.gateway, &[("OPENCLAW_GATEWAY_TOKEN", token)])
    }
}
