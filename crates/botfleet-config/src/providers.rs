//! Provider table
//!
//! Each provider knows its default model, which secret it needs, and how to
//! build the model-routing fragment merged into the gateway config.

use serde_json::{json, Value};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

const OLLAMA_BASE_URL: &str = "http://host.docker.internal:11434/v1";

/// Provider key not present in the table
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown provider '{0}' (expected one of: anthropic, openai, openai-codex, ollama)")]
pub struct UnknownProvider(pub String);

/// Supported model providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    Anthropic,
    OpenAi,
    OpenAiCodex,
    Ollama,
}

/// `models.providers.<key>` descriptor for providers the gateway does not
/// know natively
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderEndpoint {
    pub key: String,
    pub config: Value,
}

/// Derived model routing, replaced wholesale on every apply
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderRouting {
    /// `agents.defaults.model`
    pub agent_model: Value,
    /// `agents.defaults.models`
    pub agent_models: Value,
    /// `agents.defaults.subagents.model`
    pub subagents_model: String,
    pub endpoint: Option<ProviderEndpoint>,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 4] = [
        ProviderKind::Anthropic,
        ProviderKind::OpenAi,
        ProviderKind::OpenAiCodex,
        ProviderKind::Ollama,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::OpenAi => "openai",
            ProviderKind::OpenAiCodex => "openai-codex",
            ProviderKind::Ollama => "ollama",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ProviderKind::Anthropic => "Anthropic",
            ProviderKind::OpenAi => "OpenAI",
            ProviderKind::OpenAiCodex => "OpenAI (Codex subscription)",
            ProviderKind::Ollama => "Ollama (local)",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            ProviderKind::Anthropic => "anthropic/claude-sonnet-4-6",
            ProviderKind::OpenAi => "openai/gpt-4.1",
            ProviderKind::OpenAiCodex => "openai-codex/codex-mini-latest",
            ProviderKind::Ollama => "ollama/minimax-m2.5:cloud",
        }
    }

    /// Secrets-file variable holding the API key, if the provider needs one
    pub fn api_key_var(&self) -> Option<&'static str> {
        match self {
            ProviderKind::Anthropic => Some("ANTHROPIC_API_KEY"),
            ProviderKind::OpenAi => Some("OPENAI_API_KEY"),
            ProviderKind::OpenAiCodex | ProviderKind::Ollama => None,
        }
    }

    /// Home-config key the API key is cached under
    pub fn home_key(&self) -> Option<&'static str> {
        match self {
            ProviderKind::Anthropic => Some("anthropicKey"),
            ProviderKind::OpenAi => Some("openaiKey"),
            ProviderKind::OpenAiCodex | ProviderKind::Ollama => None,
        }
    }

    pub fn needs_api_key(&self) -> bool {
        self.api_key_var().is_some()
    }

    /// Prompt label for the API key
    pub fn api_key_label(&self) -> Option<String> {
        self.needs_api_key().then(|| format!("{} API key", self.label()))
    }

    /// Extra instructions printed after creating a bot with this provider
    pub fn post_setup_hint(&self, bot: &str) -> Option<String> {
        match self {
            ProviderKind::OpenAiCodex => Some(format!(
                "After starting, authenticate inside the container:\n  botfleet shell {}\n  openclaw models auth login --provider openai-codex",
                bot
            )),
            _ => None,
        }
    }

    /// The entry's model, or this provider's default when empty
    pub fn resolve_model<'a>(&self, model: &'a str) -> &'a str {
        if model.trim().is_empty() {
            self.default_model()
        } else {
            model
        }
    }

    pub fn build_config(&self, model: &str) -> ProviderRouting {
        let model = self.resolve_model(model);
        let endpoint = match self {
            ProviderKind::Ollama => {
                let bare = model.strip_prefix("ollama/").unwrap_or(model);
                Some(ProviderEndpoint {
                    key: "ollama".to_string(),
                    config: json!({
                        "baseUrl": OLLAMA_BASE_URL,
                        "apiKey": "ollama",
                        "api": "openai-completions",
                        "models": [{
                            "id": bare,
                            "name": bare,
                            "reasoning": false,
                            "contextWindow": 32768,
                            "maxTokens": 8192,
                            "cost": { "input": 0, "output": 0 }
                        }]
                    }),
                })
            }
            _ => None,
        };

        ProviderRouting {
            agent_model: json!({ "primary": model }),
            agent_models: json!({ model: { "alias": "default" } }),
            subagents_model: model.to_string(),
            endpoint,
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for ProviderKind {
    type Err = UnknownProvider;

    /// Case-insensitive; a trailing `(...)` label suffix is ignored so that
    /// display labels parse too.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_lowercase();
        if let Some(p) = ProviderKind::ALL
            .into_iter()
            .find(|p| p.label().to_lowercase() == lowered)
        {
            return Ok(p);
        }

        let key = match lowered.find('(') {
            Some(idx) => lowered[..idx].trim_end(),
            None => lowered.as_str(),
        };
        ProviderKind::ALL
            .into_iter()
            .find(|p| p.key() == key)
            .ok_or_else(|| UnknownProvider(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_keys_and_labels() {
        assert_eq!("anthropic".parse::<ProviderKind>().unwrap(), ProviderKind::Anthropic);
        assert_eq!("OpenAI".parse::<ProviderKind>().unwrap(), ProviderKind::OpenAi);
        assert_eq!("Ollama (local)".parse::<ProviderKind>().unwrap(), ProviderKind::Ollama);
        assert_eq!(
            "openai-codex".parse::<ProviderKind>().unwrap(),
            ProviderKind::OpenAiCodex
        );
        assert_eq!(
            "OpenAI (Codex subscription)".parse::<ProviderKind>().unwrap(),
            ProviderKind::OpenAiCodex
        );
        assert_eq!("anthropic (work)".parse::<ProviderKind>().unwrap(), ProviderKind::Anthropic);
    }

    #[test]
    fn test_unknown_provider_is_an_error() {
        let err = "gemini".parse::<ProviderKind>().unwrap_err();
        assert_eq!(err, UnknownProvider("gemini".to_string()));
        assert!("".parse::<ProviderKind>().is_err());
    }

    #[test]
    fn test_api_key_requirements() {
        assert_eq!(ProviderKind::Anthropic.api_key_var(), Some("ANTHROPIC_API_KEY"));
        assert_eq!(ProviderKind::OpenAi.home_key(), Some("openaiKey"));
        assert!(!ProviderKind::Ollama.needs_api_key());
        assert!(!ProviderKind::OpenAiCodex.needs_api_key());
        assert!(ProviderKind::OpenAiCodex.post_setup_hint("nova").unwrap().contains("botfleet shell nova"));
    }

    #[test]
    fn test_builtin_provider_has_no_endpoint() {
        let routing = ProviderKind::Anthropic.build_config("");
        assert_eq!(routing.agent_model, json!({ "primary": "anthropic/claude-sonnet-4-6" }));
        assert_eq!(
            routing.agent_models,
            json!({ "anthropic/claude-sonnet-4-6": { "alias": "default" } })
        );
        assert_eq!(routing.subagents_model, "anthropic/claude-sonnet-4-6");
        assert!(routing.endpoint.is_none());
    }

    #[test]
    fn test_ollama_endpoint_uses_bare_model() {
        let routing = ProviderKind::Ollama.build_config("ollama/qwen3:8b");
        let endpoint = routing.endpoint.unwrap();
        assert_eq!(endpoint.key, "ollama");
        assert_eq!(endpoint.config["baseUrl"], OLLAMA_BASE_URL);
        assert_eq!(endpoint.config["models"][0]["id"], "qwen3:8b");
        assert_eq!(endpoint.config["models"][0]["contextWindow"], 32768);
        assert_eq!(routing.subagents_model, "ollama/qwen3:8b");
    }
}
