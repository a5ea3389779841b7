//! Apply convergence against the in-memory runtime

mod common;

use botfleet_config::ProviderKind;
use botfleet_reconcile::{
    ApplyOptions, ArtifactChange, BotDefinition, Onboarding, ReconcileError,
};
use botfleet_types::{BotEntry, PortAssignment};
use common::Fleet;
use serde_json::json;
use std::fs;

fn with_key() -> ApplyOptions {
    ApplyOptions::default().with_api_key(Some("sk-ant-test".to_string()))
}

#[tokio::test]
async fn test_first_apply_generates_artifacts() {
    let fleet = Fleet::new();
    fleet.create("nova", ProviderKind::Anthropic);

    let report = fleet.reconciler.apply("nova", &with_key()).await.unwrap();
    assert!(report.seeded);
    assert_eq!(report.secrets, ArtifactChange::Created);
    assert_eq!(report.config, ArtifactChange::Created);
    assert_eq!(report.onboarding, Onboarding::Completed);
    assert!(!report.restarted);
    assert_eq!(report.next_step.as_deref(), Some("botfleet start nova"));
    assert!(fleet.runtime.has_network("botfleet-net"));

    let env = fleet.env("nova");
    assert!(env.contains("ANTHROPIC_API_KEY=sk-ant-test\n"));
    assert!(env.contains("BOTFLEET_DEV_PORT_START=19001\n"));
    assert!(env.contains("BOTFLEET_DEV_PORT_END=19009\n"));

    let token = env
        .lines()
        .find_map(|l| l.strip_prefix("OPENCLAW_GATEWAY_TOKEN="))
        .unwrap();
    assert_eq!(token.len(), 64);

    let config = fleet.config("nova");
    assert_eq!(config["gateway"]["auth"]["token"], token);
    assert_eq!(
        config["agents"]["defaults"]["model"]["primary"],
        ProviderKind::Anthropic.default_model()
    );
    assert!(fleet.bot_dir("nova").join("workspace/memory").is_dir());
}

#[tokio::test]
async fn test_second_apply_is_byte_identical() {
    let fleet = Fleet::new();
    fleet.create("nova", ProviderKind::Anthropic);
    fleet.reconciler.apply("nova", &with_key()).await.unwrap();
    let env = fleet.env("nova");
    let config = fs::read_to_string(fleet.bot_dir("nova").join("openclaw.json")).unwrap();

    let report = fleet.reconciler.apply("nova", &with_key()).await.unwrap();
    assert!(!report.seeded);
    assert_eq!(report.secrets, ArtifactChange::Unchanged);
    assert_eq!(report.config, ArtifactChange::Unchanged);
    assert_eq!(report.onboarding, Onboarding::AlreadyDone);
    assert_eq!(fleet.env("nova"), env);
    assert_eq!(
        fs::read_to_string(fleet.bot_dir("nova").join("openclaw.json")).unwrap(),
        config
    );
    assert_eq!(fleet.runtime.count("run_once"), 1);
}

#[cfg(unix)]
#[tokio::test]
async fn test_artifacts_are_owner_only() {
    use std::os::unix::fs::PermissionsExt;

    let fleet = Fleet::new();
    fleet.create("nova", ProviderKind::Ollama);
    fleet.reconciler.apply("nova", &ApplyOptions::default()).await.unwrap();

    for file in [".env", "openclaw.json"] {
        let mode = fs::metadata(fleet.bot_dir("nova").join(file))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600, "{}", file);
    }
}

#[tokio::test]
async fn test_home_key_is_used_when_none_given() {
    let fleet = Fleet::new();
    fleet
        .reconciler
        .home()
        .save_patch([("anthropicKey", "sk-from-home".to_string())])
        .unwrap();
    fleet.create("nova", ProviderKind::Anthropic);

    let report = fleet.reconciler.apply("nova", &ApplyOptions::default()).await.unwrap();
    assert!(report.warnings.is_empty());
    assert!(fleet.env("nova").contains("ANTHROPIC_API_KEY=sk-from-home\n"));
}

#[tokio::test]
async fn test_missing_api_key_is_a_warning() {
    let fleet = Fleet::new();
    fleet.create("nova", ProviderKind::OpenAi);

    let report = fleet.reconciler.apply("nova", &ApplyOptions::default()).await.unwrap();
    assert!(report.warnings.iter().any(|w| w.contains("OpenAI")));
}

#[tokio::test]
async fn test_user_edits_survive_apply() {
    let fleet = Fleet::new();
    fleet.create("nova", ProviderKind::Anthropic);
    fleet.reconciler.apply("nova", &with_key()).await.unwrap();

    let path = fleet.bot_dir("nova").join("openclaw.json");
    let mut config = fleet.config("nova");
    config["gateway"]["trustedProxies"] = json!(["10.0.0.0/8"]);
    config["tools"] = json!({ "browser": { "enabled": true } });
    fs::write(&path, serde_json::to_string_pretty(&config).unwrap()).unwrap();

    let env_path = fleet.bot_dir("nova").join(".env");
    let env = fleet.env("nova") + "CUSTOM_FLAG=1\n";
    fs::write(&env_path, &env).unwrap();

    fleet.reconciler.apply("nova", &with_key()).await.unwrap();
    let config = fleet.config("nova");
    assert_eq!(config["gateway"]["trustedProxies"], json!(["10.0.0.0/8"]));
    assert_eq!(config["tools"]["browser"]["enabled"], true);
    assert_eq!(fleet.env("nova"), env);
}

#[tokio::test]
async fn test_malformed_config_aborts_untouched() {
    let fleet = Fleet::new();
    fleet.create("nova", ProviderKind::Anthropic);
    fleet.reconciler.apply("nova", &with_key()).await.unwrap();

    let path = fleet.bot_dir("nova").join("openclaw.json");
    fs::write(&path, "{ \"gateway\": ").unwrap();

    let err = fleet.reconciler.apply("nova", &with_key()).await.unwrap_err();
    assert!(matches!(err, ReconcileError::Merge { .. }));
    assert!(err.to_string().contains("openclaw.json"));
    assert_eq!(fs::read_to_string(&path).unwrap(), "{ \"gateway\": ");
}

#[tokio::test]
async fn test_runtime_unavailable() {
    let fleet = Fleet::new();
    fleet.create("nova", ProviderKind::Anthropic);
    fleet.runtime.set_available(false);

    let err = fleet.reconciler.apply("nova", &with_key()).await.unwrap_err();
    assert!(matches!(err, ReconcileError::EnvironmentUnavailable));
    assert!(!fleet.bot_dir("nova").exists());
}

#[tokio::test]
async fn test_unknown_bot_and_provider() {
    let fleet = Fleet::new();
    let err = fleet.reconciler.apply("ghost", &with_key()).await.unwrap_err();
    assert!(matches!(err, ReconcileError::NotFound(name) if name == "ghost"));

    let entry = BotEntry::new(
        "gem",
        "gemini",
        "",
        PortAssignment::for_slot(19000, 0),
        chrono::NaiveDate::from_ymd_opt(2026, 1, 5).unwrap(),
    );
    fleet.reconciler.store().add(entry).unwrap();
    let err = fleet.reconciler.apply("gem", &with_key()).await.unwrap_err();
    assert!(matches!(err, ReconcileError::InvalidProvider(_)));
}

#[tokio::test]
async fn test_missing_image_is_built_once() {
    let fleet = Fleet::new();
    fleet
        .reconciler
        .store()
        .update(|registry| registry.stack.image_name = "botfleet-custom".to_string())
        .unwrap();
    fleet.create("nova", ProviderKind::Ollama);

    let report = fleet.reconciler.apply("nova", &ApplyOptions::default()).await.unwrap();
    assert!(report.image_built);
    let report = fleet.reconciler.apply("nova", &ApplyOptions::default()).await.unwrap();
    assert!(!report.image_built);
    assert_eq!(fleet.runtime.count("build_image"), 1);
}

#[tokio::test]
async fn test_onboarding_rewrites_are_fixed_up() {
    let fleet = Fleet::new();
    fleet.runtime.on_run_once(|spec| {
        let dir = &spec.mounts[0].source;
        let path = dir.join("openclaw.json");
        let mut config: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        config["gateway"]["bind"] = json!("loopback");
        config["gateway"]["auth"]["token"] = json!("onboarded-token");
        fs::write(&path, config.to_string()).unwrap();
        fs::write(dir.join("identity"), "id").unwrap();
        0
    });
    fleet.create("nova", ProviderKind::Ollama);

    fleet.reconciler.apply("nova", &ApplyOptions::default()).await.unwrap();
    let config = fleet.config("nova");
    assert_eq!(config["gateway"]["bind"], "lan");
    assert_eq!(config["gateway"]["auth"]["token"], "onboarded-token");
    assert!(fleet
        .env("nova")
        .contains("OPENCLAW_GATEWAY_TOKEN=onboarded-token\n"));
    assert_eq!(fleet.reconciler.token("nova").unwrap(), "onboarded-token");
}

#[tokio::test]
async fn test_failed_onboarding_is_retried() {
    let fleet = Fleet::new();
    fleet.runtime.on_run_once(|_| 1);
    fleet.create("nova", ProviderKind::Ollama);

    let report = fleet.reconciler.apply("nova", &ApplyOptions::default()).await.unwrap();
    assert!(matches!(report.onboarding, Onboarding::Failed(_)));
    assert!(report.warnings.iter().any(|w| w.contains("Onboarding failed")));

    fleet.reconciler.apply("nova", &ApplyOptions::default()).await.unwrap();
    assert_eq!(fleet.runtime.count("run_once"), 2);
}

#[tokio::test]
async fn test_running_container_is_restarted() {
    let fleet = Fleet::new();
    fleet.create("nova", ProviderKind::Ollama);
    fleet.runtime.add_container("botfleet-nova", true);

    let report = fleet.reconciler.apply("nova", &ApplyOptions::default()).await.unwrap();
    assert!(report.restarted);
    assert!(report.next_step.is_none());
    assert_eq!(fleet.runtime.count("stop"), 1);
    assert_eq!(fleet.runtime.count("start"), 1);
}

#[tokio::test]
async fn test_ollama_endpoint_and_model_change() {
    let fleet = Fleet::new();
    fleet.create("nova", ProviderKind::Ollama);
    fleet.reconciler.apply("nova", &ApplyOptions::default()).await.unwrap();
    let config = fleet.config("nova");
    assert_eq!(
        config["models"]["providers"]["ollama"]["baseUrl"],
        "http://host.docker.internal:11434/v1"
    );

    let mut def = BotDefinition::new("nova", ProviderKind::Anthropic);
    def.model = "anthropic/claude-opus-4-6".to_string();
    let before = fleet.reconciler.store().find("nova").unwrap();
    let after = fleet.reconciler.reconfigure(&def).unwrap();
    assert_eq!(after.ports(), before.ports());
    assert_eq!(after.created_at, before.created_at);

    fleet.reconciler.apply("nova", &with_key()).await.unwrap();
    let config = fleet.config("nova");
    assert_eq!(
        config["agents"]["defaults"]["model"]["primary"],
        "anthropic/claude-opus-4-6"
    );
    assert_eq!(
        config["agents"]["defaults"]["subagents"]["model"],
        "anthropic/claude-opus-4-6"
    );
}
