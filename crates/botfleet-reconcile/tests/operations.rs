//! Bot operations: registration, lifecycle, channels and access

mod common;

use async_trait::async_trait;
use botfleet_config::ProviderKind;
use botfleet_reconcile::{
    ApplyOptions, ArtifactChange, BotDefinition, ChannelProvisioner, DestroyOptions, ProvisionError,
    ReconcileError,
};
use botfleet_runtime::RuntimeOp;
use botfleet_types::{Channel, ContainerState, MattermostSetting, ProxySetting};
use common::Fleet;
use parking_lot::Mutex;

#[derive(Default)]
struct FakeMattermost {
    disabled: Mutex<Vec<String>>,
}

#[async_trait]
impl ChannelProvisioner for FakeMattermost {
    fn base_url(&self) -> &str {
        "https://chat.example.com"
    }

    async fn create_or_find_account(&self, name: &str) -> Result<String, ProvisionError> {
        Ok(format!("user-{}", name))
    }

    async fn find_account(&self, name: &str) -> Result<Option<String>, ProvisionError> {
        Ok(Some(format!("user-{}", name)))
    }

    async fn issue_token(&self, account_id: &str) -> Result<String, ProvisionError> {
        Ok(format!("tok-{}", account_id))
    }

    async fn disable_account(&self, account_id: &str) -> Result<(), ProvisionError> {
        self.disabled.lock().push(account_id.to_string());
        Ok(())
    }
}

#[test]
fn test_create_allocates_and_reuses_slots() {
    let fleet = Fleet::new();
    for name in ["nova", "echo", "atlas"] {
        fleet.create(name, ProviderKind::Ollama);
    }
    let echo = fleet.reconciler.store().find("echo").unwrap();
    assert_eq!(echo.port_slot, 1);
    assert_eq!(echo.gateway_port, 19010);
    assert_eq!(echo.model, ProviderKind::Ollama.default_model());

    fleet.reconciler.store().remove("echo").unwrap();
    fleet.create("orbit", ProviderKind::Ollama);
    let orbit = fleet.reconciler.store().find("orbit").unwrap();
    assert_eq!(orbit.port_slot, 1);
    assert_eq!(orbit.dev_port_start, 19011);
}

#[test]
fn test_create_rejects_conflicts() {
    let fleet = Fleet::new();
    fleet.create("nova", ProviderKind::Ollama);

    let dup = fleet
        .reconciler
        .create(&BotDefinition::new("nova", ProviderKind::Ollama));
    assert!(matches!(dup, Err(ReconcileError::Conflict(_))));

    let invalid = fleet
        .reconciler
        .create(&BotDefinition::new("9lives", ProviderKind::Ollama));
    assert!(matches!(invalid, Err(ReconcileError::Validation(_))));

    std::fs::create_dir_all(fleet.bot_dir("stray")).unwrap();
    let stray = fleet
        .reconciler
        .create(&BotDefinition::new("stray", ProviderKind::Ollama));
    assert!(matches!(stray, Err(ReconcileError::Conflict(_))));
    assert!(fleet.reconciler.store().find("stray").is_none());
}

#[tokio::test]
async fn test_start_applies_then_runs() {
    let fleet = Fleet::new();
    fleet.create("nova", ProviderKind::Ollama);

    let report = fleet.reconciler.start("nova").await.unwrap();
    assert!(report.transition.changed());
    assert_eq!(report.gateway_url, "http://localhost:19000");
    assert_eq!(report.dashboard_url, "https://botfleet-nova.orb.local");
    assert_eq!(report.dev_ports, (19001, 19009));
    assert!(report.ready.is_some());
    assert!(fleet.bot_dir("nova").join(".env").exists());

    let spec = fleet.runtime.run_spec("botfleet-nova").unwrap();
    assert_eq!(spec.network.as_deref(), Some("botfleet-net"));
    assert_eq!(spec.ports.len(), 10);

    let again = fleet.reconciler.start("nova").await.unwrap();
    assert_eq!(again.transition.state(), ContainerState::Running);
    assert!(!again.transition.changed());
    assert!(again.ready.is_none());
    assert_eq!(fleet.runtime.count("run_detached"), 1);
}

#[tokio::test]
async fn test_stop_and_restart() {
    let fleet = Fleet::new();
    fleet.create("nova", ProviderKind::Ollama);

    let err = fleet.reconciler.restart("nova").await.unwrap_err();
    assert!(matches!(err, ReconcileError::NotRunning(_)));
    assert!(err.to_string().contains("botfleet start nova"));

    fleet.reconciler.start("nova").await.unwrap();
    assert!(fleet.reconciler.restart("nova").await.unwrap().changed());

    let stopped = fleet.reconciler.stop("nova").await.unwrap();
    assert_eq!(stopped.state(), ContainerState::Created);
    let again = fleet.reconciler.stop("nova").await.unwrap();
    assert!(!again.changed());
}

#[tokio::test]
async fn test_start_all_continues_past_failures() {
    let fleet = Fleet::new();
    fleet.create("nova", ProviderKind::Ollama);
    fleet.create("echo", ProviderKind::Ollama);
    fleet.create("atlas", ProviderKind::Ollama);
    fleet
        .reconciler
        .store()
        .update(|r| r.find_mut("echo").unwrap().provider = "gemini".to_string())
        .unwrap();

    let results = fleet.reconciler.start_all().await;
    let names: Vec<_> = results.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(names, ["nova", "echo", "atlas"]);
    assert!(results[0].1.is_ok());
    assert!(matches!(results[1].1, Err(ReconcileError::InvalidProvider(_))));
    assert!(results[2].1.is_ok());
    assert!(fleet.runtime.container_state("botfleet-atlas").is_running());

    let stopped = fleet.reconciler.stop_all().await;
    assert!(stopped.iter().all(|(_, r)| r.is_ok()));
    assert_eq!(
        fleet.runtime.container_state("botfleet-nova"),
        ContainerState::Created
    );
}

#[tokio::test]
async fn test_destroy_removes_everything() {
    let fleet = Fleet::new();
    fleet.create("nova", ProviderKind::Ollama);
    fleet.reconciler.start("nova").await.unwrap();

    let report = fleet
        .reconciler
        .destroy("nova", DestroyOptions { delete_files: true }, None)
        .await
        .unwrap();
    assert!(report.container_removed);
    assert!(report.files_deleted);
    assert!(report.account_disabled.is_none());
    assert!(!fleet.bot_dir("nova").exists());
    assert!(fleet.reconciler.store().find("nova").is_none());
    assert_eq!(
        fleet.runtime.container_state("botfleet-nova"),
        ContainerState::Absent
    );
}

#[tokio::test]
async fn test_destroy_keeps_files_by_default() {
    let fleet = Fleet::new();
    fleet.create("nova", ProviderKind::Ollama);
    fleet.reconciler.apply("nova", &ApplyOptions::default()).await.unwrap();

    let report = fleet
        .reconciler
        .destroy("nova", DestroyOptions::default(), None)
        .await
        .unwrap();
    assert!(!report.container_removed);
    assert!(!report.files_deleted);
    assert!(fleet.bot_dir("nova").join(".env").exists());
}

#[tokio::test]
async fn test_rebuild() {
    let fleet = Fleet::new();
    fleet.create("nova", ProviderKind::Ollama);
    fleet.create("echo", ProviderKind::Ollama);
    fleet.reconciler.start("nova").await.unwrap();

    let skills = fleet.root().join("seed/skills/search");
    std::fs::create_dir_all(&skills).unwrap();
    std::fs::write(skills.join("SKILL.md"), "search").unwrap();

    let err = fleet.reconciler.rebuild(Some("ghost")).await.unwrap_err();
    assert!(matches!(err, ReconcileError::NotFound(_)));

    let report = fleet.reconciler.rebuild(None).await.unwrap();
    assert_eq!(report.recreated, ["nova"]);
    assert_eq!(report.skills_synced, ["nova"]);
    assert!(fleet
        .bot_dir("nova")
        .join("workspace/skills/search/SKILL.md")
        .exists());
    assert_eq!(fleet.runtime.count("build_image"), 1);
    assert_eq!(
        fleet.runtime.container_state("botfleet-nova"),
        ContainerState::Absent
    );
}

#[tokio::test]
async fn test_token_and_dashboard() {
    let fleet = Fleet::new();
    fleet.create("nova", ProviderKind::Ollama);
    assert!(matches!(
        fleet.reconciler.token("nova"),
        Err(ReconcileError::NoToken(_))
    ));

    fleet.reconciler.apply("nova", &ApplyOptions::default()).await.unwrap();
    let token = fleet.reconciler.token("nova").unwrap();
    assert_eq!(token.len(), 64);
    assert_eq!(
        fleet.reconciler.dashboard_url("nova").unwrap(),
        format!("https://botfleet-nova.orb.local/#token={}", token)
    );
}

#[tokio::test]
async fn test_approve_requires_running() {
    let fleet = Fleet::new();
    fleet.create("nova", ProviderKind::Ollama);

    let err = fleet
        .reconciler
        .approve("nova", Channel::Telegram, "ABC123")
        .await
        .unwrap_err();
    assert!(matches!(err, ReconcileError::NotRunning(_)));

    fleet.reconciler.start("nova").await.unwrap();
    fleet.runtime.set_exec_output("Approved");
    let out = fleet
        .reconciler
        .approve("nova", Channel::Telegram, "ABC123")
        .await
        .unwrap();
    assert_eq!(out, "Approved");
    assert!(fleet.runtime.ops().contains(&RuntimeOp::Exec {
        name: "botfleet-nova".to_string(),
        command: ["openclaw", "pairing", "approve", "telegram", "ABC123"]
            .map(String::from)
            .to_vec(),
    }));
}

#[tokio::test]
async fn test_telegram_toggle() {
    let fleet = Fleet::new();
    fleet.create("nova", ProviderKind::Ollama);

    fleet.reconciler.enable_telegram("nova", "123:abc").await.unwrap();
    assert!(fleet.reconciler.store().find("nova").unwrap().telegram);
    let config = fleet.config("nova");
    assert_eq!(config["channels"]["telegram"]["enabled"], true);
    assert_eq!(config["channels"]["telegram"]["botToken"], "123:abc");
    assert_eq!(config["plugins"]["entries"]["telegram"]["enabled"], true);

    fleet.reconciler.disable_telegram("nova").await.unwrap();
    let config = fleet.config("nova");
    assert_eq!(config["channels"]["telegram"]["enabled"], false);
    assert_eq!(config["channels"]["telegram"]["botToken"], "123:abc");
}

#[tokio::test]
async fn test_mattermost_enable_and_destroy() {
    let fleet = Fleet::new();
    fleet.create("nova", ProviderKind::Ollama);
    fleet.reconciler.start("nova").await.unwrap();
    let chat = FakeMattermost::default();

    let report = fleet.reconciler.enable_mattermost("nova", &chat).await.unwrap();
    assert_eq!(report.account.token, "tok-user-nova");
    assert_eq!(report.plugin_installed, Some(true));
    assert!(report.apply.restarted);

    let entry = fleet.reconciler.store().find("nova").unwrap();
    assert_eq!(
        entry.mattermost,
        MattermostSetting::Upstream("https://chat.example.com".to_string())
    );
    let config = fleet.config("nova");
    assert_eq!(config["channels"]["mattermost"]["botToken"], "tok-user-nova");
    assert_eq!(
        config["channels"]["mattermost"]["baseUrl"],
        "https://chat.example.com"
    );

    let report = fleet
        .reconciler
        .destroy("nova", DestroyOptions::default(), Some(&chat))
        .await
        .unwrap();
    assert_eq!(report.account_disabled, Some(true));
    assert_eq!(*chat.disabled.lock(), ["user-nova"]);
}

#[tokio::test]
async fn test_tailscale_toggle_restores_secrets() {
    let fleet = Fleet::new();
    fleet.create("nova", ProviderKind::Ollama);
    fleet.reconciler.start("nova").await.unwrap();
    let original = fleet.env("nova");

    fleet
        .reconciler
        .enable_tailscale("nova", Some("tskey-auth-1"))
        .await
        .unwrap();
    let env = fleet.env("nova");
    assert!(env.contains("\n# Tailscale\nTS_AUTHKEY=tskey-auth-1\nTS_HOSTNAME=botfleet-nova\n"));
    assert!(fleet.bot_dir("nova").join(".tailscale").is_dir());
    assert_eq!(
        fleet.runtime.container_state("botfleet-nova"),
        ContainerState::Absent
    );

    let report = fleet.reconciler.start("nova").await.unwrap();
    assert!(report.transition.changed());
    let spec = fleet.runtime.run_spec("botfleet-nova").unwrap();
    assert_eq!(spec.capabilities, ["NET_ADMIN", "NET_RAW"]);

    fleet.reconciler.disable_tailscale("nova").await.unwrap();
    assert_eq!(fleet.env("nova"), original);
}

#[tokio::test]
async fn test_proxy_survives_tailscale_toggle() {
    let fleet = Fleet::new();
    fleet.create("nova", ProviderKind::Ollama);
    fleet.reconciler.apply("nova", &ApplyOptions::default()).await.unwrap();

    fleet
        .reconciler
        .enable_tailscale("nova", Some("tskey-auth-1"))
        .await
        .unwrap();
    let target = ProxySetting::target("app:80").unwrap();
    fleet.reconciler.set_proxy("nova", target).await.unwrap();
    let env = fleet.env("nova");
    assert!(env.contains("BOTFLEET_PROXY_TARGET=app:80\n\n# Tailscale\n"));

    fleet.reconciler.disable_tailscale("nova").await.unwrap();
    let env = fleet.env("nova");
    assert!(env.contains("BOTFLEET_PROXY_TARGET=app:80\n"));
    assert!(!env.contains("TS_AUTHKEY"));
    assert!(!env.contains("# Tailscale"));

    let report = fleet
        .reconciler
        .apply("nova", &ApplyOptions::default())
        .await
        .unwrap();
    assert_eq!(report.secrets, ArtifactChange::Unchanged);
    assert_eq!(fleet.env("nova"), env);
}

#[tokio::test]
async fn test_proxy_set_and_clear() {
    let fleet = Fleet::new();
    fleet.create("nova", ProviderKind::Ollama);
    fleet.reconciler.apply("nova", &ApplyOptions::default()).await.unwrap();
    let original = fleet.env("nova");

    let target = ProxySetting::target("my-app:3000").unwrap();
    fleet.reconciler.set_proxy("nova", target).await.unwrap();
    assert!(fleet.env("nova").contains("BOTFLEET_PROXY_TARGET=my-app:3000\n"));

    fleet
        .reconciler
        .set_proxy("nova", ProxySetting::Disabled)
        .await
        .unwrap();
    assert_eq!(fleet.env("nova"), original);
}

#[tokio::test]
async fn test_list_reports_status() {
    let fleet = Fleet::new();
    fleet.create("nova", ProviderKind::Ollama);
    fleet.create("echo", ProviderKind::Ollama);
    fleet.reconciler.start("nova").await.unwrap();

    let rows = fleet.reconciler.list().await.unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].status.as_deref(), Some("Up"));
    assert_eq!(rows[0].state, ContainerState::Running);
    assert!(rows[1].status.is_none());

    fleet.runtime.set_available(false);
    let rows = fleet.reconciler.list().await.unwrap();
    assert!(rows.iter().all(|r| r.status.is_none()));
}

#[tokio::test]
async fn test_shell_and_logs() {
    let fleet = Fleet::new();
    fleet.create("nova", ProviderKind::Ollama);
    assert!(matches!(
        fleet.reconciler.shell("nova").await,
        Err(ReconcileError::NotRunning(_))
    ));

    fleet.reconciler.start("nova").await.unwrap();
    assert_eq!(fleet.reconciler.shell("nova").await.unwrap(), 0);
    fleet.reconciler.logs("nova").await.unwrap();
    assert_eq!(fleet.runtime.count("follow_logs"), 1);
}
