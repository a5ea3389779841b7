#![allow(dead_code)]

use botfleet_config::ProviderKind;
use botfleet_reconcile::{BotDefinition, Reconciler};
use botfleet_registry::{HomeConfigStore, RegistryStore};
use botfleet_runtime::{InMemoryRuntime, ReadinessProbe};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

pub struct Fleet {
    pub dir: TempDir,
    pub runtime: Arc<InMemoryRuntime>,
    pub reconciler: Reconciler,
}

impl Fleet {
    /// Registry at `<tmp>/bots.json`, home at `<tmp>/home`, one-shot runs
    /// leave an identity marker behind like a real onboarding would.
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let runtime = Arc::new(InMemoryRuntime::new());
        runtime.add_image("botfleet-base");
        runtime.on_run_once(|spec| {
            std::fs::write(spec.mounts[0].source.join("identity"), "id").unwrap();
            0
        });

        let store = RegistryStore::new(dir.path().join("bots.json"));
        let home = HomeConfigStore::new(dir.path().join("home"));
        let reconciler = Reconciler::new(store, home, runtime.clone()).with_probe(
            ReadinessProbe::new(Duration::from_millis(10), Duration::from_millis(30)),
        );
        Self {
            dir,
            runtime,
            reconciler,
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn bot_dir(&self, name: &str) -> PathBuf {
        self.root().join("bots").join(name)
    }

    pub fn env(&self, name: &str) -> String {
        std::fs::read_to_string(self.bot_dir(name).join(".env")).unwrap()
    }

    pub fn config(&self, name: &str) -> serde_json::Value {
        let text = std::fs::read_to_string(self.bot_dir(name).join("openclaw.json")).unwrap();
        serde_json::from_str(&text).unwrap()
    }

    pub fn create(&self, name: &str, provider: ProviderKind) {
        self.reconciler
            .create(&BotDefinition::new(name, provider))
            .unwrap();
    }
}
