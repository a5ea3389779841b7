//! Workspace scaffolding
//!
//! Seeding happens once, gated strictly on the workspace directory not
//! existing yet.

use crate::error::{ReconcileError, Result};
use crate::layout::BotLayout;
use botfleet_config::render;
use std::fs;
use std::path::Path;
use tokio::process::Command;

/// Create the bot's directories. Returns `true` when the workspace is new.
pub fn ensure_dirs(layout: &BotLayout, tailscale: bool) -> Result<bool> {
    let is_new = !layout.workspace().exists();
    for dir in layout.required_dirs(tailscale) {
        fs::create_dir_all(&dir).map_err(|e| ReconcileError::io(&dir, e))?;
    }
    Ok(is_new)
}

/// Template `<seed>/base/*` into the workspace and copy `<seed>/skills`.
pub fn seed_workspace(layout: &BotLayout, seed_dir: &Path, vars: &[(&str, &str)]) -> Result<()> {
    let base = seed_dir.join("base");
    if base.is_dir() {
        let entries = fs::read_dir(&base).map_err(|e| ReconcileError::io(&base, e))?;
        for entry in entries {
            let entry = entry.map_err(|e| ReconcileError::io(&base, e))?;
            let src = entry.path();
            if !src.is_file() {
                continue;
            }
            let text = fs::read_to_string(&src).map_err(|e| ReconcileError::io(&src, e))?;
            let dest = layout.workspace().join(entry.file_name());
            fs::write(&dest, render(&text, vars)).map_err(|e| ReconcileError::io(&dest, e))?;
        }
        tracing::debug!(dir = %layout.workspace().display(), "Scaffolded workspace seed files");
    }

    sync_skills(layout, seed_dir)?;
    Ok(())
}

/// Copy `<seed>/skills` over the workspace's skills directory.
/// Returns whether there was anything to copy.
pub fn sync_skills(layout: &BotLayout, seed_dir: &Path) -> Result<bool> {
    let skills = seed_dir.join("skills");
    if !skills.is_dir() {
        return Ok(false);
    }
    copy_dir(&skills, &layout.skills())?;
    tracing::debug!(dir = %layout.skills().display(), "Synced skills");
    Ok(true)
}

fn copy_dir(src: &Path, dest: &Path) -> Result<()> {
    fs::create_dir_all(dest).map_err(|e| ReconcileError::io(dest, e))?;
    for entry in fs::read_dir(src).map_err(|e| ReconcileError::io(src, e))? {
        let entry = entry.map_err(|e| ReconcileError::io(src, e))?;
        let from = entry.path();
        let to = dest.join(entry.file_name());
        if from.is_dir() {
            copy_dir(&from, &to)?;
        } else {
            fs::copy(&from, &to).map_err(|e| ReconcileError::io(&from, e))?;
        }
    }
    Ok(())
}

/// `git init && git add -A && git commit` in the workspace. Never fatal.
pub async fn init_git(workspace: &Path) -> bool {
    let steps: [&[&str]; 3] = [
        &["init"],
        &["add", "-A"],
        &[
            "-c",
            "user.name=botfleet",
            "-c",
            "user.email=botfleet@localhost",
            "commit",
            "-m",
            "Initial workspace",
        ],
    ];

    for args in steps {
        let result = Command::new("git")
            .args(args)
            .current_dir(workspace)
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::piped())
            .output()
            .await;
        match result {
            Ok(output) if output.status.success() => {}
            Ok(output) => {
                tracing::warn!(
                    dir = %workspace.display(),
                    step = %args.join(" "),
                    stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                    "git step failed (non-fatal)"
                );
                return false;
            }
            Err(e) => {
                tracing::warn!(dir = %workspace.display(), error = %e, "git unavailable (non-fatal)");
                return false;
            }
        }
    }
    true
}
