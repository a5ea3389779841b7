//! Container lifecycle commands

use super::channels::saved_mattermost_client;
use super::Context;
use crate::error::{CliError, CliResult};
use crate::output::{print_apply, print_error, print_info, print_success, print_warning, spinner};
use botfleet_reconcile::{ApplyOptions, ChannelProvisioner, DestroyOptions, StartReport};
use botfleet_runtime::Transition;
use clap::Args;
use colored::*;

/// A single bot, or every bot with `--all`
#[derive(Args)]
pub struct TargetArgs {
    /// Bot name
    #[arg(required_unless_present = "all", conflicts_with = "all")]
    pub name: Option<String>,

    /// Every registered bot
    #[arg(long)]
    pub all: bool,
}

#[derive(Args)]
pub struct DestroyArgs {
    /// Bot name
    pub name: String,

    /// Skip the confirmation prompt
    #[arg(short = 'y', long)]
    pub yes: bool,

    /// Also delete the bot's data directory
    #[arg(long)]
    pub delete_files: bool,
}

pub async fn apply(ctx: &Context, name: &str) -> CliResult<()> {
    let opts = ApplyOptions::default().with_api_key(ctx.api_key.clone());
    let pb = spinner(&format!("Applying {}...", name));
    let report = ctx.reconciler.apply(name, &opts).await;
    pb.finish_and_clear();
    print_apply(name, &report?);
    Ok(())
}

pub async fn start(ctx: &Context, target: TargetArgs) -> CliResult<()> {
    if let Some(name) = target.name {
        let pb = spinner(&format!("Starting {}...", name));
        let report = ctx.reconciler.start(&name).await;
        pb.finish_and_clear();
        print_started(&name, &report?);
        return Ok(());
    }

    let pb = spinner("Starting all bots...");
    let results = ctx.reconciler.start_all().await;
    pb.finish_and_clear();
    summarize(results, |name, report| print_started(name, report))
}

pub async fn stop(ctx: &Context, target: TargetArgs) -> CliResult<()> {
    if let Some(name) = target.name {
        let transition = ctx.reconciler.stop(&name).await?;
        print_transition(&name, transition, "Stopped", "is not running");
        return Ok(());
    }

    let results = ctx.reconciler.stop_all().await;
    summarize(results, |name, transition| {
        print_transition(name, *transition, "Stopped", "is not running")
    })
}

pub async fn restart(ctx: &Context, name: &str) -> CliResult<()> {
    ctx.reconciler.restart(name).await?;
    print_success(&format!("Restarted {}", name.bold()));
    Ok(())
}

pub async fn destroy(ctx: &Context, args: DestroyArgs) -> CliResult<()> {
    let name = args.name.as_str();
    let delete_files = args.delete_files
        || (!args.yes && ctx.prompt.confirm("Also delete the bot's files?", false)?);
    if !args.yes {
        if !ctx.prompt.is_interactive() {
            return Err(CliError::InvalidInput(
                "refusing to destroy without --yes when not running interactively".to_string(),
            ));
        }
        let what = if delete_files {
            "its container, registry entry and data directory"
        } else {
            "its container and registry entry (files are kept)"
        };
        print_warning(&format!("This removes {} for {}.", what, name.bold()));
        let typed = ctx.prompt.input(&format!("Type '{}' to confirm", name), "")?;
        if typed != name {
            return Err(CliError::Aborted);
        }
    }

    let client = saved_mattermost_client(ctx);
    let provisioner = client.as_ref().map(|c| c as &dyn ChannelProvisioner);
    let report = ctx
        .reconciler
        .destroy(name, DestroyOptions { delete_files }, provisioner)
        .await?;

    if report.container_removed {
        print_success("Removed container");
    }
    if report.account_disabled == Some(true) {
        print_success("Disabled Mattermost account");
    }
    if report.files_deleted {
        print_success("Deleted bot files");
    }
    for warning in &report.warnings {
        print_warning(warning);
    }
    print_success(&format!("Destroyed {}", name.bold()));
    Ok(())
}

pub async fn rebuild(ctx: &Context, name: Option<String>) -> CliResult<()> {
    let pb = spinner("Building base image...");
    let report = ctx.reconciler.rebuild(name.as_deref()).await;
    pb.finish_and_clear();
    let report = report?;

    print_success("Rebuilt base image");
    if !report.skills_synced.is_empty() {
        print_success(&format!("Synced skills for {}", report.skills_synced.join(", ")));
    }
    for bot in &report.recreated {
        print_info(&format!(
            "{} was removed; start it again with: {}",
            bot.bold(),
            format!("botfleet start {}", bot).cyan()
        ));
    }
    Ok(())
}

fn print_started(name: &str, report: &StartReport) {
    match report.transition {
        Transition::Unchanged(_) => print_info(&format!("{} is already running", name.bold())),
        Transition::Changed { .. } => print_success(&format!("Started {}", name.bold())),
    }
    if report.ready == Some(false) {
        print_warning(&format!(
            "Gateway did not answer in time; check `botfleet logs {}`",
            name
        ));
    }
    println!("  Gateway:   {}", report.gateway_url.cyan());
    println!("  Dashboard: {}", report.dashboard_url.cyan());
    println!("  Dev ports: {}-{}", report.dev_ports.0, report.dev_ports.1);
}

fn print_transition(name: &str, transition: Transition, done: &str, already: &str) {
    if transition.changed() {
        print_success(&format!("{} {}", done, name.bold()));
    } else {
        print_info(&format!("{} {}", name.bold(), already));
    }
}

/// Print each outcome; any failure turns into a partial-failure error.
fn summarize<T, E: std::fmt::Display>(
    results: Vec<(String, Result<T, E>)>,
    mut on_success: impl FnMut(&str, &T),
) -> CliResult<()> {
    let total = results.len();
    if total == 0 {
        print_info("No bots registered");
        return Ok(());
    }

    let mut failed = 0;
    for (name, result) in &results {
        match result {
            Ok(value) => on_success(name, value),
            Err(e) => {
                failed += 1;
                print_error(&format!("{}: {}", name.bold(), e));
            }
        }
    }
    if failed > 0 {
        return Err(CliError::Partial { failed, total });
    }
    Ok(())
}
