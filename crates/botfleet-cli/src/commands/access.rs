//! Read-only and access commands: listing, logs, shell, token, dashboard

use super::Context;
use crate::error::CliResult;
use crate::output::{print_info, print_output, print_success, print_warning, OutputFormat};
use botfleet_reconcile::BotStatus;
use botfleet_runtime::ReadinessProbe;
use colored::*;
use tabled::Tabled;

#[derive(Tabled)]
struct BotRow {
    #[tabled(rename = "NAME")]
    name: String,
    #[tabled(rename = "PROVIDER")]
    provider: String,
    #[tabled(rename = "STATUS")]
    status: String,
    #[tabled(rename = "GATEWAY")]
    gateway: String,
    #[tabled(rename = "DEV PORTS")]
    dev_ports: String,
}

impl BotRow {
    fn new(bot: &BotStatus, dashboard_domain: &str) -> Self {
        let entry = &bot.entry;
        let gateway = if bot.state.is_running() {
            format!("https://{}", dashboard_domain)
        } else {
            ReadinessProbe::gateway_url(entry.gateway_port)
        };
        Self {
            name: entry.name.clone(),
            provider: entry.provider.clone(),
            status: bot
                .status
                .clone()
                .unwrap_or_else(|| "no container".to_string()),
            gateway,
            dev_ports: format!("{}-{}", entry.dev_port_start, entry.dev_port_end),
        }
    }
}

pub async fn list(ctx: &Context) -> CliResult<()> {
    let bots = ctx.reconciler.list().await?;
    if bots.is_empty() && matches!(ctx.format, OutputFormat::Table) {
        print_info("No bots registered. Create one with: botfleet config <name>");
        return Ok(());
    }

    let stack = ctx.reconciler.store().load().stack;
    let rows = bots
        .iter()
        .map(|b| BotRow::new(b, &stack.dashboard_domain(&b.entry.name)))
        .collect();
    print_output::<BotRow, _>(rows, &bots, ctx.format)
}

pub async fn logs(ctx: &Context, name: &str) -> CliResult<()> {
    ctx.reconciler.logs(name).await?;
    Ok(())
}

pub async fn shell(ctx: &Context, name: &str) -> CliResult<()> {
    let code = ctx.reconciler.shell(name).await?;
    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}

pub fn token(ctx: &Context, name: &str) -> CliResult<()> {
    println!("{}", ctx.reconciler.token(name)?);
    Ok(())
}

pub fn dashboard(ctx: &Context, name: &str, no_open: bool) -> CliResult<()> {
    let url = ctx.reconciler.dashboard_url(name)?;
    println!("{}", url);
    if no_open {
        return Ok(());
    }

    let opener = if cfg!(target_os = "macos") { "open" } else { "xdg-open" };
    match std::process::Command::new(opener).arg(&url).status() {
        Ok(status) if status.success() => {
            print_success(&format!("Opened dashboard for {}", name.bold()))
        }
        Ok(status) => print_warning(&format!("{} exited with {}", opener, status)),
        Err(e) => print_warning(&format!("Could not run {}: {}", opener, e)),
    }
    Ok(())
}
