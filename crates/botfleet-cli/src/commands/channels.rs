//! Channel and network integration commands

use super::{bot_token, preview, Context};
use crate::error::{CliError, CliResult};
use crate::output::{print_apply, print_info, print_success, print_warning, spinner};
use crate::prompt::Prompter;
use botfleet_reconcile::{ChannelReport, MattermostClient};
use botfleet_registry::home_keys;
use botfleet_types::{Channel, ProxySetting};
use clap::Args;
use colored::*;

#[derive(Args)]
pub struct MattermostArgs {
    /// Bot name
    pub name: String,

    /// Mattermost server URL (saved for later bots)
    #[arg(long)]
    pub url: Option<String>,

    /// Disable the channel instead
    #[arg(long)]
    pub disable: bool,
}

#[derive(Args)]
pub struct TelegramArgs {
    /// Bot name
    pub name: String,

    /// Bot token from @BotFather
    #[arg(long, env = "BOTFLEET_TELEGRAM_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Disable the channel instead
    #[arg(long)]
    pub disable: bool,
}

#[derive(Args)]
pub struct TailscaleArgs {
    /// Bot name
    pub name: String,

    /// Tailscale auth key (falls back to the saved one)
    #[arg(long, env = "BOTFLEET_TAILSCALE_AUTH_KEY", hide_env_values = true)]
    pub auth_key: Option<String>,

    /// Disable the sidecar instead
    #[arg(long)]
    pub disable: bool,
}

#[derive(Args)]
pub struct ProxyArgs {
    /// Bot name
    pub name: String,

    /// Upstream target, e.g. localhost:3000
    pub target: Option<String>,

    /// Clear the proxy target
    #[arg(long, conflicts_with = "target")]
    pub disable: bool,
}

#[derive(Args)]
pub struct ApproveArgs {
    /// Bot name
    pub name: String,

    /// Channel the pairing request came from (mattermost, telegram)
    pub channel: String,

    /// Pairing code shown to the user
    pub code: String,
}

/// Build a Mattermost admin client from saved settings, prompting for
/// anything missing and saving new answers.
pub(crate) fn mattermost_client(
    ctx: &Context,
    prompt: &Prompter,
    url: Option<String>,
) -> CliResult<MattermostClient> {
    let home = ctx.reconciler.home();
    let saved = home.load();
    let mut patch = Vec::new();

    let url = match url.or_else(|| saved.get(home_keys::MATTERMOST_URL).map(str::to_string)) {
        Some(url) => url,
        None => {
            let url = prompt.input("Mattermost server URL", "")?;
            if url.is_empty() {
                return Err(prompt.required("Mattermost server URL"));
            }
            url
        }
    };
    if saved.get(home_keys::MATTERMOST_URL) != Some(url.as_str()) {
        patch.push((home_keys::MATTERMOST_URL, url.clone()));
    }

    let token = match saved.get(home_keys::MATTERMOST_ADMIN_TOKEN) {
        Some(token) => token.to_string(),
        None => {
            let token = prompt
                .secret("Mattermost admin token")?
                .ok_or_else(|| prompt.required("Mattermost admin token"))?;
            patch.push((home_keys::MATTERMOST_ADMIN_TOKEN, token.clone()));
            token
        }
    };

    if !patch.is_empty() {
        home.save_patch(patch)?;
    }
    Ok(MattermostClient::new(&url, token)?)
}

/// Client from saved settings only; used where prompting is not wanted.
pub(crate) fn saved_mattermost_client(ctx: &Context) -> Option<MattermostClient> {
    let saved = ctx.reconciler.home().load();
    let url = saved.get(home_keys::MATTERMOST_URL)?;
    let token = saved.get(home_keys::MATTERMOST_ADMIN_TOKEN)?;
    MattermostClient::new(url, token.to_string()).ok()
}

pub(crate) fn print_mattermost(name: &str, report: &ChannelReport) {
    print_success(&format!(
        "Mattermost account {} ready (token {})",
        report.account.account_id.dimmed(),
        preview(&report.account.token)
    ));
    match report.plugin_installed {
        Some(true) => print_success("Installed Mattermost plugin"),
        Some(false) => print_warning(&format!(
            "Plugin install failed; it will be installed on the next start of {}",
            name
        )),
        None => {}
    }
    print_apply(name, &report.apply);
}

pub async fn mattermost(ctx: &Context, args: MattermostArgs) -> CliResult<()> {
    if args.disable {
        let report = ctx.reconciler.disable_mattermost(&args.name).await?;
        print_success(&format!("Mattermost disabled for {}", args.name.bold()));
        print_apply(&args.name, &report);
        return Ok(());
    }

    let client = mattermost_client(ctx, &ctx.prompt, args.url)
        .inspect_err(|_| print_info(&mattermost_retry_hint(&args.name)))?;
    let pb = spinner("Provisioning Mattermost account...");
    let report = ctx.reconciler.enable_mattermost(&args.name, &client).await;
    pb.finish_and_clear();
    let report = report.inspect_err(|_| print_info(&mattermost_retry_hint(&args.name)))?;
    print_mattermost(&args.name, &report);
    Ok(())
}

pub(crate) fn mattermost_retry_hint(name: &str) -> String {
    format!("Retry with: botfleet mattermost {}", name)
}

pub async fn telegram(ctx: &Context, args: TelegramArgs) -> CliResult<()> {
    if args.disable {
        let report = ctx.reconciler.disable_telegram(&args.name).await?;
        print_success(&format!("Telegram disabled for {}", args.name.bold()));
        print_apply(&args.name, &report);
        return Ok(());
    }

    let token = match args.token.filter(|t| !t.trim().is_empty()) {
        Some(token) => token,
        None => ctx
            .prompt
            .secret("Telegram bot token (from @BotFather)")?
            .ok_or_else(|| ctx.prompt.required("--token"))?,
    };
    let report = ctx.reconciler.enable_telegram(&args.name, token.trim()).await?;
    print_success(&format!("Telegram enabled for {}", args.name.bold()));
    print_apply(&args.name, &report);
    print_info(&format!(
        "Message the bot, then approve with: botfleet approve {} telegram <code>",
        args.name
    ));
    Ok(())
}

pub async fn tailscale(ctx: &Context, args: TailscaleArgs) -> CliResult<()> {
    if args.disable {
        let report = ctx.reconciler.disable_tailscale(&args.name).await?;
        print_success(&format!("Tailscale disabled for {}", args.name.bold()));
        print_apply(&args.name, &report);
        return Ok(());
    }

    let home = ctx.reconciler.home();
    let auth_key = match args.auth_key.filter(|k| !k.trim().is_empty()) {
        Some(key) => Some(key),
        None if home.load().get(home_keys::TAILSCALE_AUTH_KEY).is_some() => None,
        None => ctx.prompt.secret("Tailscale auth key")?,
    };
    if let Some(key) = &auth_key {
        let saved = home.load();
        if saved.get(home_keys::TAILSCALE_AUTH_KEY) != Some(key.as_str())
            && ctx.prompt.confirm("Save as default for new bots?", true)?
        {
            home.save_patch([(home_keys::TAILSCALE_AUTH_KEY, key.clone())])?;
        }
    }

    let report = ctx
        .reconciler
        .enable_tailscale(&args.name, auth_key.as_deref())
        .await?;
    print_success(&format!("Tailscale enabled for {}", args.name.bold()));
    print_apply(&args.name, &report);
    Ok(())
}

pub async fn proxy(ctx: &Context, args: ProxyArgs) -> CliResult<()> {
    let setting = match (args.disable, args.target) {
        (true, _) => ProxySetting::Disabled,
        (false, Some(target)) => ProxySetting::target(&target)?,
        (false, None) => {
            let target = ctx.prompt.input("Proxy target (host:port)", "")?;
            if target.is_empty() {
                return Err(ctx.prompt.required("TARGET"));
            }
            ProxySetting::target(&target)?
        }
    };

    let report = ctx.reconciler.set_proxy(&args.name, setting.clone()).await?;
    match setting.as_target() {
        Some(target) => print_success(&format!(
            "Port 80 of {} now proxies to {}",
            args.name.bold(),
            target.cyan()
        )),
        None => print_success(&format!("Proxy cleared for {}", args.name.bold())),
    }
    print_apply(&args.name, &report);
    Ok(())
}

pub async fn approve(ctx: &Context, args: ApproveArgs) -> CliResult<()> {
    let channel: Channel = args.channel.parse()?;
    let code = args.code.trim();
    if code.is_empty() {
        return Err(CliError::InvalidInput("pairing code is empty".to_string()));
    }

    let output = ctx.reconciler.approve(&args.name, channel, code).await?;
    let output = output.trim();
    if !output.is_empty() {
        println!("{}", output);
    }
    print_success(&format!("Approved {} pairing for {}", channel, args.name.bold()));
    Ok(())
}
