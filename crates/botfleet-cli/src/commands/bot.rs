//! Bot definition commands: `create` and `config`

use super::channels::{mattermost_client, mattermost_retry_hint, print_mattermost};
use super::{bot_token, preview, Context};
use crate::error::{CliError, CliResult};
use crate::output::{print_apply, print_info, print_success, print_warning, spinner};
use crate::prompt::Prompter;
use botfleet_config::ProviderKind;
use botfleet_reconcile::{ApplyOptions, BotDefinition, ReconcileError};
use botfleet_types::{validate_name, BotEntry, Channel, MattermostSetting};
use clap::Args;
use colored::*;

/// Arguments shared by `create` and `config`
#[derive(Args)]
pub struct DefineArgs {
    /// Bot name
    pub name: String,

    /// Provider (anthropic, openai, openai-codex, ollama)
    #[arg(long)]
    pub provider: Option<String>,

    /// Model, e.g. anthropic/claude-sonnet-4-6
    #[arg(long)]
    pub model: Option<String>,

    /// Accept defaults without prompting
    #[arg(short = 'y', long)]
    pub yes: bool,
}

/// Run the wizard and apply. With `create_only` an existing bot is an error.
pub async fn define(ctx: &Context, args: DefineArgs, create_only: bool) -> CliResult<()> {
    validate_name(&args.name)?;
    let name = args.name.as_str();
    let existing = ctx.reconciler.store().find(name);
    if create_only && existing.is_some() {
        return Err(ReconcileError::Conflict(format!(
            "Bot '{}' already exists. Use 'botfleet config {}' to change it.",
            name, name
        ))
        .into());
    }

    let prompt = ctx.prompt.unless(args.yes);
    match &existing {
        Some(_) => print_info(&format!("Reconfiguring {}", name.bold())),
        None => print_info(&format!("Creating {}", name.bold())),
    }

    let provider = choose_provider(&prompt, args.provider.as_deref(), existing.as_ref())?;
    let api_key = choose_api_key(ctx, &prompt, provider)?;
    let model = choose_model(&prompt, args.model, provider, existing.as_ref())?;

    let was_mattermost = existing
        .as_ref()
        .map(|e| e.mattermost.clone())
        .unwrap_or_default();
    let mattermost = match (
        prompt.confirm("Enable Mattermost?", was_mattermost.is_enabled())?,
        &was_mattermost,
    ) {
        (false, _) => MattermostSetting::Disabled,
        (true, MattermostSetting::Disabled) => MattermostSetting::Enabled,
        (true, previous) => previous.clone(),
    };

    let was_telegram = existing.as_ref().is_some_and(|e| e.telegram);
    let telegram = prompt.confirm("Enable Telegram?", was_telegram)?;
    let telegram_token = if telegram && !was_telegram {
        prompt.secret("Telegram bot token (from @BotFather)")?
    } else {
        None
    };

    let def = BotDefinition {
        name: name.to_string(),
        provider,
        model,
        mattermost: mattermost.clone(),
        telegram,
    };
    let entry = match existing {
        Some(_) => ctx.reconciler.reconfigure(&def)?,
        None => {
            let entry = ctx.reconciler.create(&def)?;
            print_success(&format!(
                "Registered {} (gateway port {}, dev ports {}-{})",
                name.bold(),
                entry.gateway_port,
                entry.dev_port_start,
                entry.dev_port_end
            ));
            entry
        }
    };

    let mut opts = ApplyOptions::default().with_api_key(api_key);
    match telegram_token {
        Some(token) => opts = opts.with_credentials(Channel::Telegram, bot_token(&token)),
        None if telegram && !was_telegram => print_warning(&format!(
            "Telegram enabled without a token; set one with: botfleet telegram {}",
            name
        )),
        None => {}
    }

    let pb = spinner("Applying configuration...");
    let report = ctx.reconciler.apply(name, &opts).await;
    pb.finish_and_clear();
    print_apply(name, &report?);

    if mattermost.is_enabled() && !was_mattermost.is_enabled() {
        setup_mattermost(ctx, &prompt, &entry).await;
    }
    if let Some(hint) = provider.post_setup_hint(name) {
        print_info(&hint);
    }
    Ok(())
}

/// Provisioning failures leave the local config applied and print a retry hint.
async fn setup_mattermost(ctx: &Context, prompt: &Prompter, entry: &BotEntry) {
    let result = match mattermost_client(ctx, prompt, None) {
        Ok(client) => ctx
            .reconciler
            .enable_mattermost(&entry.name, &client)
            .await
            .map_err(CliError::from),
        Err(e) => Err(e),
    };
    match result {
        Ok(report) => print_mattermost(&entry.name, &report),
        Err(e) => {
            print_warning(&format!("Mattermost setup failed: {}", e));
            print_info(&mattermost_retry_hint(&entry.name));
        }
    }
}

fn choose_provider(
    prompt: &Prompter,
    flag: Option<&str>,
    existing: Option<&BotEntry>,
) -> CliResult<ProviderKind> {
    if let Some(flag) = flag {
        return Ok(flag.parse::<ProviderKind>().map_err(ReconcileError::from)?);
    }

    let current = existing.and_then(|e| e.provider.parse::<ProviderKind>().ok());
    if let Some(current) = current {
        let question = format!("Change provider? (current: {})", current.label());
        if !prompt.confirm(&question, false)? {
            return Ok(current);
        }
    }
    if !prompt.is_interactive() {
        return Err(prompt.required("--provider"));
    }

    let labels: Vec<&str> = ProviderKind::ALL.iter().map(|p| p.label()).collect();
    let default = current
        .and_then(|c| ProviderKind::ALL.iter().position(|p| *p == c))
        .unwrap_or(0);
    let index = prompt.select("Provider", &labels, default)?;
    Ok(ProviderKind::ALL[index])
}

/// Explicit override, then the saved home key, then a prompt (offering to
/// save the answer).
fn choose_api_key(
    ctx: &Context,
    prompt: &Prompter,
    provider: ProviderKind,
) -> CliResult<Option<String>> {
    let (Some(label), Some(home_key)) = (provider.api_key_label(), provider.home_key()) else {
        return Ok(None);
    };
    if let Some(key) = ctx.api_key.clone().filter(|k| !k.is_empty()) {
        return Ok(Some(key));
    }

    let home = ctx.reconciler.home();
    if let Some(saved) = home.load().get(home_key).map(str::to_string) {
        if prompt.confirm(&format!("Use saved {} ({})?", label, preview(&saved)), true)? {
            return Ok(Some(saved));
        }
    }

    let Some(key) = prompt.secret(&label)? else {
        return Ok(None);
    };
    if prompt.confirm("Save as default for new bots?", true)? {
        home.save_patch([(home_key, key.clone())])?;
        print_success(&format!("Saved to {}", home.path().display()));
    }
    Ok(Some(key))
}

fn choose_model(
    prompt: &Prompter,
    flag: Option<String>,
    provider: ProviderKind,
    existing: Option<&BotEntry>,
) -> CliResult<String> {
    if let Some(model) = flag {
        return Ok(model);
    }
    let default = existing
        .filter(|e| e.provider == provider.key() && !e.model.is_empty())
        .map(|e| e.model.as_str())
        .unwrap_or(provider.default_model());
    prompt.input("Model", default)
}
