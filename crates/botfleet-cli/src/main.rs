//! botfleet - Command-line interface for a fleet of chat-bot containers
//!
//! Each bot is a registry entry plus a data directory. The CLI lets an
//! operator:
//! - Define bots and their model provider
//! - Apply the desired configuration and start/stop containers
//! - Wire chat channels, the Tailscale sidecar and the port-80 proxy
//! - Inspect status, logs and gateway credentials

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;
mod error;
mod output;
mod prompt;

use botfleet_reconcile::Reconciler;
use botfleet_registry::{HomeConfigStore, RegistryStore};
use botfleet_runtime::DockerCli;
use commands::{access, bot, channels, lifecycle, Context};
use config::CliConfig;
use error::CliResult;
use prompt::Prompter;

/// botfleet CLI application
#[derive(Parser)]
#[command(name = "botfleet")]
#[command(about = "botfleet - Manage a fleet of OpenClaw bot containers", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "BOTFLEET_CONFIG")]
    config: Option<PathBuf>,

    /// Registry file (default: ./botfleet.json)
    #[arg(long, env = "BOTFLEET_REGISTRY", global = true)]
    registry: Option<PathBuf>,

    /// Directory holding saved credentials (default: ~/.botfleet)
    #[arg(long, env = "BOTFLEET_HOME", global = true)]
    home: Option<PathBuf>,

    /// Provider API key for this invocation
    #[arg(long, env = "BOTFLEET_API_KEY", hide_env_values = true, global = true)]
    api_key: Option<String>,

    /// Output format (table, json, yaml)
    #[arg(short, long, default_value = "table", global = true)]
    output: output::OutputFormat,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand)]
enum Commands {
    /// Register a new bot and apply its configuration
    Create(bot::DefineArgs),

    /// Create or reconfigure a bot interactively
    Config(bot::DefineArgs),

    /// Regenerate a bot's configuration from the registry
    Apply {
        /// Bot name
        name: String,
    },

    /// Start a bot container (or all of them)
    Start(lifecycle::TargetArgs),

    /// Stop a bot container (or all of them)
    Stop(lifecycle::TargetArgs),

    /// Restart a running bot
    Restart {
        /// Bot name
        name: String,
    },

    /// Remove a bot's container and registry entry
    Destroy(lifecycle::DestroyArgs),

    /// List bots and their status
    #[command(alias = "list")]
    Ls,

    /// Follow a bot's container logs
    Logs {
        /// Bot name
        name: String,
    },

    /// Open a shell inside a running bot
    Shell {
        /// Bot name
        name: String,
    },

    /// Print the gateway token
    Token {
        /// Bot name
        name: String,
    },

    /// Print (and open) the dashboard URL
    Dashboard {
        /// Bot name
        name: String,

        /// Only print the URL
        #[arg(long)]
        no_open: bool,
    },

    /// Approve a pending channel pairing
    Approve(channels::ApproveArgs),

    /// Provision and enable the Mattermost channel
    Mattermost(channels::MattermostArgs),

    /// Enable the Telegram channel
    Telegram(channels::TelegramArgs),

    /// Enable the Tailscale sidecar
    Tailscale(channels::TailscaleArgs),

    /// Proxy port 80 to a dev server inside the container
    Proxy(channels::ProxyArgs),

    /// Rebuild the base image and resync skills
    Rebuild {
        /// Limit to one bot (default: all)
        name: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing; stdout is reserved for command output
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .without_time()
                .with_writer(std::io::stderr),
        )
        .init();

    if let Err(e) = run(cli).await {
        output::print_error(&e.to_string());
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> CliResult<()> {
    let config = CliConfig::load(cli.config.as_deref())?;
    let registry = config.registry_path(cli.registry);
    let home = match config.home_dir(cli.home) {
        Some(dir) => dir,
        None => HomeConfigStore::default_dir()?,
    };
    tracing::debug!(registry = %registry.display(), home = %home.display(), "Resolved paths");

    let reconciler = Reconciler::new(
        RegistryStore::new(registry),
        HomeConfigStore::new(home),
        Arc::new(DockerCli::default()),
    );
    let ctx = Context {
        reconciler,
        format: cli.output,
        api_key: cli.api_key,
        prompt: Prompter::detect(),
    };

    match cli.command {
        Commands::Create(args) => bot::define(&ctx, args, true).await,
        Commands::Config(args) => bot::define(&ctx, args, false).await,
        Commands::Apply { name } => lifecycle::apply(&ctx, &name).await,
        Commands::Start(target) => lifecycle::start(&ctx, target).await,
        Commands::Stop(target) => lifecycle::stop(&ctx, target).await,
        Commands::Restart { name } => lifecycle::restart(&ctx, &name).await,
        Commands::Destroy(args) => lifecycle::destroy(&ctx, args).await,
        Commands::Ls => access::list(&ctx).await,
        Commands::Logs { name } => access::logs(&ctx, &name).await,
        Commands::Shell { name } => access::shell(&ctx, &name).await,
        Commands::Token { name } => access::token(&ctx, &name),
        Commands::Dashboard { name, no_open } => access::dashboard(&ctx, &name, no_open),
        Commands::Approve(args) => channels::approve(&ctx, args).await,
        Commands::Mattermost(args) => channels::mattermost(&ctx, args).await,
        Commands::Telegram(args) => channels::telegram(&ctx, args).await,
        Commands::Tailscale(args) => channels::tailscale(&ctx, args).await,
        Commands::Proxy(args) => channels::proxy(&ctx, args).await,
        Commands::Rebuild { name } => lifecycle::rebuild(&ctx, name).await,
    }
}
