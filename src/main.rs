//! `agentflow` - routed assistant CLI
//!
//! Every message is classified, then answered, translated or refused, and
//! finally passed through the guardrails formatter.

use anyhow::{bail, Context, Result};
use clap::Parser;
use console::Style;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::cli::{Cli, Commands, ConfigCommand};
use agentflow_core::config::Config;

mod chat;
mod cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => Config::load().context("Failed to load configuration")?,
    };
    config.apply_env_overrides();
    if let Some(language) = &cli.language {
        config.workflow.language = language.clone();
    }
    if let Some(language) = &cli.target_language {
        config.workflow.target_language = language.clone();
    }

    match cli.command.unwrap_or(Commands::Chat) {
        Commands::Chat => chat::run_interactive(&config).await,
        Commands::Ask { message } => chat::run_once(&config, &message.join(" ")).await,
        Commands::Config { cmd } => handle_config(cmd, &config),
    }
}

/// Logs go to stderr; `RUST_LOG` wins over `--verbose`
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("agentflow={0},agentflow_core={0}", default_level)));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .init();
}

fn handle_config(cmd: ConfigCommand, config: &Config) -> Result<()> {
    match cmd {
        ConfigCommand::Show => {
            let mut shown = config.clone();
            if let Some(key) = shown.endpoint.api_key.as_mut() {
                *key = mask_key(key);
            }
            let text = toml::to_string_pretty(&shown).context("Failed to render configuration")?;
            match Config::find_config_file() {
                Some(path) => println!("# {}", path.display()),
                None => println!("# defaults (no config file found)"),
            }
            println!("{}", text);
        }
        ConfigCommand::Init { path, force } => {
            let target = match path {
                Some(p) => p,
                None => Config::user_config_path()?,
            };
            if target.exists() && !force {
                bail!("{} already exists (use --force to overwrite)", target.display());
            }
            let written = Config::default().save(Some(&target))?;
            let green = Style::new().green();
            println!("{} {}", green.apply_to("Wrote"), written.display());
        }
    }
    Ok(())
}

fn mask_key(key: &str) -> String {
    let visible: String = key.chars().take(4).collect();
    format!("{}****", visible)
}
