mod auth;
mod cli;
mod commands;
mod config;
mod output;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use fabricctl_client::OrchClient;
use fabricctl_reconcile::Reconciler;

use cli::{Cli, Commands};
use output::print_error;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run().await {
        print_error(&format!("{e:#}"));
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let profile = &cli.profile;
    let format = resolve_format(&cli, profile)?;

    match &cli.command {
        Commands::Login(args) => {
            let host = config::resolve_host(&cli.host, profile)?;
            commands::auth::login(&host, args, profile).await?;
        }
        Commands::Logout => {
            commands::auth::logout(profile)?;
        }
        Commands::Whoami => {
            commands::auth::whoami(profile)?;
        }
        Commands::Config(args) => match &args.command {
            cli::ConfigCommands::Show => {
                let cfg = config::load_profile(profile)?;
                println!("{}: {}", "Profile".cyan(), profile);
                println!(
                    "{}: {}",
                    "Host".cyan(),
                    cfg.host.as_deref().unwrap_or("(not set)")
                );
                println!(
                    "{}: {}",
                    "Format".cyan(),
                    cfg.format.as_deref().unwrap_or("json")
                );
            }
            cli::ConfigCommands::Set(set_args) => {
                let mut cfg = config::load_profile(profile)?;
                match set_args.key.as_str() {
                    "host" => cfg.host = Some(set_args.value.clone()),
                    "format" => cfg.format = Some(set_args.value.clone()),
                    other => {
                        anyhow::bail!("Unknown config key: {other}. Valid keys: host, format")
                    }
                }
                config::save_profile(profile, &cfg)?;
                output::print_success(&format!("Set {} = {}", set_args.key, set_args.value));
            }
        },
        Commands::SwitchPort(args) => {
            let reconciler = make_reconciler(&cli)?;
            commands::reconcile::switch_port(&reconciler, args, format).await?;
        }
        Commands::ExternalEpg(args) => {
            let reconciler = make_reconciler(&cli)?;
            commands::reconcile::external_epg(&reconciler, args, format).await?;
        }
        Commands::InterfacePolicy(args) => {
            let reconciler = make_reconciler(&cli)?;
            commands::reconcile::interface_policy(&reconciler, args, format).await?;
        }
        Commands::Deploy(args) => {
            let reconciler = make_reconciler(&cli)?;
            commands::deploy::deploy(&reconciler, args, format).await?;
        }
        Commands::Undeploy(args) => {
            let reconciler = make_reconciler(&cli)?;
            commands::deploy::undeploy(&reconciler, args, format).await?;
        }
        Commands::DeployStatus(args) => {
            let reconciler = make_reconciler(&cli)?;
            commands::deploy::status(&reconciler, args, format).await?;
        }
    }

    Ok(())
}

/// Format resolution order: the --format flag, then the profile in
/// config.toml, then json.
fn resolve_format(cli: &Cli, profile: &str) -> Result<cli::OutputFormat> {
    if let Some(format) = cli.format {
        return Ok(format);
    }
    Ok(match config::load_profile(profile)?.format.as_deref() {
        Some("table") => cli::OutputFormat::Table,
        _ => cli::OutputFormat::Json,
    })
}

fn make_reconciler(cli: &Cli) -> Result<Reconciler> {
    let host = config::resolve_host(&cli.host, &cli.profile)?;
    let creds = auth::load_credentials(&cli.profile)?
        .context("Not logged in. Run: fabricctl login --username <user> --password <pass>")?;
    let client = OrchClient::with_token(&host, creds.token);
    Ok(Reconciler::new(client).with_check_mode(cli.check))
}
