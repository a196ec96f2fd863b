use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

mod cli;
mod commands;

use betterhub::config::Config;
use cli::CliContext;
use commands::Commands;

#[derive(Parser)]
#[command(name = "betterhub")]
#[command(about = "BetterHub - settings, feature toggles and entity aliases for GitHub pages")]
#[command(version)]
struct Cli {
    /// Directory holding the storage areas (defaults to [storage] dir)
    #[arg(long, global = true)]
    store_dir: Option<PathBuf>,

    /// Path to the config file (defaults to ~/.betterhub/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config_path = cli.config.unwrap_or_else(Config::global_config_path);
    // Loaded per command so that `init --force` can repair an unreadable config
    let load = || CliContext::load(&config_path, cli.store_dir.clone());

    match cli.command {
        Commands::Init { force } => cli::init::init_command(&config_path, force)?,
        Commands::Get { key } => cli::settings::get_command(&load()?, key.as_deref())?,
        Commands::Set { key, value } => cli::settings::set_command(&load()?, &key, &value)?,
        Commands::Reset => cli::settings::reset_command(&load()?)?,
        Commands::Export { output } => cli::settings::export_command(&load()?, output.as_ref())?,
        Commands::Import { file } => cli::settings::import_command(&load()?, &file)?,
        Commands::Features {
            enabled,
            with_settings,
        } => cli::features::features_command(&load()?, enabled, with_settings)?,
        Commands::Active { path } => cli::features::active_command(&load()?, &path)?,
        Commands::Alias { command } => cli::alias::alias_command(&load()?, command)?,
        Commands::Whitelist { target, command } => {
            cli::alias::whitelist_command(&load()?, target.into(), command)?
        }
        Commands::Harvest { url, file, save } => {
            cli::page::harvest_command(&load()?, &url, &file, save)?
        }
        Commands::Apply { url, file, output } => {
            cli::page::apply_command(&load()?, &url, &file, output.as_ref())?
        }
        Commands::Serve { port } => cli::serve::serve_command(&load()?, port)?,
    }

    Ok(())
}
