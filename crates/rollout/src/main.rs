//! rollout CLI - release management for deployment targets

use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};
use miette::Result;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use rollout::commands;

/// rollout - timestamped releases with atomic cutover and rollback
#[derive(Debug, Parser)]
#[command(name = "rollout")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Directory containing rollout.toml
    #[arg(short = 'C', long, global = true)]
    config_dir: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// List releases, newest first
    List(commands::inspect::TargetArgs),

    /// Show the live release
    Current(commands::inspect::TargetArgs),

    /// Show past cutovers
    History(commands::inspect::HistoryArgs),

    /// Create an empty release directory
    Create(commands::release::CreateArgs),

    /// Make a release live
    Activate(commands::release::ActivateArgs),

    /// Go back to an earlier release
    Rollback(commands::release::RollbackArgs),

    /// Delete old releases
    Prune(commands::prune::PruneArgs),

    /// Copy a build into a new release and make it live
    Deploy(commands::deploy::DeployArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let config_dir = if let Some(ref path) = cli.config_dir {
        Utf8PathBuf::from(path)
    } else {
        std::env::current_dir()
            .ok()
            .and_then(|p| Utf8PathBuf::try_from(p).ok())
            .unwrap_or_else(|| Utf8PathBuf::from("."))
    };

    match cli.command {
        Commands::List(args) => commands::inspect::list(&config_dir, args),
        Commands::Current(args) => commands::inspect::current(&config_dir, args),
        Commands::History(args) => commands::inspect::history(&config_dir, args),
        Commands::Create(args) => commands::release::create(&config_dir, args),
        Commands::Activate(args) => commands::release::activate(&config_dir, args),
        Commands::Rollback(args) => commands::release::rollback(&config_dir, args),
        Commands::Prune(args) => commands::prune::run(&config_dir, args),
        Commands::Deploy(args) => commands::deploy::run(&config_dir, args),
    }
}
