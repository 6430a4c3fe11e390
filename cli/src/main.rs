//! # slugdeploy Main Entry Point
//!
//! File: cli/src/main.rs
//!
//! ## Overview
//!
//! Entry point of the slugdeploy CLI. It handles:
//! - Command-line argument parsing using Clap
//! - Setting up the logging system based on verbosity flags
//! - Routing execution to the command handlers
//!
//! ## Examples
//!
//! ```bash
//! # Get help
//! slugdeploy --help
//!
//! # Package, release and deploy with progress output
//! slugdeploy -v ship bin Procfile
//! ```
//!
//! Command processing flow:
//! 1. Parse command-line args via Clap
//! 2. Configure logging based on verbosity level
//! 3. Route to the command handler
//! 4. Display any error and exit with status 1
//!
use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

mod commands; // Command handlers (package, release, deploy, ship)
mod common; // Archiver and API clients
mod core; // Errors and configuration

/// Top-level command-line arguments.
#[derive(Parser, Debug)]
#[command(
    name = "slugdeploy",
    about = "Package a Heroku slug, publish it as a GitHub release and deploy it",
    long_about = "Builds a gzip-compressed slug tarball rooted at ./app, attaches it to a\n\
                  GitHub draft prerelease and releases it to a Heroku app.",
    propagate_version = true,
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

/// All available top-level commands.
#[derive(Parser, Debug)]
enum Commands {
    /// Build the slug tarball.
    #[command(alias = "p")]
    Package(commands::package::PackageArgs),
    /// Create a GitHub draft release and attach files to it.
    #[command(alias = "r")]
    Release(commands::release::ReleaseArgs),
    /// Upload the tarball to Heroku and release it.
    #[command(alias = "d")]
    Deploy(commands::deploy::DeployArgs),
    /// Package, then release and deploy.
    Ship(commands::ship::ShipArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    fmt::Subscriber::builder()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();

    tracing::debug!("Parsed CLI arguments: {:?}", cli);

    let command_result = match cli.command {
        Commands::Package(args) => commands::package::handle_package(args).await,
        Commands::Release(args) => commands::release::handle_release(args).await,
        Commands::Deploy(args) => commands::deploy::handle_deploy(args).await,
        Commands::Ship(args) => commands::ship::handle_ship(args).await,
    };

    if let Err(e) = command_result {
        tracing::error!("Command execution failed: {:?}", e);
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}
