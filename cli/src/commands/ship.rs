//! # slugdeploy Ship Command
//!
//! File: cli/src/commands/ship.rs
//!
//! ## Overview
//!
//! Implements `slugdeploy ship`, the full pipeline:
//!
//! 1. Resolve every setting up front, so a missing token fails before any work.
//! 2. Build the slug tarball (on a blocking thread).
//! 3. Publish the GitHub release and deploy to Heroku concurrently.
//!
//! Either upload is skipped when its target (GitHub repo, Heroku app) is not
//! configured. The first failing upload fails the command.
//!
//! ## Examples
//!
//! ```bash
//! slugdeploy -v ship \
//!     --github-repo octo/service --github-release-name v1.4.0 \
//!     --app octo-service --heroku-email deploy@example.com \
//!     bin Procfile
//! ```
//!
use super::deploy::{self, HerokuOpts};
use super::package::{self, PackageOpts};
use super::release::{self, GithubOpts};
use crate::common::network::{self, github, heroku};
use crate::core::config;
use crate::core::error::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, warn};

/// Arguments for `slugdeploy ship`.
#[derive(Parser, Debug)]
pub struct ShipArgs {
    #[command(flatten)]
    pub package: PackageOpts,

    #[command(flatten)]
    pub github: GithubOpts,

    #[command(flatten)]
    pub heroku: HerokuOpts,

    /// Files and directories to include. Falls back to `[package] files` in the config.
    #[arg(value_name = "FILES")]
    pub files: Vec<PathBuf>,
}

/// # Handle Ship Command (`handle_ship`)
pub async fn handle_ship(args: ShipArgs) -> Result<()> {
    let cfg = config::load_config()?;
    let request = package::archive_request(&args.package, &args.files, &cfg.package)?;

    let github_release = if args.github.is_configured(&cfg) {
        Some(release::github_release(&args.github, &cfg, vec![request.output.clone()])?)
    } else {
        info!("No GitHub repository configured; skipping GitHub release");
        None
    };
    let heroku_release = if args.heroku.is_configured(&cfg) {
        Some(deploy::heroku_release(&args.heroku, &cfg, request.output.clone())?)
    } else {
        info!("No Heroku app configured; skipping Heroku deploy");
        None
    };
    if github_release.is_none() && heroku_release.is_none() {
        warn!("Neither a GitHub repository nor a Heroku app is configured; only packaging");
    }

    let entries = package::build_tarball(request.clone()).await?;
    println!("Created {} ({} entries)", request.output.display(), entries);

    let client = network::http_client()?;
    let github_task = async {
        match &github_release {
            Some(release) => github::publish(&client, release).await,
            None => Ok(()),
        }
    };
    let heroku_task = async {
        match &heroku_release {
            Some(release) => heroku::publish(&client, release).await.map(|_| ()),
            None => Ok(()),
        }
    };
    tokio::try_join!(github_task, heroku_task)?;

    if let Some(release) = &github_release {
        println!("Published draft release {} to {}", release.name, release.repo);
    }
    if let Some(release) = &heroku_release {
        println!("Released {} to {}", request.output.display(), release.app);
    }
    Ok(())
}
