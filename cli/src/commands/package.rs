//! # slugdeploy Package Command
//!
//! File: cli/src/commands/package.rs
//!
//! ## Overview
//!
//! Implements `slugdeploy package`: builds the slug tarball from the given
//! files and directories without uploading it anywhere.
//!
//! The tarball settings are resolved in this order: flags, then the
//! `[package]` section of the configuration, then the defaults
//! (`release.tar.gz`, top-level folder `app`). The other commands reuse
//! `archive_request` and `build_tarball` from here.
//!
//! ## Examples
//!
//! ```bash
//! # Package a binary and a Procfile under ./app
//! slugdeploy package bin/server Procfile
//!
//! # Custom output and top-level folder
//! slugdeploy package --tarball-name dist/slug.tgz --top-level app dist/
//! ```
//!
use crate::common::archive::{self, ArchiveRequest};
use crate::core::config::{self, PackageConfig};
use crate::core::error::{Result, SlugError};
use anyhow::Context;
use clap::{Args, Parser};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const DEFAULT_TARBALL_NAME: &str = "release.tar.gz";
pub const DEFAULT_TOP_LEVEL: &str = "app";

/// Tarball options shared by every command that builds a slug.
#[derive(Args, Debug, Clone, Default)]
pub struct PackageOpts {
    /// Path of the tarball to create [default: release.tar.gz].
    #[arg(long = "tarball-name", value_name = "PATH")]
    pub tarball_name: Option<PathBuf>,

    /// Name of the top-level directory inside the tarball [default: app].
    #[arg(long, value_name = "DIR")]
    pub top_level: Option<String>,
}

/// Arguments for `slugdeploy package`.
#[derive(Parser, Debug)]
pub struct PackageArgs {
    #[command(flatten)]
    pub opts: PackageOpts,

    /// Files and directories to include. Falls back to `[package] files` in the config.
    #[arg(value_name = "FILES")]
    pub files: Vec<PathBuf>,
}

/// # Handle Package Command (`handle_package`)
///
/// Resolves the archive request and writes the tarball.
pub async fn handle_package(args: PackageArgs) -> Result<()> {
    let cfg = config::load_config()?;
    let request = archive_request(&args.opts, &args.files, &cfg.package)?;
    let entries = build_tarball(request.clone()).await?;
    println!(
        "Created {} ({} entries under ./{})",
        request.output.display(),
        entries,
        request.top_level
    );
    Ok(())
}

/// Output path of the tarball: flag, then config, then the default.
pub fn tarball_path(tarball_name: Option<&Path>, cfg: &PackageConfig) -> PathBuf {
    tarball_name
        .map(Path::to_path_buf)
        .or_else(|| cfg.tarball_name.as_ref().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_TARBALL_NAME))
}

/// # Resolve Archive Request (`archive_request`)
///
/// Combines flags, positional files and configuration into an `ArchiveRequest`.
///
/// ## Errors
///
/// Returns `SlugError::Config` if there is nothing to package or the
/// top-level folder is not a single directory name.
pub fn archive_request(opts: &PackageOpts, files: &[PathBuf], cfg: &PackageConfig) -> Result<ArchiveRequest> {
    let top_level = opts
        .top_level
        .clone()
        .or_else(|| cfg.top_level.clone())
        .unwrap_or_else(|| DEFAULT_TOP_LEVEL.to_string());
    config::validate_top_level(&top_level)?;

    let sources: Vec<PathBuf> = if files.is_empty() {
        cfg.files.iter().map(PathBuf::from).collect()
    } else {
        files.to_vec()
    };
    if sources.is_empty() {
        return Err(SlugError::Config(
            "No files to package: pass them as arguments or list them under [package] files".into(),
        )
        .into());
    }

    Ok(ArchiveRequest::new(
        tarball_path(opts.tarball_name.as_deref(), cfg),
        top_level,
        sources,
    ))
}

/// # Build Tarball (`build_tarball`)
///
/// Runs the archiver on a blocking thread. If it fails, the partially written
/// output is removed so that no truncated tarball is left for a later upload.
pub async fn build_tarball(request: ArchiveRequest) -> Result<usize> {
    info!(
        "[package] Packaging {} path(s) into {}",
        request.sources.len(),
        request.output.display()
    );
    let output = request.output.clone();
    let result = tokio::task::spawn_blocking(move || archive::create_archive(&request))
        .await
        .context("Archiver thread panicked")?;

    match result {
        Ok(entries) => Ok(entries),
        Err(err) => {
            if output.exists() {
                if let Err(e) = std::fs::remove_file(&output) {
                    warn!("Could not remove incomplete tarball {}: {}", output.display(), e);
                }
            }
            Err(err).with_context(|| format!("Failed to create tarball {}", output.display()))
        }
    }
}
