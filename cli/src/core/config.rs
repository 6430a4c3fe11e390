//! # slugdeploy Configuration System
//!
//! File: cli/src/core/config.rs
//!
//! ## Overview
//!
//! Loads optional settings from TOML files so repeated deploys do not need
//! every flag spelled out. Command-line flags always win; this module only
//! supplies what the flags leave unset.
//!
//! Configuration sources (in order of precedence):
//! 1. Project-specific `.slugdeploy.toml` in the current directory or an
//!    ancestor (the search stops at the first directory containing `.git`)
//! 2. User-specific `config.toml` in the platform config directory
//!    (e.g. `~/.config/slugdeploy/config.toml`)
//!
//! Secrets are deliberately not part of the file format. The GitHub token and
//! the Heroku API key come from flags or the environment only.
//!
//! ## Examples
//!
//! ```toml
//! [package]
//! tarball_name = "dist/release.tar.gz"
//! top_level = "app"
//! files = ["bin", "Procfile", "static"]
//!
//! [github]
//! repo = "octo/service"
//!
//! [heroku]
//! app = "octo-service"
//! email = "deploy@example.com"
//!
//! [heroku.process_types]
//! web = "./bin/web"
//! ```
//!
use crate::core::error::{Result, SlugError};
use anyhow::Context;
use directories::ProjectDirs;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::{debug, info, warn};

const PROJECT_CONFIG_FILENAME: &str = ".slugdeploy.toml";

/// Represents the main configuration structure, loaded from TOML files.
#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub package: PackageConfig,
    #[serde(default)]
    pub github: GithubConfig,
    #[serde(default)]
    pub heroku: HerokuConfig,
}

/// Settings for building the tarball.
#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct PackageConfig {
    /// Output path of the tarball (can use ~). Will be expanded.
    pub tarball_name: Option<String>,
    /// Name of the synthetic top-level directory.
    pub top_level: Option<String>,
    /// Files and directories to package (can use ~). Will be expanded.
    #[serde(default)]
    pub files: Vec<String>,
}

/// Settings for the GitHub release upload.
#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct GithubConfig {
    /// Repository in `owner/repo` form.
    pub repo: Option<String>,
    pub commitish: Option<String>,
    pub release_name: Option<String>,
    pub release_desc: Option<String>,
    /// API base URL, for GitHub Enterprise.
    pub api_url: Option<String>,
}

/// Settings for the Heroku slug deploy.
#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct HerokuConfig {
    pub app: Option<String>,
    pub email: Option<String>,
    pub commitish: Option<String>,
    /// Process type name to command, e.g. `web = "./bin/web"`.
    #[serde(default)]
    pub process_types: BTreeMap<String, String>,
    pub api_url: Option<String>,
}

/// # Load Configuration (`load_config`)
///
/// Loads, merges, expands and validates the user and project configuration.
/// Missing files are not an error; an empty `Config` is returned.
///
/// ## Errors
///
/// Returns an `Err` if a file exists but cannot be read or parsed, or if the
/// merged result fails validation.
pub fn load_config() -> Result<Config> {
    let user_config = load_user_config()?;
    let project_config = load_project_config()?;
    let mut merged = merge_configs(user_config.unwrap_or_default(), project_config);
    expand_config_paths(&mut merged);
    validate_config(&merged).context("Configuration validation failed")?;
    debug!("Final loaded configuration: {:?}", merged);
    Ok(merged)
}

fn load_user_config() -> Result<Option<Config>> {
    if let Some(proj_dirs) = ProjectDirs::from("com", "slugdeploy", "slugdeploy") {
        let config_path = proj_dirs.config_dir().join("config.toml");
        if config_path.exists() {
            info!("Loading user configuration from: {}", config_path.display());
            load_config_from_path(&config_path).map(Some)
        } else {
            debug!("User configuration file not found at {}", config_path.display());
            Ok(None)
        }
    } else {
        warn!("Could not determine user config directory.");
        Ok(None)
    }
}

fn load_project_config() -> Result<Option<Config>> {
    let current_dir = std::env::current_dir().context("Failed to get current directory")?;
    if let Some(path) = find_project_config_path(&current_dir) {
        info!("Loading project configuration from: {}", path.display());
        load_config_from_path(&path).map(Some)
    } else {
        debug!("No project configuration file ({PROJECT_CONFIG_FILENAME}) found in current directory or ancestors.");
        Ok(None)
    }
}

/// Searches `start` and its ancestors for `.slugdeploy.toml`, stopping at the
/// repository root (the first directory containing `.git`).
fn find_project_config_path(start: &Path) -> Option<PathBuf> {
    for dir in start.ancestors() {
        let candidate = dir.join(PROJECT_CONFIG_FILENAME);
        if candidate.is_file() {
            return Some(candidate);
        }
        if dir.join(".git").is_dir() {
            debug!("Found .git directory at {}, stopping project config search.", dir.display());
            return None;
        }
    }
    None
}

fn load_config_from_path(path: &Path) -> Result<Config> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read configuration file: {}", path.display()))?;
    toml::from_str(&content)
        .with_context(|| format!("Failed to parse TOML from file: {}", path.display()))
}

/// Project settings override user settings field by field.
fn merge_configs(user: Config, project: Option<Config>) -> Config {
    let Some(project) = project else {
        return user;
    };
    Config {
        package: PackageConfig {
            tarball_name: project.package.tarball_name.or(user.package.tarball_name),
            top_level: project.package.top_level.or(user.package.top_level),
            files: if project.package.files.is_empty() {
                user.package.files
            } else {
                project.package.files
            },
        },
        github: GithubConfig {
            repo: project.github.repo.or(user.github.repo),
            commitish: project.github.commitish.or(user.github.commitish),
            release_name: project.github.release_name.or(user.github.release_name),
            release_desc: project.github.release_desc.or(user.github.release_desc),
            api_url: project.github.api_url.or(user.github.api_url),
        },
        heroku: HerokuConfig {
            app: project.heroku.app.or(user.heroku.app),
            email: project.heroku.email.or(user.heroku.email),
            commitish: project.heroku.commitish.or(user.heroku.commitish),
            process_types: if project.heroku.process_types.is_empty() {
                user.heroku.process_types
            } else {
                project.heroku.process_types
            },
            api_url: project.heroku.api_url.or(user.heroku.api_url),
        },
    }
}

/// Expands `~` and environment variables in path settings. Values that
/// reference undefined variables are left as written.
fn expand_config_paths(config: &mut Config) {
    let expand = |value: &str| {
        shellexpand::full(value)
            .map(|v| v.into_owned())
            .unwrap_or_else(|e| {
                warn!("Could not expand '{}': {}", value, e);
                value.to_string()
            })
    };
    if let Some(name) = config.package.tarball_name.as_mut() {
        *name = expand(name);
        debug!("Expanded tarball path: {}", name);
    }
    for file in &mut config.package.files {
        *file = expand(file);
    }
}

fn validate_config(config: &Config) -> Result<()> {
    if let Some(top_level) = &config.package.top_level {
        validate_top_level(top_level)?;
    }
    if let Some(name) = &config.package.tarball_name {
        if name.trim().is_empty() {
            return Err(SlugError::Config("tarball_name cannot be empty".into()).into());
        }
    }
    if let Some(repo) = &config.github.repo {
        validate_repo(repo)?;
    }
    Ok(())
}

/// The top-level folder must be a single, non-empty path component.
pub fn validate_top_level(top_level: &str) -> Result<()> {
    if top_level.is_empty() || top_level.contains('/') || top_level == "." || top_level == ".." {
        return Err(SlugError::Config(format!(
            "Invalid top-level folder '{top_level}': expected a single directory name such as 'app'"
        ))
        .into());
    }
    Ok(())
}

/// GitHub repositories are addressed as `owner/repo`.
pub fn validate_repo(repo: &str) -> Result<()> {
    match repo.split_once('/') {
        Some((owner, name)) if !owner.is_empty() && !name.is_empty() && !name.contains('/') => Ok(()),
        _ => Err(SlugError::Config(format!(
            "Invalid GitHub repository '{repo}': expected owner/repo"
        ))
        .into()),
    }
}
