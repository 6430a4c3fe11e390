//! # slugdeploy Release Command
//!
//! File: cli/src/commands/release.rs
//!
//! ## Overview
//!
//! Implements `slugdeploy release`: creates a draft prerelease on GitHub and
//! attaches files to it. Without explicit attachments the tarball (from
//! `--tarball-name`, the config, or `release.tar.gz`) is uploaded.
//!
//! ## Examples
//!
//! ```bash
//! GITHUB_TOKEN=... slugdeploy release \
//!     --github-repo octo/service \
//!     --github-release-name v1.4.0 \
//!     --github-commitish main
//! ```
//!
use super::package;
use crate::common::network::{self, github};
use crate::core::config::{self, Config};
use crate::core::error::{Result, SlugError};
use clap::{Args, Parser};
use std::path::PathBuf;
use tracing::info;

/// GitHub options shared by `release` and `ship`.
#[derive(Args, Debug, Clone, Default)]
pub struct GithubOpts {
    /// GitHub repository, in owner/repo form.
    #[arg(long = "github-repo", value_name = "OWNER/REPO")]
    pub repo: Option<String>,

    /// GitHub token used to create the release.
    #[arg(long = "github-token", env = "GITHUB_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Commitish the release tag is created from.
    #[arg(id = "github_commitish", long = "github-commitish")]
    pub commitish: Option<String>,

    /// Name of the release (also used as its tag).
    #[arg(long = "github-release-name")]
    pub release_name: Option<String>,

    /// Description of the release.
    #[arg(long = "github-release-desc")]
    pub release_desc: Option<String>,

    /// GitHub API base URL.
    #[arg(id = "github_api_url", long = "github-api-url", env = "SLUGDEPLOY_GITHUB_API_URL", hide = true)]
    pub api_url: Option<String>,
}

impl GithubOpts {
    /// Whether a repository is configured at all, i.e. a release was asked for.
    pub fn is_configured(&self, cfg: &Config) -> bool {
        self.repo.is_some() || cfg.github.repo.is_some()
    }
}

/// Arguments for `slugdeploy release`.
#[derive(Parser, Debug)]
pub struct ReleaseArgs {
    #[command(flatten)]
    pub github: GithubOpts,

    /// Tarball uploaded when no attachments are given [default: release.tar.gz].
    #[arg(long = "tarball-name", value_name = "PATH")]
    pub tarball_name: Option<PathBuf>,

    /// Files to attach to the release.
    #[arg(value_name = "ATTACHMENTS")]
    pub attachments: Vec<PathBuf>,
}

/// # Handle Release Command (`handle_release`)
pub async fn handle_release(args: ReleaseArgs) -> Result<()> {
    let cfg = config::load_config()?;
    let attachments = if args.attachments.is_empty() {
        vec![package::tarball_path(args.tarball_name.as_deref(), &cfg.package)]
    } else {
        args.attachments
    };
    let release = github_release(&args.github, &cfg, attachments)?;
    info!("Effective GitHub release: {} on {}", release.name, release.repo);

    let client = network::http_client()?;
    github::publish(&client, &release).await?;
    println!("Published draft release {} to {}", release.name, release.repo);
    Ok(())
}

/// # Resolve GitHub Release (`github_release`)
///
/// Combines flags and the `[github]` config section.
///
/// ## Errors
///
/// `SlugError::MissingSetting` when the repository, token or release name is
/// absent; `SlugError::Config` for a malformed repository.
pub fn github_release(opts: &GithubOpts, cfg: &Config, attachments: Vec<PathBuf>) -> Result<github::GithubRelease> {
    let repo = opts
        .repo
        .clone()
        .or_else(|| cfg.github.repo.clone())
        .ok_or(SlugError::MissingSetting {
            setting: "github.repo",
            flag: "--github-repo",
        })?;
    config::validate_repo(&repo)?;
    let token = opts.token.clone().ok_or(SlugError::MissingSetting {
        setting: "GitHub token",
        flag: "--github-token or GITHUB_TOKEN",
    })?;
    let name = opts
        .release_name
        .clone()
        .or_else(|| cfg.github.release_name.clone())
        .ok_or(SlugError::MissingSetting {
            setting: "github.release_name",
            flag: "--github-release-name",
        })?;

    Ok(github::GithubRelease {
        api_url: opts
            .api_url
            .clone()
            .or_else(|| cfg.github.api_url.clone())
            .unwrap_or_else(|| github::DEFAULT_API_URL.to_string()),
        repo,
        token,
        commitish: opts.commitish.clone().or_else(|| cfg.github.commitish.clone()),
        name,
        description: opts
            .release_desc
            .clone()
            .or_else(|| cfg.github.release_desc.clone())
            .unwrap_or_default(),
        attachments,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts() -> GithubOpts {
        GithubOpts {
            repo: Some("octo/service".into()),
            token: Some("t0ken".into()),
            release_name: Some("v1.0.0".into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_github_release_resolution() {
        let mut cfg = Config::default();
        cfg.github.commitish = Some("main".into());
        cfg.github.release_desc = Some("from config".into());

        let release = github_release(&opts(), &cfg, vec![PathBuf::from("release.tar.gz")]).unwrap();
        assert_eq!(release.api_url, github::DEFAULT_API_URL);
        assert_eq!(release.repo, "octo/service");
        assert_eq!(release.commitish.as_deref(), Some("main"));
        assert_eq!(release.description, "from config");
        assert_eq!(release.attachments, vec![PathBuf::from("release.tar.gz")]);
    }

    #[test]
    fn test_missing_token_is_reported() {
        let opts = GithubOpts {
            token: None,
            ..opts()
        };
        let err = github_release(&opts, &Config::default(), vec![]).unwrap_err();
        assert!(err.to_string().contains("GITHUB_TOKEN"));
    }
}
