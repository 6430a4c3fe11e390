//! # slugdeploy Deploy Command
//!
//! File: cli/src/commands/deploy.rs
//!
//! ## Overview
//!
//! Implements `slugdeploy deploy`: pushes an existing slug tarball to a
//! Heroku app and releases it. Build the tarball first with `package`, or use
//! `ship` to do both.
//!
//! ## Examples
//!
//! ```bash
//! HEROKU_API_KEY=... slugdeploy deploy \
//!     --app octo-service \
//!     --heroku-email deploy@example.com \
//!     --process web=./bin/web
//! ```
//!
use super::package;
use crate::common::network::{self, heroku};
use crate::core::config::{self, Config};
use crate::core::error::{Result, SlugError};
use clap::{Args, Parser};
use std::path::PathBuf;
use tracing::info;

/// Heroku options shared by `deploy` and `ship`.
#[derive(Args, Debug, Clone, Default)]
pub struct HerokuOpts {
    /// Name of the Heroku app.
    #[arg(long = "app", value_name = "APP")]
    pub app: Option<String>,

    /// Email address of the Heroku account.
    #[arg(long = "heroku-email", env = "HEROKU_EMAIL")]
    pub email: Option<String>,

    /// API key (or password) of the Heroku account.
    #[arg(
        long = "heroku-key",
        alias = "heroku-password",
        env = "HEROKU_API_KEY",
        hide_env_values = true
    )]
    pub key: Option<String>,

    /// Commit recorded on the slug.
    #[arg(id = "heroku_commitish", long = "heroku-commitish")]
    pub commitish: Option<String>,

    /// Process type, as TYPE=COMMAND. Repeatable.
    #[arg(long = "process", value_name = "TYPE=COMMAND")]
    pub process: Vec<String>,

    /// Heroku Platform API base URL.
    #[arg(id = "heroku_api_url", long = "heroku-api-url", env = "SLUGDEPLOY_HEROKU_API_URL", hide = true)]
    pub api_url: Option<String>,
}

impl HerokuOpts {
    /// Whether an app is configured at all, i.e. a deploy was asked for.
    pub fn is_configured(&self, cfg: &Config) -> bool {
        self.app.is_some() || cfg.heroku.app.is_some()
    }
}

/// Arguments for `slugdeploy deploy`.
#[derive(Parser, Debug)]
pub struct DeployArgs {
    #[command(flatten)]
    pub heroku: HerokuOpts,

    /// Tarball to deploy [default: release.tar.gz].
    #[arg(long = "tarball-name", value_name = "PATH")]
    pub tarball_name: Option<PathBuf>,
}

/// # Handle Deploy Command (`handle_deploy`)
pub async fn handle_deploy(args: DeployArgs) -> Result<()> {
    let cfg = config::load_config()?;
    let tarball = package::tarball_path(args.tarball_name.as_deref(), &cfg.package);
    let release = heroku_release(&args.heroku, &cfg, tarball)?;
    info!("Effective Heroku deploy: app {} from {}", release.app, release.tarball.display());

    let client = network::http_client()?;
    let slug_id = heroku::publish(&client, &release).await?;
    println!("Released slug {} to {}", slug_id, release.app);
    Ok(())
}

/// # Resolve Heroku Release (`heroku_release`)
///
/// Combines flags and the `[heroku]` config section. Process types given on
/// the command line replace the configured ones entirely.
///
/// ## Errors
///
/// `SlugError::MissingSetting` when the app, email or key is absent;
/// `SlugError::Config` for a malformed `--process`.
pub fn heroku_release(opts: &HerokuOpts, cfg: &Config, tarball: PathBuf) -> Result<heroku::HerokuRelease> {
    let app = opts
        .app
        .clone()
        .or_else(|| cfg.heroku.app.clone())
        .ok_or(SlugError::MissingSetting {
            setting: "heroku.app",
            flag: "--app",
        })?;
    let email = opts
        .email
        .clone()
        .or_else(|| cfg.heroku.email.clone())
        .ok_or(SlugError::MissingSetting {
            setting: "heroku.email",
            flag: "--heroku-email",
        })?;
    let key = opts.key.clone().ok_or(SlugError::MissingSetting {
        setting: "Heroku API key",
        flag: "--heroku-key or HEROKU_API_KEY",
    })?;
    let process_types = if opts.process.is_empty() {
        cfg.heroku.process_types.clone()
    } else {
        heroku::parse_process_types(&opts.process)?
    };

    Ok(heroku::HerokuRelease {
        api_url: opts
            .api_url
            .clone()
            .or_else(|| cfg.heroku.api_url.clone())
            .unwrap_or_else(|| heroku::DEFAULT_API_URL.to_string()),
        app,
        email,
        key,
        commitish: opts.commitish.clone().or_else(|| cfg.heroku.commitish.clone()),
        process_types,
        tarball,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heroku_release_resolution() {
        let mut cfg = Config::default();
        cfg.heroku.app = Some("octo-service".into());
        cfg.heroku.email = Some("deploy@example.com".into());
        cfg.heroku.process_types.insert("web".into(), "./bin/old".into());
        let opts = HerokuOpts {
            key: Some("k3y".into()),
            process: vec!["web=./bin/web".into()],
            ..Default::default()
        };

        let release = heroku_release(&opts, &cfg, PathBuf::from("release.tar.gz")).unwrap();
        assert_eq!(release.app, "octo-service");
        assert_eq!(release.api_url, heroku::DEFAULT_API_URL);
        assert_eq!(release.process_types.get("web").map(String::as_str), Some("./bin/web"));
        assert_eq!(release.commitish, None);
    }

    #[test]
    fn test_missing_app_is_reported() {
        let err = heroku_release(&HerokuOpts::default(), &Config::default(), PathBuf::new()).unwrap_err();
        assert!(err.to_string().contains("--app"));
    }
}
