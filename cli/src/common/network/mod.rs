//! # slugdeploy Network Utilities Module (`common::network`)
//!
//! File: cli/src/common/network/mod.rs
//!
//! ## Overview
//!
//! HTTP plumbing for the two release collaborators:
//!
//! - **`github`**: creates a draft prerelease and uploads the tarball as a release asset.
//! - **`heroku`**: creates a slug, uploads the tarball to the slug's blob URL and publishes a release.
//!
//! Both share one `reqwest::Client` built by `http_client` and report API
//! failures through `check_status`, which turns any status >= 400 into a
//! `SlugError::Api` carrying the response body.
//!
//! All requests are built natively; nothing shells out to `curl`.
//!

pub mod github;
pub mod heroku;

use crate::core::error::{Result, SlugError};
use anyhow::Context;
use reqwest::{Client, Response};
use tracing::debug;

/// User-Agent sent with every request. GitHub rejects requests without one.
pub const USER_AGENT: &str = concat!("slugdeploy/", env!("CARGO_PKG_VERSION"));

/// Builds the HTTP client shared by the uploaders.
pub fn http_client() -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .build()
        .context("Failed to build HTTP client")
}

/// Passes `response` through when its status is below 400, otherwise reads
/// the body and returns `SlugError::Api`.
pub async fn check_status(service: &'static str, response: Response) -> Result<Response> {
    let status = response.status();
    debug!(service, status = status.as_u16(), url = %response.url(), "API response");
    if status.as_u16() < 400 {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(SlugError::Api {
        service,
        status: status.as_u16(),
        body,
    }
    .into())
}

/// Joins an API base URL and a path without doubling slashes.
pub fn endpoint(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}
