//! # GitHub Release Upload (`common::network::github`)
//!
//! File: cli/src/common/network/github.rs
//!
//! ## Overview
//!
//! Publishes build artifacts as a GitHub release:
//!
//! 1. `POST /repos/{repo}/releases` creates a draft prerelease named after the
//!    tag and returns an `upload_url` URI template.
//! 2. Each attachment is `POST`ed to that URL, with the `{?name,label}`
//!    template suffix replaced by `?name=<file name>`.
//!
use super::{check_status, endpoint};
use crate::core::error::{Result, SlugError};
use anyhow::Context;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Content type used for tarball assets.
pub const ASSET_CONTENT_TYPE: &str = "application/x-gtar";

const SERVICE: &str = "GitHub";

/// A fully resolved GitHub release request.
#[derive(Debug, Clone)]
pub struct GithubRelease {
    pub api_url: String,
    /// `owner/repo`.
    pub repo: String,
    pub token: String,
    /// Branch or commit to tag. GitHub uses the default branch when unset.
    pub commitish: Option<String>,
    /// Used as both the tag and the release title.
    pub name: String,
    pub description: String,
    pub attachments: Vec<PathBuf>,
}

#[derive(Serialize)]
struct CreateRelease<'a> {
    tag_name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    target_commitish: Option<&'a str>,
    name: &'a str,
    body: &'a str,
    draft: bool,
    prerelease: bool,
}

#[derive(Deserialize)]
struct CreatedRelease {
    upload_url: String,
}

/// # Publish Release (`publish`)
///
/// Creates the release and uploads every attachment, in order.
///
/// ## Errors
///
/// Fails on the first request that cannot be sent or that returns a status
/// >= 400, and if an attachment cannot be read.
pub async fn publish(client: &Client, release: &GithubRelease) -> Result<()> {
    info!("[github] Creating release {} on {}", release.name, release.repo);
    let upload_url = create_release(client, release).await?;
    for attachment in &release.attachments {
        upload_asset(client, &upload_url, attachment, &release.token).await?;
    }
    info!("[github] Done");
    Ok(())
}

async fn create_release(client: &Client, release: &GithubRelease) -> Result<String> {
    let url = endpoint(&release.api_url, &format!("repos/{}/releases", release.repo));
    let body = CreateRelease {
        tag_name: &release.name,
        target_commitish: release.commitish.as_deref(),
        name: &release.name,
        body: &release.description,
        draft: true,
        prerelease: true,
    };
    let response = client
        .post(&url)
        .header(AUTHORIZATION, format!("token {}", release.token))
        .header(ACCEPT, "application/vnd.github+json")
        .json(&body)
        .send()
        .await
        .with_context(|| format!("Failed to send release request to {url}"))?;
    let created: CreatedRelease = check_status(SERVICE, response)
        .await?
        .json()
        .await
        .map_err(|e| SlugError::UnexpectedResponse {
            service: SERVICE,
            detail: format!("release response lacks upload_url: {e}"),
        })?;
    Ok(created.upload_url)
}

async fn upload_asset(client: &Client, upload_url: &str, attachment: &Path, token: &str) -> Result<()> {
    let file_name = attachment
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .with_context(|| format!("Attachment has no file name: {}", attachment.display()))?;
    let url = asset_url(upload_url, &file_name)?;
    let data = tokio::fs::read(attachment)
        .await
        .with_context(|| format!("Failed to read attachment {}", attachment.display()))?;

    info!("[github] Uploading {} ({} bytes)", file_name, data.len());
    let response = client
        .post(url)
        .header(AUTHORIZATION, format!("token {token}"))
        .header(CONTENT_TYPE, ASSET_CONTENT_TYPE)
        .body(data)
        .send()
        .await
        .with_context(|| format!("Failed to upload {file_name}"))?;
    check_status(SERVICE, response).await?;
    Ok(())
}

/// Expands GitHub's `upload_url` template (`.../assets{?name,label}`) for one file.
pub fn asset_url(template: &str, file_name: &str) -> Result<Url> {
    let base = template.split('{').next().unwrap_or(template);
    let mut url = Url::parse(base).map_err(|e| SlugError::UnexpectedResponse {
        service: SERVICE,
        detail: format!("invalid upload_url '{template}': {e}"),
    })?;
    url.query_pairs_mut().append_pair("name", file_name);
    Ok(url)
}
