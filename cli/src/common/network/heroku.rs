//! # Heroku Slug Deploy (`common::network::heroku`)
//!
//! File: cli/src/common/network/heroku.rs
//!
//! ## Overview
//!
//! Deploys a prebuilt slug tarball through the Heroku Platform API:
//!
//! 1. `POST /apps/{app}/slugs` registers the slug (process types, commit) and
//!    returns its id plus a pre-signed blob URL.
//! 2. The tarball is sent to the blob URL with the method Heroku names.
//!    The blob store rejects the upload if a `Content-Type` header is present,
//!    so the request carries none.
//! 3. `POST /apps/{app}/releases` makes the slug the app's current release.
//!
use super::{check_status, endpoint};
use crate::core::error::{Result, SlugError};
use anyhow::Context;
use reqwest::header::ACCEPT;
use reqwest::{Client, Method, RequestBuilder};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::{debug, info};

pub const DEFAULT_API_URL: &str = "https://api.heroku.com";

/// Accept header selecting version 3 of the Platform API.
pub const API_ACCEPT: &str = "application/vnd.heroku+json; version=3";

const SERVICE: &str = "Heroku";

/// A fully resolved Heroku deploy request.
#[derive(Debug, Clone)]
pub struct HerokuRelease {
    pub api_url: String,
    pub app: String,
    pub email: String,
    /// API key or password.
    pub key: String,
    pub commitish: Option<String>,
    pub process_types: BTreeMap<String, String>,
    pub tarball: PathBuf,
}

#[derive(Serialize)]
struct CreateSlug<'a> {
    process_types: &'a BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    commit: Option<&'a str>,
}

#[derive(Deserialize, Debug)]
struct Slug {
    id: String,
    blob: Blob,
}

#[derive(Deserialize, Debug)]
struct Blob {
    method: String,
    url: String,
}

#[derive(Serialize)]
struct CreateRelease<'a> {
    slug: &'a str,
}

#[derive(Deserialize, Debug)]
struct CreatedRelease {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    version: Option<u64>,
}

/// # Deploy Slug (`publish`)
///
/// Creates the slug, uploads the tarball and publishes the release. Returns
/// the id of the new slug.
///
/// ## Errors
///
/// Fails if any of the three requests cannot be sent or returns a status
/// >= 400, if the blob store answers with an XML `<Error>` document, or if the
/// tarball cannot be read.
pub async fn publish(client: &Client, release: &HerokuRelease) -> Result<String> {
    info!("[heroku] Creating release slug for {}", release.app);
    let slug = create_slug(client, release).await?;
    debug!("[heroku] Slug {} will be uploaded with {} {}", slug.id, slug.blob.method, slug.blob.url);

    info!("[heroku] Uploading build");
    upload_blob(client, &slug.blob, release).await?;

    info!("[heroku] Publishing release");
    let created = api_request(client, Method::POST, release, &format!("apps/{}/releases", release.app))
        .json(&CreateRelease { slug: &slug.id })
        .send()
        .await
        .context("Failed to send release request to Heroku")?;
    let created: CreatedRelease = check_status(SERVICE, created)
        .await?
        .json()
        .await
        .unwrap_or(CreatedRelease { id: None, version: None });
    info!(
        "[heroku] Done (release {} v{})",
        created.id.as_deref().unwrap_or("?"),
        created.version.map(|v| v.to_string()).unwrap_or_else(|| "?".into())
    );
    Ok(slug.id)
}

fn api_request(client: &Client, method: Method, release: &HerokuRelease, path: &str) -> RequestBuilder {
    client
        .request(method, endpoint(&release.api_url, path))
        .basic_auth(&release.email, Some(&release.key))
        .header(ACCEPT, API_ACCEPT)
}

async fn create_slug(client: &Client, release: &HerokuRelease) -> Result<Slug> {
    let body = CreateSlug {
        process_types: &release.process_types,
        commit: release.commitish.as_deref(),
    };
    let response = api_request(client, Method::POST, release, &format!("apps/{}/slugs", release.app))
        .json(&body)
        .send()
        .await
        .context("Failed to send slug request to Heroku")?;
    check_status(SERVICE, response)
        .await?
        .json()
        .await
        .map_err(|e| {
            SlugError::UnexpectedResponse {
                service: SERVICE,
                detail: format!("slug response lacks id or blob: {e}"),
            }
            .into()
        })
}

async fn upload_blob(client: &Client, blob: &Blob, release: &HerokuRelease) -> Result<()> {
    let method = Method::from_bytes(blob.method.to_uppercase().as_bytes()).map_err(|_| {
        SlugError::UnexpectedResponse {
            service: SERVICE,
            detail: format!("unknown blob method '{}'", blob.method),
        }
    })?;
    let data = tokio::fs::read(&release.tarball)
        .await
        .with_context(|| format!("Failed to read tarball {}", release.tarball.display()))?;

    // A plain byte body: reqwest adds Content-Length but no Content-Type.
    let response = client
        .request(method, &blob.url)
        .body(data)
        .send()
        .await
        .context("Failed to upload slug blob")?;
    let status = response.status().as_u16();
    let text = response.text().await.unwrap_or_default();
    if status >= 400 || is_blob_error(&text) {
        return Err(SlugError::Api {
            service: "Heroku blob store",
            status,
            body: text,
        }
        .into());
    }
    Ok(())
}

/// The blob store can answer 200 with an XML error document.
fn is_blob_error(body: &str) -> bool {
    body.contains("<Error>") || body.contains("<error>")
}

/// Parses `TYPE=COMMAND` process type definitions.
pub fn parse_process_types(specs: &[String]) -> Result<BTreeMap<String, String>> {
    specs
        .iter()
        .map(|spec| match spec.split_once('=') {
            Some((name, command)) if !name.trim().is_empty() && !command.trim().is_empty() => {
                Ok((name.trim().to_string(), command.trim().to_string()))
            }
            _ => Err(SlugError::Config(format!(
                "Invalid process type '{spec}': expected TYPE=COMMAND, e.g. web=./bin/web"
            ))
            .into()),
        })
        .collect()
}
