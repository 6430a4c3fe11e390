//! # slugdeploy CLI Release and Deploy Integration Tests
//!
//! File: cli/tests/release.rs
//!
//! ## Overview
//!
//! Runs `release`, `deploy` and `ship` against a local mock of the GitHub and
//! Heroku APIs and checks the requests the binary sends.
//!

mod common;
use assert_cmd::prelude::*;
use common::*;
use predicates::prelude::*;
use std::fs;
use std::path::Path;

const GITHUB_ARGS: [&str; 6] = [
    "--github-repo",
    "octo/service",
    "--github-release-name",
    "v1.4.0",
    "--github-commitish",
    "main",
];

const HEROKU_ARGS: [&str; 6] = [
    "--app",
    "octo-service",
    "--heroku-email",
    "deploy@example.com",
    "--process",
    "web=./bin/web",
];

/// Runs the command on a blocking thread so the mock keeps serving.
async fn run(mut cmd: Command) -> assert_cmd::assert::Assert {
    let output = tokio::task::spawn_blocking(move || cmd.output())
        .await
        .expect("command thread panicked")
        .expect("Failed to run slugdeploy");
    output.assert()
}

fn write_sources(root: &Path) {
    fs::create_dir_all(root.join("bin")).unwrap();
    fs::write(root.join("bin/web"), b"#!/bin/sh\nexec server\n").unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_release_creates_draft_and_uploads_tarball() {
    let api = MockApi::start("").await;
    let dir = project_dir();
    fs::write(dir.path().join("release.tar.gz"), b"not really gzip").unwrap();

    let mut cmd = slugdeploy_cmd(dir.path());
    cmd.arg("release")
        .args(GITHUB_ARGS)
        .env("GITHUB_TOKEN", "t0ken")
        .env("SLUGDEPLOY_GITHUB_API_URL", api.url());
    run(cmd)
        .await
        .success()
        .stdout(predicate::str::contains("Published draft release v1.4.0"));

    let requests = api.requests();
    assert_eq!(requests.len(), 2);

    let create = &requests[0];
    assert_eq!(create.method, "POST");
    assert_eq!(create.path, "/repos/octo/service/releases");
    assert_eq!(create.authorization.as_deref(), Some("token t0ken"));
    let body = create.json();
    assert_eq!(body["tag_name"], "v1.4.0");
    assert_eq!(body["name"], "v1.4.0");
    assert_eq!(body["target_commitish"], "main");
    assert_eq!(body["draft"], true);
    assert_eq!(body["prerelease"], true);

    let upload = &requests[1];
    assert_eq!(upload.path, "/uploads/assets");
    assert_eq!(upload.query.as_deref(), Some("name=release.tar.gz"));
    assert_eq!(upload.content_type.as_deref(), Some("application/x-gtar"));
    assert_eq!(upload.body, b"not really gzip");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_release_without_token_sends_nothing() {
    let api = MockApi::start("").await;
    let dir = project_dir();

    let mut cmd = slugdeploy_cmd(dir.path());
    cmd.arg("release")
        .args(GITHUB_ARGS)
        .env("SLUGDEPLOY_GITHUB_API_URL", api.url());
    run(cmd)
        .await
        .code(1)
        .stderr(predicate::str::contains("GITHUB_TOKEN"));
    assert!(api.requests().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_deploy_uploads_slug_and_releases() {
    let api = MockApi::start("").await;
    let dir = project_dir();
    fs::write(dir.path().join("release.tar.gz"), b"slug bytes").unwrap();

    let mut cmd = slugdeploy_cmd(dir.path());
    cmd.arg("deploy")
        .args(HEROKU_ARGS)
        .env("HEROKU_API_KEY", "k3y")
        .env("SLUGDEPLOY_HEROKU_API_URL", api.url());
    run(cmd)
        .await
        .success()
        .stdout(predicate::str::contains("Released slug slug-1 to octo-service"));

    let requests = api.requests();
    assert_eq!(requests.len(), 3);

    let slug = &requests[0];
    assert_eq!(slug.method, "POST");
    assert_eq!(slug.path, "/apps/octo-service/slugs");
    assert!(slug.authorization.as_deref().unwrap_or_default().starts_with("Basic "));
    assert_eq!(slug.json()["process_types"]["web"], "./bin/web");

    let blob = &requests[1];
    assert_eq!(blob.method, "PUT");
    assert_eq!(blob.path, "/blob/slug-1");
    assert_eq!(blob.content_type, None);
    assert_eq!(blob.body, b"slug bytes");

    let release = &requests[2];
    assert_eq!(release.path, "/apps/octo-service/releases");
    assert_eq!(release.json()["slug"], "slug-1");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_deploy_fails_on_blob_error_document() {
    let api = MockApi::start("<?xml version=\"1.0\"?><Error><Code>AccessDenied</Code></Error>").await;
    let dir = project_dir();
    fs::write(dir.path().join("release.tar.gz"), b"slug bytes").unwrap();

    let mut cmd = slugdeploy_cmd(dir.path());
    cmd.arg("deploy")
        .args(HEROKU_ARGS)
        .env("HEROKU_API_KEY", "k3y")
        .env("SLUGDEPLOY_HEROKU_API_URL", api.url());
    run(cmd)
        .await
        .code(1)
        .stderr(predicate::str::contains("AccessDenied"));

    let requests = api.requests();
    assert_eq!(requests.len(), 2);
    assert!(requests.iter().all(|r| !r.path.ends_with("/releases")));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_ship_packages_then_releases_and_deploys() {
    let api = MockApi::start("").await;
    let dir = project_dir();
    write_sources(dir.path());

    let mut cmd = slugdeploy_cmd(dir.path());
    cmd.arg("ship")
        .args(GITHUB_ARGS)
        .args(HEROKU_ARGS)
        .arg("bin")
        .env("GITHUB_TOKEN", "t0ken")
        .env("HEROKU_API_KEY", "k3y")
        .env("SLUGDEPLOY_GITHUB_API_URL", api.url())
        .env("SLUGDEPLOY_HEROKU_API_URL", api.url());
    run(cmd).await.success();

    let tarball = dir.path().join("release.tar.gz");
    assert_eq!(tarball_entries(&tarball), vec!["./app", "./app/bin", "./app/bin/web"]);

    let tarball_bytes = fs::read(&tarball).unwrap();
    let requests = api.requests();
    assert_eq!(requests.len(), 5);
    let asset = requests.iter().find(|r| r.path == "/uploads/assets").unwrap();
    assert_eq!(asset.body, tarball_bytes);
    let blob = requests.iter().find(|r| r.path.starts_with("/blob/")).unwrap();
    assert_eq!(blob.body, tarball_bytes);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_ship_checks_credentials_before_packaging() {
    let dir = project_dir();
    write_sources(dir.path());

    let mut cmd = slugdeploy_cmd(dir.path());
    cmd.arg("ship").args(HEROKU_ARGS).arg("bin");
    run(cmd)
        .await
        .code(1)
        .stderr(predicate::str::contains("HEROKU_API_KEY"));
    assert!(!dir.path().join("release.tar.gz").exists());
}
