//! # slugdeploy CLI Integration Test Common Helpers
//!
//! File: cli/tests/common.rs
//!
//! ## Overview
//!
//! Shared helpers for the integration tests: a command builder isolated from
//! the developer's environment, a scratch project directory, and a recording
//! stand-in for the GitHub and Heroku APIs.
//!

// Different test files use different helpers.
#![allow(dead_code)]

pub use assert_cmd::Command;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// # Get slugdeploy Command (`slugdeploy_cmd`)
///
/// Builds a command for the compiled binary that runs in `dir`, with a private
/// home directory and none of the credential variables of the outer shell.
pub fn slugdeploy_cmd(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("slugdeploy").expect("Failed to find slugdeploy binary for testing");
    cmd.current_dir(dir)
        .env("HOME", dir)
        .env("XDG_CONFIG_HOME", dir.join(".config"))
        .env_remove("GITHUB_TOKEN")
        .env_remove("HEROKU_EMAIL")
        .env_remove("HEROKU_API_KEY")
        .env_remove("SLUGDEPLOY_GITHUB_API_URL")
        .env_remove("SLUGDEPLOY_HEROKU_API_URL")
        .env_remove("RUST_LOG");
    cmd
}

/// A scratch project: a `.git` marker stops the config search here.
pub fn project_dir() -> TempDir {
    let dir = tempfile::tempdir().expect("Failed to create temp project dir");
    std::fs::create_dir(dir.path().join(".git")).expect("Failed to create .git marker");
    dir
}

/// One request seen by the mock API.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub content_type: Option<String>,
    pub authorization: Option<String>,
    pub body: Vec<u8>,
}

impl Recorded {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).expect("request body is not JSON")
    }
}

#[derive(Clone)]
struct MockState {
    addr: SocketAddr,
    requests: Arc<Mutex<Vec<Recorded>>>,
    blob_reply: &'static str,
}

/// Handle to a running mock API server.
pub struct MockApi {
    pub addr: SocketAddr,
    requests: Arc<Mutex<Vec<Recorded>>>,
}

impl MockApi {
    /// Starts the mock on an ephemeral port. `blob_reply` is the body returned
    /// for the slug blob upload.
    pub async fn start(blob_reply: &'static str) -> MockApi {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock API");
        let addr = listener.local_addr().expect("mock API has no address");
        let requests = Arc::new(Mutex::new(Vec::new()));
        let state = MockState {
            addr,
            requests: requests.clone(),
            blob_reply,
        };
        let app = Router::new().fallback(record).with_state(state);
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("mock API failed");
        });
        MockApi { addr, requests }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().expect("mock state poisoned").clone()
    }
}

async fn record(
    State(state): State<MockState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let header_value = |name: header::HeaderName| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    let recorded = Recorded {
        method: method.to_string(),
        path: uri.path().to_string(),
        query: uri.query().map(str::to_string),
        content_type: header_value(header::CONTENT_TYPE),
        authorization: header_value(header::AUTHORIZATION),
        body: body.to_vec(),
    };
    state.requests.lock().expect("mock state poisoned").push(recorded);

    let path = uri.path();
    if method == Method::POST && path.starts_with("/repos/") && path.ends_with("/releases") {
        let upload_url = format!("http://{}/uploads/assets{{?name,label}}", state.addr);
        return json(StatusCode::CREATED, serde_json::json!({ "id": 1, "upload_url": upload_url }));
    }
    if method == Method::POST && path.starts_with("/uploads/") {
        return json(StatusCode::CREATED, serde_json::json!({ "id": 2, "state": "uploaded" }));
    }
    if method == Method::POST && path.ends_with("/slugs") {
        let blob_url = format!("http://{}/blob/slug-1", state.addr);
        return json(
            StatusCode::CREATED,
            serde_json::json!({ "id": "slug-1", "blob": { "method": "put", "url": blob_url } }),
        );
    }
    if method == Method::PUT && path.starts_with("/blob/") {
        return (StatusCode::OK, state.blob_reply).into_response();
    }
    if method == Method::POST && path.ends_with("/releases") {
        return json(StatusCode::CREATED, serde_json::json!({ "id": "rel-1", "version": 7 }));
    }
    (StatusCode::NOT_FOUND, "not found").into_response()
}

fn json(status: StatusCode, value: serde_json::Value) -> Response {
    (status, axum::Json(value)).into_response()
}

/// Lists the entry names of a gzip-compressed tarball.
pub fn tarball_entries(path: &Path) -> Vec<String> {
    let file = std::fs::File::open(path).expect("Failed to open tarball");
    let mut archive = tar::Archive::new(flate2::read::GzDecoder::new(file));
    archive
        .entries()
        .expect("Failed to read tarball")
        .map(|entry| {
            let entry = entry.expect("Corrupt tar entry");
            String::from_utf8_lossy(&entry.path_bytes()).into_owned()
        })
        .collect()
}
