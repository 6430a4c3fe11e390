//! # slugdeploy Command Modules
//!
//! File: cli/src/commands/mod.rs
//!
//! ## Overview
//!
//! This module aggregates the top-level commands of the slugdeploy CLI. Each
//! command module defines its own arguments structure and an async handler.
//!
//! ## Commands
//!
//! - `package`: build the slug tarball only
//! - `release`: create a GitHub draft prerelease and attach files to it
//! - `deploy`: upload an existing tarball to Heroku as a slug and release it
//! - `ship`: package, then release and deploy concurrently
//!
//! The argument groups (`PackageOpts`, `GithubOpts`, `HerokuOpts`) and their
//! resolvers live with the command that introduces them and are reused by `ship`.
//!

/// Builds the slug tarball.
pub mod package;
/// Publishes GitHub releases.
pub mod release;
/// Deploys slugs to Heroku.
pub mod deploy;
/// Runs the full pipeline.
pub mod ship;
