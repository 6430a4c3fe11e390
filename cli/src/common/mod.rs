//! # slugdeploy Common Utilities (`common`)
//!
//! File: cli/src/common/mod.rs
//!
//! ## Overview
//!
//! Shared building blocks used by the command handlers:
//!
//! - **`archive`**: the slug archiver. Walks the sources and streams a gzip
//!   compressed tar in which every entry sits under `./<top-level>/`.
//! - **`network`**: HTTP clients for the GitHub releases API and the Heroku
//!   Platform API.
//! - **`system`**: host process queries (the invoking user's uid/gid).
//!
//! ```rust
//! use crate::common::archive::{self, ArchiveRequest};
//! use crate::common::network::{self, github};
//! ```
//!

/// Slug tarball creation.
pub mod archive;
/// GitHub and Heroku API clients.
pub mod network;
/// Host process queries.
pub mod system;
