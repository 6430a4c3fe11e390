//! # slugdeploy Archive Utilities Module (`common::archive`)
//!
//! File: cli/src/common/archive/mod.rs
//!
//! ## Overview
//!
//! This module builds slug tarballs: gzip-compressed tar files whose entries
//! all live under a synthetic `./<top_level>` directory and all start with
//! `./`, as the Heroku slug unpacker expects.
//!
//! ## Architecture
//!
//! Submodules, leaves first:
//!
//! - **`metadata`**: reads type, mode, owner, mtime and link target of one path without following links.
//! - **`entry`**: turns that metadata into a tar header plus payload, and builds the synthetic top-level directory entry.
//! - **`writer`**: the `tar(gzip(sink))` stack with its ordered, all-or-nothing shutdown.
//! - **`walker`**: depth-first, pre-order traversal of one requested path.
//! - **`slug`**: `create_archive`, which ties the above together.
//!
//! ## Usage
//!
//! ```rust
//! use crate::common::archive::{self, ArchiveRequest};
//!
//! let request = ArchiveRequest::new("release.tar.gz", "app", vec!["bin".into()]);
//! archive::create_archive(&request)?;
//! ```
//!

pub mod entry;
pub mod metadata;
pub mod slug;
pub mod walker;
pub mod writer;

pub use slug::{create_archive, ArchiveRequest};
