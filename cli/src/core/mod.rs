//! # slugdeploy Core Infrastructure
//!
//! File: cli/src/core/mod.rs
//!
//! ## Overview
//!
//! Foundational pieces shared by every command:
//! - `config`: loading, merging and validating `.slugdeploy.toml`
//! - `error`: the archiver and collaborator error types, plus the `Result` alias
//!
//! ```rust
//! use crate::core::config; // For loading configuration
//! use crate::core::error::{Result, SlugError}; // For error handling
//! ```
//!
pub mod config;
pub mod error;
