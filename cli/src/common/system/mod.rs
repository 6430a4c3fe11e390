//! # slugdeploy System Utilities Module (`common::system`)
//!
//! File: cli/src/common/system/mod.rs
//!
//! ## Overview
//!
//! Queries about the host process that the standard library does not expose.
//! All `libc` calls in the crate live here.
//!

/// # Invoking User (`invoking_user`)
///
/// Real user and group id of the running process, as `(uid, gid)`.
pub fn invoking_user() -> (u64, u64) {
    // SAFETY: getuid and getgid have no preconditions and cannot fail.
    let (uid, gid) = unsafe { (libc::getuid(), libc::getgid()) };
    (u64::from(uid), u64::from(gid))
}
