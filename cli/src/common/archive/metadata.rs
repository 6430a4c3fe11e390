//! # Filesystem Metadata Resolution (`common::archive::metadata`)
//!
//! File: cli/src/common/archive/metadata.rs
//!
//! ## Overview
//!
//! Produces the read-only snapshot of one filesystem entry that the tar
//! encoder turns into a header: type, mode, owner, modification time, size
//! and (for symbolic links) the stored link target.
//!
//! The mode is the full `st_mode`, file-type bits included (`0o100644` for a
//! regular file, `0o40755` for a directory), matching the synthetic top-level
//! directory's `0o40777`.
//!
//! Links are never followed. `resolve` reads the metadata of the link itself,
//! so a link to a directory is reported as `EntryKind::Symlink` and a dangling
//! link resolves fine as long as its target string can be read.
//!
use crate::core::error::{ArchiveError, ArchiveResult};
use std::ffi::OsString;
use std::fs;
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};
use tracing::trace;

/// The kinds of filesystem objects that can be archived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Regular,
    Directory,
    Symlink,
}

/// Snapshot of one filesystem entry, used once to build one tar header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMetadata {
    /// Base name of the entry (the full path when it has none, e.g. `.`).
    pub name: OsString,
    pub kind: EntryKind,
    /// `st_mode` as reported by the filesystem.
    pub mode: u32,
    pub uid: u64,
    pub gid: u64,
    /// Modification time in seconds since the Unix epoch. Pre-epoch times clamp to 0.
    pub mtime: u64,
    /// Content length for regular files, 0 otherwise.
    pub size: u64,
    /// Stored target string, for symlinks only.
    pub link_target: Option<PathBuf>,
    /// Device and inode number, identifying the object on this host.
    pub dev: u64,
    pub ino: u64,
}

/// # Resolve Entry Metadata (`resolve`)
///
/// Reads the metadata of `path` without following symbolic links.
///
/// ## Errors
///
/// - `ArchiveError::NotFound` if `path` does not exist.
/// - `ArchiveError::Permission` if its metadata cannot be read.
/// - `ArchiveError::LinkResolution` if `path` is a symlink whose target string cannot be read.
/// - `ArchiveError::UnsupportedFileType` for sockets, fifos and device nodes.
pub fn resolve(path: &Path) -> ArchiveResult<FileMetadata> {
    let meta = fs::symlink_metadata(path).map_err(|e| ArchiveError::from_io(path, "stat", e))?;
    let file_type = meta.file_type();

    let kind = if file_type.is_symlink() {
        EntryKind::Symlink
    } else if file_type.is_dir() {
        EntryKind::Directory
    } else if file_type.is_file() {
        EntryKind::Regular
    } else {
        return Err(ArchiveError::UnsupportedFileType {
            path: path.to_path_buf(),
        });
    };

    let link_target = match kind {
        EntryKind::Symlink => Some(fs::read_link(path).map_err(|source| {
            ArchiveError::LinkResolution {
                path: path.to_path_buf(),
                source,
            }
        })?),
        _ => None,
    };

    let resolved = FileMetadata {
        name: path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| path.as_os_str().to_os_string()),
        kind,
        mode: meta.mode(),
        uid: u64::from(meta.uid()),
        gid: u64::from(meta.gid()),
        mtime: u64::try_from(meta.mtime()).unwrap_or(0),
        size: if kind == EntryKind::Regular { meta.len() } else { 0 },
        link_target,
        dev: meta.dev(),
        ino: meta.ino(),
    };
    trace!(path = %path.display(), kind = ?resolved.kind, mode = format_args!("{:o}", resolved.mode), "Resolved metadata");
    Ok(resolved)
}
