//! # Recursive Tree Walker (`common::archive::walker`)
//!
//! File: cli/src/common/archive/walker.rs
//!
//! ## Overview
//!
//! Walks one requested path depth-first with `walkdir` and appends an entry
//! for every object below it. Entries are written in pre-order: a directory's
//! header always precedes the headers of its descendants, because the
//! unpacking side creates parents before children.
//!
//! Children are visited in file name order (byte-wise on Unix), which makes
//! the archive layout independent of the order the filesystem happens to list
//! entries in.
//!
//! Symbolic links are archived as links and never descended into, even when
//! they point at a directory (the requested path itself included), so cyclic
//! links cannot loop the walk.
//!
//! The archive's own output file is left out when it lies inside a requested
//! directory.
//!
use super::entry::{self, ArchivePath};
use super::metadata;
use super::writer::{ArchiveWriter, Sink};
use crate::core::error::{ArchiveError, ArchiveResult};
use std::io;
use std::path::Path;
use tracing::debug;
use walkdir::WalkDir;

/// # Walk Requested Path (`walk`)
///
/// Appends `root` as `archive_path`, and everything below it when it is a
/// directory. Returns the number of entries written.
///
/// ## Errors
///
/// Stops at the first error from metadata resolution, encoding, directory
/// listing or the writer.
pub fn walk<W: Sink>(writer: &mut ArchiveWriter<W>, root: &Path, archive_path: ArchivePath) -> ArchiveResult<usize> {
    let mut written = 0;
    let entries = WalkDir::new(root)
        .follow_links(false)
        .follow_root_links(false)
        .sort_by_file_name();

    for item in entries {
        let item = item.map_err(|e| walk_error(root, e))?;
        let source = item.path();
        let meta = metadata::resolve(source)?;
        if writer.is_output(&meta) {
            debug!(path = %source.display(), "File is the archive; not dumped");
            continue;
        }

        let relative = source.strip_prefix(root).map_err(|_| ArchiveError::InvalidSource {
            path: source.to_path_buf(),
        })?;
        let target = relative
            .components()
            .fold(archive_path.clone(), |path, part| path.join(part.as_os_str()));
        if item.file_type().is_dir() {
            debug!(dir = %source.display(), depth = item.depth(), "Descending into directory");
        }

        let record = entry::encode(&meta, source, target)?;
        writer.write_entry(record)?;
        written += 1;
    }

    Ok(written)
}

/// Maps a traversal failure onto the archive error taxonomy.
fn walk_error(root: &Path, err: walkdir::Error) -> ArchiveError {
    let path = err.path().unwrap_or(root).to_path_buf();
    let source = err
        .into_io_error()
        .unwrap_or_else(|| io::Error::other("filesystem loop detected"));
    ArchiveError::from_io(path, "list", source)
}
