//! # Slug Tarball Creation (`common::archive::slug`)
//!
//! File: cli/src/common/archive/slug.rs
//!
//! ## Overview
//!
//! The public entry point of the archiver. `create_archive` writes a
//! gzip-compressed tar file laid out the way a slug must be:
//!
//! - the first entry is a synthetic directory `./<top_level>`,
//! - every requested path is stored under it by its base name
//!   (`src/` → `./app/src`, `/srv/build/notes.txt` → `./app/notes.txt`),
//! - every entry name starts with `./`,
//! - the output file itself is never archived, even inside a requested directory,
//! - mode, owner and modification time of each file are preserved, and
//!   symbolic links are stored as links.
//!
//! ## Architecture
//!
//! ```text
//! create_archive
//!   ├── File::create(output)
//!   ├── ArchiveWriter::new            tar(gzip(file))
//!   ├── entry::synthetic_directory    ./app
//!   ├── walker::walk  (per source)    metadata::resolve → entry::encode → write_entry
//!   └── ArchiveWriter::close          tar → gzip → file
//! ```
//!
//! The first error aborts the whole operation. The writer is then abandoned
//! without writing the tar trailer or gzip footer, so a failed run never
//! leaves behind a file that decodes as a complete archive. Deleting the
//! partial file is up to the caller.
//!
//! ## Usage
//!
//! ```rust
//! use crate::common::archive::{create_archive, ArchiveRequest};
//!
//! let request = ArchiveRequest::new("release.tar.gz", "app", vec!["bin".into(), "Procfile".into()]);
//! let entries = create_archive(&request)?;
//! ```
//!
use super::entry::{self, ArchivePath};
use super::walker;
use super::writer::{ArchiveWriter, Sink};
use crate::core::error::{ArchiveError, ArchiveResult};
use std::ffi::OsString;
use std::fs::File;
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};
use tracing::info;

/// Everything one archiving run needs. Immutable once archiving begins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveRequest {
    /// File the tarball is written to. Created or truncated.
    pub output: PathBuf,
    /// Name of the synthetic top-level directory, e.g. `app`.
    pub top_level: String,
    /// Files and directories to include, in order.
    pub sources: Vec<PathBuf>,
}

impl ArchiveRequest {
    pub fn new(output: impl Into<PathBuf>, top_level: impl Into<String>, sources: Vec<PathBuf>) -> Self {
        ArchiveRequest {
            output: output.into(),
            top_level: top_level.into(),
            sources,
        }
    }
}

/// # Create Slug Tarball (`create_archive`)
///
/// Writes the archive described by `request` and returns the number of
/// entries it contains, the synthetic directory included.
///
/// ## Errors
///
/// - `ArchiveError::InvalidSource` if a source has no usable base name (e.g. `/`).
/// - `ArchiveError::Io` if the output file cannot be created or written.
/// - `ArchiveError::NotFound`, `Permission` or `LinkResolution` for unreadable sources.
/// - `ArchiveError::Close` if one of the three shutdown stages fails.
pub fn create_archive(request: &ArchiveRequest) -> ArchiveResult<usize> {
    let anchors = anchor_sources(&request.sources)?;

    info!(output = %request.output.display(), "Creating tarball");
    let file = File::create(&request.output).map_err(|source| ArchiveError::Io {
        path: request.output.clone(),
        op: "create",
        source,
    })?;
    let stat = file.metadata().map_err(|e| ArchiveError::from_io(&request.output, "stat", e))?;
    let mut writer = ArchiveWriter::new(file, &request.output);
    writer.set_output_id(stat.dev(), stat.ino());
    let (_, entries) = write_archive(writer, &request.top_level, &anchors)?;
    info!(output = %request.output.display(), entries, "Tarball complete");
    Ok(entries)
}

/// Writes a complete slug into an already constructed writer and closes it.
/// Returns the closed sink and the number of entries written.
pub fn write_archive<W: Sink>(
    mut writer: ArchiveWriter<W>,
    top_level: &str,
    anchors: &[(PathBuf, OsString)],
) -> ArchiveResult<(W, usize)> {
    let root = ArchivePath::root(top_level);

    info!(entry = %root, "Writing synthetic top-level directory");
    writer.write_entry(entry::synthetic_directory(root.clone(), chrono::Utc::now().timestamp()))?;
    let mut entries = 1;

    for (source, name) in anchors {
        info!(source = %source.display(), "Adding requested path");
        entries += walker::walk(&mut writer, source, root.join(name))?;
    }

    info!(output = %writer.output().display(), "Closing tarball");
    let sink = writer.close()?;
    Ok((sink, entries))
}

/// Pairs each source with the name it gets directly under the top-level folder.
pub fn anchor_sources(sources: &[PathBuf]) -> ArchiveResult<Vec<(PathBuf, OsString)>> {
    sources
        .iter()
        .map(|source| anchor_name(source).map(|name| (source.clone(), name)))
        .collect()
}

/// Base name of `source`. Paths without one (`.`, `..`, `dir/..`) are
/// canonicalized first, so `.` is stored under the working directory's name.
fn anchor_name(source: &Path) -> ArchiveResult<OsString> {
    if let Some(name) = source.file_name() {
        return Ok(name.to_os_string());
    }
    let canonical = source
        .canonicalize()
        .map_err(|e| ArchiveError::from_io(source, "resolve", e))?;
    canonical
        .file_name()
        .map(|name| name.to_os_string())
        .ok_or_else(|| ArchiveError::InvalidSource {
            path: source.to_path_buf(),
        })
}
