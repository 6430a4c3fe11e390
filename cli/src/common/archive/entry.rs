//! # Tar Entry Encoding (`common::archive::entry`)
//!
//! File: cli/src/common/archive/entry.rs
//!
//! ## Overview
//!
//! Turns a `FileMetadata` snapshot plus a destination path into an
//! `EncodedEntry`: a tar header, the entry's name inside the archive, the link
//! target for symlinks, and the payload source for regular files.
//!
//! Archive names follow the slug convention: every name starts with `./`,
//! followed by the top-level folder and the path relative to the requested
//! root (`./app/src/lib/a.go`). Names are kept as raw bytes because the
//! `tar` crate's path setters drop a leading `./`; the writer copies these
//! bytes into the header verbatim.
//!
//! Headers use the GNU format so access and change times can be stored. All
//! three timestamps are set to the source's modification time.
//!
use super::metadata::{EntryKind, FileMetadata};
use crate::common::system;
use crate::core::error::{ArchiveError, ArchiveResult};
use std::ffi::OsStr;
use std::fmt;
use std::fs::File;
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};
use tar::{EntryType, Header};

/// Prefix required in front of every entry name of a slug.
pub const SLUG_PREFIX: &str = "./";

/// Mode of the synthetic top-level directory: `os.ModePerm` plus the tar directory type bits.
pub const SYNTHETIC_DIR_MODE: u32 = 0o40777;

/// Name of an entry inside the archive, always starting with `./`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArchivePath(Vec<u8>);

impl ArchivePath {
    /// The archive path of the top-level folder, e.g. `./app`.
    pub fn root(top_level: &str) -> Self {
        let folder = top_level.trim_start_matches(SLUG_PREFIX).trim_matches('/');
        ArchivePath(format!("{SLUG_PREFIX}{folder}").into_bytes())
    }

    /// Appends one path component.
    pub fn join(&self, name: &OsStr) -> Self {
        let mut bytes = Vec::with_capacity(self.0.len() + 1 + name.len());
        bytes.extend_from_slice(&self.0);
        if !bytes.ends_with(b"/") {
            bytes.push(b'/');
        }
        bytes.extend_from_slice(name.as_bytes());
        ArchivePath(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for ArchivePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.0))
    }
}

/// Content that follows a header in the archive.
#[derive(Debug)]
pub enum Payload {
    /// Directories and symlinks.
    Empty,
    /// An open regular file, positioned at offset zero, with its expected length.
    File { file: File, len: u64, source: PathBuf },
}

/// One archive record ready to be appended by the `ArchiveWriter`.
#[derive(Debug)]
pub struct EncodedEntry {
    /// Header with type, mode, owner, size and timestamps set. Name, link name
    /// and checksum are filled in by the writer.
    pub header: Header,
    pub path: ArchivePath,
    pub link_target: Option<Vec<u8>>,
    pub payload: Payload,
}

/// # Encode Filesystem Entry (`encode`)
///
/// Builds the record for the entry at `source` described by `meta`, to be
/// stored as `path`. Regular files are opened here; their bytes are copied by
/// the writer.
///
/// ## Errors
///
/// Returns `ArchiveError::NotFound`, `ArchiveError::Permission` or
/// `ArchiveError::Io` if a regular file cannot be opened.
pub fn encode(meta: &FileMetadata, source: &Path, path: ArchivePath) -> ArchiveResult<EncodedEntry> {
    let entry_type = match meta.kind {
        EntryKind::Regular => EntryType::Regular,
        EntryKind::Directory => EntryType::Directory,
        EntryKind::Symlink => EntryType::Symlink,
    };
    let header = base_header(entry_type, meta.mode, meta.uid, meta.gid, meta.mtime, meta.size);

    let payload = match meta.kind {
        EntryKind::Regular => Payload::File {
            file: File::open(source).map_err(|e| ArchiveError::from_io(source, "open", e))?,
            len: meta.size,
            source: source.to_path_buf(),
        },
        EntryKind::Directory | EntryKind::Symlink => Payload::Empty,
    };

    Ok(EncodedEntry {
        header,
        path,
        link_target: meta
            .link_target
            .as_ref()
            .map(|target| target.as_os_str().as_bytes().to_vec()),
        payload,
    })
}

/// # Synthetic Top-Level Directory (`synthetic_directory`)
///
/// The directory entry every slug starts with. It does not correspond to
/// anything on disk: its mode is `SYNTHETIC_DIR_MODE`, its owner is the
/// invoking user and its timestamps are `now`.
pub fn synthetic_directory(path: ArchivePath, now: i64) -> EncodedEntry {
    let (uid, gid) = system::invoking_user();
    let mtime = u64::try_from(now).unwrap_or(0);
    EncodedEntry {
        header: base_header(EntryType::Directory, SYNTHETIC_DIR_MODE, uid, gid, mtime, 0),
        path,
        link_target: None,
        payload: Payload::Empty,
    }
}

fn base_header(entry_type: EntryType, mode: u32, uid: u64, gid: u64, mtime: u64, size: u64) -> Header {
    let mut header = Header::new_gnu();
    header.set_entry_type(entry_type);
    header.set_mode(mode);
    header.set_uid(uid);
    header.set_gid(gid);
    header.set_size(size);
    header.set_mtime(mtime);
    if let Some(gnu) = header.as_gnu_mut() {
        gnu.set_atime(mtime);
        gnu.set_ctime(mtime);
    }
    header
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::archive::metadata;
    use std::fs;
    use std::os::unix::fs::symlink;
    use tempfile::tempdir;

    #[test]
    fn test_archive_path_layout() {
        let root = ArchivePath::root("app");
        assert_eq!(root.as_bytes(), b"./app");
        let nested = root.join(OsStr::new("src")).join(OsStr::new("a.go"));
        assert_eq!(nested.to_string(), "./app/src/a.go");

        // Stray slashes or a pre-existing prefix do not double up.
        assert_eq!(ArchivePath::root("./app/").as_bytes(), b"./app");
    }

    #[test]
    fn test_encode_regular_file() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let file = dir.path().join("notes.txt");
        fs::write(&file, "hello world")?;
        let meta = metadata::resolve(&file)?;

        let entry = encode(&meta, &file, ArchivePath::root("app").join(OsStr::new("notes.txt")))?;
        assert_eq!(entry.header.entry_type(), EntryType::Regular);
        assert_eq!(entry.header.size()?, 11);
        assert_eq!(entry.header.mode()?, meta.mode);
        assert_eq!(entry.header.uid()?, meta.uid);
        assert_eq!(entry.header.mtime()?, meta.mtime);
        let gnu = entry.header.as_gnu().expect("gnu header");
        assert_eq!(gnu.atime()?, meta.mtime);
        assert_eq!(gnu.ctime()?, meta.mtime);
        assert!(matches!(entry.payload, Payload::File { len: 11, .. }));
        Ok(())
    }

    #[test]
    fn test_encode_symlink_has_no_payload() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let link = dir.path().join("current");
        symlink("releases/42", &link)?;
        let meta = metadata::resolve(&link)?;

        let entry = encode(&meta, &link, ArchivePath::root("app").join(OsStr::new("current")))?;
        assert_eq!(entry.header.entry_type(), EntryType::Symlink);
        assert_eq!(entry.header.size()?, 0);
        assert_eq!(entry.link_target.as_deref(), Some(&b"releases/42"[..]));
        assert!(matches!(entry.payload, Payload::Empty));
        Ok(())
    }

    #[test]
    fn test_synthetic_directory_belongs_to_invoking_user() -> anyhow::Result<()> {
        let entry = synthetic_directory(ArchivePath::root("app"), 1_700_000_000);
        let (uid, gid) = system::invoking_user();
        assert_eq!(entry.header.entry_type(), EntryType::Directory);
        assert_eq!(entry.header.mode()?, SYNTHETIC_DIR_MODE);
        assert_eq!(entry.header.uid()?, uid);
        assert_eq!(entry.header.gid()?, gid);
        assert_eq!(entry.header.mtime()?, 1_700_000_000);
        assert_eq!(entry.path.as_bytes(), b"./app");
        Ok(())
    }
}
