//! # Layered Archive Writer (`common::archive::writer`)
//!
//! File: cli/src/common/archive/writer.rs
//!
//! ## Overview
//!
//! `ArchiveWriter` owns the output byte stream of one archive. It stacks three
//! layers, innermost first:
//!
//! 1. the raw sink (normally the output `File`),
//! 2. a gzip compression stream (`flate2::write::GzEncoder`),
//! 3. the tar-structuring stream (`tar::Builder`).
//!
//! ## Shutdown
//!
//! `close` shuts the layers down from the outside in, and stops at the first
//! failure:
//!
//! 1. tar: writes the end-of-archive blocks and pushes them through gzip to the sink,
//! 2. gzip: flushes the remaining compressed bytes and writes the gzip footer,
//! 3. sink: flushes and closes the output.
//!
//! Both `tar::Builder` and `GzEncoder` finalize themselves when dropped, which
//! would quietly append a trailer and footer after a failure and produce an
//! archive that looks complete. To prevent that the sink is wrapped in a
//! `SinkGuard`: once any write to the sink fails, or the writer is abandoned,
//! the guard rejects every further write. A failed or abandoned archive is
//! therefore always left truncated, never silently "finished".
//!
use super::entry::{EncodedEntry, Payload};
use super::metadata::FileMetadata;
use crate::core::error::{ArchiveError, ArchiveResult, CloseStage};
use flate2::{write::GzEncoder, Compression};
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tar::{Builder, EntryType, Header};
use tracing::{debug, trace, warn};

/// Size of the name and link name fields of a ustar/GNU header.
const NAME_FIELD_LEN: usize = 100;

/// Name used for GNU long-name and long-link records.
const GNU_LONG_LINK_NAME: &[u8] = b"././@LongLink";

/// # Output Sink (`Sink`)
///
/// The raw device an archive is written to. `close` is the final shutdown
/// step and must surface any error the device reports on close.
pub trait Sink: Write {
    fn close(&mut self) -> io::Result<()> {
        self.flush()
    }
}

impl Sink for File {
    fn close(&mut self) -> io::Result<()> {
        self.flush()?;
        self.sync_all()
    }
}

impl Sink for Vec<u8> {}

/// Wraps the raw sink and refuses all writes after the first failure.
struct SinkGuard<W> {
    inner: Option<W>,
    failed: bool,
}

impl<W: Write> SinkGuard<W> {
    fn new(inner: W) -> Self {
        SinkGuard {
            inner: Some(inner),
            failed: false,
        }
    }

    fn poison(&mut self) {
        self.failed = true;
    }

    fn take(&mut self) -> Option<W> {
        self.poison();
        self.inner.take()
    }

    fn live(&mut self) -> io::Result<&mut W> {
        if self.failed {
            return Err(io::Error::other("archive output is unusable after an earlier failure"));
        }
        self.inner
            .as_mut()
            .ok_or_else(|| io::Error::other("archive output already closed"))
    }
}

impl<W: Write> Write for SinkGuard<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let result = self.live()?.write(buf);
        if result.is_err() {
            self.poison();
        }
        result
    }

    fn flush(&mut self) -> io::Result<()> {
        let result = self.live()?.flush();
        if result.is_err() {
            self.poison();
        }
        result
    }
}

/// Reader over a source file that fails if the file ends before `remaining`
/// bytes were produced, and remembers whether a failure came from the source.
struct SourceReader {
    file: io::Take<File>,
    remaining: u64,
    failed: bool,
}

impl Read for SourceReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = match self.file.read(buf) {
            Ok(n) => n,
            Err(e) => {
                self.failed = true;
                return Err(e);
            }
        };
        if n == 0 && self.remaining > 0 && !buf.is_empty() {
            self.failed = true;
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "file shrank while it was being archived",
            ));
        }
        self.remaining -= n as u64;
        Ok(n)
    }
}

type TarStack<W> = Builder<GzEncoder<SinkGuard<W>>>;

/// # Archive Writer Handle (`ArchiveWriter`)
///
/// The live `tar(gzip(sink))` stack. Entries are appended strictly in call
/// order. Dropping the writer without calling `close` abandons the archive.
pub struct ArchiveWriter<W: Sink> {
    tar: Option<TarStack<W>>,
    output: PathBuf,
    /// `(dev, ino)` of the output file, when it lives on disk.
    output_id: Option<(u64, u64)>,
}

impl<W: Sink> ArchiveWriter<W> {
    /// Builds the writer stack over `sink`. `output` names the sink in error messages.
    pub fn new(sink: W, output: impl Into<PathBuf>) -> Self {
        let encoder = GzEncoder::new(SinkGuard::new(sink), Compression::default());
        ArchiveWriter {
            tar: Some(Builder::new(encoder)),
            output: output.into(),
            output_id: None,
        }
    }

    /// Records the device and inode of the output so the walk can leave it out.
    pub fn set_output_id(&mut self, dev: u64, ino: u64) {
        self.output_id = Some((dev, ino));
    }

    /// Whether `meta` describes the file this writer is producing.
    pub fn is_output(&self, meta: &FileMetadata) -> bool {
        self.output_id == Some((meta.dev, meta.ino))
    }

    /// # Append Entry (`write_entry`)
    ///
    /// Writes the entry's header, preceded by GNU long-name/long-link records
    /// when its name or link target does not fit the 100-byte header fields,
    /// then streams the payload for regular files.
    ///
    /// ## Errors
    ///
    /// A failure to read the source file is reported against the source path
    /// (`Permission` or `Io`); a failure to write is reported against the
    /// output path. Either way the writer is unusable afterwards.
    pub fn write_entry(&mut self, entry: EncodedEntry) -> ArchiveResult<()> {
        let output = self.output.clone();
        let builder = self.tar.as_mut().ok_or_else(|| ArchiveError::Io {
            path: output.clone(),
            op: "write",
            source: io::Error::other("archive writer already closed"),
        })?;
        let write_err = |source| ArchiveError::Io {
            path: output.clone(),
            op: "write",
            source,
        };

        let EncodedEntry {
            mut header,
            path,
            link_target,
            payload,
        } = entry;
        trace!(entry = %path, "Appending archive entry");

        if path.as_bytes().len() > NAME_FIELD_LEN {
            append_long_record(builder, EntryType::GNULongName, path.as_bytes()).map_err(write_err)?;
        }
        if let Some(target) = &link_target {
            if target.len() > NAME_FIELD_LEN {
                append_long_record(builder, EntryType::GNULongLink, target).map_err(write_err)?;
            }
            fill_field(&mut header.as_old_mut().linkname, target);
        }
        fill_field(&mut header.as_old_mut().name, path.as_bytes());
        header.set_cksum();

        match payload {
            Payload::Empty => builder.append(&header, io::empty()).map_err(write_err),
            Payload::File { file, len, source } => {
                let mut reader = SourceReader {
                    file: file.take(len),
                    remaining: len,
                    failed: false,
                };
                builder.append(&header, &mut reader).map_err(|e| {
                    if reader.failed {
                        ArchiveError::from_io(source, "read", e)
                    } else {
                        write_err(e)
                    }
                })
            }
        }
    }

    /// # Ordered Close (`close`)
    ///
    /// Finalizes tar, then gzip, then the sink, and returns the sink. The
    /// first failing stage aborts the remaining ones and is reported as
    /// `ArchiveError::Close` naming that stage.
    pub fn close(mut self) -> ArchiveResult<W> {
        let mut builder = self.tar.take().ok_or_else(|| ArchiveError::Close {
            stage: CloseStage::Tar,
            source: io::Error::other("archive writer already closed"),
        })?;

        // 1. End-of-archive marker, pushed through to the sink.
        let finished = builder.finish().and_then(|()| builder.get_mut().flush());
        if let Err(source) = finished {
            builder.get_mut().get_mut().poison();
            return Err(ArchiveError::Close {
                stage: CloseStage::Tar,
                source,
            });
        }
        let mut encoder = builder.into_inner().map_err(|source| ArchiveError::Close {
            stage: CloseStage::Tar,
            source,
        })?;
        debug!(output = %self.output.display(), "Tar stream finalized");

        // 2. Remaining compressed bytes and the gzip footer.
        if let Err(source) = encoder.try_finish() {
            encoder.get_mut().poison();
            return Err(ArchiveError::Close {
                stage: CloseStage::Compression,
                source,
            });
        }
        let mut guard = encoder.finish().map_err(|source| ArchiveError::Close {
            stage: CloseStage::Compression,
            source,
        })?;
        debug!(output = %self.output.display(), "Gzip stream finalized");

        // 3. The raw sink.
        let mut sink = guard.take().ok_or_else(|| ArchiveError::Close {
            stage: CloseStage::Sink,
            source: io::Error::other("archive output already closed"),
        })?;
        sink.close().map_err(|source| ArchiveError::Close {
            stage: CloseStage::Sink,
            source,
        })?;
        debug!(output = %self.output.display(), "Output closed");
        Ok(sink)
    }

    /// Path of the output, as given to `new`.
    pub fn output(&self) -> &Path {
        &self.output
    }
}

impl<W: Sink> Drop for ArchiveWriter<W> {
    fn drop(&mut self) {
        if let Some(mut builder) = self.tar.take() {
            warn!(output = %self.output.display(), "Abandoning incomplete archive");
            // Detach the sink first so the layers' own drop-time finalizers
            // write nothing.
            let sink = builder.get_mut().get_mut().take();
            drop(builder);
            if let Some(mut sink) = sink {
                if let Err(e) = sink.flush() {
                    debug!(output = %self.output.display(), "Flushing abandoned output failed: {}", e);
                }
            }
        }
    }
}

/// Copies `value` into a fixed-size header field, zero-filling the rest and
/// truncating what does not fit (the full value travels in a GNU long record).
fn fill_field(field: &mut [u8], value: &[u8]) {
    let len = value.len().min(field.len());
    field.fill(0);
    field[..len].copy_from_slice(&value[..len]);
}

/// Appends a GNU `L` (long name) or `K` (long link) record carrying `value`.
fn append_long_record<T: Write>(builder: &mut Builder<T>, kind: EntryType, value: &[u8]) -> io::Result<()> {
    let mut header = Header::new_gnu();
    fill_field(&mut header.as_old_mut().name, GNU_LONG_LINK_NAME);
    header.set_mode(0o644);
    header.set_uid(0);
    header.set_gid(0);
    header.set_mtime(0);
    // The value is NUL-terminated.
    header.set_size(value.len() as u64 + 1);
    header.set_entry_type(kind);
    header.set_cksum();
    builder.append(&header, value.chain(io::repeat(0).take(1)))
}
