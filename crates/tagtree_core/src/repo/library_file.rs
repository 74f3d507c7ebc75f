//! Library file storage.
//!
//! # Responsibility
//! - Read and atomically write library document bytes.
//! - Create and count timestamped backup copies.
//!
//! # Invariants
//! - The primary file is replaced by rename from a fully written temporary
//!   file in the same directory; readers never observe a partial document.
//! - Backups are created from the primary file only after it is written.

use log::debug;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tempfile::NamedTempFile;

const BACKUP_MARKER: &str = ".bak-";

/// Direction of a failed file access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileAccess {
    Read,
    Write,
}

impl Display for FileAccess {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Read => write!(f, "reading"),
            Self::Write => write!(f, "writing"),
        }
    }
}

#[derive(Debug)]
pub struct LibraryFileError {
    pub path: PathBuf,
    pub access: FileAccess,
    pub source: io::Error,
}

impl Display for LibraryFileError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "cannot open `{}` for {}: {}",
            self.path.display(),
            self.access,
            self.source
        )
    }
}

impl Error for LibraryFileError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.source)
    }
}

pub type LibraryFileResult<T> = Result<T, LibraryFileError>;

/// Reads the whole library file.
pub fn read_library_file(path: &Path) -> LibraryFileResult<Vec<u8>> {
    fs::read(path).map_err(|source| LibraryFileError {
        path: path.to_path_buf(),
        access: FileAccess::Read,
        source,
    })
}

/// Replaces `path` with `bytes` through a temporary sibling file.
pub fn write_library_file(path: &Path, bytes: &[u8]) -> LibraryFileResult<()> {
    let wrap = |source: io::Error| LibraryFileError {
        path: path.to_path_buf(),
        access: FileAccess::Write,
        source,
    };
    let dir = parent_dir(path);
    let mut temp = NamedTempFile::new_in(dir).map_err(wrap)?;
    temp.write_all(bytes).map_err(wrap)?;
    temp.as_file().sync_all().map_err(wrap)?;
    temp.persist(path).map_err(|err| wrap(err.error))?;
    Ok(())
}

/// Number of backups of `path` present next to it.
pub fn count_backups(path: &Path) -> io::Result<usize> {
    let Some(prefix) = backup_prefix(path) else {
        return Ok(0);
    };
    let mut count = 0;
    for entry in fs::read_dir(parent_dir(path))? {
        let name = entry?.file_name();
        if name.to_string_lossy().starts_with(&prefix) {
            count += 1;
        }
    }
    Ok(count)
}

/// Copies `path` to `<file>.bak-<unix-epoch-ms>` and returns the copy's path.
pub fn create_backup(path: &Path) -> io::Result<PathBuf> {
    let prefix = backup_prefix(path).ok_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidInput, "library path has no file name")
    })?;
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis())
        .unwrap_or_default();

    let dir = parent_dir(path);
    let mut backup = dir.join(format!("{prefix}{millis}"));
    let mut attempt = 1;
    while backup.exists() {
        backup = dir.join(format!("{prefix}{millis}-{attempt}"));
        attempt += 1;
    }
    fs::copy(path, &backup)?;
    debug!("event=library_backup module=library_file status=ok attempt={attempt}");
    Ok(backup)
}

fn backup_prefix(path: &Path) -> Option<String> {
    path.file_name()
        .map(|name| format!("{}{BACKUP_MARKER}", name.to_string_lossy()))
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}
