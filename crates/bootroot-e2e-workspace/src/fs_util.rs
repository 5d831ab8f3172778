//! Permission-aware file writes
//!
//! Seed secrets, keys and agent configs are written owner-only. The mode is
//! applied at creation and again afterwards, since `mode()` is ignored when
//! the file already exists.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// A filesystem operation failed on `path`.
#[derive(Debug, thiserror::Error)]
#[error("I/O error at {path}: {source}")]
pub struct FsError {
    /// Path the operation targeted.
    pub path: PathBuf,
    /// OS error.
    #[source]
    pub source: std::io::Error,
}

impl FsError {
    pub(crate) fn at(path: &Path) -> impl FnOnce(std::io::Error) -> FsError + '_ {
        move |source| FsError {
            path: path.to_path_buf(),
            source,
        }
    }
}

type Result<T> = std::result::Result<T, FsError>;

/// Owner read/write.
pub const PRIVATE_FILE_MODE: u32 = 0o600;

/// Owner read/write/execute.
pub const PRIVATE_EXEC_MODE: u32 = 0o700;

/// `mkdir -p`.
pub fn ensure_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path).map_err(FsError::at(path))
}

/// Write `contents` readable only by the owner.
pub fn write_private(path: &Path, contents: impl AsRef<[u8]>) -> Result<()> {
    write_with_mode(path, contents.as_ref(), PRIVATE_FILE_MODE)
}

/// Write an owner-only executable.
pub fn write_executable(path: &Path, contents: impl AsRef<[u8]>) -> Result<()> {
    write_with_mode(path, contents.as_ref(), PRIVATE_EXEC_MODE)
}

/// Write with the process default mode.
pub fn write_plain(path: &Path, contents: impl AsRef<[u8]>) -> Result<()> {
    fs::write(path, contents).map_err(FsError::at(path))
}

/// Tighten an existing file to owner-only.
pub fn restrict(path: &Path) -> Result<()> {
    set_mode(path, PRIVATE_FILE_MODE)
}

fn write_with_mode(path: &Path, contents: &[u8], mode: u32) -> Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(mode);
    }
    let mut file = options.open(path).map_err(FsError::at(path))?;
    file.write_all(contents).map_err(FsError::at(path))?;
    drop(file);
    set_mode(path, mode)
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
        .map_err(FsError::at(path))
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: u32) -> Result<()> {
    Ok(())
}
