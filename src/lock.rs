//! Daemon marker file with flock-style advisory locking.
//!
//! The persistence daemon holds an exclusive lock on its marker file for its
//! whole lifetime. The lock is what makes the marker authoritative: a marker
//! nobody holds a lock on is stale, whatever pid it names.

use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Seek, SeekFrom, Write};
use std::os::unix::fs::{MetadataExt, PermissionsExt};
use std::path::{Path, PathBuf};

use crate::daemon::DaemonState;
use crate::error::AwdlError;

/// Readable by `awdl status` without root, writable only by the daemon.
const MARKER_MODE: u32 = 0o644;

const MAX_ACQUIRE_ATTEMPTS: usize = 5;

/// A guard that holds an exclusive lock on a daemon marker file.
///
/// Dropping the guard removes the marker and releases the lock.
#[derive(Debug)]
pub struct MarkerLock {
    file: File,
    path: PathBuf,
}

impl MarkerLock {
    /// Attempt to acquire the exclusive lock on `path`.
    ///
    /// Returns [`AwdlError::DaemonAlreadyRunning`] if another process holds it.
    pub fn acquire(path: &Path) -> Result<Self, AwdlError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| AwdlError::io(parent, e))?;
        }

        for _ in 0..MAX_ACQUIRE_ATTEMPTS {
            // Open without truncating: the current holder's content must
            // survive a failed acquisition attempt.
            let file = OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .truncate(false)
                .open(path)
                .map_err(|e| AwdlError::io(path, e))?;

            if let Err(e) = file.try_lock_exclusive() {
                return Err(if is_contended(&e) {
                    AwdlError::DaemonAlreadyRunning {
                        path: path.to_path_buf(),
                    }
                } else {
                    AwdlError::io(path, e)
                });
            }

            // The previous holder may have unlinked the marker between our
            // open and our lock. Only a lock on the inode still at `path`
            // counts; otherwise start over with a fresh file.
            if !same_file(&file, path)? {
                continue;
            }

            fs::set_permissions(path, fs::Permissions::from_mode(MARKER_MODE))
                .map_err(|e| AwdlError::io(path, e))?;

            return Ok(Self {
                file,
                path: path.to_path_buf(),
            });
        }

        Err(AwdlError::io(
            path,
            std::io::Error::other("marker kept being replaced while locking"),
        ))
    }

    /// Replace the marker content with `state`.
    pub fn write_state(&mut self, state: &DaemonState) -> Result<(), AwdlError> {
        let content = serde_json::to_string_pretty(state)
            .map_err(|e| AwdlError::io(&self.path, e.into()))?;

        let rewrite = |file: &mut File| -> std::io::Result<()> {
            file.set_len(0)?;
            file.seek(SeekFrom::Start(0))?;
            file.write_all(content.as_bytes())?;
            file.sync_all()
        };
        rewrite(&mut self.file).map_err(|e| AwdlError::io(&self.path, e))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for MarkerLock {
    fn drop(&mut self) {
        // Remove while still locked so no reader sees an unlocked marker
        // that still names this process.
        if let Err(e) = fs::remove_file(&self.path) {
            if e.kind() != ErrorKind::NotFound {
                tracing::warn!("Failed to remove marker {:?}: {}", self.path, e);
            }
        }
        let _ = FileExt::unlock(&self.file);
    }
}

fn same_file(file: &File, path: &Path) -> Result<bool, AwdlError> {
    let opened = file.metadata().map_err(|e| AwdlError::io(path, e))?;
    match fs::metadata(path) {
        Ok(current) => Ok(opened.dev() == current.dev() && opened.ino() == current.ino()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(AwdlError::io(path, e)),
    }
}

/// Check whether some process currently holds the lock on `path`.
///
/// A missing marker is not held. The probe takes a shared lock, so it works
/// on a read-only descriptor and never blocks.
pub fn is_held(path: &Path) -> Result<bool, AwdlError> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(AwdlError::io(path, e)),
    };

    match FileExt::try_lock_shared(&file) {
        Ok(()) => {
            let _ = FileExt::unlock(&file);
            Ok(false)
        }
        Err(e) if is_contended(&e) => Ok(true),
        Err(e) => Err(AwdlError::io(path, e)),
    }
}

/// Whether a failed try-lock means another holder, as opposed to a
/// locking failure such as ENOLCK.
fn is_contended(err: &std::io::Error) -> bool {
    err.kind() == ErrorKind::WouldBlock
        || err.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}
