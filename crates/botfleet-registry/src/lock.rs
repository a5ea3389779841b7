//! Advisory lock on the registry's sibling `.lock` file

use crate::error::{RegistryError, Result};
use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

const LOCK_POLL: Duration = Duration::from_millis(50);
const LOCK_TIMEOUT: Duration = Duration::from_secs(10);

/// Held exclusive lock; released when dropped (the fd closes with the file).
#[derive(Debug)]
pub struct RegistryLock {
    _file: File,
    path: PathBuf,
}

impl RegistryLock {
    /// Acquire the lock, polling until `LOCK_TIMEOUT` elapses.
    pub fn acquire(path: &Path) -> Result<Self> {
        let file = open_lock_file(path).map_err(|e| RegistryError::io(path, e))?;
        let deadline = Instant::now() + LOCK_TIMEOUT;

        loop {
            if try_flock_exclusive(&file).map_err(|e| RegistryError::io(path, e))? {
                tracing::trace!(path = %path.display(), "Acquired registry lock");
                return Ok(Self {
                    _file: file,
                    path: path.to_path_buf(),
                });
            }
            if Instant::now() >= deadline {
                return Err(RegistryError::LockTimeout(path.to_path_buf()));
            }
            thread::sleep(LOCK_POLL);
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn open_lock_file(path: &Path) -> io::Result<File> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)
}

/// Non-blocking exclusive flock. `Ok(false)` means another holder has it.
fn try_flock_exclusive(file: &File) -> io::Result<bool> {
    #[cfg(unix)]
    {
        use std::os::unix::io::AsRawFd;
        let fd = file.as_raw_fd();
        // SAFETY: fd is a valid descriptor owned by `file` for the whole call.
        #[allow(unsafe_code)]
        let result = unsafe { libc::flock(fd, libc::LOCK_EX | libc::LOCK_NB) };
        if result == 0 {
            return Ok(true);
        }
        let err = io::Error::last_os_error();
        if err.kind() == io::ErrorKind::WouldBlock || err.raw_os_error() == Some(libc::EWOULDBLOCK)
        {
            return Ok(false);
        }
        Err(err)
    }
    #[cfg(not(unix))]
    {
        let _ = file;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_is_reacquirable_after_drop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("botfleet.json.lock");

        let first = RegistryLock::acquire(&path).unwrap();
        assert_eq!(first.path(), path.as_path());
        drop(first);

        let second = RegistryLock::acquire(&path);
        assert!(second.is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn test_second_handle_is_blocked_while_held() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("botfleet.json.lock");

        let _held = RegistryLock::acquire(&path).unwrap();
        // flock is per open file description, so a fresh open contends.
        let other = open_lock_file(&path).unwrap();
        assert!(!try_flock_exclusive(&other).unwrap());
    }
}
