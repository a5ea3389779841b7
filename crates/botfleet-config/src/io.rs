//! Atomic artifact writes

use crate::error::{MergeError, Result};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Read a file, mapping "not found" to `None`.
pub fn read_optional(path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(MergeError::io(path, e)),
    }
}

/// Write `contents` through `<path>.tmp` + rename, optionally chmod-ing the
/// temp file first so the target never exists with wider permissions.
pub fn write_atomic(path: &Path, contents: &str, mode: Option<u32>) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| MergeError::io(parent, e))?;
        }
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    fs::write(&tmp, contents).map_err(|e| MergeError::io(&tmp, e))?;
    if let Some(mode) = mode {
        set_mode(&tmp, mode).map_err(|e| MergeError::io(&tmp, e))?;
    }
    fs::rename(&tmp, path).map_err(|e| MergeError::io(path, e))
}

/// Write only when the content differs from `previous`. Returns whether a
/// write happened.
pub fn write_if_changed(
    path: &Path,
    previous: Option<&str>,
    contents: &str,
    mode: Option<u32>,
) -> Result<bool> {
    if previous == Some(contents) {
        return Ok(false);
    }
    write_atomic(path, contents, mode)?;
    Ok(true)
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: u32) -> std::io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_if_changed_skips_identical() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");

        assert!(write_if_changed(&path, None, "A=1\n", Some(0o600)).unwrap());
        let current = read_optional(&path).unwrap();
        assert_eq!(current.as_deref(), Some("A=1\n"));
        assert!(!write_if_changed(&path, current.as_deref(), "A=1\n", Some(0o600)).unwrap());
    }

    #[cfg(unix)]
    #[test]
    fn test_mode_applied() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(".env");
        write_atomic(&path, "A=1\n", Some(0o600)).unwrap();
        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_read_missing_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_optional(&dir.path().join("missing")).unwrap().is_none());
    }
}
