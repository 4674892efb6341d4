//! Write-then-rename file output.
//!
//! Readers never observe a half-written file: content goes to a sibling
//! `.partial` file which is renamed over the destination only after every
//! byte has been flushed.

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::IoError;

/// Suffix of in-progress files.
pub const PARTIAL_SUFFIX: &str = ".partial";

/// Sibling path used while `path` is being written.
pub fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(PARTIAL_SUFFIX);
    path.with_file_name(name)
}

/// Writes `path` through `write`, renaming into place on success.
///
/// On failure the partial file is removed and the destination is untouched.
pub fn write_atomic<F>(path: &Path, write: F) -> Result<(), IoError>
where
    F: FnOnce(&mut BufWriter<File>, &Path) -> Result<(), IoError>,
{
    let tmp = partial_path(path);
    let result = (|| {
        let file = File::create(&tmp).map_err(|e| IoError::io(&tmp, e))?;
        let mut writer = BufWriter::new(file);
        write(&mut writer, path)?;
        writer.flush().map_err(|e| IoError::io(&tmp, e))?;
        let file = writer
            .into_inner()
            .map_err(|e| IoError::io(&tmp, e.into_error()))?;
        file.sync_all().map_err(|e| IoError::io(&tmp, e))?;
        fs::rename(&tmp, path).map_err(|e| IoError::io(path, e))
    })();

    if result.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_partial_path() {
        assert_eq!(
            partial_path(Path::new("/tmp/a/frame_000001.png")),
            PathBuf::from("/tmp/a/frame_000001.png.partial")
        );
    }

    #[test]
    fn test_write_atomic_success() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.txt");
        write_atomic(&path, |w, _| {
            w.write_all(b"hello").map_err(|e| IoError::io(&path, e))
        })
        .unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "hello");
        assert!(!partial_path(&path).exists());
    }

    #[test]
    fn test_write_atomic_failure_leaves_nothing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.txt");
        let result = write_atomic(&path, |w, p| {
            w.write_all(b"half").map_err(|e| IoError::io(p, e))?;
            Err(IoError::layout(p, "simulated failure"))
        });

        assert!(result.is_err());
        assert!(!path.exists());
        assert!(!partial_path(&path).exists());
    }

    #[test]
    fn test_write_atomic_replaces_existing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.txt");
        fs::write(&path, "old").unwrap();
        write_atomic(&path, |w, p| w.write_all(b"new").map_err(|e| IoError::io(p, e))).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "new");
    }
}
