//! File reading and atomic writes.

use std::fs;
use std::io;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::debug;

use crate::error::{HoistError, HoistResult};

/// Read a UTF-8 text file.
///
/// A missing file becomes [`HoistError::FileNotFound`]; other failures are
/// reported as I/O errors.
pub fn read_text(path: &Path) -> HoistResult<String> {
    fs::read_to_string(path).map_err(|source| {
        if source.kind() == io::ErrorKind::NotFound {
            HoistError::file_not_found(path.display().to_string())
        } else {
            HoistError::Io {
                path: path.display().to_string(),
                source,
            }
        }
    })
}

/// Write `content` to `path` via a sibling temp file and a rename.
///
/// Readers see either the old file or the new one, never a partial write.
pub fn atomic_write(path: &Path, content: &str) -> HoistResult<()> {
    write_then_rename(path, content.as_bytes()).map_err(|source| HoistError::Io {
        path: path.display().to_string(),
        source,
    })?;
    debug!(path = %path.display(), bytes = content.len(), "wrote file");
    Ok(())
}

fn write_then_rename(path: &Path, content: &[u8]) -> io::Result<()> {
    let pid = std::process::id();
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);

    let temp_path = path.with_file_name(format!(
        ".{}.{}.{}.tmp",
        path.file_name().unwrap_or_default().to_string_lossy(),
        pid,
        timestamp
    ));
    if let Err(err) = fs::write(&temp_path, content) {
        let _ = fs::remove_file(&temp_path);
        return Err(err);
    }
    fs::rename(&temp_path, path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_missing_file_is_file_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_text(&dir.path().join("absent.ts")).unwrap_err();
        assert!(matches!(err, HoistError::FileNotFound { .. }));
        assert_eq!(err.error_code().code(), 3);
    }

    #[test]
    fn atomic_write_replaces_content_and_leaves_no_temp() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.ts");
        fs::write(&path, "old").unwrap();

        atomic_write(&path, "new").unwrap();

        assert_eq!(read_text(&path).unwrap(), "new");
        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn atomic_write_into_missing_dir_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = atomic_write(&dir.path().join("nope/out.ts"), "x").unwrap_err();
        assert!(matches!(err, HoistError::Io { .. }));
        assert_eq!(err.error_code().code(), 10);
    }
}
