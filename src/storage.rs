//! File helpers shared by the grouping store and the bounds cache.

use serde::Serialize;
use std::path::Path;
use std::time::SystemTime;

/// Modification state of a backing file, used to detect external edits.
///
/// `None` from [`file_stamp`] means the file does not exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStamp {
    pub modified: Option<SystemTime>,
    pub len: u64,
}

/// Read the current stamp of `path`, or `None` if it is missing.
pub fn file_stamp(path: &Path) -> Option<FileStamp> {
    let metadata = std::fs::metadata(path).ok()?;
    Some(FileStamp {
        modified: metadata.modified().ok(),
        len: metadata.len(),
    })
}

/// Atomically write JSON data to a file.
///
/// Uses a temp file + rename pattern for crash safety:
/// 1. Write to temp file
/// 2. Sync temp file
/// 3. Rename temp to target (atomic on most filesystems)
/// 4. Sync parent directory
pub fn atomic_write_json<T: Serialize>(path: &Path, data: &T) -> std::io::Result<()> {
    use std::io::Write;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let temp_path = path.with_extension("json.tmp");

    let json = serde_json::to_string_pretty(data)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

    let mut file = std::fs::File::create(&temp_path)?;
    file.write_all(json.as_bytes())?;
    file.sync_all()?;
    drop(file);

    std::fs::rename(&temp_path, path)?;

    if let Some(parent) = path.parent() {
        if let Ok(dir) = std::fs::File::open(parent) {
            let _ = dir.sync_all();
        }
    }

    Ok(())
}
