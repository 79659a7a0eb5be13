//! Destination handling shared by every writer: an existing file is moved into a sibling
//! `BAK/` folder under a timestamped name before new content is written atomically.

use std::io::Write;
use std::path::{Path, PathBuf};

use crate::Result;

pub const BACKUP_DIR: &str = "BAK";

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    }
}

/// Move `path` to `BAK/<stem>-<timestamp>[-n].<ext>` next to it. Returns the backup path, or
/// `None` when there was nothing to move.
pub fn backup_if_exists(path: &Path) -> Result<Option<PathBuf>> {
    if !path.exists() {
        return Ok(None);
    }
    let parent = parent_dir(path);
    let bak_dir = parent.join(BACKUP_DIR);
    std::fs::create_dir_all(&bak_dir)?;

    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    let stamp = chrono::Local::now().format("%Y-%m-%dT%H-%M-%S").to_string();

    let mut candidate = bak_dir.join(format!("{stem}-{stamp}{ext}"));
    let mut n = 1usize;
    while candidate.exists() {
        candidate = bak_dir.join(format!("{stem}-{stamp}-{n}{ext}"));
        n += 1;
    }
    std::fs::rename(path, &candidate)?;
    tracing::info!(event = "backup", from = %path.display(), to = %candidate.display());
    Ok(Some(candidate))
}

/// Write through a temp file in the destination directory and rename it into place.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let parent = parent_dir(path);
    std::fs::create_dir_all(parent)?;
    let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
    tmp.write_all(bytes)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Rotate any existing file at `path` into backup, then write `bytes` there.
pub fn write_with_backup(path: &Path, bytes: &[u8]) -> Result<Option<PathBuf>> {
    let backup = backup_if_exists(path)?;
    write_atomic(path, bytes)?;
    Ok(backup)
}

/// Relative path rendered with forward slashes.
pub fn slash_path(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
