use std::collections::HashSet;
use std::path::{Path, PathBuf};

use modloc_core::fs::{backup_if_exists, write_with_backup, BACKUP_DIR};
use modloc_core::{ModlocError, Result};
use modloc_domain::OutputFile;
use modloc_parsers_xml::DocumentKind;
use walkdir::WalkDir;

/// A file computed in memory, written only once every phase has succeeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingWrite {
    pub path: PathBuf,
    pub bytes: Vec<u8>,
}

impl PendingWrite {
    pub fn new(path: impl Into<PathBuf>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            path: path.into(),
            bytes: bytes.into(),
        }
    }
}

/// Write every pending file, rotating existing destinations into backup first.
pub fn apply_writes(writes: &[PendingWrite]) -> Result<Vec<OutputFile>> {
    let mut out = Vec::with_capacity(writes.len());
    for w in writes {
        let backup = write_with_backup(&w.path, &w.bytes)?;
        tracing::debug!(event = "file_written", path = %w.path.display(), bytes = w.bytes.len());
        out.push(OutputFile {
            path: w.path.display().to_string(),
            backup: backup.map(|b| b.display().to_string()),
        });
    }
    Ok(out)
}

/// Paths a dry run would write, without touching the disk.
pub fn planned_outputs(writes: &[PendingWrite]) -> Vec<OutputFile> {
    writes
        .iter()
        .map(|w| OutputFile {
            path: w.path.display().to_string(),
            backup: None,
        })
        .collect()
}

fn in_backup_dir(path: &Path, root: &Path) -> bool {
    path.strip_prefix(root)
        .map(|rel| rel.components().any(|c| c.as_os_str() == BACKUP_DIR))
        .unwrap_or(false)
}

/// Content documents below `out_module_data` that this run does not regenerate.
pub fn stale_outputs(out_module_data: &Path, keep: &HashSet<PathBuf>) -> Vec<PathBuf> {
    if !out_module_data.is_dir() {
        return Vec::new();
    }
    WalkDir::new(out_module_data)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| !in_backup_dir(p, out_module_data))
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .and_then(DocumentKind::from_extension)
                .is_some()
        })
        .filter(|p| !keep.contains(p))
        .collect()
}

/// Move stale generated files into backup.
pub fn rotate_stale(paths: &[PathBuf]) -> Result<Vec<OutputFile>> {
    let mut out = Vec::new();
    for p in paths {
        if let Some(bak) = backup_if_exists(p)? {
            tracing::info!(event = "stale_removed", path = %p.display());
            out.push(OutputFile {
                path: p.display().to_string(),
                backup: Some(bak.display().to_string()),
            });
        }
    }
    Ok(out)
}

/// `<game_dir>/Modules/<module>/ModuleData`, then `<mods_dir>/*/<module>/ModuleData`.
pub fn resolve_module_data(
    module: &str,
    game_dir: Option<&Path>,
    mods_dir: Option<&Path>,
) -> Result<PathBuf> {
    let mut searched = Vec::new();
    if let Some(game) = game_dir {
        let p = game.join("Modules").join(module).join("ModuleData");
        if p.is_dir() {
            return Ok(p);
        }
        searched.push(p);
    }
    if let Some(mods) = mods_dir {
        let mut subdirs: Vec<PathBuf> = std::fs::read_dir(mods)
            .map(|rd| {
                rd.filter_map(|e| e.ok())
                    .map(|e| e.path())
                    .filter(|p| p.is_dir())
                    .collect()
            })
            .unwrap_or_default();
        subdirs.sort();
        if let Some(found) = subdirs
            .iter()
            .map(|d| d.join(module).join("ModuleData"))
            .find(|p| p.is_dir())
        {
            tracing::debug!(event = "module_found_in_mods_dir", path = %found.display());
            return Ok(found);
        }
        searched.push(mods.join("*").join(module).join("ModuleData"));
    }
    Err(ModlocError::ModuleNotFound {
        module: module.to_string(),
        searched,
    }
    .into())
}

/// Module folders below `<game_dir>/Modules`, sorted.
pub fn list_modules(game_dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(game_dir.join("Modules"))
        .map(|rd| {
            rd.filter_map(|e| e.ok())
                .filter(|e| e.path().join("ModuleData").is_dir())
                .filter_map(|e| e.file_name().to_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}
