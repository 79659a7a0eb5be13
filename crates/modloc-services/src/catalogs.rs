//! Catalog housekeeping: merging several catalogs, compiling the binary twin and extracting a
//! baseline table.

use std::path::{Path, PathBuf};

use color_eyre::eyre::{eyre, Result};
use modloc_core::fs::write_with_backup;
use modloc_core::ids::{is_missing, is_valid_id};
use modloc_core::{BaselineReference, Catalog};
use modloc_domain::{BaselineSummary, CompileSummary, MergeSummary, OutputFile};
use modloc_export_csv::write_baseline_csv;
use modloc_export_po::{write_mo, write_po};
use modloc_import_po::{mo_twin, read_catalog, read_po_catalog};
use modloc_parsers_xml::{scan_module_data, ExtractionRule};

use crate::util::{list_modules, resolve_module_data};

fn has_extension(p: &Path, ext: &str) -> bool {
    p.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(ext))
}

fn output_file(path: &Path, backup: Option<PathBuf>) -> OutputFile {
    OutputFile {
        path: path.display().to_string(),
        backup: backup.map(|b| b.display().to_string()),
    }
}

/// `merged-<timestamp>.po` in the working directory.
pub fn default_merge_output() -> PathBuf {
    let stamp = chrono::Local::now().format("%Y-%m-%dT%H-%M-%S");
    PathBuf::from(format!("merged-{stamp}.po"))
}

/// Catalogs directly in `dir`, sorted. With `read_mo`, compiled catalogs without a PO are
/// included too.
fn merge_inputs(dir: &Path, read_mo: bool, exclude: &Path) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file() && p != exclude)
        .collect();
    files.sort();
    let inputs = files
        .iter()
        .filter(|p| {
            has_extension(p, "po")
                || (read_mo && has_extension(p, "mo") && !p.with_extension("po").is_file())
        })
        .cloned()
        .collect();
    Ok(inputs)
}

/// Merge every catalog of `dir` into one. Earlier files (path order) win on conflicting
/// translations; entries without a translation are dropped unless `keep_blank`.
pub fn merge_catalogs(
    dir: &Path,
    output: Option<&Path>,
    keep_blank: bool,
    read_mo: bool,
    dry_run: bool,
) -> Result<MergeSummary> {
    if !dir.is_dir() {
        return Err(eyre!("not a directory: {}", dir.display()));
    }
    let output = output.map(Path::to_path_buf).unwrap_or_else(default_merge_output);
    let inputs = merge_inputs(dir, read_mo, &output)?;

    let mut builder = Catalog::builder();
    let mut skipped_blank = 0usize;
    let mut language = None;
    for path in &inputs {
        let read = if read_mo {
            read_catalog(path, false)?
        } else {
            read_po_catalog(path, false)?
        };
        language = language.or(read.language);
        for e in read.entries {
            if !keep_blank && e.translation().is_none() {
                skipped_blank += 1;
                continue;
            }
            builder.push(e);
        }
    }
    let catalog = builder.build();

    let lang = language.as_deref();
    let written = if dry_run {
        output_file(&output, None)
    } else if has_extension(&output, "mo") {
        output_file(&output, write_mo(&output, catalog.entries(), lang)?)
    } else {
        output_file(&output, write_po(&output, catalog.entries(), lang)?)
    };
    tracing::info!(
        event = "merge_done",
        inputs = inputs.len(),
        entries = catalog.len(),
        skipped_blank
    );
    Ok(MergeSummary {
        inputs: inputs.iter().map(|p| p.display().to_string()).collect(),
        entries: catalog.len(),
        skipped_blank,
        output: Some(written),
    })
}

/// Compile the binary twin of a PO catalog (next to it unless `output` is given).
pub fn compile_catalog(po: &Path, output: Option<&Path>, dry_run: bool) -> Result<CompileSummary> {
    let read = read_po_catalog(po, false)?;
    let target = output.map(Path::to_path_buf).unwrap_or_else(|| mo_twin(po));
    let compiled = read
        .entries
        .iter()
        .filter(|e| !e.needs_review && e.translation().is_some())
        .count();
    let written = if dry_run {
        output_file(&target, None)
    } else {
        output_file(
            &target,
            write_mo(&target, &read.entries, read.language.as_deref())?,
        )
    };
    tracing::info!(event = "compile_done", po = %po.display(), compiled);
    Ok(CompileSummary {
        input: po.display().to_string(),
        entries: read.entries.len(),
        compiled,
        output: Some(written),
    })
}

/// Where a baseline table is built from.
#[derive(Debug, Clone)]
pub enum BaselineSource {
    /// Ids and source texts of a catalog, optionally with legacy keys.
    Catalog { path: PathBuf, legacy: bool },
    /// Shipped ids of game modules (all of them when `modules` is empty).
    Modules {
        game_dir: PathBuf,
        modules: Vec<String>,
        rules: Vec<ExtractionRule>,
    },
}

fn usable(id: &str) -> bool {
    !is_missing(id) && is_valid_id(id)
}

/// Build a baseline table and write it as CSV to `output`.
pub fn extract_baseline(
    source: &BaselineSource,
    output: &Path,
    dry_run: bool,
) -> Result<BaselineSummary> {
    let mut summary = BaselineSummary::default();
    let mut pairs: Vec<(String, String)> = Vec::new();
    match source {
        BaselineSource::Catalog { path, legacy } => {
            let read = read_catalog(path, *legacy)?;
            summary.sources.push(read.source.display().to_string());
            pairs.extend(
                read.entries
                    .into_iter()
                    .filter(|e| usable(&e.id))
                    .map(|e| (e.id, e.text_source)),
            );
        }
        BaselineSource::Modules {
            game_dir,
            modules,
            rules,
        } => {
            let names = if modules.is_empty() {
                list_modules(game_dir)
            } else {
                modules.clone()
            };
            if names.is_empty() {
                return Err(eyre!("no modules found below {}", game_dir.join("Modules").display()));
            }
            for name in names {
                let module_data = resolve_module_data(&name, Some(game_dir.as_path()), None)?;
                let scan = scan_module_data(&module_data, rules)?;
                summary.skipped.extend(scan.report.skipped);
                pairs.extend(
                    scan.entries
                        .into_iter()
                        .filter(|e| usable(&e.id))
                        .map(|e| (e.id, e.text_source)),
                );
                summary.sources.push(name);
            }
        }
    }

    let baseline = BaselineReference::from_pairs(pairs);
    summary.ids = baseline.len();
    summary.pairs = baseline.pairs().count();
    let mut bytes = Vec::new();
    write_baseline_csv(&mut bytes, &baseline)?;
    summary.output = Some(if dry_run {
        output_file(output, None)
    } else {
        output_file(output, write_with_backup(output, &bytes)?)
    });
    tracing::info!(event = "baseline_done", ids = summary.ids, pairs = summary.pairs);
    Ok(summary)
}
