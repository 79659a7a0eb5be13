//! Translated strings as per-language files plus the `language_data.xml` listing them.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use color_eyre::eyre::Result;
use modloc_core::{Entry, ManifestFile};
use modloc_domain::{ManifestFileStat, ManifestReport};
use modloc_import_po::{render_language_file, render_manifest};
use modloc_parsers_xml::MANIFEST_FILE_NAME;

use crate::settings::LanguageSettings;
use crate::util::PendingWrite;

/// Files and manifest for one language, ready to be written.
#[derive(Debug, Clone, Default)]
pub struct LanguagePlan {
    pub writes: Vec<PendingWrite>,
    pub report: ManifestReport,
    /// Entries left out for having no translation.
    pub skipped_blank: usize,
}

/// `sub/items.xml` -> `sub_items`
fn flattened_stem(file: &str) -> String {
    let trimmed = file
        .rsplit_once('.')
        .map(|(stem, _)| stem)
        .unwrap_or(file);
    trimmed
        .chars()
        .map(|c| if c == '/' || c == '\\' { '_' } else { c })
        .collect()
}

fn file_name_for(entry: &Entry, code: &str, split_files: bool) -> String {
    if split_files && !entry.file.is_empty() {
        format!("{}-{code}.xml", flattened_stem(&entry.file))
    } else {
        format!("strings-{code}.xml")
    }
}

/// Group `entries` into language files below `<languages_dir>/<code>/`.
///
/// An id is written once (first entry in catalog order). Blank translations are written as
/// empty strings only with `output_blank`.
pub fn plan_language_files(
    entries: &[Entry],
    language: &LanguageSettings,
    module: &str,
    split_files: bool,
    output_blank: bool,
    languages_dir: &Path,
) -> Result<LanguagePlan> {
    let code = language.code.as_str();
    let mut grouped: BTreeMap<String, Vec<(String, String)>> = BTreeMap::new();
    let mut seen: HashSet<&str> = HashSet::new();
    let mut skipped_blank = 0usize;

    for e in entries {
        let text = match e.translation() {
            Some(t) => t.to_string(),
            None if output_blank => String::new(),
            None => {
                skipped_blank += 1;
                continue;
            }
        };
        if !seen.insert(e.id.as_str()) {
            tracing::debug!(event = "language_id_repeated", id = %e.id);
            continue;
        }
        grouped
            .entry(file_name_for(e, code, split_files))
            .or_default()
            .push((e.id.clone(), text));
    }

    let lang_dir = languages_dir.join(code);
    let mut writes = Vec::with_capacity(grouped.len() + 1);
    let mut manifest = ManifestFile {
        language_id: language.id.clone(),
        base: language.base_for(module),
        files: Vec::with_capacity(grouped.len()),
    };
    let mut stats = Vec::with_capacity(grouped.len());
    for (name, strings) in &grouped {
        let xml_path = format!("{code}/{name}");
        writes.push(PendingWrite::new(
            lang_dir.join(name),
            render_language_file(&language.id, strings)?,
        ));
        stats.push(ManifestFileStat {
            path: xml_path.clone(),
            strings: strings.len(),
        });
        manifest.files.push(xml_path);
    }

    let manifest_path = lang_dir.join(MANIFEST_FILE_NAME);
    writes.push(PendingWrite::new(&manifest_path, render_manifest(&manifest)?));
    tracing::info!(
        event = "language_files_planned",
        language = %language.id,
        files = stats.len(),
        skipped_blank
    );

    Ok(LanguagePlan {
        writes,
        report: ManifestReport {
            language_id: language.id.clone(),
            manifest: manifest_path.display().to_string(),
            files: stats,
        },
        skipped_blank,
    })
}
