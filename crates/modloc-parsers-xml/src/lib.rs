use std::path::Path;

use modloc_core::fs::slash_path;
use modloc_core::{Entry, ModlocError, Result};
use modloc_domain::{ScanReport, SkippedFile};
use roxmltree::{Document, ParsingOptions};
use walkdir::WalkDir;

pub mod content;
pub mod decode;
pub mod language;
mod rules;

pub use content::{
    normalize_attribute_whitespace, normalize_line_endings, template_target, xslt_rule_for,
    DocumentKind, TemplateTarget, XSL_NAMESPACE,
};
pub use decode::{decode_document, Decoded};
pub use language::{
    list_xml, parse_manifest, parse_strings, read_language_stream, read_manifests, LanguageRecord,
    LanguageStream, LANGUAGES_DIR, LANGUAGE_CONTEXT, MANIFEST_FILE_NAME,
};
pub use rules::{default_rules, ExtractionRule};

/// Rule claiming `(element, attribute)` in a plain XML document.
pub fn rule_for<'a>(
    rules: &'a [ExtractionRule],
    element: &str,
    attribute: &str,
) -> Option<&'a ExtractionRule> {
    rules::rule_for(rules, element, attribute)
}

#[derive(Debug, Clone, Default)]
pub struct ScanOutput {
    pub entries: Vec<Entry>,
    pub report: ScanReport,
}

/// Read and decode one document.
pub fn load_text(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path)?;
    Ok(decode_document(path, &bytes)?.text)
}

pub fn parse_document(text: &str) -> std::result::Result<Document<'_>, roxmltree::Error> {
    let opts = ParsingOptions {
        allow_dtd: true,
        ..ParsingOptions::default()
    };
    Document::parse_with_options(text, opts)
}

pub(crate) fn skipped(rel: &str, reason: &dyn std::fmt::Display) -> SkippedFile {
    SkippedFile {
        path: rel.to_string(),
        reason: reason.to_string(),
    }
}

/// Content documents below `module_data`, `Languages/` excluded, in path order.
pub fn content_documents(module_data: &Path) -> Vec<(std::path::PathBuf, DocumentKind)> {
    WalkDir::new(module_data)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| {
            let p = e.into_path();
            let rel = p.strip_prefix(module_data).ok()?;
            let top = rel.components().next()?.as_os_str().to_str()?;
            if rel.components().count() > 1 && top.eq_ignore_ascii_case(LANGUAGES_DIR) {
                return None;
            }
            let kind = DocumentKind::from_extension(p.extension()?.to_str()?)?;
            Some((p, kind))
        })
        .collect()
}

/// Extract every candidate from a module's `ModuleData` tree.
///
/// Content documents come first (path order), then source-language string files. Undecodable or
/// malformed documents are skipped with a warning and listed in the report.
pub fn scan_module_data(module_data: &Path, rules: &[ExtractionRule]) -> Result<ScanOutput> {
    if !module_data.is_dir() {
        return Err(ModlocError::MalformedDocument {
            path: module_data.to_path_buf(),
            reason: "not a directory".into(),
        }
        .into());
    }
    let mut out = ScanOutput::default();
    for (path, kind) in content_documents(module_data) {
        let rel = path
            .strip_prefix(module_data)
            .map(slash_path)
            .unwrap_or_else(|_| path.display().to_string());
        let text = match load_text(&path) {
            Ok(t) => t,
            Err(e) => {
                tracing::warn!(event = "document_skipped", path = %rel, error = %e);
                out.report.skipped.push(skipped(&rel, &e));
                continue;
            }
        };
        let doc = match parse_document(&text) {
            Ok(d) => d,
            Err(e) => {
                tracing::warn!(event = "malformed_document", path = %rel, error = %e);
                out.report.skipped.push(skipped(&rel, &e));
                continue;
            }
        };
        let found = content::extract(&doc, kind, &rel, rules);
        tracing::debug!(event = "document_scanned", path = %rel, entries = found.len());
        out.entries.extend(found);
        out.report.files_scanned += 1;
    }

    out.report.files_scanned +=
        language::read_source_strings(module_data, &mut out.entries, &mut out.report.skipped);
    out.report.entries = out.entries.len();
    tracing::info!(
        event = "scan_done",
        files = out.report.files_scanned,
        entries = out.report.entries,
        skipped = out.report.skipped.len()
    );
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn scan_walks_content_and_skips_broken_files() -> Result<()> {
        let dir = tempdir()?;
        let md = dir.path();
        fs::create_dir_all(md.join("sub"))?;
        fs::create_dir_all(md.join("Languages/JP"))?;
        fs::write(
            md.join("items.xml"),
            r#"<Items><Item id="a" name="{=item_a}Axe"/><Item id="b" name="Bow"/></Items>"#,
        )?;
        fs::write(md.join("sub/broken.xml"), "<Items><Item name=\"x\">")?;
        fs::write(
            md.join("Languages/JP/std.xml"),
            r#"<base><strings><string id="x" text="訳"/></strings></base>"#,
        )?;
        fs::write(
            md.join("Languages/std_module.xml"),
            r#"<base><strings><string id="mod_str" text="Hello"/></strings></base>"#,
        )?;

        let out = scan_module_data(md, &default_rules())?;
        assert_eq!(out.report.files_scanned, 2);
        assert_eq!(out.report.skipped.len(), 1);
        assert_eq!(out.report.skipped[0].path, "sub/broken.xml");
        let texts: Vec<_> = out.entries.iter().map(|e| e.text_source.as_str()).collect();
        assert_eq!(texts, vec!["Axe", "Bow", "Hello"]);
        assert_eq!(out.entries[0].file, "items.xml");
        Ok(())
    }

    #[test]
    fn scan_is_deterministic() -> Result<()> {
        let dir = tempdir()?;
        let md = dir.path();
        for n in ["c.xml", "a.xml", "b.xml"] {
            fs::write(md.join(n), format!(r#"<R><E name="{n}"/></R>"#))?;
        }
        let a = scan_module_data(md, &default_rules())?;
        let b = scan_module_data(md, &default_rules())?;
        assert_eq!(a.entries, b.entries);
        assert_eq!(a.entries[0].text_source, "a.xml");
        Ok(())
    }

    #[test]
    fn missing_module_data_is_an_error() {
        let dir = tempdir().unwrap();
        assert!(scan_module_data(&dir.path().join("nope"), &default_rules()).is_err());
    }
}
