//! Per-language string files and their `language_data.xml` manifests.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use modloc_core::fs::slash_path;
use modloc_core::{BaseLanguageInfo, Entry, ManifestFile};
use modloc_domain::SkippedFile;
use roxmltree::Document;
use walkdir::WalkDir;

use crate::{load_text, parse_document, skipped};

pub const LANGUAGES_DIR: &str = "Languages";
pub const MANIFEST_FILE_NAME: &str = "language_data.xml";
/// Context of strings taken from source-language files.
pub const LANGUAGE_CONTEXT: &str = "language.text";

/// Folders below `Languages/` that hold source-language strings, besides the folder itself.
const SOURCE_LANGUAGE_DIRS: [&str; 2] = ["English", "EN"];

/// A `<string id text/>` record of a language file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageRecord {
    pub id: String,
    pub text: String,
    /// Relative to `Languages/`, forward slashes.
    pub file: String,
}

#[derive(Debug, Clone, Default)]
pub struct LanguageStream {
    pub records: Vec<LanguageRecord>,
    /// Records dropped because an earlier file already defined their id.
    pub duplicates: usize,
    pub files: Vec<String>,
    pub skipped: Vec<SkippedFile>,
}

impl LanguageStream {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

pub fn is_manifest(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.eq_ignore_ascii_case(MANIFEST_FILE_NAME))
}

/// `(id, text)` pairs of every `<string>` below `<strings>`.
pub fn parse_strings(doc: &Document) -> Vec<(String, String)> {
    doc.descendants()
        .filter(|n| n.is_element() && n.tag_name().name() == "strings")
        .flat_map(|strings| strings.children().filter(|c| c.is_element()))
        .filter(|s| s.tag_name().name() == "string")
        .filter_map(|s| {
            let id = s.attribute("id")?;
            Some((id.to_string(), s.attribute("text").unwrap_or("").to_string()))
        })
        .collect()
}

/// Read a `language_data.xml` document.
pub fn parse_manifest(doc: &Document) -> Option<ManifestFile> {
    let root = doc.root_element();
    if root.tag_name().name() != "LanguageData" {
        return None;
    }
    let base = root.attribute("name").map(|name| BaseLanguageInfo {
        name: name.to_string(),
        subtitle_extension: root.attribute("subtitle_extension").map(str::to_string),
        supported_iso: root
            .attribute("supported_iso")
            .map(|s| {
                s.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default(),
    });
    let files = root
        .children()
        .filter(|c| c.is_element() && c.tag_name().name() == "LanguageFile")
        .filter_map(|c| c.attribute("xml_path"))
        .map(|p| p.replace('\\', "/"))
        .collect();
    Some(ManifestFile {
        language_id: root.attribute("id").unwrap_or("").to_string(),
        base,
        files,
    })
}

/// All manifests found below `Languages/`, in path order.
pub fn read_manifests(module_data: &Path) -> Vec<(PathBuf, ManifestFile)> {
    let langs = module_data.join(LANGUAGES_DIR);
    let mut out = Vec::new();
    for entry in WalkDir::new(&langs)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let p = entry.path();
        if !p.is_file() || !is_manifest(p) {
            continue;
        }
        let parsed = load_text(p).ok().and_then(|text| {
            parse_document(&text)
                .ok()
                .and_then(|doc| parse_manifest(&doc))
        });
        match parsed {
            Some(m) => out.push((p.to_path_buf(), m)),
            None => tracing::warn!(event = "manifest_unreadable", path = %p.display()),
        }
    }
    out
}

/// Translated strings already shipped for `language_id`.
///
/// Files come from every manifest declaring that id; without one, all files of
/// `Languages/<language_code>/` are read. The first definition of an id wins.
pub fn read_language_stream(
    module_data: &Path,
    language_id: &str,
    language_code: &str,
) -> LanguageStream {
    let langs = module_data.join(LANGUAGES_DIR);
    let mut stream = LanguageStream::default();
    if !langs.is_dir() {
        return stream;
    }

    let mut files: Vec<String> = Vec::new();
    for (path, manifest) in read_manifests(module_data) {
        if manifest.language_id != language_id {
            continue;
        }
        tracing::debug!(event = "language_manifest", path = %path.display(), files = manifest.files.len());
        for f in manifest.files {
            if !files.contains(&f) {
                files.push(f);
            }
        }
    }
    if files.is_empty() {
        files = list_xml(&langs.join(language_code), false)
            .into_iter()
            .filter_map(|p| p.strip_prefix(&langs).ok().map(slash_path))
            .collect();
    }

    let mut seen: HashSet<String> = HashSet::new();
    for rel in files {
        let path = langs.join(&rel);
        if !path.is_file() {
            tracing::warn!(event = "language_file_missing", path = %path.display());
            stream.skipped.push(SkippedFile {
                path: rel,
                reason: "listed in manifest but missing".into(),
            });
            continue;
        }
        let text = match load_text(&path) {
            Ok(t) => t,
            Err(e) => {
                stream.skipped.push(skipped(&rel, &e));
                continue;
            }
        };
        let doc = match parse_document(&text) {
            Ok(d) => d,
            Err(e) => {
                tracing::warn!(event = "malformed_document", path = %path.display(), error = %e);
                stream.skipped.push(skipped(&rel, &e));
                continue;
            }
        };
        for (id, text) in parse_strings(&doc) {
            if !seen.insert(id.clone()) {
                stream.duplicates += 1;
                continue;
            }
            stream.records.push(LanguageRecord {
                id,
                text,
                file: rel.clone(),
            });
        }
        stream.files.push(rel);
    }
    if stream.duplicates > 0 {
        tracing::warn!(event = "language_duplicates", count = stream.duplicates);
    }
    stream
}

/// Source-language strings as extraction candidates; ids come from the `id` attribute.
pub(crate) fn read_source_strings(
    module_data: &Path,
    entries: &mut Vec<Entry>,
    skipped_files: &mut Vec<SkippedFile>,
) -> usize {
    let langs = module_data.join(LANGUAGES_DIR);
    if !langs.is_dir() {
        return 0;
    }
    let mut paths = list_xml(&langs, false);
    for sub in source_language_dirs(&langs) {
        paths.extend(list_xml(&sub, false));
    }

    let mut scanned = 0usize;
    for path in paths {
        let rel = path
            .strip_prefix(module_data)
            .map(slash_path)
            .unwrap_or_else(|_| path.display().to_string());
        let text = match load_text(&path) {
            Ok(t) => t,
            Err(e) => {
                skipped_files.push(skipped(&rel, &e));
                continue;
            }
        };
        let doc = match parse_document(&text) {
            Ok(d) => d,
            Err(e) => {
                tracing::warn!(event = "malformed_document", path = %path.display(), error = %e);
                skipped_files.push(skipped(&rel, &e));
                continue;
            }
        };
        scanned += 1;
        for (id, text) in parse_strings(&doc) {
            let mut e = Entry::candidate(&text, LANGUAGE_CONTEXT, "text", rel.clone());
            if e.text_source.is_empty() {
                continue;
            }
            if e.id.is_empty() {
                e.id = id.clone();
            }
            e.object_id = Some(id);
            entries.push(e);
        }
    }
    scanned
}

fn source_language_dirs(langs: &Path) -> Vec<PathBuf> {
    let Ok(rd) = std::fs::read_dir(langs) else {
        return Vec::new();
    };
    let mut dirs: Vec<PathBuf> = rd
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| SOURCE_LANGUAGE_DIRS.iter().any(|d| d.eq_ignore_ascii_case(n)))
        })
        .collect();
    dirs.sort();
    dirs
}

/// `*.xml` files directly in `dir` (or below it when `recursive`), manifests excluded, sorted.
pub fn list_xml(dir: &Path, recursive: bool) -> Vec<PathBuf> {
    let depth = if recursive { usize::MAX } else { 1 };
    let mut out: Vec<PathBuf> = WalkDir::new(dir)
        .max_depth(depth)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .map(|e| e.into_path())
        .filter(|p| p.is_file() && !is_manifest(p))
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("xml"))
        })
        .collect();
    out.sort();
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn write(root: &Path, rel: &str, body: &str) {
        let p = root.join(rel);
        fs::create_dir_all(p.parent().unwrap()).unwrap();
        fs::write(p, body).unwrap();
    }

    fn strings(pairs: &[(&str, &str)]) -> String {
        let mut s = String::from("<base><strings>");
        for (id, text) in pairs {
            s.push_str(&format!("<string id=\"{id}\" text=\"{text}\" />"));
        }
        s.push_str("</strings></base>");
        s
    }

    #[test]
    fn manifest_lists_files_and_base_info() {
        let doc = Document::parse(
            r#"<LanguageData id="日本語" name="日本語" subtitle_extension="jp" supported_iso="ja,jpn">
                 <LanguageFile xml_path="JP\std_a.xml" />
                 <LanguageFile xml_path="JP/std_b.xml" />
               </LanguageData>"#,
        )
        .unwrap();
        let m = parse_manifest(&doc).unwrap();
        assert_eq!(m.language_id, "日本語");
        assert_eq!(m.files, vec!["JP/std_a.xml", "JP/std_b.xml"]);
        let base = m.base.unwrap();
        assert_eq!(base.supported_iso, vec!["ja", "jpn"]);
        assert_eq!(base.subtitle_extension.as_deref(), Some("jp"));
    }

    #[test]
    fn stream_follows_matching_manifest_and_keeps_first_id() {
        let dir = tempdir().unwrap();
        let md = dir.path();
        write(
            md,
            "Languages/JP/language_data.xml",
            r#"<LanguageData id="日本語"><LanguageFile xml_path="JP/b.xml"/><LanguageFile xml_path="JP/a.xml"/></LanguageData>"#,
        );
        write(md, "Languages/JP/a.xml", &strings(&[("x", "A"), ("y", "Y")]));
        write(md, "Languages/JP/b.xml", &strings(&[("x", "B")]));
        write(md, "Languages/JP/unlisted.xml", &strings(&[("z", "Z")]));

        let s = read_language_stream(md, "日本語", "JP");
        assert_eq!(s.files, vec!["JP/b.xml", "JP/a.xml"]);
        assert_eq!(s.duplicates, 1);
        let x = s.records.iter().find(|r| r.id == "x").unwrap();
        assert_eq!(x.text, "B");
        assert!(s.records.iter().all(|r| r.id != "z"));
    }

    #[test]
    fn stream_without_manifest_reads_language_folder() {
        let dir = tempdir().unwrap();
        let md = dir.path();
        write(md, "Languages/JP/a.xml", &strings(&[("x", "A")]));
        write(md, "Languages/JP/broken.xml", "<base><strings>");
        let s = read_language_stream(md, "日本語", "JP");
        assert_eq!(s.records.len(), 1);
        assert_eq!(s.skipped.len(), 1);
    }

    #[test]
    fn source_strings_come_from_english_folders_only() {
        let dir = tempdir().unwrap();
        let md = dir.path();
        write(md, "Languages/std_top.xml", &strings(&[("a", "Top")]));
        write(md, "Languages/English/std_en.xml", &strings(&[("b", "English")]));
        write(md, "Languages/JP/std_jp.xml", &strings(&[("c", "Japanese")]));
        let mut entries = Vec::new();
        let mut skipped = Vec::new();
        let n = read_source_strings(md, &mut entries, &mut skipped);
        assert_eq!(n, 2);
        let ids: Vec<_> = entries.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(entries[1].file, "Languages/English/std_en.xml");
        assert_eq!(entries[0].context, LANGUAGE_CONTEXT);
    }
}
