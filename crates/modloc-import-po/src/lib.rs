use std::path::{Path, PathBuf};

use color_eyre::eyre::{eyre, Result};
use modloc_core::ids::split_catalog_key;
use modloc_core::{Entry, Location, ModlocError};

mod baseline;
pub mod legacy;
mod mo;
mod xml;

pub use baseline::read_baseline_csv;
pub use mo::read_mo;
pub use xml::{render_language_file, render_manifest};

/// One raw record of a PO file, before its key is interpreted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoRecord {
    pub context: Option<String>,
    pub msgid: String,
    pub msgstr: String,
    pub fuzzy: bool,
    pub notes: Vec<String>,
    pub attribute: Option<String>,
    pub locations: Vec<Location>,
    /// 1-based line of `msgid`.
    pub line: usize,
}

#[derive(Debug, Clone, Default)]
pub struct PoFile {
    pub language: Option<String>,
    pub records: Vec<PoRecord>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Field {
    None,
    Context,
    Id,
    Str,
}

/// `%%` back to `%`.
pub fn undouble_percent(s: &str) -> String {
    s.replace("%%", "%")
}

pub fn parse_po_string(s: &str) -> Result<String> {
    let s = s.trim();
    if s.len() < 2 || !s.starts_with('"') || !s.ends_with('"') {
        return Err(eyre!("invalid po string: {s}"));
    }
    let inner = &s[1..s.len() - 1];
    let mut out = String::new();
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                match next {
                    'n' => out.push('\n'),
                    'r' => out.push('\r'),
                    't' => out.push('\t'),
                    '"' => out.push('"'),
                    '\\' => out.push('\\'),
                    other => out.push(other),
                }
            }
        } else {
            out.push(c);
        }
    }
    Ok(out)
}

fn parse_references(rest: &str, into: &mut Vec<Location>) {
    for token in rest.split_whitespace() {
        let loc = match token.rsplit_once(':') {
            Some((file, n)) => match n.parse::<usize>() {
                Ok(count) => Location {
                    file: file.to_string(),
                    count,
                },
                Err(_) => Location::new(token),
            },
            None => Location::new(token),
        };
        modloc_core::merge_locations(into, &[loc]);
    }
}

fn header_language(msgstr: &str) -> Option<String> {
    msgstr
        .lines()
        .find_map(|l| l.strip_prefix("Language:"))
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn flush(cur: &mut PoRecord, has_id: &mut bool, has_str: &mut bool, file: &mut PoFile) {
    let rec = std::mem::take(cur);
    if *has_id {
        if rec.msgid.is_empty() && rec.context.is_none() {
            file.language = header_language(&rec.msgstr);
        } else {
            file.records.push(rec);
        }
    }
    *has_id = false;
    *has_str = false;
}

/// Parse PO text. Obsolete (`#~`) records and plural forms beyond the first are ignored.
pub fn parse_po(text: &str, path: &Path) -> Result<PoFile> {
    let mut file = PoFile::default();
    let mut cur = PoRecord::default();
    let mut field = Field::None;
    let mut has_id = false;
    let mut has_str = false;

    let invalid = |line: usize, reason: String| ModlocError::InvalidCatalog {
        path: path.to_path_buf(),
        line,
        reason,
    };

    for (i, raw) in text.lines().enumerate() {
        let lineno = i + 1;
        let line = raw.trim();
        if line.is_empty() {
            flush(&mut cur, &mut has_id, &mut has_str, &mut file);
            field = Field::None;
            continue;
        }
        if line.starts_with("#~") || line.starts_with("#|") {
            continue;
        }
        let starts_record =
            line.starts_with('#') || line.starts_with("msgctxt") || line.starts_with("msgid ");
        if starts_record && has_str {
            flush(&mut cur, &mut has_id, &mut has_str, &mut file);
            field = Field::None;
        }

        if let Some(rest) = line.strip_prefix("#,") {
            if rest.split(',').any(|f| f.trim() == "fuzzy") {
                cur.fuzzy = true;
            }
        } else if let Some(rest) = line.strip_prefix("#:") {
            parse_references(rest, &mut cur.locations);
        } else if let Some(rest) = line.strip_prefix("#.") {
            let rest = rest.trim();
            match rest.strip_prefix("attribute:") {
                Some(a) => cur.attribute = Some(a.trim().to_string()),
                None => cur.notes.push(rest.to_string()),
            }
        } else if let Some(rest) = line.strip_prefix('#') {
            cur.notes.push(rest.strip_prefix(' ').unwrap_or(rest).to_string());
        } else if let Some(rest) = line.strip_prefix("msgctxt") {
            cur.context = Some(parse_po_string(rest).map_err(|e| invalid(lineno, e.to_string()))?);
            field = Field::Context;
        } else if line.starts_with("msgid_plural") {
            field = Field::None;
        } else if let Some(rest) = line.strip_prefix("msgid") {
            cur.msgid = parse_po_string(rest).map_err(|e| invalid(lineno, e.to_string()))?;
            cur.line = lineno;
            has_id = true;
            field = Field::Id;
        } else if let Some(rest) = line.strip_prefix("msgstr") {
            let rest = rest.trim_start();
            let rest = if rest.starts_with('[') {
                if !rest.starts_with("[0]") {
                    field = Field::None;
                    continue;
                }
                &rest[3..]
            } else {
                rest
            };
            cur.msgstr = parse_po_string(rest).map_err(|e| invalid(lineno, e.to_string()))?;
            has_str = true;
            field = Field::Str;
        } else if line.starts_with('"') {
            let val = parse_po_string(line).map_err(|e| invalid(lineno, e.to_string()))?;
            match field {
                Field::Context => {
                    if let Some(c) = cur.context.as_mut() {
                        c.push_str(&val);
                    }
                }
                Field::Id => cur.msgid.push_str(&val),
                Field::Str => cur.msgstr.push_str(&val),
                Field::None => {}
            }
        } else {
            return Err(invalid(lineno, format!("unexpected line `{line}`")).into());
        }
    }
    flush(&mut cur, &mut has_id, &mut has_str, &mut file);
    Ok(file)
}

pub fn read_po(path: &Path) -> Result<PoFile> {
    let bytes = std::fs::read(path)?;
    let text = String::from_utf8_lossy(&bytes);
    let text = text.strip_prefix('\u{feff}').unwrap_or(&text);
    parse_po(text, path)
}

/// Turn a record keyed `id/text` into an entry.
pub fn record_to_entry(rec: PoRecord, path: &Path) -> Result<Entry> {
    let key = undouble_percent(&rec.msgid);
    let Some((id, text)) = split_catalog_key(&key) else {
        return Err(ModlocError::InvalidCatalog {
            path: path.to_path_buf(),
            line: rec.line,
            reason: format!("key `{}` is not of the form id/text", rec.msgid),
        }
        .into());
    };
    let target = undouble_percent(&rec.msgstr);
    let mut e = Entry::translated(id, text, Some(target).filter(|t| !t.is_empty()));
    e.context = rec.context.unwrap_or_default();
    e.attribute = rec.attribute.unwrap_or_default();
    e.file = rec
        .locations
        .first()
        .map(|l| l.file.clone())
        .unwrap_or_default();
    e.locations = rec.locations;
    e.notes = rec.notes;
    e.needs_review = rec.fuzzy;
    Ok(e)
}

/// Entries read back from a catalog and where they came from.
#[derive(Debug, Clone, Default)]
pub struct CatalogRead {
    pub language: Option<String>,
    pub entries: Vec<Entry>,
    pub source: PathBuf,
    pub from_mo: bool,
}

/// Compiled twin of a PO path (`x.po` -> `x.mo`).
pub fn mo_twin(po_path: &Path) -> PathBuf {
    po_path.with_extension("mo")
}

/// Read a translation catalog. A `.mo` twin next to the PO is preferred when present; one older
/// than its PO is used anyway and reported. `legacy` reinterprets `module/file/id/text` keys.
pub fn read_catalog(path: &Path, legacy: bool) -> Result<CatalogRead> {
    let is_mo = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("mo"));
    let twin = if is_mo { path.to_path_buf() } else { mo_twin(path) };

    if twin.is_file() {
        if !is_mo && is_older(&twin, path) {
            tracing::warn!(event = "mo_stale", mo = %twin.display(), po = %path.display());
        }
        let mut entries = read_mo(&twin)?;
        if legacy {
            entries = legacy::convert_entries(entries);
        }
        tracing::info!(event = "catalog_read", path = %twin.display(), entries = entries.len(), binary = true);
        return Ok(CatalogRead {
            language: None,
            entries,
            source: twin,
            from_mo: true,
        });
    }

    read_po_catalog(path, legacy)
}

/// Read only the PO text catalog at `path`, ignoring any compiled twin.
pub fn read_po_catalog(path: &Path, legacy: bool) -> Result<CatalogRead> {
    let po = read_po(path)?;
    let records = if legacy {
        legacy::convert_records(po.records)
    } else {
        po.records
    };
    let entries = records
        .into_iter()
        .map(|r| record_to_entry(r, path))
        .collect::<Result<Vec<_>>>()?;
    tracing::info!(event = "catalog_read", path = %path.display(), entries = entries.len(), binary = false);
    Ok(CatalogRead {
        language: po.language,
        entries,
        source: path.to_path_buf(),
        from_mo: false,
    })
}

fn is_older(a: &Path, b: &Path) -> bool {
    let modified = |p: &Path| std::fs::metadata(p).and_then(|m| m.modified()).ok();
    match (modified(a), modified(b)) {
        (Some(ma), Some(mb)) => ma < mb,
        _ => false,
    }
}
