use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use modloc_core::fs::write_with_backup;
use modloc_core::ids::catalog_key;
use modloc_core::{Entry, Result};

/// Byte separating context from key in compiled catalogs.
pub const CONTEXT_SEPARATOR: char = '\u{4}';

pub fn escape_po(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 8);
    for ch in s.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(ch),
        }
    }
    out
}

/// `%` is a format character for the game's string loader.
pub fn double_percent(s: &str) -> String {
    s.replace('%', "%%")
}

fn header_text(lang: Option<&str>) -> String {
    let mut h = String::new();
    h.push_str("Project-Id-Version: modloc\n");
    let _ = writeln!(h, "Language: {}", lang.unwrap_or(""));
    h.push_str("MIME-Version: 1.0\n");
    h.push_str("Content-Type: text/plain; charset=UTF-8\n");
    h.push_str("Content-Transfer-Encoding: 8bit\n");
    let _ = writeln!(h, "X-Modloc-Schema: {}", modloc_core::MODLOC_SCHEMA_VERSION);
    h
}

/// Render a PO catalog. One record per entry, in the given order.
pub fn render_po(entries: &[Entry], lang: Option<&str>) -> String {
    let mut s = String::new();
    s.push_str("msgid \"\"\nmsgstr \"\"\n");
    for line in header_text(lang).lines() {
        let _ = writeln!(s, "\"{}\\n\"", escape_po(line));
    }
    s.push('\n');

    for e in entries {
        for note in &e.notes {
            for line in note.lines() {
                let _ = writeln!(s, "# {line}");
            }
        }
        if !e.attribute.is_empty() {
            let _ = writeln!(s, "#. attribute: {}", e.attribute);
        }
        for loc in &e.locations {
            let _ = writeln!(s, "#: {}:{}", loc.file, loc.count);
        }
        if e.needs_review {
            s.push_str("#, fuzzy\n");
        }
        if !e.context.is_empty() {
            let _ = writeln!(s, "msgctxt \"{}\"", escape_po(&e.context));
        }
        let msgid = double_percent(&catalog_key(&e.id, &e.text_source));
        let msgstr = double_percent(e.text_target.as_deref().unwrap_or(""));
        let _ = writeln!(s, "msgid \"{}\"", escape_po(&msgid));
        let _ = writeln!(s, "msgstr \"{}\"", escape_po(&msgstr));
        s.push('\n');
    }
    s
}

/// Write a PO catalog, rotating any existing file into backup first.
pub fn write_po(path: &Path, entries: &[Entry], lang: Option<&str>) -> Result<Option<PathBuf>> {
    let backup = write_with_backup(path, render_po(entries, lang).as_bytes())?;
    tracing::info!(event = "po_written", path = %path.display(), entries = entries.len());
    Ok(backup)
}

/// Render the GNU MO twin (little endian, no hash table). Only reviewed, non-empty
/// translations are compiled, as msgfmt does with fuzzy records.
pub fn render_mo(entries: &[Entry], lang: Option<&str>) -> Vec<u8> {
    let mut pairs: Vec<(String, String)> = vec![(String::new(), header_text(lang))];
    for e in entries {
        let Some(target) = e.translation() else {
            continue;
        };
        if e.needs_review {
            continue;
        }
        let key = double_percent(&catalog_key(&e.id, &e.text_source));
        let key = if e.context.is_empty() {
            key
        } else {
            format!("{}{CONTEXT_SEPARATOR}{key}", e.context)
        };
        pairs.push((key, double_percent(target)));
    }
    pairs.sort_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));
    pairs.dedup_by(|a, b| a.0 == b.0);

    let n = pairs.len() as u32;
    let orig_table = 28u32;
    let trans_table = orig_table + 8 * n;
    let mut data_offset = trans_table + 8 * n;

    let mut orig_desc = Vec::with_capacity(pairs.len());
    let mut trans_desc = Vec::with_capacity(pairs.len());
    let mut data: Vec<u8> = Vec::new();
    for (k, _) in &pairs {
        orig_desc.push((k.len() as u32, data_offset));
        data.extend_from_slice(k.as_bytes());
        data.push(0);
        data_offset += k.len() as u32 + 1;
    }
    for (_, v) in &pairs {
        trans_desc.push((v.len() as u32, data_offset));
        data.extend_from_slice(v.as_bytes());
        data.push(0);
        data_offset += v.len() as u32 + 1;
    }

    let mut out = Vec::with_capacity(data_offset as usize);
    for word in [0x9504_12de_u32, 0, n, orig_table, trans_table, 0, trans_table + 8 * n] {
        out.extend_from_slice(&word.to_le_bytes());
    }
    for (len, off) in orig_desc.into_iter().chain(trans_desc) {
        out.extend_from_slice(&len.to_le_bytes());
        out.extend_from_slice(&off.to_le_bytes());
    }
    out.extend_from_slice(&data);
    out
}

pub fn write_mo(path: &Path, entries: &[Entry], lang: Option<&str>) -> Result<Option<PathBuf>> {
    let bytes = render_mo(entries, lang);
    let backup = write_with_backup(path, &bytes)?;
    tracing::info!(event = "mo_written", path = %path.display(), bytes = bytes.len());
    Ok(backup)
}
