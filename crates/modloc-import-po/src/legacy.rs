//! One-time adapter for catalogs keyed `module/file/id/text` whose translations may carry an
//! `[id]` prefix.

use modloc_core::Entry;
use once_cell::sync::OnceCell;
use regex::Regex;

use crate::PoRecord;

fn debug_prefix_re() -> &'static Regex {
    static PREFIX: OnceCell<Regex> = OnceCell::new();
    PREFIX.get_or_init(|| Regex::new(r"(?s)^\[[^\]\s]+?\](.*)$").unwrap())
}

/// `module/file/id/text` -> `id/text`. Keys with fewer segments are returned unchanged.
pub fn convert_key(key: &str) -> String {
    let parts: Vec<&str> = key.splitn(4, '/').collect();
    match parts.as_slice() {
        [_, _, id, text] if !id.is_empty() => format!("{id}/{text}"),
        _ => key.to_string(),
    }
}

pub fn strip_debug_prefix(msgstr: &str) -> String {
    match debug_prefix_re().captures(msgstr) {
        Some(c) => c[1].to_string(),
        None => msgstr.to_string(),
    }
}

pub fn convert_records(records: Vec<PoRecord>) -> Vec<PoRecord> {
    let mut converted = 0usize;
    let out: Vec<PoRecord> = records
        .into_iter()
        .map(|mut r| {
            let key = convert_key(&r.msgid);
            if key != r.msgid {
                converted += 1;
            }
            r.msgid = key;
            r.msgstr = strip_debug_prefix(&r.msgstr);
            r
        })
        .collect();
    tracing::info!(event = "legacy_keys_converted", converted, total = out.len());
    out
}

/// Same reinterpretation for entries read from a compiled catalog, whose key was already split
/// at the first `/`.
pub fn convert_entries(entries: Vec<Entry>) -> Vec<Entry> {
    entries
        .into_iter()
        .filter_map(|mut e| {
            let key = convert_key(&format!("{}/{}", e.id, e.text_source));
            let (id, text) = key.split_once('/')?;
            e.id = id.to_string();
            e.text_source = text.to_string();
            e.text_target = e.text_target.map(|t| strip_debug_prefix(&t));
            Some(e)
        })
        .collect()
}
