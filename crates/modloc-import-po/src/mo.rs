use std::path::Path;

use color_eyre::eyre::Result;
use modloc_core::ids::split_catalog_key;
use modloc_core::{Entry, ModlocError};

use crate::undouble_percent;

const MAGIC_LE: u32 = 0x9504_12de;
const MAGIC_BE: u32 = 0xde12_0495;

/// Read a GNU MO file. Records are reviewed translations by construction.
pub fn read_mo(path: &Path) -> Result<Vec<Entry>> {
    let bytes = std::fs::read(path)?;
    parse_mo(&bytes, path)
}

pub(crate) fn parse_mo(bytes: &[u8], path: &Path) -> Result<Vec<Entry>> {
    let invalid = |reason: &str| ModlocError::InvalidCatalog {
        path: path.to_path_buf(),
        line: 0,
        reason: reason.to_string(),
    };
    if bytes.len() < 28 {
        return Err(invalid("truncated header").into());
    }
    let big_endian = match u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) {
        MAGIC_LE => false,
        MAGIC_BE => true,
        _ => return Err(invalid("bad magic number").into()),
    };
    let word = |at: usize| -> Option<u32> {
        let b: [u8; 4] = bytes.get(at..at + 4)?.try_into().ok()?;
        Some(if big_endian {
            u32::from_be_bytes(b)
        } else {
            u32::from_le_bytes(b)
        })
    };
    let string = |table: usize, i: usize| -> Option<String> {
        let len = word(table + 8 * i)? as usize;
        let off = word(table + 8 * i + 4)? as usize;
        let raw = bytes.get(off..off.checked_add(len)?)?;
        Some(String::from_utf8_lossy(raw).into_owned())
    };

    let n = word(8).ok_or_else(|| invalid("truncated header"))? as usize;
    let orig = word(12).ok_or_else(|| invalid("truncated header"))? as usize;
    let trans = word(16).ok_or_else(|| invalid("truncated header"))? as usize;
    let table_fits = |start: usize| {
        n.checked_mul(8)
            .and_then(|size| start.checked_add(size))
            .is_some_and(|end| end <= bytes.len())
    };
    if !table_fits(orig) || !table_fits(trans) {
        return Err(invalid("string tables out of range").into());
    }

    let mut out = Vec::with_capacity(n);
    for i in 0..n {
        let key = string(orig, i).ok_or_else(|| invalid("string table out of range"))?;
        let value = string(trans, i).ok_or_else(|| invalid("string table out of range"))?;
        if key.is_empty() {
            continue;
        }
        let (context, key) = match key.split_once('\u{4}') {
            Some((c, k)) => (c.to_string(), k.to_string()),
            None => (String::new(), key),
        };
        // plural forms: only the singular key and first translation are used
        let key = key.split('\0').next().unwrap_or("").to_string();
        let value = value.split('\0').next().unwrap_or("").to_string();

        let key = undouble_percent(&key);
        let Some((id, text)) = split_catalog_key(&key) else {
            tracing::warn!(event = "mo_key_skipped", path = %path.display(), key = %key);
            continue;
        };
        let target = Some(undouble_percent(&value)).filter(|v| !v.is_empty());
        let mut e = Entry::translated(id, text, target);
        e.context = context;
        e.needs_review = false;
        out.push(e);
    }
    Ok(out)
}
