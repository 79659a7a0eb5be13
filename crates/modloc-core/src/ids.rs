//! The one id grammar every crate shares.
//!
//! Text carrying an id is written `{=<id>}<text>`. A valid id is non-empty and contains no
//! whitespace, `/`, `{` or `}`; `/` is reserved as the separator of catalog keys (`<id>/<text>`).

use once_cell::sync::OnceCell;
use regex::Regex;

/// Placeholder ids authors use instead of a real one.
pub const SENTINEL_IDS: [&str; 3] = ["!", "*", "?"];

fn marker_re() -> &'static Regex {
    static MARKER: OnceCell<Regex> = OnceCell::new();
    MARKER.get_or_init(|| Regex::new(r"(?s)^\{=(.*?)\}(.*)$").unwrap())
}

/// Split `{=id}text` into `(id, text)`. Text without a marker yields an empty id.
pub fn split_marker(raw: &str) -> (String, String) {
    match marker_re().captures(raw) {
        Some(caps) => (caps[1].to_string(), caps[2].to_string()),
        None => (String::new(), raw.to_string()),
    }
}

pub fn format_marker(id: &str, text: &str) -> String {
    format!("{{={id}}}{text}")
}

pub fn is_sentinel(id: &str) -> bool {
    SENTINEL_IDS.contains(&id)
}

/// Missing means empty or a sentinel.
pub fn is_missing(id: &str) -> bool {
    id.is_empty() || is_sentinel(id)
}

pub fn is_valid_id(id: &str) -> bool {
    !id.is_empty()
        && !id
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '/' | '{' | '}'))
}

/// Build the catalog key `<id>/<text>`.
pub fn catalog_key(id: &str, text: &str) -> String {
    format!("{id}/{text}")
}

/// Split a catalog key at its first `/`. Keys without a separator are rejected.
pub fn split_catalog_key(key: &str) -> Option<(&str, &str)> {
    key.split_once('/').filter(|(id, _)| !id.is_empty())
}

/// Auto-id prefix derived from a module name: ASCII only, no spaces.
pub fn default_autoid_prefix(module: &str) -> String {
    module
        .chars()
        .filter(|c| c.is_ascii() && !c.is_ascii_whitespace())
        .collect()
}
