use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

mod catalog;
pub mod fs;
pub mod ids;

pub use catalog::{Catalog, CatalogBuilder, IdCollision};

/// Workspace-wide result alias.
pub type Result<T> = color_eyre::eyre::Result<T>;

/// Version stamped into catalog headers and JSON reports.
pub const MODLOC_SCHEMA_VERSION: u32 = 1;

/// One place where an entry was found, with the number of times it occurred there.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Location {
    pub file: String,
    pub count: usize,
}

impl Location {
    pub fn new(file: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            count: 1,
        }
    }
}

/// Merge `extra` into `into`, summing counts of identical files and keeping file order stable.
pub fn merge_locations(into: &mut Vec<Location>, extra: &[Location]) {
    for loc in extra {
        match into.iter_mut().find(|l| l.file == loc.file) {
            Some(existing) => existing.count += loc.count,
            None => into.push(loc.clone()),
        }
    }
}

/// One translatable unit extracted from module content or read back from a catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// `id` attribute of the element the text was found on.
    pub object_id: Option<String>,
    /// Source text with any `{=id}` directive stripped.
    pub text_source: String,
    /// Canonical id. Empty until normalization assigns one.
    pub id: String,
    /// Label of the extraction rule that produced this entry.
    pub context: String,
    /// Path of the first occurrence, relative to `ModuleData`, forward slashes.
    pub file: String,
    pub attribute: String,
    pub missing_id: bool,
    pub is_duplicated: bool,
    /// Id is one of the baseline ids (only possible when baseline ids are kept).
    pub in_baseline: bool,
    pub text_target: Option<String>,
    pub needs_review: bool,
    pub notes: Vec<String>,
    pub locations: Vec<Location>,
}

impl Entry {
    /// A freshly scanned candidate. `raw` may carry a `{=id}` marker.
    pub fn candidate(
        raw: &str,
        context: impl Into<String>,
        attribute: impl Into<String>,
        file: impl Into<String>,
    ) -> Self {
        let (id, text) = ids::split_marker(raw);
        let file = file.into();
        Self {
            object_id: None,
            text_source: text,
            id,
            context: context.into(),
            locations: vec![Location::new(file.clone())],
            file,
            attribute: attribute.into(),
            missing_id: false,
            is_duplicated: false,
            in_baseline: false,
            text_target: None,
            needs_review: true,
            notes: Vec::new(),
        }
    }

    /// A catalog record with a known id, source text and translation.
    pub fn translated(
        id: impl Into<String>,
        text_source: impl Into<String>,
        text_target: Option<String>,
    ) -> Self {
        Self {
            object_id: None,
            text_source: text_source.into(),
            id: id.into(),
            context: String::new(),
            file: String::new(),
            attribute: String::new(),
            missing_id: false,
            is_duplicated: false,
            in_baseline: false,
            text_target,
            needs_review: true,
            notes: Vec::new(),
            locations: Vec::new(),
        }
    }

    pub fn key(&self) -> (String, String) {
        (self.id.clone(), self.text_source.clone())
    }

    /// Translation if present and not blank.
    pub fn translation(&self) -> Option<&str> {
        self.text_target.as_deref().filter(|t| !t.is_empty())
    }

    /// Sum of duplication counts over all locations.
    pub fn occurrences(&self) -> usize {
        self.locations.iter().map(|l| l.count).sum::<usize>().max(1)
    }
}

/// Read-only table of shipped ids and their original texts.
#[derive(Debug, Clone, Default)]
pub struct BaselineReference {
    ids: BTreeMap<String, BTreeSet<String>>,
}

/// How an `(id, text)` pair relates to the baseline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaselineMatch {
    Absent,
    SameText,
    DifferentText,
}

impl BaselineReference {
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut ids: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for (id, text) in pairs {
            let id = id.into();
            if id.is_empty() {
                continue;
            }
            ids.entry(id).or_default().insert(text.into());
        }
        Self { ids }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn contains_id(&self, id: &str) -> bool {
        self.ids.contains_key(id)
    }

    pub fn classify(&self, id: &str, text: &str) -> BaselineMatch {
        match self.ids.get(id) {
            None => BaselineMatch::Absent,
            Some(texts) if texts.contains(text) => BaselineMatch::SameText,
            Some(_) => BaselineMatch::DifferentText,
        }
    }

    /// Sorted `(id, text)` pairs.
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.ids
            .iter()
            .flat_map(|(id, texts)| texts.iter().map(move |t| (id.as_str(), t.as_str())))
    }
}

/// Extra attributes only the designated base module's manifest declares.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseLanguageInfo {
    pub name: String,
    pub subtitle_extension: Option<String>,
    pub supported_iso: Vec<String>,
}

/// `language_data.xml` of one language directory. File order is what the game loads.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestFile {
    pub language_id: String,
    pub base: Option<BaseLanguageInfo>,
    /// Paths relative to `ModuleData/Languages`, forward slashes.
    pub files: Vec<String>,
}

#[derive(Debug, Error)]
pub enum ModlocError {
    #[error("module `{module}` not found (searched: {})", .searched.iter().map(|p| p.display().to_string()).collect::<Vec<_>>().join(", "))]
    ModuleNotFound {
        module: String,
        searched: Vec<PathBuf>,
    },
    #[error("malformed document {path}: {reason}")]
    MalformedDocument { path: PathBuf, reason: String },
    #[error("cannot decode {path} (declared encoding: {declared})")]
    EncodingMismatch { path: PathBuf, declared: String },
    #[error("invalid catalog {path}:{line}: {reason}")]
    InvalidCatalog {
        path: PathBuf,
        line: usize,
        reason: String,
    },
    #[error("invalid policy: {0}")]
    InvalidPolicy(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candidate_splits_marker_and_records_location() {
        let e = Entry::candidate("{=abc}Hello", "Item.name", "name", "items.xml");
        assert_eq!(e.id, "abc");
        assert_eq!(e.text_source, "Hello");
        assert_eq!(e.locations, vec![Location::new("items.xml")]);
        assert!(e.needs_review);
    }

    #[test]
    fn baseline_classifies_pairs() {
        let base = BaselineReference::from_pairs([("foo", "Old"), ("foo", "Older"), ("", "x")]);
        assert_eq!(base.len(), 1);
        assert_eq!(base.classify("foo", "Old"), BaselineMatch::SameText);
        assert_eq!(base.classify("foo", "New"), BaselineMatch::DifferentText);
        assert_eq!(base.classify("bar", "Old"), BaselineMatch::Absent);
    }

    #[test]
    fn merge_locations_sums_counts() {
        let mut a = vec![Location::new("a.xml")];
        merge_locations(&mut a, &[Location::new("b.xml"), Location::new("a.xml")]);
        assert_eq!(a.len(), 2);
        assert_eq!(a[0].count, 2);
        assert_eq!(a[1].file, "b.xml");
    }
}
