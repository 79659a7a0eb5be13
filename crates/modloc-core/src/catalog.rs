use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::Serialize;

use crate::{merge_locations, Entry};

/// An id carried by entries with different source texts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IdCollision {
    pub id: String,
    pub texts: Vec<String>,
}

/// Immutable collection of entries keyed by `(id, text_source)`.
///
/// Lookup indices are computed once in [`CatalogBuilder::build`]; changing an entry means
/// going back through a builder.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entries: Vec<Entry>,
    by_id: HashMap<String, Vec<usize>>,
    by_text: HashMap<String, Vec<usize>>,
}

impl Catalog {
    pub fn builder() -> CatalogBuilder {
        CatalogBuilder::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in key order.
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Entry> {
        self.entries.iter()
    }

    pub fn into_entries(self) -> Vec<Entry> {
        self.entries
    }

    /// Back to a builder holding the same entries.
    pub fn into_builder(self) -> CatalogBuilder {
        let mut b = CatalogBuilder::default();
        b.extend(self.entries);
        b
    }

    pub fn get(&self, id: &str, text_source: &str) -> Option<&Entry> {
        self.with_id(id).find(|e| e.text_source == text_source)
    }

    /// Entries carrying `id`, ordered by source text.
    pub fn with_id<'a>(&'a self, id: &str) -> impl Iterator<Item = &'a Entry> + 'a {
        self.by_id
            .get(id)
            .into_iter()
            .flatten()
            .map(move |&i| &self.entries[i])
    }

    /// Entries whose source text is `text`, ordered by id.
    pub fn with_text<'a>(&'a self, text: &str) -> impl Iterator<Item = &'a Entry> + 'a {
        self.by_text
            .get(text)
            .into_iter()
            .flatten()
            .map(move |&i| &self.entries[i])
    }

    /// Ids shared by entries whose source texts differ.
    pub fn collisions(&self) -> Vec<IdCollision> {
        let mut out: Vec<IdCollision> = self
            .by_id
            .iter()
            .filter(|(id, idx)| !id.is_empty() && idx.len() > 1)
            .map(|(id, idx)| IdCollision {
                id: id.clone(),
                texts: idx
                    .iter()
                    .map(|&i| self.entries[i].text_source.clone())
                    .collect::<BTreeSet<_>>()
                    .into_iter()
                    .collect(),
            })
            .filter(|c| c.texts.len() > 1)
            .collect();
        out.sort_by(|a, b| a.id.cmp(&b.id));
        out
    }
}

impl<'a> IntoIterator for &'a Catalog {
    type Item = &'a Entry;
    type IntoIter = std::slice::Iter<'a, Entry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Collects entries; pushing an existing key merges into the stored entry.
#[derive(Debug, Clone, Default)]
pub struct CatalogBuilder {
    entries: BTreeMap<(String, String), Entry>,
}

impl CatalogBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns `false` when the key was already present and the entry got merged.
    pub fn push(&mut self, entry: Entry) -> bool {
        match self.entries.get_mut(&(entry.id.clone(), entry.text_source.clone())) {
            Some(existing) => {
                merge_into(existing, entry);
                false
            }
            None => {
                self.entries.insert(entry.key(), entry);
                true
            }
        }
    }

    pub fn extend(&mut self, entries: impl IntoIterator<Item = Entry>) {
        for e in entries {
            self.push(e);
        }
    }

    pub fn build(self) -> Catalog {
        let entries: Vec<Entry> = self.entries.into_values().collect();
        let mut by_id: HashMap<String, Vec<usize>> = HashMap::new();
        let mut by_text: HashMap<String, Vec<usize>> = HashMap::new();
        for (i, e) in entries.iter().enumerate() {
            by_id.entry(e.id.clone()).or_default().push(i);
            if !e.text_source.is_empty() {
                by_text.entry(e.text_source.clone()).or_default().push(i);
            }
        }
        Catalog {
            entries,
            by_id,
            by_text,
        }
    }
}

fn merge_into(existing: &mut Entry, other: Entry) {
    merge_locations(&mut existing.locations, &other.locations);
    existing.is_duplicated = true;
    existing.missing_id |= other.missing_id;
    existing.in_baseline |= other.in_baseline;
    if existing.translation().is_none() && other.translation().is_some() {
        existing.text_target = other.text_target;
        existing.needs_review = other.needs_review;
    }
    for note in other.notes {
        if !existing.notes.contains(&note) {
            existing.notes.push(note);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Location;

    fn entry(id: &str, text: &str, file: &str) -> Entry {
        let mut e = Entry::translated(id, text, None);
        e.locations = vec![Location::new(file)];
        e
    }

    #[test]
    fn builder_merges_identical_keys() {
        let mut b = Catalog::builder();
        assert!(b.push(entry("a", "Hello", "x.xml")));
        assert!(!b.push(entry("a", "Hello", "y.xml")));
        let cat = b.build();
        assert_eq!(cat.len(), 1);
        let e = cat.get("a", "Hello").unwrap();
        assert!(e.is_duplicated);
        assert_eq!(e.locations.len(), 2);
    }

    #[test]
    fn indices_find_by_id_and_text() {
        let mut b = Catalog::builder();
        b.push(entry("b", "Same", "x.xml"));
        b.push(entry("a", "Same", "x.xml"));
        b.push(entry("c", "", "x.xml"));
        let cat = b.build();
        let ids: Vec<_> = cat.with_text("Same").map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(cat.with_id("c").count(), 1);
        assert_eq!(cat.with_text("").count(), 0);
    }

    #[test]
    fn collisions_report_differing_texts_only() {
        let mut b = Catalog::builder();
        b.push(entry("a", "One", "x.xml"));
        b.push(entry("a", "Two", "x.xml"));
        b.push(entry("b", "Three", "x.xml"));
        let cat = b.build();
        let c = cat.collisions();
        assert_eq!(c.len(), 1);
        assert_eq!(c[0].id, "a");
        assert_eq!(c[0].texts, vec!["One".to_string(), "Two".to_string()]);
    }
}
