//! Identifier normalization: one policy-driven pass turning raw scanned entries into a catalog in
//! which every entry has a stable id.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use modloc_core::ids::{is_missing, is_sentinel, is_valid_id};
use modloc_core::{merge_locations, BaselineMatch, BaselineReference, Catalog, Entry, ModlocError};
use modloc_domain::{CollisionReport, NormalizeReport};
use regex::Regex;
use sha2::{Digest, Sha256};

pub const DEFAULT_AUTOID_DIGITS: usize = 8;
pub const MAX_AUTOID_DIGITS: usize = 32;

/// Grouping used when collapsing duplicate records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HowDistinct {
    /// `(text, context, attribute)`
    #[default]
    Context,
    /// `(text, context, attribute, file)`
    File,
    /// No grouping.
    All,
}

impl FromStr for HowDistinct {
    type Err = ModlocError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "context" => Ok(Self::Context),
            "file" => Ok(Self::File),
            "all" => Ok(Self::All),
            other => Err(ModlocError::InvalidPolicy(format!(
                "how_distinct must be one of context, file, all (got `{other}`)"
            ))),
        }
    }
}

impl fmt::Display for HowDistinct {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Context => "context",
            Self::File => "file",
            Self::All => "all",
        })
    }
}

#[derive(Debug, Clone)]
pub struct NormalizePolicy {
    pub keep_vanilla_id: bool,
    pub how_distinct: HowDistinct,
    pub convert_exclam: bool,
    pub id_exclude_pattern: Option<Regex>,
    pub keep_redundancies: bool,
    pub autoid_prefix: String,
    pub autoid_digits: usize,
}

impl Default for NormalizePolicy {
    fn default() -> Self {
        Self {
            keep_vanilla_id: false,
            how_distinct: HowDistinct::Context,
            convert_exclam: false,
            id_exclude_pattern: None,
            keep_redundancies: false,
            autoid_prefix: String::new(),
            autoid_digits: DEFAULT_AUTOID_DIGITS,
        }
    }
}

impl NormalizePolicy {
    /// Compile and set the id exclusion pattern.
    pub fn with_exclude_pattern(mut self, pattern: &str) -> Result<Self, ModlocError> {
        let re = Regex::new(pattern)
            .map_err(|e| ModlocError::InvalidPolicy(format!("id exclude pattern: {e}")))?;
        self.id_exclude_pattern = Some(re);
        Ok(self)
    }

    fn digits(&self) -> usize {
        self.autoid_digits.clamp(1, MAX_AUTOID_DIGITS)
    }

    fn is_excluded(&self, id: &str) -> bool {
        self.id_exclude_pattern
            .as_ref()
            .is_some_and(|re| re.is_match(id))
    }
}

/// Last `digits` hex characters of SHA-256(`input`), letters upper- or lower-cased by the
/// leading digest bits.
pub fn autoid_digest(input: &str, digits: usize) -> String {
    let digits = digits.clamp(1, MAX_AUTOID_DIGITS);
    let digest = Sha256::digest(input.as_bytes());
    let hex = hex::encode(digest);
    let tail = &hex[hex.len() - digits..];
    tail.chars()
        .enumerate()
        .map(|(i, c)| {
            let bit = (digest[i / 8] >> (7 - (i % 8))) & 1;
            if bit == 1 {
                c.to_ascii_uppercase()
            } else {
                c
            }
        })
        .collect()
}

pub struct IdentifierNormalizer<'a> {
    policy: &'a NormalizePolicy,
    baseline: Option<&'a BaselineReference>,
}

impl<'a> IdentifierNormalizer<'a> {
    pub fn new(policy: &'a NormalizePolicy, baseline: Option<&'a BaselineReference>) -> Self {
        Self { policy, baseline }
    }

    /// Run every stage and build the catalog.
    pub fn normalize(&self, entries: Vec<Entry>) -> (Catalog, NormalizeReport) {
        let mut report = NormalizeReport {
            input: entries.len(),
            ..NormalizeReport::default()
        };
        let mut entries = entries;
        self.filter_markers(&mut entries, &mut report);
        let entries = self.check_baseline(entries, &mut report);
        let mut entries = self.deduplicate(entries, &mut report);
        self.assign_ids(&mut entries, &mut report);

        let mut builder = Catalog::builder();
        builder.extend(entries);
        let catalog = builder.build();

        report.collisions = catalog
            .collisions()
            .into_iter()
            .filter(|c| !is_sentinel(&c.id))
            .map(|c| CollisionReport {
                id: c.id,
                texts: c.texts,
            })
            .collect();
        for c in &report.collisions {
            tracing::warn!(event = "id_collision", id = %c.id, texts = c.texts.len());
        }
        report.output = catalog.len();
        tracing::info!(
            event = "normalize_done",
            input = report.input,
            output = report.output,
            reused_reset = report.reused_reset,
            baseline_dropped = report.baseline_dropped,
            duplicates = report.duplicates_collapsed,
            auto_assigned = report.auto_assigned,
            collisions = report.collisions.len()
        );
        (catalog, report)
    }

    /// Clear sentinel, malformed and excluded ids.
    pub fn filter_markers(&self, entries: &mut [Entry], report: &mut NormalizeReport) {
        for e in entries.iter_mut() {
            if is_sentinel(&e.id) {
                e.missing_id = true;
                if !self.policy.convert_exclam {
                    e.id.clear();
                    report.sentinel_cleared += 1;
                }
                continue;
            }
            if e.id.is_empty() {
                e.missing_id = true;
                continue;
            }
            if !is_valid_id(&e.id) || self.policy.is_excluded(&e.id) {
                tracing::debug!(event = "id_cleared", id = %e.id, file = %e.file);
                e.id.clear();
                e.missing_id = true;
                report.invalid_cleared += 1;
            }
        }
    }

    /// Reset ids reused from the baseline with other text; drop entries identical to it.
    pub fn check_baseline(&self, entries: Vec<Entry>, report: &mut NormalizeReport) -> Vec<Entry> {
        let Some(baseline) = self.baseline.filter(|b| !b.is_empty()) else {
            report.baseline_available = false;
            tracing::warn!(event = "baseline_missing", "no baseline reference; id reuse is not checked");
            return entries;
        };
        report.baseline_available = true;

        if self.policy.keep_vanilla_id {
            return entries
                .into_iter()
                .map(|mut e| {
                    e.in_baseline = !e.id.is_empty() && baseline.contains_id(&e.id);
                    e
                })
                .collect();
        }

        let mut out = Vec::with_capacity(entries.len());
        for mut e in entries {
            if is_missing(&e.id) {
                out.push(e);
                continue;
            }
            match baseline.classify(&e.id, &e.text_source) {
                BaselineMatch::Absent => out.push(e),
                BaselineMatch::DifferentText => {
                    tracing::debug!(event = "baseline_id_reset", id = %e.id, file = %e.file);
                    e.id.clear();
                    e.missing_id = true;
                    report.reused_reset += 1;
                    out.push(e);
                }
                BaselineMatch::SameText => report.baseline_dropped += 1,
            }
        }
        out
    }

    /// Collapse duplicates per `how_distinct`, then collapse equal `(id, text)` pairs.
    pub fn deduplicate(&self, entries: Vec<Entry>, report: &mut NormalizeReport) -> Vec<Entry> {
        let grouped = match self.policy.how_distinct {
            HowDistinct::All => entries,
            mode => {
                let mut groups: BTreeMap<(String, String, String, String), Vec<Entry>> =
                    BTreeMap::new();
                for e in entries {
                    let file = if mode == HowDistinct::File {
                        e.file.clone()
                    } else {
                        String::new()
                    };
                    let key = (e.text_source.clone(), e.context.clone(), e.attribute.clone(), file);
                    groups.entry(key).or_default().push(e);
                }
                groups
                    .into_values()
                    .map(|g| {
                        report.duplicates_collapsed += g.len() - 1;
                        collapse_group(g)
                    })
                    .collect()
            }
        };

        let mut out: Vec<Entry> = Vec::with_capacity(grouped.len());
        let mut seen: HashMap<(String, String), usize> = HashMap::new();
        for e in grouped {
            if e.id.is_empty() {
                out.push(e);
                continue;
            }
            match seen.get(&e.key()) {
                Some(&i) => {
                    report.duplicates_collapsed += 1;
                    absorb(&mut out[i], e);
                }
                None => {
                    seen.insert(e.key(), out.len());
                    out.push(e);
                }
            }
        }
        report.missing_ids = out.iter().filter(|e| e.id.is_empty()).count();
        out
    }

    /// Give every entry still without an id a reproducible one.
    pub fn assign_ids(&self, entries: &mut [Entry], report: &mut NormalizeReport) {
        let mut pending: Vec<usize> = entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.id.is_empty())
            .map(|(i, _)| i)
            .collect();
        pending.sort_by(|&a, &b| {
            let (ea, eb) = (&entries[a], &entries[b]);
            digest_input(ea)
                .cmp(&digest_input(eb))
                .then_with(|| ea.file.cmp(&eb.file))
                .then_with(|| ea.object_id.cmp(&eb.object_id))
        });

        let digits = self.policy.digits();
        let mut ordinals: HashMap<String, usize> = HashMap::new();
        for i in pending {
            let base = digest_input(&entries[i]);
            let input = if self.policy.keep_redundancies {
                let n = ordinals.entry(base.clone()).or_insert(0);
                let s = format!("{base}{n}");
                *n += 1;
                s
            } else {
                base
            };
            entries[i].id = format!("{}{}", self.policy.autoid_prefix, autoid_digest(&input, digits));
            report.auto_assigned += 1;
        }
    }
}

fn digest_input(e: &Entry) -> String {
    format!("{}{}{}", e.context, e.attribute, e.text_source)
}

/// Smallest real id wins; a sentinel is kept only when nothing better exists.
fn collapse_group(group: Vec<Entry>) -> Entry {
    let id = group
        .iter()
        .filter(|e| !is_missing(&e.id))
        .map(|e| e.id.as_str())
        .min()
        .or_else(|| {
            group
                .iter()
                .filter(|e| is_sentinel(&e.id))
                .map(|e| e.id.as_str())
                .min()
        })
        .unwrap_or("")
        .to_string();
    let collapsed = group.len() > 1;
    let mut iter = group.into_iter();
    let Some(mut first) = iter.next() else {
        return Entry::translated(id, "", None);
    };
    for other in iter {
        absorb(&mut first, other);
    }
    first.id = id;
    first.is_duplicated |= collapsed;
    first
}

fn absorb(into: &mut Entry, other: Entry) {
    merge_locations(&mut into.locations, &other.locations);
    into.is_duplicated = true;
    into.missing_id |= other.missing_id;
    into.in_baseline |= other.in_baseline;
    if into.object_id.is_none() {
        into.object_id = other.object_id;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use modloc_core::Location;

    fn raw(id: &str, text: &str, ctx: &str, file: &str) -> Entry {
        let mut e = Entry::candidate(text, ctx, "name", file);
        e.id = id.to_string();
        e
    }

    fn policy() -> NormalizePolicy {
        NormalizePolicy {
            autoid_prefix: "Mod".into(),
            ..NormalizePolicy::default()
        }
    }

    #[test]
    fn identical_text_in_two_files_collapses_to_one_entry() {
        let p = policy();
        let n = IdentifierNormalizer::new(&p, None);
        let (cat, report) = n.normalize(vec![
            raw("", "Hello", "X.name", "a.xml"),
            raw("", "Hello", "X.name", "b.xml"),
        ]);
        assert_eq!(cat.len(), 1);
        let e = &cat.entries()[0];
        assert_eq!(e.locations, vec![Location::new("a.xml"), Location::new("b.xml")]);
        assert_eq!(e.id, format!("Mod{}", autoid_digest("X.namenameHello", 8)));
        assert!(e.is_duplicated);
        assert_eq!(report.duplicates_collapsed, 1);
        assert!(!report.baseline_available);
    }

    #[test]
    fn baseline_id_with_new_text_is_cleared() {
        let p = policy();
        let base = BaselineReference::from_pairs([("foo", "Old")]);
        let n = IdentifierNormalizer::new(&p, Some(&base));
        let mut report = NormalizeReport::default();
        let out = n.check_baseline(vec![raw("foo", "New", "X.name", "a.xml")], &mut report);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id, "");
        assert!(out[0].missing_id);
        assert_eq!(report.reused_reset, 1);
    }

    #[test]
    fn baseline_identical_entry_is_dropped() {
        let p = policy();
        let base = BaselineReference::from_pairs([("bar", "Same")]);
        let n = IdentifierNormalizer::new(&p, Some(&base));
        let (cat, report) = n.normalize(vec![
            raw("bar", "Same", "X.name", "a.xml"),
            raw("baz", "Other", "X.name", "a.xml"),
        ]);
        assert_eq!(cat.len(), 1);
        assert!(cat.get("bar", "Same").is_none());
        assert_eq!(report.baseline_dropped, 1);
    }

    #[test]
    fn keep_vanilla_id_only_marks_baseline_ids() {
        let p = NormalizePolicy {
            keep_vanilla_id: true,
            ..policy()
        };
        let base = BaselineReference::from_pairs([("bar", "Same")]);
        let (cat, report) = IdentifierNormalizer::new(&p, Some(&base))
            .normalize(vec![raw("bar", "Same", "X.name", "a.xml")]);
        assert!(cat.get("bar", "Same").unwrap().in_baseline);
        assert_eq!(report.baseline_dropped, 0);
    }

    #[test]
    fn sentinels_and_bad_ids_are_replaced() {
        let p = policy().with_exclude_pattern("^tmp_").unwrap();
        let (cat, report) = IdentifierNormalizer::new(&p, None).normalize(vec![
            raw("!", "A", "X.name", "a.xml"),
            raw("has space", "B", "X.name", "a.xml"),
            raw("tmp_1", "C", "X.name", "a.xml"),
            raw("good", "D", "X.name", "a.xml"),
        ]);
        assert_eq!(report.sentinel_cleared, 1);
        assert_eq!(report.invalid_cleared, 2);
        assert_eq!(report.auto_assigned, 3);
        assert!(cat.iter().all(|e| !e.id.is_empty() && e.id != "!"));
        assert!(cat.get("good", "D").is_some());
    }

    #[test]
    fn convert_exclam_keeps_sentinels_verbatim() {
        let p = NormalizePolicy {
            convert_exclam: true,
            ..policy()
        };
        let (cat, report) = IdentifierNormalizer::new(&p, None)
            .normalize(vec![raw("*", "A", "X.name", "a.xml"), raw("?", "B", "X.name", "a.xml")]);
        assert!(cat.get("*", "A").is_some());
        assert!(cat.get("?", "B").is_some());
        assert_eq!(report.auto_assigned, 0);
        assert!(report.collisions.is_empty());
    }

    #[test]
    fn smallest_real_id_wins_within_group() {
        let p = policy();
        let (cat, _) = IdentifierNormalizer::new(&p, None).normalize(vec![
            raw("zeta", "Hi", "X.name", "a.xml"),
            raw("", "Hi", "X.name", "b.xml"),
            raw("alpha", "Hi", "X.name", "c.xml"),
        ]);
        assert_eq!(cat.len(), 1);
        assert_eq!(cat.entries()[0].id, "alpha");
        assert_eq!(cat.entries()[0].locations.len(), 3);
    }

    #[test]
    fn file_mode_keeps_files_apart() {
        let p = NormalizePolicy {
            how_distinct: HowDistinct::File,
            keep_redundancies: true,
            ..policy()
        };
        let (cat, _) = IdentifierNormalizer::new(&p, None).normalize(vec![
            raw("", "Hi", "X.name", "a.xml"),
            raw("", "Hi", "X.name", "a.xml"),
            raw("", "Hi", "X.name", "b.xml"),
        ]);
        assert_eq!(cat.len(), 2);
        let a = cat.iter().find(|e| e.file == "a.xml").unwrap();
        assert_eq!(a.locations, vec![Location { file: "a.xml".into(), count: 2 }]);
    }

    #[test]
    fn all_mode_without_redundancies_merges_same_digest() {
        let p = NormalizePolicy {
            how_distinct: HowDistinct::All,
            ..policy()
        };
        let (cat, report) = IdentifierNormalizer::new(&p, None).normalize(vec![
            raw("", "Hi", "X.name", "a.xml"),
            raw("", "Hi", "X.name", "b.xml"),
        ]);
        assert_eq!(report.missing_ids, 2);
        assert_eq!(cat.len(), 1);

        let p = NormalizePolicy {
            keep_redundancies: true,
            ..p
        };
        let (cat, _) = IdentifierNormalizer::new(&p, None).normalize(vec![
            raw("", "Hi", "X.name", "a.xml"),
            raw("", "Hi", "X.name", "b.xml"),
        ]);
        assert_eq!(cat.len(), 2);
    }

    #[test]
    fn normalization_is_idempotent() {
        let p = policy();
        let base = BaselineReference::from_pairs([("foo", "Old")]);
        let n = IdentifierNormalizer::new(&p, Some(&base));
        let input = vec![
            raw("", "Hello", "X.name", "a.xml"),
            raw("foo", "New", "X.name", "a.xml"),
            raw("k", "Kept", "Y.text", "b.xml"),
            raw("", "Hello", "X.name", "c.xml"),
        ];
        let (once, _) = n.normalize(input);
        let (twice, report) = n.normalize(once.entries().to_vec());
        assert_eq!(once.entries(), twice.entries());
        assert_eq!(report.auto_assigned, 0);
    }

    #[test]
    fn distinct_texts_get_distinct_ids_and_collisions_are_reported() {
        let p = policy();
        let (cat, report) = IdentifierNormalizer::new(&p, None).normalize(
            (0..200)
                .map(|i| raw("", &format!("text {i}"), "X.name", "a.xml"))
                .chain([
                    raw("dup", "One", "X.name", "a.xml"),
                    raw("dup", "Two", "Y.name", "a.xml"),
                ])
                .collect(),
        );
        let mut ids: Vec<_> = cat.iter().filter(|e| e.id != "dup").map(|e| e.id.clone()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 200);
        assert_eq!(report.collisions.len(), 1);
        assert_eq!(report.collisions[0].id, "dup");
    }

    #[test]
    fn digest_is_stable_and_sized() {
        let a = autoid_digest("X.namenameHello", 8);
        assert_eq!(a, autoid_digest("X.namenameHello", 8));
        assert_eq!(a.len(), 8);
        assert_eq!(autoid_digest("x", 100).len(), 32);
        assert_eq!(autoid_digest("x", 0).len(), 1);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn how_distinct_parses() {
        assert_eq!("FILE".parse::<HowDistinct>().unwrap(), HowDistinct::File);
        assert!("nope".parse::<HowDistinct>().is_err());
    }
}
