//! Fill translations of a normalized catalog from historical sources.

use std::fmt;
use std::str::FromStr;

use modloc_core::{Catalog, Entry, ModlocError};
use modloc_domain::ReconcileReport;
use modloc_parsers_xml::LanguageStream;

/// Which keys are used to look up historical translations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MergeMode {
    None,
    Id,
    Text,
    /// Id across all providers first, then text.
    #[default]
    Both,
}

impl FromStr for MergeMode {
    type Err = ModlocError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "id" => Ok(Self::Id),
            "text" => Ok(Self::Text),
            "both" => Ok(Self::Both),
            other => Err(ModlocError::InvalidPolicy(format!(
                "merge mode must be one of none, id, text, both (got `{other}`)"
            ))),
        }
    }
}

impl fmt::Display for MergeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::None => "none",
            Self::Id => "id",
            Self::Text => "text",
            Self::Both => "both",
        })
    }
}

/// What an unmatched entry's translation becomes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Fallback {
    #[default]
    Empty,
    Source,
}

/// Kind of historical source, used to order providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    /// Previous translation catalog (PO or its MO twin).
    Catalog,
    /// Translations shipped in the module's own `Languages/<code>` files.
    LanguageFiles,
}

impl ProviderKind {
    pub const DEFAULT_ORDER: [ProviderKind; 2] = [ProviderKind::Catalog, ProviderKind::LanguageFiles];
}

impl FromStr for ProviderKind {
    type Err = ModlocError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "catalog" => Ok(Self::Catalog),
            "language_files" => Ok(Self::LanguageFiles),
            other => Err(ModlocError::InvalidPolicy(format!(
                "provider must be one of catalog, language-files (got `{other}`)"
            ))),
        }
    }
}

/// Full priority order: `preferred` first without repeats, then any kind it left out in the
/// default order.
pub fn provider_priority(preferred: &[ProviderKind]) -> Vec<ProviderKind> {
    let mut order: Vec<ProviderKind> = Vec::with_capacity(ProviderKind::DEFAULT_ORDER.len());
    for kind in preferred.iter().chain(ProviderKind::DEFAULT_ORDER.iter()) {
        if !order.contains(kind) {
            order.push(*kind);
        }
    }
    order
}

/// One historical source of translations. Only records with a non-empty translation are kept.
#[derive(Debug, Clone)]
pub struct Provider {
    pub name: String,
    catalog: Catalog,
}

impl Provider {
    pub fn from_entries(name: impl Into<String>, entries: Vec<Entry>) -> Self {
        let mut b = Catalog::builder();
        b.extend(entries.into_iter().filter(|e| e.translation().is_some()));
        Self {
            name: name.into(),
            catalog: b.build(),
        }
    }

    /// Shipped language files carry no source text, so their records are always flagged.
    pub fn from_language_stream(name: impl Into<String>, stream: &LanguageStream) -> Self {
        let entries = stream
            .records
            .iter()
            .map(|r| {
                let mut e = Entry::translated(&r.id, "", Some(r.text.clone()));
                e.file = r.file.clone();
                e.needs_review = true;
                e
            })
            .collect();
        Self::from_entries(name, entries)
    }

    pub fn len(&self) -> usize {
        self.catalog.len()
    }

    pub fn is_empty(&self) -> bool {
        self.catalog.is_empty()
    }

    /// Same id; a record with the same source text is preferred.
    fn by_id(&self, e: &Entry) -> Option<&Entry> {
        let mut candidates = self.catalog.with_id(&e.id);
        let first = candidates.next()?;
        if first.text_source == e.text_source {
            return Some(first);
        }
        candidates
            .find(|c| c.text_source == e.text_source)
            .or(Some(first))
    }

    /// Same source text; a record with the same id is preferred, then the smallest id.
    fn by_text(&self, e: &Entry) -> Option<&Entry> {
        let mut candidates = self.catalog.with_text(&e.text_source);
        let first = candidates.next()?;
        if first.id == e.id {
            return Some(first);
        }
        candidates.find(|c| c.id == e.id).or(Some(first))
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Strategy {
    Id,
    Text,
}

pub struct ReconciliationEngine<'a> {
    providers: &'a [Provider],
    mode: MergeMode,
    fallback: Fallback,
}

impl<'a> ReconciliationEngine<'a> {
    /// `providers` are in priority order.
    pub fn new(providers: &'a [Provider], mode: MergeMode, fallback: Fallback) -> Self {
        Self {
            providers,
            mode,
            fallback,
        }
    }

    pub fn reconcile(&self, catalog: Catalog) -> (Catalog, ReconcileReport) {
        let mut report = ReconcileReport {
            total: catalog.len(),
            ..ReconcileReport::default()
        };
        let strategies: &[Strategy] = match self.mode {
            MergeMode::None => &[],
            MergeMode::Id => &[Strategy::Id],
            MergeMode::Text => &[Strategy::Text],
            MergeMode::Both => &[Strategy::Id, Strategy::Text],
        };

        let mut builder = Catalog::builder();
        for mut e in catalog.into_entries() {
            let found = strategies
                .iter()
                .find_map(|&s| self.lookup(&e, s).map(|m| (s, m)));
            match found {
                Some((strategy, matched)) => {
                    match strategy {
                        Strategy::Id => report.matched_by_id += 1,
                        Strategy::Text => report.matched_by_text += 1,
                    }
                    if self.has_conflict(&e, strategy, matched) {
                        report.provider_conflicts += 1;
                        tracing::debug!(event = "provider_conflict", id = %e.id);
                    }
                    let exact = matched.id == e.id
                        && matched.text_source == e.text_source
                        && !matched.needs_review;
                    e.text_target = matched.text_target.clone();
                    e.needs_review = !exact;
                    for note in &matched.notes {
                        if !e.notes.contains(note) {
                            e.notes.push(note.clone());
                        }
                    }
                    if exact {
                        report.exact += 1;
                    }
                }
                None => {
                    report.unmatched += 1;
                    e.needs_review = true;
                    e.text_target = match self.fallback {
                        Fallback::Empty => None,
                        Fallback::Source => {
                            report.filled_from_source += 1;
                            Some(e.text_source.clone())
                        }
                    };
                }
            }
            if e.needs_review {
                report.needs_review += 1;
            }
            builder.push(e);
        }

        tracing::info!(
            event = "reconcile_done",
            total = report.total,
            by_id = report.matched_by_id,
            by_text = report.matched_by_text,
            unmatched = report.unmatched,
            conflicts = report.provider_conflicts
        );
        (builder.build(), report)
    }

    fn lookup(&self, e: &Entry, strategy: Strategy) -> Option<&'a Entry> {
        self.providers.iter().find_map(|p| match strategy {
            Strategy::Id => p.by_id(e),
            Strategy::Text if !e.text_source.is_empty() => p.by_text(e),
            Strategy::Text => None,
        })
    }

    /// A lower-priority provider holding a different translation for the same key.
    fn has_conflict(&self, e: &Entry, strategy: Strategy, chosen: &Entry) -> bool {
        let mut hits = self.providers.iter().filter_map(|p| match strategy {
            Strategy::Id => p.by_id(e),
            Strategy::Text => p.by_text(e),
        });
        hits.next();
        hits.any(|other| other.translation() != chosen.translation())
    }
}
