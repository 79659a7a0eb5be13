use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SkippedFile {
    pub path: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct ScanReport {
    pub files_scanned: usize,
    pub entries: usize,
    pub language_records: usize,
    pub language_duplicates: usize,
    pub skipped: Vec<SkippedFile>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CollisionReport {
    pub id: String,
    pub texts: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct NormalizeReport {
    pub input: usize,
    /// Sentinel ids (`!`, `*`, `?`) treated as missing.
    pub sentinel_cleared: usize,
    /// Ids cleared for breaking the id grammar or matching the exclude pattern.
    pub invalid_cleared: usize,
    pub baseline_available: bool,
    /// Baseline ids reused with different text and reset.
    pub reused_reset: usize,
    /// Entries identical to baseline content and dropped.
    pub baseline_dropped: usize,
    pub duplicates_collapsed: usize,
    pub missing_ids: usize,
    pub auto_assigned: usize,
    pub output: usize,
    pub collisions: Vec<CollisionReport>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct ReconcileReport {
    pub total: usize,
    pub matched_by_id: usize,
    pub matched_by_text: usize,
    /// Matches with identical id and text from a reviewed record.
    pub exact: usize,
    pub unmatched: usize,
    pub filled_from_source: usize,
    /// Ids for which providers held different translations.
    pub provider_conflicts: usize,
    pub needs_review: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct RewriteReport {
    pub files_checked: usize,
    pub files_changed: usize,
    pub entries_total: usize,
    pub entries_changed: usize,
    pub files: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ManifestFileStat {
    pub path: String,
    pub strings: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct ManifestReport {
    pub language_id: String,
    pub manifest: String,
    pub files: Vec<ManifestFileStat>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct OutputFile {
    pub path: String,
    /// Where the previous file at `path` was moved, if there was one.
    pub backup: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct RunSummary {
    pub schema_version: u32,
    pub module: String,
    pub dry_run: bool,
    pub scan: ScanReport,
    pub normalize: NormalizeReport,
    pub reconcile: ReconcileReport,
    pub rewrite: RewriteReport,
    pub manifest: ManifestReport,
    pub outputs: Vec<OutputFile>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct MergeSummary {
    pub inputs: Vec<String>,
    pub entries: usize,
    pub skipped_blank: usize,
    pub output: Option<OutputFile>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct ExportSummary {
    pub schema_version: u32,
    pub module: String,
    pub catalog: String,
    pub entries: usize,
    pub skipped_blank: usize,
    pub manifest: ManifestReport,
    pub outputs: Vec<OutputFile>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct BaselineSummary {
    /// Catalog path or module names the table was built from.
    pub sources: Vec<String>,
    pub ids: usize,
    pub pairs: usize,
    pub skipped: Vec<SkippedFile>,
    pub output: Option<OutputFile>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CompileSummary {
    pub input: String,
    pub entries: usize,
    /// Reviewed, non-empty translations written to the binary catalog.
    pub compiled: usize,
    pub output: Option<OutputFile>,
}
