use std::path::PathBuf;

use modloc_config::ModlocConfig;
use modloc_domain::RunSummary;
use modloc_normalize::HowDistinct;
use modloc_services::{MergeMode, ProviderKind};

use super::{print_json, report_outputs, OutputFormat};

/// Extract a module's strings, assign ids, carry over translations and write the catalog,
/// rewritten content and language files.
#[derive(clap::Args, Debug, Clone)]
pub struct ImportArgs {
    /// Module folder name, e.g. `Native` or a mod's module.
    pub module: String,

    /// Game install folder (contains `Modules/`).
    #[arg(long)]
    pub game_dir: Option<PathBuf>,
    /// Folder searched for mod modules when the game does not ship the module.
    #[arg(long)]
    pub mods_dir: Option<PathBuf>,
    /// The module's output folder; defaults to `<paths.output_dir or Mods>/<module>`.
    #[arg(long)]
    pub output_dir: Option<PathBuf>,
    /// Previous catalog to take translations from; defaults to `<output>/<module>.po`.
    #[arg(long)]
    pub pofile: Option<PathBuf>,
    /// Baseline CSV of ids the game already ships.
    #[arg(long)]
    pub baseline: Option<PathBuf>,
    /// Previous catalog uses `module/file/id/text` keys and may prefix translations with `[id]`.
    #[arg(long)]
    pub legacy_catalog: bool,

    /// Language folder name below `Languages/`.
    #[arg(long)]
    pub language_code: Option<String>,
    /// Language id written to manifests.
    #[arg(long)]
    pub language_id: Option<String>,

    /// Duplicate grouping: context, file or all.
    #[arg(long)]
    pub how_distinct: Option<HowDistinct>,
    /// Translation lookup: none, id, text or both.
    #[arg(long)]
    pub merge_mode: Option<MergeMode>,
    /// Translation sources by priority, e.g. `language-files,catalog`.
    #[arg(long, value_delimiter = ',')]
    pub provider_order: Vec<ProviderKind>,
    /// Keep ids the game already uses even when the text differs.
    #[arg(long)]
    pub keep_vanilla_id: bool,
    /// Keep `!`, `*` and `?` ids instead of treating them as missing.
    #[arg(long)]
    pub convert_exclam: bool,
    /// Give every duplicate occurrence its own id.
    #[arg(long)]
    pub keep_redundancies: bool,
    #[arg(long)]
    pub autoid_prefix: Option<String>,
    #[arg(long)]
    pub autoid_digits: Option<usize>,
    /// Ids matching this pattern are treated as missing.
    #[arg(long)]
    pub id_exclude_regex: Option<String>,
    /// Untranslated entries get the source text instead of an empty translation.
    #[arg(long)]
    pub fill_source: bool,
    /// Ignore the module's existing language files as a translation source.
    #[arg(long)]
    pub drop_original_language: bool,
    /// Leave stale files in the output folder alone.
    #[arg(long)]
    pub dont_clean: bool,
    /// One language file per source document instead of a single file.
    #[arg(long)]
    pub split_files: bool,
    /// Write untranslated entries to the language files too.
    #[arg(long)]
    pub output_blank: bool,

    /// Report what would be written without touching the disk.
    #[arg(long)]
    pub dry_run: bool,
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

pub fn run_import(args: ImportArgs, cfg: &ModlocConfig) -> color_eyre::Result<()> {
    tracing::debug!(event = "import_args", args = ?args);
    let settings = crate::settings::import_settings(&args, cfg)?;
    let summary = modloc_services::run_import(&settings)?;

    if args.format == OutputFormat::Json {
        return print_json(&summary);
    }
    print_summary(&summary);
    Ok(())
}

fn print_summary(s: &RunSummary) {
    crate::ui_info!(
        "{}: {} files scanned, {} strings found",
        s.module,
        s.scan.files_scanned,
        s.scan.entries
    );
    for skipped in &s.scan.skipped {
        crate::ui_warn!("skipped {}: {}", skipped.path, skipped.reason);
    }
    let n = &s.normalize;
    crate::ui_info!(
        "{}/{} entries changed",
        s.rewrite.entries_changed,
        s.rewrite.entries_total
    );
    crate::ui_info!("{} duplicates dropped", n.duplicates_collapsed);
    crate::ui_info!("{} new ids assigned", n.auto_assigned);
    if n.baseline_available {
        crate::ui_info!("{} ids reused from baseline and reset", n.reused_reset);
        crate::ui_info!("{} entries already shipped by the game", n.baseline_dropped);
    }
    if !n.collisions.is_empty() {
        crate::ui_warn!("{} id collisions", n.collisions.len());
    }
    for c in &n.collisions {
        crate::ui_warn!("id {} has {} different texts", c.id, c.texts.len());
    }
    let r = &s.reconcile;
    crate::ui_info!(
        "translations: {} by id, {} by text, {} missing, {} need review",
        r.matched_by_id,
        r.matched_by_text,
        r.unmatched,
        r.needs_review
    );
    if !s.scan.skipped.is_empty() {
        crate::ui_warn!("{} files skipped", s.scan.skipped.len());
    }
    report_outputs(&s.outputs, s.dry_run);
    if !s.dry_run {
        crate::ui_ok!("import of {} done", s.module);
    }
}
