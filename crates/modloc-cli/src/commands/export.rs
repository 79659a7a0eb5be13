use std::path::PathBuf;

use modloc_config::ModlocConfig;

use super::{print_json, report_outputs, OutputFormat};

/// Regenerate language files and the manifest from an edited catalog.
#[derive(clap::Args, Debug, Clone)]
pub struct ExportArgs {
    pub module: String,
    /// The module's output folder; defaults to `<paths.output_dir or Mods>/<module>`.
    #[arg(long)]
    pub output_dir: Option<PathBuf>,
    /// Catalog to export; defaults to `<output>/<module>.po` (or its `.mo`).
    #[arg(long)]
    pub pofile: Option<PathBuf>,
    #[arg(long)]
    pub legacy_catalog: bool,
    #[arg(long)]
    pub language_code: Option<String>,
    #[arg(long)]
    pub language_id: Option<String>,
    #[arg(long)]
    pub split_files: bool,
    #[arg(long)]
    pub output_blank: bool,
    #[arg(long)]
    pub dry_run: bool,
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

pub fn run_export(args: ExportArgs, cfg: &ModlocConfig) -> color_eyre::Result<()> {
    tracing::debug!(event = "export_args", args = ?args);
    let settings = crate::settings::export_settings(&args, cfg);
    let summary = modloc_services::export_language_files(&settings)?;

    if args.format == OutputFormat::Json {
        return print_json(&summary);
    }
    crate::ui_info!(
        "{}: {} entries from {} ({} blank skipped)",
        summary.module,
        summary.entries,
        summary.catalog,
        summary.skipped_blank
    );
    for f in &summary.manifest.files {
        crate::ui_info!("{}: {} strings", f.path, f.strings);
    }
    report_outputs(&summary.outputs, args.dry_run);
    Ok(())
}
