use std::path::PathBuf;

use super::{print_json, report_outputs, OutputFormat};

/// Combine every catalog in a folder into one.
#[derive(clap::Args, Debug, Clone)]
pub struct MergeArgs {
    /// Folder holding the `.po` files.
    pub dir: PathBuf,
    /// Defaults to `merged-<timestamp>.po`; a `.mo` extension writes a binary catalog.
    #[arg(long)]
    pub output: Option<PathBuf>,
    /// Keep entries that have no translation.
    #[arg(long)]
    pub keep_blank: bool,
    /// Also read `.mo` files that have no `.po` next to them.
    #[arg(long)]
    pub read_mo: bool,
    #[arg(long)]
    pub dry_run: bool,
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

pub fn run_merge(args: MergeArgs) -> color_eyre::Result<()> {
    tracing::debug!(event = "merge_args", args = ?args);
    let summary = modloc_services::merge_catalogs(
        &args.dir,
        args.output.as_deref(),
        args.keep_blank,
        args.read_mo,
        args.dry_run,
    )?;

    if args.format == OutputFormat::Json {
        return print_json(&summary);
    }
    for input in &summary.inputs {
        crate::ui_info!("read {input}");
    }
    crate::ui_info!(
        "{} entries merged, {} blank skipped",
        summary.entries,
        summary.skipped_blank
    );
    report_outputs(summary.output.as_slice(), args.dry_run);
    Ok(())
}
