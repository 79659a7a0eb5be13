use std::path::PathBuf;

use color_eyre::eyre::eyre;
use modloc_config::ModlocConfig;
use modloc_services::BaselineSource;

use super::{print_json, report_outputs, OutputFormat};

/// Build the table of ids the game already ships, used to keep mod ids from clashing with them.
#[derive(clap::Args, Debug, Clone)]
pub struct BaselineArgs {
    /// Take ids and texts from a catalog instead of scanning game modules.
    #[arg(long, conflicts_with = "modules")]
    pub from_catalog: Option<PathBuf>,
    #[arg(long, requires = "from_catalog")]
    pub legacy_catalog: bool,
    #[arg(long)]
    pub game_dir: Option<PathBuf>,
    /// Game module to scan; repeatable. All modules when omitted.
    #[arg(long = "module")]
    pub modules: Vec<String>,
    /// Defaults to `paths.baseline` or `baseline.csv`.
    #[arg(long)]
    pub output: Option<PathBuf>,
    #[arg(long)]
    pub dry_run: bool,
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

pub fn run_baseline(args: BaselineArgs, cfg: &ModlocConfig) -> color_eyre::Result<()> {
    tracing::debug!(event = "baseline_args", args = ?args);
    let source = match &args.from_catalog {
        Some(path) => BaselineSource::Catalog {
            path: path.clone(),
            legacy: args.legacy_catalog,
        },
        None => BaselineSource::Modules {
            game_dir: crate::settings::game_dir(cfg, args.game_dir.as_ref())
                .ok_or_else(|| eyre!("either --from-catalog or --game-dir is required"))?,
            modules: args.modules.clone(),
            rules: crate::settings::rules(cfg),
        },
    };
    let output = args
        .output
        .clone()
        .or_else(|| crate::settings::baseline_path(cfg))
        .unwrap_or_else(|| PathBuf::from(crate::settings::DEFAULT_BASELINE));
    let summary = modloc_services::extract_baseline(&source, &output, args.dry_run)?;

    if args.format == OutputFormat::Json {
        return print_json(&summary);
    }
    crate::ui_info!(
        "{} ids, {} id/text pairs from {}",
        summary.ids,
        summary.pairs,
        summary.sources.join(", ")
    );
    for skipped in &summary.skipped {
        crate::ui_warn!("skipped {}: {}", skipped.path, skipped.reason);
    }
    report_outputs(summary.output.as_slice(), args.dry_run);
    Ok(())
}
