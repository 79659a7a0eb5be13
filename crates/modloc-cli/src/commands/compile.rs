use std::path::PathBuf;

use super::{print_json, report_outputs, OutputFormat};

/// Compile a `.po` catalog into a `.mo` file.
#[derive(clap::Args, Debug, Clone)]
pub struct CompileArgs {
    pub po: PathBuf,
    /// Defaults to the `.po` path with a `.mo` extension.
    #[arg(long)]
    pub output: Option<PathBuf>,
    #[arg(long)]
    pub dry_run: bool,
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

pub fn run_compile(args: CompileArgs) -> color_eyre::Result<()> {
    tracing::debug!(event = "compile_args", args = ?args);
    let summary =
        modloc_services::compile_catalog(&args.po, args.output.as_deref(), args.dry_run)?;

    if args.format == OutputFormat::Json {
        return print_json(&summary);
    }
    crate::ui_info!(
        "{}: {} of {} entries compiled",
        summary.input,
        summary.compiled,
        summary.entries
    );
    report_outputs(summary.output.as_slice(), args.dry_run);
    Ok(())
}
