use std::fs;
use std::path::PathBuf;

/// Write JSON schemas of the `--format json` outputs.
#[derive(clap::Args, Debug, Clone)]
pub struct SchemaArgs {
    #[arg(long, default_value = "schemas")]
    pub out_dir: PathBuf,
}

pub fn run_schema(args: SchemaArgs) -> color_eyre::Result<()> {
    tracing::debug!(event = "schema_args", out_dir = %args.out_dir.display());
    let out_dir = args.out_dir;
    fs::create_dir_all(&out_dir)?;
    macro_rules! dump {
        ($ty:ty, $name:literal) => {{
            let schema = schemars::schema_for!($ty);
            let path = out_dir.join($name);
            let f = std::fs::File::create(&path)?;
            serde_json::to_writer_pretty(f, &schema)?;
        }};
    }
    dump!(modloc_domain::RunSummary, "run_summary.schema.json");
    dump!(modloc_domain::ExportSummary, "export_summary.schema.json");
    dump!(modloc_domain::MergeSummary, "merge_summary.schema.json");
    dump!(modloc_domain::BaselineSummary, "baseline_summary.schema.json");
    dump!(modloc_domain::CompileSummary, "compile_summary.schema.json");
    crate::ui_ok!("schemas written to {}", out_dir.display());
    Ok(())
}
