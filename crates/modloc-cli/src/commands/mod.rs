pub mod baseline;
pub mod compile;
pub mod export;
pub mod import;
pub mod merge;
pub mod schema;

use modloc_domain::OutputFile;
use serde::Serialize;

/// How a command reports its summary on stdout.
#[derive(clap::ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

pub(crate) fn print_json<T: Serialize>(value: &T) -> color_eyre::Result<()> {
    serde_json::to_writer(std::io::stdout().lock(), value)?;
    println!();
    Ok(())
}

pub(crate) fn report_outputs(outputs: &[OutputFile], dry_run: bool) {
    for out in outputs {
        match (&out.backup, dry_run) {
            (_, true) => crate::ui_info!("would write {}", out.path),
            (Some(bak), false) => crate::ui_ok!("wrote {} (previous kept as {})", out.path, bak),
            (None, false) => crate::ui_ok!("wrote {}", out.path),
        }
    }
}
