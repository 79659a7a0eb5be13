mod commands;
mod settings;
mod ui;

use std::io::IsTerminal;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::eyre::Result;
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use commands::baseline::BaselineArgs;
use commands::compile::CompileArgs;
use commands::export::ExportArgs;
use commands::import::ImportArgs;
use commands::merge::MergeArgs;
use commands::schema::SchemaArgs;

#[derive(Parser)]
#[command(
    name = "modloc",
    version,
    about = "Extract, identify and carry over translatable strings of game modules"
)]
struct Cli {
    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,
    /// Only print warnings and errors
    #[arg(long, short, global = true)]
    quiet: bool,
    /// Debug logging on the console
    #[arg(long, short, global = true)]
    verbose: bool,
    /// Config file to use instead of the default search
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan a module, assign ids and produce its catalog and language files
    Import(ImportArgs),
    /// Write language files from an edited catalog
    Export(ExportArgs),
    /// Build the table of ids already shipped by the game
    Baseline(BaselineArgs),
    /// Merge all catalogs of a folder
    Merge(MergeArgs),
    /// Compile a .po catalog into .mo
    Compile(CompileArgs),
    /// Dump JSON schemas of the machine-readable outputs
    Schema(SchemaArgs),
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Import(_) => "import",
            Commands::Export(_) => "export",
            Commands::Baseline(_) => "baseline",
            Commands::Merge(_) => "merge",
            Commands::Compile(_) => "compile",
            Commands::Schema(_) => "schema",
        }
    }
}

fn init_tracing(verbose: bool, quiet: bool) -> WorkerGuard {
    let file_appender = rolling::daily("logs", "modloc.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let default_level = match (verbose, quiet) {
        (true, _) => "debug",
        (false, true) => "warn",
        (false, false) => "info",
    };
    // stdout is reserved for command output
    let console_layer = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        );

    let file_layer = fmt::layer()
        .with_ansi(false)
        .with_target(true)
        .with_writer(file_writer)
        .with_filter(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .init();
    guard
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    let _guard = init_tracing(cli.verbose, cli.quiet);

    let use_color = !cli.no_color
        && std::io::stdout().is_terminal()
        && std::env::var_os("NO_COLOR").is_none();
    ui::init(use_color, cli.quiet);

    let cfg = modloc_config::load_config(cli.config.as_deref())?;

    let name = cli.cmd.name();
    info!(event = "command_start", command = name);
    let result = match cli.cmd {
        Commands::Import(args) => commands::import::run_import(args, &cfg),
        Commands::Export(args) => commands::export::run_export(args, &cfg),
        Commands::Baseline(args) => commands::baseline::run_baseline(args, &cfg),
        Commands::Merge(args) => commands::merge::run_merge(args),
        Commands::Compile(args) => commands::compile::run_compile(args),
        Commands::Schema(args) => commands::schema::run_schema(args),
    };

    match &result {
        Ok(()) => info!(event = "command_done", command = name),
        Err(e) => error!(event = "command_failed", command = name, error = %e),
    }
    result
}
