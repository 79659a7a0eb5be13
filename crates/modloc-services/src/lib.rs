//! High-level orchestration over the lower-level crates. The CLI only talks to this layer.

pub mod catalogs;
pub mod export;
pub mod manifest;
pub mod pipeline;
pub mod reconcile;
pub mod rewrite;
pub mod settings;
pub mod util;

pub use catalogs::{
    compile_catalog, default_merge_output, extract_baseline, merge_catalogs, BaselineSource,
};
pub use export::export_language_files;
pub use modloc_core::Result;
pub use pipeline::run_import;
pub use reconcile::{
    provider_priority, Fallback, MergeMode, Provider, ProviderKind, ReconciliationEngine,
};
pub use settings::{ExportSettings, ImportSettings, LanguageSettings, OutputLayout};
pub use util::resolve_module_data;
