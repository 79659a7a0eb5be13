use color_eyre::eyre::{eyre, Result};
use modloc_core::MODLOC_SCHEMA_VERSION;
use modloc_domain::ExportSummary;
use modloc_import_po::{mo_twin, read_catalog};

use crate::manifest::plan_language_files;
use crate::settings::ExportSettings;
use crate::util::{apply_writes, planned_outputs};

/// Turn a translation catalog into language files and a manifest inside the output module.
pub fn export_language_files(settings: &ExportSettings) -> Result<ExportSummary> {
    let po = settings
        .pofile
        .clone()
        .unwrap_or_else(|| settings.output.po());
    if !po.is_file() && !mo_twin(&po).is_file() {
        return Err(eyre!("catalog not found: {}", po.display()));
    }
    let read = read_catalog(&po, settings.legacy_catalog)?;
    let entries = read.entries;

    let plan = plan_language_files(
        &entries,
        &settings.language,
        &settings.module,
        settings.split_files,
        settings.output_blank,
        &settings.output.languages(),
    )?;
    let outputs = if settings.dry_run {
        planned_outputs(&plan.writes)
    } else {
        apply_writes(&plan.writes)?
    };
    tracing::info!(
        event = "export_done",
        module = %settings.module,
        entries = entries.len(),
        files = plan.report.files.len()
    );

    Ok(ExportSummary {
        schema_version: MODLOC_SCHEMA_VERSION,
        module: settings.module.clone(),
        catalog: read.source.display().to_string(),
        entries: entries.len(),
        skipped_blank: plan.skipped_blank,
        manifest: plan.report,
        outputs,
    })
}
