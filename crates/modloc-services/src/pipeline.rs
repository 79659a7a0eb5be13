//! Scan -> normalize -> reconcile -> write, with every output computed before the first write.

use std::collections::HashSet;
use std::path::PathBuf;

use color_eyre::eyre::{eyre, Result};
use modloc_core::{BaselineReference, MODLOC_SCHEMA_VERSION};
use modloc_domain::RunSummary;
use modloc_export_csv::render_csv;
use modloc_export_po::render_po;
use modloc_import_po::{mo_twin, read_baseline_csv, read_catalog};
use modloc_normalize::IdentifierNormalizer;
use modloc_parsers_xml::{read_language_stream, scan_module_data};

use crate::manifest::plan_language_files;
use crate::reconcile::{provider_priority, Provider, ProviderKind, ReconciliationEngine};
use crate::rewrite::plan_rewrites;
use crate::settings::ImportSettings;
use crate::util::{
    apply_writes, planned_outputs, resolve_module_data, rotate_stale, stale_outputs, PendingWrite,
};

fn load_baseline(path: Option<&PathBuf>) -> Result<Option<BaselineReference>> {
    match path {
        Some(p) if p.is_file() => Ok(Some(read_baseline_csv(p)?)),
        Some(p) => {
            tracing::warn!(event = "baseline_missing", path = %p.display());
            Ok(None)
        }
        None => Ok(None),
    }
}

/// Explicit catalog must exist; the default one is optional.
fn previous_catalog(settings: &ImportSettings) -> Result<Option<PathBuf>> {
    if let Some(p) = &settings.pofile {
        if !p.is_file() && !mo_twin(p).is_file() {
            return Err(eyre!("catalog not found: {}", p.display()));
        }
        return Ok(Some(p.clone()));
    }
    let default = settings.output.po();
    Ok((default.is_file() || mo_twin(&default).is_file()).then_some(default))
}

/// Run the full import for one module.
pub fn run_import(settings: &ImportSettings) -> Result<RunSummary> {
    let module_data = resolve_module_data(
        &settings.module,
        settings.game_dir.as_deref(),
        settings.mods_dir.as_deref(),
    )?;
    tracing::info!(event = "import_start", module = %settings.module, module_data = %module_data.display());

    let mut scan = scan_module_data(&module_data, &settings.rules)?;

    let baseline = load_baseline(settings.baseline.as_ref())?;
    let normalizer = IdentifierNormalizer::new(&settings.policy, baseline.as_ref());
    let (catalog, normalize) = normalizer.normalize(std::mem::take(&mut scan.entries));

    let mut from_catalog = None;
    if let Some(path) = previous_catalog(settings)? {
        let read = read_catalog(&path, settings.legacy_catalog)?;
        from_catalog = Some(Provider::from_entries(
            read.source.display().to_string(),
            read.entries,
        ));
    }
    let mut from_language_files = None;
    if !settings.drop_original_language {
        let stream = read_language_stream(
            &module_data,
            &settings.language.id,
            &settings.language.code,
        );
        scan.report.language_records = stream.records.len();
        scan.report.language_duplicates = stream.duplicates;
        scan.report.skipped.extend(stream.skipped.iter().cloned());
        if !stream.is_empty() {
            from_language_files = Some(Provider::from_language_stream(
                format!("{}/{}", settings.language.code, settings.language.id),
                &stream,
            ));
        }
    }
    let mut providers = Vec::new();
    for kind in provider_priority(&settings.provider_order) {
        let provider = match kind {
            ProviderKind::Catalog => from_catalog.take(),
            ProviderKind::LanguageFiles => from_language_files.take(),
        };
        providers.extend(provider);
    }
    tracing::debug!(
        event = "providers_ordered",
        providers = ?providers.iter().map(|p| p.name.as_str()).collect::<Vec<_>>()
    );
    let engine = ReconciliationEngine::new(&providers, settings.merge_mode, settings.fallback);
    let (catalog, reconcile) = engine.reconcile(catalog);

    let out = &settings.output;
    let mut writes = vec![
        PendingWrite::new(
            out.po(),
            render_po(catalog.entries(), Some(settings.language.code.as_str())),
        ),
        PendingWrite::new(out.csv(), render_csv(catalog.entries(), baseline.as_ref())?),
    ];
    let (rewrites, rewrite) =
        plan_rewrites(&module_data, &out.module_data(), &settings.rules, &catalog);
    writes.extend(rewrites);
    let language = plan_language_files(
        catalog.entries(),
        &settings.language,
        &settings.module,
        settings.split_files,
        settings.output_blank,
        &out.languages(),
    )?;
    writes.extend(language.writes);

    let keep: HashSet<PathBuf> = writes.iter().map(|w| w.path.clone()).collect();
    let stale = if settings.dont_clean {
        Vec::new()
    } else {
        stale_outputs(&out.module_data(), &keep)
    };

    let outputs = if settings.dry_run {
        for p in &stale {
            tracing::info!(event = "stale_planned", path = %p.display());
        }
        planned_outputs(&writes)
    } else {
        let mut written = apply_writes(&writes)?;
        written.extend(rotate_stale(&stale)?);
        written
    };

    tracing::info!(
        event = "import_done",
        module = %settings.module,
        entries = catalog.len(),
        outputs = outputs.len(),
        dry_run = settings.dry_run
    );
    Ok(RunSummary {
        schema_version: MODLOC_SCHEMA_VERSION,
        module: settings.module.clone(),
        dry_run: settings.dry_run,
        scan: scan.report,
        normalize,
        reconcile,
        rewrite,
        manifest: language.report,
        outputs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconcile::{Fallback, MergeMode};
    use crate::settings::{LanguageSettings, OutputLayout};
    use modloc_normalize::NormalizePolicy;
    use modloc_parsers_xml::default_rules;
    use std::fs;
    use std::path::Path;

    fn write(root: &Path, rel: &str, body: &str) {
        let p = root.join(rel);
        fs::create_dir_all(p.parent().unwrap()).unwrap();
        fs::write(p, body).unwrap();
    }

    fn settings(game: &Path, out: &Path) -> ImportSettings {
        ImportSettings {
            module: "Mod".into(),
            game_dir: Some(game.to_path_buf()),
            mods_dir: None,
            output: OutputLayout::new(out, "Mod"),
            language: LanguageSettings {
                code: "JP".into(),
                id: "日本語".into(),
                ..LanguageSettings::default()
            },
            rules: default_rules(),
            policy: NormalizePolicy {
                autoid_prefix: "Mod".into(),
                ..NormalizePolicy::default()
            },
            merge_mode: MergeMode::Both,
            fallback: Fallback::Empty,
            provider_order: ProviderKind::DEFAULT_ORDER.to_vec(),
            pofile: None,
            baseline: None,
            legacy_catalog: false,
            drop_original_language: false,
            dont_clean: false,
            split_files: false,
            output_blank: false,
            dry_run: false,
        }
    }

    fn module(game: &Path) {
        write(
            game,
            "Modules/Mod/ModuleData/items.xml",
            r#"<Items><Item id="i1" name="{=sword_1}Sword"/><Item id="i2" name="Shield"/></Items>"#,
        );
        write(
            game,
            "Modules/Mod/ModuleData/Languages/JP/strings.xml",
            r#"<base><strings><string id="sword_1" text="剣"/></strings></base>"#,
        );
    }

    #[test]
    fn full_run_writes_catalog_content_and_manifest() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let game = dir.path().join("game");
        let out = dir.path().join("out");
        module(&game);

        let summary = run_import(&settings(&game, &out))?;
        assert_eq!(summary.scan.files_scanned, 1);
        assert_eq!(summary.scan.language_records, 1);
        assert_eq!(summary.normalize.auto_assigned, 1);
        assert_eq!(summary.reconcile.matched_by_id, 1);
        assert_eq!(summary.rewrite.entries_changed, 1);

        let po = fs::read_to_string(out.join("Mod.po"))?;
        assert!(po.contains(r#"msgid "sword_1/Sword""#));
        assert!(po.contains(r#"msgstr "剣""#));
        assert!(out.join("Mod.csv").is_file());

        let items = fs::read_to_string(out.join("Mod/ModuleData/items.xml"))?;
        assert!(items.contains(r#"name="{=sword_1}Sword""#));
        assert!(items.contains(r#"name="{=Mod"#));
        let strings = fs::read_to_string(out.join("Mod/ModuleData/Languages/JP/strings-JP.xml"))?;
        assert!(strings.contains(r#"<string id="sword_1" text="剣"/>"#));
        assert!(out
            .join("Mod/ModuleData/Languages/JP/language_data.xml")
            .is_file());

        let source = fs::read_to_string(game.join("Modules/Mod/ModuleData/items.xml"))?;
        assert!(!source.contains("{=Mod"));
        Ok(())
    }

    #[test]
    fn ids_are_written_back_into_attributes_with_line_breaks() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let game = dir.path().join("game");
        let out = dir.path().join("out");
        write(
            &game,
            "Modules/Mod/ModuleData/items.xml",
            "<Items>\n  <Item id=\"a\" text=\"Line one\nLine two\"/>\n  <Item id=\"b\" text=\"Tab\there\"/>\n</Items>",
        );

        let summary = run_import(&settings(&game, &out))?;
        assert_eq!(summary.normalize.auto_assigned, 2);
        assert_eq!(summary.rewrite.entries_total, 2);
        assert_eq!(summary.rewrite.entries_changed, 2);

        let po = fs::read_to_string(out.join("Mod.po"))?;
        let rescanned = scan_module_data(&out.join("Mod/ModuleData"), &default_rules())?;
        let texts: Vec<_> = rescanned
            .entries
            .iter()
            .filter(|e| e.context == "Item.text")
            .collect();
        assert_eq!(texts.len(), 2);
        for e in texts {
            assert!(e.id.starts_with("Mod"), "{e:?}");
            assert!(po.contains(&format!("msgid \"{}/{}\"", e.id, e.text_source)));
        }
        Ok(())
    }

    #[test]
    fn provider_order_decides_conflicting_translations() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let game = dir.path().join("game");
        module(&game);
        let previous = {
            let mut e = modloc_core::Entry::translated("sword_1", "Sword", Some("旧剣".into()));
            e.context = "Item.name".into();
            e.needs_review = false;
            e
        };

        let mut winners = Vec::new();
        for order in [vec![], vec![ProviderKind::LanguageFiles]] {
            let out = dir.path().join(format!("out{}", order.len()));
            fs::create_dir_all(&out)?;
            modloc_export_po::write_po(&out.join("Mod.po"), &[previous.clone()], Some("JP"))?;
            let mut s = settings(&game, &out);
            s.provider_order = order;
            let summary = run_import(&s)?;
            assert_eq!(summary.reconcile.provider_conflicts, 1);
            let strings =
                fs::read_to_string(out.join("Mod/ModuleData/Languages/JP/strings-JP.xml"))?;
            winners.push(strings.contains(r#"text="剣""#));
        }
        assert_eq!(winners, vec![false, true]);
        Ok(())
    }

    #[test]
    fn second_run_is_stable_and_backs_up() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let game = dir.path().join("game");
        let out = dir.path().join("out");
        module(&game);
        let s = settings(&game, &out);

        run_import(&s)?;
        let first = fs::read_to_string(out.join("Mod.po"))?;
        let again = run_import(&s)?;
        let second = fs::read_to_string(out.join("Mod.po"))?;
        let body = |s: &str| s.lines().filter(|l| !l.starts_with('"')).collect::<Vec<_>>().join("\n");
        assert_eq!(body(&first), body(&second));
        assert!(again.outputs.iter().any(|o| o.backup.is_some()));
        assert!(out.join("BAK").is_dir());
        Ok(())
    }

    #[test]
    fn dry_run_touches_nothing() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let game = dir.path().join("game");
        let out = dir.path().join("out");
        module(&game);
        let mut s = settings(&game, &out);
        s.dry_run = true;
        let summary = run_import(&s)?;
        assert!(!summary.outputs.is_empty());
        assert!(!out.exists());
        Ok(())
    }

    #[test]
    fn unknown_module_fails_before_writing() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        let mut s = settings(dir.path(), &out);
        s.module = "Ghost".into();
        assert!(run_import(&s).is_err());
        assert!(!out.exists());
    }

    #[test]
    fn stale_generated_files_are_rotated() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let game = dir.path().join("game");
        let out = dir.path().join("out");
        module(&game);
        write(&out, "Mod/ModuleData/removed.xml", "<R/>");
        run_import(&settings(&game, &out))?;
        assert!(!out.join("Mod/ModuleData/removed.xml").exists());
        assert!(out.join("Mod/ModuleData/BAK").is_dir());
        Ok(())
    }
}
