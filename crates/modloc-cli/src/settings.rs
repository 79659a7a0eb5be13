//! Defaults, then `modloc.toml`, then flags: resolved once into the service settings.

use std::path::{Path, PathBuf};

use color_eyre::eyre::Result;
use modloc_config::ModlocConfig;
use modloc_core::ids::default_autoid_prefix;
use modloc_core::BaseLanguageInfo;
use modloc_normalize::{HowDistinct, NormalizePolicy, DEFAULT_AUTOID_DIGITS};
use modloc_parsers_xml::{default_rules, ExtractionRule};
use modloc_services::{
    ExportSettings, Fallback, ImportSettings, LanguageSettings, MergeMode, OutputLayout,
    ProviderKind,
};

use crate::commands::export::ExportArgs;
use crate::commands::import::ImportArgs;

pub const DEFAULT_OUTPUT_ROOT: &str = "Mods";
pub const DEFAULT_BASELINE: &str = "baseline.csv";

pub fn language(cfg: &ModlocConfig, code: Option<&str>, id: Option<&str>) -> LanguageSettings {
    let lc = cfg.language.clone().unwrap_or_default();
    let defaults = LanguageSettings::default();
    let code = code
        .map(str::to_string)
        .or(lc.code)
        .unwrap_or(defaults.code);
    let id = id
        .map(str::to_string)
        .or(lc.id)
        .unwrap_or_else(|| code.clone());
    LanguageSettings {
        base_info: BaseLanguageInfo {
            name: lc.name.unwrap_or_default(),
            subtitle_extension: lc.subtitle_extension,
            supported_iso: lc.supported_iso.unwrap_or_default(),
        },
        base_module: lc.base_module,
        code,
        id,
    }
}

/// `--output-dir` is the module's own folder; `paths.output_dir` is shared by all modules.
pub fn output_layout(cfg: &ModlocConfig, flag: Option<&Path>, module: &str) -> OutputLayout {
    let root = match flag {
        Some(p) => p.to_path_buf(),
        None => cfg
            .paths
            .as_ref()
            .and_then(|p| p.output_dir.as_deref())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_ROOT))
            .join(module),
    };
    OutputLayout::new(root, module)
}

pub fn rules(cfg: &ModlocConfig) -> Vec<ExtractionRule> {
    let Some(scan) = &cfg.scan else {
        return default_rules();
    };
    // configured rules go first so they win over the wildcards
    let mut rules: Vec<ExtractionRule> = scan
        .rules
        .iter()
        .flatten()
        .map(|r| ExtractionRule::new(&r.selector, &r.context, &r.attribute))
        .collect();
    if !scan.replace_default_rules.unwrap_or(false) {
        rules.extend(default_rules());
    }
    rules
}

fn path_or(flag: Option<&PathBuf>, cfg: Option<&String>) -> Option<PathBuf> {
    flag.cloned().or_else(|| cfg.map(PathBuf::from))
}

pub fn baseline_path(cfg: &ModlocConfig) -> Option<PathBuf> {
    cfg.paths
        .as_ref()
        .and_then(|p| p.baseline.as_ref())
        .map(PathBuf::from)
}

pub fn game_dir(cfg: &ModlocConfig, flag: Option<&PathBuf>) -> Option<PathBuf> {
    path_or(flag, cfg.paths.as_ref().and_then(|p| p.game_dir.as_ref()))
}

pub fn import_settings(args: &ImportArgs, cfg: &ModlocConfig) -> Result<ImportSettings> {
    let ic = cfg.import.clone().unwrap_or_default();
    let ec = cfg.export.clone().unwrap_or_default();
    let paths = cfg.paths.clone().unwrap_or_default();

    let how_distinct = match (&args.how_distinct, &ic.how_distinct) {
        (Some(h), _) => *h,
        (None, Some(s)) => s.parse::<HowDistinct>()?,
        (None, None) => HowDistinct::default(),
    };
    let merge_mode = match (&args.merge_mode, &ic.merge_mode) {
        (Some(m), _) => *m,
        (None, Some(s)) => s.parse::<MergeMode>()?,
        (None, None) => MergeMode::default(),
    };
    let provider_order = if !args.provider_order.is_empty() {
        args.provider_order.clone()
    } else {
        ic.provider_order
            .iter()
            .flatten()
            .map(|s| s.parse::<ProviderKind>())
            .collect::<Result<Vec<_>, _>>()?
    };

    let mut policy = NormalizePolicy {
        keep_vanilla_id: args.keep_vanilla_id || ic.keep_vanilla_id.unwrap_or(false),
        how_distinct,
        convert_exclam: args.convert_exclam || ic.convert_exclam.unwrap_or(false),
        id_exclude_pattern: None,
        keep_redundancies: args.keep_redundancies || ic.keep_redundancies.unwrap_or(false),
        autoid_prefix: args
            .autoid_prefix
            .clone()
            .or(ic.autoid_prefix)
            .unwrap_or_else(|| default_autoid_prefix(&args.module)),
        autoid_digits: args
            .autoid_digits
            .or(ic.autoid_digits)
            .unwrap_or(DEFAULT_AUTOID_DIGITS),
    };
    if let Some(pattern) = args.id_exclude_regex.as_ref().or(ic.id_exclude_regex.as_ref()) {
        policy = policy.with_exclude_pattern(pattern)?;
    }

    let fill_source = args.fill_source || ic.fill_source.unwrap_or(false);
    Ok(ImportSettings {
        module: args.module.clone(),
        game_dir: game_dir(cfg, args.game_dir.as_ref()),
        mods_dir: path_or(args.mods_dir.as_ref(), paths.mods_dir.as_ref()),
        output: output_layout(cfg, args.output_dir.as_deref(), &args.module),
        language: language(
            cfg,
            args.language_code.as_deref(),
            args.language_id.as_deref(),
        ),
        rules: rules(cfg),
        policy,
        merge_mode,
        fallback: if fill_source {
            Fallback::Source
        } else {
            Fallback::Empty
        },
        provider_order,
        pofile: args.pofile.clone(),
        baseline: path_or(args.baseline.as_ref(), paths.baseline.as_ref()),
        legacy_catalog: args.legacy_catalog,
        drop_original_language: args.drop_original_language
            || ic.drop_original_language.unwrap_or(false),
        dont_clean: args.dont_clean || ic.dont_clean.unwrap_or(false),
        split_files: args.split_files || ec.split_files.unwrap_or(false),
        output_blank: args.output_blank || ec.output_blank.unwrap_or(false),
        dry_run: args.dry_run,
    })
}

pub fn export_settings(args: &ExportArgs, cfg: &ModlocConfig) -> ExportSettings {
    let ec = cfg.export.clone().unwrap_or_default();
    ExportSettings {
        module: args.module.clone(),
        output: output_layout(cfg, args.output_dir.as_deref(), &args.module),
        language: language(
            cfg,
            args.language_code.as_deref(),
            args.language_id.as_deref(),
        ),
        pofile: args.pofile.clone(),
        legacy_catalog: args.legacy_catalog,
        split_files: args.split_files || ec.split_files.unwrap_or(false),
        output_blank: args.output_blank || ec.output_blank.unwrap_or(false),
        dry_run: args.dry_run,
    }
}
