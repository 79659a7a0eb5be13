use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "modloc.toml";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModlocConfig {
    pub paths: Option<PathsCfg>,
    pub language: Option<LanguageCfg>,
    pub import: Option<ImportCfg>,
    pub export: Option<ExportCfg>,
    pub scan: Option<ScanCfg>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathsCfg {
    pub game_dir: Option<String>,
    pub mods_dir: Option<String>,
    pub output_dir: Option<String>,
    pub baseline: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LanguageCfg {
    /// Folder name below `Languages/`, e.g. `JP`.
    pub code: Option<String>,
    /// Language id declared in manifests, e.g. `日本語`.
    pub id: Option<String>,
    pub name: Option<String>,
    pub subtitle_extension: Option<String>,
    pub supported_iso: Option<Vec<String>>,
    pub base_module: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImportCfg {
    pub merge_mode: Option<String>,
    /// Translation sources by priority: `catalog`, `language_files`.
    pub provider_order: Option<Vec<String>>,
    pub how_distinct: Option<String>,
    pub keep_vanilla_id: Option<bool>,
    pub convert_exclam: Option<bool>,
    pub dont_clean: Option<bool>,
    pub keep_redundancies: Option<bool>,
    pub autoid_prefix: Option<String>,
    pub autoid_digits: Option<usize>,
    pub id_exclude_regex: Option<String>,
    pub drop_original_language: Option<bool>,
    pub fill_source: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExportCfg {
    pub output_blank: Option<bool>,
    pub split_files: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RuleCfg {
    pub selector: String,
    pub context: String,
    pub attribute: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScanCfg {
    pub rules: Option<Vec<RuleCfg>>,
    /// Use only `rules` instead of appending them to the built-in set.
    pub replace_default_rules: Option<bool>,
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("cannot parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Parse one config file.
pub fn load_config_file(path: &Path) -> Result<ModlocConfig, ConfigError> {
    let s = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str::<ModlocConfig>(&s).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Load configuration. An explicit path must exist and parse. Otherwise the search order is
/// `./modloc.toml`, then `<config_dir>/modloc/modloc.toml`; earlier files win field by field
/// and unreadable discovered files are skipped with a warning.
pub fn load_config(explicit: Option<&Path>) -> Result<ModlocConfig, ConfigError> {
    if let Some(path) = explicit {
        return load_config_file(path);
    }
    let mut candidates = Vec::new();
    if let Ok(cwd) = std::env::current_dir() {
        candidates.push(cwd.join(CONFIG_FILE_NAME));
    }
    if let Some(base) = dirs::config_dir() {
        candidates.push(base.join("modloc").join(CONFIG_FILE_NAME));
    }

    let mut merged = ModlocConfig::default();
    for path in candidates.iter().filter(|p| p.is_file()) {
        match load_config_file(path) {
            Ok(cfg) => {
                tracing::debug!(event = "config_loaded", path = %path.display());
                merged = merge(merged, cfg);
            }
            Err(e) => tracing::warn!(event = "config_skipped", error = %e),
        }
    }
    Ok(merged)
}

fn merge(mut a: ModlocConfig, b: ModlocConfig) -> ModlocConfig {
    a.paths = merge_opt(a.paths, b.paths, merge_paths);
    a.language = merge_opt(a.language, b.language, merge_language);
    a.import = merge_opt(a.import, b.import, merge_import);
    a.export = merge_opt(a.export, b.export, merge_export);
    a.scan = merge_opt(a.scan, b.scan, merge_scan);
    a
}

fn merge_opt<T: Default>(a: Option<T>, b: Option<T>, f: fn(T, T) -> T) -> Option<T> {
    match (a, b) {
        (Some(a), Some(b)) => Some(f(a, b)),
        (None, Some(b)) => Some(b),
        (Some(a), None) => Some(a),
        (None, None) => None,
    }
}

macro_rules! fill {
    ($a:ident, $b:ident, $($field:ident),+ $(,)?) => {
        $( if $a.$field.is_none() { $a.$field = $b.$field; } )+
    };
}

fn merge_paths(mut a: PathsCfg, b: PathsCfg) -> PathsCfg {
    fill!(a, b, game_dir, mods_dir, output_dir, baseline);
    a
}

fn merge_language(mut a: LanguageCfg, b: LanguageCfg) -> LanguageCfg {
    fill!(a, b, code, id, name, subtitle_extension, supported_iso, base_module);
    a
}

fn merge_import(mut a: ImportCfg, b: ImportCfg) -> ImportCfg {
    fill!(
        a,
        b,
        merge_mode,
        provider_order,
        how_distinct,
        keep_vanilla_id,
        convert_exclam,
        dont_clean,
        keep_redundancies,
        autoid_prefix,
        autoid_digits,
        id_exclude_regex,
        drop_original_language,
        fill_source,
    );
    a
}

fn merge_export(mut a: ExportCfg, b: ExportCfg) -> ExportCfg {
    fill!(a, b, output_blank, split_files);
    a
}

fn merge_scan(mut a: ScanCfg, b: ScanCfg) -> ScanCfg {
    fill!(a, b, rules, replace_default_rules);
    a
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_all_sections() {
        let cfg: ModlocConfig = toml::from_str(
            r#"
[paths]
game_dir = "/games/mb2"
[language]
code = "JP"
id = "日本語"
supported_iso = ["ja", "jpn"]
[import]
how_distinct = "file"
autoid_digits = 8
[[scan.rules]]
selector = "Troop"
context = "Troop.name"
attribute = "name"
"#,
        )
        .unwrap();
        assert_eq!(cfg.paths.unwrap().game_dir.as_deref(), Some("/games/mb2"));
        assert_eq!(cfg.language.unwrap().supported_iso.unwrap().len(), 2);
        assert_eq!(cfg.import.unwrap().autoid_digits, Some(8));
        assert_eq!(cfg.scan.unwrap().rules.unwrap()[0].selector, "Troop");
    }

    #[test]
    fn earlier_file_wins_per_field() {
        let a: ModlocConfig = toml::from_str("[import]\nhow_distinct = \"file\"").unwrap();
        let b: ModlocConfig =
            toml::from_str("[import]\nhow_distinct = \"all\"\nconvert_exclam = true").unwrap();
        let m = merge(a, b).import.unwrap();
        assert_eq!(m.how_distinct.as_deref(), Some("file"));
        assert_eq!(m.convert_exclam, Some(true));
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config(Some(dir.path().join("nope.toml").as_path())).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
