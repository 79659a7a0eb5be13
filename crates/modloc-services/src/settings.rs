//! Resolved run settings. The CLI builds these once from defaults, config file and flags.

use std::path::PathBuf;

use modloc_core::BaseLanguageInfo;
use modloc_normalize::NormalizePolicy;
use modloc_parsers_xml::{ExtractionRule, LANGUAGES_DIR};

use crate::reconcile::{Fallback, MergeMode, ProviderKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageSettings {
    /// Folder below `Languages/`, e.g. `JP`.
    pub code: String,
    /// Id declared in manifests and language files, e.g. `日本語`.
    pub id: String,
    /// Module whose manifest declares the language itself.
    pub base_module: Option<String>,
    pub base_info: BaseLanguageInfo,
}

impl Default for LanguageSettings {
    fn default() -> Self {
        Self {
            code: "EN".into(),
            id: "English".into(),
            base_module: None,
            base_info: BaseLanguageInfo::default(),
        }
    }
}

impl LanguageSettings {
    pub fn base_for(&self, module: &str) -> Option<BaseLanguageInfo> {
        if self.base_module.as_deref() != Some(module) {
            return None;
        }
        let mut info = self.base_info.clone();
        if info.name.is_empty() {
            info.name = self.id.clone();
        }
        Some(info)
    }
}

/// Where one module's generated files go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    pub root: PathBuf,
    pub module: String,
}

impl OutputLayout {
    pub fn new(root: impl Into<PathBuf>, module: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            module: module.into(),
        }
    }

    pub fn po(&self) -> PathBuf {
        self.root.join(format!("{}.po", self.module))
    }

    pub fn csv(&self) -> PathBuf {
        self.root.join(format!("{}.csv", self.module))
    }

    pub fn module_data(&self) -> PathBuf {
        self.root.join(&self.module).join("ModuleData")
    }

    pub fn languages(&self) -> PathBuf {
        self.module_data().join(LANGUAGES_DIR)
    }
}

#[derive(Debug, Clone)]
pub struct ImportSettings {
    pub module: String,
    pub game_dir: Option<PathBuf>,
    pub mods_dir: Option<PathBuf>,
    pub output: OutputLayout,
    pub language: LanguageSettings,
    pub rules: Vec<ExtractionRule>,
    pub policy: NormalizePolicy,
    pub merge_mode: MergeMode,
    pub fallback: Fallback,
    /// Which historical source wins when several translate the same entry.
    pub provider_order: Vec<ProviderKind>,
    /// Explicit previous catalog; otherwise the one in the output folder is used if present.
    pub pofile: Option<PathBuf>,
    pub baseline: Option<PathBuf>,
    pub legacy_catalog: bool,
    pub drop_original_language: bool,
    pub dont_clean: bool,
    pub split_files: bool,
    pub output_blank: bool,
    pub dry_run: bool,
}

#[derive(Debug, Clone)]
pub struct ExportSettings {
    pub module: String,
    pub output: OutputLayout,
    pub language: LanguageSettings,
    pub pofile: Option<PathBuf>,
    pub legacy_catalog: bool,
    pub split_files: bool,
    pub output_blank: bool,
    pub dry_run: bool,
}
