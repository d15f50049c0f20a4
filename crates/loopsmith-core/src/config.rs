use std::path::{Path, PathBuf};

use loopsmith_ir::{LocalFsModuleResolver, ModuleCache, ModuleResolver};
use serde::Deserialize;

use crate::error::ConfigError;

pub const DEFAULT_RESERVED_PREFIX: &str = "lsm";

/// Settings shared by every transformation of a run.
///
/// ```toml
/// reserved-prefix = "lsm"
/// max-columns = 80
/// module-search-paths = ["build/modules", "$HOME/.loopsmith/modules"]
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct TranslatorConfig {
    /// First word of every pragma handled by loopsmith.
    pub reserved_prefix: String,
    /// Pragmas longer than this are split into continuation pragmas. No wrapping when unset.
    pub max_columns: Option<usize>,
    /// Module directories, searched in order. Empty means the resolver defaults.
    pub module_search_paths: Vec<PathBuf>,
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            reserved_prefix: DEFAULT_RESERVED_PREFIX.to_string(),
            max_columns: None,
            module_search_paths: Vec::new(),
        }
    }
}

impl TranslatorConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;

        if config.reserved_prefix.trim().is_empty() || config.reserved_prefix.contains(char::is_whitespace) {
            return Err(ConfigError::Parse(format!(
                "reserved-prefix must be a single word, got `{}`",
                config.reserved_prefix
            )));
        }

        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::IOError {
            path: path.to_string_lossy().into_owned().into(),
            message: e.to_string(),
        })?;

        log::debug!("Loaded config from {}", path.display());
        Self::from_toml_str(&text)
    }

    /// A module cache searching `module_search_paths`, or the resolver defaults when empty.
    pub fn module_cache(&self) -> ModuleCache {
        let mut resolver = LocalFsModuleResolver::default();
        if !self.module_search_paths.is_empty() {
            resolver.set_search_paths(self.module_search_paths.clone());
        }

        ModuleCache::new(resolver)
    }
}
