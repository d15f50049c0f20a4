use std::{borrow::Cow, fs, path::PathBuf};

use crate::module::{MODULE_FILE_EXTENSION, error::ModuleError};

const DEFAULT_PATHS: [&str; 2] = ["$ORIGIN", "$HOME/.loopsmith/modules"];

pub trait ModuleResolver: Clone + Default {
    fn resolve(&self, module_name: &str) -> Result<String, ModuleError>;
    fn get_path(&self, module_name: &str) -> Result<PathBuf, ModuleError>;
    fn search_paths(&self) -> Vec<PathBuf>;
    fn set_search_paths(&mut self, paths: Vec<PathBuf>);
}

pub fn module_file_name(name: &str) -> String {
    format!("{}{}", name.to_ascii_lowercase(), MODULE_FILE_EXTENSION)
}

/// Looks module files up in an ordered list of directories, first match wins.
#[derive(Debug, Clone, Default)]
pub struct LocalFsModuleResolver {
    pub(crate) paths: Option<Vec<PathBuf>>,
}

impl ModuleResolver for LocalFsModuleResolver {
    fn resolve(&self, module_name: &str) -> Result<String, ModuleError> {
        let file_path = search(module_name, &self.paths)?;
        fs::read_to_string(&file_path).map_err(|e| {
            log::warn!("Cannot read module file {}: {}", file_path.display(), e);
            ModuleError::IOError(Cow::Owned(format!("{}: {}", file_path.display(), e)))
        })
    }

    fn get_path(&self, module_name: &str) -> Result<PathBuf, ModuleError> {
        search(module_name, &self.paths)
    }

    fn search_paths(&self) -> Vec<PathBuf> {
        self.paths
            .clone()
            .unwrap_or_else(|| DEFAULT_PATHS.iter().map(PathBuf::from).collect())
    }

    fn set_search_paths(&mut self, paths: Vec<PathBuf>) {
        self.paths = if paths.is_empty() { None } else { Some(paths) };
    }
}

impl LocalFsModuleResolver {
    pub fn new(paths: Option<Vec<PathBuf>>) -> Self {
        Self { paths }
    }
}

fn search(name: &str, search_paths: &Option<Vec<PathBuf>>) -> Result<PathBuf, ModuleError> {
    let home = dirs::home_dir()
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_default();
    let origin = std::env::current_dir()
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_default();
    let file_name = module_file_name(name);

    search_paths
        .as_ref()
        .map(|paths| paths.iter().map(|p| p.to_string_lossy().to_string()).collect::<Vec<_>>())
        .unwrap_or_else(|| DEFAULT_PATHS.iter().map(|p| p.to_string()).collect())
        .iter()
        .map(|path| {
            PathBuf::from(path.replace("$ORIGIN", &origin).replace("$HOME", &home)).join(&file_name)
        })
        .find(|p| p.is_file())
        .ok_or_else(|| ModuleError::NotFound(Cow::Owned(name.to_string())))
}
