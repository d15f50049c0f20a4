pub mod error;
pub mod resolver;

use std::{borrow::Cow, collections::hash_map::Entry, path::PathBuf};

use rustc_hash::FxHashMap;
use smol_str::SmolStr;

use crate::{
    DeclarationTable, IrError, NodeId, SymbolTable, Tree, TypeTable, Unit, Xcode,
    module::{
        error::ModuleError,
        resolver::{LocalFsModuleResolver, ModuleResolver},
    },
    xml,
};

pub const MODULE_FILE_EXTENSION: &str = ".xmod";

/// A separately compiled unit, read-only once loaded.
#[derive(Debug, Clone)]
pub struct Module {
    name: SmolStr,
    tree: Tree,
    root: NodeId,
    type_table: TypeTable,
    identifiers: SymbolTable,
    declarations: DeclarationTable,
}

impl Module {
    pub fn from_xml(name: &str, text: &str) -> Result<Self, ModuleError> {
        let invalid = |source: IrError| ModuleError::Invalid {
            name: Cow::Owned(name.to_string()),
            source,
        };

        let (tree, root) = xml::parse(text).map_err(invalid)?;
        if !tree.is(root, Xcode::OmniFortranModule) {
            return Err(invalid(IrError::UnexpectedRoot {
                expected: Xcode::OmniFortranModule.code(),
                found: tree.tag_name(root).into(),
            }));
        }

        let table = |opcode: Xcode| {
            tree.match_direct_descendant(root, opcode)
                .ok_or_else(|| invalid(IrError::MissingTable(opcode.code())))
        };
        let types = table(Xcode::TypeTable)?;
        let identifiers = table(Xcode::Identifiers)?;
        let declarations = table(Xcode::Declarations)?;

        Ok(Self {
            name: SmolStr::new(name),
            type_table: TypeTable::from_node(&tree, types),
            identifiers: SymbolTable::from_node(&tree, identifiers),
            declarations: DeclarationTable::from_node(&tree, declarations),
            tree,
            root,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Unit for Module {
    fn unit_name(&self) -> &str {
        &self.name
    }

    fn tree(&self) -> &Tree {
        &self.tree
    }

    fn root(&self) -> NodeId {
        self.root
    }

    fn type_table(&self) -> &TypeTable {
        &self.type_table
    }

    fn symbols(&self) -> &SymbolTable {
        &self.identifiers
    }

    fn declarations(&self) -> &DeclarationTable {
        &self.declarations
    }
}

impl<T: ModuleResolver> Default for ModuleCache<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

/// Modules loaded on first reference and kept for the rest of the run.
#[derive(Debug, Clone)]
pub struct ModuleCache<T: ModuleResolver = LocalFsModuleResolver> {
    modules: FxHashMap<SmolStr, Module>,
    resolver: T,
}

impl<T: ModuleResolver> ModuleCache<T> {
    pub fn new(resolver: T) -> Self {
        Self {
            modules: FxHashMap::default(),
            resolver,
        }
    }

    /// Returns the cached module, loading it through the resolver on first use.
    pub fn load(&mut self, module_name: &str) -> Result<&Module, ModuleError> {
        match self.modules.entry(cache_key(module_name)) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let code = self.resolver.resolve(module_name)?;
                let module = Module::from_xml(module_name, &code)?;
                log::debug!("Loaded module `{}`", module_name);
                Ok(entry.insert(module))
            }
        }
    }

    /// Registers an already parsed module, replacing nothing that was loaded before.
    pub fn insert(&mut self, module: Module) -> &Module {
        self.modules.entry(cache_key(module.name())).or_insert(module)
    }

    pub fn get(&self, module_name: &str) -> Option<&Module> {
        self.modules.get(cache_key(module_name).as_str())
    }

    pub fn is_loaded(&self, module_name: &str) -> bool {
        self.modules.contains_key(cache_key(module_name).as_str())
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    pub fn get_module_path(&self, module_name: &str) -> Result<PathBuf, ModuleError> {
        self.resolver.get_path(module_name)
    }

    pub fn search_paths(&self) -> Vec<PathBuf> {
        self.resolver.search_paths()
    }

    pub fn set_search_paths(&mut self, paths: Vec<PathBuf>) {
        self.resolver.set_search_paths(paths);
    }
}

#[inline(always)]
fn cache_key(module_name: &str) -> SmolStr {
    SmolStr::new(module_name.to_ascii_lowercase())
}
