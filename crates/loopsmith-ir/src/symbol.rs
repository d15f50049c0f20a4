use rustc_hash::FxHashMap;
use smol_str::SmolStr;

use crate::{NodeId, Tree, Xcode, xattr};

#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
    pub name: SmolStr,
    pub type_id: Option<SmolStr>,
    pub sclass: Option<SmolStr>,
    pub node: NodeId,
}

impl Symbol {
    fn from_node(tree: &Tree, id: NodeId) -> Option<Self> {
        if !tree.is(id, Xcode::Id) {
            return None;
        }
        let name = tree.match_direct_descendant(id, Xcode::Name)?;

        Some(Symbol {
            name: SmolStr::new(tree.value(name)),
            type_id: tree.type_id(id).map(SmolStr::new),
            sclass: tree.attr(id, xattr::SCLASS).map(SmolStr::new),
            node: id,
        })
    }
}

/// Ordered `id` entries of a `globalSymbols`, `symbols` or `identifiers` element.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    node: Option<NodeId>,
    symbols: Vec<Symbol>,
}

impl SymbolTable {
    pub fn from_node(tree: &Tree, node: NodeId) -> Self {
        let symbols = tree
            .children(node)
            .iter()
            .filter_map(|id| Symbol::from_node(tree, *id))
            .collect();

        Self {
            node: Some(node),
            symbols,
        }
    }

    pub fn node(&self) -> Option<NodeId> {
        self.node
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.iter()
    }

    /// Names compare case-insensitively, like the source language does.
    pub fn get(&self, name: &str) -> Option<&Symbol> {
        self.symbols.iter().find(|s| s.name.eq_ignore_ascii_case(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Appends a detached `id` element to the table element and indexes it.
    ///
    /// Returns `None`, leaving `node` detached, when it is not a named `id` or the name is
    /// already taken.
    pub fn insert(&mut self, tree: &mut Tree, node: NodeId) -> Option<&Symbol> {
        let table = self.node?;
        let symbol = Symbol::from_node(tree, node).filter(|symbol| !self.contains(&symbol.name))?;

        tree.append(table, node);
        self.symbols.push(symbol);
        self.symbols.last()
    }
}

/// Declarations of a unit indexed by declared name.
#[derive(Debug, Clone, Default)]
pub struct DeclarationTable {
    node: Option<NodeId>,
    order: Vec<SmolStr>,
    declarations: FxHashMap<SmolStr, NodeId>,
}

impl DeclarationTable {
    pub fn from_node(tree: &Tree, node: NodeId) -> Self {
        let mut table = Self {
            node: Some(node),
            ..Self::default()
        };

        for child in tree.children(node) {
            match declared_name(tree, *child) {
                Some(key) => {
                    if table.declarations.insert(key.clone(), *child).is_none() {
                        table.order.push(key);
                    }
                }
                None => log::debug!("Skipping unnamed declaration `{}`", tree.tag_name(*child)),
            }
        }

        table
    }

    /// Appends a detached declaration to the table element. Unnamed declarations and names
    /// already declared are refused and `node` stays detached.
    pub fn insert(&mut self, tree: &mut Tree, node: NodeId) -> bool {
        let Some(table) = self.node else {
            return false;
        };
        let Some(key) = declared_name(tree, node).filter(|key| !self.declarations.contains_key(key)) else {
            return false;
        };

        tree.append(table, node);
        self.declarations.insert(key.clone(), node);
        self.order.push(key);
        true
    }

    pub fn node(&self) -> Option<NodeId> {
        self.node
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<NodeId> {
        self.declarations.get(name.to_ascii_lowercase().as_str()).copied()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(SmolStr::as_str)
    }
}

fn declared_name(tree: &Tree, declaration: NodeId) -> Option<SmolStr> {
    tree.match_direct_descendant(declaration, Xcode::Name)
        .map(|name| tree.value(name))
        .or_else(|| tree.attr(declaration, xattr::NAME))
        .filter(|name| !name.is_empty())
        .map(|name| SmolStr::new(name.to_ascii_lowercase()))
}
