use rustc_hash::FxHashMap;
use smol_str::SmolStr;

use crate::{NodeId, Tree, Xcode, xattr};

const BUILTIN_TYPES: [&str; 8] = [
    "Fint",
    "Freal",
    "Fcomplex",
    "Flogical",
    "Fcharacter",
    "Fvoid",
    "Fnumeric",
    "FnumericAll",
];

/// Built-in type ids never have an entry in the type table.
pub fn is_builtin_type(type_id: &str) -> bool {
    BUILTIN_TYPES.contains(&type_id)
}

/// Declared data-flow direction of a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Intent {
    In,
    Out,
    InOut,
    /// Requested intent matching every declared one.
    Any,
    #[default]
    None,
}

impl Intent {
    pub fn from_attr(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
            Some("in") => Intent::In,
            Some("out") => Intent::Out,
            Some("inout") => Intent::InOut,
            _ => Intent::None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::In => "in",
            Intent::Out => "out",
            Intent::InOut => "inout",
            Intent::Any => "any",
            Intent::None => "",
        }
    }

    /// Whether a parameter declared with `declared` qualifies for this requested intent.
    pub fn is_compatible(&self, declared: Intent) -> bool {
        match self {
            Intent::In => matches!(declared, Intent::In | Intent::InOut),
            Intent::Out => matches!(declared, Intent::Out | Intent::InOut),
            Intent::InOut => matches!(declared, Intent::In | Intent::Out | Intent::InOut),
            Intent::Any => true,
            Intent::None => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BasicType {
    pub id: SmolStr,
    pub reference: Option<SmolStr>,
    pub intent: Intent,
    /// `indexRange`/`arrayIndex` children describing each dimension.
    pub dimensions: Vec<NodeId>,
    pub node: NodeId,
}

impl BasicType {
    #[inline(always)]
    pub fn is_array(&self) -> bool {
        !self.dimensions.is_empty()
    }

    pub fn dimension(&self, index: usize) -> Option<NodeId> {
        self.dimensions.get(index).copied()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: SmolStr,
    pub type_id: SmolStr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionType {
    pub id: SmolStr,
    pub return_type: Option<SmolStr>,
    pub params: Vec<Param>,
    pub is_pure: bool,
    pub node: NodeId,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeEntry {
    Basic(BasicType),
    Function(FunctionType),
    Other { id: SmolStr, node: NodeId },
}

impl TypeEntry {
    pub fn id(&self) -> &str {
        match self {
            TypeEntry::Basic(t) => &t.id,
            TypeEntry::Function(t) => &t.id,
            TypeEntry::Other { id, .. } => id,
        }
    }

    pub fn node(&self) -> NodeId {
        match self {
            TypeEntry::Basic(t) => t.node,
            TypeEntry::Function(t) => t.node,
            TypeEntry::Other { node, .. } => *node,
        }
    }

    fn from_node(tree: &Tree, node: NodeId) -> Option<Self> {
        let id = SmolStr::new(tree.type_id(node)?);

        Some(match tree.opcode(node) {
            Xcode::BasicType => TypeEntry::Basic(BasicType {
                id,
                reference: tree.attr(node, xattr::REF).map(SmolStr::new),
                intent: Intent::from_attr(tree.attr(node, xattr::INTENT)),
                dimensions: tree
                    .children(node)
                    .iter()
                    .copied()
                    .filter(|child| matches!(tree.opcode(*child), Xcode::IndexRange | Xcode::ArrayIndex))
                    .collect(),
                node,
            }),
            Xcode::FunctionType => TypeEntry::Function(FunctionType {
                id,
                return_type: tree.attr(node, xattr::RETURN_TYPE).map(SmolStr::new),
                params: tree
                    .match_direct_descendant(node, Xcode::Params)
                    .map(|params| {
                        tree.children(params)
                            .iter()
                            .filter(|p| tree.is(**p, Xcode::Name))
                            .map(|p| Param {
                                name: SmolStr::new(tree.value(*p)),
                                type_id: SmolStr::new(tree.type_id(*p).unwrap_or_default()),
                            })
                            .collect()
                    })
                    .unwrap_or_default(),
                is_pure: tree.bool_attr(node, xattr::IS_PURE),
                node,
            }),
            _ => TypeEntry::Other { id, node },
        })
    }
}

/// Index over the `typeTable` element of a unit.
#[derive(Debug, Clone, Default)]
pub struct TypeTable {
    node: Option<NodeId>,
    entries: Vec<TypeEntry>,
    index: FxHashMap<SmolStr, usize>,
}

impl TypeTable {
    pub fn from_node(tree: &Tree, node: NodeId) -> Self {
        let mut table = Self {
            node: Some(node),
            ..Self::default()
        };

        tree.children(node)
            .iter()
            .filter_map(|child| TypeEntry::from_node(tree, *child))
            .for_each(|entry| table.push(entry));

        table
    }

    fn push(&mut self, entry: TypeEntry) {
        match self.index.get(entry.id()) {
            Some(position) => self.entries[*position] = entry,
            None => {
                self.index.insert(SmolStr::new(entry.id()), self.entries.len());
                self.entries.push(entry);
            }
        }
    }

    pub fn node(&self) -> Option<NodeId> {
        self.node
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TypeEntry> {
        self.entries.iter()
    }

    pub fn contains(&self, type_id: &str) -> bool {
        self.index.contains_key(type_id)
    }

    pub fn get(&self, type_id: &str) -> Option<&TypeEntry> {
        self.index.get(type_id).map(|position| &self.entries[*position])
    }

    pub fn basic_type(&self, type_id: &str) -> Option<&BasicType> {
        match self.get(type_id) {
            Some(TypeEntry::Basic(t)) => Some(t),
            _ => None,
        }
    }

    pub fn function_type(&self, type_id: &str) -> Option<&FunctionType> {
        match self.get(type_id) {
            Some(TypeEntry::Function(t)) => Some(t),
            _ => None,
        }
    }

    pub fn is_basic_type(&self, type_id: &str) -> bool {
        self.basic_type(type_id).is_some()
    }

    /// Basic type of the `type` attribute carried by `node`.
    pub fn basic_type_of(&self, tree: &Tree, node: NodeId) -> Option<&BasicType> {
        tree.type_id(node).and_then(|type_id| self.basic_type(type_id))
    }

    /// Function type of a `functionCall` through the type of its `name` child.
    pub fn function_type_of_call(&self, tree: &Tree, call: NodeId) -> Option<&FunctionType> {
        if !tree.is(call, Xcode::FunctionCall) {
            return None;
        }

        tree.match_direct_descendant(call, Xcode::Name)
            .and_then(|name| tree.type_id(name))
            .or_else(|| tree.type_id(call))
            .and_then(|type_id| self.function_type(type_id))
    }

    /// Appends a type element to the table and indexes it.
    pub fn insert(&mut self, tree: &mut Tree, node: NodeId) -> Option<&TypeEntry> {
        let table = self.node?;
        let entry = TypeEntry::from_node(tree, node)?;
        let type_id = SmolStr::new(entry.id());

        tree.append(table, node);
        self.push(entry);
        self.get(&type_id)
    }

    /// Re-reads one entry after its element changed in place.
    pub fn refresh(&mut self, tree: &Tree, type_id: &str) {
        let Some(node) = self.get(type_id).map(TypeEntry::node) else {
            return;
        };

        match TypeEntry::from_node(tree, node) {
            Some(entry) => self.push(entry),
            None => log::warn!("Type entry `{}` is no longer readable", type_id),
        }
    }

    /// Derives an id not yet present in the table from `base`.
    pub fn fresh_id(&self, base: &str) -> SmolStr {
        (1..)
            .map(|n| SmolStr::new(format!("{}_{}", base, n)))
            .find(|candidate| !self.contains(candidate))
            .unwrap_or_else(|| SmolStr::new(base))
    }
}

#[cfg(test)]
mod tests {
    use rstest::{fixture, rstest};

    use super::*;
    use crate::xml;

    const TABLE: &str = r#"
      <typeTable>
        <FbasicType type="A1" ref="Freal" intent="in">
          <indexRange><lowerBound><FintConstant type="Fint">1</FintConstant></lowerBound><upperBound><Var type="Fint">n</Var></upperBound></indexRange>
          <indexRange is_assumed_shape="true"/>
        </FbasicType>
        <FbasicType type="I1" ref="Fint" intent="inout"/>
        <FbasicType type="R1" ref="Freal"/>
        <FfunctionType type="F1" return_type="Fvoid" is_pure="true">
          <params>
            <name type="A1">a</name>
            <name type="I1">b</name>
          </params>
        </FfunctionType>
        <FstructType type="S1"/>
      </typeTable>"#;

    #[fixture]
    fn table() -> (Tree, NodeId, TypeTable) {
        let (tree, root) = xml::parse(TABLE).unwrap();
        let table = TypeTable::from_node(&tree, root);
        (tree, root, table)
    }

    #[rstest]
    fn test_entries(table: (Tree, NodeId, TypeTable)) {
        let (_, _, table) = table;

        assert_eq!(table.len(), 5);
        let array = table.basic_type("A1").unwrap();
        assert!(array.is_array());
        assert_eq!(array.dimensions.len(), 2);
        assert_eq!(array.intent, Intent::In);
        assert!(!table.basic_type("I1").unwrap().is_array());
        assert_eq!(table.basic_type("R1").unwrap().intent, Intent::None);

        let function = table.function_type("F1").unwrap();
        assert!(function.is_pure);
        assert_eq!(function.params.len(), 2);
        assert_eq!(function.params[1].type_id, "I1");
        assert!(matches!(table.get("S1"), Some(TypeEntry::Other { .. })));
        assert!(table.get("Fint").is_none());
    }

    #[rstest]
    fn test_insert_and_fresh_id(table: (Tree, NodeId, TypeTable)) {
        let (mut tree, root, mut table) = table;
        let node = tree.new_node(Xcode::BasicType);
        let id = table.fresh_id("I1");
        tree.set_attr(node, xattr::TYPE, &id);
        tree.set_attr(node, xattr::REF, "Fint");

        assert_eq!(id, "I1_1");
        assert!(table.insert(&mut tree, node).is_some());
        assert_eq!(table.len(), 6);
        assert_eq!(tree.children(root).len(), 6);
        assert_eq!(table.fresh_id("I1"), "I1_2");
    }

    #[rstest]
    fn test_refresh(table: (Tree, NodeId, TypeTable)) {
        let (mut tree, _, mut table) = table;
        let node = table.function_type("F1").unwrap().node;

        tree.remove_attr(node, xattr::IS_PURE);
        table.refresh(&tree, "F1");
        assert!(!table.function_type("F1").unwrap().is_pure);
    }

    #[rstest]
    #[case(Intent::In, Intent::In, true)]
    #[case(Intent::In, Intent::InOut, true)]
    #[case(Intent::In, Intent::Out, false)]
    #[case(Intent::Out, Intent::Out, true)]
    #[case(Intent::Out, Intent::In, false)]
    #[case(Intent::InOut, Intent::Out, true)]
    #[case(Intent::InOut, Intent::None, false)]
    #[case(Intent::Any, Intent::None, true)]
    #[case(Intent::None, Intent::In, false)]
    fn test_is_compatible(#[case] requested: Intent, #[case] declared: Intent, #[case] expected: bool) {
        assert_eq!(requested.is_compatible(declared), expected);
    }

    #[rstest]
    #[case(Some("in"), Intent::In)]
    #[case(Some("OUT"), Intent::Out)]
    #[case(Some("inout"), Intent::InOut)]
    #[case(None, Intent::None)]
    fn test_from_attr(#[case] value: Option<&str>, #[case] expected: Intent) {
        assert_eq!(Intent::from_attr(value), expected);
    }

    #[test]
    fn test_is_builtin_type() {
        assert!(is_builtin_type("Fint"));
        assert!(!is_builtin_type("A1"));
    }
}
