use std::{fs, path::Path};

use crate::{DeclarationTable, IrError, NodeId, SymbolTable, Tree, TypeTable, Xcode, xattr, xml};

/// Read view shared by the unit being translated and the modules it imports from.
pub trait Unit {
    fn unit_name(&self) -> &str;
    fn tree(&self) -> &Tree;
    fn root(&self) -> NodeId;
    fn type_table(&self) -> &TypeTable;
    fn symbols(&self) -> &SymbolTable;
    fn declarations(&self) -> &DeclarationTable;
}

/// One translation unit rooted at `XcodeProgram`.
#[derive(Debug, Clone)]
pub struct Program {
    tree: Tree,
    root: NodeId,
    type_table: TypeTable,
    global_symbols: SymbolTable,
    global_declarations: DeclarationTable,
}

impl Program {
    pub fn from_xml(text: &str) -> Result<Self, IrError> {
        let (tree, root) = xml::parse(text)?;
        Self::from_tree(tree, root)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, IrError> {
        let text = fs::read_to_string(path.as_ref()).map_err(|e| IrError::IOError(e.to_string()))?;
        Self::from_xml(&text)
    }

    pub fn from_tree(tree: Tree, root: NodeId) -> Result<Self, IrError> {
        let [types, symbols, declarations] = required_tables(&tree, root)?;

        Ok(Self {
            type_table: TypeTable::from_node(&tree, types),
            global_symbols: SymbolTable::from_node(&tree, symbols),
            global_declarations: DeclarationTable::from_node(&tree, declarations),
            tree,
            root,
        })
    }

    /// Re-checks the whole-unit structure before any transformation touches the tree.
    pub fn validate(&self) -> Result<(), IrError> {
        required_tables(&self.tree, self.root).map(|_| ())
    }

    pub fn to_xml(&self) -> Result<String, IrError> {
        xml::write(&self.tree, self.root)
    }

    #[inline(always)]
    pub fn root(&self) -> NodeId {
        self.root
    }

    #[inline(always)]
    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    #[inline(always)]
    pub fn tree_mut(&mut self) -> &mut Tree {
        &mut self.tree
    }

    pub fn type_table(&self) -> &TypeTable {
        &self.type_table
    }

    pub fn type_table_mut(&mut self) -> &mut TypeTable {
        &mut self.type_table
    }

    /// Splits the borrow for edits that touch both the tree and the type table.
    pub fn parts_mut(&mut self) -> (&mut Tree, &mut TypeTable) {
        (&mut self.tree, &mut self.type_table)
    }

    /// Splits the borrow for edits that append to the global symbols and declarations.
    pub fn globals_mut(&mut self) -> (&mut Tree, &mut SymbolTable, &mut DeclarationTable) {
        (&mut self.tree, &mut self.global_symbols, &mut self.global_declarations)
    }

    pub fn global_symbols(&self) -> &SymbolTable {
        &self.global_symbols
    }

    pub fn global_declarations(&self) -> &DeclarationTable {
        &self.global_declarations
    }

    pub fn version(&self) -> Option<&str> {
        self.tree.attr(self.root, xattr::VERSION)
    }

    pub fn language(&self) -> Option<&str> {
        self.tree.attr(self.root, xattr::LANGUAGE)
    }

    pub fn compiler_info(&self) -> Option<&str> {
        self.tree.attr(self.root, xattr::COMPILER_INFO)
    }

    pub fn time(&self) -> Option<&str> {
        self.tree.attr(self.root, xattr::TIME)
    }

    pub fn source(&self) -> Option<&str> {
        self.tree.attr(self.root, xattr::SOURCE)
    }
}

impl Unit for Program {
    fn unit_name(&self) -> &str {
        self.source().unwrap_or("<unknown>")
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
        &self.global_symbols
    }

    fn declarations(&self) -> &DeclarationTable {
        &self.global_declarations
    }
}

fn required_tables(tree: &Tree, root: NodeId) -> Result<[NodeId; 3], IrError> {
    if !tree.is(root, Xcode::XcodeProgram) {
        return Err(IrError::UnexpectedRoot {
            expected: Xcode::XcodeProgram.code(),
            found: tree.tag_name(root).into(),
        });
    }

    let table = |opcode: Xcode| {
        tree.match_direct_descendant(root, opcode)
            .ok_or(IrError::MissingTable(opcode.code()))
    };

    Ok([
        table(Xcode::TypeTable)?,
        table(Xcode::GlobalSymbols)?,
        table(Xcode::GlobalDeclarations)?,
    ])
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::wrong_root("<OmniFortranModule/>")]
    #[case::no_type_table("<XcodeProgram><globalSymbols/><globalDeclarations/></XcodeProgram>")]
    #[case::no_symbols("<XcodeProgram><typeTable/><globalDeclarations/></XcodeProgram>")]
    #[case::no_declarations("<XcodeProgram><typeTable/><globalSymbols/></XcodeProgram>")]
    fn test_from_xml_rejects_malformed_units(#[case] text: &str) {
        assert!(Program::from_xml(text).is_err());
    }

    #[test]
    fn test_validate_after_table_removal() {
        let mut program = Program::from_xml(
            "<XcodeProgram><typeTable/><globalSymbols/><globalDeclarations/></XcodeProgram>",
        )
        .unwrap();
        assert!(program.validate().is_ok());

        let types = program.type_table().node().unwrap();
        program.tree_mut().delete(types);
        assert_eq!(program.validate(), Err(IrError::MissingTable("typeTable")));
    }
}
