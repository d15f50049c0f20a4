use loopsmith_ir::{NodeData, NodeId, Program, Symbol, Tree, Unit, Xcode, is_builtin_type, xattr};
use rustc_hash::FxHashSet;
use smol_str::SmolStr;

use crate::TransformError;

fn is_bound(tree: &Tree, node: NodeId) -> bool {
    matches!(tree.opcode(node), Xcode::LowerBound | Xcode::UpperBound)
}

fn is_const_or_var(opcode: Xcode) -> bool {
    opcode == Xcode::Var || opcode.is_constant()
}

/// Copies a bound within its own unit.
pub fn duplicate_bound_local(tree: &mut Tree, bound: NodeId) -> Result<NodeId, TransformError> {
    if !is_bound(tree, bound) {
        return Err(TransformError::Illegal("Cannot duplicate bound".to_string()));
    }

    tree.clone_node(bound)
        .ok_or_else(|| TransformError::Illegal("Cannot duplicate a deleted bound".to_string()))
}

/// Rebuilds a lower or upper bound of `src` inside `dst`.
///
/// Supported shapes are a constant, a variable, or a `plusExpr` of two of those. Every operand
/// and the types it refers to are checked before the first write, so a failure leaves `dst`
/// untouched. The returned bound is detached.
pub fn duplicate_bound<U: Unit>(src: &U, bound: NodeId, dst: &mut Program) -> Result<NodeId, TransformError> {
    let tree = src.tree();
    if !is_bound(tree, bound) {
        return Err(TransformError::Illegal("Cannot duplicate bound".to_string()));
    }

    let child = tree.first_child(bound).ok_or_else(|| {
        TransformError::Illegal("Cannot duplicate bound as it has no children element".to_string())
    })?;
    let unsupported = |node: NodeId| TransformError::UnsupportedBound(tree.tag_name(node).into());

    let (operands, is_sum) = match tree.opcode(child) {
        Xcode::PlusExpr => match tree.children(child) {
            [lhs, rhs] => (vec![*lhs, *rhs], true),
            _ => return Err(unsupported(child)),
        },
        opcode if is_const_or_var(opcode) => (vec![child], false),
        _ => return Err(unsupported(child)),
    };

    for operand in &operands {
        check_operand(src, *operand)?;
    }

    let imported = operands
        .iter()
        .map(|operand| import_const_or_var(src, *operand, dst))
        .collect::<Result<Vec<_>, _>>()?;

    let tree = dst.tree_mut();
    let new_bound = tree.new_node(src.tree().opcode(bound));
    let holder = if is_sum {
        let sum = tree.new_node(Xcode::PlusExpr);
        tree.append(new_bound, sum);
        sum
    } else {
        new_bound
    };
    for node in imported {
        tree.append(holder, node);
    }

    Ok(new_bound)
}

fn check_operand<U: Unit>(src: &U, node: NodeId) -> Result<(), TransformError> {
    let tree = src.tree();
    if !is_const_or_var(tree.opcode(node)) {
        return Err(TransformError::UnsupportedBound(tree.tag_name(node).into()));
    }

    if let Some(type_id) = tree.type_id(node) {
        check_type(src, type_id)?;
    }
    match source_symbol(src, node).and_then(|symbol| symbol.type_id.as_deref()) {
        Some(type_id) => check_type(src, type_id),
        None => Ok(()),
    }
}

/// The `id` entry a variable of `src` refers to.
fn source_symbol<U: Unit>(src: &U, node: NodeId) -> Option<&Symbol> {
    let tree = src.tree();
    tree.is(node, Xcode::Var)
        .then(|| src.symbols().get(tree.value(node)))
        .flatten()
}

fn check_type<U: Unit>(src: &U, type_id: &str) -> Result<(), TransformError> {
    let mut visited = FxHashSet::default();
    let mut current = Some(type_id);

    while let Some(type_id) = current.filter(|t| !is_builtin_type(t)) {
        if !visited.insert(type_id) {
            break;
        }
        let entry = src
            .type_table()
            .basic_type(type_id)
            .ok_or_else(|| missing_type(src, type_id))?;
        current = entry.reference.as_deref();
    }

    Ok(())
}

fn missing_type<U: Unit>(src: &U, type_id: &str) -> TransformError {
    TransformError::Illegal(format!("Type `{}` is not declared in `{}`", type_id, src.unit_name()))
}

/// Copies a constant or variable of `src` into `dst`, importing its type when needed.
///
/// A variable unknown to `dst` also brings its `id` entry and declaration along.
pub fn import_const_or_var<U: Unit>(src: &U, node: NodeId, dst: &mut Program) -> Result<NodeId, TransformError> {
    check_operand(src, node)?;

    let imported_type = match src.tree().type_id(node) {
        Some(type_id) => Some(import_type(src, type_id, dst)?),
        None => None,
    };
    if let Some(symbol) = source_symbol(src, node).filter(|symbol| !dst.global_symbols().contains(&symbol.name)) {
        import_symbol(src, symbol, dst)?;
    }

    let tree = dst.tree_mut();
    let copy = tree
        .import_node(src.tree(), node)
        .ok_or_else(|| TransformError::Illegal("Cannot import a deleted node".to_string()))?;
    if let Some(type_id) = imported_type {
        tree.set_attr(copy, xattr::TYPE, &type_id);
    }

    Ok(copy)
}

fn import_symbol<U: Unit>(src: &U, symbol: &Symbol, dst: &mut Program) -> Result<(), TransformError> {
    let type_id = match symbol.type_id.as_deref() {
        Some(type_id) => Some(import_type(src, type_id, dst)?),
        None => None,
    };
    let declaration = src.declarations().get(&symbol.name);

    let (tree, symbols, declarations) = dst.globals_mut();
    let id = tree
        .import_node(src.tree(), symbol.node)
        .ok_or_else(|| TransformError::Illegal(format!("Symbol `{}` was deleted", symbol.name)))?;
    if let Some(type_id) = &type_id {
        tree.set_attr(id, xattr::TYPE, type_id);
    }
    symbols.insert(tree, id);

    if let Some(copy) = declaration.and_then(|declaration| tree.import_node(src.tree(), declaration)) {
        if let (Some(name), Some(type_id)) = (tree.match_direct_descendant(copy, Xcode::Name), &type_id) {
            tree.set_attr(name, xattr::TYPE, type_id);
        }
        if !declarations.insert(tree, copy) {
            tree.delete(copy);
        }
    }

    log::debug!("Imported symbol `{}` from `{}`", symbol.name, src.unit_name());
    Ok(())
}

/// Makes the basic type `type_id` of `src` available in `dst` and returns its id there.
///
/// Built-in ids come back unchanged, an identical entry already present is reused, and a
/// conflicting one makes the import take a fresh id.
pub fn import_type<U: Unit>(src: &U, type_id: &str, dst: &mut Program) -> Result<SmolStr, TransformError> {
    import_type_guarded(src, type_id, dst, &mut FxHashSet::default())
}

fn import_type_guarded<U: Unit>(
    src: &U,
    type_id: &str,
    dst: &mut Program,
    in_progress: &mut FxHashSet<SmolStr>,
) -> Result<SmolStr, TransformError> {
    if is_builtin_type(type_id) || !in_progress.insert(SmolStr::new(type_id)) {
        return Ok(SmolStr::new(type_id));
    }

    let entry = src
        .type_table()
        .basic_type(type_id)
        .ok_or_else(|| missing_type(src, type_id))?;
    let reference = match entry.reference.as_deref() {
        Some(reference) => Some(import_type_guarded(src, reference, dst, in_progress)?),
        None => None,
    };

    let identical = dst
        .type_table()
        .iter()
        .find(|existing| {
            same_type_entry(dst.tree(), existing.node(), src.tree(), entry.node, reference.as_deref())
        })
        .map(|existing| SmolStr::new(existing.id()));
    if let Some(identical) = identical {
        return Ok(identical);
    }

    let new_id = if dst.type_table().contains(type_id) {
        dst.type_table().fresh_id(type_id)
    } else {
        SmolStr::new(type_id)
    };

    let (tree, types) = dst.parts_mut();
    let node = tree
        .import_node(src.tree(), entry.node)
        .ok_or_else(|| missing_type(src, type_id))?;
    tree.set_attr(node, xattr::TYPE, &new_id);
    if let Some(reference) = &reference {
        tree.set_attr(node, xattr::REF, reference);
    }
    types.insert(tree, node);

    log::debug!("Imported type `{}` from `{}` as `{}`", type_id, src.unit_name(), new_id);
    Ok(new_id)
}

fn own_attributes(node: &NodeData) -> Vec<(&str, &str)> {
    node.attributes()
        .filter(|(key, _)| *key != xattr::TYPE && *key != xattr::REF)
        .collect()
}

/// Compares two type elements ignoring their ids, with `reference` expected on the left one.
fn same_type_entry(left_tree: &Tree, left: NodeId, right_tree: &Tree, right: NodeId, reference: Option<&str>) -> bool {
    let (Some(l), Some(r)) = (left_tree.get(left), right_tree.get(right)) else {
        return false;
    };

    l.tag() == r.tag()
        && left_tree.attr(left, xattr::REF) == reference
        && own_attributes(l) == own_attributes(r)
        && l.children().len() == r.children().len()
        && l.children()
            .iter()
            .zip(r.children())
            .all(|(lc, rc)| left_tree.same_structure(*lc, right_tree, *rc))
}

#[cfg(test)]
mod tests {
    use loopsmith_ir::Module;
    use rstest::{fixture, rstest};

    use super::*;
    use crate::call::representation;

    const MODULE: &str = r#"
      <OmniFortranModule name="mo_bounds">
        <typeTable>
          <FbasicType type="Ikind" ref="Fint"/>
          <FbasicType type="Ilen" ref="Ikind"/>
          <FbasicType type="Ibroken" ref="Imissing"/>
        </typeTable>
        <identifiers>
          <id type="Ilen" sclass="flocal"><name>nproma</name></id>
          <id type="Fint" sclass="flocal"><name>nlev</name></id>
        </identifiers>
        <declarations>
          <varDecl lineno="3"><name type="Ilen">nproma</name></varDecl>
          <varDecl lineno="4"><name type="Fint">nlev</name></varDecl>
        </declarations>
        <FmoduleDefinition name="mo_bounds">
          <lowerBound><FintConstant type="Fint">1</FintConstant></lowerBound>
          <upperBound><Var type="Ilen" scope="local">nproma</Var></upperBound>
          <upperBound><plusExpr><Var type="Fint">nlev</Var><FintConstant type="Fint">1</FintConstant></plusExpr></upperBound>
          <upperBound><mulExpr><Var type="Fint">nlev</Var><FintConstant type="Fint">2</FintConstant></mulExpr></upperBound>
          <upperBound><plusExpr><Var type="Fint">nlev</Var><mulExpr><Var>a</Var><Var>b</Var></mulExpr></plusExpr></upperBound>
          <upperBound><Var type="Ibroken">nbad</Var></upperBound>
          <upperBound/>
        </FmoduleDefinition>
      </OmniFortranModule>"#;

    const PROGRAM: &str = r#"
      <XcodeProgram source="dst.f90">
        <typeTable>
          <FbasicType type="Ikind" ref="Freal"/>
        </typeTable>
        <globalSymbols/>
        <globalDeclarations/>
      </XcodeProgram>"#;

    #[fixture]
    fn units() -> (Module, Program) {
        (
            Module::from_xml("mo_bounds", MODULE).unwrap(),
            Program::from_xml(PROGRAM).unwrap(),
        )
    }

    fn bound(module: &Module, index: usize) -> NodeId {
        let definition = module
            .tree()
            .match_descendant(module.root(), Xcode::ModuleDefinition)
            .unwrap();
        module.tree().child(definition, index).unwrap()
    }

    #[rstest]
    #[case::constant(0, "1")]
    #[case::sum(2, "nlev + 1")]
    fn test_duplicate_supported_bounds(units: (Module, Program), #[case] index: usize, #[case] expected: &str) {
        let (module, mut program) = units;
        let source = bound(&module, index);

        let copy = duplicate_bound(&module, source, &mut program).unwrap();
        let tree = program.tree();
        assert_eq!(tree.opcode(copy), module.tree().opcode(source));
        assert!(tree.parent(copy).is_none());
        assert_eq!(representation(tree, copy), expected);
        assert_eq!(program.type_table().len(), 1);
    }

    #[rstest]
    fn test_duplicate_variable_imports_types(units: (Module, Program)) {
        let (module, mut program) = units;
        let source = bound(&module, 1);

        let copy = duplicate_bound(&module, source, &mut program).unwrap();
        let var = program.tree().first_child(copy).unwrap();
        let types = program.type_table();

        assert_eq!(program.tree().value(var), "nproma");
        assert_eq!(program.tree().type_id(var), Some("Ilen"));
        assert_eq!(types.len(), 3);
        assert_eq!(types.basic_type("Ikind").unwrap().reference.as_deref(), Some("Freal"));
        assert_eq!(types.basic_type("Ikind_1").unwrap().reference.as_deref(), Some("Fint"));
        assert_eq!(types.basic_type("Ilen").unwrap().reference.as_deref(), Some("Ikind_1"));

        duplicate_bound(&module, source, &mut program).unwrap();
        assert_eq!(program.type_table().len(), 3);
    }

    #[rstest]
    fn test_duplicate_variable_imports_its_symbol(units: (Module, Program)) {
        let (module, mut program) = units;
        let source = bound(&module, 1);

        duplicate_bound(&module, source, &mut program).unwrap();
        duplicate_bound(&module, source, &mut program).unwrap();

        let symbol = program.global_symbols().get("nproma").unwrap();
        assert_eq!(symbol.type_id.as_deref(), Some("Ilen"));
        assert_eq!(symbol.sclass.as_deref(), Some("flocal"));
        assert_eq!(program.global_symbols().len(), 1);
        assert_eq!(program.global_declarations().names().collect::<Vec<_>>(), vec!["nproma"]);

        let tree = program.tree();
        let declaration = program.global_declarations().get("nproma").unwrap();
        assert_eq!(tree.parent(declaration), program.global_declarations().node());
        assert_eq!(tree.parent(symbol.node), program.global_symbols().node());
        assert!(program.to_xml().unwrap().contains("<name>nproma</name>"));
    }

    #[rstest]
    fn test_duplicate_sum_keeps_known_symbols(units: (Module, Program)) {
        let (module, mut program) = units;
        let source = bound(&module, 2);

        duplicate_bound(&module, source, &mut program).unwrap();
        assert!(program.global_symbols().contains("nlev"));
        assert_eq!(program.global_declarations().len(), 1);

        duplicate_bound(&module, source, &mut program).unwrap();
        assert_eq!(program.global_symbols().len(), 1);
        assert_eq!(program.global_declarations().len(), 1);
    }

    #[rstest]
    #[case::product(3, TransformError::UnsupportedBound("mulExpr".into()))]
    #[case::nested_product(4, TransformError::UnsupportedBound("mulExpr".into()))]
    #[case::undeclared_type(5, TransformError::Illegal("Type `Imissing` is not declared in `mo_bounds`".to_string()))]
    fn test_duplicate_failure_leaves_units_unchanged(
        units: (Module, Program),
        #[case] index: usize,
        #[case] expected: TransformError,
    ) {
        let (module, mut program) = units;
        let source = bound(&module, index);
        let before = program.clone();
        let nodes = program.tree().len();

        assert_eq!(duplicate_bound(&module, source, &mut program), Err(expected));
        assert_eq!(program.tree().len(), nodes);
        assert_eq!(program.type_table().len(), before.type_table().len());
        assert!(
            program
                .tree()
                .same_structure(program.root(), before.tree(), before.root())
        );
    }

    #[rstest]
    fn test_duplicate_rejects_non_bounds(units: (Module, Program)) {
        let (module, mut program) = units;
        let empty = bound(&module, 6);
        let definition = module.tree().parent(empty).unwrap();

        assert!(matches!(
            duplicate_bound(&module, empty, &mut program),
            Err(TransformError::Illegal(_))
        ));
        assert!(matches!(
            duplicate_bound(&module, definition, &mut program),
            Err(TransformError::Illegal(_))
        ));
    }

    #[rstest]
    fn test_duplicate_bound_local(units: (Module, Program)) {
        let (_, mut program) = units;
        let tree = program.tree_mut();
        let bound = tree.new_node(Xcode::LowerBound);
        let value = tree.new_leaf(Xcode::IntConstant, "3");
        tree.append(bound, value);

        let copy = duplicate_bound_local(tree, bound).unwrap();
        assert_ne!(copy, bound);
        assert!(tree.same_structure(copy, tree, bound));
        assert!(duplicate_bound_local(tree, value).is_err());
    }
}
