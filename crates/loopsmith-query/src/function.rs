use loopsmith_ir::{NodeId, Tree, TypeTable, Xcode, xattr};

/// Clears the `is_pure` flag of a function type. Returns whether the flag was set.
pub fn remove_pure(tree: &mut Tree, types: &mut TypeTable, function_definition: NodeId, function_type: NodeId) -> bool {
    if !tree.is(function_type, Xcode::FunctionType) || !tree.is(function_definition, Xcode::FunctionDefinition) {
        return false;
    }
    if !tree.bool_attr(function_type, xattr::IS_PURE) {
        return false;
    }

    tree.remove_attr(function_type, xattr::IS_PURE);
    if let Some(type_id) = tree.type_id(function_type).map(str::to_string) {
        types.refresh(tree, &type_id);
    }
    true
}
