use loopsmith_ir::{NodeId, Tree, Xcode};

use crate::TransformError;

/// Moves every statement of `extra` to the end of `original`.
pub fn append_body(tree: &mut Tree, original: NodeId, extra: NodeId) -> Result<(), TransformError> {
    if !tree.is(original, Xcode::Body) || !tree.is(extra, Xcode::Body) {
        return Err(TransformError::NotABody);
    }

    for statement in tree.children(extra).to_vec() {
        tree.append(original, statement);
    }

    Ok(())
}

/// Replaces the body of `to` by a copy of the `from` body.
pub fn copy_body(tree: &mut Tree, from: NodeId, to: NodeId) {
    let Some(copy) = tree.clone_node(from) else {
        return;
    };

    if let Some(body) = tree.match_direct_descendant(to, Xcode::Body) {
        tree.delete(body);
    }
    tree.append(to, copy);
}
