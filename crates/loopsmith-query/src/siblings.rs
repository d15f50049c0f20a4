use loopsmith_ir::{NodeId, Tree, Xcode};
use rustc_hash::FxHashSet;

/// Members of `left` that also belong to `right`, in `left` order.
///
/// A candidate `n` is kept when adding it to `right` leaves the size of `right` unchanged.
pub fn intersect(left: &[NodeId], right: &[NodeId]) -> Vec<NodeId> {
    let right_set = right.iter().copied().collect::<FxHashSet<_>>();
    let count = right_set.len();

    left.iter()
        .copied()
        .filter(|candidate| {
            let mut union = right_set.clone();
            union.insert(*candidate);
            union.len() == count
        })
        .collect()
}

fn is_array_assign(tree: &Tree, node: NodeId) -> bool {
    tree.is(node, Xcode::AssignStatement) && tree.match_direct_descendant(node, Xcode::ArrayRef).is_some()
}

/// Array assignments between `from` and the following pragma whose text is `end_pragma`.
pub fn array_assigns_in_block(tree: &Tree, from: NodeId, end_pragma: &str) -> Vec<NodeId> {
    let after_start = tree
        .following_siblings(from)
        .iter()
        .copied()
        .filter(|node| is_array_assign(tree, *node))
        .collect::<Vec<_>>();

    let before_end = tree
        .following_siblings(from)
        .iter()
        .filter(|node| tree.is(**node, Xcode::PragmaStatement) && tree.value(**node) == end_pragma)
        .flat_map(|end| tree.preceding_siblings(*end).iter().copied())
        .filter(|node| is_array_assign(tree, *node))
        .collect::<Vec<_>>();

    intersect(&after_start, &before_end)
}

/// Deletes the siblings strictly between `start` and `end`.
pub fn delete_between(tree: &mut Tree, start: NodeId, end: NodeId) {
    let doomed = tree
        .following_siblings(start)
        .iter()
        .copied()
        .take_while(|node| *node != end)
        .collect::<Vec<_>>();

    for node in doomed {
        tree.delete(node);
    }
}

/// Deletes `start` and every sibling after it.
pub fn delete_from(tree: &mut Tree, start: NodeId) {
    let doomed = std::iter::once(start)
        .chain(tree.following_siblings(start).iter().copied())
        .collect::<Vec<_>>();

    for node in doomed {
        tree.delete(node);
    }
}

pub fn safe_delete(tree: &mut Tree, node: Option<NodeId>) {
    if let Some(node) = node {
        tree.delete(node);
    }
}

/// Moves the siblings from `from` up to `until` to the front of `target_body`.
///
/// `from` and `until` themselves move only when `included` is set.
pub fn shift_statements_in_body(tree: &mut Tree, from: NodeId, until: NodeId, target_body: NodeId, included: bool) {
    let mut moved = Vec::new();
    if included {
        moved.push(from);
    }

    let mut reached_until = false;
    for sibling in tree.following_siblings(from) {
        if *sibling == until {
            reached_until = true;
            break;
        }
        moved.push(*sibling);
    }
    if included && reached_until {
        moved.push(until);
    }

    let first = tree.first_child(target_body);
    for node in moved {
        match first {
            Some(first) => tree.insert_before(first, node),
            None => tree.append(target_body, node),
        }
    }
}

/// Whether `end` follows `start` with only `skipped` kinds of siblings in between.
pub fn is_direct_sibling(tree: &Tree, start: NodeId, end: NodeId, skipped: &[Xcode]) -> bool {
    for sibling in tree.following_siblings(start) {
        if *sibling == end {
            return true;
        }
        if !skipped.contains(&tree.opcode(*sibling)) {
            return false;
        }
    }
    false
}

/// Descendants of `root` with one of the given kinds, grouped by kind.
pub fn statements_in(tree: &Tree, root: NodeId, opcodes: &[Xcode]) -> Vec<NodeId> {
    opcodes
        .iter()
        .flat_map(|opcode| tree.match_all(root, *opcode))
        .collect()
}

/// Statements of the given kinds from `from` up to (excluding) `to`, including nested ones.
pub fn statements_between(tree: &Tree, from: NodeId, to: NodeId, opcodes: &[Xcode]) -> Vec<NodeId> {
    std::iter::once(from)
        .chain(tree.following_siblings(from).iter().copied())
        .take_while(|node| *node != to)
        .flat_map(|node| {
            opcodes
                .contains(&tree.opcode(node))
                .then_some(node)
                .into_iter()
                .chain(statements_in(tree, node, opcodes))
        })
        .collect()
}
