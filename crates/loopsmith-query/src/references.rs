use loopsmith_ir::{NodeId, Tree, Xcode};
use rustc_hash::FxHashSet;
use smol_str::SmolStr;

use crate::TransformError;

/// Name of the array referenced by a `FarrayRef` (its `varRef/Var` value).
pub fn array_name(tree: &Tree, array_ref: NodeId) -> Option<&str> {
    if !tree.is(array_ref, Xcode::ArrayRef) {
        return None;
    }

    tree.match_seq(array_ref, &[Xcode::VarRef, Xcode::Var])
        .map(|var| tree.value(var))
}

fn is_array_ref_of(tree: &Tree, node: NodeId, name: &str) -> bool {
    array_name(tree, node).is_some_and(|array| array.eq_ignore_ascii_case(name))
}

/// Every `FarrayRef` on `name` below `parent`.
pub fn all_array_references(tree: &Tree, parent: NodeId, name: &str) -> Vec<NodeId> {
    tree.match_all(parent, Xcode::ArrayRef)
        .into_iter()
        .filter(|node| is_array_ref_of(tree, *node, name))
        .collect()
}

/// Every `Var` named `name` below `parent`.
pub fn all_var_references(tree: &Tree, parent: NodeId, name: &str) -> Vec<NodeId> {
    tree.match_all(parent, Xcode::Var)
        .into_iter()
        .filter(|node| tree.value(*node).eq_ignore_ascii_case(name))
        .collect()
}

/// Array references on `name` nested inside the siblings following `from`.
pub fn array_references_in_siblings(tree: &Tree, from: NodeId, name: &str) -> Vec<NodeId> {
    tree.following_siblings(from)
        .iter()
        .flat_map(|sibling| all_array_references(tree, *sibling, name))
        .collect()
}

fn index_matches_offset(tree: &Tree, index: NodeId, offset: i32) -> bool {
    if offset == 0 {
        return tree.match_direct_descendant(index, Xcode::Var).is_some();
    }

    // i - k for a positive offset, i + k for a negative one
    let opcode = if offset > 0 { Xcode::MinusExpr } else { Xcode::PlusExpr };
    let magnitude = offset.unsigned_abs().to_string();

    tree.match_direct_descendant(index, opcode).is_some_and(|expr| {
        tree.match_direct_descendant(expr, Xcode::Var).is_some()
            && tree
                .match_direct_descendant(expr, Xcode::IntConstant)
                .is_some_and(|constant| tree.value(constant) == magnitude)
    })
}

/// Array references on `name` below `from` whose n-th `arrayIndex` carries the n-th offset.
pub fn array_references_by_offsets(tree: &Tree, from: NodeId, name: &str, offsets: &[i32]) -> Vec<NodeId> {
    all_array_references(tree, from, name)
        .into_iter()
        .filter(|array_ref| {
            let indexes = tree
                .children(*array_ref)
                .iter()
                .copied()
                .filter(|child| tree.is(*child, Xcode::ArrayIndex))
                .collect::<Vec<_>>();

            offsets.iter().enumerate().all(|(position, offset)| {
                indexes
                    .get(position)
                    .is_some_and(|index| index_matches_offset(tree, *index, *offset))
            })
        })
        .collect()
}

/// First assignment after `from` in document order whose left-hand side is an array
/// reference on `name`.
pub fn first_array_assign(tree: &Tree, from: NodeId, name: &str) -> Option<NodeId> {
    tree.following(from).into_iter().find(|node| {
        tree.is(*node, Xcode::AssignStatement)
            && tree
                .first_child(*node)
                .is_some_and(|lhs| is_array_ref_of(tree, lhs, name))
    })
}

/// Direct `arrayIndex` and `indexRange` children of `parent`.
pub fn find_indexes(tree: &Tree, parent: NodeId) -> Vec<NodeId> {
    tree.children(parent)
        .iter()
        .copied()
        .filter(|child| matches!(tree.opcode(*child), Xcode::ArrayIndex | Xcode::IndexRange))
        .collect()
}

fn is_plain_reference(tree: &Tree, var: NodeId) -> bool {
    tree.parent(var)
        .is_none_or(|parent| !tree.is(parent, Xcode::ArrayIndex))
}

/// Variables below `parent` that are not used as an array index.
pub fn find_all_references(tree: &Tree, parent: NodeId) -> Vec<NodeId> {
    tree.match_all(parent, Xcode::Var)
        .into_iter()
        .filter(|var| is_plain_reference(tree, *var))
        .collect()
}

pub fn find_all_references_named(tree: &Tree, parent: NodeId, name: &str) -> Vec<NodeId> {
    find_all_references(tree, parent)
        .into_iter()
        .filter(|var| tree.value(*var).eq_ignore_ascii_case(name))
        .collect()
}

pub fn names_from_references(tree: &Tree, nodes: &[NodeId]) -> FxHashSet<SmolStr> {
    nodes
        .iter()
        .filter(|node| tree.is(**node, Xcode::Var))
        .map(|node| SmolStr::new(tree.value(*node)))
        .collect()
}

/// Whether `array_index` is a bare induction variable of the given list.
pub fn is_induction_index(tree: &Tree, array_index: NodeId, induction_vars: &[&str]) -> bool {
    if !tree.is(array_index, Xcode::ArrayIndex) || induction_vars.is_empty() {
        return false;
    }

    tree.match_direct_descendant(array_index, Xcode::Var)
        .is_some_and(|var| induction_vars.iter().any(|name| tree.value(var).eq_ignore_ascii_case(name)))
}

/// `indexRange` children of an array reference.
pub fn index_ranges_of_array_ref(tree: &Tree, array_ref: NodeId) -> Vec<NodeId> {
    if !tree.is(array_ref, Xcode::ArrayRef) {
        return Vec::new();
    }

    tree.children(array_ref)
        .iter()
        .copied()
        .filter(|child| tree.is(*child, Xcode::IndexRange))
        .collect()
}

/// Replaces an array reference by its bare variable. Returns the new variable node.
pub fn demote_to_scalar(tree: &mut Tree, array_ref: NodeId) -> Option<NodeId> {
    let var = tree.match_seq(array_ref, &[Xcode::VarRef, Xcode::Var])?;
    let scalar = tree.clone_node(var)?;

    tree.insert_after(array_ref, scalar);
    tree.delete(array_ref);
    Some(scalar)
}

/// Checks that every kept 1-based position names a dimension of `array_ref`.
pub fn check_kept_dimensions(tree: &Tree, array_ref: NodeId, kept_dimensions: &[usize]) -> Result<(), TransformError> {
    if !tree.is(array_ref, Xcode::ArrayRef) {
        return Err(TransformError::Illegal(format!("Cannot demote `{}`", tree.tag_name(array_ref))));
    }

    let rank = find_indexes(tree, array_ref).len();
    match kept_dimensions.iter().find(|position| **position == 0 || **position > rank) {
        Some(position) => Err(TransformError::Illegal(format!(
            "Dimension {} is out of range for `{}` of rank {}",
            position,
            array_name(tree, array_ref).unwrap_or_default(),
            rank
        ))),
        None => Ok(()),
    }
}

/// Keeps only the dimensions at the given 1-based positions, in their original order.
///
/// Positions are checked against the rank of the reference before anything is deleted.
pub fn demote(tree: &mut Tree, array_ref: NodeId, kept_dimensions: &[usize]) -> Result<(), TransformError> {
    check_kept_dimensions(tree, array_ref, kept_dimensions)?;

    let dropped = find_indexes(tree, array_ref)
        .into_iter()
        .enumerate()
        .filter(|(position, _)| !kept_dimensions.contains(&(position + 1)))
        .map(|(_, index)| index)
        .collect::<Vec<_>>();

    for index in dropped {
        tree.delete(index);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use loopsmith_ir::xml;
    use rstest::{fixture, rstest};

    use super::*;
    use crate::call::representation;

    const BLOCK: &str = r#"
      <body>
        <FpragmaStatement lineno="1">lsm demote array(t)</FpragmaStatement>
        <FassignStatement lineno="2">
          <FarrayRef>
            <varRef><Var>t</Var></varRef>
            <arrayIndex><Var>i</Var></arrayIndex>
            <arrayIndex><Var>j</Var></arrayIndex>
            <arrayIndex><Var>k</Var></arrayIndex>
          </FarrayRef>
          <plusExpr>
            <FarrayRef>
              <varRef><Var>T</Var></varRef>
              <arrayIndex><minusExpr><Var>i</Var><FintConstant>1</FintConstant></minusExpr></arrayIndex>
              <arrayIndex><plusExpr><Var>j</Var><FintConstant>2</FintConstant></plusExpr></arrayIndex>
              <arrayIndex><Var>k</Var></arrayIndex>
            </FarrayRef>
            <Var>q</Var>
          </plusExpr>
        </FassignStatement>
        <FassignStatement lineno="3">
          <Var>q</Var>
          <FarrayRef><varRef><Var>u</Var></varRef><arrayIndex><Var>i</Var></arrayIndex></FarrayRef>
        </FassignStatement>
        <FpragmaStatement lineno="4">lsm end demote</FpragmaStatement>
      </body>"#;

    #[fixture]
    fn block() -> (Tree, NodeId) {
        xml::parse(BLOCK).unwrap()
    }

    #[rstest]
    fn test_reference_lookups(block: (Tree, NodeId)) {
        let (tree, root) = block;
        let pragma = tree.child(root, 0).unwrap();

        assert_eq!(all_array_references(&tree, root, "t").len(), 2);
        assert_eq!(all_array_references(&tree, root, "u").len(), 1);
        assert_eq!(all_var_references(&tree, root, "q").len(), 2);
        assert_eq!(array_references_in_siblings(&tree, pragma, "t").len(), 2);
        assert!(array_references_in_siblings(&tree, pragma, "missing").is_empty());
        assert_eq!(first_array_assign(&tree, pragma, "t"), tree.child(root, 1));
        assert!(first_array_assign(&tree, pragma, "u").is_none());
    }

    #[rstest]
    #[case::bare(vec![0, 0, 0], 1)]
    #[case::shifted(vec![1, -2, 0], 1)]
    #[case::prefix(vec![0], 1)]
    #[case::sign_matters(vec![-1, 2, 0], 0)]
    #[case::too_many(vec![0, 0, 0, 0], 0)]
    fn test_array_references_by_offsets(block: (Tree, NodeId), #[case] offsets: Vec<i32>, #[case] expected: usize) {
        let (tree, root) = block;
        assert_eq!(array_references_by_offsets(&tree, root, "t", &offsets).len(), expected);
    }

    #[rstest]
    fn test_plain_references(block: (Tree, NodeId)) {
        let (tree, root) = block;
        let references = find_all_references(&tree, root);
        let names = names_from_references(&tree, &references);

        assert!(names.contains("t"));
        assert!(names.contains("q"));
        assert!(!names.contains("k"));
        assert_eq!(find_all_references_named(&tree, root, "q").len(), 2);
    }

    #[rstest]
    fn test_is_induction_index(block: (Tree, NodeId)) {
        let (tree, root) = block;
        let array_ref = all_array_references(&tree, root, "t")[0];
        let indexes = find_indexes(&tree, array_ref);

        assert_eq!(indexes.len(), 3);
        assert!(is_induction_index(&tree, indexes[0], &["i", "j"]));
        assert!(!is_induction_index(&tree, indexes[2], &["i", "j"]));
        assert!(!is_induction_index(&tree, indexes[0], &[]));
        assert!(!is_induction_index(&tree, array_ref, &["i"]));
    }

    #[rstest]
    fn test_demote_keeps_requested_dimension(block: (Tree, NodeId)) {
        let (mut tree, root) = block;
        let array_ref = all_array_references(&tree, root, "t")[1];
        let second = representation(&tree, find_indexes(&tree, array_ref)[1]);
        let position = tree.position(array_ref);

        demote(&mut tree, array_ref, &[2]).unwrap();

        let remaining = find_indexes(&tree, array_ref);
        assert_eq!(remaining.len(), 1);
        assert_eq!(representation(&tree, remaining[0]), second);
        assert_eq!(tree.position(array_ref), position);
        assert_eq!(representation(&tree, array_ref), "T(j + 2)");
    }

    #[rstest]
    fn test_demote_keeps_order(block: (Tree, NodeId)) {
        let (mut tree, root) = block;
        let array_ref = all_array_references(&tree, root, "t")[0];

        demote(&mut tree, array_ref, &[3, 1]).unwrap();
        assert_eq!(representation(&tree, array_ref), "t(i,k)");
    }

    #[rstest]
    #[case::past_rank(vec![4])]
    #[case::mixed(vec![1, 5])]
    #[case::zero(vec![0])]
    fn test_demote_rejects_missing_dimension(block: (Tree, NodeId), #[case] kept: Vec<usize>) {
        let (mut tree, root) = block;
        let array_ref = all_array_references(&tree, root, "t")[0];

        assert!(matches!(demote(&mut tree, array_ref, &kept), Err(TransformError::Illegal(_))));
        assert_eq!(representation(&tree, array_ref), "t(i,j,k)");
    }

    #[rstest]
    fn test_demote_to_scalar(block: (Tree, NodeId)) {
        let (mut tree, root) = block;
        let assign = tree.child(root, 1).unwrap();
        let array_ref = all_array_references(&tree, root, "t")[0];

        let scalar = demote_to_scalar(&mut tree, array_ref).unwrap();
        assert!(!tree.contains(array_ref));
        assert_eq!(tree.child(assign, 0), Some(scalar));
        assert_eq!(tree.opcode(scalar), Xcode::Var);
        assert_eq!(tree.value(scalar), "t");
        assert!(demote_to_scalar(&mut tree, array_ref).is_none());
    }
}
