use loopsmith_ir::{NodeId, Tree, Xcode, xattr};
use rustc_hash::FxHashSet;

use crate::TransformError;

/// A chain of perfectly nested do statements, outermost first.
#[derive(Debug, Clone, PartialEq)]
pub struct NestedDoStatement {
    statements: Vec<NodeId>,
}

impl NestedDoStatement {
    /// Follows `body/FdoStatement` from `outer` for at most `depth` levels.
    pub fn from_outer(tree: &Tree, outer: NodeId, depth: usize) -> Option<Self> {
        if !tree.is(outer, Xcode::DoStatement) || depth == 0 {
            return None;
        }

        let statements = std::iter::successors(Some(outer), |current| {
            tree.match_seq(*current, &[Xcode::Body, Xcode::DoStatement])
        })
        .take(depth)
        .collect();

        Some(Self { statements })
    }

    pub fn outer(&self) -> NodeId {
        self.statements[0]
    }

    pub fn inner(&self) -> NodeId {
        self.statements[self.statements.len() - 1]
    }

    pub fn get(&self, level: usize) -> Option<NodeId> {
        self.statements.get(level).copied()
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.statements.iter().copied()
    }

    pub fn induction_variables<'a>(&self, tree: &'a Tree) -> Vec<&'a str> {
        self.statements
            .iter()
            .filter_map(|stmt| extract_induction_variable(tree, *stmt))
            .collect()
    }
}

fn binds_variable(tree: &Tree, loop_: NodeId, name: &str) -> bool {
    tree.children(loop_)
        .iter()
        .any(|child| tree.is(*child, Xcode::Var) && tree.value(*child).eq_ignore_ascii_case(name))
}

type Predicate<'a> = Box<dyn Fn(NodeId) -> bool + 'a>;

/// Predicate for a loop nest binding `induction_vars`, built from the innermost level outwards.
fn nest_predicate<'a>(tree: &'a Tree, induction_vars: &'a [&'a str]) -> Option<Predicate<'a>> {
    induction_vars.iter().rev().fold(None, |inner: Option<Predicate<'a>>, var| {
        let level: Predicate<'a> = Box::new(move |node: NodeId| {
            tree.is(node, Xcode::DoStatement)
                && binds_variable(tree, node, var)
                && inner.as_ref().is_none_or(|inner| {
                    tree.match_direct_descendant(node, Xcode::Body)
                        .is_some_and(|body| tree.children(body).iter().any(|child| inner(*child)))
                })
        });
        Some(level)
    })
}

/// Finds the loop nests following `from` whose levels bind `induction_vars` (outermost first)
/// and that start before the line of `end_pragma`.
///
/// Only the outermost loop of each match is returned.
pub fn find_do_statements(tree: &Tree, from: NodeId, end_pragma: NodeId, induction_vars: &[&str]) -> Vec<NodeId> {
    let Some(predicate) = nest_predicate(tree, induction_vars) else {
        return Vec::new();
    };
    let end_line = tree.line(end_pragma);
    let matches = tree
        .following(from)
        .into_iter()
        .filter(|node| predicate(*node))
        .collect::<Vec<_>>();
    let matched = matches.iter().copied().collect::<FxHashSet<_>>();

    matches
        .into_iter()
        .filter(|node| !tree.ancestors(*node).any(|ancestor| matched.contains(&ancestor)))
        .filter(|node| {
            let line = tree.line(*node);
            line != 0 && line < end_line
        })
        .collect()
}

/// Same tags, same values up to case, same shape. Attributes such as type ids are ignored.
pub fn same_expression(tree: &Tree, left: NodeId, right: NodeId) -> bool {
    let (left_children, right_children) = (tree.children(left), tree.children(right));

    tree.tag_name(left) == tree.tag_name(right)
        && tree.value(left).eq_ignore_ascii_case(tree.value(right))
        && left_children.len() == right_children.len()
        && left_children
            .iter()
            .zip(right_children.iter())
            .all(|(l, r)| same_expression(tree, *l, *r))
}

fn same_operand(tree: &Tree, left: Option<NodeId>, right: Option<NodeId>) -> bool {
    match (left, right) {
        (Some(left), Some(right)) => same_expression(tree, left, right),
        _ => false,
    }
}

fn same_first_child(tree: &Tree, left: Option<NodeId>, right: Option<NodeId>) -> bool {
    match (left, right) {
        (Some(left), Some(right)) => same_operand(tree, tree.first_child(left), tree.first_child(right)),
        _ => false,
    }
}

/// Compares two `indexRange` elements by the structure of their bounds and step.
///
/// Two assumed-shape ranges are identical. An absent step on both sides counts as equal.
pub fn is_index_range_identical(tree: &Tree, left: NodeId, right: NodeId, with_lower_bound: bool) -> bool {
    if !tree.is(left, Xcode::IndexRange) || !tree.is(right, Xcode::IndexRange) {
        return false;
    }
    if tree.bool_attr(left, xattr::IS_ASSUMED_SHAPE) && tree.bool_attr(right, xattr::IS_ASSUMED_SHAPE) {
        return true;
    }

    let part = |range: NodeId, opcode: Xcode| tree.match_direct_descendant(range, opcode);
    let steps = match (part(left, Xcode::Step), part(right, Xcode::Step)) {
        (None, None) => true,
        (left_step, right_step) => same_first_child(tree, left_step, right_step),
    };

    (!with_lower_bound || same_first_child(tree, part(left, Xcode::LowerBound), part(right, Xcode::LowerBound)))
        && same_first_child(tree, part(left, Xcode::UpperBound), part(right, Xcode::UpperBound))
        && steps
}

/// Pairwise [`is_index_range_identical`] over two lists of equal length.
pub fn compare_index_ranges(tree: &Tree, left: &[NodeId], right: &[NodeId]) -> bool {
    left.len() == right.len()
        && left
            .iter()
            .zip(right.iter())
            .all(|(l, r)| is_index_range_identical(tree, *l, *r, true))
}

fn compare_loop_ranges(tree: &Tree, left: NodeId, right: NodeId, with_lower_bound: bool) -> bool {
    if !tree.is(left, Xcode::DoStatement) || !tree.is(right, Xcode::DoStatement) {
        return false;
    }

    let var = |l: NodeId| tree.match_direct_descendant(l, Xcode::Var);
    let range = |l: NodeId| tree.match_direct_descendant(l, Xcode::IndexRange);

    same_operand(tree, var(left), var(right))
        && match (range(left), range(right)) {
            (Some(l), Some(r)) => is_index_range_identical(tree, l, r, with_lower_bound),
            _ => false,
        }
}

/// Same induction variable and same lower, upper and step.
pub fn has_same_index_range(tree: &Tree, left: NodeId, right: NodeId) -> bool {
    compare_loop_ranges(tree, left, right, true)
}

/// Same induction variable, upper bound and step; the lower bound is ignored.
pub fn has_same_index_range_besides_lower(tree: &Tree, left: NodeId, right: NodeId) -> bool {
    compare_loop_ranges(tree, left, right, false)
}

struct IterationRange {
    var: NodeId,
    range: NodeId,
    lower: NodeId,
    upper: NodeId,
    step: Option<NodeId>,
}

impl IterationRange {
    fn of(tree: &Tree, loop_: NodeId) -> Result<Self, TransformError> {
        if !tree.is(loop_, Xcode::DoStatement) {
            return Err(TransformError::NotALoop(tree.tag_name(loop_).into()));
        }

        let var = tree.match_direct_descendant(loop_, Xcode::Var);
        let range = tree.match_direct_descendant(loop_, Xcode::IndexRange);
        let (Some(var), Some(range)) = (var, range) else {
            return Err(TransformError::MissingIterationRange);
        };
        let bound = |opcode: Xcode| tree.match_direct_descendant(range, opcode).and_then(|b| tree.first_child(b));

        Ok(Self {
            var,
            range,
            lower: bound(Xcode::LowerBound).ok_or(TransformError::MissingIterationRange)?,
            upper: bound(Xcode::UpperBound).ok_or(TransformError::MissingIterationRange)?,
            step: tree.match_direct_descendant(range, Xcode::Step),
        })
    }
}

/// Exchanges two nodes through clones, then deletes the originals.
fn swap_by_clone(tree: &mut Tree, left: NodeId, right: NodeId) {
    let (Some(left_copy), Some(right_copy)) = (tree.clone_node(left), tree.clone_node(right)) else {
        return;
    };

    tree.insert_after(right, left_copy);
    tree.insert_after(left, right_copy);
    tree.delete(left);
    tree.delete(right);
}

/// Exchanges induction variable, bounds and step of two do statements.
///
/// Both headers are checked before the first edit; applying the swap twice restores both loops.
pub fn swap_iteration_range(tree: &mut Tree, left: NodeId, right: NodeId) -> Result<(), TransformError> {
    let first = IterationRange::of(tree, left)?;
    let second = IterationRange::of(tree, right)?;

    swap_by_clone(tree, first.var, second.var);
    swap_by_clone(tree, first.lower, second.lower);
    swap_by_clone(tree, first.upper, second.upper);

    match (first.step, second.step) {
        (Some(l), Some(r)) => swap_by_clone(tree, l, r),
        (Some(step), None) => tree.append(second.range, step),
        (None, Some(step)) => tree.append(first.range, step),
        (None, None) => {}
    }

    Ok(())
}

/// Moves the statements of `loop_`'s body after `reference`, keeping their order.
pub fn extract_body(tree: &mut Tree, loop_: NodeId, reference: NodeId) {
    if !tree.is(loop_, Xcode::DoStatement) {
        return;
    }
    let Some(body) = tree.match_direct_descendant(loop_, Xcode::Body) else {
        return;
    };

    let mut anchor = reference;
    for child in tree.children(body).to_vec() {
        tree.insert_after(anchor, child);
        anchor = child;
    }
}

pub fn extract_induction_variable(tree: &Tree, loop_: NodeId) -> Option<&str> {
    if !tree.is(loop_, Xcode::DoStatement) {
        return None;
    }

    tree.match_direct_descendant(loop_, Xcode::Var).map(|var| tree.value(var))
}

#[cfg(test)]
mod tests {
    use loopsmith_ir::xml;
    use rstest::{fixture, rstest};

    use super::*;
    use crate::call::representation;

    const NEST: &str = r#"
      <body>
        <FpragmaStatement lineno="1">lsm loop-interchange</FpragmaStatement>
        <FdoStatement lineno="2">
          <Var type="Fint">i</Var>
          <indexRange>
            <lowerBound><FintConstant type="Fint">1</FintConstant></lowerBound>
            <upperBound><Var type="Fint">ni</Var></upperBound>
            <step><FintConstant type="Fint">1</FintConstant></step>
          </indexRange>
          <body>
            <FdoStatement lineno="3">
              <Var type="Fint">j</Var>
              <indexRange>
                <lowerBound><FintConstant type="Fint">2</FintConstant></lowerBound>
                <upperBound><plusExpr><Var type="Fint">nj</Var><FintConstant type="Fint">1</FintConstant></plusExpr></upperBound>
                <step><FintConstant type="Fint">2</FintConstant></step>
              </indexRange>
              <body>
                <FdoStatement lineno="4">
                  <Var type="Fint">k</Var>
                  <indexRange>
                    <lowerBound><FintConstant type="Fint">1</FintConstant></lowerBound>
                    <upperBound><Var type="Fint">nk</Var></upperBound>
                  </indexRange>
                  <body><FassignStatement lineno="5"><Var>x</Var><FintConstant>0</FintConstant></FassignStatement></body>
                </FdoStatement>
              </body>
            </FdoStatement>
          </body>
        </FdoStatement>
        <FdoStatement lineno="8">
          <Var type="Fint">i</Var>
          <indexRange>
            <lowerBound><FintConstant type="Fint">0</FintConstant></lowerBound>
            <upperBound><Var type="Fint">ni</Var></upperBound>
            <step><FintConstant type="Fint">1</FintConstant></step>
          </indexRange>
          <body/>
        </FdoStatement>
        <FdoStatement lineno="10">
          <Var type="Fint">i</Var>
          <indexRange>
            <lowerBound><FintConstant type="Fint">1</FintConstant></lowerBound>
            <upperBound><Var type="Fint">ni</Var></upperBound>
            <step><FintConstant type="Fint">1</FintConstant></step>
          </indexRange>
          <body/>
        </FdoStatement>
        <FpragmaStatement lineno="12">lsm end</FpragmaStatement>
      </body>"#;

    #[fixture]
    fn nest() -> (Tree, NodeId) {
        xml::parse(NEST).unwrap()
    }

    fn loops(tree: &Tree, root: NodeId) -> Vec<NodeId> {
        tree.children(root)
            .iter()
            .copied()
            .filter(|c| tree.is(*c, Xcode::DoStatement))
            .collect()
    }

    fn header(tree: &Tree, loop_: NodeId) -> Vec<String> {
        let range = tree.match_direct_descendant(loop_, Xcode::IndexRange).unwrap();
        vec![
            extract_induction_variable(tree, loop_).unwrap().to_string(),
            representation(tree, range),
        ]
    }

    #[rstest]
    fn test_nested_do_statement(nest: (Tree, NodeId)) {
        let (tree, root) = nest;
        let outer = loops(&tree, root)[0];
        let group = NestedDoStatement::from_outer(&tree, outer, 3).unwrap();

        assert_eq!(group.len(), 3);
        assert_eq!(group.outer(), outer);
        assert_eq!(group.induction_variables(&tree), vec!["i", "j", "k"]);
        assert_eq!(NestedDoStatement::from_outer(&tree, outer, 8).unwrap().len(), 3);
        assert!(NestedDoStatement::from_outer(&tree, root, 2).is_none());
    }

    #[rstest]
    #[case::full_nest(vec!["i", "j", "k"], 1)]
    #[case::outer_pair(vec!["i", "j"], 1)]
    #[case::single(vec!["i"], 3)]
    #[case::inner_only(vec!["j", "k"], 1)]
    #[case::wrong_order(vec!["j", "i"], 0)]
    #[case::no_match(vec!["z"], 0)]
    #[case::empty(vec![], 0)]
    fn test_find_do_statements(nest: (Tree, NodeId), #[case] vars: Vec<&str>, #[case] expected: usize) {
        let (tree, root) = nest;
        let start = tree.child(root, 0).unwrap();
        let end = tree.last_child(root).unwrap();

        assert_eq!(find_do_statements(&tree, start, end, &vars).len(), expected);
    }

    #[rstest]
    fn test_find_do_statements_respects_end_line(nest: (Tree, NodeId)) {
        let (tree, root) = nest;
        let start = tree.child(root, 0).unwrap();
        let third = loops(&tree, root)[2];

        let found = find_do_statements(&tree, start, third, &["i"]);
        assert_eq!(found, loops(&tree, root)[..2].to_vec());
    }

    #[rstest]
    fn test_index_range_equality(nest: (Tree, NodeId)) {
        let (tree, root) = nest;
        let all = loops(&tree, root);
        let (first, second, third) = (all[0], all[1], all[2]);

        assert!(has_same_index_range(&tree, first, first));
        assert!(has_same_index_range(&tree, first, third));
        assert!(has_same_index_range(&tree, third, first));
        assert!(!has_same_index_range(&tree, first, second));
        assert!(has_same_index_range_besides_lower(&tree, first, second));
        assert!(has_same_index_range_besides_lower(&tree, second, first));

        let inner = tree.match_seq(first, &[Xcode::Body, Xcode::DoStatement]).unwrap();
        assert!(!has_same_index_range_besides_lower(&tree, first, inner));
        assert!(!has_same_index_range(&tree, first, root));
    }

    #[rstest]
    #[case::same_grouping(
        "<plusExpr><Var>a</Var><mulExpr><Var>b</Var><Var>c</Var></mulExpr></plusExpr>",
        "<plusExpr><Var>A</Var><mulExpr><Var type=\"Fint\">b</Var><Var>c</Var></mulExpr></plusExpr>",
        true
    )]
    #[case::other_grouping(
        "<plusExpr><Var>a</Var><mulExpr><Var>b</Var><Var>c</Var></mulExpr></plusExpr>",
        "<mulExpr><plusExpr><Var>a</Var><Var>b</Var></plusExpr><Var>c</Var></mulExpr>",
        false
    )]
    fn test_range_equality_follows_expression_structure(#[case] left: &str, #[case] right: &str, #[case] expected: bool) {
        let do_loop = |upper: &str| {
            format!(
                r#"<FdoStatement><Var>i</Var><indexRange><lowerBound><FintConstant>1</FintConstant></lowerBound><upperBound>{upper}</upperBound></indexRange><body/></FdoStatement>"#
            )
        };
        let (tree, root) = xml::parse(&format!("<body>{}{}</body>", do_loop(left), do_loop(right))).unwrap();
        let all = loops(&tree, root);

        assert_eq!(has_same_index_range(&tree, all[0], all[1]), expected);
        assert_eq!(has_same_index_range_besides_lower(&tree, all[0], all[1]), expected);
    }

    #[test]
    fn test_step_presence_matters() {
        let (tree, root) = xml::parse(
            r#"<body>
                 <indexRange><lowerBound><FintConstant>1</FintConstant></lowerBound><upperBound><Var>n</Var></upperBound></indexRange>
                 <indexRange><lowerBound><FintConstant>1</FintConstant></lowerBound><upperBound><Var>n</Var></upperBound></indexRange>
                 <indexRange><lowerBound><FintConstant>1</FintConstant></lowerBound><upperBound><Var>n</Var></upperBound><step><FintConstant>1</FintConstant></step></indexRange>
                 <indexRange is_assumed_shape="true"/>
                 <indexRange is_assumed_shape="true"/>
               </body>"#,
        )
        .unwrap();
        let ranges = tree.children(root);

        assert!(is_index_range_identical(&tree, ranges[0], ranges[1], true));
        assert!(!is_index_range_identical(&tree, ranges[0], ranges[2], true));
        assert!(is_index_range_identical(&tree, ranges[3], ranges[4], true));
        assert!(compare_index_ranges(&tree, &ranges[..2], &ranges[..2]));
        assert!(!compare_index_ranges(&tree, &ranges[..2], &ranges[..1]));
    }

    #[rstest]
    fn test_swap_iteration_range_is_involution(nest: (Tree, NodeId)) {
        let (mut tree, root) = nest;
        let outer = loops(&tree, root)[0];
        let inner = tree.match_seq(outer, &[Xcode::Body, Xcode::DoStatement]).unwrap();
        let (outer_before, inner_before) = (header(&tree, outer), header(&tree, inner));

        swap_iteration_range(&mut tree, outer, inner).unwrap();
        assert_eq!(header(&tree, outer), inner_before);
        assert_eq!(header(&tree, inner), outer_before);

        swap_iteration_range(&mut tree, outer, inner).unwrap();
        assert_eq!(header(&tree, outer), outer_before);
        assert_eq!(header(&tree, inner), inner_before);
    }

    #[rstest]
    fn test_swap_moves_single_step(nest: (Tree, NodeId)) {
        let (mut tree, root) = nest;
        let middle = tree
            .match_seq(loops(&tree, root)[0], &[Xcode::Body, Xcode::DoStatement])
            .unwrap();
        let innermost = tree.match_seq(middle, &[Xcode::Body, Xcode::DoStatement]).unwrap();
        let (middle_before, innermost_before) = (header(&tree, middle), header(&tree, innermost));

        swap_iteration_range(&mut tree, middle, innermost).unwrap();
        assert_eq!(header(&tree, middle), innermost_before);
        assert_eq!(header(&tree, innermost), middle_before);

        swap_iteration_range(&mut tree, middle, innermost).unwrap();
        assert_eq!(header(&tree, middle), middle_before);
    }

    #[rstest]
    fn test_swap_rejects_non_loops(nest: (Tree, NodeId)) {
        let (mut tree, root) = nest;
        let outer = loops(&tree, root)[0];
        let pragma = tree.child(root, 0).unwrap();
        let before = tree.clone();

        assert_eq!(
            swap_iteration_range(&mut tree, outer, pragma),
            Err(TransformError::NotALoop("FpragmaStatement".into()))
        );
        assert!(tree.same_structure(root, &before, root));
    }

    #[rstest]
    fn test_extract_body(nest: (Tree, NodeId)) {
        let (mut tree, root) = nest;
        let outer = loops(&tree, root)[0];
        let middle = tree.match_seq(outer, &[Xcode::Body, Xcode::DoStatement]).unwrap();

        extract_body(&mut tree, outer, outer);
        assert_eq!(tree.next_sibling(outer), Some(middle));
        assert!(tree.children(tree.match_direct_descendant(outer, Xcode::Body).unwrap()).is_empty());
    }
}
