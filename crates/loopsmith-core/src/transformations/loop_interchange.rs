use loopsmith_ir::Program;
use loopsmith_query::{TransformError, loops, loops::NestedDoStatement};
use smol_str::SmolStr;

use super::next_do_statement;
use crate::{directive::Directive, transformation::Transform, translator::TranslationContext};

/// `loop-interchange [order(i, j[, k])]`: reorders the levels of a perfect loop nest.
///
/// Without a new order the two outer loops are swapped. With three induction variables the
/// nest is three levels deep and is rearranged to follow them, outermost first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoopInterchange {
    order: Vec<SmolStr>,
    nest: Option<NestedDoStatement>,
}

impl LoopInterchange {
    fn depth(&self) -> Option<usize> {
        match self.order.len() {
            0 | 2 => Some(2),
            3 => Some(3),
            _ => None,
        }
    }
}

impl Transform for LoopInterchange {
    fn analyze(&mut self, program: &Program, directive: &Directive, _ctx: &mut TranslationContext<'_>) -> bool {
        let tree = program.tree();
        self.order = directive
            .args("order")
            .iter()
            .map(|arg| arg.to_ascii_lowercase().into())
            .collect();

        let Some(depth) = self.depth() else {
            log::debug!("loop-interchange at line {}: cannot order {} loops", directive.line, self.order.len());
            return false;
        };
        let Some(nest) = next_do_statement(tree, directive.pragma)
            .and_then(|outer| NestedDoStatement::from_outer(tree, outer, depth))
            .filter(|nest| nest.len() == depth)
        else {
            log::debug!("loop-interchange at line {}: no {}-level loop nest", directive.line, depth);
            return false;
        };

        let variables = nest
            .induction_variables(tree)
            .into_iter()
            .map(|var| var.to_ascii_lowercase())
            .collect::<Vec<_>>();
        let known = self.order.iter().all(|var| variables.iter().any(|v| v == var));
        let distinct = self
            .order
            .iter()
            .enumerate()
            .all(|(i, var)| !self.order[..i].contains(var));
        if variables.len() != depth || !known || !distinct {
            log::debug!("loop-interchange at line {}: order does not match the nest", directive.line);
            return false;
        }

        self.nest = Some(nest);
        true
    }

    fn transform(
        &mut self,
        program: &mut Program,
        _directive: &Directive,
        _ctx: &mut TranslationContext<'_>,
        _other: Option<&Self>,
    ) -> Result<(), TransformError> {
        let nest = self
            .nest
            .as_ref()
            .ok_or_else(|| TransformError::Illegal("loop-interchange applied without analysis".to_string()))?;
        let tree = program.tree_mut();

        if self.order.is_empty() {
            let (Some(outer), Some(inner)) = (nest.get(0), nest.get(1)) else {
                return Err(TransformError::MissingIterationRange);
            };
            return loops::swap_iteration_range(tree, outer, inner);
        }

        // Loop headers move, the loop nodes stay, so level n always sits at nest.get(n).
        for (level, wanted) in self.order.iter().enumerate() {
            let current = nest
                .induction_variables(tree)
                .iter()
                .position(|var| var.eq_ignore_ascii_case(wanted))
                .ok_or_else(|| TransformError::Illegal(format!("Induction variable `{}` vanished", wanted)))?;

            if current != level {
                let (Some(left), Some(right)) = (nest.get(level), nest.get(current)) else {
                    return Err(TransformError::MissingIterationRange);
                };
                loops::swap_iteration_range(tree, left, right)?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use loopsmith_ir::{ModuleCache, Xcode};
    use rstest::rstest;

    use super::*;
    use crate::transformations::testing::{pragma_lines, program, run};

    fn nest(clauses: &str) -> Program {
        program(
            "",
            &format!(
                r#"<FpragmaStatement lineno="2">lsm loop-interchange {clauses}</FpragmaStatement>
                   <FdoStatement lineno="3">
                     <Var>i</Var>
                     <indexRange>
                       <lowerBound><FintConstant>1</FintConstant></lowerBound>
                       <upperBound><Var>ni</Var></upperBound>
                     </indexRange>
                     <body>
                       <FdoStatement lineno="4">
                         <Var>j</Var>
                         <indexRange>
                           <lowerBound><FintConstant>1</FintConstant></lowerBound>
                           <upperBound><Var>nj</Var></upperBound>
                         </indexRange>
                         <body>
                           <FdoStatement lineno="5">
                             <Var>k</Var>
                             <indexRange>
                               <lowerBound><FintConstant>2</FintConstant></lowerBound>
                               <upperBound><Var>nk</Var></upperBound>
                               <step><FintConstant>2</FintConstant></step>
                             </indexRange>
                             <body/>
                           </FdoStatement>
                         </body>
                       </FdoStatement>
                     </body>
                   </FdoStatement>"#
            ),
        )
    }

    fn headers(program: &Program) -> Vec<(String, String)> {
        let tree = program.tree();
        tree.match_all(program.root(), Xcode::DoStatement)
            .into_iter()
            .map(|loop_| {
                let var = loops::extract_induction_variable(tree, loop_).unwrap().to_string();
                let upper = tree
                    .match_seq(loop_, &[Xcode::IndexRange, Xcode::UpperBound, Xcode::Var])
                    .map(|v| tree.value(v).to_string())
                    .unwrap();
                (var, upper)
            })
            .collect()
    }

    fn expected(order: &[&str]) -> Vec<(String, String)> {
        order.iter().map(|v| (v.to_string(), format!("n{v}"))).collect()
    }

    #[rstest]
    #[case::default_swap("", &["j", "i", "k"])]
    #[case::two_levels("order(j, i)", &["j", "i", "k"])]
    #[case::identity("order(i,j,k)", &["i", "j", "k"])]
    #[case::rotate("order(k,i,j)", &["k", "i", "j"])]
    #[case::reverse("ORDER(K,J,I)", &["k", "j", "i"])]
    #[case::middle_first("order(j,k,i)", &["j", "k", "i"])]
    fn test_interchange(#[case] clauses: &str, #[case] order: &[&str]) {
        let mut program = nest(clauses);
        let mut modules = ModuleCache::default();

        assert_eq!(run(&mut program, &mut modules, 2), Ok(true));
        assert_eq!(
            headers(&program)
                .into_iter()
                .map(|(v, u)| (v.to_ascii_lowercase(), u))
                .collect::<Vec<_>>(),
            expected(order)
        );
        assert!(pragma_lines(&program).is_empty());
    }

    #[test]
    fn test_interchange_moves_step() {
        let mut program = nest("order(k,j,i)");
        let mut modules = ModuleCache::default();

        assert_eq!(run(&mut program, &mut modules, 2), Ok(true));
        let tree = program.tree();
        let outer = tree.match_descendant(program.root(), Xcode::DoStatement).unwrap();
        let step = tree.match_seq(outer, &[Xcode::IndexRange, Xcode::Step]);
        assert!(step.is_some());
    }

    #[rstest]
    #[case::unknown_variable("order(i,z)")]
    #[case::repeated_variable("order(i,i,j)")]
    #[case::too_many("order(i,j,k,l)")]
    #[case::single("order(i)")]
    fn test_interchange_rejected(#[case] clauses: &str) {
        let mut program = nest(clauses);
        let before = program.to_xml().unwrap();
        let mut modules = ModuleCache::default();

        assert_eq!(run(&mut program, &mut modules, 2), Ok(false));
        assert_eq!(program.to_xml().unwrap(), before);
    }
}
