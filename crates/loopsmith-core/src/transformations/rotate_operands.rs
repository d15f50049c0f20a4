use loopsmith_ir::{NodeId, Program, Xcode};
use loopsmith_query::TransformError;

use super::next_statement;
use crate::{directive::Directive, transformation::Transform, translator::TranslationContext};

/// Operators whose operands can be reordered without changing the value.
const COMMUTATIVE: [Xcode; 2] = [Xcode::PlusExpr, Xcode::MulExpr];

/// `rotate-operands`: moves the first operand of the right-hand side of the next assignment
/// to the end.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RotateOperands {
    expression: Option<NodeId>,
}

impl Transform for RotateOperands {
    fn analyze(&mut self, program: &Program, directive: &Directive, _ctx: &mut TranslationContext<'_>) -> bool {
        let tree = program.tree();
        let expression = next_statement(tree, directive.pragma)
            .filter(|statement| tree.is(*statement, Xcode::AssignStatement))
            .and_then(|assign| tree.child(assign, 1))
            .filter(|rhs| COMMUTATIVE.contains(&tree.opcode(*rhs)) && tree.children(*rhs).len() >= 2);

        if expression.is_none() {
            log::debug!("rotate-operands at line {} needs an assignment of a sum or product", directive.line);
            return false;
        }
        self.expression = expression;
        true
    }

    fn transform(
        &mut self,
        program: &mut Program,
        _directive: &Directive,
        _ctx: &mut TranslationContext<'_>,
        _other: Option<&Self>,
    ) -> Result<(), TransformError> {
        let tree = program.tree_mut();
        let expression = self
            .expression
            .ok_or_else(|| TransformError::Illegal("rotate-operands applied without analysis".to_string()))?;
        let first = tree
            .first_child(expression)
            .ok_or_else(|| TransformError::Illegal("Expression lost its operands".to_string()))?;

        tree.append(expression, first);
        Ok(())
    }
}
