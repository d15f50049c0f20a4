use loopsmith_ir::{NodeId, Program};
use loopsmith_query::{TransformError, siblings};

use super::{find_end_pragma, next_statement};
use crate::{directive::Directive, transformation::Transform, translator::TranslationContext};

/// `remove` ... `end remove` deletes the region. A lone `remove` deletes the next statement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Remove {
    end: Option<NodeId>,
    statement: Option<NodeId>,
}

impl Transform for Remove {
    fn analyze(&mut self, program: &Program, directive: &Directive, ctx: &mut TranslationContext<'_>) -> bool {
        let tree = program.tree();

        self.end = find_end_pragma(tree, ctx.parser, directive.pragma, "remove");
        self.statement = match self.end {
            Some(_) => None,
            None => next_statement(tree, directive.pragma),
        };

        if self.end.is_none() && self.statement.is_none() {
            log::debug!("remove at line {} has nothing to remove", directive.line);
            return false;
        }
        true
    }

    fn transform(
        &mut self,
        program: &mut Program,
        directive: &Directive,
        _ctx: &mut TranslationContext<'_>,
        _other: Option<&Self>,
    ) -> Result<(), TransformError> {
        let tree = program.tree_mut();

        match self.end {
            Some(end) => {
                siblings::delete_between(tree, directive.pragma, end);
                tree.delete(end);
            }
            None => siblings::safe_delete(tree, self.statement),
        }

        Ok(())
    }
}
