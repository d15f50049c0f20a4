use loopsmith_ir::{NodeId, Program, Xcode};
use loopsmith_query::{TransformError, body, loops, pragma};
use smol_str::SmolStr;

use super::next_do_statement;
use crate::{directive::Directive, transformation::Transform, translator::TranslationContext};

/// Pragmas around a fused-away loop that only made sense for that loop.
const LOOP_PRAGMA_KEYWORDS: [&str; 1] = ["loop"];

/// `loop-fusion [group(name)]`: merges the body of a later loop with the same iteration
/// range into this one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoopFusion {
    group: Option<SmolStr>,
    do_statement: Option<NodeId>,
}

impl Transform for LoopFusion {
    fn analyze(&mut self, program: &Program, directive: &Directive, _ctx: &mut TranslationContext<'_>) -> bool {
        let Some(do_statement) = next_do_statement(program.tree(), directive.pragma) else {
            log::debug!("loop-fusion at line {} is not followed by a do statement", directive.line);
            return false;
        };

        self.group = directive.arg("group").map(|group| group.to_ascii_lowercase().into());
        self.do_statement = Some(do_statement);
        true
    }

    fn can_be_transformed_with(&self, program: &Program, other: &Self) -> bool {
        let tree = program.tree();
        let (Some(left), Some(right)) = (self.do_statement, other.do_statement) else {
            return false;
        };

        left != right
            && self.group == other.group
            && tree.parent(left).is_some()
            && tree.parent(left) == tree.parent(right)
            && loops::has_same_index_range(tree, left, right)
    }

    fn transform(
        &mut self,
        program: &mut Program,
        directive: &Directive,
        ctx: &mut TranslationContext<'_>,
        other: Option<&Self>,
    ) -> Result<(), TransformError> {
        let Some(other) = other else {
            log::debug!("loop-fusion at line {} has no partner", directive.line);
            return Ok(());
        };
        let (Some(target), Some(fused)) = (self.do_statement, other.do_statement) else {
            return Err(TransformError::Illegal("loop-fusion applied without analysis".to_string()));
        };

        let tree = program.tree_mut();
        let body_of = |loop_: NodeId| tree.match_direct_descendant(loop_, Xcode::Body);
        let (Some(target_body), Some(fused_body)) = (body_of(target), body_of(fused)) else {
            return Err(TransformError::NotABody);
        };

        body::append_body(tree, target_body, fused_body)?;
        pragma::clean_pragmas(
            tree,
            fused,
            &LOOP_PRAGMA_KEYWORDS,
            &LOOP_PRAGMA_KEYWORDS,
            ctx.reserved_prefix(),
        );
        tree.delete(fused);
        Ok(())
    }
}
