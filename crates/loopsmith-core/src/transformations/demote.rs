use loopsmith_ir::{NodeId, Program};
use loopsmith_query::{TransformError, references};
use smol_str::SmolStr;

use super::find_end_pragma;
use crate::{directive::Directive, transformation::Transform, translator::TranslationContext};

/// `demote array(a) [keep(d, ...)]` ... `end demote`: drops dimensions of every reference to
/// `a` inside the region. Without `keep` the references become scalars.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Demote {
    array: SmolStr,
    keep: Vec<usize>,
    end: Option<NodeId>,
}

impl Transform for Demote {
    fn analyze(&mut self, program: &Program, directive: &Directive, ctx: &mut TranslationContext<'_>) -> bool {
        let Some(array) = directive.arg("array") else {
            log::debug!("demote at line {} names no array", directive.line);
            return false;
        };
        let Ok(keep) = directive
            .args("keep")
            .iter()
            .map(|dimension| dimension.parse::<usize>().ok().filter(|d| *d >= 1).ok_or(()))
            .collect::<Result<Vec<_>, _>>()
        else {
            log::debug!("demote at line {}: kept dimensions must be positive", directive.line);
            return false;
        };
        let Some(end) = find_end_pragma(program.tree(), ctx.parser, directive.pragma, "demote") else {
            log::debug!("demote at line {} has no end directive", directive.line);
            return false;
        };

        self.array = array.into();
        self.keep = keep;
        self.end = Some(end);
        true
    }

    fn transform(
        &mut self,
        program: &mut Program,
        directive: &Directive,
        _ctx: &mut TranslationContext<'_>,
        _other: Option<&Self>,
    ) -> Result<(), TransformError> {
        let end = self
            .end
            .ok_or_else(|| TransformError::Illegal("demote applied without analysis".to_string()))?;
        let tree = program.tree_mut();

        let array_refs = tree
            .following_siblings(directive.pragma)
            .iter()
            .take_while(|sibling| **sibling != end)
            .flat_map(|sibling| references::all_array_references(tree, *sibling, &self.array))
            .collect::<Vec<_>>();
        if array_refs.is_empty() {
            return Err(TransformError::Illegal(format!(
                "No reference to `{}` in the demote region",
                self.array
            )));
        }

        for array_ref in &array_refs {
            references::check_kept_dimensions(tree, *array_ref, &self.keep)?;
        }

        for array_ref in array_refs {
            if self.keep.is_empty() {
                references::demote_to_scalar(tree, array_ref);
            } else {
                references::demote(tree, array_ref, &self.keep)?;
            }
        }

        tree.delete(end);
        Ok(())
    }
}
