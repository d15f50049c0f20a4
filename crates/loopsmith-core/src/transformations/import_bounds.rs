use loopsmith_ir::{Module, NodeId, Program, Unit, Xcode, xattr};
use loopsmith_query::{TransformError, bound};
use smol_str::SmolStr;

use super::next_do_statement;
use crate::{directive::Directive, transformation::Transform, translator::TranslationContext};

/// `import-bounds module(m) array(a) [dimension(n)]`: takes the iteration range of the
/// following loop from the n-th declared dimension of an array living in another module.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportBounds {
    module: SmolStr,
    array: SmolStr,
    dimension: usize,
    do_statement: Option<NodeId>,
}

impl ImportBounds {
    /// The `indexRange` of the requested dimension, as declared in `module`.
    fn declared_range(&self, module: &Module) -> Result<NodeId, TransformError> {
        let illegal = |message: String| TransformError::Illegal(message);
        let symbol = module
            .symbols()
            .get(&self.array)
            .ok_or_else(|| illegal(format!("`{}` is not declared in module `{}`", self.array, self.module)))?;
        let array_type = symbol
            .type_id
            .as_deref()
            .and_then(|type_id| module.type_table().basic_type(type_id))
            .filter(|t| t.is_array())
            .ok_or_else(|| illegal(format!("`{}` is not an array", self.array)))?;
        let range = array_type
            .dimension(self.dimension - 1)
            .filter(|d| module.tree().is(*d, Xcode::IndexRange))
            .ok_or_else(|| illegal(format!("`{}` has no dimension {}", self.array, self.dimension)))?;

        if module.tree().bool_attr(range, xattr::IS_ASSUMED_SHAPE) {
            return Err(illegal(format!(
                "Dimension {} of `{}` is assumed-shape",
                self.dimension, self.array
            )));
        }

        Ok(range)
    }
}

impl Transform for ImportBounds {
    fn analyze(&mut self, program: &Program, directive: &Directive, _ctx: &mut TranslationContext<'_>) -> bool {
        let tree = program.tree();
        let (Some(module), Some(array)) = (directive.arg("module"), directive.arg("array")) else {
            log::debug!("import-bounds at line {} needs module and array", directive.line);
            return false;
        };
        let dimension = match directive.arg("dimension").map(str::parse::<usize>) {
            None => 1,
            Some(Ok(dimension)) if dimension >= 1 => dimension,
            Some(_) => {
                log::debug!("import-bounds at line {}: invalid dimension", directive.line);
                return false;
            }
        };

        let do_statement = next_do_statement(tree, directive.pragma).filter(|loop_| {
            [Xcode::LowerBound, Xcode::UpperBound]
                .iter()
                .all(|bound| tree.match_seq(*loop_, &[Xcode::IndexRange, *bound]).is_some())
        });
        if do_statement.is_none() {
            log::debug!("import-bounds at line {} is not followed by a bounded loop", directive.line);
            return false;
        }

        self.module = module.into();
        self.array = array.into();
        self.dimension = dimension;
        self.do_statement = do_statement;
        true
    }

    fn transform(
        &mut self,
        program: &mut Program,
        _directive: &Directive,
        ctx: &mut TranslationContext<'_>,
        _other: Option<&Self>,
    ) -> Result<(), TransformError> {
        let do_statement = self
            .do_statement
            .ok_or_else(|| TransformError::Illegal("import-bounds applied without analysis".to_string()))?;
        let module = ctx.modules.load(&self.module)?;
        let range = self.declared_range(module)?;

        let source_bound = |opcode: Xcode| {
            module
                .tree()
                .match_direct_descendant(range, opcode)
                .ok_or(TransformError::MissingIterationRange)
        };
        let (source_lower, source_upper) = (source_bound(Xcode::LowerBound)?, source_bound(Xcode::UpperBound)?);

        let lower = bound::duplicate_bound(module, source_lower, program)?;
        let upper = match bound::duplicate_bound(module, source_upper, program) {
            Ok(upper) => upper,
            Err(e) => {
                program.tree_mut().delete(lower);
                return Err(e);
            }
        };

        let tree = program.tree_mut();
        let target_bound = |opcode: Xcode| {
            tree.match_seq(do_statement, &[Xcode::IndexRange, opcode])
                .ok_or(TransformError::MissingIterationRange)
        };
        let (target_lower, target_upper) = (target_bound(Xcode::LowerBound)?, target_bound(Xcode::UpperBound)?);

        tree.replace(target_lower, lower);
        tree.replace(target_upper, upper);
        log::debug!("Imported bounds of `{}` from module `{}`", self.array, self.module);
        Ok(())
    }
}
