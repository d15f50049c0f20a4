//! The transformation kinds loopsmith knows about.
mod demote;
mod import_bounds;
mod loop_fusion;
mod loop_interchange;
mod remove;
mod rotate_operands;

pub use demote::Demote;
pub use import_bounds::ImportBounds;
pub use loop_fusion::LoopFusion;
pub use loop_interchange::LoopInterchange;
pub use remove::Remove;
pub use rotate_operands::RotateOperands;

use loopsmith_ir::{NodeId, Tree, Xcode};

use crate::directive::DirectiveParser;

/// First statement after `pragma`, skipping the pragmas in between.
pub(crate) fn next_statement(tree: &Tree, pragma: NodeId) -> Option<NodeId> {
    tree.following_siblings(pragma)
        .iter()
        .find(|sibling| !tree.is(**sibling, Xcode::PragmaStatement))
        .copied()
}

pub(crate) fn next_do_statement(tree: &Tree, pragma: NodeId) -> Option<NodeId> {
    next_statement(tree, pragma).filter(|statement| tree.is(*statement, Xcode::DoStatement))
}

/// The `end <keyword>` pragma closing the region opened at `pragma`.
pub(crate) fn find_end_pragma(
    tree: &Tree,
    parser: &dyn DirectiveParser,
    pragma: NodeId,
    keyword: &str,
) -> Option<NodeId> {
    tree.following_siblings(pragma)
        .iter()
        .filter(|sibling| tree.is(**sibling, Xcode::PragmaStatement))
        .find(|sibling| {
            parser
                .parse(tree, **sibling)
                .ok()
                .flatten()
                .is_some_and(|directive| directive.closes() == Some(keyword))
        })
        .copied()
}

#[cfg(test)]
pub(crate) mod testing {
    use loopsmith_ir::{ModuleCache, Program, Xcode};
    use loopsmith_query::TransformError;

    use crate::{
        config::TranslatorConfig,
        directive::{ClauseParser, DirectiveParser},
        transformation::{Transformation, TransformationKind},
        translator::TranslationContext,
    };

    /// A unit whose only function has `body` as its statements.
    pub(crate) fn program(types: &str, body: &str) -> Program {
        Program::from_xml(&format!(
            r#"<XcodeProgram source="unit.f90">
                 <typeTable>{}</typeTable>
                 <globalSymbols/>
                 <globalDeclarations>
                   <FfunctionDefinition lineno="1"><name>unit</name><body>{}</body></FfunctionDefinition>
                 </globalDeclarations>
               </XcodeProgram>"#,
            types, body
        ))
        .unwrap()
    }

    /// Analyzes and applies the directive found on `line`. `Ok(false)` when analysis rejects it.
    pub(crate) fn run(program: &mut Program, modules: &mut ModuleCache, line: u32) -> Result<bool, TransformError> {
        let mut transformation = transformation(program, line);
        let config = TranslatorConfig::default();
        let parser = ClauseParser::new(&config.reserved_prefix);
        let mut ctx = TranslationContext::new(&config, modules, &parser);

        if !transformation.analyze(program, &mut ctx) {
            return Ok(false);
        }
        transformation.apply(program, &mut ctx).map(|_| true)
    }

    pub(crate) fn transformation(program: &Program, line: u32) -> Transformation {
        let tree = program.tree();
        let pragma = tree
            .match_all(program.root(), Xcode::PragmaStatement)
            .into_iter()
            .find(|p| tree.line(*p) == line)
            .unwrap();
        let directive = ClauseParser::new("lsm").parse(tree, pragma).unwrap().unwrap();
        let kind = TransformationKind::from_keyword(&directive.keyword).unwrap();

        Transformation::new(directive, kind)
    }

    pub(crate) fn pragma_lines(program: &Program) -> Vec<u32> {
        let tree = program.tree();
        tree.match_all(program.root(), Xcode::PragmaStatement)
            .into_iter()
            .map(|p| tree.line(p))
            .collect()
    }
}
