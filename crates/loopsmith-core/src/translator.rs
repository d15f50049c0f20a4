use loopsmith_ir::{ModuleCache, NodeId, Program, Tree, Unit, Xcode, xattr};
use loopsmith_query::pragma;

use crate::{
    config::TranslatorConfig,
    diagnostics::{Report, Severity},
    directive::{ClauseParser, DirectiveParser},
    error::FatalError,
    group::{GroupKind, TransformationGroup},
    transformation::{Transformation, TransformationKind},
};

/// Registered keywords with their grouping, in application order.
pub const REGISTRY: [(&str, GroupKind); 6] = [
    ("loop-fusion", GroupKind::Dependent),
    ("loop-interchange", GroupKind::Independent),
    ("import-bounds", GroupKind::Independent),
    ("demote", GroupKind::Independent),
    ("remove", GroupKind::Independent),
    ("rotate-operands", GroupKind::Independent),
];

/// What analyze and transform get to see besides the program.
pub struct TranslationContext<'a> {
    pub config: &'a TranslatorConfig,
    pub modules: &'a mut ModuleCache,
    pub parser: &'a dyn DirectiveParser,
}

impl<'a> TranslationContext<'a> {
    pub fn new(config: &'a TranslatorConfig, modules: &'a mut ModuleCache, parser: &'a dyn DirectiveParser) -> Self {
        Self {
            config,
            modules,
            parser,
        }
    }

    #[inline(always)]
    pub fn reserved_prefix(&self) -> &str {
        &self.config.reserved_prefix
    }
}

/// Drives every registered transformation over one program.
#[derive(Debug, Clone)]
pub struct Translator<P: DirectiveParser = ClauseParser> {
    config: TranslatorConfig,
    parser: P,
}

impl Translator {
    pub fn new(config: TranslatorConfig) -> Self {
        let parser = ClauseParser::new(&config.reserved_prefix);
        Self { config, parser }
    }
}

impl Default for Translator {
    fn default() -> Self {
        Self::new(TranslatorConfig::default())
    }
}

impl<P: DirectiveParser> Translator<P> {
    pub fn with_parser(config: TranslatorConfig, parser: P) -> Self {
        Self { config, parser }
    }

    pub fn config(&self) -> &TranslatorConfig {
        &self.config
    }

    /// Translates one unit in place.
    ///
    /// A unit without its root tables fails before anything is touched. Every other problem is
    /// reported in the returned [`Report`] and only drops the transformation it concerns.
    pub fn translate(&self, program: &mut Program, modules: &mut ModuleCache) -> Result<Report, FatalError> {
        program
            .validate()
            .map_err(|cause| FatalError::new(program.unit_name(), cause))?;

        let mut report = Report::new(program.unit_name());
        let mut groups = REGISTRY
            .iter()
            .map(|(keyword, kind)| TransformationGroup::new(keyword, *kind))
            .collect::<Vec<_>>();

        self.discover(program, &mut groups, &mut report);

        let mut ctx = TranslationContext::new(&self.config, modules, &self.parser);
        for group in groups.iter_mut().filter(|group| !group.is_empty()) {
            log::debug!("Applying {} `{}` directive(s)", group.len(), group.keyword());
            group.apply(program, &mut ctx, &mut report);
        }

        if let Some(max_columns) = self.config.max_columns {
            let root = program.root();
            let wrapped = wrap_pragmas(program.tree_mut(), root, max_columns, &self.config.reserved_prefix);
            if wrapped > 0 {
                log::debug!("Wrapped {} pragma(s) at {} columns", wrapped, max_columns);
            }
        }

        Ok(report)
    }

    fn discover(&self, program: &Program, groups: &mut [TransformationGroup], report: &mut Report) {
        let tree = program.tree();

        for node in tree.match_all(program.root(), Xcode::PragmaStatement) {
            let directive = match self.parser.parse(tree, node) {
                Ok(Some(directive)) if !directive.is_end() => directive,
                Ok(_) => continue,
                Err(e) => {
                    report.push(tree.line(node), e.to_string(), Severity::Warning);
                    continue;
                }
            };

            let group = groups.iter_mut().find(|group| directive.keyword == group.keyword());
            match (group, TransformationKind::from_keyword(&directive.keyword)) {
                (Some(group), Some(kind)) => group.push(Transformation::new(directive, kind)),
                _ => report.push(
                    directive.line,
                    format!("Unknown directive `{}`", directive.keyword),
                    Severity::Warning,
                ),
            }
        }
    }
}

/// Splits foreign pragmas longer than `max_columns` into continued pragmas.
fn wrap_pragmas(tree: &mut Tree, root: NodeId, max_columns: usize, reserved_prefix: &str) -> usize {
    let mut wrapped = 0;

    for node in tree.match_all(root, Xcode::PragmaStatement) {
        let prefix = pragma::pragma_prefix(tree, node).to_string();
        if prefix.is_empty() || prefix.eq_ignore_ascii_case(reserved_prefix) {
            continue;
        }

        let chunks = pragma::split_by_length(tree.value(node), max_columns, &prefix);
        let [first, rest @ ..] = chunks.as_slice() else {
            continue;
        };
        if rest.is_empty() {
            continue;
        }

        let line = tree.attr(node, xattr::LINENO).map(str::to_string);
        tree.set_value(node, first);
        tree.set_attr(node, xattr::IS_CONTINUED, "true");

        let mut anchor = node;
        for (index, chunk) in rest.iter().enumerate() {
            let continuation = tree.new_leaf(Xcode::PragmaStatement, &format!("{} {}", prefix, chunk));
            if let Some(line) = &line {
                tree.set_attr(continuation, xattr::LINENO, line);
            }
            if index + 1 < rest.len() {
                tree.set_attr(continuation, xattr::IS_CONTINUED, "true");
            }
            tree.insert_after(anchor, continuation);
            anchor = continuation;
        }
        wrapped += 1;
    }

    wrapped
}
