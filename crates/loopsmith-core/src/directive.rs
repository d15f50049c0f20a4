use loopsmith_ir::{NodeId, Tree, Xcode};
use loopsmith_query::{TransformError, pragma};
use smol_str::SmolStr;

/// Keyword of the pragma closing a region, as in `end remove`.
pub const END_KEYWORD: &str = "end";

#[derive(Debug, Clone, PartialEq)]
pub struct Clause {
    pub name: SmolStr,
    pub args: Vec<SmolStr>,
}

/// A parsed pragma: its node, its keyword and the clauses after it.
#[derive(Debug, Clone, PartialEq)]
pub struct Directive {
    pub pragma: NodeId,
    pub keyword: SmolStr,
    pub clauses: Vec<Clause>,
    pub line: u32,
}

impl Directive {
    pub fn clause(&self, name: &str) -> Option<&Clause> {
        self.clauses.iter().find(|c| c.name == name)
    }

    pub fn has_clause(&self, name: &str) -> bool {
        self.clause(name).is_some()
    }

    pub fn args(&self, name: &str) -> &[SmolStr] {
        self.clause(name).map_or(&[], |c| c.args.as_slice())
    }

    /// First argument of a clause.
    pub fn arg(&self, name: &str) -> Option<&str> {
        self.args(name).first().map(SmolStr::as_str)
    }

    pub fn is_end(&self) -> bool {
        self.keyword == END_KEYWORD
    }

    /// Keyword closed by an `end` directive.
    pub fn closes(&self) -> Option<&str> {
        if !self.is_end() {
            return None;
        }

        self.clauses.first().map(|c| c.name.as_str())
    }
}

/// Turns pragma nodes into directives.
pub trait DirectiveParser {
    /// `Ok(None)` for pragmas that do not belong to loopsmith.
    fn parse(&self, tree: &Tree, pragma: NodeId) -> Result<Option<Directive>, TransformError>;
}

/// Reads `<prefix> <keyword> name name(arg, arg) ...`.
///
/// Keywords and clause names are lowercased, arguments keep their case.
#[derive(Debug, Clone)]
pub struct ClauseParser {
    reserved_prefix: SmolStr,
}

impl ClauseParser {
    pub fn new(reserved_prefix: &str) -> Self {
        Self {
            reserved_prefix: reserved_prefix.into(),
        }
    }

    pub fn reserved_prefix(&self) -> &str {
        &self.reserved_prefix
    }
}

impl DirectiveParser for ClauseParser {
    fn parse(&self, tree: &Tree, node: NodeId) -> Result<Option<Directive>, TransformError> {
        if !tree.is(node, Xcode::PragmaStatement) {
            return Ok(None);
        }

        let text = pragma::drop_ending_comment(tree.value(node)).trim();
        let mut words = text.splitn(2, char::is_whitespace);
        if !words
            .next()
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case(&self.reserved_prefix))
        {
            return Ok(None);
        }

        let rest = words.next().unwrap_or_default().trim_start();
        let (keyword, rest) = match rest.find(|c: char| c.is_whitespace() || c == '(') {
            Some(index) => rest.split_at(index),
            None => (rest, ""),
        };
        if keyword.is_empty() {
            return Err(TransformError::Illegal(format!("Directive `{}` has no keyword", text)));
        }

        Ok(Some(Directive {
            pragma: node,
            keyword: keyword.to_ascii_lowercase().into(),
            clauses: parse_clauses(rest)
                .ok_or_else(|| TransformError::Illegal(format!("Unbalanced parentheses in directive `{}`", text)))?,
            line: tree.line(node),
        }))
    }
}

fn parse_clauses(text: &str) -> Option<Vec<Clause>> {
    let mut clauses = Vec::new();
    let mut rest = text.trim_start();

    while !rest.is_empty() {
        let end = rest
            .find(|c: char| c.is_whitespace() || c == '(' || c == ')')
            .unwrap_or(rest.len());
        let name = &rest[..end];
        rest = rest[end..].trim_start();

        if name.is_empty() {
            return None;
        }

        let args = match rest.strip_prefix('(') {
            Some(inner) => {
                let close = inner.find(')')?;
                if inner[..close].contains('(') {
                    return None;
                }
                rest = inner[close + 1..].trim_start();
                inner[..close]
                    .split(',')
                    .map(str::trim)
                    .filter(|arg| !arg.is_empty())
                    .map(SmolStr::new)
                    .collect()
            }
            None => Vec::new(),
        };

        clauses.push(Clause {
            name: name.to_ascii_lowercase().into(),
            args,
        });
    }

    Some(clauses)
}
