use itertools::Itertools;
use loopsmith_ir::{Intent, NodeId, Program, Tree, Xcode, is_builtin_type, xattr};

/// Literal source text of an expression subtree.
pub fn representation(tree: &Tree, node: NodeId) -> String {
    let opcode = tree.opcode(node);
    let child = |index: usize| {
        tree.child(node, index)
            .map(|c| representation(tree, c))
            .unwrap_or_default()
    };

    match opcode {
        Xcode::ArrayRef => {
            let name = tree
                .match_seq(node, &[Xcode::VarRef, Xcode::Var])
                .map(|var| tree.value(var).to_string())
                .unwrap_or_default();
            let indexes = tree
                .children(node)
                .iter()
                .skip(1)
                .map(|index| representation(tree, *index))
                .join(",");
            format!("{}({})", name, indexes)
        }
        Xcode::VarRef | Xcode::ArrayIndex | Xcode::LowerBound | Xcode::UpperBound | Xcode::Step => child(0),
        Xcode::IndexRange if tree.bool_attr(node, xattr::IS_ASSUMED_SHAPE) => ":".to_string(),
        Xcode::IndexRange => {
            let part = |opcode: Xcode| {
                tree.match_direct_descendant(node, opcode)
                    .map(|p| representation(tree, p))
                    .unwrap_or_default()
            };
            match tree.match_direct_descendant(node, Xcode::Step) {
                Some(_) => format!("{}:{}:{}", part(Xcode::LowerBound), part(Xcode::UpperBound), part(Xcode::Step)),
                None => format!("{}:{}", part(Xcode::LowerBound), part(Xcode::UpperBound)),
            }
        }
        Xcode::UnaryMinusExpr => format!("-{}", operand(tree, node, 0, Xcode::MulExpr, false)),
        Xcode::LogNotExpr => format!(".not.{}", operand(tree, node, 0, Xcode::LogEqExpr, false)),
        Xcode::FunctionCall => {
            let name = tree
                .match_direct_descendant(node, Xcode::Name)
                .map(|n| tree.value(n))
                .unwrap_or_default();
            let args = tree
                .match_direct_descendant(node, Xcode::Arguments)
                .map(|args| {
                    tree.children(args)
                        .iter()
                        .map(|arg| representation(tree, *arg))
                        .join(",")
                })
                .unwrap_or_default();
            format!("{}({})", name, args)
        }
        Xcode::NamedValue => format!("{}={}", tree.attr(node, xattr::NAME).unwrap_or_default(), child(0)),
        _ => match opcode.binary_operator() {
            Some(operator) => format!(
                "{} {} {}",
                operand(tree, node, 0, opcode, false),
                operator,
                operand(tree, node, 1, opcode, true)
            ),
            None => tree.value(node).to_string(),
        },
    }
}

/// Text of the `index`-th operand of `node`, parenthesized when it binds looser than
/// `parent`. A right operand of equal strength is parenthesized too, except under `**`
/// which groups to the right.
fn operand(tree: &Tree, node: NodeId, index: usize, parent: Xcode, right: bool) -> String {
    let Some(child) = tree.child(node, index) else {
        return String::new();
    };
    let text = representation(tree, child);

    let wrap = match (tree.opcode(child).precedence(), parent.precedence()) {
        (Some(inner), Some(outer)) if right && parent != Xcode::PowerExpr => inner <= outer,
        (Some(inner), Some(outer)) if !right && parent == Xcode::PowerExpr => inner <= outer,
        (Some(inner), Some(outer)) => inner < outer,
        _ => false,
    };
    if wrap { format!("({})", text) } else { text }
}

/// Returns the source text of the arguments of `call` whose formal parameter matches
/// `intent`, restricted to array-typed arguments when `array_only` is set.
///
/// Arguments pair with parameters by position; pairing stops at the shorter list.
pub fn gather_arguments(program: &Program, call: NodeId, intent: Intent, array_only: bool) -> Vec<String> {
    let tree = program.tree();
    let types = program.type_table();

    if !tree.is(call, Xcode::FunctionCall) {
        return Vec::new();
    }
    let Some(arguments) = tree.match_descendant(call, Xcode::Arguments) else {
        return Vec::new();
    };
    let Some(function_type) = types.function_type_of_call(tree, call) else {
        log::debug!("No function type for call at line {}", tree.line(call));
        return Vec::new();
    };

    function_type
        .params
        .iter()
        .zip(tree.children(arguments).iter())
        .filter_map(|(param, arg)| {
            let parameter = types.basic_type(&param.type_id)?;
            if !intent.is_compatible(parameter.intent) {
                return None;
            }

            let argument_type = tree.type_id(*arg);
            let keep = match argument_type {
                Some(type_id) if is_builtin_type(type_id) => !array_only,
                Some(type_id) => types
                    .basic_type(type_id)
                    .is_some_and(|arg_type| !array_only || arg_type.is_array()),
                None => false,
            };

            keep.then(|| representation(tree, *arg)).filter(|rep| !rep.is_empty())
        })
        .collect()
}

/// Finds the argument of `call` whose value is `value`.
pub fn find_arg(tree: &Tree, value: &str, call: NodeId) -> Option<NodeId> {
    if !tree.is(call, Xcode::FunctionCall) {
        return None;
    }

    tree.match_direct_descendant(call, Xcode::Arguments)
        .and_then(|args| {
            tree.children(args)
                .iter()
                .find(|arg| tree.value(**arg).eq_ignore_ascii_case(value))
                .copied()
        })
}

#[cfg(test)]
mod tests {
    use rstest::{fixture, rstest};

    use super::*;

    const CALL: &str = r#"
      <XcodeProgram source="call.f90">
        <typeTable>
          <FbasicType type="A1" ref="Freal"><indexRange is_assumed_shape="true"/></FbasicType>
          <FbasicType type="A2" ref="Freal"><indexRange is_assumed_shape="true"/></FbasicType>
          <FbasicType type="P_in" ref="Fint" intent="in"/>
          <FbasicType type="P_out" ref="A1" intent="out"/>
          <FbasicType type="P_inout" ref="A2" intent="inout"/>
          <FbasicType type="R1" ref="Freal"/>
          <FfunctionType type="F1" return_type="Fvoid">
            <params>
              <name type="P_in">n</name>
              <name type="P_out">t</name>
              <name type="P_inout">q</name>
            </params>
          </FfunctionType>
        </typeTable>
        <globalSymbols/>
        <globalDeclarations>
          <FfunctionDefinition>
            <name>caller</name>
            <body>
              <exprStatement lineno="7">
                <functionCall>
                  <name type="F1">compute</name>
                  <arguments>
                    <Var type="Fint">nproma</Var>
                    <Var type="A1">t</Var>
                    <Var type="A2">q</Var>
                    <Var type="R1">extra</Var>
                  </arguments>
                </functionCall>
              </exprStatement>
            </body>
          </FfunctionDefinition>
        </globalDeclarations>
      </XcodeProgram>"#;

    #[fixture]
    fn program() -> Program {
        Program::from_xml(CALL).unwrap()
    }

    fn call(program: &Program) -> NodeId {
        program
            .tree()
            .match_descendant(program.root(), Xcode::FunctionCall)
            .unwrap()
    }

    #[rstest]
    #[case::in_intent(Intent::In, false, vec!["nproma", "q"])]
    #[case::out_intent(Intent::Out, false, vec!["t", "q"])]
    #[case::inout_intent(Intent::InOut, false, vec!["nproma", "t", "q"])]
    #[case::in_arrays(Intent::In, true, vec!["q"])]
    #[case::any_arrays(Intent::Any, true, vec!["t", "q"])]
    #[case::none(Intent::None, false, vec![])]
    fn test_gather_arguments(
        program: Program,
        #[case] intent: Intent,
        #[case] array_only: bool,
        #[case] expected: Vec<&str>,
    ) {
        let call = call(&program);
        assert_eq!(gather_arguments(&program, call, intent, array_only), expected);
    }

    #[rstest]
    fn test_gather_arguments_requires_call(program: Program) {
        assert!(gather_arguments(&program, program.root(), Intent::Any, false).is_empty());
    }

    #[rstest]
    fn test_find_arg(program: Program) {
        let call = call(&program);
        let tree = program.tree();

        assert_eq!(find_arg(tree, "T", call).map(|arg| tree.value(arg)), Some("t"));
        assert!(find_arg(tree, "missing", call).is_none());
        assert!(find_arg(tree, "t", program.root()).is_none());
    }

    #[rstest]
    #[case::array_ref(
        r#"<FarrayRef><varRef><Var>a</Var></varRef><arrayIndex><Var>i</Var></arrayIndex><indexRange is_assumed_shape="true"/></FarrayRef>"#,
        "a(i,:)"
    )]
    #[case::plus(r#"<plusExpr><Var>n</Var><FintConstant>1</FintConstant></plusExpr>"#, "n + 1")]
    #[case::call(
        r#"<functionCall><name>f</name><arguments><Var>x</Var><unaryMinusExpr><Var>y</Var></unaryMinusExpr></arguments></functionCall>"#,
        "f(x,-y)"
    )]
    #[case::range(
        r#"<indexRange><lowerBound><FintConstant>1</FintConstant></lowerBound><upperBound><Var>n</Var></upperBound></indexRange>"#,
        "1:n"
    )]
    #[case::sum_times(
        r#"<mulExpr><plusExpr><Var>a</Var><Var>b</Var></plusExpr><Var>c</Var></mulExpr>"#,
        "(a + b) * c"
    )]
    #[case::sum_of_product(
        r#"<plusExpr><Var>a</Var><mulExpr><Var>b</Var><Var>c</Var></mulExpr></plusExpr>"#,
        "a + b * c"
    )]
    #[case::right_difference(
        r#"<minusExpr><Var>a</Var><minusExpr><Var>b</Var><Var>c</Var></minusExpr></minusExpr>"#,
        "a - (b - c)"
    )]
    #[case::left_difference(
        r#"<minusExpr><minusExpr><Var>a</Var><Var>b</Var></minusExpr><Var>c</Var></minusExpr>"#,
        "a - b - c"
    )]
    #[case::power_chain(
        r#"<FpowerExpr><Var>a</Var><FpowerExpr><Var>b</Var><Var>c</Var></FpowerExpr></FpowerExpr>"#,
        "a ** b ** c"
    )]
    #[case::negated_sum(
        r#"<unaryMinusExpr><plusExpr><Var>a</Var><Var>b</Var></plusExpr></unaryMinusExpr>"#,
        "-(a + b)"
    )]
    fn test_representation(#[case] text: &str, #[case] expected: &str) {
        let (tree, root) = loopsmith_ir::xml::parse(text).unwrap();
        assert_eq!(representation(&tree, root), expected);
    }
}
