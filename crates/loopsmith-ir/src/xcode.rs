use std::fmt;

macro_rules! xcode {
    ($($variant:ident => $tag:literal),* $(,)?) => {
        /// Closed vocabulary of element tags understood by the engine.
        ///
        /// Elements outside the vocabulary are read as [`Xcode::Unknown`]; their raw tag is kept
        /// on the node so the tree can be written back unchanged.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum Xcode {
            $($variant,)*
            Unknown,
        }

        impl Xcode {
            pub fn from_tag(tag: &str) -> Self {
                match tag {
                    $($tag => Xcode::$variant,)*
                    _ => Xcode::Unknown,
                }
            }

            pub fn code(&self) -> &'static str {
                match self {
                    $(Xcode::$variant => $tag,)*
                    Xcode::Unknown => "unknown",
                }
            }
        }
    };
}

xcode! {
    // unit structure
    XcodeProgram => "XcodeProgram",
    OmniFortranModule => "OmniFortranModule",
    TypeTable => "typeTable",
    GlobalSymbols => "globalSymbols",
    GlobalDeclarations => "globalDeclarations",
    Identifiers => "identifiers",
    Declarations => "declarations",
    Symbols => "symbols",
    Id => "id",
    Name => "name",
    Value => "value",
    // types
    BasicType => "FbasicType",
    FunctionType => "FfunctionType",
    StructType => "FstructType",
    Params => "params",
    Kind => "kind",
    Len => "len",
    // declarations
    VarDecl => "varDecl",
    FunctionDefinition => "FfunctionDefinition",
    ModuleDefinition => "FmoduleDefinition",
    UseDecl => "FuseDecl",
    // statements
    AssignStatement => "FassignStatement",
    DoStatement => "FdoStatement",
    DoWhileStatement => "FdoWhileStatement",
    IfStatement => "FifStatement",
    Condition => "condition",
    Then => "then",
    Else => "else",
    ExprStatement => "exprStatement",
    PragmaStatement => "FpragmaStatement",
    ReturnStatement => "FreturnStatement",
    ContinueStatement => "ContinueStatement",
    CycleStatement => "FcycleStatement",
    ExitStatement => "FexitStatement",
    Body => "body",
    // loop and array parts
    Var => "Var",
    VarRef => "varRef",
    IndexRange => "indexRange",
    LowerBound => "lowerBound",
    UpperBound => "upperBound",
    Step => "step",
    ArrayRef => "FarrayRef",
    ArrayIndex => "arrayIndex",
    MemberRef => "FmemberRef",
    // expressions
    PlusExpr => "plusExpr",
    MinusExpr => "minusExpr",
    MulExpr => "mulExpr",
    DivExpr => "divExpr",
    PowerExpr => "FpowerExpr",
    UnaryMinusExpr => "unaryMinusExpr",
    LogEqExpr => "logEQExpr",
    LogNeqExpr => "logNEQExpr",
    LogLtExpr => "logLTExpr",
    LogLeExpr => "logLEExpr",
    LogGtExpr => "logGTExpr",
    LogGeExpr => "logGEExpr",
    LogAndExpr => "logAndExpr",
    LogOrExpr => "logOrExpr",
    LogNotExpr => "logNotExpr",
    // constants
    IntConstant => "FintConstant",
    RealConstant => "FrealConstant",
    CharacterConstant => "FcharacterConstant",
    LogicalConstant => "FlogicalConstant",
    ComplexConstant => "FcomplexConstant",
    // calls
    FunctionCall => "functionCall",
    Arguments => "arguments",
    NamedValue => "namedValue",
}

impl Xcode {
    pub fn is_constant(&self) -> bool {
        matches!(
            self,
            Xcode::IntConstant
                | Xcode::RealConstant
                | Xcode::CharacterConstant
                | Xcode::LogicalConstant
                | Xcode::ComplexConstant
        )
    }

    /// Returns the infix operator of a binary expression tag.
    pub fn binary_operator(&self) -> Option<&'static str> {
        match self {
            Xcode::PlusExpr => Some("+"),
            Xcode::MinusExpr => Some("-"),
            Xcode::MulExpr => Some("*"),
            Xcode::DivExpr => Some("/"),
            Xcode::PowerExpr => Some("**"),
            Xcode::LogEqExpr => Some("=="),
            Xcode::LogNeqExpr => Some("/="),
            Xcode::LogLtExpr => Some("<"),
            Xcode::LogLeExpr => Some("<="),
            Xcode::LogGtExpr => Some(">"),
            Xcode::LogGeExpr => Some(">="),
            Xcode::LogAndExpr => Some(".and."),
            Xcode::LogOrExpr => Some(".or."),
            _ => None,
        }
    }

    /// Binding strength of a binary operator, higher binds tighter. `None` for operands.
    pub fn precedence(&self) -> Option<u8> {
        match self {
            Xcode::PowerExpr => Some(6),
            Xcode::MulExpr | Xcode::DivExpr => Some(5),
            Xcode::PlusExpr | Xcode::MinusExpr => Some(4),
            Xcode::LogEqExpr
            | Xcode::LogNeqExpr
            | Xcode::LogLtExpr
            | Xcode::LogLeExpr
            | Xcode::LogGtExpr
            | Xcode::LogGeExpr => Some(3),
            Xcode::LogAndExpr => Some(2),
            Xcode::LogOrExpr => Some(1),
            _ => None,
        }
    }
}

impl fmt::Display for Xcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
