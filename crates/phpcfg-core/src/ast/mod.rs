//! Syntax tree consumed by the binder and the graph builder
//!
//! A front end fills these types from a real PHP parser. Every node keeps the
//! span of the source construct it came from so diagnostics and dumps can
//! point back into the file.

mod literal;

pub use literal::{parse_float, parse_integer, unescape_string, Literal, LiteralError};

use mago_span::Span;

/// One executable body: the global script, a function, a method or a closure.
#[derive(Debug, Clone)]
pub struct Routine {
    pub name: String,
    pub kind: RoutineKind,
    pub parameters: Vec<Parameter>,
    /// Variables captured by a closure's `use` clause.
    pub uses: Vec<ClosureUse>,
    pub body: Vec<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoutineKind {
    Script,
    Function,
    Method { class: String, is_static: bool },
    Closure { class: Option<String> },
    ArrowFunction { class: Option<String> },
}

impl RoutineKind {
    /// Name of the class whose `$this` and `self` are in scope.
    pub fn class_name(&self) -> Option<&str> {
        match self {
            RoutineKind::Method { class, .. } => Some(class),
            RoutineKind::Closure { class } | RoutineKind::ArrowFunction { class } => class.as_deref(),
            RoutineKind::Script | RoutineKind::Function => None,
        }
    }

    pub fn has_this(&self) -> bool {
        match self {
            RoutineKind::Method { is_static, .. } => !is_static,
            RoutineKind::Closure { class } | RoutineKind::ArrowFunction { class } => class.is_some(),
            RoutineKind::Script | RoutineKind::Function => false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Parameter {
    /// Name without the leading `$`.
    pub name: String,
    pub by_ref: bool,
    pub variadic: bool,
    pub has_default: bool,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct ClosureUse {
    pub name: String,
    pub by_ref: bool,
    pub span: Span,
}

/// A possibly qualified name as written in source.
#[derive(Debug, Clone)]
pub struct Name {
    pub value: String,
    pub span: Span,
}

impl Name {
    pub fn new(value: impl Into<String>, span: Span) -> Self {
        Self { value: value.into(), span }
    }

    /// The name without a leading namespace separator.
    pub fn unqualified(&self) -> &str {
        self.value.trim_start_matches('\\')
    }

    /// Last segment of the name (`Bar` for `\Foo\Bar`).
    pub fn last_segment(&self) -> &str {
        self.value.rsplit('\\').next().unwrap_or(&self.value)
    }

    /// Case-insensitive comparison ignoring a leading `\`.
    pub fn is(&self, other: &str) -> bool {
        self.unqualified().eq_ignore_ascii_case(other.trim_start_matches('\\'))
    }
}

#[derive(Debug, Clone)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

impl Stmt {
    pub fn new(kind: StmtKind, span: Span) -> Self {
        Self { kind, span }
    }
}

#[derive(Debug, Clone)]
pub enum StmtKind {
    Expr(Expr),
    Echo(Vec<Expr>),
    InlineHtml(String),
    Block(Vec<Stmt>),
    /// `if`/`elseif`/`else` chain. An arm without condition is the trailing `else`.
    If(Vec<IfArm>),
    While {
        condition: Expr,
        body: Vec<Stmt>,
    },
    DoWhile {
        body: Vec<Stmt>,
        condition: Expr,
    },
    For {
        init: Vec<Expr>,
        condition: Vec<Expr>,
        action: Vec<Expr>,
        body: Vec<Stmt>,
    },
    Foreach {
        enumeree: Expr,
        key: Option<Expr>,
        value: Expr,
        by_ref: bool,
        body: Vec<Stmt>,
    },
    Switch {
        value: Expr,
        cases: Vec<SwitchCase>,
    },
    Try {
        body: Vec<Stmt>,
        catches: Vec<CatchClause>,
        finally: Option<Vec<Stmt>>,
    },
    Break(Option<Expr>),
    Continue(Option<Expr>),
    Goto(String),
    Label(String),
    Return(Option<Expr>),
    Throw(Expr),
    Unset(Vec<Expr>),
    Global(Vec<Expr>),
    Static(Vec<StaticVar>),
    /// Function declaration; its body is a separate [`Routine`].
    FunctionDecl(Name),
    ClassDecl {
        name: Name,
        parent: Option<Name>,
    },
    Noop,
    Unsupported(String),
}

#[derive(Debug, Clone)]
pub struct IfArm {
    pub condition: Option<Expr>,
    pub body: Vec<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct SwitchCase {
    /// `None` for `default:`.
    pub value: Option<Expr>,
    pub body: Vec<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct CatchClause {
    pub types: Vec<Name>,
    pub variable: Option<Expr>,
    pub body: Vec<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct StaticVar {
    pub variable: Expr,
    pub initializer: Option<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// Whether the expression denotes a storage location (can be written or aliased).
    pub fn is_reference(&self) -> bool {
        matches!(
            self.kind,
            ExprKind::Variable(_)
                | ExprKind::ArrayItem { .. }
                | ExprKind::Property { .. }
                | ExprKind::StaticProperty { .. }
                | ExprKind::List(_)
        )
    }

    /// The literal integer value, looking through a unary minus.
    pub fn as_int_literal(&self) -> Option<i64> {
        match &self.kind {
            ExprKind::Literal(Literal::Int(value)) => Some(*value),
            ExprKind::Unary { op: UnaryOp::Minus, operand } => operand.as_int_literal().map(|v| -v),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub enum ExprKind {
    Literal(Literal),
    Variable(VariableName),
    ArrayItem {
        array: Box<Expr>,
        /// `None` for the append form `$a[]`.
        index: Option<Box<Expr>>,
    },
    Property {
        object: Box<Expr>,
        name: MemberName,
        nullsafe: bool,
    },
    StaticProperty {
        class: TypeRef,
        name: MemberName,
    },
    Call {
        target: CallTarget,
        args: Vec<Argument>,
    },
    MethodCall {
        object: Box<Expr>,
        method: MemberName,
        args: Vec<Argument>,
        nullsafe: bool,
    },
    StaticCall {
        class: TypeRef,
        method: MemberName,
        args: Vec<Argument>,
    },
    New {
        class: TypeRef,
        args: Vec<Argument>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    IncDec {
        increment: bool,
        prefix: bool,
        target: Box<Expr>,
    },
    Assign {
        target: Box<Expr>,
        value: Box<Expr>,
        by_ref: bool,
    },
    CompoundAssign {
        op: BinaryOp,
        target: Box<Expr>,
        value: Box<Expr>,
    },
    /// `list(...)` or `[...]` on the left of an assignment; `None` entries are skipped slots.
    List(Vec<Option<ArrayItem>>),
    Array(Vec<ArrayItem>),
    Conditional {
        condition: Box<Expr>,
        /// `None` for the short form `$a ?: $b`.
        then: Option<Box<Expr>>,
        otherwise: Box<Expr>,
    },
    InstanceOf {
        operand: Box<Expr>,
        class: TypeRef,
    },
    Isset(Vec<Expr>),
    Empty(Box<Expr>),
    Include {
        kind: IncludeKind,
        target: Box<Expr>,
    },
    Exit(Option<Box<Expr>>),
    Throw(Box<Expr>),
    ConstFetch(Name),
    ClassConstFetch {
        class: TypeRef,
        name: String,
    },
    PseudoConst(PseudoConstKind),
    Cast {
        kind: CastKind,
        operand: Box<Expr>,
    },
    /// Closure or arrow function; the body is the routine named `routine`.
    Closure {
        routine: String,
        uses: Vec<ClosureUse>,
        is_arrow: bool,
    },
    /// Interpolated string parts, concatenated at runtime.
    Interpolated(Vec<Expr>),
    Unsupported(String),
}

#[derive(Debug, Clone)]
pub enum VariableName {
    Direct(String),
    Indirect(Box<Expr>),
}

#[derive(Debug, Clone)]
pub enum MemberName {
    Direct(String),
    Indirect(Box<Expr>),
}

impl MemberName {
    pub fn direct(&self) -> Option<&str> {
        match self {
            MemberName::Direct(name) => Some(name),
            MemberName::Indirect(_) => None,
        }
    }
}

#[derive(Debug, Clone)]
pub enum CallTarget {
    Named(Name),
    Dynamic(Box<Expr>),
}

#[derive(Debug, Clone)]
pub enum TypeRef {
    Named(Name),
    SelfType,
    Static,
    Parent,
    Indirect(Box<Expr>),
}

#[derive(Debug, Clone)]
pub struct Argument {
    pub value: Expr,
    pub unpack: bool,
    /// Parameter name for named arguments.
    pub name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ArrayItem {
    pub key: Option<Expr>,
    pub value: Expr,
    pub by_ref: bool,
    pub spread: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    Concat,
    BitAnd,
    BitOr,
    BitXor,
    ShiftLeft,
    ShiftRight,
    And,
    Or,
    Xor,
    Equal,
    NotEqual,
    Identical,
    NotIdentical,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    Spaceship,
    Coalesce,
}

impl BinaryOp {
    /// Parse an operator token (`"+"`, `"&&"`, `"and"`, ...).
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        let op = match symbol.to_ascii_lowercase().as_str() {
            "+" => BinaryOp::Add,
            "-" => BinaryOp::Sub,
            "*" => BinaryOp::Mul,
            "/" => BinaryOp::Div,
            "%" => BinaryOp::Mod,
            "**" => BinaryOp::Pow,
            "." => BinaryOp::Concat,
            "&" => BinaryOp::BitAnd,
            "|" => BinaryOp::BitOr,
            "^" => BinaryOp::BitXor,
            "<<" => BinaryOp::ShiftLeft,
            ">>" => BinaryOp::ShiftRight,
            "&&" | "and" => BinaryOp::And,
            "||" | "or" => BinaryOp::Or,
            "xor" => BinaryOp::Xor,
            "==" => BinaryOp::Equal,
            "!=" | "<>" => BinaryOp::NotEqual,
            "===" => BinaryOp::Identical,
            "!==" => BinaryOp::NotIdentical,
            "<" => BinaryOp::Less,
            "<=" => BinaryOp::LessEqual,
            ">" => BinaryOp::Greater,
            ">=" => BinaryOp::GreaterEqual,
            "<=>" => BinaryOp::Spaceship,
            "??" => BinaryOp::Coalesce,
            _ => return None,
        };
        Some(op)
    }

    /// Parse the operator part of a compound assignment (`"+="`, `"??="`).
    pub fn from_compound_symbol(symbol: &str) -> Option<Self> {
        symbol.strip_suffix('=').and_then(BinaryOp::from_symbol)
    }

    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Pow => "**",
            BinaryOp::Concat => ".",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitOr => "|",
            BinaryOp::BitXor => "^",
            BinaryOp::ShiftLeft => "<<",
            BinaryOp::ShiftRight => ">>",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
            BinaryOp::Xor => "xor",
            BinaryOp::Equal => "==",
            BinaryOp::NotEqual => "!=",
            BinaryOp::Identical => "===",
            BinaryOp::NotIdentical => "!==",
            BinaryOp::Less => "<",
            BinaryOp::LessEqual => "<=",
            BinaryOp::Greater => ">",
            BinaryOp::GreaterEqual => ">=",
            BinaryOp::Spaceship => "<=>",
            BinaryOp::Coalesce => "??",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Not,
    Minus,
    Plus,
    BitNot,
    Silence,
    Clone,
    Print,
}

impl UnaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Not => "!",
            UnaryOp::Minus => "-",
            UnaryOp::Plus => "+",
            UnaryOp::BitNot => "~",
            UnaryOp::Silence => "@",
            UnaryOp::Clone => "clone",
            UnaryOp::Print => "print",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CastKind {
    Int,
    Float,
    String,
    Bool,
    Array,
    Object,
    Unset,
}

impl CastKind {
    /// Parse a cast token such as `(int)` or `( string )`.
    pub fn from_token(token: &str) -> Option<Self> {
        let inner = token.trim().strip_prefix('(')?.strip_suffix(')')?.trim();
        let kind = match inner.to_ascii_lowercase().as_str() {
            "int" | "integer" => CastKind::Int,
            "float" | "double" | "real" => CastKind::Float,
            "string" | "binary" => CastKind::String,
            "bool" | "boolean" => CastKind::Bool,
            "array" => CastKind::Array,
            "object" => CastKind::Object,
            "unset" => CastKind::Unset,
            _ => return None,
        };
        Some(kind)
    }

    pub fn name(self) -> &'static str {
        match self {
            CastKind::Int => "int",
            CastKind::Float => "float",
            CastKind::String => "string",
            CastKind::Bool => "bool",
            CastKind::Array => "array",
            CastKind::Object => "object",
            CastKind::Unset => "unset",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IncludeKind {
    Include,
    IncludeOnce,
    Require,
    RequireOnce,
}

impl IncludeKind {
    pub fn keyword(self) -> &'static str {
        match self {
            IncludeKind::Include => "include",
            IncludeKind::IncludeOnce => "include_once",
            IncludeKind::Require => "require",
            IncludeKind::RequireOnce => "require_once",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PseudoConstKind {
    Line,
    File,
    Dir,
    Function,
    Class,
    Trait,
    Method,
    Namespace,
    Property,
}

impl PseudoConstKind {
    pub fn from_name(name: &str) -> Option<Self> {
        let kind = match name.to_ascii_uppercase().as_str() {
            "__LINE__" => PseudoConstKind::Line,
            "__FILE__" => PseudoConstKind::File,
            "__DIR__" => PseudoConstKind::Dir,
            "__FUNCTION__" => PseudoConstKind::Function,
            "__CLASS__" => PseudoConstKind::Class,
            "__TRAIT__" => PseudoConstKind::Trait,
            "__METHOD__" => PseudoConstKind::Method,
            "__NAMESPACE__" => PseudoConstKind::Namespace,
            "__PROPERTY__" => PseudoConstKind::Property,
            _ => return None,
        };
        Some(kind)
    }

    pub fn name(self) -> &'static str {
        match self {
            PseudoConstKind::Line => "__LINE__",
            PseudoConstKind::File => "__FILE__",
            PseudoConstKind::Dir => "__DIR__",
            PseudoConstKind::Function => "__FUNCTION__",
            PseudoConstKind::Class => "__CLASS__",
            PseudoConstKind::Trait => "__TRAIT__",
            PseudoConstKind::Method => "__METHOD__",
            PseudoConstKind::Namespace => "__NAMESPACE__",
            PseudoConstKind::Property => "__PROPERTY__",
        }
    }
}
