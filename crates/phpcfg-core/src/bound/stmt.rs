//! Bound statements

use mago_span::Span;

use super::expr::{BoundExpr, BoundTypeRef};

#[derive(Debug)]
pub struct BoundStmt {
    pub kind: BoundStmtKind,
    pub span: Span,
}

impl BoundStmt {
    pub fn new(kind: BoundStmtKind, span: Span) -> Self {
        Self { kind, span }
    }

    pub fn kind_name(&self) -> &'static str {
        match &self.kind {
            BoundStmtKind::Empty => "Empty",
            BoundStmtKind::Expression(_) => "Expression",
            BoundStmtKind::Return(_) => "Return",
            BoundStmtKind::Throw(_) => "Throw",
            BoundStmtKind::Unset(_) => "Unset",
            BoundStmtKind::StaticDecl(_) => "StaticDecl",
            BoundStmtKind::Global(_) => "Global",
            BoundStmtKind::FunctionDecl(_) => "FunctionDecl",
            BoundStmtKind::TypeDecl(_) => "TypeDecl",
        }
    }
}

#[derive(Debug)]
pub enum BoundStmtKind {
    Empty,
    Expression(BoundExpr),
    Return(Option<BoundExpr>),
    Throw(BoundExpr),
    /// `unset(...)`, each target bound with unset access.
    Unset(Vec<BoundExpr>),
    StaticDecl(Vec<BoundStaticVar>),
    /// `global $a, $b`, each variable bound as a write-ref.
    Global(Vec<BoundExpr>),
    /// Function declared conditionally at runtime.
    FunctionDecl(String),
    /// Class-like declared conditionally at runtime.
    TypeDecl(BoundTypeDecl),
}

#[derive(Debug)]
pub struct BoundStaticVar {
    pub variable: BoundExpr,
    pub initializer: Option<BoundExpr>,
}

#[derive(Debug)]
pub struct BoundTypeDecl {
    pub name: String,
    pub parent: Option<BoundTypeRef>,
}
