//! Bound node model: the semantic form of expressions and statements

mod expr;
mod stmt;

pub use expr::{
    BoundArgument, BoundArrayEx, BoundArrayItem, BoundArrayItemRef, BoundAssign, BoundBinaryEx,
    BoundCast, BoundClassConst, BoundCompoundAssign, BoundConditional, BoundExpr, BoundExprKind,
    BoundFieldRef, BoundGlobalConst, BoundIncDec, BoundInstanceOf, BoundIsSet, BoundLambda,
    BoundListEx, BoundListItem, BoundLiteral, BoundMemberName, BoundPseudoConst, BoundRoutineCall,
    BoundTypeRef, BoundUnaryEx, BoundVariableName, BoundVariableRef, CallKind, CallName, ConstValue,
};
pub use stmt::{BoundStaticVar, BoundStmt, BoundStmtKind, BoundTypeDecl};
