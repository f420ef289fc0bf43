//! Visitors over bound nodes and graph edges
//!
//! [`Visitor`] walks blocks, statements, expressions and edges. Default
//! methods handle traversal; implementors override the `visit_*` hooks and
//! return `false` to skip a node's children.
//!
//! [`NodeVisitor`] is the double-dispatch form: `accept_with` calls the
//! method for the node's variant with an argument and returns a result.

use crate::bound::{
    BoundArrayItemRef, BoundAssign, BoundBinaryEx, BoundConditional, BoundExpr, BoundExprKind,
    BoundFieldRef, BoundLiteral, BoundRoutineCall, BoundStmt, BoundStmtKind, BoundTypeRef,
    BoundVariableName, BoundVariableRef,
};
use crate::cfg::{
    BasicBlock, BlockKind, ConditionalEdge, Edge, ForeachEnumereeEdge, ForeachMoveNextEdge, LeaveEdge,
    SimpleEdge, SwitchEdge, TryCatchEdge,
};

/// Walking visitor over one graph's contents.
pub trait Visitor {
    /// Called for each block. Return `true` to continue into its statements and edge.
    fn visit_block(&mut self, _block: &BasicBlock) -> bool {
        true
    }

    /// Called for each statement. Return `true` to continue into its expressions.
    fn visit_statement(&mut self, _stmt: &BoundStmt) -> bool {
        true
    }

    /// Called for each expression. Return `true` to continue into its children.
    fn visit_expression(&mut self, _expr: &BoundExpr) -> bool {
        true
    }

    /// Called for each edge. Return `true` to continue into the expressions it evaluates.
    fn visit_edge(&mut self, _edge: &Edge) -> bool {
        true
    }

    fn traverse_block(&mut self, block: &BasicBlock) {
        if !self.visit_block(block) {
            return;
        }

        match block.kind() {
            BlockKind::Catch(info) => {
                if let Some(variable) = &info.variable {
                    self.traverse_expression(variable);
                }
            }
            BlockKind::Case(info) => {
                if let Some(value) = &info.value {
                    self.traverse_expression(value);
                }
            }
            BlockKind::Plain | BlockKind::Start | BlockKind::Exit => {}
        }

        for stmt in block.statements() {
            self.traverse_statement(stmt);
        }
        if let Some(edge) = block.edge() {
            self.traverse_edge(edge);
        }
    }

    fn traverse_statement(&mut self, stmt: &BoundStmt) {
        if !self.visit_statement(stmt) {
            return;
        }

        match &stmt.kind {
            BoundStmtKind::Expression(expr) | BoundStmtKind::Throw(expr) => self.traverse_expression(expr),
            BoundStmtKind::Return(value) => {
                if let Some(expr) = value {
                    self.traverse_expression(expr);
                }
            }
            BoundStmtKind::Unset(vars) | BoundStmtKind::Global(vars) => {
                for var in vars {
                    self.traverse_expression(var);
                }
            }
            BoundStmtKind::StaticDecl(vars) => {
                for var in vars {
                    self.traverse_expression(&var.variable);
                    if let Some(init) = &var.initializer {
                        self.traverse_expression(init);
                    }
                }
            }
            BoundStmtKind::TypeDecl(decl) => {
                if let Some(parent) = &decl.parent {
                    self.traverse_type_ref(parent);
                }
            }
            BoundStmtKind::Empty | BoundStmtKind::FunctionDecl(_) => {}
        }
    }

    fn traverse_edge(&mut self, edge: &Edge) {
        if !self.visit_edge(edge) {
            return;
        }
        for expr in edge.expressions() {
            self.traverse_expression(expr);
        }
    }

    fn traverse_type_ref(&mut self, type_ref: &BoundTypeRef) {
        if let BoundTypeRef::Indirect(expr) = type_ref {
            self.traverse_expression(expr);
        }
    }

    fn traverse_expression(&mut self, expr: &BoundExpr) {
        if !self.visit_expression(expr) {
            return;
        }

        match &expr.kind {
            BoundExprKind::Variable(var) => {
                if let BoundVariableName::Indirect(name) = &var.name {
                    self.traverse_expression(name);
                }
            }
            BoundExprKind::Field(field) => {
                if let Some(instance) = &field.instance {
                    self.traverse_expression(instance);
                }
                if let Some(class) = &field.class {
                    self.traverse_type_ref(class);
                }
                if let crate::bound::BoundMemberName::Indirect(name) = &field.name {
                    self.traverse_expression(name);
                }
            }
            BoundExprKind::ArrayItem(item) => {
                self.traverse_expression(&item.array);
                if let Some(index) = &item.index {
                    self.traverse_expression(index);
                }
            }
            BoundExprKind::Call(call) => {
                if let Some(instance) = &call.instance {
                    self.traverse_expression(instance);
                }
                if let Some(class) = &call.class {
                    self.traverse_type_ref(class);
                }
                if let Some(name) = &call.name_expr {
                    self.traverse_expression(name);
                }
                for arg in &call.arguments {
                    self.traverse_expression(&arg.value);
                }
            }
            BoundExprKind::Binary(binary) => {
                self.traverse_expression(&binary.left);
                self.traverse_expression(&binary.right);
            }
            BoundExprKind::Unary(unary) => self.traverse_expression(&unary.operand),
            BoundExprKind::IncDec(inc) => self.traverse_expression(&inc.target),
            BoundExprKind::Assign(assign) => {
                self.traverse_expression(&assign.target);
                self.traverse_expression(&assign.value);
            }
            BoundExprKind::CompoundAssign(assign) => {
                self.traverse_expression(&assign.target);
                self.traverse_expression(&assign.value);
            }
            BoundExprKind::Conditional(cond) => {
                self.traverse_expression(&cond.condition);
                if let Some(then) = &cond.then {
                    self.traverse_expression(then);
                }
                self.traverse_expression(&cond.otherwise);
            }
            BoundExprKind::InstanceOf(check) => {
                self.traverse_expression(&check.operand);
                self.traverse_type_ref(&check.type_ref);
            }
            BoundExprKind::IsSet(isset) => {
                for var in &isset.vars {
                    self.traverse_expression(var);
                }
            }
            BoundExprKind::Empty(inner) | BoundExprKind::Throw(inner) => self.traverse_expression(inner),
            BoundExprKind::ClassConst(constant) => self.traverse_type_ref(&constant.class),
            BoundExprKind::Array(array) => {
                for item in &array.items {
                    if let Some(key) = &item.key {
                        self.traverse_expression(key);
                    }
                    self.traverse_expression(&item.value);
                }
            }
            BoundExprKind::List(list) => {
                for item in list.items.iter().flatten() {
                    if let Some(key) = &item.key {
                        self.traverse_expression(key);
                    }
                    self.traverse_expression(&item.target);
                }
            }
            BoundExprKind::Cast(cast) => self.traverse_expression(&cast.operand),
            BoundExprKind::Lambda(lambda) => {
                for captured in &lambda.uses {
                    self.traverse_expression(captured);
                }
            }
            BoundExprKind::Literal(_)
            | BoundExprKind::GlobalConst(_)
            | BoundExprKind::PseudoConst(_)
            | BoundExprKind::Unsupported(_) => {}
        }
    }
}

/// Double-dispatch visitor with an argument and a result.
///
/// Only the three `default_*` methods are required; every variant method
/// falls back to them.
pub trait NodeVisitor<A, R> {
    fn default_expression(&mut self, expr: &BoundExpr, arg: A) -> R;

    fn default_statement(&mut self, stmt: &BoundStmt, arg: A) -> R;

    fn default_edge(&mut self, edge: &Edge, arg: A) -> R;

    fn visit_literal(&mut self, expr: &BoundExpr, _literal: &BoundLiteral, arg: A) -> R {
        self.default_expression(expr, arg)
    }

    fn visit_variable(&mut self, expr: &BoundExpr, _variable: &BoundVariableRef, arg: A) -> R {
        self.default_expression(expr, arg)
    }

    fn visit_field(&mut self, expr: &BoundExpr, _field: &BoundFieldRef, arg: A) -> R {
        self.default_expression(expr, arg)
    }

    fn visit_array_item(&mut self, expr: &BoundExpr, _item: &BoundArrayItemRef, arg: A) -> R {
        self.default_expression(expr, arg)
    }

    fn visit_call(&mut self, expr: &BoundExpr, _call: &BoundRoutineCall, arg: A) -> R {
        self.default_expression(expr, arg)
    }

    fn visit_binary(&mut self, expr: &BoundExpr, _binary: &BoundBinaryEx, arg: A) -> R {
        self.default_expression(expr, arg)
    }

    fn visit_assign(&mut self, expr: &BoundExpr, _assign: &BoundAssign, arg: A) -> R {
        self.default_expression(expr, arg)
    }

    fn visit_conditional(&mut self, expr: &BoundExpr, _conditional: &BoundConditional, arg: A) -> R {
        self.default_expression(expr, arg)
    }

    fn visit_simple_edge(&mut self, edge: &Edge, _simple: &SimpleEdge, arg: A) -> R {
        self.default_edge(edge, arg)
    }

    fn visit_leave_edge(&mut self, edge: &Edge, _leave: &LeaveEdge, arg: A) -> R {
        self.default_edge(edge, arg)
    }

    fn visit_conditional_edge(&mut self, edge: &Edge, _conditional: &ConditionalEdge, arg: A) -> R {
        self.default_edge(edge, arg)
    }

    fn visit_switch_edge(&mut self, edge: &Edge, _switch: &SwitchEdge, arg: A) -> R {
        self.default_edge(edge, arg)
    }

    fn visit_try_catch_edge(&mut self, edge: &Edge, _try_catch: &TryCatchEdge, arg: A) -> R {
        self.default_edge(edge, arg)
    }

    fn visit_foreach_enumeree_edge(&mut self, edge: &Edge, _enumeree: &ForeachEnumereeEdge, arg: A) -> R {
        self.default_edge(edge, arg)
    }

    fn visit_foreach_move_next_edge(&mut self, edge: &Edge, _move_next: &ForeachMoveNextEdge, arg: A) -> R {
        self.default_edge(edge, arg)
    }
}

impl BoundExpr {
    /// Walk this expression with a [`Visitor`].
    pub fn accept<V: Visitor + ?Sized>(&self, visitor: &mut V) {
        visitor.traverse_expression(self);
    }

    pub fn accept_with<A, R, V: NodeVisitor<A, R> + ?Sized>(&self, visitor: &mut V, arg: A) -> R {
        match &self.kind {
            BoundExprKind::Literal(literal) => visitor.visit_literal(self, literal, arg),
            BoundExprKind::Variable(variable) => visitor.visit_variable(self, variable, arg),
            BoundExprKind::Field(field) => visitor.visit_field(self, field, arg),
            BoundExprKind::ArrayItem(item) => visitor.visit_array_item(self, item, arg),
            BoundExprKind::Call(call) => visitor.visit_call(self, call, arg),
            BoundExprKind::Binary(binary) => visitor.visit_binary(self, binary, arg),
            BoundExprKind::Assign(assign) => visitor.visit_assign(self, assign, arg),
            BoundExprKind::Conditional(conditional) => visitor.visit_conditional(self, conditional, arg),
            _ => visitor.default_expression(self, arg),
        }
    }
}

impl BoundStmt {
    pub fn accept<V: Visitor + ?Sized>(&self, visitor: &mut V) {
        visitor.traverse_statement(self);
    }

    pub fn accept_with<A, R, V: NodeVisitor<A, R> + ?Sized>(&self, visitor: &mut V, arg: A) -> R {
        visitor.default_statement(self, arg)
    }
}

impl Edge {
    pub fn accept<V: Visitor + ?Sized>(&self, visitor: &mut V) {
        visitor.traverse_edge(self);
    }

    pub fn accept_with<A, R, V: NodeVisitor<A, R> + ?Sized>(&self, visitor: &mut V, arg: A) -> R {
        match self {
            Edge::Simple(simple) => visitor.visit_simple_edge(self, simple, arg),
            Edge::Leave(leave) => visitor.visit_leave_edge(self, leave, arg),
            Edge::Conditional(conditional) => visitor.visit_conditional_edge(self, conditional, arg),
            Edge::Switch(switch) => visitor.visit_switch_edge(self, switch, arg),
            Edge::TryCatch(try_catch) => visitor.visit_try_catch_edge(self, try_catch, arg),
            Edge::ForeachEnumeree(enumeree) => visitor.visit_foreach_enumeree_edge(self, enumeree, arg),
            Edge::ForeachMoveNext(move_next) => visitor.visit_foreach_move_next_edge(self, move_next, arg),
        }
    }
}
