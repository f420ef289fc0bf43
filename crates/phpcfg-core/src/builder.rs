//! Graph builder: one forward pass over a routine body
//!
//! The builder owns all construction state: the block arena, the current
//! block, the break/continue scope stack, the try-region stack, the label
//! table and the scope stack. Simple statements go through the [`Binder`]
//! and are appended to the current block; control statements create blocks,
//! wire edges and move the current block to where control continues.
//!
//! Jumps (`break`, `continue`, `goto`, `return`, `throw`, `exit`) leave the
//! builder in a fresh dead block. Whatever follows lexically lands there and
//! stays dead unless a label makes it reachable again.

use std::collections::BTreeMap;

use mago_span::Span;

use crate::access::AccessDescriptor;
use crate::ast::{CatchClause, Expr, ExprKind, IfArm, Routine, RoutineKind, Stmt, StmtKind, SwitchCase, TypeRef};
use crate::binder::Binder;
use crate::bound::{BoundStmt, BoundStmtKind};
use crate::cfg::{
    breadth_first, BasicBlock, BlockId, BlockKind, CaseInfo, CatchInfo, CaughtType, ConditionalEdge,
    ControlFlowGraph, Edge, ForeachEnumereeEdge, ForeachMoveNextEdge, LabelFlags, LabelInfo, LeaveEdge,
    Reachability, SimpleEdge, SwitchEdge, ThrowSite, TryCatchEdge,
};
use crate::diagnostic::{self, Diagnostic};
use crate::symbols::SymbolResolver;

#[derive(Debug, Clone, Copy)]
struct BreakScope {
    break_target: BlockId,
    continue_target: BlockId,
}

/// Construction state for one routine's graph.
pub struct GraphBuilder<'r> {
    binder: Binder<'r>,
    blocks: Vec<BasicBlock>,
    start: BlockId,
    exit: BlockId,
    current: BlockId,
    break_scopes: Vec<BreakScope>,
    /// Blocks owning the try/catch edge of each enclosing try body.
    try_regions: Vec<BlockId>,
    labels: BTreeMap<String, LabelInfo>,
    /// Block each open local scope started in; the outermost is the routine body.
    scopes: Vec<BlockId>,
    /// Only the script body hoists its unconditional declarations.
    hoists_declarations: bool,
    dead: Vec<BlockId>,
    next_ordinal: u32,
    throw_sites: Vec<ThrowSite>,
    diagnostics: Vec<Diagnostic>,
}

impl<'r> GraphBuilder<'r> {
    /// Build the control flow graph of `routine`.
    ///
    /// # Panics
    ///
    /// Panics when an internal invariant of the binder or builder is broken.
    /// Problems in the PHP source never panic; they become diagnostics.
    pub fn build(routine: &Routine, resolver: &'r dyn SymbolResolver) -> ControlFlowGraph {
        let binder = Binder::new(resolver).with_class(routine.kind.class_name());
        let mut builder = GraphBuilder::new(binder);
        builder.hoists_declarations = matches!(routine.kind, RoutineKind::Script);

        builder.open_scope();
        builder.statements(&routine.body);
        let exit = builder.exit;
        builder.jump(exit, None);
        builder.close_scope();

        builder.finish()
    }

    fn new(binder: Binder<'r>) -> Self {
        let mut builder = Self {
            binder,
            blocks: Vec::new(),
            start: BlockId(0),
            exit: BlockId(0),
            current: BlockId(0),
            break_scopes: Vec::new(),
            try_regions: Vec::new(),
            labels: BTreeMap::new(),
            scopes: Vec::new(),
            hoists_declarations: false,
            dead: Vec::new(),
            next_ordinal: 0,
            throw_sites: Vec::new(),
            diagnostics: Vec::new(),
        };
        builder.start = builder.new_block(BlockKind::Start);
        builder.exit = builder.new_block(BlockKind::Exit);
        builder.current = builder.start;
        builder
    }

    fn new_block(&mut self, kind: BlockKind) -> BlockId {
        let id = BlockId(self.blocks.len() as u32);
        let ordinal = self.next_ordinal;
        self.next_ordinal += 1;
        self.blocks.push(BasicBlock::new(id, kind, Reachability::Live(ordinal)));
        id
    }

    fn new_dead_block(&mut self) -> BlockId {
        let id = BlockId(self.blocks.len() as u32);
        self.blocks.push(BasicBlock::new(id, BlockKind::Plain, Reachability::Dead));
        self.dead.push(id);
        id
    }

    fn connect(&mut self, source: BlockId, edge: Edge) {
        edge.connect(&mut self.blocks[source.index()]);
    }

    /// Simple edge from the current block to `target`.
    fn jump(&mut self, target: BlockId, syntax: Option<Span>) {
        self.connect(self.current, Edge::Simple(SimpleEdge { target, syntax }));
    }

    fn leave(&mut self, target: BlockId) {
        self.connect(self.current, Edge::Leave(LeaveEdge { target }));
    }

    /// Jump from the current block and continue in a fresh dead block.
    fn jump_away(&mut self, target: BlockId, syntax: Option<Span>) {
        self.jump(target, syntax);
        self.current = self.new_dead_block();
    }

    fn append(&mut self, stmt: BoundStmt) {
        self.blocks[self.current.index()].push_statement(stmt);
    }

    fn open_scope(&mut self) {
        self.scopes.push(self.current);
    }

    fn close_scope(&mut self) {
        assert!(self.scopes.pop().is_some(), "scope stack underflow");
    }

    fn scoped(&mut self, body: &[Stmt]) {
        self.open_scope();
        self.statements(body);
        self.close_scope();
    }

    fn hoisted_here(&self) -> bool {
        self.hoists_declarations && self.scopes.len() == 1
    }

    fn statements(&mut self, stmts: &[Stmt]) {
        for stmt in stmts {
            self.statement(stmt);
        }
    }

    fn statement(&mut self, stmt: &Stmt) {
        match &stmt.kind {
            StmtKind::Block(body) => self.statements(body),
            StmtKind::If(arms) => self.build_if(arms),
            StmtKind::While { condition, body } => {
                self.build_loop(&[], std::slice::from_ref(condition), &[], body)
            }
            StmtKind::For { init, condition, action, body } => self.build_loop(init, condition, action, body),
            StmtKind::DoWhile { body, condition } => self.build_do_while(body, condition),
            StmtKind::Foreach { enumeree, key, value, by_ref, body } => {
                self.build_foreach(enumeree, key.as_ref(), value, *by_ref, body)
            }
            StmtKind::Switch { value, cases } => self.build_switch(value, cases),
            StmtKind::Try { body, catches, finally } => self.build_try(body, catches, finally.as_deref()),
            StmtKind::Break(level) => self.build_break(level.as_ref(), true, stmt.span),
            StmtKind::Continue(level) => self.build_break(level.as_ref(), false, stmt.span),
            StmtKind::Goto(label) => self.build_goto(label, stmt.span),
            StmtKind::Label(label) => self.build_label(label, stmt.span),
            StmtKind::Return(_) => {
                let bound = self.binder.bind_statement(stmt);
                self.append(bound);
                let exit = self.exit;
                self.jump_away(exit, None);
            }
            StmtKind::Throw(exception) => self.build_throw(stmt, exception),
            StmtKind::Expr(expr) => match &expr.kind {
                ExprKind::Throw(exception) => self.build_throw(stmt, exception),
                ExprKind::Exit(_) => {
                    let bound = self.binder.bind_statement(stmt);
                    self.append(bound);
                    let exit = self.exit;
                    self.jump_away(exit, None);
                }
                _ => {
                    let bound = self.binder.bind_statement(stmt);
                    self.append(bound);
                }
            },
            // Unconditional declarations are hoisted and leave nothing to execute.
            StmtKind::FunctionDecl(_) | StmtKind::ClassDecl { .. } if self.hoisted_here() => {}
            StmtKind::Noop => {}
            _ => {
                let bound = self.binder.bind_statement(stmt);
                self.append(bound);
            }
        }
    }

    fn build_throw(&mut self, stmt: &Stmt, exception: &Expr) {
        let exception_type = match &exception.kind {
            ExprKind::New { class: TypeRef::Named(name), .. } => Some(name.unqualified().to_string()),
            _ => None,
        };
        let value = self.binder.bind_condition(exception);
        self.append(BoundStmt::new(BoundStmtKind::Throw(value), stmt.span));
        self.throw_sites.push(ThrowSite {
            block: self.current,
            span: stmt.span,
            try_block: self.try_regions.last().copied(),
            exception_type,
        });
        let exit = self.exit;
        self.jump_away(exit, None);
    }

    fn build_if(&mut self, arms: &[IfArm]) {
        let end = self.new_block(BlockKind::Plain);

        for (i, arm) in arms.iter().enumerate() {
            match &arm.condition {
                Some(condition) => {
                    let condition = self.binder.bind_condition(condition);
                    let then_block = self.new_block(BlockKind::Plain);
                    let else_target = if i + 1 < arms.len() {
                        self.new_block(BlockKind::Plain)
                    } else {
                        end
                    };
                    self.connect(
                        self.current,
                        Edge::Conditional(ConditionalEdge {
                            true_target: then_block,
                            false_target: else_target,
                            condition,
                            is_loop: false,
                        }),
                    );

                    self.current = then_block;
                    self.scoped(&arm.body);
                    self.jump(end, None);
                    self.current = else_target;
                }
                None => {
                    // Trailing `else`: its body starts in the last arm's else target.
                    self.scoped(&arm.body);
                    self.jump(end, None);
                    self.current = end;
                }
            }
        }

        if arms.is_empty() {
            self.jump(end, None);
            self.current = end;
        }
    }

    /// `while` and `for`. A loop without conditions never reaches its end
    /// block except through `break`.
    fn build_loop(&mut self, init: &[Expr], conditions: &[Expr], actions: &[Expr], body: &[Stmt]) {
        for expr in init {
            self.expression_statement(expr);
        }

        let end = if conditions.is_empty() {
            self.new_dead_block()
        } else {
            self.new_block(BlockKind::Plain)
        };
        let body_block = self.new_block(BlockKind::Plain);
        let cond_block = if conditions.is_empty() {
            body_block
        } else {
            self.new_block(BlockKind::Plain)
        };
        let action_block = if actions.is_empty() {
            cond_block
        } else {
            self.new_block(BlockKind::Plain)
        };

        self.jump(cond_block, None);
        self.current = cond_block;
        self.break_scopes.push(BreakScope {
            break_target: end,
            continue_target: action_block,
        });

        if let Some((last, leading)) = conditions.split_last() {
            for expr in leading {
                self.expression_statement(expr);
            }
            let condition = self.binder.bind_condition(last);
            self.connect(
                cond_block,
                Edge::Conditional(ConditionalEdge {
                    true_target: body_block,
                    false_target: end,
                    condition,
                    is_loop: true,
                }),
            );
            self.current = body_block;
        }

        self.scoped(body);

        if !actions.is_empty() {
            self.jump(action_block, None);
            self.current = action_block;
            for expr in actions {
                self.expression_statement(expr);
            }
        }
        self.jump(cond_block, None);

        self.break_scopes.pop();
        self.current = end;
    }

    fn build_do_while(&mut self, body: &[Stmt], condition: &Expr) {
        let end = self.new_block(BlockKind::Plain);
        let body_block = self.new_block(BlockKind::Plain);

        self.jump(body_block, None);
        self.current = body_block;
        self.break_scopes.push(BreakScope {
            break_target: end,
            continue_target: body_block,
        });

        self.scoped(body);

        let condition = self.binder.bind_condition(condition);
        self.connect(
            self.current,
            Edge::Conditional(ConditionalEdge {
                true_target: body_block,
                false_target: end,
                condition,
                is_loop: true,
            }),
        );

        self.break_scopes.pop();
        self.current = end;
    }

    fn build_foreach(&mut self, enumeree: &Expr, key: Option<&Expr>, value: &Expr, aliased: bool, body: &[Stmt]) {
        let enumeree_access = if aliased && enumeree.is_reference() {
            AccessDescriptor::READ_REF
        } else {
            AccessDescriptor::READ
        };
        let bound_enumeree = self.binder.bind_expr(enumeree, enumeree_access);

        let move_block = self.new_block(BlockKind::Plain);
        let body_block = self.new_block(BlockKind::Plain);
        let end = self.new_block(BlockKind::Plain);

        let enumeree_block = self.current;
        self.connect(
            enumeree_block,
            Edge::ForeachEnumeree(ForeachEnumereeEdge {
                target: move_block,
                enumeree: bound_enumeree,
                aliased,
            }),
        );

        self.break_scopes.push(BreakScope {
            break_target: end,
            continue_target: move_block,
        });

        let key = key.map(|k| self.binder.bind_target(k, false));
        let value = self.binder.bind_target(value, aliased);
        self.connect(
            move_block,
            Edge::ForeachMoveNext(ForeachMoveNextEdge {
                body: body_block,
                end,
                enumeree_block,
                key,
                value,
            }),
        );

        self.current = body_block;
        self.scoped(body);
        self.jump(move_block, None);

        self.break_scopes.pop();
        self.current = end;
    }

    fn build_switch(&mut self, value: &Expr, cases: &[SwitchCase]) {
        let value = self.binder.bind_condition(value);
        let end = self.new_block(BlockKind::Plain);

        let mut case_blocks = Vec::with_capacity(cases.len() + 1);
        for case in cases {
            let case_value = case.value.as_ref().map(|v| self.binder.bind_condition(v));
            case_blocks.push(self.new_block(BlockKind::Case(CaseInfo { value: case_value })));
        }
        let implicit_default = if cases.iter().any(|c| c.value.is_none()) {
            None
        } else {
            let block = self.new_block(BlockKind::Case(CaseInfo { value: None }));
            case_blocks.push(block);
            Some(block)
        };

        self.connect(
            self.current,
            Edge::Switch(SwitchEdge {
                value,
                case_blocks: case_blocks.clone(),
                end,
            }),
        );

        // `continue` inside a switch acts like `break`.
        self.break_scopes.push(BreakScope {
            break_target: end,
            continue_target: end,
        });

        for (i, case) in cases.iter().enumerate() {
            if i > 0 {
                self.jump(case_blocks[i], None);
            }
            self.current = case_blocks[i];
            self.scoped(&case.body);
        }

        if let Some(default) = implicit_default {
            if !cases.is_empty() {
                self.jump(default, None);
            }
            self.current = default;
        }
        self.jump(end, None);

        self.break_scopes.pop();
        self.current = end;
    }

    fn build_try(&mut self, body: &[Stmt], catches: &[CatchClause], finally: Option<&[Stmt]>) {
        let end = self.new_block(BlockKind::Plain);
        let body_block = self.new_block(BlockKind::Plain);

        let mut catch_blocks = Vec::with_capacity(catches.len());
        for clause in catches {
            let types = clause
                .types
                .iter()
                .map(|name| CaughtType {
                    name: name.unqualified().to_string(),
                    handle: self.binder.resolve_type_name(&name.value),
                    span: name.span,
                })
                .collect();
            let variable = clause.variable.as_ref().map(|v| self.binder.bind_target(v, false));
            catch_blocks.push(self.new_block(BlockKind::Catch(CatchInfo { types, variable })));
        }
        let finally_block = finally.map(|_| self.new_block(BlockKind::Plain));

        let try_block = self.current;
        self.connect(
            try_block,
            Edge::TryCatch(TryCatchEdge {
                body: body_block,
                catch_blocks: catch_blocks.clone(),
                finally: finally_block,
                end,
            }),
        );
        let leave_target = finally_block.unwrap_or(end);

        self.try_regions.push(try_block);
        self.current = body_block;
        self.scoped(body);
        self.try_regions.pop();
        self.leave(leave_target);

        for (clause, block) in catches.iter().zip(catch_blocks) {
            self.current = block;
            self.scoped(&clause.body);
            self.leave(leave_target);
        }

        if let (Some(stmts), Some(block)) = (finally, finally_block) {
            self.current = block;
            self.scoped(stmts);
            self.leave(end);
        }

        self.current = end;
    }

    fn build_break(&mut self, level: Option<&Expr>, is_break: bool, span: Span) {
        let keyword = if is_break { "break" } else { "continue" };

        let depth = match level {
            None => 1,
            Some(expr) => match expr.as_int_literal() {
                Some(n) if n >= 1 => n as usize,
                Some(n) => {
                    self.diagnostics.push(Diagnostic::warning(
                        diagnostic::BREAK_INVALID_LEVEL,
                        format!("'{}' level must be a positive integer, got {}", keyword, n),
                        span,
                    ));
                    1
                }
                None => {
                    self.diagnostics.push(Diagnostic::error(
                        diagnostic::BREAK_NON_CONSTANT_LEVEL,
                        format!("'{}' operator with non-integer operand is no longer supported", keyword),
                        span,
                    ));
                    1
                }
            },
        };

        let target = match self.break_scopes.len().checked_sub(depth) {
            Some(index) => {
                let scope = self.break_scopes[index];
                if is_break {
                    scope.break_target
                } else {
                    scope.continue_target
                }
            }
            None => {
                let message = if self.break_scopes.is_empty() {
                    format!("'{}' not in the 'loop' or 'switch' context", keyword)
                } else {
                    format!(
                        "Cannot '{}' {} levels, only {} enclosing",
                        keyword,
                        depth,
                        self.break_scopes.len()
                    )
                };
                self.diagnostics
                    .push(Diagnostic::error(diagnostic::BREAK_OUTSIDE_LOOP, message, span));
                self.exit
            }
        };

        self.jump_away(target, Some(span));
    }

    fn label_block(&mut self, name: &str, span: Span) -> BlockId {
        if let Some(info) = self.labels.get(name) {
            return info.block;
        }
        let block = self.new_block(BlockKind::Plain);
        self.labels.insert(
            name.to_string(),
            LabelInfo {
                block,
                span,
                flags: LabelFlags::default(),
            },
        );
        block
    }

    fn build_goto(&mut self, name: &str, span: Span) {
        let target = self.label_block(name, span);
        if let Some(info) = self.labels.get_mut(name) {
            info.flags.insert(LabelFlags::USED);
        }
        self.jump_away(target, Some(span));
    }

    fn build_label(&mut self, name: &str, span: Span) {
        let block = self.label_block(name, span);
        let Some(info) = self.labels.get_mut(name) else {
            return;
        };

        if info.is_defined() {
            info.flags.insert(LabelFlags::REDEFINED);
            return;
        }
        info.flags.insert(LabelFlags::DEFINED);
        info.span = span;

        self.jump(block, None);
        self.current = block;
    }

    fn expression_statement(&mut self, expr: &Expr) {
        let bound = self.binder.bind_expr(expr, AccessDescriptor::NONE);
        self.append(BoundStmt::new(BoundStmtKind::Expression(bound), expr.span));
    }

    fn finish(mut self) -> ControlFlowGraph {
        assert!(self.break_scopes.is_empty(), "unbalanced break scopes");
        assert!(self.try_regions.is_empty(), "unbalanced try regions");
        assert!(self.scopes.is_empty(), "unbalanced local scopes");

        // Labels used but never defined still need an outgoing edge.
        let exit = self.exit;
        for index in 0..self.blocks.len() {
            let block = &self.blocks[index];
            if !block.is_exit() && block.edge().is_none() {
                self.connect(BlockId(index as u32), Edge::Simple(SimpleEdge { target: exit, syntax: None }));
            }
        }

        let mut reachable = vec![false; self.blocks.len()];
        for id in breadth_first(&self.blocks, self.start) {
            reachable[id.index()] = true;
        }

        for id in std::mem::take(&mut self.dead) {
            if reachable[id.index()] {
                let ordinal = self.next_ordinal;
                self.next_ordinal += 1;
                self.blocks[id.index()].set_reachability(Reachability::Live(ordinal));
            }
        }
        for block in &mut self.blocks {
            if !reachable[block.id().index()] && !block.is_start() && !block.is_exit() {
                block.set_reachability(Reachability::Dead);
            }
        }

        let mut diagnostics = self.diagnostics;
        diagnostics.extend(self.binder.take_diagnostics());
        diagnostics.sort_by_key(|d| d.span.start.offset);

        ControlFlowGraph::from_parts(
            self.blocks,
            self.start,
            self.exit,
            self.labels,
            self.throw_sites,
            diagnostics,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Argument, CallTarget, Literal, Name, VariableName};
    use crate::bound::{BoundExpr, BoundExprKind};
    use crate::symbols::{RoutineSymbols, TypeTable};
    use crate::visitor::{NodeVisitor, Visitor};
    use mago_database::file::FileId;
    use mago_span::Position;
    use std::collections::HashSet;

    /// Spans encode a marker offset so statements can be found again in the graph.
    fn at(offset: u32) -> Span {
        Span::new(FileId::zero(), Position::new(offset), Position::new(offset + 1))
    }

    fn span() -> Span {
        at(0)
    }

    fn expr(kind: ExprKind) -> Expr {
        Expr::new(kind, span())
    }

    fn var(name: &str) -> Expr {
        expr(ExprKind::Variable(VariableName::Direct(name.to_string())))
    }

    fn int(value: i64) -> Expr {
        expr(ExprKind::Literal(Literal::Int(value)))
    }

    fn stmt(kind: StmtKind) -> Stmt {
        Stmt::new(kind, span())
    }

    /// `echo` statement tagged with a marker offset.
    fn echo(marker: u32) -> Stmt {
        Stmt::new(StmtKind::Echo(vec![int(marker as i64)]), at(marker))
    }

    fn less(name: &str, value: i64) -> Expr {
        expr(ExprKind::Binary {
            op: crate::ast::BinaryOp::Less,
            left: Box::new(var(name)),
            right: Box::new(int(value)),
        })
    }

    fn build(body: Vec<Stmt>) -> ControlFlowGraph {
        build_kind(RoutineKind::Function, body)
    }

    fn build_kind(kind: RoutineKind, body: Vec<Stmt>) -> ControlFlowGraph {
        let routine = Routine {
            name: "test".to_string(),
            kind,
            parameters: Vec::new(),
            uses: Vec::new(),
            body,
            span: span(),
        };
        let types = TypeTable::with_builtins();
        let symbols = RoutineSymbols::for_routine(&types, &routine);
        GraphBuilder::build(&routine, &symbols)
    }

    fn block_with(graph: &ControlFlowGraph, marker: u32) -> BlockId {
        graph
            .blocks()
            .iter()
            .find(|b| b.statements().iter().any(|s| s.span.start.offset == marker))
            .map(|b| b.id())
            .unwrap_or_else(|| panic!("no block holds marker {}", marker))
    }

    fn assert_single_exit(graph: &ControlFlowGraph) {
        let exits: Vec<_> = graph.blocks().iter().filter(|b| b.is_exit()).collect();
        assert_eq!(exits.len(), 1);
        assert!(exits[0].edge().is_none());
        for block in graph.blocks() {
            if !block.is_exit() {
                assert!(block.edge().is_some(), "block {} has no edge", block.id());
            }
        }
    }

    fn assert_unique_ordinals(graph: &ControlFlowGraph) {
        let mut seen = HashSet::new();
        for id in graph.reachable_blocks() {
            if let Some(ordinal) = graph.block(id).ordinal() {
                assert!(seen.insert(ordinal), "ordinal {} used twice", ordinal);
            }
        }
    }

    #[test]
    fn test_empty_routine() {
        let graph = build(Vec::new());
        assert_single_exit(&graph);
        assert_eq!(graph.successors(graph.start()), vec![graph.exit()]);
        assert!(graph.unreachable_blocks().is_empty());
    }

    #[test]
    fn test_sequential_statements_share_block() {
        let graph = build(vec![echo(1), echo(2)]);
        assert_eq!(block_with(&graph, 1), block_with(&graph, 2));
        assert_eq!(block_with(&graph, 1), graph.start());
    }

    #[test]
    fn test_if_else_chain() {
        let body = vec![stmt(StmtKind::If(vec![
            IfArm { condition: Some(var("a")), body: vec![echo(1)], span: span() },
            IfArm { condition: Some(var("b")), body: vec![echo(2)], span: span() },
            IfArm { condition: None, body: vec![echo(3)], span: span() },
        ])), echo(4)];
        let graph = build(body);
        assert_single_exit(&graph);
        assert_unique_ordinals(&graph);

        let first = graph.block(graph.start()).edge().expect("start has an edge");
        assert!(first.is_conditional());
        let end = block_with(&graph, 4);
        for marker in [1, 2, 3] {
            assert_eq!(graph.successors(block_with(&graph, marker)), vec![end]);
        }
        assert!(graph.unreachable_blocks().is_empty());
    }

    #[test]
    fn test_if_without_else_falls_to_end() {
        let body = vec![
            stmt(StmtKind::If(vec![IfArm { condition: Some(var("a")), body: vec![echo(1)], span: span() }])),
            echo(2),
        ];
        let graph = build(body);
        match graph.block(graph.start()).edge() {
            Some(Edge::Conditional(edge)) => {
                assert_eq!(edge.false_target, block_with(&graph, 2));
                assert_eq!(edge.true_target, block_with(&graph, 1));
                assert!(!edge.is_loop);
            }
            other => panic!("expected conditional edge, got {:?}", other),
        }
    }

    #[test]
    fn test_while_loop_shape() {
        let body = vec![
            stmt(StmtKind::While { condition: less("i", 3), body: vec![echo(1)] }),
            echo(2),
        ];
        let graph = build(body);
        assert_single_exit(&graph);

        let body_block = block_with(&graph, 1);
        let cond = graph.successors(body_block);
        assert_eq!(cond.len(), 1);
        match graph.block(cond[0]).edge() {
            Some(Edge::Conditional(edge)) => {
                assert!(edge.is_loop);
                assert_eq!(edge.true_target, body_block);
                assert_eq!(edge.false_target, block_with(&graph, 2));
            }
            other => panic!("expected loop condition, got {:?}", other),
        }
    }

    #[test]
    fn test_infinite_for_end_is_dead() {
        let body = vec![
            stmt(StmtKind::For { init: Vec::new(), condition: Vec::new(), action: Vec::new(), body: vec![echo(1)] }),
            echo(2),
        ];
        let graph = build(body);
        assert_single_exit(&graph);

        let body_block = block_with(&graph, 1);
        assert_eq!(graph.successors(body_block), vec![body_block]);
        let after = block_with(&graph, 2);
        assert!(graph.block(after).is_dead());
        assert!(graph.unreachable_blocks().contains(&after));
    }

    #[test]
    fn test_infinite_for_with_break_revives_end() {
        let body = vec![
            stmt(StmtKind::For {
                init: Vec::new(),
                condition: Vec::new(),
                action: Vec::new(),
                body: vec![stmt(StmtKind::Break(None))],
            }),
            echo(2),
        ];
        let graph = build(body);
        let after = block_with(&graph, 2);
        assert!(!graph.block(after).is_dead());
        assert_unique_ordinals(&graph);
    }

    #[test]
    fn test_statement_after_break_is_dead() {
        let increment = expr(ExprKind::IncDec { increment: true, prefix: false, target: Box::new(var("i")) });
        let init = expr(ExprKind::Assign { target: Box::new(var("i")), value: Box::new(int(0)), by_ref: false });
        let body = vec![
            stmt(StmtKind::For {
                init: vec![init],
                condition: vec![less("i", 1)],
                action: vec![increment],
                body: vec![stmt(StmtKind::Break(None)), echo(1)],
            }),
            echo(2),
        ];
        let graph = build(body);
        assert_single_exit(&graph);
        assert_unique_ordinals(&graph);

        let dead = block_with(&graph, 1);
        assert!(graph.block(dead).is_dead());
        assert!(graph.unreachable_blocks().contains(&dead));
        assert!(!graph.block(block_with(&graph, 2)).is_dead());
    }

    #[test]
    fn test_break_carries_syntax() {
        let break_span = at(77);
        let body = vec![stmt(StmtKind::While {
            condition: var("x"),
            body: vec![echo(1), Stmt::new(StmtKind::Break(None), break_span)],
        })];
        let graph = build(body);
        match graph.block(block_with(&graph, 1)).edge() {
            Some(Edge::Simple(edge)) => assert_eq!(edge.syntax.map(|s| s.start.offset), Some(77)),
            other => panic!("expected simple edge, got {:?}", other),
        }
    }

    #[test]
    fn test_break_levels() {
        let inner = stmt(StmtKind::While {
            condition: var("b"),
            body: vec![echo(1), stmt(StmtKind::Break(Some(int(2))))],
        });
        let body = vec![stmt(StmtKind::While { condition: var("a"), body: vec![inner] }), echo(2)];
        let graph = build(body);
        assert_eq!(graph.successors(block_with(&graph, 1)), vec![block_with(&graph, 2)]);
        assert!(graph.diagnostics().is_empty());
    }

    #[test]
    fn test_break_outside_loop_is_diagnosed() {
        let graph = build(vec![echo(1), stmt(StmtKind::Break(None)), echo(2)]);
        assert_single_exit(&graph);
        assert_eq!(graph.diagnostics().len(), 1);
        assert_eq!(graph.diagnostics()[0].code, diagnostic::BREAK_OUTSIDE_LOOP);
        assert_eq!(graph.successors(block_with(&graph, 1)), vec![graph.exit()]);
        assert!(graph.block(block_with(&graph, 2)).is_dead());
    }

    #[test]
    fn test_break_level_too_deep() {
        let body = vec![stmt(StmtKind::While { condition: var("a"), body: vec![stmt(StmtKind::Break(Some(int(3))))] })];
        let graph = build(body);
        assert_eq!(graph.diagnostics()[0].code, diagnostic::BREAK_OUTSIDE_LOOP);
    }

    #[test]
    fn test_break_zero_clamps_to_one() {
        let body = vec![
            stmt(StmtKind::While { condition: var("a"), body: vec![echo(1), stmt(StmtKind::Break(Some(int(0))))] }),
            echo(2),
        ];
        let graph = build(body);
        assert_eq!(graph.successors(block_with(&graph, 1)), vec![block_with(&graph, 2)]);
        assert_eq!(graph.diagnostics()[0].code, diagnostic::BREAK_INVALID_LEVEL);
    }

    #[test]
    fn test_non_constant_break_level() {
        let body = vec![stmt(StmtKind::While { condition: var("a"), body: vec![stmt(StmtKind::Break(Some(var("n"))))] })];
        let graph = build(body);
        assert_eq!(graph.diagnostics()[0].code, diagnostic::BREAK_NON_CONSTANT_LEVEL);
    }

    #[test]
    fn test_do_while() {
        let body = vec![
            stmt(StmtKind::DoWhile { body: vec![echo(1)], condition: var("a") }),
            echo(2),
        ];
        let graph = build(body);
        let body_block = block_with(&graph, 1);
        match graph.block(body_block).edge() {
            Some(Edge::Conditional(edge)) => {
                assert_eq!(edge.true_target, body_block);
                assert_eq!(edge.false_target, block_with(&graph, 2));
                assert!(edge.is_loop);
            }
            other => panic!("expected loop condition, got {:?}", other),
        }
    }

    #[test]
    fn test_continue_in_do_while_targets_body() {
        let body = vec![stmt(StmtKind::DoWhile {
            body: vec![echo(1), stmt(StmtKind::If(vec![IfArm {
                condition: Some(var("a")),
                body: vec![echo(2), stmt(StmtKind::Continue(None))],
                span: span(),
            }]))],
            condition: var("b"),
        })];
        let graph = build(body);
        assert_eq!(graph.successors(block_with(&graph, 2)), vec![block_with(&graph, 1)]);
    }

    #[test]
    fn test_foreach_edges() {
        let body = vec![
            stmt(StmtKind::Foreach {
                enumeree: var("items"),
                key: Some(var("k")),
                value: var("v"),
                by_ref: true,
                body: vec![echo(1)],
            }),
            echo(2),
        ];
        let graph = build(body);
        assert_single_exit(&graph);

        let move_block = match graph.block(graph.start()).edge() {
            Some(Edge::ForeachEnumeree(edge)) => {
                assert!(edge.aliased);
                assert!(edge.enumeree.access.is_read_ref());
                edge.target
            }
            other => panic!("expected enumeree edge, got {:?}", other),
        };
        match graph.block(move_block).edge() {
            Some(Edge::ForeachMoveNext(edge)) => {
                assert_eq!(edge.body, block_with(&graph, 1));
                assert_eq!(edge.end, block_with(&graph, 2));
                assert!(edge.value.access.is_write_ref());
                assert!(edge.key.as_ref().map(|k| k.access.is_write()).unwrap_or(false));
                assert!(edge.enumeree_edge(&graph).is_some());
            }
            other => panic!("expected move-next edge, got {:?}", other),
        }
        assert_eq!(graph.successors(block_with(&graph, 1)), vec![move_block]);
    }

    #[test]
    fn test_switch_implicit_default_is_last() {
        let body = vec![
            stmt(StmtKind::Switch {
                value: var("x"),
                cases: vec![
                    SwitchCase { value: Some(int(1)), body: vec![echo(1), stmt(StmtKind::Break(None))], span: span() },
                    SwitchCase { value: Some(int(2)), body: vec![echo(2)], span: span() },
                ],
            }),
            echo(3),
        ];
        let graph = build(body);
        assert_single_exit(&graph);

        let edge = match graph.block(graph.start()).edge() {
            Some(Edge::Switch(edge)) => edge,
            other => panic!("expected switch edge, got {:?}", other),
        };
        assert_eq!(edge.case_blocks.len(), 3);
        let last = graph.block(*edge.case_blocks.last().expect("cases"));
        assert!(last.is_default_case());
        assert!(!graph.block(edge.case_blocks[0]).is_default_case());

        let end = block_with(&graph, 3);
        assert_eq!(edge.end, end);
        assert_eq!(graph.successors(block_with(&graph, 1)), vec![end]);
        // Case 2 falls through into the implicit default.
        assert_eq!(graph.successors(block_with(&graph, 2)), vec![edge.case_blocks[2]]);
    }

    #[test]
    fn test_switch_written_default() {
        let body = vec![stmt(StmtKind::Switch {
            value: var("x"),
            cases: vec![
                SwitchCase { value: None, body: vec![echo(1)], span: span() },
                SwitchCase { value: Some(int(2)), body: vec![echo(2), stmt(StmtKind::Continue(None))], span: span() },
            ],
        })];
        let graph = build(body);
        let edge = match graph.block(graph.start()).edge() {
            Some(Edge::Switch(edge)) => edge,
            other => panic!("expected switch edge, got {:?}", other),
        };
        assert_eq!(edge.case_blocks.len(), 2);
        assert!(graph.block(edge.case_blocks[0]).is_default_case());
        assert_eq!(graph.successors(block_with(&graph, 2)), vec![edge.end]);
    }

    #[test]
    fn test_try_finally_uses_leave_edges() {
        let ret = Stmt::new(StmtKind::Return(Some(int(1))), at(10));
        let body = vec![stmt(StmtKind::Try {
            body: vec![ret],
            catches: Vec::new(),
            finally: Some(vec![echo(1)]),
        })];
        let graph = build(body);
        assert_single_exit(&graph);

        let edge = match graph.block(graph.start()).edge() {
            Some(Edge::TryCatch(edge)) => edge,
            other => panic!("expected try/catch edge, got {:?}", other),
        };
        let finally = edge.finally.expect("finally block");
        assert_eq!(finally, block_with(&graph, 1));

        let leaving: Vec<_> = graph
            .blocks()
            .iter()
            .filter(|b| matches!(b.edge(), Some(Edge::Leave(leave)) if leave.target == finally))
            .collect();
        assert_eq!(leaving.len(), 1);
        assert!(graph.predecessors(finally).contains(&graph.start()));

        match graph.block(finally).edge() {
            Some(Edge::Leave(leave)) => {
                assert_eq!(leave.target, edge.end);
                assert_eq!(graph.successors(edge.end), vec![graph.exit()]);
            }
            other => panic!("expected leave edge, got {:?}", other),
        }
    }

    #[test]
    fn test_try_catch_blocks_and_throw_sites() {
        let throw = Stmt::new(
            StmtKind::Throw(expr(ExprKind::New {
                class: TypeRef::Named(Name::new("InvalidArgumentException", span())),
                args: Vec::new(),
            })),
            at(20),
        );
        let body = vec![stmt(StmtKind::Try {
            body: vec![throw],
            catches: vec![
                CatchClause {
                    types: vec![Name::new("RuntimeException", span())],
                    variable: Some(var("e")),
                    body: vec![echo(1)],
                    span: span(),
                },
                CatchClause {
                    types: vec![Name::new("\\InvalidArgumentException", span())],
                    variable: None,
                    body: vec![echo(2)],
                    span: span(),
                },
            ],
            finally: None,
        })];
        let graph = build(body);
        assert_single_exit(&graph);

        let edge = match graph.block(graph.start()).edge() {
            Some(Edge::TryCatch(edge)) => edge,
            other => panic!("expected try/catch edge, got {:?}", other),
        };
        assert_eq!(edge.catch_blocks.len(), 2);
        let catch = graph.block(edge.catch_blocks[0]).catch_info().expect("catch info");
        assert!(catch.types[0].handle.is_some());
        assert!(catch.variable.as_ref().map(|v| v.access.is_write()).unwrap_or(false));

        assert_eq!(graph.throw_sites().len(), 1);
        let site = &graph.throw_sites()[0];
        assert_eq!(site.try_block, Some(graph.start()));
        assert_eq!(site.handler(&graph), Some(edge.catch_blocks[1]));
        assert_eq!(graph.successors(site.block), vec![graph.exit()]);
    }

    #[test]
    fn test_goto_reconnects_label() {
        let body = vec![
            stmt(StmtKind::Goto("L".to_string())),
            echo(1),
            stmt(StmtKind::Label("L".to_string())),
            echo(2),
        ];
        let graph = build(body);
        assert_single_exit(&graph);
        assert_unique_ordinals(&graph);

        assert!(graph.block(block_with(&graph, 1)).is_dead());
        let target = block_with(&graph, 2);
        assert!(!graph.block(target).is_dead());

        let label = graph.label("L").expect("label L");
        assert_eq!(label.block, target);
        assert!(label.is_defined());
        assert!(label.is_used());
        assert!(!label.is_redefined());
    }

    #[test]
    fn test_label_redefinition_is_flagged() {
        let body = vec![
            stmt(StmtKind::Label("L".to_string())),
            echo(1),
            stmt(StmtKind::Label("L".to_string())),
            echo(2),
        ];
        let graph = build(body);
        let label = graph.label("L").expect("label L");
        assert!(label.is_redefined());
        assert!(!label.is_used());
        assert_eq!(block_with(&graph, 1), block_with(&graph, 2));
    }

    #[test]
    fn test_undefined_label_leads_to_exit() {
        let graph = build(vec![stmt(StmtKind::Goto("nowhere".to_string()))]);
        assert_single_exit(&graph);
        let label = graph.label("nowhere").expect("label");
        assert!(label.is_used());
        assert!(!label.is_defined());
        assert_eq!(graph.successors(label.block), vec![graph.exit()]);
    }

    #[test]
    fn test_exit_call_terminates() {
        let body = vec![
            Stmt::new(StmtKind::Expr(expr(ExprKind::Exit(None))), at(5)),
            echo(1),
        ];
        let graph = build(body);
        assert_eq!(graph.successors(block_with(&graph, 5)), vec![graph.exit()]);
        assert!(graph.block(block_with(&graph, 1)).is_dead());
    }

    #[test]
    fn test_top_level_function_declaration_is_hoisted() {
        let decl = stmt(StmtKind::FunctionDecl(Name::new("helper", span())));
        let nested = stmt(StmtKind::If(vec![IfArm {
            condition: Some(var("a")),
            body: vec![Stmt::new(StmtKind::FunctionDecl(Name::new("other", span())), at(9))],
            span: span(),
        }]));
        let graph = build_kind(RoutineKind::Script, vec![decl, nested]);
        assert!(graph.block(graph.start()).statements().is_empty());
        let block = graph.block(block_with(&graph, 9));
        assert_eq!(block.statements()[0].kind_name(), "FunctionDecl");
    }

    #[test]
    fn test_declarations_in_function_body_are_bound() {
        let function = Stmt::new(StmtKind::FunctionDecl(Name::new("inner", span())), at(3));
        let class = Stmt::new(
            StmtKind::ClassDecl { name: Name::new("Local", span()), parent: None },
            at(5),
        );
        let graph = build(vec![function, class]);

        let statements = graph.block(graph.start()).statements();
        assert_eq!(statements.len(), 2);
        assert!(matches!(&statements[0].kind, BoundStmtKind::FunctionDecl(name) if name == "inner"));
        assert!(matches!(&statements[1].kind, BoundStmtKind::TypeDecl(decl) if decl.name == "Local"));
    }

    #[test]
    fn test_skip_empty_is_idempotent() {
        let body = vec![
            stmt(StmtKind::If(vec![IfArm { condition: Some(var("a")), body: Vec::new(), span: span() }])),
            stmt(StmtKind::If(vec![IfArm { condition: Some(var("b")), body: vec![echo(1)], span: span() }])),
            echo(2),
        ];
        let graph = build(body);
        let all: Vec<BlockId> = graph.blocks().iter().map(|b| b.id()).collect();
        let once = graph.skip_empty(&all);
        let twice = graph.skip_empty(&once);
        assert_eq!(once, twice);
        for id in &once {
            let block = graph.block(*id);
            let collapsible = block.is_plain()
                && block.statements().is_empty()
                && matches!(block.edge(), Some(Edge::Simple(_)));
            assert!(!collapsible, "block {} should have been skipped", id);
        }
    }

    #[test]
    fn test_skip_empty_cycle() {
        let body = vec![stmt(StmtKind::For {
            init: Vec::new(),
            condition: Vec::new(),
            action: Vec::new(),
            body: Vec::new(),
        })];
        let graph = build(body);
        let loop_block = graph.successors(graph.start())[0];
        assert_eq!(graph.successors(loop_block), vec![loop_block]);
        assert_eq!(graph.skip_empty(&[loop_block, loop_block]), vec![loop_block]);
        // Start is never collapsed.
        assert_eq!(graph.skip_empty(&[graph.start()]), vec![graph.start()]);
    }

    #[test]
    fn test_unsupported_statement_is_diagnosed() {
        let graph = build(vec![stmt(StmtKind::Unsupported("declare".to_string()))]);
        assert_eq!(graph.diagnostics()[0].code, diagnostic::UNSUPPORTED_SYNTAX);
        assert_eq!(graph.block(graph.start()).statements()[0].kind_name(), "Empty");
    }

    struct Counter {
        blocks: usize,
        statements: usize,
        variables: usize,
    }

    impl Visitor for Counter {
        fn visit_block(&mut self, _block: &BasicBlock) -> bool {
            self.blocks += 1;
            true
        }

        fn visit_statement(&mut self, _stmt: &BoundStmt) -> bool {
            self.statements += 1;
            true
        }

        fn visit_expression(&mut self, expr: &BoundExpr) -> bool {
            if matches!(expr.kind, BoundExprKind::Variable(_)) {
                self.variables += 1;
            }
            true
        }
    }

    #[test]
    fn test_visit_skips_dead_blocks() {
        let body = vec![
            echo(1),
            stmt(StmtKind::If(vec![IfArm { condition: Some(var("a")), body: vec![echo(2)], span: span() }])),
            stmt(StmtKind::Return(None)),
            echo(3),
        ];
        let graph = build(body);
        let mut counter = Counter { blocks: 0, statements: 0, variables: 0 };
        graph.visit(&mut counter);

        assert_eq!(counter.blocks, graph.reachable_blocks().len());
        // echo 1, echo 2, return; the dead echo 3 is not visited.
        assert_eq!(counter.statements, 3);
        assert_eq!(counter.variables, 1);
    }

    struct EdgeNames;

    impl NodeVisitor<(), &'static str> for EdgeNames {
        fn default_expression(&mut self, _expr: &BoundExpr, _arg: ()) -> &'static str {
            "expression"
        }

        fn default_statement(&mut self, _stmt: &BoundStmt, _arg: ()) -> &'static str {
            "statement"
        }

        fn default_edge(&mut self, edge: &Edge, _arg: ()) -> &'static str {
            edge.kind_name()
        }

        fn visit_conditional_edge(&mut self, _edge: &Edge, _conditional: &ConditionalEdge, _arg: ()) -> &'static str {
            "branch"
        }
    }

    #[test]
    fn test_accept_with_dispatches_per_variant() {
        let call = expr(ExprKind::Call {
            target: CallTarget::Named(Name::new("f", span())),
            args: vec![Argument { value: var("x"), unpack: false, name: None }],
        });
        let body = vec![
            stmt(StmtKind::Expr(call)),
            stmt(StmtKind::If(vec![IfArm { condition: Some(var("a")), body: Vec::new(), span: span() }])),
        ];
        let graph = build(body);
        let start = graph.block(graph.start());
        let edge = start.edge().expect("edge");
        assert_eq!(edge.accept_with(&mut EdgeNames, ()), "branch");
        assert_eq!(start.statements()[0].accept_with(&mut EdgeNames, ()), "statement");

        let exit_edge = graph.block(graph.successors(graph.start())[0]).edge().expect("edge");
        assert_eq!(exit_edge.accept_with(&mut EdgeNames, ()), "simple");
    }

    #[test]
    fn test_new_color_is_monotonic() {
        let graph = build(Vec::new());
        let first = graph.new_color();
        let second = graph.new_color();
        assert!(second > first);
    }
}
