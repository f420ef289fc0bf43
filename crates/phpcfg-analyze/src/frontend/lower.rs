//! Lowering of mago syntax trees into `phpcfg_core::ast`
//!
//! Structure comes from the mago nodes; operator tokens, modifiers and a few
//! rarely used constructs are read back from the source text between node
//! spans. Anything that cannot be mapped becomes an `Unsupported` node.

use mago_database::file::FileId;
use mago_span::{HasSpan, Position, Span};
use mago_syntax::ast::*;
use phpcfg_core::ast::{
    self as tree, parse_float, parse_integer, unescape_string, ArrayItem, BinaryOp, CallTarget, CastKind,
    CatchClause, ClosureUse, Expr, ExprKind, IfArm, IncludeKind, MemberName, Name, Parameter, PseudoConstKind,
    Routine, RoutineKind, StaticVar, Stmt, StmtKind, TypeRef, UnaryOp, VariableName,
};

use super::names::{namespace_name, NameContext};
use super::TypeDeclaration;

pub(crate) struct Lowerer<'s> {
    source: &'s str,
    file_id: FileId,
    names: NameContext,
    /// Class whose body is being lowered.
    class: Option<String>,
    closures: usize,
    pub(crate) routines: Vec<Routine>,
    pub(crate) declarations: Vec<TypeDeclaration>,
}

impl<'s> Lowerer<'s> {
    pub(crate) fn new(source: &'s str, file_id: FileId) -> Self {
        Self {
            source,
            file_id,
            names: NameContext::new(),
            class: None,
            closures: 0,
            routines: Vec::new(),
            declarations: Vec::new(),
        }
    }

    fn slice(&self, start: u32, end: u32) -> &'s str {
        self.source.get(start as usize..end as usize).unwrap_or("")
    }

    fn text(&self, span: Span) -> &'s str {
        self.slice(span.start.offset, span.end.offset)
    }

    fn span_at(&self, start: u32, end: u32) -> Span {
        Span::new(self.file_id, Position::new(start), Position::new(end))
    }

    pub(crate) fn statements<'x, 'a: 'x>(
        &mut self,
        statements: impl IntoIterator<Item = &'x Statement<'a>>,
    ) -> Vec<Stmt> {
        let mut lowered = Vec::new();
        for statement in statements {
            self.statement(statement, &mut lowered);
        }
        lowered
    }

    /// Body of a control statement: a block's statements, or the single statement.
    fn body(&mut self, statement: &Statement<'_>) -> Vec<Stmt> {
        match statement {
            Statement::Block(block) => self.statements(block.statements.iter()),
            other => self.statements(std::iter::once(other)),
        }
    }

    fn statement(&mut self, statement: &Statement<'_>, out: &mut Vec<Stmt>) {
        let span = statement.span();
        let kind = match statement {
            Statement::Expression(statement) => StmtKind::Expr(self.expr(&statement.expression)),
            Statement::Echo(echo) => StmtKind::Echo(echo.values.iter().map(|value| self.expr(value)).collect()),
            Statement::Block(block) => StmtKind::Block(self.statements(block.statements.iter())),
            Statement::If(if_stmt) => {
                let mut arms = Vec::new();
                let condition = self.expr(&if_stmt.condition);
                match &if_stmt.body {
                    IfBody::Statement(body) => {
                        let statements = self.body(body.statement);
                        arms.push(IfArm { condition: Some(condition), body: statements, span });
                        for clause in body.else_if_clauses.iter() {
                            let condition = self.expr(&clause.condition);
                            let statements = self.body(clause.statement);
                            arms.push(IfArm { condition: Some(condition), body: statements, span: clause.span() });
                        }
                        if let Some(clause) = &body.else_clause {
                            let statements = self.body(clause.statement);
                            arms.push(IfArm { condition: None, body: statements, span: clause.span() });
                        }
                    }
                    IfBody::ColonDelimited(body) => {
                        let statements = self.statements(body.statements.iter());
                        arms.push(IfArm { condition: Some(condition), body: statements, span });
                        for clause in body.else_if_clauses.iter() {
                            let condition = self.expr(&clause.condition);
                            let statements = self.statements(clause.statements.iter());
                            arms.push(IfArm { condition: Some(condition), body: statements, span: clause.span() });
                        }
                        if let Some(clause) = &body.else_clause {
                            let statements = self.statements(clause.statements.iter());
                            arms.push(IfArm { condition: None, body: statements, span: clause.span() });
                        }
                    }
                }
                StmtKind::If(arms)
            }
            Statement::While(while_stmt) => {
                let condition = self.expr(&while_stmt.condition);
                let body = match &while_stmt.body {
                    WhileBody::Statement(statement) => self.body(statement),
                    WhileBody::ColonDelimited(block) => self.statements(block.statements.iter()),
                };
                StmtKind::While { condition, body }
            }
            Statement::DoWhile(do_while) => {
                let body = self.body(&do_while.statement);
                let condition = self.expr(&do_while.condition);
                StmtKind::DoWhile { body, condition }
            }
            Statement::For(for_stmt) => {
                let init = for_stmt.initializations.iter().map(|e| self.expr(e)).collect();
                let condition = for_stmt.conditions.iter().map(|e| self.expr(e)).collect();
                let action = for_stmt.increments.iter().map(|e| self.expr(e)).collect();
                let body = match &for_stmt.body {
                    ForBody::Statement(statement) => self.body(statement),
                    ForBody::ColonDelimited(block) => self.statements(block.statements.iter()),
                };
                StmtKind::For { init, condition, action, body }
            }
            Statement::Foreach(foreach) => {
                let enumeree = self.expr(&foreach.expression);
                let (key, (value, by_ref)) = match &foreach.target {
                    ForeachTarget::Value(target) => (None, self.foreach_value(&target.value)),
                    ForeachTarget::KeyValue(target) => {
                        let key = self.target(&target.key);
                        (Some(key), self.foreach_value(&target.value))
                    }
                };
                let body = match &foreach.body {
                    ForeachBody::Statement(statement) => self.body(statement),
                    ForeachBody::ColonDelimited(block) => self.statements(block.statements.iter()),
                };
                StmtKind::Foreach { enumeree, key, value, by_ref, body }
            }
            Statement::Switch(switch) => {
                let value = self.expr(&switch.expression);
                let cases = match &switch.body {
                    SwitchBody::BraceDelimited(body) => self.switch_cases(body.cases.iter()),
                    SwitchBody::ColonDelimited(body) => self.switch_cases(body.cases.iter()),
                };
                StmtKind::Switch { value, cases }
            }
            Statement::Try(try_stmt) => {
                let body = self.statements(try_stmt.block.statements.iter());
                let mut catches = Vec::new();
                for clause in try_stmt.catch_clauses.iter() {
                    let clause_span = clause.span();
                    let variable_span = clause.variable.as_ref().map(|variable| variable.span());
                    let types = self.catch_types(clause_span, variable_span);
                    let variable = variable_span.map(|span| self.variable_at(span));
                    let body = self.statements(clause.block.statements.iter());
                    catches.push(CatchClause { types, variable, body, span: clause_span });
                }
                let finally = try_stmt
                    .finally_clause
                    .as_ref()
                    .map(|clause| self.statements(clause.block.statements.iter()));
                StmtKind::Try { body, catches, finally }
            }
            Statement::Return(ret) => StmtKind::Return(ret.value.as_ref().map(|value| self.expr(value))),
            Statement::Break(break_stmt) => StmtKind::Break(break_stmt.level.as_ref().map(|level| self.expr(level))),
            Statement::Continue(continue_stmt) => {
                StmtKind::Continue(continue_stmt.level.as_ref().map(|level| self.expr(level)))
            }
            Statement::Global(global) => {
                StmtKind::Global(global.variables.iter().map(|variable| self.variable_at(variable.span())).collect())
            }
            Statement::Static(static_stmt) => StmtKind::Static(
                static_stmt
                    .items
                    .iter()
                    .map(|item| StaticVar {
                        variable: self.variable_at(item.variable().span()),
                        initializer: match item {
                            StaticItem::Concrete(item) => Some(self.expr(&item.value)),
                            StaticItem::Abstract(_) => None,
                        },
                        span: item.span(),
                    })
                    .collect(),
            ),
            Statement::Unset(unset) => StmtKind::Unset(unset.values.iter().map(|value| self.expr(value)).collect()),
            Statement::Function(function) => {
                let name = self.names.declare(self.text(function.name.span));
                let parameters: Vec<_> = function
                    .parameter_list
                    .parameters
                    .iter()
                    .map(|p| (p.span(), p.variable.span()))
                    .collect();
                let (parameters, _) = self.parameters(&parameters);
                let outer = self.class.take();
                let body = self.statements(function.body.statements.iter());
                self.class = outer;
                self.routines.push(Routine {
                    name: name.clone(),
                    kind: RoutineKind::Function,
                    parameters,
                    uses: Vec::new(),
                    body,
                    span,
                });
                StmtKind::FunctionDecl(Name::new(name, function.name.span))
            }
            Statement::Class(class) => self.class_like(class.name.span, span, class.members.iter()),
            Statement::Interface(interface) => self.class_like(interface.name.span, span, interface.members.iter()),
            Statement::Trait(trait_def) => self.class_like(trait_def.name.span, span, trait_def.members.iter()),
            Statement::Enum(enum_def) => self.class_like(enum_def.name.span, span, enum_def.members.iter()),
            Statement::Namespace(namespace) => {
                let name = namespace_name(self.text(span));
                let outer = self.names.clone();
                self.names.enter_namespace(&name);
                let statements = match &namespace.body {
                    NamespaceBody::Implicit(body) => self.statements(body.statements.iter()),
                    NamespaceBody::BraceDelimited(body) => self.statements(body.statements.iter()),
                };
                self.names = outer;
                out.extend(statements);
                return;
            }
            Statement::Use(_) => {
                let text = self.text(span);
                self.names.import_statement(text);
                return;
            }
            Statement::Goto(goto) => StmtKind::Goto(goto.label.value.to_string()),
            Statement::Label(label) => StmtKind::Label(label.name.value.to_string()),
            Statement::Inline(_) => StmtKind::InlineHtml(self.text(span).to_string()),
            Statement::EchoTag(tag) => StmtKind::Echo(tag.values.iter().map(|value| self.expr(value)).collect()),
            Statement::Declare(declare) => StmtKind::Block(match &declare.body {
                DeclareBody::Statement(statement) => self.body(statement),
                DeclareBody::ColonDelimited(body) => self.statements(body.statements.iter()),
            }),
            Statement::Constant(constant) => {
                for item in constant.items.iter() {
                    let define = self.define(item.name.value, item.name.span, &item.value, item.span());
                    out.push(Stmt::new(StmtKind::Expr(define), item.span()));
                }
                return;
            }
            Statement::HaltCompiler(_) => StmtKind::Expr(Expr::new(ExprKind::Exit(None), span)),
            Statement::OpeningTag(_) | Statement::ClosingTag(_) | Statement::Noop(_) => StmtKind::Noop,
            #[allow(unreachable_patterns)]
            _ => StmtKind::Unsupported(unsupported_statement(self.text(span))),
        };
        out.push(Stmt::new(kind, span));
    }

    /// `const NAME = value;` behaves as `define('NAME', value)`.
    fn define(&mut self, name: &str, name_span: Span, value: &Expression<'_>, span: Span) -> Expr {
        let constant = self.names.declare(name);
        let args = vec![
            tree::Argument {
                value: Expr::new(ExprKind::Literal(tree::Literal::String(constant)), name_span),
                unpack: false,
                name: None,
            },
            tree::Argument { value: self.expr(value), unpack: false, name: None },
        ];
        let target = CallTarget::Named(Name::new("define", name_span));
        Expr::new(ExprKind::Call { target, args }, span)
    }

    /// Status or message passed to `exit`/`die`.
    fn exit_status<'x, 'a: 'x>(&mut self, mut arguments: impl Iterator<Item = &'x Argument<'a>>) -> Option<Box<Expr>> {
        arguments.next().map(|argument| Box::new(self.expr(argument.value())))
    }

    fn switch_cases<'x, 'a: 'x>(
        &mut self,
        cases: impl IntoIterator<Item = &'x SwitchCase<'a>>,
    ) -> Vec<tree::SwitchCase> {
        let mut lowered = Vec::new();
        for case in cases {
            let value = match case {
                SwitchCase::Expression(case) => Some(self.expr(&case.expression)),
                SwitchCase::Default(_) => None,
            };
            let body = self.statements(case.statements().iter());
            lowered.push(tree::SwitchCase { value, body, span: case.span() });
        }
        lowered
    }

    /// Types listed between `catch (` and the variable or closing parenthesis.
    fn catch_types(&self, clause: Span, variable: Option<Span>) -> Vec<Name> {
        let end = variable.map(|v| v.start.offset).unwrap_or(clause.end.offset);
        let header = self.slice(clause.start.offset, end);
        let Some((_, list)) = header.split_once('(') else {
            return Vec::new();
        };
        let list = list.split(')').next().unwrap_or(list);
        list.split('|')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(|name| Name::new(self.names.resolve_class(name), clause))
            .collect()
    }

    fn foreach_value(&mut self, value: &Expression<'_>) -> (Expr, bool) {
        let by_ref = self.text(value.span()).trim_start().starts_with('&');
        (self.target(value), by_ref)
    }

    fn class_like<'x, 'a: 'x>(
        &mut self,
        name_span: Span,
        span: Span,
        members: impl IntoIterator<Item = &'x ClassLikeMember<'a>>,
    ) -> StmtKind {
        let name = self.names.declare(self.text(name_span));
        let header = self.slice(name_span.end.offset, span.end.offset);
        let header = header.split('{').next().unwrap_or(header);
        let parent = extends_clause(header).map(|parent| self.names.resolve_class(parent));

        let outer = self.class.replace(name.clone());
        let mut fields = Vec::new();
        for member in members {
            match member {
                ClassLikeMember::Property(property) => {
                    fields.extend(declared_properties(self.text(property.span())));
                }
                ClassLikeMember::Method(method) => {
                    let method_name = self.text(method.name.span);
                    let modifiers = self.slice(method.span().start.offset, method.name.span.start.offset);
                    let is_static = modifiers.split_whitespace().any(|w| w.eq_ignore_ascii_case("static"));
                    let parameters: Vec<_> = method
                        .parameter_list
                        .parameters
                        .iter()
                        .map(|p| (p.span(), p.variable.span()))
                        .collect();
                    let (parameters, promoted) = self.parameters(&parameters);
                    fields.extend(promoted);

                    if let MethodBody::Concrete(block) = &method.body {
                        let body = self.statements(block.statements.iter());
                        self.routines.push(Routine {
                            name: format!("{}::{}", name, method_name),
                            kind: RoutineKind::Method { class: name.clone(), is_static },
                            parameters,
                            uses: Vec::new(),
                            body,
                            span: method.span(),
                        });
                    }
                }
                _ => {}
            }
        }
        self.class = outer;

        self.declarations.push(TypeDeclaration {
            name: name.clone(),
            parent: parent.clone(),
            fields,
            span,
        });
        StmtKind::ClassDecl {
            name: Name::new(name, name_span),
            parent: parent.map(|parent| Name::new(parent, span)),
        }
    }

    /// Parameters from `(parameter span, variable span)` pairs, plus the names
    /// of constructor-promoted properties.
    fn parameters(&self, spans: &[(Span, Span)]) -> (Vec<Parameter>, Vec<String>) {
        let mut parameters = Vec::new();
        let mut promoted = Vec::new();

        for &(span, variable) in spans {
            let name = self.text(variable).trim_start_matches('$').to_string();
            let prefix = self.slice(span.start.offset, variable.start.offset).trim_end();
            let (prefix, variadic) = match prefix.strip_suffix("...") {
                Some(rest) => (rest.trim_end(), true),
                None => (prefix, false),
            };
            let has_default = self.slice(variable.end.offset, span.end.offset).contains('=');

            let is_promoted = prefix
                .split(|c: char| !c.is_alphanumeric())
                .any(|w| ["public", "protected", "private", "readonly"].iter().any(|m| w.eq_ignore_ascii_case(m)));
            if is_promoted {
                promoted.push(name.clone());
            }

            parameters.push(Parameter { name, by_ref: prefix.ends_with('&'), variadic, has_default, span });
        }

        (parameters, promoted)
    }

    fn closure_name(&mut self) -> String {
        self.closures += 1;
        format!("{{closure#{}}}", self.closures)
    }

    /// Lower an assignment target; array literals on the left destructure.
    fn target(&mut self, expression: &Expression<'_>) -> Expr {
        let span = expression.span();
        match expression {
            Expression::Array(array) => Expr::new(ExprKind::List(self.elements(array.elements.iter(), true)), span),
            Expression::LegacyArray(array) => {
                Expr::new(ExprKind::List(self.elements(array.elements.iter(), true)), span)
            }
            Expression::List(list) => Expr::new(ExprKind::List(self.elements(list.elements.iter(), true)), span),
            Expression::Parenthesized(inner) => self.target(&inner.expression),
            other => self.expr(other),
        }
    }

    pub(crate) fn expr(&mut self, expression: &Expression<'_>) -> Expr {
        let span = expression.span();
        let kind = match expression {
            Expression::Parenthesized(inner) => return self.expr(&inner.expression),
            Expression::Variable(variable) => return self.variable_at(variable.span()),
            Expression::Literal(literal) => {
                let text = self.text(span);
                let value = match literal {
                    Literal::True(_) => Ok(tree::Literal::Bool(true)),
                    Literal::False(_) => Ok(tree::Literal::Bool(false)),
                    Literal::Null(_) => Ok(tree::Literal::Null),
                    Literal::Integer(_) => match parse_integer(text) {
                        Ok(Some(value)) => Ok(tree::Literal::Int(value)),
                        Ok(None) => parse_float(text).map(tree::Literal::Float),
                        Err(error) => Err(error),
                    },
                    Literal::Float(_) => parse_float(text).map(tree::Literal::Float),
                    Literal::String(_) => unescape_string(text).map(tree::Literal::String),
                    #[allow(unreachable_patterns)]
                    _ => return Expr::new(self.other_expression(span), span),
                };
                match value {
                    Ok(value) => ExprKind::Literal(value),
                    Err(error) => ExprKind::Unsupported(error.to_string()),
                }
            }
            Expression::Binary(binary) => self.binary(&binary.lhs, &binary.rhs),
            Expression::UnaryPrefix(unary) => {
                let operand = &unary.operand;
                let operator = self.slice(span.start.offset, operand.span().start.offset).trim();
                match operator {
                    "&" => return self.expr(operand),
                    "++" | "--" => ExprKind::IncDec {
                        increment: operator == "++",
                        prefix: true,
                        target: Box::new(self.expr(operand)),
                    },
                    "!" => self.unary(UnaryOp::Not, operand),
                    "-" => self.unary(UnaryOp::Minus, operand),
                    "+" => self.unary(UnaryOp::Plus, operand),
                    "~" => self.unary(UnaryOp::BitNot, operand),
                    "@" => self.unary(UnaryOp::Silence, operand),
                    _ => match CastKind::from_token(operator) {
                        Some(kind) => ExprKind::Cast { kind, operand: Box::new(self.expr(operand)) },
                        None => ExprKind::Unsupported(format!("prefix operator `{}`", operator)),
                    },
                }
            }
            Expression::UnaryPostfix(unary) => {
                let operator = self.slice(unary.operand.span().end.offset, span.end.offset).trim();
                ExprKind::IncDec {
                    increment: operator == "++",
                    prefix: false,
                    target: Box::new(self.expr(&unary.operand)),
                }
            }
            Expression::Assignment(assignment) => self.assignment(&assignment.lhs, &assignment.rhs),
            Expression::Conditional(conditional) => ExprKind::Conditional {
                condition: Box::new(self.expr(&conditional.condition)),
                then: conditional.then.as_ref().map(|then| Box::new(self.expr(then))),
                otherwise: Box::new(self.expr(&conditional.r#else)),
            },
            Expression::Array(array) => ExprKind::Array(self.elements(array.elements.iter(), false).into_iter().flatten().collect()),
            Expression::LegacyArray(array) => {
                ExprKind::Array(self.elements(array.elements.iter(), false).into_iter().flatten().collect())
            }
            Expression::List(list) => ExprKind::List(self.elements(list.elements.iter(), true)),
            Expression::ArrayAccess(access) => ExprKind::ArrayItem {
                array: Box::new(self.expr(&access.array)),
                index: Some(Box::new(self.expr(&access.index))),
            },
            Expression::ArrayAppend(append) => ExprKind::ArrayItem { array: Box::new(self.expr(&append.array)), index: None },
            Expression::Access(access) => match access {
                Access::Property(access) => ExprKind::Property {
                    object: Box::new(self.expr(&access.object)),
                    name: self.member_name(&access.property),
                    nullsafe: false,
                },
                Access::NullSafeProperty(access) => ExprKind::Property {
                    object: Box::new(self.expr(&access.object)),
                    name: self.member_name(&access.property),
                    nullsafe: true,
                },
                Access::StaticProperty(access) => ExprKind::StaticProperty {
                    class: self.type_ref(&access.class),
                    name: self.static_member(access.property.span()),
                },
                Access::ClassConstant(access) => ExprKind::ClassConstFetch {
                    class: self.type_ref(&access.class),
                    name: self.text(access.constant.span()).trim().to_string(),
                },
                #[allow(unreachable_patterns)]
                _ => self.other_expression(span),
            },
            Expression::Call(call) => match call {
                Call::Function(call) => {
                    let target = match &call.function {
                        Expression::Identifier(identifier) => {
                            let name = self.text(identifier.span());
                            if name.eq_ignore_ascii_case("exit") || name.eq_ignore_ascii_case("die") {
                                let status = self.exit_status(call.argument_list.arguments.iter());
                                return Expr::new(ExprKind::Exit(status), span);
                            }
                            CallTarget::Named(Name::new(name, identifier.span()))
                        }
                        other => CallTarget::Dynamic(Box::new(self.expr(other))),
                    };
                    let args = self.arguments(call.argument_list.arguments.iter());
                    ExprKind::Call { target, args }
                }
                Call::Method(call) => ExprKind::MethodCall {
                    object: Box::new(self.expr(&call.object)),
                    method: self.member_name(&call.method),
                    args: self.arguments(call.argument_list.arguments.iter()),
                    nullsafe: false,
                },
                Call::NullSafeMethod(call) => ExprKind::MethodCall {
                    object: Box::new(self.expr(&call.object)),
                    method: self.member_name(&call.method),
                    args: self.arguments(call.argument_list.arguments.iter()),
                    nullsafe: true,
                },
                Call::StaticMethod(call) => ExprKind::StaticCall {
                    class: self.type_ref(&call.class),
                    method: self.member_name(&call.method),
                    args: self.arguments(call.argument_list.arguments.iter()),
                },
                #[allow(unreachable_patterns)]
                _ => self.other_expression(span),
            },
            Expression::Instantiation(new) => {
                let class = self.type_ref(&new.class);
                let args = match &new.argument_list {
                    Some(list) => self.arguments(list.arguments.iter()),
                    None => Vec::new(),
                };
                ExprKind::New { class, args }
            }
            Expression::Construct(construct) => match construct {
                Construct::Isset(isset) => ExprKind::Isset(isset.values.iter().map(|value| self.expr(value)).collect()),
                Construct::Empty(empty) => ExprKind::Empty(Box::new(self.expr(&empty.value))),
                Construct::Include(include) => self.include(IncludeKind::Include, &include.value),
                Construct::IncludeOnce(include) => self.include(IncludeKind::IncludeOnce, &include.value),
                Construct::Require(require) => self.include(IncludeKind::Require, &require.value),
                Construct::RequireOnce(require) => self.include(IncludeKind::RequireOnce, &require.value),
                Construct::Print(print) => self.unary(UnaryOp::Print, &print.value),
                Construct::Exit(exit) => {
                    ExprKind::Exit(self.exit_status(exit.arguments.iter().flat_map(|list| list.arguments.iter())))
                }
                Construct::Die(die) => {
                    ExprKind::Exit(self.exit_status(die.arguments.iter().flat_map(|list| list.arguments.iter())))
                }
                #[allow(unreachable_patterns)]
                _ => self.other_expression(span),
            },
            Expression::Throw(throw) => ExprKind::Throw(Box::new(self.expr(&throw.exception))),
            Expression::Clone(clone) => self.unary(UnaryOp::Clone, &clone.object),
            Expression::MagicConstant(_) => match PseudoConstKind::from_name(self.text(span).trim()) {
                Some(kind) => ExprKind::PseudoConst(kind),
                None => self.other_expression(span),
            },
            Expression::ConstantAccess(access) => {
                ExprKind::ConstFetch(Name::new(self.text(access.name.span()), access.name.span()))
            }
            Expression::Identifier(identifier) => {
                ExprKind::ConstFetch(Name::new(self.text(identifier.span()), identifier.span()))
            }
            Expression::Closure(closure) => {
                let name = self.closure_name();
                let parameters: Vec<_> = closure
                    .parameter_list
                    .parameters
                    .iter()
                    .map(|p| (p.span(), p.variable.span()))
                    .collect();
                let (parameters, _) = self.parameters(&parameters);
                let uses: Vec<ClosureUse> = match &closure.use_clause {
                    Some(clause) => clause
                        .variables
                        .iter()
                        .map(|captured| {
                            let variable = captured.variable.span();
                            ClosureUse {
                                name: self.text(variable).trim_start_matches('$').to_string(),
                                by_ref: self.text(captured.span()).trim_start().starts_with('&'),
                                span: variable,
                            }
                        })
                        .collect(),
                    None => Vec::new(),
                };
                let body = self.statements(closure.body.statements.iter());
                self.routines.push(Routine {
                    name: name.clone(),
                    kind: RoutineKind::Closure { class: self.class.clone() },
                    parameters,
                    uses: uses.clone(),
                    body,
                    span,
                });
                ExprKind::Closure { routine: name, uses, is_arrow: false }
            }
            Expression::ArrowFunction(arrow) => {
                let name = self.closure_name();
                let parameters: Vec<_> = arrow
                    .parameter_list
                    .parameters
                    .iter()
                    .map(|p| (p.span(), p.variable.span()))
                    .collect();
                let (parameters, _) = self.parameters(&parameters);
                let value = self.expr(&arrow.expression);
                let value_span = value.span;
                self.routines.push(Routine {
                    name: name.clone(),
                    kind: RoutineKind::ArrowFunction { class: self.class.clone() },
                    parameters,
                    uses: Vec::new(),
                    body: vec![Stmt::new(StmtKind::Return(Some(value)), value_span)],
                    span,
                });
                ExprKind::Closure { routine: name, uses: Vec::new(), is_arrow: true }
            }
            _ => self.other_expression(span),
        };
        Expr::new(kind, span)
    }

    /// Expressions recognized by their source text: interpolated strings,
    /// anonymous classes and `self`/`static`/`parent` keywords.
    fn other_expression(&mut self, span: Span) -> ExprKind {
        let text = self.text(span).trim();
        if text.starts_with('"') || text.starts_with("<<<") || text.starts_with("b\"") {
            return ExprKind::Interpolated(self.interpolated_variables(span));
        }
        if starts_with_word(text, "new") {
            return ExprKind::New {
                class: TypeRef::Named(Name::new("class@anonymous", span)),
                args: Vec::new(),
            };
        }

        let word: String = text.chars().take_while(|c| c.is_alphanumeric() || *c == '_').collect();
        if word.is_empty() {
            ExprKind::Unsupported("expression".to_string())
        } else {
            ExprKind::Unsupported(format!("`{}` expression", word.to_ascii_lowercase()))
        }
    }

    /// Simple `$name` references inside an interpolated string or heredoc.
    fn interpolated_variables(&self, span: Span) -> Vec<Expr> {
        let text = self.text(span);
        let bytes = text.as_bytes();
        let mut variables = Vec::new();
        let mut i = 0;

        while i < bytes.len() {
            let escaped = i > 0 && bytes[i - 1] == b'\\';
            if bytes[i] == b'$' && !escaped {
                let start = i + 1;
                let mut end = start;
                while end < bytes.len() && (bytes[end].is_ascii_alphanumeric() || bytes[end] == b'_' || bytes[end] >= 0x80) {
                    end += 1;
                }
                let leading_digit = bytes.get(start).is_some_and(|b| b.is_ascii_digit());
                if end > start && !leading_digit {
                    let base = span.start.offset;
                    let variable_span = self.span_at(base + i as u32, base + end as u32);
                    variables.push(Expr::new(
                        ExprKind::Variable(VariableName::Direct(text[start..end].to_string())),
                        variable_span,
                    ));
                }
                i = end.max(i + 1);
            } else {
                i += 1;
            }
        }

        variables
    }

    /// A variable by its source text: `$name`, `$$name` or `${expr}`.
    fn variable_at(&mut self, span: Span) -> Expr {
        let text = self.text(span).trim();
        let name = if text.starts_with("$$") {
            let inner_span = self.span_at(span.start.offset + 1, span.end.offset);
            let inner = self.variable_at(inner_span);
            VariableName::Indirect(Box::new(inner))
        } else if text.starts_with("${") {
            VariableName::Indirect(Box::new(Expr::new(
                ExprKind::Unsupported("variable variable expression".to_string()),
                span,
            )))
        } else {
            VariableName::Direct(text.trim_start_matches('$').to_string())
        };
        Expr::new(ExprKind::Variable(name), span)
    }

    fn unary(&mut self, op: UnaryOp, operand: &Expression<'_>) -> ExprKind {
        ExprKind::Unary { op, operand: Box::new(self.expr(operand)) }
    }

    fn include(&mut self, kind: IncludeKind, target: &Expression<'_>) -> ExprKind {
        ExprKind::Include { kind, target: Box::new(self.expr(target)) }
    }

    fn binary(&mut self, lhs: &Expression<'_>, rhs: &Expression<'_>) -> ExprKind {
        let operator = self.slice(lhs.span().end.offset, rhs.span().start.offset).trim();
        if operator.eq_ignore_ascii_case("instanceof") {
            return ExprKind::InstanceOf { operand: Box::new(self.expr(lhs)), class: self.type_ref(rhs) };
        }
        match BinaryOp::from_symbol(operator) {
            Some(op) => ExprKind::Binary { op, left: Box::new(self.expr(lhs)), right: Box::new(self.expr(rhs)) },
            None => ExprKind::Unsupported(format!("binary operator `{}`", operator)),
        }
    }

    fn assignment(&mut self, lhs: &Expression<'_>, rhs: &Expression<'_>) -> ExprKind {
        let operator = self.slice(lhs.span().end.offset, rhs.span().start.offset).trim();
        let by_ref = match operator.strip_prefix('=').map(str::trim) {
            Some("") => self.text(rhs.span()).trim_start().starts_with('&'),
            Some("&") => true,
            _ => {
                return match BinaryOp::from_compound_symbol(operator) {
                    Some(op) => ExprKind::CompoundAssign {
                        op,
                        target: Box::new(self.expr(lhs)),
                        value: Box::new(self.expr(rhs)),
                    },
                    None => ExprKind::Unsupported(format!("assignment operator `{}`", operator)),
                };
            }
        };
        ExprKind::Assign { target: Box::new(self.target(lhs)), value: Box::new(self.expr(rhs)), by_ref }
    }

    fn elements<'x, 'a: 'x>(
        &mut self,
        elements: impl IntoIterator<Item = &'x ArrayElement<'a>>,
        destructuring: bool,
    ) -> Vec<Option<ArrayItem>> {
        let mut items = Vec::new();
        for element in elements {
            let item = match element {
                ArrayElement::KeyValue(pair) => {
                    let key = self.expr(&pair.key);
                    Some(self.array_item(Some(key), &pair.value, false, destructuring))
                }
                ArrayElement::Value(entry) => Some(self.array_item(None, &entry.value, false, destructuring)),
                ArrayElement::Variadic(entry) => Some(self.array_item(None, &entry.value, true, destructuring)),
                ArrayElement::Missing(_) => None,
            };
            items.push(item);
        }
        items
    }

    fn array_item(&mut self, key: Option<Expr>, value: &Expression<'_>, spread: bool, destructuring: bool) -> ArrayItem {
        let by_ref = self.text(value.span()).trim_start().starts_with('&');
        let value = if destructuring { self.target(value) } else { self.expr(value) };
        ArrayItem { key, value, by_ref, spread }
    }

    fn arguments<'x, 'a: 'x>(&mut self, arguments: impl IntoIterator<Item = &'x Argument<'a>>) -> Vec<tree::Argument> {
        let mut lowered = Vec::new();
        for argument in arguments {
            let text = self.text(argument.span()).trim_start();
            let unpack = text.starts_with("...");
            let name = named_argument(text);
            let value = self.expr(argument.value());
            lowered.push(tree::Argument { value, unpack, name });
        }
        lowered
    }

    fn member_name(&mut self, selector: &ClassLikeMemberSelector<'_>) -> MemberName {
        match selector {
            ClassLikeMemberSelector::Identifier(identifier) => {
                MemberName::Direct(self.text(identifier.span).to_string())
            }
            other => {
                let span = other.span();
                let text = self.text(span).trim();
                if text.starts_with('$') {
                    MemberName::Indirect(Box::new(self.variable_at(span)))
                } else {
                    MemberName::Indirect(Box::new(Expr::new(
                        ExprKind::Unsupported("dynamic member name".to_string()),
                        span,
                    )))
                }
            }
        }
    }

    /// `Foo::$bar` names its property directly; `Foo::$$bar` indirectly.
    fn static_member(&mut self, span: Span) -> MemberName {
        let text = self.text(span).trim();
        if text.starts_with("$$") || text.starts_with("${") {
            let inner_span = self.span_at(span.start.offset + 1, span.end.offset);
            MemberName::Indirect(Box::new(self.variable_at(inner_span)))
        } else {
            MemberName::Direct(text.trim_start_matches('$').to_string())
        }
    }

    fn type_ref(&mut self, class: &Expression<'_>) -> TypeRef {
        let span = class.span();
        let text = self.text(span).trim();
        match text.to_ascii_lowercase().as_str() {
            "self" => return TypeRef::SelfType,
            "static" => return TypeRef::Static,
            "parent" => return TypeRef::Parent,
            _ => {}
        }
        match class {
            Expression::Identifier(_) => TypeRef::Named(Name::new(self.names.resolve_class(text), span)),
            other => TypeRef::Indirect(Box::new(self.expr(other))),
        }
    }
}

fn starts_with_word(text: &str, word: &str) -> bool {
    let Some(head) = text.get(..word.len()) else {
        return false;
    };
    head.eq_ignore_ascii_case(word)
        && !text[word.len()..].starts_with(|c: char| c.is_alphanumeric() || c == '_')
}

/// Names an unmapped statement by its leading word.
fn unsupported_statement(text: &str) -> String {
    let word: String = text
        .trim_start()
        .chars()
        .take_while(|c| c.is_alphanumeric() || *c == '_')
        .collect();
    if word.is_empty() {
        "statement".to_string()
    } else {
        format!("statement `{}`", word)
    }
}

fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    matches!(chars.next(), Some(c) if c.is_alphabetic() || c == '_')
        && chars.all(|c| c.is_alphanumeric() || c == '_')
}

/// Parameter name of a named argument (`name: value`).
fn named_argument(text: &str) -> Option<String> {
    let name: String = text.chars().take_while(|c| c.is_alphanumeric() || *c == '_').collect();
    if name.is_empty() || !is_identifier(&name) {
        return None;
    }
    let rest = text[name.len()..].trim_start();
    (rest.starts_with(':') && !rest.starts_with("::")).then_some(name)
}

/// The parent named by an `extends` clause in a class header.
fn extends_clause(header: &str) -> Option<&str> {
    let mut words = header.split_whitespace();
    while let Some(word) = words.next() {
        if word.eq_ignore_ascii_case("extends") {
            return words.next().map(|parent| parent.trim_end_matches(','));
        }
    }
    None
}

/// Property names of a property declaration (`public int $a = 1, $b;`).
fn declared_properties(text: &str) -> Vec<String> {
    let declaration = text.split(['{', ';']).next().unwrap_or(text);
    declaration
        .split(',')
        .filter_map(|part| {
            let part = part.split('=').next().unwrap_or(part);
            let (_, name) = part.split_once('$')?;
            let name: String = name.chars().take_while(|c| c.is_alphanumeric() || *c == '_').collect();
            (!name.is_empty()).then_some(name)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named_argument() {
        assert_eq!(named_argument("name: $value"), Some("name".to_string()));
        assert_eq!(named_argument("Foo::BAR"), None);
        assert_eq!(named_argument("$value"), None);
        assert_eq!(named_argument("...$rest"), None);
    }

    #[test]
    fn test_extends_clause() {
        assert_eq!(extends_clause(" Foo extends Bar implements Baz "), Some("Bar"));
        assert_eq!(extends_clause(" Foo implements Baz"), None);
    }

    #[test]
    fn test_declared_properties() {
        assert_eq!(declared_properties("public int $a = 1, $b;"), vec!["a", "b"]);
        assert_eq!(declared_properties("private ?Foo $foo { get => $this->x; }"), vec!["foo"]);
    }

    #[test]
    fn test_starts_with_word() {
        assert!(starts_with_word("new Foo()", "new"));
        assert!(!starts_with_word("newFoo()", "new"));
    }

    #[test]
    fn test_unsupported_statement_description() {
        assert_eq!(unsupported_statement("  foo bar;"), "statement `foo`");
        assert_eq!(unsupported_statement(""), "statement");
    }
}
