//! Binder: syntax nodes to bound nodes
//!
//! The binder translates one expression or simple statement at a time,
//! choosing the access descriptor of every sub-expression from the way its
//! parent uses it. Names are resolved through a [`SymbolResolver`]; an
//! unresolved name leaves an empty handle on the bound node.
//!
//! Control statements are never seen here. The graph builder walks them and
//! asks the binder only for their conditions, values and simple statements.

use mago_span::Span;

use crate::access::AccessDescriptor;
use crate::ast::{
    Argument, ArrayItem, BinaryOp, CallTarget, CastKind, ClosureUse, Expr, ExprKind, Literal, MemberName, Stmt,
    StmtKind, TypeRef, VariableName,
};
use crate::bound::{
    BoundArgument, BoundArrayEx, BoundArrayItem, BoundArrayItemRef, BoundAssign, BoundBinaryEx, BoundCast,
    BoundClassConst, BoundCompoundAssign, BoundConditional, BoundExpr, BoundExprKind, BoundFieldRef,
    BoundGlobalConst, BoundIncDec, BoundInstanceOf, BoundIsSet, BoundLambda, BoundListEx, BoundListItem,
    BoundLiteral, BoundMemberName, BoundPseudoConst, BoundRoutineCall, BoundStaticVar, BoundStmt,
    BoundStmtKind, BoundTypeDecl, BoundTypeRef, BoundUnaryEx, BoundVariableName, BoundVariableRef, CallKind,
    CallName, ConstValue,
};
use crate::diagnostic::{self, Diagnostic};
use crate::symbols::{SymbolResolver, TypeHandle};
use crate::types::TypeMask;

/// Builtin functions taking arguments by reference, with the by-ref positions.
const BY_REF_BUILTINS: &[(&str, &[usize])] = &[
    ("sort", &[0]),
    ("rsort", &[0]),
    ("usort", &[0]),
    ("uasort", &[0]),
    ("uksort", &[0]),
    ("ksort", &[0]),
    ("krsort", &[0]),
    ("asort", &[0]),
    ("arsort", &[0]),
    ("natsort", &[0]),
    ("natcasesort", &[0]),
    ("shuffle", &[0]),
    ("array_multisort", &[0]),
    ("array_push", &[0]),
    ("array_pop", &[0]),
    ("array_shift", &[0]),
    ("array_unshift", &[0]),
    ("array_splice", &[0]),
    ("array_walk", &[0]),
    ("array_walk_recursive", &[0]),
    ("end", &[0]),
    ("reset", &[0]),
    ("next", &[0]),
    ("prev", &[0]),
    ("settype", &[0]),
    ("preg_match", &[2]),
    ("preg_match_all", &[2]),
    ("preg_replace", &[4]),
    ("preg_replace_callback", &[4]),
    ("str_replace", &[3]),
    ("str_ireplace", &[3]),
    ("parse_str", &[1]),
    ("exec", &[1, 2]),
    ("similar_text", &[2]),
    ("openssl_sign", &[1]),
];

fn by_ref_positions(function: &str) -> &'static [usize] {
    let name = function.trim_start_matches('\\');
    let name = name.rsplit('\\').next().unwrap_or(name);
    BY_REF_BUILTINS
        .iter()
        .find(|(builtin, _)| builtin.eq_ignore_ascii_case(name))
        .map(|(_, positions)| *positions)
        .unwrap_or(&[])
}

/// Values of constants that never change between PHP builds we target.
fn well_known_constant(name: &str) -> Option<ConstValue> {
    let name = name.trim_start_matches('\\');
    let value = match name.to_ascii_uppercase().as_str() {
        "TRUE" => ConstValue::Bool(true),
        "FALSE" => ConstValue::Bool(false),
        "NULL" => ConstValue::Null,
        _ => match name {
            "PHP_EOL" => ConstValue::String("\n".to_string()),
            "PHP_INT_MAX" => ConstValue::Int(i64::MAX),
            "PHP_INT_MIN" => ConstValue::Int(i64::MIN),
            "PHP_INT_SIZE" => ConstValue::Int(8),
            "PHP_FLOAT_EPSILON" => ConstValue::Float(f64::EPSILON),
            "M_PI" => ConstValue::Float(std::f64::consts::PI),
            "E_ALL" => ConstValue::Int(32767),
            "DIRECTORY_SEPARATOR" => ConstValue::String("/".to_string()),
            _ => return None,
        },
    };
    Some(value)
}

fn literal_value(literal: &Literal) -> ConstValue {
    match literal {
        Literal::Null => ConstValue::Null,
        Literal::Bool(b) => ConstValue::Bool(*b),
        Literal::Int(i) => ConstValue::Int(*i),
        Literal::Float(f) => ConstValue::Float(*f),
        Literal::String(s) => ConstValue::String(s.clone()),
    }
}

/// Access of the base of a member or element access, derived from the access
/// of the whole expression.
fn container_access(access: AccessDescriptor, ensure: fn(AccessDescriptor) -> AccessDescriptor) -> AccessDescriptor {
    if access.is_mutating() {
        ensure(AccessDescriptor::READ)
    } else if access.is_quiet() {
        AccessDescriptor::READ_QUIET
    } else {
        AccessDescriptor::READ
    }
}

fn write_access(by_ref: bool, mask: TypeMask) -> AccessDescriptor {
    if by_ref {
        AccessDescriptor::NONE.with_write_ref(mask)
    } else {
        AccessDescriptor::NONE.with_write(mask)
    }
}

/// Binds expressions and simple statements of one routine.
pub struct Binder<'r> {
    resolver: &'r dyn SymbolResolver,
    self_name: Option<String>,
    self_type: Option<TypeHandle>,
    diagnostics: Vec<Diagnostic>,
}

impl<'r> Binder<'r> {
    pub fn new(resolver: &'r dyn SymbolResolver) -> Self {
        Self {
            resolver,
            self_name: None,
            self_type: None,
            diagnostics: Vec::new(),
        }
    }

    /// Set the class whose `self` and `$this` are in scope.
    pub fn with_class(mut self, class_name: Option<&str>) -> Self {
        self.self_type = class_name.and_then(|name| self.resolver.resolve_type(name));
        self.self_name = class_name.map(str::to_string);
        self
    }

    pub fn resolver(&self) -> &'r dyn SymbolResolver {
        self.resolver
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }

    pub fn resolve_type_name(&self, name: &str) -> Option<TypeHandle> {
        self.resolver.resolve_type(name)
    }

    /// Bind a branch or loop condition.
    pub fn bind_condition(&mut self, expr: &Expr) -> BoundExpr {
        self.bind_expr(expr, AccessDescriptor::READ)
    }

    /// Bind a storage location that receives a value (`foreach` keys and values, catch variables).
    pub fn bind_target(&mut self, expr: &Expr, by_ref: bool) -> BoundExpr {
        self.bind_expr(expr, write_access(by_ref, TypeMask::ANY))
    }

    /// Bind a simple statement.
    ///
    /// # Panics
    ///
    /// Panics on a control statement; those are lowered by the graph builder.
    pub fn bind_statement(&mut self, stmt: &Stmt) -> BoundStmt {
        let kind = match &stmt.kind {
            StmtKind::Expr(expr) => BoundStmtKind::Expression(self.bind_expr(expr, AccessDescriptor::NONE)),
            StmtKind::Echo(values) => {
                let arguments = values.iter().map(|v| self.bind_argument_value(v)).collect();
                BoundStmtKind::Expression(BoundExpr::new(
                    BoundExprKind::Call(BoundRoutineCall::new(CallKind::Echo, arguments)),
                    AccessDescriptor::NONE,
                    stmt.span,
                ))
            }
            StmtKind::InlineHtml(text) => {
                let value = BoundExpr::literal(Some(ConstValue::String(text.clone())), stmt.span);
                let arguments = vec![BoundArgument::new(value, false, None)];
                BoundStmtKind::Expression(BoundExpr::new(
                    BoundExprKind::Call(BoundRoutineCall::new(CallKind::Echo, arguments)),
                    AccessDescriptor::NONE,
                    stmt.span,
                ))
            }
            StmtKind::Return(value) => {
                BoundStmtKind::Return(value.as_ref().map(|v| self.bind_expr(v, AccessDescriptor::READ)))
            }
            StmtKind::Throw(value) => BoundStmtKind::Throw(self.bind_expr(value, AccessDescriptor::READ)),
            StmtKind::Unset(targets) => BoundStmtKind::Unset(
                targets
                    .iter()
                    .map(|t| self.bind_expr(t, AccessDescriptor::UNSET))
                    .collect(),
            ),
            StmtKind::Global(variables) => BoundStmtKind::Global(
                variables
                    .iter()
                    .map(|v| self.bind_expr(v, write_access(true, TypeMask::ANY)))
                    .collect(),
            ),
            StmtKind::Static(variables) => BoundStmtKind::StaticDecl(
                variables
                    .iter()
                    .map(|var| BoundStaticVar {
                        variable: self.bind_expr(&var.variable, write_access(true, TypeMask::ANY)),
                        initializer: var
                            .initializer
                            .as_ref()
                            .map(|init| self.bind_expr(init, AccessDescriptor::READ)),
                    })
                    .collect(),
            ),
            StmtKind::FunctionDecl(name) => BoundStmtKind::FunctionDecl(name.value.clone()),
            StmtKind::ClassDecl { name, parent } => BoundStmtKind::TypeDecl(BoundTypeDecl {
                name: name.value.clone(),
                parent: parent.as_ref().map(|p| self.bind_type_ref(&TypeRef::Named(p.clone()))),
            }),
            StmtKind::Noop => BoundStmtKind::Empty,
            StmtKind::Unsupported(description) => {
                self.unsupported(description, stmt.span);
                BoundStmtKind::Empty
            }
            StmtKind::Block(_)
            | StmtKind::If(_)
            | StmtKind::While { .. }
            | StmtKind::DoWhile { .. }
            | StmtKind::For { .. }
            | StmtKind::Foreach { .. }
            | StmtKind::Switch { .. }
            | StmtKind::Try { .. }
            | StmtKind::Break(_)
            | StmtKind::Continue(_)
            | StmtKind::Goto(_)
            | StmtKind::Label(_) => {
                panic!("control statement at offset {} reached the binder", stmt.span.start.offset)
            }
        };

        BoundStmt::new(kind, stmt.span)
    }

    /// Bind an expression used with `access`.
    pub fn bind_expr(&mut self, expr: &Expr, access: AccessDescriptor) -> BoundExpr {
        let span = expr.span;
        let kind = match &expr.kind {
            ExprKind::Literal(literal) => BoundExprKind::Literal(BoundLiteral::new(Some(literal_value(literal)))),
            ExprKind::Variable(name) => BoundExprKind::Variable(self.bind_variable(name)),
            ExprKind::ArrayItem { array, index } => {
                if index.is_none() && !access.is_mutating() && !access.is_unset() {
                    self.diagnostics.push(Diagnostic::error(
                        diagnostic::ARRAY_APPEND_READ,
                        "Cannot use [] for reading",
                        span,
                    ));
                }
                let array_access = container_access(access, AccessDescriptor::with_ensure_array);
                BoundExprKind::ArrayItem(BoundArrayItemRef {
                    array: Box::new(self.bind_expr(array, array_access)),
                    index: index
                        .as_ref()
                        .map(|i| Box::new(self.bind_expr(i, AccessDescriptor::READ))),
                })
            }
            ExprKind::Property { object, name, nullsafe } => {
                let object_access = container_access(access, AccessDescriptor::with_ensure_object);
                let instance = self.bind_expr(object, object_access);
                let handle = match (instance.variable_name(), name.direct(), self.self_type) {
                    (Some("this"), Some(field), Some(owner)) => self.resolver.resolve_field(owner, field),
                    _ => None,
                };
                BoundExprKind::Field(BoundFieldRef {
                    instance: Some(Box::new(instance)),
                    class: None,
                    name: self.bind_member_name(name),
                    handle,
                    nullsafe: *nullsafe,
                })
            }
            ExprKind::StaticProperty { class, name } => {
                let class = self.bind_type_ref(class);
                let handle = match (class.handle(), name.direct()) {
                    (Some(owner), Some(field)) => self.resolver.resolve_field(owner, field),
                    _ => None,
                };
                BoundExprKind::Field(BoundFieldRef {
                    instance: None,
                    class: Some(class),
                    name: self.bind_member_name(name),
                    handle,
                    nullsafe: false,
                })
            }
            ExprKind::Call { target, args } => match target {
                CallTarget::Named(name) => {
                    let by_ref = by_ref_positions(&name.value);
                    let arguments = self.bind_arguments(args, by_ref);
                    BoundExprKind::Call(BoundRoutineCall::new(
                        CallKind::Function { name: CallName::Named(name.value.clone()) },
                        arguments,
                    ))
                }
                CallTarget::Dynamic(callee) => {
                    let callee = self.bind_expr(callee, AccessDescriptor::READ);
                    let arguments = self.bind_arguments(args, &[]);
                    BoundExprKind::Call(
                        BoundRoutineCall::new(CallKind::Function { name: CallName::Indirect }, arguments)
                            .with_name_expr(callee),
                    )
                }
            },
            ExprKind::MethodCall { object, method, args, nullsafe } => {
                let instance = self.bind_expr(object, AccessDescriptor::READ);
                let (name, name_expr) = self.bind_call_name(method);
                let arguments = self.bind_arguments(args, &[]);
                let mut call = BoundRoutineCall::new(
                    CallKind::InstanceMethod { name, nullsafe: *nullsafe },
                    arguments,
                )
                .with_instance(instance);
                if let Some(name_expr) = name_expr {
                    call = call.with_name_expr(name_expr);
                }
                BoundExprKind::Call(call)
            }
            ExprKind::StaticCall { class, method, args } => {
                let class = self.bind_type_ref(class);
                let (name, name_expr) = self.bind_call_name(method);
                let arguments = self.bind_arguments(args, &[]);
                let mut call = BoundRoutineCall::new(CallKind::StaticMethod { name }, arguments).with_class(class);
                if let Some(name_expr) = name_expr {
                    call = call.with_name_expr(name_expr);
                }
                BoundExprKind::Call(call)
            }
            ExprKind::New { class, args } => {
                let class = self.bind_type_ref(class);
                let arguments = self.bind_arguments(args, &[]);
                BoundExprKind::Call(BoundRoutineCall::new(CallKind::New, arguments).with_class(class))
            }
            ExprKind::Binary { op, left, right } => {
                let left_access = if *op == BinaryOp::Coalesce {
                    AccessDescriptor::READ_QUIET
                } else {
                    AccessDescriptor::READ
                };
                BoundExprKind::Binary(BoundBinaryEx {
                    op: *op,
                    left: Box::new(self.bind_expr(left, left_access)),
                    right: Box::new(self.bind_expr(right, AccessDescriptor::READ)),
                })
            }
            ExprKind::Unary { op, operand } => BoundExprKind::Unary(BoundUnaryEx {
                op: *op,
                operand: Box::new(self.bind_expr(operand, AccessDescriptor::READ)),
            }),
            ExprKind::IncDec { increment, prefix, target } => BoundExprKind::IncDec(BoundIncDec {
                target: Box::new(self.bind_expr(
                    target,
                    AccessDescriptor::READ_AND_WRITE.with_write(TypeMask::INT | TypeMask::FLOAT),
                )),
                increment: *increment,
                prefix: *prefix,
            }),
            ExprKind::Assign { target, value, by_ref } => {
                if *by_ref {
                    let value_access = if value.is_reference() {
                        AccessDescriptor::READ_REF
                    } else {
                        AccessDescriptor::READ
                    };
                    BoundExprKind::Assign(BoundAssign {
                        target: Box::new(self.bind_expr(target, write_access(true, TypeMask::ANY))),
                        value: Box::new(self.bind_expr(value, value_access)),
                        by_ref: true,
                    })
                } else {
                    let bound_value = self.bind_expr(value, AccessDescriptor::READ);
                    let mask = written_mask(&bound_value);
                    BoundExprKind::Assign(BoundAssign {
                        target: Box::new(self.bind_expr(target, write_access(false, mask))),
                        value: Box::new(bound_value),
                        by_ref: false,
                    })
                }
            }
            ExprKind::CompoundAssign { op, target, value } => {
                let target_access = match op {
                    BinaryOp::Coalesce => AccessDescriptor::READ_QUIET.with_write(TypeMask::ANY),
                    BinaryOp::Concat => AccessDescriptor::READ_AND_WRITE.with_write(TypeMask::STRING),
                    BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Pow => {
                        AccessDescriptor::READ_AND_WRITE.with_write(TypeMask::INT | TypeMask::FLOAT)
                    }
                    BinaryOp::Mod | BinaryOp::ShiftLeft | BinaryOp::ShiftRight => {
                        AccessDescriptor::READ_AND_WRITE.with_write(TypeMask::INT)
                    }
                    _ => AccessDescriptor::READ_AND_WRITE.with_write(TypeMask::ANY),
                };
                BoundExprKind::CompoundAssign(BoundCompoundAssign {
                    op: *op,
                    target: Box::new(self.bind_expr(target, target_access)),
                    value: Box::new(self.bind_expr(value, AccessDescriptor::READ)),
                })
            }
            ExprKind::List(items) => BoundExprKind::List(self.bind_list(items.iter().map(Option::as_ref))),
            ExprKind::Array(items) if access.is_write() => {
                // `[$a, $b] = ...` destructures like `list()`.
                BoundExprKind::List(self.bind_list(items.iter().map(Some)))
            }
            ExprKind::Array(items) => BoundExprKind::Array(BoundArrayEx {
                items: items.iter().map(|item| self.bind_array_item(item)).collect(),
            }),
            ExprKind::Conditional { condition, then, otherwise } => BoundExprKind::Conditional(BoundConditional {
                condition: Box::new(self.bind_expr(condition, AccessDescriptor::READ)),
                then: then
                    .as_ref()
                    .map(|t| Box::new(self.bind_expr(t, AccessDescriptor::READ))),
                otherwise: Box::new(self.bind_expr(otherwise, AccessDescriptor::READ)),
            }),
            ExprKind::InstanceOf { operand, class } => BoundExprKind::InstanceOf(BoundInstanceOf {
                operand: Box::new(self.bind_expr(operand, AccessDescriptor::READ)),
                type_ref: self.bind_type_ref(class),
            }),
            ExprKind::Isset(vars) => BoundExprKind::IsSet(BoundIsSet {
                vars: vars
                    .iter()
                    .map(|v| self.bind_expr(v, AccessDescriptor::READ_QUIET))
                    .collect(),
            }),
            ExprKind::Empty(operand) => {
                BoundExprKind::Empty(Box::new(self.bind_expr(operand, AccessDescriptor::READ_QUIET)))
            }
            ExprKind::Include { kind, target } => {
                let argument = self.bind_argument_value(target);
                BoundExprKind::Call(BoundRoutineCall::new(CallKind::Include(*kind), vec![argument]))
            }
            ExprKind::Exit(status) => {
                let arguments = status
                    .iter()
                    .map(|s| self.bind_argument_value(s))
                    .collect();
                BoundExprKind::Call(BoundRoutineCall::new(CallKind::Exit, arguments))
            }
            ExprKind::Throw(exception) => {
                BoundExprKind::Throw(Box::new(self.bind_expr(exception, AccessDescriptor::READ)))
            }
            ExprKind::ConstFetch(name) => match well_known_constant(&name.value) {
                Some(value @ (ConstValue::Bool(_) | ConstValue::Null)) => {
                    BoundExprKind::Literal(BoundLiteral::new(Some(value)))
                }
                value => BoundExprKind::GlobalConst(BoundGlobalConst {
                    name: name.unqualified().to_string(),
                    value,
                }),
            },
            ExprKind::ClassConstFetch { class, name } if name.eq_ignore_ascii_case("class") => {
                match self.class_name_of(class) {
                    Some(class_name) => BoundExprKind::Literal(BoundLiteral::new(Some(ConstValue::String(class_name)))),
                    None => BoundExprKind::ClassConst(BoundClassConst {
                        class: self.bind_type_ref(class),
                        name: name.clone(),
                    }),
                }
            }
            ExprKind::ClassConstFetch { class, name } => BoundExprKind::ClassConst(BoundClassConst {
                class: self.bind_type_ref(class),
                name: name.clone(),
            }),
            ExprKind::PseudoConst(kind) => BoundExprKind::PseudoConst(BoundPseudoConst { kind: *kind }),
            ExprKind::Cast { kind, operand } => BoundExprKind::Cast(BoundCast {
                kind: *kind,
                operand: Box::new(self.bind_expr(operand, AccessDescriptor::READ)),
            }),
            ExprKind::Closure { routine, uses, is_arrow } => BoundExprKind::Lambda(BoundLambda {
                routine: routine.clone(),
                uses: uses.iter().map(|u| self.bind_closure_use(u)).collect(),
                is_arrow: *is_arrow,
            }),
            ExprKind::Interpolated(parts) => {
                let arguments = parts.iter().map(|p| self.bind_argument_value(p)).collect();
                BoundExprKind::Call(BoundRoutineCall::new(CallKind::Concat, arguments))
            }
            ExprKind::Unsupported(description) => {
                self.unsupported(description, span);
                BoundExprKind::Unsupported(description.clone())
            }
        };

        BoundExpr::new(kind, access, span)
    }

    fn unsupported(&mut self, description: &str, span: Span) {
        self.diagnostics.push(Diagnostic::warning(
            diagnostic::UNSUPPORTED_SYNTAX,
            format!("Unsupported syntax: {}", description),
            span,
        ));
    }

    fn bind_variable(&mut self, name: &VariableName) -> BoundVariableRef {
        match name {
            VariableName::Direct(name) => BoundVariableRef {
                name: BoundVariableName::Direct(name.clone()),
                handle: self.resolver.resolve_local_or_parameter(name),
            },
            VariableName::Indirect(expr) => BoundVariableRef {
                name: BoundVariableName::Indirect(Box::new(self.bind_expr(expr, AccessDescriptor::READ))),
                handle: None,
            },
        }
    }

    fn bind_member_name(&mut self, name: &MemberName) -> BoundMemberName {
        match name {
            MemberName::Direct(name) => BoundMemberName::Direct(name.clone()),
            MemberName::Indirect(expr) => {
                BoundMemberName::Indirect(Box::new(self.bind_expr(expr, AccessDescriptor::READ)))
            }
        }
    }

    fn bind_call_name(&mut self, name: &MemberName) -> (CallName, Option<BoundExpr>) {
        match name {
            MemberName::Direct(name) => (CallName::Named(name.clone()), None),
            MemberName::Indirect(expr) => (CallName::Indirect, Some(self.bind_expr(expr, AccessDescriptor::READ))),
        }
    }

    pub fn bind_type_ref(&mut self, type_ref: &TypeRef) -> BoundTypeRef {
        match type_ref {
            TypeRef::Named(name) => BoundTypeRef::Direct {
                name: name.unqualified().to_string(),
                handle: self.resolver.resolve_type(&name.value),
            },
            TypeRef::SelfType => BoundTypeRef::SelfType { handle: self.self_type },
            TypeRef::Static => BoundTypeRef::Static,
            TypeRef::Parent => BoundTypeRef::Parent { handle: None },
            TypeRef::Indirect(expr) => BoundTypeRef::Indirect(Box::new(self.bind_expr(expr, AccessDescriptor::READ))),
        }
    }

    /// Compile-time name for `X::class`.
    fn class_name_of(&self, class: &TypeRef) -> Option<String> {
        match class {
            TypeRef::Named(name) => Some(name.unqualified().to_string()),
            TypeRef::SelfType => self.self_name.clone(),
            _ => None,
        }
    }

    fn bind_argument_value(&mut self, value: &Expr) -> BoundArgument {
        BoundArgument::new(self.bind_expr(value, AccessDescriptor::READ), false, None)
    }

    fn bind_arguments(&mut self, args: &[Argument], by_ref: &[usize]) -> Vec<BoundArgument> {
        args.iter()
            .enumerate()
            .map(|(position, arg)| {
                let aliased = arg.name.is_none() && by_ref.contains(&position) && arg.value.is_reference();
                let access = if aliased {
                    AccessDescriptor::READ_REF
                } else {
                    AccessDescriptor::READ
                };
                BoundArgument::new(self.bind_expr(&arg.value, access), arg.unpack, arg.name.clone())
            })
            .collect()
    }

    fn bind_array_item(&mut self, item: &ArrayItem) -> BoundArrayItem {
        let value_access = if item.by_ref && item.value.is_reference() {
            AccessDescriptor::READ_REF
        } else {
            AccessDescriptor::READ
        };
        BoundArrayItem {
            key: item.key.as_ref().map(|k| self.bind_expr(k, AccessDescriptor::READ)),
            value: self.bind_expr(&item.value, value_access),
            by_ref: item.by_ref,
            spread: item.spread,
        }
    }

    fn bind_list<'a>(&mut self, items: impl Iterator<Item = Option<&'a ArrayItem>>) -> BoundListEx {
        BoundListEx {
            items: items
                .map(|item| {
                    item.map(|item| BoundListItem {
                        key: item.key.as_ref().map(|k| self.bind_expr(k, AccessDescriptor::READ)),
                        target: self.bind_target(&item.value, item.by_ref),
                    })
                })
                .collect(),
        }
    }

    fn bind_closure_use(&mut self, captured: &ClosureUse) -> BoundExpr {
        let access = if captured.by_ref {
            AccessDescriptor::READ_REF
        } else {
            AccessDescriptor::READ
        };
        let variable = BoundVariableRef {
            name: BoundVariableName::Direct(captured.name.clone()),
            handle: self.resolver.resolve_local_or_parameter(&captured.name),
        };
        BoundExpr::new(BoundExprKind::Variable(variable), access, captured.span)
    }
}

/// Types an assignment can store, known from the bound value alone.
fn written_mask(value: &BoundExpr) -> TypeMask {
    if let Some(constant) = value.constant_value() {
        return TypeMask::of_value(&constant);
    }
    match &value.kind {
        BoundExprKind::Array(_) => TypeMask::ARRAY,
        BoundExprKind::Lambda(_) => TypeMask::OBJECT,
        BoundExprKind::Call(call) if call.kind == CallKind::New => TypeMask::OBJECT,
        BoundExprKind::Call(call) if call.kind == CallKind::Concat => TypeMask::STRING,
        BoundExprKind::Binary(binary) if binary.op == BinaryOp::Concat => TypeMask::STRING,
        BoundExprKind::IsSet(_) | BoundExprKind::Empty(_) | BoundExprKind::InstanceOf(_) => TypeMask::BOOL,
        BoundExprKind::Cast(cast) => match cast.kind {
            CastKind::Int => TypeMask::INT,
            CastKind::Float => TypeMask::FLOAT,
            CastKind::String => TypeMask::STRING,
            CastKind::Bool => TypeMask::BOOL,
            CastKind::Array => TypeMask::ARRAY,
            CastKind::Object => TypeMask::OBJECT,
            CastKind::Unset => TypeMask::NULL,
        },
        _ => TypeMask::ANY,
    }
}
