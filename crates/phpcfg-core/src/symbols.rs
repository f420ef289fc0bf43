//! Symbol resolution seam between the binder and the declaration tables
//!
//! The binder only ever asks three questions: which local or parameter a
//! name denotes, which type a qualified name denotes, and which field a
//! member name denotes on a type. Unresolved answers are normal; the bound
//! node simply keeps an empty handle.

use std::collections::HashMap;

use crate::ast::{ClosureUse, Expr, ExprKind, Routine, Stmt, StmtKind, VariableName};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VariableKind {
    Local,
    Parameter,
    This,
    Superglobal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VariableHandle {
    pub index: u32,
    pub kind: VariableKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeHandle(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldHandle {
    pub owner: TypeHandle,
    pub index: u32,
}

/// A routine a call may dispatch to, attached after overload resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RoutineHandle(pub u32);

/// Read-only symbol lookups used while binding.
///
/// Implementations are shared between threads binding different routines.
pub trait SymbolResolver: Sync {
    fn resolve_local_or_parameter(&self, name: &str) -> Option<VariableHandle>;

    fn resolve_type(&self, qualified_name: &str) -> Option<TypeHandle>;

    fn resolve_field(&self, instance_type: TypeHandle, name: &str) -> Option<FieldHandle>;
}

pub const SUPERGLOBALS: &[&str] = &[
    "GLOBALS", "_SERVER", "_GET", "_POST", "_FILES", "_COOKIE", "_SESSION", "_REQUEST", "_ENV",
];

/// Builtin class-likes known without any declaration in the analyzed code.
const BUILTIN_TYPES: &[(&str, Option<&str>)] = &[
    ("Throwable", None),
    ("Exception", Some("Throwable")),
    ("Error", Some("Throwable")),
    ("ErrorException", Some("Exception")),
    ("TypeError", Some("Error")),
    ("ValueError", Some("Error")),
    ("ArithmeticError", Some("Error")),
    ("DivisionByZeroError", Some("ArithmeticError")),
    ("ArgumentCountError", Some("TypeError")),
    ("LogicException", Some("Exception")),
    ("BadFunctionCallException", Some("LogicException")),
    ("BadMethodCallException", Some("BadFunctionCallException")),
    ("DomainException", Some("LogicException")),
    ("InvalidArgumentException", Some("LogicException")),
    ("LengthException", Some("LogicException")),
    ("OutOfRangeException", Some("LogicException")),
    ("RuntimeException", Some("Exception")),
    ("OutOfBoundsException", Some("RuntimeException")),
    ("OverflowException", Some("RuntimeException")),
    ("RangeException", Some("RuntimeException")),
    ("UnderflowException", Some("RuntimeException")),
    ("UnexpectedValueException", Some("RuntimeException")),
    ("JsonException", Some("Exception")),
    ("stdClass", None),
    ("Closure", None),
    ("Generator", None),
    ("ArrayObject", None),
    ("ArrayIterator", None),
    ("DateTime", None),
    ("DateTimeImmutable", None),
];

#[derive(Debug, Clone)]
struct TypeEntry {
    name: String,
    parent: Option<String>,
    fields: Vec<String>,
}

/// Declared class-likes and their properties, shared by every routine of a run.
#[derive(Debug, Clone, Default)]
pub struct TypeTable {
    types: Vec<TypeEntry>,
    by_name: HashMap<String, TypeHandle>,
}

fn type_key(name: &str) -> String {
    name.trim_start_matches('\\').to_ascii_lowercase()
}

impl TypeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// A table pre-populated with the builtin exception hierarchy and common classes.
    pub fn with_builtins() -> Self {
        let mut table = Self::new();
        for (name, parent) in BUILTIN_TYPES {
            table.declare(name, parent.map(str::to_string), Vec::new());
        }
        table
    }

    /// Declare a type. Redeclaring a name keeps the first declaration.
    pub fn declare(&mut self, name: &str, parent: Option<String>, fields: Vec<String>) -> TypeHandle {
        let key = type_key(name);
        if let Some(handle) = self.by_name.get(&key) {
            return *handle;
        }

        let handle = TypeHandle(self.types.len() as u32);
        self.types.push(TypeEntry {
            name: name.trim_start_matches('\\').to_string(),
            parent: parent.map(|p| p.trim_start_matches('\\').to_string()),
            fields,
        });
        self.by_name.insert(key, handle);
        handle
    }

    pub fn lookup(&self, name: &str) -> Option<TypeHandle> {
        self.by_name.get(&type_key(name)).copied()
    }

    pub fn name(&self, handle: TypeHandle) -> Option<&str> {
        self.types.get(handle.0 as usize).map(|t| t.name.as_str())
    }

    pub fn parent(&self, handle: TypeHandle) -> Option<TypeHandle> {
        let entry = self.types.get(handle.0 as usize)?;
        entry.parent.as_deref().and_then(|p| self.lookup(p))
    }

    /// Whether `handle` is `ancestor` or extends it, following parents.
    pub fn is_subtype_of(&self, handle: TypeHandle, ancestor: TypeHandle) -> bool {
        let mut current = Some(handle);
        let mut steps = 0;
        while let Some(h) = current {
            if h == ancestor {
                return true;
            }
            // Guards against cyclic `extends` in broken code.
            steps += 1;
            if steps > self.types.len() {
                return false;
            }
            current = self.parent(h);
        }
        false
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    fn field(&self, owner: TypeHandle, name: &str) -> Option<FieldHandle> {
        let mut current = Some(owner);
        let mut steps = 0;
        while let Some(handle) = current {
            let entry = self.types.get(handle.0 as usize)?;
            if let Some(index) = entry.fields.iter().position(|f| f == name) {
                return Some(FieldHandle { owner: handle, index: index as u32 });
            }
            steps += 1;
            if steps > self.types.len() {
                return None;
            }
            current = self.parent(handle);
        }
        None
    }
}

/// Symbols visible inside one routine, layered over the shared [`TypeTable`].
#[derive(Debug, Clone)]
pub struct RoutineSymbols<'t> {
    types: &'t TypeTable,
    variables: Vec<(String, VariableKind)>,
    index: HashMap<String, u32>,
}

impl<'t> RoutineSymbols<'t> {
    pub fn new(types: &'t TypeTable) -> Self {
        Self {
            types,
            variables: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Collect parameters, captured variables, `$this` and every directly named
    /// variable of the routine body. Nested closures are separate routines and
    /// only contribute their `use` lists.
    pub fn for_routine(types: &'t TypeTable, routine: &Routine) -> Self {
        let mut symbols = Self::new(types);

        for param in &routine.parameters {
            symbols.declare(&param.name, VariableKind::Parameter);
        }
        for captured in &routine.uses {
            symbols.declare(&captured.name, VariableKind::Local);
        }
        if routine.kind.has_this() {
            symbols.declare("this", VariableKind::This);
        }
        for name in SUPERGLOBALS {
            symbols.declare(name, VariableKind::Superglobal);
        }

        let mut collector = LocalCollector { names: Vec::new() };
        collector.statements(&routine.body);
        for name in collector.names {
            symbols.declare(&name, VariableKind::Local);
        }

        symbols
    }

    /// Declare a variable; the first declaration of a name wins.
    pub fn declare(&mut self, name: &str, kind: VariableKind) -> VariableHandle {
        if let Some(index) = self.index.get(name) {
            return VariableHandle {
                index: *index,
                kind: self.variables[*index as usize].1,
            };
        }
        let index = self.variables.len() as u32;
        self.variables.push((name.to_string(), kind));
        self.index.insert(name.to_string(), index);
        VariableHandle { index, kind }
    }

    pub fn variable_name(&self, handle: VariableHandle) -> Option<&str> {
        self.variables.get(handle.index as usize).map(|(name, _)| name.as_str())
    }

    pub fn variable_count(&self) -> usize {
        self.variables.len()
    }

    pub fn types(&self) -> &TypeTable {
        self.types
    }
}

impl SymbolResolver for RoutineSymbols<'_> {
    fn resolve_local_or_parameter(&self, name: &str) -> Option<VariableHandle> {
        let index = *self.index.get(name)?;
        Some(VariableHandle {
            index,
            kind: self.variables[index as usize].1,
        })
    }

    fn resolve_type(&self, qualified_name: &str) -> Option<TypeHandle> {
        self.types.lookup(qualified_name).or_else(|| {
            // Unqualified fallback for code in a namespace referring to a global class.
            let last = qualified_name.rsplit('\\').next()?;
            self.types.lookup(last)
        })
    }

    fn resolve_field(&self, instance_type: TypeHandle, name: &str) -> Option<FieldHandle> {
        self.types.field(instance_type, name)
    }
}

struct LocalCollector {
    names: Vec<String>,
}

impl LocalCollector {
    fn statements(&mut self, stmts: &[Stmt]) {
        for stmt in stmts {
            self.statement(stmt);
        }
    }

    fn statement(&mut self, stmt: &Stmt) {
        match &stmt.kind {
            StmtKind::Expr(expr) | StmtKind::Throw(expr) => self.expression(expr),
            StmtKind::Echo(exprs) | StmtKind::Unset(exprs) | StmtKind::Global(exprs) => {
                exprs.iter().for_each(|e| self.expression(e))
            }
            StmtKind::Block(body) => self.statements(body),
            StmtKind::If(arms) => {
                for arm in arms {
                    if let Some(condition) = &arm.condition {
                        self.expression(condition);
                    }
                    self.statements(&arm.body);
                }
            }
            StmtKind::While { condition, body } | StmtKind::DoWhile { body, condition } => {
                self.expression(condition);
                self.statements(body);
            }
            StmtKind::For { init, condition, action, body } => {
                init.iter().chain(condition).chain(action).for_each(|e| self.expression(e));
                self.statements(body);
            }
            StmtKind::Foreach { enumeree, key, value, body, .. } => {
                self.expression(enumeree);
                if let Some(key) = key {
                    self.expression(key);
                }
                self.expression(value);
                self.statements(body);
            }
            StmtKind::Switch { value, cases } => {
                self.expression(value);
                for case in cases {
                    if let Some(value) = &case.value {
                        self.expression(value);
                    }
                    self.statements(&case.body);
                }
            }
            StmtKind::Try { body, catches, finally } => {
                self.statements(body);
                for catch in catches {
                    if let Some(variable) = &catch.variable {
                        self.expression(variable);
                    }
                    self.statements(&catch.body);
                }
                if let Some(finally) = finally {
                    self.statements(finally);
                }
            }
            StmtKind::Break(level) | StmtKind::Continue(level) | StmtKind::Return(level) => {
                if let Some(expr) = level {
                    self.expression(expr);
                }
            }
            StmtKind::Static(vars) => {
                for var in vars {
                    self.expression(&var.variable);
                    if let Some(init) = &var.initializer {
                        self.expression(init);
                    }
                }
            }
            StmtKind::Goto(_)
            | StmtKind::Label(_)
            | StmtKind::InlineHtml(_)
            | StmtKind::FunctionDecl(_)
            | StmtKind::ClassDecl { .. }
            | StmtKind::Noop
            | StmtKind::Unsupported(_) => {}
        }
    }

    fn uses(&mut self, uses: &[ClosureUse]) {
        for captured in uses {
            self.names.push(captured.name.clone());
        }
    }

    fn expression(&mut self, expr: &Expr) {
        match &expr.kind {
            ExprKind::Variable(VariableName::Direct(name)) => self.names.push(name.clone()),
            ExprKind::Variable(VariableName::Indirect(inner)) => self.expression(inner),
            ExprKind::ArrayItem { array, index } => {
                self.expression(array);
                if let Some(index) = index {
                    self.expression(index);
                }
            }
            ExprKind::Property { object, .. } => self.expression(object),
            ExprKind::Call { args, .. } | ExprKind::StaticCall { args, .. } | ExprKind::New { args, .. } => {
                args.iter().for_each(|a| self.expression(&a.value))
            }
            ExprKind::MethodCall { object, args, .. } => {
                self.expression(object);
                args.iter().for_each(|a| self.expression(&a.value));
            }
            ExprKind::Binary { left, right, .. } => {
                self.expression(left);
                self.expression(right);
            }
            ExprKind::Unary { operand, .. } | ExprKind::Cast { operand, .. } => self.expression(operand),
            ExprKind::IncDec { target, .. } => self.expression(target),
            ExprKind::Assign { target, value, .. } | ExprKind::CompoundAssign { target, value, .. } => {
                self.expression(target);
                self.expression(value);
            }
            ExprKind::List(items) => {
                for item in items.iter().flatten() {
                    if let Some(key) = &item.key {
                        self.expression(key);
                    }
                    self.expression(&item.value);
                }
            }
            ExprKind::Array(items) => {
                for item in items {
                    if let Some(key) = &item.key {
                        self.expression(key);
                    }
                    self.expression(&item.value);
                }
            }
            ExprKind::Conditional { condition, then, otherwise } => {
                self.expression(condition);
                if let Some(then) = then {
                    self.expression(then);
                }
                self.expression(otherwise);
            }
            ExprKind::InstanceOf { operand, .. } => self.expression(operand),
            ExprKind::Isset(exprs) | ExprKind::Interpolated(exprs) => {
                exprs.iter().for_each(|e| self.expression(e))
            }
            ExprKind::Empty(inner) | ExprKind::Throw(inner) => self.expression(inner),
            ExprKind::Include { target, .. } => self.expression(target),
            ExprKind::Exit(value) => {
                if let Some(value) = value {
                    self.expression(value);
                }
            }
            ExprKind::Closure { uses, .. } => self.uses(uses),
            ExprKind::Literal(_)
            | ExprKind::StaticProperty { .. }
            | ExprKind::ConstFetch(_)
            | ExprKind::ClassConstFetch { .. }
            | ExprKind::PseudoConst(_)
            | ExprKind::Unsupported(_) => {}
        }
    }
}
