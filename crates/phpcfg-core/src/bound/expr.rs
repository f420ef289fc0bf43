//! Bound expressions

use std::cell::{Cell, OnceCell};
use std::fmt;

use mago_span::Span;

use crate::access::AccessDescriptor;
use crate::ast::{BinaryOp, CastKind, IncludeKind, PseudoConstKind, UnaryOp};
use crate::symbols::{FieldHandle, RoutineHandle, TypeHandle, VariableHandle};
use crate::types::TypeMask;

/// A compile-time known PHP value.
#[derive(Debug, Clone, PartialEq)]
pub enum ConstValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl ConstValue {
    /// PHP truthiness.
    pub fn to_bool(&self) -> bool {
        match self {
            ConstValue::Null => false,
            ConstValue::Bool(b) => *b,
            ConstValue::Int(i) => *i != 0,
            ConstValue::Float(f) => *f != 0.0,
            ConstValue::String(s) => !s.is_empty() && s != "0",
        }
    }

    /// The value PHP produces when converting to string (`null` is empty, `true` is `1`).
    pub fn to_php_string(&self) -> String {
        match self {
            ConstValue::Null => String::new(),
            ConstValue::Bool(true) => "1".to_string(),
            ConstValue::Bool(false) => String::new(),
            ConstValue::Int(i) => i.to_string(),
            ConstValue::Float(f) => format_float(*f),
            ConstValue::String(s) => s.clone(),
        }
    }

    fn to_number(&self) -> Option<Number> {
        match self {
            ConstValue::Null => Some(Number::Int(0)),
            ConstValue::Bool(b) => Some(Number::Int(*b as i64)),
            ConstValue::Int(i) => Some(Number::Int(*i)),
            ConstValue::Float(f) => Some(Number::Float(*f)),
            ConstValue::String(_) => None,
        }
    }

    fn to_int(&self) -> Option<i64> {
        match self.to_number()? {
            Number::Int(i) => Some(i),
            Number::Float(f) if f.is_finite() => Some(f as i64),
            Number::Float(_) => None,
        }
    }
}

impl From<Number> for ConstValue {
    fn from(number: Number) -> Self {
        match number {
            Number::Int(i) => ConstValue::Int(i),
            Number::Float(f) => ConstValue::Float(f),
        }
    }
}

/// Natural spelling: `NULL`, `true`, `42`, `1.5`, or the raw string.
impl fmt::Display for ConstValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstValue::Null => write!(f, "NULL"),
            ConstValue::Bool(b) => write!(f, "{}", b),
            ConstValue::Int(i) => write!(f, "{}", i),
            ConstValue::Float(v) => write!(f, "{}", format_float(*v)),
            ConstValue::String(s) => write!(f, "{}", s),
        }
    }
}

fn format_float(value: f64) -> String {
    if value.is_nan() {
        "NAN".to_string()
    } else if value.is_infinite() {
        (if value > 0.0 { "INF" } else { "-INF" }).to_string()
    } else {
        value.to_string()
    }
}

#[derive(Debug, Clone, Copy)]
enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    fn as_float(self) -> f64 {
        match self {
            Number::Int(i) => i as f64,
            Number::Float(f) => f,
        }
    }
}

/// Expression node produced by the binder.
///
/// The access descriptor and provenance are fixed at construction. The
/// inferred type mask and the resolved result type are filled in later by
/// inference and emission.
#[derive(Debug)]
pub struct BoundExpr {
    pub kind: BoundExprKind,
    pub access: AccessDescriptor,
    pub span: Span,
    type_mask: Cell<TypeMask>,
    result_type: Cell<Option<TypeHandle>>,
}

impl BoundExpr {
    pub fn new(kind: BoundExprKind, access: AccessDescriptor, span: Span) -> Self {
        Self {
            kind,
            access,
            span,
            type_mask: Cell::new(TypeMask::UNINITIALIZED),
            result_type: Cell::new(None),
        }
    }

    pub fn literal(value: Option<ConstValue>, span: Span) -> Self {
        Self::new(BoundExprKind::Literal(BoundLiteral::new(value)), AccessDescriptor::READ, span)
    }

    pub fn type_mask(&self) -> TypeMask {
        self.type_mask.get()
    }

    pub fn set_type_mask(&self, mask: TypeMask) {
        self.type_mask.set(mask);
    }

    pub fn result_type(&self) -> Option<TypeHandle> {
        self.result_type.get()
    }

    pub fn set_result_type(&self, handle: TypeHandle) {
        self.result_type.set(Some(handle));
    }

    /// Short name of the node variant, used by dumps.
    pub fn kind_name(&self) -> &'static str {
        match &self.kind {
            BoundExprKind::Literal(_) => "Literal",
            BoundExprKind::Variable(_) => "VariableRef",
            BoundExprKind::Field(_) => "FieldRef",
            BoundExprKind::ArrayItem(_) => "ArrayItemRef",
            BoundExprKind::Call(call) => call.kind.name(),
            BoundExprKind::Binary(_) => "BinaryOp",
            BoundExprKind::Unary(_) => "UnaryOp",
            BoundExprKind::IncDec(_) => "IncDec",
            BoundExprKind::Assign(_) => "Assign",
            BoundExprKind::CompoundAssign(_) => "CompoundAssign",
            BoundExprKind::Conditional(_) => "Conditional",
            BoundExprKind::InstanceOf(_) => "InstanceOf",
            BoundExprKind::IsSet(_) => "IsSet",
            BoundExprKind::Empty(_) => "Empty",
            BoundExprKind::GlobalConst(_) => "GlobalConst",
            BoundExprKind::PseudoConst(_) => "PseudoConst",
            BoundExprKind::ClassConst(_) => "ClassConst",
            BoundExprKind::Array(_) => "Array",
            BoundExprKind::List(_) => "List",
            BoundExprKind::Cast(_) => "Cast",
            BoundExprKind::Lambda(_) => "Lambda",
            BoundExprKind::Throw(_) => "Throw",
            BoundExprKind::Unsupported(_) => "Unsupported",
        }
    }

    /// Fold the expression to a constant when every input is constant.
    pub fn constant_value(&self) -> Option<ConstValue> {
        match &self.kind {
            BoundExprKind::Literal(lit) => lit.value().cloned(),
            BoundExprKind::GlobalConst(c) => c.value.clone(),
            BoundExprKind::Unary(unary) => fold_unary(unary.op, &unary.operand.constant_value()?),
            BoundExprKind::Binary(binary) => {
                let left = binary.left.constant_value()?;
                if let Some(shortcut) = fold_short_circuit(binary.op, &left) {
                    return Some(shortcut);
                }
                fold_binary(binary.op, &left, &binary.right.constant_value()?)
            }
            BoundExprKind::Conditional(cond) => {
                let condition = cond.condition.constant_value()?;
                if condition.to_bool() {
                    match &cond.then {
                        Some(then) => then.constant_value(),
                        None => Some(condition),
                    }
                } else {
                    cond.otherwise.constant_value()
                }
            }
            BoundExprKind::Cast(cast) => fold_cast(cast.kind, cast.operand.constant_value()?),
            BoundExprKind::Call(call) if call.kind == CallKind::Concat => {
                let mut out = String::new();
                for arg in &call.arguments {
                    out.push_str(&arg.value.constant_value()?.to_php_string());
                }
                Some(ConstValue::String(out))
            }
            _ => None,
        }
    }

    /// Name of a directly named variable reference.
    pub fn variable_name(&self) -> Option<&str> {
        match &self.kind {
            BoundExprKind::Variable(var) => var.name.direct(),
            _ => None,
        }
    }
}

fn fold_short_circuit(op: BinaryOp, left: &ConstValue) -> Option<ConstValue> {
    match op {
        BinaryOp::And if !left.to_bool() => Some(ConstValue::Bool(false)),
        BinaryOp::Or if left.to_bool() => Some(ConstValue::Bool(true)),
        BinaryOp::Coalesce if *left != ConstValue::Null => Some(left.clone()),
        _ => None,
    }
}

fn fold_unary(op: UnaryOp, operand: &ConstValue) -> Option<ConstValue> {
    match op {
        UnaryOp::Not => Some(ConstValue::Bool(!operand.to_bool())),
        UnaryOp::Plus => operand.to_number().map(ConstValue::from),
        UnaryOp::Minus => match operand.to_number()? {
            Number::Int(i) => Some(match i.checked_neg() {
                Some(v) => ConstValue::Int(v),
                None => ConstValue::Float(-(i as f64)),
            }),
            Number::Float(f) => Some(ConstValue::Float(-f)),
        },
        UnaryOp::BitNot => match operand {
            ConstValue::Int(i) => Some(ConstValue::Int(!i)),
            _ => None,
        },
        UnaryOp::Silence => Some(operand.clone()),
        UnaryOp::Clone | UnaryOp::Print => None,
    }
}

fn fold_arith(op: BinaryOp, left: Number, right: Number) -> Option<ConstValue> {
    if let (Number::Int(a), Number::Int(b)) = (left, right) {
        let checked = match op {
            BinaryOp::Add => a.checked_add(b),
            BinaryOp::Sub => a.checked_sub(b),
            BinaryOp::Mul => a.checked_mul(b),
            BinaryOp::Div => {
                if b == 0 {
                    return None;
                }
                if a.checked_rem(b) == Some(0) {
                    a.checked_div(b)
                } else {
                    return Some(ConstValue::Float(a as f64 / b as f64));
                }
            }
            BinaryOp::Mod => {
                if b == 0 {
                    return None;
                }
                a.checked_rem(b)
            }
            BinaryOp::Pow => u32::try_from(b).ok().and_then(|e| a.checked_pow(e)),
            _ => return None,
        };
        if let Some(value) = checked {
            return Some(ConstValue::Int(value));
        }
        if op == BinaryOp::Mod {
            return None;
        }
    }

    let (a, b) = (left.as_float(), right.as_float());
    let value = match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div => {
            if b == 0.0 {
                return None;
            }
            a / b
        }
        BinaryOp::Pow => a.powf(b),
        BinaryOp::Mod => return None,
        _ => return None,
    };
    Some(ConstValue::Float(value))
}

fn fold_binary(op: BinaryOp, left: &ConstValue, right: &ConstValue) -> Option<ConstValue> {
    match op {
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod | BinaryOp::Pow => {
            fold_arith(op, left.to_number()?, right.to_number()?)
        }
        BinaryOp::Concat => Some(ConstValue::String(format!(
            "{}{}",
            left.to_php_string(),
            right.to_php_string()
        ))),
        BinaryOp::BitAnd | BinaryOp::BitOr | BinaryOp::BitXor => {
            let (a, b) = (left.to_int()?, right.to_int()?);
            let value = match op {
                BinaryOp::BitAnd => a & b,
                BinaryOp::BitOr => a | b,
                _ => a ^ b,
            };
            Some(ConstValue::Int(value))
        }
        BinaryOp::ShiftLeft | BinaryOp::ShiftRight => {
            let (a, b) = (left.to_int()?, right.to_int()?);
            let shift = u32::try_from(b).ok().filter(|s| *s < 64)?;
            Some(ConstValue::Int(if op == BinaryOp::ShiftLeft { a << shift } else { a >> shift }))
        }
        BinaryOp::And => Some(ConstValue::Bool(left.to_bool() && right.to_bool())),
        BinaryOp::Or => Some(ConstValue::Bool(left.to_bool() || right.to_bool())),
        BinaryOp::Xor => Some(ConstValue::Bool(left.to_bool() ^ right.to_bool())),
        BinaryOp::Identical => Some(ConstValue::Bool(left == right)),
        BinaryOp::NotIdentical => Some(ConstValue::Bool(left != right)),
        BinaryOp::Coalesce => Some(if *left == ConstValue::Null { right.clone() } else { left.clone() }),
        BinaryOp::Equal
        | BinaryOp::NotEqual
        | BinaryOp::Less
        | BinaryOp::LessEqual
        | BinaryOp::Greater
        | BinaryOp::GreaterEqual
        | BinaryOp::Spaceship => {
            // Only numeric operands; loose string comparison rules are left to runtime.
            let (a, b) = (left.to_number()?.as_float(), right.to_number()?.as_float());
            let ordering = a.partial_cmp(&b)?;
            let value = match op {
                BinaryOp::Equal => ConstValue::Bool(ordering.is_eq()),
                BinaryOp::NotEqual => ConstValue::Bool(ordering.is_ne()),
                BinaryOp::Less => ConstValue::Bool(ordering.is_lt()),
                BinaryOp::LessEqual => ConstValue::Bool(ordering.is_le()),
                BinaryOp::Greater => ConstValue::Bool(ordering.is_gt()),
                BinaryOp::GreaterEqual => ConstValue::Bool(ordering.is_ge()),
                _ => ConstValue::Int(ordering as i64),
            };
            Some(value)
        }
    }
}

fn fold_cast(kind: CastKind, value: ConstValue) -> Option<ConstValue> {
    match kind {
        CastKind::Bool => Some(ConstValue::Bool(value.to_bool())),
        CastKind::String => Some(ConstValue::String(value.to_php_string())),
        CastKind::Int => value.to_int().map(ConstValue::Int),
        CastKind::Float => value.to_number().map(|n| ConstValue::Float(n.as_float())),
        CastKind::Unset => Some(ConstValue::Null),
        CastKind::Array | CastKind::Object => None,
    }
}

#[derive(Debug)]
pub enum BoundExprKind {
    Literal(BoundLiteral),
    Variable(BoundVariableRef),
    Field(BoundFieldRef),
    ArrayItem(BoundArrayItemRef),
    Call(BoundRoutineCall),
    Binary(BoundBinaryEx),
    Unary(BoundUnaryEx),
    IncDec(BoundIncDec),
    Assign(BoundAssign),
    CompoundAssign(BoundCompoundAssign),
    Conditional(BoundConditional),
    InstanceOf(BoundInstanceOf),
    IsSet(BoundIsSet),
    Empty(Box<BoundExpr>),
    GlobalConst(BoundGlobalConst),
    PseudoConst(BoundPseudoConst),
    ClassConst(BoundClassConst),
    Array(BoundArrayEx),
    List(BoundListEx),
    Cast(BoundCast),
    Lambda(BoundLambda),
    Throw(Box<BoundExpr>),
    Unsupported(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoundLiteral {
    value: Option<ConstValue>,
}

impl BoundLiteral {
    pub fn new(value: Option<ConstValue>) -> Self {
        Self { value }
    }

    pub fn value(&self) -> Option<&ConstValue> {
        self.value.as_ref()
    }

    /// `NULL` for an absent or null value, otherwise the value's natural form.
    pub fn spelling(&self) -> String {
        match &self.value {
            None => "NULL".to_string(),
            Some(value) => value.to_string(),
        }
    }
}

#[derive(Debug)]
pub enum BoundVariableName {
    Direct(String),
    Indirect(Box<BoundExpr>),
}

impl BoundVariableName {
    pub fn direct(&self) -> Option<&str> {
        match self {
            BoundVariableName::Direct(name) => Some(name),
            BoundVariableName::Indirect(_) => None,
        }
    }
}

#[derive(Debug)]
pub struct BoundVariableRef {
    pub name: BoundVariableName,
    pub handle: Option<VariableHandle>,
}

#[derive(Debug)]
pub enum BoundMemberName {
    Direct(String),
    Indirect(Box<BoundExpr>),
}

impl BoundMemberName {
    pub fn direct(&self) -> Option<&str> {
        match self {
            BoundMemberName::Direct(name) => Some(name),
            BoundMemberName::Indirect(_) => None,
        }
    }
}

impl fmt::Display for BoundMemberName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoundMemberName::Direct(name) => write!(f, "{}", name),
            BoundMemberName::Indirect(_) => write!(f, "{{expr}}"),
        }
    }
}

/// Reference to a class by name, by keyword, or by runtime value.
#[derive(Debug)]
pub enum BoundTypeRef {
    Direct { name: String, handle: Option<TypeHandle> },
    SelfType { handle: Option<TypeHandle> },
    Static,
    Parent { handle: Option<TypeHandle> },
    Indirect(Box<BoundExpr>),
}

impl BoundTypeRef {
    pub fn handle(&self) -> Option<TypeHandle> {
        match self {
            BoundTypeRef::Direct { handle, .. }
            | BoundTypeRef::SelfType { handle }
            | BoundTypeRef::Parent { handle } => *handle,
            BoundTypeRef::Static | BoundTypeRef::Indirect(_) => None,
        }
    }

    pub fn is_indirect(&self) -> bool {
        matches!(self, BoundTypeRef::Indirect(_))
    }
}

impl fmt::Display for BoundTypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoundTypeRef::Direct { name, .. } => write!(f, "{}", name),
            BoundTypeRef::SelfType { .. } => write!(f, "self"),
            BoundTypeRef::Static => write!(f, "static"),
            BoundTypeRef::Parent { .. } => write!(f, "parent"),
            BoundTypeRef::Indirect(_) => write!(f, "{{expr}}"),
        }
    }
}

/// Instance or static property reference.
#[derive(Debug)]
pub struct BoundFieldRef {
    /// `None` for static properties.
    pub instance: Option<Box<BoundExpr>>,
    pub class: Option<BoundTypeRef>,
    pub name: BoundMemberName,
    pub handle: Option<FieldHandle>,
    pub nullsafe: bool,
}

#[derive(Debug)]
pub struct BoundArrayItemRef {
    pub array: Box<BoundExpr>,
    /// `None` for `$a[]`.
    pub index: Option<Box<BoundExpr>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CallName {
    Named(String),
    Indirect,
}

#[derive(Debug, PartialEq)]
pub enum CallKind {
    Function { name: CallName },
    InstanceMethod { name: CallName, nullsafe: bool },
    StaticMethod { name: CallName },
    Echo,
    Concat,
    New,
    Include(IncludeKind),
    Exit,
}

impl CallKind {
    pub fn name(&self) -> &'static str {
        match self {
            CallKind::Function { .. } => "FunctionCall",
            CallKind::InstanceMethod { .. } => "InstanceMethodCall",
            CallKind::StaticMethod { .. } => "StaticMethodCall",
            CallKind::Echo => "Echo",
            CallKind::Concat => "Concat",
            CallKind::New => "New",
            CallKind::Include(_) => "Include",
            CallKind::Exit => "Exit",
        }
    }
}

/// A call argument. Its value is always read; aliasing uses a read-ref access.
#[derive(Debug)]
pub struct BoundArgument {
    pub value: BoundExpr,
    pub unpack: bool,
    pub name: Option<String>,
}

impl BoundArgument {
    pub fn new(value: BoundExpr, unpack: bool, name: Option<String>) -> Self {
        assert!(
            value.access.is_read(),
            "call argument must be read, got access {}",
            value.access
        );
        Self { value, unpack, name }
    }
}

/// Any routine invocation: calls, `new`, `echo`, concatenation, `include`, `exit`.
#[derive(Debug)]
pub struct BoundRoutineCall {
    pub kind: CallKind,
    /// Receiver of an instance call.
    pub instance: Option<Box<BoundExpr>>,
    /// Class of a static call or instantiation.
    pub class: Option<BoundTypeRef>,
    /// Name expression of an indirect call (`$f()`, `$o->$m()`).
    pub name_expr: Option<Box<BoundExpr>>,
    pub arguments: Vec<BoundArgument>,
    overloads: OnceCell<Vec<RoutineHandle>>,
}

impl BoundRoutineCall {
    pub fn new(kind: CallKind, arguments: Vec<BoundArgument>) -> Self {
        Self {
            kind,
            instance: None,
            class: None,
            name_expr: None,
            arguments,
            overloads: OnceCell::new(),
        }
    }

    pub fn with_instance(mut self, instance: BoundExpr) -> Self {
        self.instance = Some(Box::new(instance));
        self
    }

    pub fn with_class(mut self, class: BoundTypeRef) -> Self {
        self.class = Some(class);
        self
    }

    pub fn with_name_expr(mut self, name: BoundExpr) -> Self {
        self.name_expr = Some(Box::new(name));
        self
    }

    /// Attach the resolved overload set. Returns `false` if one was already attached.
    pub fn attach_overloads(&self, overloads: Vec<RoutineHandle>) -> bool {
        self.overloads.set(overloads).is_ok()
    }

    pub fn overloads(&self) -> Option<&[RoutineHandle]> {
        self.overloads.get().map(Vec::as_slice)
    }

    pub fn routine_name(&self) -> Option<&str> {
        match &self.kind {
            CallKind::Function { name: CallName::Named(name) }
            | CallKind::InstanceMethod { name: CallName::Named(name), .. }
            | CallKind::StaticMethod { name: CallName::Named(name) } => Some(name),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub struct BoundBinaryEx {
    pub op: BinaryOp,
    pub left: Box<BoundExpr>,
    pub right: Box<BoundExpr>,
}

#[derive(Debug)]
pub struct BoundUnaryEx {
    pub op: UnaryOp,
    pub operand: Box<BoundExpr>,
}

#[derive(Debug)]
pub struct BoundIncDec {
    pub target: Box<BoundExpr>,
    pub increment: bool,
    pub prefix: bool,
}

#[derive(Debug)]
pub struct BoundAssign {
    pub target: Box<BoundExpr>,
    pub value: Box<BoundExpr>,
    pub by_ref: bool,
}

#[derive(Debug)]
pub struct BoundCompoundAssign {
    pub op: BinaryOp,
    pub target: Box<BoundExpr>,
    pub value: Box<BoundExpr>,
}

/// `c ? a : b`, or the short form `c ?: b` when `then` is absent.
#[derive(Debug)]
pub struct BoundConditional {
    pub condition: Box<BoundExpr>,
    pub then: Option<Box<BoundExpr>>,
    pub otherwise: Box<BoundExpr>,
}

#[derive(Debug)]
pub struct BoundInstanceOf {
    pub operand: Box<BoundExpr>,
    pub type_ref: BoundTypeRef,
}

#[derive(Debug)]
pub struct BoundIsSet {
    pub vars: Vec<BoundExpr>,
}

#[derive(Debug)]
pub struct BoundGlobalConst {
    pub name: String,
    /// Value of well-known constants (`true`, `PHP_EOL`, ...).
    pub value: Option<ConstValue>,
}

#[derive(Debug)]
pub struct BoundPseudoConst {
    pub kind: PseudoConstKind,
}

#[derive(Debug)]
pub struct BoundClassConst {
    pub class: BoundTypeRef,
    pub name: String,
}

#[derive(Debug)]
pub struct BoundArrayItem {
    pub key: Option<BoundExpr>,
    pub value: BoundExpr,
    pub by_ref: bool,
    pub spread: bool,
}

#[derive(Debug)]
pub struct BoundArrayEx {
    pub items: Vec<BoundArrayItem>,
}

#[derive(Debug)]
pub struct BoundListItem {
    pub key: Option<BoundExpr>,
    pub target: BoundExpr,
}

/// Destructuring target; `None` entries are skipped positions.
#[derive(Debug)]
pub struct BoundListEx {
    pub items: Vec<Option<BoundListItem>>,
}

#[derive(Debug)]
pub struct BoundCast {
    pub kind: CastKind,
    pub operand: Box<BoundExpr>,
}

#[derive(Debug)]
pub struct BoundLambda {
    pub routine: String,
    /// Captured variables, read or read-ref.
    pub uses: Vec<BoundExpr>,
    pub is_arrow: bool,
}
