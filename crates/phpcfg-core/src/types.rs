//! Type masks filled in by type inference

use std::fmt;

use crate::bound::ConstValue;

/// Bit set of PHP value kinds an expression may evaluate to.
///
/// The binder never computes these; it only seeds write masks from constant
/// values. An [`TypeMask::UNINITIALIZED`] mask means "not inferred yet".
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct TypeMask(u64);

impl TypeMask {
    pub const UNINITIALIZED: TypeMask = TypeMask(0);
    pub const NULL: TypeMask = TypeMask(1 << 0);
    pub const BOOL: TypeMask = TypeMask(1 << 1);
    pub const INT: TypeMask = TypeMask(1 << 2);
    pub const FLOAT: TypeMask = TypeMask(1 << 3);
    pub const STRING: TypeMask = TypeMask(1 << 4);
    pub const ARRAY: TypeMask = TypeMask(1 << 5);
    pub const OBJECT: TypeMask = TypeMask(1 << 6);
    pub const RESOURCE: TypeMask = TypeMask(1 << 7);
    pub const CALLABLE: TypeMask = TypeMask(1 << 8);
    /// Any value, including references.
    pub const ANY: TypeMask = TypeMask(u64::MAX);

    pub const fn from_bits(bits: u64) -> Self {
        TypeMask(bits)
    }

    pub const fn bits(self) -> u64 {
        self.0
    }

    pub const fn is_uninitialized(self) -> bool {
        self.0 == 0
    }

    pub const fn union(self, other: TypeMask) -> TypeMask {
        TypeMask(self.0 | other.0)
    }

    pub const fn contains(self, other: TypeMask) -> bool {
        self.0 & other.0 == other.0
    }

    /// Mask of a single constant value.
    pub fn of_value(value: &ConstValue) -> TypeMask {
        match value {
            ConstValue::Null => TypeMask::NULL,
            ConstValue::Bool(_) => TypeMask::BOOL,
            ConstValue::Int(_) => TypeMask::INT,
            ConstValue::Float(_) => TypeMask::FLOAT,
            ConstValue::String(_) => TypeMask::STRING,
        }
    }
}

impl std::ops::BitOr for TypeMask {
    type Output = TypeMask;

    fn bitor(self, rhs: TypeMask) -> TypeMask {
        self.union(rhs)
    }
}

impl fmt::Debug for TypeMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeMask({})", self)
    }
}

impl fmt::Display for TypeMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_uninitialized() {
            return write!(f, "?");
        }
        if *self == TypeMask::ANY {
            return write!(f, "mixed");
        }

        const NAMES: [(TypeMask, &str); 9] = [
            (TypeMask::NULL, "null"),
            (TypeMask::BOOL, "bool"),
            (TypeMask::INT, "int"),
            (TypeMask::FLOAT, "float"),
            (TypeMask::STRING, "string"),
            (TypeMask::ARRAY, "array"),
            (TypeMask::OBJECT, "object"),
            (TypeMask::RESOURCE, "resource"),
            (TypeMask::CALLABLE, "callable"),
        ];

        let names: Vec<&str> = NAMES
            .iter()
            .filter(|(mask, _)| self.contains(*mask))
            .map(|(_, name)| *name)
            .collect();
        write!(f, "{}", names.join("|"))
    }
}
