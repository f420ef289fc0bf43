//! How a bound expression is used by its parent

use std::fmt;

use crate::symbols::TypeHandle;
use crate::types::TypeMask;

/// Raw access flag bits.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct AccessFlags(u16);

impl AccessFlags {
    pub const NONE: AccessFlags = AccessFlags(0);
    pub const READ: AccessFlags = AccessFlags(1 << 0);
    pub const WRITE: AccessFlags = AccessFlags(1 << 1);
    pub const READ_REF: AccessFlags = AccessFlags(1 << 2);
    pub const WRITE_REF: AccessFlags = AccessFlags(1 << 3);
    pub const ENSURE_OBJECT: AccessFlags = AccessFlags(1 << 4);
    pub const ENSURE_ARRAY: AccessFlags = AccessFlags(1 << 5);
    pub const QUIET: AccessFlags = AccessFlags(1 << 6);
    pub const UNSET: AccessFlags = AccessFlags(1 << 7);

    /// Flags that select how a missing value is auto-created; at most one may be set.
    const VIVIFICATION: [AccessFlags; 3] = [
        AccessFlags::ENSURE_ARRAY,
        AccessFlags::ENSURE_OBJECT,
        AccessFlags::READ_REF,
    ];

    pub const fn bits(self) -> u16 {
        self.0
    }

    pub const fn contains(self, other: AccessFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn union(self, other: AccessFlags) -> AccessFlags {
        AccessFlags(self.0 | other.0)
    }

    fn vivification_modes(self) -> usize {
        AccessFlags::VIVIFICATION
            .iter()
            .filter(|flag| self.contains(**flag))
            .count()
    }
}

impl std::ops::BitOr for AccessFlags {
    type Output = AccessFlags;

    fn bitor(self, rhs: AccessFlags) -> AccessFlags {
        self.union(rhs)
    }
}

/// Access information carried by every bound expression.
///
/// Values are immutable: every `with_*` combinator returns a new descriptor
/// whose flags are the union of both and whose write mask is the union of
/// both masks.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct AccessDescriptor {
    flags: AccessFlags,
    target_type: Option<TypeHandle>,
    write_mask: TypeMask,
}

impl AccessDescriptor {
    pub const NONE: AccessDescriptor = AccessDescriptor::from_flags(AccessFlags::NONE);
    pub const READ: AccessDescriptor = AccessDescriptor::from_flags(AccessFlags::READ);
    pub const READ_REF: AccessDescriptor =
        AccessDescriptor::from_flags(AccessFlags::READ.union(AccessFlags::READ_REF));
    pub const WRITE: AccessDescriptor = AccessDescriptor::from_flags(AccessFlags::WRITE);
    pub const UNSET: AccessDescriptor =
        AccessDescriptor::from_flags(AccessFlags::UNSET.union(AccessFlags::QUIET));
    pub const READ_AND_WRITE: AccessDescriptor =
        AccessDescriptor::from_flags(AccessFlags::READ.union(AccessFlags::WRITE));
    /// Check-only read as performed by `isset`/`empty`/`??`.
    pub const READ_QUIET: AccessDescriptor =
        AccessDescriptor::from_flags(AccessFlags::READ.union(AccessFlags::QUIET));

    const fn from_flags(flags: AccessFlags) -> Self {
        Self {
            flags,
            target_type: None,
            write_mask: TypeMask::UNINITIALIZED,
        }
    }

    fn combine(self, flags: AccessFlags, write_mask: TypeMask) -> Self {
        let flags = self.flags | flags;
        assert!(
            flags.vivification_modes() <= 1,
            "conflicting vivification modes in access {:?}",
            flags
        );
        Self {
            flags,
            target_type: self.target_type,
            write_mask: self.write_mask | write_mask,
        }
    }

    pub fn with_read(self) -> Self {
        self.combine(AccessFlags::READ, TypeMask::UNINITIALIZED)
    }

    pub fn with_write(self, write_mask: TypeMask) -> Self {
        self.combine(AccessFlags::WRITE, write_mask)
    }

    pub fn with_read_ref(self) -> Self {
        self.combine(AccessFlags::READ | AccessFlags::READ_REF, TypeMask::UNINITIALIZED)
    }

    pub fn with_write_ref(self, write_mask: TypeMask) -> Self {
        self.combine(AccessFlags::WRITE | AccessFlags::WRITE_REF, write_mask)
    }

    pub fn with_quiet(self) -> Self {
        self.combine(AccessFlags::QUIET, TypeMask::UNINITIALIZED)
    }

    pub fn with_ensure_object(self) -> Self {
        self.combine(AccessFlags::ENSURE_OBJECT, TypeMask::UNINITIALIZED)
    }

    pub fn with_ensure_array(self) -> Self {
        self.combine(AccessFlags::ENSURE_ARRAY, TypeMask::UNINITIALIZED)
    }

    /// Attach the type the accessed value is expected to have.
    pub fn with_target_type(self, target: TypeHandle) -> Self {
        Self {
            target_type: Some(target),
            ..self
        }
    }

    pub fn flags(&self) -> AccessFlags {
        self.flags
    }

    pub fn target_type(&self) -> Option<TypeHandle> {
        self.target_type
    }

    pub fn write_mask(&self) -> TypeMask {
        self.write_mask
    }

    pub fn is_none(&self) -> bool {
        self.flags == AccessFlags::NONE
    }

    pub fn is_read(&self) -> bool {
        self.flags.contains(AccessFlags::READ)
    }

    pub fn is_write(&self) -> bool {
        self.flags.contains(AccessFlags::WRITE)
    }

    pub fn is_read_ref(&self) -> bool {
        self.flags.contains(AccessFlags::READ_REF)
    }

    pub fn is_write_ref(&self) -> bool {
        self.flags.contains(AccessFlags::WRITE_REF)
    }

    pub fn is_ensure_object(&self) -> bool {
        self.flags.contains(AccessFlags::ENSURE_OBJECT)
    }

    pub fn is_ensure_array(&self) -> bool {
        self.flags.contains(AccessFlags::ENSURE_ARRAY)
    }

    pub fn is_quiet(&self) -> bool {
        self.flags.contains(AccessFlags::QUIET)
    }

    pub fn is_unset(&self) -> bool {
        self.flags.contains(AccessFlags::UNSET)
    }

    /// Whether the access may create or modify the accessed value.
    pub fn is_mutating(&self) -> bool {
        self.is_write()
            || self.is_read_ref()
            || self.is_ensure_array()
            || self.is_ensure_object()
    }
}

impl fmt::Debug for AccessFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccessFlags({})", AccessDescriptor::from_flags(*self))
    }
}

impl fmt::Debug for AccessDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessDescriptor")
            .field("flags", &self.to_string())
            .field("target_type", &self.target_type)
            .field("write_mask", &self.write_mask)
            .finish()
    }
}

impl fmt::Display for AccessDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            return write!(f, "none");
        }

        // Reference flags subsume their plain counterparts in the spelling.
        let mut parts = Vec::new();
        if self.is_read_ref() {
            parts.push("readref");
        } else if self.is_read() {
            parts.push("read");
        }
        if self.is_write_ref() {
            parts.push("writeref");
        } else if self.is_write() {
            parts.push("write");
        }
        if self.is_ensure_object() {
            parts.push("object");
        }
        if self.is_ensure_array() {
            parts.push("array");
        }
        if self.is_quiet() {
            parts.push("quiet");
        }
        if self.is_unset() {
            parts.push("unset");
        }
        write!(f, "{}", parts.join("|"))
    }
}
