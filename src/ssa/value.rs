//! SSA values and the keys that group them into source-level variables.
//!
//! # Design Rationale
//!
//! ## Value Identity
//!
//! A value is identified by its number, the method that owns it and its type. Two values
//! with the same number in different synthetic bodies are different values; operands from
//! different owners are rejected by the instruction factory.
//!
//! ## Single Assignment
//!
//! Each value carries a one-shot `assigned` flag. Clones share the flag, so whichever copy
//! is passed to the instruction that defines the value, a second definition through any
//! other copy is detected.
//!
//! ## Variable Keys
//!
//! The [`ValueManager`](super::ValueManager) tracks many values per variable. Which values
//! belong to the same variable is decided by a [`VariableKey`]. Keys compare by type and
//! optional name; a weakly named key also matches the unnamed key of the same type, so a
//! temporary introduced by type can later be referred to by name.

use std::{
    fmt,
    hash::{Hash, Hasher},
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc,
    },
};

use crate::{
    types::{MethodRef, TypeName, TypeRef},
    Error, Result,
};

/// Number of an SSA value inside one synthetic body.
///
/// Numbers start at 1. For a method with a receiver, `v1` is `this`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ValueNumber(pub u32);

impl ValueNumber {
    /// Returns the raw number.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }

    /// The number following this one.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Debug for ValueNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

impl fmt::Display for ValueNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

static NEXT_UNIQUE: AtomicU64 = AtomicU64::new(1);

/// Groups SSA values into source-level variables.
///
/// # Equality
///
/// | left | right | equal when |
/// |------|-------|------------|
/// | `Unique(a)` | `Unique(b)` | `a == b` |
/// | `ByType(t)` | `ByType(u)` | `t == u` |
/// | `ByName(t, n)` | `ByName(u, m)` / `WeaklyByName(u, m)` | `t == u && n == m` |
/// | `WeaklyByName(t, _)` | `ByType(u)` | `t == u` |
/// | `WeaklyByName(t, n)` | `WeaklyByName(u, m)` | `t == u && n == m` |
///
/// Equality is symmetric but not transitive through `WeaklyByName`. Hashing only
/// looks at the type, which keeps it consistent with equality. Lookups that must not
/// depend on insertion order try [`VariableKey::names_same_variable`] before falling
/// back to `==`.
#[derive(Debug, Clone)]
pub enum VariableKey {
    /// A key that equals no other key
    Unique(u64),
    /// One variable per type
    ByType(TypeName),
    /// A named variable of a type
    ByName(TypeName, String),
    /// A named variable that also answers to its type alone
    WeaklyByName(TypeName, String),
}

impl VariableKey {
    /// Creates a process-unique key.
    #[must_use]
    pub fn unique() -> Self {
        Self::Unique(NEXT_UNIQUE.fetch_add(1, Ordering::Relaxed))
    }

    /// Key for the single variable of a type.
    #[must_use]
    pub fn by_type(ty: &TypeRef) -> Self {
        Self::ByType(ty.name.clone())
    }

    /// Key for a named variable.
    #[must_use]
    pub fn by_name(ty: &TypeRef, name: impl Into<String>) -> Self {
        Self::ByName(ty.name.clone(), name.into())
    }

    /// Key for a named variable that is also found by type.
    #[must_use]
    pub fn weakly_by_name(ty: &TypeRef, name: impl Into<String>) -> Self {
        Self::WeaklyByName(ty.name.clone(), name.into())
    }

    /// The variable name of named keys.
    #[must_use]
    pub fn variable_name(&self) -> Option<&str> {
        match self {
            Self::ByName(_, name) | Self::WeaklyByName(_, name) => Some(name),
            Self::Unique(_) | Self::ByType(_) => None,
        }
    }

    /// Strict variant of `==` without the `WeaklyByName`/`ByType` bridge.
    ///
    /// Named keys match named keys of the same type and name, whether weak or not;
    /// every other key only matches a key of its own kind. This relation is transitive.
    #[must_use]
    pub fn names_same_variable(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Unique(a), Self::Unique(b)) => a == b,
            (Self::ByType(a), Self::ByType(b)) => a == b,
            (
                Self::ByName(a, n) | Self::WeaklyByName(a, n),
                Self::ByName(b, m) | Self::WeaklyByName(b, m),
            ) => a == b && n == m,
            _ => false,
        }
    }

    /// The type name the key was built from, `None` for unique keys.
    #[must_use]
    pub fn type_name(&self) -> Option<&TypeName> {
        match self {
            Self::ByType(ty) | Self::ByName(ty, _) | Self::WeaklyByName(ty, _) => Some(ty),
            Self::Unique(_) => None,
        }
    }
}

impl PartialEq for VariableKey {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Unique(a), Self::Unique(b)) => a == b,
            (Self::ByType(a), Self::ByType(b)) => a == b,
            (
                Self::ByName(a, n) | Self::WeaklyByName(a, n),
                Self::ByName(b, m) | Self::WeaklyByName(b, m),
            ) => a == b && n == m,
            (Self::WeaklyByName(a, _), Self::ByType(b))
            | (Self::ByType(a), Self::WeaklyByName(b, _)) => a == b,
            _ => false,
        }
    }
}

impl Eq for VariableKey {}

impl Hash for VariableKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Self::Unique(id) => id.hash(state),
            Self::ByType(ty) | Self::ByName(ty, _) | Self::WeaklyByName(ty, _) => ty.hash(state),
        }
    }
}

impl fmt::Display for VariableKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unique(id) => write!(f, "unique#{id}"),
            Self::ByType(ty) => write!(f, "{ty}"),
            Self::ByName(ty, name) => write!(f, "{name}:{ty}"),
            Self::WeaklyByName(ty, name) => write!(f, "{name}?:{ty}"),
        }
    }
}

/// A typed SSA value owned by one method.
#[derive(Debug, Clone)]
pub struct SsaValue {
    number: ValueNumber,
    ty: TypeRef,
    owner: MethodRef,
    key: VariableKey,
    assigned: Arc<AtomicBool>,
}

impl SsaValue {
    /// Creates an unassigned value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::VoidValue`] when `ty` is `void`.
    pub fn new(number: ValueNumber, ty: TypeRef, owner: MethodRef, key: VariableKey) -> Result<Self> {
        if ty.is_void() {
            return Err(Error::VoidValue(number.0));
        }
        Ok(Self {
            number,
            ty,
            owner,
            key,
            assigned: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Creates a value that is already defined, such as a parameter.
    ///
    /// # Errors
    ///
    /// Returns [`Error::VoidValue`] when `ty` is `void`.
    pub fn preassigned(
        number: ValueNumber,
        ty: TypeRef,
        owner: MethodRef,
        key: VariableKey,
    ) -> Result<Self> {
        let value = Self::new(number, ty, owner, key)?;
        value.assigned.store(true, Ordering::Release);
        Ok(value)
    }

    /// The value number.
    #[must_use]
    pub fn number(&self) -> ValueNumber {
        self.number
    }

    /// The static type.
    #[must_use]
    pub fn ty(&self) -> &TypeRef {
        &self.ty
    }

    /// The method whose body the value lives in.
    #[must_use]
    pub fn owner(&self) -> &MethodRef {
        &self.owner
    }

    /// The variable the value belongs to.
    #[must_use]
    pub fn key(&self) -> &VariableKey {
        &self.key
    }

    /// Returns `true` once a defining instruction was built.
    #[must_use]
    pub fn is_assigned(&self) -> bool {
        self.assigned.load(Ordering::Acquire)
    }

    /// Records the definition of the value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlreadyAssigned`] on the second call, through this or any clone.
    pub fn mark_assigned(&self) -> Result<()> {
        if self.assigned.swap(true, Ordering::AcqRel) {
            return Err(Error::AlreadyAssigned(self.to_string()));
        }
        Ok(())
    }

    /// Returns `true` when both values are owned by the same method.
    #[must_use]
    pub fn same_owner(&self, other: &SsaValue) -> bool {
        self.owner == other.owner
    }
}

impl PartialEq for SsaValue {
    fn eq(&self, other: &Self) -> bool {
        self.number == other.number && self.owner == other.owner && self.ty == other.ty
    }
}

impl Eq for SsaValue {}

impl Hash for SsaValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.number.hash(state);
        self.owner.hash(state);
        self.ty.hash(state);
    }
}

impl fmt::Display for SsaValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.number, self.ty)
    }
}
