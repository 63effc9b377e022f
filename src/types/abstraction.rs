//! Abstractions over sets of runtime types.

use std::{collections::BTreeSet, fmt};

use crate::types::TypeRef;

/// A description of the runtime types a value may have.
///
/// `Cone` stands for the type plus all of its subclasses (for classes) or all
/// implementors (for interfaces). `Set` keeps its members sorted and de-duplicated,
/// so two sets with the same members compare and hash equal regardless of the
/// order they were built in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TypeAbstraction {
    /// Exactly this type
    Exact(TypeRef),
    /// This type and every subtype
    Cone(TypeRef),
    /// Any of these exact types
    Set(Vec<TypeRef>),
}

impl TypeAbstraction {
    /// An exact type.
    #[must_use]
    pub fn exact(ty: TypeRef) -> Self {
        Self::Exact(ty)
    }

    /// A type cone.
    #[must_use]
    pub fn cone(ty: TypeRef) -> Self {
        Self::Cone(ty)
    }

    /// A set of exact types. A single member collapses to [`TypeAbstraction::Exact`].
    #[must_use]
    pub fn set(types: impl IntoIterator<Item = TypeRef>) -> Self {
        let mut members: Vec<TypeRef> = types
            .into_iter()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        if members.len() == 1 {
            if let Some(only) = members.pop() {
                return Self::Exact(only);
            }
        }
        Self::Set(members)
    }

    /// The single type of an `Exact` or `Cone` abstraction.
    #[must_use]
    pub fn primary_type(&self) -> Option<&TypeRef> {
        match self {
            Self::Exact(ty) | Self::Cone(ty) => Some(ty),
            Self::Set(_) => None,
        }
    }

    /// Returns `true` for `Exact`.
    #[must_use]
    pub fn is_exact(&self) -> bool {
        matches!(self, Self::Exact(_))
    }

    /// The types named by this abstraction (not the cone's subtypes).
    pub fn types(&self) -> impl Iterator<Item = &TypeRef> {
        let slice: &[TypeRef] = match self {
            Self::Exact(ty) | Self::Cone(ty) => std::slice::from_ref(ty),
            Self::Set(types) => types,
        };
        slice.iter()
    }

    /// Combines two abstractions into one that covers both.
    ///
    /// Equal abstractions meet to themselves; a cone absorbs an exact type when the
    /// `is_subtype` oracle says the exact type lies inside it; everything else
    /// becomes the set union of the named types, widened to the cone when one side
    /// is a cone that covers all named types.
    #[must_use]
    pub fn meet(&self, other: &Self, is_subtype: impl Fn(&TypeRef, &TypeRef) -> bool) -> Self {
        if self == other {
            return self.clone();
        }
        for (cone, rest) in [(self, other), (other, self)] {
            if let Self::Cone(root) = cone {
                if rest.types().all(|ty| is_subtype(ty, root)) {
                    return cone.clone();
                }
            }
        }
        Self::set(self.types().chain(other.types()).cloned())
    }
}

impl fmt::Display for TypeAbstraction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(ty) => write!(f, "Exact({ty})"),
            Self::Cone(ty) => write!(f, "Cone({ty})"),
            Self::Set(types) => {
                f.write_str("Set{")?;
                for (i, ty) in types.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{ty}")?;
                }
                f.write_str("}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ty(name: &str) -> TypeRef {
        TypeRef::application(name)
    }

    #[test]
    fn test_set_is_order_independent() {
        let a = TypeAbstraction::set([ty("LB"), ty("LA"), ty("LB")]);
        let b = TypeAbstraction::set([ty("LA"), ty("LB")]);
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "Set{LA,LB}");
    }

    #[test]
    fn test_singleton_set_collapses() {
        assert_eq!(
            TypeAbstraction::set([ty("LA")]),
            TypeAbstraction::exact(ty("LA"))
        );
    }

    #[test]
    fn test_meet() {
        let cone = TypeAbstraction::cone(ty("LBase"));
        let sub = TypeAbstraction::exact(ty("LSub"));
        let other = TypeAbstraction::exact(ty("LOther"));
        let is_subtype = |a: &TypeRef, b: &TypeRef| a == b || (a.name.as_str() == "LSub" && b.name.as_str() == "LBase");

        assert_eq!(cone.meet(&sub, is_subtype), cone);
        assert_eq!(sub.meet(&cone, is_subtype), cone);
        assert_eq!(
            sub.meet(&other, is_subtype),
            TypeAbstraction::set([ty("LSub"), ty("LOther")])
        );
        assert_eq!(cone.primary_type(), Some(&ty("LBase")));
        assert!(TypeAbstraction::set([ty("LA"), ty("LB")]).primary_type().is_none());
    }
}
