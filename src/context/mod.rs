//! Analysis contexts and call-graph nodes.
//!
//! A [`Context`] captures the call-site evidence a synthetic body is specialized to: the
//! type a `Class` object denotes, the method a `Method` object stands for, the caller of
//! a factory. Contexts are plain values with structural equality, so a [`CgNode`]
//! (method plus context) can key caches directly.

mod evidence;
mod idiom;

pub use evidence::{CallerEvidence, InstanceKey, SymbolTable};
pub use idiom::ReflectiveIdiom;

use std::{fmt, sync::Arc};

use crate::{
    ssa::{CallSiteRef, Constant},
    types::{MethodRef, TypeAbstraction, TypeRef},
};

/// The evidence a synthetic body is specialized to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Context {
    /// No specialization
    Everywhere,
    /// The receiver or result denotes these types
    JavaType(TypeAbstraction),
    /// A particular call site in a particular caller
    CallerSite {
        /// The calling node
        caller: Arc<CgNode>,
        /// The call site within the caller
        site: CallSiteRef,
    },
    /// A method lookup on known types by literal name
    GetMethod {
        /// The searched types
        ty: TypeAbstraction,
        /// The literal method name
        name: String,
    },
    /// The receiver is this constant object
    ReceiverInstance(Constant),
    /// An annotation query on a known class or method for a literal annotation type
    GetAnnotation {
        /// The queried element, a class literal or a method object
        target: Constant,
        /// The requested annotation interface
        annotation: TypeRef,
    },
}

impl Context {
    /// The type abstraction of `JavaType` and `GetMethod` contexts.
    #[must_use]
    pub fn type_abstraction(&self) -> Option<&TypeAbstraction> {
        match self {
            Self::JavaType(ty) | Self::GetMethod { ty, .. } => Some(ty),
            _ => None,
        }
    }

    /// The literal name of `GetMethod` contexts.
    #[must_use]
    pub fn method_name(&self) -> Option<&str> {
        match self {
            Self::GetMethod { name, .. } => Some(name),
            _ => None,
        }
    }

    /// The receiver constant of `ReceiverInstance` contexts.
    #[must_use]
    pub fn receiver_constant(&self) -> Option<&Constant> {
        match self {
            Self::ReceiverInstance(constant) => Some(constant),
            _ => None,
        }
    }

    /// Queried element and annotation type of `GetAnnotation` contexts.
    #[must_use]
    pub fn annotation_query(&self) -> Option<(&Constant, &TypeRef)> {
        match self {
            Self::GetAnnotation { target, annotation } => Some((target, annotation)),
            _ => None,
        }
    }

    /// Caller node and site of `CallerSite` contexts.
    #[must_use]
    pub fn caller_site(&self) -> Option<(&Arc<CgNode>, &CallSiteRef)> {
        match self {
            Self::CallerSite { caller, site } => Some((caller, site)),
            _ => None,
        }
    }
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Everywhere => f.write_str("Everywhere"),
            Self::JavaType(ty) => write!(f, "JavaType({ty})"),
            Self::CallerSite { caller, site } => {
                write!(f, "CallerSite({} @{})", caller.method, site.pc)
            }
            Self::GetMethod { ty, name } => write!(f, "GetMethod({ty}, {name:?})"),
            Self::ReceiverInstance(constant) => write!(f, "ReceiverInstance({constant})"),
            Self::GetAnnotation { target, annotation } => {
                write!(f, "GetAnnotation({target}, {annotation})")
            }
        }
    }
}

/// A call-graph node: a method analyzed under a context.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CgNode {
    /// The analyzed method
    pub method: MethodRef,
    /// The context it is analyzed under
    pub context: Context,
}

impl CgNode {
    /// Creates a node.
    #[must_use]
    pub fn new(method: MethodRef, context: Context) -> Self {
        Self { method, context }
    }
}

impl fmt::Display for CgNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} in {}", self.method, self.context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::well_known;

    #[test]
    fn test_structural_equality() {
        let a = CgNode::new(
            well_known::class_new_instance(),
            Context::JavaType(TypeAbstraction::set([
                TypeRef::application("LB"),
                TypeRef::application("LA"),
            ])),
        );
        let b = CgNode::new(
            well_known::class_new_instance(),
            Context::JavaType(TypeAbstraction::set([
                TypeRef::application("LA"),
                TypeRef::application("LB"),
            ])),
        );
        assert_eq!(a, b);
        assert!(a.context.type_abstraction().is_some());
        assert!(a.context.method_name().is_none());
        assert_eq!(
            a.to_string(),
            "Ljava/lang/Class.newInstance()Ljava/lang/Object; in JavaType(Set{LA,LB})"
        );
    }

    #[test]
    fn test_annotation_query() {
        let context = Context::GetAnnotation {
            target: Constant::Type(TypeRef::application("Lapp/Widget")),
            annotation: TypeRef::application("Lapp/Plugin"),
        };
        let Some((target, annotation)) = context.annotation_query() else {
            panic!("annotation context must expose its query");
        };
        assert_eq!(target.as_type(), Some(&TypeRef::application("Lapp/Widget")));
        assert_eq!(annotation.name.as_str(), "Lapp/Plugin");
        assert!(context.type_abstraction().is_none());
        assert_eq!(context.to_string(), "GetAnnotation(Lapp/Widget.class, Lapp/Plugin)");
    }
}
