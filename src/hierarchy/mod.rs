//! Class hierarchy queries.
//!
//! Reflective synthesis needs a handful of facts about the analyzed program: which
//! classes exist, what they declare, and how they relate. The [`ClassHierarchy`] trait
//! is the seam through which those facts arrive. A whole-program analysis plugs its own
//! class hierarchy in; [`TypeHierarchy`] is an in-memory implementation that hosts and
//! tests populate through [`ClassBuilder`].
//!
//! # Subtype queries
//!
//! - [`ClassHierarchy::subclasses_of`] returns the class itself plus every transitive
//!   subclass
//! - [`ClassHierarchy::implementors_of`] returns every class that implements an
//!   interface, directly, through a super-interface or through a superclass. The
//!   interface itself is never part of the answer
//!
//! # Assignability
//!
//! [`ClassHierarchy::is_assignable`] answers whether a value of one type may be stored
//! where another type is expected. Primitive widening, array covariance and the
//! `Object`/`Cloneable`/`Serializable` supertypes of arrays are handled by the provided
//! implementation in terms of [`ClassHierarchy::resolve`].

mod class;
mod library;
mod memory;

pub use class::{
    Annotation, ClassBuilder, ClassFlags, ClassInfo, FieldInfo, MemberFlags, MethodInfo,
};
pub use memory::{TypeHierarchy, TypeHierarchyBuilder};

use std::{
    collections::{BTreeSet, HashSet},
    sync::Arc,
};

use crate::types::{well_known, ClassLoaderRef, MethodRef, TypeName, TypeRef};

/// Read-only view of the analyzed program's classes.
///
/// Only [`resolve`](Self::resolve), [`subclasses_of`](Self::subclasses_of),
/// [`implementors_of`](Self::implementors_of) and [`loaders`](Self::loaders) must be
/// implemented; everything else is derived from them.
pub trait ClassHierarchy: Send + Sync {
    /// Resolves a type reference through its loader's delegation chain.
    ///
    /// Array types resolve to a synthetic array class when their innermost element
    /// type is primitive or resolves itself.
    fn resolve(&self, ty: &TypeRef) -> Option<Arc<ClassInfo>>;

    /// The resolved class plus all of its transitive subclasses.
    ///
    /// Empty when the type does not resolve.
    fn subclasses_of(&self, ty: &TypeRef) -> BTreeSet<TypeRef>;

    /// All classes implementing the interface, excluding the interface itself.
    ///
    /// Empty when the type does not resolve or is not an interface.
    fn implementors_of(&self, ty: &TypeRef) -> BTreeSet<TypeRef>;

    /// The class loaders that define at least one class, in lookup order.
    fn loaders(&self) -> Vec<ClassLoaderRef>;

    /// Looks a name up in every known loader and returns the first hit.
    fn lookup_in_any_loader(&self, name: &TypeName) -> Option<Arc<ClassInfo>> {
        self.loaders()
            .into_iter()
            .find_map(|loader| self.resolve(&TypeRef::new(loader, name.clone())))
    }

    /// The class followed by its superclasses up to `java.lang.Object`.
    fn superclass_chain(&self, ty: &TypeRef) -> Vec<Arc<ClassInfo>> {
        let mut chain = Vec::new();
        let mut seen = HashSet::new();
        let mut current = self.resolve(ty);
        while let Some(class) = current {
            if !seen.insert(class.reference.clone()) {
                break;
            }
            current = class
                .superclass
                .as_ref()
                .and_then(|parent| self.resolve(parent));
            chain.push(class);
        }
        chain
    }

    /// All interfaces the type implements, transitively, in breadth-first order.
    fn all_interfaces(&self, ty: &TypeRef) -> Vec<Arc<ClassInfo>> {
        let mut result: Vec<Arc<ClassInfo>> = Vec::new();
        let mut seen = HashSet::new();
        let mut worklist: Vec<TypeRef> = Vec::new();

        for class in self.superclass_chain(ty) {
            worklist.extend(class.interfaces.iter().cloned());
        }

        let mut index = 0;
        while index < worklist.len() {
            let next = worklist[index].clone();
            index += 1;
            let Some(interface) = self.resolve(&next) else {
                continue;
            };
            if seen.insert(interface.reference.clone()) {
                worklist.extend(interface.interfaces.iter().cloned());
                result.push(interface);
            }
        }
        result
    }

    /// Finds the declaration a method reference binds to.
    ///
    /// Looks in the declaring class, then its superclasses, then its interfaces.
    fn resolve_method(&self, method: &MethodRef) -> Option<MethodInfo> {
        let selector = &method.selector;
        self.superclass_chain(&method.declaring)
            .iter()
            .find_map(|class| class.declared_method(selector).cloned())
            .or_else(|| {
                self.all_interfaces(&method.declaring)
                    .iter()
                    .find_map(|interface| interface.declared_method(selector).cloned())
            })
    }

    /// Every declaration a call through `method` may reach at runtime.
    ///
    /// Constructors, static and private methods have at most one target. Other methods
    /// reach the resolved declaration plus every override in a subtype of the declaring
    /// class, found by class hierarchy analysis.
    fn possible_targets(&self, method: &MethodRef) -> Vec<MethodInfo> {
        let Some(resolved) = self.resolve_method(method) else {
            return Vec::new();
        };
        if resolved.is_init() || resolved.is_static() || resolved.is_private() {
            return vec![resolved];
        }

        let declaring = self.resolve(&method.declaring);
        let subtypes = match &declaring {
            Some(class) if class.is_interface() => self.implementors_of(&class.reference),
            Some(class) => self.subclasses_of(&class.reference),
            None => BTreeSet::new(),
        };

        let mut targets = vec![resolved];
        for subtype in subtypes {
            let Some(class) = self.resolve(&subtype) else {
                continue;
            };
            if let Some(overrider) = class.declared_method(&method.selector) {
                if !targets.contains(overrider) {
                    targets.push(overrider.clone());
                }
            }
        }
        targets
    }

    /// Methods visible on the type: declared ones first, then inherited ones that are
    /// not overridden, then interface methods without an implementation.
    fn all_methods(&self, ty: &TypeRef) -> Vec<MethodInfo> {
        let mut result: Vec<MethodInfo> = Vec::new();
        let chain = self.superclass_chain(ty);
        let interfaces = self.all_interfaces(ty);
        for class in chain.iter().chain(interfaces.iter()) {
            for method in &class.methods {
                if !result.iter().any(|m| m.selector() == method.selector()) {
                    result.push(method.clone());
                }
            }
        }
        result
    }

    /// Returns `true` when `sub` is `sup` or inherits from it through superclasses or
    /// interfaces. Both types must resolve.
    fn is_subtype(&self, sub: &TypeRef, sup: &TypeRef) -> bool {
        let Some(target) = self.resolve(sup) else {
            return false;
        };
        if self
            .superclass_chain(sub)
            .iter()
            .any(|class| class.reference == target.reference)
        {
            return true;
        }
        target.is_interface()
            && self
                .all_interfaces(sub)
                .iter()
                .any(|interface| interface.reference == target.reference)
    }

    /// Returns `true` if a value of type `from` may be stored where `to` is expected.
    ///
    /// Same name is always assignable; two primitives follow the widening rules; a
    /// primitive and a reference never mix. For references, an unresolvable `to` is not
    /// assignable; callers that want to be lenient about unresolvable `from` types have
    /// to check resolution themselves.
    fn is_assignable(&self, from: &TypeRef, to: &TypeRef) -> bool {
        if from.name == to.name {
            return true;
        }
        match (from.primitive(), to.primitive()) {
            (Some(a), Some(b)) => return a.widens_to(b),
            (Some(_), None) | (None, Some(_)) => return false,
            (None, None) => {}
        }
        if to.name == well_known::OBJECT.name {
            return true;
        }

        match (from.element_type(), to.element_type()) {
            (Some(from_element), Some(to_element)) => {
                if from_element.is_primitive() || to_element.is_primitive() {
                    from_element.name == to_element.name
                } else {
                    self.is_assignable(&from_element, &to_element)
                }
            }
            (Some(_), None) => {
                to.name == well_known::CLONEABLE.name || to.name == well_known::SERIALIZABLE.name
            }
            (None, Some(_)) => false,
            (None, None) => self.is_subtype(from, to),
        }
    }
}
