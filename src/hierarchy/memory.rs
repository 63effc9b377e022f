//! In-memory class hierarchy.
//!
//! [`TypeHierarchyBuilder`] collects [`ClassInfo`] values; [`TypeHierarchyBuilder::build`]
//! canonicalizes every superclass and interface edge through loader delegation and
//! precomputes the direct-subtype tables. The resulting [`TypeHierarchy`] is immutable and
//! can be shared between threads without locking.

use std::{
    collections::{BTreeSet, HashMap},
    sync::Arc,
};

use crate::{
    hierarchy::{library, ClassBuilder, ClassHierarchy, ClassInfo},
    types::{ClassLoaderRef, TypeName, TypeRef},
    Result,
};

/// Collects classes for a [`TypeHierarchy`].
#[derive(Debug, Default)]
pub struct TypeHierarchyBuilder {
    classes: Vec<ClassInfo>,
}

impl TypeHierarchyBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the bundled subset of the Java core library to the primordial loader.
    ///
    /// # Errors
    ///
    /// Returns an error if a bundled declaration fails to parse, which indicates a bug.
    pub fn core_library(mut self) -> Result<Self> {
        self.classes.extend(library::core_classes()?);
        Ok(self)
    }

    /// Adds a finished class.
    #[must_use]
    pub fn class(mut self, class: ClassInfo) -> Self {
        self.classes.push(class);
        self
    }

    /// Finishes a [`ClassBuilder`] and adds the class.
    ///
    /// # Errors
    ///
    /// Propagates the builder's descriptor errors.
    pub fn declare(self, class: ClassBuilder) -> Result<Self> {
        Ok(self.class(class.build()?))
    }

    /// Freezes the hierarchy.
    ///
    /// Later declarations of the same (loader, name) replace earlier ones.
    #[must_use]
    pub fn build(self) -> TypeHierarchy {
        let mut hierarchy = TypeHierarchy {
            classes: HashMap::new(),
            direct_subclasses: HashMap::new(),
            direct_implementors: HashMap::new(),
            loaders: Vec::new(),
        };

        for class in self.classes {
            if !hierarchy.loaders.contains(&class.reference.loader) {
                hierarchy.loaders.push(class.reference.loader.clone());
            }
            hierarchy
                .classes
                .insert(class.reference.clone(), Arc::new(class));
        }
        hierarchy.loaders.sort_by_key(|loader| loader.delegation_chain().len());

        let mut subclass_edges = Vec::new();
        let mut implements_edges = Vec::new();
        for class in hierarchy.classes.values() {
            if let Some(parent) = class
                .superclass
                .as_ref()
                .and_then(|parent| hierarchy.resolve_declared(parent))
            {
                subclass_edges.push((parent, class.reference.clone()));
            }
            for interface in &class.interfaces {
                if let Some(interface) = hierarchy.resolve_declared(interface) {
                    implements_edges.push((interface, class.reference.clone()));
                }
            }
        }

        for (parent, child) in subclass_edges {
            hierarchy
                .direct_subclasses
                .entry(parent)
                .or_default()
                .insert(child);
        }
        for (interface, implementor) in implements_edges {
            hierarchy
                .direct_implementors
                .entry(interface)
                .or_default()
                .insert(implementor);
        }

        hierarchy
    }
}

/// An immutable, in-memory [`ClassHierarchy`].
///
/// Classes are keyed by their defining loader and name. Resolution follows the
/// parent-first delegation of [`ClassLoaderRef::delegation_chain`], so a core-library class
/// can not be shadowed by an application class of the same name.
///
/// # Examples
///
/// ```rust,ignore
/// let hierarchy = TypeHierarchy::builder()
///     .core_library()?
///     .declare(ClassBuilder::new(TypeRef::application("Lcom/example/Widget")))?
///     .build();
///
/// let string = hierarchy.resolve(&TypeRef::application("Ljava/lang/String"));
/// assert!(string.is_some());
/// ```
#[derive(Debug)]
pub struct TypeHierarchy {
    classes: HashMap<TypeRef, Arc<ClassInfo>>,
    /// Canonical class -> classes naming it as superclass
    direct_subclasses: HashMap<TypeRef, BTreeSet<TypeRef>>,
    /// Canonical interface -> classes and interfaces listing it
    direct_implementors: HashMap<TypeRef, BTreeSet<TypeRef>>,
    loaders: Vec<ClassLoaderRef>,
}

impl TypeHierarchy {
    /// Starts an empty builder.
    #[must_use]
    pub fn builder() -> TypeHierarchyBuilder {
        TypeHierarchyBuilder::new()
    }

    /// A hierarchy holding only the bundled core library.
    ///
    /// # Errors
    ///
    /// Returns an error if a bundled declaration fails to parse.
    pub fn with_core_library() -> Result<Self> {
        Ok(TypeHierarchyBuilder::new().core_library()?.build())
    }

    /// Number of declared classes, synthetic array classes excluded.
    #[must_use]
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// Returns `true` when no class is declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Iterates over the declared classes in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<ClassInfo>> {
        self.classes.values()
    }

    /// Finds the defining reference of a non-array type, parent loader first.
    fn resolve_declared(&self, ty: &TypeRef) -> Option<TypeRef> {
        ty.loader
            .delegation_chain()
            .into_iter()
            .rev()
            .map(|loader| TypeRef::new(loader, ty.name.clone()))
            .find(|candidate| self.classes.contains_key(candidate))
    }

    /// Transitive closure over one of the direct-subtype tables.
    fn closure(table: &HashMap<TypeRef, BTreeSet<TypeRef>>, roots: &[TypeRef]) -> BTreeSet<TypeRef> {
        let mut result = BTreeSet::new();
        let mut worklist: Vec<TypeRef> = roots.to_vec();
        while let Some(current) = worklist.pop() {
            if let Some(children) = table.get(&current) {
                for child in children {
                    if result.insert(child.clone()) {
                        worklist.push(child.clone());
                    }
                }
            }
        }
        result
    }
}

impl ClassHierarchy for TypeHierarchy {
    fn resolve(&self, ty: &TypeRef) -> Option<Arc<ClassInfo>> {
        if ty.is_array() {
            let innermost = TypeRef::new(ty.loader.clone(), ty.name.innermost());
            if innermost.is_void() {
                return None;
            }
            if innermost.is_primitive() {
                return Some(Arc::new(ClassInfo::array(ty.clone())));
            }
            let element = self.resolve_declared(&innermost)?;
            let canonical = TypeRef::new(element.loader, ty.name.clone());
            return Some(Arc::new(ClassInfo::array(canonical)));
        }
        if ty.is_primitive() {
            return None;
        }
        let canonical = self.resolve_declared(ty)?;
        self.classes.get(&canonical).cloned()
    }

    fn subclasses_of(&self, ty: &TypeRef) -> BTreeSet<TypeRef> {
        let Some(class) = self.resolve(ty) else {
            return BTreeSet::new();
        };
        if class.is_array() {
            return BTreeSet::from([class.reference.clone()]);
        }
        let mut result = Self::closure(&self.direct_subclasses, std::slice::from_ref(&class.reference));
        result.insert(class.reference.clone());
        result
    }

    fn implementors_of(&self, ty: &TypeRef) -> BTreeSet<TypeRef> {
        let Some(interface) = self.resolve(ty) else {
            return BTreeSet::new();
        };
        if !interface.is_interface() {
            return BTreeSet::new();
        }

        // Everything listing the interface directly or through a sub-interface
        let listed = Self::closure(
            &self.direct_implementors,
            std::slice::from_ref(&interface.reference),
        );

        let mut result = BTreeSet::new();
        for candidate in listed {
            let is_class = self
                .classes
                .get(&candidate)
                .is_some_and(|class| !class.is_interface());
            if is_class {
                result.extend(self.subclasses_of(&candidate));
            }
        }
        result
    }

    fn loaders(&self) -> Vec<ClassLoaderRef> {
        let mut loaders = self.loaders.clone();
        for standard in [
            ClassLoaderRef::PRIMORDIAL,
            ClassLoaderRef::EXTENSION,
            ClassLoaderRef::APPLICATION,
        ] {
            if !loaders.contains(&standard) {
                loaders.push(standard);
            }
        }
        loaders
    }

    fn lookup_in_any_loader(&self, name: &TypeName) -> Option<Arc<ClassInfo>> {
        if name.is_array() {
            return self
                .loaders()
                .into_iter()
                .find_map(|loader| self.resolve(&TypeRef::new(loader, name.clone())));
        }
        self.loaders
            .iter()
            .find_map(|loader| self.classes.get(&TypeRef::new(loader.clone(), name.clone())))
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        hierarchy::MemberFlags,
        types::well_known,
    };

    #[test]
    fn test_core_library_resolves() -> Result<()> {
        let hierarchy = TypeHierarchy::with_core_library()?;
        for ty in [
            well_known::OBJECT,
            well_known::STRING,
            well_known::CLASS,
            well_known::INSTANTIATION_EXCEPTION,
            well_known::METHOD,
            well_known::SERIALIZABLE,
        ] {
            assert!(hierarchy.resolve(&ty).is_some(), "{ty} should resolve");
        }
        assert!(hierarchy.is_assignable(&well_known::INSTANTIATION_EXCEPTION, &well_known::THROWABLE));
        assert!(hierarchy.is_assignable(&well_known::STRING, &well_known::SERIALIZABLE));
        Ok(())
    }

    #[test]
    fn test_application_can_not_shadow_core() -> Result<()> {
        let hierarchy = TypeHierarchy::builder()
            .core_library()?
            .declare(
                ClassBuilder::new(TypeRef::application("Ljava/lang/String"))
                    .method("fake", "()V", MemberFlags::PUBLIC),
            )?
            .build();

        let string = hierarchy
            .resolve(&TypeRef::application("Ljava/lang/String"))
            .ok_or_else(|| internal_error!("String must resolve"))?;
        assert_eq!(string.reference.loader, ClassLoaderRef::PRIMORDIAL);
        assert!(string.methods.iter().all(|m| m.reference.name() != "fake"));
        Ok(())
    }

    #[test]
    fn test_custom_loader_sees_application() -> Result<()> {
        let hierarchy = TypeHierarchy::builder()
            .core_library()?
            .declare(ClassBuilder::new(TypeRef::application("Lapp/Base")))?
            .declare(
                ClassBuilder::new(TypeRef::new(
                    ClassLoaderRef::named("plugin"),
                    TypeName::from_static("Lplugin/Impl"),
                ))
                .extends(TypeRef::new(
                    ClassLoaderRef::named("plugin"),
                    TypeName::from_static("Lapp/Base"),
                )),
            )?
            .build();

        let subclasses = hierarchy.subclasses_of(&TypeRef::application("Lapp/Base"));
        assert_eq!(subclasses.len(), 2);
        assert!(hierarchy.loaders().contains(&ClassLoaderRef::named("plugin")));
        Ok(())
    }

    #[test]
    fn test_arrays_resolve_synthetically() -> Result<()> {
        let hierarchy = TypeHierarchy::with_core_library()?;
        let ints = hierarchy
            .resolve(&TypeRef::primordial("[I"))
            .ok_or_else(|| internal_error!("int[] must resolve"))?;
        assert!(ints.is_array());
        assert_eq!(ints.superclass, Some(well_known::OBJECT));

        let strings = TypeRef::application("[Ljava/lang/String");
        let resolved = hierarchy
            .resolve(&strings)
            .ok_or_else(|| internal_error!("String[] must resolve"))?;
        assert_eq!(resolved.reference.loader, ClassLoaderRef::PRIMORDIAL);
        assert!(hierarchy.resolve(&TypeRef::application("[Lmissing/Type")).is_none());
        assert_eq!(hierarchy.subclasses_of(&strings).len(), 1);
        Ok(())
    }
}
