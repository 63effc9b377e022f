//! Resolved class, method and field descriptions.
//!
//! These are the answers the [`ClassHierarchy`](super::ClassHierarchy) hands out. They
//! carry exactly the facts reflective synthesis needs: modifiers, the superclass and
//! interface edges, and the declared members.

use std::collections::BTreeMap;

use bitflags::bitflags;

use crate::{
    ssa::Constant,
    types::{well_known, Descriptor, FieldRef, MethodRef, Selector, TypeName, TypeRef},
    Error, Result,
};

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    /// Class-level modifiers
    pub struct ClassFlags: u16 {
        /// Visible outside its package
        const PUBLIC = 0x0001;
        /// Can not be subclassed
        const FINAL = 0x0010;
        /// Is an interface
        const INTERFACE = 0x0200;
        /// Can not be instantiated
        const ABSTRACT = 0x0400;
        /// Generated by a compiler
        const SYNTHETIC = 0x1000;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    /// Method and field modifiers
    pub struct MemberFlags: u16 {
        /// Visible everywhere
        const PUBLIC = 0x0001;
        /// Visible only inside the declaring class
        const PRIVATE = 0x0002;
        /// Visible to subclasses and the package
        const PROTECTED = 0x0004;
        /// Belongs to the class rather than to instances
        const STATIC = 0x0008;
        /// Can not be overridden (methods) or reassigned (fields)
        const FINAL = 0x0010;
        /// Implemented outside the bytecode
        const NATIVE = 0x0100;
        /// Has no body
        const ABSTRACT = 0x0400;
        /// Generated by a compiler
        const SYNTHETIC = 0x1000;
    }
}

/// A runtime-visible annotation attached to a class or method.
///
/// Element values are literals keyed by element name. Elements the class file leaves at
/// their default are absent.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Annotation {
    /// The annotation interface
    pub ty: TypeRef,
    /// Explicit element values by name
    pub elements: BTreeMap<String, Constant>,
}

impl Annotation {
    /// An annotation without explicit elements.
    #[must_use]
    pub fn new(ty: TypeRef) -> Self {
        Self {
            ty,
            elements: BTreeMap::new(),
        }
    }

    /// Adds an element value.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: Constant) -> Self {
        self.elements.insert(name.into(), value);
        self
    }
}

/// A method declared by a class.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodInfo {
    /// Reference with the declaring class as written in the class file
    pub reference: MethodRef,
    /// Modifiers
    pub flags: MemberFlags,
    /// Runtime-visible annotations
    pub annotations: Vec<Annotation>,
}

impl MethodInfo {
    /// Creates a method description.
    #[must_use]
    pub fn new(reference: MethodRef, flags: MemberFlags) -> Self {
        Self {
            reference,
            flags,
            annotations: Vec::new(),
        }
    }

    /// The annotation of type `ty`, if present.
    #[must_use]
    pub fn annotation(&self, ty: &TypeRef) -> Option<&Annotation> {
        self.annotations.iter().find(|a| a.ty.name == ty.name)
    }

    /// Name and descriptor.
    #[must_use]
    pub fn selector(&self) -> &Selector {
        &self.reference.selector
    }

    /// Returns `true` for static methods.
    ///
    /// Constructors are never static, whatever their flags say.
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.flags.contains(MemberFlags::STATIC) && !self.is_init()
    }

    /// Returns `true` for public methods.
    #[must_use]
    pub fn is_public(&self) -> bool {
        self.flags.contains(MemberFlags::PUBLIC)
    }

    /// Returns `true` for private methods.
    #[must_use]
    pub fn is_private(&self) -> bool {
        self.flags.contains(MemberFlags::PRIVATE)
    }

    /// Returns `true` for abstract methods.
    #[must_use]
    pub fn is_abstract(&self) -> bool {
        self.flags.contains(MemberFlags::ABSTRACT)
    }

    /// Returns `true` for constructors.
    #[must_use]
    pub fn is_init(&self) -> bool {
        self.reference.selector.is_init()
    }

    /// Returns `true` for static initializers.
    #[must_use]
    pub fn is_clinit(&self) -> bool {
        self.reference.selector.is_clinit()
    }
}

/// A field declared by a class.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldInfo {
    /// Reference with the declaring class
    pub reference: FieldRef,
    /// Modifiers
    pub flags: MemberFlags,
}

impl FieldInfo {
    /// Returns `true` for static fields.
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.flags.contains(MemberFlags::STATIC)
    }
}

/// A resolved class or interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassInfo {
    /// The defining loader and name
    pub reference: TypeRef,
    /// Class modifiers
    pub flags: ClassFlags,
    /// Direct superclass, `None` for `java.lang.Object` and interfaces
    pub superclass: Option<TypeRef>,
    /// Directly implemented (or, for interfaces, extended) interfaces
    pub interfaces: Vec<TypeRef>,
    /// Declared methods
    pub methods: Vec<MethodInfo>,
    /// Declared fields
    pub fields: Vec<FieldInfo>,
    /// Runtime-visible annotations
    pub annotations: Vec<Annotation>,
}

impl ClassInfo {
    /// Returns `true` for interfaces.
    #[must_use]
    pub fn is_interface(&self) -> bool {
        self.flags.contains(ClassFlags::INTERFACE)
    }

    /// Returns `true` for abstract classes and interfaces.
    #[must_use]
    pub fn is_abstract(&self) -> bool {
        self.flags.intersects(ClassFlags::ABSTRACT | ClassFlags::INTERFACE)
    }

    /// Returns `true` for public classes.
    #[must_use]
    pub fn is_public(&self) -> bool {
        self.flags.contains(ClassFlags::PUBLIC)
    }

    /// Returns `true` for array classes.
    #[must_use]
    pub fn is_array(&self) -> bool {
        self.reference.is_array()
    }

    /// Looks up a declared method by selector.
    #[must_use]
    pub fn declared_method(&self, selector: &Selector) -> Option<&MethodInfo> {
        self.methods.iter().find(|m| m.selector() == selector)
    }

    /// Declared constructors in declaration order.
    pub fn constructors(&self) -> impl Iterator<Item = &MethodInfo> {
        self.methods.iter().filter(|m| m.is_init())
    }

    /// The declared no-argument constructor, if any.
    #[must_use]
    pub fn default_constructor(&self) -> Option<&MethodInfo> {
        self.declared_method(&Selector::default_init())
    }

    /// The annotation of type `ty`, if present.
    ///
    /// Annotation types are matched by name: the annotated class and the annotation
    /// interface may come from different loaders.
    #[must_use]
    pub fn annotation(&self, ty: &TypeRef) -> Option<&Annotation> {
        self.annotations.iter().find(|a| a.ty.name == ty.name)
    }

    /// Declared instance (non-static) fields in declaration order.
    pub fn instance_fields(&self) -> impl Iterator<Item = &FieldInfo> {
        self.fields.iter().filter(|f| !f.is_static())
    }

    /// Builds the synthetic class object for an array type.
    ///
    /// Arrays are public and final, extend `Object` and implement `Cloneable`
    /// and `Serializable`. They declare no members.
    #[must_use]
    pub fn array(reference: TypeRef) -> Self {
        Self {
            reference,
            flags: ClassFlags::PUBLIC | ClassFlags::FINAL,
            superclass: Some(well_known::OBJECT),
            interfaces: vec![well_known::CLONEABLE, well_known::SERIALIZABLE],
            methods: Vec::new(),
            fields: Vec::new(),
            annotations: Vec::new(),
        }
    }
}

/// Fluent construction of [`ClassInfo`] values.
///
/// Malformed descriptors are remembered and reported by [`ClassBuilder::build`], so a
/// chain of calls never needs intermediate error handling.
///
/// # Examples
///
/// ```rust,ignore
/// let widget = ClassBuilder::new(TypeRef::application("Lcom/example/Widget"))
///     .implements(TypeRef::application("Lcom/example/Component"))
///     .constructor("()V", MemberFlags::PUBLIC)
///     .method("render", "(I)V", MemberFlags::PUBLIC)
///     .field("name", "Ljava/lang/String", MemberFlags::PRIVATE)
///     .build()?;
/// ```
#[derive(Debug, Clone)]
pub struct ClassBuilder {
    info: ClassInfo,
    error: Option<Error>,
}

impl ClassBuilder {
    /// Starts a public class extending `java.lang.Object`.
    #[must_use]
    pub fn new(reference: TypeRef) -> Self {
        let superclass = if reference == well_known::OBJECT {
            None
        } else {
            Some(well_known::OBJECT)
        };
        Self {
            info: ClassInfo {
                reference,
                flags: ClassFlags::PUBLIC,
                superclass,
                interfaces: Vec::new(),
                methods: Vec::new(),
                fields: Vec::new(),
                annotations: Vec::new(),
            },
            error: None,
        }
    }

    /// Starts a public interface.
    #[must_use]
    pub fn interface(reference: TypeRef) -> Self {
        let mut builder = Self::new(reference);
        builder.info.flags |= ClassFlags::INTERFACE | ClassFlags::ABSTRACT;
        builder.info.superclass = None;
        builder
    }

    /// Replaces the class modifiers, keeping the interface bit of interfaces.
    #[must_use]
    pub fn flags(mut self, flags: ClassFlags) -> Self {
        let interface = self.info.flags & ClassFlags::INTERFACE;
        self.info.flags = flags | interface;
        self
    }

    /// Marks the class abstract.
    #[must_use]
    pub fn abstract_class(mut self) -> Self {
        self.info.flags |= ClassFlags::ABSTRACT;
        self
    }

    /// Marks the class final.
    #[must_use]
    pub fn final_class(mut self) -> Self {
        self.info.flags |= ClassFlags::FINAL;
        self
    }

    /// Sets the direct superclass.
    #[must_use]
    pub fn extends(mut self, superclass: TypeRef) -> Self {
        self.info.superclass = Some(superclass);
        self
    }

    /// Adds a directly implemented (or extended) interface.
    #[must_use]
    pub fn implements(mut self, interface: TypeRef) -> Self {
        self.info.interfaces.push(interface);
        self
    }

    /// Declares a method from a JVM descriptor string.
    #[must_use]
    pub fn method(mut self, name: &str, descriptor: &str, flags: MemberFlags) -> Self {
        match MethodRef::parse(self.info.reference.clone(), name.to_string(), descriptor) {
            Ok(reference) => self.info.methods.push(MethodInfo::new(reference, flags)),
            Err(error) => {
                self.error.get_or_insert(error);
            }
        }
        self
    }

    /// Declares a constructor from a JVM descriptor string (`V` return).
    #[must_use]
    pub fn constructor(self, descriptor: &str, flags: MemberFlags) -> Self {
        self.method(Selector::INIT, descriptor, flags)
    }

    /// Declares a field; `field_type` is a type name in descriptor form without `;`.
    #[must_use]
    pub fn field(mut self, name: &str, field_type: &str, flags: MemberFlags) -> Self {
        let reference = FieldRef::new(
            self.info.reference.clone(),
            name.to_string(),
            TypeName::new(field_type),
        );
        self.info.fields.push(FieldInfo { reference, flags });
        self
    }

    /// Attaches an annotation to the class.
    #[must_use]
    pub fn annotated(mut self, annotation: Annotation) -> Self {
        self.info.annotations.push(annotation);
        self
    }

    /// Attaches an annotation to a method declared earlier in the chain.
    #[must_use]
    pub fn annotate_method(mut self, name: &str, descriptor: &str, annotation: Annotation) -> Self {
        let target = Descriptor::parse(descriptor).and_then(|parsed| {
            let selector = Selector::new(name.to_string(), parsed);
            self.info
                .methods
                .iter_mut()
                .find(|m| m.reference.selector == selector)
                .ok_or_else(|| {
                    Error::InvalidArgument(format!(
                        "{}.{name}{descriptor} is not declared",
                        self.info.reference
                    ))
                })
        });
        match target {
            Ok(method) => method.annotations.push(annotation),
            Err(error) => {
                self.error.get_or_insert(error);
            }
        }
        self
    }

    /// Finishes the class.
    ///
    /// # Errors
    ///
    /// Returns the first descriptor error encountered while declaring methods, or
    /// [`Error::InvalidArgument`] when a constructor does not return `void`.
    pub fn build(self) -> Result<ClassInfo> {
        if let Some(error) = self.error {
            return Err(error);
        }
        if let Some(bad) = self
            .info
            .methods
            .iter()
            .find(|m| m.is_init() && m.reference.returns_value())
        {
            return Err(Error::InvalidArgument(format!(
                "constructor {} must return void",
                bad.reference
            )));
        }
        Ok(self.info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_collects_members() -> Result<()> {
        let class = ClassBuilder::new(TypeRef::application("Lcom/example/Widget"))
            .constructor("()V", MemberFlags::PUBLIC)
            .constructor("(I)V", MemberFlags::PRIVATE)
            .method("render", "(I)V", MemberFlags::PUBLIC)
            .field("name", "Ljava/lang/String", MemberFlags::PRIVATE)
            .field("COUNT", "I", MemberFlags::STATIC)
            .build()?;

        assert_eq!(class.superclass, Some(well_known::OBJECT));
        assert_eq!(class.constructors().count(), 2);
        assert!(class.default_constructor().is_some_and(MethodInfo::is_public));
        assert_eq!(class.instance_fields().count(), 1);
        assert!(!class.is_abstract());
        Ok(())
    }

    #[test]
    fn test_builder_reports_bad_descriptor() {
        let result = ClassBuilder::new(TypeRef::application("LBroken"))
            .method("oops", "(Lunterminated)V", MemberFlags::PUBLIC)
            .build();
        assert!(matches!(result, Err(Error::InvalidArgument(_))));

        let result = ClassBuilder::new(TypeRef::application("LBroken"))
            .constructor("()I", MemberFlags::PUBLIC)
            .build();
        assert!(matches!(result, Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_interface_flags() -> Result<()> {
        let iface = ClassBuilder::interface(TypeRef::application("LShape")).build()?;
        assert!(iface.is_interface());
        assert!(iface.is_abstract());
        assert!(iface.superclass.is_none());

        let object = ClassBuilder::new(well_known::OBJECT).build()?;
        assert!(object.superclass.is_none());
        Ok(())
    }

    #[test]
    fn test_annotations_attach_to_class_and_method() -> Result<()> {
        let marker = TypeRef::application("Lapp/Plugin");
        let class = ClassBuilder::new(TypeRef::application("Lapp/Widget"))
            .annotated(Annotation::new(marker.clone()).with("value", Constant::String("w".into())))
            .method("render", "(I)V", MemberFlags::PUBLIC)
            .annotate_method("render", "(I)V", Annotation::new(marker.clone()))
            .build()?;

        let on_class = class
            .annotation(&TypeRef::primordial("Lapp/Plugin"))
            .ok_or_else(|| internal_error!("class annotation missing"))?;
        assert_eq!(on_class.elements.get("value"), Some(&Constant::String("w".into())));
        assert!(class.methods[0].annotation(&marker).is_some());
        assert!(class.annotation(&well_known::ANNOTATION).is_none());

        let missing = ClassBuilder::new(TypeRef::application("Lapp/Widget"))
            .annotate_method("render", "()V", Annotation::new(marker))
            .build();
        assert!(matches!(missing, Err(Error::InvalidArgument(_))));
        Ok(())
    }

    #[test]
    fn test_static_init_is_never_static() {
        let init = MethodInfo::new(
            MethodRef::new(TypeRef::application("LFoo"), Selector::default_init()),
            MemberFlags::STATIC | MemberFlags::PUBLIC,
        );
        assert!(!init.is_static());
    }
}
