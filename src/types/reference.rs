//! References to types, methods and fields.
//!
//! A reference names a program element without resolving it. Resolution happens
//! through the [`ClassHierarchy`](crate::hierarchy::ClassHierarchy), which may or may
//! not know the element.

use std::{borrow::Cow, fmt};

use crate::{
    types::name::{ClassLoaderRef, PrimitiveType, TypeName},
    Error, Result,
};

/// Reference to a type as seen by one class loader.
///
/// Primitive types always live in the primordial loader; array types live in the
/// loader of their innermost element type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeRef {
    /// The loader the reference is interpreted in
    pub loader: ClassLoaderRef,
    /// The descriptor-form name
    pub name: TypeName,
}

impl TypeRef {
    /// Creates a type reference, moving primitive names into the primordial loader.
    #[must_use]
    pub fn new(loader: ClassLoaderRef, name: TypeName) -> Self {
        if name.innermost().is_primitive() {
            Self {
                loader: ClassLoaderRef::PRIMORDIAL,
                name,
            }
        } else {
            Self { loader, name }
        }
    }

    /// Creates a reference from static strings, usable in `const` items.
    #[must_use]
    pub const fn from_static(loader: ClassLoaderRef, name: &'static str) -> Self {
        Self {
            loader,
            name: TypeName::from_static(name),
        }
    }

    /// Creates a reference in the primordial loader.
    #[must_use]
    pub fn primordial(name: impl Into<String>) -> Self {
        Self::new(ClassLoaderRef::PRIMORDIAL, TypeName::new(name))
    }

    /// Creates a reference in the application loader.
    #[must_use]
    pub fn application(name: impl Into<String>) -> Self {
        Self::new(ClassLoaderRef::APPLICATION, TypeName::new(name))
    }

    /// Returns `true` for array types.
    #[must_use]
    pub fn is_array(&self) -> bool {
        self.name.is_array()
    }

    /// Returns `true` for primitive types, `void` included.
    #[must_use]
    pub fn is_primitive(&self) -> bool {
        self.name.is_primitive()
    }

    /// Returns `true` for non-primitive types.
    #[must_use]
    pub fn is_reference(&self) -> bool {
        !self.name.is_primitive()
    }

    /// Returns `true` for `void`.
    #[must_use]
    pub fn is_void(&self) -> bool {
        self.name.primitive() == Some(PrimitiveType::Void)
    }

    /// Returns the primitive type, if any.
    #[must_use]
    pub fn primitive(&self) -> Option<PrimitiveType> {
        self.name.primitive()
    }

    /// The element type of an array type.
    #[must_use]
    pub fn element_type(&self) -> Option<TypeRef> {
        self.name
            .element()
            .map(|element| TypeRef::new(self.loader.clone(), element))
    }

    /// The array type with `self` as element type.
    #[must_use]
    pub fn array_of(&self) -> TypeRef {
        TypeRef::new(self.loader.clone(), self.name.array_of())
    }

    /// Resolves a name the way a member of this type sees it: same loader.
    #[must_use]
    pub fn sibling(&self, name: &TypeName) -> TypeRef {
        TypeRef::new(self.loader.clone(), name.clone())
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Parameter and return types of a method.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Descriptor {
    /// Declared parameter types, receiver excluded
    pub params: Vec<TypeName>,
    /// Return type, `V` for void
    pub ret: TypeName,
}

impl Descriptor {
    /// Creates a descriptor from its parts.
    #[must_use]
    pub fn new(params: Vec<TypeName>, ret: TypeName) -> Self {
        Self { params, ret }
    }

    /// Parses a JVM method descriptor such as `(Ljava/lang/String;I)V`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] for malformed descriptors.
    pub fn parse(descriptor: &str) -> Result<Self> {
        let malformed = || Error::InvalidArgument(format!("malformed descriptor {descriptor}"));

        let inner = descriptor.strip_prefix('(').ok_or_else(malformed)?;
        let (params_part, ret_part) = inner.split_once(')').ok_or_else(malformed)?;

        let mut params = Vec::new();
        let mut rest = params_part;
        while !rest.is_empty() {
            let (name, tail) = Self::split_type(rest).ok_or_else(malformed)?;
            if name.primitive() == Some(PrimitiveType::Void) {
                return Err(malformed());
            }
            params.push(name);
            rest = tail;
        }

        let (ret, tail) = Self::split_type(ret_part).ok_or_else(malformed)?;
        if !tail.is_empty() {
            return Err(malformed());
        }

        Ok(Self { params, ret })
    }

    fn split_type(input: &str) -> Option<(TypeName, &str)> {
        let dims = input.bytes().take_while(|&b| b == b'[').count();
        let rest = &input[dims..];
        let first = rest.chars().next()?;
        if first == 'L' {
            let end = rest.find(';')?;
            let name = format!("{}{}", "[".repeat(dims), &rest[..end]);
            Some((TypeName::new(name), &rest[end + 1..]))
        } else {
            let letter = rest.get(..1)?;
            PrimitiveType::from_descriptor(letter)?;
            if dims > 0 && letter == "V" {
                return None;
            }
            let name = format!("{}{}", "[".repeat(dims), letter);
            Some((TypeName::new(name), &rest[1..]))
        }
    }
}

impl fmt::Display for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for param in &self.params {
            f.write_str(&param.to_descriptor())?;
        }
        write!(f, "){}", self.ret.to_descriptor())
    }
}

/// Method name plus descriptor; the part of a method reference that overriding preserves.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Selector {
    /// Method name (`<init>` for constructors, `<clinit>` for static initializers)
    pub name: Cow<'static, str>,
    /// Parameter and return types
    pub descriptor: Descriptor,
}

impl Selector {
    /// Name of instance initializers.
    pub const INIT: &'static str = "<init>";
    /// Name of static initializers.
    pub const CLINIT: &'static str = "<clinit>";

    /// Creates a selector.
    #[must_use]
    pub fn new(name: impl Into<Cow<'static, str>>, descriptor: Descriptor) -> Self {
        Self {
            name: name.into(),
            descriptor,
        }
    }

    /// The no-argument constructor selector `<init>()V`.
    #[must_use]
    pub fn default_init() -> Self {
        Self::new(
            Self::INIT,
            Descriptor::new(Vec::new(), TypeName::from_static("V")),
        )
    }

    /// Returns `true` for `<init>`.
    #[must_use]
    pub fn is_init(&self) -> bool {
        self.name == Self::INIT
    }

    /// Returns `true` for `<clinit>`.
    #[must_use]
    pub fn is_clinit(&self) -> bool {
        self.name == Self::CLINIT
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.name, self.descriptor)
    }
}

/// Reference to a method: declaring type plus selector.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MethodRef {
    /// The class the reference names as declaring class
    pub declaring: TypeRef,
    /// Name and descriptor
    pub selector: Selector,
}

impl MethodRef {
    /// Creates a method reference from its parts.
    #[must_use]
    pub fn new(declaring: TypeRef, selector: Selector) -> Self {
        Self {
            declaring,
            selector,
        }
    }

    /// Creates a method reference from a name and a JVM descriptor string.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if the descriptor does not parse.
    pub fn parse(
        declaring: TypeRef,
        name: impl Into<Cow<'static, str>>,
        descriptor: &str,
    ) -> Result<Self> {
        Ok(Self::new(
            declaring,
            Selector::new(name, Descriptor::parse(descriptor)?),
        ))
    }

    /// Method name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.selector.name
    }

    /// Number of declared parameters, receiver excluded.
    #[must_use]
    pub fn parameter_count(&self) -> usize {
        self.selector.descriptor.params.len()
    }

    /// Type of the declared parameter at 0-based position `index`.
    #[must_use]
    pub fn parameter_type(&self, index: usize) -> Option<TypeRef> {
        self.selector
            .descriptor
            .params
            .get(index)
            .map(|name| self.declaring.sibling(name))
    }

    /// All declared parameter types in order.
    #[must_use]
    pub fn parameter_types(&self) -> Vec<TypeRef> {
        self.selector
            .descriptor
            .params
            .iter()
            .map(|name| self.declaring.sibling(name))
            .collect()
    }

    /// Declared return type.
    #[must_use]
    pub fn return_type(&self) -> TypeRef {
        self.declaring.sibling(&self.selector.descriptor.ret)
    }

    /// Returns `true` when the method returns a value.
    #[must_use]
    pub fn returns_value(&self) -> bool {
        self.selector.descriptor.ret.primitive() != Some(PrimitiveType::Void)
    }

    /// Returns `true` for constructors.
    #[must_use]
    pub fn is_init(&self) -> bool {
        self.selector.is_init()
    }
}

impl fmt::Display for MethodRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.declaring, self.selector)
    }
}

/// Reference to a field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldRef {
    /// The class the reference names as declaring class
    pub declaring: TypeRef,
    /// Field name
    pub name: Cow<'static, str>,
    /// Declared field type
    pub field_type: TypeName,
}

impl FieldRef {
    /// Creates a field reference.
    #[must_use]
    pub fn new(declaring: TypeRef, name: impl Into<Cow<'static, str>>, field_type: TypeName) -> Self {
        Self {
            declaring,
            name: name.into(),
            field_type,
        }
    }

    /// The declared field type as seen from the declaring class.
    #[must_use]
    pub fn field_type_ref(&self) -> TypeRef {
        self.declaring.sibling(&self.field_type)
    }
}

impl fmt::Display for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}:{}",
            self.declaring,
            self.name,
            self.field_type.to_descriptor()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_parse() -> Result<()> {
        let desc = Descriptor::parse("(Ljava/lang/String;I[[JZ)Ljava/lang/Class;")?;
        let params: Vec<&str> = desc.params.iter().map(TypeName::as_str).collect();
        assert_eq!(params, vec!["Ljava/lang/String", "I", "[[J", "Z"]);
        assert_eq!(desc.ret.as_str(), "Ljava/lang/Class");
        assert_eq!(desc.to_string(), "(Ljava/lang/String;I[[JZ)Ljava/lang/Class;");
        Ok(())
    }

    #[test]
    fn test_descriptor_parse_rejects_garbage() {
        assert!(Descriptor::parse("I)V").is_err());
        assert!(Descriptor::parse("(Ljava/lang/String)V").is_err());
        assert!(Descriptor::parse("(V)V").is_err());
        assert!(Descriptor::parse("()VV").is_err());
        assert!(Descriptor::parse("()[V").is_err());
    }

    #[test]
    fn test_primitive_refs_live_in_primordial() {
        let int = TypeRef::application("I");
        assert_eq!(int.loader, ClassLoaderRef::PRIMORDIAL);

        let ints = TypeRef::application("[I");
        assert_eq!(ints.loader, ClassLoaderRef::PRIMORDIAL);
        assert_eq!(ints.element_type(), Some(TypeRef::primordial("I")));

        let foo = TypeRef::application("LFoo");
        assert_eq!(foo.loader, ClassLoaderRef::APPLICATION);
        assert_eq!(foo.array_of().name.as_str(), "[LFoo");
    }

    #[test]
    fn test_method_ref_parameter_types() -> Result<()> {
        let declaring = TypeRef::application("Lcom/example/Widget");
        let method = MethodRef::parse(declaring, "configure", "(Lcom/example/Config;I)Z")?;
        assert_eq!(method.parameter_count(), 2);
        assert_eq!(
            method.parameter_type(0),
            Some(TypeRef::application("Lcom/example/Config"))
        );
        assert_eq!(method.parameter_type(1), Some(TypeRef::primordial("I")));
        assert!(method.parameter_type(2).is_none());
        assert!(method.returns_value());
        assert_eq!(
            method.to_string(),
            "Lcom/example/Widget.configure(Lcom/example/Config;I)Z"
        );
        Ok(())
    }
}
