//! Type names, class loader references and primitive types.
//!
//! Names follow the JVM descriptor convention without the trailing `;`:
//! `Ljava/lang/String` for classes, a single letter for primitives (`I`, `Z`, ...)
//! and one leading `[` per array dimension (`[I`, `[[Ljava/lang/Object`).
//!
//! # Design Rationale
//!
//! Names are stored as `Cow<'static, str>` so the well-known library types can be
//! declared as `const` items while names read from user input stay owned.

use std::{borrow::Cow, fmt};

use strum::{EnumIter, IntoEnumIterator};

/// A type name in descriptor form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeName(Cow<'static, str>);

impl TypeName {
    /// Creates a type name from a static descriptor string.
    #[must_use]
    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    /// Creates a type name from an owned descriptor string.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(Cow::Owned(name.into()))
    }

    /// Converts a Java source-level class name to descriptor form.
    ///
    /// Handles the spellings accepted by `Class.forName`: dotted class names
    /// (`java.lang.String`, `a.b.Outer$Inner`) and array names
    /// (`[Ljava.lang.String;`, `[[I`).
    ///
    /// # Arguments
    ///
    /// * `name` - The name as it appears in a string literal
    ///
    /// # Returns
    ///
    /// The descriptor form, or `None` for an empty or malformed name.
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// let name = TypeName::from_java_name("java.lang.String").unwrap();
    /// assert_eq!(name.as_str(), "Ljava/lang/String");
    /// ```
    #[must_use]
    pub fn from_java_name(name: &str) -> Option<Self> {
        let name = name.trim();
        if name.is_empty() || name.contains('/') {
            return None;
        }

        if name.starts_with('[') {
            let dims = name.bytes().take_while(|&b| b == b'[').count();
            let element = &name[dims..];
            let element = if let Some(class) = element.strip_prefix('L') {
                let class = class.strip_suffix(';')?;
                if class.is_empty() {
                    return None;
                }
                format!("L{}", class.replace('.', "/"))
            } else if element.len() == 1
                && PrimitiveType::from_descriptor(element)
                    .is_some_and(|primitive| primitive != PrimitiveType::Void)
            {
                element.to_string()
            } else {
                return None;
            };
            return Some(Self::new(format!("{}{}", "[".repeat(dims), element)));
        }

        if name.contains(';') || name.contains('[') {
            return None;
        }
        Some(Self::new(format!("L{}", name.replace('.', "/"))))
    }

    /// Returns the descriptor string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` for array type names.
    #[must_use]
    pub fn is_array(&self) -> bool {
        self.0.starts_with('[')
    }

    /// Returns `true` for primitive type names, `void` included.
    #[must_use]
    pub fn is_primitive(&self) -> bool {
        PrimitiveType::from_descriptor(&self.0).is_some()
    }

    /// Returns `true` for class (non-array, non-primitive) type names.
    #[must_use]
    pub fn is_class(&self) -> bool {
        self.0.starts_with('L')
    }

    /// Returns the primitive type this name denotes, if any.
    #[must_use]
    pub fn primitive(&self) -> Option<PrimitiveType> {
        PrimitiveType::from_descriptor(&self.0)
    }

    /// Returns the number of array dimensions (0 for non-arrays).
    #[must_use]
    pub fn dimensions(&self) -> usize {
        self.0.bytes().take_while(|&b| b == b'[').count()
    }

    /// Strips one array dimension.
    #[must_use]
    pub fn element(&self) -> Option<TypeName> {
        self.0
            .strip_prefix('[')
            .map(|inner| TypeName::new(inner.to_string()))
    }

    /// Strips every array dimension.
    #[must_use]
    pub fn innermost(&self) -> TypeName {
        let dims = self.dimensions();
        if dims == 0 {
            return self.clone();
        }
        TypeName::new(self.0[dims..].to_string())
    }

    /// Adds one array dimension.
    #[must_use]
    pub fn array_of(&self) -> TypeName {
        TypeName::new(format!("[{}", self.0))
    }

    /// The class name without package and enclosing classes.
    ///
    /// `Ljava/util/Map$Entry` yields `Entry`, `[I` yields `[I`.
    #[must_use]
    pub fn simple_name(&self) -> &str {
        let name = self.0.as_ref();
        let name = if self.is_class() { &name[1..] } else { name };
        let name = name.rsplit('/').next().unwrap_or(name);
        name.rsplit('$').next().unwrap_or(name)
    }

    /// Renders the name as it appears inside a method descriptor.
    ///
    /// Class names get their trailing `;` back.
    #[must_use]
    pub fn to_descriptor(&self) -> String {
        if self.innermost().is_class() {
            format!("{};", self.0)
        } else {
            self.0.to_string()
        }
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TypeName {
    fn from(value: &str) -> Self {
        TypeName::new(value)
    }
}

/// Identifies the class loader that defines a type.
///
/// Loaders delegate to their parent: `Application` to `Extension` to `Primordial`.
/// Custom loaders delegate straight to `Application`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassLoaderRef(Cow<'static, str>);

impl ClassLoaderRef {
    /// The bootstrap loader holding the core library.
    pub const PRIMORDIAL: ClassLoaderRef = ClassLoaderRef(Cow::Borrowed("Primordial"));
    /// The extension loader.
    pub const EXTENSION: ClassLoaderRef = ClassLoaderRef(Cow::Borrowed("Extension"));
    /// The loader holding the analyzed application.
    pub const APPLICATION: ClassLoaderRef = ClassLoaderRef(Cow::Borrowed("Application"));
    /// The loader owning types that exist only in synthetic bodies, such as annotation
    /// proxies.
    pub const SYNTHETIC: ClassLoaderRef = ClassLoaderRef(Cow::Borrowed("Synthetic"));

    /// Creates a reference to a custom loader.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self(Cow::Owned(name.into()))
    }

    /// Returns the loader name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.0
    }

    /// Returns the loader this one delegates to, `None` for the primordial loader.
    #[must_use]
    pub fn parent(&self) -> Option<ClassLoaderRef> {
        match self.0.as_ref() {
            "Primordial" => None,
            "Extension" => Some(Self::PRIMORDIAL),
            "Application" => Some(Self::EXTENSION),
            _ => Some(Self::APPLICATION),
        }
    }

    /// This loader followed by all of its ancestors.
    #[must_use]
    pub fn delegation_chain(&self) -> Vec<ClassLoaderRef> {
        let mut chain = vec![self.clone()];
        while let Some(parent) = chain.last().and_then(ClassLoaderRef::parent) {
            chain.push(parent);
        }
        chain
    }
}

impl fmt::Display for ClassLoaderRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The primitive types of the JVM type system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter)]
pub enum PrimitiveType {
    // ========== Integral ==========
    /// `boolean` (`Z`)
    Boolean,
    /// `byte` (`B`)
    Byte,
    /// `char` (`C`)
    Char,
    /// `short` (`S`)
    Short,
    /// `int` (`I`)
    Int,
    /// `long` (`J`)
    Long,

    // ========== Floating ==========
    /// `float` (`F`)
    Float,
    /// `double` (`D`)
    Double,

    // ========== Special ==========
    /// `void` (`V`), only valid as a return type
    Void,
}

impl PrimitiveType {
    /// Parses a one-letter descriptor.
    #[must_use]
    pub fn from_descriptor(descriptor: &str) -> Option<Self> {
        PrimitiveType::iter().find(|p| p.descriptor() == descriptor)
    }

    /// The one-letter descriptor.
    #[must_use]
    pub const fn descriptor(self) -> &'static str {
        match self {
            Self::Boolean => "Z",
            Self::Byte => "B",
            Self::Char => "C",
            Self::Short => "S",
            Self::Int => "I",
            Self::Long => "J",
            Self::Float => "F",
            Self::Double => "D",
            Self::Void => "V",
        }
    }

    /// The Java keyword.
    #[must_use]
    pub const fn keyword(self) -> &'static str {
        match self {
            Self::Boolean => "boolean",
            Self::Byte => "byte",
            Self::Char => "char",
            Self::Short => "short",
            Self::Int => "int",
            Self::Long => "long",
            Self::Float => "float",
            Self::Double => "double",
            Self::Void => "void",
        }
    }

    /// Returns `true` if a value of `self` may be stored where `to` is expected.
    ///
    /// Identity plus the widening primitive conversions: `byte` to `short`, `short`
    /// and `char` to `int`, `int` to `long`, `long` to `float`, `float` to `double`,
    /// and their transitive closure. `boolean` and `void` only widen to themselves.
    #[must_use]
    pub fn widens_to(self, to: PrimitiveType) -> bool {
        if self == to {
            return true;
        }
        match self {
            Self::Byte => matches!(
                to,
                Self::Short | Self::Int | Self::Long | Self::Float | Self::Double
            ),
            Self::Short | Self::Char => {
                matches!(to, Self::Int | Self::Long | Self::Float | Self::Double)
            }
            Self::Int => matches!(to, Self::Long | Self::Float | Self::Double),
            Self::Long => matches!(to, Self::Float | Self::Double),
            Self::Float => matches!(to, Self::Double),
            Self::Boolean | Self::Double | Self::Void => false,
        }
    }

    /// The wrapper class used when the value is boxed, `None` for `void`.
    #[must_use]
    pub const fn box_type(self) -> Option<TypeName> {
        Some(TypeName::from_static(match self {
            Self::Boolean => "Ljava/lang/Boolean",
            Self::Byte => "Ljava/lang/Byte",
            Self::Char => "Ljava/lang/Character",
            Self::Short => "Ljava/lang/Short",
            Self::Int => "Ljava/lang/Integer",
            Self::Long => "Ljava/lang/Long",
            Self::Float => "Ljava/lang/Float",
            Self::Double => "Ljava/lang/Double",
            Self::Void => return None,
        }))
    }

    /// Name of the wrapper's accessor returning the primitive value (`intValue`, ...).
    #[must_use]
    pub const fn unbox_method(self) -> Option<&'static str> {
        Some(match self {
            Self::Boolean => "booleanValue",
            Self::Byte => "byteValue",
            Self::Char => "charValue",
            Self::Short => "shortValue",
            Self::Int => "intValue",
            Self::Long => "longValue",
            Self::Float => "floatValue",
            Self::Double => "doubleValue",
            Self::Void => return None,
        })
    }
}

impl fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_java_name() {
        assert_eq!(
            TypeName::from_java_name("java.lang.String").unwrap().as_str(),
            "Ljava/lang/String"
        );
        assert_eq!(
            TypeName::from_java_name("a.b.Outer$Inner").unwrap().as_str(),
            "La/b/Outer$Inner"
        );
        assert_eq!(
            TypeName::from_java_name("[Ljava.lang.String;").unwrap().as_str(),
            "[Ljava/lang/String"
        );
        assert_eq!(TypeName::from_java_name("[[I").unwrap().as_str(), "[[I");

        assert!(TypeName::from_java_name("").is_none());
        assert!(TypeName::from_java_name("java/lang/String").is_none());
        assert!(TypeName::from_java_name("[Ljava.lang.String").is_none());
        assert!(TypeName::from_java_name("[X").is_none());
        assert!(TypeName::from_java_name("[V").is_none());
        assert!(TypeName::from_java_name("[[[V").is_none());
    }

    #[test]
    fn test_array_helpers() {
        let name = TypeName::from_static("[[Ljava/lang/Object");
        assert!(name.is_array());
        assert_eq!(name.dimensions(), 2);
        assert_eq!(name.element().unwrap().as_str(), "[Ljava/lang/Object");
        assert_eq!(name.innermost().as_str(), "Ljava/lang/Object");
        assert_eq!(name.to_descriptor(), "[[Ljava/lang/Object;");
        assert_eq!(TypeName::from_static("[I").to_descriptor(), "[I");
    }

    #[test]
    fn test_simple_name() {
        assert_eq!(TypeName::from_static("Ljava/util/Map$Entry").simple_name(), "Entry");
        assert_eq!(TypeName::from_static("LFoo").simple_name(), "Foo");
        assert_eq!(TypeName::from_static("I").simple_name(), "I");
    }

    #[test]
    fn test_widening() {
        assert!(PrimitiveType::Byte.widens_to(PrimitiveType::Double));
        assert!(PrimitiveType::Char.widens_to(PrimitiveType::Int));
        assert!(PrimitiveType::Int.widens_to(PrimitiveType::Float));
        assert!(!PrimitiveType::Int.widens_to(PrimitiveType::Short));
        assert!(!PrimitiveType::Char.widens_to(PrimitiveType::Short));
        assert!(!PrimitiveType::Boolean.widens_to(PrimitiveType::Int));
        assert!(PrimitiveType::Boolean.widens_to(PrimitiveType::Boolean));
    }

    #[test]
    fn test_loader_delegation() {
        let chain = ClassLoaderRef::named("plugin").delegation_chain();
        assert_eq!(
            chain,
            vec![
                ClassLoaderRef::named("plugin"),
                ClassLoaderRef::APPLICATION,
                ClassLoaderRef::EXTENSION,
                ClassLoaderRef::PRIMORDIAL,
            ]
        );
        assert!(ClassLoaderRef::PRIMORDIAL.parent().is_none());
    }
}
