//! The reflective library entry points this crate models.

use std::fmt;

use strum::{EnumIter, IntoEnumIterator};

use crate::types::{well_known, MethodRef};

/// A reflective library method with a synthetic model.
///
/// Selectors and interpreters classify callees with [`ReflectiveIdiom::of`] and branch
/// with an exhaustive `match`, so adding an idiom forces every site to decide about it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, EnumIter)]
pub enum ReflectiveIdiom {
    // ========== Class lookup ==========
    /// `Class.forName(String)`
    ClassForName,
    /// `ClassLoader.loadClass(String)`
    LoadClass,

    // ========== Construction and invocation ==========
    /// `Class.newInstance()`
    ClassNewInstance,
    /// `Constructor.newInstance(Object[])`
    ConstructorNewInstance,
    /// `Method.invoke(Object, Object[])`
    MethodInvoke,

    // ========== Object ==========
    /// `Object.clone()`
    ObjectClone,
    /// `Object.getClass()`
    ObjectGetClass,

    // ========== Member lookup ==========
    /// `Class.getMethod(String, Class[])`
    GetMethod,
    /// `Class.getDeclaredMethod(String, Class[])`
    GetDeclaredMethod,
    /// `Class.getMethods()`
    GetMethods,
    /// `Class.getDeclaredMethods()`
    GetDeclaredMethods,
    /// `Class.getConstructor(Class[])`
    GetConstructor,
    /// `Class.getDeclaredConstructor(Class[])`
    GetDeclaredConstructor,
    /// `Class.getConstructors()`
    GetConstructors,
    /// `Class.getDeclaredConstructors()`
    GetDeclaredConstructors,

    // ========== Annotations ==========
    /// `Class.getAnnotation(Class)`
    ClassGetAnnotation,
    /// `Method.getAnnotation(Class)`
    MethodGetAnnotation,
    /// `Constructor.getAnnotation(Class)`
    ConstructorGetAnnotation,

    // ========== Method handles ==========
    /// `MethodHandles.Lookup.findStatic(Class, String, MethodType)`
    FindStatic,
    /// `MethodHandles.Lookup.findVirtual(Class, String, MethodType)`
    FindVirtual,
    /// `MethodHandle.invokeExact(Object...)`, signature polymorphic
    MethodHandleInvokeExact,
    /// `MethodHandle.invoke(Object...)`, signature polymorphic
    MethodHandleInvoke,
    /// `MethodHandle.invokeWithArguments(Object[])`
    MethodHandleInvokeWithArguments,
    /// `MethodHandle.type()`
    MethodHandleType,
}

impl ReflectiveIdiom {
    /// The library method.
    #[must_use]
    pub fn method(self) -> MethodRef {
        match self {
            Self::ClassForName => well_known::class_for_name(),
            Self::LoadClass => well_known::class_loader_load_class(),
            Self::ClassNewInstance => well_known::class_new_instance(),
            Self::ConstructorNewInstance => well_known::constructor_new_instance(),
            Self::MethodInvoke => well_known::method_invoke(),
            Self::ObjectClone => well_known::object_clone(),
            Self::ObjectGetClass => well_known::object_get_class(),
            Self::GetMethod => well_known::class_get_method(),
            Self::GetDeclaredMethod => well_known::class_get_declared_method(),
            Self::GetMethods => well_known::class_get_methods(),
            Self::GetDeclaredMethods => well_known::class_get_declared_methods(),
            Self::GetConstructor => well_known::class_get_constructor(),
            Self::GetDeclaredConstructor => well_known::class_get_declared_constructor(),
            Self::GetConstructors => well_known::class_get_constructors(),
            Self::GetDeclaredConstructors => well_known::class_get_declared_constructors(),
            Self::ClassGetAnnotation => well_known::class_get_annotation(),
            Self::MethodGetAnnotation => well_known::method_get_annotation(),
            Self::ConstructorGetAnnotation => well_known::constructor_get_annotation(),
            Self::FindStatic => well_known::lookup_find_static(),
            Self::FindVirtual => well_known::lookup_find_virtual(),
            Self::MethodHandleInvokeExact => well_known::method_handle_invoke_exact(),
            Self::MethodHandleInvoke => well_known::method_handle_invoke(),
            Self::MethodHandleInvokeWithArguments => {
                well_known::method_handle_invoke_with_arguments()
            }
            Self::MethodHandleType => well_known::method_handle_type(),
        }
    }

    /// Classifies a method reference.
    ///
    /// The declaring class is compared by name only: a call site in application code
    /// names `java.lang.Class` through the application loader. Signature polymorphic
    /// methods match on their name whatever descriptor the call site carries.
    #[must_use]
    pub fn of(method: &MethodRef) -> Option<Self> {
        Self::iter().find(|idiom| {
            let known = idiom.method();
            if known.declaring.name != method.declaring.name {
                return false;
            }
            if idiom.is_signature_polymorphic() {
                known.selector.name == method.selector.name
            } else {
                known.selector == method.selector
            }
        })
    }

    /// Returns `true` for static library methods.
    #[must_use]
    pub const fn is_static(self) -> bool {
        matches!(self, Self::ClassForName)
    }

    /// Returns `true` for methods whose call sites choose their own descriptor.
    #[must_use]
    pub const fn is_signature_polymorphic(self) -> bool {
        matches!(self, Self::MethodHandleInvokeExact | Self::MethodHandleInvoke)
    }

    /// Argument position of the class or method name string, receiver counted as 0.
    #[must_use]
    pub const fn name_argument(self) -> Option<usize> {
        match self {
            Self::ClassForName => Some(0),
            Self::LoadClass | Self::GetMethod | Self::GetDeclaredMethod => Some(1),
            Self::FindStatic | Self::FindVirtual => Some(2),
            _ => None,
        }
    }
}

impl fmt::Display for ReflectiveIdiom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.method())
    }
}
