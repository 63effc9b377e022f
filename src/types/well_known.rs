//! Core-library types and members that reflective synthesis refers to.
#![allow(missing_docs)]

use crate::types::{
    name::{ClassLoaderRef, PrimitiveType, TypeName},
    reference::{Descriptor, FieldRef, MethodRef, Selector, TypeRef},
};

const fn core(name: &'static str) -> TypeRef {
    TypeRef::from_static(ClassLoaderRef::PRIMORDIAL, name)
}

// ========== Primitives ==========
pub const VOID: TypeRef = core("V");
pub const BOOLEAN: TypeRef = core("Z");
pub const BYTE: TypeRef = core("B");
pub const CHAR: TypeRef = core("C");
pub const SHORT: TypeRef = core("S");
pub const INT: TypeRef = core("I");
pub const LONG: TypeRef = core("J");
pub const FLOAT: TypeRef = core("F");
pub const DOUBLE: TypeRef = core("D");

// ========== java.lang ==========
pub const OBJECT: TypeRef = core("Ljava/lang/Object");
pub const STRING: TypeRef = core("Ljava/lang/String");
pub const CLASS: TypeRef = core("Ljava/lang/Class");
pub const CLASS_LOADER: TypeRef = core("Ljava/lang/ClassLoader");
pub const CLONEABLE: TypeRef = core("Ljava/lang/Cloneable");
pub const SYSTEM: TypeRef = core("Ljava/lang/System");
pub const THROWABLE: TypeRef = core("Ljava/lang/Throwable");
pub const EXCEPTION: TypeRef = core("Ljava/lang/Exception");
pub const RUNTIME_EXCEPTION: TypeRef = core("Ljava/lang/RuntimeException");
pub const REFLECTIVE_OPERATION_EXCEPTION: TypeRef =
    core("Ljava/lang/ReflectiveOperationException");
pub const INSTANTIATION_EXCEPTION: TypeRef = core("Ljava/lang/InstantiationException");
pub const ILLEGAL_ACCESS_EXCEPTION: TypeRef = core("Ljava/lang/IllegalAccessException");
pub const NO_SUCH_METHOD_EXCEPTION: TypeRef = core("Ljava/lang/NoSuchMethodException");
pub const CLASS_NOT_FOUND_EXCEPTION: TypeRef = core("Ljava/lang/ClassNotFoundException");
pub const NUMBER: TypeRef = core("Ljava/lang/Number");

// ========== java.lang.reflect / java.io ==========
pub const METHOD: TypeRef = core("Ljava/lang/reflect/Method");
pub const CONSTRUCTOR: TypeRef = core("Ljava/lang/reflect/Constructor");
pub const EXECUTABLE: TypeRef = core("Ljava/lang/reflect/Executable");
pub const ACCESSIBLE_OBJECT: TypeRef = core("Ljava/lang/reflect/AccessibleObject");
pub const SERIALIZABLE: TypeRef = core("Ljava/io/Serializable");

// ========== java.lang.annotation / java.lang.invoke ==========
pub const ANNOTATION: TypeRef = core("Ljava/lang/annotation/Annotation");
pub const METHOD_HANDLE: TypeRef = core("Ljava/lang/invoke/MethodHandle");
pub const METHOD_HANDLES_LOOKUP: TypeRef = core("Ljava/lang/invoke/MethodHandles$Lookup");
pub const METHOD_TYPE: TypeRef = core("Ljava/lang/invoke/MethodType");
pub const WRONG_METHOD_TYPE_EXCEPTION: TypeRef =
    core("Ljava/lang/invoke/WrongMethodTypeException");

// ========== Arrays ==========
pub const OBJECT_ARRAY: TypeRef = core("[Ljava/lang/Object");
pub const CLASS_ARRAY: TypeRef = core("[Ljava/lang/Class");
pub const METHOD_ARRAY: TypeRef = core("[Ljava/lang/reflect/Method");
pub const CONSTRUCTOR_ARRAY: TypeRef = core("[Ljava/lang/reflect/Constructor");

fn method(declaring: TypeRef, name: &'static str, params: &[&'static str], ret: &'static str) -> MethodRef {
    MethodRef::new(
        declaring,
        Selector::new(
            name,
            Descriptor::new(
                params.iter().map(|p| TypeName::from_static(*p)).collect(),
                TypeName::from_static(ret),
            ),
        ),
    )
}

/// `Object.<init>()V`
#[must_use]
pub fn object_init() -> MethodRef {
    default_init(&OBJECT)
}

/// The no-argument constructor of `ty`.
#[must_use]
pub fn default_init(ty: &TypeRef) -> MethodRef {
    MethodRef::new(ty.clone(), Selector::default_init())
}

/// `Object.clone()Ljava/lang/Object;`
#[must_use]
pub fn object_clone() -> MethodRef {
    method(OBJECT, "clone", &[], "Ljava/lang/Object")
}

/// `Object.getClass()Ljava/lang/Class;`
#[must_use]
pub fn object_get_class() -> MethodRef {
    method(OBJECT, "getClass", &[], "Ljava/lang/Class")
}

/// `Class.forName(Ljava/lang/String;)Ljava/lang/Class;`
#[must_use]
pub fn class_for_name() -> MethodRef {
    method(CLASS, "forName", &["Ljava/lang/String"], "Ljava/lang/Class")
}

/// `ClassLoader.loadClass(Ljava/lang/String;)Ljava/lang/Class;`
#[must_use]
pub fn class_loader_load_class() -> MethodRef {
    method(
        CLASS_LOADER,
        "loadClass",
        &["Ljava/lang/String"],
        "Ljava/lang/Class",
    )
}

/// `Class.newInstance()Ljava/lang/Object;`
#[must_use]
pub fn class_new_instance() -> MethodRef {
    method(CLASS, "newInstance", &[], "Ljava/lang/Object")
}

/// `Constructor.newInstance([Ljava/lang/Object;)Ljava/lang/Object;`
#[must_use]
pub fn constructor_new_instance() -> MethodRef {
    method(
        CONSTRUCTOR,
        "newInstance",
        &["[Ljava/lang/Object"],
        "Ljava/lang/Object",
    )
}

/// `Method.invoke(Ljava/lang/Object;[Ljava/lang/Object;)Ljava/lang/Object;`
#[must_use]
pub fn method_invoke() -> MethodRef {
    method(
        METHOD,
        "invoke",
        &["Ljava/lang/Object", "[Ljava/lang/Object"],
        "Ljava/lang/Object",
    )
}

/// `Class.getMethod(Ljava/lang/String;[Ljava/lang/Class;)Ljava/lang/reflect/Method;`
#[must_use]
pub fn class_get_method() -> MethodRef {
    method(
        CLASS,
        "getMethod",
        &["Ljava/lang/String", "[Ljava/lang/Class"],
        "Ljava/lang/reflect/Method",
    )
}

/// `Class.getDeclaredMethod(Ljava/lang/String;[Ljava/lang/Class;)Ljava/lang/reflect/Method;`
#[must_use]
pub fn class_get_declared_method() -> MethodRef {
    method(
        CLASS,
        "getDeclaredMethod",
        &["Ljava/lang/String", "[Ljava/lang/Class"],
        "Ljava/lang/reflect/Method",
    )
}

/// `Class.getMethods()[Ljava/lang/reflect/Method;`
#[must_use]
pub fn class_get_methods() -> MethodRef {
    method(CLASS, "getMethods", &[], "[Ljava/lang/reflect/Method")
}

/// `Class.getDeclaredMethods()[Ljava/lang/reflect/Method;`
#[must_use]
pub fn class_get_declared_methods() -> MethodRef {
    method(CLASS, "getDeclaredMethods", &[], "[Ljava/lang/reflect/Method")
}

/// `Class.getConstructor([Ljava/lang/Class;)Ljava/lang/reflect/Constructor;`
#[must_use]
pub fn class_get_constructor() -> MethodRef {
    method(
        CLASS,
        "getConstructor",
        &["[Ljava/lang/Class"],
        "Ljava/lang/reflect/Constructor",
    )
}

/// `Class.getDeclaredConstructor([Ljava/lang/Class;)Ljava/lang/reflect/Constructor;`
#[must_use]
pub fn class_get_declared_constructor() -> MethodRef {
    method(
        CLASS,
        "getDeclaredConstructor",
        &["[Ljava/lang/Class"],
        "Ljava/lang/reflect/Constructor",
    )
}

/// `Class.getConstructors()[Ljava/lang/reflect/Constructor;`
#[must_use]
pub fn class_get_constructors() -> MethodRef {
    method(
        CLASS,
        "getConstructors",
        &[],
        "[Ljava/lang/reflect/Constructor",
    )
}

/// `Class.getDeclaredConstructors()[Ljava/lang/reflect/Constructor;`
#[must_use]
pub fn class_get_declared_constructors() -> MethodRef {
    method(
        CLASS,
        "getDeclaredConstructors",
        &[],
        "[Ljava/lang/reflect/Constructor",
    )
}

fn get_annotation(declaring: TypeRef) -> MethodRef {
    method(
        declaring,
        "getAnnotation",
        &["Ljava/lang/Class"],
        "Ljava/lang/annotation/Annotation",
    )
}

/// `Class.getAnnotation(Ljava/lang/Class;)Ljava/lang/annotation/Annotation;`
#[must_use]
pub fn class_get_annotation() -> MethodRef {
    get_annotation(CLASS)
}

/// `Method.getAnnotation(Ljava/lang/Class;)Ljava/lang/annotation/Annotation;`
#[must_use]
pub fn method_get_annotation() -> MethodRef {
    get_annotation(METHOD)
}

/// `Constructor.getAnnotation(Ljava/lang/Class;)Ljava/lang/annotation/Annotation;`
#[must_use]
pub fn constructor_get_annotation() -> MethodRef {
    get_annotation(CONSTRUCTOR)
}

fn lookup_find(name: &'static str) -> MethodRef {
    method(
        METHOD_HANDLES_LOOKUP,
        name,
        &[
            "Ljava/lang/Class",
            "Ljava/lang/String",
            "Ljava/lang/invoke/MethodType",
        ],
        "Ljava/lang/invoke/MethodHandle",
    )
}

/// `MethodHandles$Lookup.findStatic(Class, String, MethodType)MethodHandle`
#[must_use]
pub fn lookup_find_static() -> MethodRef {
    lookup_find("findStatic")
}

/// `MethodHandles$Lookup.findVirtual(Class, String, MethodType)MethodHandle`
#[must_use]
pub fn lookup_find_virtual() -> MethodRef {
    lookup_find("findVirtual")
}

/// `MethodHandle.invokeExact([Ljava/lang/Object;)Ljava/lang/Object;`
///
/// Signature polymorphic: call sites carry their own descriptor, this is the
/// declared one.
#[must_use]
pub fn method_handle_invoke_exact() -> MethodRef {
    method(
        METHOD_HANDLE,
        "invokeExact",
        &["[Ljava/lang/Object"],
        "Ljava/lang/Object",
    )
}

/// `MethodHandle.invoke([Ljava/lang/Object;)Ljava/lang/Object;`, signature polymorphic.
#[must_use]
pub fn method_handle_invoke() -> MethodRef {
    method(
        METHOD_HANDLE,
        "invoke",
        &["[Ljava/lang/Object"],
        "Ljava/lang/Object",
    )
}

/// `MethodHandle.invokeWithArguments([Ljava/lang/Object;)Ljava/lang/Object;`
#[must_use]
pub fn method_handle_invoke_with_arguments() -> MethodRef {
    method(
        METHOD_HANDLE,
        "invokeWithArguments",
        &["[Ljava/lang/Object"],
        "Ljava/lang/Object",
    )
}

/// `MethodHandle.type()Ljava/lang/invoke/MethodType;`
#[must_use]
pub fn method_handle_type() -> MethodRef {
    method(METHOD_HANDLE, "type", &[], "Ljava/lang/invoke/MethodType")
}

/// The bulk-copy stand-in used by array clones: `System.arraycopy(Object, Object)V`.
///
/// The real `arraycopy` takes positions and a length; the synthetic two-argument
/// form only carries the points-to relevant operands.
#[must_use]
pub fn system_arraycopy() -> MethodRef {
    method(
        SYSTEM,
        "arraycopy",
        &["Ljava/lang/Object", "Ljava/lang/Object"],
        "V",
    )
}

/// `<Box>.valueOf(<prim>)L<Box>;` for boxing a primitive.
#[must_use]
pub fn box_value_of(primitive: PrimitiveType) -> Option<MethodRef> {
    let boxed = primitive.box_type()?;
    Some(MethodRef::new(
        TypeRef::new(ClassLoaderRef::PRIMORDIAL, boxed.clone()),
        Selector::new(
            "valueOf",
            Descriptor::new(vec![TypeName::from_static(primitive.descriptor())], boxed),
        ),
    ))
}

/// `<Box>.<prim>Value()<prim>` for unboxing.
#[must_use]
pub fn unbox_value(primitive: PrimitiveType) -> Option<MethodRef> {
    let boxed = primitive.box_type()?;
    let name = primitive.unbox_method()?;
    Some(MethodRef::new(
        TypeRef::new(ClassLoaderRef::PRIMORDIAL, boxed),
        Selector::new(
            name,
            Descriptor::new(Vec::new(), TypeName::from_static(primitive.descriptor())),
        ),
    ))
}

/// `Throwable.detailMessage:Ljava/lang/String;`, present in the bundled core library.
#[must_use]
pub fn throwable_detail_message() -> FieldRef {
    FieldRef::new(
        THROWABLE,
        "detailMessage",
        TypeName::from_static("Ljava/lang/String"),
    )
}
