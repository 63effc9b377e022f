//! The bundled subset of the Java core library.
//!
//! Reflective synthesis allocates exceptions, casts through `Object[]`, boxes primitives
//! and calls `System.arraycopy`. Those members must resolve even when the host hierarchy
//! only describes the application, so a minimal description of them ships with the crate.

use crate::{
    hierarchy::{ClassBuilder, ClassInfo, MemberFlags},
    types::{well_known, PrimitiveType, TypeRef},
    Result,
};
use strum::IntoEnumIterator;

const PUBLIC: MemberFlags = MemberFlags::PUBLIC;
const PUBLIC_STATIC: MemberFlags = MemberFlags::PUBLIC.union(MemberFlags::STATIC);
const GET_ANNOTATION: &str = "(Ljava/lang/Class;)Ljava/lang/annotation/Annotation;";
const FIND_HANDLE: &str =
    "(Ljava/lang/Class;Ljava/lang/String;Ljava/lang/invoke/MethodType;)Ljava/lang/invoke/MethodHandle;";

fn exception(ty: TypeRef, parent: TypeRef) -> ClassBuilder {
    ClassBuilder::new(ty)
        .extends(parent)
        .constructor("()V", PUBLIC)
        .constructor("(Ljava/lang/String;)V", PUBLIC)
}

/// Declares every bundled class.
pub(crate) fn core_classes() -> Result<Vec<ClassInfo>> {
    let mut builders = vec![
        ClassBuilder::new(well_known::OBJECT)
            .constructor("()V", PUBLIC)
            .method("clone", "()Ljava/lang/Object;", MemberFlags::PROTECTED)
            .method("getClass", "()Ljava/lang/Class;", PUBLIC | MemberFlags::FINAL)
            .method("hashCode", "()I", PUBLIC)
            .method("equals", "(Ljava/lang/Object;)Z", PUBLIC)
            .method("toString", "()Ljava/lang/String;", PUBLIC),
        ClassBuilder::interface(well_known::SERIALIZABLE),
        ClassBuilder::interface(well_known::CLONEABLE),
        ClassBuilder::new(well_known::STRING)
            .final_class()
            .implements(well_known::SERIALIZABLE)
            .constructor("()V", PUBLIC)
            .method("length", "()I", PUBLIC),
        ClassBuilder::new(well_known::CLASS)
            .final_class()
            .implements(well_known::SERIALIZABLE)
            .method(
                "forName",
                "(Ljava/lang/String;)Ljava/lang/Class;",
                PUBLIC_STATIC,
            )
            .method("newInstance", "()Ljava/lang/Object;", PUBLIC)
            .method(
                "getMethod",
                "(Ljava/lang/String;[Ljava/lang/Class;)Ljava/lang/reflect/Method;",
                PUBLIC,
            )
            .method(
                "getDeclaredMethod",
                "(Ljava/lang/String;[Ljava/lang/Class;)Ljava/lang/reflect/Method;",
                PUBLIC,
            )
            .method("getMethods", "()[Ljava/lang/reflect/Method;", PUBLIC)
            .method("getDeclaredMethods", "()[Ljava/lang/reflect/Method;", PUBLIC)
            .method(
                "getConstructor",
                "([Ljava/lang/Class;)Ljava/lang/reflect/Constructor;",
                PUBLIC,
            )
            .method(
                "getDeclaredConstructor",
                "([Ljava/lang/Class;)Ljava/lang/reflect/Constructor;",
                PUBLIC,
            )
            .method("getConstructors", "()[Ljava/lang/reflect/Constructor;", PUBLIC)
            .method(
                "getDeclaredConstructors",
                "()[Ljava/lang/reflect/Constructor;",
                PUBLIC,
            )
            .method("getName", "()Ljava/lang/String;", PUBLIC)
            .method("getAnnotation", GET_ANNOTATION, PUBLIC),
        ClassBuilder::new(well_known::CLASS_LOADER)
            .abstract_class()
            .method(
                "loadClass",
                "(Ljava/lang/String;)Ljava/lang/Class;",
                PUBLIC,
            ),
        ClassBuilder::new(well_known::SYSTEM)
            .final_class()
            .method(
                "arraycopy",
                "(Ljava/lang/Object;Ljava/lang/Object;)V",
                PUBLIC_STATIC,
            ),
        ClassBuilder::new(well_known::THROWABLE)
            .implements(well_known::SERIALIZABLE)
            .constructor("()V", PUBLIC)
            .constructor("(Ljava/lang/String;)V", PUBLIC)
            .field("detailMessage", "Ljava/lang/String", MemberFlags::PRIVATE)
            .method("getMessage", "()Ljava/lang/String;", PUBLIC),
        exception(well_known::EXCEPTION, well_known::THROWABLE),
        exception(well_known::RUNTIME_EXCEPTION, well_known::EXCEPTION),
        exception(
            well_known::WRONG_METHOD_TYPE_EXCEPTION,
            well_known::RUNTIME_EXCEPTION,
        ),
        exception(
            well_known::REFLECTIVE_OPERATION_EXCEPTION,
            well_known::EXCEPTION,
        ),
        exception(
            well_known::INSTANTIATION_EXCEPTION,
            well_known::REFLECTIVE_OPERATION_EXCEPTION,
        ),
        exception(
            well_known::ILLEGAL_ACCESS_EXCEPTION,
            well_known::REFLECTIVE_OPERATION_EXCEPTION,
        ),
        exception(
            well_known::NO_SUCH_METHOD_EXCEPTION,
            well_known::REFLECTIVE_OPERATION_EXCEPTION,
        ),
        exception(
            well_known::CLASS_NOT_FOUND_EXCEPTION,
            well_known::REFLECTIVE_OPERATION_EXCEPTION,
        ),
        ClassBuilder::new(well_known::ACCESSIBLE_OBJECT)
            .constructor("()V", MemberFlags::PROTECTED)
            .method("setAccessible", "(Z)V", PUBLIC),
        ClassBuilder::new(well_known::EXECUTABLE)
            .abstract_class()
            .extends(well_known::ACCESSIBLE_OBJECT)
            .method("getName", "()Ljava/lang/String;", PUBLIC | MemberFlags::ABSTRACT),
        ClassBuilder::new(well_known::METHOD)
            .final_class()
            .extends(well_known::EXECUTABLE)
            .method(
                "invoke",
                "(Ljava/lang/Object;[Ljava/lang/Object;)Ljava/lang/Object;",
                PUBLIC,
            )
            .method("getAnnotation", GET_ANNOTATION, PUBLIC),
        ClassBuilder::new(well_known::CONSTRUCTOR)
            .final_class()
            .extends(well_known::EXECUTABLE)
            .method(
                "newInstance",
                "([Ljava/lang/Object;)Ljava/lang/Object;",
                PUBLIC,
            )
            .method("getAnnotation", GET_ANNOTATION, PUBLIC),
        ClassBuilder::interface(well_known::ANNOTATION).method(
            "annotationType",
            "()Ljava/lang/Class;",
            PUBLIC | MemberFlags::ABSTRACT,
        ),
        ClassBuilder::new(well_known::METHOD_TYPE)
            .final_class()
            .implements(well_known::SERIALIZABLE)
            .method("parameterCount", "()I", PUBLIC),
        ClassBuilder::new(well_known::METHOD_HANDLE)
            .abstract_class()
            .method(
                "invokeExact",
                "([Ljava/lang/Object;)Ljava/lang/Object;",
                PUBLIC | MemberFlags::FINAL | MemberFlags::NATIVE,
            )
            .method(
                "invoke",
                "([Ljava/lang/Object;)Ljava/lang/Object;",
                PUBLIC | MemberFlags::FINAL | MemberFlags::NATIVE,
            )
            .method(
                "invokeWithArguments",
                "([Ljava/lang/Object;)Ljava/lang/Object;",
                PUBLIC,
            )
            .method("type", "()Ljava/lang/invoke/MethodType;", PUBLIC),
        ClassBuilder::new(well_known::METHOD_HANDLES_LOOKUP)
            .final_class()
            .method("findStatic", FIND_HANDLE, PUBLIC)
            .method("findVirtual", FIND_HANDLE, PUBLIC),
        ClassBuilder::new(well_known::NUMBER)
            .abstract_class()
            .implements(well_known::SERIALIZABLE)
            .constructor("()V", PUBLIC),
    ];

    for primitive in PrimitiveType::iter() {
        let (Some(boxed), Some(unbox)) = (primitive.box_type(), primitive.unbox_method()) else {
            continue;
        };
        let boxed = TypeRef::primordial(boxed.as_str());
        let letter = primitive.descriptor();
        let parent = match primitive {
            PrimitiveType::Boolean | PrimitiveType::Char => well_known::OBJECT,
            _ => well_known::NUMBER,
        };
        let value_of = format!("({letter}){};", boxed.name);
        let unbox_desc = format!("(){letter}");
        let init = format!("({letter})V");
        builders.push(
            ClassBuilder::new(boxed)
                .final_class()
                .extends(parent)
                .implements(well_known::SERIALIZABLE)
                .constructor(&init, PUBLIC)
                .method("valueOf", &value_of, PUBLIC_STATIC)
                .method(unbox, &unbox_desc, PUBLIC)
                .field("value", letter, MemberFlags::PRIVATE | MemberFlags::FINAL),
        );
    }

    builders.into_iter().map(ClassBuilder::build).collect()
}
