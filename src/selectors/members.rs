//! Member lookups on `Class` objects.

use tracing::debug;

use crate::{
    context::{CallerEvidence, Context, InstanceKey, ReflectiveIdiom},
    selectors::{receiver_type, ContextSelector},
    ssa::CallSiteRef,
    types::{MethodRef, TypeAbstraction},
};

/// Selects `GetMethod { Exact(T), name }` for `T.class.getMethod("name", ..)` and
/// `getDeclaredMethod` with a literal name.
pub struct GetMethodSelector;

impl ContextSelector for GetMethodSelector {
    fn name(&self) -> &'static str {
        "get-method"
    }

    fn try_select(
        &self,
        caller: &CallerEvidence,
        site: &CallSiteRef,
        callee: &MethodRef,
        receiver: &[InstanceKey],
    ) -> Option<Context> {
        let idiom = ReflectiveIdiom::of(callee)?;
        if !matches!(
            idiom,
            ReflectiveIdiom::GetMethod | ReflectiveIdiom::GetDeclaredMethod
        ) {
            return None;
        }
        let ty = receiver_type(receiver)?;
        let Some(name) = idiom
            .name_argument()
            .and_then(|position| caller.constant_argument(site, position))
            .and_then(|c| c.as_str())
        else {
            debug!(%callee, pc = site.pc, "method name is not a literal");
            return None;
        };
        Some(Context::GetMethod {
            ty: TypeAbstraction::exact(ty.clone()),
            name: name.to_string(),
        })
    }
}

/// Selects `JavaType(Exact(T))` for the remaining member lookups on `T.class`.
///
/// Covers the constructor lookups, the array-returning lookups, and `getMethod` /
/// `getDeclaredMethod` calls whose name is not a literal. Place it after
/// [`GetMethodSelector`] so literal names get the more precise context.
pub struct JavaLangClassSelector;

impl ContextSelector for JavaLangClassSelector {
    fn name(&self) -> &'static str {
        "java-lang-class"
    }

    fn try_select(
        &self,
        _caller: &CallerEvidence,
        _site: &CallSiteRef,
        callee: &MethodRef,
        receiver: &[InstanceKey],
    ) -> Option<Context> {
        match ReflectiveIdiom::of(callee)? {
            ReflectiveIdiom::GetMethod
            | ReflectiveIdiom::GetDeclaredMethod
            | ReflectiveIdiom::GetMethods
            | ReflectiveIdiom::GetDeclaredMethods
            | ReflectiveIdiom::GetConstructor
            | ReflectiveIdiom::GetDeclaredConstructor
            | ReflectiveIdiom::GetConstructors
            | ReflectiveIdiom::GetDeclaredConstructors => {}
            ReflectiveIdiom::ClassForName
            | ReflectiveIdiom::LoadClass
            | ReflectiveIdiom::ClassNewInstance
            | ReflectiveIdiom::ConstructorNewInstance
            | ReflectiveIdiom::MethodInvoke
            | ReflectiveIdiom::ObjectClone
            | ReflectiveIdiom::ObjectGetClass
            | ReflectiveIdiom::ClassGetAnnotation
            | ReflectiveIdiom::MethodGetAnnotation
            | ReflectiveIdiom::ConstructorGetAnnotation
            | ReflectiveIdiom::FindStatic
            | ReflectiveIdiom::FindVirtual
            | ReflectiveIdiom::MethodHandleInvokeExact
            | ReflectiveIdiom::MethodHandleInvoke
            | ReflectiveIdiom::MethodHandleInvokeWithArguments
            | ReflectiveIdiom::MethodHandleType => return None,
        }
        let Some(ty) = receiver_type(receiver) else {
            debug!(%callee, "receiver is not a class constant");
            return None;
        };
        Some(Context::JavaType(TypeAbstraction::exact(ty.clone())))
    }
}
