//! Method handle lookups and invocations.

use tracing::debug;

use crate::{
    context::{CallerEvidence, Context, InstanceKey, ReflectiveIdiom},
    selectors::ContextSelector,
    ssa::{CallSiteRef, Constant},
    types::{MethodRef, TypeAbstraction},
};

/// Selects the context of `java.lang.invoke` calls with constant evidence.
///
/// - `lookup.findStatic(T.class, "name", type)` and `findVirtual` with a class literal
///   and a literal name get `GetMethod { Exact(T), name }`
/// - `invokeExact`, `invoke`, `invokeWithArguments` and `type` on a constant handle
///   `h` get `ReceiverInstance(h)`
pub struct MethodHandleSelector;

impl ContextSelector for MethodHandleSelector {
    fn name(&self) -> &'static str {
        "method-handles"
    }

    fn try_select(
        &self,
        caller: &CallerEvidence,
        site: &CallSiteRef,
        callee: &MethodRef,
        receiver: &[InstanceKey],
    ) -> Option<Context> {
        match ReflectiveIdiom::of(callee)? {
            idiom @ (ReflectiveIdiom::FindStatic | ReflectiveIdiom::FindVirtual) => {
                let Some(ty) = caller.constant_argument(site, 1).and_then(Constant::as_type)
                else {
                    debug!(%callee, pc = site.pc, "looked up class is not a literal");
                    return None;
                };
                let Some(name) = idiom
                    .name_argument()
                    .and_then(|position| caller.constant_argument(site, position))
                    .and_then(Constant::as_str)
                else {
                    debug!(%callee, pc = site.pc, "method name is not a literal");
                    return None;
                };
                Some(Context::GetMethod {
                    ty: TypeAbstraction::exact(ty.clone()),
                    name: name.to_string(),
                })
            }
            ReflectiveIdiom::MethodHandleInvokeExact
            | ReflectiveIdiom::MethodHandleInvoke
            | ReflectiveIdiom::MethodHandleInvokeWithArguments
            | ReflectiveIdiom::MethodHandleType => match receiver.first() {
                Some(InstanceKey::Constant(handle @ Constant::MethodHandle(_))) => {
                    Some(Context::ReceiverInstance(handle.clone()))
                }
                _ => {
                    debug!(%callee, "receiver is not a constant method handle");
                    None
                }
            },
            _ => None,
        }
    }
}
