//! Reflective construction and invocation.

use tracing::debug;

use crate::{
    context::{CallerEvidence, Context, InstanceKey, ReflectiveIdiom},
    selectors::{receiver_type, ContextSelector},
    ssa::{CallSiteRef, Constant},
    types::{MethodRef, TypeAbstraction},
};

/// Selects `JavaType(Exact(T))` for `T.class.newInstance()`.
pub struct ClassNewInstanceSelector;

impl ContextSelector for ClassNewInstanceSelector {
    fn name(&self) -> &'static str {
        "class-new-instance"
    }

    fn try_select(
        &self,
        _caller: &CallerEvidence,
        _site: &CallSiteRef,
        callee: &MethodRef,
        receiver: &[InstanceKey],
    ) -> Option<Context> {
        if ReflectiveIdiom::of(callee) != Some(ReflectiveIdiom::ClassNewInstance) {
            return None;
        }
        let Some(ty) = receiver_type(receiver) else {
            debug!(%callee, "receiver is not a class constant");
            return None;
        };
        Some(Context::JavaType(TypeAbstraction::exact(ty.clone())))
    }
}

/// Selects `ReceiverInstance(m)` for `Constructor.newInstance` and `Method.invoke` on a
/// constant member `m`.
///
/// Constructors only match `newInstance`, other methods only match `invoke`.
pub struct ReflectiveInvocationSelector;

impl ContextSelector for ReflectiveInvocationSelector {
    fn name(&self) -> &'static str {
        "reflective-invocation"
    }

    fn try_select(
        &self,
        _caller: &CallerEvidence,
        _site: &CallSiteRef,
        callee: &MethodRef,
        receiver: &[InstanceKey],
    ) -> Option<Context> {
        let wants_constructor = match ReflectiveIdiom::of(callee)? {
            ReflectiveIdiom::ConstructorNewInstance => true,
            ReflectiveIdiom::MethodInvoke => false,
            _ => return None,
        };
        let constant = match receiver.first() {
            Some(InstanceKey::Constant(constant @ Constant::Method(target)))
                if target.is_init() == wants_constructor =>
            {
                constant
            }
            _ => {
                debug!(%callee, "receiver is not a matching member constant");
                return None;
            }
        };
        Some(Context::ReceiverInstance(constant.clone()))
    }
}
