//! `Object.clone` and `Object.getClass` on objects of known type.

use tracing::debug;

use crate::{
    context::{CallerEvidence, Context, InstanceKey, ReflectiveIdiom},
    selectors::{receiver_concrete_type, ContextSelector},
    ssa::CallSiteRef,
    types::{MethodRef, TypeAbstraction},
};

fn select_on_allocated(
    idiom: ReflectiveIdiom,
    callee: &MethodRef,
    receiver: &[InstanceKey],
) -> Option<Context> {
    if ReflectiveIdiom::of(callee) != Some(idiom) {
        return None;
    }
    let Some(ty) = receiver_concrete_type(receiver) else {
        debug!(%callee, "receiver type is unknown");
        return None;
    };
    Some(Context::JavaType(TypeAbstraction::exact(ty.clone())))
}

/// Selects `JavaType(Exact(T))` for `clone()` on an object of concrete type `T`.
pub struct CloneSelector;

impl ContextSelector for CloneSelector {
    fn name(&self) -> &'static str {
        "clone"
    }

    fn try_select(
        &self,
        _caller: &CallerEvidence,
        _site: &CallSiteRef,
        callee: &MethodRef,
        receiver: &[InstanceKey],
    ) -> Option<Context> {
        select_on_allocated(ReflectiveIdiom::ObjectClone, callee, receiver)
    }
}

/// Selects `JavaType(Exact(T))` for `getClass()` on an object of concrete type `T`.
pub struct GetClassSelector;

impl ContextSelector for GetClassSelector {
    fn name(&self) -> &'static str {
        "get-class"
    }

    fn try_select(
        &self,
        _caller: &CallerEvidence,
        _site: &CallSiteRef,
        callee: &MethodRef,
        receiver: &[InstanceKey],
    ) -> Option<Context> {
        select_on_allocated(ReflectiveIdiom::ObjectGetClass, callee, receiver)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        context::{CgNode, SymbolTable},
        ssa::{Constant, Dispatch, ValueNumber},
        types::{well_known, Selector, TypeRef},
    };

    #[test]
    fn test_allocated_receivers() {
        let main = MethodRef::new(TypeRef::application("Lapp/Main"), Selector::default_init());
        let caller = CallerEvidence::new(
            Arc::new(CgNode::new(main, Context::Everywhere)),
            SymbolTable::new(),
        );
        let square = TypeRef::application("Lshapes/Square");
        let allocated = [InstanceKey::Allocated(square.clone())];
        let expected = Some(Context::JavaType(TypeAbstraction::exact(square.clone())));

        let clone = well_known::object_clone();
        let site = CallSiteRef::new(1, clone.clone(), Dispatch::Virtual, vec![ValueNumber(2)]);
        assert_eq!(CloneSelector.try_select(&caller, &site, &clone, &allocated), expected);
        assert!(GetClassSelector
            .try_select(&caller, &site, &clone, &allocated)
            .is_none());

        let get_class = well_known::object_get_class();
        assert_eq!(
            GetClassSelector.try_select(&caller, &site, &get_class, &allocated),
            expected
        );

        let constant = [InstanceKey::Constant(Constant::Type(square))];
        assert!(CloneSelector
            .try_select(&caller, &site, &clone, &constant)
            .is_none());
    }
}
