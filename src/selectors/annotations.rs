//! Annotation queries on constant classes and members.

use tracing::debug;

use crate::{
    context::{CallerEvidence, Context, InstanceKey, ReflectiveIdiom},
    selectors::ContextSelector,
    ssa::{CallSiteRef, Constant},
    types::MethodRef,
};

/// Selects `GetAnnotation { target, annotation }` for `getAnnotation(A.class)` on a
/// class literal or a constant `Method` / `Constructor` object.
///
/// The annotation type must be a literal at the call site.
pub struct GetAnnotationSelector;

impl GetAnnotationSelector {
    fn target<'a>(idiom: ReflectiveIdiom, receiver: &'a [InstanceKey]) -> Option<&'a Constant> {
        let InstanceKey::Constant(constant) = receiver.first()? else {
            return None;
        };
        let matches = match (idiom, constant) {
            (ReflectiveIdiom::ClassGetAnnotation, Constant::Type(_)) => true,
            (ReflectiveIdiom::MethodGetAnnotation, Constant::Method(m)) => !m.is_init(),
            (ReflectiveIdiom::ConstructorGetAnnotation, Constant::Method(m)) => m.is_init(),
            _ => false,
        };
        matches.then_some(constant)
    }
}

impl ContextSelector for GetAnnotationSelector {
    fn name(&self) -> &'static str {
        "get-annotation"
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
            ReflectiveIdiom::ClassGetAnnotation
                | ReflectiveIdiom::MethodGetAnnotation
                | ReflectiveIdiom::ConstructorGetAnnotation
        ) {
            return None;
        }
        let Some(target) = Self::target(idiom, receiver) else {
            debug!(%callee, "receiver is not a matching element constant");
            return None;
        };
        let Some(annotation) = caller
            .constant_argument(site, 1)
            .and_then(Constant::as_type)
        else {
            debug!(%callee, pc = site.pc, "annotation type is not a literal");
            return None;
        };
        Some(Context::GetAnnotation {
            target: target.clone(),
            annotation: annotation.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        context::{CgNode, SymbolTable},
        ssa::{Dispatch, ValueNumber},
        types::{well_known, Selector, TypeRef},
        Result,
    };

    fn caller(symbols: SymbolTable) -> CallerEvidence {
        let main = MethodRef::new(TypeRef::application("Lapp/Main"), Selector::default_init());
        CallerEvidence::new(Arc::new(CgNode::new(main, Context::Everywhere)), symbols)
    }

    fn site(target: MethodRef) -> CallSiteRef {
        CallSiteRef::new(4, target, Dispatch::Virtual, vec![ValueNumber(2), ValueNumber(3)])
    }

    #[test]
    fn test_class_annotation_needs_literal_type() {
        let callee = well_known::class_get_annotation();
        let widget = TypeRef::application("Lapp/Widget");
        let plugin = TypeRef::application("Lapp/Plugin");
        let receiver = [InstanceKey::Constant(Constant::Type(widget.clone()))];

        let literal =
            caller(SymbolTable::new().with(ValueNumber(3), Constant::Type(plugin.clone())));
        assert_eq!(
            GetAnnotationSelector.try_select(&literal, &site(callee.clone()), &callee, &receiver),
            Some(Context::GetAnnotation {
                target: Constant::Type(widget),
                annotation: plugin,
            })
        );

        let unknown = caller(SymbolTable::new());
        assert!(GetAnnotationSelector
            .try_select(&unknown, &site(callee.clone()), &callee, &receiver)
            .is_none());
        let allocated = [InstanceKey::Allocated(well_known::CLASS)];
        assert!(GetAnnotationSelector
            .try_select(&literal, &site(callee.clone()), &callee, &allocated)
            .is_none());
    }

    #[test]
    fn test_member_annotation_matches_member_kind() -> Result<()> {
        let ctor = MethodRef::parse(TypeRef::application("Lapp/Widget"), "<init>", "()V")?;
        let render = MethodRef::parse(TypeRef::application("Lapp/Widget"), "render", "()V")?;
        let hot = Constant::Type(TypeRef::application("Lapp/Hot"));
        let symbols = caller(SymbolTable::new().with(ValueNumber(3), hot));
        let on_method = well_known::method_get_annotation();
        let on_ctor = well_known::constructor_get_annotation();
        let render_key = [InstanceKey::Constant(Constant::Method(render.clone()))];
        let ctor_key = [InstanceKey::Constant(Constant::Method(ctor))];

        let selected = GetAnnotationSelector.try_select(
            &symbols,
            &site(on_method.clone()),
            &on_method,
            &render_key,
        );
        assert_eq!(
            selected.as_ref().and_then(Context::annotation_query).map(|(t, _)| t),
            Some(&Constant::Method(render))
        );
        assert!(GetAnnotationSelector
            .try_select(&symbols, &site(on_method.clone()), &on_method, &ctor_key)
            .is_none());
        assert!(GetAnnotationSelector
            .try_select(&symbols, &site(on_ctor.clone()), &on_ctor, &ctor_key)
            .is_some());
        assert!(GetAnnotationSelector
            .try_select(&symbols, &site(on_ctor.clone()), &on_ctor, &render_key)
            .is_none());
        Ok(())
    }
}
