//! Context selection from call-site evidence.
//!
//! A [`ContextSelector`] looks at one call (caller, site, resolved callee, abstract
//! receivers) and decides whether the callee should be analyzed under a specialized
//! [`Context`]. Selectors are pure: the same evidence always gives the same answer, and
//! missing evidence gives `None`.
//!
//! [`CompositeSelector`] chains selectors in order; the first one that produces a
//! context wins. [`CompositeSelector::reflection`] builds the chain covering every
//! reflective idiom this crate models plus declared factories.

mod annotations;
mod class_lookup;
mod construction;
mod factory;
mod handles;
mod members;
mod object;

pub use annotations::GetAnnotationSelector;
pub use class_lookup::{ClassForNameSelector, LoadClassSelector};
pub use construction::{ClassNewInstanceSelector, ReflectiveInvocationSelector};
pub use factory::FactorySelector;
pub use handles::MethodHandleSelector;
pub use members::{GetMethodSelector, JavaLangClassSelector};
pub use object::{CloneSelector, GetClassSelector};

use std::sync::Arc;

use tracing::trace;

use crate::{
    config::ReflectionConfig,
    context::{CallerEvidence, Context, InstanceKey},
    hierarchy::ClassHierarchy,
    ssa::CallSiteRef,
    summary::MethodSummaries,
    types::{MethodRef, TypeRef},
};

/// Chooses the analysis context of a call.
///
/// All selectors must be thread-safe (Send + Sync); a call-graph builder may query
/// them from several threads.
pub trait ContextSelector: Send + Sync {
    /// Unique name for logging and debugging.
    fn name(&self) -> &'static str;

    /// The context `callee` should be analyzed in when called from `site` in `caller`.
    ///
    /// # Arguments
    ///
    /// * `caller` - The calling node and the constants of its body
    /// * `site` - The call site inside the caller
    /// * `callee` - The resolved target of the call
    /// * `receiver` - Abstract objects the receiver may point to, empty for static calls
    ///
    /// # Returns
    ///
    /// `None` when this selector has nothing to say about the call.
    fn try_select(
        &self,
        caller: &CallerEvidence,
        site: &CallSiteRef,
        callee: &MethodRef,
        receiver: &[InstanceKey],
    ) -> Option<Context>;
}

/// The type denoted by a `Class` constant receiver.
fn receiver_type(receiver: &[InstanceKey]) -> Option<&TypeRef> {
    receiver.first().and_then(InstanceKey::type_constant)
}

/// The concrete type of an allocated receiver.
fn receiver_concrete_type(receiver: &[InstanceKey]) -> Option<&TypeRef> {
    receiver.first().and_then(InstanceKey::concrete_type)
}

/// Ordered chain of selectors; the first match wins.
#[derive(Default)]
pub struct CompositeSelector {
    selectors: Vec<Box<dyn ContextSelector>>,
}

impl CompositeSelector {
    /// An empty chain that never selects.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The chain covering reflection and declared factories.
    ///
    /// Order: class lookup, construction, member lookup, annotations, method handles,
    /// object idioms, factories.
    #[must_use]
    pub fn reflection(
        hierarchy: Arc<dyn ClassHierarchy>,
        summaries: Arc<MethodSummaries>,
        config: &ReflectionConfig,
    ) -> Self {
        Self::new()
            .with(ClassForNameSelector::new(hierarchy.clone(), config.type_lookup.clone()))
            .with(LoadClassSelector::new(hierarchy, config.type_lookup.clone()))
            .with(ClassNewInstanceSelector)
            .with(ReflectiveInvocationSelector)
            .with(GetMethodSelector)
            .with(JavaLangClassSelector)
            .with(GetAnnotationSelector)
            .with(MethodHandleSelector)
            .with(GetClassSelector)
            .with(CloneSelector)
            .with(FactorySelector::new(summaries))
    }

    /// Appends a selector at the end of the chain.
    #[must_use]
    pub fn with(mut self, selector: impl ContextSelector + 'static) -> Self {
        self.push(Box::new(selector));
        self
    }

    /// Appends a boxed selector at the end of the chain.
    pub fn push(&mut self, selector: Box<dyn ContextSelector>) {
        self.selectors.push(selector);
    }

    /// Names of the chained selectors in order.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.selectors.iter().map(|s| s.name()).collect()
    }

    /// Number of chained selectors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.selectors.len()
    }

    /// Returns `true` for an empty chain.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.selectors.is_empty()
    }

    /// Asks each selector in order and returns the first context produced.
    #[must_use]
    pub fn select(
        &self,
        caller: &CallerEvidence,
        site: &CallSiteRef,
        callee: &MethodRef,
        receiver: &[InstanceKey],
    ) -> Option<Context> {
        self.selectors.iter().find_map(|selector| {
            let context = selector.try_select(caller, site, callee, receiver)?;
            trace!(selector = selector.name(), %callee, %context, "context selected");
            Some(context)
        })
    }
}

impl ContextSelector for CompositeSelector {
    fn name(&self) -> &'static str {
        "composite"
    }

    fn try_select(
        &self,
        caller: &CallerEvidence,
        site: &CallSiteRef,
        callee: &MethodRef,
        receiver: &[InstanceKey],
    ) -> Option<Context> {
        self.select(caller, site, callee, receiver)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        context::{CgNode, SymbolTable},
        ssa::{Constant, Dispatch, ValueNumber},
        test::fixtures::shapes,
        types::{well_known, TypeAbstraction},
    };

    struct Fixed(&'static str, Option<Context>);

    impl ContextSelector for Fixed {
        fn name(&self) -> &'static str {
            self.0
        }

        fn try_select(
            &self,
            _caller: &CallerEvidence,
            _site: &CallSiteRef,
            _callee: &MethodRef,
            _receiver: &[InstanceKey],
        ) -> Option<Context> {
            self.1.clone()
        }
    }

    fn evidence() -> CallerEvidence {
        let main = MethodRef::new(
            TypeRef::application("Lapp/Main"),
            crate::types::Selector::default_init(),
        );
        CallerEvidence::new(
            Arc::new(CgNode::new(main, Context::Everywhere)),
            SymbolTable::new(),
        )
    }

    #[test]
    fn test_first_match_wins() {
        let exact = Context::JavaType(TypeAbstraction::exact(well_known::STRING));
        let composite = CompositeSelector::new()
            .with(Fixed("never", None))
            .with(Fixed("first", Some(Context::Everywhere)))
            .with(Fixed("second", Some(exact)));
        assert_eq!(composite.names(), vec!["never", "first", "second"]);

        let site = CallSiteRef::new(0, well_known::object_clone(), Dispatch::Virtual, vec![ValueNumber(1)]);
        let selected = composite.select(&evidence(), &site, &well_known::object_clone(), &[]);
        assert_eq!(selected, Some(Context::Everywhere));
        assert!(CompositeSelector::new()
            .select(&evidence(), &site, &well_known::object_clone(), &[])
            .is_none());
    }

    #[test]
    fn test_reflection_chain() {
        let hierarchy: Arc<dyn ClassHierarchy> = Arc::new(shapes());
        let composite = CompositeSelector::reflection(
            hierarchy,
            Arc::new(MethodSummaries::new()),
            &ReflectionConfig::default(),
        );
        assert_eq!(composite.len(), 11);

        let square = TypeRef::application("Lshapes/Square");
        let site = CallSiteRef::new(
            3,
            well_known::class_new_instance(),
            Dispatch::Virtual,
            vec![ValueNumber(2)],
        );
        let selected = composite.select(
            &evidence(),
            &site,
            &well_known::class_new_instance(),
            &[InstanceKey::Constant(Constant::Type(square.clone()))],
        );
        assert_eq!(selected, Some(Context::JavaType(TypeAbstraction::exact(square))));
    }
}
