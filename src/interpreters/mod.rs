//! Synthetic bodies for call-graph nodes.
//!
//! A [`ContextInterpreter`] turns a node whose method has no analyzable body into a
//! [`SyntheticIr`] specialized to the node's context. There is one interpreter per
//! reflective idiom plus one for declared factories; [`CompositeInterpreter`] asks them
//! in order.
//!
//! # Caching
//!
//! Every interpreter memoizes its bodies in a [`BodyCache`] keyed by the node. A body is
//! built outside the cache lock and published with an entry insert; when two threads
//! race on the same node, the first published body wins and both callers get the same
//! `Arc`. Only [`FactoryInterpreter`] ever evicts.

mod annotation;
mod class_lookup;
mod clone;
mod factory;
mod get_class;
mod get_method;
mod handles;
mod invocation;
mod java_lang_class;
mod new_instance;

pub use annotation::{annotation_proxy, GetAnnotationInterpreter};
pub use class_lookup::ClassLookupInterpreter;
pub use clone::CloneInterpreter;
pub use factory::FactoryInterpreter;
pub use get_class::GetClassInterpreter;
pub use get_method::GetMethodInterpreter;
pub use handles::{MethodHandleFindInterpreter, MethodHandleInvokeInterpreter};
pub use invocation::ReflectiveInvocationInterpreter;
pub use java_lang_class::JavaLangClassInterpreter;
pub use new_instance::ClassNewInstanceInterpreter;

use std::sync::Arc;

use dashmap::{mapref::entry::Entry, DashMap};
use tracing::trace;

use crate::{
    config::ReflectionConfig,
    context::{CgNode, ReflectiveIdiom},
    events::{EventKind, EventLog},
    hierarchy::{ClassHierarchy, ClassInfo, MethodInfo},
    ssa::{CallSiteRef, NewSite, ParameterAccessor},
    synthetic::{SpecializedMethod, SyntheticIr},
    types::{FieldRef, TypeRef},
    Error, Result,
};

/// Memoized bodies, one per node.
pub type BodyCache = DashMap<CgNode, Arc<SyntheticIr>>;

/// Builds synthetic bodies for the nodes it understands.
///
/// `body` must be deterministic: equal nodes yield equal bodies, and repeated calls
/// return the cached `Arc` until something invalidates it. The provided accessors all
/// read the (cached) body.
pub trait ContextInterpreter: Send + Sync {
    /// Unique name for logging and debugging.
    fn name(&self) -> &'static str;

    /// Returns `true` if this interpreter can build a body for `node`.
    fn understands(&self, node: &CgNode) -> bool;

    /// The synthetic body of `node`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotUnderstood`] for nodes [`understands`](Self::understands)
    /// rejects, and propagates construction errors, which indicate a bug in the
    /// interpreter rather than imprecise input.
    fn body(&self, node: &CgNode) -> Result<Arc<SyntheticIr>>;

    /// Allocation sites of the body.
    ///
    /// # Errors
    ///
    /// Propagates [`body`](Self::body) errors.
    fn allocation_sites(&self, node: &CgNode) -> Result<Vec<NewSite>> {
        Ok(self.body(node)?.allocation_sites())
    }

    /// Call sites of the body.
    ///
    /// # Errors
    ///
    /// Propagates [`body`](Self::body) errors.
    fn call_sites(&self, node: &CgNode) -> Result<Vec<CallSiteRef>> {
        Ok(self.body(node)?.call_sites())
    }

    /// Fields the body reads.
    ///
    /// # Errors
    ///
    /// Propagates [`body`](Self::body) errors.
    fn fields_read(&self, node: &CgNode) -> Result<Vec<FieldRef>> {
        Ok(self.body(node)?.fields_read())
    }

    /// Fields the body writes.
    ///
    /// # Errors
    ///
    /// Propagates [`body`](Self::body) errors.
    fn fields_written(&self, node: &CgNode) -> Result<Vec<FieldRef>> {
        Ok(self.body(node)?.fields_written())
    }

    /// Target types of the body's casts.
    ///
    /// # Errors
    ///
    /// Propagates [`body`](Self::body) errors.
    fn cast_types(&self, node: &CgNode) -> Result<Vec<TypeRef>> {
        Ok(self.body(node)?.cast_types())
    }

    /// Number of instructions in the body.
    ///
    /// # Errors
    ///
    /// Propagates [`body`](Self::body) errors.
    fn number_of_statements(&self, node: &CgNode) -> Result<usize> {
        Ok(self.body(node)?.number_of_statements())
    }
}

/// What every interpreter needs besides its own cache.
#[derive(Clone)]
pub struct InterpreterEnv {
    /// The analyzed program
    pub hierarchy: Arc<dyn ClassHierarchy>,
    /// Synthesis options
    pub config: Arc<ReflectionConfig>,
    /// Shared diagnostics
    pub events: Arc<EventLog>,
}

impl InterpreterEnv {
    /// Bundles a hierarchy and options with a fresh event log.
    #[must_use]
    pub fn new(hierarchy: Arc<dyn ClassHierarchy>, config: ReflectionConfig) -> Self {
        Self {
            hierarchy,
            config: Arc::new(config),
            events: Arc::new(EventLog::new()),
        }
    }

    /// Replaces the event log, to share one log between several environments.
    #[must_use]
    pub fn with_events(mut self, events: Arc<EventLog>) -> Self {
        self.events = events;
        self
    }

    /// Starts a body for `node` numbered after `accessor`.
    ///
    /// # Errors
    ///
    /// Propagates [`SpecializedMethod::new`] errors.
    pub fn builder(&self, node: &CgNode, accessor: ParameterAccessor) -> Result<SpecializedMethod<'_>> {
        SpecializedMethod::new(node.clone(), accessor, self.hierarchy.as_ref())
    }

    /// The cached body of `node`, built with `build` on a miss.
    ///
    /// # Errors
    ///
    /// Propagates `build` errors; nothing is cached then.
    pub fn cached(
        &self,
        cache: &BodyCache,
        node: &CgNode,
        build: impl FnOnce() -> Result<SyntheticIr>,
    ) -> Result<Arc<SyntheticIr>> {
        let hit = cache.get(node).map(|entry| entry.value().clone());
        if let Some(hit) = hit {
            trace!(%node, "body cache hit");
            return Ok(hit);
        }

        let built = Arc::new(build()?);
        match cache.entry(node.clone()) {
            Entry::Occupied(entry) => Ok(entry.get().clone()),
            Entry::Vacant(entry) => {
                self.events
                    .record(EventKind::BodySynthesized)
                    .node(node)
                    .message(format!("{} statements", built.number_of_statements()));
                Ok(entry.insert(built).clone())
            }
        }
    }
}

/// Parameter numbering of a reflective library method.
fn idiom_accessor(node: &CgNode, idiom: ReflectiveIdiom) -> ParameterAccessor {
    ParameterAccessor::from_signature(node.method.clone(), !idiom.is_static())
}

/// The methods a member-lookup idiom can return for `class`, in declaration order.
///
/// Public lookups see inherited members, declared lookups only the class itself.
/// Static initializers are never returned.
fn member_candidates(
    hierarchy: &dyn ClassHierarchy,
    class: &ClassInfo,
    idiom: ReflectiveIdiom,
) -> Vec<MethodInfo> {
    let methods = |public_only: bool, inherited: bool| -> Vec<MethodInfo> {
        let all = if inherited {
            hierarchy.all_methods(&class.reference)
        } else {
            class.methods.clone()
        };
        all.into_iter()
            .filter(|m| !m.is_init() && !m.is_clinit() && (!public_only || m.is_public()))
            .collect()
    };
    let constructors = |public_only: bool| -> Vec<MethodInfo> {
        class
            .constructors()
            .filter(|m| !public_only || m.is_public())
            .cloned()
            .collect()
    };

    match idiom {
        ReflectiveIdiom::GetMethod | ReflectiveIdiom::GetMethods => methods(true, true),
        ReflectiveIdiom::GetDeclaredMethod | ReflectiveIdiom::GetDeclaredMethods => {
            methods(false, false)
        }
        ReflectiveIdiom::GetConstructor | ReflectiveIdiom::GetConstructors => constructors(true),
        ReflectiveIdiom::GetDeclaredConstructor | ReflectiveIdiom::GetDeclaredConstructors => {
            constructors(false)
        }
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
        | ReflectiveIdiom::MethodHandleType => Vec::new(),
    }
}

/// Ordered chain of interpreters; the first one that understands a node builds it.
#[derive(Default)]
pub struct CompositeInterpreter {
    interpreters: Vec<Arc<dyn ContextInterpreter>>,
}

impl CompositeInterpreter {
    /// An empty chain that understands nothing.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The chain covering reflection, with `factory` last.
    #[must_use]
    pub fn reflection(env: &InterpreterEnv, factory: Arc<FactoryInterpreter>) -> Self {
        Self::new()
            .with(Arc::new(ClassLookupInterpreter::new(env.clone())))
            .with(Arc::new(ClassNewInstanceInterpreter::new(env.clone())))
            .with(Arc::new(ReflectiveInvocationInterpreter::new(env.clone())))
            .with(Arc::new(GetMethodInterpreter::new(env.clone())))
            .with(Arc::new(JavaLangClassInterpreter::new(env.clone())))
            .with(Arc::new(GetAnnotationInterpreter::new(env.clone())))
            .with(Arc::new(MethodHandleFindInterpreter::new(env.clone())))
            .with(Arc::new(MethodHandleInvokeInterpreter::new(env.clone())))
            .with(Arc::new(GetClassInterpreter::new(env.clone())))
            .with(Arc::new(CloneInterpreter::new(env.clone())))
            .with(factory)
    }

    /// Appends an interpreter at the end of the chain.
    #[must_use]
    pub fn with(mut self, interpreter: Arc<dyn ContextInterpreter>) -> Self {
        self.interpreters.push(interpreter);
        self
    }

    /// Names of the chained interpreters in order.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.interpreters.iter().map(|i| i.name()).collect()
    }

    /// The first interpreter that understands `node`.
    #[must_use]
    pub fn interpreter_for(&self, node: &CgNode) -> Option<&Arc<dyn ContextInterpreter>> {
        self.interpreters.iter().find(|i| i.understands(node))
    }
}

impl ContextInterpreter for CompositeInterpreter {
    fn name(&self) -> &'static str {
        "composite"
    }

    fn understands(&self, node: &CgNode) -> bool {
        self.interpreter_for(node).is_some()
    }

    fn body(&self, node: &CgNode) -> Result<Arc<SyntheticIr>> {
        let interpreter = self
            .interpreter_for(node)
            .ok_or_else(|| Error::NotUnderstood(node.to_string()))?;
        trace!(interpreter = interpreter.name(), %node, "delegating body");
        interpreter.body(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        context::Context,
        summary::MethodSummaries,
        test::fixtures::shapes,
        types::{well_known, TypeAbstraction},
    };

    fn composite() -> CompositeInterpreter {
        let env = InterpreterEnv::new(Arc::new(shapes()), ReflectionConfig::default());
        let factory = Arc::new(FactoryInterpreter::new(env.clone(), Arc::new(MethodSummaries::new())));
        CompositeInterpreter::reflection(&env, factory)
    }

    #[test]
    fn test_not_understood() {
        let interpreter = composite();
        let node = CgNode::new(well_known::object_init(), Context::Everywhere);
        assert!(!interpreter.understands(&node));
        assert!(matches!(interpreter.body(&node), Err(Error::NotUnderstood(_))));
    }

    #[test]
    fn test_delegates_to_first_match() -> Result<()> {
        let interpreter = composite();
        assert_eq!(interpreter.names().len(), 11);

        let node = CgNode::new(
            well_known::class_for_name(),
            Context::JavaType(TypeAbstraction::exact(well_known::STRING)),
        );
        assert_eq!(
            interpreter.interpreter_for(&node).map(|i| i.name()),
            Some("class-lookup")
        );
        assert_eq!(interpreter.number_of_statements(&node)?, 0);
        assert!(Arc::ptr_eq(&interpreter.body(&node)?, &interpreter.body(&node)?));
        Ok(())
    }

    #[test]
    fn test_member_candidates() -> Result<()> {
        let hierarchy = shapes();
        let square = hierarchy
            .resolve(&TypeRef::application("Lshapes/Square"))
            .ok_or_else(|| internal_error!("Square missing"))?;

        let declared = member_candidates(&hierarchy, &square, ReflectiveIdiom::GetDeclaredMethods);
        let names: Vec<&str> = declared.iter().map(|m| m.reference.name()).collect();
        assert_eq!(names, vec!["area", "origin", "scale"]);

        let public = member_candidates(&hierarchy, &square, ReflectiveIdiom::GetMethods);
        assert!(public.iter().all(|m| m.is_public() && !m.is_init()));
        assert!(public.len() >= declared.len());

        assert_eq!(
            member_candidates(&hierarchy, &square, ReflectiveIdiom::GetConstructors).len(),
            1
        );
        assert!(member_candidates(&hierarchy, &square, ReflectiveIdiom::ObjectClone).is_empty());
        Ok(())
    }
}
