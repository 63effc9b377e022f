//! The reflection engine: context selection and body synthesis behind one handle.
//!
//! A call-graph builder owns one [`ReflectionEngine`] per analysis. For every call site
//! it asks [`ReflectionEngine::select`] whether the callee deserves a specialized
//! context; for every node created under such a context it asks
//! [`ReflectionEngine::body`] for the synthetic body to analyze instead of the
//! callee's real one.
//!
//! # Examples
//!
//! ```rust
//! use std::sync::Arc;
//! use reflectir::prelude::*;
//!
//! let hierarchy = TypeHierarchy::builder()
//!     .core_library()?
//!     .declare(ClassBuilder::new(TypeRef::application("Lapp/Plugin")).constructor("()V", MemberFlags::PUBLIC))?
//!     .build();
//! let engine = ReflectionEngine::new(Arc::new(hierarchy), Arc::new(MethodSummaries::new()), ReflectionConfig::default());
//!
//! let node = CgNode::new(
//!     well_known::class_new_instance(),
//!     Context::JavaType(TypeAbstraction::exact(TypeRef::application("Lapp/Plugin"))),
//! );
//! assert!(engine.understands(&node));
//! let body = engine.body(&node)?;
//! assert_eq!(body.allocation_sites().len(), 1);
//! # Ok::<(), reflectir::Error>(())
//! ```

use std::sync::Arc;

use rayon::prelude::*;
use tracing::debug;

use crate::{
    config::ReflectionConfig,
    context::{CallerEvidence, CgNode, Context, InstanceKey},
    events::{EventKind, EventLog},
    hierarchy::ClassHierarchy,
    interpreters::{CompositeInterpreter, ContextInterpreter, FactoryInterpreter, InterpreterEnv},
    selectors::CompositeSelector,
    ssa::CallSiteRef,
    summary::MethodSummaries,
    synthetic::SyntheticIr,
    types::{MethodRef, TypeRef},
    Result,
};

/// Selectors and interpreters for reflection and declared factories, sharing one
/// hierarchy, configuration and event log.
///
/// The engine is `Send + Sync`; all caches are concurrent maps and may be used from
/// several analysis threads at once.
pub struct ReflectionEngine {
    env: InterpreterEnv,
    selector: CompositeSelector,
    interpreter: CompositeInterpreter,
    factory: Arc<FactoryInterpreter>,
}

impl ReflectionEngine {
    /// Wires the full selector and interpreter chains.
    #[must_use]
    pub fn new(
        hierarchy: Arc<dyn ClassHierarchy>,
        summaries: Arc<MethodSummaries>,
        config: ReflectionConfig,
    ) -> Self {
        let selector = CompositeSelector::reflection(hierarchy.clone(), summaries.clone(), &config);
        let env = InterpreterEnv::new(hierarchy, config);
        let factory = Arc::new(FactoryInterpreter::new(env.clone(), summaries));
        let interpreter = CompositeInterpreter::reflection(&env, factory.clone());
        Self {
            env,
            selector,
            interpreter,
            factory,
        }
    }

    /// The context for calling `callee` from `site`, if any selector produces one.
    ///
    /// Selected contexts are recorded as [`EventKind::ContextSelected`].
    #[must_use]
    pub fn select(
        &self,
        caller: &CallerEvidence,
        site: &CallSiteRef,
        callee: &MethodRef,
        receiver: &[InstanceKey],
    ) -> Option<Context> {
        let context = self.selector.select(caller, site, callee, receiver)?;
        self.env
            .events
            .record(EventKind::ContextSelected)
            .method(callee)
            .context(&context)
            .message(format!("at {}:{}", caller.node.method, site.pc));
        Some(context)
    }

    /// Returns `true` if some interpreter builds bodies for `node`.
    #[must_use]
    pub fn understands(&self, node: &CgNode) -> bool {
        self.interpreter.understands(node)
    }

    /// The synthetic body of `node`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::NotUnderstood`] when no interpreter understands the
    /// node, and propagates construction errors.
    pub fn body(&self, node: &CgNode) -> Result<Arc<SyntheticIr>> {
        self.interpreter.body(node)
    }

    /// Builds the bodies of `nodes` on the rayon pool, in input order.
    ///
    /// Nodes no interpreter understands are skipped.
    ///
    /// # Errors
    ///
    /// Returns the first construction error encountered.
    pub fn bodies_parallel(&self, nodes: &[CgNode]) -> Result<Vec<Arc<SyntheticIr>>> {
        let bodies: Vec<Option<Arc<SyntheticIr>>> = nodes
            .par_iter()
            .map(|node| {
                if !self.understands(node) {
                    debug!(%node, "no interpreter for node");
                    return Ok(None);
                }
                self.body(node).map(Some)
            })
            .collect::<Result<_>>()?;
        Ok(bodies.into_iter().flatten().collect())
    }

    /// Records `ty` as produced by factories called in `context`.
    ///
    /// Returns `true` if the type is new; cached factory bodies of the context are
    /// rebuilt on their next [`body`](Self::body) call.
    pub fn record_type(&self, context: &Context, ty: TypeRef) -> bool {
        self.factory.record_type(context, ty)
    }

    /// The shared diagnostics log.
    #[must_use]
    pub fn events(&self) -> &EventLog {
        &self.env.events
    }

    /// The configuration the engine was built with.
    #[must_use]
    pub fn config(&self) -> &ReflectionConfig {
        &self.env.config
    }

    /// The hierarchy bodies are built against.
    #[must_use]
    pub fn hierarchy(&self) -> &dyn ClassHierarchy {
        self.env.hierarchy.as_ref()
    }

    /// The selector chain.
    #[must_use]
    pub fn selector(&self) -> &CompositeSelector {
        &self.selector
    }

    /// The interpreter chain.
    #[must_use]
    pub fn interpreter(&self) -> &CompositeInterpreter {
        &self.interpreter
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        context::SymbolTable,
        ssa::{Constant, Dispatch, ValueNumber},
        test::fixtures::shapes,
        types::{well_known, TypeAbstraction},
    };

    fn engine() -> ReflectionEngine {
        ReflectionEngine::new(
            Arc::new(shapes()),
            Arc::new(MethodSummaries::new()),
            ReflectionConfig::default(),
        )
    }

    #[test]
    fn test_class_for_name_to_new_instance() -> Result<()> {
        let engine = engine();
        let main = MethodRef::parse(TypeRef::application("Lapp/Main"), "main", "()V")?;
        let caller = CallerEvidence::new(
            Arc::new(CgNode::new(main, Context::Everywhere)),
            SymbolTable::new().with(ValueNumber(3), Constant::String("shapes.Square".into())),
        );
        let for_name = well_known::class_for_name();
        let site = CallSiteRef::new(0, for_name.clone(), Dispatch::Static, vec![ValueNumber(3)]);

        let context = engine
            .select(&caller, &site, &for_name, &[])
            .ok_or_else(|| internal_error!("Class.forName not selected"))?;
        let square = TypeRef::application("Lshapes/Square");
        assert_eq!(context, Context::JavaType(TypeAbstraction::exact(square.clone())));
        assert_eq!(engine.events().count_kind(EventKind::ContextSelected), 1);

        let node = CgNode::new(well_known::class_new_instance(), context);
        let body = engine.body(&node)?;
        assert_eq!(body.allocation_sites()[0].ty, square);
        Ok(())
    }

    #[test]
    fn test_bodies_parallel_skips_unknown_nodes() -> Result<()> {
        let engine = engine();
        let circle = TypeRef::application("Lshapes/Circle");
        let nodes = vec![
            CgNode::new(
                well_known::object_get_class(),
                Context::JavaType(TypeAbstraction::exact(circle.clone())),
            ),
            CgNode::new(well_known::object_get_class(), Context::Everywhere),
            CgNode::new(
                well_known::class_new_instance(),
                Context::JavaType(TypeAbstraction::exact(circle)),
            ),
        ];
        let bodies = engine.bodies_parallel(&nodes)?;
        assert_eq!(bodies.len(), 2);
        assert!(Arc::ptr_eq(&bodies[0], &engine.body(&nodes[0])?));
        Ok(())
    }
}
