//! Bounded factories: declared summaries extended with the types seen at a call site.

use std::{collections::BTreeSet, sync::Arc};

use dashmap::DashMap;
use tracing::{debug, trace};

use crate::{
    context::{CgNode, Context},
    events::EventKind,
    interpreters::{BodyCache, ContextInterpreter, InterpreterEnv},
    ssa::ParameterAccessor,
    summary::MethodSummaries,
    synthetic::SyntheticIr,
    types::{TypeAbstraction, TypeRef},
    Error, Result,
};

/// Bodies for calls to declared factory methods.
///
/// A factory body starts with the method's summary statements and then, for every type
/// recorded against the node's context, returns a fresh object of each concrete type in
/// that type's cone. Recording a new type evicts the context's cached bodies; the next
/// [`body`](ContextInterpreter::body) call rebuilds them in full.
///
/// # Thread Safety
///
/// [`record_type`](Self::record_type) holds the recorded-types entry of the context
/// while evicting, and body construction reads the recorded set under the same entry
/// lock before publishing. A body built from a stale set can therefore never be cached
/// after the recording that made it stale.
pub struct FactoryInterpreter {
    env: InterpreterEnv,
    summaries: Arc<MethodSummaries>,
    recorded: DashMap<Context, BTreeSet<TypeRef>>,
    cache: BodyCache,
}

impl FactoryInterpreter {
    /// Creates the interpreter for the factories declared in `summaries`.
    #[must_use]
    pub fn new(env: InterpreterEnv, summaries: Arc<MethodSummaries>) -> Self {
        Self {
            env,
            summaries,
            recorded: DashMap::new(),
            cache: BodyCache::new(),
        }
    }

    /// Records `ty` as a type flowing out of factories called in `context`.
    ///
    /// Returns `true` if the type is new for the context; cached bodies of the context
    /// are evicted in that case. Repeating a type keeps the cache intact.
    pub fn record_type(&self, context: &Context, ty: TypeRef) -> bool {
        let mut types = self.recorded.entry(context.clone()).or_default();
        if types.contains(&ty) {
            trace!(%context, %ty, "type already recorded");
            return false;
        }
        self.env
            .events
            .record(EventKind::TypeRecorded)
            .context(context)
            .message(ty.to_string());
        types.insert(ty);

        let mut evicted = 0_usize;
        self.cache.retain(|node, _| {
            let stale = node.context == *context;
            evicted += usize::from(stale);
            !stale
        });
        if evicted > 0 {
            self.env
                .events
                .record(EventKind::BodyInvalidated)
                .context(context)
                .message(format!("{evicted} bodies"));
        }
        true
    }

    /// The types recorded for `context`, in order.
    #[must_use]
    pub fn recorded_types(&self, context: &Context) -> Vec<TypeRef> {
        self.recorded
            .get(context)
            .map(|types| types.iter().cloned().collect())
            .unwrap_or_default()
    }

    fn accessor(&self, node: &CgNode) -> ParameterAccessor {
        match ParameterAccessor::resolve(node.method.clone(), self.env.hierarchy.as_ref()) {
            Ok(accessor) => accessor,
            Err(error) => {
                debug!(method = %node.method, %error, "numbering unresolvable factory as static");
                ParameterAccessor::from_signature(node.method.clone(), false)
            }
        }
    }

    fn build(&self, node: &CgNode, types: &BTreeSet<TypeRef>) -> Result<SyntheticIr> {
        let mut method = self.env.builder(node, self.accessor(node))?;
        if let Some(summary) = self.summaries.summary(&node.method) {
            method = method.with_summary(&summary);
        }
        for ty in types {
            method.add_type_abstraction(
                &TypeAbstraction::cone(ty.clone()),
                &self.env.config,
                &self.env.events,
            )?;
        }
        Ok(method.finish())
    }
}

impl ContextInterpreter for FactoryInterpreter {
    fn name(&self) -> &'static str {
        "factory"
    }

    fn understands(&self, node: &CgNode) -> bool {
        self.summaries.is_factory(&node.method) && matches!(node.context, Context::CallerSite { .. })
    }

    fn body(&self, node: &CgNode) -> Result<Arc<SyntheticIr>> {
        if !self.understands(node) {
            return Err(Error::NotUnderstood(node.to_string()));
        }
        let hit = self.cache.get(node).map(|entry| entry.value().clone());
        if let Some(hit) = hit {
            return Ok(hit);
        }

        // Held until the body is published so a concurrent record_type waits for it.
        let types = self.recorded.entry(node.context.clone()).or_default();
        self.env.cached(&self.cache, node, || self.build(node, &types))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::ReflectionConfig,
        context::CgNode,
        ssa::{CallSiteRef, Constant, Dispatch, Instruction, ValueNumber},
        summary::MethodSummary,
        test::fixtures::shapes,
        types::MethodRef,
    };

    struct Fixture {
        interpreter: FactoryInterpreter,
        node: CgNode,
    }

    fn fixture() -> Result<Fixture> {
        let create = MethodRef::parse(
            TypeRef::application("Lapp/Registry"),
            "create",
            "()Ljava/lang/Object;",
        )?;
        let summary = MethodSummary::new(create.clone())
            .factory()
            .constant(ValueNumber(4), Constant::Null)
            .statement(Instruction::Return {
                value: Some(ValueNumber(4)),
            });
        let env = InterpreterEnv::new(Arc::new(shapes()), ReflectionConfig::default());
        let interpreter = FactoryInterpreter::new(env, Arc::new(MethodSummaries::new().with(summary)));

        let main = MethodRef::parse(TypeRef::application("Lapp/Main"), "main", "()V")?;
        let caller = Arc::new(CgNode::new(main, Context::Everywhere));
        let site = CallSiteRef::new(5, create.clone(), Dispatch::Static, Vec::new());
        let node = CgNode::new(create, Context::CallerSite { caller, site });
        Ok(Fixture { interpreter, node })
    }

    #[test]
    fn test_summary_alone_without_recorded_types() -> Result<()> {
        let Fixture { interpreter, node } = fixture()?;
        let body = interpreter.body(&node)?;
        assert_eq!(
            body.instructions,
            vec![Instruction::Return {
                value: Some(ValueNumber(4))
            }]
        );
        assert_eq!(body.constant(ValueNumber(4)), Some(&Constant::Null));
        Ok(())
    }

    #[test]
    fn test_record_type_invalidates() -> Result<()> {
        let Fixture { interpreter, node } = fixture()?;
        let before = interpreter.body(&node)?;
        assert!(Arc::ptr_eq(&before, &interpreter.body(&node)?));

        let polygon = TypeRef::application("Lshapes/Polygon");
        assert!(interpreter.record_type(&node.context, polygon.clone()));
        assert!(interpreter.env.events.has(EventKind::BodyInvalidated));

        let after = interpreter.body(&node)?;
        assert!(!Arc::ptr_eq(&before, &after));
        let allocated: Vec<TypeRef> = after.allocation_sites().into_iter().map(|s| s.ty).collect();
        assert_eq!(allocated.len(), 3);
        assert!(allocated.contains(&polygon));
        // Fresh numbers continue after the summary's v4
        assert!(matches!(
            after.instructions[1],
            Instruction::New {
                result: ValueNumber(5),
                ..
            }
        ));

        assert!(!interpreter.record_type(&node.context, polygon.clone()));
        assert!(Arc::ptr_eq(&after, &interpreter.body(&node)?));
        assert_eq!(interpreter.recorded_types(&node.context), vec![polygon]);
        Ok(())
    }

    #[test]
    fn test_requires_call_site_context() -> Result<()> {
        let Fixture { interpreter, node } = fixture()?;
        let everywhere = CgNode::new(node.method.clone(), Context::Everywhere);
        assert!(!interpreter.understands(&everywhere));
        assert!(interpreter.understands(&node));
        Ok(())
    }
}
