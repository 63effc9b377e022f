//! `Class.getMethod` and `Class.getDeclaredMethod` with a literal method name.

use std::sync::Arc;

use tracing::debug;

use crate::{
    context::{CgNode, Context, ReflectiveIdiom},
    interpreters::{idiom_accessor, member_candidates, BodyCache, ContextInterpreter, InterpreterEnv},
    synthetic::SyntheticIr,
    types::{well_known, TypeAbstraction},
    Error, Result,
};

/// Returns one `Method` constant per method matching the context's name.
///
/// Overloads are not told apart: the parameter types passed to the lookup are not
/// part of the context, so every overload with the name is a possible result. No
/// match, or an unknown type, throws `NoSuchMethodException`.
pub struct GetMethodInterpreter {
    env: InterpreterEnv,
    cache: BodyCache,
}

impl GetMethodInterpreter {
    /// Creates the interpreter.
    #[must_use]
    pub fn new(env: InterpreterEnv) -> Self {
        Self {
            env,
            cache: BodyCache::new(),
        }
    }

    fn build(&self, node: &CgNode, idiom: ReflectiveIdiom) -> Result<SyntheticIr> {
        let mut method = self.env.builder(node, idiom_accessor(node, idiom))?;
        let (Some(ty), Some(name)) = (
            node.context.type_abstraction().and_then(TypeAbstraction::primary_type),
            node.context.method_name(),
        ) else {
            return Err(Error::NotUnderstood(node.to_string()));
        };

        let Some(class) = self.env.hierarchy.resolve(ty) else {
            debug!(%ty, name, "method lookup on an unknown type");
            method.throw_new(&well_known::NO_SUCH_METHOD_EXCEPTION)?;
            return Ok(method.finish());
        };

        let matches: Vec<_> = member_candidates(self.env.hierarchy.as_ref(), &class, idiom)
            .into_iter()
            .filter(|candidate| candidate.reference.name() == name)
            .collect();
        if matches.is_empty() {
            debug!(%ty, name, "no method with that name");
            method.throw_new(&well_known::NO_SUCH_METHOD_EXCEPTION)?;
        }
        for candidate in &matches {
            let constant = method.method_constant(&candidate.reference)?;
            method.return_value(&constant)?;
        }
        Ok(method.finish())
    }
}

impl ContextInterpreter for GetMethodInterpreter {
    fn name(&self) -> &'static str {
        "get-method"
    }

    fn understands(&self, node: &CgNode) -> bool {
        matches!(
            ReflectiveIdiom::of(&node.method),
            Some(ReflectiveIdiom::GetMethod | ReflectiveIdiom::GetDeclaredMethod)
        ) && matches!(node.context, Context::GetMethod { .. })
    }

    fn body(&self, node: &CgNode) -> Result<Arc<SyntheticIr>> {
        let idiom = ReflectiveIdiom::of(&node.method)
            .filter(|_| self.understands(node))
            .ok_or_else(|| Error::NotUnderstood(node.to_string()))?;
        self.env.cached(&self.cache, node, || self.build(node, idiom))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::ReflectionConfig,
        ssa::Constant,
        test::fixtures::shapes,
        types::{MethodRef, TypeRef},
    };

    fn lookup(callee: MethodRef, ty: &str, name: &str) -> Result<Arc<SyntheticIr>> {
        let env = InterpreterEnv::new(Arc::new(shapes()), ReflectionConfig::default());
        let node = CgNode::new(
            callee,
            Context::GetMethod {
                ty: TypeAbstraction::exact(TypeRef::application(ty)),
                name: name.to_string(),
            },
        );
        GetMethodInterpreter::new(env).body(&node)
    }

    fn returned_methods(body: &SyntheticIr) -> Vec<MethodRef> {
        body.returned_values()
            .into_iter()
            .filter_map(|v| body.constant(v).and_then(Constant::as_method).cloned())
            .collect()
    }

    #[test]
    fn test_get_method_sees_inherited_public_methods() -> Result<()> {
        let body = lookup(well_known::class_get_method(), "Lshapes/Square", "hashCode")?;
        let found = returned_methods(&body);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].declaring, well_known::OBJECT);
        Ok(())
    }

    #[test]
    fn test_get_declared_method_stays_in_class() -> Result<()> {
        let body = lookup(well_known::class_get_declared_method(), "Lshapes/Square", "scale")?;
        let found = returned_methods(&body);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].declaring, TypeRef::application("Lshapes/Square"));

        let inherited = lookup(well_known::class_get_declared_method(), "Lshapes/Square", "hashCode")?;
        assert_eq!(inherited.allocation_sites()[0].ty, well_known::NO_SUCH_METHOD_EXCEPTION);
        Ok(())
    }

    #[test]
    fn test_unknown_type_throws() -> Result<()> {
        let body = lookup(well_known::class_get_method(), "Lshapes/Missing", "area")?;
        assert_eq!(body.allocation_sites()[0].ty, well_known::NO_SUCH_METHOD_EXCEPTION);
        assert!(body.returned_values().is_empty());
        Ok(())
    }
}
