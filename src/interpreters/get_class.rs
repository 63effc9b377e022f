//! `Object.getClass()` on an object of known type.

use std::sync::Arc;

use tracing::debug;

use crate::{
    context::{CgNode, Context, ReflectiveIdiom},
    interpreters::{idiom_accessor, BodyCache, ContextInterpreter, InterpreterEnv},
    synthetic::SyntheticIr,
    types::TypeAbstraction,
    Error, Result,
};

/// Returns the class literal of the receiver's exact type.
pub struct GetClassInterpreter {
    env: InterpreterEnv,
    cache: BodyCache,
}

impl GetClassInterpreter {
    /// Creates the interpreter.
    #[must_use]
    pub fn new(env: InterpreterEnv) -> Self {
        Self {
            env,
            cache: BodyCache::new(),
        }
    }

    fn build(&self, node: &CgNode) -> Result<SyntheticIr> {
        let ty = match &node.context {
            Context::JavaType(TypeAbstraction::Exact(ty)) => ty,
            other => {
                debug!(%other, "getClass without an exact type");
                return Ok(SyntheticIr::empty(node));
            }
        };
        let Some(class) = self.env.hierarchy.resolve(ty) else {
            debug!(%ty, "getClass on an unknown type");
            return Ok(SyntheticIr::empty(node));
        };

        let mut method = self
            .env
            .builder(node, idiom_accessor(node, ReflectiveIdiom::ObjectGetClass))?;
        let literal = method.load_type(&class.reference)?;
        method.return_value(&literal)?;
        Ok(method.finish())
    }
}

impl ContextInterpreter for GetClassInterpreter {
    fn name(&self) -> &'static str {
        "get-class"
    }

    fn understands(&self, node: &CgNode) -> bool {
        ReflectiveIdiom::of(&node.method) == Some(ReflectiveIdiom::ObjectGetClass)
            && matches!(node.context, Context::JavaType(_))
    }

    fn body(&self, node: &CgNode) -> Result<Arc<SyntheticIr>> {
        if !self.understands(node) {
            return Err(Error::NotUnderstood(node.to_string()));
        }
        self.env.cached(&self.cache, node, || self.build(node))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::ReflectionConfig,
        ssa::{Constant, Instruction, ValueNumber},
        test::fixtures::shapes,
        types::{well_known, TypeRef},
    };

    #[test]
    fn test_returns_class_literal() -> Result<()> {
        let interpreter =
            GetClassInterpreter::new(InterpreterEnv::new(Arc::new(shapes()), ReflectionConfig::default()));
        let circle = TypeRef::application("Lshapes/Circle");
        let node = CgNode::new(
            well_known::object_get_class(),
            Context::JavaType(TypeAbstraction::exact(circle.clone())),
        );

        let body = interpreter.body(&node)?;
        assert_eq!(
            body.instructions,
            vec![
                Instruction::LoadMetadata {
                    result: ValueNumber(2),
                    token: circle.clone(),
                },
                Instruction::Return {
                    value: Some(ValueNumber(2)),
                },
            ]
        );
        assert_eq!(body.constant(ValueNumber(2)), Some(&Constant::Type(circle)));

        let cone = CgNode::new(
            well_known::object_get_class(),
            Context::JavaType(TypeAbstraction::cone(TypeRef::application("Lshapes/Shape"))),
        );
        assert!(interpreter.body(&cone)?.is_empty());
        Ok(())
    }
}
