//! `Class.newInstance()` on a known class.

use std::sync::Arc;

use tracing::debug;

use crate::{
    context::{CgNode, Context, ReflectiveIdiom},
    interpreters::{idiom_accessor, BodyCache, ContextInterpreter, InterpreterEnv},
    synthetic::{SpecializedMethod, SyntheticIr},
    types::{well_known, TypeAbstraction, TypeRef},
    Error, Result,
};

/// Bodies for no-argument reflective construction.
///
/// For each type `T` of the context:
///
/// | `T`                                         | body                                   |
/// |---------------------------------------------|----------------------------------------|
/// | concrete, public `()V` constructor          | `new T; invokespecial T.<init>()V; return` |
/// | concrete, non-public `()V` constructor      | `new IllegalAccessException; throw`    |
/// | no `()V`, abstract, interface or unknown    | `new InstantiationException; throw`    |
///
/// `Cone` contexts go through the regular cone expansion instead.
pub struct ClassNewInstanceInterpreter {
    env: InterpreterEnv,
    cache: BodyCache,
}

impl ClassNewInstanceInterpreter {
    /// Creates the interpreter.
    #[must_use]
    pub fn new(env: InterpreterEnv) -> Self {
        Self {
            env,
            cache: BodyCache::new(),
        }
    }

    fn build(&self, node: &CgNode, abstraction: &TypeAbstraction) -> Result<SyntheticIr> {
        let accessor = idiom_accessor(node, ReflectiveIdiom::ClassNewInstance);
        let mut method = self.env.builder(node, accessor)?;
        if let TypeAbstraction::Cone(_) = abstraction {
            method.add_type_abstraction(abstraction, &self.env.config, &self.env.events)?;
        } else {
            for ty in abstraction.types() {
                Self::instantiate(&mut method, ty)?;
            }
        }
        Ok(method.finish())
    }

    fn instantiate(method: &mut SpecializedMethod<'_>, ty: &TypeRef) -> Result<()> {
        let Some(class) = method.hierarchy().resolve(ty) else {
            debug!(%ty, "newInstance on an unknown class");
            return method.throw_new(&well_known::INSTANTIATION_EXCEPTION);
        };
        if class.is_abstract() || class.is_array() {
            return method.throw_new(&well_known::INSTANTIATION_EXCEPTION);
        }
        let Some(constructor) = class.default_constructor() else {
            return method.throw_new(&well_known::INSTANTIATION_EXCEPTION);
        };
        if !constructor.is_public() {
            return method.throw_new(&well_known::ILLEGAL_ACCESS_EXCEPTION);
        }

        let ty = &class.reference;
        if let Some(object) = method.allocate(ty)? {
            method.call_default_init(ty, &object)?;
            method.return_value(&object)?;
        }
        Ok(())
    }
}

impl ContextInterpreter for ClassNewInstanceInterpreter {
    fn name(&self) -> &'static str {
        "class-new-instance"
    }

    fn understands(&self, node: &CgNode) -> bool {
        ReflectiveIdiom::of(&node.method) == Some(ReflectiveIdiom::ClassNewInstance)
            && matches!(node.context, Context::JavaType(_))
    }

    fn body(&self, node: &CgNode) -> Result<Arc<SyntheticIr>> {
        let Context::JavaType(abstraction) = &node.context else {
            return Err(Error::NotUnderstood(node.to_string()));
        };
        if !self.understands(node) {
            return Err(Error::NotUnderstood(node.to_string()));
        }
        self.env
            .cached(&self.cache, node, || self.build(node, abstraction))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::ReflectionConfig,
        ssa::{Dispatch, Instruction},
        test::fixtures::shapes,
    };

    fn body_for(ty: &str) -> Result<Arc<SyntheticIr>> {
        let env = InterpreterEnv::new(Arc::new(shapes()), ReflectionConfig::default());
        let node = CgNode::new(
            well_known::class_new_instance(),
            Context::JavaType(TypeAbstraction::exact(TypeRef::application(ty))),
        );
        ClassNewInstanceInterpreter::new(env).body(&node)
    }

    fn thrown_type(body: &SyntheticIr) -> Option<TypeRef> {
        match body.instructions.as_slice() {
            [Instruction::New { site, .. }, Instruction::Throw { .. }] => Some(site.ty.clone()),
            _ => None,
        }
    }

    #[test]
    fn test_public_default_constructor() -> Result<()> {
        let body = body_for("Lshapes/Square")?;
        assert_eq!(body.number_of_statements(), 3);
        assert_eq!(body.allocation_sites()[0].ty, TypeRef::application("Lshapes/Square"));

        let calls = body.call_sites();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].target.is_init());
        assert_eq!(calls[0].dispatch, Dispatch::Special);
        assert_eq!(calls[0].args, vec![crate::ssa::ValueNumber(2)]);
        assert_eq!(
            body.instructions[2],
            Instruction::Return {
                value: Some(crate::ssa::ValueNumber(2))
            }
        );
        Ok(())
    }

    #[test]
    fn test_missing_default_constructor() -> Result<()> {
        let body = body_for("Lshapes/Triangle")?;
        assert_eq!(thrown_type(&body), Some(well_known::INSTANTIATION_EXCEPTION));

        let body = body_for("Lshapes/Canvas")?;
        assert_eq!(thrown_type(&body), Some(well_known::INSTANTIATION_EXCEPTION));

        let body = body_for("Lshapes/Unknown")?;
        assert_eq!(thrown_type(&body), Some(well_known::INSTANTIATION_EXCEPTION));
        Ok(())
    }

    #[test]
    fn test_private_default_constructor() -> Result<()> {
        let body = body_for("Lshapes/Secret")?;
        assert_eq!(thrown_type(&body), Some(well_known::ILLEGAL_ACCESS_EXCEPTION));
        Ok(())
    }
}
