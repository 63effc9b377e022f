//! `Object.clone()` on an object of known type.

use std::sync::Arc;

use tracing::debug;

use crate::{
    context::{CgNode, Context, ReflectiveIdiom},
    interpreters::{idiom_accessor, BodyCache, ContextInterpreter, InterpreterEnv},
    ssa::{Dispatch, VariableKey},
    synthetic::SyntheticIr,
    types::{well_known, TypeAbstraction, TypeRef},
    Error, Result,
};

/// Shallow copies.
///
/// Arrays are copied with `arraylength; new T[len]; System.arraycopy(src, dst)`.
/// Objects are allocated and every instance field declared along the superclass
/// chain is read from the receiver and written into the copy.
pub struct CloneInterpreter {
    env: InterpreterEnv,
    cache: BodyCache,
}

impl CloneInterpreter {
    /// Creates the interpreter.
    #[must_use]
    pub fn new(env: InterpreterEnv) -> Self {
        Self {
            env,
            cache: BodyCache::new(),
        }
    }

    fn cloned_type(node: &CgNode) -> Option<&TypeRef> {
        if ReflectiveIdiom::of(&node.method) != Some(ReflectiveIdiom::ObjectClone) {
            return None;
        }
        match &node.context {
            Context::JavaType(TypeAbstraction::Exact(ty)) => Some(ty),
            _ => None,
        }
    }

    fn build(&self, node: &CgNode, ty: &TypeRef) -> Result<SyntheticIr> {
        let accessor = idiom_accessor(node, ReflectiveIdiom::ObjectClone);
        let hierarchy = self.env.hierarchy.as_ref();
        let Some(class) = hierarchy.resolve(ty) else {
            debug!(%ty, "clone of an unknown type");
            return Ok(SyntheticIr::empty(node));
        };
        let ty = &class.reference;
        let source = accessor.receiver_as(ty, hierarchy)?;
        let mut method = self.env.builder(node, accessor)?;

        if ty.is_array() {
            let length = method.temp(&well_known::INT, |f, result, _| f.array_length(result, &source))?;
            let copy = method.define(ty, VariableKey::by_type(ty), |f, result, pc| {
                f.new_array(pc, result, ty, std::slice::from_ref(&length))
            })?;
            method.call(&well_known::system_arraycopy(), Dispatch::Static, &[source, copy.clone()])?;
            method.return_value(&copy)?;
            return Ok(method.finish());
        }

        let copy = method
            .allocate(ty)?
            .ok_or_else(|| internal_error!("{} allocated twice", ty))?;
        for declaring in hierarchy.superclass_chain(ty) {
            for field in declaring.instance_fields() {
                let field = &field.reference;
                let value = method.temp(&field.field_type_ref(), |f, result, _| {
                    f.get_field(result, &source, field)
                })?;
                let store = method.factory().put_field(&copy, &value, field)?;
                method.push(store);
            }
        }
        method.return_value(&copy)?;
        Ok(method.finish())
    }
}

impl ContextInterpreter for CloneInterpreter {
    fn name(&self) -> &'static str {
        "clone"
    }

    fn understands(&self, node: &CgNode) -> bool {
        Self::cloned_type(node).is_some()
    }

    fn body(&self, node: &CgNode) -> Result<Arc<SyntheticIr>> {
        let ty = Self::cloned_type(node).ok_or_else(|| Error::NotUnderstood(node.to_string()))?;
        self.env.cached(&self.cache, node, || self.build(node, ty))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::ReflectionConfig, ssa::Instruction, test::fixtures::shapes};

    fn clone_of(ty: TypeRef) -> Result<Arc<SyntheticIr>> {
        let env = InterpreterEnv::new(Arc::new(shapes()), ReflectionConfig::default());
        let node = CgNode::new(
            well_known::object_clone(),
            Context::JavaType(TypeAbstraction::exact(ty)),
        );
        CloneInterpreter::new(env).body(&node)
    }

    #[test]
    fn test_object_clone_copies_inherited_fields() -> Result<()> {
        let square = TypeRef::application("Lshapes/Square");
        let body = clone_of(square.clone())?;

        assert_eq!(body.allocation_sites()[0].ty, square);
        let fields_read = body.fields_read();
        let read: Vec<&str> = fields_read.iter().map(|f| f.name.as_ref()).collect();
        assert_eq!(read, vec!["side", "sides"]);
        assert_eq!(body.fields_read(), body.fields_written());
        assert!(body.call_sites().is_empty());
        Ok(())
    }

    #[test]
    fn test_array_clone() -> Result<()> {
        let ints = well_known::INT.array_of();
        let body = clone_of(ints.clone())?;

        assert!(matches!(
            body.instructions[0],
            Instruction::ArrayLength { array: crate::ssa::ValueNumber(1), .. }
        ));
        assert_eq!(body.allocation_sites()[0].ty, ints);
        assert_eq!(body.call_sites()[0].target, well_known::system_arraycopy());
        assert_eq!(body.returned_values().len(), 1);
        Ok(())
    }

    #[test]
    fn test_unknown_type_is_empty() -> Result<()> {
        let body = clone_of(TypeRef::application("Lshapes/Missing"))?;
        assert!(body.is_empty());
        Ok(())
    }
}
