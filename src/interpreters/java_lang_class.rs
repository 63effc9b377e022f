//! Constructor and method lookups on `java.lang.Class` without a name context.

use std::sync::Arc;

use tracing::debug;

use crate::{
    context::{CgNode, Context, ReflectiveIdiom},
    hierarchy::MethodInfo,
    interpreters::{idiom_accessor, member_candidates, BodyCache, ContextInterpreter, InterpreterEnv},
    ssa::VariableKey,
    synthetic::{SpecializedMethod, SyntheticIr},
    types::{well_known, TypeAbstraction, TypeRef},
    Error, Result,
};

/// Bodies for `getConstructor(s)`, `getMethods` and their declared variants, plus
/// `getMethod`/`getDeclaredMethod` when the name is unknown.
///
/// Single-result lookups return one member constant per candidate; array lookups fill
/// a `Method[]` or `Constructor[]` with every candidate at literal indices.
pub struct JavaLangClassInterpreter {
    env: InterpreterEnv,
    cache: BodyCache,
}

/// Shape of a lookup's result.
enum LookupResult {
    Single,
    Array(TypeRef),
}

impl JavaLangClassInterpreter {
    /// Creates the interpreter.
    #[must_use]
    pub fn new(env: InterpreterEnv) -> Self {
        Self {
            env,
            cache: BodyCache::new(),
        }
    }

    fn result_shape(idiom: ReflectiveIdiom) -> Option<LookupResult> {
        match idiom {
            ReflectiveIdiom::GetMethod
            | ReflectiveIdiom::GetDeclaredMethod
            | ReflectiveIdiom::GetConstructor
            | ReflectiveIdiom::GetDeclaredConstructor => Some(LookupResult::Single),
            ReflectiveIdiom::GetMethods | ReflectiveIdiom::GetDeclaredMethods => {
                Some(LookupResult::Array(well_known::METHOD_ARRAY))
            }
            ReflectiveIdiom::GetConstructors | ReflectiveIdiom::GetDeclaredConstructors => {
                Some(LookupResult::Array(well_known::CONSTRUCTOR_ARRAY))
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
            | ReflectiveIdiom::MethodHandleType => None,
        }
    }

    fn lookup(node: &CgNode) -> Option<(ReflectiveIdiom, LookupResult, &TypeRef)> {
        let idiom = ReflectiveIdiom::of(&node.method)?;
        let shape = Self::result_shape(idiom)?;
        match &node.context {
            Context::JavaType(TypeAbstraction::Exact(ty)) => Some((idiom, shape, ty)),
            _ => None,
        }
    }

    fn build(
        &self,
        node: &CgNode,
        idiom: ReflectiveIdiom,
        shape: &LookupResult,
        ty: &TypeRef,
    ) -> Result<SyntheticIr> {
        let mut method = self.env.builder(node, idiom_accessor(node, idiom))?;
        let Some(class) = self.env.hierarchy.resolve(ty) else {
            debug!(%ty, %idiom, "member lookup on an unknown type");
            method.throw_new(&well_known::NO_SUCH_METHOD_EXCEPTION)?;
            return Ok(method.finish());
        };
        let candidates = member_candidates(self.env.hierarchy.as_ref(), &class, idiom);

        match shape {
            LookupResult::Single if candidates.is_empty() => {
                method.throw_new(&well_known::NO_SUCH_METHOD_EXCEPTION)?;
            }
            LookupResult::Single => {
                for candidate in &candidates {
                    let constant = method.method_constant(&candidate.reference)?;
                    method.return_value(&constant)?;
                }
            }
            LookupResult::Array(array_type) => {
                Self::fill_array(&mut method, array_type, &candidates)?;
            }
        }
        Ok(method.finish())
    }

    fn fill_array(
        method: &mut SpecializedMethod<'_>,
        array_type: &TypeRef,
        candidates: &[MethodInfo],
    ) -> Result<()> {
        let length = i32::try_from(candidates.len())
            .map_err(|_| Error::InvalidArgument(format!("{} members", candidates.len())))?;
        let length = method.int_constant(length)?;
        let array = method.define(array_type, VariableKey::by_type(array_type), |f, result, pc| {
            f.new_array(pc, result, array_type, std::slice::from_ref(&length))
        })?;

        for (position, candidate) in (0_i32..).zip(candidates) {
            let index = method.int_constant(position)?;
            let constant = method.method_constant(&candidate.reference)?;
            let store = method.factory().array_store(&array, &index, &constant)?;
            method.push(store);
        }
        method.return_value(&array)
    }
}

impl ContextInterpreter for JavaLangClassInterpreter {
    fn name(&self) -> &'static str {
        "java-lang-class"
    }

    fn understands(&self, node: &CgNode) -> bool {
        Self::lookup(node).is_some()
    }

    fn body(&self, node: &CgNode) -> Result<Arc<SyntheticIr>> {
        let (idiom, shape, ty) =
            Self::lookup(node).ok_or_else(|| Error::NotUnderstood(node.to_string()))?;
        self.env
            .cached(&self.cache, node, || self.build(node, idiom, &shape, ty))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::ReflectionConfig,
        ssa::{Constant, Instruction},
        test::fixtures::shapes,
        types::MethodRef,
    };

    fn lookup_body(callee: MethodRef, ty: &str) -> Result<Arc<SyntheticIr>> {
        let env = InterpreterEnv::new(Arc::new(shapes()), ReflectionConfig::default());
        let node = CgNode::new(
            callee,
            Context::JavaType(TypeAbstraction::exact(TypeRef::application(ty))),
        );
        JavaLangClassInterpreter::new(env).body(&node)
    }

    #[test]
    fn test_declared_constructors_array() -> Result<()> {
        let body = lookup_body(well_known::class_get_declared_constructors(), "Lshapes/Circle")?;
        assert_eq!(body.allocation_sites()[0].ty, well_known::CONSTRUCTOR_ARRAY);

        let stored: Vec<String> = body
            .instructions
            .iter()
            .filter_map(|i| match i {
                Instruction::ArrayStore { value, .. } => body.constant(*value),
                _ => None,
            })
            .filter_map(Constant::as_method)
            .map(|m| m.selector.to_string())
            .collect();
        assert_eq!(stored, vec!["<init>()V", "<init>(D)V"]);

        let Instruction::New { sizes, .. } = &body.instructions[0] else {
            return Err(internal_error!("array allocation expected first"));
        };
        assert_eq!(body.constant(sizes[0]), Some(&Constant::Int(2)));
        assert_eq!(body.returned_values().len(), 1);
        Ok(())
    }

    #[test]
    fn test_public_constructor_lookup() -> Result<()> {
        let body = lookup_body(well_known::class_get_constructor(), "Lshapes/Square")?;
        assert_eq!(body.returned_values().len(), 1);

        let secret = lookup_body(well_known::class_get_constructor(), "Lshapes/Secret")?;
        assert_eq!(secret.allocation_sites()[0].ty, well_known::NO_SUCH_METHOD_EXCEPTION);

        let declared = lookup_body(well_known::class_get_declared_constructor(), "Lshapes/Secret")?;
        assert_eq!(declared.returned_values().len(), 1);
        Ok(())
    }

    #[test]
    fn test_method_without_name_returns_every_candidate() -> Result<()> {
        let body = lookup_body(well_known::class_get_declared_method(), "Lshapes/Square")?;
        assert_eq!(body.returned_values().len(), 3);
        Ok(())
    }
}
