//! `Constructor.newInstance(Object[])` and `Method.invoke(Object, Object[])` on a known
//! member.
//!
//! Arguments arrive packed in an `Object[]`. The body unpacks element `i` with a
//! literal index, casts it to the declared parameter type and, for primitive
//! parameters, unboxes it through the wrapper's `<prim>Value()` accessor. Primitive
//! results are boxed with `<Box>.valueOf` on the way out.

use std::sync::Arc;

use tracing::debug;

use crate::{
    config::ReflectionConfig,
    context::{CgNode, ReflectiveIdiom},
    interpreters::{idiom_accessor, BodyCache, ContextInterpreter, InterpreterEnv},
    ssa::{Constant, Dispatch, ParameterAccessor, SsaValue},
    synthetic::{SpecializedMethod, SyntheticIr},
    types::{well_known, MethodRef, TypeRef},
    Error, Result,
};

/// Unpacks one argument per `declared` type from the `Object[]` in `array`.
///
/// Element `i` is cast to `declared[i]`; primitive types are unboxed, or replaced by a
/// zero when `config` disables unboxing. `owner` only names the target in errors.
pub(super) fn unpack_arguments(
    method: &mut SpecializedMethod<'_>,
    config: &ReflectionConfig,
    owner: &MethodRef,
    declared: &[TypeRef],
    array: &SsaValue,
) -> Result<Vec<SsaValue>> {
    let mut arguments = Vec::with_capacity(declared.len());
    for (position, declared) in declared.iter().enumerate() {
        let primitive = declared.primitive();
        if primitive.is_some() && !config.unbox_primitive_arguments {
            arguments.push(method.zero(declared)?);
            continue;
        }

        let index = i32::try_from(position)
            .map_err(|_| Error::InvalidArgument(format!("{owner} has too many parameters")))?;
        let index = method.int_constant(index)?;
        let element = method.temp(&well_known::OBJECT, |f, result, _| {
            f.array_load(result, array, &index)
        })?;

        let Some(primitive) = primitive else {
            let cast = method.temp(declared, |f, result, _| f.check_cast(result, &element))?;
            arguments.push(cast);
            continue;
        };
        let (Some(boxed), Some(unbox)) = (primitive.box_type(), well_known::unbox_value(primitive))
        else {
            return Err(Error::InvalidArgument(format!("parameter {position} of {owner} is void")));
        };
        let boxed = TypeRef::new(unbox.declaring.loader.clone(), boxed);
        let cast = method.temp(&boxed, |f, result, _| f.check_cast(result, &element))?;
        let value = method
            .call(&unbox, Dispatch::Virtual, &[cast])?
            .ok_or_else(|| internal_error!("{} returns no value", unbox))?;
        arguments.push(value);
    }
    Ok(arguments)
}

/// `result` as an `Object`: primitives are boxed with `<Box>.valueOf`, or replaced by
/// `null` when `config` disables boxing.
pub(super) fn box_result(
    method: &mut SpecializedMethod<'_>,
    config: &ReflectionConfig,
    result: SsaValue,
) -> Result<SsaValue> {
    match result.ty().primitive() {
        None => Ok(result),
        Some(_) if !config.box_primitive_results => {
            method.constant(&well_known::OBJECT, Constant::Null)
        }
        Some(primitive) => {
            let value_of = well_known::box_value_of(primitive)
                .ok_or_else(|| internal_error!("{} has no box type", primitive))?;
            method
                .call(&value_of, Dispatch::Static, &[result])?
                .ok_or_else(|| internal_error!("{} returns no value", value_of))
        }
    }
}

/// Bodies for reflective construction with arguments and reflective invocation.
pub struct ReflectiveInvocationInterpreter {
    env: InterpreterEnv,
    cache: BodyCache,
}

impl ReflectiveInvocationInterpreter {
    /// Creates the interpreter.
    #[must_use]
    pub fn new(env: InterpreterEnv) -> Self {
        Self {
            env,
            cache: BodyCache::new(),
        }
    }

    /// The reflected member and whether the node constructs.
    fn target(node: &CgNode) -> Option<(&MethodRef, bool)> {
        let constructs = match ReflectiveIdiom::of(&node.method)? {
            ReflectiveIdiom::ConstructorNewInstance => true,
            ReflectiveIdiom::MethodInvoke => false,
            _ => return None,
        };
        match node.context.receiver_constant()? {
            Constant::Method(target) if target.is_init() == constructs => Some((target, constructs)),
            _ => None,
        }
    }

    fn construct(&self, node: &CgNode, target: &MethodRef) -> Result<SyntheticIr> {
        let accessor = idiom_accessor(node, ReflectiveIdiom::ConstructorNewInstance);
        let array = accessor.parameter(1)?;
        let mut method = self.env.builder(node, accessor)?;

        let instantiable = method
            .hierarchy()
            .resolve(&target.declaring)
            .is_some_and(|class| !class.is_abstract());
        if !instantiable {
            debug!(%target, "constructor of an abstract or unknown class");
            method.throw_new(&well_known::INSTANTIATION_EXCEPTION)?;
            return Ok(method.finish());
        }

        let object = method
            .allocate(&target.declaring)?
            .ok_or_else(|| internal_error!("{} allocated twice", target.declaring))?;
        let arguments = unpack_arguments(
            &mut method,
            &self.env.config,
            target,
            &target.parameter_types(),
            &array,
        )?;
        let operands: Vec<SsaValue> = std::iter::once(object.clone()).chain(arguments).collect();
        method.call(target, Dispatch::Special, &operands)?;
        method.return_value(&object)?;
        Ok(method.finish())
    }

    fn invoke(&self, node: &CgNode, target: &MethodRef) -> Result<SyntheticIr> {
        let accessor = idiom_accessor(node, ReflectiveIdiom::MethodInvoke);
        let receiver = accessor.parameter(1)?;
        let array = accessor.parameter(2)?;
        let mut method = self.env.builder(node, accessor)?;

        let has_receiver = match ParameterAccessor::resolve(target.clone(), method.hierarchy()) {
            Ok(callee) => callee.has_receiver(),
            Err(error) => {
                debug!(%target, %error, "treating unresolvable target as an instance method");
                true
            }
        };

        let mut operands = Vec::with_capacity(target.parameter_count() + 1);
        if has_receiver {
            let cast = method.temp(&target.declaring, |f, result, _| f.check_cast(result, &receiver))?;
            operands.push(cast);
        }
        operands.extend(unpack_arguments(
            &mut method,
            &self.env.config,
            target,
            &target.parameter_types(),
            &array,
        )?);

        let dispatch = if has_receiver {
            Dispatch::Virtual
        } else {
            Dispatch::Static
        };
        let Some(result) = method.call(target, dispatch, &operands)? else {
            return Ok(method.finish());
        };

        let returned = box_result(&mut method, &self.env.config, result)?;
        method.return_value(&returned)?;
        Ok(method.finish())
    }
}

impl ContextInterpreter for ReflectiveInvocationInterpreter {
    fn name(&self) -> &'static str {
        "reflective-invocation"
    }

    fn understands(&self, node: &CgNode) -> bool {
        Self::target(node).is_some()
    }

    fn body(&self, node: &CgNode) -> Result<Arc<SyntheticIr>> {
        let (target, constructs) =
            Self::target(node).ok_or_else(|| Error::NotUnderstood(node.to_string()))?;
        self.env.cached(&self.cache, node, || {
            if constructs {
                self.construct(node, target)
            } else {
                self.invoke(node, target)
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        context::Context,
        ssa::{Instruction, ValueNumber},
        test::fixtures::shapes,
    };

    fn node(callee: MethodRef, target: MethodRef) -> CgNode {
        CgNode::new(callee, Context::ReceiverInstance(Constant::Method(target)))
    }

    fn interpreter(config: ReflectionConfig) -> ReflectiveInvocationInterpreter {
        ReflectiveInvocationInterpreter::new(InterpreterEnv::new(Arc::new(shapes()), config))
    }

    #[test]
    fn test_constructor_with_primitive_argument() -> Result<()> {
        let circle = TypeRef::application("Lshapes/Circle");
        let ctor = MethodRef::parse(circle.clone(), "<init>", "(D)V")?;
        let body = interpreter(ReflectionConfig::default())
            .body(&node(well_known::constructor_new_instance(), ctor.clone()))?;

        assert_eq!(body.allocation_sites()[0].ty, circle);
        assert!(matches!(
            body.instructions[1],
            Instruction::ArrayLoad {
                array: ValueNumber(2),
                ..
            }
        ));
        assert_eq!(body.cast_types(), vec![TypeRef::primordial("Ljava/lang/Double")]);

        let targets: Vec<String> = body.call_sites().iter().map(|c| c.target.name().to_string()).collect();
        assert_eq!(targets, vec!["doubleValue", "<init>"]);
        assert!(matches!(body.instructions.last(), Some(Instruction::Return { value: Some(_) })));
        Ok(())
    }

    #[test]
    fn test_instance_invocation_boxes_result() -> Result<()> {
        let square = TypeRef::application("Lshapes/Square");
        let area = MethodRef::parse(square.clone(), "area", "()D")?;
        let body = interpreter(ReflectionConfig::default())
            .body(&node(well_known::method_invoke(), area.clone()))?;

        assert_eq!(body.cast_types(), vec![square]);
        let calls = body.call_sites();
        assert_eq!(calls[0].target, area);
        assert_eq!(calls[0].dispatch, Dispatch::Virtual);
        assert_eq!(calls[1].target.name(), "valueOf");
        assert_eq!(body.returned_values().len(), 1);
        Ok(())
    }

    #[test]
    fn test_static_invocation_skips_receiver() -> Result<()> {
        let origin = MethodRef::parse(TypeRef::application("Lshapes/Square"), "origin", "()Lshapes/Square;")?;
        let body = interpreter(ReflectionConfig::default())
            .body(&node(well_known::method_invoke(), origin.clone()))?;
        assert!(body.cast_types().is_empty());
        assert_eq!(body.call_sites()[0].dispatch, Dispatch::Static);
        assert!(body.call_sites()[0].args.is_empty());
        Ok(())
    }

    #[test]
    fn test_fast_config_skips_boxing() -> Result<()> {
        let square = TypeRef::application("Lshapes/Square");
        let scale = MethodRef::parse(square.clone(), "scale", "(D)Lshapes/Square;")?;
        let body = interpreter(ReflectionConfig::fast())
            .body(&node(well_known::method_invoke(), scale))?;
        assert_eq!(body.call_sites().len(), 1);
        assert!(body.constants.values().any(|c| *c == Constant::Int(0)));

        let area = MethodRef::parse(square, "area", "()D")?;
        let body = interpreter(ReflectionConfig::fast()).body(&node(well_known::method_invoke(), area))?;
        assert_eq!(body.call_sites().len(), 1);
        assert!(body.constants.values().any(|c| *c == Constant::Null));
        Ok(())
    }

    #[test]
    fn test_kind_must_match() -> Result<()> {
        let area = MethodRef::parse(TypeRef::application("Lshapes/Square"), "area", "()D")?;
        let mismatched = node(well_known::constructor_new_instance(), area);
        let interpreter = interpreter(ReflectionConfig::default());
        assert!(!interpreter.understands(&mismatched));
        assert!(matches!(interpreter.body(&mismatched), Err(Error::NotUnderstood(_))));
        Ok(())
    }
}
