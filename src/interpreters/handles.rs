//! `java.lang.invoke` method handles on known targets.
//!
//! A handle found by `findStatic` / `findVirtual` is a [`Constant::MethodHandle`]; the
//! selectors carry it into the invocation nodes as the receiver constant. Handles for
//! virtual methods take the receiver as their first parameter, so their type is the
//! target's descriptor with the declaring class prepended.
//!
//! `invokeExact` and `invoke` are signature polymorphic: the node's method carries the
//! call site's descriptor. `invokeExact` needs that descriptor to equal the handle
//! type. `invoke` also accepts primitive widening and reference casts. Any other
//! mismatch throws `WrongMethodTypeException`.

use std::sync::Arc;

use tracing::debug;

use crate::{
    context::{CgNode, ReflectiveIdiom},
    hierarchy::ClassHierarchy,
    interpreters::{
        idiom_accessor,
        invocation::{box_result, unpack_arguments},
        BodyCache, ContextInterpreter, InterpreterEnv,
    },
    ssa::{Constant, Dispatch, ParameterAccessor},
    synthetic::{SpecializedMethod, SyntheticIr},
    types::{well_known, Descriptor, MethodRef, TypeAbstraction, TypeRef},
    Error, Result,
};

/// Returns one handle constant per method matching the context's name.
///
/// `findStatic` sees static methods, `findVirtual` instance methods other than
/// constructors. The `MethodType` argument is not part of the context, so overloads
/// are not told apart. No match, or an unknown class, throws `NoSuchMethodException`.
pub struct MethodHandleFindInterpreter {
    env: InterpreterEnv,
    cache: BodyCache,
}

impl MethodHandleFindInterpreter {
    /// Creates the interpreter.
    #[must_use]
    pub fn new(env: InterpreterEnv) -> Self {
        Self {
            env,
            cache: BodyCache::new(),
        }
    }

    fn idiom(node: &CgNode) -> Option<ReflectiveIdiom> {
        ReflectiveIdiom::of(&node.method).filter(|idiom| {
            matches!(idiom, ReflectiveIdiom::FindStatic | ReflectiveIdiom::FindVirtual)
        })
    }

    fn build(&self, node: &CgNode, idiom: ReflectiveIdiom) -> Result<SyntheticIr> {
        let (Some(ty), Some(name)) = (
            node.context.type_abstraction().and_then(TypeAbstraction::primary_type),
            node.context.method_name(),
        ) else {
            return Err(Error::NotUnderstood(node.to_string()));
        };
        let mut method = self.env.builder(node, idiom_accessor(node, idiom))?;

        if self.env.hierarchy.resolve(ty).is_none() {
            debug!(%ty, name, "handle lookup on an unknown type");
            method.throw_new(&well_known::NO_SUCH_METHOD_EXCEPTION)?;
            return Ok(method.finish());
        }

        let wants_static = idiom == ReflectiveIdiom::FindStatic;
        let found: Vec<MethodRef> = self
            .env
            .hierarchy
            .all_methods(ty)
            .into_iter()
            .filter(|m| m.reference.name() == name)
            .filter(|m| m.is_static() == wants_static && !m.is_init() && !m.is_clinit())
            .map(|m| m.reference)
            .collect();
        if found.is_empty() {
            debug!(%ty, name, wants_static, "no method for the handle");
            method.throw_new(&well_known::NO_SUCH_METHOD_EXCEPTION)?;
        }
        for target in found {
            let handle =
                method.constant(&well_known::METHOD_HANDLE, Constant::MethodHandle(target))?;
            method.return_value(&handle)?;
        }
        Ok(method.finish())
    }
}

impl ContextInterpreter for MethodHandleFindInterpreter {
    fn name(&self) -> &'static str {
        "method-handle-find"
    }

    fn understands(&self, node: &CgNode) -> bool {
        Self::idiom(node).is_some() && node.context.method_name().is_some()
    }

    fn body(&self, node: &CgNode) -> Result<Arc<SyntheticIr>> {
        let idiom = Self::idiom(node)
            .filter(|_| self.understands(node))
            .ok_or_else(|| Error::NotUnderstood(node.to_string()))?;
        self.env.cached(&self.cache, node, || self.build(node, idiom))
    }
}

/// How a call-site value reaches the handle's parameter, or a result the call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Conversion {
    Direct,
    Cast,
}

fn conversion(
    hierarchy: &dyn ClassHierarchy,
    from: &TypeRef,
    to: &TypeRef,
    exact: bool,
) -> Option<Conversion> {
    if exact {
        return (from.name == to.name).then_some(Conversion::Direct);
    }
    if ParameterAccessor::is_assignable(from, to, hierarchy) {
        Some(Conversion::Direct)
    } else if from.is_reference() && to.is_reference() {
        Some(Conversion::Cast)
    } else {
        None
    }
}

/// Bodies for invoking a constant handle and for asking its type.
pub struct MethodHandleInvokeInterpreter {
    env: InterpreterEnv,
    cache: BodyCache,
}

impl MethodHandleInvokeInterpreter {
    /// Creates the interpreter.
    #[must_use]
    pub fn new(env: InterpreterEnv) -> Self {
        Self {
            env,
            cache: BodyCache::new(),
        }
    }

    fn target(node: &CgNode) -> Option<(ReflectiveIdiom, &MethodRef)> {
        let idiom = ReflectiveIdiom::of(&node.method)?;
        if !matches!(
            idiom,
            ReflectiveIdiom::MethodHandleInvokeExact
                | ReflectiveIdiom::MethodHandleInvoke
                | ReflectiveIdiom::MethodHandleInvokeWithArguments
                | ReflectiveIdiom::MethodHandleType
        ) {
            return None;
        }
        let target = node.context.receiver_constant()?.as_method_handle()?;
        Some((idiom, target))
    }

    /// Whether `target` takes a receiver; unresolvable targets are assumed to.
    fn has_receiver(target: &MethodRef, hierarchy: &dyn ClassHierarchy) -> bool {
        match ParameterAccessor::resolve(target.clone(), hierarchy) {
            Ok(callee) => callee.has_receiver(),
            Err(error) => {
                debug!(%target, %error, "treating unresolvable handle target as an instance");
                true
            }
        }
    }

    /// Parameter types of the handle: the receiver, if any, then the target's.
    fn handle_parameters(target: &MethodRef, has_receiver: bool) -> Vec<TypeRef> {
        let receiver = has_receiver.then(|| target.declaring.clone());
        receiver.into_iter().chain(target.parameter_types()).collect()
    }

    fn dispatch(has_receiver: bool) -> Dispatch {
        if has_receiver {
            Dispatch::Virtual
        } else {
            Dispatch::Static
        }
    }

    fn wrong_type(mut method: SpecializedMethod<'_>, target: &MethodRef) -> Result<SyntheticIr> {
        let call_site = &method.node().method;
        debug!(%target, %call_site, "call site does not fit the handle type");
        method.throw_new(&well_known::WRONG_METHOD_TYPE_EXCEPTION)?;
        Ok(method.finish())
    }

    fn invoke(
        &self,
        node: &CgNode,
        idiom: ReflectiveIdiom,
        target: &MethodRef,
    ) -> Result<SyntheticIr> {
        let exact = idiom == ReflectiveIdiom::MethodHandleInvokeExact;
        let accessor = idiom_accessor(node, idiom);
        let arguments = (1..=node.method.parameter_count())
            .map(|position| accessor.parameter(position))
            .collect::<Result<Vec<_>>>()?;
        let mut method = self.env.builder(node, accessor)?;
        let hierarchy = method.hierarchy();

        let has_receiver = Self::has_receiver(target, hierarchy);
        let expected = Self::handle_parameters(target, has_receiver);
        let plan = (expected.len() == arguments.len())
            .then(|| {
                arguments
                    .iter()
                    .zip(&expected)
                    .map(|(argument, declared)| {
                        conversion(hierarchy, argument.ty(), declared, exact)
                    })
                    .collect::<Option<Vec<_>>>()
            })
            .flatten();
        let returned = match (node.method.returns_value(), target.returns_value()) {
            (true, true) => conversion(
                hierarchy,
                &target.return_type(),
                &node.method.return_type(),
                exact,
            )
            .map(Some),
            (false, true) if exact => None,
            (false, _) => Some(None),
            (true, false) => None,
        };
        let (Some(plan), Some(returned)) = (plan, returned) else {
            return Self::wrong_type(method, target);
        };

        let mut operands = Vec::with_capacity(arguments.len());
        for ((argument, declared), step) in arguments.iter().zip(&expected).zip(plan) {
            let operand = match step {
                Conversion::Direct => argument.clone(),
                Conversion::Cast => {
                    method.temp(declared, |f, result, _| f.check_cast(result, argument))?
                }
            };
            operands.push(operand);
        }

        let result = method.call(target, Self::dispatch(has_receiver), &operands)?;
        if let (Some(result), Some(step)) = (result, returned) {
            let value = match step {
                Conversion::Direct => result,
                Conversion::Cast => {
                    let site_type = node.method.return_type();
                    method.temp(&site_type, |f, cast, _| f.check_cast(cast, &result))?
                }
            };
            method.return_value(&value)?;
        }
        Ok(method.finish())
    }

    fn invoke_with_arguments(&self, node: &CgNode, target: &MethodRef) -> Result<SyntheticIr> {
        let accessor = idiom_accessor(node, ReflectiveIdiom::MethodHandleInvokeWithArguments);
        let array = accessor.parameter(1)?;
        let mut method = self.env.builder(node, accessor)?;

        let has_receiver = Self::has_receiver(target, method.hierarchy());
        let expected = Self::handle_parameters(target, has_receiver);
        let operands = unpack_arguments(&mut method, &self.env.config, target, &expected, &array)?;

        let returned = match method.call(target, Self::dispatch(has_receiver), &operands)? {
            Some(result) => box_result(&mut method, &self.env.config, result)?,
            None => method.constant(&well_known::OBJECT, Constant::Null)?,
        };
        method.return_value(&returned)?;
        Ok(method.finish())
    }

    fn handle_type(&self, node: &CgNode, target: &MethodRef) -> Result<SyntheticIr> {
        let mut method = self
            .env
            .builder(node, idiom_accessor(node, ReflectiveIdiom::MethodHandleType))?;
        let has_receiver = Self::has_receiver(target, method.hierarchy());
        let descriptor = Descriptor::new(
            Self::handle_parameters(target, has_receiver)
                .into_iter()
                .map(|ty| ty.name)
                .collect(),
            target.selector.descriptor.ret.clone(),
        );
        let value = method.constant(&well_known::METHOD_TYPE, Constant::MethodType(descriptor))?;
        method.return_value(&value)?;
        Ok(method.finish())
    }

    fn build(
        &self,
        node: &CgNode,
        idiom: ReflectiveIdiom,
        target: &MethodRef,
    ) -> Result<SyntheticIr> {
        match idiom {
            ReflectiveIdiom::MethodHandleInvokeWithArguments => {
                self.invoke_with_arguments(node, target)
            }
            ReflectiveIdiom::MethodHandleType => self.handle_type(node, target),
            _ => self.invoke(node, idiom, target),
        }
    }
}

impl ContextInterpreter for MethodHandleInvokeInterpreter {
    fn name(&self) -> &'static str {
        "method-handle-invoke"
    }

    fn understands(&self, node: &CgNode) -> bool {
        Self::target(node).is_some()
    }

    fn body(&self, node: &CgNode) -> Result<Arc<SyntheticIr>> {
        let (idiom, target) =
            Self::target(node).ok_or_else(|| Error::NotUnderstood(node.to_string()))?;
        self.env.cached(&self.cache, node, || self.build(node, idiom, target))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::ReflectionConfig,
        context::Context,
        ssa::{Instruction, ValueNumber},
        test::fixtures::shapes,
    };

    fn env() -> InterpreterEnv {
        InterpreterEnv::new(Arc::new(shapes()), ReflectionConfig::default())
    }

    fn find(callee: MethodRef, ty: &str, name: &str) -> CgNode {
        CgNode::new(
            callee,
            Context::GetMethod {
                ty: TypeAbstraction::exact(TypeRef::application(ty)),
                name: name.into(),
            },
        )
    }

    fn on_handle(callee: MethodRef, target: MethodRef) -> CgNode {
        CgNode::new(callee, Context::ReceiverInstance(Constant::MethodHandle(target)))
    }

    fn site(name: &'static str, descriptor: &str) -> Result<MethodRef> {
        MethodRef::parse(well_known::METHOD_HANDLE, name, descriptor)
    }

    fn square(name: &'static str, descriptor: &str) -> Result<MethodRef> {
        MethodRef::parse(TypeRef::application("Lshapes/Square"), name, descriptor)
    }

    #[test]
    fn test_find_filters_by_staticness() -> Result<()> {
        let interpreter = MethodHandleFindInterpreter::new(env());

        let virtual_area =
            interpreter.body(&find(well_known::lookup_find_virtual(), "Lshapes/Square", "area"))?;
        let handles: Vec<&MethodRef> = virtual_area
            .constants
            .values()
            .filter_map(Constant::as_method_handle)
            .collect();
        assert_eq!(handles, vec![&square("area", "()D")?]);
        assert_eq!(virtual_area.returned_values().len(), 1);

        let static_origin =
            interpreter.body(&find(well_known::lookup_find_static(), "Lshapes/Square", "origin"))?;
        assert!(static_origin.allocation_sites().is_empty());
        assert_eq!(static_origin.returned_values().len(), 1);

        let static_area =
            interpreter.body(&find(well_known::lookup_find_static(), "Lshapes/Square", "area"))?;
        assert_eq!(
            static_area.allocation_sites()[0].ty,
            well_known::NO_SUCH_METHOD_EXCEPTION
        );

        let unknown =
            interpreter.body(&find(well_known::lookup_find_virtual(), "Lshapes/Hexagon", "area"))?;
        assert_eq!(unknown.allocation_sites()[0].ty, well_known::NO_SUCH_METHOD_EXCEPTION);
        Ok(())
    }

    #[test]
    fn test_find_ignores_get_method_nodes() {
        let interpreter = MethodHandleFindInterpreter::new(env());
        let get_method = find(well_known::class_get_method(), "Lshapes/Square", "area");
        assert!(!interpreter.understands(&get_method));
    }

    #[test]
    fn test_invoke_exact_passes_arguments_through() -> Result<()> {
        let interpreter = MethodHandleInvokeInterpreter::new(env());
        let area = square("area", "()D")?;
        let node = on_handle(site("invokeExact", "(Lshapes/Square;)D")?, area.clone());
        let body = interpreter.body(&node)?;

        let calls = body.call_sites();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].target, area);
        assert_eq!(calls[0].dispatch, Dispatch::Virtual);
        assert_eq!(calls[0].args, vec![ValueNumber(2)]);
        assert!(body.cast_types().is_empty());
        assert_eq!(body.returned_values().len(), 1);
        Ok(())
    }

    #[test]
    fn test_invoke_exact_rejects_inexact_site() -> Result<()> {
        let interpreter = MethodHandleInvokeInterpreter::new(env());
        let area = square("area", "()D")?;

        for descriptor in ["(Ljava/lang/Object;)D", "()D", "(Lshapes/Square;)V"] {
            let node = on_handle(site("invokeExact", descriptor)?, area.clone());
            let body = interpreter.body(&node)?;
            assert!(body.call_sites().is_empty(), "{descriptor} must not call the target");
            assert_eq!(
                body.allocation_sites()[0].ty,
                well_known::WRONG_METHOD_TYPE_EXCEPTION
            );
            assert!(matches!(body.instructions.last(), Some(Instruction::Throw { .. })));
        }
        Ok(())
    }

    #[test]
    fn test_invoke_casts_references() -> Result<()> {
        let interpreter = MethodHandleInvokeInterpreter::new(env());
        let scale = square("scale", "(D)Lshapes/Square;")?;
        let node = on_handle(
            site("invoke", "(Ljava/lang/Object;D)Ljava/lang/Object;")?,
            scale.clone(),
        );
        let body = interpreter.body(&node)?;

        assert_eq!(body.cast_types(), vec![TypeRef::application("Lshapes/Square")]);
        assert_eq!(body.call_sites()[0].target, scale);
        assert_eq!(body.returned_values().len(), 1);

        // no boxing through invoke
        let boxed = on_handle(
            site("invoke", "(Lshapes/Square;Ljava/lang/Double;)Lshapes/Square;")?,
            scale,
        );
        assert_eq!(
            interpreter.body(&boxed)?.allocation_sites()[0].ty,
            well_known::WRONG_METHOD_TYPE_EXCEPTION
        );
        Ok(())
    }

    #[test]
    fn test_static_handle_has_no_receiver() -> Result<()> {
        let interpreter = MethodHandleInvokeInterpreter::new(env());
        let origin = square("origin", "()Lshapes/Square;")?;
        let node = on_handle(site("invokeExact", "()Lshapes/Square;")?, origin);
        let body = interpreter.body(&node)?;
        assert_eq!(body.call_sites()[0].dispatch, Dispatch::Static);
        assert!(body.call_sites()[0].args.is_empty());
        Ok(())
    }

    #[test]
    fn test_invoke_with_arguments_unpacks_receiver_first() -> Result<()> {
        let interpreter = MethodHandleInvokeInterpreter::new(env());
        let scale = square("scale", "(D)Lshapes/Square;")?;
        let node = on_handle(well_known::method_handle_invoke_with_arguments(), scale);
        let body = interpreter.body(&node)?;

        assert_eq!(
            body.cast_types(),
            vec![
                TypeRef::application("Lshapes/Square"),
                TypeRef::primordial("Ljava/lang/Double"),
            ]
        );
        let targets: Vec<String> = body
            .call_sites()
            .iter()
            .map(|c| c.target.name().to_string())
            .collect();
        assert_eq!(targets, vec!["doubleValue", "scale"]);
        assert!(body.constants.values().any(|c| *c == Constant::Int(1)));
        Ok(())
    }

    #[test]
    fn test_type_prepends_receiver() -> Result<()> {
        let interpreter = MethodHandleInvokeInterpreter::new(env());
        let area = square("area", "()D")?;
        let body = interpreter.body(&on_handle(well_known::method_handle_type(), area))?;
        let Some(Constant::MethodType(descriptor)) = body.constants.values().next() else {
            panic!("type() must return a method type constant");
        };
        assert_eq!(descriptor.to_string(), "(Lshapes/Square;)D");
        Ok(())
    }
}
