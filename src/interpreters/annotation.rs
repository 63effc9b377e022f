//! `getAnnotation(A.class)` on a known class, method or constructor.
//!
//! A present annotation is modeled as one object of a synthetic proxy class owned by
//! the `Synthetic` loader, with one field per explicit element value. The proxy class
//! is never declared: it exists only in synthetic bodies, and points-to clients read
//! element values through the proxy's fields.

use std::sync::Arc;

use tracing::debug;

use crate::{
    context::{CgNode, ReflectiveIdiom},
    hierarchy::Annotation,
    interpreters::{idiom_accessor, BodyCache, ContextInterpreter, InterpreterEnv},
    ssa::Constant,
    synthetic::{SpecializedMethod, SyntheticIr},
    types::{well_known, ClassLoaderRef, FieldRef, TypeName, TypeRef},
    Error, Result,
};

/// The proxy class modeling instances of `annotation`.
#[must_use]
pub fn annotation_proxy(annotation: &TypeRef) -> TypeRef {
    TypeRef::new(
        ClassLoaderRef::SYNTHETIC,
        TypeName::new(format!("{}$Proxy", annotation.name)),
    )
}

/// The declared type of an element holding `value`.
fn element_type(value: &Constant) -> TypeRef {
    match value {
        Constant::Null => well_known::OBJECT,
        Constant::Bool(_) => well_known::BOOLEAN,
        Constant::Int(_) => well_known::INT,
        Constant::Long(_) => well_known::LONG,
        Constant::String(_) => well_known::STRING,
        Constant::Type(_) => well_known::CLASS,
        Constant::Method(m) if m.is_init() => well_known::CONSTRUCTOR,
        Constant::Method(_) => well_known::METHOD,
        Constant::MethodHandle(_) => well_known::METHOD_HANDLE,
        Constant::MethodType(_) => well_known::METHOD_TYPE,
    }
}

/// Returns the annotation proxy, `null` when the element lacks the annotation.
///
/// An unknown class or member gets an empty body: nothing is known about what it
/// carries.
pub struct GetAnnotationInterpreter {
    env: InterpreterEnv,
    cache: BodyCache,
}

impl GetAnnotationInterpreter {
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
            matches!(
                idiom,
                ReflectiveIdiom::ClassGetAnnotation
                    | ReflectiveIdiom::MethodGetAnnotation
                    | ReflectiveIdiom::ConstructorGetAnnotation
            )
        })
    }

    /// The annotations of the queried element, `None` when it does not resolve.
    fn annotations(&self, target: &Constant) -> Option<Vec<Annotation>> {
        match target {
            Constant::Type(ty) => self.env.hierarchy.resolve(ty).map(|c| c.annotations.clone()),
            Constant::Method(m) => self.env.hierarchy.resolve_method(m).map(|m| m.annotations),
            _ => None,
        }
    }

    fn materialize(method: &mut SpecializedMethod<'_>, annotation: &Annotation) -> Result<()> {
        let proxy_type = annotation_proxy(&annotation.ty);
        let proxy = method
            .allocate(&proxy_type)?
            .ok_or_else(|| internal_error!("{} allocated twice", proxy_type))?;
        for (name, value) in &annotation.elements {
            let ty = element_type(value);
            let field = FieldRef::new(proxy_type.clone(), name.clone(), ty.name.clone());
            let literal = method.constant(&ty, value.clone())?;
            let instruction = method.factory().put_field(&proxy, &literal, &field)?;
            method.push(instruction);
        }
        method.return_value(&proxy)
    }

    fn build(&self, node: &CgNode, idiom: ReflectiveIdiom) -> Result<SyntheticIr> {
        let (target, requested) = node
            .context
            .annotation_query()
            .ok_or_else(|| Error::NotUnderstood(node.to_string()))?;
        let mut method = self.env.builder(node, idiom_accessor(node, idiom))?;

        let Some(annotations) = self.annotations(target) else {
            debug!(%target, "annotation query on an unknown element");
            return Ok(method.finish());
        };
        match annotations.iter().find(|a| a.ty.name == requested.name) {
            Some(annotation) => Self::materialize(&mut method, annotation)?,
            None => {
                debug!(%target, %requested, "element does not carry the annotation");
                let null = method.constant(&well_known::ANNOTATION, Constant::Null)?;
                method.return_value(&null)?;
            }
        }
        Ok(method.finish())
    }
}

impl ContextInterpreter for GetAnnotationInterpreter {
    fn name(&self) -> &'static str {
        "get-annotation"
    }

    fn understands(&self, node: &CgNode) -> bool {
        Self::idiom(node).is_some() && node.context.annotation_query().is_some()
    }

    fn body(&self, node: &CgNode) -> Result<Arc<SyntheticIr>> {
        let idiom = Self::idiom(node)
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
        context::Context,
        ssa::Instruction,
        test::fixtures::shapes,
        types::MethodRef,
    };

    fn interpreter() -> GetAnnotationInterpreter {
        GetAnnotationInterpreter::new(InterpreterEnv::new(
            Arc::new(shapes()),
            ReflectionConfig::default(),
        ))
    }

    fn query(method: MethodRef, target: Constant, annotation: &str) -> CgNode {
        CgNode::new(
            method,
            Context::GetAnnotation {
                target,
                annotation: TypeRef::application(annotation),
            },
        )
    }

    #[test]
    fn test_class_annotation_becomes_proxy_with_elements() -> Result<()> {
        let node = query(
            well_known::class_get_annotation(),
            Constant::Type(TypeRef::application("Lshapes/Square")),
            "Lshapes/Shaped",
        );
        let body = interpreter().body(&node)?;

        let proxy = annotation_proxy(&TypeRef::application("Lshapes/Shaped"));
        assert_eq!(proxy.loader, ClassLoaderRef::SYNTHETIC);
        assert_eq!(body.allocation_sites()[0].ty, proxy);

        let written: Vec<(String, String)> = body
            .fields_written()
            .into_iter()
            .map(|f| (f.name.to_string(), f.field_type.as_str().to_string()))
            .collect();
        assert_eq!(
            written,
            vec![
                ("label".to_string(), "Ljava/lang/String".to_string()),
                ("sides".to_string(), "I".to_string()),
            ]
        );
        assert!(body.constants.values().any(|c| *c == Constant::Int(4)));
        assert!(matches!(body.instructions.last(), Some(Instruction::Return { value: Some(_) })));
        Ok(())
    }

    #[test]
    fn test_missing_annotation_returns_null() -> Result<()> {
        let node = query(
            well_known::class_get_annotation(),
            Constant::Type(TypeRef::application("Lshapes/Circle")),
            "Lshapes/Shaped",
        );
        let body = interpreter().body(&node)?;
        assert!(body.allocation_sites().is_empty());
        assert_eq!(body.returned_values().len(), 1);
        assert!(body.constants.values().all(|c| *c == Constant::Null));
        Ok(())
    }

    #[test]
    fn test_method_annotation_without_elements() -> Result<()> {
        let area = MethodRef::parse(TypeRef::application("Lshapes/Circle"), "area", "()D")?;
        let node = query(
            well_known::method_get_annotation(),
            Constant::Method(area),
            "Lshapes/Cached",
        );
        let body = interpreter().body(&node)?;
        assert_eq!(
            body.allocation_sites()[0].ty,
            annotation_proxy(&TypeRef::application("Lshapes/Cached"))
        );
        assert!(body.fields_written().is_empty());
        Ok(())
    }

    #[test]
    fn test_unknown_element_gets_empty_body() -> Result<()> {
        let node = query(
            well_known::class_get_annotation(),
            Constant::Type(TypeRef::application("Lshapes/Hexagon")),
            "Lshapes/Shaped",
        );
        assert_eq!(interpreter().number_of_statements(&node)?, 0);

        let wrong_idiom = CgNode::new(well_known::class_new_instance(), node.context.clone());
        assert!(!interpreter().understands(&wrong_idiom));
        Ok(())
    }
}
