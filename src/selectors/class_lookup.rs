//! `Class.forName` and `ClassLoader.loadClass` with literal names.

use std::sync::Arc;

use tracing::debug;

use crate::{
    context::{CallerEvidence, Context, InstanceKey, ReflectiveIdiom},
    hierarchy::ClassHierarchy,
    lookup::{lookup_java_name, TypeLookup},
    selectors::ContextSelector,
    ssa::CallSiteRef,
    types::{MethodRef, TypeAbstraction},
};

/// Shared lookup of the literal class name passed to `idiom`.
struct NamedClassLookup {
    hierarchy: Arc<dyn ClassHierarchy>,
    strategies: Vec<TypeLookup>,
}

impl NamedClassLookup {
    fn select(
        &self,
        idiom: ReflectiveIdiom,
        caller: &CallerEvidence,
        site: &CallSiteRef,
        callee: &MethodRef,
    ) -> Option<Context> {
        if ReflectiveIdiom::of(callee) != Some(idiom) {
            return None;
        }
        let position = idiom.name_argument()?;
        let Some(name) = caller
            .constant_argument(site, position)
            .and_then(|c| c.as_str())
        else {
            debug!(%callee, pc = site.pc, "class name is not a literal");
            return None;
        };
        let Some(ty) = lookup_java_name(&self.strategies, name, caller.loader(), self.hierarchy.as_ref())
        else {
            debug!(%callee, name, "class name does not resolve");
            return None;
        };
        Some(Context::JavaType(TypeAbstraction::exact(ty)))
    }
}

/// Selects `JavaType(Exact(T))` for `Class.forName("T")`.
pub struct ClassForNameSelector {
    lookup: NamedClassLookup,
}

impl ClassForNameSelector {
    /// Creates a selector resolving names with `strategies`, in order.
    #[must_use]
    pub fn new(hierarchy: Arc<dyn ClassHierarchy>, strategies: Vec<TypeLookup>) -> Self {
        Self {
            lookup: NamedClassLookup {
                hierarchy,
                strategies,
            },
        }
    }
}

impl ContextSelector for ClassForNameSelector {
    fn name(&self) -> &'static str {
        "class-for-name"
    }

    fn try_select(
        &self,
        caller: &CallerEvidence,
        site: &CallSiteRef,
        callee: &MethodRef,
        _receiver: &[InstanceKey],
    ) -> Option<Context> {
        self.lookup
            .select(ReflectiveIdiom::ClassForName, caller, site, callee)
    }
}

/// Selects `JavaType(Exact(T))` for `loader.loadClass("T")`.
pub struct LoadClassSelector {
    lookup: NamedClassLookup,
}

impl LoadClassSelector {
    /// Creates a selector resolving names with `strategies`, in order.
    #[must_use]
    pub fn new(hierarchy: Arc<dyn ClassHierarchy>, strategies: Vec<TypeLookup>) -> Self {
        Self {
            lookup: NamedClassLookup {
                hierarchy,
                strategies,
            },
        }
    }
}

impl ContextSelector for LoadClassSelector {
    fn name(&self) -> &'static str {
        "load-class"
    }

    fn try_select(
        &self,
        caller: &CallerEvidence,
        site: &CallSiteRef,
        callee: &MethodRef,
        _receiver: &[InstanceKey],
    ) -> Option<Context> {
        self.lookup
            .select(ReflectiveIdiom::LoadClass, caller, site, callee)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        context::{CgNode, SymbolTable},
        ssa::{Constant, Dispatch, ValueNumber},
        test::fixtures::shapes,
        types::{well_known, TypeRef},
        Result,
    };

    fn caller(symbols: SymbolTable) -> Result<CallerEvidence> {
        let main = MethodRef::parse(TypeRef::application("Lapp/Main"), "main", "()V")?;
        Ok(CallerEvidence::new(
            Arc::new(CgNode::new(main, Context::Everywhere)),
            symbols,
        ))
    }

    #[test]
    fn test_for_name_with_literal() -> Result<()> {
        let selector = ClassForNameSelector::new(Arc::new(shapes()), TypeLookup::default_order());
        let site = CallSiteRef::new(0, well_known::class_for_name(), Dispatch::Static, vec![ValueNumber(3)]);
        let evidence = caller(
            SymbolTable::new().with(ValueNumber(3), Constant::String("shapes.Circle".into())),
        )?;

        let context = selector.try_select(&evidence, &site, &well_known::class_for_name(), &[]);
        assert_eq!(
            context,
            Some(Context::JavaType(TypeAbstraction::exact(TypeRef::application(
                "Lshapes/Circle"
            ))))
        );

        // Same evidence on a different callee
        assert!(selector
            .try_select(&evidence, &site, &well_known::class_loader_load_class(), &[])
            .is_none());
        Ok(())
    }

    #[test]
    fn test_for_name_declines() -> Result<()> {
        let selector = ClassForNameSelector::new(Arc::new(shapes()), TypeLookup::default_order());
        let site = CallSiteRef::new(0, well_known::class_for_name(), Dispatch::Static, vec![ValueNumber(3)]);

        let unknown = caller(
            SymbolTable::new().with(ValueNumber(3), Constant::String("shapes.Hexagon".into())),
        )?;
        assert!(selector
            .try_select(&unknown, &site, &well_known::class_for_name(), &[])
            .is_none());

        let not_literal = caller(SymbolTable::new())?;
        assert!(selector
            .try_select(&not_literal, &site, &well_known::class_for_name(), &[])
            .is_none());
        Ok(())
    }

    #[test]
    fn test_load_class_reads_second_argument() -> Result<()> {
        let selector = LoadClassSelector::new(Arc::new(shapes()), TypeLookup::default_order());
        let site = CallSiteRef::new(
            4,
            well_known::class_loader_load_class(),
            Dispatch::Virtual,
            vec![ValueNumber(2), ValueNumber(3)],
        );
        let evidence = caller(
            SymbolTable::new()
                .with(ValueNumber(2), Constant::String("shapes.Circle".into()))
                .with(ValueNumber(3), Constant::String("java.lang.String".into())),
        )?;
        let context = selector.try_select(&evidence, &site, &well_known::class_loader_load_class(), &[]);
        assert_eq!(
            context,
            Some(Context::JavaType(TypeAbstraction::exact(well_known::STRING)))
        );
        Ok(())
    }
}
