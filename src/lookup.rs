//! Resolution of type constants named by string literals.
//!
//! `Class.forName("a.b.C")` names a class without saying which loader defines it.
//! [`TypeLookup`] strategies are tried in order and the first hit wins; each miss is
//! traced.

use std::fmt;

use tracing::trace;

use crate::{
    hierarchy::ClassHierarchy,
    types::{ClassLoaderRef, TypeName, TypeRef},
};

/// A place to look for a named class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeLookup {
    /// The loader of the calling method's class, with delegation
    CallerLoader,
    /// The bootstrap loader
    Primordial,
    /// The application loader, with delegation
    Application,
    /// Every loader the hierarchy knows
    AnyLoader,
}

impl TypeLookup {
    /// The order used unless configured otherwise.
    #[must_use]
    pub fn default_order() -> Vec<TypeLookup> {
        vec![
            Self::CallerLoader,
            Self::Primordial,
            Self::Application,
            Self::AnyLoader,
        ]
    }

    /// Returns a human-readable name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::CallerLoader => "caller loader",
            Self::Primordial => "primordial loader",
            Self::Application => "application loader",
            Self::AnyLoader => "any loader",
        }
    }

    /// Looks up `name` with this strategy.
    #[must_use]
    pub fn find(
        &self,
        name: &TypeName,
        caller: &ClassLoaderRef,
        hierarchy: &dyn ClassHierarchy,
    ) -> Option<TypeRef> {
        let in_loader = |loader: &ClassLoaderRef| {
            hierarchy
                .resolve(&TypeRef::new(loader.clone(), name.clone()))
                .map(|class| class.reference.clone())
        };
        match self {
            Self::CallerLoader => in_loader(caller),
            Self::Primordial => in_loader(&ClassLoaderRef::PRIMORDIAL),
            Self::Application => in_loader(&ClassLoaderRef::APPLICATION),
            Self::AnyLoader => hierarchy
                .lookup_in_any_loader(name)
                .map(|class| class.reference.clone()),
        }
    }
}

impl fmt::Display for TypeLookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Tries `strategies` in order and returns the first type found.
#[must_use]
pub fn lookup_type(
    strategies: &[TypeLookup],
    name: &TypeName,
    caller: &ClassLoaderRef,
    hierarchy: &dyn ClassHierarchy,
) -> Option<TypeRef> {
    strategies.iter().find_map(|strategy| {
        let found = strategy.find(name, caller, hierarchy);
        if found.is_none() {
            trace!(%name, %strategy, "type constant not found");
        }
        found
    })
}

/// Converts a Java source name and looks it up.
///
/// Accepts `a.b.C`, `a.b.C$D` and array names like `[Ljava.lang.String;`.
#[must_use]
pub fn lookup_java_name(
    strategies: &[TypeLookup],
    java_name: &str,
    caller: &ClassLoaderRef,
    hierarchy: &dyn ClassHierarchy,
) -> Option<TypeRef> {
    let Some(name) = TypeName::from_java_name(java_name) else {
        trace!(java_name, "not a class name");
        return None;
    };
    lookup_type(strategies, &name, caller, hierarchy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::fixtures::shapes;

    #[test]
    fn test_default_order_finds_application_and_core() {
        let hierarchy = shapes();
        let order = TypeLookup::default_order();
        let custom = ClassLoaderRef::named("Plugins");

        let square = lookup_java_name(&order, "shapes.Square", &custom, &hierarchy);
        assert_eq!(square, Some(TypeRef::application("Lshapes/Square")));

        let string = lookup_java_name(&order, "java.lang.String", &custom, &hierarchy);
        assert_eq!(string.map(|t| t.loader), Some(ClassLoaderRef::PRIMORDIAL));

        assert!(lookup_java_name(&order, "shapes.Hexagon", &custom, &hierarchy).is_none());
    }

    #[test]
    fn test_primordial_only_misses_application() {
        let hierarchy = shapes();
        let name = TypeName::from_static("Lshapes/Square");
        assert!(lookup_type(
            &[TypeLookup::Primordial],
            &name,
            &ClassLoaderRef::APPLICATION,
            &hierarchy
        )
        .is_none());
        assert!(lookup_type(
            &[TypeLookup::Primordial, TypeLookup::AnyLoader],
            &name,
            &ClassLoaderRef::PRIMORDIAL,
            &hierarchy
        )
        .is_some());
    }
}
