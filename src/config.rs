//! Configuration for context selection and body synthesis.

use crate::lookup::TypeLookup;

/// Configuration for a [`ReflectionEngine`](crate::ReflectionEngine).
///
/// Controls how far type cones are expanded, how arguments and results cross the
/// boxing boundary of `Method.invoke`, and where string-named classes are searched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReflectionConfig {
    /// Cone size above which a `ManySubtypes` warning is recorded (default: 10).
    ///
    /// Cones are expanded in full either way.
    pub cone_bound: usize,

    /// Skip cones rooted at `java.io.Serializable` (default: true).
    pub suppress_serializable_cone: bool,

    /// Unbox primitive arguments unpacked from an `Object[]` (default: true).
    ///
    /// When disabled, primitive parameters receive a zero literal of their type.
    pub unbox_primitive_arguments: bool,

    /// Box primitive results of reflective invocation (default: true).
    ///
    /// When disabled, invocations of methods with a primitive result return `null`.
    pub box_primitive_results: bool,

    /// Lookup strategies for class names, in order of preference.
    pub type_lookup: Vec<TypeLookup>,
}

impl Default for ReflectionConfig {
    fn default() -> Self {
        Self {
            cone_bound: 10,
            suppress_serializable_cone: true,
            unbox_primitive_arguments: true,
            box_primitive_results: true,
            type_lookup: TypeLookup::default_order(),
        }
    }
}

impl ReflectionConfig {
    /// Creates the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Expands every cone without complaint and keeps boxing exact.
    #[must_use]
    pub fn precise() -> Self {
        Self {
            cone_bound: usize::MAX,
            suppress_serializable_cone: false,
            ..Self::default()
        }
    }

    /// Small bodies: tight cone bound, no boxing conversions, caller loader only.
    #[must_use]
    pub fn fast() -> Self {
        Self {
            cone_bound: 4,
            suppress_serializable_cone: true,
            unbox_primitive_arguments: false,
            box_primitive_results: false,
            type_lookup: vec![TypeLookup::CallerLoader],
        }
    }

    /// Sets the cone bound.
    #[must_use]
    pub fn with_cone_bound(mut self, bound: usize) -> Self {
        self.cone_bound = bound;
        self
    }

    /// Sets the lookup strategies.
    #[must_use]
    pub fn with_type_lookup(mut self, strategies: Vec<TypeLookup>) -> Self {
        self.type_lookup = strategies;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets() {
        let config = ReflectionConfig::default();
        assert_eq!(config.cone_bound, 10);
        assert!(config.suppress_serializable_cone);
        assert_eq!(config.type_lookup.first(), Some(&TypeLookup::CallerLoader));

        assert!(!ReflectionConfig::precise().suppress_serializable_cone);
        assert!(!ReflectionConfig::fast().box_primitive_results);
        assert_eq!(ReflectionConfig::new().with_cone_bound(3).cone_bound, 3);
    }
}
