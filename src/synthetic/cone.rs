//! Expansion of type abstractions into allocation sequences.
//!
//! Every concrete type an abstraction stands for contributes `new T`, a call to
//! `T.<init>()` (skipped for arrays) and `return` of the new object. Candidates
//! therefore overlay as alternative results of the same body.

use tracing::debug;

use crate::{
    config::ReflectionConfig,
    events::{EventKind, EventLog},
    hierarchy::ClassHierarchy,
    synthetic::SpecializedMethod,
    types::{well_known, TypeAbstraction, TypeRef},
    Result,
};

/// The types a cone rooted at `root` covers, abstract members included.
///
/// Interfaces expand to their implementors, classes to themselves plus subclasses.
/// An unresolvable root covers nothing.
#[must_use]
pub fn cone_members(hierarchy: &dyn ClassHierarchy, root: &TypeRef) -> Vec<TypeRef> {
    match hierarchy.resolve(root) {
        Some(class) if class.is_interface() => hierarchy.implementors_of(root).into_iter().collect(),
        Some(_) => hierarchy.subclasses_of(root).into_iter().collect(),
        None => Vec::new(),
    }
}

/// The members of the cone rooted at `root` that can be instantiated.
fn concrete_members(hierarchy: &dyn ClassHierarchy, root: &TypeRef) -> Vec<TypeRef> {
    cone_members(hierarchy, root)
        .into_iter()
        .filter(|member| {
            hierarchy
                .resolve(member)
                .is_some_and(|class| !class.is_abstract())
        })
        .collect()
}

impl SpecializedMethod<'_> {
    /// Adds the allocation sequences for every concrete type `abstraction` covers.
    ///
    /// Precision problems are recorded in `events` against this body's node.
    ///
    /// # Errors
    ///
    /// Propagates factory errors; an imprecise abstraction is not an error.
    pub fn add_type_abstraction(
        &mut self,
        abstraction: &TypeAbstraction,
        config: &ReflectionConfig,
        events: &EventLog,
    ) -> Result<()> {
        let serializable = abstraction
            .primary_type()
            .is_some_and(|ty| ty.name == well_known::SERIALIZABLE.name);
        if serializable && config.suppress_serializable_cone {
            events
                .record(EventKind::IgnoredSerializable)
                .node(self.node())
                .message(format!("{abstraction} not expanded"));
            return Ok(());
        }

        match abstraction {
            TypeAbstraction::Exact(ty) => {
                let candidates: Vec<TypeRef> = self
                    .hierarchy()
                    .resolve(ty)
                    .map(|class| class.reference.clone())
                    .into_iter()
                    .collect();
                self.add_candidates(abstraction, &candidates, config, events)
            }
            TypeAbstraction::Cone(root) => {
                let candidates = concrete_members(self.hierarchy(), root);
                self.add_candidates(abstraction, &candidates, config, events)
            }
            TypeAbstraction::Set(members) => {
                for member in members {
                    self.add_type_abstraction(&TypeAbstraction::Exact(member.clone()), config, events)?;
                }
                Ok(())
            }
        }
    }

    fn add_candidates(
        &mut self,
        abstraction: &TypeAbstraction,
        candidates: &[TypeRef],
        config: &ReflectionConfig,
        events: &EventLog,
    ) -> Result<()> {
        if candidates.is_empty() {
            events
                .record(EventKind::NoSubtypes)
                .node(self.node())
                .message(format!("{abstraction} has no concrete type"));
            self.return_void();
            return Ok(());
        }
        if candidates.len() > config.cone_bound {
            events
                .record(EventKind::ManySubtypes)
                .node(self.node())
                .message(format!(
                    "{abstraction} expands to {} types, bound is {}",
                    candidates.len(),
                    config.cone_bound
                ));
        }
        for candidate in candidates {
            self.add_concrete_type(candidate)?;
        }
        Ok(())
    }

    /// Adds `new T; T.<init>(); return` unless `ty` is abstract, unknown or already
    /// allocated. Returns `true` when statements were added.
    ///
    /// # Errors
    ///
    /// Propagates factory errors.
    pub fn add_concrete_type(&mut self, ty: &TypeRef) -> Result<bool> {
        let Some(class) = self.hierarchy().resolve(ty) else {
            debug!(%ty, "skipping unresolvable type");
            return Ok(false);
        };
        if class.is_abstract() {
            debug!(%ty, "skipping abstract type");
            return Ok(false);
        }
        let ty = class.reference.clone();
        let Some(object) = self.allocate(&ty)? else {
            return Ok(false);
        };
        if !ty.is_array() {
            self.call_default_init(&ty, &object)?;
        }
        self.return_value(&object)?;
        Ok(true)
    }
}
