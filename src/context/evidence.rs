//! Call-site evidence handed to context selectors.

use std::{collections::BTreeMap, sync::Arc};

use crate::{
    context::CgNode,
    ssa::{CallSiteRef, Constant, ValueNumber},
    types::{ClassLoaderRef, TypeRef},
};

/// Literal constants bound to value numbers of a caller's body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymbolTable {
    constants: BTreeMap<ValueNumber, Constant>,
}

impl SymbolTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds a constant to a value number, replacing any earlier binding.
    pub fn insert(&mut self, number: ValueNumber, constant: Constant) {
        self.constants.insert(number, constant);
    }

    /// Builder-style [`SymbolTable::insert`].
    #[must_use]
    pub fn with(mut self, number: ValueNumber, constant: Constant) -> Self {
        self.insert(number, constant);
        self
    }

    /// The constant bound to `number`.
    #[must_use]
    pub fn get(&self, number: ValueNumber) -> Option<&Constant> {
        self.constants.get(&number)
    }

    /// The string literal bound to `number`.
    #[must_use]
    pub fn string_value(&self, number: ValueNumber) -> Option<&str> {
        self.get(number).and_then(Constant::as_str)
    }

    /// Returns `true` when no constant is bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.constants.is_empty()
    }
}

impl FromIterator<(ValueNumber, Constant)> for SymbolTable {
    fn from_iter<T: IntoIterator<Item = (ValueNumber, Constant)>>(iter: T) -> Self {
        Self {
            constants: iter.into_iter().collect(),
        }
    }
}

/// What is known about the calling node.
#[derive(Debug, Clone)]
pub struct CallerEvidence {
    /// The caller's call-graph node
    pub node: Arc<CgNode>,
    /// Constants of the caller's body
    pub symbols: SymbolTable,
}

impl CallerEvidence {
    /// Bundles a caller node with its symbol table.
    #[must_use]
    pub fn new(node: Arc<CgNode>, symbols: SymbolTable) -> Self {
        Self { node, symbols }
    }

    /// The literal passed at argument `position` of `site`, receiver being position 0
    /// for instance calls.
    #[must_use]
    pub fn constant_argument(&self, site: &CallSiteRef, position: usize) -> Option<&Constant> {
        site.args
            .get(position)
            .and_then(|&number| self.symbols.get(number))
    }

    /// The loader of the caller's declaring class.
    #[must_use]
    pub fn loader(&self) -> &ClassLoaderRef {
        &self.node.method.declaring.loader
    }
}

/// Abstract object flowing into a call as receiver.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum InstanceKey {
    /// A symbolic constant object, such as a `Class` or `Method` object
    Constant(Constant),
    /// An object of statically known concrete type
    Allocated(TypeRef),
}

impl InstanceKey {
    /// The type a `Class` constant denotes.
    #[must_use]
    pub fn type_constant(&self) -> Option<&TypeRef> {
        match self {
            Self::Constant(constant) => constant.as_type(),
            Self::Allocated(_) => None,
        }
    }

    /// The concrete type of an allocated object.
    #[must_use]
    pub fn concrete_type(&self) -> Option<&TypeRef> {
        match self {
            Self::Allocated(ty) => Some(ty),
            Self::Constant(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        context::Context,
        ssa::Dispatch,
        types::{well_known, MethodRef},
    };

    #[test]
    fn test_constant_argument() -> crate::Result<()> {
        let caller = MethodRef::parse(TypeRef::application("Lapp/Main"), "main", "()V")?;
        let evidence = CallerEvidence::new(
            Arc::new(CgNode::new(caller, Context::Everywhere)),
            SymbolTable::new().with(ValueNumber(4), Constant::String("app.Plugin".into())),
        );
        let site = CallSiteRef::new(
            2,
            well_known::class_loader_load_class(),
            Dispatch::Virtual,
            vec![ValueNumber(3), ValueNumber(4)],
        );
        assert_eq!(
            evidence.constant_argument(&site, 1).and_then(Constant::as_str),
            Some("app.Plugin")
        );
        assert!(evidence.constant_argument(&site, 0).is_none());
        assert!(evidence.constant_argument(&site, 2).is_none());
        assert_eq!(evidence.loader(), &ClassLoaderRef::APPLICATION);
        Ok(())
    }
}
