//! Declared method summaries.
//!
//! A summary stands in for the body of a library method the analysis does not read,
//! written by a modelling layer outside this crate. A summary can additionally mark its
//! method as a *factory*: a method that returns objects of types only known from the
//! calling context, such as a plugin registry instantiating a configured class. Calls to
//! factories are analyzed per call site, and every type later observed flowing out of
//! them is appended to the summary's statements.

use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use crate::{
    ssa::{Constant, Instruction, ValueNumber},
    types::MethodRef,
};

/// Declared statements of one method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodSummary {
    /// The summarized method
    pub method: MethodRef,
    /// Whether calls to the method get per-call-site contexts
    pub factory: bool,
    /// Statements in execution order, numbered like a body of `method`
    pub statements: Vec<Instruction>,
    /// Constants the statements refer to
    pub constants: BTreeMap<ValueNumber, Constant>,
}

impl MethodSummary {
    /// An empty, non-factory summary.
    #[must_use]
    pub fn new(method: MethodRef) -> Self {
        Self {
            method,
            factory: false,
            statements: Vec::new(),
            constants: BTreeMap::new(),
        }
    }

    /// Marks the method as a factory.
    #[must_use]
    pub fn factory(mut self) -> Self {
        self.factory = true;
        self
    }

    /// Appends a statement.
    #[must_use]
    pub fn statement(mut self, instruction: Instruction) -> Self {
        self.statements.push(instruction);
        self
    }

    /// Binds a constant.
    #[must_use]
    pub fn constant(mut self, number: ValueNumber, constant: Constant) -> Self {
        self.constants.insert(number, constant);
        self
    }

    /// Highest value number used or defined by the statements or constants.
    #[must_use]
    pub fn max_value_number(&self) -> Option<ValueNumber> {
        self.statements
            .iter()
            .flat_map(|s| s.defs().into_iter().chain(s.uses()))
            .chain(self.constants.keys().copied())
            .max()
    }
}

/// The summaries known to an analysis.
#[derive(Debug, Clone, Default)]
pub struct MethodSummaries {
    summaries: HashMap<MethodRef, Arc<MethodSummary>>,
}

impl MethodSummaries {
    /// Creates an empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a summary.
    pub fn insert(&mut self, summary: MethodSummary) {
        self.summaries
            .insert(summary.method.clone(), Arc::new(summary));
    }

    /// Builder-style [`MethodSummaries::insert`].
    #[must_use]
    pub fn with(mut self, summary: MethodSummary) -> Self {
        self.insert(summary);
        self
    }

    /// Returns `true` when `method` is declared as a factory.
    #[must_use]
    pub fn is_factory(&self, method: &MethodRef) -> bool {
        self.summaries.get(method).is_some_and(|s| s.factory)
    }

    /// The summary of `method`.
    #[must_use]
    pub fn summary(&self, method: &MethodRef) -> Option<Arc<MethodSummary>> {
        self.summaries.get(method).cloned()
    }

    /// Number of summaries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.summaries.len()
    }

    /// Returns `true` when no summary is known.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.summaries.is_empty()
    }
}
