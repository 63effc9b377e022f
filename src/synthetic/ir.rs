//! Finished synthetic bodies.

use std::{collections::BTreeMap, fmt};

use crate::{
    context::{CgNode, Context},
    ssa::{CallSiteRef, Constant, InducedCfg, Instruction, NewSite, ValueNumber},
    types::{FieldRef, MethodRef, TypeRef},
};

/// An immutable synthetic method body for one call-graph node.
///
/// Two bodies built for equal nodes compare equal; interpreters hand them out as
/// `Arc<SyntheticIr>` from their caches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntheticIr {
    /// The modelled method
    pub method: MethodRef,
    /// The context the body is specialized to
    pub context: Context,
    /// Instructions in order; jump targets are indices into this list
    pub instructions: Vec<Instruction>,
    /// Literal values bound to value numbers
    pub constants: BTreeMap<ValueNumber, Constant>,
    /// Blocks and edges induced by `instructions`
    pub cfg: InducedCfg,
    /// Readable names for value numbers
    pub local_names: BTreeMap<ValueNumber, String>,
}

impl SyntheticIr {
    /// Assembles a body and induces its control-flow graph.
    #[must_use]
    pub fn new(
        node: &CgNode,
        instructions: Vec<Instruction>,
        constants: BTreeMap<ValueNumber, Constant>,
        local_names: BTreeMap<ValueNumber, String>,
    ) -> Self {
        let cfg = InducedCfg::new(&instructions);
        Self {
            method: node.method.clone(),
            context: node.context.clone(),
            instructions,
            constants,
            cfg,
            local_names,
        }
    }

    /// A body without instructions.
    #[must_use]
    pub fn empty(node: &CgNode) -> Self {
        Self::new(node, Vec::new(), BTreeMap::new(), BTreeMap::new())
    }

    /// The node this body was built for.
    #[must_use]
    pub fn node(&self) -> CgNode {
        CgNode::new(self.method.clone(), self.context.clone())
    }

    /// Returns `true` for a body without instructions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Number of instructions.
    #[must_use]
    pub fn number_of_statements(&self) -> usize {
        self.instructions.len()
    }

    /// Allocation sites in instruction order.
    #[must_use]
    pub fn allocation_sites(&self) -> Vec<NewSite> {
        self.instructions
            .iter()
            .filter_map(|i| match i {
                Instruction::New { site, .. } => Some(site.clone()),
                _ => None,
            })
            .collect()
    }

    /// Call sites in instruction order.
    #[must_use]
    pub fn call_sites(&self) -> Vec<CallSiteRef> {
        self.instructions
            .iter()
            .filter_map(|i| match i {
                Instruction::Invoke { site, .. } => Some(site.clone()),
                _ => None,
            })
            .collect()
    }

    /// Fields read, instance and static.
    #[must_use]
    pub fn fields_read(&self) -> Vec<FieldRef> {
        self.instructions
            .iter()
            .filter_map(|i| match i {
                Instruction::GetField { field, .. } => Some(field.clone()),
                _ => None,
            })
            .collect()
    }

    /// Fields written, instance and static.
    #[must_use]
    pub fn fields_written(&self) -> Vec<FieldRef> {
        self.instructions
            .iter()
            .filter_map(|i| match i {
                Instruction::PutField { field, .. } => Some(field.clone()),
                _ => None,
            })
            .collect()
    }

    /// Target types of check-casts.
    #[must_use]
    pub fn cast_types(&self) -> Vec<TypeRef> {
        self.instructions
            .iter()
            .filter_map(|i| match i {
                Instruction::CheckCast { ty, .. } => Some(ty.clone()),
                _ => None,
            })
            .collect()
    }

    /// Values returned by `Return` instructions.
    #[must_use]
    pub fn returned_values(&self) -> Vec<ValueNumber> {
        self.instructions
            .iter()
            .filter_map(|i| match i {
                Instruction::Return { value } => *value,
                _ => None,
            })
            .collect()
    }

    /// The constant bound to a value number.
    #[must_use]
    pub fn constant(&self, number: ValueNumber) -> Option<&Constant> {
        self.constants.get(&number)
    }
}

impl fmt::Display for SyntheticIr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} in {}", self.method, self.context)?;
        for (number, constant) in &self.constants {
            writeln!(f, "  {number} = {constant}")?;
        }
        for (index, instruction) in self.instructions.iter().enumerate() {
            writeln!(f, "  {index:>3}: {instruction}")?;
        }
        Ok(())
    }
}
