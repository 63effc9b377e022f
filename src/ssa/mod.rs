//! SSA infrastructure for synthetic method bodies.
//!
//! Synthetic bodies are written in Static Single Assignment form: each value number is
//! defined by exactly one instruction. This module provides the pieces that make writing
//! such bodies safe:
//!
//! - [`value`] - [`SsaValue`], [`ValueNumber`] and the [`VariableKey`] grouping
//! - [`parameters`] - [`ParameterAccessor`], the numbering of receiver and parameters
//! - [`manager`] - [`ValueManager`], scope-aware value allocation and phi bookkeeping
//! - [`instruction`] - the [`Instruction`] set plus call and allocation sites
//! - [`factory`] - [`TypedInstructionFactory`], type-checked instruction construction
//! - [`cfg`] - [`InducedCfg`], basic blocks induced from an instruction list
//!
//! # Usage
//!
//! ```rust,ignore
//! use reflectir::prelude::*;
//!
//! let accessor = ParameterAccessor::from_signature(method, false);
//! let mut values = ValueManager::new(&accessor)?;
//! let factory = TypedInstructionFactory::new(&hierarchy);
//!
//! let key = VariableKey::by_type(&ty);
//! let obj = values.request_unallocated(&ty, key)?;
//! let new = factory.new_object(0, &obj, &ty)?;
//! values.confirm_allocation(&obj, 0)?;
//! ```

pub mod cfg;
pub mod factory;
pub mod instruction;
pub mod manager;
pub mod parameters;
pub mod value;

pub use cfg::{BasicBlock, InducedCfg};
pub use factory::TypedInstructionFactory;
pub use instruction::{BranchOp, CallSiteRef, Constant, Dispatch, Instruction, NewSite};
pub use manager::{Status, ValueManager};
pub use parameters::{Instantiator, ParameterAccessor};
pub use value::{SsaValue, ValueNumber, VariableKey};
