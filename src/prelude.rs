//! # reflectir Prelude
//!
//! This module provides a convenient prelude for the most commonly used types and traits
//! of the library. Import it to build a hierarchy, wire a [`ReflectionEngine`] and feed it
//! call-site evidence.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all reflectir operations
pub use crate::Error;

/// The result type used throughout reflectir
pub use crate::Result;

/// Engine configuration and class-name lookup strategies
pub use crate::{config::ReflectionConfig, lookup::TypeLookup};

// ================================================================================================
// Main Entry Point
// ================================================================================================

/// Selectors and interpreters behind one handle
pub use crate::ReflectionEngine;

// ================================================================================================
// Type System
// ================================================================================================

/// Type names, references and abstractions
pub use crate::types::{
    well_known, ClassLoaderRef, Descriptor, FieldRef, MethodRef, PrimitiveType, Selector,
    TypeAbstraction, TypeName, TypeRef,
};

/// Class hierarchy
pub use crate::hierarchy::{
    Annotation, ClassBuilder, ClassHierarchy, ClassInfo, MemberFlags, MethodInfo, TypeHierarchy,
};

// ================================================================================================
// Contexts and Evidence
// ================================================================================================

/// Contexts, nodes and what the call-graph builder knows about a call site
pub use crate::context::{CallerEvidence, CgNode, Context, InstanceKey, ReflectiveIdiom, SymbolTable};

/// Declared factories
pub use crate::summary::{MethodSummaries, MethodSummary};

// ================================================================================================
// SSA and Synthetic Bodies
// ================================================================================================

/// Instructions and values of synthetic bodies
pub use crate::ssa::{
    CallSiteRef, Constant, Dispatch, Instruction, NewSite, ParameterAccessor, SsaValue,
    ValueNumber, VariableKey,
};

/// A finished synthetic body
pub use crate::synthetic::SyntheticIr;

// ================================================================================================
// Selectors, Interpreters and Diagnostics
// ================================================================================================

/// The extension traits and their composites
pub use crate::{
    interpreters::{CompositeInterpreter, ContextInterpreter},
    selectors::{CompositeSelector, ContextSelector},
};

/// Precision diagnostics
pub use crate::events::{Event, EventKind, EventLog};
