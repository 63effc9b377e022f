// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![deny(unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! # reflectir
//!
//! Context-sensitive modelling of Java reflection for call-graph construction.
//!
//! Reflective library calls such as `Class.forName`, `Class.newInstance` or
//! `Method.invoke` have no analyzable body: what they do depends on strings and objects
//! only known at the call site. `reflectir` lets a whole-program call-graph builder
//! specialize such calls. A chain of *context selectors* inspects each call site and,
//! when the evidence is precise enough, produces a [`context::Context`]. A chain of
//! *context interpreters* then synthesizes a small, typed, SSA-form body for the
//! callee under that context: `new Square(); return` for `Class.newInstance` on a known
//! class, an unpack-and-call sequence for `Method.invoke`, a `Method[]` filled with
//! constants for `getDeclaredMethods`, and so on.
//!
//! ## Features
//!
//! - **Type abstractions** - exact types, cones over a hierarchy, and explicit sets
//! - **Eleven selectors and eleven interpreters** - covering class lookup, instantiation,
//!   reflective invocation, member lookup, annotations, method handles, `getClass`,
//!   `clone` and declared factories
//! - **Checked SSA construction** - single assignment, scopes and phi bookkeeping are
//!   enforced by a value manager and reported as [`Error`] values
//! - **Concurrent caches** - bodies are memoized per node in `DashMap`s and can be
//!   built in parallel
//! - **Precision diagnostics** - imprecise cones end up in an [`events::EventLog`]
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use reflectir::prelude::*;
//!
//! let hierarchy = TypeHierarchy::builder()
//!     .core_library()?
//!     .declare(ClassBuilder::new(TypeRef::application("Lapp/Plugin")).constructor("()V", MemberFlags::PUBLIC))?
//!     .build();
//! let engine = ReflectionEngine::new(
//!     Arc::new(hierarchy),
//!     Arc::new(MethodSummaries::new()),
//!     ReflectionConfig::default(),
//! );
//!
//! // Class.forName("app.Plugin") called from main with the literal in v3
//! let main = MethodRef::parse(TypeRef::application("Lapp/Main"), "main", "()V")?;
//! let caller = CallerEvidence::new(
//!     Arc::new(CgNode::new(main, Context::Everywhere)),
//!     SymbolTable::new().with(ValueNumber(3), Constant::String("app.Plugin".into())),
//! );
//! let for_name = well_known::class_for_name();
//! let site = CallSiteRef::new(0, for_name.clone(), Dispatch::Static, vec![ValueNumber(3)]);
//!
//! if let Some(context) = engine.select(&caller, &site, &for_name, &[]) {
//!     let body = engine.body(&CgNode::new(for_name, context))?;
//!     println!("{} statements", body.number_of_statements());
//! }
//! # Ok::<(), reflectir::Error>(())
//! ```
//!
//! ## Error Handling
//!
//! All fallible operations return [`Result<T>`]. Unresolvable input is not an error:
//! selectors decline and interpreters produce empty or throwing bodies, logging the
//! reason through `tracing` at `debug` level.
//!
//! ## Logging
//!
//! The crate emits `tracing` events and never installs a subscriber.

#[macro_use]
pub(crate) mod error;

/// Shared functionality which is used in unit tests
#[cfg(test)]
pub(crate) mod test;

/// Convenient re-exports of the most commonly used types and traits.
///
/// # Example
///
/// ```rust
/// use reflectir::prelude::*;
///
/// let config = ReflectionConfig::precise();
/// assert_eq!(config.cone_bound, usize::MAX);
/// ```
pub mod prelude;

/// Type names, references and the catalogue of well-known library members.
pub mod types;

/// The class hierarchy interface and its in-memory implementation.
///
/// # Key Types
///
/// - [`hierarchy::ClassHierarchy`] - What selectors and interpreters ask about classes
/// - [`hierarchy::TypeHierarchy`] - Hierarchy built from [`hierarchy::ClassBuilder`] declarations
pub mod hierarchy;

/// Contexts, call-graph nodes, call-site evidence and reflective idioms.
pub mod context;

/// SSA values, instructions and the checked construction machinery.
///
/// - [`ssa::ParameterAccessor`] - value numbering of parameters
/// - [`ssa::ValueManager`] - single-assignment and scope bookkeeping
/// - [`ssa::TypedInstructionFactory`] - type-checked instruction creation
pub mod ssa;

/// Synthetic bodies and the builder that assembles them.
pub mod synthetic;

/// Context selectors, one per reflective idiom.
pub mod selectors;

/// Context interpreters, one per reflective idiom plus declared factories.
pub mod interpreters;

/// Declared factory methods and their summary statements.
pub mod summary;

/// Ordered strategies for finding a class by name.
pub mod lookup;

/// Precision diagnostics and engine activity.
pub mod events;

/// Options of the reflection engine.
pub mod config;

/// The engine wiring selectors and interpreters together.
pub mod engine;

pub use engine::ReflectionEngine;

/// `reflectir` Result type
///
/// A type alias for `std::result::Result<T, Error>` where the error type is always [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// `reflectir` Error type
///
/// The main error type for all operations in this crate.
pub use error::Error;
