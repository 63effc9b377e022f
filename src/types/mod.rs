//! Type, method and field references plus type abstractions.
//!
//! This module provides the vocabulary every other part of the crate speaks:
//!
//! - [`TypeName`], [`ClassLoaderRef`] and [`PrimitiveType`] - names in descriptor form
//! - [`TypeRef`], [`MethodRef`], [`FieldRef`], [`Selector`], [`Descriptor`] - unresolved references
//! - [`TypeAbstraction`] - exact type, type cone or explicit type set
//! - [`well_known`] - the core-library members reflective synthesis refers to

mod abstraction;
mod name;
mod reference;
pub mod well_known;

pub use abstraction::TypeAbstraction;
pub use name::{ClassLoaderRef, PrimitiveType, TypeName};
pub use reference::{Descriptor, FieldRef, MethodRef, Selector, TypeRef};
