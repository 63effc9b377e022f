//! Synthetic method bodies.
//!
//! - [`SyntheticIr`] - a finished, immutable body with its induced CFG
//! - [`SpecializedMethod`] - the builder interpreters write bodies with
//! - [`cone_members`] and [`SpecializedMethod::add_type_abstraction`] - expansion of
//!   type abstractions into `new; <init>; return` sequences

mod cone;
mod ir;
mod specialized;

pub use cone::cone_members;
pub use ir::SyntheticIr;
pub use specialized::SpecializedMethod;
