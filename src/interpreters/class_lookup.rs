//! `Class.forName` and `ClassLoader.loadClass`.

use std::sync::Arc;

use crate::{
    context::{CgNode, Context, ReflectiveIdiom},
    interpreters::{BodyCache, ContextInterpreter, InterpreterEnv},
    synthetic::SyntheticIr,
    Error, Result,
};

/// Empty bodies for class lookups by name.
///
/// The interesting part, which class the name denotes, already lives in the node's
/// `JavaType` context, where the pointer analysis picks it up as the returned class
/// object.
pub struct ClassLookupInterpreter {
    env: InterpreterEnv,
    cache: BodyCache,
}

impl ClassLookupInterpreter {
    /// Creates the interpreter.
    #[must_use]
    pub fn new(env: InterpreterEnv) -> Self {
        Self {
            env,
            cache: BodyCache::new(),
        }
    }
}

impl ContextInterpreter for ClassLookupInterpreter {
    fn name(&self) -> &'static str {
        "class-lookup"
    }

    fn understands(&self, node: &CgNode) -> bool {
        matches!(
            ReflectiveIdiom::of(&node.method),
            Some(ReflectiveIdiom::ClassForName | ReflectiveIdiom::LoadClass)
        ) && matches!(node.context, Context::JavaType(_))
    }

    fn body(&self, node: &CgNode) -> Result<Arc<SyntheticIr>> {
        if !self.understands(node) {
            return Err(Error::NotUnderstood(node.to_string()));
        }
        self.env
            .cached(&self.cache, node, || Ok(SyntheticIr::empty(node)))
    }
}
