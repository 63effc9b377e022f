//! Declared factory methods.

use std::sync::Arc;

use crate::{
    context::{CallerEvidence, Context, InstanceKey},
    selectors::ContextSelector,
    ssa::CallSiteRef,
    summary::MethodSummaries,
    types::MethodRef,
};

/// Selects `CallerSite { caller, site }` for every callee the summaries mark as a
/// factory, so each call site gets its own bounded factory body.
pub struct FactorySelector {
    summaries: Arc<MethodSummaries>,
}

impl FactorySelector {
    /// Creates a selector backed by `summaries`.
    #[must_use]
    pub fn new(summaries: Arc<MethodSummaries>) -> Self {
        Self { summaries }
    }
}

impl ContextSelector for FactorySelector {
    fn name(&self) -> &'static str {
        "factory"
    }

    fn try_select(
        &self,
        caller: &CallerEvidence,
        site: &CallSiteRef,
        callee: &MethodRef,
        _receiver: &[InstanceKey],
    ) -> Option<Context> {
        if !self.summaries.is_factory(callee) {
            return None;
        }
        Some(Context::CallerSite {
            caller: caller.node.clone(),
            site: site.clone(),
        })
    }
}
