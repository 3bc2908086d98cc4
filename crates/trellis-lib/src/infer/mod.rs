//! Type inference: a pure annotator over the query IR.
//!
//! [`infer`] walks the tree from a void root context, threading each
//! atom's context into the next, and returns the tree together with a
//! fresh [`Contexts`] arena. Inference never mutates the input and never
//! fails for domain-level problems: unresolvable navigation, a
//! disallowed aggregate or a malformed group-by all surface as an
//! `invalid`-typed, flagged context. Re-running inference on an
//! already-annotated tree reproduces the same contexts (fixed point).
//!
//! Only a structurally broken tree (an empty pipeline, which normalized
//! trees cannot contain) is a programming error and panics.

mod context;
mod expr;
mod query;

#[cfg(test)]
mod context_tests;
#[cfg(test)]
mod expr_tests;

pub use context::{Binding, Context, Contexts, CtxId, Scope, Typed};

use trellis_core::Domain;

use crate::ir::Query;

/// Annotate `query` against `domain`, starting from a void root context.
pub fn infer(domain: &Domain, query: &Query) -> Typed {
    let mut pass = InferencePass {
        domain,
        contexts: Contexts::new(),
    };
    let root = pass.contexts.push(Context::root());
    pass.infer_query(query, root);
    Typed {
        query: query.clone(),
        contexts: pass.contexts,
    }
}

/// One inference run. Holds the arena being built.
pub(crate) struct InferencePass<'a> {
    pub(crate) domain: &'a Domain,
    pub(crate) contexts: Contexts,
}
