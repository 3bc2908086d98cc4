//! Context arena: immutable per-node annotations.
//!
//! Every inference step produces a new [`Context`] chained to its
//! predecessor through a parent index; contexts are shared freely and
//! never mutated in place. The arena owns all contexts for one inference
//! run; a side table maps node ids to their context.

use std::collections::HashMap;

use indexmap::IndexMap;

use crate::ir::{NodeId, Query};
use crate::types::Type;

/// Index of a context within its arena.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct CtxId(u32);

impl CtxId {
    #[inline]
    pub fn as_u32(self) -> u32 {
        self.0
    }
}

/// Immutable annotation attached to one IR node.
#[derive(Clone, Debug)]
pub struct Context {
    /// The enclosing context this one was derived from.
    pub parent: Option<CtxId>,
    /// Inferred type at this point of the pipeline.
    pub ty: Type,
    /// Named pipeline bindings visible here.
    pub scope: Scope,
    /// Semantic-error flag; contagious through pipelines.
    pub invalid: bool,
    /// Human-readable description of what this node computes.
    pub title: String,
}

impl Context {
    /// The root context inference starts from: void, empty scope.
    pub fn root() -> Self {
        Self {
            parent: None,
            ty: Type::void(),
            scope: Scope::new(),
            invalid: false,
            title: String::new(),
        }
    }
}

/// A pipeline bound to a name by `define`.
#[derive(Clone, Debug)]
pub struct Binding {
    pub pipeline: Query,
    pub ty: Type,
}

/// Name → binding map introduced by `define` atoms.
///
/// Extension is persistent-by-clone: [`Scope::bind`] returns a new scope,
/// leaving the original untouched, so enclosing contexts keep their view.
#[derive(Clone, Debug, Default)]
pub struct Scope {
    bindings: IndexMap<String, Binding>,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    /// A new scope with `name` bound; the receiver is unchanged.
    pub fn bind(&self, name: impl Into<String>, binding: Binding) -> Self {
        let mut bindings = self.bindings.clone();
        bindings.insert(name.into(), binding);
        Self { bindings }
    }

    pub fn get(&self, name: &str) -> Option<&Binding> {
        self.bindings.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.bindings.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

/// Arena of contexts produced by one inference run.
#[derive(Clone, Debug, Default)]
pub struct Contexts {
    entries: Vec<Context>,
    by_node: HashMap<NodeId, CtxId>,
}

impl Contexts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a context, returning its id.
    pub(crate) fn push(&mut self, ctx: Context) -> CtxId {
        let id = CtxId(self.entries.len() as u32);
        self.entries.push(ctx);
        id
    }

    /// Associate a node with its context.
    pub(crate) fn record(&mut self, node: NodeId, ctx: CtxId) {
        self.by_node.insert(node, ctx);
    }

    /// Get a context by id.
    ///
    /// # Panics
    /// Panics if the id came from a different arena.
    pub fn get(&self, id: CtxId) -> &Context {
        &self.entries[id.0 as usize]
    }

    /// The context recorded for a node, if any.
    pub fn for_node(&self, node: NodeId) -> Option<&Context> {
        self.by_node.get(&node).map(|&id| self.get(id))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A query together with the contexts of its latest inference run.
#[derive(Clone, Debug)]
pub struct Typed {
    pub query: Query,
    pub contexts: Contexts,
}

impl Typed {
    /// Context of the root node.
    ///
    /// # Panics
    /// Panics if the arena does not cover the root, which would mean the
    /// tree was not produced by [`infer`](super::infer).
    pub fn root(&self) -> &Context {
        self.contexts
            .for_node(self.query.id)
            .expect("inference must annotate the root node")
    }

    /// Context of an arbitrary node.
    pub fn context(&self, node: NodeId) -> Option<&Context> {
        self.contexts.for_node(node)
    }

    pub fn ty(&self) -> &Type {
        &self.root().ty
    }

    /// Whether the query carries a semantic error anywhere that poisons
    /// its result. Check this before translating.
    pub fn is_invalid(&self) -> bool {
        self.root().invalid
    }
}
