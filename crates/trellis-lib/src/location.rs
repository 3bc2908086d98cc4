//! Stable, re-resolvable addresses into the query IR.
//!
//! A [`Location`] pairs a root pipeline with the [`NodeId`] of one of its
//! nodes. Resolution is a single pre-order traversal recording, per step,
//! enough to reconstruct the parent; this is the only place in the crate
//! where a tree is searched by id. Because ids (not object identity)
//! persist across re-inference, a location can be
//! [rebased](Location::rebase) onto a freshly re-inferred tree.
//!
//! Resolving a stale id yields `None`; callers are expected to fall back
//! to a default (the root pipeline) rather than surface the failure.

use crate::ir::{NodeId, Query, QueryKind};

/// One step of an edit path from a root to a node.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Step {
    /// Index into a pipeline's atom list.
    Atom(usize),
    /// Key into a select's field map.
    Field(String),
    /// Into a define's bound pipeline.
    Binding,
}

/// Address of one node within a root pipeline.
#[derive(Clone, Debug)]
pub struct Location {
    root: Query,
    target: NodeId,
}

impl Location {
    pub fn new(root: Query, target: NodeId) -> Self {
        Self { root, target }
    }

    /// The whole root pipeline as a location (always resolvable).
    pub fn of_root(root: Query) -> Self {
        let target = root.id;
        Self { root, target }
    }

    pub fn root(&self) -> &Query {
        &self.root
    }

    pub fn target(&self) -> NodeId {
        self.target
    }

    /// The addressed node, or `None` when the id is stale for this root.
    pub fn node(&self) -> Option<&Query> {
        node_at(&self.root, &self.path()?)
    }

    /// Edit-step path from the root to the addressed node.
    pub fn path(&self) -> Option<Vec<Step>> {
        let mut path = Vec::new();
        find_path(&self.root, self.target, &mut path).then_some(path)
    }

    /// Retarget this location onto a structurally-similar tree: after an
    /// edit plus re-inference, ids persist even though every node is new.
    pub fn rebase(&self, new_root: Query) -> Self {
        Self {
            root: new_root,
            target: self.target,
        }
    }
}

/// Pre-order search for `target`, building the step path on the way down.
fn find_path(node: &Query, target: NodeId, path: &mut Vec<Step>) -> bool {
    if node.id == target {
        return true;
    }

    match &node.kind {
        QueryKind::Pipeline { atoms } => {
            for (index, atom) in atoms.iter().enumerate() {
                path.push(Step::Atom(index));
                if find_path(atom, target, path) {
                    return true;
                }
                path.pop();
            }
        }
        QueryKind::Select { fields, .. } => {
            for (name, field) in fields {
                path.push(Step::Field(name.clone()));
                if find_path(field, target, path) {
                    return true;
                }
                path.pop();
            }
        }
        QueryKind::Define { pipeline, .. } => {
            path.push(Step::Binding);
            if find_path(pipeline, target, path) {
                return true;
            }
            path.pop();
        }
        _ => {}
    }
    false
}

/// Follow a step path down from `root`.
pub(crate) fn node_at<'a>(root: &'a Query, path: &[Step]) -> Option<&'a Query> {
    let Some((step, rest)) = path.split_first() else {
        return Some(root);
    };
    let child = match (&root.kind, step) {
        (QueryKind::Pipeline { atoms }, Step::Atom(index)) => atoms.get(*index)?,
        (QueryKind::Select { fields, .. }, Step::Field(name)) => fields.get(name)?,
        (QueryKind::Define { pipeline, .. }, Step::Binding) => pipeline,
        _ => return None,
    };
    node_at(child, rest)
}
