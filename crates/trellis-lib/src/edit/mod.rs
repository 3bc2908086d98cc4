//! Structural editing of query pipelines.
//!
//! Everything builds on one primitive: replace the node at an edit path,
//! rebuilding all ancestors (with their ids intact, so locations keep
//! resolving). Every operation is pure: a new root is returned, the
//! input tree is untouched. Every operation must be followed by a
//! fresh inference pass; the editor never patches contexts by hand.
//!
//! Callers building atoms to insert must allocate their ids with
//! [`Builder::above`] on the location's root, so ids stay unique within
//! the edited tree.
//!
//! Editing through a path that does not match the tree is a programming
//! error and panics; a [`Location`] that no longer resolves should be
//! handled by the caller (fall back to the root pipeline) before calling
//! into the editor.

mod reconcile;


pub use reconcile::{COLUMN_BUDGET, PRIORITY_COLUMNS, reconcile};

use crate::ir::{Builder, NodeId, Query, QueryKind};
use crate::location::{Location, Step, node_at};

/// Splice `atoms` in directly after the located atom.
///
/// When the located atom is second-to-last and the pipeline's tail is a
/// select, the select is detached and stashed on the insertion boundary
/// (the last inserted atom) so a reverting edit can restore it.
pub fn insert_after(loc: &Location, atoms: Vec<Query>) -> Query {
    let path = resolve(loc);
    pipeline_edit(loc.root(), &path, |mut old, index, _b| {
        let mut inserted = flatten(atoms);
        if inserted.is_empty() {
            return old;
        }

        let second_to_last = index + 2 == old.len();
        if second_to_last && old.last().is_some_and(Query::is_select) {
            let select = old.pop().expect("tail checked above");
            inserted
                .last_mut()
                .expect("inserted is non-empty")
                .saved = Some(Box::new(select));
        }

        old.splice(index + 1..index + 1, inserted);
        old
    })
}

/// Remove exactly the located atom.
pub fn remove(loc: &Location) -> Query {
    let path = resolve(loc);
    pipeline_edit(loc.root(), &path, |mut old, index, _b| {
        let removed = old.remove(index);
        restore_saved(&mut old, removed.saved);
        old
    })
}

/// Remove the located atom and everything after it in its pipeline.
pub fn cut(loc: &Location) -> Query {
    let path = resolve(loc);
    pipeline_edit(loc.root(), &path, |mut old, index, _b| {
        let removed: Vec<Query> = old.drain(index..).collect();
        let removed_saved = removed.into_iter().find_map(|atom| atom.saved);
        restore_saved(&mut old, removed_saved);
        old
    })
}

/// Substitute the located node in place.
pub fn replace_with(loc: &Location, replacement: Query) -> Query {
    let path = resolve(loc);
    if path.is_empty() {
        return replacement.normalized();
    }
    // A pipeline replacing an atom splices in flat.
    if replacement.is_pipeline()
        && let Some(Step::Atom(_)) = path.last()
    {
        return pipeline_edit(loc.root(), &path, |mut old, index, _b| {
            old.splice(index..=index, flatten(vec![replacement]));
            old
        });
    }
    replace_at(loc.root(), &path, replacement)
}

/// Descend into (creating as needed) nested selects so that `attr_path`
/// is reachable and selected at the leaf. The located node must be a
/// pipeline. Returns the new root and the id of the leaf field's
/// pipeline, ready to be re-located after re-inference.
pub fn grow_navigation(loc: &Location, attr_path: &[&str]) -> (Query, NodeId) {
    let path = resolve(loc);
    let target = node_at(loc.root(), &path).expect("path resolved above");
    assert!(
        target.is_pipeline(),
        "grow_navigation target must be a pipeline"
    );

    let mut b = Builder::above(loc.root());
    let (grown, leaf) = ensure_selected(target, attr_path, &mut b);
    (replace_at(loc.root(), &path, grown), leaf)
}

fn ensure_selected(pipeline: &Query, attr_path: &[&str], b: &mut Builder) -> (Query, NodeId) {
    let Some((head, rest)) = attr_path.split_first() else {
        return (pipeline.clone(), pipeline.id);
    };

    let mut atoms = pipeline
        .as_pipeline()
        .expect("nested select fields are pipelines")
        .to_vec();

    let select = if atoms.last().is_some_and(Query::is_select) {
        atoms.pop().expect("tail checked above")
    } else {
        b.select(vec![])
    };
    let QueryKind::Select { mut fields, sort } = select.kind else {
        unreachable!("select checked above")
    };

    let field_pipeline = match fields.get(*head) {
        Some(existing) => existing.clone(),
        None => {
            let nav = b.navigate(*head);
            b.pipeline(vec![nav])
        }
    };
    let (field_pipeline, leaf) = ensure_selected(&field_pipeline, rest, b);
    fields.insert(head.to_string(), field_pipeline);

    atoms.push(Query {
        id: select.id,
        kind: QueryKind::Select { fields, sort },
        saved: select.saved,
    });

    (
        Query {
            id: pipeline.id,
            kind: QueryKind::Pipeline { atoms },
            saved: pipeline.saved.clone(),
        },
        leaf,
    )
}

/// The primitive: rebuild the tree with `replacement` at `path`.
/// Ancestor ids are preserved so locations stay resolvable.
fn replace_at(root: &Query, path: &[Step], replacement: Query) -> Query {
    let Some((step, rest)) = path.split_first() else {
        return replacement;
    };

    let mut node = root.clone();
    match (&mut node.kind, step) {
        (QueryKind::Pipeline { atoms }, Step::Atom(index)) => {
            assert!(
                *index < atoms.len(),
                "edit path atom index {index} out of bounds"
            );
            let rebuilt = replace_at(&atoms[*index], rest, replacement);
            atoms[*index] = rebuilt;
        }
        (QueryKind::Select { fields, .. }, Step::Field(name)) => {
            let child = fields
                .get(name)
                .unwrap_or_else(|| panic!("edit path names missing select field `{name}`"));
            let rebuilt = replace_at(child, rest, replacement);
            fields.insert(name.clone(), rebuilt);
        }
        (QueryKind::Define { pipeline, .. }, Step::Binding) => {
            *pipeline = Box::new(replace_at(pipeline, rest, replacement));
        }
        _ => panic!("edit path does not match the shape of the tree"),
    }
    node
}

/// Resolve a location's path, or die: editing through a stale location is
/// a programming error, not a user-facing condition.
fn resolve(loc: &Location) -> Vec<Step> {
    loc.path()
        .expect("location does not resolve in this tree; rebase or fall back before editing")
}

/// Edit the atom list of the pipeline containing the path's target atom.
/// The edited list is normalized: never empty (identity is inserted).
fn pipeline_edit(
    root: &Query,
    path: &[Step],
    edit: impl FnOnce(Vec<Query>, usize, &mut Builder) -> Vec<Query>,
) -> Query {
    let Some((Step::Atom(index), parent_path)) = path.split_last() else {
        panic!("edit target must be a pipeline atom");
    };
    let parent = node_at(root, parent_path).expect("path resolved by caller");
    let QueryKind::Pipeline { atoms } = &parent.kind else {
        panic!("edit path does not end inside a pipeline");
    };

    let mut b = Builder::above(root);
    let mut new_atoms = edit(atoms.clone(), *index, &mut b);
    if new_atoms.is_empty() {
        new_atoms.push(b.identity());
    }

    let new_parent = Query {
        id: parent.id,
        kind: QueryKind::Pipeline { atoms: new_atoms },
        saved: parent.saved.clone(),
    };
    replace_at(root, parent_path, new_parent)
}

/// Re-attach a stashed select when the edit left none: first from the
/// just-removed atom, otherwise from the new tail.
fn restore_saved(atoms: &mut Vec<Query>, removed_saved: Option<Box<Query>>) {
    if atoms.last().is_some_and(Query::is_select) {
        return;
    }
    let candidate =
        removed_saved.or_else(|| atoms.last_mut().and_then(|tail| tail.saved.take()));
    if let Some(select) = candidate {
        atoms.push(*select);
    }
}

fn flatten(atoms: Vec<Query>) -> Vec<Query> {
    let mut flat = Vec::with_capacity(atoms.len());
    for atom in atoms {
        match atom.kind {
            QueryKind::Pipeline { atoms: inner } => flat.extend(inner),
            _ => flat.push(atom),
        }
    }
    flat
}
