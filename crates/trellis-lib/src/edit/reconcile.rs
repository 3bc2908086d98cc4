//! Idempotent select reconciliation.
//!
//! After every edit the pipeline's trailing select must be brought back
//! in line with the pipeline's current type: stale fields dropped, group
//! keys kept visible, a missing select auto-populated. Reconciliation is
//! a fixed point (applying it to its own output changes nothing), so the
//! surrounding editor can run it unconditionally.

use indexmap::IndexMap;

use trellis_core::Domain;

use crate::infer::infer;
use crate::ir::{Builder, Query, QueryKind};
use crate::types::Type;

/// How many columns an auto-populated select gets at most.
pub const COLUMN_BUDGET: usize = 8;

/// Attribute names picked first, in this order, when auto-populating.
pub const PRIORITY_COLUMNS: [&str; 5] = ["id", "key", "name", "title", "type"];

/// Normalize the trailing select of `query` against the current domain.
///
/// - An existing trailing select keeps exactly the fields whose type did
///   not become invalid; a sort spec whose field no longer resolves is
///   dropped.
/// - Without a select (or when every field went stale), a fresh select is
///   populated from the pipeline's record type: priority names first,
///   then declaration order, up to [`COLUMN_BUDGET`] columns.
/// - Attributes flagged as group keys are always included, budget or not.
///
/// Returns a raw tree; run inference on it afterwards like after any
/// other edit.
pub fn reconcile(domain: &Domain, query: &Query) -> Query {
    let Some(atoms) = query.as_pipeline() else {
        return query.clone();
    };

    let typed = infer(domain, query);
    let mut atoms = atoms.to_vec();
    let mut b = Builder::above(query);

    if atoms.last().is_some_and(Query::is_select) {
        let select = atoms.pop().expect("tail checked above");
        let incoming_ty = match atoms.last() {
            Some(prev) => typed
                .context(prev.id)
                .map(|ctx| ctx.ty.clone())
                .unwrap_or_else(Type::void),
            None => Type::void(),
        };

        let QueryKind::Select { fields, sort } = select.kind else {
            unreachable!("select checked above")
        };
        let mut kept: IndexMap<String, Query> = fields
            .into_iter()
            .filter(|(_, field)| {
                typed
                    .context(field.id)
                    .is_some_and(|ctx| !ctx.invalid)
            })
            .collect();

        if kept.is_empty() {
            if let Some(select) = auto_select(domain, &incoming_ty, &mut b) {
                atoms.push(select);
            }
        } else {
            for (name, entry) in incoming_ty.attributes(domain) {
                if entry.group_by && !kept.contains_key(&name) {
                    let nav = b.navigate(&name);
                    let pipe = b.pipeline(vec![nav]);
                    kept.insert(name, pipe);
                }
            }
            let sort = sort.filter(|spec| kept.contains_key(&spec.field));
            atoms.push(Query {
                id: select.id,
                kind: QueryKind::Select { fields: kept, sort },
                saved: select.saved,
            });
        }
    } else if let Some(select) = auto_select(domain, typed.ty(), &mut b) {
        atoms.push(select);
    }

    if atoms.is_empty() {
        atoms.push(b.identity());
    }

    Query {
        id: query.id,
        kind: QueryKind::Pipeline { atoms },
        saved: query.saved.clone(),
    }
}

/// Build the default select over a record type: priority names, then
/// declaration order up to the budget, then any group keys still missing.
fn auto_select(domain: &Domain, ty: &Type, b: &mut Builder) -> Option<Query> {
    if !ty.is_record() {
        return None;
    }
    let attrs = ty.attributes(domain);
    if attrs.is_empty() {
        return None;
    }

    let mut chosen: Vec<&str> = Vec::new();
    for name in PRIORITY_COLUMNS {
        if attrs.contains_key(name) {
            chosen.push(name);
        }
    }
    for name in attrs.keys() {
        if chosen.len() >= COLUMN_BUDGET {
            break;
        }
        if !chosen.contains(&name.as_str()) {
            chosen.push(name.as_str());
        }
    }
    for (name, entry) in &attrs {
        if entry.group_by && !chosen.contains(&name.as_str()) {
            chosen.push(name.as_str());
        }
    }

    let fields = chosen
        .into_iter()
        .map(|name| {
            let nav = b.navigate(name);
            let pipe = b.pipeline(vec![nav]);
            (name.to_string(), pipe)
        })
        .collect();
    Some(b.select_from(fields, None))
}
