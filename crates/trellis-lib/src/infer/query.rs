//! Per-kind inference rules for query atoms.

use indexmap::IndexMap;

use trellis_core::utils::titleize;

use crate::ir::{Expr, Query, QueryKind};
use crate::types::{AttrEntry, Type};

use super::context::{Binding, Context, CtxId};
use super::InferencePass;

impl InferencePass<'_> {
    /// Infer one node against the incoming context, record the result and
    /// return its id.
    pub(crate) fn infer_query(&mut self, node: &Query, incoming: CtxId) -> CtxId {
        let ctx = match &node.kind {
            QueryKind::Identity | QueryKind::Limit { .. } => self.pass_through(incoming),
            QueryKind::Navigate { path, .. } => self.infer_navigate(path, incoming),
            QueryKind::Select { fields, .. } => self.infer_select(fields, incoming),
            QueryKind::Define { name, pipeline } => self.infer_define(name, pipeline, incoming),
            QueryKind::Filter { predicate } => self.infer_filter(predicate.as_ref(), incoming),
            QueryKind::Group { by } => self.infer_group(by, incoming),
            QueryKind::Aggregate { name, path } => {
                self.infer_aggregate(name, path.as_deref(), incoming)
            }
            QueryKind::Pipeline { atoms } => self.infer_pipeline(atoms, incoming),
        };
        let id = self.contexts.push(ctx);
        self.contexts.record(node.id, id);
        id
    }

    /// Identity and limit: the incoming type rides through, invalid
    /// included.
    fn pass_through(&self, incoming: CtxId) -> Context {
        let base = self.contexts.get(incoming);
        Context {
            parent: Some(incoming),
            ty: base.ty.clone(),
            scope: base.scope.clone(),
            invalid: base.invalid,
            title: String::new(),
        }
    }

    /// Left-to-right fold over the atoms. The pipeline's context is the
    /// last atom's, flagged invalid if any atom was; the title
    /// concatenates the navigate/aggregate titles encountered.
    fn infer_pipeline(&mut self, atoms: &[Query], incoming: CtxId) -> Context {
        assert!(
            !atoms.is_empty(),
            "pipeline with no atoms; normalize trees before inference"
        );

        let mut cursor = incoming;
        let mut any_invalid = false;
        let mut titles = Vec::new();

        for atom in atoms {
            cursor = self.infer_query(atom, cursor);
            let ctx = self.contexts.get(cursor);
            any_invalid |= ctx.invalid;
            if matches!(
                atom.kind,
                QueryKind::Navigate { .. } | QueryKind::Aggregate { .. }
            ) && !ctx.title.is_empty()
            {
                titles.push(ctx.title.clone());
            }
        }

        let last = self.contexts.get(cursor);
        Context {
            parent: Some(incoming),
            ty: last.ty.clone(),
            scope: last.scope.clone(),
            invalid: last.invalid || any_invalid,
            title: titles.join(" "),
        }
    }

    /// Resolve a navigation path against a context: entities (on void) or
    /// the attribute map (on records), then the scope. `None` means "not
    /// found".
    pub(crate) fn resolve_navigation(&self, path: &str, base: &Context) -> Option<(Type, String)> {
        if base.ty.is_void() {
            if let Some(entity) = self.domain.entity(path) {
                return Some((Type::entity(path).to_sequence(), entity.title.clone()));
            }
        } else if base.ty.is_record() {
            if let Some(entry) = base.ty.attribute(self.domain, path) {
                return Some((entry.ty, entry.title));
            }
        }

        base.scope
            .get(path)
            .map(|binding| (binding.ty.clone(), titleize(path)))
    }

    fn infer_navigate(&mut self, path: &str, incoming: CtxId) -> Context {
        let base = self.contexts.get(incoming).clone();

        let Some((resolved, title)) = self.resolve_navigation(path, &base) else {
            return Context {
                parent: Some(incoming),
                ty: Type::invalid(),
                scope: base.scope,
                invalid: true,
                title: titleize(path),
            };
        };

        // Join with the incoming cardinality: navigating through an
        // optional or sequence-valued step stays optional/sequence.
        let ty = base.ty.least_upper_bound(&resolved);
        let invalid = base.invalid || ty.is_invalid();
        Context {
            parent: Some(incoming),
            ty,
            scope: base.scope,
            invalid,
            title,
        }
    }

    /// Each field is inferred against the de-cardinalized incoming type
    /// with a fresh scope. The select's type joins the incoming type with
    /// an ad-hoc record built from the field contexts. An invalid field
    /// stays in the tree, flagged on its own context only; siblings and
    /// the select itself are unaffected.
    fn infer_select(&mut self, fields: &IndexMap<String, Query>, incoming: CtxId) -> Context {
        let base = self.contexts.get(incoming).clone();
        let element = base.ty.clone().to_required();

        let field_base = self.contexts.push(Context {
            parent: Some(incoming),
            ty: element.clone(),
            scope: super::Scope::new(),
            invalid: false,
            title: String::new(),
        });

        let mut attrs = IndexMap::new();
        for (name, field) in fields {
            let field_ctx = self.infer_query(field, field_base);
            let field_ctx = self.contexts.get(field_ctx);

            let title = if field_ctx.title.is_empty() {
                titleize(name)
            } else {
                field_ctx.title.clone()
            };
            let group_by = element
                .attribute(self.domain, name)
                .is_some_and(|entry| entry.group_by);

            attrs.insert(
                name.clone(),
                AttrEntry {
                    title,
                    ty: field_ctx.ty.clone(),
                    group_by,
                },
            );
        }

        let ty = base.ty.least_upper_bound(&Type::ad_hoc(attrs));
        Context {
            parent: Some(incoming),
            ty,
            scope: base.scope,
            invalid: base.invalid,
            title: String::new(),
        }
    }

    /// The bound pipeline is inferred against the de-cardinalized
    /// incoming type under the *enclosing* scope; a binding cannot see
    /// itself. The host type is unchanged; the scope gains the binding;
    /// a bad binding poisons only the exposed name, never the host.
    fn infer_define(&mut self, name: &str, pipeline: &Query, incoming: CtxId) -> Context {
        let base = self.contexts.get(incoming).clone();

        let bound_base = self.contexts.push(Context {
            parent: Some(incoming),
            ty: base.ty.clone().to_required(),
            scope: base.scope.clone(),
            invalid: false,
            title: String::new(),
        });
        let bound = self.infer_query(pipeline, bound_base);
        let bound = self.contexts.get(bound).clone();

        let scope = base.scope.bind(
            name,
            Binding {
                pipeline: pipeline.clone(),
                ty: bound.ty,
            },
        );

        Context {
            parent: Some(incoming),
            ty: base.ty,
            scope,
            invalid: base.invalid,
            title: bound.title,
        }
    }

    /// A set predicate must infer boolean; the host type is preserved on
    /// success and forced invalid otherwise. An unset predicate is a
    /// pass-through so a half-built filter does not poison the pipeline.
    fn infer_filter(&mut self, predicate: Option<&Expr>, incoming: CtxId) -> Context {
        let base = self.contexts.get(incoming).clone();

        let Some(predicate) = predicate else {
            return Context {
                parent: Some(incoming),
                ty: base.ty,
                scope: base.scope,
                invalid: base.invalid,
                title: "Filter".to_string(),
            };
        };

        let title = match predicate.first_navigate_path() {
            Some(path) => format!("Filter by `{path}`"),
            None => "Filter".to_string(),
        };

        let pred_base = self.contexts.push(Context {
            parent: Some(incoming),
            ty: base.ty.clone().to_required(),
            scope: base.scope.clone(),
            invalid: false,
            title: String::new(),
        });
        let pred = self.infer_expr(predicate, pred_base);
        let pred = self.contexts.get(pred);

        if !pred.invalid && pred.ty.is_boolean() {
            Context {
                parent: Some(incoming),
                ty: base.ty,
                scope: base.scope,
                invalid: base.invalid,
                title,
            }
        } else {
            Context {
                parent: Some(incoming),
                ty: Type::invalid(),
                scope: base.scope,
                invalid: true,
                title,
            }
        }
    }

    /// Grouping requires a sequence of entity-backed records. The result
    /// is a new sequence-of-record whose attributes are the group keys
    /// (flagged `group_by`) plus a synthetic attribute, named after the
    /// source entity, holding the grouped members. Empty `by` is a
    /// pass-through.
    fn infer_group(&mut self, by: &[String], incoming: CtxId) -> Context {
        let base = self.contexts.get(incoming).clone();

        if by.is_empty() {
            return Context {
                parent: Some(incoming),
                ty: base.ty,
                scope: base.scope,
                invalid: base.invalid,
                title: String::new(),
            };
        }

        if !(base.ty.is_sequence() && base.ty.is_named_record()) {
            return Context {
                parent: Some(incoming),
                ty: Type::invalid(),
                scope: base.scope,
                invalid: true,
                title: String::new(),
            };
        }

        let element = base.ty.clone().to_required();
        let mut attrs = IndexMap::new();
        let mut unresolved = false;

        for path in by {
            let resolved = element
                .attribute(self.domain, path)
                .map(|entry| (entry.ty, entry.title))
                .or_else(|| {
                    base.scope
                        .get(path)
                        .map(|binding| (binding.ty.clone(), titleize(path)))
                });
            match resolved {
                Some((ty, title)) => {
                    attrs.insert(path.clone(), AttrEntry::group_key(title, ty));
                }
                None => unresolved = true,
            }
        }

        if unresolved {
            return Context {
                parent: Some(incoming),
                ty: Type::invalid(),
                scope: base.scope,
                invalid: true,
                title: String::new(),
            };
        }

        let entity_name = base
            .ty
            .entity_name()
            .expect("named record checked above")
            .to_string();
        let members_title = self
            .domain
            .entity(&entity_name)
            .map(|entity| entity.title.clone())
            .unwrap_or_else(|| titleize(&entity_name));
        attrs.insert(
            entity_name,
            AttrEntry::new(members_title, element.to_sequence()),
        );

        Context {
            parent: Some(incoming),
            ty: Type::ad_hoc(attrs).to_sequence(),
            scope: base.scope,
            invalid: base.invalid,
            title: String::new(),
        }
    }

    /// Aggregate lookup, optional embedded navigation for the operand,
    /// sequence check, then the aggregate's own applicability and result
    /// rules.
    fn infer_aggregate(&mut self, name: &str, path: Option<&str>, incoming: CtxId) -> Context {
        let base = self.contexts.get(incoming).clone();

        let invalid_ctx = |title: String| Context {
            parent: Some(incoming),
            ty: Type::invalid(),
            scope: base.scope.clone(),
            invalid: true,
            title,
        };

        let Some(aggregate) = self.domain.aggregate(name) else {
            return invalid_ctx(titleize(name));
        };
        let agg_title = aggregate.title.clone();

        let (operand, title) = match path {
            Some(path) => match self.resolve_navigation(path, &base) {
                Some((resolved, attr_title)) => (
                    base.ty.least_upper_bound(&resolved),
                    format!("{agg_title} {attr_title}"),
                ),
                None => return invalid_ctx(agg_title),
            },
            None => (base.ty.clone(), agg_title.clone()),
        };

        if operand.is_invalid() || !operand.is_sequence() {
            return invalid_ctx(title);
        }

        let Some(result_kind) = aggregate.result_kind(operand.scalar_kind()) else {
            return invalid_ctx(title);
        };

        Context {
            parent: Some(incoming),
            ty: Type::scalar(result_kind),
            scope: base.scope,
            invalid: base.invalid,
            title,
        }
    }
}
