//! Lowering: typed query IR → nested wire expression.
//!
//! The wire form is a nested JSON array expression: `["navigate", path]`,
//! `[".", left, right]` for composition, `[op, operands...]` for predicate
//! operators, `["select", base, ["=>", field, expr]...]`, and so on. The
//! translation preserves semantics exactly, including capture avoidance:
//! a navigation to a scope-bound name is rewritten to the internal
//! regularized `<name>__regular` so it cannot collide with the
//! user-visible binding that `define` re-exposes.
//!
//! Translation is total over non-invalid queries; translating an invalid
//! query is a caller error ([`Error::InvalidQuery`]); check
//! [`Typed::is_invalid`] first.

#[cfg(test)]
mod lower_tests;

use std::collections::HashSet;

use serde_json::{Value, json};

use crate::infer::Typed;
use crate::ir::{Expr, ExprKind, Literal, Query, QueryKind};
use crate::{Error, Result};

/// The wire expression handed to the transport collaborator.
pub type WireExpr = Value;

/// Explicit lowering policy.
///
/// The row cap that bounds preview cost is injected here rather than
/// hidden in the lowering logic: when set, a trailing select over a bare
/// navigation chain is wrapped in a `limit` combinator.
#[derive(Clone, Debug, Default)]
pub struct TranslateOptions {
    preview_cap: Option<u64>,
}

impl TranslateOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cap preview row counts at `cap`.
    pub fn preview_cap(mut self, cap: u64) -> Self {
        self.preview_cap = Some(cap);
        self
    }
}

/// Lower a type-checked query to its wire expression.
pub fn translate(typed: &Typed, options: &TranslateOptions) -> Result<WireExpr> {
    if typed.is_invalid() {
        return Err(Error::InvalidQuery);
    }

    let root = &typed.query;
    let atoms: &[Query] = match root.as_pipeline() {
        Some(atoms) => atoms,
        None => std::slice::from_ref(root),
    };

    let mut bound = HashSet::new();
    let expr = lower_atoms(atoms, None, &mut bound).ok_or(Error::EmptyQuery)?;

    if let Some(cap) = options.preview_cap
        && is_bare_preview(atoms)
    {
        return Ok(json!(["limit", expr, cap]));
    }
    Ok(expr)
}

/// A bare preview: navigations only, then one trailing select.
fn is_bare_preview(atoms: &[Query]) -> bool {
    match atoms.split_last() {
        Some((last, rest)) => {
            last.is_select() && !rest.is_empty() && rest.iter().all(Query::is_navigate)
        }
        None => false,
    }
}

fn lower_atoms(atoms: &[Query], base: Option<Value>, bound: &mut HashSet<String>) -> Option<Value> {
    let mut acc = base;
    for atom in atoms {
        acc = lower_atom(atom, acc, bound);
    }
    acc
}

fn lower_atom(atom: &Query, base: Option<Value>, bound: &mut HashSet<String>) -> Option<Value> {
    match &atom.kind {
        QueryKind::Identity => base,
        QueryKind::Navigate { path, regular } => {
            Some(compose(base, navigate_expr(path, *regular, bound)))
        }
        QueryKind::Select { fields, .. } => Some(select_expr(fields, or_null(base))),
        QueryKind::Define { name, pipeline } => {
            let expr = define_expr(name, pipeline, or_null(base), bound);
            bound.insert(name.clone());
            Some(expr)
        }
        QueryKind::Filter { predicate } => match predicate {
            // An unset predicate passes the base through untouched, so a
            // half-built filter never corrupts the wire expression.
            None => base,
            Some(pred) => Some(json!(["filter", or_null(base), lower_expr(pred, bound)])),
        },
        QueryKind::Limit { count } => Some(json!(["limit", or_null(base), count])),
        QueryKind::Group { by } => {
            let paths: Vec<Value> = by.iter().map(|path| json!(["navigate", path])).collect();
            Some(json!(["group", or_null(base), paths]))
        }
        QueryKind::Aggregate { name, path } => {
            let operand = match path {
                Some(path) => compose(base, json!(["navigate", path])),
                None => or_null(base),
            };
            Some(json!([name, operand]))
        }
        QueryKind::Pipeline { .. } => {
            unreachable!("pipeline atoms are flattened by construction")
        }
    }
}

fn navigate_expr(path: &str, regular: bool, bound: &HashSet<String>) -> Value {
    if regular || bound.contains(path) {
        json!(["navigate", format!("{path}{REGULAR_SUFFIX}")])
    } else {
        json!(["navigate", path])
    }
}

const REGULAR_SUFFIX: &str = "__regular";

fn select_expr(fields: &indexmap::IndexMap<String, Query>, base: Value) -> Value {
    let mut parts = vec![json!("select"), base];
    for (name, field) in fields {
        // Fields run under a fresh scope; no outer bindings leak in.
        let mut field_bound = HashSet::new();
        let atoms = field.as_pipeline().unwrap_or(std::slice::from_ref(field));
        let expr = lower_atoms(atoms, None, &mut field_bound).unwrap_or(Value::Null);
        parts.push(json!(["=>", name, expr]));
    }
    Value::Array(parts)
}

/// `define` lowers to a double binding: the raw pipeline under the
/// regularized name, and a re-exposure under the user-visible name
/// (re-wrapped in the binding's trailing select when it has one). The
/// visible shape thereby matches the internal computation without the two
/// names colliding.
fn define_expr(name: &str, pipeline: &Query, base: Value, bound: &HashSet<String>) -> Value {
    let regular_name = format!("{name}{REGULAR_SUFFIX}");
    let atoms = pipeline
        .as_pipeline()
        .unwrap_or(std::slice::from_ref(pipeline));

    let (trailing_select, inner_atoms) = match atoms.split_last() {
        Some((last, rest)) if last.is_select() && !rest.is_empty() => (Some(last), rest),
        _ => (None, atoms),
    };

    // The binding cannot see itself: lower under the enclosing bound set.
    let mut inner_bound = bound.clone();
    let inner_expr = lower_atoms(inner_atoms, None, &mut inner_bound).unwrap_or(Value::Null);

    let use_base = json!(["navigate", regular_name]);
    let use_expr = match trailing_select {
        Some(select) => {
            let mut select_bound = HashSet::new();
            lower_atom(select, Some(use_base), &mut select_bound).expect("select lowers to a value")
        }
        None => use_base,
    };

    json!([
        "define",
        base,
        ["=>", regular_name, inner_expr],
        ["=>", name, use_expr],
    ])
}

fn lower_expr(expr: &Expr, bound: &HashSet<String>) -> Value {
    match &expr.kind {
        ExprKind::Value { value } => literal_value(value),
        ExprKind::Navigate { path } => navigate_expr(path, false, bound),
        ExprKind::Unary { op, operand } => {
            json!([op.token(), lower_expr(operand, bound)])
        }
        ExprKind::Binary { op, lhs, rhs } => {
            json!([op.token(), lower_expr(lhs, bound), lower_expr(rhs, bound)])
        }
        ExprKind::LogicalBinary { op, operands } => {
            let mut parts = vec![json!(op.token())];
            parts.extend(operands.iter().map(|operand| lower_expr(operand, bound)));
            Value::Array(parts)
        }
    }
}

fn literal_value(literal: &Literal) -> Value {
    match literal {
        Literal::Boolean(b) => json!(b),
        // Whole numbers go out as integers; the wire format has no
        // trailing-zero float spelling.
        Literal::Number(n) if n.fract() == 0.0 && n.abs() < i64::MAX as f64 => {
            json!(*n as i64)
        }
        Literal::Number(n) => json!(n),
        Literal::Text(s) => json!(s),
    }
}

fn compose(base: Option<Value>, expr: Value) -> Value {
    match base {
        Some(base) => json!([".", base, expr]),
        None => expr,
    }
}

fn or_null(base: Option<Value>) -> Value {
    base.unwrap_or(Value::Null)
}
