//! Inference rules for filter-predicate expressions.
//!
//! Mirrors query inference: every context is boolean-typed except values
//! (typed from their literal kind) and navigations (which delegate to the
//! query navigation rule). Operand invalidity propagates.

use crate::ir::{Expr, ExprKind, Literal};
use crate::types::Type;

use super::InferencePass;
use super::context::{Context, CtxId};

impl InferencePass<'_> {
    pub(crate) fn infer_expr(&mut self, expr: &Expr, incoming: CtxId) -> CtxId {
        let ctx = match &expr.kind {
            ExprKind::Value { value } => self.infer_value(value, incoming),
            ExprKind::Navigate { path } => self.infer_expr_navigate(path, incoming),
            ExprKind::Unary { operand, .. } => self.infer_boolean_op(&[operand.as_ref()], incoming),
            ExprKind::Binary { lhs, rhs, .. } => self.infer_comparison(lhs, rhs, incoming),
            ExprKind::LogicalBinary { operands, .. } => {
                let operands: Vec<&Expr> = operands.iter().collect();
                self.infer_boolean_op(&operands, incoming)
            }
        };
        let id = self.contexts.push(ctx);
        self.contexts.record(expr.id, id);
        id
    }

    fn infer_value(&self, value: &Literal, incoming: CtxId) -> Context {
        let ty = match value {
            Literal::Number(_) => Type::number(),
            Literal::Text(_) => Type::text(),
            Literal::Boolean(_) => Type::boolean(),
        };
        Context {
            parent: Some(incoming),
            ty,
            scope: self.contexts.get(incoming).scope.clone(),
            invalid: false,
            title: String::new(),
        }
    }

    fn infer_expr_navigate(&mut self, path: &str, incoming: CtxId) -> Context {
        let base = self.contexts.get(incoming).clone();
        match self.resolve_navigation(path, &base) {
            Some((resolved, title)) => {
                let ty = base.ty.least_upper_bound(&resolved);
                let invalid = ty.is_invalid();
                Context {
                    parent: Some(incoming),
                    ty,
                    scope: base.scope,
                    invalid,
                    title,
                }
            }
            None => Context {
                parent: Some(incoming),
                ty: Type::invalid(),
                scope: base.scope,
                invalid: true,
                title: String::new(),
            },
        }
    }

    /// Comparisons are boolean regardless of operand kinds; operand
    /// invalidity is what propagates.
    fn infer_comparison(&mut self, lhs: &Expr, rhs: &Expr, incoming: CtxId) -> Context {
        let l = self.infer_expr(lhs, incoming);
        let r = self.infer_expr(rhs, incoming);
        let invalid = self.contexts.get(l).invalid || self.contexts.get(r).invalid;
        self.boolean_result(incoming, invalid)
    }

    /// Logical connectives and negation additionally require boolean
    /// operands.
    fn infer_boolean_op(&mut self, operands: &[&Expr], incoming: CtxId) -> Context {
        let mut invalid = false;
        for operand in operands {
            let id = self.infer_expr(operand, incoming);
            let ctx = self.contexts.get(id);
            invalid |= ctx.invalid || !ctx.ty.is_boolean();
        }
        self.boolean_result(incoming, invalid)
    }

    fn boolean_result(&self, incoming: CtxId, invalid: bool) -> Context {
        Context {
            parent: Some(incoming),
            ty: if invalid {
                Type::invalid()
            } else {
                Type::boolean()
            },
            scope: self.contexts.get(incoming).scope.clone(),
            invalid,
            title: String::new(),
        }
    }
}
