use super::*;
use crate::ir::{BinaryOp, Builder, LogicalOp, UnaryOp};
use crate::test_fixtures::clinical_domain;
use crate::types::Type;

/// Infer a filter predicate inside `study | filter(...)` and return the
/// predicate's context.
fn infer_predicate(pred: crate::ir::Expr, mut b: Builder) -> (Typed, crate::ir::NodeId) {
    let domain = clinical_domain();
    let pred_id = pred.id;
    let study = b.navigate("study");
    let filter = b.filter(pred);
    let pipe = b.pipeline(vec![study, filter]);
    (infer(&domain, &pipe), pred_id)
}

#[test]
fn literals_type_from_their_kind() {
    let mut b = Builder::new();
    let number = b.value(42);
    let text = b.value("hello");
    let flag = b.value(true);
    let lhs = b.binary(BinaryOp::Eq, number, text);
    let pred = b.binary(BinaryOp::Eq, lhs, flag);

    let (typed, _) = infer_predicate(pred, b);
    // Comparisons themselves do not fail on operand kinds; the result is
    // boolean and the pipeline stays valid.
    assert!(!typed.is_invalid());
}

#[test]
fn predicate_navigation_resolves_attributes() {
    let mut b = Builder::new();
    let code = b.nav_expr("code");
    let value = b.value(42);
    let pred = b.binary(BinaryOp::Lt, code, value);

    let code_id = match &pred.kind {
        crate::ir::ExprKind::Binary { lhs, .. } => lhs.id,
        _ => unreachable!(),
    };
    let (typed, pred_id) = infer_predicate(pred, b);

    assert!(!typed.is_invalid());
    let pred_ctx = typed.context(pred_id).unwrap();
    assert_eq!(pred_ctx.ty, Type::boolean());
    // The navigation delegated to query inference: number off the
    // de-cardinalized study element.
    assert_eq!(typed.context(code_id).unwrap().ty, Type::number());
}

#[test]
fn predicate_navigation_to_unknown_attribute_is_invalid() {
    let mut b = Builder::new();
    let bogus = b.nav_expr("bogus");
    let value = b.value(42);
    let pred = b.binary(BinaryOp::Lt, bogus, value);

    let (typed, pred_id) = infer_predicate(pred, b);
    assert!(typed.is_invalid());
    assert!(typed.context(pred_id).unwrap().invalid);
}

#[test]
fn predicates_see_enclosing_bindings() {
    let domain = clinical_domain();
    let mut b = Builder::new();
    let study = b.navigate("study");
    let bound_nav = b.navigate("code");
    let bound = b.pipeline(vec![bound_nav]);
    let define = b.define("mycode", bound);
    let mycode = b.nav_expr("mycode");
    let value = b.value(42);
    let pred = b.binary(BinaryOp::Eq, mycode, value);
    let filter = b.filter(pred);
    let pipe = b.pipeline(vec![study, define, filter]);

    let typed = infer(&domain, &pipe);
    assert!(!typed.is_invalid());
}

#[test]
fn logical_ops_require_boolean_operands() {
    let mut b = Builder::new();
    let lhs = b.value(1);
    let rhs = b.value(2);
    let pred = b.logical(LogicalOp::And, vec![lhs, rhs]);

    let (typed, pred_id) = infer_predicate(pred, b);
    assert!(typed.is_invalid());
    assert!(typed.context(pred_id).unwrap().invalid);
}

#[test]
fn logical_ops_accept_boolean_operands() {
    let mut b = Builder::new();
    let code = b.nav_expr("code");
    let v1 = b.value(1);
    let cmp1 = b.binary(BinaryOp::Gt, code, v1);
    let name = b.nav_expr("name");
    let v2 = b.value("x");
    let cmp2 = b.binary(BinaryOp::Eq, name, v2);
    let pred = b.logical(LogicalOp::Or, vec![cmp1, cmp2]);

    let (typed, pred_id) = infer_predicate(pred, b);
    assert!(!typed.is_invalid());
    assert_eq!(typed.context(pred_id).unwrap().ty, Type::boolean());
}

#[test]
fn not_requires_boolean_operand() {
    let mut b = Builder::new();
    let num = b.value(5);
    let pred = b.unary(UnaryOp::Not, num);
    let (typed, _) = infer_predicate(pred, b);
    assert!(typed.is_invalid());

    let mut b = Builder::new();
    let flag = b.value(true);
    let pred = b.unary(UnaryOp::Not, flag);
    let (typed, _) = infer_predicate(pred, b);
    assert!(!typed.is_invalid());
}

#[test]
fn comparison_propagates_operand_invalidity() {
    let mut b = Builder::new();
    let bogus = b.nav_expr("bogus");
    let other = b.nav_expr("code");
    let pred = b.binary(BinaryOp::Eq, bogus, other);
    let (typed, pred_id) = infer_predicate(pred, b);
    assert!(typed.context(pred_id).unwrap().invalid);
}
