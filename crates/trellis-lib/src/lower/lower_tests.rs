use serde_json::json;

use super::*;
use crate::infer::infer;
use crate::ir::{BinaryOp, Builder};
use crate::test_fixtures::clinical_domain;

fn translated(query: &Query) -> WireExpr {
    let domain = clinical_domain();
    let typed = infer(&domain, query);
    assert!(!typed.is_invalid(), "fixture query must type-check");
    translate(&typed, &TranslateOptions::default()).unwrap()
}

#[test]
fn bare_navigation() {
    let mut b = Builder::new();
    let study = b.navigate("study");
    let pipe = b.pipeline(vec![study]);
    assert_eq!(translated(&pipe), json!(["navigate", "study"]));
}

#[test]
fn navigation_chain_composes() {
    let mut b = Builder::new();
    let study = b.navigate("study");
    let code = b.navigate("code");
    let pipe = b.pipeline(vec![study, code]);
    assert_eq!(
        translated(&pipe),
        json!([".", ["navigate", "study"], ["navigate", "code"]])
    );
}

#[test]
fn filter_with_comparison() {
    let mut b = Builder::new();
    let study = b.navigate("study");
    let code = b.nav_expr("code");
    let value = b.value(42);
    let pred = b.binary(BinaryOp::Lt, code, value);
    let filter = b.filter(pred);
    let pipe = b.pipeline(vec![study, filter]);
    assert_eq!(
        translated(&pipe),
        json!(["filter", ["navigate", "study"], ["<", ["navigate", "code"], 42]])
    );
}

#[test]
fn define_lowers_to_double_binding() {
    let mut b = Builder::new();
    let study = b.navigate("study");
    let code = b.navigate("code");
    let bound = b.pipeline(vec![code]);
    let define = b.define("name", bound);
    let pipe = b.pipeline(vec![study, define]);
    assert_eq!(
        translated(&pipe),
        json!([
            "define",
            ["navigate", "study"],
            ["=>", "name__regular", ["navigate", "code"]],
            ["=>", "name", ["navigate", "name__regular"]],
        ])
    );
}

#[test]
fn navigation_to_binding_is_regularized() {
    let mut b = Builder::new();
    let study = b.navigate("study");
    let code = b.navigate("code");
    let bound = b.pipeline(vec![code]);
    let define = b.define("doubled", bound);
    let use_binding = b.navigate("doubled");
    let pipe = b.pipeline(vec![study, define, use_binding]);

    let wire = translated(&pipe);
    let expected_define = json!([
        "define",
        ["navigate", "study"],
        ["=>", "doubled__regular", ["navigate", "code"]],
        ["=>", "doubled", ["navigate", "doubled__regular"]],
    ]);
    assert_eq!(
        wire,
        json!([".", expected_define, ["navigate", "doubled__regular"]])
    );
}

#[test]
fn define_rewraps_trailing_select() {
    let mut b = Builder::new();
    let study = b.navigate("study");
    let individual = b.navigate("individual");
    let select = b.select_attrs(&["name"]);
    let bound = b.pipeline(vec![individual, select]);
    let define = b.define("people", bound);
    let pipe = b.pipeline(vec![study, define]);

    assert_eq!(
        translated(&pipe),
        json!([
            "define",
            ["navigate", "study"],
            ["=>", "people__regular", ["navigate", "individual"]],
            [
                "=>",
                "people",
                [
                    "select",
                    ["navigate", "people__regular"],
                    ["=>", "name", ["navigate", "name"]],
                ],
            ],
        ])
    );
}

#[test]
fn unset_filter_is_a_pass_through() {
    let mut b = Builder::new();
    let study = b.navigate("study");
    let filter = b.empty_filter();
    let pipe = b.pipeline(vec![study, filter]);
    assert_eq!(translated(&pipe), json!(["navigate", "study"]));
}

#[test]
fn aggregate_without_path() {
    let mut b = Builder::new();
    let study = b.navigate("study");
    let count = b.aggregate("count", None);
    let pipe = b.pipeline(vec![study, count]);
    assert_eq!(translated(&pipe), json!(["count", ["navigate", "study"]]));
}

#[test]
fn aggregate_with_embedded_path_composes_navigation() {
    let mut b = Builder::new();
    let study = b.navigate("study");
    let total = b.aggregate("sum", Some("code".to_string()));
    let pipe = b.pipeline(vec![study, total]);
    assert_eq!(
        translated(&pipe),
        json!(["sum", [".", ["navigate", "study"], ["navigate", "code"]]])
    );
}

#[test]
fn limit_lowers_with_its_count() {
    let mut b = Builder::new();
    let study = b.navigate("study");
    let limit = b.limit(10);
    let pipe = b.pipeline(vec![study, limit]);
    assert_eq!(
        translated(&pipe),
        json!(["limit", ["navigate", "study"], 10])
    );
}

#[test]
fn group_lowers_by_paths() {
    let mut b = Builder::new();
    let individual = b.navigate("individual");
    let group = b.group(vec!["sex".to_string()]);
    let pipe = b.pipeline(vec![individual, group]);
    assert_eq!(
        translated(&pipe),
        json!(["group", ["navigate", "individual"], [["navigate", "sex"]]])
    );
}

#[test]
fn select_lowers_fields_in_order() {
    let mut b = Builder::new();
    let study = b.navigate("study");
    let select = b.select_attrs(&["code", "name"]);
    let pipe = b.pipeline(vec![study, select]);
    assert_eq!(
        translated(&pipe),
        json!([
            "select",
            ["navigate", "study"],
            ["=>", "code", ["navigate", "code"]],
            ["=>", "name", ["navigate", "name"]],
        ])
    );
}

#[test]
fn preview_cap_wraps_bare_navigation_previews() {
    let domain = clinical_domain();
    let mut b = Builder::new();
    let study = b.navigate("study");
    let select = b.select_attrs(&["code"]);
    let pipe = b.pipeline(vec![study, select]);
    let typed = infer(&domain, &pipe);

    let wire = translate(&typed, &TranslateOptions::new().preview_cap(50)).unwrap();
    assert_eq!(
        wire,
        json!([
            "limit",
            [
                "select",
                ["navigate", "study"],
                ["=>", "code", ["navigate", "code"]],
            ],
            50,
        ])
    );
}

#[test]
fn preview_cap_leaves_filtered_queries_alone() {
    let domain = clinical_domain();
    let mut b = Builder::new();
    let study = b.navigate("study");
    let code = b.nav_expr("code");
    let value = b.value(1);
    let pred = b.binary(BinaryOp::Gt, code, value);
    let filter = b.filter(pred);
    let select = b.select_attrs(&["code"]);
    let pipe = b.pipeline(vec![study, filter, select]);
    let typed = infer(&domain, &pipe);

    let capped = translate(&typed, &TranslateOptions::new().preview_cap(50)).unwrap();
    let uncapped = translate(&typed, &TranslateOptions::default()).unwrap();
    assert_eq!(capped, uncapped);
    assert_ne!(capped[0], json!("limit"));
}

#[test]
fn literals_lower_to_native_json() {
    let mut b = Builder::new();
    let study = b.navigate("study");
    let name = b.nav_expr("name");
    let text = b.value("alpha");
    let pred = b.binary(BinaryOp::Eq, name, text);
    let filter = b.filter(pred);
    let pipe = b.pipeline(vec![study, filter]);
    assert_eq!(
        translated(&pipe),
        json!(["filter", ["navigate", "study"], ["=", ["navigate", "name"], "alpha"]])
    );
}

#[test]
fn translating_an_invalid_query_is_refused() {
    let domain = clinical_domain();
    let mut b = Builder::new();
    let bogus = b.navigate("bogus");
    let pipe = b.pipeline(vec![bogus]);
    let typed = infer(&domain, &pipe);
    assert!(matches!(
        translate(&typed, &TranslateOptions::default()),
        Err(Error::InvalidQuery)
    ));
}

#[test]
fn identity_only_pipelines_have_nothing_to_send() {
    let domain = clinical_domain();
    let mut b = Builder::new();
    let identity = b.identity();
    let pipe = b.pipeline(vec![identity]);
    let typed = infer(&domain, &pipe);
    assert!(matches!(
        translate(&typed, &TranslateOptions::default()),
        Err(Error::EmptyQuery)
    ));
}
