use super::ir::{Builder, NodeId};
use super::location::{Location, Step};

#[test]
fn resolves_atoms_in_a_pipeline() {
    let mut b = Builder::new();
    let study = b.navigate("study");
    let code = b.navigate("code");
    let code_id = code.id;
    let pipe = b.pipeline(vec![study, code]);

    let loc = Location::new(pipe, code_id);
    assert_eq!(loc.path().unwrap(), vec![Step::Atom(1)]);
    assert_eq!(loc.node().unwrap().id, code_id);
}

#[test]
fn resolves_into_select_fields_and_bindings() {
    let mut b = Builder::new();
    let bound_nav = b.navigate("code");
    let bound_nav_id = bound_nav.id;
    let bound = b.pipeline(vec![bound_nav]);
    let define = b.define("mycode", bound);
    let study = b.navigate("study");
    let select = b.select_attrs(&["name"]);
    let field_id = match &select.kind {
        super::ir::QueryKind::Select { fields, .. } => fields["name"].id,
        _ => unreachable!(),
    };
    let pipe = b.pipeline(vec![study, define, select]);

    let loc = Location::new(pipe.clone(), bound_nav_id);
    assert_eq!(
        loc.path().unwrap(),
        vec![Step::Atom(1), Step::Binding, Step::Atom(0)]
    );

    let loc = Location::new(pipe, field_id);
    assert_eq!(
        loc.path().unwrap(),
        vec![Step::Atom(2), Step::Field("name".to_string())]
    );
}

#[test]
fn root_location_resolves_to_empty_path() {
    let mut b = Builder::new();
    let study = b.navigate("study");
    let pipe = b.pipeline(vec![study]);
    let loc = Location::of_root(pipe.clone());
    assert_eq!(loc.path().unwrap(), Vec::<Step>::new());
    assert_eq!(loc.node().unwrap().id, pipe.id);
}

#[test]
fn stale_id_resolves_to_none() {
    let mut b = Builder::new();
    let study = b.navigate("study");
    let pipe = b.pipeline(vec![study]);

    let loc = Location::new(pipe, NodeId::from_raw(999));
    assert!(loc.path().is_none());
    assert!(loc.node().is_none());
}

#[test]
fn rebase_retargets_by_id_not_identity() {
    let mut b = Builder::new();
    let study = b.navigate("study");
    let code = b.navigate("code");
    let code_id = code.id;
    let pipe = b.pipeline(vec![study, code]);

    // A structurally-similar tree with the same ids (e.g. after an edit
    // round-trip through serialization).
    let rebuilt = super::ir::Query::from_json(&pipe.to_json()).unwrap();

    let loc = Location::new(pipe, code_id);
    let rebased = loc.rebase(rebuilt);
    assert_eq!(rebased.node().unwrap().id, code_id);
    assert_eq!(rebased.path().unwrap(), vec![Step::Atom(1)]);
}
