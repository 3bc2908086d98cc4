use super::*;
use crate::ir::Builder;
use crate::test_fixtures::clinical_domain;
use crate::types::Type;

#[test]
fn scope_bind_is_persistent() {
    let mut b = Builder::new();
    let nav = b.navigate("study");
    let pipe = b.pipeline(vec![nav]);

    let outer = Scope::new();
    let inner = outer.bind(
        "s",
        Binding {
            pipeline: pipe,
            ty: Type::entity("study").to_sequence(),
        },
    );

    assert!(outer.is_empty());
    assert!(inner.contains("s"));
    assert_eq!(inner.len(), 1);
    assert_eq!(
        inner.get("s").unwrap().ty,
        Type::entity("study").to_sequence()
    );
}

#[test]
fn root_context_is_void_and_scopeless() {
    let root = Context::root();
    assert!(root.ty.is_void());
    assert!(root.scope.is_empty());
    assert!(!root.invalid);
    assert!(root.parent.is_none());
}

#[test]
fn contexts_chain_to_their_parent() {
    let domain = clinical_domain();
    let mut b = Builder::new();
    let study = b.navigate("study");
    let code = b.navigate("code");
    let pipe = b.pipeline(vec![study, code]);

    let typed = infer(&domain, &pipe);
    let atoms = typed.query.as_pipeline().unwrap();

    // The second atom's parent chain reaches the first atom's context.
    let code_ctx = typed.context(atoms[1].id).unwrap();
    let parent = typed.contexts.get(code_ctx.parent.unwrap());
    assert_eq!(parent.ty, typed.context(atoms[0].id).unwrap().ty);
}

#[test]
fn every_node_is_annotated() {
    let domain = clinical_domain();
    let mut b = Builder::new();
    let study = b.navigate("study");
    let select = b.select_attrs(&["code", "name"]);
    let pipe = b.pipeline(vec![study, select]);

    let typed = infer(&domain, &pipe);
    assert!(typed.context(pipe.id).is_some());
    for atom in pipe.as_pipeline().unwrap() {
        assert!(typed.context(atom.id).is_some());
    }
    assert!(!typed.contexts.is_empty());
}
