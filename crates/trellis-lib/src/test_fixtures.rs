//! Shared fixtures for unit tests.

use trellis_core::{Catalog, Domain};

/// A small clinical-research schema: studies containing individuals,
/// with the full built-in aggregate set.
pub(crate) fn clinical_domain() -> Domain {
    let catalog = Catalog::from_json(
        r#"{
            "entities": {
                "study": {
                    "attributes": {
                        "code": {"scalar": "number"},
                        "name": {"scalar": "text"},
                        "started_on": {"scalar": "date"},
                        "individual": {"entity": "individual", "cardinality": "sequence"}
                    }
                },
                "individual": {
                    "title": "Participant",
                    "attributes": {
                        "sex": {"scalar": "enumeration"},
                        "age": {"scalar": "number"},
                        "id": {"scalar": "number"},
                        "name": {"scalar": "text"},
                        "height": {"scalar": "number"},
                        "weight": {"scalar": "number"},
                        "enrolled_on": {"scalar": "date"},
                        "notes": {"scalar": "text", "cardinality": "optional"},
                        "status": {"scalar": "enumeration"},
                        "city": {"scalar": "text"}
                    }
                }
            },
            "aggregates": [
                {"name": "count"},
                {"name": "sum"},
                {"name": "avg"},
                {"name": "min"},
                {"name": "max"}
            ]
        }"#,
    )
    .expect("fixture catalog must parse");
    Domain::build(&catalog)
}
