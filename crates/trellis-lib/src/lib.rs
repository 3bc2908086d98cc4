#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Trellis: an incrementally-edited, typed query IR.
//!
//! A query is a pipeline of composable atoms (navigate, select, define,
//! filter, limit, group, aggregate). Every edit produces a fresh tree;
//! [`infer`](infer::infer) re-annotates the tree with an immutable
//! [`Context`](infer::Context) per node, and [`translate`](lower::translate)
//! lowers a type-checked tree into a nested wire expression for the remote
//! execution engine.
//!
//! # Example
//!
//! ```
//! use trellis_core::{Catalog, Domain};
//! use trellis_lib::ir::Builder;
//! use trellis_lib::{infer, lower};
//!
//! let catalog = Catalog::from_json(
//!     r#"{"entities": {"study": {"attributes": {"code": {"scalar": "number"}}}}}"#,
//! )
//! .unwrap();
//! let domain = Domain::build(&catalog);
//!
//! let mut b = Builder::new();
//! let study = b.navigate("study");
//! let query = b.pipeline(vec![study]);
//! let typed = infer::infer(&domain, &query);
//! assert!(!typed.root().invalid);
//!
//! let wire = lower::translate(&typed, &lower::TranslateOptions::default()).unwrap();
//! assert_eq!(wire, serde_json::json!(["navigate", "study"]));
//! ```
//!
//! Semantic problems (unresolvable navigation, a disallowed aggregate)
//! never raise errors: they surface as `invalid`-typed, flagged Contexts.
//! Only structural misuse (a malformed edit path, a pipeline atom that is
//! itself a pipeline) is treated as a programming error and panics.

pub mod edit;
pub mod infer;
pub mod ir;
pub mod location;
pub mod lower;
pub mod types;

#[cfg(test)]
mod test_fixtures;

#[cfg(test)]
mod location_tests;

pub use infer::{Context, Typed, infer};
pub use ir::{Builder, Expr, NodeId, Query};
pub use location::Location;
pub use lower::{TranslateOptions, WireExpr, translate};
pub use types::{Type, TypeKind};

/// Errors surfaced by the fallible library entry points.
///
/// Semantic invalidity is carried in [`Context`]s, not here; this enum
/// covers caller mistakes that the API can refuse cleanly.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// The query carries an invalid flag; check [`Typed::is_invalid`]
    /// before translating.
    #[error("query failed type checking and cannot be translated")]
    InvalidQuery,

    /// The query lowers to no operations at all (a bare identity
    /// pipeline); there is nothing to send to the engine.
    #[error("query has no translatable operations")]
    EmptyQuery,
}

/// Result type for translation.
pub type Result<T> = std::result::Result<T, Error>;
