#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Core schema structures for Trellis.
//!
//! Two layers:
//! - **Deserialization layer**: 1:1 mapping to the remote schema catalog
//! - **Analysis layer**: an immutable [`Domain`] with resolved attribute
//!   kinds and aggregate behaviour, built once per session
//!
//! Lookups on the analysis layer never fail: an unknown entity, attribute
//! or aggregate resolves to `None` (or an empty map) so that callers can
//! degrade to a "not found" result instead of aborting.

use indexmap::IndexMap;

pub mod utils;


// ============================================================================
// Common Types
// ============================================================================

/// How many values a slot holds: exactly one, at most one, or any number.
///
/// The variants are ordered so that `max` is the least-upper-bound join:
/// `Required < Optional < Sequence`.
#[derive(
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Debug,
    Default,
    serde::Serialize,
    serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Cardinality {
    #[default]
    Required,
    Optional,
    Sequence,
}

impl Cardinality {
    /// Least-upper-bound join. Monotonic: `Sequence` dominates `Optional`
    /// dominates `Required`.
    pub fn join(self, other: Self) -> Self {
        self.max(other)
    }
}

/// Scalar value kinds an attribute or literal can carry.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalarKind {
    Number,
    Boolean,
    Text,
    /// Opaque structured payload (stored and displayed, never navigated).
    Blob,
    Enumeration,
    Date,
    Time,
    DateTime,
}

impl ScalarKind {
    /// Whether values of this kind have a total order usable by min/max.
    pub fn is_ordered(self) -> bool {
        matches!(
            self,
            Self::Number | Self::Text | Self::Date | Self::Time | Self::DateTime
        )
    }
}

// ============================================================================
// Deserialization Layer
// ============================================================================

/// Raw schema catalog as served by the remote catalog endpoint.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub entities: IndexMap<String, CatalogEntity>,
    #[serde(default)]
    pub aggregates: Vec<CatalogAggregate>,
}

/// Raw entity definition.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct CatalogEntity {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub attributes: IndexMap<String, CatalogAttribute>,
}

/// Raw attribute definition.
///
/// Exactly one of `scalar` / `entity` is expected; `entity` wins when both
/// are present. Attributes with neither (or with a dangling `entity`
/// target) are dropped during [`Domain::build`].
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct CatalogAttribute {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub scalar: Option<ScalarKind>,
    #[serde(default)]
    pub entity: Option<String>,
    #[serde(default)]
    pub cardinality: Cardinality,
}

/// Raw aggregate declaration. Behaviour is bound by name from the
/// built-in registry; unknown names are dropped during [`Domain::build`].
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CatalogAggregate {
    pub name: String,
    #[serde(default)]
    pub title: Option<String>,
}

/// Error while decoding a catalog.
#[derive(Debug)]
pub enum CatalogError {
    Json(serde_json::Error),
    Binary(postcard::Error),
}

impl std::fmt::Display for CatalogError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Json(e) => write!(f, "JSON parse error: {e}"),
            Self::Binary(e) => write!(f, "binary decode error: {e}"),
        }
    }
}

impl std::error::Error for CatalogError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Json(e) => Some(e),
            Self::Binary(e) => Some(e),
        }
    }
}

impl Catalog {
    /// Parse a catalog from its JSON wire form.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        serde_json::from_str(json).map_err(CatalogError::Json)
    }

    /// Deserialize a catalog from the compact binary form.
    pub fn from_binary(bytes: &[u8]) -> Result<Self, CatalogError> {
        postcard::from_bytes(bytes).map_err(CatalogError::Binary)
    }

    /// Serialize a catalog to the compact binary form.
    pub fn to_binary(&self) -> Vec<u8> {
        postcard::to_allocvec(self).expect("serialization should not fail")
    }
}

// ============================================================================
// Analysis Layer
// ============================================================================

/// What navigating to an attribute yields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeKind {
    Scalar(ScalarKind),
    /// Link to another entity in the same domain.
    Relation { entity: String },
}

/// Resolved attribute of an entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub title: String,
    pub kind: AttributeKind,
    pub cardinality: Cardinality,
}

/// Resolved entity: a named record shape with its attribute map in
/// catalog declaration order.
#[derive(Debug, Clone)]
pub struct Entity {
    pub title: String,
    pub attributes: IndexMap<String, Attribute>,
}

impl Entity {
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.get(name)
    }
}

/// Built-in aggregate behaviours, keyed by catalog aggregate name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateBehavior {
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

impl AggregateBehavior {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "count" => Some(Self::Count),
            "sum" => Some(Self::Sum),
            "avg" => Some(Self::Avg),
            "min" => Some(Self::Min),
            "max" => Some(Self::Max),
            _ => None,
        }
    }
}

/// An aggregate function available in a domain.
///
/// `operand` is the scalar kind of the aggregated sequence's items, or
/// `None` when the items are not scalar (records, blobs of structure).
/// Only `count` accepts non-scalar operands.
#[derive(Debug, Clone)]
pub struct Aggregate {
    pub title: String,
    behavior: AggregateBehavior,
}

impl Aggregate {
    /// Applicability predicate: can this aggregate consume a sequence of
    /// the given item kind?
    pub fn applies_to(&self, operand: Option<ScalarKind>) -> bool {
        self.result_kind(operand).is_some()
    }

    /// Result-type function: the scalar kind produced for an accepted
    /// operand, or `None` when the aggregate does not apply.
    pub fn result_kind(&self, operand: Option<ScalarKind>) -> Option<ScalarKind> {
        match self.behavior {
            AggregateBehavior::Count => Some(ScalarKind::Number),
            AggregateBehavior::Sum | AggregateBehavior::Avg => match operand {
                Some(ScalarKind::Number) => Some(ScalarKind::Number),
                _ => None,
            },
            AggregateBehavior::Min | AggregateBehavior::Max => {
                operand.filter(|kind| kind.is_ordered())
            }
        }
    }
}

/// Immutable schema: the root of type inference.
///
/// Built once per session from a [`Catalog`]; read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct Domain {
    entities: IndexMap<String, Entity>,
    aggregates: IndexMap<String, Aggregate>,
}

impl Domain {
    /// Build the analysis layer from a raw catalog.
    ///
    /// Attributes that resolve to nothing (no scalar kind, or a relation
    /// to an entity the catalog does not declare) are dropped, as are
    /// aggregates with no built-in behaviour. Navigation to a dropped
    /// name later infers as "not found" rather than failing here.
    pub fn build(catalog: &Catalog) -> Self {
        let mut entities = IndexMap::new();

        for (entity_name, raw_entity) in &catalog.entities {
            let mut attributes = IndexMap::new();
            for (attr_name, raw_attr) in &raw_entity.attributes {
                let kind = match &raw_attr.entity {
                    Some(target) if catalog.entities.contains_key(target) => {
                        AttributeKind::Relation {
                            entity: target.clone(),
                        }
                    }
                    Some(_) => continue,
                    None => match raw_attr.scalar {
                        Some(scalar) => AttributeKind::Scalar(scalar),
                        None => continue,
                    },
                };

                attributes.insert(
                    attr_name.clone(),
                    Attribute {
                        title: display_title(raw_attr.title.as_deref(), attr_name),
                        kind,
                        cardinality: raw_attr.cardinality,
                    },
                );
            }

            entities.insert(
                entity_name.clone(),
                Entity {
                    title: display_title(raw_entity.title.as_deref(), entity_name),
                    attributes,
                },
            );
        }

        let mut aggregates = IndexMap::new();
        for raw_agg in &catalog.aggregates {
            let Some(behavior) = AggregateBehavior::from_name(&raw_agg.name) else {
                continue;
            };
            aggregates.insert(
                raw_agg.name.clone(),
                Aggregate {
                    title: display_title(raw_agg.title.as_deref(), &raw_agg.name),
                    behavior,
                },
            );
        }

        Self {
            entities,
            aggregates,
        }
    }

    pub fn entity(&self, name: &str) -> Option<&Entity> {
        self.entities.get(name)
    }

    pub fn aggregate(&self, name: &str) -> Option<&Aggregate> {
        self.aggregates.get(name)
    }

    pub fn entities(&self) -> impl Iterator<Item = (&str, &Entity)> {
        self.entities.iter().map(|(name, e)| (name.as_str(), e))
    }

    pub fn aggregates(&self) -> impl Iterator<Item = (&str, &Aggregate)> {
        self.aggregates.iter().map(|(name, a)| (name.as_str(), a))
    }
}

fn display_title(explicit: Option<&str>, name: &str) -> String {
    match explicit {
        Some(title) if !title.is_empty() => title.to_string(),
        _ => utils::titleize(name),
    }
}
