//! Type and cardinality representation.
//!
//! A [`Type`] is a kind plus a [`Cardinality`]. Two properties shape the
//! whole system:
//!
//! - `Invalid` absorbs through every operation, so inference can flag a
//!   bad step once and let the flag ride along.
//! - Cardinality composition is monotonic: navigating through an optional
//!   or sequence-valued step can never make the result more certain. The
//!   join is [`Cardinality::join`]; [`Type::least_upper_bound`] takes the
//!   right-hand side's shape with the joined cardinality.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use trellis_core::{AttributeKind, Cardinality, Domain, ScalarKind};

/// A value type with its cardinality.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Type {
    kind: TypeKind,
    card: Cardinality,
}

/// The shape of a type.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeKind {
    /// The root of inference; nothing has been navigated yet.
    Void,
    Scalar(ScalarKind),
    Record(RecordShape),
    /// Absorbing error type; see the module docs.
    Invalid,
}

/// Record types are entity-backed (attributes resolved through the
/// domain) or ad-hoc (attributes carried inline, as produced by select
/// and group). Both expose the same attribute map through
/// [`Type::attributes`].
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordShape {
    Entity(String),
    AdHoc(IndexMap<String, AttrEntry>),
}

/// One attribute as seen through the uniform accessor.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct AttrEntry {
    pub title: String,
    pub ty: Type,
    /// Set on grouping keys so reconciliation always keeps them visible.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub group_by: bool,
}

impl AttrEntry {
    pub fn new(title: impl Into<String>, ty: Type) -> Self {
        Self {
            title: title.into(),
            ty,
            group_by: false,
        }
    }

    pub fn group_key(title: impl Into<String>, ty: Type) -> Self {
        Self {
            title: title.into(),
            ty,
            group_by: true,
        }
    }
}

impl Type {
    // Constructors. All start at `Required`; lift with `to_sequence` /
    // `to_optional` as needed.

    pub fn void() -> Self {
        Self {
            kind: TypeKind::Void,
            card: Cardinality::Required,
        }
    }

    pub fn invalid() -> Self {
        Self {
            kind: TypeKind::Invalid,
            card: Cardinality::Required,
        }
    }

    pub fn scalar(kind: ScalarKind) -> Self {
        Self {
            kind: TypeKind::Scalar(kind),
            card: Cardinality::Required,
        }
    }

    pub fn number() -> Self {
        Self::scalar(ScalarKind::Number)
    }

    pub fn boolean() -> Self {
        Self::scalar(ScalarKind::Boolean)
    }

    pub fn text() -> Self {
        Self::scalar(ScalarKind::Text)
    }

    pub fn date() -> Self {
        Self::scalar(ScalarKind::Date)
    }

    /// Entity-backed record.
    pub fn entity(name: impl Into<String>) -> Self {
        Self {
            kind: TypeKind::Record(RecordShape::Entity(name.into())),
            card: Cardinality::Required,
        }
    }

    /// Ad-hoc record with inline attributes.
    pub fn ad_hoc(attributes: IndexMap<String, AttrEntry>) -> Self {
        Self {
            kind: TypeKind::Record(RecordShape::AdHoc(attributes)),
            card: Cardinality::Required,
        }
    }

    pub fn kind(&self) -> &TypeKind {
        &self.kind
    }

    pub fn card(&self) -> Cardinality {
        self.card
    }

    pub fn is_invalid(&self) -> bool {
        matches!(self.kind, TypeKind::Invalid)
    }

    pub fn is_void(&self) -> bool {
        matches!(self.kind, TypeKind::Void)
    }

    pub fn is_record(&self) -> bool {
        matches!(self.kind, TypeKind::Record(_))
    }

    /// Entity-backed records are "named": their shape lives in the domain.
    pub fn is_named_record(&self) -> bool {
        matches!(self.kind, TypeKind::Record(RecordShape::Entity(_)))
    }

    pub fn is_boolean(&self) -> bool {
        matches!(self.kind, TypeKind::Scalar(ScalarKind::Boolean))
    }

    pub fn is_sequence(&self) -> bool {
        self.card == Cardinality::Sequence
    }

    /// The scalar kind, when this is a scalar type.
    pub fn scalar_kind(&self) -> Option<ScalarKind> {
        match self.kind {
            TypeKind::Scalar(kind) => Some(kind),
            _ => None,
        }
    }

    /// The entity name, when this is an entity-backed record.
    pub fn entity_name(&self) -> Option<&str> {
        match &self.kind {
            TypeKind::Record(RecordShape::Entity(name)) => Some(name),
            _ => None,
        }
    }

    // Cardinality transforms. Idempotent; `Invalid` absorbs.

    pub fn to_sequence(self) -> Self {
        self.with_card(Cardinality::Sequence)
    }

    pub fn to_optional(self) -> Self {
        self.with_card(Cardinality::Optional)
    }

    pub fn to_required(self) -> Self {
        self.with_card(Cardinality::Required)
    }

    fn with_card(self, card: Cardinality) -> Self {
        if self.is_invalid() {
            return self;
        }
        Self { card, ..self }
    }

    /// Cardinality-joining combination: the result takes `other`'s shape
    /// and the join of both cardinalities, so navigating through an
    /// optional or sequence-valued step stays optional/sequence.
    /// `Invalid` absorbs from either side.
    pub fn least_upper_bound(&self, other: &Type) -> Type {
        if self.is_invalid() || other.is_invalid() {
            return Type::invalid();
        }
        Type {
            kind: other.kind.clone(),
            card: self.card.join(other.card),
        }
    }

    /// Uniform attribute-map accessor.
    ///
    /// Entity-backed records resolve through the domain; ad-hoc records
    /// carry their own map. Anything unresolvable (a non-record type, an
    /// entity the domain does not know) yields an empty map so callers
    /// degrade to "not found" instead of failing.
    pub fn attributes(&self, domain: &Domain) -> IndexMap<String, AttrEntry> {
        match &self.kind {
            TypeKind::Record(RecordShape::AdHoc(attrs)) => attrs.clone(),
            TypeKind::Record(RecordShape::Entity(name)) => {
                let Some(entity) = domain.entity(name) else {
                    return IndexMap::new();
                };
                entity
                    .attributes
                    .iter()
                    .map(|(attr_name, attr)| {
                        let ty = match &attr.kind {
                            AttributeKind::Scalar(kind) => Type::scalar(*kind),
                            AttributeKind::Relation { entity } => Type::entity(entity.clone()),
                        }
                        .with_card(attr.cardinality);
                        (attr_name.clone(), AttrEntry::new(attr.title.clone(), ty))
                    })
                    .collect()
            }
            _ => IndexMap::new(),
        }
    }

    /// Look up a single attribute through the uniform accessor.
    pub fn attribute(&self, domain: &Domain, name: &str) -> Option<AttrEntry> {
        match &self.kind {
            TypeKind::Record(RecordShape::AdHoc(attrs)) => attrs.get(name).cloned(),
            TypeKind::Record(RecordShape::Entity(entity_name)) => {
                let attr = domain.entity(entity_name)?.attribute(name)?;
                let ty = match &attr.kind {
                    AttributeKind::Scalar(kind) => Type::scalar(*kind),
                    AttributeKind::Relation { entity } => Type::entity(entity.clone()),
                }
                .with_card(attr.cardinality);
                Some(AttrEntry::new(attr.title.clone(), ty))
            }
            _ => None,
        }
    }
}
