//! Query IR: tagged-variant atoms with stable node ids.
//!
//! Nodes are immutable; every edit builds a fresh tree and prior trees
//! stay valid (cheap undo). Two invariants hold everywhere:
//!
//! - a pipeline never directly contains another pipeline (constructors
//!   flatten), and
//! - a pipeline is never empty (it normalizes to a single identity atom).
//!
//! Serialization omits inference results entirely: contexts are derived
//! data, recomputed by [`infer`](crate::infer::infer) after loading.

mod build;


use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

pub use build::Builder;

/// Stable node id used for location addressing.
///
/// Ids persist across re-inference and serialization; object identity
/// does not.
#[derive(
    Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize,
)]
pub struct NodeId(u32);

impl NodeId {
    #[inline]
    pub fn as_u32(self) -> u32 {
        self.0
    }

    /// Create a NodeId from a raw index. Use only for deserialization.
    #[inline]
    pub fn from_raw(index: u32) -> Self {
        Self(index)
    }
}

/// One query node: an atom or a pipeline of atoms.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct Query {
    pub id: NodeId,
    #[serde(flatten)]
    pub kind: QueryKind,
    /// A select detached by an edit, kept so a reverting edit can restore
    /// it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved: Option<Box<Query>>,
}

/// The query atom variants.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
#[serde(tag = "atom", rename_all = "snake_case")]
pub enum QueryKind {
    /// Pass-through; the normal form of an empty pipeline.
    Identity,
    Navigate {
        path: String,
        /// Marks a navigation to an internal regularized binding name;
        /// the translator leaves the rewrite in place on round-trips.
        #[serde(default, skip_serializing_if = "is_false")]
        regular: bool,
    },
    Select {
        fields: IndexMap<String, Query>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        sort: Option<SortSpec>,
    },
    Define {
        name: String,
        pipeline: Box<Query>,
    },
    Filter {
        /// `None` while the user is still assembling the predicate.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        predicate: Option<Expr>,
    },
    Limit {
        count: u64,
    },
    Group {
        by: Vec<String>,
    },
    Aggregate {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        path: Option<String>,
    },
    Pipeline {
        atoms: Vec<Query>,
    },
}

fn is_false(b: &bool) -> bool {
    !b
}

/// Sort specification on a select's output.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct SortSpec {
    pub field: String,
    pub direction: SortDirection,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// Expression node used in filter predicates.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct Expr {
    pub id: NodeId,
    #[serde(flatten)]
    pub kind: ExprKind,
}

#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
#[serde(tag = "expr", rename_all = "snake_case")]
pub enum ExprKind {
    Value {
        value: Literal,
    },
    Navigate {
        path: String,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    LogicalBinary {
        op: LogicalOp,
        operands: Vec<Expr>,
    },
}

/// Literal values in predicates.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Literal {
    Boolean(bool),
    Number(f64),
    Text(String),
}

impl From<bool> for Literal {
    fn from(v: bool) -> Self {
        Self::Boolean(v)
    }
}

impl From<f64> for Literal {
    fn from(v: f64) -> Self {
        Self::Number(v)
    }
}

impl From<i32> for Literal {
    fn from(v: i32) -> Self {
        Self::Number(v.into())
    }
}

impl From<&str> for Literal {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnaryOp {
    Not,
}

impl UnaryOp {
    pub fn token(self) -> &'static str {
        match self {
            Self::Not => "!",
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinaryOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Contains,
}

impl BinaryOp {
    pub fn token(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Contains => "contains",
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogicalOp {
    And,
    Or,
}

impl LogicalOp {
    pub fn token(self) -> &'static str {
        match self {
            Self::And => "&",
            Self::Or => "|",
        }
    }
}

impl Query {
    pub fn is_identity(&self) -> bool {
        matches!(self.kind, QueryKind::Identity)
    }

    pub fn is_navigate(&self) -> bool {
        matches!(self.kind, QueryKind::Navigate { .. })
    }

    pub fn is_select(&self) -> bool {
        matches!(self.kind, QueryKind::Select { .. })
    }

    pub fn is_pipeline(&self) -> bool {
        matches!(self.kind, QueryKind::Pipeline { .. })
    }

    /// The atom list, when this node is a pipeline.
    pub fn as_pipeline(&self) -> Option<&[Query]> {
        match &self.kind {
            QueryKind::Pipeline { atoms } => Some(atoms),
            _ => None,
        }
    }

    /// The trailing select atom, when this pipeline ends in one.
    pub fn trailing_select(&self) -> Option<&Query> {
        self.as_pipeline()?.last().filter(|atom| atom.is_select())
    }

    /// Largest node id anywhere in this tree, including expression nodes
    /// and saved selects. Used to seed [`Builder::above`].
    pub fn max_id(&self) -> u32 {
        let mut max = self.id.as_u32();
        let mut bump = |id: u32| max = max.max(id);

        match &self.kind {
            QueryKind::Identity
            | QueryKind::Navigate { .. }
            | QueryKind::Limit { .. }
            | QueryKind::Group { .. }
            | QueryKind::Aggregate { .. } => {}
            QueryKind::Select { fields, .. } => {
                for field in fields.values() {
                    bump(field.max_id());
                }
            }
            QueryKind::Define { pipeline, .. } => bump(pipeline.max_id()),
            QueryKind::Filter { predicate } => {
                if let Some(expr) = predicate {
                    bump(expr.max_id());
                }
            }
            QueryKind::Pipeline { atoms } => {
                for atom in atoms {
                    bump(atom.max_id());
                }
            }
        }

        if let Some(saved) = &self.saved {
            bump(saved.max_id());
        }
        max
    }

    /// Serialize to the persisted JSON layout. Contexts are never
    /// serialized; they are re-derived on load.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).expect("serialization should not fail")
    }

    /// Load a query from its persisted JSON layout.
    ///
    /// The loaded tree is re-normalized (empty pipelines become identity,
    /// nested pipeline atoms are flattened) so that structurally sloppy
    /// input cannot break the pipeline invariants. Type mismatches
    /// against the current domain are not errors here; they surface as
    /// invalid contexts on the next inference run.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let query: Query = serde_json::from_str(json)?;
        Ok(query.normalized())
    }

    /// Re-establish the pipeline invariants on this tree.
    pub fn normalized(self) -> Self {
        let mut b = Builder::above(&self);
        normalize(self, &mut b)
    }
}

fn normalize(query: Query, b: &mut Builder) -> Query {
    let Query { id, kind, saved } = query;
    let kind = match kind {
        QueryKind::Pipeline { atoms } => {
            let mut flat = Vec::with_capacity(atoms.len());
            for atom in atoms {
                let atom = normalize(atom, b);
                match atom.kind {
                    QueryKind::Pipeline { atoms: inner } => flat.extend(inner),
                    _ => flat.push(atom),
                }
            }
            if flat.is_empty() {
                flat.push(b.identity());
            }
            QueryKind::Pipeline { atoms: flat }
        }
        QueryKind::Select { fields, sort } => QueryKind::Select {
            fields: fields
                .into_iter()
                .map(|(name, field)| (name, normalize(field, b)))
                .collect(),
            sort,
        },
        QueryKind::Define { name, pipeline } => QueryKind::Define {
            name,
            pipeline: Box::new(normalize(*pipeline, b)),
        },
        other => other,
    };
    let saved = saved.map(|s| Box::new(normalize(*s, b)));
    Query { id, kind, saved }
}

impl Expr {
    pub fn max_id(&self) -> u32 {
        let mut max = self.id.as_u32();
        match &self.kind {
            ExprKind::Value { .. } | ExprKind::Navigate { .. } => {}
            ExprKind::Unary { operand, .. } => max = max.max(operand.max_id()),
            ExprKind::Binary { lhs, rhs, .. } => {
                max = max.max(lhs.max_id()).max(rhs.max_id());
            }
            ExprKind::LogicalBinary { operands, .. } => {
                for operand in operands {
                    max = max.max(operand.max_id());
                }
            }
        }
        max
    }

    /// First navigation path in pre-order, used for filter display titles.
    pub fn first_navigate_path(&self) -> Option<&str> {
        match &self.kind {
            ExprKind::Navigate { path } => Some(path),
            ExprKind::Value { .. } => None,
            ExprKind::Unary { operand, .. } => operand.first_navigate_path(),
            ExprKind::Binary { lhs, rhs, .. } => lhs
                .first_navigate_path()
                .or_else(|| rhs.first_navigate_path()),
            ExprKind::LogicalBinary { operands, .. } => {
                operands.iter().find_map(|e| e.first_navigate_path())
            }
        }
    }
}
