//! Pure constructors with explicit id allocation.
//!
//! A [`Builder`] is the only source of fresh [`NodeId`]s; there is no
//! global counter. When extending an existing tree, seed the builder with
//! [`Builder::above`] so new ids cannot collide with ids already in use.

use indexmap::IndexMap;

use super::{
    BinaryOp, Expr, ExprKind, Literal, LogicalOp, NodeId, Query, QueryKind, SortSpec, UnaryOp,
};

/// Node factory carrying the id counter.
#[derive(Debug, Clone, Default)]
pub struct Builder {
    next: u32,
}

impl Builder {
    pub fn new() -> Self {
        Self::default()
    }

    /// A builder whose ids start past every id in `node`'s tree.
    pub fn above(node: &Query) -> Self {
        Self {
            next: node.max_id() + 1,
        }
    }

    fn fresh(&mut self) -> NodeId {
        let id = NodeId::from_raw(self.next);
        self.next += 1;
        id
    }

    fn atom(&mut self, kind: QueryKind) -> Query {
        Query {
            id: self.fresh(),
            kind,
            saved: None,
        }
    }

    pub fn identity(&mut self) -> Query {
        self.atom(QueryKind::Identity)
    }

    pub fn navigate(&mut self, path: impl Into<String>) -> Query {
        self.atom(QueryKind::Navigate {
            path: path.into(),
            regular: false,
        })
    }

    pub fn select(&mut self, fields: Vec<(String, Query)>) -> Query {
        self.atom(QueryKind::Select {
            fields: fields.into_iter().collect(),
            sort: None,
        })
    }

    pub fn select_sorted(&mut self, fields: Vec<(String, Query)>, sort: SortSpec) -> Query {
        self.atom(QueryKind::Select {
            fields: fields.into_iter().collect(),
            sort: Some(sort),
        })
    }

    pub fn define(&mut self, name: impl Into<String>, pipeline: Query) -> Query {
        self.atom(QueryKind::Define {
            name: name.into(),
            pipeline: Box::new(pipeline),
        })
    }

    pub fn filter(&mut self, predicate: Expr) -> Query {
        self.atom(QueryKind::Filter {
            predicate: Some(predicate),
        })
    }

    /// A filter whose predicate the user has not assembled yet.
    pub fn empty_filter(&mut self) -> Query {
        self.atom(QueryKind::Filter { predicate: None })
    }

    pub fn limit(&mut self, count: u64) -> Query {
        self.atom(QueryKind::Limit { count })
    }

    pub fn group(&mut self, by: Vec<String>) -> Query {
        self.atom(QueryKind::Group { by })
    }

    pub fn aggregate(&mut self, name: impl Into<String>, path: Option<String>) -> Query {
        self.atom(QueryKind::Aggregate {
            name: name.into(),
            path,
        })
    }

    /// Build a pipeline, flattening nested pipeline atoms and normalizing
    /// an empty list to a single identity atom.
    pub fn pipeline(&mut self, atoms: Vec<Query>) -> Query {
        let mut flat = Vec::with_capacity(atoms.len());
        for atom in atoms {
            match atom.kind {
                QueryKind::Pipeline { atoms: inner } => flat.extend(inner),
                _ => flat.push(atom),
            }
        }
        if flat.is_empty() {
            flat.push(self.identity());
        }
        self.atom(QueryKind::Pipeline { atoms: flat })
    }

    /// Convenience: select a list of attributes, one navigation each.
    pub fn select_attrs(&mut self, names: &[&str]) -> Query {
        let fields = names
            .iter()
            .map(|name| {
                let nav = self.navigate(*name);
                let pipe = self.pipeline(vec![nav]);
                (name.to_string(), pipe)
            })
            .collect();
        self.select(fields)
    }

    fn expr(&mut self, kind: ExprKind) -> Expr {
        Expr {
            id: self.fresh(),
            kind,
        }
    }

    pub fn value(&mut self, value: impl Into<Literal>) -> Expr {
        self.expr(ExprKind::Value {
            value: value.into(),
        })
    }

    pub fn nav_expr(&mut self, path: impl Into<String>) -> Expr {
        self.expr(ExprKind::Navigate { path: path.into() })
    }

    pub fn unary(&mut self, op: UnaryOp, operand: Expr) -> Expr {
        self.expr(ExprKind::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    pub fn binary(&mut self, op: BinaryOp, lhs: Expr, rhs: Expr) -> Expr {
        self.expr(ExprKind::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        })
    }

    pub fn logical(&mut self, op: LogicalOp, operands: Vec<Expr>) -> Expr {
        self.expr(ExprKind::LogicalBinary { op, operands })
    }

    /// Select fields as an ordered map, for callers assembling them
    /// incrementally.
    pub fn select_from(&mut self, fields: IndexMap<String, Query>, sort: Option<SortSpec>) -> Query {
        self.atom(QueryKind::Select { fields, sort })
    }
}
