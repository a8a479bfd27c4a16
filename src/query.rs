//! Structured pattern queries
//!
//! Queries are assembled from triple patterns, OPTIONAL groups and filter
//! expressions, and only rendered to SPARQL text when a backend needs it.
//! Every node goes through [`Node::to_n3`], so literal values can never
//! change the shape of the rendered query.

use std::fmt;

use crate::node::{is_blank_id, Node};
use crate::vocab::NIE_URL;

/// Name of the variable identification queries project
pub const RESULT_VAR: &str = "r";

/// A query variable, without the leading `?`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Var(pub String);

impl Var {
    pub fn new(name: impl Into<String>) -> Self {
        Var(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "?{}", self.0)
    }
}

/// One position of a triple pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternTerm {
    Var(Var),
    Node(Node),
}

impl PatternTerm {
    pub fn var(name: impl Into<String>) -> Self {
        PatternTerm::Var(Var::new(name))
    }

    pub fn uri(uri: impl Into<String>) -> Self {
        PatternTerm::Node(Node::Uri(uri.into()))
    }
}

impl fmt::Display for PatternTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatternTerm::Var(v) => v.fmt(f),
            PatternTerm::Node(n) => n.fmt(f),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriplePattern {
    pub subject: PatternTerm,
    pub predicate: PatternTerm,
    pub object: PatternTerm,
}

impl TriplePattern {
    pub fn new(subject: PatternTerm, predicate: PatternTerm, object: PatternTerm) -> Self {
        Self {
            subject,
            predicate,
            object,
        }
    }
}

impl fmt::Display for TriplePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {} .", self.subject, self.predicate, self.object)
    }
}

/// Filter expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Bound(Var),
    SameTerm(Var, Node),
    In(Var, Vec<Node>),
    Or(Vec<Expr>),
    And(Vec<Expr>),
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Bound(v) => write!(f, "bound({})", v),
            Expr::SameTerm(v, n) => write!(f, "sameTerm({}, {})", v, n),
            Expr::In(v, nodes) => {
                let list: Vec<String> = nodes.iter().map(Node::to_n3).collect();
                write!(f, "{} IN ({})", v, list.join(", "))
            }
            Expr::Or(exprs) => write_joined(f, exprs, " || ", "false"),
            Expr::And(exprs) => write_joined(f, exprs, " && ", "true"),
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, exprs: &[Expr], sep: &str, empty: &str) -> fmt::Result {
    if exprs.is_empty() {
        return f.write_str(empty);
    }
    let parts: Vec<String> = exprs.iter().map(|e| format!("({})", e)).collect();
    f.write_str(&parts.join(sep))
}

/// A `{ ... }` group: required triples, OPTIONAL sub-groups and filters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupPattern {
    pub triples: Vec<TriplePattern>,
    pub optionals: Vec<GroupPattern>,
    pub filters: Vec<Expr>,
}

impl GroupPattern {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn triple(mut self, pattern: TriplePattern) -> Self {
        self.triples.push(pattern);
        self
    }

    pub fn optional(mut self, group: GroupPattern) -> Self {
        self.optionals.push(group);
        self
    }

    pub fn filter(mut self, expr: Expr) -> Self {
        self.filters.push(expr);
        self
    }
}

impl fmt::Display for GroupPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{ ")?;
        for t in &self.triples {
            write!(f, "{} ", t)?;
        }
        for o in &self.optionals {
            write!(f, "OPTIONAL {} ", o)?;
        }
        for e in &self.filters {
            write!(f, "FILTER({}) ", e)?;
        }
        f.write_str("}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub var: Var,
    pub order: Order,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectQuery {
    pub distinct: bool,
    pub projection: Vec<Var>,
    pub pattern: GroupPattern,
    pub order_by: Option<OrderBy>,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    Ask(GroupPattern),
    Select(SelectQuery),
}

impl Query {
    /// `ASK { <uri> ?p ?o }`
    ///
    /// A blank node in a pattern is a variable, so a temporary `_:` id
    /// would ask whether the store holds any statement at all. Temporary
    /// ids are never stored and get `ASK { FILTER(false) }` instead.
    pub fn exists(uri: &str) -> Self {
        if is_blank_id(uri) {
            return Query::Ask(GroupPattern::new().filter(Expr::Or(Vec::new())));
        }
        Query::Ask(GroupPattern::new().triple(TriplePattern::new(
            PatternTerm::uri(uri),
            PatternTerm::var("p"),
            PatternTerm::var("o"),
        )))
    }

    /// `SELECT ?r WHERE { ?r <predicate> object }`
    pub fn by_property(predicate: &str, object: &Node) -> Self {
        Query::Select(SelectQuery {
            distinct: true,
            projection: vec![Var::new(RESULT_VAR)],
            pattern: GroupPattern::new().triple(TriplePattern::new(
                PatternTerm::var(RESULT_VAR),
                PatternTerm::uri(predicate),
                PatternTerm::Node(object.clone()),
            )),
            order_by: None,
            limit: None,
        })
    }

    /// `SELECT ?r WHERE { ?r nie:url <url> }`
    pub fn by_nie_url(url: &str) -> Self {
        Query::by_property(NIE_URL, &Node::uri(url))
    }

    /// Query for every resource sharing at least one of `pairs`
    ///
    /// Each (predicate, object) pair becomes an OPTIONAL group binding a
    /// fresh variable when `?r` has that exact value. A final filter keeps
    /// only the solutions where at least one of those variables is bound.
    pub fn identification<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a Node)>) -> Self {
        let r = PatternTerm::var(RESULT_VAR);
        let mut pattern = GroupPattern::new().triple(TriplePattern::new(
            r.clone(),
            PatternTerm::var("p"),
            PatternTerm::var("o"),
        ));

        let mut bound = Vec::new();
        for (i, (predicate, object)) in pairs.into_iter().enumerate() {
            let var = Var::new(format!("v{}", i));
            pattern = pattern.optional(
                GroupPattern::new()
                    .triple(TriplePattern::new(
                        r.clone(),
                        PatternTerm::uri(predicate),
                        PatternTerm::Var(var.clone()),
                    ))
                    .filter(Expr::SameTerm(var.clone(), object.clone())),
            );
            bound.push(Expr::Bound(var));
        }

        Query::Select(SelectQuery {
            distinct: true,
            projection: vec![Var::new(RESULT_VAR)],
            pattern: pattern.filter(Expr::Or(bound)),
            order_by: None,
            limit: None,
        })
    }

    pub fn is_ask(&self) -> bool {
        matches!(self, Query::Ask(_))
    }

    /// Render as SPARQL text
    pub fn to_sparql(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Query::Ask(pattern) => write!(f, "ASK {}", pattern),
            Query::Select(q) => {
                f.write_str("SELECT ")?;
                if q.distinct {
                    f.write_str("DISTINCT ")?;
                }
                if q.projection.is_empty() {
                    f.write_str("* ")?;
                }
                for v in &q.projection {
                    write!(f, "{} ", v)?;
                }
                write!(f, "WHERE {}", q.pattern)?;
                if let Some(order) = &q.order_by {
                    match order.order {
                        Order::Asc => write!(f, " ORDER BY ASC({})", order.var)?,
                        Order::Desc => write!(f, " ORDER BY DESC({})", order.var)?,
                    }
                }
                if let Some(limit) = q.limit {
                    write!(f, " LIMIT {}", limit)?;
                }
                Ok(())
            }
        }
    }
}
