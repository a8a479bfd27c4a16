//! The triple store the identifier reads from
//!
//! [`Store`] is the only collaborator interface the engine needs: query
//! execution and pattern-based statement listing. [`MemoryStore`] is an
//! in-memory implementation that evaluates [`Query`] values directly.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;
use std::sync::Arc;

use crate::error::StoreError;
use crate::node::{Node, Statement};
use crate::query::{Expr, GroupPattern, Order, PatternTerm, Query, TriplePattern};

/// One query solution: variable name -> value
pub type Binding = BTreeMap<String, Node>;

/// Result of executing a [`Query`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryResult {
    /// The result of an ASK query
    Boolean(bool),
    /// The result of a SELECT query
    Bindings(Vec<Binding>),
}

impl QueryResult {
    fn kind(&self) -> &'static str {
        match self {
            QueryResult::Boolean(_) => "boolean",
            QueryResult::Bindings(_) => "bindings",
        }
    }

    pub fn into_boolean(self) -> Result<bool, StoreError> {
        match self {
            QueryResult::Boolean(b) => Ok(b),
            other => Err(StoreError::UnexpectedResult {
                expected: "boolean",
                found: other.kind(),
            }),
        }
    }

    pub fn into_bindings(self) -> Result<Vec<Binding>, StoreError> {
        match self {
            QueryResult::Bindings(b) => Ok(b),
            other => Err(StoreError::UnexpectedResult {
                expected: "bindings",
                found: other.kind(),
            }),
        }
    }
}

/// Statement pattern for [`Store::list_statements`]; `None` matches anything
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatementPattern {
    pub subject: Option<String>,
    pub predicate: Option<String>,
    pub object: Option<Node>,
}

impl StatementPattern {
    pub fn new(subject: Option<&str>, predicate: Option<&str>, object: Option<&Node>) -> Self {
        Self {
            subject: subject.map(String::from),
            predicate: predicate.map(String::from),
            object: object.cloned(),
        }
    }

    pub fn matches(&self, st: &Statement) -> bool {
        self.subject.as_ref().map_or(true, |s| *s == st.subject)
            && self.predicate.as_ref().map_or(true, |p| *p == st.predicate)
            && self.object.as_ref().map_or(true, |o| *o == st.object)
    }
}

/// Read access to a persisted graph
pub trait Store {
    /// Execute a structured query
    fn execute_query(&self, query: &Query) -> Result<QueryResult, StoreError>;

    /// All statements matching `pattern`
    fn list_statements(&self, pattern: &StatementPattern) -> Result<Vec<Statement>, StoreError>;
}

impl<S: Store + ?Sized> Store for &S {
    fn execute_query(&self, query: &Query) -> Result<QueryResult, StoreError> {
        (**self).execute_query(query)
    }

    fn list_statements(&self, pattern: &StatementPattern) -> Result<Vec<Statement>, StoreError> {
        (**self).list_statements(pattern)
    }
}

impl<S: Store + ?Sized> Store for Box<S> {
    fn execute_query(&self, query: &Query) -> Result<QueryResult, StoreError> {
        (**self).execute_query(query)
    }

    fn list_statements(&self, pattern: &StatementPattern) -> Result<Vec<Statement>, StoreError> {
        (**self).list_statements(pattern)
    }
}

impl<S: Store + ?Sized> Store for Arc<S> {
    fn execute_query(&self, query: &Query) -> Result<QueryResult, StoreError> {
        (**self).execute_query(query)
    }

    fn list_statements(&self, pattern: &StatementPattern) -> Result<Vec<Statement>, StoreError> {
        (**self).list_statements(pattern)
    }
}

impl<S: Store + ?Sized> Store for Rc<S> {
    fn execute_query(&self, query: &Query) -> Result<QueryResult, StoreError> {
        (**self).execute_query(query)
    }

    fn list_statements(&self, pattern: &StatementPattern) -> Result<Vec<Statement>, StoreError> {
        (**self).list_statements(pattern)
    }
}

/// In-memory statement set, indexed subject -> predicate -> objects
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryStore {
    index: BTreeMap<String, BTreeMap<String, BTreeSet<Node>>>,
    len: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_statements<I: IntoIterator<Item = Statement>>(statements: I) -> Self {
        let mut store = Self::new();
        store.insert_all(statements);
        store
    }

    /// Add a statement. Returns false if it was already stored.
    pub fn insert(&mut self, st: Statement) -> bool {
        let added = self
            .index
            .entry(st.subject)
            .or_default()
            .entry(st.predicate)
            .or_default()
            .insert(st.object);
        if added {
            self.len += 1;
        }
        added
    }

    /// Add statements, returning how many were new
    pub fn insert_all<I: IntoIterator<Item = Statement>>(&mut self, statements: I) -> usize {
        statements.into_iter().filter(|st| self.insert(st.clone())).count()
    }

    pub fn remove(&mut self, st: &Statement) -> bool {
        let Some(predicates) = self.index.get_mut(&st.subject) else {
            return false;
        };
        let Some(objects) = predicates.get_mut(&st.predicate) else {
            return false;
        };
        let removed = objects.remove(&st.object);
        if objects.is_empty() {
            predicates.remove(&st.predicate);
        }
        if predicates.is_empty() {
            self.index.remove(&st.subject);
        }
        if removed {
            self.len -= 1;
        }
        removed
    }

    pub fn contains(&self, st: &Statement) -> bool {
        self.index
            .get(&st.subject)
            .and_then(|predicates| predicates.get(&st.predicate))
            .map(|objects| objects.contains(&st.object))
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Every stored statement, ordered by subject, predicate, object
    pub fn statements(&self) -> Vec<Statement> {
        self.iter_matching(None, None, None).collect()
    }

    pub fn subjects(&self) -> impl Iterator<Item = &str> {
        self.index.keys().map(String::as_str)
    }

    fn iter_matching<'a>(
        &'a self,
        subject: Option<&'a str>,
        predicate: Option<&'a str>,
        object: Option<&'a Node>,
    ) -> impl Iterator<Item = Statement> + 'a {
        let subjects: Box<dyn Iterator<Item = (&String, &BTreeMap<String, BTreeSet<Node>>)> + 'a> =
            match subject {
                Some(s) => Box::new(self.index.get_key_value(s).into_iter()),
                None => Box::new(self.index.iter()),
            };

        subjects.flat_map(move |(s, predicates)| {
            let predicates: Box<dyn Iterator<Item = (&String, &BTreeSet<Node>)> + 'a> =
                match predicate {
                    Some(p) => Box::new(predicates.get_key_value(p).into_iter()),
                    None => Box::new(predicates.iter()),
                };
            predicates.flat_map(move |(p, objects)| {
                objects
                    .iter()
                    .filter(move |o| object.map_or(true, |wanted| wanted == *o))
                    .map(move |o| Statement::new(s.clone(), p.clone(), o.clone()))
            })
        })
    }

    /// Extend `solution` with every way `pattern` matches a stored statement
    fn match_triple(&self, pattern: &TriplePattern, solution: &Binding) -> Vec<Binding> {
        let subject = resolve(&pattern.subject, solution);
        let predicate = resolve(&pattern.predicate, solution);
        let object = resolve(&pattern.object, solution);

        // A bound subject or predicate that cannot name a stored subject/predicate matches nothing
        let subject_id = match &subject {
            Some(node) => match node.resource_id() {
                Some(id) => Some(id),
                None => return Vec::new(),
            },
            None => None,
        };
        let predicate_uri = match &predicate {
            Some(node) => match node.as_uri() {
                Some(uri) => Some(uri.to_string()),
                None => return Vec::new(),
            },
            None => None,
        };

        self.iter_matching(subject_id.as_deref(), predicate_uri.as_deref(), object.as_ref())
            .filter_map(|st| {
                let mut extended = solution.clone();
                bind(&mut extended, &pattern.subject, Node::from_resource_id(&st.subject))?;
                bind(&mut extended, &pattern.predicate, Node::Uri(st.predicate))?;
                bind(&mut extended, &pattern.object, st.object)?;
                Some(extended)
            })
            .collect()
    }

    fn eval_group(&self, group: &GroupPattern, input: Vec<Binding>) -> Vec<Binding> {
        let mut solutions = input;

        for triple in &group.triples {
            solutions = solutions
                .iter()
                .flat_map(|sol| self.match_triple(triple, sol))
                .collect();
        }

        for optional in &group.optionals {
            solutions = solutions
                .into_iter()
                .flat_map(|sol| {
                    let extended = self.eval_group(optional, vec![sol.clone()]);
                    if extended.is_empty() {
                        vec![sol]
                    } else {
                        extended
                    }
                })
                .collect();
        }

        solutions.retain(|sol| group.filters.iter().all(|expr| eval_expr(expr, sol)));
        solutions
    }
}

impl Store for MemoryStore {
    fn execute_query(&self, query: &Query) -> Result<QueryResult, StoreError> {
        match query {
            Query::Ask(pattern) => {
                let solutions = self.eval_group(pattern, vec![Binding::new()]);
                Ok(QueryResult::Boolean(!solutions.is_empty()))
            }
            Query::Select(select) => {
                let mut solutions = self.eval_group(&select.pattern, vec![Binding::new()]);

                if let Some(order_by) = &select.order_by {
                    let var = order_by.var.name();
                    solutions.sort_by(|a, b| {
                        let ord = compare_values(a.get(var), b.get(var));
                        match order_by.order {
                            Order::Asc => ord,
                            Order::Desc => ord.reverse(),
                        }
                    });
                }

                if !select.projection.is_empty() {
                    for sol in solutions.iter_mut() {
                        sol.retain(|name, _| select.projection.iter().any(|v| v.name() == name));
                    }
                }

                if select.distinct {
                    let mut seen = BTreeSet::new();
                    solutions.retain(|sol| seen.insert(sol.clone()));
                }

                if let Some(limit) = select.limit {
                    solutions.truncate(limit);
                }

                Ok(QueryResult::Bindings(solutions))
            }
        }
    }

    fn list_statements(&self, pattern: &StatementPattern) -> Result<Vec<Statement>, StoreError> {
        Ok(self
            .iter_matching(
                pattern.subject.as_deref(),
                pattern.predicate.as_deref(),
                pattern.object.as_ref(),
            )
            .collect())
    }
}

/// Value of a pattern position under `solution`, `None` if it is a free variable
fn resolve(term: &PatternTerm, solution: &Binding) -> Option<Node> {
    match term {
        PatternTerm::Node(node) => Some(node.clone()),
        PatternTerm::Var(var) => solution.get(var.name()).cloned(),
    }
}

/// Bind a variable position to `value`; `None` on a conflicting earlier binding
fn bind(solution: &mut Binding, term: &PatternTerm, value: Node) -> Option<()> {
    if let PatternTerm::Var(var) = term {
        match solution.get(var.name()) {
            Some(existing) if *existing != value => return None,
            Some(_) => {}
            None => {
                solution.insert(var.name().to_string(), value);
            }
        }
    }
    Some(())
}

fn eval_expr(expr: &Expr, solution: &Binding) -> bool {
    match expr {
        Expr::Bound(var) => solution.contains_key(var.name()),
        Expr::SameTerm(var, node) => solution
            .get(var.name())
            .map_or(false, |value| value.same_term(node)),
        Expr::In(var, nodes) => solution
            .get(var.name())
            .map_or(false, |value| nodes.iter().any(|n| n.same_term(value))),
        Expr::Or(exprs) => exprs.iter().any(|e| eval_expr(e, solution)),
        Expr::And(exprs) => exprs.iter().all(|e| eval_expr(e, solution)),
    }
}

/// ORDER BY comparison: unbound first, timestamps chronologically, else node order
fn compare_values(a: Option<&Node>, b: Option<&Node>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => {
            let times = a
                .as_literal()
                .and_then(|l| l.as_timestamp())
                .zip(b.as_literal().and_then(|l| l.as_timestamp()));
            match times {
                Some((ta, tb)) => ta.cmp(&tb),
                None => a.cmp(b),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Literal;
    use crate::query::{OrderBy, SelectQuery, Var};
    use crate::vocab::{NAO_CREATED, XSD_DATE, XSD_STRING};

    const TITLE: &str = "http://example.org/title";
    const AUTHOR: &str = "http://example.org/author";

    fn sample_store() -> MemoryStore {
        MemoryStore::from_statements(vec![
            Statement::new("res:42", TITLE, Node::literal("Report.pdf")),
            Statement::new("res:42", NAO_CREATED, Node::typed_literal("2020-01-01", XSD_DATE)),
            Statement::new("res:43", TITLE, Node::literal("Report.pdf")),
            Statement::new("res:43", NAO_CREATED, Node::typed_literal("2019-06-01", XSD_DATE)),
            Statement::new("res:44", TITLE, Node::literal("Notes.txt")),
            Statement::new("res:44", AUTHOR, Node::uri("res:alice")),
        ])
    }

    fn result_uris(result: QueryResult) -> Vec<String> {
        let mut uris: Vec<String> = result
            .into_bindings()
            .unwrap()
            .into_iter()
            .filter_map(|b| b.get("r").and_then(|n| n.as_uri()).map(String::from))
            .collect();
        uris.sort();
        uris
    }

    #[test]
    fn test_insert_dedups() {
        let mut store = MemoryStore::new();
        let st = Statement::new("res:1", TITLE, Node::literal("a"));
        assert!(store.insert(st.clone()));
        assert!(!store.insert(st.clone()));
        assert_eq!(store.len(), 1);
        assert!(store.contains(&st));

        assert!(store.remove(&st));
        assert!(store.is_empty());
        assert!(!store.remove(&st));
        assert_eq!(store.subjects().count(), 0);
    }

    #[test]
    fn test_ask() {
        let store = sample_store();
        assert!(store.execute_query(&Query::exists("res:42")).unwrap().into_boolean().unwrap());
        assert!(!store.execute_query(&Query::exists("res:99")).unwrap().into_boolean().unwrap());
        assert!(!store.execute_query(&Query::exists("_:b0")).unwrap().into_boolean().unwrap());
    }

    #[test]
    fn test_ask_temporary_id_is_never_stored() {
        let mut store = sample_store();
        store.insert(Statement::new("_:b0", TITLE, Node::literal("Report.pdf")));
        let query = Query::exists("_:b0");
        assert!(!query.to_sparql().contains("_:b0"));
        assert!(!store.execute_query(&query).unwrap().into_boolean().unwrap());
    }

    #[test]
    fn test_result_kind_mismatch() {
        let store = sample_store();
        let result = store.execute_query(&Query::exists("res:42")).unwrap();
        assert!(matches!(
            result.into_bindings(),
            Err(StoreError::UnexpectedResult { expected: "bindings", found: "boolean" })
        ));
    }

    #[test]
    fn test_by_property() {
        let store = sample_store();
        let result = store
            .execute_query(&Query::by_property(AUTHOR, &Node::uri("res:alice")))
            .unwrap();
        assert_eq!(result_uris(result), vec!["res:44"]);
    }

    #[test]
    fn test_identification_query_matches_any_pair() {
        let store = sample_store();
        let title = Node::literal("Report.pdf");
        let author = Node::uri("res:alice");
        let query = Query::identification(vec![(TITLE, &title), (AUTHOR, &author)]);
        let result = store.execute_query(&query).unwrap();
        assert_eq!(result_uris(result), vec!["res:42", "res:43", "res:44"]);
    }

    #[test]
    fn test_identification_query_string_datatype_is_plain() {
        let mut store = MemoryStore::new();
        let typed = Node::Literal(Literal {
            value: "Report.pdf".to_string(),
            datatype: Some(XSD_STRING.to_string()),
            lang: None,
        });
        store.insert(Statement::new("res:7", TITLE, typed));

        let title = Node::literal("Report.pdf");
        let query = Query::identification(vec![(TITLE, &title)]);
        let result = store.execute_query(&query).unwrap();
        assert_eq!(result_uris(result), vec!["res:7"]);
    }

    #[test]
    fn test_identification_query_no_match() {
        let store = sample_store();
        let title = Node::literal("Missing.pdf");
        let query = Query::identification(vec![(TITLE, &title)]);
        let result = store.execute_query(&query).unwrap();
        assert!(result_uris(result).is_empty());
    }

    #[test]
    fn test_identification_query_without_pairs_matches_nothing() {
        let store = sample_store();
        let query = Query::identification(Vec::new());
        assert!(result_uris(store.execute_query(&query).unwrap()).is_empty());
    }

    #[test]
    fn test_order_by_timestamp_and_limit() {
        let store = sample_store();
        let query = Query::Select(SelectQuery {
            distinct: false,
            projection: vec![Var::new("r")],
            pattern: GroupPattern::new()
                .triple(TriplePattern::new(
                    PatternTerm::var("r"),
                    PatternTerm::uri(NAO_CREATED),
                    PatternTerm::var("date"),
                ))
                .filter(Expr::In(
                    Var::new("r"),
                    vec![Node::uri("res:42"), Node::uri("res:43")],
                )),
            order_by: Some(OrderBy {
                var: Var::new("date"),
                order: Order::Asc,
            }),
            limit: Some(1),
        });
        let result = store.execute_query(&query).unwrap();
        assert_eq!(result_uris(result), vec!["res:43"]);
    }

    #[test]
    fn test_repeated_variable_must_agree() {
        let mut store = sample_store();
        store.insert(Statement::new("res:self", AUTHOR, Node::uri("res:self")));
        let query = Query::Select(SelectQuery {
            distinct: true,
            projection: vec![Var::new("r")],
            pattern: GroupPattern::new().triple(TriplePattern::new(
                PatternTerm::var("r"),
                PatternTerm::uri(AUTHOR),
                PatternTerm::var("r"),
            )),
            order_by: None,
            limit: None,
        });
        let result = store.execute_query(&query).unwrap();
        assert_eq!(result_uris(result), vec!["res:self"]);
    }

    #[test]
    fn test_list_statements() {
        let store = sample_store();
        let created = store
            .list_statements(&StatementPattern::new(Some("res:43"), Some(NAO_CREATED), None))
            .unwrap();
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].object, Node::typed_literal("2019-06-01", XSD_DATE));

        let titled = store
            .list_statements(&StatementPattern::new(
                None,
                Some(TITLE),
                Some(&Node::literal("Report.pdf")),
            ))
            .unwrap();
        assert_eq!(titled.len(), 2);

        let all = store.list_statements(&StatementPattern::default()).unwrap();
        assert_eq!(all.len(), store.len());
        assert!(all.iter().all(|st| StatementPattern::default().matches(st)));
    }

    #[test]
    fn test_store_through_references() {
        let store = Arc::new(sample_store());
        let by_ref: &dyn Store = &store;
        assert!(by_ref
            .execute_query(&Query::exists("res:44"))
            .unwrap()
            .into_boolean()
            .unwrap());
        let boxed: Box<dyn Store> = Box::new(sample_store());
        assert_eq!(
            boxed.list_statements(&StatementPattern::default()).unwrap().len(),
            6
        );
    }
}
