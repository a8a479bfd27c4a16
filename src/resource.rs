//! In-memory resources built from statement lists
//!
//! A [`SimpleResource`] groups the statements sharing one subject as a
//! predicate -> objects multimap. A [`ResourceHash`] holds one such resource
//! per subject of a larger statement list.

use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::error::IdentifyError;
use crate::node::{Node, Statement};
use crate::vocab::{NFO_FILE_DATA_OBJECT, NFO_FOLDER, NIE_URL, RDF_TYPE};

/// All statements about one subject
///
/// Exactly-equal (predicate, object) pairs are stored once. Equality
/// compares the uri and the set of pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimpleResource {
    uri: String,
    properties: BTreeMap<String, BTreeSet<Node>>,
}

impl SimpleResource {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            properties: BTreeMap::new(),
        }
    }

    /// Build a resource from statements that all share one subject
    ///
    /// Fails on an empty list, and on any statement whose subject differs
    /// from the first one.
    pub fn from_statement_list(statements: &[Statement]) -> Result<Self, IdentifyError> {
        let first = statements.first().ok_or(IdentifyError::EmptyStatementList)?;
        let mut res = SimpleResource::new(first.subject.clone());

        for st in statements {
            if st.subject != res.uri {
                return Err(IdentifyError::SubjectMismatch {
                    expected: res.uri.clone(),
                    found: st.subject.clone(),
                });
            }
            res.insert(st.predicate.clone(), st.object.clone());
        }

        Ok(res)
    }

    /// Expand back into one statement per (predicate, object) pair
    pub fn to_statement_list(&self) -> Vec<Statement> {
        self.pairs()
            .map(|(predicate, object)| Statement::new(self.uri.clone(), predicate, object.clone()))
            .collect()
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn set_uri(&mut self, uri: impl Into<String>) {
        self.uri = uri.into();
    }

    /// Add a (predicate, object) pair. Returns false if it was already present.
    pub fn insert(&mut self, predicate: impl Into<String>, object: Node) -> bool {
        self.properties
            .entry(predicate.into())
            .or_default()
            .insert(object)
    }

    pub fn contains(&self, predicate: &str, object: &Node) -> bool {
        self.properties
            .get(predicate)
            .map(|objects| objects.contains(object))
            .unwrap_or(false)
    }

    /// All object values for a predicate
    pub fn property(&self, predicate: &str) -> Vec<Node> {
        self.properties
            .get(predicate)
            .map(|objects| objects.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Distinct predicates of this resource
    pub fn properties(&self) -> impl Iterator<Item = &str> {
        self.properties.keys().map(String::as_str)
    }

    /// Every (predicate, object) pair
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &Node)> {
        self.properties
            .iter()
            .flat_map(|(p, objects)| objects.iter().map(move |o| (p.as_str(), o)))
    }

    /// Remove every value of a predicate, returning them
    pub fn remove_property(&mut self, predicate: &str) -> Vec<Node> {
        self.properties
            .remove(predicate)
            .map(|objects| objects.into_iter().collect())
            .unwrap_or_default()
    }

    /// Remove every pair whose object refers to the resource `target`
    ///
    /// Returns the number of pairs removed.
    pub fn remove_object(&mut self, target: &str) -> usize {
        let mut removed = 0;
        for objects in self.properties.values_mut() {
            let before = objects.len();
            objects.retain(|o| !o.refers_to(target));
            removed += before - objects.len();
        }
        self.properties.retain(|_, objects| !objects.is_empty());
        removed
    }

    /// Union with the pairs of another resource, keeping this uri
    pub fn unite(&mut self, other: &SimpleResource) {
        for (predicate, object) in other.pairs() {
            self.insert(predicate, object.clone());
        }
    }

    /// Number of (predicate, object) pairs
    pub fn len(&self) -> usize {
        self.properties.values().map(BTreeSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    pub fn has_type(&self, type_uri: &str) -> bool {
        self.properties
            .get(RDF_TYPE)
            .map(|types| types.iter().any(|t| t.as_uri() == Some(type_uri)))
            .unwrap_or(false)
    }

    pub fn is_folder(&self) -> bool {
        self.has_type(NFO_FOLDER)
    }

    pub fn is_file_data_object(&self) -> bool {
        self.has_type(NFO_FILE_DATA_OBJECT)
    }

    /// The resource's nie:url, if it has one
    pub fn nie_url(&self) -> Option<&str> {
        self.properties
            .get(NIE_URL)
            .and_then(|urls| urls.iter().find_map(Node::as_uri))
    }
}

/// Resources keyed by subject
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceHash {
    resources: HashMap<String, SimpleResource>,
}

impl ResourceHash {
    pub fn new() -> Self {
        Self::default()
    }

    /// Group an arbitrary statement list by subject
    pub fn from_statement_list(statements: &[Statement]) -> Self {
        let mut hash = ResourceHash::new();
        for st in statements {
            hash.insert_statement(st);
        }
        hash
    }

    /// Concatenate the statements of every resource
    pub fn to_statement_list(&self) -> Vec<Statement> {
        self.resources
            .values()
            .flat_map(SimpleResource::to_statement_list)
            .collect()
    }

    /// Add a resource, uniting it with an existing one of the same uri
    pub fn insert(&mut self, res: SimpleResource) {
        match self.resources.entry(res.uri().to_string()) {
            Entry::Occupied(mut entry) => entry.get_mut().unite(&res),
            Entry::Vacant(entry) => {
                entry.insert(res);
            }
        }
    }

    /// Add a single statement to its subject's resource
    pub fn insert_statement(&mut self, st: &Statement) {
        self.resources
            .entry(st.subject.clone())
            .or_insert_with(|| SimpleResource::new(st.subject.clone()))
            .insert(st.predicate.clone(), st.object.clone());
    }

    pub fn get(&self, uri: &str) -> Option<&SimpleResource> {
        self.resources.get(uri)
    }

    pub fn get_mut(&mut self, uri: &str) -> Option<&mut SimpleResource> {
        self.resources.get_mut(uri)
    }

    pub fn remove(&mut self, uri: &str) -> Option<SimpleResource> {
        self.resources.remove(uri)
    }

    pub fn contains(&self, uri: &str) -> bool {
        self.resources.contains_key(uri)
    }

    pub fn uris(&self) -> impl Iterator<Item = &str> {
        self.resources.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SimpleResource> {
        self.resources.values()
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Scrub every reference to `target` from all resources
    pub fn remove_object(&mut self, target: &str) -> usize {
        self.resources
            .values_mut()
            .map(|res| res.remove_object(target))
            .sum()
    }
}

impl IntoIterator for ResourceHash {
    type Item = (String, SimpleResource);
    type IntoIter = std::collections::hash_map::IntoIter<String, SimpleResource>;

    fn into_iter(self) -> Self::IntoIter {
        self.resources.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vocab::NAO_CREATED;

    const TITLE: &str = "http://example.org/title";
    const AUTHOR: &str = "http://example.org/author";

    fn st(s: &str, p: &str, o: Node) -> Statement {
        Statement::new(s, p, o)
    }

    #[test]
    fn test_from_statement_list_dedups_pairs() {
        let statements = vec![
            st("tmp:1", TITLE, Node::literal("Report.pdf")),
            st("tmp:1", TITLE, Node::literal("Report.pdf")),
            st("tmp:1", TITLE, Node::literal("Report (final).pdf")),
            st("tmp:1", AUTHOR, Node::uri("res:alice")),
        ];

        let res = SimpleResource::from_statement_list(&statements).unwrap();
        assert_eq!(res.uri(), "tmp:1");
        assert_eq!(res.len(), 3);
        assert_eq!(res.property(TITLE).len(), 2);
        assert_eq!(res.property(AUTHOR), vec![Node::uri("res:alice")]);
        assert!(res.property(NAO_CREATED).is_empty());
    }

    #[test]
    fn test_from_statement_list_empty() {
        let result = SimpleResource::from_statement_list(&[]);
        assert!(matches!(result, Err(IdentifyError::EmptyStatementList)));
    }

    #[test]
    fn test_from_statement_list_subject_mismatch() {
        let statements = vec![
            st("tmp:1", TITLE, Node::literal("a")),
            st("tmp:2", TITLE, Node::literal("b")),
        ];

        match SimpleResource::from_statement_list(&statements) {
            Err(IdentifyError::SubjectMismatch { expected, found }) => {
                assert_eq!(expected, "tmp:1");
                assert_eq!(found, "tmp:2");
            }
            other => panic!("expected subject mismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_round_trip() {
        let mut res = SimpleResource::new("_:b0");
        res.insert(TITLE, Node::literal("Report.pdf"));
        res.insert(AUTHOR, Node::uri("res:alice"));
        res.insert(AUTHOR, Node::blank("b1"));
        res.insert(RDF_TYPE, Node::uri(NFO_FOLDER));

        let statements = res.to_statement_list();
        assert_eq!(statements.len(), 4);
        assert!(statements.iter().all(|s| s.subject == "_:b0"));

        let back = SimpleResource::from_statement_list(&statements).unwrap();
        assert_eq!(back, res);
    }

    #[test]
    fn test_type_predicates() {
        let mut res = SimpleResource::new("res:1");
        assert!(!res.is_folder());
        assert!(!res.is_file_data_object());

        res.insert(RDF_TYPE, Node::uri(NFO_FILE_DATA_OBJECT));
        assert!(res.is_file_data_object());
        assert!(!res.is_folder());

        res.insert(RDF_TYPE, Node::uri(NFO_FOLDER));
        assert!(res.is_folder());
    }

    #[test]
    fn test_nie_url() {
        let mut res = SimpleResource::new("res:1");
        assert_eq!(res.nie_url(), None);
        res.insert(NIE_URL, Node::uri("file:///home/user/Report.pdf"));
        assert_eq!(res.nie_url(), Some("file:///home/user/Report.pdf"));
    }

    #[test]
    fn test_remove_object() {
        let mut res = SimpleResource::new("res:1");
        res.insert(AUTHOR, Node::uri("res:alice"));
        res.insert(AUTHOR, Node::uri("res:bob"));
        res.insert(TITLE, Node::literal("res:alice"));
        res.insert("http://example.org/related", Node::uri("res:alice"));

        let removed = res.remove_object("res:alice");
        assert_eq!(removed, 2);
        assert_eq!(res.property(AUTHOR), vec![Node::uri("res:bob")]);
        // Literals with the same text are not references
        assert_eq!(res.property(TITLE).len(), 1);
        assert!(res.properties().all(|p| p != "http://example.org/related"));
    }

    #[test]
    fn test_remove_blank_object() {
        let mut res = SimpleResource::new("res:1");
        res.insert(AUTHOR, Node::blank("b1"));
        assert_eq!(res.remove_object("_:b1"), 1);
        assert!(res.is_empty());
    }

    #[test]
    fn test_unite() {
        let mut a = SimpleResource::new("res:1");
        a.insert(TITLE, Node::literal("a"));
        let mut b = SimpleResource::new("res:other");
        b.insert(TITLE, Node::literal("a"));
        b.insert(TITLE, Node::literal("b"));

        a.unite(&b);
        assert_eq!(a.uri(), "res:1");
        assert_eq!(a.len(), 2);
    }

    #[test]
    fn test_resource_hash_groups_by_subject() {
        let statements = vec![
            st("tmp:1", TITLE, Node::literal("Report.pdf")),
            st("tmp:2", TITLE, Node::literal("Notes.txt")),
            st("tmp:1", AUTHOR, Node::uri("tmp:2")),
            st("tmp:1", TITLE, Node::literal("Report.pdf")),
        ];

        let hash = ResourceHash::from_statement_list(&statements);
        assert_eq!(hash.len(), 2);
        assert_eq!(hash.get("tmp:1").unwrap().len(), 2);
        assert_eq!(hash.get("tmp:2").unwrap().len(), 1);

        let mut flat = hash.to_statement_list();
        flat.sort();
        let mut expected = statements[..3].to_vec();
        expected.sort();
        assert_eq!(flat, expected);
    }

    #[test]
    fn test_resource_hash_matches_single_subject_build() {
        let statements = vec![
            st("tmp:1", TITLE, Node::literal("Report.pdf")),
            st("_:b1", AUTHOR, Node::blank("b2")),
            st("tmp:1", AUTHOR, Node::blank("b1")),
            st("_:b1", TITLE, Node::literal("Alice")),
        ];
        let hash = ResourceHash::from_statement_list(&statements);
        for uri in ["tmp:1", "_:b1"] {
            let group: Vec<Statement> = statements
                .iter()
                .filter(|s| s.subject == uri)
                .cloned()
                .collect();
            let single = SimpleResource::from_statement_list(&group).unwrap();
            assert_eq!(hash.get(uri), Some(&single));
        }
    }

    #[test]
    fn test_resource_hash_insert_unites() {
        let mut hash = ResourceHash::new();
        let mut a = SimpleResource::new("res:1");
        a.insert(TITLE, Node::literal("a"));
        let mut b = SimpleResource::new("res:1");
        b.insert(AUTHOR, Node::uri("res:alice"));

        hash.insert(a);
        hash.insert(b);
        assert_eq!(hash.len(), 1);
        assert_eq!(hash.get("res:1").unwrap().len(), 2);
    }

    #[test]
    fn test_resource_hash_remove_object() {
        let statements = vec![
            st("tmp:1", AUTHOR, Node::uri("tmp:2")),
            st("tmp:3", AUTHOR, Node::uri("tmp:2")),
            st("tmp:2", TITLE, Node::literal("Alice")),
        ];
        let mut hash = ResourceHash::from_statement_list(&statements);
        assert_eq!(hash.remove_object("tmp:2"), 2);
        assert!(hash.get("tmp:1").unwrap().is_empty());
        assert_eq!(hash.get("tmp:2").unwrap().len(), 1);
    }
}
