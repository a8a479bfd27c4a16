//! Merging incoming statements into a store
//!
//! Runs identification over a batch of statements and rewrites them so
//! they can be written to the store: identified subjects take the uri of
//! the stored resource, new blank resources get a freshly minted uri, and
//! statements the store already holds are dropped.

use std::collections::{BTreeSet, HashMap, HashSet};

use chrono::{SecondsFormat, Utc};
use ulid::Ulid;

use crate::config::{IdentifierConfig, MergeOptions};
use crate::error::IdentifyError;
use crate::identifier::ResourceIdentifier;
use crate::node::{is_blank_id, Node, Statement};
use crate::store::{StatementPattern, Store};
use crate::vocab::{NAO_CREATED, XSD_DATE_TIME};

/// Result of a merge
#[derive(Debug)]
pub struct MergeResult {
    /// Statements to write to the store
    pub statements: Vec<Statement>,
    /// Incoming uri -> stored uri, for every identified resource
    pub mappings: HashMap<String, String>,
    /// Uris of the resources the merge creates
    pub created: Vec<String>,
    pub stats: MergeStats,
}

/// Statistics from a merge
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MergeStats {
    /// Distinct incoming subjects
    pub resources: usize,
    /// Subjects identified with a stored resource
    pub identified: usize,
    /// Subjects that become new resources
    pub created: usize,
    pub statements_added: usize,
    /// Statements dropped as already stored, duplicated or superseded
    pub statements_skipped: usize,
}

pub struct ResourceMerger<'a, S: Store + ?Sized> {
    store: &'a S,
    config: IdentifierConfig,
    options: MergeOptions,
}

impl<'a, S: Store + ?Sized> ResourceMerger<'a, S> {
    pub fn new(store: &'a S, config: IdentifierConfig, options: MergeOptions) -> Self {
        Self {
            store,
            config,
            options,
        }
    }

    /// Identify the resources in `statements` and rewrite them for writing
    ///
    /// Nothing is written; apply [`MergeResult::statements`] to the store.
    pub fn merge(&self, statements: &[Statement]) -> Result<MergeResult, IdentifyError> {
        let mut identifier = ResourceIdentifier::new(self.store, self.config.clone());
        identifier.add_statements(statements);
        identifier.identify_all()?;

        let mappings = identifier.mappings().clone();
        let mut stats = MergeStats::default();

        // Final uri of every incoming subject
        let subjects: BTreeSet<&str> = statements.iter().map(|st| st.subject.as_str()).collect();
        stats.resources = subjects.len();
        let mut uri_map: HashMap<String, String> = HashMap::new();
        let mut created = Vec::new();
        for subject in subjects {
            let target = match mappings.get(subject) {
                Some(existing) => {
                    stats.identified += 1;
                    existing.clone()
                }
                None if is_blank_id(subject) => {
                    let minted = self.mint_uri();
                    created.push(minted.clone());
                    minted
                }
                None => {
                    created.push(subject.to_string());
                    subject.to_string()
                }
            };
            uri_map.insert(subject.to_string(), target);
        }
        stats.created = created.len();

        let mut rewritten = Vec::with_capacity(statements.len());
        for st in statements {
            // The stored creation date stays canonical
            if st.predicate == NAO_CREATED && mappings.contains_key(&st.subject) {
                stats.statements_skipped += 1;
                continue;
            }
            rewritten.push(rewrite_statement(st, &uri_map));
        }

        if self.options.stamp_created {
            let now = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
            let dated: HashSet<&str> = rewritten
                .iter()
                .filter(|st| st.predicate == NAO_CREATED)
                .map(|st| st.subject.as_str())
                .collect();
            let stamps: Vec<Statement> = created
                .iter()
                .filter(|uri| !dated.contains(uri.as_str()))
                .map(|uri| {
                    Statement::new(
                        uri.clone(),
                        NAO_CREATED,
                        Node::typed_literal(now.clone(), XSD_DATE_TIME),
                    )
                })
                .collect();
            rewritten.extend(stamps);
        }

        let mut seen = HashSet::new();
        let mut output = Vec::new();
        for st in rewritten {
            if !seen.insert(st.clone()) || self.is_stored(&st)? {
                stats.statements_skipped += 1;
                continue;
            }
            output.push(st);
        }
        stats.statements_added = output.len();

        log::info!(
            "Merged {} resource(s): {} identified, {} created, {} statement(s) added",
            stats.resources,
            stats.identified,
            stats.created,
            stats.statements_added
        );

        Ok(MergeResult {
            statements: output,
            mappings,
            created,
            stats,
        })
    }

    fn mint_uri(&self) -> String {
        format!("{}{}", self.options.uri_prefix, Ulid::new())
    }

    fn is_stored(&self, st: &Statement) -> Result<bool, IdentifyError> {
        let pattern = StatementPattern::new(
            Some(st.subject.as_str()),
            Some(st.predicate.as_str()),
            Some(&st.object),
        );
        Ok(!self.store.list_statements(&pattern)?.is_empty())
    }
}

/// Rewrite the subject and a resource-valued object through `uri_map`
pub fn rewrite_statement(st: &Statement, uri_map: &HashMap<String, String>) -> Statement {
    let subject = uri_map
        .get(&st.subject)
        .cloned()
        .unwrap_or_else(|| st.subject.clone());
    Statement::new(subject, st.predicate.clone(), rewrite_node(&st.object, uri_map))
}

fn rewrite_node(node: &Node, uri_map: &HashMap<String, String>) -> Node {
    node.resource_id()
        .and_then(|id| uri_map.get(&id))
        .map(|target| Node::from_resource_id(target))
        .unwrap_or_else(|| node.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    const TITLE: &str = "http://example.org/title";
    const AUTHOR: &str = "http://example.org/author";

    fn created(uri: &str, time: &str) -> Statement {
        Statement::new(uri, NAO_CREATED, Node::typed_literal(time, XSD_DATE_TIME))
    }

    fn title(uri: &str, value: &str) -> Statement {
        Statement::new(uri, TITLE, Node::literal(value))
    }

    fn sample_store() -> MemoryStore {
        MemoryStore::from_statements(vec![
            title("res:42", "Report.pdf"),
            created("res:42", "2020-01-01T00:00:00Z"),
        ])
    }

    fn merger(store: &MemoryStore) -> ResourceMerger<'_, MemoryStore> {
        ResourceMerger::new(store, IdentifierConfig::default(), MergeOptions::default())
    }

    #[test]
    fn test_merge_identified_resource() {
        let store = sample_store();
        let result = merger(&store)
            .merge(&[
                title("_:b1", "Report.pdf"),
                Statement::new("_:b1", AUTHOR, Node::literal("Alice")),
                created("_:b1", "2024-05-01T00:00:00Z"),
            ])
            .unwrap();

        assert_eq!(result.mappings.get("_:b1").map(String::as_str), Some("res:42"));
        assert!(result.created.is_empty());
        // Title is already stored, created date of the stored resource wins
        assert_eq!(
            result.statements,
            vec![Statement::new("res:42", AUTHOR, Node::literal("Alice"))]
        );
        assert_eq!(result.stats.identified, 1);
        assert_eq!(result.stats.statements_added, 1);
        assert_eq!(result.stats.statements_skipped, 2);
    }

    #[test]
    fn test_merge_new_blank_resource() {
        let store = sample_store();
        let result = merger(&store)
            .merge(&[
                title("_:b1", "Notes.txt"),
                Statement::new("_:b2", AUTHOR, Node::blank("b1")),
            ])
            .unwrap();

        assert_eq!(result.created.len(), 2);
        assert!(result.created.iter().all(|uri| uri.starts_with("res:")));
        assert!(result
            .statements
            .iter()
            .all(|st| !is_blank_id(&st.subject) && !matches!(st.object, Node::Blank(_))));

        let stamped: Vec<&Statement> = result
            .statements
            .iter()
            .filter(|st| st.predicate == NAO_CREATED)
            .collect();
        assert_eq!(stamped.len(), 2);
        assert!(stamped[0]
            .object
            .as_literal()
            .and_then(|l| l.as_timestamp())
            .is_some());

        // The reference follows the minted uri
        let notes = result
            .statements
            .iter()
            .find(|st| st.predicate == TITLE)
            .map(|st| st.subject.clone())
            .unwrap();
        assert!(result
            .statements
            .iter()
            .any(|st| st.predicate == AUTHOR && st.object == Node::uri(notes.clone())));
    }

    #[test]
    fn test_merge_mints_uri_for_blank_in_non_empty_store() {
        let mut store = sample_store();
        store.insert(title("_:b1", "Leftover"));
        let result = merger(&store).merge(&[title("_:b1", "Notes.txt")]).unwrap();

        assert!(result.mappings.is_empty());
        assert_eq!(result.stats.identified, 0);
        assert_eq!(result.created.len(), 1);
        assert!(result.created[0].starts_with("res:"));
    }

    #[test]
    fn test_merge_keeps_unknown_uri() {
        let store = sample_store();
        let result = merger(&store)
            .merge(&[title("http://example.org/doc", "Draft")])
            .unwrap();
        assert_eq!(result.created, vec!["http://example.org/doc".to_string()]);
        assert_eq!(result.stats.created, 1);
    }

    #[test]
    fn test_merge_without_stamping() {
        let store = sample_store();
        let options = MergeOptions {
            uri_prefix: "urn:x:".to_string(),
            stamp_created: false,
        };
        let result = ResourceMerger::new(&store, IdentifierConfig::default(), options)
            .merge(&[title("_:b1", "Notes.txt")])
            .unwrap();
        assert_eq!(result.statements.len(), 1);
        assert!(result.statements[0].subject.starts_with("urn:x:"));
    }

    #[test]
    fn test_merge_drops_batch_duplicates() {
        let store = MemoryStore::new();
        let options = MergeOptions {
            stamp_created: false,
            ..Default::default()
        };
        let result = ResourceMerger::new(&store, IdentifierConfig::default(), options)
            .merge(&[title("res:1", "a"), title("res:1", "a"), title("res:1", "b")])
            .unwrap();
        assert_eq!(result.statements.len(), 2);
        assert_eq!(result.stats.statements_skipped, 1);
    }

    #[test]
    fn test_merge_applied_twice_adds_nothing() {
        let mut store = sample_store();
        let incoming = vec![
            title("http://example.org/doc", "Draft"),
            Statement::new("http://example.org/doc", AUTHOR, Node::literal("Bob")),
        ];
        let first = merger(&store).merge(&incoming).unwrap();
        store.insert_all(first.statements);

        let second = merger(&store).merge(&incoming).unwrap();
        assert!(second.statements.is_empty());
        assert_eq!(second.stats.identified, 1);
    }

    #[test]
    fn test_rewrite_statement() {
        let mut map = HashMap::new();
        map.insert("_:b1".to_string(), "res:1".to_string());
        map.insert("_:b2".to_string(), "res:2".to_string());
        let st = Statement::new("_:b1", AUTHOR, Node::blank("b2"));
        assert_eq!(
            rewrite_statement(&st, &map),
            Statement::new("res:1", AUTHOR, Node::uri("res:2"))
        );
        let literal = Statement::new("_:b1", TITLE, Node::literal("_:b2"));
        assert_eq!(rewrite_statement(&literal, &map).object, Node::literal("_:b2"));
    }
}
