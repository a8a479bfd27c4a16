//! Resource identification
//!
//! Given resources described by statements with temporary or unknown
//! subjects, [`ResourceIdentifier`] finds the resource already persisted in
//! a [`Store`] that each of them stands for. Identification runs in order:
//!
//! 1. the uri itself is stored: keep it
//! 2. the resource has a nie:url: look it up by location
//! 3. fuzzy match on the identifying (predicate, object) pairs
//! 4. several candidates: the oldest by nao:created wins
//!
//! "No match" is a normal outcome ([`Identification::Unidentified`]); store
//! failures always propagate as errors.

use std::collections::{BTreeSet, HashMap, HashSet};

use chrono::{DateTime, Utc};

use crate::config::{IdentificationMode, IdentifierConfig};
use crate::error::IdentifyError;
use crate::node::{is_blank_id, Node, Statement};
use crate::query::{Query, RESULT_VAR};
use crate::resource::{ResourceHash, SimpleResource};
use crate::store::{StatementPattern, Store};
use crate::vocab::{NAO_CREATED, NIE_URL};

/// Outcome of identifying one resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identification {
    /// No stored resource matches; the resource is new
    Unidentified,
    /// The resource is the stored resource with this uri
    MappedTo(String),
}

impl Identification {
    pub fn mapped_uri(&self) -> Option<&str> {
        match self {
            Identification::MappedTo(uri) => Some(uri),
            Identification::Unidentified => None,
        }
    }

    pub fn is_identified(&self) -> bool {
        matches!(self, Identification::MappedTo(_))
    }
}

/// Matches incoming resources against a store and records the mappings
///
/// The identifier never writes to the store. Applying the mappings is the
/// caller's job, see [`ResourceMerger`](crate::merge::ResourceMerger).
pub struct ResourceIdentifier<'a, S: Store + ?Sized> {
    store: &'a S,
    config: IdentifierConfig,
    resources: ResourceHash,
    /// original uri -> stored uri
    mappings: HashMap<String, String>,
    not_identified: HashSet<String>,
}

impl<'a, S: Store + ?Sized> ResourceIdentifier<'a, S> {
    pub fn new(store: &'a S, config: IdentifierConfig) -> Self {
        Self {
            store,
            config,
            resources: ResourceHash::new(),
            mappings: HashMap::new(),
            not_identified: HashSet::new(),
        }
    }

    pub fn store(&self) -> &'a S {
        self.store
    }

    pub fn config(&self) -> &IdentifierConfig {
        &self.config
    }

    pub fn add_statement(&mut self, st: &Statement) {
        self.resources.insert_statement(st);
        self.mark_unidentified(&st.subject);
    }

    pub fn add_statements(&mut self, statements: &[Statement]) {
        for (_, res) in ResourceHash::from_statement_list(statements) {
            self.add_simple_resource(res);
        }
    }

    /// Add a resource, uniting it with an already added one of the same uri
    pub fn add_simple_resource(&mut self, res: SimpleResource) {
        let uri = res.uri().to_string();
        self.resources.insert(res);
        self.mark_unidentified(&uri);
    }

    fn mark_unidentified(&mut self, uri: &str) {
        if !self.mappings.contains_key(uri) {
            self.not_identified.insert(uri.to_string());
        }
    }

    /// Find the stored resource `uri` stands for
    ///
    /// Only reads from the store and records nothing, so it can run for
    /// independent resources from several threads.
    pub fn run_identification(&self, uri: &str) -> Result<Identification, IdentifyError> {
        if self.exists(uri)? {
            log::debug!("{} exists in the store", uri);
            return Ok(Identification::MappedTo(uri.to_string()));
        }

        match self.config.mode {
            IdentificationMode::None => return Ok(Identification::Unidentified),
            IdentificationMode::New if !is_blank_id(uri) => {
                return Ok(Identification::Unidentified)
            }
            _ => {}
        }

        let Some(res) = self.resources.get(uri) else {
            return Ok(Identification::Unidentified);
        };

        if let Some(url) = res.nie_url() {
            return self.identify_by_url(uri, url);
        }

        let pairs = self.identifying_pairs(res);
        if pairs.is_empty() {
            log::debug!("{} has no identifying properties", uri);
            return Ok(Identification::Unidentified);
        }

        let query = Query::identification(pairs.iter().map(|(p, o)| (p.as_str(), o)));
        log::trace!("Identification query for {}: {}", uri, query);

        let mut candidates: BTreeSet<String> = self
            .select_resources(&query)?
            .into_iter()
            .filter(|c| c != uri)
            .collect();
        log::debug!("{} has {} candidate(s)", uri, candidates.len());

        if !candidates.is_empty() && self.config.min_score > 1.0 {
            candidates = self.best_scoring(res, &pairs, candidates)?;
        }

        let mut iter = candidates.iter();
        match (iter.next(), iter.next()) {
            (None, _) => Ok(Identification::Unidentified),
            (Some(only), None) => Ok(Identification::MappedTo(only.clone())),
            _ => {
                log::warn!(
                    "{} matches {} stored resources, resolving duplicates",
                    uri,
                    candidates.len()
                );
                let chosen = self.duplicate_match(uri, candidates.iter().map(String::as_str))?;
                Ok(Identification::MappedTo(chosen))
            }
        }
    }

    fn exists(&self, uri: &str) -> Result<bool, IdentifyError> {
        // Temporary ids only live in the incoming batch
        if is_blank_id(uri) {
            return Ok(false);
        }
        Ok(self
            .store
            .execute_query(&Query::exists(uri))?
            .into_boolean()?)
    }

    /// Values of the result variable of a SELECT query
    ///
    /// Blank nodes bound by the store cannot be referred to from outside it
    /// and are dropped.
    fn select_resources(&self, query: &Query) -> Result<Vec<String>, IdentifyError> {
        let rows = self.store.execute_query(query)?.into_bindings()?;
        Ok(rows
            .iter()
            .filter_map(|row| row.get(RESULT_VAR).and_then(Node::as_uri))
            .map(str::to_string)
            .collect())
    }

    fn identify_by_url(&self, uri: &str, url: &str) -> Result<Identification, IdentifyError> {
        let query = Query::by_nie_url(url);
        log::trace!("nie:url query for {}: {}", uri, query);
        match self.select_resources(&query)?.into_iter().next() {
            Some(hit) => {
                log::debug!("{} identified by nie:url {} as {}", uri, url, hit);
                Ok(Identification::MappedTo(hit))
            }
            None => Ok(Identification::Unidentified),
        }
    }

    /// The (predicate, object) pairs used to search for candidates
    ///
    /// Objects referring to other incoming resources are replaced by their
    /// mapping. Temporary objects without one cannot match anything stored
    /// and are left out.
    fn identifying_pairs(&self, res: &SimpleResource) -> Vec<(String, Node)> {
        res.pairs()
            .filter(|(p, _)| {
                self.is_identifying_property(p) && !self.config.is_optional_property(p)
            })
            .filter_map(|(p, o)| self.resolve_object(o).map(|o| (p.to_string(), o)))
            .collect()
    }

    fn resolve_object(&self, object: &Node) -> Option<Node> {
        let Some(id) = object.resource_id() else {
            return Some(object.clone());
        };
        match self.mappings.get(&id) {
            Some(mapped) => Some(Node::from_resource_id(mapped)),
            None if is_blank_id(&id) => None,
            None => Some(object.clone()),
        }
    }

    /// Keep the candidates reaching the minimum score with the highest score
    fn best_scoring(
        &self,
        res: &SimpleResource,
        pairs: &[(String, Node)],
        candidates: BTreeSet<String>,
    ) -> Result<BTreeSet<String>, IdentifyError> {
        let optional: Vec<(String, Node)> = res
            .pairs()
            .filter(|(p, _)| self.config.is_optional_property(p))
            .filter_map(|(p, o)| self.resolve_object(o).map(|o| (p.to_string(), o)))
            .collect();

        let mut best = BTreeSet::new();
        let mut best_score = 0usize;
        for candidate in candidates {
            let mut score = 0;
            for (p, o) in pairs.iter().chain(optional.iter()) {
                let pattern = StatementPattern::new(Some(candidate.as_str()), Some(p.as_str()), Some(o));
                if !self.store.list_statements(&pattern)?.is_empty() {
                    score += 1;
                }
            }
            log::debug!("Candidate {} scores {}", candidate, score);

            if (score as f32) < self.config.min_score || score < best_score {
                continue;
            }
            if score > best_score {
                best.clear();
                best_score = score;
            }
            best.insert(candidate);
        }
        Ok(best)
    }

    /// Identify `uri` and record the mapping. Returns whether it is mapped.
    pub fn identify(&mut self, uri: &str) -> Result<bool, IdentifyError> {
        if self.mappings.contains_key(uri) {
            return Ok(true);
        }
        match self.run_identification(uri)? {
            Identification::MappedTo(existing) => {
                self.record_mapping(uri, existing);
                Ok(true)
            }
            Identification::Unidentified => Ok(false),
        }
    }

    /// Identify every uri in `uris`. Returns how many were newly mapped.
    pub fn identify_list<I, T>(&mut self, uris: I) -> Result<usize, IdentifyError>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        let mut count = 0;
        for uri in uris {
            let uri = uri.as_ref();
            if !self.mappings.contains_key(uri) && self.identify(uri)? {
                count += 1;
            }
        }
        Ok(count)
    }

    /// Identify every unidentified resource
    ///
    /// Passes repeat until one maps nothing new, since a mapping found late
    /// can make resources referring to it identifiable.
    pub fn identify_all(&mut self) -> Result<usize, IdentifyError> {
        let mut total = 0;
        loop {
            let mut pending: Vec<String> = self.not_identified.iter().cloned().collect();
            pending.sort();
            let found = self.identify_list(&pending)?;
            total += found;
            if found == 0 {
                break;
            }
        }
        Ok(total)
    }

    pub fn is_identifying_property(&self, predicate: &str) -> bool {
        self.config.policy.is_identifying_property(predicate)
    }

    /// Choose among several stored resources matching `original`
    ///
    /// The one with the oldest nao:created wins, equal timestamps go to the
    /// smallest uri. A candidate without a parsable nao:created is an
    /// inconsistent store and fails the call.
    pub fn duplicate_match<'c>(
        &self,
        original: &str,
        candidates: impl IntoIterator<Item = &'c str>,
    ) -> Result<String, IdentifyError> {
        let candidates: BTreeSet<&str> = candidates.into_iter().collect();

        let mut oldest: Option<(DateTime<Utc>, &str)> = None;
        for candidate in candidates {
            let created = self.creation_time(candidate)?;
            // Ascending uri order: only a strictly older one replaces
            if oldest.map_or(true, |(t, _)| created < t) {
                oldest = Some((created, candidate));
            }
        }

        match oldest {
            Some((created, uri)) => {
                log::debug!("{} resolved to {} (created {})", original, uri, created);
                Ok(uri.to_string())
            }
            None => Err(IdentifyError::StoreInvariantViolation {
                uri: original.to_string(),
                reason: "no candidates to choose from".to_string(),
            }),
        }
    }

    fn creation_time(&self, uri: &str) -> Result<DateTime<Utc>, IdentifyError> {
        let pattern = StatementPattern::new(Some(uri), Some(NAO_CREATED), None);
        let statements = self.store.list_statements(&pattern)?;
        if statements.is_empty() {
            return Err(IdentifyError::StoreInvariantViolation {
                uri: uri.to_string(),
                reason: "resource has no nao:created".to_string(),
            });
        }

        let mut earliest: Option<DateTime<Utc>> = None;
        for st in statements {
            let parsed = st.object.as_literal().and_then(|l| l.as_timestamp());
            let Some(time) = parsed else {
                return Err(IdentifyError::StoreInvariantViolation {
                    uri: uri.to_string(),
                    reason: format!("unparsable nao:created value {}", st.object),
                });
            };
            earliest = Some(earliest.map_or(time, |e| e.min(time)));
        }
        earliest.ok_or_else(|| IdentifyError::StoreInvariantViolation {
            uri: uri.to_string(),
            reason: "resource has no nao:created".to_string(),
        })
    }

    fn record_mapping(&mut self, uri: &str, existing: String) {
        log::debug!("{} --> {}", uri, existing);
        self.not_identified.remove(uri);
        self.mappings.insert(uri.to_string(), existing);
    }

    /// Record a mapping chosen by the caller
    pub fn manual_identification(&mut self, old_uri: &str, new_uri: &str) {
        self.record_mapping(old_uri, new_uri.to_string());
    }

    /// Map `old_uri` onto the stored resource `new_uri` and relocate what
    /// lies below it
    ///
    /// When the incoming resource and the stored one both have a nie:url,
    /// the incoming one takes the stored location, and every unidentified
    /// resource located below the old folder (or below the folder holding
    /// the old file) is moved below the new one. Those can then be
    /// identified by location.
    pub fn force_resource(&mut self, old_uri: &str, new_uri: &str) -> Result<(), IdentifyError> {
        self.record_mapping(old_uri, new_uri.to_string());

        let Some(res) = self.resources.get(old_uri) else {
            return Ok(());
        };
        let Some(old_url) = res.nie_url().map(str::to_string) else {
            return Ok(());
        };
        let is_folder = res.is_folder();

        let pattern = StatementPattern::new(Some(new_uri), Some(NIE_URL), None);
        let stored = self.store.list_statements(&pattern)?;
        let Some(new_url) = stored
            .iter()
            .find_map(|st| st.object.as_uri())
            .map(str::to_string)
        else {
            return Ok(());
        };

        if let Some(res) = self.resources.get_mut(old_uri) {
            res.remove_property(NIE_URL);
            res.insert(NIE_URL, Node::uri(new_url.clone()));
        }

        let (old_prefix, new_prefix) = if is_folder {
            (folder_prefix(&old_url), folder_prefix(&new_url))
        } else {
            (parent_prefix(&old_url), parent_prefix(&new_url))
        };
        if old_prefix == new_prefix {
            return Ok(());
        }

        let pending: Vec<String> = self.not_identified.iter().cloned().collect();
        for uri in pending {
            let Some(sub) = self.resources.get_mut(&uri) else {
                continue;
            };
            let Some(rest) = sub
                .nie_url()
                .and_then(|url| url.strip_prefix(old_prefix.as_str()))
                .map(str::to_string)
            else {
                continue;
            };
            let moved = format!("{}{}", new_prefix, rest);
            log::debug!("Relocating {} to {}", uri, moved);
            sub.remove_property(NIE_URL);
            sub.insert(NIE_URL, Node::uri(moved));
        }
        Ok(())
    }

    /// Drop an unidentified resource and every reference to it
    ///
    /// With `ignore_sub`, a folder also takes the unidentified resources
    /// located below its nie:url with it. Returns false for a uri that is
    /// already identified.
    pub fn ignore(&mut self, uri: &str, ignore_sub: bool) -> bool {
        if self.mappings.contains_key(uri) {
            return false;
        }

        let removed = self.drop_resource(uri);

        let Some(res) = removed else {
            return true;
        };
        if !ignore_sub || !res.is_folder() {
            return true;
        }

        let urls = res.property(NIE_URL);
        let [Node::Uri(folder_url)] = urls.as_slice() else {
            return true;
        };
        let prefix = folder_prefix(folder_url);

        let below: Vec<String> = self
            .not_identified
            .iter()
            .filter(|u| {
                self.resources
                    .get(u)
                    .and_then(SimpleResource::nie_url)
                    .map_or(false, |url| url.starts_with(&prefix))
            })
            .cloned()
            .collect();
        for sub in below {
            log::debug!("Ignoring {} below {}", sub, folder_url);
            self.drop_resource(&sub);
        }
        true
    }

    fn drop_resource(&mut self, uri: &str) -> Option<SimpleResource> {
        self.not_identified.remove(uri);
        self.resources.remove_object(uri);
        self.resources.remove(uri)
    }

    pub fn mapped_uri(&self, uri: &str) -> Option<&str> {
        self.mappings.get(uri).map(String::as_str)
    }

    pub fn mappings(&self) -> &HashMap<String, String> {
        &self.mappings
    }

    /// Stored uris resources were mapped to
    pub fn mapped_uris(&self) -> Vec<&str> {
        self.mappings.values().map(String::as_str).collect()
    }

    pub fn unidentified(&self) -> &HashSet<String> {
        &self.not_identified
    }

    /// Original uris that have been mapped
    pub fn identified(&self) -> HashSet<&str> {
        self.mappings.keys().map(String::as_str).collect()
    }

    pub fn all_identified(&self) -> bool {
        self.not_identified.is_empty()
    }

    pub fn simple_resource(&self, uri: &str) -> Option<&SimpleResource> {
        self.resources.get(uri)
    }

    pub fn statements(&self, uri: &str) -> Vec<Statement> {
        self.resources
            .get(uri)
            .map(SimpleResource::to_statement_list)
            .unwrap_or_default()
    }

    /// Statements of every resource still held by the identifier
    pub fn identifying_statements(&self) -> Vec<Statement> {
        self.resources.to_statement_list()
    }

    pub fn resources(&self) -> &ResourceHash {
        &self.resources
    }
}

/// `url` with exactly one trailing slash
fn folder_prefix(url: &str) -> String {
    format!("{}/", url.trim_end_matches('/'))
}

/// Folder part of a file url, including the trailing slash
fn parent_prefix(url: &str) -> String {
    let trimmed = url.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(pos) => trimmed[..=pos].to_string(),
        None => String::new(),
    }
}
