//! Identifying-property classification
//!
//! Decides, per predicate, whether a value of that predicate is part of a
//! resource's identity. Literal-valued properties identify by default,
//! resource-valued ones do not, and deployments may override single
//! predicates either way. The provenance predicates never identify.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::vocab::{is_provenance_property, NAO_HAS_TAG, NIE_IS_PART_OF, NIE_URL, RDF_TYPE};

/// Range of a property: what kind of value its objects are
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyRange {
    Literal,
    Resource,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentifyingPolicy {
    /// Known ranges, keyed by predicate URI
    pub ranges: HashMap<String, PropertyRange>,
    /// Range assumed for predicates missing from `ranges`
    pub default_range: PropertyRange,
    /// Predicates forced to non-identifying
    pub non_identifying: HashSet<String>,
    /// Predicates forced to identifying (provenance predicates excepted)
    pub identifying: HashSet<String>,
}

impl Default for IdentifyingPolicy {
    fn default() -> Self {
        let ranges = [RDF_TYPE, NIE_IS_PART_OF, NAO_HAS_TAG, NIE_URL]
            .into_iter()
            .map(|p| (p.to_string(), PropertyRange::Resource))
            .collect();

        Self {
            ranges,
            default_range: PropertyRange::Literal,
            non_identifying: HashSet::new(),
            identifying: HashSet::new(),
        }
    }
}

impl IdentifyingPolicy {
    pub fn with_range(mut self, predicate: impl Into<String>, range: PropertyRange) -> Self {
        self.ranges.insert(predicate.into(), range);
        self
    }

    pub fn with_non_identifying(mut self, predicate: impl Into<String>) -> Self {
        self.non_identifying.insert(predicate.into());
        self
    }

    pub fn with_identifying(mut self, predicate: impl Into<String>) -> Self {
        self.identifying.insert(predicate.into());
        self
    }

    pub fn range_of(&self, predicate: &str) -> PropertyRange {
        self.ranges
            .get(predicate)
            .copied()
            .unwrap_or(self.default_range)
    }

    /// Whether values of `predicate` take part in identification
    pub fn is_identifying_property(&self, predicate: &str) -> bool {
        if is_provenance_property(predicate) || self.non_identifying.contains(predicate) {
            return false;
        }
        if self.identifying.contains(predicate) {
            return true;
        }
        self.range_of(predicate) == PropertyRange::Literal
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vocab::{NAO_CREATED, NAO_CREATOR, NAO_LAST_MODIFIED, NAO_USER_VISIBLE};
    use serde_json::json;
    use test_case::test_case;

    const TITLE: &str = "http://example.org/title";
    const AUTHOR: &str = "http://example.org/author";

    #[test_case(TITLE, true; "unknown predicate defaults to literal range")]
    #[test_case(RDF_TYPE, false; "rdf type is resource valued")]
    #[test_case(NIE_IS_PART_OF, false; "part of is resource valued")]
    #[test_case(NAO_CREATED, false; "created is provenance")]
    #[test_case(NAO_CREATOR, false; "creator is provenance")]
    #[test_case(NAO_LAST_MODIFIED, false; "last modified is provenance")]
    #[test_case(NAO_USER_VISIBLE, false; "user visible is provenance")]
    fn test_default_policy(predicate: &str, expected: bool) {
        assert_eq!(
            IdentifyingPolicy::default().is_identifying_property(predicate),
            expected
        );
    }

    #[test]
    fn test_resource_range() {
        let policy = IdentifyingPolicy::default().with_range(AUTHOR, PropertyRange::Resource);
        assert!(!policy.is_identifying_property(AUTHOR));
        assert!(policy.is_identifying_property(TITLE));
    }

    #[test]
    fn test_overrides() {
        let policy = IdentifyingPolicy::default()
            .with_non_identifying(TITLE)
            .with_identifying(RDF_TYPE);
        assert!(!policy.is_identifying_property(TITLE));
        assert!(policy.is_identifying_property(RDF_TYPE));
    }

    #[test]
    fn test_provenance_cannot_be_overridden() {
        let mut policy = IdentifyingPolicy::default()
            .with_identifying(NAO_CREATED)
            .with_range(NAO_LAST_MODIFIED, PropertyRange::Literal);
        policy.default_range = PropertyRange::Literal;
        assert!(!policy.is_identifying_property(NAO_CREATED));
        assert!(!policy.is_identifying_property(NAO_LAST_MODIFIED));
    }

    #[test]
    fn test_deserialize_partial() {
        let policy: IdentifyingPolicy = serde_json::from_value(json!({
            "default_range": "resource",
            "identifying": [TITLE]
        }))
        .unwrap();
        assert!(policy.is_identifying_property(TITLE));
        assert!(!policy.is_identifying_property("http://example.org/unknown"));
        // Unspecified fields keep their defaults
        assert!(policy.ranges.contains_key(RDF_TYPE));
    }
}
