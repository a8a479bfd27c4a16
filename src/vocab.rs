//! Vocabulary used by resource identification
//!
//! Only the handful of well-known URIs the engine itself inspects.

pub const RDF_NS: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";
pub const NAO_NS: &str = "http://www.semanticdesktop.org/ontologies/2007/08/15/nao#";
pub const NIE_NS: &str = "http://www.semanticdesktop.org/ontologies/2007/01/19/nie#";
pub const NFO_NS: &str = "http://www.semanticdesktop.org/ontologies/2007/03/22/nfo#";
pub const XSD_NS: &str = "http://www.w3.org/2001/XMLSchema#";

pub const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";

/// Creation timestamp of a resource
pub const NAO_CREATED: &str = "http://www.semanticdesktop.org/ontologies/2007/08/15/nao#created";
pub const NAO_CREATOR: &str = "http://www.semanticdesktop.org/ontologies/2007/08/15/nao#creator";
pub const NAO_LAST_MODIFIED: &str =
    "http://www.semanticdesktop.org/ontologies/2007/08/15/nao#lastModified";
pub const NAO_USER_VISIBLE: &str =
    "http://www.semanticdesktop.org/ontologies/2007/08/15/nao#userVisible";
pub const NAO_HAS_TAG: &str = "http://www.semanticdesktop.org/ontologies/2007/08/15/nao#hasTag";

/// Location of a file resource
pub const NIE_URL: &str = "http://www.semanticdesktop.org/ontologies/2007/01/19/nie#url";
pub const NIE_IS_PART_OF: &str = "http://www.semanticdesktop.org/ontologies/2007/01/19/nie#isPartOf";

pub const NFO_FOLDER: &str = "http://www.semanticdesktop.org/ontologies/2007/03/22/nfo#Folder";
pub const NFO_FILE_DATA_OBJECT: &str =
    "http://www.semanticdesktop.org/ontologies/2007/03/22/nfo#FileDataObject";

/// Datatype of plain string literals; `"x"` and `"x"^^xsd:string` are one term
pub const XSD_STRING: &str = "http://www.w3.org/2001/XMLSchema#string";
pub const XSD_DATE_TIME: &str = "http://www.w3.org/2001/XMLSchema#dateTime";
pub const XSD_DATE: &str = "http://www.w3.org/2001/XMLSchema#date";

/// Bookkeeping predicates that change on every write and never identify a resource
pub const PROVENANCE_PROPERTIES: [&str; 4] =
    [NAO_CREATED, NAO_CREATOR, NAO_LAST_MODIFIED, NAO_USER_VISIBLE];

/// Check whether a predicate is one of the provenance predicates
pub fn is_provenance_property(predicate: &str) -> bool {
    PROVENANCE_PROPERTIES.contains(&predicate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_namespaces_prefix_terms() {
        assert!(RDF_TYPE.starts_with(RDF_NS));
        assert!(NAO_CREATED.starts_with(NAO_NS));
        assert!(NIE_URL.starts_with(NIE_NS));
        assert!(NFO_FOLDER.starts_with(NFO_NS));
        assert!(XSD_DATE_TIME.starts_with(XSD_NS));
    }

    #[test]
    fn test_is_provenance_property() {
        assert!(is_provenance_property(NAO_CREATED));
        assert!(is_provenance_property(NAO_USER_VISIBLE));
        assert!(!is_provenance_property(NIE_URL));
        assert!(!is_provenance_property(RDF_TYPE));
    }
}
