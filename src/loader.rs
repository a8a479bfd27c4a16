use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::IdentifyError;
use crate::node::{is_iri_forbidden, Node, Statement, BLANK_PREFIX};

/// Source from which to load a statement list
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatementSource {
    /// Local JSON file
    File(PathBuf),
    /// Remote http(s) URL
    Url(String),
}

impl StatementSource {
    /// `http://` and `https://` are fetched, everything else is a path
    pub fn parse(source: &str) -> Self {
        if source.starts_with("http://") || source.starts_with("https://") {
            StatementSource::Url(source.to_string())
        } else {
            StatementSource::File(PathBuf::from(source))
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self, StatementSource::File(_))
    }

    /// Human readable origin for error messages
    pub fn origin(&self) -> String {
        match self {
            StatementSource::File(p) => p.display().to_string(),
            StatementSource::Url(u) => u.clone(),
        }
    }
}

/// Accepted document shapes: a bare array or `{"statements": [...]}`
#[derive(Deserialize)]
#[serde(untagged)]
enum StatementDocument {
    List(Vec<Statement>),
    Wrapped { statements: Vec<Statement> },
}

#[derive(Serialize)]
struct StatementDocumentRef<'a> {
    statements: &'a [Statement],
}

/// Parse a JSON statement list and validate every statement
pub fn parse_statements(content: &str, origin: &str) -> Result<Vec<Statement>, IdentifyError> {
    let document: StatementDocument =
        serde_json::from_str(content).map_err(|e| IdentifyError::LoadError {
            path: origin.to_string(),
            reason: format!("Failed to parse statements: {}", e),
        })?;

    let statements = match document {
        StatementDocument::List(statements) => statements,
        StatementDocument::Wrapped { statements } => statements,
    };

    for st in &statements {
        validate_statement(st)?;
    }
    Ok(statements)
}

/// Check that every URI of a statement can be sent to a store
///
/// Subjects and resource objects are absolute IRIs or `_:` blank ids, the
/// predicate is an absolute IRI.
pub fn validate_statement(st: &Statement) -> Result<(), IdentifyError> {
    if st.subject.trim().is_empty() {
        return Err(IdentifyError::InvalidStatement(format!(
            "empty subject in statement with predicate {}",
            st.predicate
        )));
    }
    if let Some(label) = st.subject.strip_prefix(BLANK_PREFIX) {
        validate_blank_label(label, st)?;
    } else {
        validate_iri(&st.subject, "subject", st)?;
    }
    validate_iri(&st.predicate, "predicate", st)?;
    match &st.object {
        Node::Uri(uri) => validate_iri(uri, "object", st),
        Node::Blank(label) => validate_blank_label(label, st),
        Node::Literal(_) => Ok(()),
    }
}

fn validate_iri(iri: &str, position: &str, st: &Statement) -> Result<(), IdentifyError> {
    if let Some(c) = iri.chars().find(|c| is_iri_forbidden(*c)) {
        return Err(IdentifyError::InvalidStatement(format!(
            "{} '{}' of {} contains {:?}, which is not allowed in an IRI",
            position, iri, st.subject, c
        )));
    }
    Url::parse(iri).map_err(|e| {
        IdentifyError::InvalidStatement(format!(
            "{} '{}' of {} is not an absolute URI: {}",
            position, iri, st.subject, e
        ))
    })?;
    Ok(())
}

fn validate_blank_label(label: &str, st: &Statement) -> Result<(), IdentifyError> {
    if label.is_empty() || label.chars().any(|c| is_iri_forbidden(c) || c == ':') {
        return Err(IdentifyError::InvalidStatement(format!(
            "invalid blank node label '{}' in statement about {}",
            label, st.subject
        )));
    }
    Ok(())
}

pub fn load_from_file(path: &PathBuf) -> Result<Vec<Statement>, IdentifyError> {
    let content = std::fs::read_to_string(path).map_err(|e| IdentifyError::LoadError {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    parse_statements(&content, &path.display().to_string())
}

pub fn load_from_url(url: &str) -> Result<Vec<Statement>, IdentifyError> {
    let content = fetch_url(url)?;
    parse_statements(&content, url)
}

fn fetch_url(url: &str) -> Result<String, IdentifyError> {
    let response = reqwest::blocking::get(url).map_err(|e| IdentifyError::LoadError {
        path: url.to_string(),
        reason: format!("HTTP request failed: {}", e),
    })?;

    let status = response.status();
    if !status.is_success() {
        return Err(IdentifyError::LoadError {
            path: url.to_string(),
            reason: format!("HTTP status {}", status),
        });
    }

    response.text().map_err(|e| IdentifyError::LoadError {
        path: url.to_string(),
        reason: format!("Failed to read response: {}", e),
    })
}

pub fn load(source: &StatementSource) -> Result<Vec<Statement>, IdentifyError> {
    log::debug!("Loading statements from {}", source.origin());
    match source {
        StatementSource::File(p) => load_from_file(p),
        StatementSource::Url(u) => load_from_url(u),
    }
}

/// Load from a path or http(s) URL
pub fn load_statements(source: &str) -> Result<Vec<Statement>, IdentifyError> {
    load(&StatementSource::parse(source))
}

/// Serialize statements as `{"statements": [...]}`
pub fn to_json_string(statements: &[Statement], pretty: bool) -> Result<String, IdentifyError> {
    let doc = StatementDocumentRef { statements };
    if pretty {
        Ok(serde_json::to_string_pretty(&doc)?)
    } else {
        Ok(serde_json::to_string(&doc)?)
    }
}
