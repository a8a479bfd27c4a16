//! Graph nodes and statements
//!
//! Nodes are the values that appear in statements: URIs, literals and
//! blank nodes. Subjects are carried as plain identifiers, where blank
//! subjects are spelled `_:label` so that a [`Node::Blank`] object and the
//! subject it refers to share one identifier.

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::vocab::XSD_STRING;

/// Prefix of blank-node identifiers in subject position
pub const BLANK_PREFIX: &str = "_:";

/// Classification of a resource identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdKind {
    /// Blank/temporary identifier: "_:b1"
    Blank,
    /// Anything else is treated as a URI: "res:42", "http://..."
    Uri,
}

/// Classify a resource identifier
pub fn classify_id(id: &str) -> IdKind {
    if id.starts_with(BLANK_PREFIX) {
        IdKind::Blank
    } else {
        IdKind::Uri
    }
}

/// Check whether an identifier names a blank/temporary resource
pub fn is_blank_id(id: &str) -> bool {
    classify_id(id) == IdKind::Blank
}

fn normalize_datatype(datatype: Option<String>) -> Option<String> {
    datatype.filter(|dt| dt != XSD_STRING)
}

fn deserialize_datatype<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(normalize_datatype)
}

/// A literal value with optional datatype or language tag
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Literal {
    pub value: String,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_datatype"
    )]
    pub datatype: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,
}

impl Literal {
    /// Plain string literal
    pub fn plain(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            datatype: None,
            lang: None,
        }
    }

    /// Typed literal; `xsd:string` is stored as a plain literal
    pub fn typed(value: impl Into<String>, datatype: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            datatype: normalize_datatype(Some(datatype.into())),
            lang: None,
        }
    }

    pub fn lang(value: impl Into<String>, lang: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            datatype: None,
            lang: Some(lang.into()),
        }
    }

    /// RDF term equality: a missing datatype and `xsd:string` are the same
    pub fn same_term(&self, other: &Literal) -> bool {
        self.value == other.value
            && self.lang == other.lang
            && self.effective_datatype() == other.effective_datatype()
    }

    fn effective_datatype(&self) -> Option<&str> {
        self.datatype.as_deref().filter(|dt| *dt != XSD_STRING)
    }

    /// Interpret the literal as a point in time
    ///
    /// Accepts RFC 3339 date-times, date-times without offset (taken as UTC)
    /// and plain dates (midnight UTC).
    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        let value = self.value.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
            return Some(dt.with_timezone(&Utc));
        }
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f") {
            return Some(naive.and_utc());
        }
        NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .map(|naive| naive.and_utc())
    }

    /// Render in N3/Turtle syntax
    pub fn to_n3(&self) -> String {
        let mut out = String::with_capacity(self.value.len() + 2);
        out.push('"');
        for c in self.value.chars() {
            match c {
                '\\' => out.push_str("\\\\"),
                '"' => out.push_str("\\\""),
                '\n' => out.push_str("\\n"),
                '\r' => out.push_str("\\r"),
                '\t' => out.push_str("\\t"),
                c => out.push(c),
            }
        }
        out.push('"');
        if let Some(lang) = &self.lang {
            out.push('@');
            out.push_str(lang);
        } else if let Some(datatype) = &self.datatype {
            out.push_str("^^");
            out.push_str(&uri_to_n3(datatype));
        }
        out
    }
}

/// The object of a statement
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Node {
    Uri(String),
    Literal(Literal),
    /// Blank node label, without the `_:` prefix
    Blank(String),
}

impl Node {
    pub fn uri(uri: impl Into<String>) -> Self {
        Node::Uri(uri.into())
    }

    pub fn literal(value: impl Into<String>) -> Self {
        Node::Literal(Literal::plain(value))
    }

    pub fn typed_literal(value: impl Into<String>, datatype: impl Into<String>) -> Self {
        Node::Literal(Literal::typed(value, datatype))
    }

    pub fn blank(label: impl Into<String>) -> Self {
        Node::Blank(label.into())
    }

    /// Build the node that refers to a resource identifier
    ///
    /// "_:b1" -> Blank("b1"), anything else -> Uri
    pub fn from_resource_id(id: &str) -> Self {
        match id.strip_prefix(BLANK_PREFIX) {
            Some(label) => Node::Blank(label.to_string()),
            None => Node::Uri(id.to_string()),
        }
    }

    pub fn is_resource(&self) -> bool {
        !self.is_literal()
    }

    pub fn is_literal(&self) -> bool {
        matches!(self, Node::Literal(_))
    }

    pub fn as_uri(&self) -> Option<&str> {
        match self {
            Node::Uri(u) => Some(u),
            _ => None,
        }
    }

    pub fn as_literal(&self) -> Option<&Literal> {
        match self {
            Node::Literal(l) => Some(l),
            _ => None,
        }
    }

    /// Identifier of the resource this node refers to, in subject form
    pub fn resource_id(&self) -> Option<String> {
        match self {
            Node::Uri(u) => Some(u.clone()),
            Node::Blank(b) => Some(format!("{}{}", BLANK_PREFIX, b)),
            Node::Literal(_) => None,
        }
    }

    /// RDF term equality, see [`Literal::same_term`]
    pub fn same_term(&self, other: &Node) -> bool {
        match (self, other) {
            (Node::Literal(a), Node::Literal(b)) => a.same_term(b),
            (a, b) => a == b,
        }
    }

    /// Check whether this node refers to the resource `id`
    pub fn refers_to(&self, id: &str) -> bool {
        match self {
            Node::Uri(u) => u == id,
            Node::Blank(b) => id.strip_prefix(BLANK_PREFIX) == Some(b.as_str()),
            Node::Literal(_) => false,
        }
    }

    /// Render in N3/Turtle syntax
    pub fn to_n3(&self) -> String {
        match self {
            Node::Uri(u) => uri_to_n3(u),
            Node::Literal(l) => l.to_n3(),
            Node::Blank(b) => format!("{}{}", BLANK_PREFIX, b),
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_n3())
    }
}

/// Characters an IRI reference may not contain
pub fn is_iri_forbidden(c: char) -> bool {
    matches!(c, '<' | '>' | '"' | '{' | '}' | '|' | '^' | '`' | '\\') || (c as u32) <= 0x20
}

/// Render a URI as `<...>`, escaping characters not allowed in an IRIREF
pub fn uri_to_n3(uri: &str) -> String {
    let mut out = String::with_capacity(uri.len() + 2);
    out.push('<');
    for c in uri.chars() {
        if is_iri_forbidden(c) {
            out.push_str(&format!("\\u{:04X}", c as u32));
        } else {
            out.push(c);
        }
    }
    out.push('>');
    out
}

/// Render a subject identifier (URI or `_:` blank)
pub fn id_to_n3(id: &str) -> String {
    Node::from_resource_id(id).to_n3()
}

/// A (subject, predicate, object) fact
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Statement {
    pub subject: String,
    pub predicate: String,
    pub object: Node,
}

impl Statement {
    pub fn new(subject: impl Into<String>, predicate: impl Into<String>, object: Node) -> Self {
        Self {
            subject: subject.into(),
            predicate: predicate.into(),
            object,
        }
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} .",
            id_to_n3(&self.subject),
            uri_to_n3(&self.predicate),
            self.object
        )
    }
}
