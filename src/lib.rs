//! Resource Identification Library
//!
//! This library matches incoming resources, described as statements with
//! temporary or unknown subjects, against the resources already persisted
//! in a triple store, and merges them into it.
//!
//! # Overview
//!
//! Identification of one resource proceeds as follows:
//!
//! 1. If its uri already exists in the store, it is kept
//! 2. If it has a nie:url, the stored resource with that location is used
//! 3. Otherwise the store is searched for resources sharing at least one
//!    identifying (predicate, object) pair
//! 4. When several match, the oldest by nao:created wins
//!
//! Which predicates identify is configured through an
//! [`IdentifyingPolicy`]: literal-valued properties do by default,
//! resource-valued ones don't, and the provenance properties
//! (nao:created, nao:creator, nao:lastModified, nao:userVisible) never do.
//!
//! # Usage
//!
//! ## Identify resources
//!
//! ```ignore
//! use resource_identify::{IdentifierConfig, MemoryStore, ResourceIdentifier};
//!
//! let store = MemoryStore::from_statements(stored);
//! let mut identifier = ResourceIdentifier::new(&store, IdentifierConfig::default());
//! identifier.add_statements(&incoming);
//! identifier.identify_all()?;
//!
//! for (original, existing) in identifier.mappings() {
//!     println!("{} -> {}", original, existing);
//! }
//! ```
//!
//! ## Merge into a store
//!
//! ```ignore
//! use resource_identify::{IdentifierConfig, MergeOptions, ResourceMerger};
//!
//! let result = ResourceMerger::new(&store, IdentifierConfig::default(), MergeOptions::default())
//!     .merge(&incoming)?;
//! store.insert_all(result.statements);
//! ```

pub mod config;
pub mod error;
pub mod identifier;
pub mod loader;
pub mod merge;
pub mod node;
pub mod policy;
pub mod query;
pub mod resource;
pub mod store;
pub mod vocab;

// Re-export main types for convenience
pub use crate::config::{IdentificationMode, IdentifierConfig, MergeOptions};
pub use crate::error::{IdentifyError, StoreError};
pub use crate::identifier::{Identification, ResourceIdentifier};
pub use crate::loader::{load_statements, parse_statements, to_json_string, StatementSource};
pub use crate::merge::{MergeResult, MergeStats, ResourceMerger};
pub use crate::node::{Literal, Node, Statement};
pub use crate::policy::{IdentifyingPolicy, PropertyRange};
pub use crate::query::Query;
pub use crate::resource::{ResourceHash, SimpleResource};
pub use crate::store::{MemoryStore, QueryResult, StatementPattern, Store};
