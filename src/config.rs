//! Identifier and merge configuration
//!
//! Both structs deserialize from JSON with every field optional, so a
//! config file only needs to name what it changes.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::IdentifyError;
use crate::policy::IdentifyingPolicy;
use crate::vocab::PROVENANCE_PROPERTIES;

/// Which resources identification tries to match
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentificationMode {
    /// Resources already stored under their uri keep it; only temporary
    /// (`_:`) resources are matched against the store
    New,
    /// Every resource is matched, even one whose uri is not stored yet
    #[default]
    All,
    /// No matching: only resources already stored under their uri are kept
    None,
}

impl std::str::FromStr for IdentificationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "new" => Ok(IdentificationMode::New),
            "all" => Ok(IdentificationMode::All),
            "none" => Ok(IdentificationMode::None),
            other => Err(format!(
                "unknown identification mode '{}' (expected new, all or none)",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentifierConfig {
    pub mode: IdentificationMode,
    /// Minimum number of matching properties a candidate needs
    pub min_score: f32,
    /// Properties that count towards the score when they match, and are
    /// never used to find candidates
    pub optional_properties: Vec<String>,
    pub policy: IdentifyingPolicy,
}

impl Default for IdentifierConfig {
    fn default() -> Self {
        Self {
            mode: IdentificationMode::All,
            min_score: 1.0,
            optional_properties: PROVENANCE_PROPERTIES.iter().map(|p| p.to_string()).collect(),
            policy: IdentifyingPolicy::default(),
        }
    }
}

impl IdentifierConfig {
    pub fn from_json_str(content: &str) -> Result<Self, IdentifyError> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn from_file(path: &Path) -> Result<Self, IdentifyError> {
        let content = fs::read_to_string(path).map_err(|e| IdentifyError::LoadError {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_json_str(&content)
    }

    pub fn add_optional_property(&mut self, property: impl Into<String>) {
        let property = property.into();
        if !self.optional_properties.contains(&property) {
            self.optional_properties.push(property);
        }
    }

    pub fn clear_optional_properties(&mut self) {
        self.optional_properties.clear();
    }

    pub fn is_optional_property(&self, property: &str) -> bool {
        self.optional_properties.iter().any(|p| p == property)
    }
}

/// Options for [`ResourceMerger`](crate::merge::ResourceMerger)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeOptions {
    /// Prefix of uris minted for new blank resources
    pub uri_prefix: String,
    /// Add nao:created to newly created resources that lack it
    pub stamp_created: bool,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            uri_prefix: "res:".to_string(),
            stamp_created: true,
        }
    }
}
