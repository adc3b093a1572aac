//! Importer configuration.
//!
//! Everything that used to be a hard-coded constant of the import pipeline
//! (well-known namespaces, the raw-content threshold, the formats handed off
//! to secondary processors) lives here and can be loaded from JSON.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Namespace seeded for the "no prefix" entry of every namespace table.
pub const DEFAULT_NAMESPACE_URI: &str = "http://stixgraph.org/ns";

/// Base of the diagnostic namespaces synthesized for unresolvable prefixes.
pub const MISSING_ID_NAMESPACE_PREFIX: &str = "http://stixgraph.org/missing-id-ns";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Children of a matching element are handed off to a secondary processor
/// instead of being imported as STIX/CybOX objects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeferredFormat {
    /// Local name of the embedding (parent) element
    pub element: String,
    /// Substring that must occur in the embedding element's `xsi:type`
    pub type_marker: String,
    /// Tag of the processor registered for this format
    pub processor: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImporterConfig {
    pub default_namespace_uri: String,
    pub missing_id_namespace_prefix: String,
    /// Fallback namespace for identifiers whose prefix does not resolve.
    /// Wins over the synthesized missing-id namespace.
    pub default_identifier_ns_uri: Option<String>,
    /// Raw content longer than this many characters is externalized.
    pub raw_inline_threshold: usize,
    pub raw_marker: String,
    /// Term segment of CybOX 1 object properties, renamed to
    /// `current_wrapper` (its CybOX 2 name).
    pub legacy_wrapper: String,
    pub current_wrapper: String,
    pub deferred_formats: Vec<DeferredFormat>,
}

impl Default for ImporterConfig {
    fn default() -> Self {
        Self {
            default_namespace_uri: DEFAULT_NAMESPACE_URI.to_string(),
            missing_id_namespace_prefix: MISSING_ID_NAMESPACE_PREFIX.to_string(),
            default_identifier_ns_uri: None,
            raw_inline_threshold: 256,
            raw_marker: "Raw_".to_string(),
            legacy_wrapper: "Defined_Object".to_string(),
            current_wrapper: "Properties".to_string(),
            deferred_formats: vec![DeferredFormat {
                element: "Test_Mechanism".to_string(),
                type_marker: "OpenIOC2010TestMechanismType".to_string(),
                processor: "OpenIOC2010".to_string(),
            }],
        }
    }
}

impl ImporterConfig {
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// The deferred format matching an embedding element, if any.
    pub fn deferred_format(&self, element: &str, xsi_type: &str) -> Option<&DeferredFormat> {
        self.deferred_formats
            .iter()
            .find(|f| f.element == element && xsi_type.contains(&f.type_marker))
    }
}
