//! Import-scoped state.
//!
//! A fresh [`ImportContext`] is built at the start of every top-level import
//! call and passed by reference to every hook. Nothing about a run survives
//! on the importer itself.

use crate::report::ImportIssue;
use chrono::{DateTime, Utc};
use stixgraph_core::{IdentityKey, ImporterConfig, NamespaceResolver, NamespaceTable, QualifiedId};

/// Per-call options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportOptions {
    /// Revision timestamp for objects that do not carry their own.
    /// Defaults to the time of the call.
    pub timestamp: Option<DateTime<Utc>>,
    /// Fallback namespace for identifiers with unresolvable prefixes;
    /// overrides the configured one.
    pub identifier_ns_uri: Option<String>,
    /// Marking objects attached to every object written by the call.
    pub markings: Vec<IdentityKey>,
}

#[derive(Debug, Clone)]
pub struct ImportContext {
    pub config: ImporterConfig,
    pub namespaces: NamespaceTable,
    pub default_identifier_ns_uri: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub markings: Vec<IdentityKey>,
}

impl ImportContext {
    pub fn new(config: &ImporterConfig, namespaces: NamespaceTable, options: &ImportOptions) -> Self {
        Self {
            config: config.clone(),
            namespaces,
            default_identifier_ns_uri: options
                .identifier_ns_uri
                .clone()
                .or_else(|| config.default_identifier_ns_uri.clone()),
            timestamp: options.timestamp.unwrap_or_else(Utc::now),
            markings: options.markings.clone(),
        }
    }

    pub fn resolver(&self) -> NamespaceResolver<'_> {
        NamespaceResolver::new(
            &self.namespaces,
            self.default_identifier_ns_uri.as_deref(),
            &self.config.missing_id_namespace_prefix,
        )
    }

    /// Split and resolve a qualified id, recording an issue when the prefix
    /// had to fall back.
    pub fn split_id(&self, id: &str, issues: &mut Vec<ImportIssue>) -> QualifiedId {
        let qualified = self.resolver().split_qualified_id(id);
        if !qualified.resolved {
            issues.push(ImportIssue::UnresolvableNamespacePrefix {
                id: id.to_string(),
                fallback: qualified.namespace_uri.clone(),
            });
        }
        qualified
    }
}
