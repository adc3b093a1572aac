//! Outcome of an import call.

use serde::Serialize;
use stixgraph_core::{Existence, IdentityKey};

/// Non-fatal conditions met during an import. Each one is logged when it
/// occurs and the import carries on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ImportIssue {
    #[error("element `{element}` has no identifier; object skipped")]
    MissingIdentifier { element: String },
    #[error("no namespace for identifier `{id}`; using `{fallback}`")]
    UnresolvableNamespacePrefix { id: String, fallback: String },
    #[error("cannot derive an object id from `{parent_id}`; embedding not extracted")]
    MalformedDerivedId { parent_id: String },
    #[error("no processor registered for `{processor}`; sub-document skipped")]
    UnregisteredDeferredProcessor { processor: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectOutcome {
    pub identity: IdentityKey,
    pub type_name: String,
    pub existence: Existence,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub objects: Vec<ObjectOutcome>,
    pub issues: Vec<ImportIssue>,
}

impl ImportReport {
    /// Number of objects with the given outcome.
    pub fn count(&self, existence: Existence) -> usize {
        self.objects
            .iter()
            .filter(|o| o.existence == existence)
            .count()
    }

    /// Whether the import wrote any object data.
    pub fn changed(&self) -> bool {
        self.objects.iter().any(|o| o.existence.wrote_data())
    }
}
