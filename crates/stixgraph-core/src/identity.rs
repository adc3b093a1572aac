//! Object identity: qualified ids, identity keys and revision hints.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of an information object: a unique id within a namespace URI.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IdentityKey {
    pub namespace_uri: String,
    pub uid: String,
}

impl IdentityKey {
    pub fn new(namespace_uri: impl Into<String>, uid: impl Into<String>) -> Self {
        Self {
            namespace_uri: namespace_uri.into(),
            uid: uid.into(),
        }
    }
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.namespace_uri, self.uid)
    }
}

/// Identifier and revision timestamp found on an XML element.
///
/// Both are raw attribute text; `timestamp` comes from the non-standard
/// `revision_timestamp` attribute only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdAndRevision {
    pub id: Option<String>,
    pub timestamp: Option<String>,
}

impl IdAndRevision {
    pub fn new(id: Option<String>, timestamp: Option<String>) -> Self {
        Self { id, timestamp }
    }

    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            timestamp: None,
        }
    }

    /// The id, if present and non-empty.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref().filter(|id| !id.is_empty())
    }
}

/// A qualified id split into prefix and local part, with the namespace URI the
/// prefix resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualifiedId {
    pub prefix: Option<String>,
    pub namespace_uri: String,
    pub uid: String,
    /// `false` when the namespace URI is a fallback rather than a mapping of
    /// the prefix.
    pub resolved: bool,
}

impl QualifiedId {
    pub fn identity(&self) -> IdentityKey {
        IdentityKey::new(self.namespace_uri.clone(), self.uid.clone())
    }
}

/// Split `prefix:local` on the first `:`.
pub fn split_qname(id: &str) -> (Option<&str>, &str) {
    match id.split_once(':') {
        Some((prefix, local)) => (Some(prefix), local),
        None => (None, id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_qname_splits_on_first_colon_only() {
        assert_eq!(
            split_qname("example:Indicator-1"),
            (Some("example"), "Indicator-1")
        );
        assert_eq!(split_qname("a:b:c"), (Some("a"), "b:c"));
        assert_eq!(split_qname("bare"), (None, "bare"));
    }

    #[test]
    fn empty_id_counts_as_absent() {
        let info = IdAndRevision::new(Some(String::new()), None);
        assert_eq!(info.id(), None);
    }
}
