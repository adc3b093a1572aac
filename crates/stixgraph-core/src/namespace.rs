//! Namespace handling: per-document prefix tables and classification of
//! structured vocabulary namespace URIs.
//!
//! Vocabulary namespaces come in a "typed" shape that encodes family, type and
//! revision:
//!
//! ```text
//! http://cybox.mitre.org/objects#AddressObject-2
//!        ^^^^^ family_tag          ^^^^^^^^^^^^^ type, ^ revision
//! http://cybox.mitre.org/common-2
//! http://stix.mitre.org/Indicator-2
//! ```
//!
//! Anything else is opaque. Parsing never fails: an opaque URI simply yields an
//! empty [`NamespaceInfo`].

use crate::identity::{split_qname, QualifiedId};
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;

const NS_TYPE_PATTERN: &str = r"^(?P<iotype_ns>[a-zA-Z][a-zA-Z0-9+.-]*://(?P<family>(?P<family_tag>[^.]+)\.mitre\.org)/([^#]+#)?(?P<type>.+?))((-|_v)(?P<revision>.*))?$";

fn ns_type_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(NS_TYPE_PATTERN).expect("namespace pattern compiles"))
}

/// Classification of a namespace URI. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamespaceInfo {
    /// The URI without its revision suffix.
    pub iotype_ns: Option<String>,
    /// e.g. `cybox.mitre.org`
    pub family: Option<String>,
    /// e.g. `cybox`
    pub family_tag: Option<String>,
    /// e.g. `AddressObject`, `common`
    pub type_name: Option<String>,
    pub revision: Option<String>,
}

impl NamespaceInfo {
    pub fn is_empty(&self) -> bool {
        self.iotype_ns.is_none()
    }
}

/// Parse a namespace URI into (family, type, revision). First match wins;
/// non-conforming URIs give an empty result.
pub fn parse_namespace_uri(uri: &str) -> NamespaceInfo {
    let Some(caps) = ns_type_regex().captures(uri) else {
        return NamespaceInfo::default();
    };
    let field = |name: &str| {
        caps.name(name)
            .map(|m| m.as_str().to_string())
            .filter(|s| !s.is_empty())
    };
    NamespaceInfo {
        iotype_ns: field("iotype_ns"),
        family: field("family"),
        family_tag: field("family_tag"),
        type_name: field("type"),
        revision: field("revision"),
    }
}

/// Prefix → namespace URI mapping of one document. The "no prefix" entry is
/// seeded with the well-known default namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceTable {
    entries: BTreeMap<Option<String>, String>,
}

impl NamespaceTable {
    pub fn new(default_namespace_uri: impl Into<String>) -> Self {
        let mut entries = BTreeMap::new();
        entries.insert(None, default_namespace_uri.into());
        Self { entries }
    }

    pub fn get(&self, prefix: Option<&str>) -> Option<&str> {
        self.entries
            .get(&prefix.map(str::to_string))
            .map(String::as_str)
    }

    /// URI for `prefix`, or `""` when unmapped.
    pub fn uri_or_empty(&self, prefix: Option<&str>) -> &str {
        self.get(prefix).unwrap_or("")
    }

    pub fn insert(&mut self, prefix: Option<String>, uri: impl Into<String>) -> Option<String> {
        self.entries.insert(prefix, uri.into())
    }

    pub fn iter(&self) -> impl Iterator<Item = (Option<&str>, &str)> {
        self.entries
            .iter()
            .map(|(k, v)| (k.as_deref(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Parse the URI bound to `prefix`; unmapped prefixes give an empty result.
    pub fn parse(&self, prefix: Option<&str>) -> NamespaceInfo {
        parse_namespace_uri(self.uri_or_empty(prefix))
    }
}

/// Resolves identifier prefixes against a [`NamespaceTable`], degrading to a
/// fallback namespace instead of failing.
#[derive(Debug, Clone, Copy)]
pub struct NamespaceResolver<'a> {
    table: &'a NamespaceTable,
    default_identifier_ns_uri: Option<&'a str>,
    missing_id_namespace_prefix: &'a str,
}

impl<'a> NamespaceResolver<'a> {
    pub fn new(
        table: &'a NamespaceTable,
        default_identifier_ns_uri: Option<&'a str>,
        missing_id_namespace_prefix: &'a str,
    ) -> Self {
        Self {
            table,
            default_identifier_ns_uri,
            missing_id_namespace_prefix,
        }
    }

    pub fn table(&self) -> &'a NamespaceTable {
        self.table
    }

    /// Namespace URI for an identifier prefix and whether it was an actual
    /// mapping. Unprefixed identifiers never resolve through the table.
    ///
    /// Fallback order: configured default identifier namespace, then
    /// `<missing-id-prefix>/<prefix>`.
    pub fn resolve_prefix(&self, prefix: Option<&str>) -> (String, bool) {
        if let Some(p) = prefix {
            if let Some(uri) = self.table.get(Some(p)) {
                return (uri.to_string(), true);
            }
        }
        let fallback = match self.default_identifier_ns_uri {
            Some(uri) => uri.to_string(),
            None => format!(
                "{}/{}",
                self.missing_id_namespace_prefix.trim_end_matches('/'),
                prefix.unwrap_or("none")
            ),
        };
        (fallback, false)
    }

    /// Split a qualified id and resolve its prefix. Logs when the prefix cannot
    /// be resolved.
    pub fn split_qualified_id(&self, id: &str) -> QualifiedId {
        let (prefix, uid) = split_qname(id);
        let (namespace_uri, resolved) = self.resolve_prefix(prefix);
        if !resolved {
            tracing::warn!(
                id,
                prefix = prefix.unwrap_or(""),
                fallback = %namespace_uri,
                "could not resolve namespace for identifier"
            );
        }
        QualifiedId {
            prefix: prefix.map(str::to_string),
            namespace_uri,
            uid: uid.to_string(),
            resolved,
        }
    }
}
