//! Type derivation for information objects.
//!
//! The type of an object is derived from three inputs:
//!
//! - the namespace of the embedding element (`@@ns` of the object dict),
//! - an optional type hint (a namespace prefix naming the object kind),
//! - the element name.
//!
//! Precedence: a hint naming a generic namespace (`common`, `cybox`, `stix`)
//! falls back to the element name in the embedding context; any other hint
//! wins outright; without a hint the element name and embedding context are
//! used. CybOX 1 (`Defined_Object`) and CybOX 2 (`Properties`) documents
//! classify identically only with this exact order.

use stixgraph_core::{NamespaceTable, ObjDict, TypeInfo};

/// Family tags whose revision lives in the family's base namespace.
const VERSIONED_FAMILY_TAGS: &[&str] = &["stix", "cybox"];

/// Hint types that describe a wrapper rather than an object kind.
const GENERIC_HINT_TYPES: &[&str] = &["common", "cybox", "stix"];

pub fn derive_type(
    table: &NamespaceTable,
    embedding_ns: Option<&str>,
    type_hint: Option<&str>,
    element_name: &str,
) -> TypeInfo {
    let ns_info = table.parse(embedding_ns);

    let family = ns_info.family.clone().unwrap_or_default();
    let family_revision = match ns_info.family_tag.as_deref() {
        Some(tag) if VERSIONED_FAMILY_TAGS.contains(&tag) => table.parse(Some(tag)).revision,
        _ => ns_info.revision.clone(),
    }
    .unwrap_or_default();

    // A hint whose namespace does not parse carries no type information.
    let hint_info = type_hint
        .map(|hint| table.parse(Some(hint)))
        .filter(|info| !info.is_empty());

    let (type_name, type_namespace_uri, type_revision) = match hint_info {
        Some(hint)
            if hint
                .type_name
                .as_deref()
                .is_some_and(|t| GENERIC_HINT_TYPES.contains(&t)) =>
        {
            (
                element_name.to_string(),
                ns_info.iotype_ns.clone().unwrap_or_default(),
                ns_info.revision.clone().unwrap_or_default(),
            )
        }
        Some(hint) => (
            hint.type_name.unwrap_or_default(),
            hint.iotype_ns.unwrap_or_default(),
            hint.revision.unwrap_or_default(),
        ),
        None => (
            element_name.to_string(),
            ns_info.iotype_ns.clone().unwrap_or_default(),
            family_revision.clone(),
        ),
    };

    tracing::debug!(
        embedding_ns = embedding_ns.unwrap_or(""),
        type_hint = type_hint.unwrap_or(""),
        element_name,
        family = %family,
        family_revision = %family_revision,
        type_name = %type_name,
        type_namespace_uri = %type_namespace_uri,
        type_revision = %type_revision,
        "derived object type"
    );

    TypeInfo {
        family,
        family_revision,
        type_name,
        type_namespace_uri,
        type_revision,
    }
}

fn qname_prefix(value: &str) -> &str {
    value.split(':').next().unwrap_or(value)
}

/// The type hint of an object dict: the prefix of its own `xsi:type`, then of
/// `Properties/@xsi:type`, then of `Defined_Object/@xsi:type`, then the hint
/// recorded at extraction.
pub fn object_type_namespace(dict: &ObjDict) -> Option<String> {
    if let Some(xsi_type) = dict.attr("xsi:type") {
        return Some(qname_prefix(xsi_type).to_string());
    }
    for wrapper in ["Properties", "Defined_Object"] {
        if let Some(xsi_type) = dict.get_map(wrapper).and_then(|w| w.attr("xsi:type")) {
            return Some(qname_prefix(xsi_type).to_string());
        }
    }
    dict.embedded_type_info().map(str::to_string)
}
