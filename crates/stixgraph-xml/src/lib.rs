//! XML → object dict conversion.
//!
//! [`xml_to_dict`] walks an element tree once. Whenever the injected
//! [`WalkHooks`] recognize a child as an embedded object, the child is cut
//! out into its own [`EmbeddedObjectRecord`] and its place in the parent is
//! taken by a reference leaf (`@@revision_timestamp` is added when the
//! embedding carries one):
//!
//! ```text
//! <indicator:Observable id="example:Observable-1">      Observable: {
//!   <cybox:Object> ... </cybox:Object>            ──►      "@@ns": "indicator",
//! </indicator:Observable>                                  "@idref": "example:Observable-1",
//!                                                          "@@embedded_type_info": "cybox" }
//! ```
//!
//! Children belonging to another sub-format are not converted at all; they are
//! returned as [`DeferredSubDocument`]s pointing into the parsed tree.

use roxmltree::Node;
use std::collections::BTreeMap;
use stixgraph_core::value::{EMBEDDED_TYPE_KEY, NS_KEY, REVISION_TIMESTAMP_KEY, VALUE_KEY};
use stixgraph_core::{IdAndRevision, NamespaceTable, ObjDict, ObjValue};

// ============================================================================
// Element helpers
// ============================================================================

/// Namespace prefix of an element; `None` for unqualified elements and for
/// elements in a default namespace.
pub fn element_prefix<'input>(node: Node<'_, 'input>) -> Option<&'input str> {
    let ns = node.tag_name().namespace()?;
    node.lookup_prefix(ns)
}

/// Whether the element is bound to any namespace (prefixed or default).
pub fn has_namespace(node: Node<'_, '_>) -> bool {
    node.tag_name().namespace().is_some()
}

/// Attributes of an element in document order, under their qualified name
/// (`xsi:type`).
pub fn qualified_attributes<'a>(node: Node<'a, '_>) -> Vec<(String, &'a str)> {
    node.attributes()
        .map(|attr| {
            let prefix = attr.namespace().and_then(|ns| node.lookup_prefix(ns));
            let key = match prefix {
                Some(p) => format!("{p}:{}", attr.name()),
                None => attr.name().to_string(),
            };
            (key, attr.value())
        })
        .collect()
}

/// Attributes of an element keyed by their qualified name.
pub fn attribute_map(node: Node<'_, '_>) -> BTreeMap<String, String> {
    qualified_attributes(node)
        .into_iter()
        .map(|(key, value)| (key, value.to_string()))
        .collect()
}

/// Attribute by qualified name (`"id"`, `"xsi:type"`).
pub fn attribute<'a>(node: Node<'a, '_>, qname: &str) -> Option<&'a str> {
    match qname.split_once(':') {
        None => node.attribute(qname),
        Some((prefix, local)) => {
            let ns = node.lookup_namespace_uri(Some(prefix))?;
            node.attribute((ns, local))
        }
    }
}

/// Trimmed direct text of an element, if any.
fn element_text(node: Node<'_, '_>) -> Option<String> {
    let text: String = node
        .children()
        .filter(|n| n.is_text())
        .filter_map(|n| n.text())
        .collect();
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

/// Add every namespace declared in the document to `table`. A default
/// namespace declared by the document replaces the seeded one.
pub fn collect_namespaces(doc: &roxmltree::Document<'_>, table: &mut NamespaceTable) {
    for node in doc.descendants().filter(|n| n.is_element()) {
        for ns in node.namespaces() {
            table.insert(ns.name().map(str::to_string), ns.uri());
        }
    }
}

// ============================================================================
// Walk
// ============================================================================

/// Type hint of an embedded object: the namespace prefix that tells which
/// kind of object sits inside.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeHint {
    Untyped,
    Namespace(String),
}

impl TypeHint {
    pub fn prefix(&self) -> Option<&str> {
        match self {
            TypeHint::Untyped => None,
            TypeHint::Namespace(p) => Some(p),
        }
    }
}

/// Decision of [`WalkHooks::embedding`] for one child element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Embedding {
    /// Extract the child as an object of its own. `id_and_revision`
    /// overrides what [`WalkHooks::id_and_revision`] would report.
    Object {
        type_hint: TypeHint,
        id_and_revision: Option<IdAndRevision>,
    },
    /// Hand the child to the secondary processor registered under `processor`.
    Deferred {
        processor: String,
        embedded_ns: Option<String>,
        id_and_revision: IdAndRevision,
    },
}

pub trait WalkHooks {
    fn embedding(&mut self, parent: Node<'_, '_>, child: Node<'_, '_>) -> Option<Embedding>;
    fn id_and_revision(&self, element: Node<'_, '_>) -> IdAndRevision;
}

#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddedObjectRecord {
    pub id_and_revision: IdAndRevision,
    pub element_name: String,
    pub dict: ObjDict,
}

#[derive(Debug, Clone)]
pub struct DeferredSubDocument<'a, 'input> {
    pub id_and_revision: IdAndRevision,
    pub processor: String,
    pub embedded_ns: Option<String>,
    pub node: Node<'a, 'input>,
}

#[derive(Debug, Clone)]
pub struct WalkResult<'a, 'input> {
    pub top: EmbeddedObjectRecord,
    /// extracted objects in document (pre-)order
    pub embedded: Vec<EmbeddedObjectRecord>,
    pub deferred: Vec<DeferredSubDocument<'a, 'input>>,
}

/// Convert `root` into its object dict, extracting embedded objects as the
/// hooks decide.
pub fn xml_to_dict<'a, 'input>(
    root: Node<'a, 'input>,
    hooks: &mut dyn WalkHooks,
) -> WalkResult<'a, 'input> {
    let mut walker = Walker {
        hooks,
        embedded: Vec::new(),
        deferred: Vec::new(),
    };
    let dict = walker.convert(root);
    let top = EmbeddedObjectRecord {
        id_and_revision: walker.hooks.id_and_revision(root),
        element_name: root.tag_name().name().to_string(),
        dict,
    };
    WalkResult {
        top,
        embedded: walker.embedded,
        deferred: walker.deferred,
    }
}

/// Plain conversion of an element tree, without any extraction.
pub fn element_to_dict(node: Node<'_, '_>) -> ObjDict {
    let mut dict = element_shell(node);
    for child in node.children().filter(Node::is_element) {
        dict.push_child(child.tag_name().name(), ObjValue::Map(element_to_dict(child)));
    }
    dict
}

/// Namespace, attributes and text of an element.
fn element_shell(node: Node<'_, '_>) -> ObjDict {
    let mut dict = ObjDict::new();
    if let Some(prefix) = element_prefix(node) {
        dict.insert(NS_KEY, prefix);
    }
    for (name, value) in qualified_attributes(node) {
        dict.set_attr(&name, value);
    }
    if let Some(text) = element_text(node) {
        dict.insert(VALUE_KEY, text);
    }
    dict
}

fn reference_leaf(child: Node<'_, '_>, id_and_revision: &IdAndRevision, hint: Option<&str>) -> ObjDict {
    let mut leaf = ObjDict::new();
    if let Some(prefix) = element_prefix(child) {
        leaf.insert(NS_KEY, prefix);
    }
    if let Some(id) = id_and_revision.id() {
        leaf.set_attr("idref", id);
    }
    if let Some(hint) = hint {
        leaf.insert(EMBEDDED_TYPE_KEY, hint);
    }
    if let Some(ts) = &id_and_revision.timestamp {
        leaf.insert(REVISION_TIMESTAMP_KEY, ts.clone());
    }
    leaf
}

struct Walker<'h, 'a, 'input> {
    hooks: &'h mut dyn WalkHooks,
    embedded: Vec<EmbeddedObjectRecord>,
    deferred: Vec<DeferredSubDocument<'a, 'input>>,
}

impl<'h, 'a, 'input> Walker<'h, 'a, 'input> {
    fn convert(&mut self, node: Node<'a, 'input>) -> ObjDict {
        let mut dict = element_shell(node);
        for child in node.children().filter(Node::is_element) {
            let name = child.tag_name().name();
            match self.hooks.embedding(node, child) {
                None => {
                    let child_dict = self.convert(child);
                    dict.push_child(name, ObjValue::Map(child_dict));
                }
                Some(Embedding::Object {
                    type_hint,
                    id_and_revision,
                }) => {
                    let id_and_revision =
                        id_and_revision.unwrap_or_else(|| self.hooks.id_and_revision(child));
                    let hint = type_hint.prefix();
                    match hint {
                        Some(h) => tracing::debug!(element = name, hint = h, "found embedding type info"),
                        None => tracing::debug!(element = name, "embedding without type info"),
                    }

                    // Reserve the slot first so records come out in pre-order.
                    let slot = self.embedded.len();
                    self.embedded.push(EmbeddedObjectRecord {
                        id_and_revision: id_and_revision.clone(),
                        element_name: name.to_string(),
                        dict: ObjDict::new(),
                    });
                    let mut child_dict = self.convert(child);
                    if let Some(h) = hint {
                        child_dict.insert(EMBEDDED_TYPE_KEY, h);
                    }
                    self.embedded[slot].dict = child_dict;

                    if id_and_revision.id().is_some() {
                        let leaf = reference_leaf(child, &id_and_revision, hint);
                        dict.push_child(name, ObjValue::Map(leaf));
                    }
                }
                Some(Embedding::Deferred {
                    processor,
                    embedded_ns,
                    id_and_revision,
                }) => {
                    if id_and_revision.id().is_some() {
                        let leaf = reference_leaf(child, &id_and_revision, embedded_ns.as_deref());
                        dict.push_child(name, ObjValue::Map(leaf));
                    }
                    self.deferred.push(DeferredSubDocument {
                        id_and_revision,
                        processor,
                        embedded_ns,
                        node: child,
                    });
                }
            }
        }
        dict
    }
}

#[cfg(test)]
mod tests;
