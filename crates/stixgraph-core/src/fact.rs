//! Facts: normalized `(term, value)` data attached to an information object.
//!
//! An object dict is flattened into [`CandidateFact`]s; each candidate is run
//! through the [`FactHooks`] of the import and ends up
//! as a [`FactParams`] that the store turns into a [`Fact`] row plus a link
//! carrying the candidate's [`NodeId`].

use crate::config::DEFAULT_NAMESPACE_URI;
use crate::identity::IdentityKey;
use crate::store::{ObjectStore, StoreError};
use crate::value::{is_attribute_key, ObjDict, ObjValue};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ============================================================================
// Node positions
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NodeStep {
    /// n-th child element (`N`)
    Element(u32),
    /// n-th item of a repeated element (`L`)
    Item(u32),
    /// n-th attribute (`A`)
    Attribute(u32),
}

impl fmt::Display for NodeStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeStep::Element(i) => write!(f, "N{i:03}"),
            NodeStep::Item(i) => write!(f, "L{i:03}"),
            NodeStep::Attribute(i) => write!(f, "A{i:03}"),
        }
    }
}

/// Position of a fact in the original element tree, e.g. `N001:L000:N000:A000`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(Vec<NodeStep>);

impl NodeId {
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn child(&self, step: NodeStep) -> Self {
        let mut steps = self.0.clone();
        steps.push(step);
        Self(steps)
    }

    pub fn steps(&self) -> &[NodeStep] {
        &self.0
    }

    pub fn depth(&self) -> usize {
        self.0.len()
    }

    pub fn parent(&self) -> Option<NodeId> {
        if self.0.is_empty() {
            return None;
        }
        Some(Self(self.0[..self.0.len() - 1].to_vec()))
    }

    pub fn is_attribute(&self) -> bool {
        matches!(self.0.last(), Some(NodeStep::Attribute(_)))
    }

    /// The element an attribute position belongs to (identity for elements).
    pub fn owner_element(&self) -> NodeId {
        if self.is_attribute() {
            Self(self.0[..self.0.len() - 1].to_vec())
        } else {
            self.clone()
        }
    }

    pub fn is_prefix_of(&self, other: &NodeId) -> bool {
        other.0.starts_with(&self.0)
    }

    pub fn parse(text: &str) -> Option<Self> {
        if text.is_empty() {
            return Some(Self::root());
        }
        text.split(':')
            .map(|part| {
                let (kind, digits) = part.split_at(part.char_indices().nth(1)?.0);
                let n: u32 = digits.parse().ok()?;
                match kind {
                    "N" => Some(NodeStep::Element(n)),
                    "L" => Some(NodeStep::Item(n)),
                    "A" => Some(NodeStep::Attribute(n)),
                    _ => None,
                }
            })
            .collect::<Option<Vec<_>>>()
            .map(Self)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, step) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(":")?;
            }
            write!(f, "{step}")?;
        }
        Ok(())
    }
}

// ============================================================================
// Fact rows
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DatatypeKind {
    /// plain scalar
    NoVocab,
    /// single term of a controlled vocabulary
    VocabSingle,
    /// reference to another information object
    Reference,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FactDatatype {
    pub name: String,
    pub namespace_uri: String,
    pub kind: DatatypeKind,
}

impl FactDatatype {
    pub fn plain() -> Self {
        Self {
            name: "String".to_string(),
            namespace_uri: DEFAULT_NAMESPACE_URI.to_string(),
            kind: DatatypeKind::NoVocab,
        }
    }
}

impl Default for FactDatatype {
    fn default() -> Self {
        Self::plain()
    }
}

/// What a fact holds. A reference fact carries the identity of its target, so
/// "reference without target" cannot be represented.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FactContent {
    Values { values: Vec<String> },
    /// Externalized raw content, stored as a blob under its digest.
    OnDisk { digest: String },
    Reference { target: IdentityKey },
}

impl FactContent {
    pub fn single(value: impl Into<String>) -> Self {
        FactContent::Values {
            values: vec![value.into()],
        }
    }

    pub fn values(&self) -> &[String] {
        match self {
            FactContent::Values { values } => values,
            _ => &[],
        }
    }

    pub fn reference(&self) -> Option<&IdentityKey> {
        match self {
            FactContent::Reference { target } => Some(target),
            _ => None,
        }
    }
}

/// A stored fact. Facts are content-addressed: two objects with an identical
/// fact share one row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fact {
    pub term: String,
    pub attribute: Option<String>,
    pub content: FactContent,
    pub datatype: FactDatatype,
}

impl Fact {
    pub fn is_reference(&self) -> bool {
        self.datatype.kind == DatatypeKind::Reference
    }

    /// First value, for single-valued facts.
    pub fn value(&self) -> Option<&str> {
        self.content.values().first().map(String::as_str)
    }
}

// ============================================================================
// Candidates and creation parameters
// ============================================================================

/// A fact as found in the object dict, before any hook ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateFact {
    /// `/`-joined local element names below the object root
    pub term: String,
    /// set for facts stemming from an XML attribute
    pub attribute: Option<String>,
    pub value: String,
    pub node_id: NodeId,
}

/// Attributes of the element a candidate belongs to, keyed with one leading
/// `@` stripped (so synthesized `@@ns` appears as `@ns`).
pub type AttrInfo = BTreeMap<String, String>;

/// Parameters with which a fact is created; hooks rewrite these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FactParams {
    pub term: String,
    pub attribute: Option<String>,
    pub content: FactContent,
    pub datatype: FactDatatype,
    pub node_id: NodeId,
}

impl FactParams {
    pub fn from_candidate(candidate: &CandidateFact, datatype: FactDatatype) -> Self {
        Self {
            term: candidate.term.clone(),
            attribute: candidate.attribute.clone(),
            content: FactContent::single(candidate.value.clone()),
            datatype,
            node_id: candidate.node_id.clone(),
        }
    }

    pub fn into_parts(self) -> (Fact, NodeId) {
        (
            Fact {
                term: self.term,
                attribute: self.attribute,
                content: self.content,
                datatype: self.datatype,
            },
            self.node_id,
        )
    }
}

// ============================================================================
// Flattening
// ============================================================================

/// Flatten an object dict into candidate facts, each paired with the
/// attributes of its owning element.
pub fn flatten(dict: &ObjDict) -> Vec<(CandidateFact, AttrInfo)> {
    let mut out = Vec::new();
    flatten_dict(dict, "", &NodeId::root(), &mut out);
    out
}

pub fn attr_info(dict: &ObjDict) -> AttrInfo {
    dict.iter()
        .filter(|(k, _)| is_attribute_key(k))
        .filter_map(|(k, v)| Some((k[1..].to_string(), v.as_str()?.to_string())))
        .collect()
}

fn flatten_dict(
    dict: &ObjDict,
    term: &str,
    node: &NodeId,
    out: &mut Vec<(CandidateFact, AttrInfo)>,
) {
    let attrs = attr_info(dict);

    let mut attr_idx = 0u32;
    for (key, value) in dict.iter().filter(|(k, _)| is_attribute_key(k)) {
        if let ObjValue::Scalar(v) = value {
            out.push((
                CandidateFact {
                    term: term.to_string(),
                    attribute: Some(key[1..].to_string()),
                    value: v.clone(),
                    node_id: node.child(NodeStep::Attribute(attr_idx)),
                },
                attrs.clone(),
            ));
        }
        attr_idx += 1;
    }

    if let Some(text) = dict.text() {
        out.push((element_candidate(term, text, node), attrs.clone()));
    }

    let mut child_idx = 0u32;
    for (name, value) in dict.children() {
        let child_term = if term.is_empty() {
            name.clone()
        } else {
            format!("{term}/{name}")
        };
        let child_node = node.child(NodeStep::Element(child_idx));
        match value {
            ObjValue::List(items) => {
                for (i, item) in items.iter().enumerate() {
                    let item_node = child_node.child(NodeStep::Item(i as u32));
                    flatten_value(item, &child_term, &item_node, out);
                }
            }
            other => flatten_value(other, &child_term, &child_node, out),
        }
        child_idx += 1;
    }

    // A leaf without text still yields a fact, so that attribute-only elements
    // (notably references) have something to attach to.
    if dict.text().is_none() && child_idx == 0 && !term.is_empty() {
        out.push((element_candidate(term, "", node), attrs));
    }
}

fn flatten_value(
    value: &ObjValue,
    term: &str,
    node: &NodeId,
    out: &mut Vec<(CandidateFact, AttrInfo)>,
) {
    match value {
        ObjValue::Scalar(s) => out.push((element_candidate(term, s, node), AttrInfo::new())),
        ObjValue::Map(d) => flatten_dict(d, term, node, out),
        ObjValue::List(items) => {
            for (i, item) in items.iter().enumerate() {
                flatten_value(item, term, &node.child(NodeStep::Item(i as u32)), out);
            }
        }
    }
}

fn element_candidate(term: &str, value: &str, node: &NodeId) -> CandidateFact {
    CandidateFact {
        term: term.to_string(),
        attribute: None,
        value: value.to_string(),
        node_id: node.clone(),
    }
}

// ============================================================================
// Materialization
// ============================================================================

/// Per-import decisions taken while turning candidates into facts.
pub trait FactHooks {
    /// Drop an attribute candidate entirely.
    fn ignore_attribute(&self, candidate: &CandidateFact, attrs: &AttrInfo) -> bool;

    /// Datatype for a candidate; `None` keeps the plain default.
    fn extract_datatype(&self, _candidate: &CandidateFact, _attrs: &AttrInfo) -> Option<FactDatatype> {
        None
    }

    /// Rewrite the creation parameters of a fact. May create placeholders in
    /// `store` for references.
    fn handle_fact(
        &mut self,
        candidate: &CandidateFact,
        attrs: &AttrInfo,
        params: &mut FactParams,
        store: &mut dyn ObjectStore,
    ) -> Result<(), StoreError>;
}

/// Hooks that keep every candidate as a plain single-valued fact.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainFacts;

impl FactHooks for PlainFacts {
    fn ignore_attribute(&self, candidate: &CandidateFact, _attrs: &AttrInfo) -> bool {
        candidate
            .attribute
            .as_deref()
            .is_some_and(|a| a.starts_with('@'))
    }

    fn handle_fact(
        &mut self,
        _candidate: &CandidateFact,
        _attrs: &AttrInfo,
        _params: &mut FactParams,
        _store: &mut dyn ObjectStore,
    ) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Turn an object dict into fact parameters: flatten, drop ignored
/// attributes, pick datatypes, run the handlers.
pub fn materialize_facts(
    dict: &ObjDict,
    hooks: &mut dyn FactHooks,
    store: &mut dyn ObjectStore,
) -> Result<Vec<FactParams>, StoreError> {
    let mut out = Vec::new();
    for (candidate, attrs) in flatten(dict) {
        if candidate.attribute.is_some() && hooks.ignore_attribute(&candidate, &attrs) {
            continue;
        }
        let datatype = hooks
            .extract_datatype(&candidate, &attrs)
            .unwrap_or_default();
        let mut params = FactParams::from_candidate(&candidate, datatype);
        hooks.handle_fact(&candidate, &attrs, &mut params, store)?;
        out.push(params);
    }
    Ok(out)
}
