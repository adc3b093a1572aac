//! Recognition of embedded objects in STIX/CybOX documents.
//!
//! CybOX inlines a lot of content that is better treated as an object of its
//! own (a file attached to an email, the object inside an observable). The
//! rules, in priority order:
//!
//! 1. children of an element matching a configured [`DeferredFormat`] are
//!    handed to a secondary processor (e.g. OpenIOC inside a test mechanism);
//! 2. children with an `id` or `object_reference` are extracted;
//! 3. an `Object` inside an identified `Observable` is extracted under an id
//!    derived from the observable's (`<ns>:object-in-<local>`);
//! 4. nothing else is extracted.
//!
//! [`DeferredFormat`]: stixgraph_core::DeferredFormat

use crate::context::ImportContext;
use crate::identity::id_and_revision;
use crate::openioc;
use crate::report::ImportIssue;
use roxmltree::Node;
use stixgraph_core::IdAndRevision;
use stixgraph_xml::{attribute, element_prefix, has_namespace, Embedding, TypeHint, WalkHooks};

/// Type hint of an extracted child: its first namespaced element child names
/// the object kind. A `Properties` wrapper with an `xsi:type` contributes the
/// prefix of that type instead of its own.
pub fn type_hint(child: Node<'_, '_>) -> TypeHint {
    let Some(grandchild) = child
        .children()
        .find(|n| n.is_element() && has_namespace(*n))
    else {
        return TypeHint::Untyped;
    };
    let hint = match attribute(grandchild, "xsi:type") {
        Some(xsi_type) if grandchild.tag_name().name() == "Properties" => {
            xsi_type.split(':').next().map(str::to_string)
        }
        _ => element_prefix(grandchild).map(str::to_string),
    };
    match hint.filter(|h| !h.is_empty()) {
        Some(h) => TypeHint::Namespace(h),
        None => TypeHint::Untyped,
    }
}

/// Id for an `Object` nested in an `Observable` with id `prefix:local`.
/// `None` unless the parent id has exactly two `:`-separated parts.
pub fn derived_object_id(parent_id: &str) -> Option<String> {
    let parts: Vec<&str> = parent_id.split(':').collect();
    match parts.as_slice() {
        [ns, local] => Some(format!("{ns}:object-in-{local}")),
        _ => None,
    }
}

/// [`WalkHooks`] implementing the STIX/CybOX embedding rules.
pub struct StixEmbeddings<'c> {
    ctx: &'c ImportContext,
    issues: Vec<ImportIssue>,
}

impl<'c> StixEmbeddings<'c> {
    pub fn new(ctx: &'c ImportContext) -> Self {
        Self {
            ctx,
            issues: Vec::new(),
        }
    }

    pub fn into_issues(self) -> Vec<ImportIssue> {
        self.issues
    }

    pub fn should_extract(&mut self, parent: Node<'_, '_>, child: Node<'_, '_>) -> Option<Embedding> {
        // Rule 1: foreign formats
        let parent_name = parent.tag_name().name();
        if let Some(xsi_type) = attribute(parent, "xsi:type") {
            if let Some(format) = self.ctx.config.deferred_format(parent_name, xsi_type) {
                return Some(Embedding::Deferred {
                    processor: format.processor.clone(),
                    embedded_ns: element_prefix(child).map(str::to_string),
                    id_and_revision: openioc::id_and_revision(child),
                });
            }
        }

        // Rule 2: identified children
        if id_and_revision(child).id().is_some() {
            return Some(Embedding::Object {
                type_hint: type_hint(child),
                id_and_revision: None,
            });
        }

        // Rule 3: anonymous object inside an identified observable
        if child.tag_name().name() == "Object" && parent_name == "Observable" {
            let parent_info = id_and_revision(parent);
            let parent_id = parent_info.id()?;
            return match derived_object_id(parent_id) {
                Some(id) => Some(Embedding::Object {
                    type_hint: type_hint(child),
                    id_and_revision: Some(IdAndRevision::new(Some(id), parent_info.timestamp.clone())),
                }),
                None => {
                    tracing::warn!(parent_id, "observable id has no namespace part; object not extracted");
                    self.issues.push(ImportIssue::MalformedDerivedId {
                        parent_id: parent_id.to_string(),
                    });
                    None
                }
            };
        }

        None
    }
}

impl WalkHooks for StixEmbeddings<'_> {
    fn embedding(&mut self, parent: Node<'_, '_>, child: Node<'_, '_>) -> Option<Embedding> {
        self.should_extract(parent, child)
    }

    fn id_and_revision(&self, element: Node<'_, '_>) -> IdAndRevision {
        id_and_revision(element)
    }
}
