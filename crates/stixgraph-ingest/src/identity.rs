//! Identifier and revision extraction for STIX/CybOX elements.

use roxmltree::Node;
use stixgraph_core::IdAndRevision;
use stixgraph_xml::attribute;

pub use stixgraph_core::time::parse_timestamp as parse_revision_timestamp;

/// `id` (or the CybOX 1 `object_reference`) and the non-standard
/// `revision_timestamp` of an element. The regular `timestamp` attribute is
/// never used: elements such as `Action` give it a different meaning.
pub fn id_and_revision(element: Node<'_, '_>) -> IdAndRevision {
    let id = attribute(element, "id")
        .filter(|id| !id.is_empty())
        .or_else(|| attribute(element, "object_reference"))
        .filter(|id| !id.is_empty())
        .map(str::to_string);
    let timestamp = attribute(element, "revision_timestamp").map(str::to_string);
    IdAndRevision::new(id, timestamp)
}
