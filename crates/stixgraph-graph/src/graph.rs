//! Object graph: one node per identity, one edge per distinct reference.

use serde::Serialize;
use std::collections::{BTreeSet, HashMap, VecDeque};
use stixgraph_core::{IdentityKey, InformationObject, ObjectStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeIndex(pub usize);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphNode {
    pub identity: IdentityKey,
    pub type_name: String,
    pub family: String,
    pub placeholder: bool,
}

impl GraphNode {
    pub fn from_object(object: &InformationObject) -> Self {
        Self {
            identity: object.identity.clone(),
            type_name: object.type_info.type_name.clone(),
            family: object.type_info.family.clone(),
            placeholder: object.placeholder,
        }
    }
}

/// Directed graph over an arena of nodes. Removed nodes leave a hole so
/// indices stay stable.
#[derive(Debug, Clone, Default)]
pub struct FactGraph {
    nodes: Vec<Option<GraphNode>>,
    index: HashMap<IdentityKey, NodeIndex>,
    edges: BTreeSet<(NodeIndex, NodeIndex)>,
}

impl FactGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node, or return the index of the node with the same identity.
    pub fn add_node(&mut self, node: GraphNode) -> NodeIndex {
        if let Some(ix) = self.index.get(&node.identity) {
            return *ix;
        }
        let ix = NodeIndex(self.nodes.len());
        self.index.insert(node.identity.clone(), ix);
        self.nodes.push(Some(node));
        ix
    }

    pub fn node(&self, ix: NodeIndex) -> Option<&GraphNode> {
        self.nodes.get(ix.0).and_then(Option::as_ref)
    }

    pub fn index_of(&self, identity: &IdentityKey) -> Option<NodeIndex> {
        self.index.get(identity).copied()
    }

    pub fn contains(&self, ix: NodeIndex) -> bool {
        self.node(ix).is_some()
    }

    /// Add an edge between two live nodes. Returns `false` when the edge
    /// already exists or an endpoint is missing.
    pub fn add_edge(&mut self, from: NodeIndex, to: NodeIndex) -> bool {
        if !self.contains(from) || !self.contains(to) {
            return false;
        }
        self.edges.insert((from, to))
    }

    pub fn remove_edge(&mut self, from: NodeIndex, to: NodeIndex) -> bool {
        self.edges.remove(&(from, to))
    }

    pub fn has_edge(&self, from: NodeIndex, to: NodeIndex) -> bool {
        self.edges.contains(&(from, to))
    }

    /// Remove a node with all its edges.
    pub fn remove_node(&mut self, ix: NodeIndex) -> Option<GraphNode> {
        let node = self.nodes.get_mut(ix.0)?.take()?;
        self.index.remove(&node.identity);
        self.edges.retain(|(from, to)| *from != ix && *to != ix);
        Some(node)
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeIndex, &GraphNode)> {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(i, n)| n.as_ref().map(|n| (NodeIndex(i), n)))
    }

    pub fn edges(&self) -> impl Iterator<Item = (NodeIndex, NodeIndex)> + '_ {
        self.edges.iter().copied()
    }

    pub fn successors(&self, ix: NodeIndex) -> Vec<NodeIndex> {
        self.edges
            .range((ix, NodeIndex(0))..=(ix, NodeIndex(usize::MAX)))
            .map(|(_, to)| *to)
            .collect()
    }

    pub fn predecessors(&self, ix: NodeIndex) -> Vec<NodeIndex> {
        self.edges
            .iter()
            .filter(|(_, to)| *to == ix)
            .map(|(from, _)| *from)
            .collect()
    }

    pub fn out_degree(&self, ix: NodeIndex) -> usize {
        self.successors(ix).len()
    }

    pub fn in_degree(&self, ix: NodeIndex) -> usize {
        self.edges.iter().filter(|(_, to)| *to == ix).count()
    }

    pub fn node_count(&self) -> usize {
        self.index.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Identities at both ends of every edge, for assertions and export.
    pub fn identity_edges(&self) -> Vec<(&IdentityKey, &IdentityKey)> {
        self.edges
            .iter()
            .filter_map(|(from, to)| Some((&self.node(*from)?.identity, &self.node(*to)?.identity)))
            .collect()
    }

    // ========================================================================
    // Construction from a store
    // ========================================================================

    /// Objects reachable from `root` through reference facts of latest
    /// revisions, at most `max_depth` references away (`None`: unbounded).
    pub fn from_store(store: &dyn ObjectStore, root: &IdentityKey, max_depth: Option<usize>) -> Self {
        let mut graph = Self::new();
        let Some(root_object) = store.latest(root) else {
            tracing::debug!(root = %root, "root object not in store; empty graph");
            return graph;
        };
        let root_ix = graph.add_node(GraphNode::from_object(root_object));

        let mut queue = VecDeque::from([(root_ix, root_object, 0usize)]);
        while let Some((from, object, depth)) = queue.pop_front() {
            if max_depth.is_some_and(|max| depth >= max) {
                continue;
            }
            for target in reference_targets(store, object) {
                let known = graph.index_of(&target.identity);
                let to = graph.add_node(GraphNode::from_object(target));
                graph.add_edge(from, to);
                if known.is_none() {
                    queue.push_back((to, target, depth + 1));
                }
            }
        }
        tracing::debug!(
            root = %root,
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "built fact graph"
        );
        graph
    }

    /// Every identity in the store with all its references.
    pub fn from_store_all(store: &dyn ObjectStore) -> Self {
        let mut graph = Self::new();
        let objects: Vec<&InformationObject> = store
            .identities()
            .into_iter()
            .filter_map(|identity| store.latest(identity))
            .collect();
        for object in &objects {
            graph.add_node(GraphNode::from_object(object));
        }
        for object in &objects {
            let from = graph.add_node(GraphNode::from_object(object));
            for target in reference_targets(store, object) {
                let to = graph.add_node(GraphNode::from_object(target));
                graph.add_edge(from, to);
            }
        }
        graph
    }
}

/// Latest revisions of the objects referenced by `object`, in fact order.
fn reference_targets<'s>(store: &'s dyn ObjectStore, object: &InformationObject) -> Vec<&'s InformationObject> {
    store
        .object_facts(object.id)
        .into_iter()
        .filter_map(|f| f.fact.content.reference().cloned())
        .filter_map(|identity| {
            let target = store.latest(&identity);
            if target.is_none() {
                tracing::warn!(from = %object.identity, to = %identity, "reference to unknown object");
            }
            target
        })
        .collect()
}
