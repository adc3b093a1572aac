//! Graph postprocessors: pure transforms applied to a finished [`FactGraph`].

use crate::graph::{FactGraph, NodeIndex};

pub trait GraphPostprocessor {
    fn name(&self) -> &'static str;
    fn process(&self, graph: &mut FactGraph);
}

/// Postprocessors applied to every rendered graph, in order.
pub fn default_postprocessors() -> Vec<Box<dyn GraphPostprocessor>> {
    vec![Box::new(ObservableMerge::default())]
}

pub fn run_postprocessors(graph: &mut FactGraph, processors: &[Box<dyn GraphPostprocessor>]) {
    for processor in processors {
        let (nodes, edges) = (graph.node_count(), graph.edge_count());
        processor.process(graph);
        tracing::debug!(
            processor = processor.name(),
            nodes_before = nodes,
            nodes_after = graph.node_count(),
            edges_before = edges,
            edges_after = graph.edge_count(),
            "graph postprocessor applied"
        );
    }
}

/// Elides observable wrappers that point at exactly one non-observable
/// object:
///
/// ```text
/// Indicator ──► Observable ──► EmailMessageObject
///     becomes
/// Indicator ──────────────────► EmailMessageObject
/// ```
///
/// Wrappers are classified once, on the edges as they were before any
/// rewrite; a wrapper with several successors is left alone.
#[derive(Debug, Clone)]
pub struct ObservableMerge {
    /// substring of the type name marking an observable
    pub marker: String,
}

impl Default for ObservableMerge {
    fn default() -> Self {
        Self {
            marker: "Observable".to_string(),
        }
    }
}

struct Wrapper {
    node: NodeIndex,
    successor: NodeIndex,
    incoming: Vec<NodeIndex>,
}

impl ObservableMerge {
    fn is_observable(&self, graph: &FactGraph, ix: NodeIndex) -> bool {
        graph
            .node(ix)
            .is_some_and(|n| n.type_name.contains(&self.marker))
    }

    fn wrappers(&self, graph: &FactGraph) -> Vec<Wrapper> {
        graph
            .nodes()
            .filter(|(ix, _)| self.is_observable(graph, *ix))
            .filter_map(|(ix, _)| match graph.successors(ix).as_slice() {
                [successor] if !self.is_observable(graph, *successor) => Some(Wrapper {
                    node: ix,
                    successor: *successor,
                    incoming: graph.predecessors(ix),
                }),
                _ => None,
            })
            .collect()
    }
}

impl GraphPostprocessor for ObservableMerge {
    fn name(&self) -> &'static str {
        "observable_merge"
    }

    fn process(&self, graph: &mut FactGraph) {
        let wrappers = self.wrappers(graph);

        for wrapper in &wrappers {
            for from in &wrapper.incoming {
                graph.add_edge(*from, wrapper.successor);
                graph.remove_edge(*from, wrapper.node);
            }
            graph.remove_edge(wrapper.node, wrapper.successor);
        }

        for wrapper in &wrappers {
            if graph.in_degree(wrapper.node) == 0 {
                graph.remove_node(wrapper.node);
            }
        }
    }
}
