//! Graph views over imported information objects.
//!
//! ```text
//! ObjectStore ──► FactGraph::from_store ──► [GraphPostprocessor…] ──► FactGraph
//!      │               (reference facts          ObservableMerge
//!      │                of latest revisions)
//!      └────────► FactDetails ──► siblings / ancestor attributes / actionables
//! ```

pub mod details;
pub mod graph;
pub mod postprocess;


pub use details::{Actionable, ActionableKind, DetailFact, FactDetails};
pub use graph::{FactGraph, GraphNode, NodeIndex};
pub use postprocess::{default_postprocessors, run_postprocessors, GraphPostprocessor, ObservableMerge};
