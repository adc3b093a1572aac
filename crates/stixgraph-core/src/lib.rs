//! stixgraph core data model.
//!
//! Structured threat-intelligence documents (STIX, CybOX, OpenIOC) are
//! imported as *information objects*, each carrying a set of normalized
//! *facts*:
//!
//! ```text
//! XML element ──► ObjDict ──► CandidateFact* ──► FactHooks ──► Fact + NodeId
//!                   │
//!                   └─► InformationObject (identity, type, revision)
//! ```
//!
//! This crate holds the model and the contracts; parsing, the STIX rules and
//! the stores live in sibling crates.

pub mod config;
pub mod digest;
pub mod fact;
pub mod identity;
pub mod namespace;
pub mod object;
pub mod store;
pub mod time;
pub mod value;

pub use config::{ConfigError, DeferredFormat, ImporterConfig, DEFAULT_NAMESPACE_URI};
pub use fact::{
    flatten, materialize_facts, AttrInfo, CandidateFact, DatatypeKind, Fact, FactContent,
    FactDatatype, FactHooks, FactParams, NodeId, NodeStep, PlainFacts,
};
pub use identity::{split_qname, IdAndRevision, IdentityKey, QualifiedId};
pub use namespace::{parse_namespace_uri, NamespaceInfo, NamespaceResolver, NamespaceTable};
pub use object::{
    Existence, FactId, FactLink, InformationObject, ObjectId, ObjectRequest, TypeInfo,
};
pub use store::{ArtifactStore, ObjectFact, ObjectStore, StoreError};
pub use value::{ObjDict, ObjValue, EMBEDDED_TYPE_KEY, NS_KEY, REVISION_TIMESTAMP_KEY, VALUE_KEY};
