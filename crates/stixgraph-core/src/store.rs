//! Store contracts.
//!
//! The importer writes through two collaborators:
//!
//! ```text
//! StixImporter ──► ObjectStore    (objects, revisions, facts, placeholders)
//!              └─► ArtifactStore  (externalized raw content, "<digest>.blob")
//! ```
//!
//! Reference implementations live in `stixgraph-store`.

use crate::fact::{Fact, FactHooks, NodeId};
use crate::identity::IdentityKey;
use crate::object::{Existence, FactId, InformationObject, ObjectId, ObjectRequest};
use chrono::{DateTime, Utc};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("artifact `{name}`: {message}")]
    Artifact { name: String, message: String },
    #[error("store invariant violated: {0}")]
    Invariant(String),
}

/// A fact of an object together with the position it was found at.
#[derive(Debug, Clone, Copy)]
pub struct ObjectFact<'a> {
    pub fact_id: FactId,
    pub fact: &'a Fact,
    pub node_id: &'a NodeId,
}

pub trait ObjectStore {
    /// Create an object or a revision of it, following the revision rules of
    /// [`Existence`]. When data is written, the payload's facts are
    /// materialized through `hooks` and linked to the new revision.
    fn create_or_update_object(
        &mut self,
        request: ObjectRequest,
        hooks: &mut dyn FactHooks,
    ) -> Result<(ObjectId, Existence), StoreError>;

    /// Latest revision of `identity`, or a fresh placeholder stamped with
    /// `timestamp` when the identity is unknown.
    fn get_or_create_placeholder(
        &mut self,
        identity: &IdentityKey,
        timestamp: DateTime<Utc>,
    ) -> Result<(ObjectId, Existence), StoreError>;

    fn object(&self, id: ObjectId) -> Option<&InformationObject>;

    fn latest(&self, identity: &IdentityKey) -> Option<&InformationObject>;

    /// All revisions of `identity`, oldest first.
    fn revisions(&self, identity: &IdentityKey) -> Vec<&InformationObject>;

    fn fact(&self, id: FactId) -> Option<&Fact>;

    fn identities(&self) -> Vec<&IdentityKey>;

    fn object_facts(&self, id: ObjectId) -> Vec<ObjectFact<'_>> {
        let Some(object) = self.object(id) else {
            return Vec::new();
        };
        object
            .facts
            .iter()
            .filter_map(|link| {
                Some(ObjectFact {
                    fact_id: link.fact,
                    fact: self.fact(link.fact)?,
                    node_id: &link.node_id,
                })
            })
            .collect()
    }
}

/// Named binary artifacts.
pub trait ArtifactStore {
    fn exists(&self, name: &str) -> Result<bool, StoreError>;
    fn save(&mut self, name: &str, content: &[u8]) -> Result<(), StoreError>;
    fn delete(&mut self, name: &str) -> Result<(), StoreError>;
    fn load(&self, name: &str) -> Result<Vec<u8>, StoreError>;
}
