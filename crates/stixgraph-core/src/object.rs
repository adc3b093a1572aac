//! Information objects and their revisions.

use crate::fact::NodeId;
use crate::identity::IdentityKey;
use crate::value::ObjDict;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Index of an object revision in a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId(pub usize);

/// Index of a (deduplicated) fact row in a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FactId(pub usize);

/// Family, type and revision an object was classified as. Unknown parts are
/// empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeInfo {
    pub family: String,
    pub family_revision: String,
    pub type_name: String,
    pub type_namespace_uri: String,
    pub type_revision: String,
}

/// Outcome of storing an object or looking up a placeholder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Existence {
    /// identity was unknown
    Created,
    /// latest revision was a placeholder and now holds data
    FilledPlaceholder,
    /// a revision with the exact timestamp already exists; nothing changed
    SameRevision,
    /// strictly newer than the latest revision
    NewRevision,
    /// older than the latest revision; ignored
    StaleRevision,
    /// placeholder lookup found an existing object
    Existing,
}

impl Existence {
    /// Whether the call wrote object data (and therefore facts).
    pub fn wrote_data(self) -> bool {
        matches!(
            self,
            Existence::Created | Existence::FilledPlaceholder | Existence::NewRevision
        )
    }
}

/// A fact attached to an object revision at a position of its payload.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FactLink {
    pub fact: FactId,
    pub node_id: NodeId,
}

/// One revision of an information object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InformationObject {
    pub id: ObjectId,
    pub identity: IdentityKey,
    pub type_info: TypeInfo,
    pub timestamp: DateTime<Utc>,
    /// the object dict; `None` for placeholders
    pub payload: Option<ObjDict>,
    pub placeholder: bool,
    pub markings: Vec<IdentityKey>,
    pub facts: Vec<FactLink>,
}

/// What an importer hands to the store for one object.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectRequest {
    pub identity: IdentityKey,
    pub type_info: TypeInfo,
    pub timestamp: DateTime<Utc>,
    pub payload: ObjDict,
    pub markings: Vec<IdentityKey>,
}
