//! In-memory object and fact store with revision semantics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use stixgraph_core::{
    materialize_facts, Existence, Fact, FactHooks, FactId, FactLink, IdentityKey,
    InformationObject, ObjectId, ObjectRequest, ObjectStore, StoreError, TypeInfo,
};

/// Row counts of a [`MemoryStore`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    pub identities: usize,
    /// object revisions, placeholders included
    pub objects: usize,
    pub placeholders: usize,
    pub facts: usize,
    pub fact_links: usize,
    pub marking_links: usize,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    objects: Vec<InformationObject>,
    /// revisions per identity, oldest first
    revisions: BTreeMap<IdentityKey, Vec<ObjectId>>,
    facts: Vec<Fact>,
    fact_index: HashMap<Fact, FactId>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> StoreStats {
        StoreStats {
            identities: self.revisions.len(),
            objects: self.objects.len(),
            placeholders: self.objects.iter().filter(|o| o.placeholder).count(),
            facts: self.facts.len(),
            fact_links: self.objects.iter().map(|o| o.facts.len()).sum(),
            marking_links: self.objects.iter().map(|o| o.markings.len()).sum(),
        }
    }

    /// Every stored revision, in creation order.
    pub fn objects(&self) -> impl Iterator<Item = &InformationObject> {
        self.objects.iter()
    }

    /// Latest revision of every identity.
    pub fn latest_objects(&self) -> impl Iterator<Item = &InformationObject> {
        self.revisions
            .values()
            .filter_map(|ids| ids.last())
            .map(|id| &self.objects[id.0])
    }

    fn latest_id(&self, identity: &IdentityKey) -> Option<ObjectId> {
        self.revisions.get(identity).and_then(|ids| ids.last().copied())
    }

    fn push_object(&mut self, object: InformationObject) -> ObjectId {
        let id = ObjectId(self.objects.len());
        let identity = object.identity.clone();
        self.objects.push(InformationObject { id, ..object });
        self.revisions.entry(identity).or_default().push(id);
        id
    }

    fn intern_fact(&mut self, fact: Fact) -> FactId {
        if let Some(id) = self.fact_index.get(&fact) {
            return *id;
        }
        let id = FactId(self.facts.len());
        self.facts.push(fact.clone());
        self.fact_index.insert(fact, id);
        id
    }

    fn existence_for(&self, request: &ObjectRequest) -> (Option<ObjectId>, Existence) {
        let Some(ids) = self.revisions.get(&request.identity) else {
            return (None, Existence::Created);
        };
        let Some(&latest) = ids.last() else {
            return (None, Existence::Created);
        };
        let latest_obj = &self.objects[latest.0];
        if latest_obj.placeholder {
            return (Some(latest), Existence::FilledPlaceholder);
        }
        if let Some(same) = ids
            .iter()
            .find(|id| self.objects[id.0].timestamp == request.timestamp)
        {
            return (Some(*same), Existence::SameRevision);
        }
        if request.timestamp > latest_obj.timestamp {
            (Some(latest), Existence::NewRevision)
        } else {
            (Some(latest), Existence::StaleRevision)
        }
    }
}

impl ObjectStore for MemoryStore {
    fn create_or_update_object(
        &mut self,
        request: ObjectRequest,
        hooks: &mut dyn FactHooks,
    ) -> Result<(ObjectId, Existence), StoreError> {
        let (existing, existence) = self.existence_for(&request);
        let payload = request.payload.clone();

        let id = match (existence, existing) {
            (Existence::SameRevision | Existence::StaleRevision, Some(id)) => {
                tracing::debug!(identity = %request.identity, ?existence, "object left unchanged");
                return Ok((id, existence));
            }
            (Existence::FilledPlaceholder, Some(id)) => {
                let object = &mut self.objects[id.0];
                object.type_info = request.type_info;
                object.timestamp = request.timestamp;
                object.payload = Some(request.payload);
                object.placeholder = false;
                object.markings = request.markings;
                id
            }
            (Existence::Created | Existence::NewRevision, _) => self.push_object(InformationObject {
                id: ObjectId(0),
                identity: request.identity.clone(),
                type_info: request.type_info,
                timestamp: request.timestamp,
                payload: Some(request.payload),
                placeholder: false,
                markings: request.markings,
                facts: Vec::new(),
            }),
            (other, _) => {
                return Err(StoreError::Invariant(format!(
                    "unexpected existence {other:?} for {}",
                    request.identity
                )))
            }
        };
        tracing::debug!(identity = %request.identity, ?existence, "object stored");

        // The object is registered before its facts are materialized, so a
        // self-reference resolves to it instead of a new placeholder.
        let params = materialize_facts(&payload, hooks, self)?;
        let links: Vec<FactLink> = params
            .into_iter()
            .map(|p| {
                let (fact, node_id) = p.into_parts();
                FactLink {
                    fact: self.intern_fact(fact),
                    node_id,
                }
            })
            .collect();
        self.objects[id.0].facts = links;

        Ok((id, existence))
    }

    fn get_or_create_placeholder(
        &mut self,
        identity: &IdentityKey,
        timestamp: DateTime<Utc>,
    ) -> Result<(ObjectId, Existence), StoreError> {
        if let Some(id) = self.latest_id(identity) {
            return Ok((id, Existence::Existing));
        }
        let id = self.push_object(InformationObject {
            id: ObjectId(0),
            identity: identity.clone(),
            type_info: TypeInfo::default(),
            timestamp,
            payload: None,
            placeholder: true,
            markings: Vec::new(),
            facts: Vec::new(),
        });
        tracing::debug!(identity = %identity, "created placeholder");
        Ok((id, Existence::Created))
    }

    fn object(&self, id: ObjectId) -> Option<&InformationObject> {
        self.objects.get(id.0)
    }

    fn latest(&self, identity: &IdentityKey) -> Option<&InformationObject> {
        self.latest_id(identity).and_then(|id| self.objects.get(id.0))
    }

    fn revisions(&self, identity: &IdentityKey) -> Vec<&InformationObject> {
        self.revisions
            .get(identity)
            .map(|ids| ids.iter().filter_map(|id| self.objects.get(id.0)).collect())
            .unwrap_or_default()
    }

    fn fact(&self, id: FactId) -> Option<&Fact> {
        self.facts.get(id.0)
    }

    fn identities(&self) -> Vec<&IdentityKey> {
        self.revisions.keys().collect()
    }
}
