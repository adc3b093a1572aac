//! Secondary processor for OpenIOC 2010 documents embedded in STIX test
//! mechanisms.
//!
//! An `ioc` element becomes a single information object of family
//! `ioc.mandiant.com`, type `ioc`. Its identity is resolved the same way as
//! the reference the embedding parent holds, so the placeholder created for
//! that reference is filled here.

use crate::context::ImportContext;
use crate::identity::parse_revision_timestamp;
use crate::importer::DeferredProcessor;
use crate::report::{ImportIssue, ImportReport, ObjectOutcome};
use roxmltree::Node;
use stixgraph_core::{
    ArtifactStore, AttrInfo, CandidateFact, FactHooks, FactParams, IdAndRevision, ObjectRequest,
    ObjectStore, StoreError, TypeInfo,
};
use stixgraph_xml::{attribute, element_to_dict, DeferredSubDocument};

pub const OPENIOC_FAMILY: &str = "ioc.mandiant.com";
pub const OPENIOC_PROCESSOR: &str = "OpenIOC2010";

/// `id` and `last-modified` of an OpenIOC element.
pub fn id_and_revision(element: Node<'_, '_>) -> IdAndRevision {
    IdAndRevision::new(
        attribute(element, "id")
            .filter(|id| !id.is_empty())
            .map(str::to_string),
        attribute(element, "last-modified").map(str::to_string),
    )
}

/// Keeps every OpenIOC value except synthesized attributes and the
/// attributes already consumed as identity and revision.
struct IocFacts;

impl FactHooks for IocFacts {
    fn ignore_attribute(&self, candidate: &CandidateFact, _attrs: &AttrInfo) -> bool {
        matches!(
            candidate.attribute.as_deref(),
            Some(a) if a.starts_with('@') || a == "id" || a == "last-modified"
        )
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

#[derive(Debug, Default, Clone, Copy)]
pub struct OpenIocImporter;

impl DeferredProcessor for OpenIocImporter {
    fn import(
        &self,
        doc: &DeferredSubDocument<'_, '_>,
        ctx: &ImportContext,
        store: &mut dyn ObjectStore,
        _artifacts: &mut dyn ArtifactStore,
        report: &mut ImportReport,
    ) -> Result<(), StoreError> {
        let element = doc.node.tag_name().name();
        let Some(id) = doc.id_and_revision.id() else {
            tracing::error!(element, "OpenIOC document without id; ignored");
            report.issues.push(ImportIssue::MissingIdentifier {
                element: element.to_string(),
            });
            return Ok(());
        };

        let identity = ctx.split_id(id, &mut report.issues).identity();
        let timestamp = doc
            .id_and_revision
            .timestamp
            .as_deref()
            .and_then(parse_revision_timestamp)
            .unwrap_or(ctx.timestamp);
        let type_info = TypeInfo {
            family: OPENIOC_FAMILY.to_string(),
            family_revision: String::new(),
            type_name: element.to_string(),
            type_namespace_uri: doc.node.tag_name().namespace().unwrap_or("").to_string(),
            type_revision: String::new(),
        };
        let request = ObjectRequest {
            identity: identity.clone(),
            type_info,
            timestamp,
            payload: element_to_dict(doc.node),
            markings: ctx.markings.clone(),
        };

        let (_, existence) = store.create_or_update_object(request, &mut IocFacts)?;
        tracing::debug!(identity = %identity, ?existence, "imported OpenIOC document");
        report.objects.push(ObjectOutcome {
            identity,
            type_name: element.to_string(),
            existence,
        });
        Ok(())
    }
}
