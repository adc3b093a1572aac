//! The STIX/CybOX object importer.
//!
//! ```text
//! START ─► WALK ─► IMPORT_EACH ─► DISPATCH ─► DONE
//!           │          │              │
//!           │          │              └─ deferred sub-documents → registered processors
//!           │          └─ top-level object, then every extracted embedding
//!           └─ XML → object dicts (embedding rules decide what is extracted)
//! ```

use crate::context::{ImportContext, ImportOptions};
use crate::embedding::StixEmbeddings;
use crate::error::ImportError;
use crate::handlers::{default_rules, FactRule, StixFactHooks};
use crate::identity::parse_revision_timestamp;
use crate::openioc::{OpenIocImporter, OPENIOC_PROCESSOR};
use crate::report::{ImportIssue, ImportReport, ObjectOutcome};
use crate::typing::{derive_type, object_type_namespace};
use std::collections::HashMap;
use std::path::Path;
use stixgraph_core::{ArtifactStore, ImporterConfig, NamespaceTable, ObjectRequest, ObjectStore, StoreError};
use stixgraph_xml::{collect_namespaces, xml_to_dict, DeferredSubDocument, EmbeddedObjectRecord};

/// Importer for a sub-format found embedded in a STIX document.
pub trait DeferredProcessor: Send + Sync {
    fn import(
        &self,
        doc: &DeferredSubDocument<'_, '_>,
        ctx: &ImportContext,
        store: &mut dyn ObjectStore,
        artifacts: &mut dyn ArtifactStore,
        report: &mut ImportReport,
    ) -> Result<(), StoreError>;
}

pub struct StixImporter {
    config: ImporterConfig,
    rules: Vec<FactRule>,
    processors: HashMap<String, Box<dyn DeferredProcessor>>,
}

impl Default for StixImporter {
    fn default() -> Self {
        Self::new(ImporterConfig::default())
    }
}

impl StixImporter {
    pub fn new(config: ImporterConfig) -> Self {
        let mut importer = Self {
            config,
            rules: default_rules(),
            processors: HashMap::new(),
        };
        importer.register_processor(OPENIOC_PROCESSOR, Box::new(OpenIocImporter));
        importer
    }

    pub fn config(&self) -> &ImporterConfig {
        &self.config
    }

    /// Register (or replace) the processor for a deferred-format tag.
    pub fn register_processor(
        &mut self,
        tag: impl Into<String>,
        processor: Box<dyn DeferredProcessor>,
    ) -> Option<Box<dyn DeferredProcessor>> {
        self.processors.insert(tag.into(), processor)
    }

    pub fn unregister_processor(&mut self, tag: &str) -> Option<Box<dyn DeferredProcessor>> {
        self.processors.remove(tag)
    }

    pub fn import_file(
        &self,
        path: impl AsRef<Path>,
        options: &ImportOptions,
        store: &mut dyn ObjectStore,
        artifacts: &mut dyn ArtifactStore,
    ) -> Result<ImportReport, ImportError> {
        let xml = std::fs::read_to_string(path.as_ref())?;
        tracing::debug!(path = %path.as_ref().display(), "importing file");
        self.import_str(&xml, options, store, artifacts)
    }

    /// Import one document. Objects that cannot be imported are skipped and
    /// reported; only XML and store failures abort the call.
    pub fn import_str(
        &self,
        xml: &str,
        options: &ImportOptions,
        store: &mut dyn ObjectStore,
        artifacts: &mut dyn ArtifactStore,
    ) -> Result<ImportReport, ImportError> {
        let doc = roxmltree::Document::parse(xml)?;
        let mut namespaces = NamespaceTable::new(self.config.default_namespace_uri.clone());
        collect_namespaces(&doc, &mut namespaces);
        let ctx = ImportContext::new(&self.config, namespaces, options);
        let mut report = ImportReport::default();

        // WALK
        let mut embeddings = StixEmbeddings::new(&ctx);
        let walk = xml_to_dict(doc.root_element(), &mut embeddings);
        report.issues.extend(embeddings.into_issues());

        // IMPORT_EACH
        for record in std::iter::once(&walk.top).chain(walk.embedded.iter()) {
            self.import_object(&ctx, record, store, artifacts, &mut report)?;
        }

        // DISPATCH
        for deferred in &walk.deferred {
            match self.processors.get(&deferred.processor) {
                Some(processor) => processor.import(deferred, &ctx, store, artifacts, &mut report)?,
                None => {
                    tracing::error!(processor = %deferred.processor, "no processor registered; sub-document skipped");
                    report.issues.push(ImportIssue::UnregisteredDeferredProcessor {
                        processor: deferred.processor.clone(),
                    });
                }
            }
        }

        tracing::debug!(
            objects = report.objects.len(),
            issues = report.issues.len(),
            "import finished"
        );
        Ok(report)
    }

    fn import_object(
        &self,
        ctx: &ImportContext,
        record: &EmbeddedObjectRecord,
        store: &mut dyn ObjectStore,
        artifacts: &mut dyn ArtifactStore,
        report: &mut ImportReport,
    ) -> Result<(), StoreError> {
        let dict = &record.dict;
        let type_hint = object_type_namespace(dict);
        let type_info = derive_type(
            &ctx.namespaces,
            dict.namespace_prefix(),
            type_hint.as_deref(),
            &record.element_name,
        );

        let Some(id) = record.id_and_revision.id() else {
            tracing::error!(element = %record.element_name, "object without id; ignored");
            report.issues.push(ImportIssue::MissingIdentifier {
                element: record.element_name.clone(),
            });
            return Ok(());
        };

        let identity = ctx.split_id(id, &mut report.issues).identity();
        let timestamp = record
            .id_and_revision
            .timestamp
            .as_deref()
            .and_then(parse_revision_timestamp)
            .unwrap_or(ctx.timestamp);
        let type_name = type_info.type_name.clone();
        let request = ObjectRequest {
            identity: identity.clone(),
            type_info: type_info.clone(),
            timestamp,
            payload: dict.clone(),
            markings: ctx.markings.clone(),
        };

        let (_, existence) = {
            let mut hooks = StixFactHooks::new(
                ctx,
                &self.rules,
                artifacts,
                &mut report.issues,
                type_info.family,
            );
            store.create_or_update_object(request, &mut hooks)?
        };
        tracing::debug!(identity = %identity, type_name = %type_name, ?existence, "imported object");
        report.objects.push(ObjectOutcome {
            identity,
            type_name,
            existence,
        });
        Ok(())
    }
}
