//! Integration tests for the complete stixgraph pipeline
//!
//! These tests verify end-to-end functionality across crates:
//! - XML → Importer → MemoryStore (revision semantics, placeholders)
//! - MemoryStore → FactGraph → ObservableMerge
//! - Shared store with concurrent importers
//!
//! Run with: cargo test --test integration_tests

use anyhow::Result;
use chrono::{DateTime, TimeZone, Utc};
use std::thread;
use stixgraph_core::{Existence, IdentityKey, ImporterConfig, ObjectStore};
use stixgraph_graph::{default_postprocessors, run_postprocessors, FactDetails, FactGraph};
use stixgraph_ingest::{ImportOptions, ImportReport, StixImporter};
use stixgraph_store::{FsArtifactStore, MemoryArtifactStore, MemoryStore, SharedStore, StoreStats};
use tempfile::tempdir;

const PHISHING: &str = include_str!("data/stix_phishing_indicator.xml");

fn init_logging() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn at(day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2014, 3, day, 9, 30, 0).unwrap()
}

fn import_at(store: &mut MemoryStore, xml: &str, day: u32) -> Result<ImportReport> {
    let mut artifacts = MemoryArtifactStore::new();
    let options = ImportOptions {
        timestamp: Some(at(day)),
        ..ImportOptions::default()
    };
    Ok(StixImporter::default().import_str(xml, &options, store, &mut artifacts)?)
}

fn example(uid: &str) -> IdentityKey {
    IdentityKey::new("http://example.com/", uid)
}

// ============================================================================
// Phishing indicator end to end
// ============================================================================

#[test]
fn test_phishing_indicator_end_to_end() -> Result<()> {
    init_logging();
    let mut store = MemoryStore::new();
    let report = import_at(&mut store, PHISHING, 1)?;

    assert_eq!(report.objects.len(), 4);
    assert!(report.issues.is_empty());
    assert_eq!(
        store.stats(),
        StoreStats {
            identities: 4,
            objects: 4,
            placeholders: 0,
            facts: 13,
            fact_links: 13,
            marking_links: 0,
        }
    );

    let references = store
        .latest_objects()
        .flat_map(|o| store.object_facts(o.id))
        .filter(|f| f.fact.is_reference())
        .count();
    assert_eq!(references, 3);
    Ok(())
}

#[test]
fn test_reimport_same_timestamp_is_idempotent() -> Result<()> {
    let mut store = MemoryStore::new();
    import_at(&mut store, PHISHING, 1)?;
    let first = store.stats();

    let report = import_at(&mut store, PHISHING, 1)?;
    assert!(!report.changed());
    assert_eq!(store.stats(), first);
    Ok(())
}

#[test]
fn test_reimport_later_timestamp_adds_revisions_not_facts() -> Result<()> {
    let mut store = MemoryStore::new();
    import_at(&mut store, PHISHING, 1)?;
    let first = store.stats();

    let report = import_at(&mut store, PHISHING, 2)?;
    assert_eq!(report.count(Existence::NewRevision), 4);

    let second = store.stats();
    assert_eq!(second.identities, first.identities);
    assert_eq!(second.objects, first.objects + 4);
    assert_eq!(second.fact_links, first.fact_links + 13);
    assert_eq!(second.facts, first.facts);

    // the older run is now stale
    let report = import_at(&mut store, PHISHING, 1)?;
    assert_eq!(report.count(Existence::StaleRevision), 4);
    assert!(!report.changed());
    assert_eq!(store.stats(), second);
    Ok(())
}

// ============================================================================
// Placeholders across documents, graph
// ============================================================================

const REFERRING: &str = r#"<stix:STIX_Package
    xmlns:stix="http://stix.mitre.org/stix-1"
    xmlns:indicator="http://stix.mitre.org/Indicator-2"
    xmlns:example="http://example.com/" id="example:Package-A">
  <stix:Indicators>
    <stix:Indicator idref="example:Indicator-1"/>
  </stix:Indicators>
</stix:STIX_Package>"#;

#[test]
fn test_placeholder_resolution_and_graph() -> Result<()> {
    init_logging();
    let mut store = MemoryStore::new();

    import_at(&mut store, REFERRING, 1)?;
    assert!(store.latest(&example("Indicator-1")).is_some_and(|o| o.placeholder));

    import_at(&mut store, PHISHING, 1)?;
    let indicator = store.latest(&example("Indicator-1")).expect("indicator");
    assert!(!indicator.placeholder);
    assert_eq!(store.revisions(&example("Indicator-1")).len(), 1);
    assert_eq!(store.stats().placeholders, 0);

    let mut graph = FactGraph::from_store(&store, &example("Package-A"), None);
    assert_eq!(graph.node_count(), 4);
    run_postprocessors(&mut graph, &default_postprocessors());

    let mut edges: Vec<(String, String)> = graph
        .identity_edges()
        .into_iter()
        .map(|(a, b)| (a.uid.clone(), b.uid.clone()))
        .collect();
    edges.sort();
    assert_eq!(
        edges,
        vec![
            ("Indicator-1".to_string(), "Object-1".to_string()),
            ("Package-A".to_string(), "Indicator-1".to_string()),
        ]
    );

    let details = FactDetails::from_store(&store, [&example("Object-1")]);
    assert_eq!(details.email_subjects().len(), 1);
    Ok(())
}

// ============================================================================
// Concurrency
// ============================================================================

#[test]
fn test_concurrent_imports_share_one_store() -> Result<()> {
    init_logging();
    let shared = SharedStore::default();

    let handles: Vec<_> = [REFERRING, PHISHING]
        .into_iter()
        .map(|xml| {
            let shared = shared.clone();
            thread::spawn(move || {
                let importer = StixImporter::default();
                let mut artifacts = MemoryArtifactStore::new();
                let options = ImportOptions {
                    timestamp: Some(at(1)),
                    ..ImportOptions::default()
                };
                shared.with(|store| importer.import_str(xml, &options, store, &mut artifacts))
            })
        })
        .collect();
    for handle in handles {
        let report = handle.join().expect("import thread panicked")?;
        assert!(report.issues.is_empty());
    }

    let stats = shared.stats();
    assert_eq!(stats.identities, 5);
    assert_eq!(stats.placeholders, 0);
    Ok(())
}

// ============================================================================
// Files and configuration
// ============================================================================

#[test]
fn test_import_file_with_configured_threshold() -> Result<()> {
    let dir = tempdir()?;
    let config_path = dir.path().join("importer.json");
    std::fs::write(&config_path, r#"{ "raw_inline_threshold": 8 }"#)?;
    let config = ImporterConfig::from_json_file(&config_path)?;

    let xml_path = dir.path().join("email.xml");
    std::fs::write(
        &xml_path,
        r#"<cybox:Observables xmlns:cybox="http://cybox.mitre.org/cybox-2"
            xmlns:EmailMessageObj="http://cybox.mitre.org/objects#EmailMessageObject-2"
            xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance"
            xmlns:example="http://example.com/">
          <cybox:Observable id="example:Observable-9">
            <cybox:Object id="example:Email-9">
              <cybox:Properties xsi:type="EmailMessageObj:EmailMessageObjectType">
                <EmailMessageObj:Raw_Header>Received: from mx.example.com</EmailMessageObj:Raw_Header>
              </cybox:Properties>
            </cybox:Object>
          </cybox:Observable>
        </cybox:Observables>"#,
    )?;

    let mut store = MemoryStore::new();
    let mut artifacts = FsArtifactStore::open(dir.path().join("artifacts"))?;
    let report = StixImporter::new(config).import_file(
        &xml_path,
        &ImportOptions::default(),
        &mut store,
        &mut artifacts,
    )?;
    let email = report
        .objects
        .iter()
        .find(|o| o.identity == example("Email-9"))
        .expect("email object");
    assert_eq!(email.existence, Existence::Created);
    assert_eq!(email.type_name, "EmailMessageObject");

    let blobs: Vec<_> = std::fs::read_dir(dir.path().join("artifacts"))?
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(blobs.len(), 1);
    assert!(blobs[0].ends_with(".blob"));

    let json = serde_json::to_value(&report)?;
    assert!(json["objects"].as_array().is_some_and(|o| !o.is_empty()));
    assert!(json["issues"].is_array());
    Ok(())
}
