//! Fact handler rules

use super::*;
use crate::handlers::{split_comma_separated, IGNORED_ATTRIBUTES};
use chrono::{TimeZone, Utc};
use stixgraph_core::digest::{blob_name, sha256_hex};
use stixgraph_core::{
    ArtifactStore, AttrInfo, CandidateFact, DatatypeKind, FactContent, FactHooks, FactParams,
    IdentityKey, ImporterConfig, NamespaceTable, NodeId, ObjectStore,
};
use stixgraph_store::{MemoryArtifactStore, MemoryStore};

fn ctx() -> ImportContext {
    let mut table = NamespaceTable::new("http://stixgraph.org/ns");
    table.insert(Some("example".into()), "http://example.com/");
    table.insert(Some("stix".into()), "http://stix.mitre.org/stix-1");
    table.insert(Some("indicator".into()), "http://stix.mitre.org/Indicator-2");
    table.insert(
        Some("cyboxVocabs".into()),
        "http://cybox.mitre.org/default_vocabularies-2",
    );
    ImportContext::new(
        &ImporterConfig::default(),
        table,
        &ImportOptions {
            timestamp: Some(Utc.with_ymd_and_hms(2014, 3, 1, 0, 0, 0).unwrap()),
            ..ImportOptions::default()
        },
    )
}

fn candidate(term: &str, attribute: Option<&str>, value: &str) -> CandidateFact {
    CandidateFact {
        term: term.to_string(),
        attribute: attribute.map(str::to_string),
        value: value.to_string(),
        node_id: NodeId::root(),
    }
}

fn attrs(pairs: &[(&str, &str)]) -> AttrInfo {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

struct Harness {
    ctx: ImportContext,
    rules: Vec<FactRule>,
    store: MemoryStore,
    artifacts: MemoryArtifactStore,
    issues: Vec<ImportIssue>,
}

impl Harness {
    fn new() -> Self {
        Self {
            ctx: ctx(),
            rules: default_rules(),
            store: MemoryStore::new(),
            artifacts: MemoryArtifactStore::new(),
            issues: Vec::new(),
        }
    }

    fn handle(&mut self, candidate: &CandidateFact, attrs: &AttrInfo) -> FactParams {
        let mut hooks = StixFactHooks::new(
            &self.ctx,
            &self.rules,
            &mut self.artifacts,
            &mut self.issues,
            "cybox.mitre.org",
        );
        let datatype = hooks
            .extract_datatype(candidate, attrs)
            .unwrap_or_default();
        let mut params = FactParams::from_candidate(candidate, datatype);
        hooks
            .handle_fact(candidate, attrs, &mut params, &mut self.store)
            .unwrap();
        params
    }

    fn ignored(&mut self, candidate: &CandidateFact) -> bool {
        let hooks = StixFactHooks::new(
            &self.ctx,
            &self.rules,
            &mut self.artifacts,
            &mut self.issues,
            "cybox.mitre.org",
        );
        hooks.ignore_attribute(candidate, &AttrInfo::new())
    }
}

#[test]
fn raw_content_at_threshold_stays_inline() {
    let mut h = Harness::new();
    let value = "x".repeat(256);
    let params = h.handle(&candidate("Raw_Artifact", None, &value), &AttrInfo::new());
    assert_eq!(params.content, FactContent::single(value));
    assert!(h.artifacts.is_empty());
}

#[test]
fn raw_content_above_threshold_is_externalized() {
    let mut h = Harness::new();
    let value = "y".repeat(257);
    let digest = sha256_hex(value.as_bytes());
    h.artifacts.save(&blob_name(&digest), b"stale").unwrap();

    let params = h.handle(&candidate("Raw_Header", None, &value), &AttrInfo::new());
    assert_eq!(
        params.content,
        FactContent::OnDisk {
            digest: digest.clone()
        }
    );
    assert_eq!(
        h.artifacts.load(&blob_name(&digest)).unwrap(),
        value.as_bytes()
    );
}

#[test]
fn raw_threshold_counts_characters() {
    let mut h = Harness::new();
    let value = "é".repeat(256);
    let params = h.handle(&candidate("Raw_Artifact", None, &value), &AttrInfo::new());
    assert_eq!(params.content, FactContent::single(value));
    assert!(h.artifacts.is_empty());

    let value = "é".repeat(257);
    let params = h.handle(&candidate("Raw_Artifact", None, &value), &AttrInfo::new());
    assert!(matches!(params.content, FactContent::OnDisk { .. }));
}

#[test]
fn raw_rule_ignores_attribute_facts() {
    let mut h = Harness::new();
    let value = "z".repeat(300);
    let params = h.handle(
        &candidate("Raw_Artifact", Some("encoding"), &value),
        &AttrInfo::new(),
    );
    assert_eq!(params.content, FactContent::single(value));
}

#[test]
fn csv_splits_under_apply_condition() {
    let mut h = Harness::new();
    let a = attrs(&[("apply_condition", "ANY"), ("condition", "Equals")]);
    let params = h.handle(&candidate("Properties/Address_Value", None, "a, b , c"), &a);
    assert_eq!(params.content.values(), ["a", "b", "c"]);
}

#[test]
fn csv_is_left_alone_with_pattern_type() {
    let mut h = Harness::new();
    let a = attrs(&[("apply_condition", "ANY"), ("pattern_type", "Regex")]);
    let params = h.handle(&candidate("Properties/Address_Value", None, "a, b , c"), &a);
    assert_eq!(params.content.values(), ["a, b , c"]);
}

#[test]
fn comma_token_heuristic() {
    assert_eq!(
        split_comma_separated("a, b##comma## c,d"),
        vec!["a, b", "c,d"]
    );
    // Known fidelity risk: the token without a following space is not
    // recognized, so plain commas split the value instead.
    assert_eq!(
        split_comma_separated("x, y##comma##z"),
        vec!["x", "y##comma##z"]
    );
}

#[test]
fn value_set_comes_from_the_attribute() {
    let mut h = Harness::new();
    let a = attrs(&[("value_set", "www.a.com/i.html, b.com/login.html")]);
    let params = h.handle(&candidate("Properties/Value", None, ""), &a);
    assert_eq!(params.content.values(), ["www.a.com/i.html", "b.com/login.html"]);
}

#[test]
fn attribute_facts_keep_their_own_values() {
    let mut h = Harness::new();

    let a = attrs(&[("condition", "IsInSet"), ("value_set", "a.com/x, b.com/y")]);
    let params = h.handle(&candidate("Properties/Value", Some("condition"), "IsInSet"), &a);
    assert_eq!(params.content.values(), ["IsInSet"]);

    let a = attrs(&[("apply_condition", "ANY"), ("condition", "Equals")]);
    let params = h.handle(&candidate("Properties/Address_Value", Some("condition"), "Equals"), &a);
    assert_eq!(params.content.values(), ["Equals"]);

    let a = attrs(&[
        ("idref", "example:Indicator-1"),
        ("revision_timestamp", "2014-01-05T00:00:00Z"),
    ]);
    let params = h.handle(
        &candidate("Indicators/Indicator", Some("revision_timestamp"), "2014-01-05T00:00:00Z"),
        &a,
    );
    assert!(params.content.reference().is_none());
    assert_eq!(params.content.values(), ["2014-01-05T00:00:00Z"]);
    assert_eq!(h.store.stats().objects, 0);
}

#[test]
fn legacy_wrapper_is_renamed() {
    let mut h = Harness::new();
    let params = h.handle(
        &candidate("Defined_Object/Header/Subject", None, "hi"),
        &AttrInfo::new(),
    );
    assert_eq!(params.term, "Properties/Header/Subject");
}

#[test]
fn first_matching_rule_wins() {
    let mut h = Harness::new();
    let a = attrs(&[("apply_condition", "ANY")]);
    let params = h.handle(&candidate("Defined_Object/Address_Value", None, "a,b"), &a);
    assert_eq!(params.content.values(), ["a", "b"]);
    assert_eq!(params.term, "Defined_Object/Address_Value");
}

#[test]
fn reference_creates_placeholder_with_derived_datatype() {
    let mut h = Harness::new();
    let a = attrs(&[
        ("@ns", "stix"),
        ("@embedded_type_info", "indicator"),
        ("@revision_timestamp", "2014-01-05T00:00:00Z"),
        ("idref", "example:Indicator-1"),
    ]);
    let params = h.handle(&candidate("Indicators/Indicator", None, ""), &a);

    let target = IdentityKey::new("http://example.com/", "Indicator-1");
    assert_eq!(
        params.content,
        FactContent::Reference {
            target: target.clone()
        }
    );
    assert_eq!(params.datatype.kind, DatatypeKind::Reference);
    assert_eq!(params.datatype.name, "Indicator");
    assert_eq!(params.datatype.namespace_uri, "http://stix.mitre.org/Indicator");

    let placeholder = h.store.latest(&target).unwrap();
    assert!(placeholder.placeholder);
    assert_eq!(
        placeholder.timestamp,
        Utc.with_ymd_and_hms(2014, 1, 5, 0, 0, 0).unwrap()
    );
    assert!(h.issues.is_empty());
}

#[test]
fn reference_with_unknown_prefix_is_reported() {
    let mut h = Harness::new();
    let a = attrs(&[("idref", "ghost:obj-1")]);
    let params = h.handle(&candidate("Related", None, ""), &a);

    let target = params.content.reference().cloned().unwrap();
    assert_eq!(
        target.namespace_uri,
        "http://stixgraph.org/missing-id-ns/ghost"
    );
    assert_eq!(
        h.store.latest(&target).unwrap().timestamp,
        h.ctx.timestamp
    );
    assert!(matches!(
        h.issues.as_slice(),
        [ImportIssue::UnresolvableNamespacePrefix { .. }]
    ));
}

#[test]
fn ignore_list_is_closed() {
    let mut h = Harness::new();
    for attr in IGNORED_ATTRIBUTES {
        assert!(h.ignored(&candidate("X", Some(attr), "v")), "{attr}");
    }
    assert!(h.ignored(&candidate("X", Some("@ns"), "stix")));
    assert!(!h.ignored(&candidate("X", Some("condition"), "Equals")));
    assert!(!h.ignored(&candidate("X", Some("category"), "ipv4-addr")));
    assert!(!h.ignored(&candidate("X", None, "text")));
}

#[test]
fn datatype_from_xsi_type_or_datatype() {
    let mut h = Harness::new();

    let params = h.handle(
        &candidate("Type", None, "MD5"),
        &attrs(&[("xsi:type", "cyboxVocabs:HashNameVocab-1.0")]),
    );
    assert_eq!(params.datatype.kind, DatatypeKind::VocabSingle);
    assert_eq!(params.datatype.name, "HashNameVocab-1.0");
    assert_eq!(
        params.datatype.namespace_uri,
        "http://cybox.mitre.org/default_vocabularies-2"
    );

    let params = h.handle(
        &candidate("Type", None, "x"),
        &attrs(&[("xsi:type", "unknownVocabs:Whatever")]),
    );
    assert_eq!(
        params.datatype.namespace_uri,
        "http://stixgraph.org/ns/cybox.mitre.org"
    );

    let params = h.handle(
        &candidate("Properties/Value", None, "http://x"),
        &attrs(&[("datatype", "AnyURI")]),
    );
    assert_eq!(params.datatype.kind, DatatypeKind::NoVocab);
    assert_eq!(params.datatype.name, "AnyURI");

    let params = h.handle(&candidate("Title", None, "t"), &AttrInfo::new());
    assert_eq!(params.datatype, stixgraph_core::FactDatatype::plain());
}

mod prop {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn csv_split_trims_every_item(items in proptest::collection::vec("[a-z0-9@.]{1,12}", 1..6)) {
            let joined = items.join(" , ");
            prop_assert_eq!(split_comma_separated(&joined), items);
        }
    }
}
