//! Fact handlers for STIX/CybOX objects.
//!
//! Every candidate fact is matched against an ordered rule table; the first
//! rule whose predicate holds rewrites the fact's creation parameters. The
//! attribute-driven rules only touch the element fact; the attribute facts of
//! that element keep their own values.
//!
//! | rule          | predicate                                            | effect                              |
//! |---------------|------------------------------------------------------|-------------------------------------|
//! | `raw`         | element fact, term contains `Raw_`                   | long values go to a blob            |
//! | `reference`   | element fact, element carries `idref`                | value becomes the referenced object |
//! | `csv`         | element fact, `apply_condition`, no `pattern_type`   | split on `,` (or `##comma##`)       |
//! | `value_set`   | element fact, element carries `value_set`            | values from the attribute           |
//! | `legacy_term` | term contains `Defined_Object`                       | renamed to `Properties`             |
//!
//! New behavior is added as a row, not as a branch in the dispatch.

use crate::context::ImportContext;
use crate::reference::resolve_reference;
use crate::report::ImportIssue;
use crate::typing::derive_type;
use stixgraph_core::digest::{blob_name, sha256_hex};
use stixgraph_core::{
    ArtifactStore, AttrInfo, CandidateFact, DatatypeKind, FactContent, FactDatatype, FactHooks,
    FactParams, ObjectStore, StoreError,
};

/// Attributes never materialized as facts of their own; their content is
/// consumed elsewhere (identity, typing, the value-set rule).
pub const IGNORED_ATTRIBUTES: &[&str] = &[
    "id",
    "object_reference",
    "idref",
    "xsi:type",
    "datatype",
    "type",
    "value_set",
    "xsi:schemaLocation",
];

/// Separator used by CybOX 2.0.1+ for literal lists.
pub const COMMA_TOKEN: &str = "##comma##";

pub type Predicate = fn(&StixFactHooks<'_>, &CandidateFact, &AttrInfo) -> bool;

pub type Transform = fn(
    &mut StixFactHooks<'_>,
    &CandidateFact,
    &AttrInfo,
    &mut FactParams,
    &mut dyn ObjectStore,
) -> Result<(), StoreError>;

#[derive(Clone, Copy)]
pub struct FactRule {
    pub name: &'static str,
    pub predicate: Predicate,
    pub transform: Transform,
}

impl std::fmt::Debug for FactRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FactRule").field("name", &self.name).finish()
    }
}

pub fn default_rules() -> Vec<FactRule> {
    vec![
        FactRule {
            name: "raw",
            predicate: |hooks, candidate, _| {
                candidate.attribute.is_none() && candidate.term.contains(&hooks.ctx.config.raw_marker)
            },
            transform: externalize_raw,
        },
        FactRule {
            name: "reference",
            predicate: |_, candidate, attrs| {
                candidate.attribute.is_none() && attrs.contains_key("idref")
            },
            transform: convert_reference,
        },
        FactRule {
            name: "csv",
            predicate: |_, candidate, attrs| {
                candidate.attribute.is_none()
                    && non_empty(attrs, "apply_condition")
                    && !non_empty(attrs, "pattern_type")
            },
            transform: split_csv,
        },
        FactRule {
            name: "value_set",
            predicate: |_, candidate, attrs| {
                candidate.attribute.is_none() && attrs.contains_key("value_set")
            },
            transform: expand_value_set,
        },
        FactRule {
            name: "legacy_term",
            predicate: |hooks, candidate, _| {
                candidate.term.contains(&hooks.ctx.config.legacy_wrapper)
            },
            transform: rename_legacy_term,
        },
    ]
}

fn non_empty(attrs: &AttrInfo, key: &str) -> bool {
    attrs.get(key).is_some_and(|v| !v.is_empty())
}

/// Split on `##comma##` when the value uses it as a separator, else on `,`.
///
/// The check looks for the token followed by a space, so a value using the
/// token without spaces falls back to plain commas.
pub fn split_comma_separated(value: &str) -> Vec<String> {
    let separator = if value.contains("##comma## ") {
        COMMA_TOKEN
    } else {
        ","
    };
    value.split(separator).map(|v| v.trim().to_string()).collect()
}

fn externalize_raw(
    hooks: &mut StixFactHooks<'_>,
    candidate: &CandidateFact,
    _attrs: &AttrInfo,
    params: &mut FactParams,
    _store: &mut dyn ObjectStore,
) -> Result<(), StoreError> {
    let value = &candidate.value;
    if value.chars().count() <= hooks.ctx.config.raw_inline_threshold {
        return Ok(());
    }
    let digest = sha256_hex(value.as_bytes());
    let name = blob_name(&digest);
    if hooks.artifacts.exists(&name)? {
        hooks.artifacts.delete(&name)?;
    }
    hooks.artifacts.save(&name, value.as_bytes())?;
    tracing::debug!(term = %candidate.term, blob = %name, "externalized raw content");
    params.content = FactContent::OnDisk { digest };
    Ok(())
}

fn convert_reference(
    hooks: &mut StixFactHooks<'_>,
    candidate: &CandidateFact,
    attrs: &AttrInfo,
    params: &mut FactParams,
    store: &mut dyn ObjectStore,
) -> Result<(), StoreError> {
    let Some(idref) = attrs.get("idref") else {
        return Ok(());
    };
    let timestamp = attrs
        .get("@revision_timestamp")
        .or_else(|| attrs.get("revision_timestamp"))
        .map(String::as_str);
    let resolved = resolve_reference(store, hooks.ctx, idref, timestamp, hooks.issues)?;

    let element_name = candidate.term.rsplit('/').next().unwrap_or("");
    let target_type = derive_type(
        &hooks.ctx.namespaces,
        attrs.get("@ns").map(String::as_str),
        attrs.get("@embedded_type_info").map(String::as_str),
        element_name,
    );
    params.datatype = FactDatatype {
        name: target_type.type_name,
        namespace_uri: target_type.type_namespace_uri,
        kind: DatatypeKind::Reference,
    };
    params.content = FactContent::Reference {
        target: resolved.identity,
    };
    Ok(())
}

fn split_csv(
    _hooks: &mut StixFactHooks<'_>,
    candidate: &CandidateFact,
    _attrs: &AttrInfo,
    params: &mut FactParams,
    _store: &mut dyn ObjectStore,
) -> Result<(), StoreError> {
    params.content = FactContent::Values {
        values: split_comma_separated(&candidate.value),
    };
    Ok(())
}

fn expand_value_set(
    _hooks: &mut StixFactHooks<'_>,
    _candidate: &CandidateFact,
    attrs: &AttrInfo,
    params: &mut FactParams,
    _store: &mut dyn ObjectStore,
) -> Result<(), StoreError> {
    if let Some(value_set) = attrs.get("value_set") {
        params.content = FactContent::Values {
            values: value_set.split(',').map(|v| v.trim().to_string()).collect(),
        };
    }
    Ok(())
}

fn rename_legacy_term(
    hooks: &mut StixFactHooks<'_>,
    candidate: &CandidateFact,
    _attrs: &AttrInfo,
    params: &mut FactParams,
    _store: &mut dyn ObjectStore,
) -> Result<(), StoreError> {
    let config = &hooks.ctx.config;
    params.term = candidate
        .term
        .replace(&config.legacy_wrapper, &config.current_wrapper);
    Ok(())
}

// ============================================================================
// Hooks
// ============================================================================

/// [`FactHooks`] for one STIX/CybOX object.
pub struct StixFactHooks<'a> {
    pub ctx: &'a ImportContext,
    rules: &'a [FactRule],
    artifacts: &'a mut dyn ArtifactStore,
    issues: &'a mut Vec<ImportIssue>,
    /// family of the object, for datatype namespaces missing from the document
    family: String,
}

impl<'a> StixFactHooks<'a> {
    pub fn new(
        ctx: &'a ImportContext,
        rules: &'a [FactRule],
        artifacts: &'a mut dyn ArtifactStore,
        issues: &'a mut Vec<ImportIssue>,
        family: impl Into<String>,
    ) -> Self {
        Self {
            ctx,
            rules,
            artifacts,
            issues,
            family: family.into(),
        }
    }
}

impl FactHooks for StixFactHooks<'_> {
    fn ignore_attribute(&self, candidate: &CandidateFact, _attrs: &AttrInfo) -> bool {
        match candidate.attribute.as_deref() {
            Some(attr) => attr.starts_with('@') || IGNORED_ATTRIBUTES.contains(&attr),
            None => false,
        }
    }

    /// `xsi:type`, else `datatype`, names the datatype; a qualified name is a
    /// vocabulary term in the namespace bound to its prefix.
    fn extract_datatype(&self, _candidate: &CandidateFact, attrs: &AttrInfo) -> Option<FactDatatype> {
        let name = attrs.get("xsi:type").or_else(|| attrs.get("datatype"))?;
        let datatype = match name.split_once(':') {
            Some((prefix, local)) => FactDatatype {
                name: local.to_string(),
                namespace_uri: self
                    .ctx
                    .namespaces
                    .get(Some(prefix))
                    .map(str::to_string)
                    .unwrap_or_else(|| {
                        format!("{}/{}", self.ctx.config.default_namespace_uri, self.family)
                    }),
                kind: DatatypeKind::VocabSingle,
            },
            None => FactDatatype {
                name: name.clone(),
                ..FactDatatype::plain()
            },
        };
        Some(datatype)
    }

    fn handle_fact(
        &mut self,
        candidate: &CandidateFact,
        attrs: &AttrInfo,
        params: &mut FactParams,
        store: &mut dyn ObjectStore,
    ) -> Result<(), StoreError> {
        let rules = self.rules;
        match rules.iter().find(|rule| (rule.predicate)(&*self, candidate, attrs)) {
            Some(rule) => (rule.transform)(self, candidate, attrs, params, store),
            None => Ok(()),
        }
    }
}
