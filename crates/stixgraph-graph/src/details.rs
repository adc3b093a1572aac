//! Fact details over a set of objects: sibling and ancestor-attribute lookup
//! by node position, and "actionable" values (hashes, file names, IPs,
//! domains, email fields, user agents) picked out of CybOX facts.
//!
//! Positions follow the [`NodeId`] layout written at import:
//!
//! ```text
//! N000:N001:L000:N000   element fact (Hashes/Hash[0]/Type)
//! N000:N001:L000:N001   its sibling  (Hashes/Hash[0]/Simple_Hash_Value)
//! N000:N001:L000:A000   an attribute of Hash[0]
//! ```

use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::net::IpAddr;
use std::sync::OnceLock;
use stixgraph_core::{Fact, FactId, IdentityKey, NodeId, ObjectStore};

/// One fact of one object, with its position in the object's payload.
#[derive(Debug, Clone, Copy)]
pub struct DetailFact<'s> {
    pub identity: &'s IdentityKey,
    pub object_type: &'s str,
    pub fact_id: FactId,
    pub fact: &'s Fact,
    pub node_id: &'s NodeId,
}

impl DetailFact<'_> {
    fn is_element(&self) -> bool {
        self.fact.attribute.is_none()
    }

    /// Node of the element the fact belongs to.
    fn element(&self) -> NodeId {
        self.node_id.owner_element()
    }
}

/// `attribute name → [(value, term)]`, nearest element first.
pub type AncestorAttributes = BTreeMap<String, Vec<(String, String)>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionableKind {
    Hash,
    Filename,
    Ip,
    Fqdn,
    Url,
    EmailAddress,
    EmailSubject,
    XMailer,
    UserAgent,
}

/// A value worth acting on (blocking, searching), with where it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Actionable {
    pub identity: IdentityKey,
    pub object_type: String,
    pub term: String,
    pub kind: ActionableKind,
    pub subtype: String,
    pub value: String,
    pub condition: String,
    pub apply_condition: String,
}

const KNOWN_HASH_TYPES: &[&str] = &["MD5", "SHA1", "SHA256", "SSDEEP"];
const DOMAIN_OBJECT_TYPES: &[&str] = &["DomainNameObject", "DomainObject", "LinkObject", "URIObject"];

fn hash_type_for_length(len: usize) -> Option<&'static str> {
    match len {
        32 => Some("MD5"),
        40 => Some("SHA1"),
        64 => Some("SHA256"),
        _ => None,
    }
}

fn label_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9]([A-Za-z0-9-]{0,61}[A-Za-z0-9])?$").expect("label pattern compiles")
    })
}

/// Host name check: at most 255 characters, one optional trailing dot,
/// labels of 1–63 letters, digits or inner hyphens.
pub fn is_valid_fqdn(value: &str) -> bool {
    if value.is_empty() || value.len() > 255 {
        return false;
    }
    let name = value.strip_suffix('.').unwrap_or(value);
    name.split('.').all(|label| label_regex().is_match(label))
}

/// Absolute http(s)/ftp(s) URL with a host.
pub fn is_valid_url(value: &str) -> bool {
    match url::Url::parse(value) {
        Ok(url) => matches!(url.scheme(), "http" | "https" | "ftp" | "ftps") && url.host().is_some(),
        Err(_) => false,
    }
}

fn ip_version(value: &str) -> Option<&'static str> {
    match value.parse::<IpAddr>().ok()? {
        IpAddr::V4(_) => Some("v4"),
        IpAddr::V6(_) => Some("v6"),
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Facts of a set of objects (latest revisions).
#[derive(Debug, Clone, Default)]
pub struct FactDetails<'s> {
    facts: Vec<DetailFact<'s>>,
}

impl<'s> FactDetails<'s> {
    pub fn from_store<'i>(
        store: &'s dyn ObjectStore,
        identities: impl IntoIterator<Item = &'i IdentityKey>,
    ) -> Self {
        let mut facts = Vec::new();
        for identity in identities {
            let Some(object) = store.latest(identity) else {
                tracing::debug!(identity = %identity, "no such object; skipped");
                continue;
            };
            for of in store.object_facts(object.id) {
                facts.push(DetailFact {
                    identity: &object.identity,
                    object_type: &object.type_info.type_name,
                    fact_id: of.fact_id,
                    fact: of.fact,
                    node_id: of.node_id,
                });
            }
        }
        Self { facts }
    }

    pub fn facts(&self) -> &[DetailFact<'s>] {
        &self.facts
    }

    /// Facts of the same object at the same depth under the same parent
    /// position, excluding `fact` itself.
    pub fn siblings(&self, fact: &DetailFact<'s>) -> Vec<&DetailFact<'s>> {
        let parent = fact.node_id.parent();
        self.facts
            .iter()
            .filter(|other| other.identity == fact.identity)
            .filter(|other| other.node_id != fact.node_id || other.fact_id != fact.fact_id)
            .filter(|other| other.node_id.depth() == fact.node_id.depth() && other.node_id.parent() == parent)
            .collect()
    }

    /// Attribute facts on the fact's element and each of its ancestors,
    /// nearest first.
    pub fn ancestor_attributes(&self, fact: &DetailFact<'s>) -> AncestorAttributes {
        let mut out = AncestorAttributes::new();
        let mut element = Some(fact.element());
        while let Some(node) = element {
            for attr in self.facts.iter().filter(|f| {
                f.identity == fact.identity && f.node_id.is_attribute() && f.element() == node
            }) {
                let Some(name) = attr.fact.attribute.as_deref() else {
                    continue;
                };
                let entry = out.entry(name.to_string()).or_default();
                for value in attr.fact.content.values() {
                    entry.push((value.clone(), attr.fact.term.clone()));
                }
            }
            element = node.parent();
        }
        out
    }

    fn actionable(
        &self,
        fact: &DetailFact<'s>,
        kind: ActionableKind,
        subtype: impl Into<String>,
        value: &str,
    ) -> Actionable {
        let attributes = self.ancestor_attributes(fact);
        let nearest = |name: &str| {
            attributes
                .get(name)
                .and_then(|values| values.first())
                .map(|(value, _)| value.clone())
                .unwrap_or_default()
        };
        Actionable {
            identity: fact.identity.clone(),
            object_type: fact.object_type.to_string(),
            term: fact.fact.term.clone(),
            kind,
            subtype: subtype.into(),
            value: value.to_string(),
            condition: nearest("condition"),
            apply_condition: nearest("apply_condition"),
        }
    }

    /// Element facts selected by `pred`, one entry per value.
    fn element_values<'a>(
        &'a self,
        pred: impl Fn(&DetailFact<'s>) -> bool + 'a,
    ) -> impl Iterator<Item = (&'a DetailFact<'s>, &'a str)> + 'a {
        self.facts
            .iter()
            .filter(|f| f.is_element())
            .filter(move |f| pred(*f))
            .flat_map(|f| f.fact.content.values().iter().map(move |v| (f, v.as_str())))
    }

    // ========================================================================
    // Actionable extractors
    // ========================================================================

    /// `Simple_Hash_Value` facts. The hash type comes from the `Hash/Type`
    /// sibling; without one it is inferred from the value length.
    pub fn hashes(&self) -> Vec<Actionable> {
        self.element_values(|f| f.fact.term.contains("Simple_Hash_Value"))
            .map(|(fact, value)| {
                let declared = self
                    .siblings(fact)
                    .into_iter()
                    .find(|s| s.fact.term.contains("Hash/Type") && s.is_element())
                    .and_then(|s| s.fact.value())
                    .filter(|t| !t.is_empty());
                let subtype = match declared {
                    Some(t) if KNOWN_HASH_TYPES.contains(&t) => t.to_string(),
                    Some(t) => {
                        tracing::debug!(hash_type = t, "uncommon hash type");
                        t.to_string()
                    }
                    None => hash_type_for_length(value.len()).unwrap_or("").to_string(),
                };
                self.actionable(fact, ActionableKind::Hash, subtype, value)
            })
            .collect()
    }

    pub fn filenames(&self) -> Vec<Actionable> {
        self.element_values(|f| f.fact.term.contains("File_Name"))
            .map(|(fact, value)| self.actionable(fact, ActionableKind::Filename, "", value))
            .collect()
    }

    /// `Address_Value` facts that are IP addresses: by their `category`
    /// attribute when present, else by parsing the value.
    pub fn ip_addresses(&self) -> Vec<Actionable> {
        self.element_values(|f| f.fact.term.contains("Address_Value"))
            .filter_map(|(fact, value)| {
                let category = self
                    .ancestor_attributes(fact)
                    .get("category")
                    .and_then(|v| v.first())
                    .map(|(c, _)| c.clone())
                    .filter(|c| !c.is_empty());
                let subtype = match category {
                    Some(c) if c.starts_with("ip") => {
                        if c.contains("v4") {
                            "v4"
                        } else if c.contains("v6") {
                            "v6"
                        } else {
                            ""
                        }
                    }
                    Some(_) => return None,
                    None => ip_version(value)?,
                };
                Some(self.actionable(fact, ActionableKind::Ip, subtype, value))
            })
            .collect()
    }

    /// Domain names from domain/link/URI objects, DNS questions and
    /// `Domain_Name` values. A value that is an IP address is reported as an
    /// IP as well.
    pub fn fqdns(&self) -> Vec<Actionable> {
        let mut out = Vec::new();
        let candidates = self.element_values(|f| {
            let term = f.fact.term.as_str();
            (DOMAIN_OBJECT_TYPES.contains(&f.object_type) && term == "Properties/Value")
                || (f.object_type == "DNSQueryObject" && term == "Properties/Question/QName")
                || term.contains("/Domain_Name/Value")
        });
        for (fact, value) in candidates {
            let kind = if is_valid_fqdn(value) {
                ActionableKind::Fqdn
            } else if is_valid_url(value) {
                ActionableKind::Url
            } else {
                tracing::debug!(value, term = %fact.fact.term, "neither host name nor URL");
                continue;
            };
            out.push(self.actionable(fact, kind, "", value));
            if let Some(version) = ip_version(value) {
                out.push(self.actionable(fact, ActionableKind::Ip, version, value));
            }
        }
        out
    }

    /// Email addresses of email message objects, tagged sender or recipient
    /// by the term they were found under.
    pub fn email_addresses(&self) -> Vec<Actionable> {
        self.element_values(|f| {
            f.object_type == "EmailMessageObject" && contains_ignore_case(&f.fact.term, "Address_Value")
        })
        .filter(|(_, value)| value.contains('@'))
        .map(|(fact, value)| {
            let term = &fact.fact.term;
            let subtype = if term.contains("From") || term.contains("Sender") {
                "sender"
            } else if term.contains("Recipient") {
                "recipient"
            } else {
                ""
            };
            self.actionable(fact, ActionableKind::EmailAddress, subtype, value)
        })
        .collect()
    }

    pub fn email_subjects(&self) -> Vec<Actionable> {
        self.by_term(ActionableKind::EmailSubject, "EmailMessageObject", "Header/Subject")
    }

    pub fn x_mailers(&self) -> Vec<Actionable> {
        self.by_term(ActionableKind::XMailer, "EmailMessageObject", "Header/X_Mailer")
    }

    pub fn user_agents(&self) -> Vec<Actionable> {
        self.by_term(ActionableKind::UserAgent, "HTTPSessionObject", "/User_Agent")
    }

    fn by_term(&self, kind: ActionableKind, object_type: &str, term: &str) -> Vec<Actionable> {
        self.element_values(|f| f.object_type == object_type && contains_ignore_case(&f.fact.term, term))
            .map(|(fact, value)| self.actionable(fact, kind, "", value))
            .collect()
    }

    /// Every actionable the extractors above find.
    pub fn actionables(&self) -> Vec<Actionable> {
        let mut out = self.hashes();
        out.extend(self.filenames());
        out.extend(self.ip_addresses());
        out.extend(self.fqdns());
        out.extend(self.email_addresses());
        out.extend(self.email_subjects());
        out.extend(self.x_mailers());
        out.extend(self.user_agents());
        out
    }
}
