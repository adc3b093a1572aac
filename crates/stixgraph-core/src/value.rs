//! Recursive dictionary representation of an XML element ("object dict").
//!
//! The shape of an imported element depends on the vocabulary revision it was
//! written against, so it is kept as an open-ended tree rather than a fixed
//! record. Key conventions:
//!
//! - `@name` — an XML attribute (`@prefix:local` for namespaced attributes)
//! - `@@name` — an attribute synthesized during conversion (`@@ns`,
//!   `@@embedded_type_info`, `@@revision_timestamp`)
//! - `_value` — the element's text content
//! - anything else — a child element, keyed by local name; repeated children
//!   collapse into a [`ObjValue::List`].
//!
//! Entries keep insertion order, which for converted elements is document
//! order. Node positions of facts are numbered from it.

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Key of the element text.
pub const VALUE_KEY: &str = "_value";
/// Key holding the namespace prefix of the element.
pub const NS_KEY: &str = "@@ns";
/// Key holding the type hint of an extracted embedding.
pub const EMBEDDED_TYPE_KEY: &str = "@@embedded_type_info";
/// Key holding the revision timestamp of an extracted embedding.
pub const REVISION_TIMESTAMP_KEY: &str = "@@revision_timestamp";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ObjValue {
    Scalar(String),
    Map(ObjDict),
    List(Vec<ObjValue>),
}

impl ObjValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ObjValue::Scalar(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&ObjDict> {
        match self {
            ObjValue::Map(m) => Some(m),
            _ => None,
        }
    }
}

impl From<&str> for ObjValue {
    fn from(value: &str) -> Self {
        ObjValue::Scalar(value.to_string())
    }
}

impl From<String> for ObjValue {
    fn from(value: String) -> Self {
        ObjValue::Scalar(value)
    }
}

impl From<ObjDict> for ObjValue {
    fn from(value: ObjDict) -> Self {
        ObjValue::Map(value)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjDict {
    entries: Vec<(String, ObjValue)>,
}

impl ObjDict {
    pub fn new() -> Self {
        Self::default()
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.entries.iter().position(|(k, _)| k == key)
    }

    pub fn get(&self, key: &str) -> Option<&ObjValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(ObjValue::as_str)
    }

    pub fn get_map(&self, key: &str) -> Option<&ObjDict> {
        self.get(key).and_then(ObjValue::as_map)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.position(key).is_some()
    }

    /// Set `key`; an existing entry is replaced in place and keeps its
    /// position.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ObjValue>) -> Option<ObjValue> {
        let key = key.into();
        let value = value.into();
        match self.position(&key) {
            Some(i) => Some(std::mem::replace(&mut self.entries[i].1, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    /// XML attribute `name`, looked up as `@name`.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.get_str(&format!("@{name}"))
    }

    pub fn set_attr(&mut self, name: &str, value: impl Into<String>) {
        self.insert(format!("@{name}"), ObjValue::Scalar(value.into()));
    }

    /// Element text (`_value`).
    pub fn text(&self) -> Option<&str> {
        self.get_str(VALUE_KEY)
    }

    /// Namespace prefix of the element this dict was built from.
    pub fn namespace_prefix(&self) -> Option<&str> {
        self.get_str(NS_KEY)
    }

    pub fn embedded_type_info(&self) -> Option<&str> {
        self.get_str(EMBEDDED_TYPE_KEY)
    }

    /// Add a child element. A second child with the same name turns the entry
    /// into a list at the position of the first one.
    pub fn push_child(&mut self, name: &str, value: ObjValue) {
        let Some(i) = self.position(name) else {
            self.entries.push((name.to_string(), value));
            return;
        };
        match &mut self.entries[i].1 {
            ObjValue::List(items) => items.push(value),
            slot => {
                let previous = std::mem::replace(slot, ObjValue::List(Vec::new()));
                *slot = ObjValue::List(vec![previous, value]);
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ObjValue)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    /// Child element entries (neither attributes nor text).
    pub fn children(&self) -> impl Iterator<Item = (&String, &ObjValue)> {
        self.iter()
            .filter(|(k, _)| !is_attribute_key(k) && k.as_str() != VALUE_KEY)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for ObjDict {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

struct ObjDictVisitor;

impl<'de> Visitor<'de> for ObjDictVisitor {
    type Value = ObjDict;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a map of element entries")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<ObjDict, A::Error> {
        let mut dict = ObjDict::new();
        while let Some((key, value)) = access.next_entry::<String, ObjValue>()? {
            dict.insert(key, value);
        }
        Ok(dict)
    }
}

impl<'de> Deserialize<'de> for ObjDict {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(ObjDictVisitor)
    }
}

pub fn is_attribute_key(key: &str) -> bool {
    key.starts_with('@')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_children_become_a_list_in_order() {
        let mut d = ObjDict::new();
        d.push_child("Hash", ObjValue::from("a"));
        d.push_child("Hash", ObjValue::from("b"));
        d.push_child("Hash", ObjValue::from("c"));

        let Some(ObjValue::List(items)) = d.get("Hash") else {
            panic!("expected a list");
        };
        let values: Vec<_> = items.iter().filter_map(ObjValue::as_str).collect();
        assert_eq!(values, vec!["a", "b", "c"]);
    }

    #[test]
    fn attributes_and_text_are_not_children() {
        let mut d = ObjDict::new();
        d.set_attr("id", "x:1");
        d.insert(NS_KEY, "cybox");
        d.insert(VALUE_KEY, "text");
        d.push_child("Title", ObjValue::from("t"));

        assert_eq!(d.attr("id"), Some("x:1"));
        assert_eq!(d.namespace_prefix(), Some("cybox"));
        assert_eq!(d.children().count(), 1);
    }

    #[test]
    fn entries_keep_insertion_order() {
        let mut d = ObjDict::new();
        d.push_child("Value", ObjValue::from("v"));
        d.push_child("Second", ObjValue::from("s"));
        d.push_child("Value", ObjValue::from("w"));
        d.insert("Alpha", "a");

        let keys: Vec<_> = d.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["Value", "Second", "Alpha"]);

        let json = serde_json::to_string(&d).unwrap();
        assert_eq!(json, r#"{"Value":["v","w"],"Second":"s","Alpha":"a"}"#);
        let back: ObjDict = serde_json::from_str(&json).unwrap();
        assert_eq!(back, d);
    }
}
