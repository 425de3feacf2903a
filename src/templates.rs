//! The category → messages mapping and its JSON representation.
//!
//! A [`TemplateSet`] serializes as a plain JSON object whose keys are category
//! names and whose values are arrays of message strings. Key order is the
//! insertion order and survives both parsing and serialization.

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// One named group of message templates.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Category {
    pub name: String,
    pub messages: Vec<String>,
}

/// Ordered mapping from category name to message list.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TemplateSet {
    categories: Vec<Category>,
}

/// Category and message totals shown on the management summary.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct TemplateStats {
    pub categories: usize,
    pub messages: usize,
}

impl TemplateSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set from `(name, messages)` pairs. Later duplicates replace
    /// earlier ones in place.
    pub fn from_pairs<N, M, I>(pairs: I) -> Self
    where
        N: Into<String>,
        M: Into<String>,
        I: IntoIterator<Item = (N, Vec<M>)>,
    {
        let mut set = Self::new();
        for (name, messages) in pairs {
            set.insert(name, messages.into_iter().map(Into::into).collect());
        }
        set
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub(crate) fn position(&self, name: &str) -> Option<usize> {
        self.categories.iter().position(|c| c.name == name)
    }

    pub fn get(&self, name: &str) -> Option<&[String]> {
        self.categories
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.messages.as_slice())
    }

    pub(crate) fn get_mut(&mut self, name: &str) -> Option<&mut Vec<String>> {
        self.categories
            .iter_mut()
            .find(|c| c.name == name)
            .map(|c| &mut c.messages)
    }

    /// Insert or replace a category. A new name is appended at the end; an
    /// existing name keeps its position.
    pub fn insert(&mut self, name: impl Into<String>, messages: Vec<String>) {
        let name = name.into();
        match self.position(&name) {
            Some(idx) => self.categories[idx].messages = messages,
            None => self.categories.push(Category { name, messages }),
        }
    }

    /// Remove a category and return its messages.
    pub fn remove(&mut self, name: &str) -> Option<Vec<String>> {
        let idx = self.position(name)?;
        Some(self.categories.remove(idx).messages)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Category> {
        self.categories.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.categories.iter().map(|c| c.name.as_str())
    }

    pub fn stats(&self) -> TemplateStats {
        TemplateStats {
            categories: self.categories.len(),
            messages: self.categories.iter().map(|c| c.messages.len()).sum(),
        }
    }

    /// Pretty JSON (2-space indent) in key order.
    pub fn to_pretty_json(&self) -> String {
        // A map of strings to string arrays cannot fail to serialize.
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }

    pub fn to_value(&self) -> serde_json::Value {
        let map = self
            .categories
            .iter()
            .map(|c| {
                let messages = c
                    .messages
                    .iter()
                    .cloned()
                    .map(serde_json::Value::String)
                    .collect();
                (c.name.clone(), serde_json::Value::Array(messages))
            })
            .collect();
        serde_json::Value::Object(map)
    }
}

impl<'a> IntoIterator for &'a TemplateSet {
    type Item = &'a Category;
    type IntoIter = std::slice::Iter<'a, Category>;

    fn into_iter(self) -> Self::IntoIter {
        self.categories.iter()
    }
}

impl Serialize for TemplateSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.categories.len()))?;
        for category in &self.categories {
            map.serialize_entry(&category.name, &category.messages)?;
        }
        map.end()
    }
}

struct TemplateSetVisitor;

impl<'de> Visitor<'de> for TemplateSetVisitor {
    type Value = TemplateSet;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("an object mapping category names to arrays of strings")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<TemplateSet, A::Error> {
        let mut set = TemplateSet::new();
        while let Some((name, messages)) = access.next_entry::<String, Vec<String>>()? {
            set.insert(name, messages);
        }
        Ok(set)
    }
}

impl<'de> Deserialize<'de> for TemplateSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(TemplateSetVisitor)
    }
}

/// Display form of a category key: hyphens become spaces and each word gets
/// an upper-cased first character (`tax-on-hold` → `Tax On Hold`).
pub fn display_name(key: &str) -> String {
    key.split('-')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Templates seeded on first load.
pub fn default_templates() -> TemplateSet {
    TemplateSet::from_pairs([
        (
            "tax-pending-task",
            vec![
                "The tax team is currently reviewing your case.",
                "Your tax request is in the verification process.",
            ],
        ),
        (
            "tax-on-hold",
            vec![
                "Your tax case is on hold due to pending documentation.",
                "We need additional information to continue with your tax process.",
            ],
        ),
        (
            "banking",
            vec![
                "Your banking application is being processed.",
                "Funds will be deposited within 2-3 business days.",
            ],
        ),
        (
            "banking-on-hold",
            vec![
                "The nearest office is located at 123 Main St.",
                "Our hours of operation are Monday to Friday 9am to 5pm.",
            ],
        ),
    ])
}

/// Starter document offered by the JSON editor: the defaults plus two
/// placeholder categories showing the format.
pub fn sample_templates() -> TemplateSet {
    let mut set = default_templates();
    set.insert("category5", vec!["Example message for category 5.".to_string()]);
    set.insert("category6", vec!["Example message for category 6.".to_string()]);
    set
}
