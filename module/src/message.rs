//! Bus message envelope.

use std::collections::BTreeMap;

/// A message on the gateway bus: string properties plus an opaque body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Message {
    properties: BTreeMap<String, String>,
    content: Vec<u8>,
}

impl Message {
    pub fn new(content: impl Into<Vec<u8>>) -> Self {
        Self {
            properties: BTreeMap::new(),
            content: content.into(),
        }
    }

    /// Adds or replaces a property.
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    pub fn has_property(&self, key: &str) -> bool {
        self.properties.contains_key(key)
    }

    pub fn properties(&self) -> &BTreeMap<String, String> {
        &self.properties
    }

    pub fn content(&self) -> &[u8] {
        &self.content
    }

    /// Body as UTF-8 text, replacing invalid sequences.
    pub fn content_text(&self) -> String {
        String::from_utf8_lossy(&self.content).into_owned()
    }
}
