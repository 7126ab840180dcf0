//! Core data models used throughout para-cli.
//!
//! These types represent the payloads read from disk, the records submitted
//! to the service, and the paging parameters of search queries.

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::{Map, Value};

/// What the service sends back for a stored record.
pub type SubmittedRecord = Value;

/// One object stored on the service.
///
/// `id` is fixed at construction. `fields` is an owned copy of the payload,
/// so later changes to the source value cannot reach a queued record.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    id: String,
    name: String,
    object_type: Option<String>,
    fields: Map<String, Value>,
    chunk_index: Option<usize>,
}

impl Record {
    pub(crate) fn new(
        id: String,
        name: String,
        object_type: Option<String>,
        fields: Map<String, Value>,
    ) -> Self {
        Self {
            id,
            name,
            object_type,
            fields,
            chunk_index: None,
        }
    }

    pub(crate) fn with_chunk_index(mut self, index: usize) -> Self {
        self.chunk_index = Some(index);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn object_type(&self) -> Option<&str> {
        self.object_type.as_deref()
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn chunk_index(&self) -> Option<usize> {
        self.chunk_index
    }
}

/// Flat wire form: the payload fields plus `id`, `name`, `type` and
/// `chunkIndex`. The record's own keys replace same-named payload keys.
impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        const OWN_KEYS: [&str; 4] = ["id", "name", "type", "chunkIndex"];

        let extra = self
            .fields
            .keys()
            .filter(|k| !OWN_KEYS.contains(&k.as_str()))
            .count();
        let mut map = serializer.serialize_map(Some(extra + 4))?;
        for (key, value) in &self.fields {
            if !OWN_KEYS.contains(&key.as_str()) {
                map.serialize_entry(key, value)?;
            }
        }
        map.serialize_entry("id", &self.id)?;
        map.serialize_entry("name", &self.name)?;
        if let Some(ref t) = self.object_type {
            map.serialize_entry("type", t)?;
        }
        if let Some(index) = self.chunk_index {
            map.serialize_entry("chunkIndex", &index)?;
        }
        map.end()
    }
}

/// A classified file body, dispatched once when the file is read.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Text(String),
    Html(HtmlDocument),
    Json(Value),
    JsonArray(Vec<Value>),
}

impl Payload {
    /// Classify parsed JSON into a single object or an array of them.
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Array(items) => Payload::JsonArray(items),
            other => Payload::Json(other),
        }
    }

    /// The searchable text of a text-like payload.
    pub fn text(&self) -> Option<&str> {
        match self {
            Payload::Text(text) => Some(text),
            Payload::Html(doc) => Some(&doc.text),
            Payload::Json(_) | Payload::JsonArray(_) => None,
        }
    }

    /// Replace the searchable text, keeping the other fields.
    pub fn with_text(&self, text: String) -> Self {
        match self {
            Payload::Text(_) => Payload::Text(text),
            Payload::Html(doc) => Payload::Html(HtmlDocument {
                text,
                ..doc.clone()
            }),
            other => other.clone(),
        }
    }
}

/// Metadata and text pulled out of an HTML page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HtmlDocument {
    /// `og:title`
    pub title: Option<String>,
    /// `og:url`
    pub url: Option<String>,
    pub text: String,
}

/// Paging parameters for search queries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Pager {
    pub page: Option<u32>,
    pub sort_by: Option<String>,
    pub desc: bool,
    pub limit: Option<u32>,
}

impl Pager {
    /// Query parameters in the form the service expects.
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params = Vec::new();
        if let Some(page) = self.page {
            params.push(("page".to_string(), page.to_string()));
        }
        if let Some(ref sort) = self.sort_by {
            params.push(("sort".to_string(), sort.clone()));
        }
        params.push(("desc".to_string(), self.desc.to_string()));
        if let Some(limit) = self.limit {
            params.push(("limit".to_string(), limit.to_string()));
        }
        params
    }
}
