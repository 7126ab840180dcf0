//! Building service records from classified payloads.
//!
//! A [`RecordBuilder`] carries the per-run options (object type, id
//! encoding) and turns a [`Payload`] plus an identifier into one or more
//! [`Record`]s. Type tags go through [`normalize_type`]; identifiers are
//! base64-encoded with [`encode_id`] unless the caller opts out with the
//! literal string `"false"`.

use std::sync::LazyLock;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use regex::Regex;
use serde_json::{Map, Value};

use crate::chunk::Chunk;
use crate::error::{BuildError, CodecError};
use crate::models::{Payload, Record};

/// Characters that are neither ASCII word characters nor whitespace.
static NON_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9_\s]+").expect("static regex"));
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("static regex"));

/// Turn a free-text type tag into a slug: `"My Notes!"` → `"My-Notes-"`.
///
/// Returns `None` for blank input so the service applies its default type.
pub fn normalize_type(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let spaced = NON_WORD.replace_all(trimmed, " ");
    Some(WHITESPACE.replace_all(&spaced, "-").into_owned())
}

/// Reduce text to word characters separated by single spaces.
pub fn sanitize_text(text: &str) -> String {
    collapse_whitespace(&NON_WORD.replace_all(text, " "))
}

/// Replace every run of whitespace with one space.
pub fn collapse_whitespace(text: &str) -> String {
    WHITESPACE.replace_all(text, " ").into_owned()
}

/// Base64 of the UTF-8 bytes of `id`.
pub fn encode_id(id: &str) -> String {
    STANDARD.encode(id.as_bytes())
}

/// Inverse of [`encode_id`].
pub fn decode_id(encoded: &str) -> Result<String, CodecError> {
    let bytes = STANDARD.decode(encoded.as_bytes())?;
    Ok(String::from_utf8(bytes)?)
}

/// Builds records for one ingestion run.
#[derive(Debug, Clone)]
pub struct RecordBuilder {
    object_type: Option<String>,
    encode_ids: bool,
}

impl RecordBuilder {
    /// `encode_id_flag` disables encoding only when it is exactly `"false"`.
    pub fn new(object_type: Option<&str>, encode_id_flag: Option<&str>) -> Self {
        Self {
            object_type: object_type.and_then(normalize_type),
            encode_ids: encode_id_flag != Some("false"),
        }
    }

    #[cfg(test)]
    fn encodes_ids(&self) -> bool {
        self.encode_ids
    }

    /// One record per payload, or per element of an array payload. All
    /// records share `identifier`.
    pub fn build(&self, payload: &Payload, identifier: &str) -> Result<Vec<Record>, BuildError> {
        let id = self.storage_id(identifier)?;
        let records = match payload {
            Payload::JsonArray(items) => items
                .iter()
                .map(|item| self.record(&id, identifier, json_fields(item)))
                .collect(),
            other => vec![self.record(&id, identifier, payload_fields(other))],
        };
        Ok(records)
    }

    /// A single record holding one chunk of a text payload. The chunk
    /// ordinal is appended to the identifier so chunks do not overwrite each
    /// other on the service.
    pub fn build_chunk(
        &self,
        payload: &Payload,
        identifier: &str,
        chunk: &Chunk,
    ) -> Result<Record, BuildError> {
        if identifier.is_empty() {
            return Err(BuildError::EmptyIdentifier);
        }
        let chunk_identifier = format!("{}_chunk{}", identifier, chunk.index);
        let id = self.storage_id(&chunk_identifier)?;
        let fields = payload_fields(&payload.with_text(chunk.text.clone()));
        Ok(self
            .record(&id, &chunk_identifier, fields)
            .with_chunk_index(chunk.index))
    }

    fn storage_id(&self, identifier: &str) -> Result<String, BuildError> {
        if identifier.is_empty() {
            return Err(BuildError::EmptyIdentifier);
        }
        Ok(if self.encode_ids {
            encode_id(identifier)
        } else {
            identifier.to_string()
        })
    }

    fn record(&self, id: &str, name: &str, fields: Map<String, Value>) -> Record {
        Record::new(
            id.to_string(),
            name.to_string(),
            self.object_type.clone(),
            fields,
        )
    }
}

fn payload_fields(payload: &Payload) -> Map<String, Value> {
    match payload {
        Payload::Text(text) => {
            let mut map = Map::new();
            map.insert("text".to_string(), Value::String(text.clone()));
            map
        }
        Payload::Html(doc) => {
            let mut map = Map::new();
            if let Some(ref title) = doc.title {
                map.insert("title".to_string(), Value::String(title.clone()));
            }
            if let Some(ref url) = doc.url {
                map.insert("url".to_string(), Value::String(url.clone()));
            }
            map.insert("text".to_string(), Value::String(doc.text.clone()));
            map
        }
        Payload::Json(value) => json_fields(value),
        Payload::JsonArray(items) => {
            let mut map = Map::new();
            map.insert("value".to_string(), Value::Array(items.clone()));
            map
        }
    }
}

fn json_fields(value: &Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map.clone(),
        other => {
            let mut map = Map::new();
            map.insert("value".to_string(), other.clone());
            map
        }
    }
}
