//! Content codecs
//!
//! A codec turns records into body bytes and back, either one record at a
//! time or as an incremental stream. The [`CodecRegistry`] picks a codec by
//! media type essence, so `application/json; charset=utf-8` resolves to the
//! JSON codec.

pub mod csv;
pub mod framing;
pub mod json;
pub mod ndjson;

use crate::{ByteStream, EngineError, EngineResult, Record, RecordStream};
use bytes::Bytes;
use futures::future;
use futures::stream::{BoxStream, StreamExt};
use soas_core::content_type::essence;
use std::collections::HashMap;
use std::sync::Arc;

pub use self::csv::CsvCodec;
pub use self::json::JsonCodec;
pub use self::ndjson::NdjsonCodec;

pub trait Codec: Send + Sync {
    fn content_type(&self) -> &'static str;

    fn encode_one(&self, record: &Record) -> EngineResult<Bytes>;

    /// Encode records as they are pulled from `records`. An upstream error is
    /// forwarded and ends the stream.
    fn encode_stream(&self, records: RecordStream) -> ByteStream;

    /// `encode_one` for a record whose possible wire fields are known up
    /// front. Formats with a header row use `fields` as its columns.
    fn encode_one_with_fields(&self, record: &Record, fields: &[String]) -> EngineResult<Bytes> {
        let _ = fields;
        self.encode_one(record)
    }

    /// `encode_stream` for records whose possible wire fields are known up
    /// front, so a record lacking some of them still lines up with the rest.
    fn encode_stream_with_fields(&self, records: RecordStream, fields: Vec<String>) -> ByteStream {
        let _ = fields;
        self.encode_stream(records)
    }

    /// Decode a whole body into one record; an empty body is an empty record.
    fn decode_one(&self, bytes: Bytes) -> EngineResult<Record>;

    /// Decode records as body chunks arrive. A record that fails to decode is
    /// yielded as an `Err` and decoding continues; an error from `bytes` ends
    /// the stream.
    fn decode_stream(&self, bytes: ByteStream) -> RecordStream;
}

/// Codecs keyed by lowercase media type essence
#[derive(Clone)]
pub struct CodecRegistry {
    codecs: HashMap<String, Arc<dyn Codec>>,
}

impl CodecRegistry {
    pub fn empty() -> Self {
        Self {
            codecs: HashMap::new(),
        }
    }

    /// Register `codec` under its own content type, replacing any previous one
    pub fn register(&mut self, codec: Arc<dyn Codec>) {
        self.codecs.insert(essence(codec.content_type()), codec);
    }

    pub fn get(&self, content_type: &str) -> EngineResult<Arc<dyn Codec>> {
        self.codecs
            .get(&essence(content_type))
            .cloned()
            .ok_or_else(|| EngineError::UnsupportedContentType(content_type.to_string()))
    }

    pub fn supports(&self, content_type: &str) -> bool {
        self.codecs.contains_key(&essence(content_type))
    }
}

impl Default for CodecRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(Arc::new(JsonCodec));
        registry.register(Arc::new(NdjsonCodec));
        registry.register(Arc::new(CsvCodec));
        registry
    }
}

impl std::fmt::Debug for CodecRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut types: Vec<&String> = self.codecs.keys().collect();
        types.sort();
        f.debug_struct("CodecRegistry").field("types", &types).finish()
    }
}

/// Pass items through up to and including the first error.
pub(crate) fn stop_after_error<T: Send + 'static>(
    stream: BoxStream<'static, EngineResult<T>>,
) -> BoxStream<'static, EngineResult<T>> {
    Box::pin(stream.scan(false, |failed, item| {
        if *failed {
            return future::ready(None);
        }
        *failed = item.is_err();
        future::ready(Some(item))
    }))
}

/// Parse a JSON object, rejecting any other JSON value
pub(crate) fn parse_object(bytes: &[u8]) -> EngineResult<Record> {
    match serde_json::from_slice::<serde_json::Value>(bytes)? {
        serde_json::Value::Object(record) => Ok(record),
        other => Err(EngineError::codec(format!(
            "expected a JSON object, got {}",
            json_kind(&other)
        ))),
    }
}

pub(crate) fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}
