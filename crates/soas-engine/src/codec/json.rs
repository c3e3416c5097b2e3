use super::{json_kind, parse_object, Codec};
use crate::{ByteStream, EngineError, EngineResult, Record, RecordStream};
use bytes::{Bytes, BytesMut};
use futures::StreamExt;
use serde_json::Value;
use soas_core::content_type::JSON;

/// `application/json`: one object, or an array of objects for collections
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn content_type(&self) -> &'static str {
        JSON
    }

    fn encode_one(&self, record: &Record) -> EngineResult<Bytes> {
        Ok(Bytes::from(serde_json::to_vec(record)?))
    }

    fn encode_stream(&self, records: RecordStream) -> ByteStream {
        Box::pin(async_stream::stream! {
            let mut records = records;
            let mut first = true;
            yield Ok(Bytes::from_static(b"["));
            while let Some(record) = records.next().await {
                let encoded = record.and_then(|record| Ok(serde_json::to_vec(&record)?));
                match encoded {
                    Ok(encoded) => {
                        let mut chunk = BytesMut::with_capacity(encoded.len() + 1);
                        if !first {
                            chunk.extend_from_slice(b",");
                        }
                        chunk.extend_from_slice(&encoded);
                        first = false;
                        yield Ok(chunk.freeze());
                    }
                    Err(err) => {
                        yield Err(err);
                        return;
                    }
                }
            }
            yield Ok(Bytes::from_static(b"]"));
        })
    }

    fn decode_one(&self, bytes: Bytes) -> EngineResult<Record> {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Record::new());
        }
        parse_object(&bytes)
    }

    /// A JSON array cannot be framed before it is complete, so the whole body
    /// is buffered before the first record is yielded.
    fn decode_stream(&self, bytes: ByteStream) -> RecordStream {
        Box::pin(async_stream::stream! {
            let mut bytes = bytes;
            let mut body = BytesMut::new();
            while let Some(chunk) = bytes.next().await {
                match chunk {
                    Ok(chunk) => body.extend_from_slice(&chunk),
                    Err(err) => {
                        yield Err(err);
                        return;
                    }
                }
            }

            if body.iter().all(u8::is_ascii_whitespace) {
                return;
            }

            match serde_json::from_slice::<Value>(&body) {
                Ok(Value::Array(items)) => {
                    for item in items {
                        yield match item {
                            Value::Object(record) => Ok(record),
                            other => Err(EngineError::codec(format!(
                                "expected a JSON object in array, got {}",
                                json_kind(&other)
                            ))),
                        };
                    }
                }
                Ok(Value::Object(record)) => yield Ok(record),
                Ok(other) => yield Err(EngineError::codec(format!(
                    "expected a JSON array, got {}",
                    json_kind(&other)
                ))),
                Err(err) => yield Err(err.into()),
            }
        })
    }
}
