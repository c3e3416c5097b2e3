use super::framing::{decode_lines, is_blank, LineFramer};
use super::{parse_object, stop_after_error, Codec};
use crate::{ByteStream, EngineResult, Record, RecordStream};
use bytes::Bytes;
use futures::StreamExt;
use soas_core::content_type::NDJSON;

/// `application/x-ndjson`: one JSON object per line
#[derive(Debug, Clone, Copy, Default)]
pub struct NdjsonCodec;

fn encode_line(record: &Record) -> EngineResult<Bytes> {
    let mut line = serde_json::to_vec(record)?;
    line.push(b'\n');
    Ok(Bytes::from(line))
}

impl Codec for NdjsonCodec {
    fn content_type(&self) -> &'static str {
        NDJSON
    }

    fn encode_one(&self, record: &Record) -> EngineResult<Bytes> {
        encode_line(record)
    }

    fn encode_stream(&self, records: RecordStream) -> ByteStream {
        Box::pin(
            stop_after_error(records).map(|record| record.and_then(|record| encode_line(&record))),
        )
    }

    /// First non-blank line of the body
    fn decode_one(&self, bytes: Bytes) -> EngineResult<Record> {
        match bytes.split(|b| *b == b'\n').find(|line| !is_blank(line)) {
            Some(line) => parse_object(line),
            None => Ok(Record::new()),
        }
    }

    fn decode_stream(&self, bytes: ByteStream) -> RecordStream {
        decode_lines(bytes, LineFramer::new(), |line| {
            if is_blank(line) {
                None
            } else {
                Some(parse_object(line))
            }
        })
    }
}
