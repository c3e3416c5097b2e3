use super::framing::{decode_lines, is_blank, LineFramer};
use super::Codec;
use crate::{ByteStream, EngineError, EngineResult, Record, RecordStream};
use ::csv::{ReaderBuilder, StringRecord, WriterBuilder};
use bytes::Bytes;
use futures::StreamExt;
use serde_json::Value;
use soas_core::content_type::CSV;

/// `text/csv` with a header row.
///
/// The header is the wire fields the caller passes in, or the first record's
/// keys when none are given. Decoded values are strings.
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvCodec;

impl Codec for CsvCodec {
    fn content_type(&self) -> &'static str {
        CSV
    }

    fn encode_one(&self, record: &Record) -> EngineResult<Bytes> {
        self.encode_one_with_fields(record, &[])
    }

    fn encode_stream(&self, records: RecordStream) -> ByteStream {
        self.encode_stream_with_fields(records, Vec::new())
    }

    fn encode_one_with_fields(&self, record: &Record, fields: &[String]) -> EngineResult<Bytes> {
        let header = columns(fields, record);
        let mut out = write_row(&header)?.to_vec();
        out.extend_from_slice(&write_row(&row_values(&header, record))?);
        Ok(Bytes::from(out))
    }

    fn encode_stream_with_fields(&self, records: RecordStream, fields: Vec<String>) -> ByteStream {
        Box::pin(async_stream::stream! {
            let mut records = records;
            let mut header: Option<Vec<String>> = None;
            while let Some(record) = records.next().await {
                let record = match record {
                    Ok(record) => record,
                    Err(err) => {
                        yield Err(err);
                        return;
                    }
                };

                if header.is_none() {
                    let columns = columns(&fields, &record);
                    match write_row(&columns) {
                        Ok(line) => yield Ok(line),
                        Err(err) => {
                            yield Err(err);
                            return;
                        }
                    }
                    header = Some(columns);
                }

                if let Some(columns) = &header {
                    yield write_row(&row_values(columns, &record));
                }
            }
        })
    }

    /// First data row keyed by the header
    fn decode_one(&self, bytes: Bytes) -> EngineResult<Record> {
        let mut reader = ReaderBuilder::new().has_headers(true).from_reader(&bytes[..]);
        let header = reader.headers()?.clone();
        match reader.records().next() {
            Some(row) => to_record(&header, &row?),
            None => Ok(Record::new()),
        }
    }

    fn decode_stream(&self, bytes: ByteStream) -> RecordStream {
        let mut header: Option<StringRecord> = None;
        decode_lines(bytes, LineFramer::quote_aware(), move |line| {
            if is_blank(line) {
                return None;
            }
            let row = match parse_row(line) {
                Ok(row) => row,
                Err(err) => return Some(Err(err)),
            };
            if header.is_none() {
                header = Some(row);
                return None;
            }
            header.as_ref().map(|columns| to_record(columns, &row))
        })
    }
}

fn write_row<I, S>(fields: I) -> EngineResult<Bytes>
where
    I: IntoIterator<Item = S>,
    S: AsRef<[u8]>,
{
    let mut writer = WriterBuilder::new().from_writer(Vec::new());
    writer.write_record(fields)?;
    let line = writer
        .into_inner()
        .map_err(|e| EngineError::codec(e.to_string()))?;
    Ok(Bytes::from(line))
}

fn parse_row(line: &[u8]) -> EngineResult<StringRecord> {
    let mut reader = ReaderBuilder::new().has_headers(false).from_reader(line);
    let mut row = StringRecord::new();
    reader.read_record(&mut row)?;
    Ok(row)
}

fn to_record(header: &StringRecord, row: &StringRecord) -> EngineResult<Record> {
    if header.len() != row.len() {
        return Err(EngineError::codec(format!(
            "CSV row has {} fields, header has {}",
            row.len(),
            header.len()
        )));
    }
    Ok(header
        .iter()
        .zip(row.iter())
        .map(|(name, value)| (name.to_string(), Value::String(value.to_string())))
        .collect())
}

/// Known fields, else the keys of the first record
fn columns(fields: &[String], first: &Record) -> Vec<String> {
    if fields.is_empty() {
        first.keys().cloned().collect()
    } else {
        fields.to_vec()
    }
}

fn row_values(header: &[String], record: &Record) -> Vec<String> {
    header
        .iter()
        .map(|name| record.get(name).map(value_to_field).unwrap_or_default())
        .collect()
}

/// Render a JSON value as a CSV field
fn value_to_field(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(value_to_field).collect::<Vec<_>>().join(";"),
        Value::Object(_) => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use serde_json::json;

    fn record(value: Value) -> Record {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected an object"),
        }
    }

    #[tokio::test]
    async fn test_encode_stream_writes_header_once() {
        let records: RecordStream = Box::pin(stream::iter(vec![
            Ok(record(json!({"q": "10 rue de Paris", "tags": ["a", "b"]}))),
            Ok(record(json!({"tags": [], "q": "2, place \"Bellecour\""}))),
        ]));
        let chunks: Vec<EngineResult<Bytes>> = CsvCodec.encode_stream(records).collect().await;
        let body: Vec<u8> = chunks.into_iter().flat_map(|c| c.unwrap().to_vec()).collect();

        assert_eq!(
            String::from_utf8(body).unwrap(),
            "q,tags\n10 rue de Paris,a;b\n\"2, place \"\"Bellecour\"\"\",\n"
        );
    }

    #[tokio::test]
    async fn test_known_fields_keep_sparse_records_aligned() {
        let fields = vec!["q".to_string(), "key".to_string(), "lat".to_string()];
        let records: RecordStream = Box::pin(stream::iter(vec![
            Ok(record(json!({"q": "Paris"}))),
            Ok(record(json!({"q": "Lyon", "key": "a2", "lat": 45.76}))),
            Ok(record(json!({}))),
        ]));
        let chunks: Vec<EngineResult<Bytes>> = CsvCodec
            .encode_stream_with_fields(records, fields.clone())
            .collect()
            .await;
        let body: Vec<u8> = chunks.into_iter().flat_map(|c| c.unwrap().to_vec()).collect();

        assert_eq!(
            String::from_utf8(body).unwrap(),
            "q,key,lat\nParis,,\nLyon,a2,45.76\n,,\n"
        );

        let single = CsvCodec
            .encode_one_with_fields(&record(json!({"lat": 1})), &fields)
            .unwrap();
        assert_eq!(&single[..], b"q,key,lat\n,,1\n");
    }

    #[tokio::test]
    async fn test_decode_stream_handles_quoted_newlines() {
        let chunks: ByteStream = Box::pin(stream::iter(vec![
            Ok(Bytes::from_static(b"q,key\r\n\"10 rue\nde Paris\",a")),
            Ok(Bytes::from_static(b"1\r\n\r\nLyon,a2\r\nbroken\r\nNice,a3")),
        ]));
        let items: Vec<EngineResult<Record>> = CsvCodec.decode_stream(chunks).collect().await;

        assert_eq!(items.len(), 4);
        assert_eq!(
            items[0].as_ref().unwrap(),
            &record(json!({"q": "10 rue\nde Paris", "key": "a1"}))
        );
        assert_eq!(items[1].as_ref().unwrap(), &record(json!({"q": "Lyon", "key": "a2"})));
        assert!(matches!(items[2], Err(EngineError::Codec(_))));
        assert_eq!(items[3].as_ref().unwrap(), &record(json!({"q": "Nice", "key": "a3"})));
    }

    #[test]
    fn test_decode_one() {
        let decoded = CsvCodec
            .decode_one(Bytes::from_static(b"lat,lon\n48.85,2.35\n"))
            .unwrap();
        assert_eq!(decoded, record(json!({"lat": "48.85", "lon": "2.35"})));
        assert!(CsvCodec.decode_one(Bytes::from_static(b"lat,lon\n")).unwrap().is_empty());
    }

    #[test]
    fn test_value_to_field() {
        assert_eq!(value_to_field(&json!(null)), "");
        assert_eq!(value_to_field(&json!(1.5)), "1.5");
        assert_eq!(value_to_field(&json!([1, "x"])), "1;x");
        assert_eq!(value_to_field(&json!({"a": 1})), r#"{"a":1}"#);
    }
}
