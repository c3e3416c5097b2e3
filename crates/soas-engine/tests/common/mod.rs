#![allow(dead_code)]

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::{stream, StreamExt};
use serde_json::{Map, Value};
use soas_core::{compile, ActionCatalog, ApiDescription};
use soas_engine::transport::{RequestBody, ResponseBody, ResponseMode};
use soas_engine::{
    ActionInput, EngineError, EngineResult, Record, Transport, TransportRequest, TransportResponse,
};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const ADDRESS: &str = "http://schema.org/address";
pub const IDENTIFIER: &str = "http://schema.org/identifier";
pub const LATITUDE: &str = "http://schema.org/latitude";
pub const LONGITUDE: &str = "http://schema.org/longitude";

pub const GEOCODER_SERVER: &str = "https://staging.koumoul.com/s/geocoder/api/v1";

pub fn geocoder() -> Arc<ActionCatalog> {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../soas-core/tests/fixtures/geocoder-api.json");
    let description = ApiDescription::load(path).expect("fixture loads");
    Arc::new(compile(&description).expect("fixture compiles"))
}

pub fn catalog(description: Value) -> Arc<ActionCatalog> {
    let description = ApiDescription::from_value(description).expect("description parses");
    Arc::new(compile(&description).expect("description compiles"))
}

pub fn record(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("expected an object, got {}", other),
    }
}

/// What the transport saw
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub url: String,
    pub content_type: Option<String>,
    pub accept: Option<String>,
    pub body: Bytes,
    pub response_mode: ResponseMode,
}

impl RecordedRequest {
    pub fn body_text(&self) -> String {
        String::from_utf8(self.body.to_vec()).expect("utf-8 body")
    }
}

enum Reply {
    /// Send the request body back with the request content type
    Echo,
    Fixed {
        status: u16,
        content_type: Option<String>,
        body: Bytes,
    },
    /// Send `body`, then keep the response open without sending more
    Stalled {
        content_type: String,
        body: Bytes,
    },
    Fail(String),
}

/// In-memory transport that records every request
pub struct MockTransport {
    reply: Reply,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl MockTransport {
    fn with_reply(reply: Reply) -> Arc<Self> {
        Arc::new(Self {
            reply,
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn echo() -> Arc<Self> {
        Self::with_reply(Reply::Echo)
    }

    pub fn respond(status: u16, content_type: &str, body: &str) -> Arc<Self> {
        Self::with_reply(Reply::Fixed {
            status,
            content_type: Some(content_type.to_string()),
            body: Bytes::copy_from_slice(body.as_bytes()),
        })
    }

    pub fn empty(status: u16) -> Arc<Self> {
        Self::with_reply(Reply::Fixed {
            status,
            content_type: None,
            body: Bytes::new(),
        })
    }

    pub fn stalled(content_type: &str, body: &str) -> Arc<Self> {
        Self::with_reply(Reply::Stalled {
            content_type: content_type.to_string(),
            body: Bytes::copy_from_slice(body.as_bytes()),
        })
    }

    pub fn failing(message: &str) -> Arc<Self> {
        Self::with_reply(Reply::Fail(message.to_string()))
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn last(&self) -> RecordedRequest {
        self.requests
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("no request recorded")
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: TransportRequest) -> EngineResult<TransportResponse> {
        let content_type = request.body.content_type().map(str::to_string);
        let body = match request.body {
            RequestBody::Empty => Bytes::new(),
            RequestBody::Buffered { bytes, .. } => bytes,
            RequestBody::Streaming { mut stream, .. } => {
                let mut body = BytesMut::new();
                while let Some(chunk) = stream.next().await {
                    let chunk = chunk.map_err(|e| EngineError::Transport(e.to_string()))?;
                    body.extend_from_slice(&chunk);
                }
                body.freeze()
            }
        };

        self.requests.lock().unwrap().push(RecordedRequest {
            method: request.method,
            url: request.url,
            content_type: content_type.clone(),
            accept: request.accept,
            body: body.clone(),
            response_mode: request.response_mode,
        });

        let (status, content_type, body) = match &self.reply {
            Reply::Echo => (200, content_type, body),
            Reply::Fixed {
                status,
                content_type,
                body,
            } => (*status, content_type.clone(), body.clone()),
            Reply::Stalled { content_type, body } => {
                let chunks: Vec<EngineResult<Bytes>> = vec![Ok(body.clone())];
                return Ok(TransportResponse {
                    status: 200,
                    content_type: Some(content_type.clone()),
                    body: ResponseBody::Streaming(Box::pin(
                        stream::iter(chunks).chain(stream::pending()),
                    )),
                });
            }
            Reply::Fail(message) => return Err(EngineError::Transport(message.clone())),
        };

        let body = match request.response_mode {
            ResponseMode::Buffered => ResponseBody::Buffered(body),
            // small chunks so decoders see records split across reads
            ResponseMode::Streaming => {
                let chunks: Vec<EngineResult<Bytes>> = body
                    .chunks(5)
                    .map(|chunk| Ok(Bytes::copy_from_slice(chunk)))
                    .collect();
                ResponseBody::Streaming(Box::pin(stream::iter(chunks)))
            }
        };

        Ok(TransportResponse {
            status,
            content_type,
            body,
        })
    }
}

/// Transport that reads only the first `limit` chunks of a streamed request
/// body, then answers `200` with an empty body
pub struct PartialReader {
    limit: usize,
    chunks: Mutex<Vec<Bytes>>,
}

impl PartialReader {
    pub fn new(limit: usize) -> Arc<Self> {
        Arc::new(Self {
            limit,
            chunks: Mutex::new(Vec::new()),
        })
    }

    pub fn chunks(&self) -> Vec<Bytes> {
        self.chunks.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for PartialReader {
    async fn send(&self, request: TransportRequest) -> EngineResult<TransportResponse> {
        if let RequestBody::Streaming { stream, .. } = request.body {
            let read: Vec<Bytes> = stream
                .take(self.limit)
                .map(|chunk| chunk.expect("body chunk"))
                .collect()
                .await;
            self.chunks.lock().unwrap().extend(read);
        }

        let body = match request.response_mode {
            ResponseMode::Buffered => ResponseBody::Buffered(Bytes::new()),
            ResponseMode::Streaming => ResponseBody::Streaming(Box::pin(stream::empty())),
        };
        Ok(TransportResponse {
            status: 200,
            content_type: None,
            body,
        })
    }
}

/// Endless record stream counting how many records have been pulled from it
pub fn counted_records(
    make: impl Fn(usize) -> Record + Send + Sync + 'static,
) -> (ActionInput, Arc<AtomicUsize>) {
    let pulled = Arc::new(AtomicUsize::new(0));
    let counter = pulled.clone();
    let records = stream::iter(0..).map(move |i| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(make(i))
    });
    (ActionInput::Stream(Box::pin(records)), pulled)
}
