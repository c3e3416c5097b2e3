//! Transport collaborator
//!
//! The engine builds one [`TransportRequest`] per call and hands it to a
//! [`Transport`]. Bodies and responses are either buffered or streamed.

pub mod http;

use crate::{ByteStream, EngineError, EngineResult};
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::StreamExt;

/// Request body handed to the transport
pub enum RequestBody {
    Empty,
    Buffered {
        content_type: String,
        bytes: Bytes,
    },
    Streaming {
        content_type: String,
        stream: ByteStream,
    },
}

impl RequestBody {
    pub fn content_type(&self) -> Option<&str> {
        match self {
            RequestBody::Empty => None,
            RequestBody::Buffered { content_type, .. }
            | RequestBody::Streaming { content_type, .. } => Some(content_type.as_str()),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, RequestBody::Empty)
    }
}

impl std::fmt::Debug for RequestBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestBody::Empty => write!(f, "Empty"),
            RequestBody::Buffered {
                content_type,
                bytes,
            } => f
                .debug_struct("Buffered")
                .field("content_type", content_type)
                .field("len", &bytes.len())
                .finish(),
            RequestBody::Streaming { content_type, .. } => f
                .debug_struct("Streaming")
                .field("content_type", content_type)
                .finish_non_exhaustive(),
        }
    }
}

/// How the caller wants the response body delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseMode {
    Buffered,
    Streaming,
}

#[derive(Debug)]
pub struct TransportRequest {
    /// Uppercase HTTP method
    pub method: String,
    pub url: String,
    pub body: RequestBody,
    pub accept: Option<String>,
    pub response_mode: ResponseMode,
}

pub enum ResponseBody {
    Buffered(Bytes),
    Streaming(ByteStream),
}

impl std::fmt::Debug for ResponseBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResponseBody::Buffered(bytes) => write!(f, "Buffered({} bytes)", bytes.len()),
            ResponseBody::Streaming(_) => write!(f, "Streaming"),
        }
    }
}

#[derive(Debug)]
pub struct TransportResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: ResponseBody,
}

impl TransportResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Collect the whole body
    pub async fn into_bytes(self) -> EngineResult<Bytes> {
        match self.body {
            ResponseBody::Buffered(bytes) => Ok(bytes),
            ResponseBody::Streaming(mut stream) => {
                let mut body = BytesMut::new();
                while let Some(chunk) = stream.next().await {
                    body.extend_from_slice(&chunk?);
                }
                Ok(body.freeze())
            }
        }
    }

    pub fn into_byte_stream(self) -> ByteStream {
        match self.body {
            ResponseBody::Buffered(bytes) => Box::pin(futures::stream::once(async move { Ok(bytes) })),
            ResponseBody::Streaming(stream) => stream,
        }
    }
}

/// Sends one request. Implementations never retry.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: TransportRequest) -> EngineResult<TransportResponse>;
}

/// Body text of a failed response, for error reporting
pub(crate) async fn failure_body(response: TransportResponse) -> Option<String> {
    match response.into_bytes().await {
        Ok(bytes) if !bytes.is_empty() => Some(String::from_utf8_lossy(&bytes).into_owned()),
        _ => None,
    }
}

/// Turn a non-2xx response into an operation failure
pub(crate) async fn operation_failed(response: TransportResponse) -> EngineError {
    let status = response.status;
    let body = failure_body(response).await;
    EngineError::OperationFailed {
        status: Some(status),
        body,
        message: format!("server responded with status {}", status),
    }
}
