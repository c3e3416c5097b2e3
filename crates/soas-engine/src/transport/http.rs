use super::{RequestBody, ResponseBody, ResponseMode, Transport, TransportRequest, TransportResponse};
use crate::config::EngineConfig;
use crate::{EngineError, EngineResult};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, Method};
use std::str::FromStr;
use tracing::{debug, instrument};

/// [`Transport`] backed by a shared `reqwest` client
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new() -> EngineResult<Self> {
        Self::from_config(&EngineConfig::default())
    }

    pub fn from_config(config: &EngineConfig) -> EngineResult<Self> {
        let mut builder = Client::builder()
            .connect_timeout(config.connect_timeout())
            .user_agent(config.user_agent.clone());
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }

        let client = builder.build()?;
        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    #[instrument(level = "debug", skip(self, request), fields(method = %request.method, url = %request.url))]
    async fn send(&self, request: TransportRequest) -> EngineResult<TransportResponse> {
        let method = Method::from_str(&request.method).map_err(|_| {
            EngineError::Transport(format!("Invalid HTTP method: {}", request.method))
        })?;

        let mut request_builder = self.client.request(method, &request.url);

        if let Some(accept) = &request.accept {
            request_builder = request_builder.header(ACCEPT, accept);
        }

        // Attach body
        match request.body {
            RequestBody::Empty => {}
            RequestBody::Buffered {
                content_type,
                bytes,
            } => {
                request_builder = request_builder.header(CONTENT_TYPE, content_type).body(bytes);
            }
            RequestBody::Streaming {
                content_type,
                stream,
            } => {
                request_builder = request_builder
                    .header(CONTENT_TYPE, content_type)
                    .body(reqwest::Body::wrap_stream(stream));
            }
        }

        let response = request_builder.send().await?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        debug!(status, content_type = ?content_type, "response received");

        let body = match request.response_mode {
            ResponseMode::Buffered => ResponseBody::Buffered(response.bytes().await?),
            ResponseMode::Streaming => ResponseBody::Streaming(Box::pin(
                response
                    .bytes_stream()
                    .map(|chunk| chunk.map_err(EngineError::from)),
            )),
        };

        Ok(TransportResponse {
            status,
            content_type,
            body,
        })
    }
}
