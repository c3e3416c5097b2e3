//! Execution engine
//!
//! One `execute` call resolves an action, translates the caller's
//! concept-keyed input into wire records, sends exactly one request and
//! translates the response back. In collection mode nothing is buffered by the
//! engine itself: records are translated and encoded as the transport pulls
//! the request body, and decoded and translated as the caller pulls the output.

use crate::codec::CodecRegistry;
use crate::config::EngineConfig;
use crate::transport::http::HttpTransport;
use crate::transport::{
    operation_failed, RequestBody, ResponseMode, Transport, TransportRequest,
};
use crate::{EngineError, EngineResult, Record, RecordStream};
use futures::{stream, StreamExt, TryStreamExt};
use soas_core::content_type::JSON;
use soas_core::{
    Action, ActionCatalog, ApiDescription, Endpoint, InputTranslator, OutputTranslator,
};
use std::sync::Arc;
use tracing::{debug, instrument, trace};

/// Caller-supplied input of an action
pub enum ActionInput {
    Single(Record),
    Stream(RecordStream),
}

impl ActionInput {
    /// Collection input from records already in memory
    pub fn records<I>(records: I) -> Self
    where
        I: IntoIterator<Item = Record>,
        I::IntoIter: Send + 'static,
    {
        ActionInput::Stream(Box::pin(stream::iter(records.into_iter().map(Ok))))
    }

    fn is_collection(&self) -> bool {
        matches!(self, ActionInput::Stream(_))
    }
}

/// Result of an action.
///
/// A `Stream` output is lazy: the response is decoded as it is polled.
/// Dropping it stops the transfer; records the server sent past that point
/// are lost. A record that fails to decode shows up as an `Err` item and the
/// records after it still follow.
pub enum ActionOutput {
    Single(Record),
    Stream(RecordStream),
}

impl ActionOutput {
    pub fn is_stream(&self) -> bool {
        matches!(self, ActionOutput::Stream(_))
    }

    pub fn into_single(self) -> Option<Record> {
        match self {
            ActionOutput::Single(record) => Some(record),
            ActionOutput::Stream(_) => None,
        }
    }

    /// Output as a stream; a single record becomes a stream of one
    pub fn into_stream(self) -> RecordStream {
        match self {
            ActionOutput::Single(record) => Box::pin(stream::once(async move { Ok(record) })),
            ActionOutput::Stream(records) => records,
        }
    }

    /// Drain the output, stopping at the first error
    pub async fn into_records(self) -> EngineResult<Vec<Record>> {
        match self {
            ActionOutput::Single(record) => Ok(vec![record]),
            ActionOutput::Stream(records) => records.try_collect().await,
        }
    }
}

impl std::fmt::Debug for ActionOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActionOutput::Single(record) => f.debug_tuple("Single").field(record).finish(),
            ActionOutput::Stream(_) => write!(f, "Stream"),
        }
    }
}

/// Executes actions of one catalog over a transport
#[derive(Clone)]
pub struct ExecutionEngine {
    catalog: Arc<ActionCatalog>,
    transport: Arc<dyn Transport>,
    codecs: CodecRegistry,
    default_server: Option<String>,
}

impl ExecutionEngine {
    pub fn new(catalog: Arc<ActionCatalog>, transport: Arc<dyn Transport>) -> Self {
        Self {
            catalog,
            transport,
            codecs: CodecRegistry::default(),
            default_server: None,
        }
    }

    /// Engine over an HTTP transport configured from `config`
    pub fn from_config(catalog: Arc<ActionCatalog>, config: &EngineConfig) -> EngineResult<Self> {
        let transport = HttpTransport::from_config(config)?;
        let mut engine = Self::new(catalog, Arc::new(transport));
        engine.default_server = config.default_server.clone();
        Ok(engine)
    }

    /// Compile `description` and build an HTTP engine for it
    pub fn from_description(
        description: &ApiDescription,
        config: &EngineConfig,
    ) -> EngineResult<Self> {
        let catalog = soas_core::compile(description)?;
        Self::from_config(Arc::new(catalog), config)
    }

    pub fn with_codecs(mut self, codecs: CodecRegistry) -> Self {
        self.codecs = codecs;
        self
    }

    /// Server used when neither the call nor the description names one
    pub fn with_default_server(mut self, server: impl Into<String>) -> Self {
        self.default_server = Some(server.into());
        self
    }

    pub fn catalog(&self) -> &Arc<ActionCatalog> {
        &self.catalog
    }

    pub fn endpoints(&self) -> &[Endpoint] {
        self.catalog.endpoints()
    }

    pub fn actions(&self) -> impl Iterator<Item = &Action> {
        self.catalog.actions()
    }

    pub fn action(&self, id: &str) -> Option<&Action> {
        self.catalog.action(id)
    }

    /// Execute `action_id` with concept-keyed `input`.
    ///
    /// `server` overrides the description's server URL. All validation happens
    /// before the transport is called; the transport is called exactly once.
    #[instrument(level = "info", skip(self, input))]
    pub async fn execute(
        &self,
        action_id: &str,
        input: Option<ActionInput>,
        server: Option<&str>,
    ) -> EngineResult<ActionOutput> {
        let action = self
            .catalog
            .action(action_id)
            .ok_or_else(|| EngineError::UnknownAction(action_id.to_string()))?;

        if !action.usable {
            return Err(EngineError::UnsupportedBodyShape(action.id.clone()));
        }

        if let Some(input) = &input {
            if input.is_collection() != action.input_is_collection() {
                return Err(EngineError::InputShapeMismatch {
                    action: action.id.clone(),
                    expected: if action.input_is_collection() {
                        "collection"
                    } else {
                        "single"
                    },
                });
            }
        }

        let url = self.target_url(action, server)?;
        let body = self.request_body(action, input)?;
        // a declared output type must be decodable before anything is sent
        let declared_codec = action
            .output_content_types()
            .first()
            .map(|content_type| self.codecs.get(content_type))
            .transpose()?;

        let request = TransportRequest {
            method: action.route.method.to_uppercase(),
            url,
            body,
            accept: action.output_content_types().first().cloned(),
            response_mode: if action.output_is_collection() {
                ResponseMode::Streaming
            } else {
                ResponseMode::Buffered
            },
        };
        debug!(
            method = %request.method,
            url = %request.url,
            content_type = ?request.body.content_type(),
            accept = ?request.accept,
            "dispatching action"
        );

        let response = self.transport.send(request).await.map_err(|err| match err {
            EngineError::Transport(message) => EngineError::OperationFailed {
                status: None,
                body: None,
                message,
            },
            other => other,
        })?;

        if !response.is_success() {
            return Err(operation_failed(response).await);
        }

        let codec = match declared_codec {
            Some(codec) => codec,
            None => self
                .codecs
                .get(response.content_type.as_deref().unwrap_or(JSON))?,
        };
        let translator = OutputTranslator::for_action(action);

        if action.output_is_collection() {
            let action_id = action.id.clone();
            let records = codec
                .decode_stream(response.into_byte_stream())
                .map(move |record| {
                    record.map(|record| {
                        let missing = translator.missing_concepts(&record);
                        if !missing.is_empty() {
                            trace!(action_id = %action_id, ?missing, "output record lacks bound concepts");
                        }
                        translator.translate(record)
                    })
                });
            return Ok(ActionOutput::Stream(Box::pin(records)));
        }

        let bytes = response.into_bytes().await?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(ActionOutput::Single(Record::new()));
        }
        let record = codec.decode_one(bytes)?;
        let missing = translator.missing_concepts(&record);
        if !missing.is_empty() {
            trace!(action_id = %action.id, ?missing, "output record lacks bound concepts");
        }
        Ok(ActionOutput::Single(translator.translate(record)))
    }

    /// Server override, then the description's first server, then the configured default
    fn target_url(&self, action: &Action, server: Option<&str>) -> EngineResult<String> {
        let base = server
            .or_else(|| self.catalog.default_server())
            .or(self.default_server.as_deref())
            .ok_or_else(|| EngineError::MissingServer(action.id.clone()))?;

        let url = format!("{}{}", base.trim_end_matches('/'), action.route.path);
        url::Url::parse(&url).map_err(|e| EngineError::InvalidUrl {
            url: url.clone(),
            message: e.to_string(),
        })?;
        Ok(url)
    }

    /// Encoded request body; absent input sends no body at all
    fn request_body(&self, action: &Action, input: Option<ActionInput>) -> EngineResult<RequestBody> {
        let translator = InputTranslator::for_action(action);
        let Some(contract) = &action.input_body else {
            if input.is_some() {
                debug!(action_id = %action.id, "action declares no request body, input not sent");
            }
            if let Some(ActionInput::Single(record)) = &input {
                log_input_gaps(&translator, record, &action.id);
            }
            return Ok(RequestBody::Empty);
        };

        let Some(input) = input else {
            return Ok(RequestBody::Empty);
        };

        let content_type = contract
            .content_types
            .first()
            .cloned()
            .unwrap_or_else(|| JSON.to_string());
        let codec = self.codecs.get(&content_type)?;
        let fields = translator.wire_names();

        match input {
            ActionInput::Stream(records) => {
                let action_id = action.id.clone();
                let translated = records.map(move |record| {
                    record.map(|record| {
                        log_input_gaps(&translator, &record, &action_id);
                        translator.translate(record)
                    })
                });
                let stream = codec.encode_stream_with_fields(Box::pin(translated), fields);
                Ok(RequestBody::Streaming {
                    content_type,
                    stream,
                })
            }
            ActionInput::Single(record) => {
                log_input_gaps(&translator, &record, &action.id);
                let bytes = codec.encode_one_with_fields(&translator.translate(record), &fields)?;
                Ok(RequestBody::Buffered {
                    content_type,
                    bytes,
                })
            }
        }
    }
}

impl std::fmt::Debug for ExecutionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionEngine")
            .field("actions", &self.catalog.len())
            .field("codecs", &self.codecs)
            .field("default_server", &self.default_server)
            .finish_non_exhaustive()
    }
}

fn log_input_gaps(translator: &InputTranslator, record: &Record, action_id: &str) {
    let deferred = translator.deferred(record);
    if !deferred.is_empty() {
        debug!(action_id, ?deferred, "non-body bindings are not applied to the request");
    }
    let missing = translator.missing_concepts(record);
    if !missing.is_empty() {
        trace!(action_id, ?missing, "input record lacks bound concepts");
    }
}
