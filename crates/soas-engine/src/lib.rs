//! SOAS engine: executes compiled actions
//!
//! The [`ExecutionEngine`] translates concept-keyed records into an
//! operation's wire format, dispatches one call through a [`Transport`] and
//! translates the response back. Collections flow as pull-based streams end to
//! end.

pub mod codec;
pub mod config;
pub mod engine;
pub mod error;
pub mod logging;
pub mod transport;

use bytes::Bytes;
use futures::stream::BoxStream;

pub use soas_core::Record;

/// Stream of records.
///
/// As request input, an `Err` item ends the body. Decoded output reports a bad
/// record as an `Err` item and carries on with the next one; only a failed
/// read of the response ends it.
pub type RecordStream = BoxStream<'static, EngineResult<Record>>;

/// Stream of encoded body chunks
pub type ByteStream = BoxStream<'static, EngineResult<Bytes>>;

pub use codec::{Codec, CodecRegistry};
pub use config::EngineConfig;
pub use engine::{ActionInput, ActionOutput, ExecutionEngine};
pub use error::{EngineError, EngineResult};
pub use transport::http::HttpTransport;
pub use transport::{Transport, TransportRequest, TransportResponse};
