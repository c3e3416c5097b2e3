//! Incremental line framing for line-oriented codecs

use crate::{ByteStream, EngineResult, Record, RecordStream};
use futures::StreamExt;

/// Splits a byte stream into complete lines.
///
/// Partial lines are kept across [`LineFramer::push`] calls. In quote-aware
/// mode a newline inside a double-quoted field does not end the line.
#[derive(Debug, Default)]
pub struct LineFramer {
    buffer: Vec<u8>,
    scanned: usize,
    quote_aware: bool,
    in_quotes: bool,
}

impl LineFramer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn quote_aware() -> Self {
        Self {
            quote_aware: true,
            ..Self::default()
        }
    }

    /// Append a chunk and return the lines it completes, without terminators.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Vec<u8>> {
        self.buffer.extend_from_slice(chunk);

        let mut lines = Vec::new();
        let mut start = 0;
        for i in self.scanned..self.buffer.len() {
            match self.buffer[i] {
                b'"' if self.quote_aware => self.in_quotes = !self.in_quotes,
                b'\n' if !self.in_quotes => {
                    lines.push(trim_cr(&self.buffer[start..i]).to_vec());
                    start = i + 1;
                }
                _ => {}
            }
        }

        self.buffer.drain(..start);
        self.scanned = self.buffer.len();
        lines
    }

    /// The trailing unterminated line, if any.
    pub fn finish(&mut self) -> Option<Vec<u8>> {
        let rest = std::mem::take(&mut self.buffer);
        self.scanned = 0;
        self.in_quotes = false;
        let rest = trim_cr(&rest);
        if rest.is_empty() {
            None
        } else {
            Some(rest.to_vec())
        }
    }
}

fn trim_cr(line: &[u8]) -> &[u8] {
    line.strip_suffix(b"\r").unwrap_or(line)
}

pub(crate) fn is_blank(line: &[u8]) -> bool {
    line.iter().all(u8::is_ascii_whitespace)
}

/// Frame `input` into lines and hand each to `parse`.
///
/// `parse` returns `None` for lines that carry no record. A transport error is
/// forwarded and ends the stream.
pub(crate) fn decode_lines<F>(input: ByteStream, mut framer: LineFramer, mut parse: F) -> RecordStream
where
    F: FnMut(&[u8]) -> Option<EngineResult<Record>> + Send + 'static,
{
    Box::pin(async_stream::stream! {
        let mut input = input;
        let mut failed = false;
        while let Some(chunk) = input.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(err) => {
                    failed = true;
                    yield Err(err);
                    break;
                }
            };
            for line in framer.push(&chunk) {
                if let Some(item) = parse(&line) {
                    yield item;
                }
            }
        }

        if !failed {
            if let Some(line) = framer.finish() {
                if let Some(item) = parse(&line) {
                    yield item;
                }
            }
        }
    })
}
