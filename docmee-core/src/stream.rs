//! Incremental decoding of the outline streaming endpoints.
//!
//! The service pushes one JSON object per event. Depending on the deployment
//! the body is either Server-Sent-Events (`data: {...}` lines) or bare JSON
//! objects written back to back. [`StreamDecoder`] accepts both and hands out
//! one object at a time as soon as its last byte has arrived. Content that is
//! neither ends the stream with a decode error.

use std::pin::Pin;

use futures::stream::{self, Stream, StreamExt};
use serde::de::Error as _;
use serde_json::{Map, Value};
use tracing::{debug, error};

use crate::error::{ClientError, ClientResult, TransportError};

/// One decoded element of an outline stream.
pub type OutlineChunk = Map<String, Value>;

/// Pull-based stream of outline elements. Dropping it closes the connection.
pub type OutlineStream = Pin<Box<dyn Stream<Item = ClientResult<OutlineChunk>> + Send>>;

/// Upper bound on the bytes held for a single element, line or event.
pub const MAX_PENDING_BYTES: usize = 8 * 1024 * 1024;

/// Progress of the bracket scan over a partially received JSON object.
#[derive(Debug, Default, Clone, Copy)]
struct ObjectScan {
    pos: usize,
    depth: usize,
    in_string: bool,
    escaped: bool,
}

#[derive(Debug, Default)]
pub struct StreamDecoder {
    buf: Vec<u8>,
    eof: bool,
    object: ObjectScan,
    // Bytes of `buf` already searched for a newline.
    line_scanned: usize,
    // `data:` lines of the SSE event being assembled.
    event_data: Option<Vec<u8>>,
}

impl StreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
    }

    /// Marks the end of input. A trailing line or event without its
    /// terminator becomes decodable, and a partial element becomes an error.
    pub fn finish(&mut self) {
        self.eof = true;
    }

    /// Next complete element, or `Ok(None)` if more input is needed (or, after
    /// [`finish`](Self::finish), if the input is exhausted).
    ///
    /// Anything that is neither a JSON object nor an SSE field line is a
    /// [`ClientError::Decode`].
    pub fn next_element(&mut self) -> ClientResult<Option<OutlineChunk>> {
        loop {
            if self.event_data.is_some() {
                let Some(line) = self.take_line()? else {
                    return Ok(None);
                };
                if line.is_empty() {
                    if let Some(element) = self.dispatch_event()? {
                        return Ok(Some(element));
                    }
                } else {
                    self.event_line(&line)?;
                }
                continue;
            }

            self.skip_separators();
            match self.buf.first() {
                None => return Ok(None),
                Some(b'{') => return self.next_json_value(),
                Some(_) => {
                    let Some(line) = self.take_line()? else {
                        return Ok(None);
                    };
                    self.event_line(&line)?;
                }
            }
        }
    }

    // Whitespace, and the brackets/commas of a top-level JSON array.
    fn skip_separators(&mut self) {
        let skip = self
            .buf
            .iter()
            .take_while(|b| b.is_ascii_whitespace() || matches!(b, b',' | b'[' | b']'))
            .count();
        if skip > 0 {
            self.consume(skip);
        }
    }

    fn consume(&mut self, n: usize) -> Vec<u8> {
        self.object = ObjectScan::default();
        self.line_scanned = 0;
        self.buf.drain(..n).collect()
    }

    fn next_json_value(&mut self) -> ClientResult<Option<OutlineChunk>> {
        let Some(end) = self.scan_object() else {
            if self.eof {
                error!(pending_bytes = self.buf.len(), "Outline stream ended inside an element");
                let err = match serde_json::from_slice::<Value>(&self.buf) {
                    Err(e) => e,
                    Ok(_) => serde_json::Error::custom("unbalanced element"),
                };
                return Err(ClientError::decode("outline stream (truncated element)", err));
            }
            check_pending(self.buf.len())?;
            return Ok(None);
        };
        let raw = self.consume(end);
        let value: Value = serde_json::from_slice(&raw)
            .map_err(|e| ClientError::decode("outline stream element", e))?;
        into_object(value).map(Some)
    }

    /// End offset of the object starting at `buf[0]`, once all of it has
    /// arrived. Resumes where the previous call stopped.
    fn scan_object(&mut self) -> Option<usize> {
        let mut scan = self.object;
        let mut end = None;
        for (i, &b) in self.buf.iter().enumerate().skip(scan.pos) {
            if scan.in_string {
                if scan.escaped {
                    scan.escaped = false;
                } else if b == b'\\' {
                    scan.escaped = true;
                } else if b == b'"' {
                    scan.in_string = false;
                }
                continue;
            }
            match b {
                b'"' => scan.in_string = true,
                b'{' | b'[' => scan.depth += 1,
                b'}' | b']' => {
                    scan.depth = scan.depth.saturating_sub(1);
                    if scan.depth == 0 {
                        end = Some(i + 1);
                        break;
                    }
                }
                _ => {}
            }
        }
        if end.is_none() {
            scan.pos = self.buf.len();
        }
        self.object = scan;
        end
    }

    fn take_line(&mut self) -> ClientResult<Option<Vec<u8>>> {
        let newline = self.buf[self.line_scanned..]
            .iter()
            .position(|b| *b == b'\n')
            .map(|pos| self.line_scanned + pos);
        let end = match newline {
            Some(pos) => pos + 1,
            None if self.eof => self.buf.len(),
            None => {
                self.line_scanned = self.buf.len();
                check_pending(self.buf.len())?;
                return Ok(None);
            }
        };
        let mut line = self.consume(end);
        while matches!(line.last(), Some(b'\n' | b'\r')) {
            line.pop();
        }
        Ok(Some(line))
    }

    // SSE field lines: `data` accumulates into the current event, `event`,
    // `id`, `retry` and `:` comments are dropped. Any other line is content
    // that failed to be JSON.
    fn event_line(&mut self, line: &[u8]) -> ClientResult<()> {
        if line.starts_with(b":") {
            return Ok(());
        }
        let (name, value) = match line.iter().position(|b| *b == b':') {
            Some(colon) => {
                let value = &line[colon + 1..];
                (&line[..colon], value.strip_prefix(b" ").unwrap_or(value))
            }
            None => (line, &[][..]),
        };
        match name {
            b"data" => {
                let data = self.event_data.get_or_insert_with(Vec::new);
                if !data.is_empty() {
                    data.push(b'\n');
                }
                data.extend_from_slice(value);
                check_pending(data.len())
            }
            b"event" | b"id" | b"retry" => Ok(()),
            _ => {
                error!(
                    line = %String::from_utf8_lossy(line),
                    "Outline stream carried a line that is neither JSON nor an event field"
                );
                let source = match serde_json::from_slice::<Value>(line) {
                    Err(e) => e,
                    Ok(Value::Object(_)) => {
                        serde_json::Error::custom("JSON object in the middle of an event")
                    }
                    Ok(other) => {
                        serde_json::Error::custom(format!("expected a JSON object, found {other}"))
                    }
                };
                Err(ClientError::decode("outline stream line", source))
            }
        }
    }

    fn dispatch_event(&mut self) -> ClientResult<Option<OutlineChunk>> {
        let Some(data) = self.event_data.take() else {
            return Ok(None);
        };
        let payload = data.trim_ascii();
        if payload.is_empty() || payload == b"[DONE]" {
            return Ok(None);
        }
        let value: Value = serde_json::from_slice(payload)
            .map_err(|e| ClientError::decode("outline event payload", e))?;
        into_object(value).map(Some)
    }
}

fn check_pending(len: usize) -> ClientResult<()> {
    if len > MAX_PENDING_BYTES {
        error!(pending_bytes = len, "Outline stream element exceeds the size limit");
        return Err(ClientError::decode(
            "outline stream",
            serde_json::Error::custom(format!(
                "more than {MAX_PENDING_BYTES} bytes without a complete element"
            )),
        ));
    }
    Ok(())
}

fn into_object(value: Value) -> ClientResult<OutlineChunk> {
    serde_json::from_value(value).map_err(|e| ClientError::decode("outline stream element", e))
}

/// Identifies the request behind a stream so mid-stream failures can be
/// reported with the same diagnostics as any other transport error.
#[derive(Debug, Clone)]
pub(crate) struct RequestContext {
    pub method: String,
    pub url: String,
    pub summary: String,
}

impl RequestContext {
    pub fn new(method: &reqwest::Method, url: String, summary: String) -> Self {
        Self {
            method: method.to_string(),
            url,
            summary,
        }
    }

    pub fn connection_error(
        &self,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> TransportError {
        TransportError::connection(
            self.method.clone(),
            self.url.clone(),
            self.summary.clone(),
            source,
        )
    }
}

struct DecodeState<S> {
    body: Pin<Box<S>>,
    decoder: StreamDecoder,
    context: RequestContext,
    yielded: usize,
    done: bool,
}

/// Turns a byte stream into an [`OutlineStream`].
///
/// Bytes are only pulled from `body` when the consumer asks for the next
/// element. The first error ends the stream.
pub(crate) fn decode_body<S, B, E>(body: S, context: RequestContext) -> OutlineStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: std::error::Error + Send + Sync + 'static,
{
    let state = DecodeState {
        body: Box::pin(body),
        decoder: StreamDecoder::new(),
        context,
        yielded: 0,
        done: false,
    };

    stream::unfold(state, |mut state| async move {
        if state.done {
            return None;
        }
        loop {
            match state.decoder.next_element() {
                Ok(Some(element)) => {
                    state.yielded += 1;
                    return Some((Ok(element), state));
                }
                Ok(None) if state.decoder.eof => {
                    debug!(
                        url = %state.context.url,
                        elements = state.yielded,
                        "Outline stream complete"
                    );
                    return None;
                }
                Ok(None) => {}
                Err(e) => {
                    state.done = true;
                    return Some((Err(e), state));
                }
            }

            match state.body.next().await {
                Some(Ok(chunk)) => state.decoder.push(chunk.as_ref()),
                Some(Err(e)) => {
                    error!(
                        method = %state.context.method,
                        url = %state.context.url,
                        request = %state.context.summary,
                        elements = state.yielded,
                        error = %e,
                        "Outline stream interrupted"
                    );
                    let err = state.context.connection_error(e);
                    state.done = true;
                    return Some((Err(err.into()), state));
                }
                None => state.decoder.finish(),
            }
        }
    })
    .boxed()
}
