//! Serialized writes to one response.
//!
//! Island renders finish on different blocking threads; every write goes
//! through [`AtomicWriter`], which holds one lock around the sink, the
//! response head and the list of islands already written. A write is
//! flushed before the lock is released, so patches never interleave.
//!
//! The first island write commits the response: status and headers go out
//! and the body continues as a chunked stream. Until then the response is
//! buffered and the handler may still change it.

use parking_lot::Mutex;
use std::io;
use std::sync::Arc;

use crate::log;
use crate::utils::{header::is_status_positive, mime};

/// Status line and headers of a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseHead {
    pub status: u16,
    pub headers: Vec<(String, String)>,
}

impl ResponseHead {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: Vec::new(),
        }
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.set_header(name, value);
        self
    }

    /// Set a header, replacing any value under the same name.
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.headers.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(name)) {
            Some(slot) => slot.1 = value,
            None => self.headers.push((name.to_string(), value)),
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        crate::utils::header::get(&self.headers, name)
    }
}

/// Transport a response is written to.
pub trait ResponseSink: Send {
    /// Send the head and switch to a streamed body.
    fn begin_stream(&mut self, head: &ResponseHead) -> io::Result<()>;

    /// Write and flush one chunk of a streamed body.
    fn write_chunk(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Terminate a streamed body.
    fn end_stream(&mut self) -> io::Result<()>;

    /// Send a complete response in one go.
    fn send(&mut self, head: &ResponseHead, body: &[u8]) -> io::Result<()>;
}

struct WriterState {
    sink: Box<dyn ResponseSink>,
    head: ResponseHead,
    body: Option<Vec<u8>>,
    streaming: bool,
    finished: bool,
    updated: Vec<String>,
}

/// Single-writer gate in front of a [`ResponseSink`].
pub struct AtomicWriter {
    state: Mutex<WriterState>,
}

impl AtomicWriter {
    pub fn new(sink: Box<dyn ResponseSink>, head: ResponseHead) -> Self {
        Self {
            state: Mutex::new(WriterState {
                sink,
                head,
                body: None,
                streaming: false,
                finished: false,
                updated: Vec::new(),
            }),
        }
    }

    /// Write one island's patch and record the island as updated.
    ///
    /// Returns `false` without writing when the island was already written.
    pub fn write_island(&self, island_id: &str, patch: &[u8]) -> io::Result<bool> {
        let mut state = self.state.lock();
        if state.updated.iter().any(|id| id == island_id) {
            return Ok(false);
        }
        if state.finished {
            return Err(io::Error::other("response already finished"));
        }
        if state.body.is_some() {
            return Err(io::Error::other("response body already set"));
        }
        if !state.streaming {
            let WriterState { sink, head, .. } = &mut *state;
            sink.begin_stream(head)?;
            state.streaming = true;
        }
        state.sink.write_chunk(patch)?;
        state.updated.push(island_id.to_string());
        Ok(true)
    }

    pub fn is_updated(&self, island_id: &str) -> bool {
        self.state.lock().updated.iter().any(|id| id == island_id)
    }

    /// Islands written so far, in write order.
    pub fn updated_islands(&self) -> Vec<String> {
        self.state.lock().updated.clone()
    }

    pub fn status(&self) -> u16 {
        self.state.lock().head.status
    }

    /// Change the status. Ignored once the head has been sent.
    pub fn set_status(&self, status: u16) -> bool {
        let mut state = self.state.lock();
        if state.streaming || state.finished {
            return false;
        }
        state.head.status = status;
        true
    }

    /// Set a header. Ignored once the head has been sent.
    pub fn set_header(&self, name: &str, value: impl Into<String>) -> bool {
        let mut state = self.state.lock();
        if state.streaming || state.finished {
            return false;
        }
        state.head.set_header(name, value);
        true
    }

    /// Buffer a complete response body, replacing any island stream.
    ///
    /// Fails with `false` when islands were already streamed.
    pub fn respond(&self, status: u16, content_type: Option<&str>, body: Vec<u8>) -> bool {
        let mut state = self.state.lock();
        if state.streaming || state.finished {
            return false;
        }
        state.head.status = status;
        if let Some(content_type) = content_type {
            state.head.set_header("Content-Type", content_type);
        }
        state.body = Some(body);
        true
    }

    /// A full body was set or islands were written.
    pub fn is_handled(&self) -> bool {
        let state = self.state.lock();
        state.streaming || state.body.is_some()
    }

    pub fn has_body(&self) -> bool {
        self.state.lock().body.is_some()
    }

    /// The head is on the wire; status and headers are fixed.
    pub fn is_committed(&self) -> bool {
        let state = self.state.lock();
        state.streaming || state.finished
    }

    /// Send an error response, or just end the stream when already committed.
    pub fn fail(&self, status: u16, message: &str) {
        let mut state = self.state.lock();
        if state.finished {
            return;
        }
        state.finished = true;
        let result = if state.streaming {
            log!("action"; "response already streaming, dropping {} ({})", status, message);
            state.sink.end_stream()
        } else {
            let head = ResponseHead::new(status).with_header("Content-Type", mime::types::PLAIN);
            state.sink.send(&head, message.as_bytes())
        };
        if let Err(err) = result {
            log!("error"; "failed to send response: {}", err);
        }
    }

    /// Complete the response.
    ///
    /// - streamed: terminate the stream
    /// - buffered body: send it with the current head
    /// - nothing written and a positive status: `204 No Content`
    /// - otherwise: the head with an empty body
    ///
    /// Returns the final status.
    pub fn finish(&self) -> u16 {
        let mut state = self.state.lock();
        if state.finished {
            return state.head.status;
        }
        state.finished = true;

        let result = if state.streaming {
            state.sink.end_stream()
        } else if let Some(body) = state.body.take() {
            let WriterState { sink, head, .. } = &mut *state;
            sink.send(head, &body)
        } else {
            if is_status_positive(state.head.status) {
                state.head.status = 204;
            }
            let WriterState { sink, head, .. } = &mut *state;
            sink.send(head, &[])
        };
        if let Err(err) = result {
            log!("error"; "failed to send response: {}", err);
        }
        state.head.status
    }
}

/// What a [`MemorySink`] received.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordedResponse {
    pub head: Option<ResponseHead>,
    pub chunks: Vec<Vec<u8>>,
    pub streamed: bool,
    pub finished: bool,
}

impl RecordedResponse {
    pub fn status(&self) -> Option<u16> {
        self.head.as_ref().map(|h| h.status)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.head.as_ref()?.header(name)
    }

    /// Body as text, chunks concatenated.
    pub fn body(&self) -> String {
        self.chunks
            .iter()
            .map(|chunk| String::from_utf8_lossy(chunk))
            .collect()
    }
}

/// In-memory sink; clones share the same recording.
///
/// ```ignore
/// let sink = MemorySink::default();
/// let writer = AtomicWriter::new(Box::new(sink.clone()), ResponseHead::new(200));
/// // ...
/// assert_eq!(sink.recorded().status(), Some(204));
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    recorded: Arc<Mutex<RecordedResponse>>,
}

impl MemorySink {
    pub fn recorded(&self) -> RecordedResponse {
        self.recorded.lock().clone()
    }
}

impl ResponseSink for MemorySink {
    fn begin_stream(&mut self, head: &ResponseHead) -> io::Result<()> {
        let mut recorded = self.recorded.lock();
        recorded.head = Some(head.clone());
        recorded.streamed = true;
        Ok(())
    }

    fn write_chunk(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.recorded.lock().chunks.push(bytes.to_vec());
        Ok(())
    }

    fn end_stream(&mut self) -> io::Result<()> {
        self.recorded.lock().finished = true;
        Ok(())
    }

    fn send(&mut self, head: &ResponseHead, body: &[u8]) -> io::Result<()> {
        let mut recorded = self.recorded.lock();
        recorded.head = Some(head.clone());
        if !body.is_empty() {
            recorded.chunks.push(body.to_vec());
        }
        recorded.finished = true;
        Ok(())
    }
}
