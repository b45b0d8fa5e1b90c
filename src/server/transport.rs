//! `tiny_http` response sink.
//!
//! Buffered responses go through `Request::respond`. Streamed responses
//! take over the connection (`Request::into_writer`) and write the head and
//! a chunked body by hand, flushing after every chunk.

use std::io::{self, Write};
use tiny_http::{Header, Request, Response, StatusCode};

use crate::action::{ResponseHead, ResponseSink};

pub struct TinyHttpSink {
    request: Option<Request>,
    stream: Option<Box<dyn Write + Send>>,
}

impl TinyHttpSink {
    pub fn new(request: Request) -> Self {
        Self {
            request: Some(request),
            stream: None,
        }
    }

    fn take_request(&mut self) -> io::Result<Request> {
        self.request
            .take()
            .ok_or_else(|| io::Error::other("response already sent"))
    }

    fn stream(&mut self) -> io::Result<&mut Box<dyn Write + Send>> {
        self.stream
            .as_mut()
            .ok_or_else(|| io::Error::other("response is not streaming"))
    }
}

impl ResponseSink for TinyHttpSink {
    fn begin_stream(&mut self, head: &ResponseHead) -> io::Result<()> {
        let request = self.take_request()?;
        let mut writer = request.into_writer();

        let reason = StatusCode(head.status).default_reason_phrase();
        write!(writer, "HTTP/1.1 {} {}\r\n", head.status, reason)?;
        for (name, value) in &head.headers {
            write!(writer, "{name}: {value}\r\n")?;
        }
        writer.write_all(b"Transfer-Encoding: chunked\r\nConnection: close\r\n\r\n")?;
        writer.flush()?;

        self.stream = Some(writer);
        Ok(())
    }

    fn write_chunk(&mut self, bytes: &[u8]) -> io::Result<()> {
        if bytes.is_empty() {
            return Ok(());
        }
        let stream = self.stream()?;
        write!(stream, "{:X}\r\n", bytes.len())?;
        stream.write_all(bytes)?;
        stream.write_all(b"\r\n")?;
        stream.flush()
    }

    fn end_stream(&mut self) -> io::Result<()> {
        let stream = self.stream()?;
        stream.write_all(b"0\r\n\r\n")?;
        stream.flush()?;
        self.stream = None;
        Ok(())
    }

    fn send(&mut self, head: &ResponseHead, body: &[u8]) -> io::Result<()> {
        let request = self.take_request()?;
        let mut response = Response::from_data(body.to_vec()).with_status_code(StatusCode(head.status));
        for (name, value) in &head.headers {
            response.add_header(make_header(name, value)?);
        }
        request.respond(response)
    }
}

fn make_header(name: &str, value: &str) -> io::Result<Header> {
    Header::from_bytes(name.as_bytes(), value.as_bytes())
        .map_err(|()| io::Error::new(io::ErrorKind::InvalidInput, format!("invalid header `{name}`")))
}
