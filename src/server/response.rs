//! Shared response helpers for the endpoints.

use std::io;

use crate::action::{ResponseHead, ResponseSink};
use crate::resource::ResourceError;
use crate::utils::{header, mime::types};

/// Send a plain-text response.
pub fn send_text(sink: &mut dyn ResponseSink, status: u16, text: &str) -> io::Result<u16> {
    let head = ResponseHead::new(status).with_header("Content-Type", types::PLAIN);
    sink.send(&head, text.as_bytes())?;
    Ok(status)
}

pub fn not_found(sink: &mut dyn ResponseSink) -> io::Result<u16> {
    send_text(sink, 404, "404 Not Found")
}

pub fn method_not_allowed(sink: &mut dyn ResponseSink, allow: &str) -> io::Result<u16> {
    let head = ResponseHead::new(405)
        .with_header("Content-Type", types::PLAIN)
        .with_header("Allow", allow);
    sink.send(&head, b"405 Method Not Allowed")?;
    Ok(405)
}

pub fn unavailable(sink: &mut dyn ResponseSink) -> io::Result<u16> {
    send_text(sink, 503, "503 Service Unavailable")
}

/// `304` carrying the validator and the headers that describe the variant.
pub fn not_modified(sink: &mut dyn ResponseSink, mut head: ResponseHead) -> io::Result<u16> {
    head.status = 304;
    head.headers.retain(|(name, _)| !name.eq_ignore_ascii_case("Content-Type"));
    sink.send(&head, &[])?;
    Ok(304)
}

/// Map a resolver failure to a response.
///
/// Redirects use `HX-Redirect` for htmx requests so the browser navigates
/// instead of swapping the target.
pub fn resource_error(
    sink: &mut dyn ResponseSink,
    request_headers: &[(String, String)],
    err: &ResourceError,
) -> io::Result<u16> {
    match err {
        ResourceError::Status { code, message } => send_text(sink, *code, message),
        ResourceError::Redirect { to } if header::get(request_headers, header::HX_REQUEST).is_some() => {
            sink.send(&ResponseHead::new(200).with_header("HX-Redirect", to.as_str()), &[])?;
            Ok(200)
        }
        ResourceError::Redirect { to } => {
            sink.send(&ResponseHead::new(303).with_header("Location", to.as_str()), &[])?;
            Ok(303)
        }
        ResourceError::NotFound(_) => not_found(sink),
        ResourceError::Failed(_) => send_text(sink, 500, "500 Internal Server Error"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::MemorySink;

    #[test]
    fn test_redirect_style_follows_hx_request() {
        let err = ResourceError::redirect("/login");

        let mut sink = MemorySink::default();
        let htmx = vec![("HX-Request".to_string(), "true".to_string())];
        assert_eq!(resource_error(&mut sink, &htmx, &err).unwrap(), 200);
        assert_eq!(sink.recorded().header("HX-Redirect"), Some("/login"));

        let mut sink = MemorySink::default();
        assert_eq!(resource_error(&mut sink, &[], &err).unwrap(), 303);
        assert_eq!(sink.recorded().header("Location"), Some("/login"));
    }

    #[test]
    fn test_status_error_keeps_code() {
        let mut sink = MemorySink::default();
        let err = ResourceError::status(403, "forbidden");
        assert_eq!(resource_error(&mut sink, &[], &err).unwrap(), 403);
        assert_eq!(sink.recorded().body(), "forbidden");
    }

    #[test]
    fn test_not_modified_drops_content_type() {
        let mut sink = MemorySink::default();
        let head = ResponseHead::new(200)
            .with_header("Content-Type", types::HTML)
            .with_header("ETag", "\"abc\"");
        not_modified(&mut sink, head).unwrap();
        let recorded = sink.recorded();
        assert_eq!(recorded.status(), Some(304));
        assert_eq!(recorded.header("ETag"), Some("\"abc\""));
        assert!(recorded.header("Content-Type").is_none());
        assert!(recorded.chunks.is_empty());
    }
}
